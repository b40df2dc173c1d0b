//! Mapping of contract actions to the types of their payloads.
use crate::{
    error::{CodecError, ParseResult},
    name::Name,
    serialize::Cursor,
    types::Bytes,
    value::{decode, TypeDesc, Value},
};
use std::collections::BTreeMap;

/// Payload descriptors keyed by `(account, action)`. Immutable once built.
#[derive(Debug, Clone, Default)]
pub struct ActionRegistry {
    actions: BTreeMap<(Name, Name), TypeDesc>,
}

/// Collects registrations for an [`ActionRegistry`].
#[derive(Debug, Default)]
pub struct ActionRegistryBuilder {
    entries: Vec<((Name, Name), TypeDesc)>,
}

impl ActionRegistryBuilder {
    pub fn register(mut self, account: impl Into<Name>, action: impl Into<Name>, desc: TypeDesc) -> Self {
        self.entries.push(((account.into(), action.into()), desc));
        self
    }

    /// Fails if the same pair was registered twice.
    pub fn build(self) -> ParseResult<ActionRegistry> {
        let mut actions = BTreeMap::new();
        for ((account, action), desc) in self.entries {
            if actions.insert((account, action), desc).is_some() {
                return Err(CodecError::invalid(format!(
                    "action [{}::{}] is registered more than once",
                    account, action
                )));
            }
        }
        Ok(ActionRegistry {
            actions,
        })
    }
}

impl ActionRegistry {
    pub fn builder() -> ActionRegistryBuilder { ActionRegistryBuilder::default() }

    pub fn lookup(&self, account: Name, action: Name) -> Option<&TypeDesc> {
        self.actions.get(&(account, action))
    }

    pub fn len(&self) -> usize { self.actions.len() }

    pub fn is_empty(&self) -> bool { self.actions.is_empty() }

    /// Decode the payload of a known action. Unknown actions give `Ok(None)`.
    pub fn decode(&self, account: Name, action: Name, data: &[u8]) -> ParseResult<Option<Value>> {
        let Some(desc) = self.lookup(account, action) else {
            return Ok(None);
        };
        let mut source = Cursor::new(data);
        let value = decode(&mut source, desc)?;
        if source.has_remaining() {
            return Err(CodecError::SizeMismatch {
                expected: source.position(),
                actual:   data.len(),
            });
        }
        Ok(Some(value))
    }
}

/// The payload of an action, either as raw bytes or decoded into a value.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionData {
    Raw(Bytes),
    Decoded(Value),
}

impl Default for ActionData {
    fn default() -> Self { ActionData::Raw(Bytes::default()) }
}

impl ActionData {
    /// Decode raw bytes if the action is registered; anything else is
    /// returned unchanged.
    pub fn decode_with(self, registry: &ActionRegistry, account: Name, action: Name) -> ParseResult<Self> {
        match self {
            ActionData::Raw(bytes) => match registry.decode(account, action, bytes.as_slice())? {
                Some(value) => Ok(ActionData::Decoded(value)),
                None => Ok(ActionData::Raw(bytes)),
            },
            decoded => Ok(decoded),
        }
    }

    /// The wire bytes of the payload, encoding a decoded value with its
    /// registered descriptor.
    pub fn to_raw(&self, registry: &ActionRegistry, account: Name, action: Name) -> ParseResult<Bytes> {
        match self {
            ActionData::Raw(bytes) => Ok(bytes.clone()),
            ActionData::Decoded(value) => {
                let desc = registry.lookup(account, action).ok_or_else(|| {
                    CodecError::schema(format!("no payload type registered for [{}::{}]", account, action))
                })?;
                Ok(Bytes(value.pack(desc)?))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::FieldDesc;
    use std::sync::Arc;

    fn registry() -> ActionRegistry {
        ActionRegistry::builder()
            .register(
                "eosio.token",
                "transfer",
                TypeDesc::Struct(vec![
                    FieldDesc::new("from", TypeDesc::Name),
                    FieldDesc::new("to", TypeDesc::Name),
                    FieldDesc::new("quantity", TypeDesc::Asset),
                    FieldDesc::new("memo", TypeDesc::String),
                ]),
            )
            .build()
            .expect("Registrations are distinct.")
    }

    #[test]
    fn test_duplicate_registration() {
        let res = ActionRegistry::builder()
            .register("a", "b", TypeDesc::UInt8)
            .register("a", "b", TypeDesc::UInt16)
            .build();
        assert!(res.is_err());
    }

    #[test]
    fn test_decode_known_and_unknown() {
        let registry = Arc::new(registry());
        let transfer = Value::Struct(vec![
            ("from".into(), Value::Name("alice".into())),
            ("to".into(), Value::Name("bob".into())),
            ("quantity".into(), Value::Asset("1.0000 EOS".parse().unwrap())),
            ("memo".into(), Value::String(String::new())),
        ]);
        let desc = registry.lookup("eosio.token".into(), "transfer".into()).unwrap();
        let bytes = Bytes(transfer.pack(desc).unwrap());

        let data = ActionData::Raw(bytes.clone())
            .decode_with(&registry, "eosio.token".into(), "transfer".into())
            .unwrap();
        assert_eq!(data, ActionData::Decoded(transfer));
        assert_eq!(data.to_raw(&registry, "eosio.token".into(), "transfer".into()).unwrap(), bytes);

        let unknown = ActionData::Raw(bytes.clone())
            .decode_with(&registry, "eosio".into(), "transfer".into())
            .unwrap();
        assert_eq!(unknown, ActionData::Raw(bytes));
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let registry = ActionRegistry::builder().register("a", "b", TypeDesc::UInt8).build().unwrap();
        assert!(registry.decode("a".into(), "b".into(), &[1, 2]).is_err());
    }
}

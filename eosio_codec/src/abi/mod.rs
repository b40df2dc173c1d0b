//! Contract ABI documents and the codec they drive.
//!
//! An [`Abi`] is the JSON description a contract publishes of its structs,
//! type aliases, variants, actions and tables. [`AbiDecoder`] and
//! [`AbiEncoder`] use it to translate between the binary wire format and JSON
//! objects without any statically known types.
use crate::{
    error::{CodecError, ParseResult},
    name::Name,
};
use itertools::Itertools;
use serde::{Deserialize as SerdeDeserialize, Serialize as SerdeSerialize};
use std::{io::Read, str::FromStr};

mod decoder;
mod encoder;

pub use decoder::AbiDecoder;
pub use encoder::AbiEncoder;

/// An alias `new_type_name` for `type`.
#[derive(SerdeSerialize, SerdeDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct AbiType {
    pub new_type_name: String,
    #[serde(rename = "type")]
    pub type_name:     String,
}

#[derive(SerdeSerialize, SerdeDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
    pub name:      String,
    #[serde(rename = "type")]
    pub type_name: String,
}

/// A struct, optionally extending a `base` struct whose fields come first.
#[derive(SerdeSerialize, SerdeDeserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(default)]
pub struct StructDef {
    pub name:   String,
    pub base:   String,
    pub fields: Vec<FieldDef>,
}

#[derive(SerdeSerialize, SerdeDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct ActionDef {
    pub name:               Name,
    #[serde(rename = "type")]
    pub type_name:          String,
    #[serde(default)]
    pub ricardian_contract: String,
}

#[derive(SerdeSerialize, SerdeDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct TableDef {
    pub name:       Name,
    #[serde(default)]
    pub index_type: String,
    #[serde(default)]
    pub key_names:  Vec<String>,
    #[serde(default)]
    pub key_types:  Vec<String>,
    #[serde(rename = "type")]
    pub type_name:  String,
}

#[derive(SerdeSerialize, SerdeDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct ClauseDef {
    pub id:   String,
    pub body: String,
}

/// A tagged union. On the wire the index into `types` precedes the value.
#[derive(SerdeSerialize, SerdeDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct VariantDef {
    pub name:  String,
    pub types: Vec<String>,
}

#[derive(SerdeSerialize, SerdeDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct ActionResultDef {
    pub name:        Name,
    pub result_type: String,
}

/// A contract ABI. Unknown keys are ignored and missing lists are empty.
#[derive(SerdeSerialize, SerdeDeserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(default)]
pub struct Abi {
    pub version:           String,
    pub types:             Vec<AbiType>,
    pub structs:           Vec<StructDef>,
    pub actions:           Vec<ActionDef>,
    pub tables:            Vec<TableDef>,
    pub ricardian_clauses: Vec<ClauseDef>,
    pub variants:          Vec<VariantDef>,
    pub action_results:    Vec<ActionResultDef>,
}

impl Abi {
    pub fn from_json_str(s: &str) -> ParseResult<Self> {
        serde_json::from_str(s).map_err(|e| CodecError::invalid(format!("malformed ABI: {}", e)))
    }

    pub fn from_reader<R: Read>(reader: R) -> ParseResult<Self> {
        serde_json::from_reader(reader).map_err(|e| CodecError::invalid(format!("malformed ABI: {}", e)))
    }

    /// Follow aliases until a name that is not an alias is reached.
    pub fn resolve_alias<'a>(&'a self, type_name: &'a str) -> ParseResult<&'a str> {
        let mut seen = vec![type_name];
        let mut current = type_name;
        while let Some(alias) = self.types.iter().find(|t| t.new_type_name == current) {
            current = alias.type_name.as_str();
            if seen.contains(&current) {
                seen.push(current);
                return Err(CodecError::schema(format!(
                    "type alias cycle: {}",
                    seen.iter().join(" -> ")
                )));
            }
            seen.push(current);
        }
        Ok(current)
    }

    /// The struct with exactly this name. Aliases are not followed.
    pub fn find_struct(&self, type_name: &str) -> Option<&StructDef> {
        self.structs.iter().find(|s| s.name == type_name)
    }

    pub fn find_variant(&self, type_name: &str) -> Option<&VariantDef> {
        self.variants.iter().find(|v| v.name == type_name)
    }

    pub fn action_for_name(&self, name: Name) -> Option<&ActionDef> {
        self.actions.iter().find(|a| a.name == name)
    }

    pub fn table_for_name(&self, name: Name) -> Option<&TableDef> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn action_result_for_name(&self, name: Name) -> Option<&ActionResultDef> {
        self.action_results.iter().find(|r| r.name == name)
    }

    /// The base chain of `def`, outermost base first and `def` itself last.
    ///
    /// Fails if a base does not resolve to a struct or the chain loops back on
    /// itself.
    pub fn base_chain<'a>(&'a self, def: &'a StructDef) -> ParseResult<Vec<&'a StructDef>> {
        let mut chain = vec![def];
        let mut current = def;
        while !current.base.is_empty() {
            let base = self.resolve_alias(&current.base)?;
            if chain.iter().any(|s| s.name == base) {
                return Err(CodecError::schema(format!(
                    "struct base cycle: {} -> {}",
                    chain.iter().map(|s| s.name.as_str()).join(" -> "),
                    base
                )));
            }
            current = self.find_struct(base).ok_or_else(|| {
                CodecError::schema(format!("base [{}] of struct [{}] is not a struct", base, current.name))
            })?;
            chain.push(current);
        }
        chain.reverse();
        Ok(chain)
    }

    /// Check that every alias resolves, and that every base chain consists of
    /// structs and ends.
    pub fn validate(&self) -> ParseResult<()> {
        for alias in &self.types {
            self.resolve_alias(&alias.new_type_name)?;
        }
        for s in &self.structs {
            self.base_chain(s)?;
        }
        Ok(())
    }
}

impl FromStr for Abi {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> { Abi::from_json_str(s) }
}

/// A field type declaration split into its base type and suffix modifiers.
///
/// Only the outermost modifiers are split off, so `base` may itself carry
/// modifiers, e.g., the elements of `string?[]` have type `string?`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldType<'a> {
    pub base:             &'a str,
    /// `T?`
    pub optional:         bool,
    /// `T[]`
    pub array:            bool,
    /// `T[N]`
    pub fixed:            Option<usize>,
    /// `T$`, absent when the input ends before the field.
    pub binary_extension: bool,
}

impl<'a> FieldType<'a> {
    pub fn parse(decl: &'a str) -> Self {
        let mut ty = FieldType {
            base:             decl,
            optional:         false,
            array:            false,
            fixed:            None,
            binary_extension: false,
        };
        if let Some(rest) = ty.base.strip_suffix('$') {
            ty.binary_extension = true;
            ty.base = rest;
        }
        if let Some(rest) = ty.base.strip_suffix('?') {
            ty.optional = true;
            ty.base = rest;
        }
        if let Some(rest) = ty.base.strip_suffix("[]") {
            ty.array = true;
            ty.base = rest;
        } else if let Some(rest) = ty.base.strip_suffix(']') {
            if let Some((elem, len)) = rest.rsplit_once('[') {
                if let Ok(n) = len.parse::<usize>() {
                    ty.fixed = Some(n);
                    ty.base = elem;
                }
            }
        }
        ty
    }

    /// The same type without the optional and binary extension markers.
    pub(crate) fn required(self) -> Self {
        FieldType {
            optional: false,
            binary_extension: false,
            ..self
        }
    }
}

/// Runtime switches of the ABI codec.
#[derive(SerdeSerialize, SerdeDeserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct AbiCodecOptions {
    /// Render values the way nodeos does: booleans as `0`/`1`, time points
    /// with three fractional digits, floats as strings with 17 fractional
    /// digits, and absent optional fields as `null`.
    pub fit_nodeos:              bool,
    /// Upper bound on slots pre-allocated for a decoded array.
    pub max_array_preallocation: usize,
}

impl Default for AbiCodecOptions {
    fn default() -> Self {
        AbiCodecOptions {
            fit_nodeos:              false,
            max_array_preallocation: crate::serialize::MAX_PREALLOCATED_CAPACITY,
        }
    }
}

/// Decode `data` as `type_name` with default options. Struct-valued fields
/// are spliced into the top-level object.
pub fn decode(
    abi: &Abi,
    data: &[u8],
    type_name: &str,
) -> ParseResult<serde_json::Map<String, serde_json::Value>> {
    AbiDecoder::new(abi).decode_struct(type_name, data)
}

/// Encode a JSON object as `type_name`. Struct-valued fields are expected as
/// nested objects.
pub fn encode(
    abi: &Abi,
    value: &serde_json::Map<String, serde_json::Value>,
    type_name: &str,
) -> ParseResult<Vec<u8>> {
    AbiEncoder::new(abi).encode_struct(type_name, value)
}

/// Whether the name is one of the 128-bit types the codec does not handle.
pub(crate) fn is_wide_type(type_name: &str) -> bool {
    matches!(type_name, "int128" | "uint128" | "float128")
}

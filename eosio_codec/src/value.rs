//! Dynamically typed values and the descriptors that drive their encoding.
//!
//! A [`TypeDesc`] is a closed description of a wire type. [`encode`] and
//! [`decode`] walk a [`Value`] and a descriptor together, bottoming out in the
//! [`Serial`] and [`Deserial`] instances of the leaf types, so dynamically
//! typed data takes exactly the same byte layout as statically typed data.
use crate::{
    ecc::{PublicKey, Signature},
    error::{CodecError, ParseResult, ResultExt},
    name::Name,
    serialize::{
        write_length, Buffer, Cursor, Deserial, Serial, VarInt32, VarUint32, MAX_PREALLOCATED_CAPACITY,
    },
    types::{
        Asset, BlockTimestamp, Bytes, Checksum160, Checksum256, Checksum512, ExtendedAsset, Symbol,
        SymbolCode, TimePoint, TimePointSec,
    },
};
use std::cmp;

macro_rules! value_model {
    ($($kind:ident($t:ty) => $abi:literal,)*) => {
        /// A dynamically typed value.
        #[derive(Clone, Debug, PartialEq)]
        pub enum Value {
            $($kind($t),)*
            /// Elements of a fixed-size array.
            Array(Vec<Value>),
            Sequence(Vec<Value>),
            /// Key-value pairs, in no particular order.
            Map(Vec<(Value, Value)>),
            /// Named fields, looked up by name when encoding.
            Struct(Vec<(String, Value)>),
            Optional(Option<Box<Value>>),
        }

        /// Description of a wire type.
        #[derive(Clone, Debug, PartialEq, Eq)]
        pub enum TypeDesc {
            $($kind,)*
            FixedArray(Box<TypeDesc>, usize),
            Sequence(Box<TypeDesc>),
            Map(Box<TypeDesc>, Box<TypeDesc>),
            Struct(Vec<FieldDesc>),
            Optional(Box<TypeDesc>),
        }

        impl Value {
            /// Name of the kind of value, for error messages.
            pub fn kind_name(&self) -> &'static str {
                match self {
                    $(Value::$kind(_) => $abi,)*
                    Value::Array(_) => "array",
                    Value::Sequence(_) => "sequence",
                    Value::Map(_) => "map",
                    Value::Struct(_) => "struct",
                    Value::Optional(_) => "optional",
                }
            }
        }

        impl TypeDesc {
            /// The descriptor of a built-in leaf type, by its ABI name.
            pub fn leaf(abi_name: &str) -> Option<TypeDesc> {
                match abi_name {
                    $($abi => Some(TypeDesc::$kind),)*
                    _ => None,
                }
            }

            /// The ABI name of a leaf type.
            pub fn leaf_name(&self) -> Option<&'static str> {
                match self {
                    $(TypeDesc::$kind => Some($abi),)*
                    _ => None,
                }
            }
        }

        fn encode_leaf<B: Buffer>(desc: &TypeDesc, value: &Value, out: &mut B) -> Option<ParseResult<()>> {
            match (desc, value) {
                $((TypeDesc::$kind, Value::$kind(v)) => {
                    v.serial(out);
                    Some(Ok(()))
                })*
                $((TypeDesc::$kind, v) => Some(Err(mismatch(desc, v))),)*
                _ => None,
            }
        }

        fn decode_leaf(desc: &TypeDesc, source: &mut Cursor<'_>) -> Option<ParseResult<Value>> {
            match desc {
                $(TypeDesc::$kind => Some(<$t>::deserial(source).map(Value::$kind)),)*
                _ => None,
            }
        }
    };
}

value_model! {
    Bool(bool) => "bool",
    Int8(i8) => "int8",
    UInt8(u8) => "uint8",
    Int16(i16) => "int16",
    UInt16(u16) => "uint16",
    Int32(i32) => "int32",
    UInt32(u32) => "uint32",
    Int64(i64) => "int64",
    UInt64(u64) => "uint64",
    VarInt32(VarInt32) => "varint32",
    VarUint32(VarUint32) => "varuint32",
    Float32(f32) => "float32",
    Float64(f64) => "float64",
    TimePoint(TimePoint) => "time_point",
    TimePointSec(TimePointSec) => "time_point_sec",
    BlockTimestamp(BlockTimestamp) => "block_timestamp_type",
    Name(Name) => "name",
    Bytes(Bytes) => "bytes",
    String(String) => "string",
    Checksum160(Checksum160) => "checksum160",
    Checksum256(Checksum256) => "checksum256",
    Checksum512(Checksum512) => "checksum512",
    PublicKey(PublicKey) => "public_key",
    Signature(Signature) => "signature",
    Symbol(Symbol) => "symbol",
    SymbolCode(SymbolCode) => "symbol_code",
    Asset(Asset) => "asset",
    ExtendedAsset(ExtendedAsset) => "extended_asset",
}

/// How a struct field is laid out.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldTag {
    /// Always present.
    Include,
    /// Not part of the wire format.
    Skip,
    /// Preceded by a presence byte.
    Optional,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldDesc {
    pub name: String,
    pub ty:   TypeDesc,
    pub tag:  FieldTag,
}

impl FieldDesc {
    pub fn new(name: impl Into<String>, ty: TypeDesc) -> Self {
        FieldDesc {
            name: name.into(),
            ty,
            tag: FieldTag::Include,
        }
    }

    pub fn optional(name: impl Into<String>, ty: TypeDesc) -> Self {
        FieldDesc {
            tag: FieldTag::Optional,
            ..FieldDesc::new(name, ty)
        }
    }

    pub fn skip(name: impl Into<String>, ty: TypeDesc) -> Self {
        FieldDesc {
            tag: FieldTag::Skip,
            ..FieldDesc::new(name, ty)
        }
    }
}

impl TypeDesc {
    pub fn sequence(inner: TypeDesc) -> Self { TypeDesc::Sequence(Box::new(inner)) }

    pub fn optional(inner: TypeDesc) -> Self { TypeDesc::Optional(Box::new(inner)) }

    pub fn fixed_array(inner: TypeDesc, len: usize) -> Self { TypeDesc::FixedArray(Box::new(inner), len) }

    pub fn map(key: TypeDesc, value: TypeDesc) -> Self { TypeDesc::Map(Box::new(key), Box::new(value)) }

    /// Human readable name, used in breadcrumbs.
    pub fn type_name(&self) -> String {
        if let Some(name) = self.leaf_name() {
            return name.to_string();
        }
        match self {
            TypeDesc::FixedArray(inner, n) => format!("{}[{}]", inner.type_name(), n),
            TypeDesc::Sequence(inner) => format!("{}[]", inner.type_name()),
            TypeDesc::Map(k, v) => format!("map<{},{}>", k.type_name(), v.type_name()),
            TypeDesc::Struct(_) => "struct".to_string(),
            TypeDesc::Optional(inner) => format!("{}?", inner.type_name()),
            _ => unreachable!("leaf types are named above"),
        }
    }
}

impl Value {
    /// Look up a struct field by name.
    pub fn field(&self, name: &str) -> Option<&Value> {
        match self {
            Value::Struct(fields) => fields.iter().find(|(n, _)| n == name).map(|(_, v)| v),
            _ => None,
        }
    }

    /// Encode the value into a fresh byte vector.
    pub fn pack(&self, desc: &TypeDesc) -> ParseResult<Vec<u8>> {
        let mut out = Vec::new();
        encode(self, desc, &mut out)?;
        Ok(out)
    }
}

fn mismatch(desc: &TypeDesc, value: &Value) -> CodecError {
    CodecError::invalid(format!(
        "a value of kind [{}] cannot be encoded as [{}]",
        value.kind_name(),
        desc.type_name()
    ))
}

/// Encode a value as described by `desc`.
pub fn encode<B: Buffer>(value: &Value, desc: &TypeDesc, out: &mut B) -> ParseResult<()> {
    if let Some(result) = encode_leaf(desc, value, out) {
        return result;
    }
    match (desc, value) {
        (TypeDesc::FixedArray(inner, n), Value::Array(xs)) => {
            if xs.len() != *n {
                return Err(CodecError::SizeMismatch {
                    expected: *n,
                    actual:   xs.len(),
                });
            }
            encode_elements(xs, inner, out)
        }
        (TypeDesc::Sequence(inner), Value::Sequence(xs)) => {
            write_length(out, xs.len());
            encode_elements(xs, inner, out)
        }
        (TypeDesc::Map(key_desc, value_desc), Value::Map(pairs)) => encode_map(pairs, key_desc, value_desc, out),
        (TypeDesc::Struct(fields), Value::Struct(_)) => {
            for field in fields {
                encode_field(field, value.field(&field.name), out)
                    .context_with(|| format!("encode field [{}] of type [{}]", field.name, field.ty.type_name()))?;
            }
            Ok(())
        }
        (TypeDesc::Optional(inner), value) => encode_optional(inner, Some(value), out),
        (desc, value) => Err(mismatch(desc, value)),
    }
}

fn encode_elements<B: Buffer>(xs: &[Value], desc: &TypeDesc, out: &mut B) -> ParseResult<()> {
    for (i, x) in xs.iter().enumerate() {
        encode(x, desc, out).context_with(|| format!("encode index [{}]", i))?;
    }
    Ok(())
}

/// Pairs are written ordered by the encoding of their keys, so that the same
/// set of pairs always yields the same bytes.
fn encode_map<B: Buffer>(
    pairs: &[(Value, Value)],
    key_desc: &TypeDesc,
    value_desc: &TypeDesc,
    out: &mut B,
) -> ParseResult<()> {
    let mut encoded = Vec::with_capacity(pairs.len());
    for (i, (k, v)) in pairs.iter().enumerate() {
        let key = k.pack(key_desc).context_with(|| format!("encode key [{}]", i))?;
        let value = v.pack(value_desc).context_with(|| format!("encode value [{}]", i))?;
        encoded.push((key, value));
    }
    encoded.sort_by(|a, b| a.0.cmp(&b.0));
    if encoded.windows(2).any(|w| w[0].0 == w[1].0) {
        return Err(CodecError::invalid("Duplicate key in map."));
    }
    write_length(out, encoded.len());
    for (k, v) in encoded {
        k.as_slice().serial(out);
        v.as_slice().serial(out);
    }
    Ok(())
}

/// `None` and `Value::Optional(None)` are both absent.
fn encode_optional<B: Buffer>(inner: &TypeDesc, value: Option<&Value>, out: &mut B) -> ParseResult<()> {
    let present = match value {
        None | Some(Value::Optional(None)) => None,
        Some(Value::Optional(Some(v))) => Some(v.as_ref()),
        Some(v) => Some(v),
    };
    match present {
        None => {
            false.serial(out);
            Ok(())
        }
        Some(v) => {
            true.serial(out);
            encode(v, inner, out)
        }
    }
}

fn encode_field<B: Buffer>(field: &FieldDesc, value: Option<&Value>, out: &mut B) -> ParseResult<()> {
    match field.tag {
        FieldTag::Skip => Ok(()),
        FieldTag::Optional => encode_optional(&field.ty, value, out),
        FieldTag::Include => match value {
            Some(v) => encode(v, &field.ty, out),
            None => Err(CodecError::MissingRequiredField(field.name.clone())),
        },
    }
}

/// Decode a value as described by `desc`.
pub fn decode(source: &mut Cursor<'_>, desc: &TypeDesc) -> ParseResult<Value> {
    decode_capped(source, desc, MAX_PREALLOCATED_CAPACITY)
}

/// As [decode], but pre-allocate at most `max_prealloc` slots for any
/// sequence, whatever length its prefix announces.
pub fn decode_capped(source: &mut Cursor<'_>, desc: &TypeDesc, max_prealloc: usize) -> ParseResult<Value> {
    if let Some(result) = decode_leaf(desc, source) {
        return result;
    }
    match desc {
        TypeDesc::FixedArray(inner, n) => {
            Ok(Value::Array(decode_elements(source, inner, *n, max_prealloc)?))
        }
        TypeDesc::Sequence(inner) => {
            let len = source.read_length()?;
            Ok(Value::Sequence(decode_elements(source, inner, len, max_prealloc)?))
        }
        TypeDesc::Map(key_desc, value_desc) => {
            let len = source.read_length()?;
            let mut pairs = Vec::with_capacity(cmp::min(len, max_prealloc));
            for i in 0..len {
                let k = decode_capped(source, key_desc, max_prealloc).context_with(|| format!("decode key [{}]", i))?;
                let v = decode_capped(source, value_desc, max_prealloc)
                    .context_with(|| format!("decode value [{}]", i))?;
                pairs.push((k, v));
            }
            Ok(Value::Map(pairs))
        }
        TypeDesc::Struct(fields) => {
            let mut out = Vec::with_capacity(fields.len());
            for field in fields {
                let value = match field.tag {
                    FieldTag::Skip => continue,
                    FieldTag::Optional => decode_optional(source, &field.ty, max_prealloc),
                    FieldTag::Include => decode_capped(source, &field.ty, max_prealloc),
                }
                .context_with(|| format!("decode field [{}] of type [{}]", field.name, field.ty.type_name()))?;
                out.push((field.name.clone(), value));
            }
            Ok(Value::Struct(out))
        }
        TypeDesc::Optional(inner) => decode_optional(source, inner, max_prealloc),
        _ => unreachable!("leaf types are decoded above"),
    }
}

fn decode_elements(
    source: &mut Cursor<'_>,
    desc: &TypeDesc,
    len: usize,
    max_prealloc: usize,
) -> ParseResult<Vec<Value>> {
    let mut out = Vec::with_capacity(cmp::min(len, max_prealloc));
    for i in 0..len {
        out.push(decode_capped(source, desc, max_prealloc).context_with(|| format!("decode index [{}]", i))?);
    }
    Ok(out)
}

fn decode_optional(source: &mut Cursor<'_>, inner: &TypeDesc, max_prealloc: usize) -> ParseResult<Value> {
    if source.read_presence()? {
        Ok(Value::Optional(Some(Box::new(decode_capped(source, inner, max_prealloc)?))))
    } else {
        Ok(Value::Optional(None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serialize::to_bytes;

    fn transfer_desc() -> TypeDesc {
        TypeDesc::Struct(vec![
            FieldDesc::new("from", TypeDesc::Name),
            FieldDesc::new("to", TypeDesc::Name),
            FieldDesc::new("quantity", TypeDesc::Asset),
            FieldDesc::new("memo", TypeDesc::String),
        ])
    }

    fn transfer_value() -> Value {
        Value::Struct(vec![
            ("from".into(), Value::Name(Name::from("alice"))),
            ("to".into(), Value::Name(Name::from("bob"))),
            ("quantity".into(), Value::Asset("1.0000 EOS".parse().unwrap())),
            ("memo".into(), Value::String("hi".into())),
        ])
    }

    #[test]
    fn test_struct_matches_static_layout() {
        let bytes = transfer_value().pack(&transfer_desc()).unwrap();
        let mut expected = Vec::new();
        Name::from("alice").serial(&mut expected);
        Name::from("bob").serial(&mut expected);
        "1.0000 EOS".parse::<Asset>().unwrap().serial(&mut expected);
        "hi".serial(&mut expected);
        assert_eq!(bytes, expected);
        let decoded = decode(&mut Cursor::new(&bytes), &transfer_desc()).unwrap();
        assert_eq!(decoded, transfer_value());
    }

    #[test]
    fn test_field_order_independent_of_value_order() {
        let mut value = transfer_value();
        if let Value::Struct(fields) = &mut value {
            fields.reverse();
        }
        assert_eq!(value.pack(&transfer_desc()).unwrap(), transfer_value().pack(&transfer_desc()).unwrap());
    }

    #[test]
    fn test_missing_field_breadcrumb() {
        let value = Value::Struct(vec![("from".into(), Value::Name(Name::from("alice")))]);
        let err = value.pack(&transfer_desc()).unwrap_err();
        assert_eq!(err.path(), vec!["encode field [to] of type [name]"]);
        assert!(matches!(err.root(), CodecError::MissingRequiredField(f) if f == "to"));
    }

    #[test]
    fn test_optional_and_skip_fields() {
        let desc = TypeDesc::Struct(vec![
            FieldDesc::optional("maybe", TypeDesc::UInt16),
            FieldDesc::skip("cache", TypeDesc::UInt64),
            FieldDesc::new("last", TypeDesc::UInt8),
        ]);
        let absent = Value::Struct(vec![("last".into(), Value::UInt8(9))]);
        assert_eq!(absent.pack(&desc).unwrap(), vec![0, 9]);
        let present = Value::Struct(vec![
            ("maybe".into(), Value::UInt16(5)),
            ("cache".into(), Value::UInt64(1)),
            ("last".into(), Value::UInt8(9)),
        ]);
        let bytes = present.pack(&desc).unwrap();
        assert_eq!(bytes, vec![1, 5, 0, 9]);
        let decoded = decode(&mut Cursor::new(&bytes), &desc).unwrap();
        assert_eq!(decoded.field("maybe"), Some(&Value::Optional(Some(Box::new(Value::UInt16(5))))));
        assert_eq!(decoded.field("cache"), None, "Skipped fields are not decoded.");
        let err = decode(&mut Cursor::new(&[2, 9]), &desc).unwrap_err();
        assert!(matches!(err.root(), CodecError::InvalidValue(_)));
    }

    #[test]
    fn test_fixed_array_size() {
        let desc = TypeDesc::fixed_array(TypeDesc::UInt8, 3);
        let ok = Value::Array(vec![Value::UInt8(1), Value::UInt8(2), Value::UInt8(3)]);
        assert_eq!(ok.pack(&desc).unwrap(), vec![1, 2, 3]);
        let short = Value::Array(vec![Value::UInt8(1)]);
        assert!(matches!(short.pack(&desc).unwrap_err(), CodecError::SizeMismatch {
            expected: 3,
            actual:   1,
        }));
    }

    #[test]
    fn test_sequence_matches_vec() {
        let desc = TypeDesc::sequence(TypeDesc::UInt32);
        let value = Value::Sequence(vec![Value::UInt32(1), Value::UInt32(2)]);
        assert_eq!(value.pack(&desc).unwrap(), to_bytes(&vec![1u32, 2u32]));
        // A huge announced length fails on the data, not on allocation.
        let err = decode_capped(&mut Cursor::new(&[0xff, 0xff, 0xff, 0xff, 0x0f]), &desc, 16).unwrap_err();
        assert!(matches!(err.root(), CodecError::InsufficientData { .. }));
        assert_eq!(err.path(), vec!["decode index [0]"]);
    }

    #[test]
    fn test_map_canonical_order() {
        let desc = TypeDesc::map(TypeDesc::String, TypeDesc::UInt8);
        let a = Value::Map(vec![
            (Value::String("b".into()), Value::UInt8(2)),
            (Value::String("a".into()), Value::UInt8(1)),
        ]);
        let b = Value::Map(vec![
            (Value::String("a".into()), Value::UInt8(1)),
            (Value::String("b".into()), Value::UInt8(2)),
        ]);
        let bytes = a.pack(&desc).unwrap();
        assert_eq!(bytes, b.pack(&desc).unwrap());
        assert_eq!(bytes, vec![2, 1, b'a', 1, 1, b'b', 2]);
        let dup = Value::Map(vec![
            (Value::String("a".into()), Value::UInt8(1)),
            (Value::String("a".into()), Value::UInt8(2)),
        ]);
        assert!(dup.pack(&desc).is_err());
    }

    #[test]
    fn test_kind_mismatch() {
        let err = Value::String("x".into()).pack(&TypeDesc::UInt8).unwrap_err();
        assert!(matches!(err, CodecError::InvalidValue(_)));
        assert_eq!(TypeDesc::leaf("checksum256"), Some(TypeDesc::Checksum256));
        assert_eq!(TypeDesc::leaf("int128"), None);
        assert_eq!(TypeDesc::sequence(TypeDesc::optional(TypeDesc::Name)).type_name(), "name?[]");
    }

    #[test]
    fn test_nested_breadcrumbs() {
        let desc = TypeDesc::Struct(vec![FieldDesc::new("inner", transfer_desc())]);
        let err = decode(&mut Cursor::new(&[0u8; 20]), &desc).unwrap_err();
        assert_eq!(err.path(), vec![
            "decode field [inner] of type [struct]",
            "decode field [quantity] of type [asset]"
        ]);
    }
}

use super::{is_wide_type, Abi, FieldDef, FieldType};
use crate::{
    error::{CodecError, ParseResult, ResultExt},
    name::Name,
    serialize::{write_length, write_varuint64, Serial},
    types::{ExtendedAsset, SymbolCode},
    value::{encode, TypeDesc, Value},
};
use log::{debug, trace};
use serde::Deserialize;
use serde_json::{Map, Value as JsonValue};
use std::str::FromStr;

type Object = Map<String, JsonValue>;

/// Longest textual form of a [`Name`].
const MAX_NAME_LENGTH: usize = 12;

/// Encodes JSON into binary data, driven by an [`Abi`].
///
/// Struct-valued fields are expected as nested objects, and variant values as
/// `[type_name, value]` pairs, i.e., the shape produced by
/// [`AbiDecoder::decode_nested`](super::AbiDecoder::decode_nested).
#[derive(Debug, Clone, Copy)]
pub struct AbiEncoder<'a> {
    abi: &'a Abi,
}

impl<'a> AbiEncoder<'a> {
    pub fn new(abi: &'a Abi) -> Self {
        AbiEncoder {
            abi,
        }
    }

    pub fn encode_struct(&self, type_name: &str, value: &Object) -> ParseResult<Vec<u8>> {
        let resolved = self.abi.resolve_alias(type_name)?;
        let mut out = Vec::new();
        self.encode_struct_into(resolved, value, &mut out)?;
        Ok(out)
    }

    pub fn encode_action(&self, action: Name, value: &Object) -> ParseResult<Vec<u8>> {
        let def = self
            .abi
            .action_for_name(action)
            .ok_or_else(|| CodecError::schema(format!("action [{}] not found in ABI", action)))?;
        self.encode_struct(&def.type_name, value).context_with(|| format!("encode action [{}]", action))
    }

    pub fn encode_table_row(&self, table: Name, value: &Object) -> ParseResult<Vec<u8>> {
        let def = self
            .abi
            .table_for_name(table)
            .ok_or_else(|| CodecError::schema(format!("table [{}] not found in ABI", table)))?;
        self.encode_struct(&def.type_name, value).context_with(|| format!("encode table [{}]", table))
    }

    /// Encode a value of any type expression, including variants, arrays and
    /// leaf types.
    pub fn encode_value(&self, type_name: &str, value: &JsonValue) -> ParseResult<Vec<u8>> {
        let mut out = Vec::new();
        self.encode_type(FieldType::parse(type_name), value, type_name, &mut out)?;
        Ok(out)
    }

    fn encode_struct_into(&self, type_name: &str, value: &Object, out: &mut Vec<u8>) -> ParseResult<()> {
        let def = self
            .abi
            .find_struct(type_name)
            .ok_or_else(|| CodecError::schema(format!("struct [{}] not found in ABI", type_name)))?;
        debug!("encode struct [{}]", def.name);
        // The chain ends with `def` itself.
        let chain = self.abi.base_chain(def)?;
        for base in &chain[..chain.len() - 1] {
            self.encode_fields(&base.fields, value, out)
                .context_with(|| format!("encode base [{}] of struct [{}]", base.name, def.name))?;
        }
        self.encode_fields(&def.fields, value, out)
    }

    fn encode_fields(&self, fields: &[FieldDef], value: &Object, out: &mut Vec<u8>) -> ParseResult<()> {
        for field in fields {
            self.encode_field(field, value.get(&field.name), out)
                .context_with(|| format!("encode field [{}] of type [{}]", field.name, field.type_name))?;
        }
        Ok(())
    }

    fn encode_field(&self, field: &FieldDef, value: Option<&JsonValue>, out: &mut Vec<u8>) -> ParseResult<()> {
        let ty = FieldType::parse(&field.type_name);
        match value {
            None if ty.binary_extension => {
                debug!("binary extension field [{}] is absent", field.name);
                Ok(())
            }
            None | Some(JsonValue::Null) if ty.optional => {
                debug!("optional field [{}] is absent", field.name);
                false.serial(out);
                Ok(())
            }
            None => Err(CodecError::MissingRequiredField(field.name.clone())),
            Some(v) => {
                if ty.optional {
                    true.serial(out);
                }
                self.encode_type(ty.required(), v, &field.name, out)
            }
        }
    }

    fn encode_type(
        &self,
        ty: FieldType<'_>,
        value: &JsonValue,
        field: &str,
        out: &mut Vec<u8>,
    ) -> ParseResult<()> {
        if ty.optional {
            if value.is_null() {
                false.serial(out);
                return Ok(());
            }
            true.serial(out);
            return self.encode_type(ty.required(), value, field, out);
        }
        if ty.array || ty.fixed.is_some() {
            let xs = value
                .as_array()
                .ok_or_else(|| CodecError::invalid(format!("expected an array for [{}], got {}", field, value)))?;
            match ty.fixed {
                Some(n) if n != xs.len() => {
                    return Err(CodecError::SizeMismatch {
                        expected: n,
                        actual:   xs.len(),
                    });
                }
                Some(_) => {}
                None => write_length(out, xs.len()),
            }
            let elem = FieldType::parse(ty.base);
            for (i, x) in xs.iter().enumerate() {
                self.encode_type(elem, x, field, out).context_with(|| format!("encode index [{}]", i))?;
            }
            return Ok(());
        }

        let resolved = self.abi.resolve_alias(ty.base)?;
        if resolved != ty.base {
            return self.encode_type(FieldType::parse(resolved), value, field, out);
        }
        if let Some(variant) = self.abi.find_variant(resolved) {
            let (selected, inner) = match value.as_array().map(Vec::as_slice) {
                Some([JsonValue::String(selected), inner]) => (selected, inner),
                _ => {
                    return Err(CodecError::invalid(format!(
                        "expected a [type, value] pair for variant [{}], got {}",
                        variant.name, value
                    )));
                }
            };
            let index = variant.types.iter().position(|t| t == selected).ok_or_else(|| {
                CodecError::invalid(format!("[{}] is not an alternative of variant [{}]", selected, variant.name))
            })?;
            write_varuint64(out, index as u64);
            return self.encode_type(FieldType::parse(selected), inner, field, out);
        }
        if self.abi.find_struct(resolved).is_some() {
            let object = value
                .as_object()
                .ok_or_else(|| CodecError::invalid(format!("expected an object for [{}], got {}", field, value)))?;
            return self.encode_struct_into(resolved, object, out);
        }
        self.encode_leaf(resolved, value, field, out)
    }

    fn encode_leaf(&self, type_name: &str, value: &JsonValue, field: &str, out: &mut Vec<u8>) -> ParseResult<()> {
        let Some(desc) = TypeDesc::leaf(type_name) else {
            if is_wide_type(type_name) {
                return Err(CodecError::UnsupportedType(type_name.to_string()));
            }
            return Err(CodecError::UnknownType {
                field:     field.to_string(),
                type_name: type_name.to_string(),
            });
        };
        trace!("write [{}] of type [{}]: {}", field, type_name, value);
        let value = json_to_leaf(&desc, value)?;
        encode(&value, &desc, out)
    }
}

/// Convert the JSON form of a leaf type into a [`Value`].
fn json_to_leaf(desc: &TypeDesc, json: &JsonValue) -> ParseResult<Value> {
    let value = match desc {
        TypeDesc::Bool => Value::Bool(json_to_bool(json)?),
        TypeDesc::Int8 => Value::Int8(json_to_integer(json)?),
        TypeDesc::UInt8 => Value::UInt8(json_to_integer(json)?),
        TypeDesc::Int16 => Value::Int16(json_to_integer(json)?),
        TypeDesc::UInt16 => Value::UInt16(json_to_integer(json)?),
        TypeDesc::Int32 => Value::Int32(json_to_integer(json)?),
        TypeDesc::UInt32 => Value::UInt32(json_to_integer(json)?),
        TypeDesc::Int64 => Value::Int64(json_to_integer(json)?),
        TypeDesc::UInt64 => Value::UInt64(json_to_integer(json)?),
        TypeDesc::VarInt32 => Value::VarInt32(crate::VarInt32(json_to_integer(json)?)),
        TypeDesc::VarUint32 => Value::VarUint32(crate::VarUint32(json_to_integer(json)?)),
        TypeDesc::Float32 => Value::Float32(json_to_float(json)? as f32),
        TypeDesc::Float64 => Value::Float64(json_to_float(json)?),
        TypeDesc::TimePoint => Value::TimePoint(parse_str(json)?),
        TypeDesc::TimePointSec => Value::TimePointSec(parse_str(json)?),
        TypeDesc::BlockTimestamp => Value::BlockTimestamp(parse_str(json)?),
        TypeDesc::Name => {
            let s = as_str(json)?;
            if s.len() > MAX_NAME_LENGTH {
                return Err(CodecError::invalid(format!(
                    "name [{}] is longer than {} characters",
                    s, MAX_NAME_LENGTH
                )));
            }
            Value::Name(Name::from(s))
        }
        TypeDesc::Bytes => Value::Bytes(parse_str(json)?),
        TypeDesc::String => Value::String(as_str(json)?.to_string()),
        TypeDesc::Checksum160 => Value::Checksum160(parse_str(json)?),
        TypeDesc::Checksum256 => Value::Checksum256(parse_str(json)?),
        TypeDesc::Checksum512 => Value::Checksum512(parse_str(json)?),
        TypeDesc::PublicKey => Value::PublicKey(parse_str(json)?),
        TypeDesc::Signature => Value::Signature(parse_str(json)?),
        TypeDesc::Symbol => Value::Symbol(parse_str(json)?),
        TypeDesc::SymbolCode => match json {
            JsonValue::Number(_) => Value::SymbolCode(SymbolCode(json_to_integer(json)?)),
            _ => Value::SymbolCode(parse_str(json)?),
        },
        TypeDesc::Asset => Value::Asset(parse_str(json)?),
        TypeDesc::ExtendedAsset => Value::ExtendedAsset(
            ExtendedAsset::deserialize(json).map_err(|e| CodecError::invalid(format!("bad extended asset: {}", e)))?,
        ),
        other => return Err(CodecError::invalid(format!("[{}] is not a leaf type", other.type_name()))),
    };
    Ok(value)
}

fn as_str(json: &JsonValue) -> ParseResult<&str> {
    json.as_str().ok_or_else(|| CodecError::invalid(format!("expected a string, got {}", json)))
}

fn parse_str<T: FromStr<Err = CodecError>>(json: &JsonValue) -> ParseResult<T> { as_str(json)?.parse() }

/// Numbers and decimal strings are accepted. The value must fit in `T`.
fn json_to_integer<T: TryFrom<i128>>(json: &JsonValue) -> ParseResult<T> {
    let wide = match json {
        JsonValue::Number(n) => n
            .as_i64()
            .map(i128::from)
            .or_else(|| n.as_u64().map(i128::from))
            .ok_or_else(|| CodecError::invalid(format!("expected an integer, got {}", n)))?,
        JsonValue::String(s) => s
            .trim()
            .parse::<i128>()
            .map_err(|e| CodecError::invalid(format!("expected an integer, got [{}]: {}", s, e)))?,
        other => return Err(CodecError::invalid(format!("expected an integer, got {}", other))),
    };
    T::try_from(wide).map_err(|_| {
        CodecError::invalid(format!("{} is out of range for {}", wide, std::any::type_name::<T>()))
    })
}

/// `true`/`false`, or `0`/`1` as produced in nodeos mode.
fn json_to_bool(json: &JsonValue) -> ParseResult<bool> {
    match json {
        JsonValue::Bool(b) => Ok(*b),
        JsonValue::Number(_) => match json_to_integer::<u8>(json)? {
            0 => Ok(false),
            1 => Ok(true),
            n => Err(CodecError::invalid(format!("expected a boolean, got {}", n))),
        },
        JsonValue::String(s) if s == "true" => Ok(true),
        JsonValue::String(s) if s == "false" => Ok(false),
        other => Err(CodecError::invalid(format!("expected a boolean, got {}", other))),
    }
}

/// Numbers, and the strings written for floats in nodeos mode or for
/// non-finite values.
fn json_to_float(json: &JsonValue) -> ParseResult<f64> {
    match json {
        JsonValue::Number(n) => {
            n.as_f64().ok_or_else(|| CodecError::invalid(format!("expected a number, got {}", n)))
        }
        JsonValue::String(s) => match s.as_str() {
            "inf" => Ok(f64::INFINITY),
            "-inf" => Ok(f64::NEG_INFINITY),
            "nan" => Ok(f64::NAN),
            s => s.parse().map_err(|e| CodecError::invalid(format!("expected a number, got [{}]: {}", s, e))),
        },
        other => Err(CodecError::invalid(format!("expected a number, got {}", other))),
    }
}

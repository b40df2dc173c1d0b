use super::{is_wide_type, Abi, AbiCodecOptions, FieldDef, FieldType};
use crate::{
    error::{CodecError, ParseResult, ResultExt},
    name::Name,
    serialize::Cursor,
    value::{decode_capped, TypeDesc, Value},
};
use log::{debug, trace};
use serde_json::{json, Map, Value as JsonValue};
use std::cmp;

type Object = Map<String, JsonValue>;

/// Decodes binary data into JSON, driven by an [`Abi`].
#[derive(Debug, Clone, Copy)]
pub struct AbiDecoder<'a> {
    abi:     &'a Abi,
    options: AbiCodecOptions,
}

/// How struct-valued fields appear in the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    /// Fields of the inner struct are spliced into the outer object.
    Flat,
    /// The inner struct is an object under the field name.
    Nested,
}

impl<'a> AbiDecoder<'a> {
    pub fn new(abi: &'a Abi) -> Self {
        AbiDecoder {
            abi,
            options: AbiCodecOptions::default(),
        }
    }

    pub fn with_options(self, options: AbiCodecOptions) -> Self {
        AbiDecoder {
            options,
            ..self
        }
    }

    /// Decode a struct. Fields of struct type are spliced into the result.
    pub fn decode_struct(&self, type_name: &str, data: &[u8]) -> ParseResult<Object> {
        self.decode_top(type_name, data, Shape::Flat)
    }

    /// Decode a struct keeping struct-valued fields as nested objects. The
    /// result is accepted by [`AbiEncoder`](super::AbiEncoder).
    pub fn decode_nested(&self, type_name: &str, data: &[u8]) -> ParseResult<Object> {
        self.decode_top(type_name, data, Shape::Nested)
    }

    /// Decode the payload of an action defined in the ABI.
    pub fn decode_action(&self, action: Name, data: &[u8]) -> ParseResult<Object> {
        let def = self
            .abi
            .action_for_name(action)
            .ok_or_else(|| CodecError::schema(format!("action [{}] not found in ABI", action)))?;
        self.decode_struct(&def.type_name, data).context_with(|| format!("decode action [{}]", action))
    }

    /// Decode a row of a table defined in the ABI.
    pub fn decode_table_row(&self, table: Name, data: &[u8]) -> ParseResult<Object> {
        let def = self
            .abi
            .table_for_name(table)
            .ok_or_else(|| CodecError::schema(format!("table [{}] not found in ABI", table)))?;
        self.decode_struct(&def.type_name, data).context_with(|| format!("decode table [{}]", table))
    }

    /// Decode the return value of an action. The result type need not be a
    /// struct, so any JSON value may be returned.
    pub fn decode_action_result(&self, action: Name, data: &[u8]) -> ParseResult<JsonValue> {
        let def = self
            .abi
            .action_result_for_name(action)
            .ok_or_else(|| CodecError::schema(format!("action result [{}] not found in ABI", action)))?;
        let mut source = Cursor::new(data);
        self.decode_type(&mut source, FieldType::parse(&def.result_type), &def.result_type)
            .context_with(|| format!("decode action result [{}]", action))
    }

    fn decode_top(&self, type_name: &str, data: &[u8], shape: Shape) -> ParseResult<Object> {
        let mut source = Cursor::new(data);
        let mut resolved = self.abi.resolve_alias(type_name)?;
        if let Some(variant) = self.abi.find_variant(resolved) {
            let index = source.read_varuint32()? as usize;
            let selected = variant.types.get(index).ok_or_else(|| {
                CodecError::invalid(format!("variant [{}] has no alternative {}", variant.name, index))
            })?;
            debug!("variant [{}] selects [{}]", variant.name, selected);
            resolved = self.abi.resolve_alias(selected)?;
        }
        let mut out = Object::new();
        self.decode_struct_into(&mut source, resolved, &mut out, shape)?;
        Ok(out)
    }

    fn decode_struct_into(
        &self,
        source: &mut Cursor<'_>,
        type_name: &str,
        out: &mut Object,
        shape: Shape,
    ) -> ParseResult<()> {
        let def = self
            .abi
            .find_struct(type_name)
            .ok_or_else(|| CodecError::schema(format!("struct [{}] not found in ABI", type_name)))?;
        debug!("decode struct [{}]", def.name);
        // The chain ends with `def` itself.
        let chain = self.abi.base_chain(def)?;
        for base in &chain[..chain.len() - 1] {
            self.decode_fields(source, &base.fields, out, shape)
                .context_with(|| format!("decode base [{}] of struct [{}]", base.name, def.name))?;
        }
        self.decode_fields(source, &def.fields, out, shape)
    }

    fn decode_fields(
        &self,
        source: &mut Cursor<'_>,
        fields: &[FieldDef],
        out: &mut Object,
        shape: Shape,
    ) -> ParseResult<()> {
        for field in fields {
            self.decode_field(source, field, out, shape)
                .context_with(|| format!("decode field [{}] of type [{}]", field.name, field.type_name))?;
        }
        Ok(())
    }

    fn decode_field(
        &self,
        source: &mut Cursor<'_>,
        field: &FieldDef,
        out: &mut Object,
        shape: Shape,
    ) -> ParseResult<()> {
        let ty = FieldType::parse(&field.type_name);
        if ty.binary_extension && !source.has_remaining() {
            debug!("binary extension field [{}] is absent", field.name);
            return Ok(());
        }
        if ty.optional && !source.read_presence()? {
            debug!("optional field [{}] is absent", field.name);
            if self.options.fit_nodeos {
                out.insert(field.name.clone(), JsonValue::Null);
            }
            return Ok(());
        }
        let ty = ty.required();
        if shape == Shape::Flat && !ty.array && ty.fixed.is_none() {
            let resolved = self.abi.resolve_alias(ty.base)?;
            if self.abi.find_struct(resolved).is_some() {
                return self.decode_struct_into(source, resolved, out, shape);
            }
        }
        let value = self.decode_type(source, ty, &field.name)?;
        out.insert(field.name.clone(), value);
        Ok(())
    }

    /// Decode a single value of the given type. Structs inside are always
    /// nested.
    fn decode_type(&self, source: &mut Cursor<'_>, ty: FieldType<'_>, field: &str) -> ParseResult<JsonValue> {
        if ty.binary_extension && !source.has_remaining() {
            return Ok(JsonValue::Null);
        }
        if ty.optional {
            if !source.read_presence()? {
                return Ok(JsonValue::Null);
            }
            return self.decode_type(source, ty.required(), field);
        }
        if ty.array {
            let len = source.read_length()?;
            return self.decode_elements(source, ty.base, len, field);
        }
        if let Some(len) = ty.fixed {
            return self.decode_elements(source, ty.base, len, field);
        }

        let resolved = self.abi.resolve_alias(ty.base)?;
        if resolved != ty.base {
            debug!("type [{}] is an alias of [{}]", ty.base, resolved);
            // The alias target may itself carry modifiers.
            return self.decode_type(source, FieldType::parse(resolved), field);
        }
        if let Some(variant) = self.abi.find_variant(resolved) {
            let index = source.read_varuint32()? as usize;
            let selected = variant.types.get(index).ok_or_else(|| {
                CodecError::invalid(format!("variant [{}] has no alternative {}", variant.name, index))
            })?;
            let value = self.decode_type(source, FieldType::parse(selected), field)?;
            return Ok(json!([selected, value]));
        }
        if self.abi.find_struct(resolved).is_some() {
            let mut inner = Object::new();
            self.decode_struct_into(source, resolved, &mut inner, Shape::Nested)?;
            return Ok(JsonValue::Object(inner));
        }
        self.decode_leaf(source, resolved, field)
    }

    fn decode_elements(
        &self,
        source: &mut Cursor<'_>,
        elem: &str,
        len: usize,
        field: &str,
    ) -> ParseResult<JsonValue> {
        let elem_ty = FieldType::parse(elem);
        let mut xs = Vec::with_capacity(cmp::min(len, self.options.max_array_preallocation));
        for i in 0..len {
            xs.push(self.decode_type(source, elem_ty, field).context_with(|| format!("decode index [{}]", i))?);
        }
        Ok(JsonValue::Array(xs))
    }

    fn decode_leaf(&self, source: &mut Cursor<'_>, type_name: &str, field: &str) -> ParseResult<JsonValue> {
        let Some(desc) = TypeDesc::leaf(type_name) else {
            if is_wide_type(type_name) {
                return Err(CodecError::UnsupportedType(type_name.to_string()));
            }
            return Err(CodecError::UnknownType {
                field:     field.to_string(),
                type_name: type_name.to_string(),
            });
        };
        let value = decode_capped(source, &desc, self.options.max_array_preallocation)?;
        trace!("read [{}] of type [{}]: {:?}", field, type_name, value);
        self.leaf_to_json(value)
    }

    fn leaf_to_json(&self, value: Value) -> ParseResult<JsonValue> {
        let fit = self.options.fit_nodeos;
        let out = match value {
            Value::Bool(b) if fit => json!(u8::from(b)),
            Value::Bool(b) => json!(b),
            Value::Int8(x) => json!(x),
            Value::UInt8(x) => json!(x),
            Value::Int16(x) => json!(x),
            Value::UInt16(x) => json!(x),
            Value::Int32(x) => json!(x),
            Value::UInt32(x) => json!(x),
            Value::Int64(x) => json!(x),
            Value::UInt64(x) => json!(x),
            Value::VarInt32(x) => json!(x.0),
            Value::VarUint32(x) => json!(x.0),
            Value::Float32(x) => float_to_json(f64::from(x), &x.to_string(), fit),
            Value::Float64(x) => float_to_json(x, &x.to_string(), fit),
            Value::TimePoint(t) => json!(t.format(fit)?),
            Value::TimePointSec(t) => json!(t.to_string()),
            Value::BlockTimestamp(t) => json!(t.format(fit)?),
            Value::Name(x) => json!(x.to_string()),
            Value::Bytes(x) => json!(x.to_string()),
            Value::String(x) => json!(x),
            Value::Checksum160(x) => json!(x.to_string()),
            Value::Checksum256(x) => json!(x.to_string()),
            Value::Checksum512(x) => json!(x.to_string()),
            Value::PublicKey(x) => json!(x.to_string()),
            Value::Signature(x) => json!(x.to_string()),
            Value::Symbol(x) => json!(x.to_string()),
            Value::SymbolCode(x) => json!(x.to_string()),
            Value::Asset(x) => json!(x.to_string()),
            Value::ExtendedAsset(x) => json!({
                "quantity": x.quantity.to_string(),
                "contract": x.contract.to_string(),
            }),
            other => {
                return Err(CodecError::invalid(format!("[{}] is not a leaf value", other.kind_name())));
            }
        };
        Ok(out)
    }
}

/// Non-finite values have no JSON number form and are written as strings.
/// `shortest` is the shortest text that reads back as the same value at the
/// original width.
fn float_to_json(x: f64, shortest: &str, fit_nodeos: bool) -> JsonValue {
    if x.is_nan() {
        json!("nan")
    } else if x.is_infinite() {
        json!(if x > 0.0 { "inf" } else { "-inf" })
    } else if fit_nodeos {
        json!(format!("{:.17}", x))
    } else {
        shortest
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map_or_else(|| json!(shortest), JsonValue::Number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serialize::{to_bytes, write_varuint64, Serial};

    fn abi() -> Abi {
        r#"{
            "types": [{"new_type_name": "weight", "type": "uint16"}],
            "structs": [
                {"name": "flags", "base": "", "fields": [
                    {"name": "on", "type": "bool"},
                    {"name": "ratio", "type": "float32"},
                    {"name": "when", "type": "time_point"},
                    {"name": "slot", "type": "block_timestamp_type"},
                    {"name": "note", "type": "string?"}
                ]},
                {"name": "pair", "base": "", "fields": [
                    {"name": "w", "type": "weight"},
                    {"name": "big", "type": "uint128"}
                ]},
                {"name": "holder", "base": "", "fields": [
                    {"name": "choice", "type": "choice"},
                    {"name": "sums", "type": "checksum160[2]"}
                ]}
            ],
            "variants": [{"name": "choice", "types": ["uint8", "string"]}],
            "action_results": [{"name": "total", "result_type": "weight"}]
        }"#
        .parse()
        .unwrap()
    }

    fn flags_bytes() -> Vec<u8> {
        let mut out = Vec::new();
        true.serial(&mut out);
        1.5f32.serial(&mut out);
        1_529_090_267_000_000u64.serial(&mut out);
        // 2018-06-15T19:17:47.500
        1_164_810_935u32.serial(&mut out);
        false.serial(&mut out);
        out
    }

    #[test]
    fn test_default_rendering() {
        let abi = abi();
        let out = AbiDecoder::new(&abi).decode_struct("flags", &flags_bytes()).unwrap();
        assert_eq!(
            JsonValue::Object(out),
            json!({
                "on": true,
                "ratio": 1.5,
                "when": "2018-06-15T19:17:47",
                "slot": "2018-06-15T19:17:47.5",
            }),
            "Absent optionals are omitted by default."
        );
    }

    #[test]
    fn test_fit_nodeos_rendering() {
        let abi = abi();
        let options = AbiCodecOptions {
            fit_nodeos: true,
            ..AbiCodecOptions::default()
        };
        let out = AbiDecoder::new(&abi).with_options(options).decode_struct("flags", &flags_bytes()).unwrap();
        assert_eq!(
            JsonValue::Object(out),
            json!({
                "on": 1,
                "ratio": "1.50000000000000000",
                "when": "2018-06-15T19:17:47.000",
                "slot": "2018-06-15T19:17:47.500",
                "note": null,
            })
        );
    }

    #[test]
    fn test_wide_types_unsupported() {
        let abi = abi();
        let err = AbiDecoder::new(&abi).decode_struct("pair", &[1, 0, 0, 0]).unwrap_err();
        assert!(matches!(err.root(), CodecError::UnsupportedType(t) if t == "uint128"));
        assert_eq!(err.path(), vec!["decode field [big] of type [uint128]"]);
    }

    #[test]
    fn test_variant_and_fixed_array() {
        let abi = abi();
        let mut data = Vec::new();
        write_varuint64(&mut data, 1);
        "hey".serial(&mut data);
        data.extend_from_slice(&[0xaa; 40]);
        let out = AbiDecoder::new(&abi).decode_struct("holder", &data).unwrap();
        assert_eq!(out["choice"], json!(["string", "hey"]));
        assert_eq!(out["sums"], json!(["aa".repeat(20), "aa".repeat(20)]));
        let err = AbiDecoder::new(&abi).decode_struct("holder", &[7]).unwrap_err();
        assert!(matches!(err.root(), CodecError::InvalidValue(_)));
    }

    #[test]
    fn test_action_result_is_any_value() {
        let abi = abi();
        let out = AbiDecoder::new(&abi).decode_action_result("total".into(), &to_bytes(&300u16)).unwrap();
        assert_eq!(out, json!(300));
        assert!(AbiDecoder::new(&abi).decode_action_result("other".into(), &[]).is_err());
    }

    #[test]
    fn test_special_floats() {
        assert_eq!(float_to_json(f64::NAN, "NaN", false), json!("nan"));
        assert_eq!(float_to_json(f64::NEG_INFINITY, "-inf", true), json!("-inf"));
        assert_eq!(float_to_json(f64::from(1.1f32), &1.1f32.to_string(), false), json!(1.1));
    }
}

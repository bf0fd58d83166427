use crate::codec::Context;
use crate::converter::Converter;
use crate::error::CodecError;
use crate::json::JsonValue;
use crate::types::{Primitive, Ty};
use crate::value::Value;

const NAN: &str = "NaN";
const INFINITY: &str = "Infinity";
const NEG_INFINITY: &str = "-Infinity";

/// `bool`, the sized integers, `float32`/`float64`, `char` and `string`.
pub struct PrimitiveConverter;

fn primitive_of(ty: &Ty) -> Result<Primitive, CodecError> {
    match ty {
        Ty::Primitive(p) => Ok(*p),
        other => Err(CodecError::mismatch("primitive type", other)),
    }
}

fn check_range(p: Primitive, n: i64) -> Result<i64, CodecError> {
    match p.int_range() {
        Some((min, max)) if n < min || n > max => Err(CodecError::mismatch(
            p.name(),
            format!("{n} (out of range)"),
        )),
        _ => Ok(n),
    }
}

fn read_int(p: Primitive, json: &JsonValue) -> Result<i64, CodecError> {
    let n = match json {
        JsonValue::Int64(n) => *n,
        JsonValue::String(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| CodecError::mismatch(p.name(), format!("string {s:?}")))?,
        JsonValue::Double(d) if d.fract() == 0.0 && d.abs() < 9.007_199_254_740_992e15 => {
            *d as i64
        }
        other => return Err(CodecError::mismatch(p.name(), other.kind_name())),
    };
    check_range(p, n)
}

fn read_float(p: Primitive, json: &JsonValue) -> Result<f64, CodecError> {
    let n = match json {
        JsonValue::String(s) => match s.as_str() {
            NAN => f64::NAN,
            INFINITY => f64::INFINITY,
            NEG_INFINITY => f64::NEG_INFINITY,
            _ => return Err(CodecError::mismatch(p.name(), format!("string {s:?}"))),
        },
        other => other
            .as_number()
            .map_err(|_| CodecError::mismatch(p.name(), other.kind_name()))?,
    };
    Ok(if p == Primitive::Float32 {
        f64::from(n as f32)
    } else {
        n
    })
}

fn write_float(n: f64) -> JsonValue {
    if n.is_nan() {
        JsonValue::from(NAN)
    } else if n.is_infinite() {
        JsonValue::from(if n > 0.0 { INFINITY } else { NEG_INFINITY })
    } else {
        JsonValue::Double(n)
    }
}

impl Converter for PrimitiveConverter {
    fn name(&self) -> &str {
        "primitive"
    }

    fn can_process(&self, ty: &Ty) -> bool {
        matches!(ty, Ty::Primitive(_))
    }

    fn try_serialize(
        &self,
        cx: &mut Context<'_>,
        value: &Value,
        ty: &Ty,
    ) -> Result<JsonValue, CodecError> {
        let p = primitive_of(ty)?;
        match (p, value) {
            (Primitive::Bool, Value::Bool(b)) => Ok(JsonValue::Boolean(*b)),
            (Primitive::Int64, Value::Int(n)) if cx.config().int64_as_string => {
                Ok(JsonValue::String(n.to_string()))
            }
            (_, Value::Int(n)) if p.int_range().is_some() => {
                Ok(JsonValue::Int64(check_range(p, *n)?))
            }
            (Primitive::Float32 | Primitive::Float64, Value::Float(n)) => Ok(write_float(*n)),
            (Primitive::Float32 | Primitive::Float64, Value::Int(n)) => {
                Ok(JsonValue::Double(*n as f64))
            }
            (Primitive::Char, Value::Char(c)) => Ok(JsonValue::String(c.to_string())),
            (Primitive::String, Value::String(s)) => Ok(JsonValue::String(s.clone())),
            (_, other) => Err(CodecError::mismatch(p.name(), other.kind_name())),
        }
    }

    fn try_deserialize(
        &self,
        _cx: &mut Context<'_>,
        json: &JsonValue,
        ty: &Ty,
        instance: &mut Value,
    ) -> Result<(), CodecError> {
        let p = primitive_of(ty)?;
        *instance = match p {
            Primitive::Bool => Value::Bool(json.as_bool()?),
            Primitive::Float32 | Primitive::Float64 => Value::Float(read_float(p, json)?),
            Primitive::Char => {
                let s = json.as_str()?;
                let mut chars = s.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Value::Char(c),
                    _ => return Err(CodecError::mismatch("char", format!("string {s:?}"))),
                }
            }
            Primitive::String => Value::String(json.as_str()?.to_string()),
            _ => Value::Int(read_int(p, json)?),
        };
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::config::CodecConfig;
    use crate::converters::test_support::{codec_with, from_json, plain_codec, to_json};
    use crate::error::CodecError;
    use crate::json::JsonValue;
    use crate::registry::TypeRegistry;
    use crate::value::Value;

    #[test]
    fn test_scalars_round_trip() {
        let codec = plain_codec();
        let cases = [
            ("bool", Value::Bool(true), JsonValue::Boolean(true)),
            ("int64", Value::Int(42), JsonValue::Int64(42)),
            ("uint8", Value::Int(255), JsonValue::Int64(255)),
            ("float64", Value::Float(1.5), JsonValue::Double(1.5)),
            ("char", Value::Char('z'), JsonValue::from("z")),
            ("string", Value::from("hello"), JsonValue::from("hello")),
        ];
        for (ty, value, json) in cases {
            assert_eq!(to_json(&codec, ty, value.clone()), json, "{ty}");
            assert_eq!(from_json(&codec, ty, json), value, "{ty}");
        }
    }

    #[test]
    fn test_integer_range_checked() {
        let codec = plain_codec();
        let outcome = codec.deserialize("int8", &JsonValue::Int64(200));
        assert!(matches!(
            outcome.errors().next(),
            Some(CodecError::TypeMismatch { expected, .. }) if expected == "int8"
        ));
        assert!(codec.deserialize("uint16", &JsonValue::Int64(-1)).failed());
        assert!(codec.serialize("uint8", &Value::Int(256)).failed());
    }

    #[test]
    fn test_lenient_number_reads() {
        let codec = plain_codec();
        assert_eq!(
            from_json(&codec, "float64", JsonValue::Int64(3)),
            Value::Float(3.0)
        );
        assert_eq!(
            from_json(&codec, "int32", JsonValue::from("-17")),
            Value::Int(-17)
        );
        assert_eq!(
            from_json(&codec, "int32", JsonValue::Double(4.0)),
            Value::Int(4)
        );
        assert!(codec.deserialize("int32", &JsonValue::Double(4.5)).failed());
        assert!(codec.deserialize("int32", &JsonValue::from("four")).failed());
    }

    #[test]
    fn test_non_finite_floats() {
        let codec = plain_codec();
        assert_eq!(
            to_json(&codec, "float64", Value::Float(f64::INFINITY)),
            JsonValue::from("Infinity")
        );
        match from_json(&codec, "float32", JsonValue::from("NaN")) {
            Value::Float(n) => assert!(n.is_nan()),
            other => panic!("Expected float, got {other:?}"),
        }
        assert_eq!(
            from_json(&codec, "float64", JsonValue::from("-Infinity")),
            Value::Float(f64::NEG_INFINITY)
        );
    }

    #[test]
    fn test_int64_as_string() {
        let config = CodecConfig {
            int64_as_string: true,
            ..CodecConfig::default()
        };
        let codec = codec_with(TypeRegistry::new(), config);
        let big = Value::Int(9_007_199_254_740_993);
        let json = to_json(&codec, "int64", big.clone());
        assert_eq!(json, JsonValue::from("9007199254740993"));
        assert_eq!(from_json(&codec, "int64", json), big);
        assert_eq!(to_json(&codec, "int32", Value::Int(1)), JsonValue::Int64(1));
    }

    #[test]
    fn test_wrong_shapes() {
        let codec = plain_codec();
        assert!(codec.deserialize("bool", &JsonValue::Int64(1)).failed());
        assert!(codec.deserialize("char", &JsonValue::from("ab")).failed());
        assert!(codec.serialize("string", &Value::Int(1)).failed());
    }
}

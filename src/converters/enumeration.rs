use crate::codec::Context;
use crate::converter::Converter;
use crate::error::CodecError;
use crate::json::JsonValue;
use crate::registry::EnumDef;
use crate::types::Ty;
use crate::value::Value;
use std::sync::Arc;

/// Enums by variant name, or by ordinal when `enums_as_integer` is set.
/// Reads accept either form.
pub struct EnumConverter;

fn enum_of(ty: &Ty) -> Result<&Arc<EnumDef>, CodecError> {
    match ty {
        Ty::Enum(def) => Ok(def),
        other => Err(CodecError::mismatch("enum type", other)),
    }
}

impl Converter for EnumConverter {
    fn name(&self) -> &str {
        "enum"
    }

    fn can_process(&self, ty: &Ty) -> bool {
        matches!(ty, Ty::Enum(_))
    }

    fn try_serialize(
        &self,
        cx: &mut Context<'_>,
        value: &Value,
        ty: &Ty,
    ) -> Result<JsonValue, CodecError> {
        let def = enum_of(ty)?;
        let Value::Enum(e) = value else {
            return Err(CodecError::mismatch(&def.name, value.kind_name()));
        };
        if e.enum_name != def.name {
            return Err(CodecError::mismatch(&def.name, &e.enum_name));
        }
        let ordinal = def
            .ordinal(&e.variant)
            .ok_or_else(|| CodecError::mismatch(&def.name, format!("variant `{}`", e.variant)))?;
        if cx.config().enums_as_integer {
            Ok(JsonValue::Int64(ordinal as i64))
        } else {
            Ok(JsonValue::String(e.variant.clone()))
        }
    }

    fn try_deserialize(
        &self,
        _cx: &mut Context<'_>,
        json: &JsonValue,
        ty: &Ty,
        instance: &mut Value,
    ) -> Result<(), CodecError> {
        let def = enum_of(ty)?;
        let variant = match json {
            JsonValue::String(name) => def.variants.iter().find(|v| *v == name),
            JsonValue::Int64(n) => usize::try_from(*n).ok().and_then(|i| def.variants.get(i)),
            other => return Err(CodecError::mismatch(&def.name, other.kind_name())),
        };
        let variant = variant
            .ok_or_else(|| CodecError::mismatch(&def.name, format!("variant {json}")))?;
        *instance = Value::enumeration(def.name.as_str(), variant.as_str());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::config::CodecConfig;
    use crate::converters::test_support::{codec_with, from_json, to_json};
    use crate::json::JsonValue;
    use crate::registry::{EnumDef, TypeRegistry};
    use crate::value::Value;

    fn registry() -> TypeRegistry {
        let registry = TypeRegistry::new();
        registry
            .register(EnumDef::new("Level", ["Low", "Mid", "High"]))
            .unwrap();
        registry
    }

    #[test]
    fn test_by_name() {
        let codec = codec_with(registry(), CodecConfig::default());
        let high = Value::enumeration("Level", "High");
        assert_eq!(to_json(&codec, "Level", high.clone()), JsonValue::from("High"));
        assert_eq!(from_json(&codec, "Level", JsonValue::from("High")), high);
        assert_eq!(from_json(&codec, "Level", JsonValue::Int64(1)), Value::enumeration("Level", "Mid"));
    }

    #[test]
    fn test_by_ordinal() {
        let config = CodecConfig {
            enums_as_integer: true,
            ..CodecConfig::default()
        };
        let codec = codec_with(registry(), config);
        assert_eq!(
            to_json(&codec, "Level", Value::enumeration("Level", "High")),
            JsonValue::Int64(2)
        );
    }

    #[test]
    fn test_unknown_variants() {
        let codec = codec_with(registry(), CodecConfig::default());
        assert!(codec.deserialize("Level", &JsonValue::from("Max")).failed());
        assert!(codec.deserialize("Level", &JsonValue::Int64(3)).failed());
        assert!(codec.deserialize("Level", &JsonValue::Int64(-1)).failed());
        assert!(codec
            .serialize("Level", &Value::enumeration("Level", "Max"))
            .failed());
        assert!(codec
            .serialize("Level", &Value::enumeration("Other", "Low"))
            .failed());
    }
}

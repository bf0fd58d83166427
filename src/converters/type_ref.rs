use crate::codec::Context;
use crate::converter::Converter;
use crate::error::CodecError;
use crate::json::JsonValue;
use crate::types::Ty;
use crate::value::Value;

/// `type` values, written as canonical type names.
pub struct TypeRefConverter;

impl Converter for TypeRefConverter {
    fn name(&self) -> &str {
        "type_ref"
    }

    fn can_process(&self, ty: &Ty) -> bool {
        matches!(ty, Ty::TypeRef)
    }

    fn try_serialize(
        &self,
        cx: &mut Context<'_>,
        value: &Value,
        ty: &Ty,
    ) -> Result<JsonValue, CodecError> {
        match value {
            Value::Type(name) => Ok(JsonValue::String(cx.resolve_type(name)?.name())),
            other => Err(CodecError::mismatch(ty, other.kind_name())),
        }
    }

    fn try_deserialize(
        &self,
        cx: &mut Context<'_>,
        json: &JsonValue,
        _ty: &Ty,
        instance: &mut Value,
    ) -> Result<(), CodecError> {
        *instance = Value::Type(cx.resolve_type(json.as_str()?)?.name());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::config::CodecConfig;
    use crate::converters::test_support::{codec_with, from_json, to_json};
    use crate::error::CodecError;
    use crate::json::JsonValue;
    use crate::registry::{StructDef, TypeRegistry};
    use crate::value::Value;

    #[test]
    fn test_names_are_canonical() {
        let registry = TypeRegistry::new();
        registry.register(StructDef::new("Person")).unwrap();
        let codec = codec_with(registry, CodecConfig::default());

        let json = to_json(&codec, "type", Value::Type("map<string,Person[]>".into()));
        assert_eq!(json, JsonValue::from("map<string, Person[]>"));
        assert_eq!(
            from_json(&codec, "type", JsonValue::from("list< int32 >")),
            Value::Type("list<int32>".into())
        );
    }

    #[test]
    fn test_unknown_type_name() {
        let codec = codec_with(TypeRegistry::new(), CodecConfig::default());
        assert!(matches!(
            codec.deserialize("type", &JsonValue::from("Ghost")).errors().next(),
            Some(CodecError::UnknownType { .. })
        ));
    }
}

use crate::codec::Codec;
use crate::error::FsonError;
use crate::json::JsonValue;
use crate::parser::Parser;
use crate::utils::get_line_and_column;
use crate::value::Value;
use log::debug;
use miette::Diagnostic;

/// Serializes `value` as `type_name` and renders the tree as JSON text.
///
/// `pretty` uses the codec's configured indent; otherwise the output carries
/// no inserted whitespace. Warnings recorded during the call are dropped;
/// use [`Codec::serialize`] to see them.
///
/// # Errors
///
/// Returns `FsonError::Codec` if conversion fails. When several members
/// fail, the error is `CodecError::Multiple` listing all of them.
pub fn to_json_string(
    codec: &Codec,
    type_name: &str,
    value: &Value,
    pretty: bool,
) -> Result<String, FsonError> {
    let json = codec.serialize(type_name, value).into_result()?;
    let indent = if pretty { codec.config().pretty_indent } else { 0 };
    Ok(json.render(indent))
}

/// Parses JSON text and deserializes it as `type_name`.
///
/// # Errors
///
/// Returns `FsonError::Parser` for malformed text, with a span pointing at
/// the offending token, or `FsonError::Codec` if conversion fails.
pub fn from_json_str(codec: &Codec, type_name: &str, text: &str) -> Result<Value, FsonError> {
    from_json_source(codec, type_name, text, "input.json")
}

/// Like [`from_json_str`], naming the source in parser diagnostics.
///
/// # Errors
///
/// See [`from_json_str`].
pub fn from_json_source(
    codec: &Codec,
    type_name: &str,
    text: &str,
    file_name: &str,
) -> Result<Value, FsonError> {
    let json = parse_named(text, file_name)?;
    Ok(codec.deserialize(type_name, &json).into_result()?)
}

fn parse_named(text: &str, file_name: &str) -> Result<JsonValue, FsonError> {
    let mut parser = Parser::new_with_name(text, file_name.to_string());
    parser.parse_document().map_err(|e| {
        if let Some(label) = e.labels().and_then(|mut labels| labels.next()) {
            let (line, column) = get_line_and_column(text, label.offset());
            debug!("Failed to parse {file_name} at {line}:{column}: {e}");
        }
        FsonError::from(e)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CodecConfig;
    use crate::error::{CodecError, ParserError};
    use crate::registry::{FieldDef, StructDef, TypeRegistry};
    use crate::value::ObjectRef;
    use std::sync::Arc;

    fn codec() -> Codec {
        let registry = TypeRegistry::new();
        registry
            .register(
                StructDef::new("Point")
                    .field(FieldDef::new("x", "int32"))
                    .field(FieldDef::new("y", "int32")),
            )
            .unwrap();
        Codec::new(Arc::new(registry), CodecConfig::default())
    }

    #[test]
    fn test_compact_and_pretty() {
        let codec = codec();
        let point = Value::Object(ObjectRef::new("Point").with("x", 1).with("y", -2));
        assert_eq!(
            to_json_string(&codec, "Point", &point, false).unwrap(),
            r#"{"x":1,"y":-2}"#
        );
        assert_eq!(
            to_json_string(&codec, "Point", &point, true).unwrap(),
            "{\n  \"x\": 1,\n  \"y\": -2\n}"
        );
    }

    #[test]
    fn test_read_text() {
        let codec = codec();
        let value = from_json_str(&codec, "Point", r#"{ "y": 5 }"#).unwrap();
        let point = value.as_object().unwrap();
        assert_eq!(point.get("x"), Some(Value::Int(0)));
        assert_eq!(point.get("y"), Some(Value::Int(5)));
    }

    #[test]
    fn test_parse_error_names_source() {
        let codec = codec();
        let err = from_json_source(&codec, "Point", "{ \"x\": }", "point.json").unwrap_err();
        match err {
            FsonError::Parser(ParserError::UnexpectedToken { src, .. }) => {
                assert_eq!(src.name(), "point.json");
            }
            other => panic!("Expected parser error, got {other:?}"),
        }
    }

    #[test]
    fn test_conversion_error() {
        let codec = codec();
        let err = from_json_str(&codec, "Point", r#"{ "x": "one" }"#).unwrap_err();
        assert!(matches!(err, FsonError::Codec(CodecError::Member { .. })));
        assert!(matches!(
            to_json_string(&codec, "Ghost", &Value::Null, false),
            Err(FsonError::Codec(CodecError::UnknownType { .. }))
        ));
    }
}

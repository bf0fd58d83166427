use crate::codec::Context;
use crate::converter::Converter;
use crate::error::{CodecError, ErrorList};
use crate::json::{JsonMap, JsonValue, RESERVED_KEYS};
use crate::types::Ty;
use crate::value::Value;

const KEY: &str = "Key";
const VALUE: &str = "Value";

/// `map<K, V>`: a JSON object when every key writes as a string, otherwise
/// an array of `{"Key": k, "Value": v}` entries.
pub struct DictionaryConverter;

fn entry_types(ty: &Ty) -> Result<(&Ty, &Ty), CodecError> {
    match ty {
        Ty::Map(key, value) => Ok((key, value)),
        other => Err(CodecError::mismatch("map type", other)),
    }
}

/// Doubles a leading `$` so keys never read as reserved keys.
fn escape_key(key: String) -> String {
    if key.starts_with('$') {
        format!("${key}")
    } else {
        key
    }
}

fn unescape_key(key: &str) -> &str {
    key.strip_prefix('$')
        .filter(|rest| rest.starts_with('$'))
        .unwrap_or(key)
}

impl DictionaryConverter {
    fn read_entry(
        cx: &mut Context<'_>,
        (key_ty, value_ty): (&Ty, &Ty),
        key: &JsonValue,
        value: &JsonValue,
    ) -> Result<(Value, Value), CodecError> {
        let mut k = Value::Null;
        cx.deserialize(key_ty, key, &mut k)?;
        let mut v = Value::Null;
        cx.deserialize(value_ty, value, &mut v)?;
        Ok((k, v))
    }
}

impl Converter for DictionaryConverter {
    fn name(&self) -> &str {
        "dictionary"
    }

    fn can_process(&self, ty: &Ty) -> bool {
        matches!(ty, Ty::Map(..))
    }

    fn try_serialize(
        &self,
        cx: &mut Context<'_>,
        value: &Value,
        ty: &Ty,
    ) -> Result<JsonValue, CodecError> {
        let (key_ty, value_ty) = entry_types(ty)?;
        let Value::Map(entries) = value else {
            return Err(CodecError::mismatch(ty, value.kind_name()));
        };
        let owner = ty.name();
        let mut errors = ErrorList::new();
        let mut written = Vec::with_capacity(entries.len());
        for (i, (k, v)) in entries.iter().enumerate() {
            let entry = cx
                .serialize(key_ty, k)
                .and_then(|k| Ok((k, cx.serialize(value_ty, v)?)));
            match entry {
                Ok(pair) => written.push(pair),
                Err(e) => errors.push(e.in_member(&owner, &format!("[{i}]"))),
            }
        }
        errors.finish()?;

        if written.iter().all(|(k, _)| matches!(k, JsonValue::String(_))) {
            let mut map = JsonMap::with_capacity(written.len());
            for (k, v) in written {
                if let JsonValue::String(k) = k {
                    map.insert(escape_key(k), v);
                }
            }
            Ok(JsonValue::Object(map))
        } else {
            Ok(JsonValue::Array(
                written
                    .into_iter()
                    .map(|(k, v)| [(KEY, k), (VALUE, v)].into_iter().collect())
                    .collect(),
            ))
        }
    }

    fn try_deserialize(
        &self,
        cx: &mut Context<'_>,
        json: &JsonValue,
        ty: &Ty,
        instance: &mut Value,
    ) -> Result<(), CodecError> {
        let types = entry_types(ty)?;
        let owner = ty.name();
        let mut errors = ErrorList::new();
        let mut entries = Vec::new();
        match json {
            JsonValue::Object(map) => {
                for (key, value) in map {
                    if RESERVED_KEYS.contains(&key.as_str()) {
                        continue;
                    }
                    let key_json = JsonValue::from(unescape_key(key));
                    match Self::read_entry(cx, types, &key_json, value) {
                        Ok(entry) => entries.push(entry),
                        Err(e) => errors.push(e.in_member(&owner, key)),
                    }
                }
            }
            JsonValue::Array(items) => {
                for (i, item) in items.iter().enumerate() {
                    let entry = item.as_object().and_then(|pair| {
                        match (pair.get(KEY), pair.get(VALUE)) {
                            (Some(k), Some(v)) => Self::read_entry(cx, types, k, v),
                            _ => Err(CodecError::mismatch(
                                "{\"Key\", \"Value\"} entry",
                                "object without both keys",
                            )),
                        }
                    });
                    match entry {
                        Ok(entry) => entries.push(entry),
                        Err(e) => errors.push(e.in_member(&owner, &format!("[{i}]"))),
                    }
                }
            }
            other => return Err(CodecError::mismatch("object or array", other.kind_name())),
        }
        errors.finish()?;

        let Value::Map(target) = instance else {
            return Err(CodecError::mismatch(ty, instance.kind_name()));
        };
        target.clear();
        target.extend(entries);
        Ok(())
    }

    fn create_instance(
        &self,
        _cx: &mut Context<'_>,
        _json: &JsonValue,
        _ty: &Ty,
    ) -> Result<Value, CodecError> {
        Ok(Value::Map(Vec::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converters::test_support::{from_json, plain_codec, to_json};

    fn map(entries: Vec<(Value, Value)>) -> Value {
        Value::Map(entries)
    }

    #[test]
    fn test_string_keys_make_an_object() {
        let codec = plain_codec();
        let value = map(vec![
            (Value::from("b"), Value::Int(2)),
            (Value::from("a"), Value::Int(1)),
        ]);
        let json = to_json(&codec, "map<string, int32>", value.clone());
        assert_eq!(json.to_compact_string(), r#"{"b":2,"a":1}"#);
        assert_eq!(from_json(&codec, "map<string, int32>", json), value);
    }

    #[test]
    fn test_other_keys_make_entries() {
        let codec = plain_codec();
        let value = map(vec![(Value::Int(7), Value::from("seven"))]);
        let json = to_json(&codec, "map<int32, string>", value.clone());
        assert_eq!(json.to_compact_string(), r#"[{"Key":7,"Value":"seven"}]"#);
        assert_eq!(from_json(&codec, "map<int32, string>", json), value);

        // Object form is accepted too; the string key reads as an integer.
        let json: JsonValue = [("7", "seven")].into_iter().collect();
        assert_eq!(from_json(&codec, "map<int32, string>", json), value);
    }

    #[test]
    fn test_dollar_keys_escaped() {
        let codec = plain_codec();
        let value = map(vec![
            (Value::from("$id"), Value::Int(1)),
            (Value::from("$$x"), Value::Int(2)),
        ]);
        let json = to_json(&codec, "map<string, int32>", value.clone());
        assert_eq!(json.to_compact_string(), r#"{"$$id":1,"$$$x":2}"#);
        assert_eq!(from_json(&codec, "map<string, int32>", json), value);
    }

    #[test]
    fn test_malformed_entries() {
        let codec = plain_codec();
        let json = JsonValue::Array(vec![[("Key", 1)].into_iter().collect()]);
        assert!(codec.deserialize("map<int32, int32>", &json).failed());
        assert!(codec
            .deserialize("map<string, int32>", &JsonValue::from("x"))
            .failed());
    }

    #[test]
    fn test_key_escaping_helpers() {
        assert_eq!(escape_key("plain".to_string()), "plain");
        assert_eq!(unescape_key("$$ref"), "$ref");
        assert_eq!(unescape_key("$solo"), "$solo");
    }
}

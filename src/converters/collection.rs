use super::array::{deserialize_items, serialize_items};
use crate::codec::Context;
use crate::converter::Converter;
use crate::error::CodecError;
use crate::json::JsonValue;
use crate::types::Ty;
use crate::value::Value;

/// `list<T>` and `set<T>`. Reads refill an existing list in place; sets
/// drop repeated elements.
pub struct CollectionConverter;

impl Converter for CollectionConverter {
    fn name(&self) -> &str {
        "collection"
    }

    fn can_process(&self, ty: &Ty) -> bool {
        matches!(ty, Ty::List(_) | Ty::Set(_))
    }

    fn try_serialize(
        &self,
        cx: &mut Context<'_>,
        value: &Value,
        ty: &Ty,
    ) -> Result<JsonValue, CodecError> {
        serialize_items(cx, value, ty)
    }

    fn try_deserialize(
        &self,
        cx: &mut Context<'_>,
        json: &JsonValue,
        ty: &Ty,
        instance: &mut Value,
    ) -> Result<(), CodecError> {
        let items = deserialize_items(cx, json, ty)?;
        let Value::List(target) = instance else {
            return Err(CodecError::mismatch(ty, instance.kind_name()));
        };
        target.clear();
        for item in items {
            if matches!(ty, Ty::Set(_)) && target.contains(&item) {
                continue;
            }
            target.push(item);
        }
        Ok(())
    }

    fn create_instance(
        &self,
        _cx: &mut Context<'_>,
        _json: &JsonValue,
        _ty: &Ty,
    ) -> Result<Value, CodecError> {
        Ok(Value::List(Vec::new()))
    }
}

#[cfg(test)]
mod tests {
    use crate::converters::test_support::{from_json, plain_codec, to_json};
    use crate::json::JsonValue;
    use crate::value::Value;

    fn ints(items: &[i64]) -> Value {
        Value::List(items.iter().copied().map(Value::Int).collect())
    }

    #[test]
    fn test_list_round_trip() {
        let codec = plain_codec();
        let json = to_json(&codec, "list<int64>", ints(&[3, 1, 3]));
        assert_eq!(json.to_compact_string(), "[3,1,3]");
        assert_eq!(from_json(&codec, "list<int64>", json), ints(&[3, 1, 3]));
    }

    #[test]
    fn test_set_drops_duplicates() {
        let codec = plain_codec();
        let json = JsonValue::Array(vec![1.into(), 2.into(), 1.into()]);
        assert_eq!(from_json(&codec, "set<int32>", json), ints(&[1, 2]));
    }

    #[test]
    fn test_reads_in_place() {
        let codec = plain_codec();
        let mut existing = ints(&[9, 9, 9]);
        let json = JsonValue::Array(vec![4.into()]);
        assert!(codec
            .deserialize_into("list<int32>", &json, &mut existing)
            .succeeded());
        assert_eq!(existing, ints(&[4]));
    }
}

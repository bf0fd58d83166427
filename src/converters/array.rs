use crate::codec::Context;
use crate::converter::Converter;
use crate::error::{CodecError, ErrorList};
use crate::json::JsonValue;
use crate::types::Ty;
use crate::value::Value;

/// `T[]`. Reads always produce a fresh list.
pub struct ArrayConverter;

pub(super) fn element_of(ty: &Ty) -> Result<&Ty, CodecError> {
    match ty {
        Ty::Array(element) | Ty::List(element) | Ty::Set(element) => Ok(element),
        other => Err(CodecError::mismatch("sequence type", other)),
    }
}

/// Writes every element, reporting each failing index.
pub(super) fn serialize_items(
    cx: &mut Context<'_>,
    value: &Value,
    ty: &Ty,
) -> Result<JsonValue, CodecError> {
    let element = element_of(ty)?;
    let Value::List(items) = value else {
        return Err(CodecError::mismatch(ty, value.kind_name()));
    };
    let owner = ty.name();
    let mut errors = ErrorList::new();
    let mut out = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        match cx.serialize(element, item) {
            Ok(json) => out.push(json),
            Err(e) => errors.push(e.in_member(&owner, &format!("[{i}]"))),
        }
    }
    errors.finish()?;
    Ok(JsonValue::Array(out))
}

/// Reads every element into a new vector, reporting each failing index.
pub(super) fn deserialize_items(
    cx: &mut Context<'_>,
    json: &JsonValue,
    ty: &Ty,
) -> Result<Vec<Value>, CodecError> {
    let element = element_of(ty)?;
    let items = json.as_array()?;
    let owner = ty.name();
    let mut errors = ErrorList::new();
    let mut out = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        let mut value = Value::Null;
        match cx.deserialize(element, item, &mut value) {
            Ok(()) => out.push(value),
            Err(e) => errors.push(e.in_member(&owner, &format!("[{i}]"))),
        }
    }
    errors.finish()?;
    Ok(out)
}

impl Converter for ArrayConverter {
    fn name(&self) -> &str {
        "array"
    }

    fn can_process(&self, ty: &Ty) -> bool {
        matches!(ty, Ty::Array(_))
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
        *instance = Value::List(deserialize_items(cx, json, ty)?);
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

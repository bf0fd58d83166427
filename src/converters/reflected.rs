use crate::codec::{Context, MemberAccess};
use crate::converter::Converter;
use crate::error::{CodecError, ErrorList};
use crate::json::{JsonMap, JsonValue};
use crate::types::Ty;
use crate::value::Value;

/// Member-by-member conversion driven by type metadata. Accepts every type,
/// so it is tried last.
pub struct ReflectedConverter;

impl Converter for ReflectedConverter {
    fn name(&self) -> &str {
        "reflected"
    }

    fn can_process(&self, _ty: &Ty) -> bool {
        true
    }

    fn request_cycle_support(&self, ty: &Ty) -> bool {
        ty.is_struct()
    }

    fn request_inheritance_support(&self, ty: &Ty) -> bool {
        ty.is_struct()
    }

    fn try_serialize(
        &self,
        cx: &mut Context<'_>,
        value: &Value,
        ty: &Ty,
    ) -> Result<JsonValue, CodecError> {
        let meta = cx.metadata(ty)?;
        let Value::Object(obj) = value else {
            return Err(CodecError::mismatch(ty, value.kind_name()));
        };
        let owner = meta.type_name();
        let mut out = JsonMap::with_capacity(meta.members().len());
        let mut errors = ErrorList::new();
        for member in meta.members() {
            let field = obj.get(&member.name).unwrap_or_default();
            errors.record(cx.write_member(&mut out, &MemberAccess::of(&owner, member), &field));
        }
        errors.finish()?;
        Ok(JsonValue::Object(out))
    }

    fn try_deserialize(
        &self,
        cx: &mut Context<'_>,
        json: &JsonValue,
        ty: &Ty,
        instance: &mut Value,
    ) -> Result<(), CodecError> {
        let meta = cx.metadata(ty)?;
        let data = json.as_object()?;
        let Value::Object(obj) = instance else {
            return Err(CodecError::mismatch(ty, instance.kind_name()));
        };
        let owner = meta.type_name();
        let mut errors = ErrorList::new();
        for member in meta.members() {
            let current = obj.get(&member.name).unwrap_or_default();
            if let Some(value) = errors
                .record(cx.read_member(data, &MemberAccess::of(&owner, member), current))
                .flatten()
            {
                obj.set(member.name.clone(), value);
            }
        }
        errors.finish()
    }

    fn create_instance(
        &self,
        cx: &mut Context<'_>,
        _json: &JsonValue,
        ty: &Ty,
    ) -> Result<Value, CodecError> {
        Ok(Value::Object(cx.metadata(ty)?.instantiate()))
    }
}

use crate::aot::AotMember;
use crate::config::CodecConfig;
use crate::converter::{Converter, ConverterRegistry};
use crate::cycles::CyclicReferenceManager;
use crate::error::{CodecError, Outcome};
use crate::json::{JsonMap, JsonValue, CONTENT_KEY, ID_KEY, REF_KEY, TYPE_KEY};
use crate::metadata::{MemberDescriptor, MetadataCache, TypeMetadata};
use crate::registry::TypeRegistry;
use crate::type_cache::TypeCache;
use crate::types::{Primitive, Ty};
use crate::value::{ObjectRef, Value};
use log::warn;
use std::collections::HashSet;
use std::sync::Arc;

/// The type-directed JSON codec.
///
/// A `Codec` owns its caches and converter list and shares the
/// [`TypeRegistry`] it was built with. It is `Send + Sync`; every top-level
/// call gets its own [`Context`], so concurrent calls do not interact.
#[derive(Debug)]
pub struct Codec {
    pub(crate) registry: Arc<TypeRegistry>,
    pub(crate) config: CodecConfig,
    types: TypeCache,
    metadata: MetadataCache,
    pub(crate) converters: ConverterRegistry,
}

impl Codec {
    pub fn new(registry: Arc<TypeRegistry>, config: CodecConfig) -> Self {
        Self {
            registry,
            config,
            types: TypeCache::new(),
            metadata: MetadataCache::new(),
            converters: ConverterRegistry::with_builtins(),
        }
    }

    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    pub fn converters(&self) -> &ConverterRegistry {
        &self.converters
    }

    /// # Errors
    /// `UnknownType` for malformed or unregistered names.
    pub fn resolve_type(&self, name: &str) -> Result<Ty, CodecError> {
        self.types.resolve(&self.registry, name)
    }

    /// # Errors
    /// Whatever resolving or introspecting the type fails with.
    pub fn metadata(&self, type_name: &str) -> Result<Arc<TypeMetadata>, CodecError> {
        self.metadata_for(&self.resolve_type(type_name)?)
    }

    /// # Errors
    /// `NotSerializable` or `UnknownType` from the metadata build.
    pub fn metadata_for(&self, ty: &Ty) -> Result<Arc<TypeMetadata>, CodecError> {
        self.metadata
            .get_or_build(ty, &self.registry, &self.types, &self.config)
    }

    /// The converter that handles `ty` under the current registry contents.
    ///
    /// # Errors
    /// `NoConverterFound` when no registered converter accepts `ty`.
    pub fn converter_for(&self, ty: &Ty) -> Result<Arc<dyn Converter>, CodecError> {
        self.converters.resolve(ty, self.registry.generation())
    }

    /// Adds a converter ahead of all registered so far.
    pub fn register_converter(&mut self, converter: Arc<dyn Converter>) {
        self.converters.register(converter);
    }

    pub fn serialize(&self, type_name: &str, value: &Value) -> Outcome<JsonValue> {
        let mut cx = Context::new(self);
        let result = cx.serialize_root(type_name, value);
        cx.finish(result)
    }

    pub fn deserialize(&self, type_name: &str, json: &JsonValue) -> Outcome<Value> {
        let mut cx = Context::new(self);
        let mut instance = Value::Null;
        let result = cx
            .deserialize_root(type_name, json, &mut instance)
            .map(|()| instance);
        cx.finish(result)
    }

    /// Deserializes into `instance`, reusing it (and nested objects and
    /// collections) where its shape matches.
    pub fn deserialize_into(
        &self,
        type_name: &str,
        json: &JsonValue,
        instance: &mut Value,
    ) -> Outcome<()> {
        let mut cx = Context::new(self);
        let result = cx.deserialize_root(type_name, json, instance);
        cx.finish(result)
    }
}

/// A member as the engine needs it to write or read one JSON key.
pub(crate) struct MemberAccess<'a> {
    pub owner: &'a str,
    pub name: &'a str,
    pub wire_name: &'a str,
    pub ty: &'a Ty,
    pub converter: Option<&'a str>,
}

impl<'a> MemberAccess<'a> {
    pub fn of(owner: &'a str, member: &'a MemberDescriptor) -> Self {
        Self {
            owner,
            name: &member.name,
            wire_name: &member.wire_name,
            ty: &member.storage_type,
            converter: member.converter.as_deref(),
        }
    }
}

/// Where an incoming payload says it should be read as.
struct Envelope<'j> {
    runtime: Ty,
    payload: &'j JsonValue,
    id: Option<u64>,
}

/// State of one top-level conversion, handed to every converter.
pub struct Context<'c> {
    codec: &'c Codec,
    cycles: CyclicReferenceManager,
    warnings: Vec<String>,
}

impl<'c> Context<'c> {
    fn new(codec: &'c Codec) -> Self {
        Self {
            codec,
            cycles: CyclicReferenceManager::new(),
            warnings: Vec::new(),
        }
    }

    fn finish<T>(self, result: Result<T, CodecError>) -> Outcome<T> {
        Outcome::new(result, self.warnings)
    }

    pub fn config(&self) -> &'c CodecConfig {
        &self.codec.config
    }

    /// # Errors
    /// `UnknownType` for malformed or unregistered names.
    pub fn resolve_type(&self, name: &str) -> Result<Ty, CodecError> {
        self.codec.resolve_type(name)
    }

    /// # Errors
    /// `NotSerializable` or `UnknownType` from the metadata build.
    pub fn metadata(&self, ty: &Ty) -> Result<Arc<TypeMetadata>, CodecError> {
        self.codec.metadata_for(ty)
    }

    /// Records a non-fatal problem in the call's outcome.
    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!("{message}");
        self.warnings.push(message);
    }

    /// Creates an instance through its public parameterless constructor.
    ///
    /// # Errors
    /// `NotSerializable` when the type has no public parameterless constructor.
    pub fn construct(&mut self, type_name: &str) -> Result<ObjectRef, CodecError> {
        let meta = self.codec.metadata(type_name)?;
        if !meta.has_public_constructor() {
            return Err(CodecError::not_serializable(
                type_name,
                "no public parameterless constructor",
            ));
        }
        Ok(meta.construct())
    }

    /// Creates an instance through any parameterless constructor, or
    /// uninitialized when there is none.
    ///
    /// # Errors
    /// Whatever resolving or introspecting the type fails with.
    pub fn instantiate(&mut self, type_name: &str) -> Result<ObjectRef, CodecError> {
        Ok(self.codec.metadata(type_name)?.instantiate())
    }

    /// # Errors
    /// The conversion failure of `value` or anything nested in it.
    pub fn serialize(&mut self, ty: &Ty, value: &Value) -> Result<JsonValue, CodecError> {
        self.serialize_with(None, ty, value)
    }

    /// Like [`Context::serialize`], with an optional converter override by name.
    ///
    /// # Errors
    /// `NoConverterFound` for an unknown override, otherwise the conversion failure.
    pub fn serialize_with(
        &mut self,
        converter: Option<&str>,
        ty: &Ty,
        value: &Value,
    ) -> Result<JsonValue, CodecError> {
        if value.is_null() {
            return Ok(JsonValue::Null);
        }
        let runtime = self.runtime_type(ty, value)?;
        let converter = match converter {
            Some(name) => self.codec.converters.by_name(name)?,
            None => self.codec.converter_for(&runtime)?,
        };
        match value {
            Value::Object(obj) if converter.request_cycle_support(&runtime) => {
                self.cycles.enter();
                let result = self.serialize_tracked(converter.as_ref(), obj, value, ty, &runtime);
                self.cycles.exit();
                result
            }
            _ => {
                let payload = converter.try_serialize(self, value, &runtime)?;
                Ok(tag_runtime_type(converter.as_ref(), payload, ty, &runtime))
            }
        }
    }

    fn serialize_tracked(
        &mut self,
        converter: &dyn Converter,
        obj: &ObjectRef,
        value: &Value,
        ty: &Ty,
        runtime: &Ty,
    ) -> Result<JsonValue, CodecError> {
        if self.cycles.is_reference(obj) {
            let id = self.cycles.reference_id(obj);
            return Ok([(REF_KEY, id_to_json(id))].into_iter().collect());
        }
        let id = self.cycles.mark_serialized(obj);
        let payload = converter.try_serialize(self, value, runtime)?;
        let payload = tag_runtime_type(converter, payload, ty, runtime);
        Ok(wrap(payload, ID_KEY, id_to_json(id), runtime.is_struct()))
    }

    /// Reads `json` as `ty` into `instance`.
    ///
    /// # Errors
    /// The conversion failure of `json` or anything nested in it.
    pub fn deserialize(
        &mut self,
        ty: &Ty,
        json: &JsonValue,
        instance: &mut Value,
    ) -> Result<(), CodecError> {
        self.deserialize_with(None, ty, json, instance)
    }

    /// Like [`Context::deserialize`], with an optional converter override by name.
    ///
    /// # Errors
    /// `NoConverterFound` for an unknown override, otherwise the conversion failure.
    pub fn deserialize_with(
        &mut self,
        converter: Option<&str>,
        ty: &Ty,
        json: &JsonValue,
        instance: &mut Value,
    ) -> Result<(), CodecError> {
        if json.is_null() {
            if ty.is_nullable() {
                *instance = Value::Null;
                return Ok(());
            }
            return Err(CodecError::mismatch(ty, "null"));
        }

        if let Some(id) = reference_token(json)? {
            let obj = self.cycles.get_reference_object(id)?;
            let runtime = self.resolve_type(&obj.type_name())?;
            if !self.is_assignable(&runtime, ty) {
                return Err(CodecError::mismatch(ty, &runtime));
            }
            *instance = Value::Object(obj);
            return Ok(());
        }

        let envelope = self.open_envelope(ty, json)?;
        let converter = match converter {
            Some(name) => self.codec.converters.by_name(name)?,
            None => self.codec.converter_for(&envelope.runtime)?,
        };
        if converter.request_cycle_support(&envelope.runtime) {
            self.cycles.enter();
            let result = self.populate(converter.as_ref(), &envelope, instance, true);
            self.cycles.exit();
            result
        } else {
            self.populate(converter.as_ref(), &envelope, instance, false)
        }
    }

    fn populate(
        &mut self,
        converter: &dyn Converter,
        envelope: &Envelope<'_>,
        instance: &mut Value,
        track: bool,
    ) -> Result<(), CodecError> {
        if !is_reusable(instance, &envelope.runtime) {
            *instance = converter.create_instance(self, envelope.payload, &envelope.runtime)?;
        }
        // Registered before population so members can point back at it.
        if let (true, Some(id), Value::Object(obj)) = (track, envelope.id, &*instance) {
            self.cycles.add_reference_with_id(id, obj.clone());
        }
        converter.try_deserialize(self, envelope.payload, &envelope.runtime, instance)
    }

    fn open_envelope<'j>(
        &mut self,
        ty: &Ty,
        json: &'j JsonValue,
    ) -> Result<Envelope<'j>, CodecError> {
        let JsonValue::Object(map) = json else {
            let runtime = if ty.is_any() { natural_type(json) } else { ty.clone() };
            return Ok(Envelope {
                runtime,
                payload: json,
                id: None,
            });
        };

        let id = map.get(ID_KEY).map(json_to_id).transpose()?;
        let mut tagged = None;
        if let Some(tag) = map.get(TYPE_KEY) {
            let name = tag.as_str()?;
            match self.resolve_type(name) {
                Ok(found) if self.is_assignable(&found, ty) => tagged = Some(found),
                Ok(found) => return Err(CodecError::mismatch(ty, &found)),
                Err(e @ CodecError::MalformedInput(_)) => return Err(e),
                Err(_) => self.warn(format!(
                    "unknown type `{name}` in `{TYPE_KEY}`, reading as `{ty}`"
                )),
            }
        }
        let payload = map.get(CONTENT_KEY).unwrap_or(json);
        let runtime = match tagged {
            Some(runtime) => runtime,
            None if ty.is_any() => natural_type(payload),
            None => ty.clone(),
        };
        Ok(Envelope {
            runtime,
            payload,
            id,
        })
    }

    /// Writes one member under its wire name. A null value type is written
    /// as the type's default.
    pub(crate) fn write_member(
        &mut self,
        out: &mut JsonMap,
        member: &MemberAccess<'_>,
        value: &Value,
    ) -> Result<(), CodecError> {
        let defaulted;
        let value = if value.is_null() && !member.ty.is_nullable() {
            defaulted = member.ty.default_value();
            &defaulted
        } else {
            value
        };
        let json = self
            .serialize_with(member.converter, member.ty, value)
            .map_err(|e| e.in_member(member.owner, member.name))?;
        out.insert(member.wire_name.to_string(), json);
        Ok(())
    }

    /// Reads one member starting from `current`. `None` when its key is absent.
    pub(crate) fn read_member(
        &mut self,
        data: &JsonMap,
        member: &MemberAccess<'_>,
        mut current: Value,
    ) -> Result<Option<Value>, CodecError> {
        let Some(json) = data.get(member.wire_name) else {
            return Ok(None);
        };
        self.deserialize_with(member.converter, member.ty, json, &mut current)
            .map_err(|e| e.in_member(member.owner, member.name))?;
        Ok(Some(current))
    }

    /// Member write used by generated converters.
    ///
    /// # Errors
    /// The member's conversion failure, tagged with `owner` and the member name.
    pub fn serialize_member(
        &mut self,
        out: &mut JsonMap,
        owner: &str,
        member: &AotMember,
        value: &Value,
    ) -> Result<(), CodecError> {
        let ty = self
            .resolve_type(&member.storage_type)
            .map_err(|e| e.in_member(owner, &member.name))?;
        let access = MemberAccess {
            owner,
            name: &member.name,
            wire_name: &member.wire_name,
            ty: &ty,
            converter: member.converter.as_deref(),
        };
        self.write_member(out, &access, value)
    }

    /// Member read used by generated converters. `Ok(None)` when the key is absent.
    ///
    /// # Errors
    /// The member's conversion failure, tagged with `owner` and the member name.
    pub fn deserialize_member(
        &mut self,
        data: &JsonMap,
        owner: &str,
        member: &AotMember,
        current: Value,
    ) -> Result<Option<Value>, CodecError> {
        let ty = self
            .resolve_type(&member.storage_type)
            .map_err(|e| e.in_member(owner, &member.name))?;
        let access = MemberAccess {
            owner,
            name: &member.name,
            wire_name: &member.wire_name,
            ty: &ty,
            converter: member.converter.as_deref(),
        };
        self.read_member(data, &access, current)
    }

    fn serialize_root(&mut self, type_name: &str, value: &Value) -> Result<JsonValue, CodecError> {
        let ty = self.resolve_type(type_name)?;
        self.cycles.enter();
        let result = self.serialize(&ty, value);
        let referenced = self.cycles.referenced_ids();
        self.cycles.exit();
        let mut json = result?;
        strip_unreferenced_ids(&mut json, &referenced);
        Ok(json)
    }

    fn deserialize_root(
        &mut self,
        type_name: &str,
        json: &JsonValue,
        instance: &mut Value,
    ) -> Result<(), CodecError> {
        let ty = self.resolve_type(type_name)?;
        self.cycles.enter();
        let result = self.deserialize(&ty, json, instance);
        self.cycles.exit();
        result
    }

    fn runtime_type(&self, ty: &Ty, value: &Value) -> Result<Ty, CodecError> {
        match value {
            Value::Object(obj) => {
                let runtime = self.resolve_type(&obj.type_name())?;
                if !self.is_assignable(&runtime, ty) {
                    return Err(CodecError::mismatch(ty, &runtime));
                }
                Ok(runtime)
            }
            _ if !ty.is_any() => Ok(ty.clone()),
            Value::Enum(e) => self.resolve_type(&e.enum_name),
            other => Ok(inferred_type(other)),
        }
    }

    fn is_assignable(&self, runtime: &Ty, ty: &Ty) -> bool {
        match (runtime, ty) {
            (_, Ty::Any) => true,
            (Ty::Struct(derived), Ty::Struct(base)) => {
                self.codec.registry.is_subtype(&derived.name, &base.name)
            }
            _ => runtime == ty,
        }
    }
}

/// The type a JSON value reads back as under `any` storage.
fn natural_type(json: &JsonValue) -> Ty {
    match json {
        JsonValue::Null => Ty::Any,
        JsonValue::Boolean(_) => Ty::Primitive(Primitive::Bool),
        JsonValue::Int64(_) => Ty::Primitive(Primitive::Int64),
        JsonValue::Double(_) => Ty::Primitive(Primitive::Float64),
        JsonValue::String(_) => Ty::Primitive(Primitive::String),
        JsonValue::Array(_) => Ty::list_of(Ty::Any),
        JsonValue::Object(_) => Ty::map_of(Ty::Primitive(Primitive::String), Ty::Any),
    }
}

/// The type a plain value has under `any` storage.
fn inferred_type(value: &Value) -> Ty {
    match value {
        Value::Bool(_) => Ty::Primitive(Primitive::Bool),
        Value::Int(_) => Ty::Primitive(Primitive::Int64),
        Value::Float(_) => Ty::Primitive(Primitive::Float64),
        Value::Char(_) => Ty::Primitive(Primitive::Char),
        Value::String(_) => Ty::Primitive(Primitive::String),
        Value::DateTime(_) => Ty::DateTime,
        Value::Duration(_) => Ty::Duration,
        Value::Type(_) => Ty::TypeRef,
        Value::List(_) => Ty::list_of(Ty::Any),
        Value::Map(entries) if entries.iter().all(|(k, _)| matches!(k, Value::String(_))) => {
            Ty::map_of(Ty::Primitive(Primitive::String), Ty::Any)
        }
        Value::Map(_) => Ty::map_of(Ty::Any, Ty::Any),
        Value::Null | Value::Enum(_) | Value::Object(_) => Ty::Any,
    }
}

fn tag_runtime_type(converter: &dyn Converter, payload: JsonValue, ty: &Ty, runtime: &Ty) -> JsonValue {
    if runtime == ty || !converter.request_inheritance_support(runtime) {
        return payload;
    }
    if ty.is_any() && natural_type(&payload) == *runtime {
        return payload;
    }
    wrap(payload, TYPE_KEY, JsonValue::String(runtime.name()), runtime.is_struct())
}

/// Puts `key` in front of an object payload, or wraps any other payload
/// next to it under `$content`.
fn wrap(payload: JsonValue, key: &str, tag: JsonValue, mergeable: bool) -> JsonValue {
    match payload {
        JsonValue::Object(map) if mergeable || map.contains_key(CONTENT_KEY) => {
            let mut out = JsonMap::with_capacity(map.len() + 1);
            out.insert(key.to_string(), tag);
            out.extend(map);
            JsonValue::Object(out)
        }
        other => [(key, tag), (CONTENT_KEY, other)].into_iter().collect(),
    }
}

fn is_reusable(instance: &Value, runtime: &Ty) -> bool {
    match (instance, runtime) {
        (Value::Object(obj), Ty::Struct(def)) => obj.type_name() == def.name,
        (Value::List(_), Ty::List(_) | Ty::Set(_)) | (Value::Map(_), Ty::Map(..)) => true,
        _ => false,
    }
}

fn id_to_json(id: u64) -> JsonValue {
    JsonValue::Int64(i64::try_from(id).unwrap_or(i64::MAX))
}

fn json_to_id(json: &JsonValue) -> Result<u64, CodecError> {
    match json {
        JsonValue::Int64(n) => {
            u64::try_from(*n).map_err(|_| CodecError::mismatch("reference id", n))
        }
        other => Err(CodecError::mismatch("reference id", other.kind_name())),
    }
}

/// The id of a `{"$ref": id}` token, `None` for any other value.
fn reference_token(json: &JsonValue) -> Result<Option<u64>, CodecError> {
    match json {
        JsonValue::Object(map) => match map.get(REF_KEY) {
            Some(_) if map.len() != 1 => Err(CodecError::mismatch(
                "reference token",
                "object with extra keys",
            )),
            Some(id) => json_to_id(id).map(Some),
            None => Ok(None),
        },
        _ => Ok(None),
    }
}

/// Removes `$id` keys nothing refers to, unwrapping `$content` envelopes
/// left with nothing else in them.
fn strip_unreferenced_ids(json: &mut JsonValue, referenced: &HashSet<u64>) {
    let unwrapped = match json {
        JsonValue::Array(items) => {
            for item in items {
                strip_unreferenced_ids(item, referenced);
            }
            None
        }
        JsonValue::Object(map) => {
            let unused = matches!(
                map.get(ID_KEY),
                Some(JsonValue::Int64(id)) if !u64::try_from(*id).is_ok_and(|id| referenced.contains(&id))
            );
            if unused {
                map.shift_remove(ID_KEY);
            }
            for value in map.values_mut() {
                strip_unreferenced_ids(value, referenced);
            }
            if unused && map.len() == 1 {
                map.shift_remove(CONTENT_KEY)
            } else {
                None
            }
        }
        _ => None,
    };
    if let Some(content) = unwrapped {
        *json = content;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{EnumDef, FieldDef, StructDef};

    fn codec() -> Codec {
        let registry = TypeRegistry::new();
        registry
            .register(
                StructDef::new("Node")
                    .field(FieldDef::new("id", "int32"))
                    .field(FieldDef::new("next", "Node")),
            )
            .unwrap();
        registry
            .register(StructDef::new("Shape").field(FieldDef::new("name", "string")))
            .unwrap();
        registry
            .register(
                StructDef::new("Circle")
                    .base("Shape")
                    .field(FieldDef::new("radius", "float64")),
            )
            .unwrap();
        registry.register(EnumDef::new("Color", ["Red", "Green"])).unwrap();
        Codec::new(Arc::new(registry), CodecConfig::default())
    }

    fn obj(pairs: &[(&str, JsonValue)]) -> JsonValue {
        pairs.iter().cloned().collect()
    }

    #[test]
    fn test_plain_struct_has_no_bookkeeping_keys() {
        let codec = codec();
        let node = ObjectRef::new("Node").with("id", 3);
        let json = codec.serialize("Node", &Value::Object(node)).into_result().unwrap();
        assert_eq!(json, obj(&[("id", 3.into()), ("next", JsonValue::Null)]));
    }

    #[test]
    fn test_self_reference_round_trip() {
        let codec = codec();
        let node = ObjectRef::new("Node").with("id", 1);
        node.set("next", node.clone());
        let json = codec
            .serialize("Node", &Value::Object(node))
            .into_result()
            .unwrap();
        assert_eq!(json.to_compact_string(), r#"{"$id":0,"id":1,"next":{"$ref":0}}"#);

        let back = codec.deserialize("Node", &json).into_result().unwrap();
        let back = back.as_object().unwrap();
        let next = back.get("next").unwrap();
        assert!(next.as_object().unwrap().ptr_eq(back));
    }

    #[test]
    fn test_subtype_is_tagged() {
        let codec = codec();
        let circle = ObjectRef::new("Circle").with("name", "c").with("radius", 2.0);
        let json = codec
            .serialize("Shape", &Value::Object(circle))
            .into_result()
            .unwrap();
        assert_eq!(
            json.to_compact_string(),
            r#"{"$type":"Circle","name":"c","radius":2.0}"#
        );
        let back = codec.deserialize("Shape", &json).into_result().unwrap();
        assert_eq!(back.as_object().unwrap().type_name(), "Circle");
    }

    #[test]
    fn test_unrelated_runtime_type_is_mismatch() {
        let codec = codec();
        let node = ObjectRef::new("Node");
        let outcome = codec.serialize("Shape", &Value::Object(node));
        assert!(matches!(
            outcome.errors().next(),
            Some(CodecError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_any_storage_tags_only_when_needed() {
        let codec = codec();
        let serialize = |v: Value| codec.serialize("any", &v).into_result().unwrap();
        assert_eq!(serialize(Value::Int(5)), JsonValue::Int64(5));
        assert_eq!(serialize(Value::from("x")), JsonValue::from("x"));
        assert_eq!(
            serialize(Value::enumeration("Color", "Green")),
            obj(&[("$type", "Color".into()), ("$content", "Green".into())])
        );
        assert_eq!(
            serialize(Value::Char('q')),
            obj(&[("$type", "char".into()), ("$content", "q".into())])
        );
    }

    #[test]
    fn test_unknown_type_tag_warns_and_falls_back() {
        let codec = codec();
        let json = obj(&[("$type", "Hexagon".into()), ("name", "h".into())]);
        let outcome = codec.deserialize("Shape", &json);
        assert!(outcome.succeeded());
        assert!(outcome.has_warnings());
        let value = outcome.into_value().unwrap();
        assert_eq!(value.as_object().unwrap().type_name(), "Shape");
    }

    #[test]
    fn test_null_handling() {
        let codec = codec();
        assert_eq!(
            codec.serialize("int32", &Value::Null).into_result().unwrap(),
            JsonValue::Null
        );
        assert!(codec.deserialize("Node", &JsonValue::Null).succeeded());
        assert!(codec.deserialize("int32", &JsonValue::Null).failed());
    }

    #[test]
    fn test_dangling_and_malformed_references() {
        let codec = codec();
        let dangling = obj(&[("id", 1.into()), ("next", obj(&[("$ref", 9.into())]))]);
        let outcome = codec.deserialize("Node", &dangling);
        match outcome.errors().next() {
            Some(CodecError::Member { source, .. }) => {
                assert!(matches!(**source, CodecError::DanglingReference { id: 9 }))
            }
            other => panic!("Expected member error, got {other:?}"),
        }

        let extra = obj(&[("$ref", 0.into()), ("id", 1.into())]);
        assert!(codec.deserialize("Node", &extra).failed());
    }

    #[test]
    fn test_strip_unwraps_lone_content() {
        let mut json = obj(&[("$id", 4.into()), ("$content", JsonValue::array())]);
        strip_unreferenced_ids(&mut json, &HashSet::new());
        assert_eq!(json, JsonValue::array());

        let mut kept = obj(&[("$id", 4.into()), ("a", 1.into())]);
        strip_unreferenced_ids(&mut kept, &HashSet::from([4]));
        assert!(kept.get("$id").is_some());
    }

    #[test]
    fn test_deserialize_into_reuses_instance() {
        let codec = codec();
        let existing = ObjectRef::new("Node").with("id", 1);
        let mut value = Value::Object(existing.clone());
        let json = obj(&[("id", 7.into())]);
        assert!(codec.deserialize_into("Node", &json, &mut value).succeeded());
        assert!(value.as_object().unwrap().ptr_eq(&existing));
        assert_eq!(existing.get("id"), Some(Value::Int(7)));
    }
}

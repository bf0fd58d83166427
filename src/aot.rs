use crate::codec::{Codec, Context};
use crate::config::CodecConfig;
use crate::converter::Converter;
use crate::error::CodecError;
use crate::json::{JsonMap, JsonValue};
use crate::metadata::TypeMetadata;
use crate::registry::TypeRegistry;
use crate::types::Ty;
use crate::utils::to_pascal_case;
use crate::value::{ObjectRef, Value};
use log::{debug, warn};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// One member as recorded in a generated converter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AotMember {
    pub name: String,
    pub wire_name: String,
    pub storage_type: String,
    pub converter: Option<String>,
}

impl AotMember {
    pub fn new(name: &str, wire_name: &str, storage_type: &str, converter: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            wire_name: wire_name.to_string(),
            storage_type: storage_type.to_string(),
            converter: converter.map(str::to_string),
        }
    }
}

/// The shape of a struct a generated converter was emitted for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AotFingerprint {
    pub type_name: String,
    pub constructor_public: bool,
    pub members: Vec<AotMember>,
}

impl AotFingerprint {
    pub fn new(type_name: &str, constructor_public: bool) -> Self {
        Self {
            type_name: type_name.to_string(),
            constructor_public,
            members: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_member(mut self, member: AotMember) -> Self {
        self.members.push(member);
        self
    }

    pub fn from_metadata(meta: &TypeMetadata) -> Self {
        Self {
            type_name: meta.type_name(),
            constructor_public: meta.has_public_constructor(),
            members: meta
                .members()
                .iter()
                .map(|m| AotMember {
                    name: m.name.clone(),
                    wire_name: m.wire_name.clone(),
                    storage_type: m.storage_type.name(),
                    converter: m.converter.clone(),
                })
                .collect(),
        }
    }

    /// Same constructor publicity and the same members, in any order.
    pub fn is_current(&self, live: &AotFingerprint) -> bool {
        self.constructor_public == live.constructor_public
            && self.members.len() == live.members.len()
            && self.members.iter().all(|m| live.members.contains(m))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AotStatus {
    Current,
    Stale,
    Missing,
}

/// A converter generated ahead of time for one struct type.
pub trait AotConverter: Send + Sync {
    fn type_name(&self) -> &str;

    /// The fingerprint of the shape this converter was generated for.
    fn version_info(&self) -> AotFingerprint;

    fn create_instance(&self, cx: &mut Context<'_>) -> Result<ObjectRef, CodecError>;

    fn do_serialize(
        &self,
        cx: &mut Context<'_>,
        model: &ObjectRef,
        out: &mut JsonMap,
    ) -> Result<(), CodecError>;

    fn do_deserialize(
        &self,
        cx: &mut Context<'_>,
        data: &JsonMap,
        model: &ObjectRef,
    ) -> Result<(), CodecError>;
}

/// Runs an [`AotConverter`] through the regular dispatch.
///
/// The converter's fingerprint is checked again whenever the registry
/// generation moves on; once it no longer matches, the adapter declines
/// its type and reflection takes over.
struct AotAdapter {
    name: String,
    inner: Arc<dyn AotConverter>,
    registry: Arc<TypeRegistry>,
    config: CodecConfig,
    /// Generation last checked and whether the converter matched it.
    checked: RwLock<(u64, bool)>,
}

impl AotAdapter {
    fn is_current(&self) -> bool {
        let generation = self.registry.generation();
        let (checked_at, current) = *self.checked.read();
        if checked_at == generation {
            return current;
        }
        let type_name = self.inner.type_name();
        let live = Codec::new(self.registry.clone(), self.config.clone());
        let current = live.is_aot_converter_current(type_name, &self.inner.version_info());
        if !current {
            warn!(
                "Generated converter for `{type_name}` went stale at generation {generation}; \
                 using reflection instead"
            );
        }
        *self.checked.write() = (generation, current);
        current
    }
}

impl Converter for AotAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn can_process(&self, ty: &Ty) -> bool {
        ty.struct_def()
            .is_some_and(|def| def.name() == self.inner.type_name())
            && self.is_current()
    }

    fn request_cycle_support(&self, _ty: &Ty) -> bool {
        true
    }

    fn try_serialize(
        &self,
        cx: &mut Context<'_>,
        value: &Value,
        ty: &Ty,
    ) -> Result<JsonValue, CodecError> {
        let Value::Object(model) = value else {
            return Err(CodecError::mismatch(ty, value.kind_name()));
        };
        let mut out = JsonMap::new();
        self.inner.do_serialize(cx, model, &mut out)?;
        Ok(JsonValue::Object(out))
    }

    fn try_deserialize(
        &self,
        cx: &mut Context<'_>,
        json: &JsonValue,
        ty: &Ty,
        instance: &mut Value,
    ) -> Result<(), CodecError> {
        let Value::Object(model) = instance else {
            return Err(CodecError::mismatch(ty, instance.kind_name()));
        };
        self.inner.do_deserialize(cx, json.as_object()?, model)
    }

    fn create_instance(
        &self,
        cx: &mut Context<'_>,
        _json: &JsonValue,
        _ty: &Ty,
    ) -> Result<Value, CodecError> {
        Ok(Value::Object(self.inner.create_instance(cx)?))
    }
}

impl Codec {
    /// The fingerprint of the type as it is registered now.
    ///
    /// # Errors
    /// `NotSerializable` for non-struct types, or the metadata failure.
    pub fn live_fingerprint(&self, type_name: &str) -> Result<AotFingerprint, CodecError> {
        let meta = self.metadata(type_name)?;
        if !meta.ty().is_struct() {
            return Err(CodecError::not_serializable(
                type_name,
                "generated converters exist only for struct types",
            ));
        }
        Ok(AotFingerprint::from_metadata(&meta))
    }

    /// # Errors
    /// Whatever computing the live fingerprint fails with.
    pub fn aot_status(
        &self,
        type_name: &str,
        stored: Option<&AotFingerprint>,
    ) -> Result<AotStatus, CodecError> {
        let Some(stored) = stored else {
            return Ok(AotStatus::Missing);
        };
        let live = self.live_fingerprint(type_name)?;
        Ok(if stored.is_current(&live) {
            AotStatus::Current
        } else {
            AotStatus::Stale
        })
    }

    /// False as well when the type cannot be introspected any more.
    pub fn is_aot_converter_current(&self, type_name: &str, stored: &AotFingerprint) -> bool {
        matches!(
            self.aot_status(type_name, Some(stored)),
            Ok(AotStatus::Current)
        )
    }

    /// Installs a generated converter ahead of the reflected one when it
    /// matches the live type. A stale converter is skipped.
    ///
    /// # Errors
    /// Whatever computing the live fingerprint fails with.
    pub fn register_aot_converter(
        &mut self,
        converter: Arc<dyn AotConverter>,
    ) -> Result<AotStatus, CodecError> {
        let type_name = converter.type_name().to_string();
        let generation = self.registry.generation();
        let status = self.aot_status(&type_name, Some(&converter.version_info()))?;
        if status == AotStatus::Current {
            self.register_converter(Arc::new(AotAdapter {
                name: format!("aot:{type_name}"),
                inner: converter,
                registry: self.registry.clone(),
                config: self.config.clone(),
                checked: RwLock::new((generation, true)),
            }));
        } else {
            warn!("Generated converter for `{type_name}` is stale; using reflection instead");
        }
        Ok(status)
    }

    /// Emits Rust source for an [`AotConverter`] specialized to `type_name`.
    ///
    /// # Errors
    /// `NotSerializable` for non-struct types and for members whose types
    /// cannot be introspected; `UnknownType` for unresolvable names.
    pub fn emit_aot_converter(&self, type_name: &str) -> Result<String, CodecError> {
        let fingerprint = self.live_fingerprint(type_name)?;
        let meta = self.metadata(type_name)?;
        for member in meta.members() {
            self.check_introspectable(&member.storage_type)
                .map_err(|e| e.in_member(type_name, &member.name))?;
        }
        debug!(
            "Emitting generated converter for `{type_name}` ({} member(s))",
            fingerprint.members.len()
        );
        Ok(render_converter(&fingerprint))
    }

    fn check_introspectable(&self, ty: &Ty) -> Result<(), CodecError> {
        match ty {
            Ty::Array(element) | Ty::List(element) | Ty::Set(element) => {
                self.check_introspectable(element)
            }
            Ty::Map(key, value) => {
                self.check_introspectable(key)?;
                self.check_introspectable(value)
            }
            _ => self.metadata_for(ty).map(|_| ()),
        }
    }
}

fn struct_ident(type_name: &str) -> String {
    let cleaned: String = type_name
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect();
    format!("{}AotConverter", to_pascal_case(&cleaned))
}

fn member_literal(member: &AotMember) -> String {
    let converter = match &member.converter {
        Some(name) => format!("Some({name:?})"),
        None => "None".to_string(),
    };
    format!(
        "AotMember::new({:?}, {:?}, {:?}, {converter})",
        member.name, member.wire_name, member.storage_type
    )
}

fn render_converter(fp: &AotFingerprint) -> String {
    let ident = struct_ident(&fp.type_name);
    let type_lit = format!("{:?}", fp.type_name);

    let version_members: String = fp
        .members
        .iter()
        .map(|m| format!("\n            .with_member({})", member_literal(m)))
        .collect();

    let create = if fp.constructor_public {
        format!("cx.construct({type_lit})")
    } else {
        format!("cx.instantiate({type_lit})")
    };

    let serialize_body: String = fp
        .members
        .iter()
        .map(|m| {
            format!(
                "        errors.record(cx.serialize_member(\n            out,\n            {type_lit},\n            &{},\n            &model.get({:?}).unwrap_or_default(),\n        ));\n",
                member_literal(m),
                m.name
            )
        })
        .collect();

    let deserialize_body: String = fp
        .members
        .iter()
        .map(|m| {
            format!(
                "        let current = model.get({name:?}).unwrap_or_default();\n        if let Some(value) = errors\n            .record(cx.deserialize_member(data, {type_lit}, &{member}, current))\n            .flatten()\n        {{\n            model.set({name:?}, value);\n        }}\n",
                name = m.name,
                member = member_literal(m),
            )
        })
        .collect();

    format!(
        "// Generated by fson-core for `{type_name}`. Do not edit.\n\
         // Regenerate when `Codec::aot_status` reports this type as stale.\n\
         \n\
         use fson_core::aot::{{AotConverter, AotFingerprint, AotMember}};\n\
         use fson_core::codec::Context;\n\
         use fson_core::error::{{CodecError, ErrorList}};\n\
         use fson_core::json::JsonMap;\n\
         use fson_core::value::ObjectRef;\n\
         \n\
         pub struct {ident};\n\
         \n\
         impl AotConverter for {ident} {{\n\
         \x20   fn type_name(&self) -> &str {{\n\
         \x20       {type_lit}\n\
         \x20   }}\n\
         \n\
         \x20   fn version_info(&self) -> AotFingerprint {{\n\
         \x20       AotFingerprint::new({type_lit}, {constructor_public}){version_members}\n\
         \x20   }}\n\
         \n\
         \x20   fn create_instance(&self, cx: &mut Context<'_>) -> Result<ObjectRef, CodecError> {{\n\
         \x20       {create}\n\
         \x20   }}\n\
         \n\
         \x20   fn do_serialize(\n\
         \x20       &self,\n\
         \x20       cx: &mut Context<'_>,\n\
         \x20       model: &ObjectRef,\n\
         \x20       out: &mut JsonMap,\n\
         \x20   ) -> Result<(), CodecError> {{\n\
         \x20       let mut errors = ErrorList::new();\n\
         {serialize_body}\
         \x20       errors.finish()\n\
         \x20   }}\n\
         \n\
         \x20   fn do_deserialize(\n\
         \x20       &self,\n\
         \x20       cx: &mut Context<'_>,\n\
         \x20       data: &JsonMap,\n\
         \x20       model: &ObjectRef,\n\
         \x20   ) -> Result<(), CodecError> {{\n\
         \x20       let mut errors = ErrorList::new();\n\
         {deserialize_body}\
         \x20       errors.finish()\n\
         \x20   }}\n\
         }}\n",
        type_name = fp.type_name,
        constructor_public = fp.constructor_public,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CodecConfig;
    use crate::registry::{Constructor, FieldDef, StructDef, TypeDef, TypeRegistry};

    fn codec(registry: TypeRegistry) -> Codec {
        Codec::new(Arc::new(registry), CodecConfig::default())
    }

    fn person() -> StructDef {
        StructDef::new("Person")
            .field(FieldDef::new("name", "string"))
            .field(FieldDef::new("age", "int32").converter("years"))
    }

    #[test]
    fn test_fingerprint_ignores_member_order() {
        let a = AotFingerprint::new("P", true)
            .with_member(AotMember::new("x", "x", "int32", None))
            .with_member(AotMember::new("y", "y", "int32", None));
        let b = AotFingerprint::new("P", true)
            .with_member(AotMember::new("y", "y", "int32", None))
            .with_member(AotMember::new("x", "x", "int32", None));
        assert!(a.is_current(&b));

        let private = AotFingerprint { constructor_public: false, ..b.clone() };
        assert!(!a.is_current(&private));
        let retyped = AotFingerprint::new("P", true)
            .with_member(AotMember::new("x", "x", "int64", None))
            .with_member(AotMember::new("y", "y", "int32", None));
        assert!(!a.is_current(&retyped));
    }

    #[test]
    fn test_status_transitions() {
        let registry = Arc::new(TypeRegistry::new());
        registry.register(person()).unwrap();
        let codec = Codec::new(registry.clone(), CodecConfig::default());
        let stored = codec.live_fingerprint("Person").unwrap();

        assert_eq!(codec.aot_status("Person", None).unwrap(), AotStatus::Missing);
        assert!(codec.is_aot_converter_current("Person", &stored));

        registry
            .register(person().field(FieldDef::new("email", "string")))
            .unwrap();
        assert_eq!(
            codec.aot_status("Person", Some(&stored)).unwrap(),
            AotStatus::Stale
        );
    }

    #[test]
    fn test_fingerprint_serde() {
        let fp = AotFingerprint::new("P", false)
            .with_member(AotMember::new("x", "X", "list<int32>", Some("custom")));
        let text = serde_json::to_string(&fp).unwrap();
        let back: AotFingerprint = serde_json::from_str(&text).unwrap();
        assert_eq!(back, fp);
    }

    #[test]
    fn test_emitted_source_shape() {
        let registry = TypeRegistry::new();
        registry.register(person()).unwrap();
        let source = codec(registry).emit_aot_converter("Person").unwrap();

        assert!(source.contains("pub struct PersonAotConverter;"));
        assert!(source.contains("impl AotConverter for PersonAotConverter {"));
        assert!(source.contains(
            ".with_member(AotMember::new(\"age\", \"age\", \"int32\", Some(\"years\")))"
        ));
        assert!(source.contains("cx.construct(\"Person\")"));
        assert!(source.contains("model.set(\"name\", value);"));
        assert_eq!(source.matches("errors.finish()").count(), 2);
    }

    #[test]
    fn test_emission_without_public_constructor() {
        let registry = TypeRegistry::new();
        registry
            .register(
                StructDef::new("Token")
                    .constructor(Constructor::NonPublic)
                    .field(FieldDef::new("value", "string")),
            )
            .unwrap();
        let source = codec(registry).emit_aot_converter("Token").unwrap();
        assert!(source.contains("cx.instantiate(\"Token\")"));
        assert!(source.contains("AotFingerprint::new(\"Token\", false)"));
    }

    #[test]
    fn test_emission_failures() {
        let registry = TypeRegistry::new();
        registry.register(TypeDef::opaque("Socket")).unwrap();
        registry
            .register(StructDef::new("Conn").field(FieldDef::new("sockets", "list<Socket>")))
            .unwrap();
        let codec = codec(registry);

        match codec.emit_aot_converter("Conn") {
            Err(CodecError::Member { member, source, .. }) => {
                assert_eq!(member, "sockets");
                assert!(matches!(*source, CodecError::NotSerializable { .. }));
            }
            other => panic!("Expected member failure, got {other:?}"),
        }
        assert!(matches!(
            codec.emit_aot_converter("int32"),
            Err(CodecError::NotSerializable { .. })
        ));
    }

    #[test]
    fn test_identifier_sanitized() {
        assert_eq!(struct_ident("shop.order_line"), "ShopOrderLineAotConverter");
    }
}

use crate::config::{CodecConfig, MemberSerialization};
use crate::error::CodecError;
use crate::json::RESERVED_KEYS;
use crate::registry::{
    Constructor, FieldDef, Initializer, MemberKind, StructDef, TypeDef, TypeRegistry, Visibility,
};
use crate::type_cache::TypeCache;
use crate::types::Ty;
use crate::value::ObjectRef;
use log::{debug, trace};
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// A member that takes part in structural conversion.
#[derive(Debug, Clone)]
pub struct MemberDescriptor {
    pub name: String,
    pub wire_name: String,
    pub storage_type: Ty,
    pub readable: bool,
    pub writable: bool,
    /// Name of a converter that handles this member instead of the default one.
    pub converter: Option<String>,
    pub order: Option<i32>,
    /// The struct that declares the member.
    pub declared_in: String,
}

/// Every declared field, included or not, with what it starts out as.
#[derive(Clone)]
struct Slot {
    name: String,
    storage_type: Option<Ty>,
    initializer: Option<Initializer>,
}

/// The introspected shape of a type.
#[derive(Clone)]
pub struct TypeMetadata {
    ty: Ty,
    members: Vec<MemberDescriptor>,
    slots: Vec<Slot>,
    constructor: Constructor,
}

impl std::fmt::Debug for TypeMetadata {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeMetadata")
            .field("ty", &self.ty)
            .field("members", &self.members)
            .field("constructor", &self.constructor)
            .finish_non_exhaustive()
    }
}

impl TypeMetadata {
    /// Introspects `ty`.
    ///
    /// # Errors
    /// `NotSerializable` for opaque types, broken inheritance chains,
    /// reserved or duplicate wire names, and structs that have neither
    /// members nor a parameterless constructor. `UnknownType` when an
    /// included member's type cannot be resolved.
    pub fn build(
        ty: &Ty,
        registry: &TypeRegistry,
        types: &TypeCache,
        config: &CodecConfig,
    ) -> Result<Self, CodecError> {
        match ty {
            Ty::Opaque(name) => Err(CodecError::not_serializable(
                name,
                "the type has no introspectable members",
            )),
            Ty::Struct(def) => build_struct(ty, def, registry, types, config),
            _ => Ok(Self {
                ty: ty.clone(),
                members: Vec::new(),
                slots: Vec::new(),
                constructor: Constructor::Public,
            }),
        }
    }

    pub fn ty(&self) -> &Ty {
        &self.ty
    }

    pub fn type_name(&self) -> String {
        self.ty.name()
    }

    pub fn members(&self) -> &[MemberDescriptor] {
        &self.members
    }

    pub fn member(&self, name: &str) -> Option<&MemberDescriptor> {
        self.members.iter().find(|m| m.name == name)
    }

    pub fn is_collection(&self) -> bool {
        self.ty.is_collection()
    }

    pub fn constructor(&self) -> Constructor {
        self.constructor
    }

    pub fn has_default_constructor(&self) -> bool {
        self.constructor != Constructor::None
    }

    pub fn has_public_constructor(&self) -> bool {
        self.constructor == Constructor::Public
    }

    /// Creates an instance through the parameterless constructor: each field
    /// gets its initializer's value, or its type's default.
    pub fn construct(&self) -> ObjectRef {
        trace!("Constructing `{}`", self.ty);
        let obj = ObjectRef::new(self.type_name());
        for slot in &self.slots {
            let value = match &slot.initializer {
                Some(init) => init(),
                None => slot.default_value(),
            };
            obj.set(slot.name.clone(), value);
        }
        obj
    }

    /// Creates an instance without running any initializer.
    pub fn allocate_uninitialized(&self) -> ObjectRef {
        trace!("Allocating uninitialized `{}`", self.ty);
        let obj = ObjectRef::new(self.type_name());
        for slot in &self.slots {
            obj.set(slot.name.clone(), slot.default_value());
        }
        obj
    }

    /// Constructs when a parameterless constructor exists, public or not;
    /// allocates uninitialized otherwise.
    pub fn instantiate(&self) -> ObjectRef {
        if self.has_default_constructor() {
            self.construct()
        } else {
            self.allocate_uninitialized()
        }
    }
}

impl Slot {
    fn default_value(&self) -> crate::value::Value {
        self.storage_type
            .as_ref()
            .map(Ty::default_value)
            .unwrap_or_default()
    }
}

fn is_included(field: &FieldDef, policy: MemberSerialization) -> bool {
    if field.ignored || field.compiler_generated {
        return false;
    }
    if let MemberKind::Property { readable, writable } = field.kind {
        if !(readable && writable) {
            return false;
        }
    }
    match policy {
        MemberSerialization::Default => field.visibility == Visibility::Public || field.opt_in,
        MemberSerialization::OptIn => field.opt_in,
        MemberSerialization::OptOut => true,
    }
}

/// The inheritance chain of `def`, root first.
fn base_chain(
    def: &Arc<StructDef>,
    registry: &TypeRegistry,
) -> Result<Vec<Arc<StructDef>>, CodecError> {
    let mut chain = vec![def.clone()];
    let mut seen = HashSet::from([def.name.clone()]);
    let mut next = def.base.clone();
    while let Some(base) = next {
        if !seen.insert(base.clone()) {
            return Err(CodecError::not_serializable(
                &def.name,
                format!("cyclic inheritance through `{base}`"),
            ));
        }
        let base_def = match registry.get(&base) {
            Some(TypeDef::Struct(base_def)) => base_def,
            Some(_) => {
                return Err(CodecError::not_serializable(
                    &def.name,
                    format!("base type `{base}` is not a struct"),
                ))
            }
            None => return Err(CodecError::UnknownType { name: base }),
        };
        next = base_def.base.clone();
        chain.push(base_def);
    }
    chain.reverse();
    Ok(chain)
}

fn build_struct(
    ty: &Ty,
    def: &Arc<StructDef>,
    registry: &TypeRegistry,
    types: &TypeCache,
    config: &CodecConfig,
) -> Result<TypeMetadata, CodecError> {
    let mut members: Vec<MemberDescriptor> = Vec::new();
    let mut slots: Vec<Slot> = Vec::new();

    for level in base_chain(def, registry)? {
        let mut declared: Vec<&FieldDef> = level.fields.iter().collect();
        // Stable: hinted members first by hint, the rest in declaration order.
        declared.sort_by_key(|f| (f.order.is_none(), f.order.unwrap_or(0)));

        for field in declared {
            // A redeclared name hides the inherited member.
            members.retain(|m| m.name != field.name);
            slots.retain(|s| s.name != field.name);

            let included = is_included(field, config.member_serialization);
            let storage_type = if included {
                Some(types.resolve(registry, &field.type_name)?)
            } else {
                types.resolve(registry, &field.type_name).ok()
            };
            slots.push(Slot {
                name: field.name.clone(),
                storage_type: storage_type.clone(),
                initializer: field.initializer.clone(),
            });

            if let (true, Some(storage_type)) = (included, storage_type) {
                let (readable, writable) = match field.kind {
                    MemberKind::Field => (true, true),
                    MemberKind::Property { readable, writable } => (readable, writable),
                };
                members.push(MemberDescriptor {
                    name: field.name.clone(),
                    wire_name: field
                        .wire_name
                        .clone()
                        .unwrap_or_else(|| config.naming.apply(&field.name)),
                    storage_type,
                    readable,
                    writable,
                    converter: field.converter.clone(),
                    order: field.order,
                    declared_in: level.name.clone(),
                });
            }
        }
    }

    let mut wire_names = HashSet::new();
    for member in &members {
        if RESERVED_KEYS.contains(&member.wire_name.as_str()) {
            return Err(CodecError::not_serializable(
                &def.name,
                format!(
                    "member `{}` uses the reserved wire name `{}`",
                    member.name, member.wire_name
                ),
            ));
        }
        if !wire_names.insert(member.wire_name.as_str()) {
            return Err(CodecError::not_serializable(
                &def.name,
                format!("wire name `{}` is used more than once", member.wire_name),
            ));
        }
    }

    if members.is_empty() && def.constructor == Constructor::None {
        return Err(CodecError::not_serializable(
            &def.name,
            "no serializable members and no parameterless constructor",
        ));
    }

    debug!(
        "Built metadata for `{}`: {} member(s), {:?} constructor",
        def.name,
        members.len(),
        def.constructor
    );
    Ok(TypeMetadata {
        ty: ty.clone(),
        members,
        slots,
        constructor: def.constructor,
    })
}

#[derive(Debug, Default)]
struct MetadataInner {
    generation: u64,
    entries: HashMap<String, Arc<TypeMetadata>>,
}

/// Thread-safe memo of [`TypeMetadata`], at most one build per type.
#[derive(Debug, Default)]
pub struct MetadataCache {
    inner: RwLock<MetadataInner>,
}

impl MetadataCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// # Errors
    /// Propagates the build failure; failures are not cached.
    pub fn get_or_build(
        &self,
        ty: &Ty,
        registry: &TypeRegistry,
        types: &TypeCache,
        config: &CodecConfig,
    ) -> Result<Arc<TypeMetadata>, CodecError> {
        let generation = registry.generation();
        let key = ty.name();
        {
            let inner = self.inner.read();
            if inner.generation == generation {
                if let Some(meta) = inner.entries.get(&key) {
                    return Ok(meta.clone());
                }
            }
        }

        let mut inner = self.inner.write();
        if inner.generation != generation {
            inner.entries.clear();
            inner.generation = generation;
        }
        // Another thread may have built it while we waited for the lock.
        if let Some(meta) = inner.entries.get(&key) {
            return Ok(meta.clone());
        }
        let meta = Arc::new(TypeMetadata::build(ty, registry, types, config)?);
        inner.entries.insert(key, meta.clone());
        Ok(meta)
    }

    pub fn len(&self) -> usize {
        self.inner.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

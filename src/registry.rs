use crate::error::CodecError;
use crate::types::is_builtin_name;
use crate::value::Value;
use log::debug;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

/// Produces the initial value of a field when its type is constructed.
pub type Initializer = Arc<dyn Fn() -> Value + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Public,
    Private,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    Field,
    Property { readable: bool, writable: bool },
}

/// How instances of a struct come into existence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Constructor {
    /// A public parameterless constructor.
    #[default]
    Public,
    /// A parameterless constructor that is not public.
    NonPublic,
    /// No parameterless constructor; instances are allocated uninitialized.
    None,
}

/// A declared field or property of a struct.
#[derive(Clone)]
pub struct FieldDef {
    pub(crate) name: String,
    pub(crate) type_name: String,
    pub(crate) kind: MemberKind,
    pub(crate) visibility: Visibility,
    pub(crate) ignored: bool,
    pub(crate) opt_in: bool,
    pub(crate) compiler_generated: bool,
    pub(crate) wire_name: Option<String>,
    pub(crate) converter: Option<String>,
    pub(crate) order: Option<i32>,
    pub(crate) initializer: Option<Initializer>,
}

impl FieldDef {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            kind: MemberKind::Field,
            visibility: Visibility::Public,
            ignored: false,
            opt_in: false,
            compiler_generated: false,
            wire_name: None,
            converter: None,
            order: None,
            initializer: None,
        }
    }

    pub fn property(
        name: impl Into<String>,
        type_name: impl Into<String>,
        readable: bool,
        writable: bool,
    ) -> Self {
        let mut field = Self::new(name, type_name);
        field.kind = MemberKind::Property { readable, writable };
        field
    }

    #[must_use]
    pub fn private(mut self) -> Self {
        self.visibility = Visibility::Private;
        self
    }

    #[must_use]
    pub fn ignored(mut self) -> Self {
        self.ignored = true;
        self
    }

    /// Includes a non-public member under the default member policy.
    #[must_use]
    pub fn opt_in(mut self) -> Self {
        self.opt_in = true;
        self
    }

    #[must_use]
    pub fn compiler_generated(mut self) -> Self {
        self.compiler_generated = true;
        self
    }

    #[must_use]
    pub fn wire_name(mut self, wire_name: impl Into<String>) -> Self {
        self.wire_name = Some(wire_name.into());
        self
    }

    /// Routes this member through the converter registered under `name`.
    #[must_use]
    pub fn converter(mut self, name: impl Into<String>) -> Self {
        self.converter = Some(name.into());
        self
    }

    #[must_use]
    pub fn order(mut self, order: i32) -> Self {
        self.order = Some(order);
        self
    }

    #[must_use]
    pub fn initializer(mut self, init: impl Fn() -> Value + Send + Sync + 'static) -> Self {
        self.initializer = Some(Arc::new(init));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn kind(&self) -> MemberKind {
        self.kind
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }
}

impl fmt::Debug for FieldDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDef")
            .field("name", &self.name)
            .field("type_name", &self.type_name)
            .field("kind", &self.kind)
            .field("visibility", &self.visibility)
            .field("ignored", &self.ignored)
            .field("opt_in", &self.opt_in)
            .field("compiler_generated", &self.compiler_generated)
            .field("wire_name", &self.wire_name)
            .field("converter", &self.converter)
            .field("order", &self.order)
            .field("initializer", &self.initializer.is_some())
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct StructDef {
    pub(crate) name: String,
    pub(crate) base: Option<String>,
    pub(crate) fields: Vec<FieldDef>,
    pub(crate) constructor: Constructor,
}

impl StructDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base: None,
            fields: Vec::new(),
            constructor: Constructor::Public,
        }
    }

    #[must_use]
    pub fn base(mut self, base: impl Into<String>) -> Self {
        self.base = Some(base.into());
        self
    }

    #[must_use]
    pub fn field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    #[must_use]
    pub fn constructor(mut self, constructor: Constructor) -> Self {
        self.constructor = constructor;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn base_name(&self) -> Option<&str> {
        self.base.as_deref()
    }

    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    pub fn constructor_kind(&self) -> Constructor {
        self.constructor
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumDef {
    pub(crate) name: String,
    pub(crate) variants: Vec<String>,
}

impl EnumDef {
    pub fn new<I, S>(name: impl Into<String>, variants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            variants: variants.into_iter().map(Into::into).collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn variants(&self) -> &[String] {
        &self.variants
    }

    pub fn ordinal(&self, variant: &str) -> Option<usize> {
        self.variants.iter().position(|v| v == variant)
    }
}

/// A user-declared type.
#[derive(Debug, Clone)]
pub enum TypeDef {
    Struct(Arc<StructDef>),
    Enum(Arc<EnumDef>),
    /// A type known by name only, with no introspectable shape.
    Opaque(Arc<str>),
}

impl TypeDef {
    pub fn opaque(name: &str) -> Self {
        TypeDef::Opaque(Arc::from(name))
    }

    pub fn name(&self) -> &str {
        match self {
            TypeDef::Struct(def) => &def.name,
            TypeDef::Enum(def) => &def.name,
            TypeDef::Opaque(name) => name,
        }
    }
}

impl From<StructDef> for TypeDef {
    fn from(def: StructDef) -> Self {
        TypeDef::Struct(Arc::new(def))
    }
}

impl From<EnumDef> for TypeDef {
    fn from(def: EnumDef) -> Self {
        TypeDef::Enum(Arc::new(def))
    }
}

#[derive(Debug, Default)]
struct RegistryInner {
    types: HashMap<String, TypeDef>,
    generation: u64,
}

/// The set of user-declared types a codec can resolve by name.
///
/// Every registration bumps a generation counter; caches built on top of the
/// registry compare it to notice that their entries are out of date.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    inner: RwLock<RegistryInner>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a type.
    ///
    /// # Errors
    /// Returns `NotSerializable` when the name collides with a built-in type or
    /// contains type-expression syntax.
    pub fn register(&self, def: impl Into<TypeDef>) -> Result<(), CodecError> {
        let def = def.into();
        let name = def.name().to_string();
        if name.is_empty() || is_builtin_name(&name) {
            return Err(CodecError::not_serializable(
                &name,
                "the name is reserved for a built-in type",
            ));
        }
        if name.contains(['<', '>', '[', ']', ',']) || name.contains(char::is_whitespace) {
            return Err(CodecError::not_serializable(
                &name,
                "type names cannot contain brackets, commas or whitespace",
            ));
        }
        let mut inner = self.inner.write();
        inner.generation += 1;
        debug!(
            "Registered type `{}` (generation {})",
            name, inner.generation
        );
        inner.types.insert(name, def);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<TypeDef> {
        self.inner.read().types.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner.read().types.contains_key(name)
    }

    pub fn generation(&self) -> u64 {
        self.inner.read().generation
    }

    pub fn type_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.read().types.keys().cloned().collect();
        names.sort();
        names
    }

    /// Whether `derived` is `base` or inherits from it. Stops on a cyclic base
    /// chain instead of looping.
    pub fn is_subtype(&self, derived: &str, base: &str) -> bool {
        let inner = self.inner.read();
        let mut seen = HashSet::new();
        let mut current = Some(derived.to_string());
        while let Some(name) = current {
            if name == base {
                return true;
            }
            if !seen.insert(name.clone()) {
                return false;
            }
            current = match inner.types.get(&name) {
                Some(TypeDef::Struct(def)) => def.base.clone(),
                _ => None,
            };
        }
        false
    }
}

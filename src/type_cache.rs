use crate::error::CodecError;
use crate::registry::{TypeDef, TypeRegistry};
use crate::types::{builtin, parse_type_name, Ty, TypeExpr};
use parking_lot::RwLock;
use std::collections::HashMap;

#[derive(Debug, Default)]
struct CacheInner {
    generation: u64,
    entries: HashMap<String, Ty>,
}

/// Memoizes type-name resolution against a [`TypeRegistry`].
///
/// Entries are dropped wholesale when the registry generation moves on.
/// Failed lookups are not remembered, so registering a missing type makes
/// the next lookup succeed.
#[derive(Debug, Default)]
pub struct TypeCache {
    inner: RwLock<CacheInner>,
}

impl TypeCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// # Errors
    /// Returns `UnknownType` when the name is malformed or names an
    /// unregistered type.
    pub fn resolve(&self, registry: &TypeRegistry, name: &str) -> Result<Ty, CodecError> {
        let generation = registry.generation();
        {
            let inner = self.inner.read();
            if inner.generation == generation {
                if let Some(ty) = inner.entries.get(name) {
                    return Ok(ty.clone());
                }
            }
        }

        let ty = resolve_expr(registry, &parse_type_name(name)?)?;

        let mut inner = self.inner.write();
        if inner.generation != generation {
            inner.entries.clear();
            inner.generation = generation;
        }
        inner.entries.insert(name.to_string(), ty.clone());
        Ok(ty)
    }

    pub fn len(&self) -> usize {
        self.inner.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn resolve_expr(registry: &TypeRegistry, expr: &TypeExpr) -> Result<Ty, CodecError> {
    let boxed = |e: &TypeExpr| resolve_expr(registry, e).map(Box::new);
    Ok(match expr {
        TypeExpr::Named(name) => match builtin(name) {
            Some(ty) => ty,
            None => match registry.get(name) {
                Some(TypeDef::Struct(def)) => Ty::Struct(def),
                Some(TypeDef::Enum(def)) => Ty::Enum(def),
                Some(TypeDef::Opaque(name)) => Ty::Opaque(name),
                None => return Err(CodecError::UnknownType { name: name.clone() }),
            },
        },
        TypeExpr::Array(element) => Ty::Array(boxed(element)?),
        TypeExpr::List(element) => Ty::List(boxed(element)?),
        TypeExpr::Set(element) => Ty::Set(boxed(element)?),
        TypeExpr::Map(key, value) => Ty::Map(boxed(key)?, boxed(value)?),
    })
}

use crate::codec::Context;
use crate::converters::{
    ArrayConverter, CollectionConverter, DateTimeConverter, DictionaryConverter, EnumConverter,
    PrimitiveConverter, ReflectedConverter, TypeRefConverter,
};
use crate::error::CodecError;
use crate::json::JsonValue;
use crate::types::Ty;
use crate::value::Value;
use log::debug;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// One conversion strategy between [`Value`]s and [`JsonValue`]s.
///
/// The engine hands every call a [`Context`] so a converter can recurse into
/// nested values without knowing how they are converted.
pub trait Converter: Send + Sync {
    /// Name used by member converter overrides.
    fn name(&self) -> &str;

    fn can_process(&self, ty: &Ty) -> bool;

    /// Whether the engine should track object identity around this converter.
    fn request_cycle_support(&self, _ty: &Ty) -> bool {
        false
    }

    /// Whether the engine should tag values whose runtime type differs from
    /// the storage type.
    fn request_inheritance_support(&self, _ty: &Ty) -> bool {
        true
    }

    fn try_serialize(
        &self,
        cx: &mut Context<'_>,
        value: &Value,
        ty: &Ty,
    ) -> Result<JsonValue, CodecError>;

    /// Reads `json` into `instance`, which `create_instance` produced or the
    /// caller supplied.
    fn try_deserialize(
        &self,
        cx: &mut Context<'_>,
        json: &JsonValue,
        ty: &Ty,
        instance: &mut Value,
    ) -> Result<(), CodecError>;

    fn create_instance(
        &self,
        _cx: &mut Context<'_>,
        _json: &JsonValue,
        ty: &Ty,
    ) -> Result<Value, CodecError> {
        Ok(ty.default_value())
    }
}

#[derive(Default)]
struct Resolved {
    generation: u64,
    entries: HashMap<String, Arc<dyn Converter>>,
}

/// Ordered converter list with a per-type resolution memo.
///
/// The memo belongs to one type registry generation and is dropped when
/// the generation it is asked about moves on.
pub struct ConverterRegistry {
    converters: Vec<Arc<dyn Converter>>,
    resolved: RwLock<Resolved>,
}

impl fmt::Debug for ConverterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConverterRegistry")
            .field("converters", &self.names())
            .finish_non_exhaustive()
    }
}

impl Default for ConverterRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl ConverterRegistry {
    pub fn empty() -> Self {
        Self {
            converters: Vec::new(),
            resolved: RwLock::new(Resolved::default()),
        }
    }

    /// The built-in converters in priority order, reflection last.
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        registry.converters = vec![
            Arc::new(PrimitiveConverter),
            Arc::new(EnumConverter),
            Arc::new(DateTimeConverter),
            Arc::new(ArrayConverter),
            Arc::new(CollectionConverter),
            Arc::new(DictionaryConverter),
            Arc::new(TypeRefConverter),
            Arc::new(ReflectedConverter),
        ];
        registry
    }

    /// Puts `converter` ahead of everything registered so far.
    pub fn register(&mut self, converter: Arc<dyn Converter>) {
        debug!("Registered converter `{}`", converter.name());
        self.converters.insert(0, converter);
        self.resolved.write().entries.clear();
    }

    /// Finds the first converter accepting `ty`, where `generation` is the
    /// type registry generation `ty` was resolved at.
    ///
    /// # Errors
    /// `NoConverterFound` when no converter accepts `ty`.
    pub fn resolve(&self, ty: &Ty, generation: u64) -> Result<Arc<dyn Converter>, CodecError> {
        let key = ty.name();
        {
            let resolved = self.resolved.read();
            if resolved.generation == generation {
                if let Some(converter) = resolved.entries.get(&key) {
                    return Ok(converter.clone());
                }
            }
        }
        let converter = self
            .converters
            .iter()
            .find(|c| c.can_process(ty))
            .cloned()
            .ok_or_else(|| CodecError::NoConverterFound {
                type_name: key.clone(),
            })?;
        let mut resolved = self.resolved.write();
        if resolved.generation != generation {
            resolved.entries.clear();
            resolved.generation = generation;
        }
        resolved.entries.insert(key, converter.clone());
        Ok(converter)
    }

    /// # Errors
    /// `NoConverterFound` when nothing is registered under `name`.
    pub fn by_name(&self, name: &str) -> Result<Arc<dyn Converter>, CodecError> {
        self.converters
            .iter()
            .find(|c| c.name() == name)
            .cloned()
            .ok_or_else(|| CodecError::NoConverterFound {
                type_name: name.to_string(),
            })
    }

    pub fn names(&self) -> Vec<&str> {
        self.converters.iter().map(|c| c.name()).collect()
    }
}

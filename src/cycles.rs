use crate::error::CodecError;
use crate::value::ObjectRef;
use log::trace;
use std::collections::{HashMap, HashSet};

/// Tracks object identity during one top-level conversion so that shared
/// and cyclic objects are written once and referenced afterwards.
///
/// Ids are assigned in first-encounter order starting at 0. The tables live
/// as long as at least one `enter` is unmatched and are cleared by the
/// `exit` that brings the depth back to zero.
#[derive(Debug, Default)]
pub struct CyclicReferenceManager {
    depth: usize,
    next_id: u64,
    serialized: HashMap<usize, (u64, ObjectRef)>,
    referenced: HashSet<u64>,
    deserialized: HashMap<u64, ObjectRef>,
}

impl CyclicReferenceManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enter(&mut self) {
        self.depth += 1;
    }

    /// # Panics
    /// When called more often than `enter`.
    pub fn exit(&mut self) {
        assert!(self.depth > 0, "CyclicReferenceManager::exit without enter");
        self.depth -= 1;
        if self.depth == 0 {
            trace!(
                "Clearing reference tables ({} written, {} read)",
                self.serialized.len(),
                self.deserialized.len()
            );
            self.next_id = 0;
            self.serialized.clear();
            self.referenced.clear();
            self.deserialized.clear();
        }
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Whether `obj` was already written in this conversion.
    pub fn is_reference(&self, obj: &ObjectRef) -> bool {
        self.serialized.contains_key(&obj.identity())
    }

    /// Assigns the next id to `obj`, or returns the one it already has.
    pub fn mark_serialized(&mut self, obj: &ObjectRef) -> u64 {
        if let Some((id, _)) = self.serialized.get(&obj.identity()) {
            return *id;
        }
        let id = self.next_id;
        self.next_id += 1;
        trace!("Assigned id {id} to {obj:?}");
        // Holding the handle keeps the address from being reused mid-conversion.
        self.serialized.insert(obj.identity(), (id, obj.clone()));
        id
    }

    /// The id to emit in a `$ref` to `obj`. Records that the id is referenced.
    pub fn reference_id(&mut self, obj: &ObjectRef) -> u64 {
        let id = self.mark_serialized(obj);
        self.referenced.insert(id);
        id
    }

    pub fn is_referenced(&self, id: u64) -> bool {
        self.referenced.contains(&id)
    }

    pub fn referenced_ids(&self) -> HashSet<u64> {
        self.referenced.clone()
    }

    pub fn add_reference_with_id(&mut self, id: u64, obj: ObjectRef) {
        trace!("Registered {obj:?} as id {id}");
        self.deserialized.insert(id, obj);
    }

    /// # Errors
    /// `DanglingReference` when no object was registered under `id`.
    pub fn get_reference_object(&self, id: u64) -> Result<ObjectRef, CodecError> {
        self.deserialized
            .get(&id)
            .cloned()
            .ok_or(CodecError::DanglingReference { id })
    }
}

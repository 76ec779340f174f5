//! GC root tracking
//!
//! The state's registry, globals and value stack are always roots. The
//! [`RootSet`] adds values pinned by host code that must survive
//! collections without being visible to scripts.

use crate::value::Value;

/// Identifier of a pinned root
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RootId(u32);

/// Host-pinned roots
#[derive(Debug, Default)]
pub struct RootSet {
    /// Pinned values (None = free entry)
    pinned: Vec<Option<Value>>,

    /// Free entries available for reuse
    free: Vec<u32>,
}

impl RootSet {
    /// Create an empty root set
    pub fn new() -> Self {
        Self::default()
    }

    /// Pin a value
    pub fn pin(&mut self, value: Value) -> RootId {
        if let Some(index) = self.free.pop() {
            self.pinned[index as usize] = Some(value);
            return RootId(index);
        }
        self.pinned.push(Some(value));
        RootId(self.pinned.len() as u32 - 1)
    }

    /// Unpin a value, returning it
    pub fn unpin(&mut self, id: RootId) -> Option<Value> {
        let value = self.pinned.get_mut(id.0 as usize)?.take()?;
        self.free.push(id.0);
        Some(value)
    }

    /// Get a pinned value
    pub fn get(&self, id: RootId) -> Option<&Value> {
        self.pinned.get(id.0 as usize)?.as_ref()
    }

    /// Iterate over all pinned values
    pub fn iter(&self) -> impl Iterator<Item = &Value> + '_ {
        self.pinned.iter().flatten()
    }

    /// Number of pinned values
    pub fn len(&self) -> usize {
        self.pinned.len() - self.free.len()
    }

    /// Check if nothing is pinned
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

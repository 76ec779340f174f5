//! Script tables
//!
//! Hash storage keyed by [`Key`], plus an optional metatable. Weak modes
//! are not a property of the table itself: the collector reads them from
//! the metatable's `__mode` field.

use rustc_hash::FxHashMap;

use crate::gc::GcRef;
use crate::value::{Key, Value};

/// A script table
#[derive(Debug, Default)]
pub struct Table {
    entries: FxHashMap<Key, Value>,
    metatable: Option<GcRef>,
}

impl Table {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw lookup (nil when absent)
    pub fn get(&self, key: &Key) -> Value {
        self.entries.get(key).cloned().unwrap_or_default()
    }

    /// Raw lookup by string key
    pub fn get_str(&self, name: &str) -> Value {
        self.get(&Key::from(name))
    }

    /// Raw store; storing nil removes the entry
    pub fn set(&mut self, key: Key, value: Value) {
        if value.is_nil() {
            self.entries.remove(&key);
        } else {
            self.entries.insert(key, value);
        }
    }

    /// Remove an entry
    pub fn remove(&mut self, key: &Key) -> Option<Value> {
        self.entries.remove(key)
    }

    /// Border of the array part: the largest `n` such that `1..=n` are all present
    pub fn len(&self) -> usize {
        let mut n = 0;
        while self.entries.contains_key(&Key::Integer(n as i64 + 1)) {
            n += 1;
        }
        n
    }

    /// Check if the table has no entries at all
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries (array and hash parts)
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Iterate over all entries in unspecified order
    pub fn iter(&self) -> impl Iterator<Item = (&Key, &Value)> {
        self.entries.iter()
    }

    /// Get the metatable
    pub fn metatable(&self) -> Option<GcRef> {
        self.metatable
    }

    /// Set or clear the metatable
    pub fn set_metatable(&mut self, metatable: Option<GcRef>) {
        self.metatable = metatable;
    }
}

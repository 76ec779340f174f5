//! Full userdata
//!
//! A userdata owns an opaque Rust payload and can carry a metatable and an
//! environment table. Bindings use the environment as the per-object
//! private table.

use std::any::Any;
use std::fmt;

use crate::gc::GcRef;

/// A full userdata object
pub struct Userdata {
    payload: Box<dyn Any>,
    metatable: Option<GcRef>,
    environment: Option<GcRef>,
    finalized: bool,
}

impl Userdata {
    /// Create a userdata around a payload
    pub fn new<T: Any>(payload: T) -> Self {
        Self {
            payload: Box::new(payload),
            metatable: None,
            environment: None,
            finalized: false,
        }
    }

    /// Borrow the payload if it has type `T`
    pub fn payload<T: Any>(&self) -> Option<&T> {
        self.payload.downcast_ref::<T>()
    }

    /// Mutably borrow the payload if it has type `T`
    ///
    /// The payload lives in its own box, so its address is stable for the
    /// lifetime of the userdata.
    pub fn payload_mut<T: Any>(&mut self) -> Option<&mut T> {
        self.payload.downcast_mut::<T>()
    }

    /// Get the metatable
    pub fn metatable(&self) -> Option<GcRef> {
        self.metatable
    }

    /// Set or clear the metatable
    pub fn set_metatable(&mut self, metatable: Option<GcRef>) {
        self.metatable = metatable;
    }

    /// Get the environment table
    pub fn environment(&self) -> Option<GcRef> {
        self.environment
    }

    /// Set or clear the environment table
    pub fn set_environment(&mut self, environment: Option<GcRef>) {
        self.environment = environment;
    }

    /// Whether the collector already scheduled this object's finalizer
    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    pub(crate) fn mark_finalized(&mut self) {
        self.finalized = true;
    }
}

impl fmt::Debug for Userdata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Userdata")
            .field("metatable", &self.metatable)
            .field("environment", &self.environment)
            .field("finalized", &self.finalized)
            .finish_non_exhaustive()
    }
}

//! Tether Script Heap
//!
//! This crate provides the interpreter-side capabilities that native
//! bindings consume:
//! - Values (nil, booleans, integers, numbers, strings, light userdata)
//! - Tables with metatables and weak modes
//! - Full userdata with an opaque Rust payload and a private environment table
//! - Native functions with bound upvalues
//! - A registry table, a globals table and a value stack
//! - A mark-sweep garbage collector with weak tables and one-shot finalizers
//!
//! There is no parser or bytecode here. Scripts are driven through [`State`]
//! directly (`index`, `set_index`, `call`), which is all the binding layer needs.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod defaults;
pub mod function;
pub mod gc;
pub mod state;
pub mod table;
pub mod userdata;
pub mod value;

pub use function::{native, Call, Function, NativeFn};
pub use gc::{GcRef, GcStats, Heap, RootId};
pub use state::{State, StateOptions};
pub use table::Table;
pub use userdata::Userdata;
pub use value::{Key, Value};

/// Script execution errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScriptError {
    /// Operation applied to a value of the wrong type
    #[error("Type error: {0}")]
    TypeError(String),

    /// Runtime error raised by a native function or metamethod
    #[error("Runtime error: {0}")]
    RuntimeError(String),

    /// Table key that cannot be stored (nil or NaN)
    #[error("Invalid table key: {0}")]
    InvalidKey(&'static str),

    /// Reference to an object that the collector already freed
    #[error("Stale reference to a collected object")]
    StaleReference,

    /// Call depth or metamethod chain limit exceeded
    #[error("Stack overflow")]
    StackOverflow,

    /// A finalizer raised during collection
    #[error("Error in finalizer: {0}")]
    Finalizer(String),
}

/// Script execution result
pub type ScriptResult<T> = Result<T, ScriptError>;

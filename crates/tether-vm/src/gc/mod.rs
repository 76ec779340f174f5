//! Garbage collection system
//!
//! This module provides a non-moving mark-sweep collector for the script heap.
//!
//! # Architecture
//!
//! - **GcRef**: slot index plus generation; stale references are detected
//! - **SlotHeader**: per-slot metadata (mark bit, generation)
//! - **Heap**: slot arena with a free list
//! - **RootSet**: host-pinned values
//! - **Collector**: mark, finalizer separation, weak-table clearing, sweep
//!
//! # Weak tables and finalizers
//!
//! A table whose metatable has a `__mode` string containing `k` or `v` does
//! not keep its keys or values alive. A userdata whose metatable has a
//! `__gc` field is resurrected once when it becomes unreachable, its
//! finalizer runs after the sweep, and the next collection frees it.
//!
//! # Example
//!
//! ```no_run
//! use tether_vm::{State, Value};
//!
//! let mut state = State::new();
//! let table = state.create_table();
//! state.push(Value::Table(table));
//! state.collect_garbage().unwrap(); // table survives, it is on the stack
//! ```

mod collector;
mod header;
mod heap;
mod roots;

pub use collector::GcStats;
pub use header::SlotHeader;
pub use heap::{GcRef, Heap};
pub use roots::{RootId, RootSet};

pub(crate) use heap::Object;

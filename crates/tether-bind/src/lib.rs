//! Tether Binding Runtime
//!
//! Runtime support for generated bindings that expose a native
//! object-oriented library to Tether scripts:
//! - **identity**: one script handle per native address, held weakly
//! - **marshal**: wrap/unwrap native pointers with class checks
//! - **resolve**: shadow-table and inheritance-ordered member lookup
//! - **registrar**: installs class descriptors as class tables
//! - **enums**: bidirectional enum tables
//! - **args** / **cells**: overload predicates, `argv` staging, scratch cells
//!
//! Every operation takes the [`State`] it works on; all bookkeeping tables
//! live in that state's registry and are created on first use.
//!
//! # Example
//!
//! ```no_run
//! use tether_bind::{install_classes, wrap, unwrap, ClassDescriptor, NativePtr};
//! use tether_vm::State;
//!
//! let mut state = State::new();
//! install_classes(&mut state, &[ClassDescriptor::new("QObject*")]).unwrap();
//!
//! let object = 0x1000 as *const u8;
//! let handle = wrap(&mut state, NativePtr::from(object), "QObject*").unwrap();
//! assert_eq!(unwrap(&state, &handle, "QObject*").unwrap(), Some(NativePtr::from(object)));
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod args;
pub mod cells;
pub mod enums;
pub mod error;
pub mod identity;
pub mod keys;
pub mod marshal;
pub mod registrar;
pub mod resolve;

pub use args::{
    is_boolean, is_integer, is_missing, is_number, is_string, push_arguments, push_raw_arguments,
    to_argument_array, to_int_ref, StagedArgv, StagedInt,
};
pub use enums::{
    define_enum, define_enums, is_member, lookup_by_name, lookup_by_value, push_enum, to_enum,
    EnumDescriptor,
};
pub use error::{BindError, BindResult};
pub use identity::{ensure, handle_count, live_handles, lookup, register, unregister, HandleSlot, NativePtr};
pub use marshal::{identity_of, is_kind_of, is_of_type, unwrap, wrap};
pub use registrar::{class_table, install_classes, is_installed, namespace_name, ClassDescriptor, MethodTable};

pub use tether_vm::State;

//! Argument and value helpers
//!
//! Small predicates the generated call glue uses to pick overloads, plus
//! conversions between script argument lists and C `argv` arrays.

use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_int};
use std::ptr;

use tether_vm::{GcRef, State, Value};

use crate::cells;
use crate::error::{BindError, BindResult};

// ============================================================================
// Predicates
// ============================================================================

/// Numeric with an exactly integral value
pub fn is_integer(value: &Value) -> bool {
    match value {
        Value::Integer(_) => true,
        Value::Number(_) => value.as_integer().is_some(),
        _ => false,
    }
}

/// Integer or float
pub fn is_number(value: &Value) -> bool {
    matches!(value, Value::Integer(_) | Value::Number(_))
}

/// String (numbers do not count)
pub fn is_string(value: &Value) -> bool {
    matches!(value, Value::String(_))
}

/// Boolean
pub fn is_boolean(value: &Value) -> bool {
    matches!(value, Value::Boolean(_))
}

/// Whether every 1-based position in `start..start + count` is absent or
/// nil
///
/// Used to tell overloads apart by arity; `count == 0` is vacuously true.
pub fn is_missing(args: &[Value], start: usize, count: usize) -> bool {
    (start..start.saturating_add(count)).all(|position| {
        position
            .checked_sub(1)
            .and_then(|index| args.get(index))
            .map_or(true, Value::is_nil)
    })
}

// ============================================================================
// argv marshaling
// ============================================================================

/// Backing storage of a staged `argv`
struct ArgvBlock {
    /// Owned, NUL-terminated strings
    _strings: Vec<CString>,

    /// One pointer per string plus the terminating null
    pointers: Vec<*mut c_char>,
}

/// A C `argv` array staged in a reference cell
///
/// `argv` stays valid until the cell is reclaimed, i.e. until the first
/// collection after `cell` stops being reachable.
#[derive(Debug, Clone, Copy)]
pub struct StagedArgv {
    /// Reference cell owning the array
    pub cell: GcRef,

    /// Number of strings
    pub argc: usize,

    /// Null-terminated array of `argc` C strings
    pub argv: *mut *mut c_char,
}

impl StagedArgv {
    /// `argc` as a C int (saturating)
    pub fn argc_int(&self) -> c_int {
        c_int::try_from(self.argc).unwrap_or(c_int::MAX)
    }
}

/// Convert the array part of a script table into a C `argv`
///
/// Strings and numbers (formatted as strings) are taken from position 1
/// upwards; the first other value ends the list. Strings are cut at an
/// embedded NUL.
pub fn to_argument_array(state: &mut State, list: &Value) -> BindResult<StagedArgv> {
    let Value::Table(table) = list else {
        return Err(BindError::TypeMismatch {
            expected: "table".to_string(),
            found: list.type_name().to_string(),
        });
    };

    let mut strings = Vec::new();
    for position in 1.. {
        let Some(text) = state.raw_get_index(*table, position)?.coerce_to_string() else {
            break;
        };
        strings.push(to_c_string(text));
    }

    let mut pointers: Vec<*mut c_char> = strings
        .iter()
        .map(|s| s.as_ptr() as *mut c_char)
        .collect();
    pointers.push(ptr::null_mut());

    let argc = strings.len();
    let cell = cells::stage(
        state,
        ArgvBlock {
            _strings: strings,
            pointers,
        },
    )?;
    let block = cells::payload_ptr::<ArgvBlock>(state, cell)?;
    // SAFETY: the pointer was just taken from the live cell's boxed payload.
    let argv = unsafe { (*block).pointers.as_mut_ptr() };

    Ok(StagedArgv { cell, argc, argv })
}

fn to_c_string(text: String) -> CString {
    let mut bytes = text.into_bytes();
    if let Some(nul) = bytes.iter().position(|&b| b == 0) {
        bytes.truncate(nul);
    }
    // No interior NUL remains after truncation.
    CString::new(bytes).unwrap_or_default()
}

/// Script array table holding `args`
pub fn push_arguments<S: AsRef<str>>(state: &mut State, args: &[S]) -> BindResult<Value> {
    let table = state.create_table();
    for (index, arg) in args.iter().enumerate() {
        state.raw_set_index(table, index as i64 + 1, Value::string(arg))?;
    }
    Ok(Value::Table(table))
}

/// Script array table from a null-terminated C `argv`
///
/// # Safety
///
/// `argv` must be null or point to a null-terminated array of valid,
/// NUL-terminated C strings.
pub unsafe fn push_raw_arguments(state: &mut State, argv: *const *const c_char) -> BindResult<Value> {
    let mut args = Vec::new();
    if !argv.is_null() {
        let mut cursor = argv;
        while !(*cursor).is_null() {
            args.push(CStr::from_ptr(*cursor).to_string_lossy().into_owned());
            cursor = cursor.add(1);
        }
    }
    push_arguments(state, &args)
}

/// An integer out-parameter staged in a reference cell
///
/// `ptr` stays valid until the cell is reclaimed; root `cell` to keep it
/// across a collection.
#[derive(Debug, Clone, Copy)]
pub struct StagedInt {
    /// Reference cell owning the integer
    pub cell: GcRef,

    /// The integer itself
    pub ptr: *mut c_int,
}

impl StagedInt {
    /// Current value of the out-parameter
    ///
    /// # Safety
    ///
    /// `cell` must not have been reclaimed.
    pub unsafe fn get(&self) -> c_int {
        *self.ptr
    }
}

/// Stage an integer out-parameter initialised from `value`
///
/// Non-numbers start at 0; fractional numbers are truncated.
pub fn to_int_ref(state: &mut State, value: &Value) -> BindResult<StagedInt> {
    let initial = value.as_number().map_or(0, |n| n as c_int);
    let cell = cells::stage(state, initial)?;
    let ptr = cells::payload_ptr::<c_int>(state, cell)?;
    Ok(StagedInt { cell, ptr })
}

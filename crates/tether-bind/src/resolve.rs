//! Attribute resolution chain
//!
//! Every installed class gets three metamethods:
//!
//! - `__index`: the receiver's shadow table (raw), then the class's own
//!   table (raw), then each base class table in declared order through its
//!   own `__index`. First non-nil result wins; no match yields nil.
//! - `__newindex`: raw write into the receiver's shadow table. Class tables
//!   are never written.
//! - `__gc`: calls the `__gc` function stored in the shadow table, if any,
//!   with the handle as its only argument.
//!
//! The `__index` closure holds `[class, base1, base2, ...]` as upvalues.

use tether_vm::{native, Call, GcRef, ScriptResult, State, Value};

use crate::keys;

/// `__index` for class tables
pub fn class_index(state: &mut State, call: Call) -> ScriptResult<Vec<Value>> {
    let receiver = call.arg(1);
    let key = call.arg(2);

    if let Value::Userdata(handle) = receiver {
        if let Some(shadow) = state.environment(handle)? {
            let found = state.raw_get(shadow, &key)?;
            if !found.is_nil() {
                return Ok(vec![found]);
            }
        }
    }

    for (position, class) in call.upvalues().iter().enumerate() {
        let Value::Table(class) = class else {
            continue;
        };
        let found = if position == 0 {
            state.raw_get(*class, &key)?
        } else {
            state.index(&Value::Table(*class), &key)?
        };
        if !found.is_nil() {
            return Ok(vec![found]);
        }
    }
    Ok(vec![Value::Nil])
}

/// `__newindex` for class tables
pub fn class_newindex(state: &mut State, call: Call) -> ScriptResult<Vec<Value>> {
    let Value::Userdata(handle) = call.arg(1) else {
        return Ok(Vec::new());
    };
    if let Some(shadow) = state.environment(handle)? {
        state.raw_set(shadow, call.arg(2), call.arg(3))?;
    }
    Ok(Vec::new())
}

/// `__gc` for class tables
pub fn class_gc(state: &mut State, call: Call) -> ScriptResult<Vec<Value>> {
    let receiver = call.arg(1);
    let Value::Userdata(handle) = receiver else {
        return Ok(Vec::new());
    };
    let Some(shadow) = state.environment(handle)? else {
        return Ok(Vec::new());
    };

    let finalizer = state.raw_get_field(shadow, keys::GC)?;
    if let Value::Function(_) = finalizer {
        log::trace!("running shadow finalizer for handle {}", handle);
        state.call(&finalizer, vec![receiver])?;
    }
    Ok(Vec::new())
}

/// Build the `__index` closure for `class` with its direct bases
pub fn index_function(state: &mut State, name: &str, class: GcRef, bases: &[GcRef]) -> GcRef {
    let upvalues = std::iter::once(class)
        .chain(bases.iter().copied())
        .map(Value::Table)
        .collect();
    state.create_function(&format!("{}.__index", name), native(class_index), upvalues)
}

//! Reference cells
//!
//! A reference cell is a userdata that holds native scratch data for a
//! call (argument arrays, integer out-parameters). Cells are listed in a
//! registry table with weak keys and values, which never keeps them
//! alive: a cell lives until the first collection after its last script
//! reference is gone. Callers that need a cell across a collection keep
//! the returned value on the stack or pin it.
//!
//! The payload is boxed inside the userdata, so pointers into it stay
//! valid for as long as the cell lives.
//!
//! Slots in the cell table are numbered from a counter kept in the
//! registry, so staging is constant time and an index is never reused.

use std::any::Any;

use tether_vm::{GcRef, State, Value};

use crate::error::{BindError, BindResult};
use crate::keys;

/// Stage `payload` in a new reference cell
pub fn stage<T: Any>(state: &mut State, payload: T) -> BindResult<GcRef> {
    let refs = keys::registry_table(state, keys::REFS, Some("kv"))?;
    let cell = state.create_userdata(payload);
    let slot = next_slot(state)?;
    state.raw_set_index(refs, slot, Value::Userdata(cell))?;
    Ok(cell)
}

fn next_slot(state: &mut State) -> BindResult<i64> {
    let slot = state.registry_get(keys::REFS_NEXT)?.as_integer().unwrap_or(1);
    state.registry_set(keys::REFS_NEXT, Value::Integer(slot.wrapping_add(1).max(1)))?;
    Ok(slot)
}

/// Raw pointer to the payload of a cell holding a `T`
pub fn payload_ptr<T: Any>(state: &mut State, cell: GcRef) -> BindResult<*mut T> {
    state
        .heap_mut()
        .userdata_mut(cell)?
        .payload_mut::<T>()
        .map(|payload| payload as *mut T)
        .ok_or_else(|| BindError::TypeMismatch {
            expected: std::any::type_name::<T>().to_string(),
            found: "reference cell of another type".to_string(),
        })
}

/// Number of cells not yet reclaimed
pub fn staged_count(state: &State) -> usize {
    keys::find_registry_table(state, keys::REFS)
        .and_then(|refs| state.heap().table(refs).ok())
        .map_or(0, |table| table.entry_count())
}

//! Handle marshaling
//!
//! Moves native pointers into and out of script space. The type tag of a
//! handle is its metatable: the class metadata table registered under the
//! class name, which carries an `[name] = true` marker.

use tether_vm::{State, Value};

use crate::error::{BindError, BindResult};
use crate::identity::{self, NativePtr};
use crate::keys;

/// Push a native pointer into script space as a handle of class `type_name`
///
/// The handle is interned per identity, so the same pointer always yields
/// the same handle while it is alive. The class metatable is created empty
/// if the class is not installed yet; installing it later fills that same
/// table in. A null pointer yields nil.
pub fn wrap(state: &mut State, ptr: NativePtr, type_name: &str) -> BindResult<Value> {
    if ptr.is_null() {
        return Ok(Value::Nil);
    }
    let handle = identity::ensure(state, ptr)?;
    let (metatable, _) = state.new_metatable(type_name)?;
    state.set_metatable(&handle, Some(metatable))?;
    Ok(handle)
}

/// Pull the native pointer out of a handle of class `type_name`
///
/// The class check is an exact marker match on the handle's own class
/// table; base classes are not consulted. Returns `Ok(None)` for a handle
/// whose identity was cleared by `unregister`.
pub fn unwrap(state: &State, value: &Value, type_name: &str) -> BindResult<Option<NativePtr>> {
    match checked_ptr(state, value, type_name) {
        Some(ptr) => Ok(ptr.non_null()),
        None => Err(BindError::TypeMismatch {
            expected: type_name.to_string(),
            found: describe(state, value),
        }),
    }
}

/// Whether `value` is a handle of class `type_name`
pub fn is_of_type(state: &State, value: &Value, type_name: &str) -> bool {
    checked_ptr(state, value, type_name).is_some()
}

/// Whether `value` is a handle of class `type_name` or of a class derived
/// from it
///
/// Looks the class marker up through the handle's resolution chain, so a
/// `QWidget*` handle is a kind of `QObject*` when `QWidget*` lists
/// `QObject*` among its bases.
pub fn is_kind_of(state: &mut State, value: &Value, type_name: &str) -> BindResult<bool> {
    if identity_of(state, value).is_none() || state.metafield(value, keys::INDEX)?.is_nil() {
        return Ok(false);
    }
    Ok(state.get_field(value, type_name)? == Value::Boolean(true))
}

/// Stored identity of any handle, without a class check
pub fn identity_of(state: &State, value: &Value) -> Option<NativePtr> {
    let Value::Userdata(handle) = value else {
        return None;
    };
    identity::slot(state, *handle).map(|slot| slot.ptr())
}

fn checked_ptr(state: &State, value: &Value, type_name: &str) -> Option<NativePtr> {
    let Value::Userdata(handle) = value else {
        return None;
    };
    let slot = identity::slot(state, *handle)?;
    let metatable = state.metatable(value).ok()??;
    match state.raw_get_field(metatable, type_name) {
        Ok(Value::Boolean(true)) => Some(slot.ptr()),
        _ => None,
    }
}

/// Class name of a handle, or the type name of any other value
fn describe(state: &State, value: &Value) -> String {
    let class = state
        .metafield(value, "__name")
        .ok()
        .and_then(|name| name.as_str().map(str::to_string));
    match (value, class) {
        (Value::Userdata(_), Some(class)) => class,
        _ => value.type_name().to_string(),
    }
}

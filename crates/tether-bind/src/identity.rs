//! Pointer identity registry
//!
//! Maps a native address to the single live handle that represents it on
//! the script side. The map is a registry table with weak values, so it
//! never keeps a handle alive: once scripts drop every reference, the
//! collector reclaims the handle and the entry disappears with it.
//!
//! A handle is a full userdata whose payload is a [`HandleSlot`] and whose
//! environment is its shadow-attribute table.

use std::fmt;

use tether_vm::{GcRef, State, Value};

use crate::error::BindResult;
use crate::keys;

/// Address of a native object
///
/// Never dereferenced or owned here; it is only a lookup key. The null
/// address marks a handle whose native object was unregistered.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct NativePtr(usize);

impl NativePtr {
    /// The null address
    pub const NULL: NativePtr = NativePtr(0);

    /// Wrap a raw address
    #[inline]
    pub const fn new(addr: usize) -> Self {
        NativePtr(addr)
    }

    /// Identity of the object behind a pointer
    #[inline]
    pub fn from_ptr<T>(ptr: *const T) -> Self {
        NativePtr(ptr as usize)
    }

    /// Raw address
    #[inline]
    pub const fn addr(self) -> usize {
        self.0
    }

    /// Check for the null address
    #[inline]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }

    /// Cast back to a typed pointer
    #[inline]
    pub fn as_ptr<T>(self) -> *mut T {
        self.0 as *mut T
    }

    /// `None` for the null address
    #[inline]
    pub fn non_null(self) -> Option<Self> {
        (!self.is_null()).then_some(self)
    }

    /// Registry key for this identity
    pub(crate) fn key(self) -> Value {
        Value::LightUserdata(self.0)
    }
}

impl<T> From<*const T> for NativePtr {
    fn from(ptr: *const T) -> Self {
        NativePtr::from_ptr(ptr)
    }
}

impl<T> From<*mut T> for NativePtr {
    fn from(ptr: *mut T) -> Self {
        NativePtr::from_ptr(ptr as *const T)
    }
}

impl fmt::Debug for NativePtr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NativePtr({:#x})", self.0)
    }
}

impl fmt::Display for NativePtr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Payload of a handle userdata
#[derive(Debug)]
pub struct HandleSlot {
    ptr: NativePtr,
}

impl HandleSlot {
    fn new(ptr: NativePtr) -> Self {
        Self { ptr }
    }

    /// Stored identity (null once unregistered)
    pub fn ptr(&self) -> NativePtr {
        self.ptr
    }

    fn clear(&mut self) {
        self.ptr = NativePtr::NULL;
    }
}

/// The handle for `ptr`, created (with an empty shadow table) if there is
/// no live one
pub fn ensure(state: &mut State, ptr: NativePtr) -> BindResult<Value> {
    let pointers = keys::registry_table(state, keys::POINTERS, Some("v"))?;
    let existing = state.raw_get(pointers, &ptr.key())?;
    if let Value::Userdata(_) = existing {
        return Ok(existing);
    }

    let handle = state.create_userdata(HandleSlot::new(ptr));
    let shadow = state.create_table();
    state.set_environment(handle, Some(shadow))?;
    state.raw_set(pointers, ptr.key(), Value::Userdata(handle))?;
    log::trace!("new handle {} for {}", handle, ptr);
    Ok(Value::Userdata(handle))
}

/// Make sure `ptr` has a handle without returning it
pub fn register(state: &mut State, ptr: NativePtr) -> BindResult<()> {
    ensure(state, ptr).map(drop)
}

/// Stale the live handle for `ptr` and forget the mapping
///
/// The handle object stays valid; its stored identity becomes null, so
/// `unwrap` on it yields `None`. No-op when there is no live handle.
pub fn unregister(state: &mut State, ptr: NativePtr) -> BindResult<()> {
    let Some(pointers) = keys::find_registry_table(state, keys::POINTERS) else {
        return Ok(());
    };
    let Value::Userdata(handle) = state.raw_get(pointers, &ptr.key())? else {
        return Ok(());
    };

    if let Some(slot) = state.heap_mut().userdata_mut(handle)?.payload_mut::<HandleSlot>() {
        slot.clear();
    }
    state.raw_set(pointers, ptr.key(), Value::Nil)?;
    log::trace!("staled handle {} for {}", handle, ptr);
    Ok(())
}

/// The live handle for `ptr`, without creating one
pub fn lookup(state: &State, ptr: NativePtr) -> BindResult<Option<Value>> {
    let Some(pointers) = keys::find_registry_table(state, keys::POINTERS) else {
        return Ok(None);
    };
    match state.raw_get(pointers, &ptr.key())? {
        handle @ Value::Userdata(_) => Ok(Some(handle)),
        _ => Ok(None),
    }
}

/// Number of identities with a live handle
pub fn handle_count(state: &State) -> usize {
    keys::find_registry_table(state, keys::POINTERS)
        .and_then(|pointers| state.heap().table(pointers).ok())
        .map_or(0, |table| table.entry_count())
}

/// Every registered identity with its handle, in address order
pub fn live_handles(state: &State) -> Vec<(NativePtr, GcRef)> {
    let Some(table) = keys::find_registry_table(state, keys::POINTERS)
        .and_then(|pointers| state.heap().table(pointers).ok())
    else {
        return Vec::new();
    };

    let mut handles: Vec<_> = table
        .iter()
        .filter_map(|(key, value)| match (key.to_value(), value) {
            (Value::LightUserdata(addr), Value::Userdata(handle)) => Some((NativePtr(addr), *handle)),
            _ => None,
        })
        .collect();
    handles.sort_unstable();
    handles
}

/// The handle slot of a userdata, if it is a handle
pub(crate) fn slot(state: &State, handle: GcRef) -> Option<&HandleSlot> {
    state.heap().userdata(handle).ok()?.payload::<HandleSlot>()
}

//! Heap allocator for GC-managed objects
//!
//! Objects live in a `Vec` of slots. A [`GcRef`] stores the slot index and
//! the slot generation at allocation time, so references stay valid across
//! `Vec` growth and a reference to a freed (or reused) slot is reported as
//! [`ScriptError::StaleReference`] instead of reaching the wrong object.

use std::fmt;

use super::header::SlotHeader;
use crate::function::Function;
use crate::table::Table;
use crate::userdata::Userdata;
use crate::{ScriptError, ScriptResult};

/// Reference to a heap object
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GcRef {
    index: u32,
    generation: u32,
}

impl GcRef {
    /// Slot index
    #[inline]
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Slot generation this reference was created for
    #[inline]
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Display for GcRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}.{}", self.index, self.generation)
    }
}

/// A heap-allocated object
#[derive(Debug)]
pub(crate) enum Object {
    Table(Table),
    Userdata(Userdata),
    Function(Function),
}

impl Object {
    fn kind(&self) -> &'static str {
        match self {
            Object::Table(_) => "table",
            Object::Userdata(_) => "userdata",
            Object::Function(_) => "function",
        }
    }
}

#[derive(Debug, Default)]
struct Slot {
    header: SlotHeader,
    object: Option<Object>,
}

/// Heap allocator for GC-managed objects
#[derive(Debug, Default)]
pub struct Heap {
    /// All slots, live and free
    slots: Vec<Slot>,

    /// Indices of free slots
    free_list: Vec<u32>,

    /// Number of live objects
    live: usize,
}

impl Heap {
    /// Create an empty heap
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate an object, reusing a free slot when one is available
    pub(crate) fn allocate(&mut self, object: Object) -> GcRef {
        self.live += 1;
        if let Some(index) = self.free_list.pop() {
            let slot = &mut self.slots[index as usize];
            slot.object = Some(object);
            return GcRef {
                index,
                generation: slot.header.generation(),
            };
        }

        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            header: SlotHeader::default(),
            object: Some(object),
        });
        GcRef {
            index,
            generation: 0,
        }
    }

    /// Check whether a reference still points at a live object
    pub fn contains(&self, r: GcRef) -> bool {
        self.slot(r).is_some()
    }

    /// Number of live objects
    pub fn live_count(&self) -> usize {
        self.live
    }

    /// Number of slots, live or free
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    fn slot(&self, r: GcRef) -> Option<&Slot> {
        self.slots
            .get(r.index as usize)
            .filter(|slot| slot.header.generation() == r.generation && slot.object.is_some())
    }

    fn slot_mut(&mut self, r: GcRef) -> Option<&mut Slot> {
        self.slots
            .get_mut(r.index as usize)
            .filter(|slot| slot.header.generation() == r.generation && slot.object.is_some())
    }

    pub(crate) fn get(&self, r: GcRef) -> ScriptResult<&Object> {
        self.slot(r)
            .and_then(|slot| slot.object.as_ref())
            .ok_or(ScriptError::StaleReference)
    }

    pub(crate) fn get_mut(&mut self, r: GcRef) -> ScriptResult<&mut Object> {
        self.slot_mut(r)
            .and_then(|slot| slot.object.as_mut())
            .ok_or(ScriptError::StaleReference)
    }

    /// Borrow a table
    pub fn table(&self, r: GcRef) -> ScriptResult<&Table> {
        match self.get(r)? {
            Object::Table(t) => Ok(t),
            other => Err(wrong_kind("table", other)),
        }
    }

    /// Mutably borrow a table
    pub fn table_mut(&mut self, r: GcRef) -> ScriptResult<&mut Table> {
        match self.get_mut(r)? {
            Object::Table(t) => Ok(t),
            other => Err(wrong_kind("table", other)),
        }
    }

    /// Borrow a userdata
    pub fn userdata(&self, r: GcRef) -> ScriptResult<&Userdata> {
        match self.get(r)? {
            Object::Userdata(u) => Ok(u),
            other => Err(wrong_kind("userdata", other)),
        }
    }

    /// Mutably borrow a userdata
    pub fn userdata_mut(&mut self, r: GcRef) -> ScriptResult<&mut Userdata> {
        match self.get_mut(r)? {
            Object::Userdata(u) => Ok(u),
            other => Err(wrong_kind("userdata", other)),
        }
    }

    /// Borrow a function
    pub fn function(&self, r: GcRef) -> ScriptResult<&Function> {
        match self.get(r)? {
            Object::Function(f) => Ok(f),
            other => Err(wrong_kind("function", other)),
        }
    }

    // ------------------------------------------------------------------------
    // Collector support
    // ------------------------------------------------------------------------

    /// Clear every mark bit
    pub(crate) fn unmark_all(&mut self) {
        for slot in &mut self.slots {
            slot.header.unmark();
        }
    }

    /// Mark a live object; false if it was already marked or is stale
    pub(crate) fn try_mark(&mut self, r: GcRef) -> bool {
        match self.slot_mut(r) {
            Some(slot) if !slot.header.is_marked() => {
                slot.header.mark();
                true
            }
            _ => false,
        }
    }

    /// Whether a live object is marked (stale references count as unmarked)
    pub(crate) fn is_marked(&self, r: GcRef) -> bool {
        self.slot(r).map_or(false, |slot| slot.header.is_marked())
    }

    /// References to every live, unmarked object
    pub(crate) fn unmarked(&self) -> Vec<GcRef> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.object.is_some() && !slot.header.is_marked())
            .map(|(index, slot)| GcRef {
                index: index as u32,
                generation: slot.header.generation(),
            })
            .collect()
    }

    /// Free a live object, retiring its slot generation
    pub(crate) fn free(&mut self, r: GcRef) -> bool {
        let Some(slot) = self.slot_mut(r) else {
            return false;
        };
        slot.object = None;
        slot.header.retire();
        self.free_list.push(r.index);
        self.live -= 1;
        true
    }
}

fn wrong_kind(expected: &str, found: &Object) -> ScriptError {
    ScriptError::TypeError(format!("expected {}, found {}", expected, found.kind()))
}

//! Mark-sweep garbage collector
//!
//! A collection runs in five phases:
//! 1. Mark everything reachable from the registry, globals, stack, pinned
//!    roots and pending finalizers. Weak tables skip their weak halves.
//! 2. Separate unreachable userdata that have a `__gc` metamethod, flag
//!    them finalized and resurrect them (plus everything they reach).
//! 3. Clear weak-table entries whose weak key or value died, and weak
//!    values that are finalized userdata.
//! 4. Sweep every object still unmarked.
//! 5. Run the queued finalizers in the order they were found.

use std::time::{Duration, Instant};

use super::heap::{GcRef, Object};
use crate::state::State;
use crate::value::{Key, Value};
use crate::{ScriptError, ScriptResult};

/// Garbage collector statistics
#[derive(Debug, Clone, Default)]
pub struct GcStats {
    /// Total number of collections
    pub collections: usize,

    /// Total objects freed
    pub objects_freed: usize,

    /// Total finalizers run
    pub finalizers_run: usize,

    /// Objects freed in last collection
    pub last_freed_count: usize,

    /// Live objects after last collection
    pub live_objects: usize,

    /// Total pause time across all collections
    pub total_pause_time: Duration,

    /// Last collection duration
    pub last_pause_time: Duration,
}

impl GcStats {
    fn update(&mut self, freed: usize, finalized: usize, live: usize, pause: Duration) {
        self.collections += 1;
        self.objects_freed += freed;
        self.finalizers_run += finalized;
        self.last_freed_count = freed;
        self.live_objects = live;
        self.total_pause_time += pause;
        self.last_pause_time = pause;
    }
}

/// A weak table found during marking
struct WeakTable {
    table: GcRef,
    weak_keys: bool,
    weak_values: bool,
}

impl State {
    /// Run a full collection, returning the number of objects freed
    ///
    /// Every queued finalizer runs even if an earlier one fails; the first
    /// failure is returned as [`ScriptError::Finalizer`]. Calling this from
    /// inside a finalizer does nothing and returns `Ok(0)`.
    pub fn collect_garbage(&mut self) -> ScriptResult<usize> {
        if self.collecting {
            return Ok(0);
        }
        self.collecting = true;
        let start = Instant::now();

        self.heap.unmark_all();
        let mut weak = Vec::new();
        let mut worklist = self.root_refs();
        self.mark_worklist(&mut worklist, &mut weak);

        let separated = self.separate_finalizable();
        let mut worklist: Vec<GcRef> = separated
            .iter()
            .copied()
            .filter(|r| self.heap.try_mark(*r))
            .collect();
        self.mark_worklist(&mut worklist, &mut weak);
        self.pending_finalizers.extend(separated);

        self.clear_weak_tables(&weak);
        let freed = self.sweep();
        let (finalized, failure) = self.run_finalizers();

        let pause = start.elapsed();
        let live = self.heap.live_count();
        self.stats.update(freed, finalized, live, pause);
        log::debug!(
            "gc: freed {} objects, ran {} finalizers, {} live, pause {:?}",
            freed,
            finalized,
            live,
            pause
        );

        self.collecting = false;
        match failure {
            Some(message) => Err(ScriptError::Finalizer(message)),
            None => Ok(freed),
        }
    }

    /// Collector statistics
    pub fn gc_stats(&self) -> &GcStats {
        &self.stats
    }

    // ========================================================================
    // Mark phase
    // ========================================================================

    fn root_refs(&mut self) -> Vec<GcRef> {
        let mut candidates = vec![self.registry, self.globals];
        candidates.extend(self.stack.iter().filter_map(Value::as_gc_ref));
        candidates.extend(self.roots.iter().filter_map(Value::as_gc_ref));
        candidates.extend(self.pending_finalizers.iter().copied());

        candidates
            .into_iter()
            .filter(|r| self.heap.try_mark(*r))
            .collect()
    }

    fn mark_worklist(&mut self, worklist: &mut Vec<GcRef>, weak: &mut Vec<WeakTable>) {
        while let Some(r) = worklist.pop() {
            for child in self.children(r, weak) {
                if self.heap.try_mark(child) {
                    worklist.push(child);
                }
            }
        }
    }

    /// Strong references held by an object
    fn children(&self, r: GcRef, weak: &mut Vec<WeakTable>) -> Vec<GcRef> {
        let Ok(object) = self.heap.get(r) else {
            return Vec::new();
        };
        match object {
            Object::Table(table) => {
                let mut children = Vec::new();
                let (weak_keys, weak_values) = match table.metatable() {
                    Some(mt) => {
                        children.push(mt);
                        self.weak_mode(mt)
                    }
                    None => (false, false),
                };
                if weak_keys || weak_values {
                    weak.push(WeakTable {
                        table: r,
                        weak_keys,
                        weak_values,
                    });
                }
                for (key, value) in table.iter() {
                    if !weak_keys {
                        children.extend(key.as_gc_ref());
                    }
                    if !weak_values {
                        children.extend(value.as_gc_ref());
                    }
                }
                children
            }
            Object::Userdata(ud) => ud.metatable().into_iter().chain(ud.environment()).collect(),
            Object::Function(f) => f.upvalues().iter().filter_map(Value::as_gc_ref).collect(),
        }
    }

    /// `(weak_keys, weak_values)` from a metatable's raw `__mode`
    fn weak_mode(&self, metatable: GcRef) -> (bool, bool) {
        match self.heap.table(metatable).map(|mt| mt.get_str("__mode")) {
            Ok(Value::String(mode)) => (mode.contains('k'), mode.contains('v')),
            _ => (false, false),
        }
    }

    // ========================================================================
    // Finalizer separation
    // ========================================================================

    fn separate_finalizable(&mut self) -> Vec<GcRef> {
        let mut separated = Vec::new();
        for r in self.heap.unmarked() {
            let wants_finalizer = match self.heap.userdata(r) {
                Ok(ud) if !ud.is_finalized() => ud
                    .metatable()
                    .and_then(|mt| self.heap.table(mt).ok())
                    .map_or(false, |mt| !mt.get_str("__gc").is_nil()),
                _ => false,
            };
            if wants_finalizer {
                if let Ok(ud) = self.heap.userdata_mut(r) {
                    ud.mark_finalized();
                }
                separated.push(r);
            }
        }
        separated
    }

    // ========================================================================
    // Weak tables and sweep
    // ========================================================================

    fn is_cleared(&self, value: &Value, is_key: bool) -> bool {
        let Some(r) = value.as_gc_ref() else {
            return false;
        };
        if !self.heap.is_marked(r) {
            return true;
        }
        !is_key && matches!(self.heap.userdata(r), Ok(ud) if ud.is_finalized())
    }

    fn clear_weak_tables(&mut self, weak: &[WeakTable]) {
        for entry in weak {
            let dead: Vec<Key> = match self.heap.table(entry.table) {
                Ok(table) => table
                    .iter()
                    .filter(|(key, value)| {
                        (entry.weak_keys && self.is_cleared(&key.to_value(), true))
                            || (entry.weak_values && self.is_cleared(value, false))
                    })
                    .map(|(key, _)| key.clone())
                    .collect(),
                Err(_) => continue,
            };
            if dead.is_empty() {
                continue;
            }
            if let Ok(table) = self.heap.table_mut(entry.table) {
                for key in &dead {
                    table.remove(key);
                }
            }
        }
    }

    fn sweep(&mut self) -> usize {
        self.heap
            .unmarked()
            .into_iter()
            .filter(|r| self.heap.free(*r))
            .count()
    }

    // ========================================================================
    // Finalizers
    // ========================================================================

    fn run_finalizers(&mut self) -> (usize, Option<String>) {
        let mut ran = 0;
        let mut first_failure = None;

        while let Some(r) = self.pending_finalizers.pop_front() {
            let target = Value::Userdata(r);
            let finalizer = match self.metafield(&target, "__gc") {
                Ok(f @ Value::Function(_)) => f,
                _ => continue,
            };
            ran += 1;
            if let Err(err) = self.call(&finalizer, vec![target]) {
                let message = match err {
                    ScriptError::RuntimeError(message) => message,
                    other => other.to_string(),
                };
                log::warn!("gc: finalizer for {} failed: {}", r, message);
                first_failure.get_or_insert(message);
            }
        }

        (ran, first_failure)
    }
}

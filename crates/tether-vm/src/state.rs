//! Script state
//!
//! [`State`] is the explicit context every binding operation receives. It
//! owns the heap, the registry table (process-wide singletons), the globals
//! table, the value stack and the collector bookkeeping. Independent states
//! share nothing, so tests can run many of them side by side.

use std::any::Any;
use std::collections::VecDeque;

use crate::defaults::{DEFAULT_MAX_CALL_DEPTH, DEFAULT_MAX_INDEX_CHAIN, DEFAULT_STACK_LIMIT};
use crate::function::{Call, Function, NativeFn};
use crate::gc::{GcRef, GcStats, Heap, Object, RootId, RootSet};
use crate::table::Table;
use crate::userdata::Userdata;
use crate::value::{Key, Value};
use crate::{ScriptError, ScriptResult};

/// State configuration
#[derive(Debug, Clone)]
pub struct StateOptions {
    /// Maximum nesting of native calls
    pub max_call_depth: usize,

    /// Maximum `__index`/`__newindex` table hops per access
    pub max_index_chain: usize,

    /// Maximum stack height a call may reach
    pub stack_limit: usize,
}

impl Default for StateOptions {
    fn default() -> Self {
        Self {
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            max_index_chain: DEFAULT_MAX_INDEX_CHAIN,
            stack_limit: DEFAULT_STACK_LIMIT,
        }
    }
}

/// An embedded script state
pub struct State {
    pub(crate) heap: Heap,
    pub(crate) roots: RootSet,
    pub(crate) registry: GcRef,
    pub(crate) globals: GcRef,
    pub(crate) stack: Vec<Value>,
    pub(crate) options: StateOptions,
    pub(crate) call_depth: usize,
    pub(crate) pending_finalizers: VecDeque<GcRef>,
    pub(crate) collecting: bool,
    pub(crate) stats: GcStats,
}

impl State {
    /// Create a state with default options
    pub fn new() -> Self {
        Self::with_options(StateOptions::default())
    }

    /// Create a state with custom options
    pub fn with_options(options: StateOptions) -> Self {
        let mut heap = Heap::new();
        let registry = heap.allocate(Object::Table(Table::new()));
        let globals = heap.allocate(Object::Table(Table::new()));
        Self {
            heap,
            roots: RootSet::new(),
            registry,
            globals,
            stack: Vec::new(),
            options,
            call_depth: 0,
            pending_finalizers: VecDeque::new(),
            collecting: false,
            stats: GcStats::default(),
        }
    }

    /// Configuration
    pub fn options(&self) -> &StateOptions {
        &self.options
    }

    /// The heap
    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    /// The heap, mutably
    pub fn heap_mut(&mut self) -> &mut Heap {
        &mut self.heap
    }

    /// The registry table
    pub fn registry(&self) -> GcRef {
        self.registry
    }

    /// The globals table
    pub fn globals(&self) -> GcRef {
        self.globals
    }

    // ========================================================================
    // Allocation
    // ========================================================================

    /// Allocate an empty table
    pub fn create_table(&mut self) -> GcRef {
        self.heap.allocate(Object::Table(Table::new()))
    }

    /// Allocate a userdata around `payload`
    pub fn create_userdata<T: Any>(&mut self, payload: T) -> GcRef {
        self.heap.allocate(Object::Userdata(Userdata::new(payload)))
    }

    /// Allocate a native function with bound upvalues
    pub fn create_function(&mut self, name: &str, func: NativeFn, upvalues: Vec<Value>) -> GcRef {
        self.heap
            .allocate(Object::Function(Function::new(name, func, upvalues)))
    }

    // ========================================================================
    // Value stack
    // ========================================================================

    /// Push a value; values on the stack are GC roots
    pub fn push(&mut self, value: Value) {
        self.stack.push(value);
    }

    /// Pop the top value (nil when empty)
    pub fn pop(&mut self) -> Value {
        self.stack.pop().unwrap_or_default()
    }

    /// Number of values on the stack
    pub fn top(&self) -> usize {
        self.stack.len()
    }

    /// Value at `index`: positive is 1-based from the bottom, negative
    /// counts from the top. Nil when out of range.
    pub fn get(&self, index: isize) -> Value {
        self.absolute(index)
            .and_then(|i| self.stack.get(i))
            .cloned()
            .unwrap_or_default()
    }

    /// Truncate the stack to `top` values, or pad it with nils
    pub fn set_top(&mut self, top: usize) {
        self.stack.resize(top, Value::Nil);
    }

    /// All stack values, bottom first
    pub fn stack(&self) -> &[Value] {
        &self.stack
    }

    fn absolute(&self, index: isize) -> Option<usize> {
        if index > 0 {
            Some(index as usize - 1)
        } else if index < 0 {
            self.stack.len().checked_sub(index.unsigned_abs())
        } else {
            None
        }
    }

    // ========================================================================
    // Pinned roots
    // ========================================================================

    /// Keep a value alive across collections without putting it on the stack
    pub fn pin(&mut self, value: Value) -> RootId {
        self.roots.pin(value)
    }

    /// Release a pinned value
    pub fn unpin(&mut self, id: RootId) -> Option<Value> {
        self.roots.unpin(id)
    }

    // ========================================================================
    // Raw table access
    // ========================================================================

    /// Raw lookup; nil and NaN keys yield nil
    pub fn raw_get(&self, table: GcRef, key: &Value) -> ScriptResult<Value> {
        let table = self.heap.table(table)?;
        Ok(match Key::from_value(key) {
            Ok(key) => table.get(&key),
            Err(_) => Value::Nil,
        })
    }

    /// Raw store; nil and NaN keys are rejected
    pub fn raw_set(&mut self, table: GcRef, key: Value, value: Value) -> ScriptResult<()> {
        let key = Key::from_value(&key)?;
        self.heap.table_mut(table)?.set(key, value);
        Ok(())
    }

    /// Raw lookup by string key
    pub fn raw_get_field(&self, table: GcRef, name: &str) -> ScriptResult<Value> {
        Ok(self.heap.table(table)?.get_str(name))
    }

    /// Raw store by string key
    pub fn raw_set_field(&mut self, table: GcRef, name: &str, value: Value) -> ScriptResult<()> {
        self.heap.table_mut(table)?.set(Key::from(name), value);
        Ok(())
    }

    /// Raw lookup by integer key
    pub fn raw_get_index(&self, table: GcRef, index: i64) -> ScriptResult<Value> {
        Ok(self.heap.table(table)?.get(&Key::Integer(index)))
    }

    /// Raw store by integer key
    pub fn raw_set_index(&mut self, table: GcRef, index: i64, value: Value) -> ScriptResult<()> {
        self.heap.table_mut(table)?.set(Key::Integer(index), value);
        Ok(())
    }

    /// Border length of a table
    pub fn raw_len(&self, table: GcRef) -> ScriptResult<usize> {
        Ok(self.heap.table(table)?.len())
    }

    // ========================================================================
    // Metatables and environments
    // ========================================================================

    /// Metatable of a table or userdata
    pub fn metatable(&self, value: &Value) -> ScriptResult<Option<GcRef>> {
        match value {
            Value::Table(r) => Ok(self.heap.table(*r)?.metatable()),
            Value::Userdata(r) => Ok(self.heap.userdata(*r)?.metatable()),
            _ => Ok(None),
        }
    }

    /// Set or clear the metatable of a table or userdata
    pub fn set_metatable(&mut self, value: &Value, metatable: Option<GcRef>) -> ScriptResult<()> {
        if let Some(mt) = metatable {
            self.heap.table(mt)?;
        }
        match value {
            Value::Table(r) => self.heap.table_mut(*r)?.set_metatable(metatable),
            Value::Userdata(r) => self.heap.userdata_mut(*r)?.set_metatable(metatable),
            other => {
                return Err(ScriptError::TypeError(format!(
                    "cannot set the metatable of a {} value",
                    other.type_name()
                )))
            }
        }
        Ok(())
    }

    /// Raw field of a value's metatable (nil without a metatable)
    pub fn metafield(&self, value: &Value, name: &str) -> ScriptResult<Value> {
        match self.metatable(value)? {
            Some(mt) => self.raw_get_field(mt, name),
            None => Ok(Value::Nil),
        }
    }

    /// Environment table of a userdata
    pub fn environment(&self, userdata: GcRef) -> ScriptResult<Option<GcRef>> {
        Ok(self.heap.userdata(userdata)?.environment())
    }

    /// Set or clear the environment table of a userdata
    pub fn set_environment(&mut self, userdata: GcRef, environment: Option<GcRef>) -> ScriptResult<()> {
        if let Some(env) = environment {
            self.heap.table(env)?;
        }
        self.heap.userdata_mut(userdata)?.set_environment(environment);
        Ok(())
    }

    /// Get or create the registry metatable named `name`
    ///
    /// A new table gets `__name = name`. Returns the table and whether it
    /// was created by this call.
    pub fn new_metatable(&mut self, name: &str) -> ScriptResult<(GcRef, bool)> {
        if let Value::Table(existing) = self.raw_get_field(self.registry, name)? {
            return Ok((existing, false));
        }
        let mt = self.create_table();
        self.raw_set_field(mt, "__name", Value::string(name))?;
        self.raw_set_field(self.registry, name, Value::Table(mt))?;
        Ok((mt, true))
    }

    // ========================================================================
    // Registry and globals
    // ========================================================================

    /// Registry entry
    pub fn registry_get(&self, name: &str) -> ScriptResult<Value> {
        self.raw_get_field(self.registry, name)
    }

    /// Set a registry entry
    pub fn registry_set(&mut self, name: &str, value: Value) -> ScriptResult<()> {
        self.raw_set_field(self.registry, name, value)
    }

    /// Global variable
    pub fn get_global(&self, name: &str) -> ScriptResult<Value> {
        self.raw_get_field(self.globals, name)
    }

    /// Set a global variable
    pub fn set_global(&mut self, name: &str, value: Value) -> ScriptResult<()> {
        self.raw_set_field(self.globals, name, value)
    }

    // ========================================================================
    // Metamethod-aware access
    // ========================================================================

    /// `obj[key]` honouring `__index`
    pub fn index(&mut self, obj: &Value, key: &Value) -> ScriptResult<Value> {
        let mut current = obj.clone();
        for _ in 0..self.options.max_index_chain {
            let handler = match &current {
                Value::Table(t) => {
                    let found = self.raw_get(*t, key)?;
                    if !found.is_nil() {
                        return Ok(found);
                    }
                    let handler = self.metafield(&current, "__index")?;
                    if handler.is_nil() {
                        return Ok(Value::Nil);
                    }
                    handler
                }
                other => {
                    let handler = self.metafield(other, "__index")?;
                    if handler.is_nil() {
                        return Err(ScriptError::TypeError(format!(
                            "attempt to index a {} value",
                            other.type_name()
                        )));
                    }
                    handler
                }
            };

            if let Value::Function(_) = handler {
                let results = self.call(&handler, vec![current, key.clone()])?;
                return Ok(results.into_iter().next().unwrap_or_default());
            }
            current = handler;
        }
        Err(ScriptError::StackOverflow)
    }

    /// `obj[key] = value` honouring `__newindex`
    pub fn set_index(&mut self, obj: &Value, key: Value, value: Value) -> ScriptResult<()> {
        let mut current = obj.clone();
        for _ in 0..self.options.max_index_chain {
            let handler = match &current {
                Value::Table(t) => {
                    if !self.raw_get(*t, &key)?.is_nil() {
                        return self.raw_set(*t, key, value);
                    }
                    let handler = self.metafield(&current, "__newindex")?;
                    if handler.is_nil() {
                        return self.raw_set(*t, key, value);
                    }
                    handler
                }
                other => {
                    let handler = self.metafield(other, "__newindex")?;
                    if handler.is_nil() {
                        return Err(ScriptError::TypeError(format!(
                            "attempt to index a {} value",
                            other.type_name()
                        )));
                    }
                    handler
                }
            };

            if let Value::Function(_) = handler {
                self.call(&handler, vec![current, key, value])?;
                return Ok(());
            }
            current = handler;
        }
        Err(ScriptError::StackOverflow)
    }

    /// `obj[name]` honouring `__index`
    pub fn get_field(&mut self, obj: &Value, name: &str) -> ScriptResult<Value> {
        self.index(obj, &Value::string(name))
    }

    /// `obj[name] = value` honouring `__newindex`
    pub fn set_field(&mut self, obj: &Value, name: &str, value: Value) -> ScriptResult<()> {
        self.set_index(obj, Value::string(name), value)
    }

    // ========================================================================
    // Calls
    // ========================================================================

    /// Call a function value
    ///
    /// The function and its arguments sit on the stack for the duration of
    /// the call, so they stay reachable if the callee collects.
    pub fn call(&mut self, func: &Value, args: Vec<Value>) -> ScriptResult<Vec<Value>> {
        let Value::Function(r) = func else {
            return Err(ScriptError::TypeError(format!(
                "attempt to call a {} value",
                func.type_name()
            )));
        };
        if self.call_depth >= self.options.max_call_depth
            || self.stack.len() + args.len() + 1 > self.options.stack_limit
        {
            return Err(ScriptError::StackOverflow);
        }

        let (native, upvalues) = {
            let function = self.heap.function(*r)?;
            (function.native().clone(), function.shared_upvalues())
        };

        let base = self.stack.len();
        self.stack.push(func.clone());
        self.stack.extend(args.iter().cloned());
        self.call_depth += 1;

        let result = native(self, Call::new(args, upvalues));

        self.call_depth -= 1;
        self.stack.truncate(base);
        result
    }

    /// Call a method: `obj[name](obj, args...)`
    pub fn call_method(&mut self, obj: &Value, name: &str, mut args: Vec<Value>) -> ScriptResult<Vec<Value>> {
        let method = self.get_field(obj, name)?;
        if method.is_nil() {
            return Err(ScriptError::RuntimeError(format!("method '{}' is not defined", name)));
        }
        args.insert(0, obj.clone());
        self.call(&method, args)
    }

    /// Type names of the stack contents, bottom first (debugging aid)
    pub fn stack_summary(&self) -> Vec<&'static str> {
        self.stack.iter().map(Value::type_name).collect()
    }
}

impl Default for State {
    fn default() -> Self {
        Self::new()
    }
}

//! Class registrar
//!
//! Turns static class descriptors into installed class tables. For each
//! class the registry gets a table under the class name that holds:
//!
//! - the class's methods
//! - the is-a marker `[name] = true`
//! - `__index`, `__newindex` and `__gc` from [`crate::resolve`]
//!
//! and is its own metatable, so looking a member up on the class table
//! itself also walks the bases. A plain namespace table with only the
//! methods is published as a global named after the class, minus the
//! trailing `*` pointer marker.

use std::fmt;

use rustc_hash::FxHashSet;
use tether_vm::{native, GcRef, NativeFn, State, Value};

use crate::error::{BindError, BindResult};
use crate::keys;
use crate::resolve;

// ============================================================================
// Descriptors
// ============================================================================

/// Ordered method name -> native function list
#[derive(Clone, Default)]
pub struct MethodTable {
    entries: Vec<(String, NativeFn)>,
}

impl MethodTable {
    /// Create an empty method table
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a method (builder form)
    pub fn with(mut self, name: &str, func: NativeFn) -> Self {
        self.insert(name, func);
        self
    }

    /// Add a method, replacing an earlier one of the same name
    pub fn insert(&mut self, name: &str, func: NativeFn) {
        match self.entries.iter_mut().find(|(existing, _)| existing == name) {
            Some(entry) => entry.1 = func,
            None => self.entries.push((name.to_string(), func)),
        }
    }

    /// Number of methods
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if there are no methods
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Method names in insertion order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    fn iter(&self) -> impl Iterator<Item = (&str, &NativeFn)> {
        self.entries.iter().map(|(name, func)| (name.as_str(), func))
    }
}

impl fmt::Debug for MethodTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

/// Static description of one bound class
#[derive(Debug, Clone)]
pub struct ClassDescriptor {
    /// Class name, e.g. `QWidget*`
    pub name: String,

    /// Methods installed on the class table
    pub methods: MethodTable,

    /// Direct bases, in lookup order
    pub bases: Vec<String>,
}

impl ClassDescriptor {
    /// Create a descriptor with no methods and no bases
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            methods: MethodTable::new(),
            bases: Vec::new(),
        }
    }

    /// Add a method
    pub fn method(mut self, name: &str, func: NativeFn) -> Self {
        self.methods.insert(name, func);
        self
    }

    /// Replace the method table
    pub fn methods(mut self, methods: MethodTable) -> Self {
        self.methods = methods;
        self
    }

    /// Append a direct base
    pub fn base(mut self, name: &str) -> Self {
        self.bases.push(name.to_string());
        self
    }
}

// ============================================================================
// Installation
// ============================================================================

/// Install classes in list order
///
/// Bases must be installed already or appear earlier in the list. The
/// whole list is checked before anything is published, so a configuration
/// error leaves the state untouched.
pub fn install_classes(state: &mut State, classes: &[ClassDescriptor]) -> BindResult<()> {
    validate(state, classes)?;
    for class in classes {
        install_class(state, class)?;
    }
    Ok(())
}

fn validate(state: &State, classes: &[ClassDescriptor]) -> BindResult<()> {
    let mut pending: FxHashSet<&str> = FxHashSet::default();

    for class in classes {
        let name = class.name.as_str();
        if name.is_empty() {
            return Err(BindError::configuration(name, "class name is empty"));
        }
        if keys::is_reserved(name) {
            return Err(BindError::configuration(name, "name is a reserved registry key"));
        }
        if pending.contains(name) {
            return Err(BindError::configuration(name, "listed more than once"));
        }
        if is_installed(state, name) {
            return Err(BindError::configuration(name, "already installed"));
        }
        for base in &class.bases {
            if base == name {
                return Err(BindError::configuration(name, "class inherits from itself"));
            }
            if !pending.contains(base.as_str()) && !is_installed(state, base) {
                return Err(BindError::configuration(
                    name,
                    format!("base class '{}' is not installed", base),
                ));
            }
        }
        pending.insert(name);
    }
    Ok(())
}

fn install_class(state: &mut State, class: &ClassDescriptor) -> BindResult<()> {
    let name = class.name.as_str();
    let (table, created) = state.new_metatable(name)?;

    let mut methods = Vec::with_capacity(class.methods.len());
    for (method, func) in class.methods.iter() {
        let f = state.create_function(&format!("{}.{}", name, method), func.clone(), Vec::new());
        state.raw_set_field(table, method, Value::Function(f))?;
        methods.push((method, f));
    }
    state.raw_set_field(table, name, Value::Boolean(true))?;

    let mut bases = Vec::with_capacity(class.bases.len());
    for base in &class.bases {
        match class_table(state, base) {
            Some(base_table) => bases.push(base_table),
            None => {
                return Err(BindError::configuration(
                    name,
                    format!("base class '{}' is not installed", base),
                ))
            }
        }
    }

    let index = resolve::index_function(state, name, table, &bases);
    let newindex = state.create_function(
        &format!("{}.{}", name, keys::NEWINDEX),
        native(resolve::class_newindex),
        Vec::new(),
    );
    let gc = state.create_function(
        &format!("{}.{}", name, keys::GC),
        native(resolve::class_gc),
        Vec::new(),
    );
    state.raw_set_field(table, keys::INDEX, Value::Function(index))?;
    state.raw_set_field(table, keys::NEWINDEX, Value::Function(newindex))?;
    state.raw_set_field(table, keys::GC, Value::Function(gc))?;
    state.set_metatable(&Value::Table(table), Some(table))?;

    let namespace = state.create_table();
    for (method, f) in methods {
        state.raw_set_field(namespace, method, Value::Function(f))?;
    }
    state.set_global(namespace_name(name), Value::Table(namespace))?;

    log::debug!(
        "installed class '{}' ({} methods, bases {:?}{})",
        name,
        class.methods.len(),
        class.bases,
        if created { "" } else { ", upgraded existing table" }
    );
    Ok(())
}

// ============================================================================
// Queries
// ============================================================================

/// Whether `name` was installed by [`install_classes`]
pub fn is_installed(state: &State, name: &str) -> bool {
    class_table(state, name).is_some()
}

/// Installed class table for `name`
pub fn class_table(state: &State, name: &str) -> Option<GcRef> {
    let table = state.registry_get(name).ok()?.as_table()?;
    match state.raw_get_field(table, name) {
        Ok(Value::Boolean(true)) => Some(table),
        _ => None,
    }
}

/// Global namespace name for a class: the class name without its trailing
/// pointer marker
pub fn namespace_name(class: &str) -> &str {
    class.strip_suffix(keys::POINTER_MARKER).unwrap_or(class)
}

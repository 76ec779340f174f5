//! Registry keys and metamethod names
//!
//! Every table the binding runtime keeps lives in the state's registry
//! under one of these keys and is created on first use.

use tether_vm::{GcRef, ScriptResult, State, Value};

/// Native address -> handle, weak values
pub const POINTERS: &str = "tether.pointers";

/// Enum name -> bidirectional member table
pub const ENUMS: &str = "tether.enums";

/// Reference cells, weak keys and values
pub const REFS: &str = "tether.refs";

/// Next free index in the reference cell table
pub const REFS_NEXT: &str = "tether.refs.next";

/// Registry keys owned by the binding runtime; no class may use them
pub const RESERVED: [&str; 4] = [POINTERS, ENUMS, REFS, REFS_NEXT];

/// Attribute read metamethod
pub const INDEX: &str = "__index";

/// Attribute write metamethod
pub const NEWINDEX: &str = "__newindex";

/// Finalizer metamethod (on class tables and in shadow tables)
pub const GC: &str = "__gc";

/// Weak mode field of a metatable
pub const MODE: &str = "__mode";

/// Suffix generated class names carry to mark pointer types
pub const POINTER_MARKER: char = '*';

/// Get or create the registry table stored under `key`
///
/// A newly created table gets a metatable with `__mode = mode` when a mode
/// is given.
pub(crate) fn registry_table(state: &mut State, key: &str, mode: Option<&str>) -> ScriptResult<GcRef> {
    if let Value::Table(existing) = state.registry_get(key)? {
        return Ok(existing);
    }

    let table = state.create_table();
    if let Some(mode) = mode {
        let mt = state.create_table();
        state.raw_set_field(mt, MODE, Value::from(mode))?;
        state.set_metatable(&Value::Table(table), Some(mt))?;
    }
    state.registry_set(key, Value::Table(table))?;
    log::debug!("created registry table '{}'", key);
    Ok(table)
}

/// Whether `name` is one of the runtime's own registry keys
pub(crate) fn is_reserved(name: &str) -> bool {
    RESERVED.contains(&name)
}

/// The registry table stored under `key`, if it was created
pub(crate) fn find_registry_table(state: &State, key: &str) -> Option<GcRef> {
    state.registry_get(key).ok()?.as_table()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_table_is_created_once() {
        let mut state = State::new();
        assert!(find_registry_table(&state, POINTERS).is_none());

        let first = registry_table(&mut state, POINTERS, Some("v")).unwrap();
        let second = registry_table(&mut state, POINTERS, Some("v")).unwrap();
        assert_eq!(first, second);
        assert_eq!(find_registry_table(&state, POINTERS), Some(first));
        assert_eq!(
            state.metafield(&Value::Table(first), MODE).unwrap(),
            Value::from("v")
        );
    }

    #[test]
    fn test_reserved_keys() {
        for key in RESERVED {
            assert!(is_reserved(key));
        }
        assert!(!is_reserved("QObject*"));
        assert!(!is_reserved("tether"));
    }

    #[test]
    fn test_registry_table_without_mode_has_no_metatable() {
        let mut state = State::new();
        let enums = registry_table(&mut state, ENUMS, None).unwrap();
        assert_eq!(state.metatable(&Value::Table(enums)).unwrap(), None);
    }
}

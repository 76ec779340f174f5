//! Attribute Resolution Tests
//!
//! Tests validate member lookup and assignment on handles of installed
//! classes:
//! - Methods reached through the base chain
//! - Declared base order decides ties
//! - Shadow writes stay per instance and never touch class tables
//!
//! # Running Tests
//! ```bash
//! cargo test -p tether-bind --test resolution_tests
//! ```

mod common;

use common::{rooted, setup, FakeLibrary, ALIGNMENT};
use tether_bind::{class_table, lookup_by_name};
use tether_vm::{native, ScriptError, Value};

// ===== Method Calls =====

#[test]
fn test_methods_reach_native_objects() {
    let mut library = FakeLibrary::new();
    let mut state = setup();
    let ptr = library.create("window");
    let handle = rooted(&mut state, ptr, "QWidget*");

    state.call_method(&handle, "resize", vec![Value::Integer(640)]).unwrap();
    assert_eq!(library.get(ptr).width, 640);
    assert_eq!(
        state.call_method(&handle, "width", vec![]).unwrap(),
        vec![Value::Integer(640)]
    );

    // Inherited from QObject*
    state
        .call_method(&handle, "setObjectName", vec![Value::from("main")])
        .unwrap();
    assert_eq!(library.get(ptr).name, "main");
    assert_eq!(
        state.call_method(&handle, "objectName", vec![]).unwrap(),
        vec![Value::from("main")]
    );

    // Inherited from QPaintDevice*
    assert_eq!(
        state.call_method(&handle, "depth", vec![]).unwrap(),
        vec![Value::Integer(24)]
    );
}

#[test]
fn test_first_declared_base_wins() {
    let mut library = FakeLibrary::new();
    let mut state = setup();
    let handle = rooted(&mut state, library.create("w"), "QWidget*");

    assert_eq!(
        state.call_method(&handle, "className", vec![]).unwrap(),
        vec![Value::from("QObject")]
    );
}

#[test]
fn test_missing_member_is_nil() {
    let mut library = FakeLibrary::new();
    let mut state = setup();
    let handle = rooted(&mut state, library.create("w"), "QWidget*");

    assert!(state.get_field(&handle, "noSuchMethod").unwrap().is_nil());
    let err = state.call_method(&handle, "noSuchMethod", vec![]).unwrap_err();
    assert!(matches!(err, ScriptError::RuntimeError(_)));
}

#[test]
fn test_base_method_rejects_unrelated_receiver() {
    let mut library = FakeLibrary::new();
    let mut state = setup();
    let widget = rooted(&mut state, library.create("w"), "QWidget*");
    let object = rooted(&mut state, library.create("o"), "QObject*");

    let resize = state.get_field(&widget, "resize").unwrap();
    let err = state
        .call(&resize, vec![object, Value::Integer(1)])
        .unwrap_err();
    assert_eq!(
        err,
        ScriptError::RuntimeError("bad receiver, expected QWidget*".into())
    );
}

#[test]
fn test_enum_arguments() {
    let mut library = FakeLibrary::new();
    let mut state = setup();
    let ptr = library.create("label");
    let handle = rooted(&mut state, ptr, "QWidget*");

    state
        .call_method(&handle, "setAlignment", vec![Value::from("AlignRight")])
        .unwrap();
    assert_eq!(library.get(ptr).alignment, 2);

    let combined = lookup_by_name(&state, ALIGNMENT, "AlignLeft").unwrap() | 4;
    state
        .call_method(&handle, "setAlignment", vec![Value::Integer(combined)])
        .unwrap();
    assert_eq!(library.get(ptr).alignment, 5);

    let err = state
        .call_method(&handle, "setAlignment", vec![Value::from("AlignNowhere")])
        .unwrap_err();
    assert_eq!(err, ScriptError::TypeError("alignment expected".into()));
}

// ===== Shadow Attributes =====

#[test]
fn test_shadow_write_is_per_instance() {
    let mut library = FakeLibrary::new();
    let mut state = setup();
    let first = rooted(&mut state, library.create("a"), "QWidget*");
    let second = rooted(&mut state, library.create("b"), "QWidget*");

    state.set_field(&first, "x", Value::Integer(42)).unwrap();
    assert_eq!(state.get_field(&first, "x").unwrap(), Value::Integer(42));
    assert!(state.get_field(&second, "x").unwrap().is_nil());

    for class in ["QWidget*", "QObject*", "QPaintDevice*"] {
        let table = class_table(&state, class).unwrap();
        assert!(state.raw_get_field(table, "x").unwrap().is_nil());
    }
}

#[test]
fn test_shadow_write_overrides_inherited_method() {
    let mut library = FakeLibrary::new();
    let mut state = setup();
    let patched = rooted(&mut state, library.create("patched"), "QWidget*");
    let plain = rooted(&mut state, library.create("plain"), "QWidget*");

    let replacement = state.create_function(
        "objectName",
        native(|_, _| Ok(vec![Value::from("overridden")])),
        Vec::new(),
    );
    state
        .set_field(&patched, "objectName", Value::Function(replacement))
        .unwrap();

    assert_eq!(
        state.call_method(&patched, "objectName", vec![]).unwrap(),
        vec![Value::from("overridden")]
    );
    assert_eq!(
        state.call_method(&plain, "objectName", vec![]).unwrap(),
        vec![Value::from("plain")]
    );

    // Clearing the shadow entry uncovers the class method again.
    state.set_field(&patched, "objectName", Value::Nil).unwrap();
    assert_eq!(
        state.call_method(&patched, "objectName", vec![]).unwrap(),
        vec![Value::from("patched")]
    );
}

#[test]
fn test_class_marker_visible_through_chain() {
    let mut library = FakeLibrary::new();
    let mut state = setup();
    let handle = rooted(&mut state, library.create("w"), "QWidget*");

    for class in ["QWidget*", "QObject*", "QPaintDevice*"] {
        assert_eq!(state.get_field(&handle, class).unwrap(), Value::Boolean(true));
    }
    assert!(state.get_field(&handle, "QLayout*").unwrap().is_nil());
}

#[test]
fn test_nil_key_write_is_an_error() {
    let mut library = FakeLibrary::new();
    let mut state = setup();
    let handle = rooted(&mut state, library.create("w"), "QWidget*");

    let err = state.set_index(&handle, Value::Nil, Value::Integer(1)).unwrap_err();
    assert_eq!(err, ScriptError::InvalidKey("nil"));
}

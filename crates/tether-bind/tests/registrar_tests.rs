//! Class Registrar Tests
//!
//! Tests validate class installation from descriptor lists:
//! - Class tables, markers and namespaces are published
//! - Configuration errors abort without partial state
//! - Handles wrapped before installation pick up the class later
//!
//! # Running Tests
//! ```bash
//! cargo test -p tether-bind --test registrar_tests
//! ```

mod common;

use common::{classes, rooted, setup, FakeLibrary};
use tether_bind::{
    class_table, handle_count, install_classes, is_installed, is_of_type, unwrap, wrap, BindError,
    ClassDescriptor, MethodTable,
};
use tether_vm::{native, State, Value};

#[test]
fn test_fixture_classes_installed() {
    let state = setup();
    for class in ["QObject*", "QPaintDevice*", "QWidget*"] {
        assert!(is_installed(&state, class), "{} should be installed", class);
    }
    for namespace in ["QObject", "QPaintDevice", "QWidget"] {
        assert!(state.get_global(namespace).unwrap().as_table().is_some());
    }
}

#[test]
fn test_namespace_holds_only_own_methods() {
    let state = setup();
    let widget = state.get_global("QWidget").unwrap().as_table().unwrap();

    assert!(matches!(
        state.raw_get_field(widget, "resize").unwrap(),
        Value::Function(_)
    ));
    assert!(state.raw_get_field(widget, "objectName").unwrap().is_nil());
    assert!(state.raw_get_field(widget, "__index").unwrap().is_nil());
    assert_eq!(state.metatable(&Value::Table(widget)).unwrap(), None);
}

#[test]
fn test_namespace_function_callable_with_explicit_receiver() {
    let mut library = FakeLibrary::new();
    let mut state = setup();
    let ptr = library.create("w");
    let handle = rooted(&mut state, ptr, "QWidget*");

    let namespace = state.get_global("QWidget").unwrap();
    let resize = state.get_field(&namespace, "resize").unwrap();
    state.call(&resize, vec![handle, Value::Integer(9)]).unwrap();
    assert_eq!(library.get(ptr).width, 9);
}

#[test]
fn test_unresolved_base_is_configuration_error() {
    let mut state = State::new();
    let mut list = classes();
    list.push(ClassDescriptor::new("D*").base("Z*"));

    let err = install_classes(&mut state, &list).unwrap_err();
    assert_eq!(
        err,
        BindError::Configuration {
            class: "D*".into(),
            reason: "base class 'Z*' is not installed".into(),
        }
    );

    // Nothing from the list was published.
    for class in ["QObject*", "QPaintDevice*", "QWidget*", "D*"] {
        assert!(!is_installed(&state, class));
        assert!(state.registry_get(class).unwrap().is_nil());
    }
    assert!(state.get_global("QObject").unwrap().is_nil());
    assert!(state.get_global("D").unwrap().is_nil());
}

#[test]
fn test_reserved_name_leaves_identity_registry_weak() {
    let mut library = FakeLibrary::new();
    let mut state = setup();
    rooted(&mut state, library.create("early"), "QObject*");

    let err = install_classes(&mut state, &[ClassDescriptor::new("tether.pointers")]).unwrap_err();
    assert!(matches!(err, BindError::Configuration { .. }));

    for i in 0..4 {
        wrap(&mut state, library.create(&format!("temp{}", i)), "QObject*").unwrap();
    }
    assert_eq!(handle_count(&state), 5);

    state.collect_garbage().unwrap();
    state.collect_garbage().unwrap();
    assert_eq!(handle_count(&state), 1);
}

#[test]
fn test_classes_can_be_installed_in_batches() {
    let mut state = setup();
    let methods = MethodTable::new().with("show", native(|_, _| Ok(vec![Value::Boolean(true)])));
    let dialog = ClassDescriptor::new("QDialog*").base("QWidget*").methods(methods);
    install_classes(&mut state, &[dialog]).unwrap();

    let mut library = FakeLibrary::new();
    let ptr = library.create("dialog");
    let handle = rooted(&mut state, ptr, "QDialog*");

    assert_eq!(
        state.call_method(&handle, "show", vec![]).unwrap(),
        vec![Value::Boolean(true)]
    );
    state.call_method(&handle, "resize", vec![Value::Integer(3)]).unwrap();
    assert_eq!(library.get(ptr).width, 3);
    assert_eq!(
        state.call_method(&handle, "className", vec![]).unwrap(),
        vec![Value::from("QObject")]
    );
}

#[test]
fn test_wrap_before_install_gains_class_behaviour() {
    let mut library = FakeLibrary::new();
    let ptr = library.create("early");
    let mut state = State::new();

    let handle = rooted(&mut state, ptr, "QWidget*");
    let early_table = state.registry_get("QWidget*").unwrap().as_table().unwrap();
    assert!(!is_of_type(&state, &handle, "QWidget*"));
    assert!(state.get_field(&handle, "width").is_err());

    install_classes(&mut state, &classes()).unwrap();

    assert_eq!(class_table(&state, "QWidget*"), Some(early_table));
    assert!(is_of_type(&state, &handle, "QWidget*"));
    assert_eq!(unwrap(&state, &handle, "QWidget*").unwrap(), Some(ptr));
    state.call_method(&handle, "resize", vec![Value::Integer(7)]).unwrap();
    assert_eq!(library.get(ptr).width, 7);
}

#[test]
fn test_rewrap_changes_class_tag() {
    let mut library = FakeLibrary::new();
    let mut state = setup();
    let ptr = library.create("w");

    let as_object = wrap(&mut state, ptr, "QObject*").unwrap();
    assert!(is_of_type(&state, &as_object, "QObject*"));

    let as_widget = rooted(&mut state, ptr, "QWidget*");
    assert_eq!(as_object, as_widget);
    assert!(is_of_type(&state, &as_widget, "QWidget*"));
    assert!(!is_of_type(&state, &as_widget, "QObject*"));
}

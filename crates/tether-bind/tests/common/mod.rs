//! Shared fixture: a tiny fake native library and its generated-style glue

#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use tether_bind::{
    identity_of, install_classes, is_kind_of, to_enum, wrap, ClassDescriptor, EnumDescriptor,
    NativePtr,
};
use tether_vm::{native, Call, ScriptError, ScriptResult, State, Value};

/// A native object
#[derive(Debug)]
pub struct FakeObject {
    pub name: String,
    pub width: i64,
    pub alignment: i64,
}

/// Owns every native object for the duration of a test
#[derive(Default)]
pub struct FakeLibrary {
    objects: Vec<Box<FakeObject>>,
}

impl FakeLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a native object and return its identity
    pub fn create(&mut self, name: &str) -> NativePtr {
        let object = Box::new(FakeObject {
            name: name.to_string(),
            width: 0,
            alignment: 0,
        });
        let ptr = NativePtr::from(&*object as *const FakeObject);
        self.objects.push(object);
        ptr
    }

    pub fn get(&self, ptr: NativePtr) -> &FakeObject {
        self.objects
            .iter()
            .find(|object| NativePtr::from(&***object as *const FakeObject) == ptr)
            .expect("unknown native object")
    }
}

/// Native object behind the receiver of a method call
///
/// Errors if the receiver is not a kind of `class`; `None` if its handle
/// was staled.
fn receiver<'a>(state: &mut State, call: &Call, class: &str) -> ScriptResult<Option<&'a mut FakeObject>> {
    let this = call.arg(1);
    if !is_kind_of(state, &this, class)? {
        return Err(ScriptError::RuntimeError(format!("bad receiver, expected {}", class)));
    }
    let ptr = identity_of(state, &this).and_then(NativePtr::non_null);
    // SAFETY: the FakeLibrary owning the object outlives every state in the tests.
    Ok(ptr.map(|ptr| unsafe { &mut *ptr.as_ptr::<FakeObject>() }))
}

pub const ALIGNMENT: &str = "Qt::Alignment";

/// Class descriptors in dependency order
///
/// `QWidget*` derives from `QObject*` then `QPaintDevice*`; both bases
/// define `className`.
pub fn classes() -> Vec<ClassDescriptor> {
    vec![
        ClassDescriptor::new("QObject*")
            .method(
                "objectName",
                native(|state, call| {
                    let name = receiver(state, &call, "QObject*")?
                        .map_or(Value::Nil, |object| Value::string(&object.name));
                    Ok(vec![name])
                }),
            )
            .method(
                "setObjectName",
                native(|state, call| {
                    let name = call.arg(2).coerce_to_string().unwrap_or_default();
                    if let Some(object) = receiver(state, &call, "QObject*")? {
                        object.name = name;
                    }
                    Ok(vec![])
                }),
            )
            .method("className", native(|_, _| Ok(vec![Value::from("QObject")]))),
        ClassDescriptor::new("QPaintDevice*")
            .method("depth", native(|_, _| Ok(vec![Value::Integer(24)])))
            .method("className", native(|_, _| Ok(vec![Value::from("QPaintDevice")]))),
        ClassDescriptor::new("QWidget*")
            .base("QObject*")
            .base("QPaintDevice*")
            .method(
                "resize",
                native(|state, call| {
                    let width = call.arg(2).as_integer().unwrap_or_default();
                    if let Some(object) = receiver(state, &call, "QWidget*")? {
                        object.width = width;
                    }
                    Ok(vec![])
                }),
            )
            .method(
                "width",
                native(|state, call| {
                    let width = receiver(state, &call, "QWidget*")?.map_or(0, |object| object.width);
                    Ok(vec![Value::Integer(width)])
                }),
            )
            .method(
                "setAlignment",
                native(|state, call| {
                    let alignment = to_enum(state, &call.arg(2), ALIGNMENT).ok_or_else(|| {
                        ScriptError::TypeError("alignment expected".to_string())
                    })?;
                    if let Some(object) = receiver(state, &call, "QWidget*")? {
                        object.alignment = alignment;
                    }
                    Ok(vec![])
                }),
            ),
    ]
}

pub fn enums() -> Vec<EnumDescriptor> {
    vec![EnumDescriptor::new(ALIGNMENT)
        .member("AlignLeft", 1)
        .member("AlignLeading", 1)
        .member("AlignRight", 2)
        .member("AlignHCenter", 4)]
}

/// A state with the fixture classes and enums installed
pub fn setup() -> State {
    let mut state = State::new();
    install_classes(&mut state, &classes()).unwrap();
    tether_bind::define_enums(&mut state, &enums()).unwrap();
    state
}

/// Wrap `ptr` as `class` and keep the handle on the stack
pub fn rooted(state: &mut State, ptr: NativePtr, class: &str) -> Value {
    let handle = wrap(state, ptr, class).unwrap();
    state.push(handle.clone());
    handle
}

/// Native function recording the first argument of every call
pub fn recorder(state: &mut State, log: Rc<RefCell<Vec<Value>>>) -> Value {
    let f = state.create_function(
        "recorder",
        native(move |_, call| {
            log.borrow_mut().push(call.arg(1));
            Ok(vec![])
        }),
        Vec::new(),
    );
    Value::Function(f)
}

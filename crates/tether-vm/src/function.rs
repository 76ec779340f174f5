//! Native functions and call frames

use std::fmt;
use std::rc::Rc;

use crate::state::State;
use crate::value::Value;
use crate::ScriptResult;

/// Signature of a native function callable from scripts
pub type NativeFn = Rc<dyn Fn(&mut State, Call) -> ScriptResult<Vec<Value>>>;

/// Wrap a closure as a [`NativeFn`]
pub fn native<F>(f: F) -> NativeFn
where
    F: Fn(&mut State, Call) -> ScriptResult<Vec<Value>> + 'static,
{
    Rc::new(f)
}

/// A native function object with bound upvalues
///
/// Upvalues are traced by the collector, so anything a closure needs to
/// keep alive belongs there rather than in the Rust closure's captures.
pub struct Function {
    name: Rc<str>,
    func: NativeFn,
    upvalues: Rc<[Value]>,
}

impl Function {
    /// Create a function object
    pub fn new(name: &str, func: NativeFn, upvalues: Vec<Value>) -> Self {
        Self {
            name: Rc::from(name),
            func,
            upvalues: Rc::from(upvalues),
        }
    }

    /// Debug name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The callable
    pub fn native(&self) -> &NativeFn {
        &self.func
    }

    /// Bound upvalues
    pub fn upvalues(&self) -> &[Value] {
        &self.upvalues
    }

    pub(crate) fn shared_upvalues(&self) -> Rc<[Value]> {
        self.upvalues.clone()
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("name", &self.name)
            .field("upvalues", &self.upvalues.len())
            .finish()
    }
}

/// Arguments and upvalues of one native call
///
/// Positions are 1-based, matching the value stack.
#[derive(Debug, Clone)]
pub struct Call {
    args: Vec<Value>,
    upvalues: Rc<[Value]>,
}

impl Call {
    pub(crate) fn new(args: Vec<Value>, upvalues: Rc<[Value]>) -> Self {
        Self { args, upvalues }
    }

    /// Argument at 1-based `position` (nil when absent)
    pub fn arg(&self, position: usize) -> Value {
        position
            .checked_sub(1)
            .and_then(|i| self.args.get(i))
            .cloned()
            .unwrap_or_default()
    }

    /// All arguments
    pub fn args(&self) -> &[Value] {
        &self.args
    }

    /// Number of arguments passed
    pub fn arg_count(&self) -> usize {
        self.args.len()
    }

    /// Upvalue at 1-based `position`, `None` past the last one
    pub fn upvalue(&self, position: usize) -> Option<&Value> {
        position.checked_sub(1).and_then(|i| self.upvalues.get(i))
    }

    /// All upvalues
    pub fn upvalues(&self) -> &[Value] {
        &self.upvalues
    }

    /// Take ownership of the arguments
    pub fn into_args(self) -> Vec<Value> {
        self.args
    }
}

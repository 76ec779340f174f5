//! Script value representation
//!
//! [`Value`] is what crosses the native/script boundary. Collectable values
//! (tables, userdata, functions) are [`GcRef`]s into the state's heap; the
//! rest are stored inline.
//!
//! [`Key`] is the hashable form of a value used for table storage. Integral
//! numbers normalize to integer keys, so `t[1]` and `t[1.0]` are the same slot.

use std::fmt;
use std::rc::Rc;

use crate::gc::GcRef;
use crate::{ScriptError, ScriptResult};

/// A script value
#[derive(Clone, Default)]
pub enum Value {
    /// Absent value
    #[default]
    Nil,
    /// Boolean
    Boolean(bool),
    /// 64-bit integer
    Integer(i64),
    /// 64-bit float
    Number(f64),
    /// Immutable string
    String(Rc<str>),
    /// Raw address, never collected
    LightUserdata(usize),
    /// Table on the heap
    Table(GcRef),
    /// Full userdata on the heap
    Userdata(GcRef),
    /// Native function on the heap
    Function(GcRef),
}

impl Value {
    /// Create a string value
    pub fn string(s: impl AsRef<str>) -> Self {
        Value::String(Rc::from(s.as_ref()))
    }

    /// Type name as reported in error messages
    pub const fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Boolean(_) => "boolean",
            Value::Integer(_) | Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::LightUserdata(_) => "lightuserdata",
            Value::Table(_) => "table",
            Value::Userdata(_) => "userdata",
            Value::Function(_) => "function",
        }
    }

    /// Check if this value is nil
    #[inline]
    pub const fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    /// Everything except nil and false is truthy
    #[inline]
    pub const fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Boolean(false))
    }

    /// Heap reference, if this value is collectable
    #[inline]
    pub const fn as_gc_ref(&self) -> Option<GcRef> {
        match self {
            Value::Table(r) | Value::Userdata(r) | Value::Function(r) => Some(*r),
            _ => None,
        }
    }

    /// Extract a boolean
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Extract an integer, accepting floats with an exact integral value
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            Value::Number(n) => float_to_integer(*n),
            _ => None,
        }
    }

    /// Extract a number (integers widen to f64)
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Borrow the string contents
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Table reference
    pub const fn as_table(&self) -> Option<GcRef> {
        match self {
            Value::Table(r) => Some(*r),
            _ => None,
        }
    }

    /// Userdata reference
    pub const fn as_userdata(&self) -> Option<GcRef> {
        match self {
            Value::Userdata(r) => Some(*r),
            _ => None,
        }
    }

    /// String form for values that coerce to strings (strings and numbers)
    ///
    /// Integral floats print without a fractional part, the way the
    /// interpreter formats numbers.
    pub fn coerce_to_string(&self) -> Option<String> {
        match self {
            Value::String(s) => Some(s.to_string()),
            Value::Integer(i) => Some(i.to_string()),
            Value::Number(n) => Some(format_number(*n)),
            _ => None,
        }
    }

    /// Primitive equality: numbers by value, strings by content, heap
    /// objects by identity. NaN is never equal to anything.
    pub fn raw_equal(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Integer(i), Value::Number(n)) | (Value::Number(n), Value::Integer(i)) => {
                float_to_integer(*n) == Some(*i)
            }
            (Value::String(a), Value::String(b)) => a == b,
            (Value::LightUserdata(a), Value::LightUserdata(b)) => a == b,
            (Value::Table(a), Value::Table(b))
            | (Value::Userdata(a), Value::Userdata(b))
            | (Value::Function(a), Value::Function(b)) => a == b,
            _ => false,
        }
    }
}

/// Convert a float to an integer when it is finite, integral and in range
fn float_to_integer(n: f64) -> Option<i64> {
    // i64::MAX as f64 rounds up to 2^63, hence the strict upper bound
    if n.fract() == 0.0 && n >= i64::MIN as f64 && n < i64::MAX as f64 {
        Some(n as i64)
    } else {
        None
    }
}

fn format_number(n: f64) -> String {
    match float_to_integer(n) {
        Some(i) if n.abs() < 1e15 => i.to_string(),
        _ => n.to_string(),
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.raw_equal(other)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Boolean(b) => write!(f, "boolean({})", b),
            Value::Integer(i) => write!(f, "integer({})", i),
            Value::Number(n) => write!(f, "number({})", n),
            Value::String(s) => write!(f, "string({:?})", s),
            Value::LightUserdata(p) => write!(f, "lightuserdata({:#x})", p),
            Value::Table(r) => write!(f, "table({})", r),
            Value::Userdata(r) => write!(f, "userdata({})", r),
            Value::Function(r) => write!(f, "function({})", r),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Number(n) => write!(f, "{}", format_number(*n)),
            Value::String(s) => write!(f, "{}", s),
            Value::LightUserdata(p) => write!(f, "userdata: {:#x}", p),
            Value::Table(r) => write!(f, "table: {}", r),
            Value::Userdata(r) => write!(f, "userdata: {}", r),
            Value::Function(r) => write!(f, "function: {}", r),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Integer(i as i64)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::string(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(Rc::from(s))
    }
}

// ============================================================================
// Table keys
// ============================================================================

/// Hashable table key
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Key {
    /// Boolean key
    Boolean(bool),
    /// Integer key (integral floats normalize here)
    Integer(i64),
    /// Non-integral float key, stored as raw bits
    Number(u64),
    /// String key
    String(Rc<str>),
    /// Raw address key
    LightUserdata(usize),
    /// Table identity key
    Table(GcRef),
    /// Userdata identity key
    Userdata(GcRef),
    /// Function identity key
    Function(GcRef),
}

impl Key {
    /// Convert a value to a key
    ///
    /// Fails for nil and NaN, which cannot index a table.
    pub fn from_value(value: &Value) -> ScriptResult<Key> {
        Ok(match value {
            Value::Nil => return Err(ScriptError::InvalidKey("nil")),
            Value::Boolean(b) => Key::Boolean(*b),
            Value::Integer(i) => Key::Integer(*i),
            Value::Number(n) if n.is_nan() => return Err(ScriptError::InvalidKey("NaN")),
            Value::Number(n) => match float_to_integer(*n) {
                Some(i) => Key::Integer(i),
                None => Key::Number(n.to_bits()),
            },
            Value::String(s) => Key::String(s.clone()),
            Value::LightUserdata(p) => Key::LightUserdata(*p),
            Value::Table(r) => Key::Table(*r),
            Value::Userdata(r) => Key::Userdata(*r),
            Value::Function(r) => Key::Function(*r),
        })
    }

    /// Convert back to a value
    pub fn to_value(&self) -> Value {
        match self {
            Key::Boolean(b) => Value::Boolean(*b),
            Key::Integer(i) => Value::Integer(*i),
            Key::Number(bits) => Value::Number(f64::from_bits(*bits)),
            Key::String(s) => Value::String(s.clone()),
            Key::LightUserdata(p) => Value::LightUserdata(*p),
            Key::Table(r) => Value::Table(*r),
            Key::Userdata(r) => Value::Userdata(*r),
            Key::Function(r) => Value::Function(*r),
        }
    }

    /// Heap reference, if the key is a collectable object
    pub const fn as_gc_ref(&self) -> Option<GcRef> {
        match self {
            Key::Table(r) | Key::Userdata(r) | Key::Function(r) => Some(*r),
            _ => None,
        }
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key::String(Rc::from(s))
    }
}

impl From<i64> for Key {
    fn from(i: i64) -> Self {
        Key::Integer(i)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_names() {
        assert_eq!(Value::Nil.type_name(), "nil");
        assert_eq!(Value::Integer(1).type_name(), "number");
        assert_eq!(Value::Number(1.5).type_name(), "number");
        assert_eq!(Value::string("x").type_name(), "string");
        assert_eq!(Value::LightUserdata(8).type_name(), "lightuserdata");
    }

    #[test]
    fn test_truthiness() {
        assert!(!Value::Nil.is_truthy());
        assert!(!Value::Boolean(false).is_truthy());
        assert!(Value::Boolean(true).is_truthy());
        assert!(Value::Integer(0).is_truthy());
        assert!(Value::string("").is_truthy());
    }

    #[test]
    fn test_as_integer_accepts_integral_floats() {
        assert_eq!(Value::Integer(7).as_integer(), Some(7));
        assert_eq!(Value::Number(7.0).as_integer(), Some(7));
        assert_eq!(Value::Number(7.5).as_integer(), None);
        assert_eq!(Value::Number(f64::NAN).as_integer(), None);
        assert_eq!(Value::Number(f64::INFINITY).as_integer(), None);
        assert_eq!(Value::string("7").as_integer(), None);
    }

    #[test]
    fn test_raw_equal_mixed_numbers() {
        assert_eq!(Value::Integer(3), Value::Number(3.0));
        assert_ne!(Value::Integer(3), Value::Number(3.5));
        assert_ne!(Value::Number(f64::NAN), Value::Number(f64::NAN));
        assert_eq!(Value::string("a"), Value::from("a"));
        assert_ne!(Value::Nil, Value::Boolean(false));
    }

    #[test]
    fn test_key_normalizes_integral_floats() {
        let a = Key::from_value(&Value::Number(2.0)).unwrap();
        let b = Key::from_value(&Value::Integer(2)).unwrap();
        assert_eq!(a, b);

        let c = Key::from_value(&Value::Number(2.5)).unwrap();
        assert_eq!(c.to_value(), Value::Number(2.5));
    }

    #[test]
    fn test_key_rejects_nil_and_nan() {
        assert_eq!(Key::from_value(&Value::Nil), Err(ScriptError::InvalidKey("nil")));
        assert_eq!(
            Key::from_value(&Value::Number(f64::NAN)),
            Err(ScriptError::InvalidKey("NaN"))
        );
    }

    #[test]
    fn test_coerce_to_string() {
        assert_eq!(Value::Integer(42).coerce_to_string().as_deref(), Some("42"));
        assert_eq!(Value::Number(3.0).coerce_to_string().as_deref(), Some("3"));
        assert_eq!(Value::Number(0.5).coerce_to_string().as_deref(), Some("0.5"));
        assert_eq!(Value::string("hi").coerce_to_string().as_deref(), Some("hi"));
        assert_eq!(Value::Boolean(true).coerce_to_string(), None);
    }
}

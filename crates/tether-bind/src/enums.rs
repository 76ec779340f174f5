//! Enum registry
//!
//! One registry table maps each enum name to a table holding both
//! directions: `member -> integer` and `integer -> member`. When two
//! members share a value the later one owns the reverse mapping, which is
//! how aliases are expressed.

use tether_vm::{GcRef, State, Value};

use crate::error::BindResult;
use crate::keys;

/// Static description of one enumeration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumDescriptor {
    /// Enum name, e.g. `Qt::AlignmentFlag`
    pub name: String,

    /// Members in declaration order
    pub members: Vec<(String, i64)>,
}

impl EnumDescriptor {
    /// Create an empty descriptor
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            members: Vec::new(),
        }
    }

    /// Append a member
    pub fn member(mut self, name: &str, value: i64) -> Self {
        self.members.push((name.to_string(), value));
        self
    }
}

/// Create or replace the enum `name`
pub fn define_enum(state: &mut State, name: &str, members: &[(&str, i64)]) -> BindResult<()> {
    let enums = keys::registry_table(state, keys::ENUMS, None)?;
    let table = state.create_table();
    for (member, value) in members {
        state.raw_set_field(table, member, Value::Integer(*value))?;
        state.raw_set_index(table, *value, Value::string(member))?;
    }
    state.raw_set_field(enums, name, Value::Table(table))?;
    log::debug!("defined enum '{}' with {} members", name, members.len());
    Ok(())
}

/// Define every enum in `list`
pub fn define_enums(state: &mut State, list: &[EnumDescriptor]) -> BindResult<()> {
    for descriptor in list {
        let members: Vec<(&str, i64)> = descriptor
            .members
            .iter()
            .map(|(name, value)| (name.as_str(), *value))
            .collect();
        define_enum(state, &descriptor.name, &members)?;
    }
    Ok(())
}

fn enum_table(state: &State, name: &str) -> Option<GcRef> {
    let enums = keys::find_registry_table(state, keys::ENUMS)?;
    state.raw_get_field(enums, name).ok()?.as_table()
}

/// Integer value of `member`
pub fn lookup_by_name(state: &State, name: &str, member: &str) -> Option<i64> {
    match state.raw_get_field(enum_table(state, name)?, member).ok()? {
        Value::Integer(value) => Some(value),
        _ => None,
    }
}

/// Member name owning `value`
pub fn lookup_by_value(state: &State, name: &str, value: i64) -> Option<String> {
    match state.raw_get_index(enum_table(state, name)?, value).ok()? {
        Value::String(member) => Some(member.to_string()),
        _ => None,
    }
}

/// Whether `candidate` is a member name of the enum
pub fn is_member(state: &State, name: &str, candidate: &Value) -> bool {
    candidate
        .as_str()
        .map_or(false, |member| lookup_by_name(state, name, member).is_some())
}

/// Script value for `value`: its member name, or nil if unknown
pub fn push_enum(state: &State, name: &str, value: i64) -> Value {
    lookup_by_value(state, name, value).map_or(Value::Nil, Value::string)
}

/// Integer for a script value that is a member name or already a number
///
/// Numbers pass through without checking membership, so flag
/// combinations survive the round trip.
pub fn to_enum(state: &State, value: &Value, name: &str) -> Option<i64> {
    match value {
        Value::String(member) => lookup_by_name(state, name, member),
        other => other.as_integer(),
    }
}

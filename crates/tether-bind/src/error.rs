//! Error types for the binding runtime

use tether_vm::ScriptError;

/// Result type for binding operations
pub type BindResult<T> = Result<T, BindError>;

/// Binding runtime errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BindError {
    /// A value is not a handle of the requested class
    #[error("Type mismatch: expected {expected}, got {found}")]
    TypeMismatch {
        /// Requested class name
        expected: String,
        /// Description of the value actually passed
        found: String,
    },

    /// Class descriptors cannot be installed as given
    #[error("Configuration error in class '{class}': {reason}")]
    Configuration {
        /// Offending class
        class: String,
        /// What is wrong with it
        reason: String,
    },

    /// Error raised by the script heap
    #[error(transparent)]
    Script(#[from] ScriptError),
}

impl BindError {
    pub(crate) fn configuration(class: &str, reason: impl Into<String>) -> Self {
        BindError::Configuration {
            class: class.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<BindError> for ScriptError {
    fn from(err: BindError) -> Self {
        match err {
            BindError::Script(inner) => inner,
            other => ScriptError::RuntimeError(other.to_string()),
        }
    }
}

//! Error types for adgrad.

use thiserror::Error;

/// Result type alias using adgrad's [`AdError`].
pub type Result<T> = std::result::Result<T, AdError>;

/// Errors raised by the differentiation engines, the expression front end
/// and the Jacobian builder.
///
/// Every failure is raised by the operation that violates the rule and is
/// propagated to the caller unchanged.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AdError {
    /// An elementary function or power was evaluated outside its domain.
    #[error("{function} is undefined at {value}")]
    Domain {
        /// Name of the offending operation.
        function: &'static str,
        /// The input that was rejected.
        value: f64,
    },

    /// Division by an operand whose primal value is exactly zero.
    #[error("cannot divide by zero")]
    DivisionByZero,

    /// A mode string other than `forward`, `f`, `reverse`, `r` or `auto`.
    #[error("invalid mode '{0}': expected forward, f, reverse, r or auto")]
    InvalidMode(String),

    /// An expression referenced a name that is not in the variable map.
    #[error("unknown variable '{0}'")]
    UnknownVariable(String),

    /// An expression called a function that is not in the elementary library.
    #[error("unknown function '{0}'")]
    UnknownFunction(String),

    /// A function was called with the wrong number of arguments.
    #[error("{function} takes {expected} argument(s), found {found}")]
    Arity {
        /// Function name as written.
        function: String,
        /// Accepted argument count (or range, e.g. `"1 to 4"`).
        expected: &'static str,
        /// Arguments supplied.
        found: usize,
    },

    /// The expression text could not be parsed.
    #[error("parse error at byte {position}: {message}")]
    Parse {
        /// Byte offset into the source text.
        position: usize,
        /// What went wrong.
        message: String,
    },
}

impl AdError {
    pub(crate) fn domain<F: crate::Float>(function: &'static str, value: F) -> Self {
        AdError::Domain {
            function,
            value: value.to_report(),
        }
    }
}

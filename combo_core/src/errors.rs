//! # Error Types
//!
//! Structured error types for combo_core. Every failure carries enough context
//! (the offending expression, fragment, operator or parameter) to be reported
//! back to the caller without reconstructing what went wrong.
//!
//! ## Example
//!
//! ```rust
//! use combo_core::errors::{ComboError, ComboResult};
//! use combo_core::loads::Combination;
//!
//! fn parse_or_report(expr: &str) -> ComboResult<Combination> {
//!     Combination::parse(expr)
//! }
//!
//! let err = parse_or_report("1.2*D + 1.6*L").unwrap_err();
//! assert_eq!(err.error_code(), "EXPRESSION_ERROR");
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for combo_core operations
pub type ComboResult<T> = Result<T, ComboError>;

/// Structured error type for load combination operations.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "details")]
pub enum ComboError {
    /// A combination string is malformed (bad operand, unbalanced grouping,
    /// dangling operator, or an operator rejected during evaluation)
    #[error("Invalid load combination expression {expr:?}{}: {reason}", fragment_suffix(.fragment))]
    Expression {
        expr: String,
        fragment: Option<String>,
        reason: String,
    },

    /// An algebra operator was applied to an unsupported pair of operands
    #[error("Unsupported operation: {lhs} {operator} {rhs}")]
    Composition {
        operator: String,
        lhs: String,
        rhs: String,
    },

    /// Call arguments could not be bound to the combination's load cases
    #[error("Binding error for '{parameter}': {reason}")]
    Binding { parameter: String, reason: String },

    /// Array-valued loads cannot be broadcast to a common shape
    #[error("Load values with shapes {shapes:?} cannot be broadcast together")]
    IncompatibleShapes { shapes: Vec<Vec<usize>> },

    /// The Cartesian expansion would exceed the scenario limit
    #[error("Groups with row counts {row_counts:?} expand past the limit of {limit} scenarios")]
    TooManyScenarios { row_counts: Vec<usize>, limit: usize },

    /// A combination file could not be read or understood
    #[error("Configuration error in '{path}': {reason}")]
    Config { path: String, reason: String },
}

fn fragment_suffix(fragment: &Option<String>) -> String {
    match fragment {
        Some(fragment) => format!(" at {:?}", fragment),
        None => String::new(),
    }
}

impl ComboError {
    /// Create an Expression error without a specific fragment
    pub fn expression(expr: impl Into<String>, reason: impl Into<String>) -> Self {
        ComboError::Expression {
            expr: expr.into(),
            fragment: None,
            reason: reason.into(),
        }
    }

    /// Create an Expression error pointing at the offending fragment
    pub fn expression_at(
        expr: impl Into<String>,
        fragment: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        ComboError::Expression {
            expr: expr.into(),
            fragment: Some(fragment.into()),
            reason: reason.into(),
        }
    }

    /// Create a Composition error
    pub fn composition(operator: impl Into<String>, lhs: impl Into<String>, rhs: impl Into<String>) -> Self {
        ComboError::Composition {
            operator: operator.into(),
            lhs: lhs.into(),
            rhs: rhs.into(),
        }
    }

    /// Create a Binding error
    pub fn binding(parameter: impl Into<String>, reason: impl Into<String>) -> Self {
        ComboError::Binding {
            parameter: parameter.into(),
            reason: reason.into(),
        }
    }

    /// Create a Config error
    pub fn config(path: impl Into<String>, reason: impl Into<String>) -> Self {
        ComboError::Config {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Re-report an error raised while evaluating `expr` as an expression error.
    ///
    /// Expression errors pass through untouched so the innermost fragment is kept.
    pub fn within_expression(self, expr: &str) -> Self {
        match self {
            err @ ComboError::Expression { .. } => err,
            other => ComboError::expression(expr, other.to_string()),
        }
    }

    /// Get a short error code for programmatic handling
    pub fn error_code(&self) -> &'static str {
        match self {
            ComboError::Expression { .. } => "EXPRESSION_ERROR",
            ComboError::Composition { .. } => "COMPOSITION_ERROR",
            ComboError::Binding { .. } => "BINDING_ERROR",
            ComboError::IncompatibleShapes { .. } => "INCOMPATIBLE_SHAPES",
            ComboError::TooManyScenarios { .. } => "TOO_MANY_SCENARIOS",
            ComboError::Config { .. } => "CONFIG_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_serialization() {
        let error = ComboError::expression_at("1.2*D + L", "1.2*D + L", "unexpected character '+'");
        let json = serde_json::to_string(&error).unwrap();
        let roundtrip: ComboError = serde_json::from_str(&json).unwrap();
        assert_eq!(error, roundtrip);
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(ComboError::binding("D", "missing").error_code(), "BINDING_ERROR");
        assert_eq!(ComboError::composition("&", "DisjunctiveGroup", "ScaledTerm").error_code(), "COMPOSITION_ERROR");
    }

    #[test]
    fn test_expression_display_includes_fragment() {
        let error = ComboError::expression_at("X * (S | W)", "X *", "left operand of '*' must be a number");
        let message = error.to_string();
        assert!(message.contains("\"X *\""), "{}", message);
        assert!(message.contains("X * (S | W)"), "{}", message);
    }

    #[test]
    fn test_within_expression_wraps_composition() {
        let error = ComboError::composition("&", "Combination", "ScaledTerm").within_expression("A & (B | C) & D");
        match error {
            ComboError::Expression { expr, fragment, reason } => {
                assert_eq!(expr, "A & (B | C) & D");
                assert!(fragment.is_none());
                assert!(reason.contains("Combination & ScaledTerm"));
            }
            other => panic!("expected expression error, got {:?}", other),
        }
    }
}

use thiserror::Error;

/// Validation errors for canonical primitives and event envelopes.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field is absent or empty.
    #[error("missing required field '{field}'")]
    MissingField {
        /// Name of the missing field.
        field: &'static str,
    },
    /// When a value does not match the required pattern.
    #[error("{field} ('{value}') is not allowed")]
    PatternMismatch {
        /// Field name that failed validation.
        field: &'static str,
        /// Offending value.
        value: String,
    },
    /// A field carries the wrong JSON type.
    #[error("{field} must be {expected}")]
    WrongType {
        /// Field name with the wrong type.
        field: &'static str,
        /// Human-readable expected type.
        expected: &'static str,
    },
    /// An object carries a field outside its schema.
    #[error("unexpected field '{field}'")]
    UnexpectedField {
        /// Name of the unexpected field.
        field: String,
    },
    /// A value is outside the accepted vocabulary.
    #[error("{field} ('{value}') is not a recognised value")]
    UnknownVariant {
        /// Field name.
        field: &'static str,
        /// Offending value.
        value: String,
    },
}

//! Configuration validation utilities and rules

use crate::errors::EmoteError;
use std::fmt;

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Value is out of acceptable range
    OutOfRange {
        /// Field path
        field: String,
        /// Inclusive lower bound
        min: Option<u64>,
        /// Inclusive upper bound
        max: Option<u64>,
        /// Offending value
        actual: u64,
    },
    /// Value format is invalid
    InvalidFormat {
        /// Field path
        field: String,
        /// What was expected
        expected: String,
        /// What was supplied
        actual: String,
    },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::OutOfRange {
                field,
                min,
                max,
                actual,
            } => {
                let range_desc = match (min, max) {
                    (Some(min), Some(max)) => format!("between {min} and {max}"),
                    (Some(min), None) => format!("at least {min}"),
                    (None, Some(max)) => format!("at most {max}"),
                    (None, None) => "in valid range".to_string(),
                };
                write!(f, "Field '{field}' must be {range_desc} (got {actual})")
            }
            ValidationError::InvalidFormat {
                field,
                expected,
                actual,
            } => {
                write!(
                    f,
                    "Field '{field}' has invalid format. Expected: {expected}, got: {actual}"
                )
            }
        }
    }
}

impl std::error::Error for ValidationError {}

impl From<ValidationError> for EmoteError {
    fn from(err: ValidationError) -> Self {
        EmoteError::invalid_request(err.to_string())
    }
}

/// Configuration validator that accumulates validation rules
#[derive(Debug, Default)]
pub struct ConfigValidator {
    errors: Vec<ValidationError>,
}

impl ConfigValidator {
    /// Create a new validator
    pub fn new() -> Self {
        Self::default()
    }

    /// Require `value` to lie within `[min, max]`
    pub fn range(
        &mut self,
        field: &str,
        value: u64,
        min: Option<u64>,
        max: Option<u64>,
    ) -> &mut Self {
        let below = min.is_some_and(|m| value < m);
        let above = max.is_some_and(|m| value > m);
        if below || above {
            self.errors.push(ValidationError::OutOfRange {
                field: field.to_string(),
                min,
                max,
                actual: value,
            });
        }
        self
    }

    /// Errors recorded so far
    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    /// Finish, reporting the first error
    pub fn finish(&mut self) -> Result<(), EmoteError> {
        match self.errors.drain(..).next() {
            Some(err) => Err(err.into()),
            None => Ok(()),
        }
    }
}

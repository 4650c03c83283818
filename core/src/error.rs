//! # Error Handling
//!
//! Provides the unified `AppError` enum used across the workspace.
//!
//! Unresolved references are not errors: resolvers return `None` and let the
//! caller decide. Only parse failures and unsatisfiable parameter encodings
//! surface here.

use derive_more::{Display, From};

/// The Global Error Enum.
///
/// Note: String errors default to `General`.
#[derive(Debug, Display, From)]
pub enum AppError {
    /// Wrapper for standard IO errors.
    #[display("IO Error: {_0}")]
    Io(std::io::Error),

    /// A document or schema could not be read into the IR.
    #[from(ignore)]
    #[display("Parse Error: {_0}")]
    Parse(String),

    /// A parameter declares a wire encoding that cannot be produced.
    #[from(ignore)]
    #[display("Invalid parameter configuration for '{name}': {reason}")]
    InvalidParameterConfiguration {
        /// Parameter name (or operation label for operation-wide conflicts).
        name: String,
        /// Human readable cause.
        reason: String,
    },

    /// Generic errors.
    #[display("General Error: {_0}")]
    General(String),
}

impl AppError {
    /// Shorthand for an [`AppError::InvalidParameterConfiguration`].
    pub fn invalid_parameter(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidParameterConfiguration {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Returns true for parameter configuration errors.
    pub fn is_invalid_parameter(&self) -> bool {
        matches!(self, Self::InvalidParameterConfiguration { .. })
    }
}

/// Manual implementation of the standard Error trait.
impl std::error::Error for AppError {}

/// Helper type alias for Result using AppError.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Error, ErrorKind};

    #[test]
    fn test_io_conversion() {
        let io_err = Error::new(ErrorKind::Other, "test");
        let app_err: AppError = io_err.into();
        assert!(matches!(app_err, AppError::Io(_)));
    }

    #[test]
    fn test_string_conversion() {
        // String defaults to General, not Parse
        let msg = String::from("something wrong");
        let app_err: AppError = msg.into();
        match app_err {
            AppError::General(s) => assert_eq!(s, "something wrong"),
            _ => panic!("String should convert to AppError::General"),
        }
    }

    #[test]
    fn test_invalid_parameter_display() {
        let err = AppError::invalid_parameter("id", "deepObject requires an object value");
        assert!(err.is_invalid_parameter());
        assert_eq!(
            err.to_string(),
            "Invalid parameter configuration for 'id': deepObject requires an object value"
        );
    }
}

//! Request validation utilities for consistent validation across handlers
//!
//! This module provides a `RequestValidation` trait and helper macros to
//! centralize validation logic and ensure consistent error messages.

use crate::error::ApiError;

/// Trait for validating request payloads
///
/// Implement this trait for all create/update request types to ensure
/// consistent validation across the API.
pub trait RequestValidation {
    /// Validates the request and returns an error if validation fails
    fn validate(&self) -> Result<(), ApiError>;
}

/// Macro for validating fields with custom predicates
///
/// # Usage
///
/// ```rust,ignore
/// validate_field!(self.code, !self.code.trim().is_empty(), "Code is required");
/// ```
#[macro_export]
macro_rules! validate_field {
    ($field:expr, $predicate:expr, $message:expr) => {
        if !$predicate {
            return Err($crate::error::ApiError::validation($message));
        }
    };
}

/// Macro for validating required fields (non-empty strings)
#[macro_export]
macro_rules! validate_required {
    ($field:expr, $message:expr) => {
        validate_field!($field, !$field.trim().is_empty(), $message);
    };
}

/// Macro for validating UUID fields (non-nil)
#[macro_export]
macro_rules! validate_uuid {
    ($field:expr, $message:expr) => {
        validate_field!($field, !$field.is_nil(), $message);
    };
}

/// Macro for validating string length
#[macro_export]
macro_rules! validate_length {
    ($field:expr, $min:expr, $max:expr, $message:expr) => {
        let len = $field.len();
        validate_field!($field, len >= $min && len <= $max, $message);
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TestRequest {
        code: String,
        description: String,
    }

    impl RequestValidation for TestRequest {
        fn validate(&self) -> Result<(), ApiError> {
            validate_required!(self.code, "Code is required");
            validate_length!(self.code, 1, 50, "Code must be between 1 and 50 characters");
            validate_length!(
                self.description,
                1,
                500,
                "Description must be between 1 and 500 characters"
            );
            Ok(())
        }
    }

    #[test]
    fn test_validation_success() {
        let request = TestRequest {
            code: "CONS-01".to_string(),
            description: "General consultation".to_string(),
        };
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_validation_empty_code() {
        let request = TestRequest { code: "".to_string(), description: "x".to_string() };
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_validation_overlong_description() {
        let request = TestRequest { code: "LAB-1".to_string(), description: "d".repeat(600) };
        assert!(request.validate().is_err());
    }
}

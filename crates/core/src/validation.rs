//! Shared validation helpers.
//!
//! Range and identifier checks used by all three engines. Each helper
//! returns a `CoreError::Validation` naming the offending field.

use crate::error::CoreError;

/// Validate that a user identifier is a non-empty string.
pub fn validate_user_id(user_id: &str) -> Result<(), CoreError> {
    if user_id.trim().is_empty() {
        return Err(CoreError::Validation(
            "user_id must be a non-empty string".to_string(),
        ));
    }
    Ok(())
}

/// Validate that an integer falls within `[min, max]`.
pub fn validate_int_range(value: i64, min: i64, max: i64, name: &str) -> Result<(), CoreError> {
    if !(min..=max).contains(&value) {
        return Err(CoreError::Validation(format!(
            "{name} must be between {min} and {max}, got {value}"
        )));
    }
    Ok(())
}

/// Validate that a number is finite and falls within `[min, max]`.
pub fn validate_finite_range(value: f64, min: f64, max: f64, name: &str) -> Result<(), CoreError> {
    if !value.is_finite() {
        return Err(CoreError::Validation(format!(
            "{name} must be a finite number, got {value}"
        )));
    }
    if !(min..=max).contains(&value) {
        return Err(CoreError::Validation(format!(
            "{name} must be between {min} and {max}, got {value}"
        )));
    }
    Ok(())
}

/// Validate that a number is finite, strictly positive and at most `max`.
pub fn validate_positive_finite(value: f64, max: f64, name: &str) -> Result<(), CoreError> {
    validate_finite_range(value, 0.0, max, name)?;
    if value <= 0.0 {
        return Err(CoreError::Validation(format!(
            "{name} must be greater than 0, got {value}"
        )));
    }
    Ok(())
}

/// Build the error for a value missing from a known list.
pub fn unknown_key(value: &str, valid: &[&str], label: &str) -> CoreError {
    CoreError::Validation(format!(
        "Unknown {label} '{value}'. Must be one of: {}",
        valid.join(", ")
    ))
}

//! Common validation utilities.

use lazy_static::lazy_static;
use regex::Regex;
use validator::ValidationError;

lazy_static! {
    static ref HEX_COLOR: Regex = Regex::new(r"^#(?:[0-9a-fA-F]{3}|[0-9a-fA-F]{6})$").unwrap();
    static ref TRACKING_NUMBER: Regex = Regex::new(r"^[A-Za-z0-9-]{6,40}$").unwrap();
}

/// Validates a CSS hex color such as `#1e3a8a` or `#fff`.
pub fn validate_hex_color(color: &str) -> Result<(), ValidationError> {
    if HEX_COLOR.is_match(color) {
        Ok(())
    } else {
        let mut err = ValidationError::new("hex_color");
        err.message = Some("Color must be a hex value like #1e3a8a".into());
        Err(err)
    }
}

/// Validates a carrier tracking number: 6 to 40 letters, digits or dashes.
pub fn validate_tracking_number(tracking: &str) -> Result<(), ValidationError> {
    if TRACKING_NUMBER.is_match(tracking) {
        Ok(())
    } else {
        let mut err = ValidationError::new("tracking_number");
        err.message =
            Some("Tracking number must be 6-40 letters, digits or dashes".into());
        Err(err)
    }
}

/// Validates that a required free-text field is not only whitespace.
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("Value must not be blank".into());
        Err(err)
    } else {
        Ok(())
    }
}

/// Validates an identifier owned by the external member store.
pub fn validate_external_id(id: i64) -> Result<(), ValidationError> {
    if id > 0 {
        Ok(())
    } else {
        let mut err = ValidationError::new("external_id");
        err.message = Some("Identifier must be a positive number".into());
        Err(err)
    }
}

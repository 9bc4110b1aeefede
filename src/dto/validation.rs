//! Validation helpers for DTOs.

use validator::ValidationError;

/// Validates that a guess carries at least one visible character.
///
/// # Examples
///
/// ```ignore
/// validate_guess_text("the nurse") // Ok
/// validate_guess_text("   ")       // Err - blank
/// ```
pub fn validate_guess_text(text: &str) -> Result<(), ValidationError> {
    if text.trim().is_empty() {
        let mut err = ValidationError::new("guess_blank");
        err.message = Some("Guess must not be blank".into());
        return Err(err);
    }

    if text.chars().any(char::is_control) {
        let mut err = ValidationError::new("guess_format");
        err.message = Some("Guess must not contain control characters".into());
        return Err(err);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_guess_text_valid() {
        assert!(validate_guess_text("The Nurse").is_ok());
        assert!(validate_guess_text("Generic (The Trapper)").is_ok());
        assert!(validate_guess_text("  wraith ").is_ok());
    }

    #[test]
    fn test_validate_guess_text_invalid() {
        assert!(validate_guess_text("").is_err());
        assert!(validate_guess_text("   ").is_err());
        assert!(validate_guess_text("nurse\u{0007}").is_err());
    }
}

//! Common validation rules shared across request payloads.

use validator::ValidationError;

/// Number of digits in a one-time passcode.
pub const OTP_CODE_LENGTH: usize = 6;

/// Validates that a required text field has visible content.
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

/// Validates one-time passcode format.
///
/// Requirements:
/// - Exactly 6 characters
/// - ASCII digits only
pub fn validate_otp_code(code: &str) -> Result<(), ValidationError> {
    if code.len() != OTP_CODE_LENGTH {
        return Err(ValidationError::new("otp_invalid_length"));
    }

    if !code.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::new("otp_invalid_characters"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_blank_rejects_whitespace() {
        assert!(validate_not_blank("").is_err());
        assert!(validate_not_blank("  \t").is_err());
    }

    #[test]
    fn not_blank_accepts_text() {
        assert!(validate_not_blank(" Dune ").is_ok());
    }

    #[test]
    fn otp_code_rejects_wrong_length() {
        assert!(validate_otp_code("12345").is_err());
        assert!(validate_otp_code("1234567").is_err());
    }

    #[test]
    fn otp_code_rejects_non_digits() {
        let result = validate_otp_code("12a456");
        assert!(result.is_err());
    }

    #[test]
    fn otp_code_accepts_valid() {
        let result = validate_otp_code("004211");
        assert!(result.is_ok());
    }
}

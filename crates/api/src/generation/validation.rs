//! Input validation for process descriptions

pub const MIN_INPUT_CHARS: usize = 50;
pub const MAX_INPUT_CHARS: usize = 5000;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Please describe your process.")]
    Missing,
    #[error("Please describe your process in more detail (at least 50 characters).")]
    TooShort,
    #[error("Input too long. Please keep under 5,000 characters.")]
    TooLong,
}

/// Trim and bound-check a description. Length counts characters, not bytes.
pub fn validate_input(raw: Option<&str>) -> Result<String, ValidationError> {
    let input = raw.ok_or(ValidationError::Missing)?.trim();
    let chars = input.chars().count();

    if chars == 0 {
        return Err(ValidationError::Missing);
    }
    if chars < MIN_INPUT_CHARS {
        return Err(ValidationError::TooShort);
    }
    if chars > MAX_INPUT_CHARS {
        return Err(ValidationError::TooLong);
    }

    Ok(input.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds_are_inclusive() {
        assert!(validate_input(Some(&"a".repeat(50))).is_ok());
        assert!(validate_input(Some(&"a".repeat(5000))).is_ok());
        assert_eq!(validate_input(Some(&"a".repeat(49))), Err(ValidationError::TooShort));
        assert_eq!(validate_input(Some(&"a".repeat(5001))), Err(ValidationError::TooLong));
    }

    #[test]
    fn test_whitespace_is_trimmed_before_counting() {
        let padded = format!("   {}   ", "a".repeat(49));
        assert_eq!(validate_input(Some(&padded)), Err(ValidationError::TooShort));

        let ok = validate_input(Some(&format!("\n{}\n", "b".repeat(60)))).unwrap();
        assert_eq!(ok.len(), 60);
    }

    #[test]
    fn test_counts_characters_not_bytes() {
        // 50 two-byte characters
        assert!(validate_input(Some(&"é".repeat(50))).is_ok());
        assert_eq!(
            validate_input(Some(&"é".repeat(5001))),
            Err(ValidationError::TooLong)
        );
    }

    #[test]
    fn test_missing_and_blank() {
        assert_eq!(validate_input(None), Err(ValidationError::Missing));
        assert_eq!(validate_input(Some("   ")), Err(ValidationError::Missing));
    }

    #[test]
    fn test_messages_are_distinct() {
        assert_ne!(
            ValidationError::TooShort.to_string(),
            ValidationError::TooLong.to_string()
        );
    }
}

use super::ValidationError;

const DEFAULT_MAX_LEN: usize = 500;

pub fn validate_reason(reason: &str) -> Result<(), ValidationError> {
    validate_reason_with_limit(reason, DEFAULT_MAX_LEN)
}

/// Limit-aware variant, fed by `MembershipConfig::max_reason_len`.
pub fn validate_reason_with_limit(reason: &str, max_len: usize) -> Result<(), ValidationError> {
    let trimmed = reason.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::ReasonEmpty);
    }

    if trimmed.chars().count() > max_len {
        return Err(ValidationError::ReasonTooLong);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_reasons() {
        assert!(validate_reason("No open positions at this time").is_ok());
        assert!(validate_reason("Duplicate request").is_ok());
    }

    #[test]
    fn test_reason_empty() {
        assert_eq!(validate_reason("").unwrap_err(), ValidationError::ReasonEmpty);
        assert_eq!(
            validate_reason("  \t ").unwrap_err(),
            ValidationError::ReasonEmpty
        );
    }

    #[test]
    fn test_reason_too_long() {
        let long_reason = "x".repeat(501);
        assert_eq!(
            validate_reason(&long_reason).unwrap_err(),
            ValidationError::ReasonTooLong
        );
        assert!(validate_reason_with_limit(&long_reason, 1000).is_ok());
    }
}

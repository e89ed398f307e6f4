use super::ValidationError;

const DEFAULT_MAX_LEN: usize = 100;

pub fn validate_team_name(name: &str) -> Result<(), ValidationError> {
    validate_team_name_with_limit(name, DEFAULT_MAX_LEN)
}

/// Limit-aware variant, fed by `MembershipConfig::max_team_name_len`.
pub fn validate_team_name_with_limit(name: &str, max_len: usize) -> Result<(), ValidationError> {
    let trimmed = name.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::TeamNameEmpty);
    }

    if trimmed.chars().count() > max_len {
        return Err(ValidationError::TeamNameTooLong);
    }

    Ok(())
}

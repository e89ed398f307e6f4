pub mod email;
pub mod reason;
pub mod team_name;

pub use email::validate_email;
pub use reason::{validate_reason, validate_reason_with_limit};
pub use team_name::{validate_team_name, validate_team_name_with_limit};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ValidationError {
    EmailEmpty,
    EmailTooLong,
    EmailInvalidFormat,
    TeamNameEmpty,
    TeamNameTooLong,
    ReasonEmpty,
    ReasonTooLong,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmailEmpty => write!(f, "Email cannot be empty"),
            Self::EmailTooLong => write!(f, "Email is too long (max 254 characters)"),
            Self::EmailInvalidFormat => write!(f, "Invalid email format"),
            Self::TeamNameEmpty => write!(f, "Team name cannot be empty"),
            Self::TeamNameTooLong => write!(f, "Team name is too long"),
            Self::ReasonEmpty => write!(f, "Rejection reason cannot be empty"),
            Self::ReasonTooLong => write!(f, "Rejection reason is too long"),
        }
    }
}

impl std::error::Error for ValidationError {}

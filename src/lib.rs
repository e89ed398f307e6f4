pub mod actions;
pub mod config;
pub mod events;
pub mod guards;
pub mod provision;
pub mod repository;
pub mod resolver;
pub mod types;
pub mod validators;

#[cfg(any(test, feature = "mocks"))]
pub mod mocks;

pub use actions::{
    ApproveMembershipAction, ApproveMembershipInput, ApproveMembershipOutput, CreateTeamAction,
    CreateTeamInput, CreateTeamOutput, JoinTeamAction, JoinTeamInput, JoinTeamOutput,
    RejectMembershipAction, RejectMembershipInput, RejectMembershipOutput,
};
pub use config::{MembershipConfig, RejoinPolicy};
pub use events::{register_event_listeners, MembershipEvent};
pub use guards::{
    validate_approved_user_access, validate_membership_state, validate_pending_user_access,
    validate_user_team_consistency,
};
pub use provision::{RoleProvisioner, TemplateRoleProvisioner};
pub use repository::{
    CreateMembership, CreatePermission, CreateRole, CreateTeam, CreateUser, MembershipRepository,
    PermissionRepository, RoleRepository, TeamRepository, UserRepository,
};
pub use resolver::PermissionResolver;
pub use types::{Membership, MembershipStatus, MembershipView, Permission, Role, Team, User};
pub use validators::ValidationError;

#[cfg(any(test, feature = "mocks"))]
pub use mocks::{
    MockMembershipRepository, MockPermissionRepository, MockRoleProvisioner, MockRoleRepository,
    MockTeamRepository, MockUserRepository,
};

use std::fmt;

/// Error taxonomy shared by every operation in the crate.
///
/// `InvalidUserState` and `InvalidMembershipState` signal data-integrity
/// bugs and belong in operator logs, never in user-facing text. The
/// rest are expected outcomes callers are meant to branch on.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthError {
    InvalidUserState(String),
    InvalidMembershipState(String),
    AccessDenied(String),
    UserNotFound,
    NotFound,
    Forbidden,
    Conflict(String),
    SetupFailed(String),
    Unavailable(String),
    Validation(ValidationError),
}

impl std::error::Error for AuthError {}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::InvalidUserState(msg) => write!(f, "Invalid user state: {}", msg),
            AuthError::InvalidMembershipState(msg) => {
                write!(f, "Invalid membership state: {}", msg)
            }
            AuthError::AccessDenied(msg) => write!(f, "{}", msg),
            AuthError::UserNotFound => write!(f, "User not found"),
            AuthError::NotFound => write!(f, "Resource not found"),
            AuthError::Forbidden => write!(f, "Forbidden"),
            AuthError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            AuthError::SetupFailed(msg) => write!(f, "Setup failed: {}", msg),
            AuthError::Unavailable(msg) => write!(f, "Storage unavailable: {}", msg),
            AuthError::Validation(err) => write!(f, "{}", err),
        }
    }
}

impl From<ValidationError> for AuthError {
    fn from(err: ValidationError) -> Self {
        AuthError::Validation(err)
    }
}

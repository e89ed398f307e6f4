//! Membership lifecycle actions.
//!
//! Each action owns the repositories it needs and exposes a single
//! `execute` method. Construct them once with concrete repository
//! implementations and share them freely; `execute` takes `&self`.

mod approve_membership;
mod create_team;
mod join_team;
mod reject_membership;

pub use approve_membership::{
    ApproveMembershipAction, ApproveMembershipInput, ApproveMembershipOutput,
};
pub use create_team::{CreateTeamAction, CreateTeamInput, CreateTeamOutput};
pub use join_team::{JoinTeamAction, JoinTeamInput, JoinTeamOutput};
pub use reject_membership::{
    RejectMembershipAction, RejectMembershipInput, RejectMembershipOutput,
};

use crate::repository::{RoleRepository, UserRepository};
use crate::types::User;
use crate::AuthError;

/// Resolves the acting user and checks they may administer `team_id`.
///
/// Master admins pass for any team. Everyone else must belong to the
/// team and hold a role with `is_admin` set.
pub(crate) async fn authorize_team_admin<U, R>(
    user_repo: &U,
    role_repo: &R,
    acting_user_id: &str,
    team_id: i64,
) -> Result<User, AuthError>
where
    U: UserRepository,
    R: RoleRepository,
{
    let actor = user_repo
        .find_by_id(acting_user_id)
        .await?
        .ok_or(AuthError::UserNotFound)?;

    if actor.is_master_admin {
        return Ok(actor);
    }

    if actor.team_id != Some(team_id) {
        return Err(AuthError::Forbidden);
    }

    let role_id = actor.role_id.ok_or(AuthError::Forbidden)?;
    let role = role_repo
        .find_by_id(role_id)
        .await?
        .ok_or(AuthError::Forbidden)?;

    if !role.is_admin {
        return Err(AuthError::Forbidden);
    }

    Ok(actor)
}

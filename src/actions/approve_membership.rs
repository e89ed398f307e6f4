use chrono::Utc;

use crate::actions::authorize_team_admin;
use crate::events::{dispatch, MembershipEvent};
use crate::guards::{validate_membership_state, validate_user_team_consistency};
use crate::repository::{MembershipRepository, RoleRepository, UserRepository};
use crate::types::{Membership, Role, User};
use crate::AuthError;

/// Input data for approving a pending membership.
#[derive(Debug, Clone)]
pub struct ApproveMembershipInput {
    /// Id of the approving admin.
    pub admin_user_id: String,
    pub membership_id: i64,
    /// Role the member receives; must belong to the membership's team.
    pub role_id: i64,
}

/// Output from approving a membership.
#[derive(Debug)]
pub struct ApproveMembershipOutput {
    pub membership: Membership,
    /// The member, now holding the assigned role.
    pub user: User,
    pub role: Role,
}

/// Action to approve a pending membership and assign the member a role.
///
/// This action:
/// 1. Loads the membership and authorizes the approver against its team
/// 2. Checks the assigned role belongs to that same team
/// 3. Transitions the membership `pending` to `approved`, stamping the
///    approver; only one of two racing reviewers can win this step
/// 4. Writes the role onto the member's user row
///
/// Steps 3 and 4 are two storage writes. If the role write fails the
/// membership stays approved with no role assigned; the action logs an
/// error naming the membership so an operator can repair it, then
/// propagates the failure.
pub struct ApproveMembershipAction<M, U, R>
where
    M: MembershipRepository,
    U: UserRepository,
    R: RoleRepository,
{
    membership_repo: M,
    user_repo: U,
    role_repo: R,
}

impl<M, U, R> ApproveMembershipAction<M, U, R>
where
    M: MembershipRepository,
    U: UserRepository,
    R: RoleRepository,
{
    /// Creates a new `ApproveMembershipAction`.
    pub fn new(membership_repo: M, user_repo: U, role_repo: R) -> Self {
        Self {
            membership_repo,
            user_repo,
            role_repo,
        }
    }

    /// Approves a pending membership, assigning `role_id` to the member.
    ///
    /// # Arguments
    ///
    /// * `input` - The approver, the membership, and the role to assign
    ///
    /// # Returns
    ///
    /// - `Ok(output)` - Membership approved and role assigned
    /// - `Err(AuthError::NotFound)` - Membership or role does not exist
    /// - `Err(AuthError::UserNotFound)` - Approver does not exist
    /// - `Err(AuthError::Forbidden)` - Approver may not administer the
    ///   team, or the role belongs to a different team
    /// - `Err(AuthError::Conflict(_))` - Membership is no longer pending
    /// - `Err(_)` - Storage or other errors
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "approve_membership", skip_all, err)
    )]
    pub async fn execute(
        &self,
        input: ApproveMembershipInput,
    ) -> Result<ApproveMembershipOutput, AuthError> {
        let membership = self
            .membership_repo
            .find_by_id(input.membership_id)
            .await?
            .ok_or(AuthError::NotFound)?;

        let actor = authorize_team_admin(
            &self.user_repo,
            &self.role_repo,
            &input.admin_user_id,
            membership.team_id,
        )
        .await?;

        let role = self
            .role_repo
            .find_by_id(input.role_id)
            .await?
            .ok_or(AuthError::NotFound)?;

        // templates and foreign-team roles must never reach a user row
        if role.team_id != Some(membership.team_id) {
            return Err(AuthError::Forbidden);
        }

        // conditional transition; a concurrent approval or rejection has
        // already won if this fails
        let approved = self
            .membership_repo
            .approve_pending(membership.id, &actor.id)
            .await?;

        let user = match self
            .user_repo
            .assign_role(&membership.user_id, role.id)
            .await
        {
            Ok(user) => user,
            Err(e) => {
                log::error!(
                    target: "roster",
                    "msg=\"approved membership left without role assignment\", membership_id={}, user_id={}, error=\"{e}\"",
                    approved.id,
                    membership.user_id
                );
                return Err(e);
            }
        };

        validate_membership_state(&approved)?;
        validate_user_team_consistency(&user)?;

        log::info!(
            target: "roster",
            "msg=\"membership approved\", membership_id={}, team_id={}, user_id={}, approved_by={}, role_id={}",
            approved.id,
            approved.team_id,
            approved.user_id,
            actor.id,
            role.id
        );

        dispatch(MembershipEvent::MembershipApproved {
            membership_id: approved.id,
            team_id: approved.team_id,
            user_id: approved.user_id.clone(),
            approved_by: actor.id.clone(),
            role_id: role.id,
            at: Utc::now(),
        })
        .await;

        Ok(ApproveMembershipOutput {
            membership: approved,
            user,
            role,
        })
    }
}

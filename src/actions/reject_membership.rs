use chrono::Utc;

use crate::actions::authorize_team_admin;
use crate::config::MembershipConfig;
use crate::events::{dispatch, MembershipEvent};
use crate::guards::validate_membership_state;
use crate::repository::{MembershipRepository, RoleRepository, UserRepository};
use crate::types::Membership;
use crate::validators::validate_reason_with_limit;
use crate::AuthError;

/// Input data for rejecting a pending membership.
#[derive(Debug, Clone)]
pub struct RejectMembershipInput {
    /// Id of the rejecting admin.
    pub admin_user_id: String,
    pub membership_id: i64,
    /// Recorded on the membership for the audit trail.
    pub reason: String,
}

/// Output from rejecting a membership.
#[derive(Debug)]
pub struct RejectMembershipOutput {
    pub membership: Membership,
}

/// Action to reject a pending membership.
///
/// This action:
/// 1. Validates the rejection reason
/// 2. Loads the membership and authorizes the reviewer against its team
/// 3. Transitions the membership `pending` to `rejected`, recording the
///    reason; only one of two racing reviewers can win this step
///
/// The member's user row is left alone: a rejected user keeps their
/// team pointer and stays without a role. Whether they may file a new
/// request is decided by
/// [`RejoinPolicy`](crate::config::RejoinPolicy) at join time.
pub struct RejectMembershipAction<M, U, R>
where
    M: MembershipRepository,
    U: UserRepository,
    R: RoleRepository,
{
    membership_repo: M,
    user_repo: U,
    role_repo: R,
    config: MembershipConfig,
}

impl<M, U, R> RejectMembershipAction<M, U, R>
where
    M: MembershipRepository,
    U: UserRepository,
    R: RoleRepository,
{
    /// Creates a new `RejectMembershipAction` with default configuration.
    pub fn new(membership_repo: M, user_repo: U, role_repo: R) -> Self {
        Self::with_config(membership_repo, user_repo, role_repo, MembershipConfig::default())
    }

    /// Creates a new `RejectMembershipAction` with custom configuration.
    pub fn with_config(
        membership_repo: M,
        user_repo: U,
        role_repo: R,
        config: MembershipConfig,
    ) -> Self {
        Self {
            membership_repo,
            user_repo,
            role_repo,
            config,
        }
    }

    /// Rejects a pending membership with the given reason.
    ///
    /// # Arguments
    ///
    /// * `input` - The reviewer, the membership, and the reason
    ///
    /// # Returns
    ///
    /// - `Ok(output)` - Membership rejected
    /// - `Err(AuthError::Validation(_))` - Reason empty or too long
    /// - `Err(AuthError::NotFound)` - Membership does not exist
    /// - `Err(AuthError::UserNotFound)` - Reviewer does not exist
    /// - `Err(AuthError::Forbidden)` - Reviewer may not administer the team
    /// - `Err(AuthError::Conflict(_))` - Membership is no longer pending
    /// - `Err(_)` - Storage or other errors
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "reject_membership", skip_all, err)
    )]
    pub async fn execute(
        &self,
        input: RejectMembershipInput,
    ) -> Result<RejectMembershipOutput, AuthError> {
        validate_reason_with_limit(&input.reason, self.config.max_reason_len)?;

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

        // conditional transition; a concurrent approval or rejection has
        // already won if this fails
        let rejected = self
            .membership_repo
            .reject_pending(membership.id, input.reason.trim())
            .await?;

        validate_membership_state(&rejected)?;

        log::info!(
            target: "roster",
            "msg=\"membership rejected\", membership_id={}, team_id={}, user_id={}, rejected_by={}",
            rejected.id,
            rejected.team_id,
            rejected.user_id,
            actor.id
        );

        dispatch(MembershipEvent::MembershipRejected {
            membership_id: rejected.id,
            team_id: rejected.team_id,
            user_id: rejected.user_id.clone(),
            rejected_by: actor.id.clone(),
            at: Utc::now(),
        })
        .await;

        Ok(RejectMembershipOutput {
            membership: rejected,
        })
    }
}

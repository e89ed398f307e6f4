use chrono::Utc;

use crate::config::{MembershipConfig, RejoinPolicy};
use crate::events::{dispatch, MembershipEvent};
use crate::guards::validate_membership_state;
use crate::repository::{
    CreateMembership, CreateUser, MembershipRepository, TeamRepository, UserRepository,
};
use crate::types::{Membership, User};
use crate::validators::validate_email;
use crate::AuthError;

/// Input data for requesting to join a team.
#[derive(Debug, Clone)]
pub struct JoinTeamInput {
    /// Identity-provider id of the requester.
    pub user_id: String,
    pub email: String,
    pub team_id: i64,
    /// Advisory only; the approver picks the actual role.
    pub requested_role_id: Option<i64>,
}

/// Output from requesting to join a team.
#[derive(Debug)]
pub struct JoinTeamOutput {
    /// The requester, pointed at the team with no role yet.
    pub user: User,
    /// The pending membership awaiting review.
    pub membership: Membership,
}

/// Action to request membership in an existing team.
///
/// This action:
/// 1. Validates the email and that the target team exists
/// 2. Creates the user row on first contact, or re-targets a returning
///    user whose history is rejected-only (subject to [`RejoinPolicy`])
/// 3. Records a pending membership for an admin to review
///
/// The requester gets no role and no permissions until approval. Users
/// with a pending or approved membership anywhere cannot request
/// another one; master admins cannot join teams at all.
pub struct JoinTeamAction<T, U, M>
where
    T: TeamRepository,
    U: UserRepository,
    M: MembershipRepository,
{
    team_repo: T,
    user_repo: U,
    membership_repo: M,
    config: MembershipConfig,
}

impl<T, U, M> JoinTeamAction<T, U, M>
where
    T: TeamRepository,
    U: UserRepository,
    M: MembershipRepository,
{
    /// Creates a new `JoinTeamAction` with default configuration.
    pub fn new(team_repo: T, user_repo: U, membership_repo: M) -> Self {
        Self::with_config(team_repo, user_repo, membership_repo, MembershipConfig::default())
    }

    /// Creates a new `JoinTeamAction` with custom configuration.
    pub fn with_config(
        team_repo: T,
        user_repo: U,
        membership_repo: M,
        config: MembershipConfig,
    ) -> Self {
        Self {
            team_repo,
            user_repo,
            membership_repo,
            config,
        }
    }

    /// Requests membership in a team, creating a pending membership.
    ///
    /// # Arguments
    ///
    /// * `input` - The requester's id and email, the target team, and an
    ///   optional requested role
    ///
    /// # Returns
    ///
    /// - `Ok(output)` - Pending membership recorded
    /// - `Err(AuthError::Validation(_))` - Email invalid
    /// - `Err(AuthError::NotFound)` - Team does not exist
    /// - `Err(AuthError::Conflict(_))` - Requester already has an active
    ///   membership, is a master admin, was rejected under
    ///   [`RejoinPolicy::Deny`], or the email belongs to another user
    /// - `Err(_)` - Storage or other errors
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "join_team", skip_all, err)
    )]
    pub async fn execute(&self, input: JoinTeamInput) -> Result<JoinTeamOutput, AuthError> {
        validate_email(&input.email)?;

        let team = self
            .team_repo
            .find_by_id(input.team_id)
            .await?
            .ok_or(AuthError::NotFound)?;

        let user = match self.user_repo.find_by_id(&input.user_id).await? {
            Some(existing) => self.admit_returning_user(existing, team.id).await?,
            None => {
                // the email unique constraint would also catch this, but
                // prechecking keeps the error message specific
                if self.user_repo.find_by_email(&input.email).await?.is_some() {
                    return Err(AuthError::Conflict(format!(
                        "email {} already registered",
                        input.email
                    )));
                }

                self.user_repo
                    .create(CreateUser {
                        id: input.user_id.clone(),
                        email: input.email.clone(),
                        is_master_admin: false,
                        team_id: Some(team.id),
                        role_id: None,
                    })
                    .await?
            }
        };

        let membership = self
            .membership_repo
            .create_pending(CreateMembership {
                team_id: team.id,
                user_id: user.id.clone(),
                requested_role_id: input.requested_role_id,
            })
            .await?;

        validate_membership_state(&membership)?;

        log::info!(
            target: "roster",
            "msg=\"join requested\", team_id={}, user_id={}, membership_id={}",
            team.id,
            user.id,
            membership.id
        );

        dispatch(MembershipEvent::JoinRequested {
            membership_id: membership.id,
            team_id: team.id,
            user_id: user.id.clone(),
            at: Utc::now(),
        })
        .await;

        Ok(JoinTeamOutput { user, membership })
    }

    /// Decides whether an existing user may file a new join request.
    ///
    /// The stored email stays authoritative; the input email is only
    /// validated, never used to update the row.
    async fn admit_returning_user(&self, user: User, team_id: i64) -> Result<User, AuthError> {
        if user.is_master_admin {
            return Err(AuthError::Conflict(format!(
                "master admin {} cannot join a team",
                user.id
            )));
        }

        let memberships = self.membership_repo.find_by_user(&user.id).await?;

        if memberships.iter().any(Membership::is_approved) {
            return Err(AuthError::Conflict(format!(
                "user {} is already a member of a team",
                user.id
            )));
        }
        if memberships.iter().any(Membership::is_pending) {
            return Err(AuthError::Conflict(format!(
                "user {} already has a pending membership",
                user.id
            )));
        }

        let was_rejected = memberships.iter().any(Membership::is_rejected);
        if was_rejected && self.config.rejoin_policy == RejoinPolicy::Deny {
            return Err(AuthError::Conflict(format!(
                "user {} was previously rejected and may not rejoin",
                user.id
            )));
        }

        // re-point the user at the team being requested; the old rejected
        // rows keep their team for the audit trail
        if user.team_id == Some(team_id) {
            Ok(user)
        } else {
            self.user_repo.assign_team(&user.id, team_id).await
        }
    }
}

use chrono::Utc;

use crate::config::MembershipConfig;
use crate::events::{dispatch, MembershipEvent};
use crate::guards::{validate_membership_state, validate_user_team_consistency};
use crate::provision::RoleProvisioner;
use crate::repository::{
    CreateMembership, CreateTeam, CreateUser, MembershipRepository, TeamRepository, UserRepository,
};
use crate::types::{Membership, Role, Team, User};
use crate::validators::{validate_email, validate_team_name_with_limit};
use crate::AuthError;

/// Input data for creating a team.
#[derive(Debug, Clone)]
pub struct CreateTeamInput {
    /// Identity-provider id of the founding user.
    pub user_id: String,
    pub email: String,
    pub team_name: String,
}

/// Output from creating a team.
#[derive(Debug)]
pub struct CreateTeamOutput {
    pub team: Team,
    /// The founding user, bound to the team's admin role.
    pub admin: User,
    pub admin_role: Role,
    /// The founder's membership, created already approved.
    pub membership: Membership,
}

/// Action to create a team with its founding local admin.
///
/// This action:
/// 1. Validates the email and team name
/// 2. Rejects user ids and emails that are already registered
/// 3. Creates the team row
/// 4. Provisions the team's roles and picks the admin role
/// 5. Creates the founding user bound to the team and admin role
/// 6. Records a self-approved membership for the founder
///
/// Step 4 onward can fail after the team row exists. The action does
/// not delete the row in that case; it logs an error naming the
/// team id so an operator can reap it.
pub struct CreateTeamAction<T, U, M, P>
where
    T: TeamRepository,
    U: UserRepository,
    M: MembershipRepository,
    P: RoleProvisioner,
{
    team_repo: T,
    user_repo: U,
    membership_repo: M,
    provisioner: P,
    config: MembershipConfig,
}

impl<T, U, M, P> CreateTeamAction<T, U, M, P>
where
    T: TeamRepository,
    U: UserRepository,
    M: MembershipRepository,
    P: RoleProvisioner,
{
    /// Creates a new `CreateTeamAction` with default configuration.
    pub fn new(team_repo: T, user_repo: U, membership_repo: M, provisioner: P) -> Self {
        Self::with_config(
            team_repo,
            user_repo,
            membership_repo,
            provisioner,
            MembershipConfig::default(),
        )
    }

    /// Creates a new `CreateTeamAction` with custom configuration.
    pub fn with_config(
        team_repo: T,
        user_repo: U,
        membership_repo: M,
        provisioner: P,
        config: MembershipConfig,
    ) -> Self {
        Self {
            team_repo,
            user_repo,
            membership_repo,
            provisioner,
            config,
        }
    }

    /// Creates a team and its founding local admin.
    ///
    /// # Arguments
    ///
    /// * `input` - The founder's id and email, and the team name
    ///
    /// # Returns
    ///
    /// - `Ok(output)` - Team created with admin user and approved membership
    /// - `Err(AuthError::Validation(_))` - Email or team name invalid
    /// - `Err(AuthError::Conflict(_))` - User id or email already registered
    /// - `Err(AuthError::SetupFailed(_))` - Provisioning yielded no admin role
    /// - `Err(_)` - Storage or other errors
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "create_team", skip_all, err)
    )]
    pub async fn execute(&self, input: CreateTeamInput) -> Result<CreateTeamOutput, AuthError> {
        validate_email(&input.email)?;
        validate_team_name_with_limit(&input.team_name, self.config.max_team_name_len)?;

        // precheck before creating the team row so the common conflicts
        // never leave an orphaned team behind
        if self.user_repo.find_by_id(&input.user_id).await?.is_some() {
            return Err(AuthError::Conflict(format!(
                "user {} already exists",
                input.user_id
            )));
        }
        if self.user_repo.find_by_email(&input.email).await?.is_some() {
            return Err(AuthError::Conflict(format!(
                "email {} already registered",
                input.email
            )));
        }

        let team = self
            .team_repo
            .create(CreateTeam {
                name: input.team_name.trim().to_owned(),
            })
            .await?;

        let (admin, admin_role, membership) = match self.setup_team(&team, &input).await {
            Ok(result) => result,
            Err(e) => {
                log::error!(
                    target: "roster",
                    "msg=\"team setup failed, team row requires external cleanup\", team_id={}, error=\"{e}\"",
                    team.id
                );
                return Err(e);
            }
        };

        log::info!(
            target: "roster",
            "msg=\"team created\", team_id={}, user_id={}, role_id={}, membership_id={}",
            team.id,
            admin.id,
            admin_role.id,
            membership.id
        );

        dispatch(MembershipEvent::TeamCreated {
            team_id: team.id,
            team_name: team.name.clone(),
            user_id: admin.id.clone(),
            at: Utc::now(),
        })
        .await;

        Ok(CreateTeamOutput {
            team,
            admin,
            admin_role,
            membership,
        })
    }

    /// Everything after the team row exists: roles, founder, membership.
    async fn setup_team(
        &self,
        team: &Team,
        input: &CreateTeamInput,
    ) -> Result<(User, Role, Membership), AuthError> {
        let roles = self.provisioner.provision_roles(team.id).await?;

        // the provisioner contract requires an admin role, but a broken
        // implementation must not leave the team without one
        let admin_role = roles
            .into_iter()
            .find(|role| role.is_admin)
            .ok_or_else(|| {
                AuthError::SetupFailed("provisioning yielded no admin role".to_owned())
            })?;

        let admin = self
            .user_repo
            .create(CreateUser {
                id: input.user_id.clone(),
                email: input.email.clone(),
                is_master_admin: false,
                team_id: Some(team.id),
                role_id: Some(admin_role.id),
            })
            .await?;

        let membership = self
            .membership_repo
            .create_approved(
                CreateMembership {
                    team_id: team.id,
                    user_id: admin.id.clone(),
                    requested_role_id: Some(admin_role.id),
                },
                &admin.id,
            )
            .await?;

        validate_user_team_consistency(&admin)?;
        validate_membership_state(&membership)?;

        Ok((admin, admin_role, membership))
    }
}

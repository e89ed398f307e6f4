//! Role provisioning for newly created teams.
//!
//! When a team is created its initial role set is materialized by a
//! [`RoleProvisioner`]. The default implementation clones the template
//! roles (rows with no team) into the new team, including each
//! template's permission grants.

use async_trait::async_trait;

use crate::repository::{CreateRole, PermissionRepository, RoleRepository};
use crate::types::Role;
use crate::AuthError;

/// Collaborator that materializes the standard role set for a new team.
///
/// Implementations must create at least one role with `is_admin = true`
/// for the given team, or fail. The create-team action independently
/// verifies the returned set and treats an admin-less result as
/// [`AuthError::SetupFailed`], so a misbehaving implementation cannot
/// leave a team without a local admin.
#[async_trait]
pub trait RoleProvisioner: Send + Sync {
    async fn provision_roles(&self, team_id: i64) -> Result<Vec<Role>, AuthError>;
}

/// Default provisioner: clones every template role into the new team,
/// carrying over each template's permission grants.
pub struct TemplateRoleProvisioner<R, P>
where
    R: RoleRepository,
    P: PermissionRepository,
{
    role_repo: R,
    permission_repo: P,
}

impl<R: RoleRepository, P: PermissionRepository> TemplateRoleProvisioner<R, P> {
    pub fn new(role_repo: R, permission_repo: P) -> Self {
        Self {
            role_repo,
            permission_repo,
        }
    }
}

#[async_trait]
impl<R: RoleRepository, P: PermissionRepository> RoleProvisioner
    for TemplateRoleProvisioner<R, P>
{
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "provision_roles", skip_all, err)
    )]
    async fn provision_roles(&self, team_id: i64) -> Result<Vec<Role>, AuthError> {
        let templates = self.role_repo.find_templates().await?;
        if templates.is_empty() {
            return Err(AuthError::SetupFailed(
                "no role templates configured".to_owned(),
            ));
        }

        let mut roles = Vec::with_capacity(templates.len());
        for template in templates {
            let role = self
                .role_repo
                .create(CreateRole {
                    team_id: Some(team_id),
                    name: template.name.clone(),
                    is_admin: template.is_admin,
                })
                .await?;

            let granted: Vec<i64> = self
                .permission_repo
                .find_by_role(template.id)
                .await?
                .into_iter()
                .map(|p| p.id)
                .collect();
            if !granted.is_empty() {
                self.permission_repo
                    .replace_for_role(role.id, &granted)
                    .await?;
            }

            roles.push(role);
        }

        if !roles.iter().any(|r| r.is_admin) {
            return Err(AuthError::SetupFailed(
                "role templates contain no admin role".to_owned(),
            ));
        }

        log::info!(
            target: "roster",
            "msg=\"roles provisioned\", team_id={}, count={}",
            team_id,
            roles.len()
        );

        Ok(roles)
    }
}

//! Permission resolution for authenticated principals.
//!
//! The resolver answers "may this user do X" without touching the
//! membership lifecycle. It reads the denormalized role pointer on the
//! user row, so a pending member (no role yet) resolves to no
//! permissions at all.

use std::collections::HashSet;

use crate::repository::{PermissionRepository, RoleRepository, UserRepository};
use crate::types::{Role, User};
use crate::AuthError;

/// Resolves effective permissions from a user's role and the catalog.
///
/// Two bypass tiers sit above explicit grants: master admins pass every
/// check everywhere, and a role with `is_admin` passes every check
/// within its team. Both tiers also enumerate to the full catalog.
///
/// Unknown users, users without a role, and roles whose grant rows are
/// gone all resolve to "no permissions" rather than an error; the
/// resolver is a query surface, not a validator.
pub struct PermissionResolver<U, R, P>
where
    U: UserRepository,
    R: RoleRepository,
    P: PermissionRepository,
{
    user_repo: U,
    role_repo: R,
    permission_repo: P,
}

impl<U, R, P> PermissionResolver<U, R, P>
where
    U: UserRepository,
    R: RoleRepository,
    P: PermissionRepository,
{
    /// Creates a new `PermissionResolver`.
    pub fn new(user_repo: U, role_repo: R, permission_repo: P) -> Self {
        Self {
            user_repo,
            role_repo,
            permission_repo,
        }
    }

    /// Checks whether the user holds a single permission.
    ///
    /// # Returns
    ///
    /// - `Ok(true)` - Master admin, local admin, or the key is granted
    ///   to the user's role
    /// - `Ok(false)` - No such user, no role, or the key is not granted
    /// - `Err(_)` - Storage errors only
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "check_permission", skip_all, err)
    )]
    pub async fn check_permission(
        &self,
        user_id: &str,
        permission_key: &str,
    ) -> Result<bool, AuthError> {
        let Some((user, role)) = self.load_user_with_role(user_id).await? else {
            return Ok(false);
        };

        if user.is_master_admin {
            return Ok(true);
        }

        let Some(role) = role else {
            return Ok(false);
        };
        if role.is_admin {
            return Ok(true);
        }

        let granted = self.granted_keys(role.id).await?;
        Ok(granted.contains(permission_key))
    }

    /// Checks whether the user holds at least one of the given keys.
    ///
    /// An empty `permission_keys` slice is always false, even for
    /// admins; the bypass applies only when there is something to check.
    pub async fn check_any_permission(
        &self,
        user_id: &str,
        permission_keys: &[&str],
    ) -> Result<bool, AuthError> {
        if permission_keys.is_empty() {
            return Ok(false);
        }

        let Some(role) = self.bypass_or_role(user_id).await? else {
            return Ok(false);
        };
        let role = match role {
            Bypass::Admin => return Ok(true),
            Bypass::Role(role) => role,
        };

        let granted = self.granted_keys(role.id).await?;
        Ok(permission_keys.iter().any(|key| granted.contains(*key)))
    }

    /// Checks whether the user holds every one of the given keys.
    ///
    /// An empty `permission_keys` slice is vacuously true, but only for
    /// users that hold a role or an admin tier; users with no role fail
    /// every check, the empty one included.
    pub async fn check_all_permissions(
        &self,
        user_id: &str,
        permission_keys: &[&str],
    ) -> Result<bool, AuthError> {
        let Some(role) = self.bypass_or_role(user_id).await? else {
            return Ok(false);
        };
        let role = match role {
            Bypass::Admin => return Ok(true),
            Bypass::Role(role) => role,
        };

        if permission_keys.is_empty() {
            return Ok(true);
        }

        let granted = self.granted_keys(role.id).await?;
        Ok(permission_keys.iter().all(|key| granted.contains(*key)))
    }

    /// Enumerates the user's effective permission keys.
    ///
    /// Admins of either tier get every key in the catalog, not just the
    /// keys granted to some role. Everyone else gets their role's
    /// granted keys, which may be empty.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "user_permissions", skip_all, err)
    )]
    pub async fn user_permissions(&self, user_id: &str) -> Result<HashSet<String>, AuthError> {
        let Some((user, role)) = self.load_user_with_role(user_id).await? else {
            return Ok(HashSet::new());
        };

        let is_admin = user.is_master_admin || role.as_ref().is_some_and(|r| r.is_admin);
        if is_admin {
            let catalog = self.permission_repo.all().await?;
            return Ok(catalog.into_iter().map(|p| p.key).collect());
        }

        match role {
            Some(role) => self.granted_keys(role.id).await,
            None => Ok(HashSet::new()),
        }
    }

    /// True when the user holds an `is_admin` role on their team.
    ///
    /// Master admins are not local admins; they hold no role at all.
    pub async fn is_local_admin(&self, user_id: &str) -> Result<bool, AuthError> {
        let Some((user, role)) = self.load_user_with_role(user_id).await? else {
            return Ok(false);
        };
        Ok(!user.is_master_admin && role.is_some_and(|r| r.is_admin))
    }

    /// True when the user is a master admin.
    pub async fn is_master_admin(&self, user_id: &str) -> Result<bool, AuthError> {
        let user = self.user_repo.find_by_id(user_id).await?;
        Ok(user.is_some_and(|u| u.is_master_admin))
    }

    /// Loads the user and, when the role pointer is set, their role.
    ///
    /// A dangling role pointer loads as `None`, which downstream treats
    /// the same as holding no role.
    async fn load_user_with_role(
        &self,
        user_id: &str,
    ) -> Result<Option<(User, Option<Role>)>, AuthError> {
        let Some(user) = self.user_repo.find_by_id(user_id).await? else {
            return Ok(None);
        };

        let role = match user.role_id {
            Some(role_id) => self.role_repo.find_by_id(role_id).await?,
            None => None,
        };

        Ok(Some((user, role)))
    }

    /// Collapses the admin tiers for the combinators: one lookup decides
    /// bypass, otherwise the caller gets the role to check grants on.
    async fn bypass_or_role(&self, user_id: &str) -> Result<Option<Bypass>, AuthError> {
        let Some((user, role)) = self.load_user_with_role(user_id).await? else {
            return Ok(None);
        };

        if user.is_master_admin {
            return Ok(Some(Bypass::Admin));
        }

        match role {
            Some(role) if role.is_admin => Ok(Some(Bypass::Admin)),
            Some(role) => Ok(Some(Bypass::Role(role))),
            None => Ok(None),
        }
    }

    async fn granted_keys(&self, role_id: i64) -> Result<HashSet<String>, AuthError> {
        let permissions = self.permission_repo.find_by_role(role_id).await?;
        Ok(permissions.into_iter().map(|p| p.key).collect())
    }
}

enum Bypass {
    Admin,
    Role(Role),
}

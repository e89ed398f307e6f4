//! Storage contracts for the membership subsystem.
//!
//! Implement these traits to plug in a database backend. The in-memory
//! implementations behind the `mocks` feature satisfy the same contracts
//! and back the test suites.
//!
//! | Trait | Rows |
//! |-------|------|
//! | [`UserRepository`] | principals and their denormalized team/role pointers |
//! | [`TeamRepository`] | tenants |
//! | [`RoleRepository`] | per-team roles and provisioning templates |
//! | [`PermissionRepository`] | the permission catalog and role grants |
//! | [`MembershipRepository`] | approval workflow rows |

use async_trait::async_trait;

use crate::types::{Membership, Permission, Role, Team, User};
use crate::AuthError;

#[derive(Debug, Clone)]
pub struct CreateUser {
    /// Identity-provider id; rows are created with it, never generated.
    pub id: String,
    pub email: String,
    pub is_master_admin: bool,
    pub team_id: Option<i64>,
    pub role_id: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct CreateTeam {
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct CreateRole {
    /// `None` creates a provisioning template.
    pub team_id: Option<i64>,
    pub name: String,
    pub is_admin: bool,
}

#[derive(Debug, Clone)]
pub struct CreatePermission {
    pub key: String,
    pub name: String,
    pub module: String,
}

#[derive(Debug, Clone)]
pub struct CreateMembership {
    pub team_id: i64,
    pub user_id: String,
    pub requested_role_id: Option<i64>,
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Duplicate id or email (case-insensitive) fails with `Conflict`.
    async fn create(&self, data: CreateUser) -> Result<User, AuthError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<User>, AuthError>;
    /// Case-insensitive lookup.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AuthError>;
    async fn assign_role(&self, user_id: &str, role_id: i64) -> Result<User, AuthError>;
    async fn assign_team(&self, user_id: &str, team_id: i64) -> Result<User, AuthError>;
}

#[async_trait]
pub trait TeamRepository: Send + Sync {
    async fn create(&self, data: CreateTeam) -> Result<Team, AuthError>;
    async fn find_by_id(&self, id: i64) -> Result<Option<Team>, AuthError>;
}

#[async_trait]
pub trait RoleRepository: Send + Sync {
    async fn create(&self, data: CreateRole) -> Result<Role, AuthError>;
    async fn find_by_id(&self, id: i64) -> Result<Option<Role>, AuthError>;
    async fn find_by_team(&self, team_id: i64) -> Result<Vec<Role>, AuthError>;
    /// Roles with no team, used only to seed new teams.
    async fn find_templates(&self) -> Result<Vec<Role>, AuthError>;
}

/// Catalog entries plus the role grant join. Grants are keyed by
/// (role_id, permission_id) and deduplicated by the store.
#[async_trait]
pub trait PermissionRepository: Send + Sync {
    /// Duplicate key fails with `Conflict`.
    async fn create(&self, data: CreatePermission) -> Result<Permission, AuthError>;
    async fn all(&self) -> Result<Vec<Permission>, AuthError>;
    async fn find_by_key(&self, key: &str) -> Result<Option<Permission>, AuthError>;
    async fn find_by_role(&self, role_id: i64) -> Result<Vec<Permission>, AuthError>;
    /// Idempotent; unknown permission ids fail with `NotFound`.
    async fn grant_to_role(&self, role_id: i64, permission_id: i64) -> Result<(), AuthError>;
    /// Replaces the role's grant set in one atomic step. On any failure
    /// the previous grants remain intact; a partial replace must never
    /// be observable.
    async fn replace_for_role(
        &self,
        role_id: i64,
        permission_ids: &[i64],
    ) -> Result<(), AuthError>;
}

#[async_trait]
pub trait MembershipRepository: Send + Sync {
    /// At most one non-terminal membership may exist per (team, user);
    /// a second pending request fails with `Conflict`.
    async fn create_pending(&self, data: CreateMembership) -> Result<Membership, AuthError>;
    /// Creates a row already approved with `approved_by` (team founders
    /// self-approve). The same non-terminal uniqueness rule applies.
    async fn create_approved(
        &self,
        data: CreateMembership,
        approved_by: &str,
    ) -> Result<Membership, AuthError>;
    async fn find_by_id(&self, id: i64) -> Result<Option<Membership>, AuthError>;
    async fn find_by_team_and_user(
        &self,
        team_id: i64,
        user_id: &str,
    ) -> Result<Vec<Membership>, AuthError>;
    async fn find_by_user(&self, user_id: &str) -> Result<Vec<Membership>, AuthError>;
    async fn find_pending_by_team(&self, team_id: i64) -> Result<Vec<Membership>, AuthError>;
    /// Conditional transition: succeeds only while the row is still
    /// `pending`, stamping `approved_at`/`approved_by`. Anything else
    /// fails with `Conflict` and leaves stored metadata untouched.
    async fn approve_pending(&self, id: i64, approved_by: &str) -> Result<Membership, AuthError>;
    /// Conditional transition mirroring `approve_pending`, stamping
    /// `rejected_at`/`rejection_reason`.
    async fn reject_pending(&self, id: i64, reason: &str) -> Result<Membership, AuthError>;
}

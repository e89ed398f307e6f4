#![allow(clippy::significant_drop_tightening)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::Utc;

use crate::provision::RoleProvisioner;
use crate::repository::{
    CreateMembership, CreatePermission, CreateRole, CreateTeam, CreateUser,
    MembershipRepository, PermissionRepository, RoleRepository, TeamRepository, UserRepository,
};
use crate::types::{Membership, MembershipStatus, Permission, Role, Team, User};
use crate::AuthError;

// State lives behind an Arc so clones share one store: seed through one
// handle, move a clone into an action, assert through the original.

#[derive(Clone)]
pub struct MockUserRepository {
    users: Arc<RwLock<HashMap<String, User>>>,
}

impl MockUserRepository {
    pub fn new() -> Self {
        Self {
            users: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for MockUserRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserRepository for MockUserRepository {
    async fn create(&self, data: CreateUser) -> Result<User, AuthError> {
        let mut users = self
            .users
            .write()
            .map_err(|_| AuthError::Unavailable("lock poisoned".into()))?;

        if users.contains_key(&data.id) {
            return Err(AuthError::Conflict(format!("user {} already exists", data.id)));
        }
        if users
            .values()
            .any(|u| u.email.eq_ignore_ascii_case(&data.email))
        {
            return Err(AuthError::Conflict(format!(
                "email {} already registered",
                data.email
            )));
        }

        let now = Utc::now();
        let user = User {
            id: data.id.clone(),
            email: data.email,
            is_master_admin: data.is_master_admin,
            team_id: data.team_id,
            role_id: data.role_id,
            created_at: now,
            updated_at: now,
        };
        users.insert(data.id, user.clone());

        Ok(user)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<User>, AuthError> {
        let users = self
            .users
            .read()
            .map_err(|_| AuthError::Unavailable("lock poisoned".into()))?;
        Ok(users.get(id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AuthError> {
        let users = self
            .users
            .read()
            .map_err(|_| AuthError::Unavailable("lock poisoned".into()))?;
        Ok(users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn assign_role(&self, user_id: &str, role_id: i64) -> Result<User, AuthError> {
        let mut users = self
            .users
            .write()
            .map_err(|_| AuthError::Unavailable("lock poisoned".into()))?;

        let user = users.get_mut(user_id).ok_or(AuthError::UserNotFound)?;
        user.role_id = Some(role_id);
        user.updated_at = Utc::now();

        Ok(user.clone())
    }

    async fn assign_team(&self, user_id: &str, team_id: i64) -> Result<User, AuthError> {
        let mut users = self
            .users
            .write()
            .map_err(|_| AuthError::Unavailable("lock poisoned".into()))?;

        let user = users.get_mut(user_id).ok_or(AuthError::UserNotFound)?;
        user.team_id = Some(team_id);
        user.updated_at = Utc::now();

        Ok(user.clone())
    }
}

#[derive(Clone)]
pub struct MockTeamRepository {
    teams: Arc<RwLock<HashMap<i64, Team>>>,
    next_id: Arc<AtomicI64>,
}

impl MockTeamRepository {
    pub fn new() -> Self {
        Self {
            teams: Arc::new(RwLock::new(HashMap::new())),
            next_id: Arc::new(AtomicI64::new(1)),
        }
    }
}

impl Default for MockTeamRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TeamRepository for MockTeamRepository {
    async fn create(&self, data: CreateTeam) -> Result<Team, AuthError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let now = Utc::now();
        let team = Team {
            id,
            name: data.name,
            created_at: now,
            updated_at: now,
        };

        let mut teams = self
            .teams
            .write()
            .map_err(|_| AuthError::Unavailable("lock poisoned".into()))?;
        teams.insert(id, team.clone());

        Ok(team)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Team>, AuthError> {
        let teams = self
            .teams
            .read()
            .map_err(|_| AuthError::Unavailable("lock poisoned".into()))?;
        Ok(teams.get(&id).cloned())
    }
}

#[derive(Clone)]
pub struct MockRoleRepository {
    roles: Arc<RwLock<HashMap<i64, Role>>>,
    next_id: Arc<AtomicI64>,
}

impl MockRoleRepository {
    pub fn new() -> Self {
        Self {
            roles: Arc::new(RwLock::new(HashMap::new())),
            next_id: Arc::new(AtomicI64::new(1)),
        }
    }
}

impl Default for MockRoleRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RoleRepository for MockRoleRepository {
    async fn create(&self, data: CreateRole) -> Result<Role, AuthError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let now = Utc::now();
        let role = Role {
            id,
            team_id: data.team_id,
            name: data.name,
            is_admin: data.is_admin,
            created_at: now,
            updated_at: now,
        };

        let mut roles = self
            .roles
            .write()
            .map_err(|_| AuthError::Unavailable("lock poisoned".into()))?;
        roles.insert(id, role.clone());

        Ok(role)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Role>, AuthError> {
        let roles = self
            .roles
            .read()
            .map_err(|_| AuthError::Unavailable("lock poisoned".into()))?;
        Ok(roles.get(&id).cloned())
    }

    async fn find_by_team(&self, team_id: i64) -> Result<Vec<Role>, AuthError> {
        let roles = self
            .roles
            .read()
            .map_err(|_| AuthError::Unavailable("lock poisoned".into()))?;
        Ok(roles
            .values()
            .filter(|r| r.team_id == Some(team_id))
            .cloned()
            .collect())
    }

    async fn find_templates(&self) -> Result<Vec<Role>, AuthError> {
        let roles = self
            .roles
            .read()
            .map_err(|_| AuthError::Unavailable("lock poisoned".into()))?;
        let mut templates: Vec<Role> = roles
            .values()
            .filter(|r| r.is_template())
            .cloned()
            .collect();
        templates.sort_by_key(|r| r.id);
        Ok(templates)
    }
}

#[derive(Default)]
struct PermissionStore {
    permissions: HashMap<i64, Permission>,
    grants: HashMap<i64, HashSet<i64>>,
}

#[derive(Clone)]
pub struct MockPermissionRepository {
    store: Arc<RwLock<PermissionStore>>,
    next_id: Arc<AtomicI64>,
}

impl MockPermissionRepository {
    pub fn new() -> Self {
        Self {
            store: Arc::new(RwLock::new(PermissionStore::default())),
            next_id: Arc::new(AtomicI64::new(1)),
        }
    }
}

impl Default for MockPermissionRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PermissionRepository for MockPermissionRepository {
    async fn create(&self, data: CreatePermission) -> Result<Permission, AuthError> {
        let mut store = self
            .store
            .write()
            .map_err(|_| AuthError::Unavailable("lock poisoned".into()))?;

        if store.permissions.values().any(|p| p.key == data.key) {
            return Err(AuthError::Conflict(format!(
                "permission key {} already exists",
                data.key
            )));
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let permission = Permission {
            id,
            key: data.key,
            name: data.name,
            module: data.module,
        };
        store.permissions.insert(id, permission.clone());

        Ok(permission)
    }

    async fn all(&self) -> Result<Vec<Permission>, AuthError> {
        let store = self
            .store
            .read()
            .map_err(|_| AuthError::Unavailable("lock poisoned".into()))?;
        let mut permissions: Vec<Permission> = store.permissions.values().cloned().collect();
        permissions.sort_by_key(|p| p.id);
        Ok(permissions)
    }

    async fn find_by_key(&self, key: &str) -> Result<Option<Permission>, AuthError> {
        let store = self
            .store
            .read()
            .map_err(|_| AuthError::Unavailable("lock poisoned".into()))?;
        Ok(store.permissions.values().find(|p| p.key == key).cloned())
    }

    async fn find_by_role(&self, role_id: i64) -> Result<Vec<Permission>, AuthError> {
        let store = self
            .store
            .read()
            .map_err(|_| AuthError::Unavailable("lock poisoned".into()))?;
        let Some(granted) = store.grants.get(&role_id) else {
            return Ok(Vec::new());
        };
        let mut permissions: Vec<Permission> = granted
            .iter()
            .filter_map(|id| store.permissions.get(id))
            .cloned()
            .collect();
        permissions.sort_by_key(|p| p.id);
        Ok(permissions)
    }

    async fn grant_to_role(&self, role_id: i64, permission_id: i64) -> Result<(), AuthError> {
        let mut store = self
            .store
            .write()
            .map_err(|_| AuthError::Unavailable("lock poisoned".into()))?;

        if !store.permissions.contains_key(&permission_id) {
            return Err(AuthError::NotFound);
        }
        store.grants.entry(role_id).or_default().insert(permission_id);

        Ok(())
    }

    async fn replace_for_role(
        &self,
        role_id: i64,
        permission_ids: &[i64],
    ) -> Result<(), AuthError> {
        let mut store = self
            .store
            .write()
            .map_err(|_| AuthError::Unavailable("lock poisoned".into()))?;

        // validate the whole set before touching the existing grants so a
        // failed replace is never observable as a partial downgrade
        if permission_ids
            .iter()
            .any(|id| !store.permissions.contains_key(id))
        {
            return Err(AuthError::NotFound);
        }
        store
            .grants
            .insert(role_id, permission_ids.iter().copied().collect());

        Ok(())
    }
}

#[derive(Clone)]
pub struct MockMembershipRepository {
    memberships: Arc<RwLock<HashMap<i64, Membership>>>,
    next_id: Arc<AtomicI64>,
}

impl MockMembershipRepository {
    pub fn new() -> Self {
        Self {
            memberships: Arc::new(RwLock::new(HashMap::new())),
            next_id: Arc::new(AtomicI64::new(1)),
        }
    }
}

impl Default for MockMembershipRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl MockMembershipRepository {
    fn insert_new(
        &self,
        memberships: &mut HashMap<i64, Membership>,
        data: CreateMembership,
        status: MembershipStatus,
        approved_by: Option<&str>,
    ) -> Result<Membership, AuthError> {
        if memberships
            .values()
            .any(|m| m.team_id == data.team_id && m.user_id == data.user_id && !m.status.is_terminal())
        {
            return Err(AuthError::Conflict(format!(
                "membership request already exists for user {} in team {}",
                data.user_id, data.team_id
            )));
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let now = Utc::now();
        let membership = Membership {
            id,
            team_id: data.team_id,
            user_id: data.user_id,
            status,
            requested_role_id: data.requested_role_id,
            requested_at: now,
            approved_at: (status == MembershipStatus::Approved).then_some(now),
            approved_by: approved_by.map(str::to_owned),
            rejected_at: None,
            rejection_reason: None,
        };
        memberships.insert(id, membership.clone());

        Ok(membership)
    }
}

#[async_trait]
impl MembershipRepository for MockMembershipRepository {
    async fn create_pending(&self, data: CreateMembership) -> Result<Membership, AuthError> {
        let mut memberships = self
            .memberships
            .write()
            .map_err(|_| AuthError::Unavailable("lock poisoned".into()))?;
        self.insert_new(&mut memberships, data, MembershipStatus::Pending, None)
    }

    async fn create_approved(
        &self,
        data: CreateMembership,
        approved_by: &str,
    ) -> Result<Membership, AuthError> {
        let mut memberships = self
            .memberships
            .write()
            .map_err(|_| AuthError::Unavailable("lock poisoned".into()))?;
        self.insert_new(
            &mut memberships,
            data,
            MembershipStatus::Approved,
            Some(approved_by),
        )
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Membership>, AuthError> {
        let memberships = self
            .memberships
            .read()
            .map_err(|_| AuthError::Unavailable("lock poisoned".into()))?;
        Ok(memberships.get(&id).cloned())
    }

    async fn find_by_team_and_user(
        &self,
        team_id: i64,
        user_id: &str,
    ) -> Result<Vec<Membership>, AuthError> {
        let memberships = self
            .memberships
            .read()
            .map_err(|_| AuthError::Unavailable("lock poisoned".into()))?;
        Ok(memberships
            .values()
            .filter(|m| m.team_id == team_id && m.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn find_by_user(&self, user_id: &str) -> Result<Vec<Membership>, AuthError> {
        let memberships = self
            .memberships
            .read()
            .map_err(|_| AuthError::Unavailable("lock poisoned".into()))?;
        Ok(memberships
            .values()
            .filter(|m| m.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn find_pending_by_team(&self, team_id: i64) -> Result<Vec<Membership>, AuthError> {
        let memberships = self
            .memberships
            .read()
            .map_err(|_| AuthError::Unavailable("lock poisoned".into()))?;
        let mut pending: Vec<Membership> = memberships
            .values()
            .filter(|m| m.team_id == team_id && m.is_pending())
            .cloned()
            .collect();
        pending.sort_by_key(|m| (m.requested_at, m.id));
        Ok(pending)
    }

    async fn approve_pending(&self, id: i64, approved_by: &str) -> Result<Membership, AuthError> {
        // check-and-set under one write lock so racing transitions see
        // exactly one winner
        let mut memberships = self
            .memberships
            .write()
            .map_err(|_| AuthError::Unavailable("lock poisoned".into()))?;

        let membership = memberships.get_mut(&id).ok_or(AuthError::NotFound)?;
        if !membership.is_pending() {
            return Err(AuthError::Conflict(format!(
                "membership {} is already {}",
                id, membership.status
            )));
        }
        membership.status = MembershipStatus::Approved;
        membership.approved_at = Some(Utc::now());
        membership.approved_by = Some(approved_by.to_owned());

        Ok(membership.clone())
    }

    async fn reject_pending(&self, id: i64, reason: &str) -> Result<Membership, AuthError> {
        let mut memberships = self
            .memberships
            .write()
            .map_err(|_| AuthError::Unavailable("lock poisoned".into()))?;

        let membership = memberships.get_mut(&id).ok_or(AuthError::NotFound)?;
        if !membership.is_pending() {
            return Err(AuthError::Conflict(format!(
                "membership {} is already {}",
                id, membership.status
            )));
        }
        membership.status = MembershipStatus::Rejected;
        membership.rejected_at = Some(Utc::now());
        membership.rejection_reason = Some(reason.to_owned());

        Ok(membership.clone())
    }
}

/// Provisioner backed by a [`MockRoleRepository`], creating real role
/// rows from configurable blueprints.
///
/// Unlike [`TemplateRoleProvisioner`](crate::provision::TemplateRoleProvisioner),
/// it does not enforce the at-least-one-admin guarantee, so lifecycle
/// defenses against a misbehaving provisioner can be exercised.
#[derive(Clone)]
pub struct MockRoleProvisioner {
    role_repo: MockRoleRepository,
    blueprints: Vec<(String, bool)>,
}

impl MockRoleProvisioner {
    /// Provisions the standard pair: an admin role and a member role.
    pub fn new(role_repo: MockRoleRepository) -> Self {
        Self::with_blueprints(
            role_repo,
            &[("Administrator", true), ("Member", false)],
        )
    }

    /// Provisions one role per `(name, is_admin)` blueprint.
    pub fn with_blueprints(role_repo: MockRoleRepository, blueprints: &[(&str, bool)]) -> Self {
        Self {
            role_repo,
            blueprints: blueprints
                .iter()
                .map(|(name, is_admin)| ((*name).to_owned(), *is_admin))
                .collect(),
        }
    }
}

#[async_trait]
impl RoleProvisioner for MockRoleProvisioner {
    async fn provision_roles(&self, team_id: i64) -> Result<Vec<Role>, AuthError> {
        let mut roles = Vec::with_capacity(self.blueprints.len());
        for (name, is_admin) in &self.blueprints {
            let role = self
                .role_repo
                .create(CreateRole {
                    team_id: Some(team_id),
                    name: name.clone(),
                    is_admin: *is_admin,
                })
                .await?;
            roles.push(role);
        }
        Ok(roles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn membership_data(team_id: i64, user_id: &str) -> CreateMembership {
        CreateMembership {
            team_id,
            user_id: user_id.to_owned(),
            requested_role_id: None,
        }
    }

    #[tokio::test]
    async fn test_user_email_unique_case_insensitive() {
        let repo = MockUserRepository::new();
        repo.create(CreateUser {
            id: "user-1".to_owned(),
            email: "Founder@Example.com".to_owned(),
            is_master_admin: false,
            team_id: Some(1),
            role_id: Some(1),
        })
        .await
        .unwrap();

        let err = repo
            .create(CreateUser {
                id: "user-2".to_owned(),
                email: "founder@example.com".to_owned(),
                is_master_admin: false,
                team_id: Some(1),
                role_id: Some(1),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Conflict(_)));

        let found = repo.find_by_email("FOUNDER@EXAMPLE.COM").await.unwrap();
        assert_eq!(found.unwrap().id, "user-1");
    }

    #[tokio::test]
    async fn test_assign_role_unknown_user() {
        let repo = MockUserRepository::new();
        let err = repo.assign_role("ghost", 1).await.unwrap_err();
        assert_eq!(err, AuthError::UserNotFound);
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let repo = MockTeamRepository::new();
        let clone = repo.clone();
        let team = repo
            .create(CreateTeam {
                name: "Acme".to_owned(),
            })
            .await
            .unwrap();

        let found = clone.find_by_id(team.id).await.unwrap();
        assert_eq!(found.unwrap().name, "Acme");
    }

    #[tokio::test]
    async fn test_pending_membership_unique_per_team_and_user() {
        let repo = MockMembershipRepository::new();
        repo.create_pending(membership_data(1, "user-1")).await.unwrap();

        let err = repo
            .create_pending(membership_data(1, "user-1"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Conflict(_)));

        // a different team is fine
        assert!(repo.create_pending(membership_data(2, "user-1")).await.is_ok());
    }

    #[tokio::test]
    async fn test_new_pending_allowed_after_terminal_row() {
        let repo = MockMembershipRepository::new();
        let first = repo.create_pending(membership_data(1, "user-1")).await.unwrap();
        repo.reject_pending(first.id, "not yet").await.unwrap();

        // terminal rows do not block a fresh request
        let second = repo.create_pending(membership_data(1, "user-1")).await.unwrap();
        assert_ne!(first.id, second.id);
        assert!(second.is_pending());
    }

    #[tokio::test]
    async fn test_approve_pending_is_conditional() {
        let repo = MockMembershipRepository::new();
        let membership = repo.create_pending(membership_data(1, "user-1")).await.unwrap();

        let approved = repo.approve_pending(membership.id, "admin-1").await.unwrap();
        assert!(approved.is_approved());
        assert_eq!(approved.approved_by.as_deref(), Some("admin-1"));

        let err = repo.approve_pending(membership.id, "admin-2").await.unwrap_err();
        assert!(matches!(err, AuthError::Conflict(_)));
        assert!(err.to_string().contains("already approved"));

        // the original audit metadata survives the failed second attempt
        let stored = repo.find_by_id(membership.id).await.unwrap().unwrap();
        assert_eq!(stored.approved_by.as_deref(), Some("admin-1"));
        assert_eq!(stored.approved_at, approved.approved_at);
    }

    #[tokio::test]
    async fn test_reject_after_approve_conflicts() {
        let repo = MockMembershipRepository::new();
        let membership = repo.create_pending(membership_data(1, "user-1")).await.unwrap();
        repo.approve_pending(membership.id, "admin-1").await.unwrap();

        let err = repo
            .reject_pending(membership.id, "changed our minds")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_transition_unknown_membership_not_found() {
        let repo = MockMembershipRepository::new();
        assert_eq!(
            repo.approve_pending(99, "admin-1").await.unwrap_err(),
            AuthError::NotFound
        );
        assert_eq!(
            repo.reject_pending(99, "nope").await.unwrap_err(),
            AuthError::NotFound
        );
    }

    #[tokio::test]
    async fn test_replace_for_role_is_atomic() {
        let repo = MockPermissionRepository::new();
        let read = repo
            .create(CreatePermission {
                key: "candidates.read".to_owned(),
                name: "Read candidates".to_owned(),
                module: "candidates".to_owned(),
            })
            .await
            .unwrap();
        let write = repo
            .create(CreatePermission {
                key: "candidates.write".to_owned(),
                name: "Write candidates".to_owned(),
                module: "candidates".to_owned(),
            })
            .await
            .unwrap();

        repo.replace_for_role(1, &[read.id]).await.unwrap();

        // a replace containing an unknown id fails without downgrading
        // the existing grants
        let err = repo.replace_for_role(1, &[write.id, 999]).await.unwrap_err();
        assert_eq!(err, AuthError::NotFound);
        let granted = repo.find_by_role(1).await.unwrap();
        assert_eq!(granted.len(), 1);
        assert_eq!(granted[0].key, "candidates.read");

        repo.replace_for_role(1, &[read.id, write.id]).await.unwrap();
        assert_eq!(repo.find_by_role(1).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_grant_is_idempotent() {
        let repo = MockPermissionRepository::new();
        let perm = repo
            .create(CreatePermission {
                key: "jobs.read".to_owned(),
                name: "Read jobs".to_owned(),
                module: "jobs".to_owned(),
            })
            .await
            .unwrap();

        repo.grant_to_role(1, perm.id).await.unwrap();
        repo.grant_to_role(1, perm.id).await.unwrap();
        assert_eq!(repo.find_by_role(1).await.unwrap().len(), 1);

        assert_eq!(
            repo.grant_to_role(1, 999).await.unwrap_err(),
            AuthError::NotFound
        );
    }

    #[tokio::test]
    async fn test_mock_provisioner_creates_real_rows() {
        let role_repo = MockRoleRepository::new();
        let provisioner = MockRoleProvisioner::new(role_repo.clone());

        let roles = provisioner.provision_roles(7).await.unwrap();
        assert_eq!(roles.len(), 2);
        assert!(roles.iter().any(|r| r.is_admin));

        let stored = role_repo.find_by_team(7).await.unwrap();
        assert_eq!(stored.len(), 2);
    }
}

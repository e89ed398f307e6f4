//! Core domain types for team membership and authorization.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::AuthError;

/// A principal known to the system.
///
/// `team_id` and `role_id` are denormalized pointers to the currently
/// effective team and role, used for data-access filtering. The approval
/// workflow itself lives on [`Membership`] rows; the two are reconciled
/// only by the lifecycle actions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Opaque identifier assigned by the external identity provider.
    pub id: String,
    /// Unique across the system, compared case-insensitively.
    pub email: String,
    /// Master admins belong to no team and bypass every permission check.
    pub is_master_admin: bool,
    pub team_id: Option<i64>,
    pub role_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(any(test, feature = "mocks"))]
impl User {
    /// Returns a team user fixture for tests.
    pub fn mock() -> Self {
        let now = Utc::now();
        Self {
            id: "user-1".to_owned(),
            email: "user@example.com".to_owned(),
            is_master_admin: false,
            team_id: Some(1),
            role_id: Some(1),
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns a master admin fixture for tests.
    pub fn mock_master_admin() -> Self {
        let now = Utc::now();
        Self {
            id: "master-1".to_owned(),
            email: "master@example.com".to_owned(),
            is_master_admin: true,
            team_id: None,
            role_id: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A tenant. All business data is scoped to exactly one team.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A named permission bundle scoped to one team, or to no team for the
/// provisioning templates that seed new teams.
///
/// A team's "local admin" role is any role with `is_admin = true`.
/// Provisioning is expected to create exactly one, but callers tolerate
/// multiples (the first match wins).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Role {
    pub id: i64,
    /// `None` marks a provisioning template, never assigned to a user.
    pub team_id: Option<i64>,
    pub name: String,
    /// Grants a full permission bypass within the role's team.
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Role {
    /// Returns true for provisioning templates (`team_id` unset).
    pub fn is_template(&self) -> bool {
        self.team_id.is_none()
    }
}

/// A system-wide permission catalog entry. Not tenant-scoped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Permission {
    pub id: i64,
    /// Stable key checked by callers, e.g. `"candidates.read"`.
    pub key: String,
    /// Human-readable name for admin screens.
    pub name: String,
    /// Module grouping, e.g. `"candidates"`.
    pub module: String,
}

/// Approval workflow state of a [`Membership`].
///
/// `Approved` and `Rejected` are terminal. The only legal transitions are
/// `Pending -> Approved` and `Pending -> Rejected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MembershipStatus {
    Pending,
    Approved,
    Rejected,
}

impl MembershipStatus {
    /// Returns the stored string form of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    /// Parses a stored status string. Returns `None` for unknown values.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }

    /// Returns true for `Approved` and `Rejected`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Approved | Self::Rejected)
    }
}

impl TryFrom<&str> for MembershipStatus {
    type Error = AuthError;

    /// Storage boundary conversion. An unrecognized stored value is a
    /// data-integrity failure, not a parse hint.
    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Self::parse(s).ok_or_else(|| {
            AuthError::InvalidMembershipState("Invalid membership status".to_owned())
        })
    }
}

impl std::fmt::Display for MembershipStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user's relationship to a team, tracking the approval workflow.
///
/// Distinct from the denormalized `User.team_id`/`User.role_id` pointers:
/// the membership row records how (and whether) the user got in, with
/// audit metadata that is written once and never overwritten.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Membership {
    pub id: i64,
    pub team_id: i64,
    pub user_id: String,
    pub status: MembershipStatus,
    /// Role the requester asked for. Advisory only, never auto-applied.
    pub requested_role_id: Option<i64>,
    pub requested_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
    /// Approving admin, or the user themself for team founders.
    pub approved_by: Option<String>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
}

impl Membership {
    pub fn is_pending(&self) -> bool {
        self.status == MembershipStatus::Pending
    }

    pub fn is_approved(&self) -> bool {
        self.status == MembershipStatus::Approved
    }

    pub fn is_rejected(&self) -> bool {
        self.status == MembershipStatus::Rejected
    }
}

/// Tagged summary of a user's membership rows, consumed by the access
/// guards instead of loosely-shaped optional fields.
///
/// Precedence when a user has several rows: any approved row wins (with
/// the full set of approved team ids), then a pending row, then the most
/// recently rejected row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MembershipView {
    /// No membership rows at all.
    NoMembership,
    /// A join request is awaiting review.
    Pending { team_id: i64 },
    /// Approved for every team in the set. More than one entry only
    /// occurs for principals inspected by master-admin tooling.
    Approved { team_ids: HashSet<i64> },
    /// Most recent membership was rejected; the user is parked.
    Rejected { team_id: i64 },
}

impl MembershipView {
    /// Derives the view from a user's membership rows.
    pub fn from_memberships(memberships: &[Membership]) -> Self {
        let approved: HashSet<i64> = memberships
            .iter()
            .filter(|m| m.is_approved())
            .map(|m| m.team_id)
            .collect();
        if !approved.is_empty() {
            return Self::Approved { team_ids: approved };
        }

        if let Some(pending) = memberships.iter().find(|m| m.is_pending()) {
            return Self::Pending {
                team_id: pending.team_id,
            };
        }

        if let Some(rejected) = memberships
            .iter()
            .filter(|m| m.is_rejected())
            .max_by_key(|m| m.rejected_at)
        {
            return Self::Rejected {
                team_id: rejected.team_id,
            };
        }

        Self::NoMembership
    }

    /// Returns true when the view holds an approval for `team_id`.
    pub fn is_approved_for(&self, team_id: i64) -> bool {
        match self {
            Self::Approved { team_ids } => team_ids.contains(&team_id),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn membership(status: MembershipStatus, team_id: i64) -> Membership {
        let now = Utc::now();
        Membership {
            id: 1,
            team_id,
            user_id: "user-1".to_owned(),
            status,
            requested_role_id: None,
            requested_at: now,
            approved_at: (status == MembershipStatus::Approved).then_some(now),
            approved_by: (status == MembershipStatus::Approved)
                .then(|| "admin-1".to_owned()),
            rejected_at: (status == MembershipStatus::Rejected).then_some(now),
            rejection_reason: (status == MembershipStatus::Rejected)
                .then(|| "not a fit".to_owned()),
        }
    }

    #[test]
    fn test_status_round_trip() {
        for status in [
            MembershipStatus::Pending,
            MembershipStatus::Approved,
            MembershipStatus::Rejected,
        ] {
            assert_eq!(MembershipStatus::parse(status.as_str()), Some(status));
        }
    }

    #[test]
    fn test_status_parse_unknown() {
        assert_eq!(MembershipStatus::parse("cancelled"), None);
        assert_eq!(MembershipStatus::parse(""), None);
        assert_eq!(MembershipStatus::parse("Pending"), None);
    }

    #[test]
    fn test_status_try_from_unknown_is_invalid_state() {
        let err = MembershipStatus::try_from("cancelled").unwrap_err();
        assert_eq!(
            err,
            AuthError::InvalidMembershipState("Invalid membership status".to_owned())
        );
        assert!(err.to_string().contains("Invalid membership status"));
    }

    #[test]
    fn test_status_terminal() {
        assert!(!MembershipStatus::Pending.is_terminal());
        assert!(MembershipStatus::Approved.is_terminal());
        assert!(MembershipStatus::Rejected.is_terminal());
    }

    #[test]
    fn test_status_serde_lowercase() {
        let json = serde_json::to_string(&MembershipStatus::Approved).unwrap();
        assert_eq!(json, "\"approved\"");
        let back: MembershipStatus = serde_json::from_str("\"pending\"").unwrap();
        assert_eq!(back, MembershipStatus::Pending);
    }

    #[test]
    fn test_membership_helpers() {
        assert!(membership(MembershipStatus::Pending, 1).is_pending());
        assert!(membership(MembershipStatus::Approved, 1).is_approved());
        assert!(membership(MembershipStatus::Rejected, 1).is_rejected());
        assert!(!membership(MembershipStatus::Rejected, 1).is_pending());
    }

    #[test]
    fn test_view_empty() {
        assert_eq!(
            MembershipView::from_memberships(&[]),
            MembershipView::NoMembership
        );
    }

    #[test]
    fn test_view_pending() {
        let view = MembershipView::from_memberships(&[membership(
            MembershipStatus::Pending,
            7,
        )]);
        assert_eq!(view, MembershipView::Pending { team_id: 7 });
    }

    #[test]
    fn test_view_approved_wins_over_pending() {
        let rows = [
            membership(MembershipStatus::Pending, 2),
            membership(MembershipStatus::Approved, 1),
        ];
        let view = MembershipView::from_memberships(&rows);
        assert_eq!(
            view,
            MembershipView::Approved {
                team_ids: HashSet::from([1]),
            }
        );
        assert!(view.is_approved_for(1));
        assert!(!view.is_approved_for(2));
    }

    #[test]
    fn test_view_collects_all_approved_teams() {
        let rows = [
            membership(MembershipStatus::Approved, 1),
            membership(MembershipStatus::Approved, 3),
        ];
        let view = MembershipView::from_memberships(&rows);
        assert_eq!(
            view,
            MembershipView::Approved {
                team_ids: HashSet::from([1, 3]),
            }
        );
    }

    #[test]
    fn test_view_pending_wins_over_rejected() {
        let rows = [
            membership(MembershipStatus::Rejected, 1),
            membership(MembershipStatus::Pending, 2),
        ];
        assert_eq!(
            MembershipView::from_memberships(&rows),
            MembershipView::Pending { team_id: 2 }
        );
    }

    #[test]
    fn test_view_latest_rejection_wins() {
        let mut first = membership(MembershipStatus::Rejected, 1);
        first.rejected_at = Some(Utc::now() - chrono::Duration::days(2));
        let second = membership(MembershipStatus::Rejected, 4);
        assert_eq!(
            MembershipView::from_memberships(&[first, second]),
            MembershipView::Rejected { team_id: 4 }
        );
    }

    #[test]
    fn test_membership_serde_round_trip() {
        let row = membership(MembershipStatus::Approved, 1);
        let json = serde_json::to_string(&row).unwrap();
        let back: Membership = serde_json::from_str(&json).unwrap();
        assert_eq!(row, back);
    }
}

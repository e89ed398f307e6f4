//! Structural invariant guards over user and membership records.
//!
//! Pure functions with no I/O. Call them immediately after any write that
//! produces a [`User`] or [`Membership`], and before trusting
//! externally-supplied records. A failure here means a bug or tampering,
//! not a recoverable condition; callers treat any error as a hard stop.

use crate::types::{Membership, MembershipStatus, MembershipView, User};
use crate::AuthError;

/// Checks the consistency of a user's denormalized team/role pointers.
///
/// Rules:
/// - a master admin must have neither `team_id` nor `role_id` set;
/// - a team user must always have `team_id` set;
/// - a team user must have `role_id` set.
///
/// The last rule intentionally rejects the pending-user shape (team set,
/// role null). Callers that expect a pending user must not run this guard
/// on them and should use [`validate_pending_user_access`] for the access
/// decision instead.
///
/// # Errors
///
/// `AuthError::InvalidUserState` naming the offending field(s).
pub fn validate_user_team_consistency(user: &User) -> Result<(), AuthError> {
    if user.is_master_admin {
        return match (user.team_id, user.role_id) {
            (None, None) => Ok(()),
            (Some(_), Some(_)) => Err(AuthError::InvalidUserState(
                "Master admin must not belong to a team (team_id and role_id are set)"
                    .to_owned(),
            )),
            (Some(_), None) => Err(AuthError::InvalidUserState(
                "Master admin must not belong to a team (team_id is set)".to_owned(),
            )),
            (None, Some(_)) => Err(AuthError::InvalidUserState(
                "Master admin must not hold a role (role_id is set)".to_owned(),
            )),
        };
    }

    if user.team_id.is_none() {
        return Err(AuthError::InvalidUserState(
            "Team user must have a team (team_id is null)".to_owned(),
        ));
    }

    if user.role_id.is_none() {
        return Err(AuthError::InvalidUserState(
            "Team user must have a role (role_id is null)".to_owned(),
        ));
    }

    Ok(())
}

/// Checks that a membership's audit metadata matches its status.
///
/// An approved row needs `approved_at` and `approved_by`; a rejected row
/// needs `rejected_at`; a pending row must carry no approval or rejection
/// metadata at all. Metadata from the opposite transition is rejected on
/// terminal rows so the original audit trail can never be ambiguous.
///
/// # Errors
///
/// `AuthError::InvalidMembershipState` describing the mismatch.
pub fn validate_membership_state(membership: &Membership) -> Result<(), AuthError> {
    match membership.status {
        MembershipStatus::Approved => {
            if membership.approved_at.is_none() || membership.approved_by.is_none() {
                return Err(AuthError::InvalidMembershipState(
                    "Approved membership missing approval metadata".to_owned(),
                ));
            }
            if membership.rejected_at.is_some() || membership.rejection_reason.is_some() {
                return Err(AuthError::InvalidMembershipState(
                    "Approved membership carries rejection metadata".to_owned(),
                ));
            }
            Ok(())
        }
        MembershipStatus::Rejected => {
            if membership.rejected_at.is_none() {
                return Err(AuthError::InvalidMembershipState(
                    "Rejected membership missing rejection timestamp".to_owned(),
                ));
            }
            if membership.approved_at.is_some() || membership.approved_by.is_some() {
                return Err(AuthError::InvalidMembershipState(
                    "Rejected membership carries approval metadata".to_owned(),
                ));
            }
            Ok(())
        }
        MembershipStatus::Pending => {
            if membership.approved_at.is_some()
                || membership.approved_by.is_some()
                || membership.rejected_at.is_some()
                || membership.rejection_reason.is_some()
            {
                return Err(AuthError::InvalidMembershipState(
                    "Pending membership carries approval or rejection metadata".to_owned(),
                ));
            }
            Ok(())
        }
    }
}

/// Denies access to a named resource while a join request is pending.
///
/// Only the [`MembershipView::Pending`] variant is blocked. Approved,
/// rejected and absent memberships pass: this guard answers "is this user
/// parked behind a pending request", not "is this user approved" (that is
/// [`validate_approved_user_access`]).
///
/// # Errors
///
/// `AuthError::AccessDenied` naming the resource.
pub fn validate_pending_user_access(
    view: &MembershipView,
    resource: &str,
) -> Result<(), AuthError> {
    match view {
        MembershipView::Pending { .. } => Err(AuthError::AccessDenied(format!(
            "User has pending membership, cannot access {resource}"
        ))),
        _ => Ok(()),
    }
}

/// Requires an approved membership for the given team.
///
/// Passes only when the view is [`MembershipView::Approved`] and contains
/// `team_id`. Every other variant is denied, including an approved view
/// for different teams.
///
/// # Errors
///
/// `AuthError::AccessDenied` naming the team.
pub fn validate_approved_user_access(
    view: &MembershipView,
    team_id: i64,
) -> Result<(), AuthError> {
    if view.is_approved_for(team_id) {
        Ok(())
    } else {
        Err(AuthError::AccessDenied(format!(
            "User not approved for team {team_id}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use chrono::Utc;

    use super::*;

    fn team_user(team_id: Option<i64>, role_id: Option<i64>) -> User {
        User {
            team_id,
            role_id,
            ..User::mock()
        }
    }

    fn master_admin(team_id: Option<i64>, role_id: Option<i64>) -> User {
        User {
            team_id,
            role_id,
            ..User::mock_master_admin()
        }
    }

    fn pending_membership() -> Membership {
        Membership {
            id: 1,
            team_id: 1,
            user_id: "user-1".to_owned(),
            status: MembershipStatus::Pending,
            requested_role_id: None,
            requested_at: Utc::now(),
            approved_at: None,
            approved_by: None,
            rejected_at: None,
            rejection_reason: None,
        }
    }

    fn approved_membership() -> Membership {
        Membership {
            status: MembershipStatus::Approved,
            approved_at: Some(Utc::now()),
            approved_by: Some("admin-1".to_owned()),
            ..pending_membership()
        }
    }

    fn rejected_membership() -> Membership {
        Membership {
            status: MembershipStatus::Rejected,
            rejected_at: Some(Utc::now()),
            rejection_reason: Some("no open seats".to_owned()),
            ..pending_membership()
        }
    }

    #[test]
    fn test_master_admin_clean_shape_passes() {
        assert!(validate_user_team_consistency(&master_admin(None, None)).is_ok());
    }

    #[test]
    fn test_master_admin_with_team_and_role_rejected() {
        let err =
            validate_user_team_consistency(&master_admin(Some(1), Some(2))).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("team_id"), "message names team_id: {msg}");
        assert!(msg.contains("role_id"), "message names role_id: {msg}");
    }

    #[test]
    fn test_master_admin_with_team_only_rejected() {
        let err = validate_user_team_consistency(&master_admin(Some(1), None)).unwrap_err();
        assert!(matches!(err, AuthError::InvalidUserState(_)));
        assert!(err.to_string().contains("team_id is set"));
    }

    #[test]
    fn test_master_admin_with_role_only_rejected() {
        let err = validate_user_team_consistency(&master_admin(None, Some(2))).unwrap_err();
        assert!(matches!(err, AuthError::InvalidUserState(_)));
        assert!(err.to_string().contains("role_id is set"));
    }

    #[test]
    fn test_team_user_full_shape_passes() {
        assert!(validate_user_team_consistency(&team_user(Some(1), Some(2))).is_ok());
    }

    #[test]
    fn test_team_user_without_team_rejected() {
        let err = validate_user_team_consistency(&team_user(None, Some(2))).unwrap_err();
        assert!(matches!(err, AuthError::InvalidUserState(_)));
        assert!(err.to_string().contains("team_id is null"));
    }

    #[test]
    fn test_team_user_without_anything_rejected() {
        let err = validate_user_team_consistency(&team_user(None, None)).unwrap_err();
        assert!(err.to_string().contains("team_id is null"));
    }

    #[test]
    fn test_pending_shape_rejected_by_consistency_guard() {
        // team set, role null: valid only while pending, and this guard
        // does not know about memberships.
        let err = validate_user_team_consistency(&team_user(Some(1), None)).unwrap_err();
        assert!(matches!(err, AuthError::InvalidUserState(_)));
        assert!(err.to_string().contains("role_id is null"));
    }

    #[test]
    fn test_membership_state_happy_paths() {
        assert!(validate_membership_state(&pending_membership()).is_ok());
        assert!(validate_membership_state(&approved_membership()).is_ok());
        assert!(validate_membership_state(&rejected_membership()).is_ok());
    }

    #[test]
    fn test_approved_without_timestamp_rejected() {
        let membership = Membership {
            approved_at: None,
            ..approved_membership()
        };
        let err = validate_membership_state(&membership).unwrap_err();
        assert_eq!(
            err,
            AuthError::InvalidMembershipState(
                "Approved membership missing approval metadata".to_owned()
            )
        );
    }

    #[test]
    fn test_approved_without_approver_rejected() {
        let membership = Membership {
            approved_by: None,
            ..approved_membership()
        };
        let err = validate_membership_state(&membership).unwrap_err();
        assert!(err.to_string().contains("missing approval metadata"));
    }

    #[test]
    fn test_approved_with_rejection_metadata_rejected() {
        let membership = Membership {
            rejected_at: Some(Utc::now()),
            ..approved_membership()
        };
        let err = validate_membership_state(&membership).unwrap_err();
        assert!(err.to_string().contains("carries rejection metadata"));
    }

    #[test]
    fn test_rejected_without_timestamp_rejected() {
        let membership = Membership {
            rejected_at: None,
            ..rejected_membership()
        };
        let err = validate_membership_state(&membership).unwrap_err();
        assert_eq!(
            err,
            AuthError::InvalidMembershipState(
                "Rejected membership missing rejection timestamp".to_owned()
            )
        );
    }

    #[test]
    fn test_rejected_without_reason_passes() {
        // only the timestamp is mandatory for a rejection
        let membership = Membership {
            rejection_reason: None,
            ..rejected_membership()
        };
        assert!(validate_membership_state(&membership).is_ok());
    }

    #[test]
    fn test_rejected_with_approval_metadata_rejected() {
        let membership = Membership {
            approved_at: Some(Utc::now()),
            approved_by: Some("admin-1".to_owned()),
            ..rejected_membership()
        };
        let err = validate_membership_state(&membership).unwrap_err();
        assert!(err.to_string().contains("carries approval metadata"));
    }

    #[test]
    fn test_pending_with_metadata_rejected() {
        let membership = Membership {
            approved_at: Some(Utc::now()),
            ..pending_membership()
        };
        let err = validate_membership_state(&membership).unwrap_err();
        assert!(matches!(err, AuthError::InvalidMembershipState(_)));
    }

    #[test]
    fn test_pending_access_denied_names_resource() {
        let view = MembershipView::Pending { team_id: 1 };
        let err = validate_pending_user_access(&view, "vendors").unwrap_err();
        assert!(matches!(err, AuthError::AccessDenied(_)));
        assert!(err.to_string().contains("vendors"));
    }

    #[test]
    fn test_pending_access_allows_everything_else() {
        let approved = MembershipView::Approved {
            team_ids: HashSet::from([1]),
        };
        assert!(validate_pending_user_access(&approved, "vendors").is_ok());
        assert!(
            validate_pending_user_access(&MembershipView::Rejected { team_id: 1 }, "vendors")
                .is_ok()
        );
        assert!(validate_pending_user_access(&MembershipView::NoMembership, "vendors").is_ok());
    }

    #[test]
    fn test_approved_access_requires_membership_in_team() {
        let view = MembershipView::Approved {
            team_ids: HashSet::from([1, 3]),
        };
        assert!(validate_approved_user_access(&view, 1).is_ok());
        assert!(validate_approved_user_access(&view, 3).is_ok());

        let err = validate_approved_user_access(&view, 2).unwrap_err();
        assert!(matches!(err, AuthError::AccessDenied(_)));
        assert!(err.to_string().contains('2'));
    }

    #[test]
    fn test_approved_access_denies_other_variants() {
        for view in [
            MembershipView::NoMembership,
            MembershipView::Pending { team_id: 5 },
            MembershipView::Rejected { team_id: 5 },
            MembershipView::Approved {
                team_ids: HashSet::new(),
            },
        ] {
            let err = validate_approved_user_access(&view, 5).unwrap_err();
            assert!(err.to_string().contains("not approved for team 5"));
        }
    }
}

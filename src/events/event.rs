use chrono::{DateTime, Utc};

/// Membership lifecycle events emitted by the actions.
///
/// Events are always fired from actions. If no listeners are registered,
/// they are silently ignored (no-op). Register listeners via
/// [`register_event_listeners`](crate::register_event_listeners) to handle events.
#[derive(Debug, Clone)]
pub enum MembershipEvent {
    /// A team was created with its founding local admin.
    TeamCreated {
        team_id: i64,
        team_name: String,
        user_id: String,
        at: DateTime<Utc>,
    },

    /// A user requested to join a team; the membership is pending.
    JoinRequested {
        membership_id: i64,
        team_id: i64,
        user_id: String,
        at: DateTime<Utc>,
    },

    /// A pending membership was approved and a role assigned.
    MembershipApproved {
        membership_id: i64,
        team_id: i64,
        user_id: String,
        approved_by: String,
        role_id: i64,
        at: DateTime<Utc>,
    },

    /// A pending membership was rejected.
    MembershipRejected {
        membership_id: i64,
        team_id: i64,
        user_id: String,
        rejected_by: String,
        at: DateTime<Utc>,
    },
}

impl MembershipEvent {
    /// Returns a dot-separated event name for logging/tracing.
    pub fn name(&self) -> &'static str {
        match self {
            Self::TeamCreated { .. } => "team.created",
            Self::JoinRequested { .. } => "membership.join_requested",
            Self::MembershipApproved { .. } => "membership.approved",
            Self::MembershipRejected { .. } => "membership.rejected",
        }
    }

    /// Returns the timestamp when this event occurred.
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::TeamCreated { at, .. }
            | Self::JoinRequested { at, .. }
            | Self::MembershipApproved { at, .. }
            | Self::MembershipRejected { at, .. } => *at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names() {
        let now = Utc::now();

        assert_eq!(
            MembershipEvent::TeamCreated {
                team_id: 1,
                team_name: "Acme".to_owned(),
                user_id: "user-1".to_owned(),
                at: now
            }
            .name(),
            "team.created"
        );

        assert_eq!(
            MembershipEvent::JoinRequested {
                membership_id: 1,
                team_id: 1,
                user_id: "user-2".to_owned(),
                at: now
            }
            .name(),
            "membership.join_requested"
        );

        assert_eq!(
            MembershipEvent::MembershipApproved {
                membership_id: 1,
                team_id: 1,
                user_id: "user-2".to_owned(),
                approved_by: "user-1".to_owned(),
                role_id: 2,
                at: now
            }
            .name(),
            "membership.approved"
        );

        assert_eq!(
            MembershipEvent::MembershipRejected {
                membership_id: 1,
                team_id: 1,
                user_id: "user-2".to_owned(),
                rejected_by: "user-1".to_owned(),
                at: now
            }
            .name(),
            "membership.rejected"
        );
    }

    #[test]
    fn test_event_timestamp() {
        let now = Utc::now();

        let event = MembershipEvent::JoinRequested {
            membership_id: 1,
            team_id: 1,
            user_id: "user-2".to_owned(),
            at: now,
        };

        assert_eq!(event.timestamp(), now);
    }

    #[test]
    fn test_event_debug_carries_ids() {
        let event = MembershipEvent::MembershipRejected {
            membership_id: 9,
            team_id: 4,
            user_id: "user-2".to_owned(),
            rejected_by: "user-1".to_owned(),
            at: Utc::now(),
        };

        let debug_str = format!("{event:?}");
        assert!(debug_str.contains("MembershipRejected"));
        assert!(debug_str.contains("user-2"));
    }
}

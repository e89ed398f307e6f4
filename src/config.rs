//! Configuration for the membership subsystem.
//!
//! # Example
//!
//! ```rust
//! use roster::config::{MembershipConfig, RejoinPolicy};
//!
//! // Use defaults
//! let config = MembershipConfig::default();
//!
//! // Or customize
//! let config = MembershipConfig {
//!     rejoin_policy: RejoinPolicy::Deny,
//!     ..Default::default()
//! };
//! ```

/// How a join request from a previously rejected user is handled.
///
/// A membership row never leaves a terminal state; what this policy
/// controls is whether a NEW pending row may be opened for the same
/// (user, team) pair after a rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejoinPolicy {
    /// The user may request to join again; the rejected row stays behind
    /// as an audit record.
    NewRequest,
    /// Rejection is final for that user and team; a retry fails with
    /// `Conflict`.
    Deny,
}

/// Settings consumed by the lifecycle actions.
///
/// Use `MembershipConfig::default()` for sensible production defaults.
#[derive(Debug, Clone)]
pub struct MembershipConfig {
    /// Policy for join requests after a rejection.
    ///
    /// Default: [`RejoinPolicy::NewRequest`]
    pub rejoin_policy: RejoinPolicy,

    /// Maximum accepted team name length, in characters.
    ///
    /// Default: 100
    pub max_team_name_len: usize,

    /// Maximum accepted rejection reason length, in characters.
    ///
    /// Default: 500
    pub max_reason_len: usize,
}

impl Default for MembershipConfig {
    fn default() -> Self {
        Self {
            rejoin_policy: RejoinPolicy::NewRequest,
            max_team_name_len: 100,
            max_reason_len: 500,
        }
    }
}

impl MembershipConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a configuration with stricter settings.
    ///
    /// Rejections become final and input limits tighten.
    pub fn strict() -> Self {
        Self {
            rejoin_policy: RejoinPolicy::Deny,
            max_team_name_len: 60,
            max_reason_len: 200,
        }
    }
}

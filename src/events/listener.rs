use async_trait::async_trait;

use super::MembershipEvent;

/// Trait for handling membership events asynchronously.
///
/// Implement this trait to create custom event listeners. Listeners can
/// perform any async operation: logging, sending notifications, updating
/// metrics, etc.
///
/// # Example
///
/// ```rust,ignore
/// use roster::events::{Listener, MembershipEvent};
/// use async_trait::async_trait;
///
/// struct ReviewQueueListener {
///     inbox_url: String,
/// }
///
/// #[async_trait]
/// impl Listener for ReviewQueueListener {
///     async fn handle(&self, event: &MembershipEvent) {
///         if let MembershipEvent::JoinRequested { team_id, .. } = event {
///             // notify the team's admins about the pending request
///         }
///     }
/// }
/// ```
#[async_trait]
pub trait Listener: Send + Sync + 'static {
    /// Handle a membership event.
    ///
    /// This method is called for every event dispatched. Filter by matching
    /// on the event variant to handle specific events.
    async fn handle(&self, event: &MembershipEvent);
}

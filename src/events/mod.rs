//! Event system for membership lifecycle actions.
//!
//! Events are automatically fired from all lifecycle actions. If no
//! listeners are registered, they are silently ignored (zero overhead).
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use roster::register_event_listeners;
//! use roster::events::listeners::LoggingListener;
//!
//! fn main() {
//!     // register listeners at startup
//!     register_event_listeners(|registry| {
//!         registry.listen(LoggingListener::new());
//!     });
//!
//!     // events will now be logged
//! }
//! ```
//!
//! # Custom Listeners
//!
//! Implement the [`Listener`] trait to create custom event handlers:
//!
//! ```rust,ignore
//! use roster::events::{Listener, MembershipEvent};
//! use async_trait::async_trait;
//!
//! struct MetricsListener;
//!
//! #[async_trait]
//! impl Listener for MetricsListener {
//!     async fn handle(&self, event: &MembershipEvent) {
//!         match event {
//!             MembershipEvent::MembershipApproved { .. } => {
//!                 // increment approval counter
//!             }
//!             MembershipEvent::MembershipRejected { .. } => {
//!                 // increment rejection counter
//!             }
//!             _ => {}
//!         }
//!     }
//! }
//! ```

mod event;
mod listener;
mod registry;

pub mod listeners;

pub use event::MembershipEvent;
pub use listener::Listener;
pub use registry::{dispatch, register_event_listeners};

//! Trigger dispatching: payload assembly and preview/build notification.
//!
//! For every selected endpoint the dispatcher serializes the changed entity,
//! bundles related entities ahead of it, and decides which servers hear about
//! it:
//!
//! - Preview URLs are always notified (at `/__refresh`).
//! - Build URLs are notified only in `incremental` mode, and not for
//!   unpublished entities when the rule builds published content only.
//! - Deletes reach both preview and build URLs unconditionally.

mod dispatcher;
mod types;

pub use dispatcher::{DispatchOptions, TriggerDispatcher};
pub use types::{DispatchReport, DispatcherStats, DispatcherStatsSnapshot};

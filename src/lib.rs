//! uid-registry - a small access-control UID record service
//!
//! This crate stores unique identifiers with an expiration marker (or
//! permanent status) in a flat JSON file and provides:
//! - HTTP endpoints to add a UID and to query its remaining validity
//! - A background sweep that deletes expired UIDs each interval
//! - Fire-and-forget panel notifications on add and on sweep removal
//! - Whole-store locking around every load-modify-save sequence

pub mod config;
pub mod expiry;
pub mod notify;
pub mod server;
pub mod store;
pub mod sweep;

use std::sync::Arc;

use notify::Notifier;
use store::Store;

/// Shared application state
pub struct AppState {
    pub store: Store,
    pub notifier: Arc<dyn Notifier>,
}

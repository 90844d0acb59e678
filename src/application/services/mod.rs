//! Application services - Business logic orchestration

pub mod blacklist_service;
pub mod broadcast_service;

pub use blacklist_service::{BlacklistService, BLACKLIST_KEY};
pub use broadcast_service::{build_broadcast, select_broadcast_text};

//! Online-session tracking.
//!
//! # Invariants
//! - Session tokens are random and never written to the log.
//! - Expiry is driven by the caller's clock; nothing runs in the background.

pub mod user_registry;

pub use user_registry::{
    OnlineRegistryError, OnlineSortKey, OnlineUser, OnlineUserRegistry, SortDirection,
};

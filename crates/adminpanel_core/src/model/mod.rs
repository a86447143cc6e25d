//! Persisted domain records.
//!
//! # Invariants
//! - Every record is identified by a stable `EntityId` once saved.
//! - Column mapping lives next to each record's `Entity` impl.

pub mod menu;
pub mod role;
pub mod user;

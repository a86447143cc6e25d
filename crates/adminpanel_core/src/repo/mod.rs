//! Repository layer.
//!
//! # Responsibility
//! - Provide the generic, entity-parameterized data-access façade.
//! - Keep query execution behind the `Session` capability.
//!
//! # Invariants
//! - "Not found" is an absent/empty result, never an error.
//! - Pagination bounds are validated before any query runs.

pub mod repository;

pub use repository::{PageSpec, RepoError, RepoResult, Repository};

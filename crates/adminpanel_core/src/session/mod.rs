//! Session capability consumed by the generic repository.
//!
//! # Responsibility
//! - Build and execute ad-hoc queries with positional or named parameters.
//! - Load and mutate entities by identity.
//! - Provide the transaction boundary (read-only vs read-write).
//!
//! # Invariants
//! - A session borrows exactly one connection and is used by one unit of
//!   work at a time.
//! - One parameter binding style per query; mixing is rejected.
//! - Store errors are surfaced unchanged, never retried.

use crate::db::DbError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod entity;
mod params;
mod query;
mod sqlite;

pub use entity::{Entity, EntityId};
pub use params::{IntoParam, Params};
pub use query::{Query, QuerySpec};
pub use sqlite::SqliteSession;

use rusqlite::types::Value;

pub type PersistResult<T> = Result<T, PersistenceError>;

/// Store-level failure raised by a session.
#[derive(Debug)]
pub enum PersistenceError {
    /// Underlying SQLite failure: connectivity, constraint, malformed SQL.
    Db(DbError),
    /// Named parameter does not appear in the query string.
    UnknownParameter(String),
    /// Positional parameter count differs from the placeholders in the query.
    ParameterCount { expected: usize, actual: usize },
    /// Named and positional bindings were mixed on one query.
    MixedBinding,
    /// Scalar query did not yield exactly one single-column integer row.
    ScalarMismatch(String),
    /// Update/delete addressed an identity with no persisted row.
    StaleEntity {
        table: &'static str,
        id: EntityId,
    },
    /// Update/delete called on an entity that was never saved.
    MissingIdentity(&'static str),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Persisted row cannot be decoded into its entity.
    InvalidData(String),
}

impl PersistenceError {
    /// Returns whether the store rejected a write because of a constraint.
    pub fn is_constraint_violation(&self) -> bool {
        matches!(self, Self::Db(err) if err.is_constraint_violation())
    }
}

impl Display for PersistenceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::UnknownParameter(name) => write!(f, "query has no parameter named `{name}`"),
            Self::ParameterCount { expected, actual } => write!(
                f,
                "query expects {expected} positional parameters, got {actual}"
            ),
            Self::MixedBinding => {
                write!(f, "named and positional parameters cannot be mixed")
            }
            Self::ScalarMismatch(message) => write!(f, "scalar query mismatch: {message}"),
            Self::StaleEntity { table, id } => {
                write!(f, "no row in `{table}` for identity {id}")
            }
            Self::MissingIdentity(table) => {
                write!(f, "entity for `{table}` has no identity")
            }
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "session requires schema version {expected_version}, got {actual_version}"
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for PersistenceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for PersistenceError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for PersistenceError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Transaction flavor requested by a service-layer call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionMode {
    /// Writes are refused by the store for the duration of the transaction.
    ReadOnly,
    /// Takes the write lock up front.
    ReadWrite,
}

/// Unit-of-work handle over a relational store.
///
/// Query execution works on a prepared [`QuerySpec`]; callers normally go
/// through [`Session::create_query`] and the [`Query`] builder instead.
pub trait Session {
    /// Runs an entity-returning query.
    fn list<T: Entity>(&self, spec: &QuerySpec) -> PersistResult<Vec<T>>;

    /// Runs a query expected to return one single-column row.
    fn scalar(&self, spec: &QuerySpec) -> PersistResult<Value>;

    /// Runs a bulk update/delete and returns the affected row count.
    fn update_rows(&self, spec: &QuerySpec) -> PersistResult<usize>;

    /// Loads one entity by identity; `Ok(None)` when no row matches.
    fn get_by_id<T: Entity>(&self, id: EntityId) -> PersistResult<Option<T>>;

    /// Inserts `entity`, generating an identity when it has none.
    ///
    /// The identity is written back into `entity` only after the insert
    /// succeeds.
    fn save<T: Entity>(&self, entity: &mut T) -> PersistResult<EntityId>;

    /// Rewrites all mapped columns of a persisted entity.
    fn update<T: Entity>(&self, entity: &T) -> PersistResult<()>;

    /// Removes a persisted entity.
    fn delete<T: Entity>(&self, entity: &T) -> PersistResult<()>;

    /// Runs `work` inside one transaction: commit on `Ok`, rollback on `Err`.
    fn in_transaction<R, E, F>(&self, mode: TransactionMode, work: F) -> Result<R, E>
    where
        Self: Sized,
        E: From<PersistenceError>,
        F: FnOnce(&Self) -> Result<R, E>;

    /// Updates when `entity` carries an identity that is already stored,
    /// otherwise inserts (keeping a caller-supplied identity).
    fn save_or_update<T: Entity>(&self, entity: &mut T) -> PersistResult<EntityId> {
        match entity.id() {
            Some(id) if self.get_by_id::<T>(id)?.is_some() => {
                self.update(entity)?;
                Ok(id)
            }
            _ => self.save(entity),
        }
    }

    /// Starts building a query against this session.
    fn create_query(&self, sql: impl Into<String>) -> Query<'_, Self>
    where
        Self: Sized,
    {
        Query::new(self, sql)
    }
}

//! Generic repository over a [`Session`].
//!
//! # Responsibility
//! - Translate persistence operations into session calls for one entity type.
//! - Validate pagination bounds before touching the store.
//!
//! # Invariants
//! - Lookups that match nothing return `Ok(None)` / an empty list.
//! - Store errors propagate unchanged; nothing is retried.
//! - No state is kept between calls besides the borrowed session.

use crate::session::{Entity, EntityId, Params, PersistenceError, QuerySpec, Session};
use log::debug;
use rusqlite::types::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::marker::PhantomData;

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository failure.
#[derive(Debug)]
pub enum RepoError {
    /// Caller-supplied bounds are out of range.
    InvalidArgument(String),
    /// Store-level failure surfaced by the session.
    Persistence(PersistenceError),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidArgument(message) => write!(f, "invalid argument: {message}"),
            Self::Persistence(err) => write!(f, "{err}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidArgument(_) => None,
            Self::Persistence(err) => Some(err),
        }
    }
}

impl From<PersistenceError> for RepoError {
    fn from(value: PersistenceError) -> Self {
        Self::Persistence(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Persistence(value.into())
    }
}

/// One-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageSpec {
    page: u32,
    rows: u32,
}

impl PageSpec {
    /// Validates `page >= 1` and `rows >= 1`.
    pub fn new(page: u32, rows: u32) -> RepoResult<Self> {
        if page < 1 {
            return Err(RepoError::InvalidArgument(format!(
                "page must be >= 1, got {page}"
            )));
        }
        if rows < 1 {
            return Err(RepoError::InvalidArgument(format!(
                "rows must be >= 1, got {rows}"
            )));
        }
        Ok(Self { page, rows })
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    /// `(page - 1) * rows`.
    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.rows)
    }

    pub fn limit(&self) -> u64 {
        u64::from(self.rows)
    }
}

/// Data-access façade for entity type `T`.
pub struct Repository<'s, S: Session, T: Entity> {
    session: &'s S,
    _entity: PhantomData<fn() -> T>,
}

impl<'s, S: Session, T: Entity> Repository<'s, S, T> {
    pub fn new(session: &'s S) -> Self {
        Self {
            session,
            _entity: PhantomData,
        }
    }

    pub fn session(&self) -> &'s S {
        self.session
    }

    /// Inserts `entity` and returns its supplied or generated identity.
    pub fn save(&self, entity: &mut T) -> RepoResult<EntityId> {
        Ok(self.session.save(entity)?)
    }

    /// Looks up by identity; absent rows are `Ok(None)`.
    pub fn get(&self, id: EntityId) -> RepoResult<Option<T>> {
        Ok(self.session.get_by_id(id)?)
    }

    /// Returns the first row of [`Repository::find_with`].
    ///
    /// Extra rows are ignored; the order is whatever the query yields.
    pub fn get_by_query(&self, sql: &str, params: impl Into<Params>) -> RepoResult<Option<T>> {
        let mut rows = self.find_with(sql, params)?;
        if rows.len() > 1 {
            debug!(
                "event=repo_get_by_query module=repo status=ambiguous table={} rows={}",
                T::TABLE,
                rows.len()
            );
        }
        if rows.is_empty() {
            return Ok(None);
        }
        Ok(Some(rows.swap_remove(0)))
    }

    pub fn find(&self, sql: &str) -> RepoResult<Vec<T>> {
        self.find_with(sql, Params::None)
    }

    pub fn find_with(&self, sql: &str, params: impl Into<Params>) -> RepoResult<Vec<T>> {
        let spec = QuerySpec::new(sql).with_params(params.into());
        Ok(self.session.list(&spec)?)
    }

    /// Returns at most `rows` entities starting at `(page - 1) * rows`.
    ///
    /// # Errors
    /// - `InvalidArgument` when `page < 1` or `rows < 1`.
    pub fn find_page(
        &self,
        sql: &str,
        params: impl Into<Params>,
        page: u32,
        rows: u32,
    ) -> RepoResult<Vec<T>> {
        self.find_paged(sql, params, PageSpec::new(page, rows)?)
    }

    /// Same as [`Repository::find_page`] with pre-validated bounds.
    pub fn find_paged(
        &self,
        sql: &str,
        params: impl Into<Params>,
        page: PageSpec,
    ) -> RepoResult<Vec<T>> {
        let mut spec = QuerySpec::new(sql).with_params(params.into());
        spec.offset = Some(page.offset());
        spec.limit = Some(page.limit());
        Ok(self.session.list(&spec)?)
    }

    pub fn count(&self, sql: &str) -> RepoResult<i64> {
        self.count_with(sql, Params::None)
    }

    /// Runs a scalar query and returns its single integer value.
    ///
    /// A query beginning with `FROM` is counted as `SELECT COUNT(*) FROM ...`.
    pub fn count_with(&self, sql: &str, params: impl Into<Params>) -> RepoResult<i64> {
        let spec = QuerySpec::new(sql).with_params(params.into());
        match self.session.scalar(&spec)? {
            Value::Integer(count) => Ok(count),
            other => Err(PersistenceError::ScalarMismatch(format!(
                "expected integer count, got {}",
                other.data_type()
            ))
            .into()),
        }
    }

    pub fn update(&self, entity: &T) -> RepoResult<()> {
        Ok(self.session.update(entity)?)
    }

    pub fn delete(&self, entity: &T) -> RepoResult<()> {
        Ok(self.session.delete(entity)?)
    }

    /// Inserts when `entity` has no identity, otherwise updates.
    pub fn save_or_update(&self, entity: &mut T) -> RepoResult<EntityId> {
        Ok(self.session.save_or_update(entity)?)
    }

    pub fn execute_update(&self, sql: &str) -> RepoResult<usize> {
        self.execute_update_with(sql, Params::None)
    }

    /// Runs a bulk update/delete and returns the affected row count.
    pub fn execute_update_with(&self, sql: &str, params: impl Into<Params>) -> RepoResult<usize> {
        let spec = QuerySpec::new(sql).with_params(params.into());
        Ok(self.session.update_rows(&spec)?)
    }
}

#[cfg(test)]
mod tests {
    use super::{PageSpec, RepoError};

    #[test]
    fn page_spec_computes_offset_and_limit() {
        let page = PageSpec::new(3, 20).expect("valid page");
        assert_eq!(page.offset(), 40);
        assert_eq!(page.limit(), 20);

        let first = PageSpec::new(1, 7).expect("valid page");
        assert_eq!(first.offset(), 0);
    }

    #[test]
    fn page_spec_rejects_zero_bounds() {
        assert!(matches!(
            PageSpec::new(0, 10),
            Err(RepoError::InvalidArgument(_))
        ));
        assert!(matches!(
            PageSpec::new(1, 0),
            Err(RepoError::InvalidArgument(_))
        ));
    }

    #[test]
    fn page_spec_offset_does_not_overflow_u32() {
        let page = PageSpec::new(u32::MAX, u32::MAX).expect("valid page");
        assert_eq!(
            page.offset(),
            u64::from(u32::MAX - 1) * u64::from(u32::MAX)
        );
    }
}

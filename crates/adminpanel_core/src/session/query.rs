//! Query handle: SQL text, one parameter binding, optional window.
//!
//! # Invariants
//! - Named and positional bindings are never mixed on one query.
//! - `offset`/`limit` apply to row-returning executions only, around the
//!   caller's statement as a subquery.
//! - A query beginning with `FROM` selects the target entity's columns for
//!   list executions and `COUNT(*)` for count executions.

use super::entity::{select_list, Entity};
use super::{IntoParam, Params, PersistResult, PersistenceError, Session};
use rusqlite::types::Value;
use std::collections::BTreeMap;

/// Executable description of one query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuerySpec {
    pub sql: String,
    pub params: Params,
    pub offset: Option<u64>,
    pub limit: Option<u64>,
}

impl QuerySpec {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            ..Self::default()
        }
    }

    pub fn with_params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }

    /// SQL for an entity-returning execution, window applied.
    pub fn entity_sql<T: Entity>(&self) -> String {
        let base = statement_body(&self.sql);
        let sql = if starts_with_from(base) {
            format!("SELECT {} {base}", select_list::<T>())
        } else {
            base.to_string()
        };
        self.apply_window(sql)
    }

    /// SQL for a scalar execution, window applied.
    pub fn scalar_sql(&self) -> String {
        let base = statement_body(&self.sql);
        let sql = if starts_with_from(base) {
            format!("SELECT COUNT(*) {base}")
        } else {
            base.to_string()
        };
        self.apply_window(sql)
    }

    /// SQL for an update/delete execution; the window is not applied.
    pub fn update_sql(&self) -> String {
        statement_body(&self.sql).to_string()
    }

    /// Wraps the statement so the window survives trailing comments and the
    /// caller's own `LIMIT`. Bounds past `i64::MAX` are clamped.
    fn apply_window(&self, sql: String) -> String {
        if self.limit.is_none() && self.offset.is_none() {
            return sql;
        }
        let limit = self.limit.map_or(-1, clamp_to_i64);
        let offset = self.offset.map_or(0, clamp_to_i64);
        format!("SELECT * FROM (\n{sql}\n) LIMIT {limit} OFFSET {offset}")
    }
}

fn clamp_to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// Builder bound to a session; consumed by one of the `execute_*` calls.
pub struct Query<'s, S: Session> {
    session: &'s S,
    spec: QuerySpec,
}

impl<'s, S: Session> Query<'s, S> {
    pub(crate) fn new(session: &'s S, sql: impl Into<String>) -> Self {
        Self {
            session,
            spec: QuerySpec::new(sql),
        }
    }

    /// Binds `value` to the parameter called `name`.
    pub fn bind_named(
        mut self,
        name: impl Into<String>,
        value: impl IntoParam,
    ) -> PersistResult<Self> {
        if let Params::Positional(values) = &self.spec.params {
            if !values.is_empty() {
                return Err(PersistenceError::MixedBinding);
            }
        }
        if !matches!(self.spec.params, Params::Named(_)) {
            self.spec.params = Params::Named(BTreeMap::new());
        }
        if let Params::Named(map) = &mut self.spec.params {
            map.insert(name.into(), value.into_param());
        }
        Ok(self)
    }

    /// Binds `value` to the zero-based positional placeholder `index`.
    ///
    /// Unbound gaps below `index` are filled with `NULL`.
    pub fn bind_index(mut self, index: usize, value: impl IntoParam) -> PersistResult<Self> {
        if let Params::Named(map) = &self.spec.params {
            if !map.is_empty() {
                return Err(PersistenceError::MixedBinding);
            }
        }
        if !matches!(self.spec.params, Params::Positional(_)) {
            self.spec.params = Params::Positional(Vec::new());
        }
        if let Params::Positional(values) = &mut self.spec.params {
            if values.len() <= index {
                values.resize(index + 1, Value::Null);
            }
            values[index] = value.into_param();
        }
        Ok(self)
    }

    /// Replaces all bindings with `params`.
    pub fn bind_params(mut self, params: Params) -> Self {
        self.spec.params = params;
        self
    }

    pub fn set_offset(mut self, offset: u64) -> Self {
        self.spec.offset = Some(offset);
        self
    }

    pub fn set_limit(mut self, limit: u64) -> Self {
        self.spec.limit = Some(limit);
        self
    }

    pub fn spec(&self) -> &QuerySpec {
        &self.spec
    }

    pub fn execute_list<T: Entity>(&self) -> PersistResult<Vec<T>> {
        self.session.list(&self.spec)
    }

    pub fn execute_scalar(&self) -> PersistResult<Value> {
        self.session.scalar(&self.spec)
    }

    pub fn execute_update(&self) -> PersistResult<usize> {
        self.session.update_rows(&self.spec)
    }
}

fn statement_body(sql: &str) -> &str {
    sql.trim().trim_end_matches(';').trim_end()
}

fn starts_with_from(sql: &str) -> bool {
    match (sql.get(..4), sql.get(4..)) {
        (Some(head), Some(rest)) => {
            head.eq_ignore_ascii_case("from") && rest.starts_with(char::is_whitespace)
        }
        _ => false,
    }
}

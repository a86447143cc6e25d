//! SQLite-backed session.
//!
//! # Invariants
//! - CRUD SQL is generated only from `Entity` declarations.
//! - Positional arity is checked against the prepared statement.
//! - A rolled-back transaction never leaves `query_only` enabled.

use super::entity::{select_list, Entity, EntityId};
use super::{Params, PersistResult, PersistenceError, QuerySpec, Session, TransactionMode};
use crate::db::migrations::{current_user_version, latest_version};
use log::{debug, info, warn};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, Statement, Transaction, TransactionBehavior};
use uuid::Uuid;

/// Session over one borrowed SQLite connection.
pub struct SqliteSession<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteSession<'conn> {
    /// Wraps a connection without schema checks.
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    /// Wraps a connection that must be migrated to the latest schema.
    pub fn try_new(conn: &'conn Connection) -> PersistResult<Self> {
        let expected_version = latest_version();
        let actual_version = current_user_version(conn)?;
        if actual_version != expected_version {
            return Err(PersistenceError::UninitializedConnection {
                expected_version,
                actual_version,
            });
        }
        Ok(Self { conn })
    }

    pub fn connection(&self) -> &Connection {
        self.conn
    }
}

impl Session for SqliteSession<'_> {
    fn list<T: Entity>(&self, spec: &QuerySpec) -> PersistResult<Vec<T>> {
        let sql = spec.entity_sql::<T>();
        debug!(
            "event=repo_query module=session status=start kind=list table={}",
            T::TABLE
        );
        let mut stmt = prepare_bound(self.conn, &sql, &spec.params)?;
        let mut rows = stmt.raw_query();
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(T::from_row(row)?);
        }
        Ok(items)
    }

    fn scalar(&self, spec: &QuerySpec) -> PersistResult<Value> {
        let sql = spec.scalar_sql();
        debug!("event=repo_query module=session status=start kind=scalar");
        let mut stmt = prepare_bound(self.conn, &sql, &spec.params)?;
        let columns = stmt.column_count();
        if columns != 1 {
            return Err(PersistenceError::ScalarMismatch(format!(
                "expected one column, got {columns}"
            )));
        }

        let mut rows = stmt.raw_query();
        let value = match rows.next()? {
            Some(row) => row.get::<_, Value>(0)?,
            None => {
                return Err(PersistenceError::ScalarMismatch(
                    "query returned no rows".to_string(),
                ));
            }
        };
        if rows.next()?.is_some() {
            return Err(PersistenceError::ScalarMismatch(
                "query returned more than one row".to_string(),
            ));
        }
        Ok(value)
    }

    fn update_rows(&self, spec: &QuerySpec) -> PersistResult<usize> {
        let sql = spec.update_sql();
        let mut stmt = prepare_bound(self.conn, &sql, &spec.params)?;
        let changed = stmt.raw_execute()?;
        debug!("event=repo_query module=session status=ok kind=update affected={changed}");
        Ok(changed)
    }

    fn get_by_id<T: Entity>(&self, id: EntityId) -> PersistResult<Option<T>> {
        let sql = format!(
            "SELECT {} FROM {} WHERE {} = ?1",
            select_list::<T>(),
            T::TABLE,
            T::ID_COLUMN
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(T::from_row(row)?));
        }
        Ok(None)
    }

    fn save<T: Entity>(&self, entity: &mut T) -> PersistResult<EntityId> {
        let id = entity.id().unwrap_or_else(Uuid::new_v4);

        let mut columns = Vec::with_capacity(T::COLUMNS.len() + 1);
        columns.push(T::ID_COLUMN);
        columns.extend_from_slice(T::COLUMNS);
        let placeholders = (1..=columns.len())
            .map(|index| format!("?{index}"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({placeholders})",
            T::TABLE,
            columns.join(", ")
        );

        let mut values = Vec::with_capacity(columns.len());
        values.push(Value::Text(id.to_string()));
        values.extend(mapped_values(entity)?);
        self.conn.execute(&sql, params_from_iter(values))?;

        entity.set_id(id);
        debug!(
            "event=entity_save module=session status=ok table={} id={id}",
            T::TABLE
        );
        Ok(id)
    }

    fn update<T: Entity>(&self, entity: &T) -> PersistResult<()> {
        let id = entity
            .id()
            .ok_or(PersistenceError::MissingIdentity(T::TABLE))?;
        let assignments = T::COLUMNS
            .iter()
            .enumerate()
            .map(|(index, column)| format!("{column} = ?{}", index + 1))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "UPDATE {} SET {assignments} WHERE {} = ?{}",
            T::TABLE,
            T::ID_COLUMN,
            T::COLUMNS.len() + 1
        );

        let mut values = mapped_values(entity)?;
        values.push(Value::Text(id.to_string()));
        let changed = self.conn.execute(&sql, params_from_iter(values))?;
        if changed == 0 {
            return Err(PersistenceError::StaleEntity {
                table: T::TABLE,
                id,
            });
        }
        Ok(())
    }

    fn delete<T: Entity>(&self, entity: &T) -> PersistResult<()> {
        let id = entity
            .id()
            .ok_or(PersistenceError::MissingIdentity(T::TABLE))?;
        let sql = format!("DELETE FROM {} WHERE {} = ?1", T::TABLE, T::ID_COLUMN);
        let changed = self.conn.execute(&sql, [id.to_string()])?;
        if changed == 0 {
            return Err(PersistenceError::StaleEntity {
                table: T::TABLE,
                id,
            });
        }
        Ok(())
    }

    fn in_transaction<R, E, F>(&self, mode: TransactionMode, work: F) -> Result<R, E>
    where
        E: From<PersistenceError>,
        F: FnOnce(&Self) -> Result<R, E>,
    {
        let behavior = match mode {
            TransactionMode::ReadOnly => TransactionBehavior::Deferred,
            TransactionMode::ReadWrite => TransactionBehavior::Immediate,
        };
        let tx = Transaction::new_unchecked(self.conn, behavior).map_err(PersistenceError::from)?;
        if mode == TransactionMode::ReadOnly {
            self.conn
                .execute_batch("PRAGMA query_only = ON;")
                .map_err(PersistenceError::from)?;
        }

        let outcome = work(self);
        let restored = match mode {
            TransactionMode::ReadOnly => self.conn.execute_batch("PRAGMA query_only = OFF;"),
            TransactionMode::ReadWrite => Ok(()),
        };

        match (outcome, restored) {
            (Ok(value), Ok(())) => {
                tx.commit().map_err(PersistenceError::from)?;
                debug!("event=tx_commit module=session status=ok mode={mode:?}");
                Ok(value)
            }
            (Ok(_), Err(err)) => {
                roll_back(tx, mode);
                Err(PersistenceError::from(err).into())
            }
            (Err(err), _) => {
                roll_back(tx, mode);
                Err(err)
            }
        }
    }
}

fn roll_back(tx: Transaction<'_>, mode: TransactionMode) {
    match tx.rollback() {
        Ok(()) => info!("event=tx_rollback module=session status=ok mode={mode:?}"),
        Err(err) => warn!(
            "event=tx_rollback module=session status=error mode={mode:?} error={err}"
        ),
    }
}

fn mapped_values<T: Entity>(entity: &T) -> PersistResult<Vec<Value>> {
    let values = entity.values();
    if values.len() != T::COLUMNS.len() {
        return Err(PersistenceError::InvalidData(format!(
            "`{}` maps {} columns but produced {} values",
            T::TABLE,
            T::COLUMNS.len(),
            values.len()
        )));
    }
    Ok(values)
}

fn prepare_bound<'a>(
    conn: &'a Connection,
    sql: &str,
    params: &Params,
) -> PersistResult<Statement<'a>> {
    let mut stmt = conn.prepare(sql)?;
    match params {
        Params::None => {}
        Params::Named(map) => {
            for (key, value) in map {
                let name = normalize_param_name(key);
                let index = stmt
                    .parameter_index(&name)?
                    .ok_or(PersistenceError::UnknownParameter(name))?;
                stmt.raw_bind_parameter(index, value)?;
            }
        }
        Params::Positional(values) if values.is_empty() => {}
        Params::Positional(values) => {
            let expected = stmt.parameter_count();
            if expected != values.len() {
                return Err(PersistenceError::ParameterCount {
                    expected,
                    actual: values.len(),
                });
            }
            for (position, value) in values.iter().enumerate() {
                stmt.raw_bind_parameter(position + 1, value)?;
            }
        }
    }
    Ok(stmt)
}

fn normalize_param_name(key: &str) -> String {
    if key.starts_with([':', '@', '$']) {
        key.to_string()
    } else {
        format!(":{key}")
    }
}

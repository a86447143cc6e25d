//! Entity mapping contract.
//!
//! An entity declares its table, its non-identity columns, and how to move
//! between a row and the struct. The session builds all CRUD SQL from these
//! declarations; nothing is discovered at runtime.

use super::{PersistResult, PersistenceError};
use rusqlite::types::Value;
use rusqlite::Row;
use uuid::Uuid;

/// Identity of every persisted entity, stored as canonical UUID text.
pub type EntityId = Uuid;

/// Record type persisted through a [`super::Session`].
pub trait Entity: Sized {
    /// Backing table name.
    const TABLE: &'static str;
    /// Identity column name.
    const ID_COLUMN: &'static str = "id";
    /// Non-identity columns, in the order [`Entity::values`] yields them.
    const COLUMNS: &'static [&'static str];

    /// Persisted identity, `None` before the first save.
    fn id(&self) -> Option<EntityId>;

    /// Assigns the identity after a successful insert.
    fn set_id(&mut self, id: EntityId);

    /// Column values matching [`Entity::COLUMNS`].
    fn values(&self) -> Vec<Value>;

    /// Decodes one row selected with at least the mapped columns.
    fn from_row(row: &Row<'_>) -> PersistResult<Self>;
}

/// Comma-separated identity + mapped columns.
pub fn select_list<T: Entity>() -> String {
    let mut columns = Vec::with_capacity(T::COLUMNS.len() + 1);
    columns.push(T::ID_COLUMN);
    columns.extend_from_slice(T::COLUMNS);
    columns.join(", ")
}

/// Reads and parses the identity column of `row`.
pub fn read_id<T: Entity>(row: &Row<'_>) -> PersistResult<EntityId> {
    let text: String = row.get(T::ID_COLUMN)?;
    parse_id(&text, T::TABLE, T::ID_COLUMN)
}

/// Parses a UUID stored in `table.column`.
pub fn parse_id(value: &str, table: &str, column: &str) -> PersistResult<EntityId> {
    Uuid::parse_str(value).map_err(|_| {
        PersistenceError::InvalidData(format!("invalid uuid `{value}` in {table}.{column}"))
    })
}

/// Reads an optional UUID reference column.
pub fn read_optional_id(
    row: &Row<'_>,
    table: &str,
    column: &str,
) -> PersistResult<Option<EntityId>> {
    row.get::<_, Option<String>>(column)?
        .map(|value| parse_id(&value, table, column))
        .transpose()
}

/// Reads a `0/1` integer flag column.
pub fn read_flag(row: &Row<'_>, table: &str, column: &str) -> PersistResult<bool> {
    match row.get::<_, i64>(column)? {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(PersistenceError::InvalidData(format!(
            "invalid flag value `{other}` in {table}.{column}"
        ))),
    }
}

pub fn id_value(id: Option<EntityId>) -> Value {
    id.map_or(Value::Null, |value| Value::Text(value.to_string()))
}

pub fn text_value(value: Option<&str>) -> Value {
    value.map_or(Value::Null, |text| Value::Text(text.to_string()))
}

pub fn flag_value(value: bool) -> Value {
    Value::Integer(if value { 1 } else { 0 })
}

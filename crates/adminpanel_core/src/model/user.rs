//! User account record.
//!
//! # Invariants
//! - `login_name` is unique case-insensitively.
//! - `password_hash` is never a plain-text password; see `util::digest`.
//! - Inactive users are kept for audit and never authenticate.

use crate::session::entity::{flag_value, id_value, read_flag, read_id, read_optional_id};
use crate::session::{Entity, EntityId, PersistResult};
use rusqlite::types::Value;
use rusqlite::Row;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Administrative user account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Option<EntityId>,
    pub login_name: String,
    pub display_name: String,
    /// `salt$sha256hex`; skipped when serialized for display.
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub role_id: Option<EntityId>,
    pub active: bool,
    /// Unix epoch milliseconds.
    pub created_at: i64,
}

impl User {
    /// Creates an active, unsaved user stamped with the current time.
    pub fn new(
        login_name: impl Into<String>,
        display_name: impl Into<String>,
        password_hash: impl Into<String>,
        role_id: Option<EntityId>,
    ) -> Self {
        Self {
            id: None,
            login_name: login_name.into(),
            display_name: display_name.into(),
            password_hash: password_hash.into(),
            role_id,
            active: true,
            created_at: now_epoch_ms(),
        }
    }
}

impl Entity for User {
    const TABLE: &'static str = "users";
    const COLUMNS: &'static [&'static str] = &[
        "login_name",
        "display_name",
        "password_hash",
        "role_id",
        "active",
        "created_at",
    ];

    fn id(&self) -> Option<EntityId> {
        self.id
    }

    fn set_id(&mut self, id: EntityId) {
        self.id = Some(id);
    }

    fn values(&self) -> Vec<Value> {
        vec![
            Value::Text(self.login_name.clone()),
            Value::Text(self.display_name.clone()),
            Value::Text(self.password_hash.clone()),
            id_value(self.role_id),
            flag_value(self.active),
            Value::Integer(self.created_at),
        ]
    }

    fn from_row(row: &Row<'_>) -> PersistResult<Self> {
        Ok(Self {
            id: Some(read_id::<Self>(row)?),
            login_name: row.get("login_name")?,
            display_name: row.get("display_name")?,
            password_hash: row.get("password_hash")?,
            role_id: read_optional_id(row, Self::TABLE, "role_id")?,
            active: read_flag(row, Self::TABLE, "active")?,
            created_at: row.get("created_at")?,
        })
    }
}

/// Current wall-clock time in Unix epoch milliseconds.
pub fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_millis() as i64)
}

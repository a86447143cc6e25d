//! Role record.

use crate::session::entity::{read_id, text_value};
use crate::session::{Entity, EntityId, PersistResult};
use rusqlite::types::Value;
use rusqlite::Row;
use serde::{Deserialize, Serialize};

/// Named permission group; menus are granted per role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: Option<EntityId>,
    /// Unique role name, e.g. `admin`.
    pub name: String,
    pub description: Option<String>,
}

impl Role {
    pub fn new(name: impl Into<String>, description: Option<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            description,
        }
    }
}

impl Entity for Role {
    const TABLE: &'static str = "roles";
    const COLUMNS: &'static [&'static str] = &["name", "description"];

    fn id(&self) -> Option<EntityId> {
        self.id
    }

    fn set_id(&mut self, id: EntityId) {
        self.id = Some(id);
    }

    fn values(&self) -> Vec<Value> {
        vec![
            Value::Text(self.name.clone()),
            text_value(self.description.as_deref()),
        ]
    }

    fn from_row(row: &Row<'_>) -> PersistResult<Self> {
        Ok(Self {
            id: Some(read_id::<Self>(row)?),
            name: row.get("name")?,
            description: row.get("description")?,
        })
    }
}


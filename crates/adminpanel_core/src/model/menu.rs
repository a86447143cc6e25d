//! Menu record and the per-role tree projection.

use crate::session::entity::{id_value, read_id, read_optional_id, text_value};
use crate::session::{Entity, EntityId, PersistResult};
use rusqlite::types::Value;
use rusqlite::Row;
use serde::{Deserialize, Serialize};

/// One navigation entry; `parent_id = None` means top level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Menu {
    pub id: Option<EntityId>,
    pub parent_id: Option<EntityId>,
    pub name: String,
    pub url: Option<String>,
    pub icon: Option<String>,
    /// Ascending order among siblings.
    pub sort_order: i64,
}

impl Menu {
    pub fn new(parent_id: Option<EntityId>, name: impl Into<String>) -> Self {
        Self {
            id: None,
            parent_id,
            name: name.into(),
            url: None,
            icon: None,
            sort_order: 0,
        }
    }
}

impl Entity for Menu {
    const TABLE: &'static str = "menus";
    const COLUMNS: &'static [&'static str] = &["parent_id", "name", "url", "icon", "sort_order"];

    fn id(&self) -> Option<EntityId> {
        self.id
    }

    fn set_id(&mut self, id: EntityId) {
        self.id = Some(id);
    }

    fn values(&self) -> Vec<Value> {
        vec![
            id_value(self.parent_id),
            Value::Text(self.name.clone()),
            text_value(self.url.as_deref()),
            text_value(self.icon.as_deref()),
            Value::Integer(self.sort_order),
        ]
    }

    fn from_row(row: &Row<'_>) -> PersistResult<Self> {
        Ok(Self {
            id: Some(read_id::<Self>(row)?),
            parent_id: read_optional_id(row, Self::TABLE, "parent_id")?,
            name: row.get("name")?,
            url: row.get("url")?,
            icon: row.get("icon")?,
            sort_order: row.get("sort_order")?,
        })
    }
}

/// Rendered menu entry with its visible children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MenuNode {
    pub id: EntityId,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    pub sort_order: i64,
    pub children: Vec<MenuNode>,
}

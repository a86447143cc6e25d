//! Per-role cache of rendered menu trees.

use crate::model::menu::MenuNode;
use crate::session::EntityId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Shared, injectable menu-tree cache keyed by role id.
///
/// Trees are stored behind `Arc` so readers never hold the lock while
/// rendering.
#[derive(Debug, Default)]
pub struct MenuCache {
    trees: Mutex<HashMap<EntityId, Arc<Vec<MenuNode>>>>,
}

impl MenuCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, role_id: EntityId) -> Option<Arc<Vec<MenuNode>>> {
        self.lock().get(&role_id).cloned()
    }

    /// Stores `tree` for `role_id`, replacing any previous entry.
    pub fn insert(&self, role_id: EntityId, tree: Vec<MenuNode>) -> Arc<Vec<MenuNode>> {
        let tree = Arc::new(tree);
        self.lock().insert(role_id, Arc::clone(&tree));
        tree
    }

    /// Drops one role's entry; returns whether it was cached.
    pub fn invalidate(&self, role_id: EntityId) -> bool {
        self.lock().remove(&role_id).is_some()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<EntityId, Arc<Vec<MenuNode>>>> {
        // Entries are whole values; a panicked writer cannot leave one half-built.
        self.trees.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

//! Menu use-case service.
//!
//! # Responsibility
//! - Create menus and manage role grants.
//! - Assemble the per-role navigation tree and render it as JSON.
//!
//! # Invariants
//! - Siblings are ordered by `sort_order, name`.
//! - A granted menu whose parent is not granted to the same role is a root.
//! - Every mutation invalidates the affected cache entries before returning.

use super::menu_cache::MenuCache;
use super::{ServiceError, ServiceResult};
use crate::model::menu::{Menu, MenuNode};
use crate::model::role::Role;
use crate::model::user::User;
use crate::repo::Repository;
use crate::session::{EntityId, Params, Session};
use log::debug;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Menu service facade over one session and a shared tree cache.
pub struct MenuService<'s, 'c, S: Session> {
    menus: Repository<'s, S, Menu>,
    roles: Repository<'s, S, Role>,
    users: Repository<'s, S, User>,
    cache: &'c MenuCache,
}

impl<'s, 'c, S: Session> MenuService<'s, 'c, S> {
    pub fn new(session: &'s S, cache: &'c MenuCache) -> Self {
        Self {
            menus: Repository::new(session),
            roles: Repository::new(session),
            users: Repository::new(session),
            cache,
        }
    }

    /// Persists a new menu entry.
    ///
    /// # Errors
    /// - `InvalidMenuName` when the name is blank.
    /// - `ParentMenuNotFound` when `parent_id` does not exist.
    pub fn create_menu(&self, mut menu: Menu) -> ServiceResult<Menu> {
        let name = menu.name.trim();
        if name.is_empty() {
            return Err(ServiceError::InvalidMenuName);
        }
        menu.name = name.to_string();
        if let Some(parent_id) = menu.parent_id {
            if self.menus.get(parent_id)?.is_none() {
                return Err(ServiceError::ParentMenuNotFound(parent_id));
            }
        }

        self.menus.save(&mut menu)?;
        self.cache.clear();
        Ok(menu)
    }

    /// Removes a menu and its descendants; grants cascade.
    pub fn delete_menu(&self, menu_id: EntityId) -> ServiceResult<()> {
        let menu = self
            .menus
            .get(menu_id)?
            .ok_or(ServiceError::MenuNotFound(menu_id))?;
        self.menus.delete(&menu)?;
        self.cache.clear();
        Ok(())
    }

    /// Grants one menu to one role; returns `false` when already granted.
    pub fn grant_menu(&self, role_id: EntityId, menu_id: EntityId) -> ServiceResult<bool> {
        self.ensure_link_targets(role_id, menu_id)?;
        let inserted = self.menus.execute_update_with(
            "INSERT OR IGNORE INTO role_menus (role_id, menu_id) VALUES (:role_id, :menu_id)",
            link_params(role_id, menu_id),
        )?;
        self.cache.invalidate(role_id);
        Ok(inserted > 0)
    }

    /// Revokes one grant; returns `false` when it did not exist.
    pub fn revoke_menu(&self, role_id: EntityId, menu_id: EntityId) -> ServiceResult<bool> {
        let removed = self.menus.execute_update_with(
            "DELETE FROM role_menus WHERE role_id = :role_id AND menu_id = :menu_id",
            link_params(role_id, menu_id),
        )?;
        self.cache.invalidate(role_id);
        Ok(removed > 0)
    }

    /// Flat list of menus granted to `role_id`, ordered by `sort_order, name`.
    pub fn menus_for_role(&self, role_id: EntityId) -> ServiceResult<Vec<Menu>> {
        Ok(self.menus.find_with(
            "FROM menus WHERE id IN (SELECT menu_id FROM role_menus WHERE role_id = ?) \
             ORDER BY sort_order, name",
            [role_id],
        )?)
    }

    /// Navigation tree for one role, served from cache when present.
    pub fn menu_tree_for_role(&self, role_id: EntityId) -> ServiceResult<Arc<Vec<MenuNode>>> {
        if let Some(tree) = self.cache.get(role_id) {
            debug!("event=menu_tree module=service status=cache_hit role_id={role_id}");
            return Ok(tree);
        }
        let tree = build_menu_tree(self.menus_for_role(role_id)?);
        debug!(
            "event=menu_tree module=service status=built role_id={} roots={}",
            role_id,
            tree.len()
        );
        Ok(self.cache.insert(role_id, tree))
    }

    /// Navigation tree for a user's role; empty for inactive or role-less users.
    pub fn menu_tree_for_user(&self, user_id: EntityId) -> ServiceResult<Arc<Vec<MenuNode>>> {
        let user = self
            .users
            .get(user_id)?
            .ok_or_else(|| ServiceError::UserNotFound(user_id.to_string()))?;
        match user.role_id {
            Some(role_id) if user.active => self.menu_tree_for_role(role_id),
            _ => Ok(Arc::new(Vec::new())),
        }
    }

    /// JSON array of the role's menu tree.
    pub fn render_menu_json(&self, role_id: EntityId) -> ServiceResult<String> {
        let tree = self.menu_tree_for_role(role_id)?;
        Ok(serde_json::to_string(tree.as_ref())?)
    }

    /// JSON array of the user's menu tree.
    pub fn render_user_menu_json(&self, user_id: EntityId) -> ServiceResult<String> {
        let tree = self.menu_tree_for_user(user_id)?;
        Ok(serde_json::to_string(tree.as_ref())?)
    }

    fn ensure_link_targets(&self, role_id: EntityId, menu_id: EntityId) -> ServiceResult<()> {
        if self.roles.get(role_id)?.is_none() {
            return Err(ServiceError::RoleNotFound(role_id.to_string()));
        }
        if self.menus.get(menu_id)?.is_none() {
            return Err(ServiceError::MenuNotFound(menu_id));
        }
        Ok(())
    }
}

fn link_params(role_id: EntityId, menu_id: EntityId) -> Params {
    Params::named([("role_id", role_id), ("menu_id", menu_id)])
}

/// Assembles saved menus into a forest.
///
/// Menus whose parent is absent from `menus` become roots. Unsaved menus are
/// skipped.
pub fn build_menu_tree(menus: Vec<Menu>) -> Vec<MenuNode> {
    let present: HashSet<EntityId> = menus.iter().filter_map(|menu| menu.id).collect();
    let mut by_parent: HashMap<Option<EntityId>, Vec<Menu>> = HashMap::new();
    for menu in menus.into_iter().filter(|menu| menu.id.is_some()) {
        let parent = menu.parent_id.filter(|parent| present.contains(parent));
        by_parent.entry(parent).or_default().push(menu);
    }
    take_children(None, &mut by_parent)
}

fn take_children(
    parent: Option<EntityId>,
    by_parent: &mut HashMap<Option<EntityId>, Vec<Menu>>,
) -> Vec<MenuNode> {
    let mut level = by_parent.remove(&parent).unwrap_or_default();
    level.sort_by(|left, right| {
        left.sort_order
            .cmp(&right.sort_order)
            .then_with(|| left.name.cmp(&right.name))
    });

    level
        .into_iter()
        .filter_map(|menu| {
            let id = menu.id?;
            Some(MenuNode {
                id,
                children: take_children(Some(id), by_parent),
                name: menu.name,
                url: menu.url,
                icon: menu.icon,
                sort_order: menu.sort_order,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::build_menu_tree;
    use crate::model::menu::Menu;
    use uuid::Uuid;

    fn saved(parent_id: Option<Uuid>, name: &str, sort_order: i64) -> Menu {
        let mut menu = Menu::new(parent_id, name);
        menu.id = Some(Uuid::new_v4());
        menu.sort_order = sort_order;
        menu
    }

    #[test]
    fn orders_siblings_by_sort_order_then_name() {
        let system = saved(None, "System", 2);
        let system_id = system.id;
        let menus = vec![
            system,
            saved(None, "Dashboard", 1),
            saved(system_id, "Roles", 1),
            saved(system_id, "Audit", 1),
            saved(system_id, "Users", 0),
        ];

        let tree = build_menu_tree(menus);
        let roots: Vec<_> = tree.iter().map(|node| node.name.as_str()).collect();
        assert_eq!(roots, ["Dashboard", "System"]);
        let children: Vec<_> = tree[1]
            .children
            .iter()
            .map(|node| node.name.as_str())
            .collect();
        assert_eq!(children, ["Users", "Audit", "Roles"]);
    }

    #[test]
    fn orphaned_children_are_promoted_to_roots() {
        let hidden_parent = Uuid::new_v4();
        let tree = build_menu_tree(vec![
            saved(Some(hidden_parent), "Logs", 0),
            saved(None, "Home", 5),
        ]);
        assert_eq!(tree.len(), 2);
        assert_eq!(tree[0].name, "Logs");
        assert!(tree.iter().all(|node| node.children.is_empty()));
    }

    #[test]
    fn unsaved_and_self_parented_menus_are_skipped() {
        let mut looped = saved(None, "Loop", 0);
        looped.parent_id = looped.id;
        let tree = build_menu_tree(vec![Menu::new(None, "Draft"), looped]);
        assert!(tree.is_empty());
    }
}

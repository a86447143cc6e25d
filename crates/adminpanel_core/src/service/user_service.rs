//! User and role use-case service.
//!
//! # Responsibility
//! - Validate and create roles and user accounts.
//! - Authenticate logins against salted password digests.
//! - Provide paged/filtered user listings.
//!
//! # Invariants
//! - Login names match `^[A-Za-z][A-Za-z0-9_.-]{2,31}$` and are unique
//!   case-insensitively.
//! - Plain-text passwords never reach the store or the log.
//! - Inactive users never authenticate.

use super::{ServiceError, ServiceResult};
use crate::model::role::Role;
use crate::model::user::User;
use crate::repo::{PageSpec, Repository};
use crate::session::{EntityId, Params, Session};
use crate::util::digest::{hash_password, verify_password};
use log::info;
use once_cell::sync::Lazy;
use regex::Regex;

static LOGIN_NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9_.\-]{2,31}$").expect("valid login name regex")
});

/// Input for [`UserService::create_user`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub login_name: String,
    pub display_name: String,
    pub password: String,
    /// Role name; `None` creates a user without menu access.
    pub role: Option<String>,
}

impl NewUser {
    pub fn new(
        login_name: impl Into<String>,
        display_name: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            login_name: login_name.into(),
            display_name: display_name.into(),
            password: password.into(),
            role: None,
        }
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }
}

/// User/role service facade over one session.
pub struct UserService<'s, S: Session> {
    users: Repository<'s, S, User>,
    roles: Repository<'s, S, Role>,
}

impl<'s, S: Session> UserService<'s, S> {
    pub fn new(session: &'s S) -> Self {
        Self {
            users: Repository::new(session),
            roles: Repository::new(session),
        }
    }

    /// Creates one role with a unique, non-blank name.
    pub fn create_role(&self, name: &str, description: Option<&str>) -> ServiceResult<Role> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ServiceError::InvalidRoleName);
        }
        if self.find_role_by_name(name)?.is_some() {
            return Err(ServiceError::DuplicateRoleName(name.to_string()));
        }

        let mut role = Role::new(name, description.map(str::to_string));
        self.roles.save(&mut role)?;
        Ok(role)
    }

    pub fn find_role_by_name(&self, name: &str) -> ServiceResult<Option<Role>> {
        Ok(self
            .roles
            .get_by_query("FROM roles WHERE name = ?", [name.trim()])?)
    }

    pub fn list_roles(&self) -> ServiceResult<Vec<Role>> {
        Ok(self.roles.find("FROM roles ORDER BY name")?)
    }

    /// Creates one active user.
    ///
    /// # Errors
    /// - `InvalidLoginName` / `DuplicateLoginName` for a bad or taken login.
    /// - `EmptyPassword` when the password is empty.
    /// - `RoleNotFound` when the named role does not exist.
    pub fn create_user(&self, request: NewUser) -> ServiceResult<User> {
        let login_name = normalize_login_name(&request.login_name)?;
        if request.password.is_empty() {
            return Err(ServiceError::EmptyPassword);
        }
        let taken = self
            .users
            .count_with("FROM users WHERE login_name = ?", [login_name.as_str()])?;
        if taken > 0 {
            return Err(ServiceError::DuplicateLoginName(login_name));
        }
        let role_id = match request.role.as_deref() {
            Some(role_name) => Some(self.require_role_id(role_name)?),
            None => None,
        };

        let display_name = match request.display_name.trim() {
            "" => login_name.clone(),
            trimmed => trimmed.to_string(),
        };
        let mut user = User::new(
            login_name,
            display_name,
            hash_password(&request.password),
            role_id,
        );
        self.users.save(&mut user)?;
        info!(
            "event=user_create module=service status=ok login={}",
            user.login_name
        );
        Ok(user)
    }

    /// Returns the active user matching `login` and `password`.
    ///
    /// Unknown logins, wrong passwords and inactive users all yield `Ok(None)`.
    pub fn authenticate(&self, login: &str, password: &str) -> ServiceResult<Option<User>> {
        let Some(user) = self.find_by_login(login)? else {
            info!("event=user_login module=service status=denied reason=unknown_login");
            return Ok(None);
        };
        if !user.active {
            info!(
                "event=user_login module=service status=denied reason=inactive login={}",
                user.login_name
            );
            return Ok(None);
        }
        if !verify_password(password, &user.password_hash) {
            info!(
                "event=user_login module=service status=denied reason=bad_password login={}",
                user.login_name
            );
            return Ok(None);
        }

        info!(
            "event=user_login module=service status=ok login={}",
            user.login_name
        );
        Ok(Some(user))
    }

    pub fn change_password(&self, user_id: EntityId, new_password: &str) -> ServiceResult<()> {
        if new_password.is_empty() {
            return Err(ServiceError::EmptyPassword);
        }
        let mut user = self.require_user(user_id)?;
        user.password_hash = hash_password(new_password);
        self.users.update(&user)?;
        Ok(())
    }

    /// Marks a user inactive; the account row is kept.
    pub fn deactivate_user(&self, user_id: EntityId) -> ServiceResult<()> {
        let affected = self
            .users
            .execute_update_with("UPDATE users SET active = 0 WHERE id = ?", [user_id])?;
        if affected == 0 {
            return Err(ServiceError::UserNotFound(user_id.to_string()));
        }
        Ok(())
    }

    pub fn delete_user(&self, user_id: EntityId) -> ServiceResult<()> {
        let user = self.require_user(user_id)?;
        self.users.delete(&user)?;
        Ok(())
    }

    pub fn get_user(&self, user_id: EntityId) -> ServiceResult<Option<User>> {
        Ok(self.users.get(user_id)?)
    }

    /// Case-insensitive login lookup.
    pub fn find_by_login(&self, login: &str) -> ServiceResult<Option<User>> {
        Ok(self
            .users
            .get_by_query("FROM users WHERE login_name = ?", [login.trim()])?)
    }

    /// Users sorted by login name, one page at a time.
    pub fn list_users(&self, page: PageSpec) -> ServiceResult<Vec<User>> {
        Ok(self
            .users
            .find_paged("FROM users ORDER BY login_name, id", Params::None, page)?)
    }

    pub fn list_users_by_role(&self, role_id: EntityId) -> ServiceResult<Vec<User>> {
        Ok(self
            .users
            .find_with("FROM users WHERE role_id = ? ORDER BY login_name", [role_id])?)
    }

    pub fn count_users(&self) -> ServiceResult<i64> {
        Ok(self.users.count("FROM users")?)
    }

    fn require_user(&self, user_id: EntityId) -> ServiceResult<User> {
        self.users
            .get(user_id)?
            .ok_or_else(|| ServiceError::UserNotFound(user_id.to_string()))
    }

    fn require_role_id(&self, role_name: &str) -> ServiceResult<EntityId> {
        self.find_role_by_name(role_name)?
            .and_then(|role| role.id)
            .ok_or_else(|| ServiceError::RoleNotFound(role_name.trim().to_string()))
    }
}

/// Trims and validates a login name.
pub fn normalize_login_name(value: &str) -> ServiceResult<String> {
    let trimmed = value.trim();
    if !LOGIN_NAME_RE.is_match(trimmed) {
        return Err(ServiceError::InvalidLoginName(trimmed.to_string()));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::normalize_login_name;
    use crate::service::ServiceError;

    #[test]
    fn login_name_accepts_common_shapes() {
        assert_eq!(normalize_login_name("  admin ").expect("valid"), "admin");
        assert!(normalize_login_name("j.doe-2_x").is_ok());
        assert!(normalize_login_name(&format!("a{}", "b".repeat(31))).is_ok());
    }

    #[test]
    fn login_name_rejects_bad_shapes() {
        let too_long = "a".repeat(33);
        for bad in ["ab", "1abc", "_abc", "has space", "", too_long.as_str()] {
            assert!(
                matches!(
                    normalize_login_name(bad),
                    Err(ServiceError::InvalidLoginName(_))
                ),
                "`{bad}` should be rejected"
            );
        }
    }
}

//! Use-case services above the generic repository.
//!
//! # Responsibility
//! - Validate input and orchestrate repository calls into admin use cases.
//! - Keep the CLI and seeding code decoupled from SQL details.

pub mod auth_service;
pub mod menu_cache;
pub mod menu_service;
pub mod user_service;

use crate::online::OnlineRegistryError;
use crate::repo::RepoError;
use crate::session::{EntityId, PersistenceError};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Errors from user, role and menu service operations.
#[derive(Debug)]
pub enum ServiceError {
    /// Login name does not match the allowed pattern.
    InvalidLoginName(String),
    /// Another user already owns this login name.
    DuplicateLoginName(String),
    /// Password is empty.
    EmptyPassword,
    /// Role name is blank after trim.
    InvalidRoleName,
    /// Another role already owns this name.
    DuplicateRoleName(String),
    RoleNotFound(String),
    UserNotFound(String),
    /// Menu name is blank after trim.
    InvalidMenuName,
    MenuNotFound(EntityId),
    ParentMenuNotFound(EntityId),
    /// Online session could not be opened.
    Online(OnlineRegistryError),
    /// Repository-level failure.
    Repo(RepoError),
    /// Menu tree could not be rendered.
    Serialization(serde_json::Error),
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidLoginName(login) => write!(
                f,
                "invalid login name `{login}`: 3-32 chars, letter first, then letters, digits, `_`, `.`, `-`"
            ),
            Self::DuplicateLoginName(login) => write!(f, "login name already taken: {login}"),
            Self::EmptyPassword => write!(f, "password must not be empty"),
            Self::InvalidRoleName => write!(f, "role name must not be blank"),
            Self::DuplicateRoleName(name) => write!(f, "role already exists: {name}"),
            Self::RoleNotFound(role) => write!(f, "role not found: {role}"),
            Self::UserNotFound(user) => write!(f, "user not found: {user}"),
            Self::InvalidMenuName => write!(f, "menu name must not be blank"),
            Self::MenuNotFound(id) => write!(f, "menu not found: {id}"),
            Self::ParentMenuNotFound(id) => write!(f, "parent menu not found: {id}"),
            Self::Online(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::Serialization(err) => write!(f, "failed to render menu json: {err}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Online(err) => Some(err),
            Self::Repo(err) => Some(err),
            Self::Serialization(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<PersistenceError> for ServiceError {
    fn from(value: PersistenceError) -> Self {
        Self::Repo(RepoError::Persistence(value))
    }
}

impl From<OnlineRegistryError> for ServiceError {
    fn from(value: OnlineRegistryError) -> Self {
        Self::Online(value)
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization(value)
    }
}

//! Core of the admin panel backend.
//! Layering: service -> repository -> session -> SQLite.

pub mod bootstrap;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod online;
pub mod repo;
pub mod service;
pub mod session;
pub mod util;

pub use bootstrap::{seed_from_file, seed_from_xml, SeedError, SeedReport};
pub use config::{AppConfig, ConfigError};
pub use db::{open_db, open_db_in_memory, DbError};
pub use logging::{default_log_level, init_logging, init_logging_from_config, logging_status};
pub use model::menu::{Menu, MenuNode};
pub use model::role::Role;
pub use model::user::User;
pub use online::{OnlineSortKey, OnlineUser, OnlineUserRegistry, SortDirection};
pub use repo::{PageSpec, RepoError, RepoResult, Repository};
pub use service::auth_service::AuthService;
pub use service::menu_cache::MenuCache;
pub use service::menu_service::MenuService;
pub use service::user_service::{NewUser, UserService};
pub use service::{ServiceError, ServiceResult};
pub use session::{
    Entity, EntityId, Params, PersistenceError, Session, SqliteSession, TransactionMode,
};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}

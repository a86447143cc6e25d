//! Login and logout over stored accounts and the online-user registry.
//!
//! # Invariants
//! - Idle sessions are expired before every login, resume and listing.
//! - A failed credential check never creates an online session.

use super::user_service::UserService;
use super::ServiceResult;
use crate::config::AppConfig;
use crate::model::user::now_epoch_ms;
use crate::online::{OnlineSortKey, OnlineUser, OnlineUserRegistry, SortDirection};
use crate::session::Session;
use std::time::Duration;

pub struct AuthService<'s, 'r, S: Session> {
    users: UserService<'s, S>,
    registry: &'r OnlineUserRegistry,
    idle_timeout: Duration,
}

impl<'s, 'r, S: Session> AuthService<'s, 'r, S> {
    pub fn new(
        session: &'s S,
        registry: &'r OnlineUserRegistry,
        idle_timeout: Duration,
    ) -> Self {
        Self {
            users: UserService::new(session),
            registry,
            idle_timeout,
        }
    }

    /// Uses `online_idle_timeout_secs` from `config`.
    pub fn from_config(
        session: &'s S,
        registry: &'r OnlineUserRegistry,
        config: &AppConfig,
    ) -> Self {
        Self::new(session, registry, config.online_idle_timeout())
    }

    pub fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }

    /// Checks credentials and opens an online session.
    ///
    /// Returns `Ok(None)` for unknown logins, wrong passwords and inactive
    /// accounts.
    pub fn login(
        &self,
        login: &str,
        password: &str,
        ip: &str,
    ) -> ServiceResult<Option<OnlineUser>> {
        self.login_at(login, password, ip, now_epoch_ms())
    }

    pub fn login_at(
        &self,
        login: &str,
        password: &str,
        ip: &str,
        now_ms: i64,
    ) -> ServiceResult<Option<OnlineUser>> {
        self.expire_idle_at(now_ms);
        let Some(user) = self.users.authenticate(login, password)? else {
            return Ok(None);
        };
        let token = self.registry.login_at(&user, ip, now_ms)?;
        Ok(self.registry.get(&token))
    }

    /// Refreshes a live session; `None` once it has expired or logged out.
    pub fn resume_at(&self, token: &str, now_ms: i64) -> Option<OnlineUser> {
        self.expire_idle_at(now_ms);
        self.registry.touch_at(token, now_ms).ok()?;
        self.registry.get(token)
    }

    pub fn logout(&self, token: &str) -> Option<OnlineUser> {
        self.registry.logout(token)
    }

    /// Live sessions ordered by `key`.
    pub fn online_users_at(
        &self,
        key: OnlineSortKey,
        direction: SortDirection,
        now_ms: i64,
    ) -> Vec<OnlineUser> {
        self.expire_idle_at(now_ms);
        self.registry.list_sorted(key, direction)
    }

    /// Drops sessions idle for longer than the configured timeout.
    pub fn expire_idle_at(&self, now_ms: i64) -> Vec<OnlineUser> {
        self.registry.expire_idle(now_ms, self.idle_timeout)
    }
}

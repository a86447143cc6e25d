//! In-process registry of logged-in users.

use crate::model::user::{now_epoch_ms, User};
use crate::session::EntityId;
use log::info;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use uuid::Uuid;

/// Online registry errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OnlineRegistryError {
    /// User was never persisted.
    UnsavedUser(String),
    /// Deactivated accounts cannot go online.
    InactiveUser(String),
    /// No session is registered under the token.
    TokenNotFound,
}

impl Display for OnlineRegistryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnsavedUser(login) => write!(f, "user has no identity: {login}"),
            Self::InactiveUser(login) => write!(f, "user is inactive: {login}"),
            Self::TokenNotFound => write!(f, "online session not found"),
        }
    }
}

impl Error for OnlineRegistryError {}

/// One logged-in session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OnlineUser {
    /// Opaque session token; never logged.
    #[serde(skip_serializing)]
    pub token: String,
    pub user_id: EntityId,
    pub login_name: String,
    pub display_name: String,
    pub ip: String,
    /// Unix epoch milliseconds.
    pub login_time: i64,
    /// Unix epoch milliseconds of the last request.
    pub last_access: i64,
}

/// Column an online listing is sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnlineSortKey {
    Name,
    LoginTime,
    Ip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl OnlineSortKey {
    fn compare(self, left: &OnlineUser, right: &OnlineUser) -> Ordering {
        let primary = match self {
            Self::Name => left
                .login_name
                .to_lowercase()
                .cmp(&right.login_name.to_lowercase()),
            Self::LoginTime => left.login_time.cmp(&right.login_time),
            Self::Ip => left.ip.cmp(&right.ip),
        };
        primary.then_with(|| left.token.cmp(&right.token))
    }
}

/// Token-keyed table of online sessions, safe to share across threads.
#[derive(Debug, Default)]
pub struct OnlineUserRegistry {
    sessions: Mutex<BTreeMap<String, OnlineUser>>,
}

impl OnlineUserRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new session for `user` and returns its token.
    pub fn login(&self, user: &User, ip: &str) -> Result<String, OnlineRegistryError> {
        self.login_at(user, ip, now_epoch_ms())
    }

    /// Same as [`OnlineUserRegistry::login`] with an explicit clock.
    pub fn login_at(
        &self,
        user: &User,
        ip: &str,
        now_ms: i64,
    ) -> Result<String, OnlineRegistryError> {
        let user_id = user
            .id
            .ok_or_else(|| OnlineRegistryError::UnsavedUser(user.login_name.clone()))?;
        if !user.active {
            return Err(OnlineRegistryError::InactiveUser(user.login_name.clone()));
        }

        let token = Uuid::new_v4().simple().to_string();
        let entry = OnlineUser {
            token: token.clone(),
            user_id,
            login_name: user.login_name.clone(),
            display_name: user.display_name.clone(),
            ip: ip.trim().to_string(),
            login_time: now_ms,
            last_access: now_ms,
        };
        let online = {
            let mut sessions = self.lock();
            sessions.insert(token.clone(), entry);
            sessions.len()
        };
        info!(
            "event=online_login module=online status=ok login={} online={}",
            user.login_name, online
        );
        Ok(token)
    }

    /// Refreshes `last_access` for a session.
    pub fn touch(&self, token: &str) -> Result<(), OnlineRegistryError> {
        self.touch_at(token, now_epoch_ms())
    }

    pub fn touch_at(&self, token: &str, now_ms: i64) -> Result<(), OnlineRegistryError> {
        let mut sessions = self.lock();
        let entry = sessions
            .get_mut(token)
            .ok_or(OnlineRegistryError::TokenNotFound)?;
        entry.last_access = entry.last_access.max(now_ms);
        Ok(())
    }

    /// Removes a session and returns it.
    pub fn logout(&self, token: &str) -> Option<OnlineUser> {
        let removed = self.lock().remove(token);
        if let Some(entry) = &removed {
            info!(
                "event=online_logout module=online status=ok login={}",
                entry.login_name
            );
        }
        removed
    }

    pub fn get(&self, token: &str) -> Option<OnlineUser> {
        self.lock().get(token).cloned()
    }

    pub fn count(&self) -> usize {
        self.lock().len()
    }

    /// Sessions belonging to one user account.
    pub fn sessions_for_user(&self, user_id: EntityId) -> Vec<OnlineUser> {
        let mut sessions: Vec<_> = self
            .lock()
            .values()
            .filter(|entry| entry.user_id == user_id)
            .cloned()
            .collect();
        sessions.sort_by(|left, right| OnlineSortKey::LoginTime.compare(left, right));
        sessions
    }

    /// Snapshot of every session ordered by `key`.
    ///
    /// Ties break on token, so the order is total and stable.
    pub fn list_sorted(&self, key: OnlineSortKey, direction: SortDirection) -> Vec<OnlineUser> {
        let mut sessions: Vec<_> = self.lock().values().cloned().collect();
        sessions.sort_by(|left, right| {
            let ordering = key.compare(left, right);
            match direction {
                SortDirection::Ascending => ordering,
                SortDirection::Descending => ordering.reverse(),
            }
        });
        sessions
    }

    /// Removes sessions idle for longer than `idle_timeout` and returns them.
    pub fn expire_idle(&self, now_ms: i64, idle_timeout: Duration) -> Vec<OnlineUser> {
        let timeout_ms = i64::try_from(idle_timeout.as_millis()).unwrap_or(i64::MAX);
        let expired: Vec<OnlineUser> = {
            let mut sessions = self.lock();
            let stale: Vec<String> = sessions
                .values()
                .filter(|entry| now_ms.saturating_sub(entry.last_access) > timeout_ms)
                .map(|entry| entry.token.clone())
                .collect();
            stale
                .iter()
                .filter_map(|token| sessions.remove(token))
                .collect()
        };

        if !expired.is_empty() {
            info!(
                "event=online_expire module=online status=ok expired={} timeout_secs={}",
                expired.len(),
                idle_timeout.as_secs()
            );
        }
        expired
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, OnlineUser>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

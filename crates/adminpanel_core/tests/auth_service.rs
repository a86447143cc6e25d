use adminpanel_core::config::AppConfig;
use adminpanel_core::db::open_db_in_memory;
use adminpanel_core::online::{OnlineSortKey, OnlineUserRegistry, SortDirection};
use adminpanel_core::service::auth_service::AuthService;
use adminpanel_core::service::user_service::{NewUser, UserService};
use adminpanel_core::session::SqliteSession;
use std::time::Duration;

const T0: i64 = 1_700_000_000_000;

fn seed_accounts(session: &SqliteSession<'_>) {
    let users = UserService::new(session);
    users
        .create_user(NewUser::new("alice", "Alice", "alice-pw"))
        .unwrap();
    users
        .create_user(NewUser::new("bob", "Bob", "bob-pw"))
        .unwrap();
}

#[test]
fn login_opens_session_only_for_valid_credentials() {
    let conn = open_db_in_memory().unwrap();
    let session = SqliteSession::new(&conn);
    seed_accounts(&session);
    let registry = OnlineUserRegistry::new();
    let auth = AuthService::new(&session, &registry, Duration::from_secs(60));

    assert!(auth
        .login_at("alice", "wrong", "10.0.0.1", T0)
        .unwrap()
        .is_none());
    assert!(auth.login_at("nobody", "x", "10.0.0.1", T0).unwrap().is_none());
    assert_eq!(registry.count(), 0);

    let online = auth
        .login_at("alice", "alice-pw", "10.0.0.1", T0)
        .unwrap()
        .unwrap();
    assert_eq!(online.login_name, "alice");
    assert_eq!(online.ip, "10.0.0.1");
    assert_eq!(registry.count(), 1);

    assert!(auth.logout(&online.token).is_some());
    assert_eq!(registry.count(), 0);
}

#[test]
fn idle_sessions_expire_after_configured_timeout() {
    let conn = open_db_in_memory().unwrap();
    let session = SqliteSession::new(&conn);
    seed_accounts(&session);
    let registry = OnlineUserRegistry::new();
    let mut config = AppConfig::with_db_path("unused.db");
    config.online_idle_timeout_secs = 60;
    let auth = AuthService::from_config(&session, &registry, &config);
    assert_eq!(auth.idle_timeout(), Duration::from_secs(60));

    let alice = auth
        .login_at("alice", "alice-pw", "10.0.0.1", T0)
        .unwrap()
        .unwrap();
    let bob = auth
        .login_at("bob", "bob-pw", "10.0.0.2", T0)
        .unwrap()
        .unwrap();

    assert!(auth.resume_at(&alice.token, T0 + 50_000).is_some());

    let online = auth.online_users_at(OnlineSortKey::Name, SortDirection::Ascending, T0 + 90_000);
    let names: Vec<_> = online.iter().map(|user| user.login_name.as_str()).collect();
    assert_eq!(names, ["alice"]);
    assert!(auth.resume_at(&bob.token, T0 + 90_000).is_none());

    let expired = auth.expire_idle_at(T0 + 200_000);
    assert_eq!(expired.len(), 1);
    assert_eq!(expired[0].login_name, "alice");
    assert_eq!(registry.count(), 0);
}

#[test]
fn deactivated_account_cannot_log_in() {
    let conn = open_db_in_memory().unwrap();
    let session = SqliteSession::new(&conn);
    seed_accounts(&session);
    let users = UserService::new(&session);
    let bob = users.find_by_login("bob").unwrap().unwrap();
    users.deactivate_user(bob.id.unwrap()).unwrap();

    let registry = OnlineUserRegistry::new();
    let auth = AuthService::new(&session, &registry, Duration::from_secs(60));
    assert!(auth.login_at("bob", "bob-pw", "10.0.0.2", T0).unwrap().is_none());
    assert_eq!(registry.count(), 0);
}

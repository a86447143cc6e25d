use adminpanel_core::db::open_db_in_memory;
use adminpanel_core::repo::PageSpec;
use adminpanel_core::service::user_service::{NewUser, UserService};
use adminpanel_core::service::ServiceError;
use adminpanel_core::session::SqliteSession;
use rusqlite::Connection;
use uuid::Uuid;

fn setup() -> Connection {
    open_db_in_memory().unwrap()
}

#[test]
fn create_user_hashes_password_and_resolves_role() {
    let conn = setup();
    let session = SqliteSession::new(&conn);
    let service = UserService::new(&session);

    let role = service
        .create_role("admin", Some("Administrators"))
        .unwrap();
    let user = service
        .create_user(NewUser::new("alice", "Alice", "s3cret").with_role("admin"))
        .unwrap();

    assert_eq!(user.role_id, role.id);
    assert!(user.active);
    assert_ne!(user.password_hash, "s3cret");
    assert!(!user.password_hash.contains("s3cret"));

    let stored = service.get_user(user.id.unwrap()).unwrap().unwrap();
    assert_eq!(stored, user);
}

#[test]
fn create_user_validates_input() {
    let conn = setup();
    let session = SqliteSession::new(&conn);
    let service = UserService::new(&session);

    assert!(matches!(
        service.create_user(NewUser::new("x", "X", "pw")),
        Err(ServiceError::InvalidLoginName(_))
    ));
    assert!(matches!(
        service.create_user(NewUser::new("valid_name", "V", "")),
        Err(ServiceError::EmptyPassword)
    ));
    assert!(matches!(
        service.create_user(NewUser::new("valid_name", "V", "pw").with_role("nope")),
        Err(ServiceError::RoleNotFound(_))
    ));
    assert_eq!(service.count_users().unwrap(), 0);
}

#[test]
fn login_names_are_unique_ignoring_case() {
    let conn = setup();
    let session = SqliteSession::new(&conn);
    let service = UserService::new(&session);

    service
        .create_user(NewUser::new("Bob", "Bob", "pw"))
        .unwrap();
    assert!(matches!(
        service.create_user(NewUser::new("bob", "Other Bob", "pw")),
        Err(ServiceError::DuplicateLoginName(_))
    ));
    assert_eq!(
        service.find_by_login("BOB").unwrap().unwrap().login_name,
        "Bob"
    );
}

#[test]
fn blank_display_name_defaults_to_login() {
    let conn = setup();
    let session = SqliteSession::new(&conn);
    let service = UserService::new(&session);

    let user = service
        .create_user(NewUser::new("carol", "   ", "pw"))
        .unwrap();
    assert_eq!(user.display_name, "carol");
}

#[test]
fn authenticate_checks_password_and_active_flag() {
    let conn = setup();
    let session = SqliteSession::new(&conn);
    let service = UserService::new(&session);
    let user = service
        .create_user(NewUser::new("dave", "Dave", "correct horse"))
        .unwrap();

    assert!(service
        .authenticate("dave", "correct horse")
        .unwrap()
        .is_some());
    assert!(service.authenticate("dave", "wrong").unwrap().is_none());
    assert!(service
        .authenticate("nobody", "correct horse")
        .unwrap()
        .is_none());

    service.deactivate_user(user.id.unwrap()).unwrap();
    assert!(service
        .authenticate("dave", "correct horse")
        .unwrap()
        .is_none());
}

#[test]
fn change_password_replaces_digest() {
    let conn = setup();
    let session = SqliteSession::new(&conn);
    let service = UserService::new(&session);
    let user = service
        .create_user(NewUser::new("erin", "Erin", "old-pass"))
        .unwrap();
    let user_id = user.id.unwrap();

    service.change_password(user_id, "new-pass").unwrap();
    assert!(service.authenticate("erin", "old-pass").unwrap().is_none());
    assert!(service.authenticate("erin", "new-pass").unwrap().is_some());

    assert!(matches!(
        service.change_password(user_id, ""),
        Err(ServiceError::EmptyPassword)
    ));
    assert!(matches!(
        service.change_password(Uuid::new_v4(), "x"),
        Err(ServiceError::UserNotFound(_))
    ));
}

#[test]
fn deactivate_and_delete_unknown_user_fail() {
    let conn = setup();
    let session = SqliteSession::new(&conn);
    let service = UserService::new(&session);

    assert!(matches!(
        service.deactivate_user(Uuid::new_v4()),
        Err(ServiceError::UserNotFound(_))
    ));
    assert!(matches!(
        service.delete_user(Uuid::new_v4()),
        Err(ServiceError::UserNotFound(_))
    ));
}

#[test]
fn delete_user_removes_account() {
    let conn = setup();
    let session = SqliteSession::new(&conn);
    let service = UserService::new(&session);
    let user = service
        .create_user(NewUser::new("frank", "Frank", "pw"))
        .unwrap();

    service.delete_user(user.id.unwrap()).unwrap();
    assert!(service.find_by_login("frank").unwrap().is_none());
    assert_eq!(service.count_users().unwrap(), 0);
}

#[test]
fn list_users_pages_in_login_order_and_filters_by_role() {
    let conn = setup();
    let session = SqliteSession::new(&conn);
    let service = UserService::new(&session);
    let staff = service.create_role("staff", None).unwrap();
    service.create_role("guest", None).unwrap();

    for (login, role) in [
        ("mike", "staff"),
        ("anna", "guest"),
        ("zoe", "staff"),
        ("kate", "guest"),
        ("ben", "staff"),
    ] {
        service
            .create_user(NewUser::new(login, login, "pw").with_role(role))
            .unwrap();
    }

    let first = service.list_users(PageSpec::new(1, 2).unwrap()).unwrap();
    let logins: Vec<_> = first.iter().map(|user| user.login_name.as_str()).collect();
    assert_eq!(logins, ["anna", "ben"]);

    let last = service.list_users(PageSpec::new(3, 2).unwrap()).unwrap();
    assert_eq!(last.len(), 1);
    assert_eq!(last[0].login_name, "zoe");

    let in_staff = service.list_users_by_role(staff.id.unwrap()).unwrap();
    let logins: Vec<_> = in_staff
        .iter()
        .map(|user| user.login_name.as_str())
        .collect();
    assert_eq!(logins, ["ben", "mike", "zoe"]);
    assert_eq!(service.count_users().unwrap(), 5);
}

#[test]
fn roles_are_unique_and_listed_by_name() {
    let conn = setup();
    let session = SqliteSession::new(&conn);
    let service = UserService::new(&session);

    service.create_role("viewer", None).unwrap();
    service.create_role("admin", None).unwrap();
    assert!(matches!(
        service.create_role(" admin ", None),
        Err(ServiceError::DuplicateRoleName(_))
    ));
    assert!(matches!(
        service.create_role("  ", None),
        Err(ServiceError::InvalidRoleName)
    ));

    let names: Vec<_> = service
        .list_roles()
        .unwrap()
        .into_iter()
        .map(|role| role.name)
        .collect();
    assert_eq!(names, ["admin", "viewer"]);
    assert!(service.find_role_by_name("viewer").unwrap().is_some());
    assert!(service.find_role_by_name("missing").unwrap().is_none());
}

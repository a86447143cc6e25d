use adminpanel_core::bootstrap::{seed_from_file, seed_from_xml, SeedError};
use adminpanel_core::db::open_db_in_memory;
use adminpanel_core::service::menu_cache::MenuCache;
use adminpanel_core::service::menu_service::MenuService;
use adminpanel_core::service::user_service::UserService;
use adminpanel_core::session::SqliteSession;
use adminpanel_core::util::compress::gzip_bytes;

const SEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<bootstrap>
  <role name="admin" description="Administrators"/>
  <role name="auditor" description="Read-only" grant-all="false"/>
  <menu name="System" icon="gear" order="1">
    <menu name="Users" url="/users" order="1"/>
    <menu name="Roles" url="/roles" order="2"/>
  </menu>
  <menu name="Dashboard" url="/" order="0"/>
  <user login="admin" name="Administrator" password="admin" role="admin"/>
  <user login="audit" name="Auditor" password="audit" role="auditor"/>
</bootstrap>
"#;

#[test]
fn seeds_roles_menus_grants_and_users() {
    let conn = open_db_in_memory().unwrap();
    let session = SqliteSession::new(&conn);
    let cache = MenuCache::new();

    let report = seed_from_xml(&session, &cache, SEED).unwrap();
    assert!(!report.skipped);
    assert_eq!(report.roles, 2);
    assert_eq!(report.menus, 4);
    assert_eq!(report.grants, 4);
    assert_eq!(report.users, 2);

    let users = UserService::new(&session);
    let admin = users.authenticate("admin", "admin").unwrap().unwrap();
    assert_eq!(admin.display_name, "Administrator");

    let menus = MenuService::new(&session, &cache);
    let tree = menus.menu_tree_for_user(admin.id.unwrap()).unwrap();
    let roots: Vec<_> = tree.iter().map(|node| node.name.as_str()).collect();
    assert_eq!(roots, ["Dashboard", "System"]);
    assert_eq!(tree[1].children.len(), 2);

    let auditor = users.find_by_login("audit").unwrap().unwrap();
    assert!(menus
        .menu_tree_for_user(auditor.id.unwrap())
        .unwrap()
        .is_empty());
}

#[test]
fn reseeding_same_document_is_skipped() {
    let conn = open_db_in_memory().unwrap();
    let session = SqliteSession::new(&conn);
    let cache = MenuCache::new();

    seed_from_xml(&session, &cache, SEED).unwrap();
    let second = seed_from_xml(&session, &cache, SEED).unwrap();
    assert!(second.skipped);
    assert_eq!(second.users, 0);
    assert_eq!(UserService::new(&session).count_users().unwrap(), 2);
}

#[test]
fn failure_rolls_back_the_whole_document() {
    let conn = open_db_in_memory().unwrap();
    let session = SqliteSession::new(&conn);
    let cache = MenuCache::new();

    let broken = r#"<bootstrap>
        <role name="admin"/>
        <menu name="Home" url="/"/>
        <user login="admin" password="admin" role="admin"/>
        <user login="ghost" password="ghost" role="missing"/>
    </bootstrap>"#;
    let err = seed_from_xml(&session, &cache, broken).unwrap_err();
    assert!(matches!(err, SeedError::UnknownRole(role) if role == "missing"));

    let users = UserService::new(&session);
    assert_eq!(users.count_users().unwrap(), 0);
    assert!(users.find_role_by_name("admin").unwrap().is_none());
}

#[test]
fn invalid_user_in_document_surfaces_service_error() {
    let conn = open_db_in_memory().unwrap();
    let session = SqliteSession::new(&conn);

    let err = seed_from_xml(
        &session,
        &MenuCache::new(),
        r#"<bootstrap><user login="x" password="pw"/></bootstrap>"#,
    )
    .unwrap_err();
    assert!(matches!(err, SeedError::Service(_)));
}

#[test]
fn seeds_from_file_and_reports_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bootstrap.xml");
    std::fs::write(&path, SEED).unwrap();

    let conn = open_db_in_memory().unwrap();
    let session = SqliteSession::new(&conn);
    let cache = MenuCache::new();
    let report = seed_from_file(&session, &cache, &path).unwrap();
    assert_eq!(report.users, 2);

    let missing = seed_from_file(&session, &cache, dir.path().join("absent.xml")).unwrap_err();
    assert!(matches!(missing, SeedError::Io { .. }));
}

#[test]
fn seeds_from_gzipped_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bootstrap.xml.gz");
    std::fs::write(&path, gzip_bytes(SEED.as_bytes()).unwrap()).unwrap();

    let conn = open_db_in_memory().unwrap();
    let session = SqliteSession::new(&conn);
    let report = seed_from_file(&session, &MenuCache::new(), &path).unwrap();
    assert_eq!(report.menus, 4);
    assert!(UserService::new(&session)
        .authenticate("audit", "audit")
        .unwrap()
        .is_some());
}

use adminpanel_core::db::migrations::latest_version;
use adminpanel_core::db::{open_db, open_db_in_memory, DbError};
use rusqlite::Connection;

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    assert_table_exists(&conn, "roles");
    assert_table_exists(&conn, "users");
    assert_table_exists(&conn, "menus");
    assert_table_exists(&conn, "role_menus");
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("adminpanel.db");

    let conn_first = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_first), latest_version());
    conn_first
        .execute(
            "INSERT INTO roles (id, name) VALUES ('00000000-0000-4000-8000-000000000001', 'admin');",
            [],
        )
        .unwrap();
    drop(conn_first);

    let conn_second = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_second), latest_version());
    let roles: i64 = conn_second
        .query_row("SELECT COUNT(*) FROM roles;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(roles, 1);
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = open_db(&path).unwrap_err();
    match err {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn foreign_keys_are_enforced_and_cascade() {
    let conn = open_db_in_memory().unwrap();
    conn.execute_batch(
        "INSERT INTO roles (id, name) VALUES ('r1', 'admin');
         INSERT INTO menus (id, parent_id, name, sort_order) VALUES ('m1', NULL, 'System', 0);
         INSERT INTO menus (id, parent_id, name, sort_order) VALUES ('m2', 'm1', 'Users', 0);
         INSERT INTO role_menus (role_id, menu_id) VALUES ('r1', 'm2');",
    )
    .unwrap();

    let orphan = conn.execute(
        "INSERT INTO role_menus (role_id, menu_id) VALUES ('missing', 'm1');",
        [],
    );
    assert!(orphan.is_err());

    conn.execute("DELETE FROM menus WHERE id = 'm1';", [])
        .unwrap();
    let menus: i64 = conn
        .query_row("SELECT COUNT(*) FROM menus;", [], |row| row.get(0))
        .unwrap();
    let grants: i64 = conn
        .query_row("SELECT COUNT(*) FROM role_menus;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(menus, 0);
    assert_eq!(grants, 0);
}

#[test]
fn login_names_are_unique_case_insensitively() {
    let conn = open_db_in_memory().unwrap();
    conn.execute(
        "INSERT INTO users (id, login_name, display_name, password_hash, active, created_at)
         VALUES ('u1', 'Admin', 'Admin', 'x', 1, 0);",
        [],
    )
    .unwrap();

    let duplicate = conn.execute(
        "INSERT INTO users (id, login_name, display_name, password_hash, active, created_at)
         VALUES ('u2', 'admin', 'Other', 'x', 1, 0);",
        [],
    );
    assert!(duplicate.is_err());
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "table {table_name} does not exist");
}

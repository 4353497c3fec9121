use cityinfo_core::db::migrations::latest_version;
use cityinfo_core::db::{open_db, open_db_in_memory, DbError};
use rusqlite::Connection;

#[test]
fn open_db_in_memory_applies_schema_and_seed() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    assert_table_exists(&conn, "cities");
    assert_table_exists(&conn, "points_of_interest");
    assert_eq!(count(&conn, "cities"), 3);
    assert_eq!(count(&conn, "points_of_interest"), 6);
}

#[test]
fn opening_same_database_twice_does_not_reseed() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cityinfo.db");

    let conn_first = open_db(&path).unwrap();
    conn_first
        .execute("DELETE FROM points_of_interest WHERE id = 1;", [])
        .unwrap();
    drop(conn_first);

    let conn_second = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_second), latest_version());
    assert_eq!(count(&conn_second, "points_of_interest"), 5);
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
fn deleting_city_cascades_to_points_of_interest() {
    let conn = open_db_in_memory().unwrap();
    conn.execute("DELETE FROM cities WHERE id = 3;", []).unwrap();

    let orphans: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM points_of_interest WHERE city_id = 3;",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(orphans, 0);
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn count(conn: &Connection, table_name: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {table_name};"), [], |row| {
        row.get(0)
    })
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

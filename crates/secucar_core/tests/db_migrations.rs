use rusqlite::Connection;
use secucar_core::db::migrations::{current_version, latest_version};
use secucar_core::db::{open_db, open_db_in_memory, DbError, Table};
use std::path::Path;

fn live_columns(conn: &Connection, table: Table) -> Vec<String> {
    let mut stmt = conn
        .prepare(&format!("SELECT name FROM pragma_table_info('{}');", table.name()))
        .unwrap();
    let names = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    names
}

fn index_names(conn: &Connection) -> Vec<String> {
    let mut stmt = conn
        .prepare("SELECT name FROM sqlite_master WHERE type = 'index' ORDER BY name;")
        .unwrap();
    let names = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    names
}

fn stamp_version(path: &Path, version: u32) {
    let conn = Connection::open(path).unwrap();
    conn.pragma_update(None, "user_version", version).unwrap();
}

#[test]
fn fresh_database_is_stamped_with_latest_version() {
    let conn = open_db_in_memory().unwrap();
    assert_eq!(current_version(&conn).unwrap(), latest_version());
    assert!(latest_version() >= 1);
}

#[test]
fn every_mapped_table_has_exactly_its_mapped_columns() {
    let conn = open_db_in_memory().unwrap();

    for table in Table::ALL {
        let expected: Vec<String> = table
            .row_columns()
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(live_columns(&conn, table), expected, "{}", table.name());
    }
}

#[test]
fn owner_lookups_are_indexed() {
    let conn = open_db_in_memory().unwrap();
    let indexes = index_names(&conn);

    for expected in [
        "idx_devices_user_id",
        "idx_tracks_device_id",
        "idx_samples_track_timestamp",
    ] {
        assert!(
            indexes.iter().any(|name| name == expected),
            "missing index {expected}"
        );
    }
}

#[test]
fn reopening_file_keeps_data_and_version() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fleet.db");

    {
        let conn = open_db(&path).unwrap();
        conn.execute(
            "INSERT INTO devices (user_id, serial_number, current_location, device_name, firmware_version)
             VALUES (1, 42, 'yard', 'van', 3);",
            [],
        )
        .unwrap();
    }

    let conn = open_db(&path).unwrap();
    assert_eq!(current_version(&conn).unwrap(), latest_version());
    let serial: i64 = conn
        .query_row("SELECT serial_number FROM devices WHERE device_name = 'van';", [], |row| {
            row.get(0)
        })
        .unwrap();
    assert_eq!(serial, 42);
}

#[test]
fn newer_schema_version_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");
    stamp_version(&path, latest_version() + 7);

    match open_db(&path).unwrap_err() {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, latest_version() + 7);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn table_missing_a_mapped_column_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("drifted.db");

    // Pre-existing users table without `password_hash`; the migration's
    // CREATE TABLE IF NOT EXISTS leaves it alone.
    Connection::open(&path)
        .unwrap()
        .execute_batch(
            "CREATE TABLE users (
                id INTEGER PRIMARY KEY,
                username TEXT NOT NULL,
                name TEXT NOT NULL,
                surname TEXT NOT NULL,
                email TEXT NOT NULL,
                telephone_number INTEGER NOT NULL,
                city TEXT NOT NULL,
                street TEXT NOT NULL,
                home_number INTEGER NOT NULL,
                flat_number INTEGER NOT NULL,
                postal_code TEXT NOT NULL
            );",
        )
        .unwrap();

    let err = open_db(&path).unwrap_err();
    assert!(
        matches!(
            err,
            DbError::SchemaMismatch {
                table: "users",
                column: Some("password_hash")
            }
        ),
        "unexpected error: {err}"
    );
}

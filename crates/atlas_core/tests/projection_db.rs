use atlas_core::db::migrations::{current_user_version, latest_version};
use atlas_core::db::{open_db, DbError};
use atlas_core::store::{load_projection, save_projection};
use atlas_core::{Embeddings, Projection, StoreError};
use rusqlite::Connection;

#[test]
fn open_db_creates_projection_tables() {
    let dir = tempfile::tempdir().unwrap();
    let conn = open_db(dir.path().join("fresh.sqlite3")).unwrap();

    assert_eq!(current_user_version(&conn).unwrap(), latest_version());
    assert_table_exists(&conn, "projection_meta");
    assert_table_exists(&conn, "projection_rows");
}

#[test]
fn reopening_a_projection_file_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("projection.sqlite3");
    let projection = Projection::new(
        vec!["a".to_string(), "b".to_string()],
        Embeddings::from_rows([[0.25_f32, -1.0], [3.0, 0.0]]).unwrap(),
    )
    .unwrap();

    save_projection(&path, &projection).expect("save should succeed");
    let conn = open_db(&path).unwrap();
    assert_eq!(current_user_version(&conn).unwrap(), latest_version());
    drop(conn);

    let loaded = load_projection(&path)
        .expect("load should succeed")
        .expect("file should hold a projection");
    assert_eq!(loaded, projection);
}

#[test]
fn newer_schema_version_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.sqlite3");
    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    match load_projection(&path) {
        Err(StoreError::Db(DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        })) => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1);",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "expected table `{table_name}` to exist");
}

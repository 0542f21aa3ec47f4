//! Tests for lyrics cache database initialization

use lyrisync_common::db::init::init_database;

#[tokio::test]
async fn test_database_creation_when_missing() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("nested").join("lyrics.db");

    let result = init_database(&db_path).await;

    assert!(result.is_ok(), "Database initialization failed: {:?}", result.err());
    assert!(db_path.exists(), "Database file was not created");
}

#[tokio::test]
async fn test_database_opens_existing() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("lyrics.db");

    let pool1 = init_database(&db_path).await;
    assert!(pool1.is_ok());

    // Table creation is idempotent
    let pool2 = init_database(&db_path).await;
    assert!(pool2.is_ok(), "Failed to open existing database: {:?}", pool2.err());
}

#[tokio::test]
async fn test_cache_tables_exist() {
    let dir = tempfile::tempdir().unwrap();
    let pool = init_database(&dir.path().join("lyrics.db")).await.unwrap();

    for table in ["songs", "lyrics_lines", "querys"] {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?",
        )
        .bind(table)
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(count, 1, "table {} missing", table);
    }
}

#[tokio::test]
async fn test_query_key_is_unique() {
    let dir = tempfile::tempdir().unwrap();
    let pool = init_database(&dir.path().join("lyrics.db")).await.unwrap();

    sqlx::query("INSERT INTO songs (title, artist, duration_ms, source) VALUES ('T', 'A', 1000, 'test')")
        .execute(&pool)
        .await
        .unwrap();

    let insert = "INSERT INTO querys (query_title, query_artist, song_id) VALUES ('t', 'a', 1)";
    sqlx::query(insert).execute(&pool).await.unwrap();
    let duplicate = sqlx::query(insert).execute(&pool).await;

    assert!(duplicate.is_err(), "duplicate query key must be rejected");
}

#[tokio::test]
async fn test_deleting_song_cascades() {
    let dir = tempfile::tempdir().unwrap();
    let pool = init_database(&dir.path().join("lyrics.db")).await.unwrap();

    sqlx::query("INSERT INTO songs (title, artist, duration_ms, source) VALUES ('T', 'A', 1000, 'test')")
        .execute(&pool)
        .await
        .unwrap();
    sqlx::query(
        "INSERT INTO lyrics_lines (song_id, line_no, text, start_ms, end_ms, duration_ms)
         VALUES (1, 0, 'line', 0, 1000, 1000)",
    )
    .execute(&pool)
    .await
    .unwrap();

    sqlx::query("DELETE FROM songs WHERE id = 1")
        .execute(&pool)
        .await
        .unwrap();

    let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM lyrics_lines")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(remaining, 0);
}

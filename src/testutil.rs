use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use uuid::Uuid;

use crate::db;

/// Fresh in-memory database with the full schema. A single connection keeps
/// every query in the test on the same memory store.
pub(crate) async fn test_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory sqlite");
    db::MIGRATOR.run(&pool).await.expect("migrations");
    pool
}

pub(crate) async fn insert_user(pool: &SqlitePool, username: &str) -> Uuid {
    let id = Uuid::now_v7();
    sqlx::query("INSERT INTO users (id,username,password_hash,created_at) VALUES (?,?,?,?)")
        .bind(id.to_string())
        .bind(username)
        .bind("test-hash")
        .bind(db::now_ms())
        .execute(pool)
        .await
        .expect("insert user");
    id
}

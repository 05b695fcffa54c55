use axum::{debug_handler, extract::State, Json};
use serde::Serialize;
use sqlx::SqlitePool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{db, session::CurrentUser, AppResult};

/// User as exposed over the API. The credential hash never leaves the store.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: Uuid,
    pub username: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[debug_handler(state = crate::AppState)]
pub async fn list_users(
    _user: CurrentUser,
    State(db_pool): State<SqlitePool>,
) -> AppResult<Json<Vec<PublicUser>>> {
    let rows: Vec<(String, String, i64)> =
        sqlx::query_as("SELECT id,username,created_at FROM users ORDER BY username")
            .fetch_all(&db_pool)
            .await?;

    let users = rows
        .into_iter()
        .map(|(id, username, created_at)| {
            Ok(PublicUser {
                id: db::parse_id(&id)?,
                username,
                created_at: db::datetime_from_ms(created_at),
            })
        })
        .collect::<AppResult<Vec<_>>>()?;

    Ok(Json(users))
}

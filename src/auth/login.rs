use axum::{debug_handler, extract::State, Json};
use sqlx::SqlitePool;
use tower_sessions::Session;

use crate::{db, session::USER_ID, users::PublicUser, AppError, AppResult};

use super::register::CredentialsPayload;

#[debug_handler(state = crate::AppState)]
pub async fn login(
    State(db_pool): State<SqlitePool>,
    session: Session,
    Json(CredentialsPayload { username, password }): Json<CredentialsPayload>,
) -> AppResult<Json<PublicUser>> {
    let row: Option<(String, String, i64)> =
        sqlx::query_as("SELECT id,password_hash,created_at FROM users WHERE username=?")
            .bind(&username)
            .fetch_optional(&db_pool)
            .await?;

    // same rejection for unknown user and wrong password
    let Some((id, password_hash, created_at)) = row else {
        return Err(AppError::Unauthenticated);
    };
    if !bcrypt::verify(&password, &password_hash).map_err(AppError::internal)? {
        return Err(AppError::Unauthenticated);
    }

    session.insert(USER_ID, id.clone()).await?;
    tracing::info!(%username, "logged in");

    Ok(Json(PublicUser {
        id: db::parse_id(&id)?,
        username,
        created_at: db::datetime_from_ms(created_at),
    }))
}

use axum::{debug_handler, extract::State, http::StatusCode, Json};
use serde::Deserialize;
use sqlx::SqlitePool;
use tower_sessions::Session;
use uuid::Uuid;

use crate::{db, error::is_unique_violation, session::USER_ID, users::PublicUser, AppError, AppResult};

use super::{validate_password, validate_username};

#[derive(Debug, Deserialize)]
pub(crate) struct CredentialsPayload {
    pub(crate) username: String,
    pub(crate) password: String,
}

#[debug_handler(state = crate::AppState)]
pub async fn register(
    State(db_pool): State<SqlitePool>,
    session: Session,
    Json(CredentialsPayload { username, password }): Json<CredentialsPayload>,
) -> AppResult<(StatusCode, Json<PublicUser>)> {
    validate_username(&username)?;
    validate_password(&password)?;

    let password_hash = bcrypt::hash(&password, bcrypt::DEFAULT_COST).map_err(AppError::internal)?;
    let id = Uuid::now_v7();
    let created_at = db::now_ms();

    let inserted = sqlx::query("INSERT INTO users (id,username,password_hash,created_at) VALUES (?,?,?,?)")
        .bind(id.to_string())
        .bind(&username)
        .bind(&password_hash)
        .bind(created_at)
        .execute(&db_pool)
        .await;
    if let Err(err) = inserted {
        if is_unique_violation(&err) {
            return Err(AppError::DuplicateName("username already taken, please choose another"));
        }
        return Err(err.into());
    }

    session.insert(USER_ID, id.to_string()).await?;
    tracing::info!(%username, "registered new user");

    Ok((
        StatusCode::CREATED,
        Json(PublicUser { id, username, created_at: db::datetime_from_ms(created_at) }),
    ))
}

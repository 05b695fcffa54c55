pub mod store;

use axum::{
    debug_handler,
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{session::CurrentUser, AppResult, AppState};

/// Where a message is headed. Every message has exactly one target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Direct(Uuid),
    Room(Uuid),
}

/// Sender identity expanded for display.
#[derive(Debug, Clone, Serialize)]
pub struct MessageSender {
    pub id: Uuid,
    pub username: String,
}

/// A persisted message with its sender resolved. Immutable once stored.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredMessage {
    pub id: Uuid,
    pub content: String,
    pub sender: MessageSender,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipient: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room: Option<Uuid>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Deserialize)]
struct HistoryQuery {
    before: Option<Uuid>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/room/{room_id}", get(room_history))
        .route("/{other_user_id}", get(direct_history))
}

#[debug_handler(state = crate::AppState)]
async fn direct_history(
    user: CurrentUser,
    Path(other_user_id): Path<Uuid>,
    Query(HistoryQuery { before }): Query<HistoryQuery>,
    State(db_pool): State<SqlitePool>,
) -> AppResult<Json<Vec<StoredMessage>>> {
    Ok(Json(store::direct_history(&db_pool, user.id, other_user_id, before).await?))
}

#[debug_handler(state = crate::AppState)]
async fn room_history(
    _user: CurrentUser,
    Path(room_id): Path<Uuid>,
    Query(HistoryQuery { before }): Query<HistoryQuery>,
    State(db_pool): State<SqlitePool>,
) -> AppResult<Json<Vec<StoredMessage>>> {
    Ok(Json(store::room_history(&db_pool, room_id, before).await?))
}

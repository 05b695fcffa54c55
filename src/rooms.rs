pub mod directory;

use axum::{
    debug_handler,
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, put},
    Json, Router,
};
use serde::Deserialize;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{session::CurrentUser, AppResult, AppState};

pub use directory::Room;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_rooms).post(create_room))
        .route("/{room_id}", delete(delete_room))
        .route("/{room_id}/members", put(add_member))
        .route("/{room_id}/members/{user_id}", delete(remove_member))
}

#[derive(Debug, Deserialize)]
struct CreateRoomPayload {
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MemberPayload {
    user_id: Uuid,
}

#[debug_handler(state = crate::AppState)]
async fn create_room(
    user: CurrentUser,
    State(db_pool): State<SqlitePool>,
    Json(CreateRoomPayload { name }): Json<CreateRoomPayload>,
) -> AppResult<(StatusCode, Json<Room>)> {
    let room = directory::create_room(&db_pool, &name, user.id).await?;
    Ok((StatusCode::CREATED, Json(room)))
}

#[debug_handler(state = crate::AppState)]
async fn list_rooms(
    user: CurrentUser,
    State(db_pool): State<SqlitePool>,
) -> AppResult<Json<Vec<Room>>> {
    Ok(Json(directory::rooms_for(&db_pool, user.id).await?))
}

#[debug_handler(state = crate::AppState)]
async fn add_member(
    user: CurrentUser,
    Path(room_id): Path<Uuid>,
    State(db_pool): State<SqlitePool>,
    Json(MemberPayload { user_id }): Json<MemberPayload>,
) -> AppResult<StatusCode> {
    directory::add_member(&db_pool, room_id, user.id, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[debug_handler(state = crate::AppState)]
async fn remove_member(
    user: CurrentUser,
    Path((room_id, user_id)): Path<(Uuid, Uuid)>,
    State(db_pool): State<SqlitePool>,
) -> AppResult<StatusCode> {
    directory::remove_member(&db_pool, room_id, user.id, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[debug_handler(state = crate::AppState)]
async fn delete_room(
    user: CurrentUser,
    Path(room_id): Path<Uuid>,
    State(db_pool): State<SqlitePool>,
) -> AppResult<StatusCode> {
    directory::delete_room(&db_pool, room_id, user.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

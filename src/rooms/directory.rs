use serde::Serialize;
use sqlx::{Sqlite, SqlitePool, Transaction};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{db, error::is_unique_violation, AppError, AppResult};

/// A named group with a persistent member list. The creator is always a
/// member and is the only one allowed to manage membership or delete the
/// room.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub id: Uuid,
    pub name: String,
    pub creator: Uuid,
    pub members: Vec<Uuid>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

pub async fn create_room(db_pool: &SqlitePool, name: &str, creator_id: Uuid) -> AppResult<Room> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::InvalidOperation("please enter a room name"));
    }

    let id = Uuid::now_v7();
    let created_at = db::now_ms();

    let mut tx = db_pool.begin().await?;
    let inserted = sqlx::query("INSERT INTO rooms (id,name,creator_id,created_at) VALUES (?,?,?,?)")
        .bind(id.to_string())
        .bind(name)
        .bind(creator_id.to_string())
        .bind(created_at)
        .execute(&mut *tx)
        .await;
    if let Err(err) = inserted {
        // name uniqueness is case-sensitive, enforced by the schema
        if is_unique_violation(&err) {
            return Err(AppError::DuplicateName("a room with this name already exists"));
        }
        return Err(err.into());
    }
    sqlx::query("INSERT INTO room_members (room_id,user_id) VALUES (?,?)")
        .bind(id.to_string())
        .bind(creator_id.to_string())
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    tracing::info!(room = name, creator = %creator_id, "created room");

    Ok(Room {
        id,
        name: name.to_owned(),
        creator: creator_id,
        members: vec![creator_id],
        created_at: db::datetime_from_ms(created_at),
    })
}

/// Rooms the user is a member of.
pub async fn rooms_for(db_pool: &SqlitePool, user_id: Uuid) -> AppResult<Vec<Room>> {
    let rows: Vec<(String, String, String, i64)> = sqlx::query_as(
        "SELECT r.id,r.name,r.creator_id,r.created_at FROM rooms r \
         JOIN room_members rm ON rm.room_id=r.id \
         WHERE rm.user_id=? ORDER BY r.created_at ASC, r.rowid ASC",
    )
    .bind(user_id.to_string())
    .fetch_all(db_pool)
    .await?;

    let mut rooms = Vec::with_capacity(rows.len());
    for (id, name, creator_id, created_at) in rows {
        let members = members_of(db_pool, &id).await?;
        rooms.push(Room {
            id: db::parse_id(&id)?,
            name,
            creator: db::parse_id(&creator_id)?,
            members,
            created_at: db::datetime_from_ms(created_at),
        });
    }
    Ok(rooms)
}

pub async fn add_member(
    db_pool: &SqlitePool,
    room_id: Uuid,
    requester_id: Uuid,
    target_user_id: Uuid,
) -> AppResult<()> {
    let mut tx = db_pool.begin().await?;
    require_creator(&mut tx, room_id, requester_id, "only the room creator can add members").await?;

    // idempotent: re-adding an existing member is a no-op
    sqlx::query("INSERT OR IGNORE INTO room_members (room_id,user_id) VALUES (?,?)")
        .bind(room_id.to_string())
        .bind(target_user_id.to_string())
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;
    Ok(())
}

pub async fn remove_member(
    db_pool: &SqlitePool,
    room_id: Uuid,
    requester_id: Uuid,
    target_user_id: Uuid,
) -> AppResult<()> {
    let mut tx = db_pool.begin().await?;
    let creator =
        require_creator(&mut tx, room_id, requester_id, "only the room creator can remove members")
            .await?;
    if target_user_id == creator {
        return Err(AppError::InvalidOperation("the room creator cannot be removed"));
    }

    sqlx::query("DELETE FROM room_members WHERE room_id=? AND user_id=?")
        .bind(room_id.to_string())
        .bind(target_user_id.to_string())
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;
    Ok(())
}

/// Deletes the room and its member list. Messages sent to the room are kept;
/// their room reference dangles, which is the retention policy here.
pub async fn delete_room(db_pool: &SqlitePool, room_id: Uuid, requester_id: Uuid) -> AppResult<()> {
    let mut tx = db_pool.begin().await?;
    require_creator(&mut tx, room_id, requester_id, "only the room creator can delete the room")
        .await?;

    sqlx::query("DELETE FROM room_members WHERE room_id=?")
        .bind(room_id.to_string())
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM rooms WHERE id=?")
        .bind(room_id.to_string())
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    tracing::info!(room = %room_id, "deleted room");
    Ok(())
}

/// Looks the room up and checks the requester owns it, inside the caller's
/// transaction so the check and the mutation that follows are atomic per
/// room.
async fn require_creator(
    tx: &mut Transaction<'_, Sqlite>,
    room_id: Uuid,
    requester_id: Uuid,
    denial: &'static str,
) -> AppResult<Uuid> {
    let row: Option<(String,)> = sqlx::query_as("SELECT creator_id FROM rooms WHERE id=?")
        .bind(room_id.to_string())
        .fetch_optional(&mut **tx)
        .await?;

    let Some((creator,)) = row else {
        return Err(AppError::NotFound("room"));
    };
    let creator = db::parse_id(&creator)?;
    if creator != requester_id {
        return Err(AppError::Forbidden(denial));
    }
    Ok(creator)
}

async fn members_of(db_pool: &SqlitePool, room_id: &str) -> AppResult<Vec<Uuid>> {
    let rows: Vec<(String,)> =
        sqlx::query_as("SELECT user_id FROM room_members WHERE room_id=? ORDER BY rowid ASC")
            .bind(room_id)
            .fetch_all(db_pool)
            .await?;
    rows.iter().map(|(id,)| db::parse_id(id)).collect()
}

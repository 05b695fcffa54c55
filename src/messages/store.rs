use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{db, AppError, AppResult};

use super::{MessageSender, StoredMessage, Target};

/// A history call returns at most this many rows: the latest ones before the
/// pagination marker (or the latest overall), in ascending order.
pub const PAGE_LIMIT: i64 = 200;

type MessageRow = (String, String, String, Option<String>, Option<String>, String, i64);

const SELECT_MESSAGE: &str =
    "SELECT m.id,m.sender_id,u.username,m.recipient_id,m.room_id,m.content,m.created_at \
     FROM messages m JOIN users u ON u.id=m.sender_id";

/// Validate, stamp, and persist one message, returning it with the sender
/// expanded for display.
pub async fn append(
    db_pool: &SqlitePool,
    sender_id: Uuid,
    target: Target,
    content: &str,
) -> AppResult<StoredMessage> {
    if content.trim().is_empty() {
        return Err(AppError::InvalidOperation("message content must not be empty"));
    }

    let row: Option<(String,)> = sqlx::query_as("SELECT username FROM users WHERE id=?")
        .bind(sender_id.to_string())
        .fetch_optional(db_pool)
        .await?;
    let Some((sender_name,)) = row else {
        return Err(AppError::NotFound("sender"));
    };

    let id = Uuid::now_v7();
    let created_at = db::now_ms();
    let (recipient, room) = match target {
        Target::Direct(user_id) => (Some(user_id), None),
        Target::Room(room_id) => (None, Some(room_id)),
    };

    sqlx::query(
        "INSERT INTO messages (id,sender_id,recipient_id,room_id,content,created_at) \
         VALUES (?,?,?,?,?,?)",
    )
    .bind(id.to_string())
    .bind(sender_id.to_string())
    .bind(recipient.map(|id| id.to_string()))
    .bind(room.map(|id| id.to_string()))
    .bind(content)
    .bind(created_at)
    .execute(db_pool)
    .await?;

    Ok(StoredMessage {
        id,
        content: content.to_owned(),
        sender: MessageSender { id: sender_id, username: sender_name },
        recipient,
        room,
        created_at: db::datetime_from_ms(created_at),
    })
}

/// Messages exchanged between exactly `user_a` and `user_b`, either
/// direction, room messages excluded.
pub async fn direct_history(
    db_pool: &SqlitePool,
    user_a: Uuid,
    user_b: Uuid,
    before: Option<Uuid>,
) -> AppResult<Vec<StoredMessage>> {
    let cutoff = resolve_before(db_pool, before).await?;
    let filter = "((m.sender_id=? AND m.recipient_id=?) OR (m.sender_id=? AND m.recipient_id=?))";
    let rows: Vec<MessageRow> = match cutoff {
        Some(cutoff_ms) => {
            sqlx::query_as(&page_query(filter, true))
                .bind(user_a.to_string())
                .bind(user_b.to_string())
                .bind(user_b.to_string())
                .bind(user_a.to_string())
                .bind(cutoff_ms)
                .bind(PAGE_LIMIT)
                .fetch_all(db_pool)
                .await?
        }
        None => {
            sqlx::query_as(&page_query(filter, false))
                .bind(user_a.to_string())
                .bind(user_b.to_string())
                .bind(user_b.to_string())
                .bind(user_a.to_string())
                .bind(PAGE_LIMIT)
                .fetch_all(db_pool)
                .await?
        }
    };
    collect(rows)
}

pub async fn room_history(
    db_pool: &SqlitePool,
    room_id: Uuid,
    before: Option<Uuid>,
) -> AppResult<Vec<StoredMessage>> {
    let cutoff = resolve_before(db_pool, before).await?;
    let rows: Vec<MessageRow> = match cutoff {
        Some(cutoff_ms) => {
            sqlx::query_as(&page_query("m.room_id=?", true))
                .bind(room_id.to_string())
                .bind(cutoff_ms)
                .bind(PAGE_LIMIT)
                .fetch_all(db_pool)
                .await?
        }
        None => {
            sqlx::query_as(&page_query("m.room_id=?", false))
                .bind(room_id.to_string())
                .bind(PAGE_LIMIT)
                .fetch_all(db_pool)
                .await?
        }
    };
    collect(rows)
}

/// The page is selected newest-first so `before` walks backward through
/// history, then flipped to ascending for the caller. rowid breaks
/// same-millisecond ties in insertion order.
fn page_query(filter: &str, with_cutoff: bool) -> String {
    let cutoff = if with_cutoff { " AND m.created_at < ?" } else { "" };
    format!(
        "{SELECT_MESSAGE} WHERE {filter}{cutoff} \
         ORDER BY m.created_at DESC, m.rowid DESC LIMIT ?"
    )
}

/// Maps the marker id to its timestamp; rows strictly preceding it qualify.
async fn resolve_before(db_pool: &SqlitePool, before: Option<Uuid>) -> AppResult<Option<i64>> {
    let Some(marker) = before else {
        return Ok(None);
    };
    let row: Option<(i64,)> = sqlx::query_as("SELECT created_at FROM messages WHERE id=?")
        .bind(marker.to_string())
        .fetch_optional(db_pool)
        .await?;
    match row {
        Some((ms,)) => Ok(Some(ms)),
        None => Err(AppError::NotFound("message")),
    }
}

fn collect(rows: Vec<MessageRow>) -> AppResult<Vec<StoredMessage>> {
    rows.into_iter()
        .rev()
        .map(|(id, sender_id, username, recipient_id, room_id, content, created_at)| {
            Ok(StoredMessage {
                id: db::parse_id(&id)?,
                content,
                sender: MessageSender { id: db::parse_id(&sender_id)?, username },
                recipient: recipient_id.as_deref().map(db::parse_id).transpose()?,
                room: room_id.as_deref().map(db::parse_id).transpose()?,
                created_at: db::datetime_from_ms(created_at),
            })
        })
        .collect()
}

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::messages::{MessageSender, StoredMessage};
use crate::presence::PresenceEntry;

/// Events a client may send over the websocket.
#[derive(Debug, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ClientEvent {
    JoinRoom {
        room_id: Uuid,
    },
    GroupMessage {
        room_id: Uuid,
        message: String,
    },
    PrivateMessage {
        to: Uuid,
        message: String,
    },
    /// `room` names the channel to relay into: a room id, or the peer's user
    /// id when typing in a direct conversation.
    Typing {
        room: Uuid,
        is_typing: bool,
    },
}

/// Events the server pushes to connected clients.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ServerEvent {
    /// Full presence snapshot, sent to everyone on any connect or disconnect.
    UpdateUserStatus {
        users: HashMap<Uuid, PresenceEntry>,
    },
    NewGroupMessage {
        message: StoredMessage,
    },
    NewPrivateMessage {
        from: MessageSender,
        to: Uuid,
        message: String,
        #[serde(with = "time::serde::rfc3339")]
        timestamp: OffsetDateTime,
    },
    Typing {
        user: String,
        is_typing: bool,
    },
}

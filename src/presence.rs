use std::collections::HashMap;

use serde::Serialize;
use tokio::sync::Mutex;
use uuid::Uuid;

/// One connected user, as every client sees it in `updateUserStatus`.
#[derive(Debug, Clone, Serialize)]
pub struct PresenceEntry {
    pub username: String,
    pub status: &'static str,
}

/// Who is connected right now. Held in `AppState` for the process lifetime
/// and mutated only by the websocket connect/disconnect hooks.
///
/// Mutations return the snapshot taken under the same lock, so the broadcast
/// that follows shows every client exactly the registry after this change.
#[derive(Default)]
pub struct Presence {
    entries: Mutex<HashMap<Uuid, PresenceEntry>>,
}

impl Presence {
    pub async fn mark_online(&self, user_id: Uuid, username: String) -> HashMap<Uuid, PresenceEntry> {
        let mut entries = self.entries.lock().await;
        entries.insert(user_id, PresenceEntry { username, status: "online" });
        entries.clone()
    }

    pub async fn mark_offline(&self, user_id: Uuid) -> HashMap<Uuid, PresenceEntry> {
        let mut entries = self.entries.lock().await;
        entries.remove(&user_id);
        entries.clone()
    }

    pub async fn snapshot(&self) -> HashMap<Uuid, PresenceEntry> {
        self.entries.lock().await.clone()
    }
}

/// Who is currently typing, keyed by user id. No persistence; an entry is
/// removed when the user stops typing or disconnects.
#[derive(Default)]
pub struct Typing {
    active: Mutex<HashMap<Uuid, ()>>,
}

impl Typing {
    pub async fn set(&self, user_id: Uuid, is_typing: bool) {
        let mut active = self.active.lock().await;
        if is_typing {
            active.insert(user_id, ());
        } else {
            active.remove(&user_id);
        }
    }

    pub async fn clear(&self, user_id: Uuid) {
        self.active.lock().await.remove(&user_id);
    }

    pub async fn is_typing(&self, user_id: Uuid) -> bool {
        self.active.lock().await.contains_key(&user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn snapshot_tracks_connects_and_disconnects() {
        let presence = Presence::default();
        let alice = Uuid::now_v7();
        let bob = Uuid::now_v7();

        let snap = presence.mark_online(alice, "alice".into()).await;
        assert_eq!(snap.len(), 1);
        assert_eq!(snap[&alice].username, "alice");
        assert_eq!(snap[&alice].status, "online");

        let snap = presence.mark_online(bob, "bob".into()).await;
        assert_eq!(snap.len(), 2);

        let snap = presence.mark_offline(alice).await;
        assert_eq!(snap.len(), 1);
        assert!(!snap.contains_key(&alice));
        assert_eq!(presence.snapshot().await.len(), 1);
    }

    #[tokio::test]
    async fn reconnect_overwrites_entry() {
        // one entry per user id: a second connection overwrites, and any
        // disconnect for that user removes it
        let presence = Presence::default();
        let alice = Uuid::now_v7();

        presence.mark_online(alice, "alice".into()).await;
        let snap = presence.mark_online(alice, "alice".into()).await;
        assert_eq!(snap.len(), 1);

        let snap = presence.mark_offline(alice).await;
        assert!(snap.is_empty());
    }

    #[tokio::test]
    async fn typing_is_set_and_cleared() {
        let typing = Typing::default();
        let alice = Uuid::now_v7();

        typing.set(alice, true).await;
        assert!(typing.is_typing(alice).await);

        typing.set(alice, false).await;
        assert!(!typing.is_typing(alice).await);

        typing.set(alice, true).await;
        typing.clear(alice).await;
        assert!(!typing.is_typing(alice).await);
    }
}

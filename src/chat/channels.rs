use std::collections::{HashMap, HashSet};

use tokio::sync::{mpsc, Mutex};
use uuid::Uuid;

use super::events::ServerEvent;

pub type SessionId = Uuid;

/// Delivery target: a user id (personal channel) or a room id. The typing
/// event relies on the two sharing one key space.
pub type ChannelKey = Uuid;

#[derive(Default)]
struct Registry {
    sessions: HashMap<SessionId, mpsc::UnboundedSender<ServerEvent>>,
    subscribers: HashMap<ChannelKey, HashSet<SessionId>>,
}

/// Fan-out primitive for the realtime protocol: each live connection
/// registers an outbound queue, then subscribes to any number of channels.
/// Subscriptions are only ever released by unregistering the whole session.
#[derive(Default)]
pub struct Channels {
    inner: Mutex<Registry>,
}

impl Channels {
    pub async fn register(&self, session: SessionId, tx: mpsc::UnboundedSender<ServerEvent>) {
        self.inner.lock().await.sessions.insert(session, tx);
    }

    pub async fn subscribe(&self, session: SessionId, key: ChannelKey) {
        self.inner.lock().await.subscribers.entry(key).or_default().insert(session);
    }

    /// Drop the session and every subscription it holds.
    pub async fn unregister(&self, session: SessionId) {
        let mut inner = self.inner.lock().await;
        inner.sessions.remove(&session);
        inner.subscribers.retain(|_, sessions| {
            sessions.remove(&session);
            !sessions.is_empty()
        });
    }

    /// Deliver to every subscriber of `key`, optionally skipping the
    /// originating session. A failed send means the receiver is already
    /// tearing down; its unregister will prune it.
    pub async fn broadcast(&self, key: ChannelKey, event: ServerEvent, except: Option<SessionId>) {
        let inner = self.inner.lock().await;
        let Some(subscribers) = inner.subscribers.get(&key) else {
            return;
        };
        for session in subscribers {
            if Some(*session) == except {
                continue;
            }
            if let Some(tx) = inner.sessions.get(session) {
                let _ = tx.send(event.clone());
            }
        }
    }

    /// Deliver to every connected session, subscribed or not.
    pub async fn broadcast_all(&self, event: ServerEvent) {
        let inner = self.inner.lock().await;
        for tx in inner.sessions.values() {
            let _ = tx.send(event.clone());
        }
    }
}

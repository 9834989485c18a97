use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, RwLock};
use tracing::debug;
use uuid::Uuid;

use parley_types::events::GatewayEvent;
use parley_types::models::RoomKey;

/// Tracks connected sessions and fans newly persisted messages out to every
/// session subscribed to the message's room.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

struct DispatcherInner {
    /// room -> (session id -> push channel). Every session gets its own
    /// unbounded channel, so a slow consumer never holds up the others.
    rooms: RwLock<HashMap<RoomKey, HashMap<Uuid, mpsc::UnboundedSender<GatewayEvent>>>>,

    /// session id -> push channel, looked up on subscribe
    sessions: RwLock<HashMap<Uuid, mpsc::UnboundedSender<GatewayEvent>>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(DispatcherInner {
                rooms: RwLock::new(HashMap::new()),
                sessions: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// Register a new session. Returns its id and the receiving end of its
    /// push channel.
    pub async fn register_session(&self) -> (Uuid, mpsc::UnboundedReceiver<GatewayEvent>) {
        let session_id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner.sessions.write().await.insert(session_id, tx);
        (session_id, rx)
    }

    /// Declare the session's interest in a room. Subscribing twice is a
    /// no-op; an unknown session id is ignored.
    pub async fn subscribe(&self, session_id: Uuid, key: RoomKey) {
        let tx = {
            let sessions = self.inner.sessions.read().await;
            match sessions.get(&session_id) {
                Some(tx) => tx.clone(),
                None => return,
            }
        };

        self.inner
            .rooms
            .write()
            .await
            .entry(key)
            .or_default()
            .entry(session_id)
            .or_insert(tx);
        debug!("session {} subscribed to {}", session_id, key);
    }

    /// Withdraw the session's interest in a room.
    pub async fn unsubscribe(&self, session_id: Uuid, key: RoomKey) {
        let mut rooms = self.inner.rooms.write().await;
        if let Some(subscribers) = rooms.get_mut(&key) {
            subscribers.remove(&session_id);
            if subscribers.is_empty() {
                rooms.remove(&key);
            }
        }
        debug!("session {} unsubscribed from {}", session_id, key);
    }

    /// Remove a session and all of its subscriptions. Called when the
    /// connection closes, however it closes.
    pub async fn drop_session(&self, session_id: Uuid) {
        self.inner.sessions.write().await.remove(&session_id);

        let mut rooms = self.inner.rooms.write().await;
        rooms.retain(|_, subscribers| {
            subscribers.remove(&session_id);
            !subscribers.is_empty()
        });
    }

    /// Deliver an event to every session currently subscribed to the room.
    /// Sessions whose receiving end is gone are skipped, not retried; a
    /// disconnected client recovers by re-fetching over HTTP. Returns the
    /// number of sessions the event was handed to.
    pub async fn publish(&self, key: RoomKey, event: GatewayEvent) -> usize {
        let rooms = self.inner.rooms.read().await;
        let Some(subscribers) = rooms.get(&key) else {
            return 0;
        };

        let mut delivered = 0;
        for (session_id, tx) in subscribers.iter() {
            if tx.send(event.clone()).is_ok() {
                delivered += 1;
            } else {
                debug!("session {} gone, skipping delivery", session_id);
            }
        }
        delivered
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

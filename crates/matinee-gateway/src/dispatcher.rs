use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{RwLock, broadcast};
use uuid::Uuid;

use matinee_types::events::GatewayEvent;

/// Manages all connected clients and broadcasts gateway events.
///
/// Every connection receives every broadcast; room filtering happens in the
/// per-connection send loop against that connection's subscription set.
/// REST handlers publish into the same dispatcher, so a poll vote over HTTP
/// reaches every subscribed WebSocket client.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

struct DispatcherInner {
    broadcast_tx: broadcast::Sender<GatewayEvent>,

    /// Online users: user_id -> (connection id, display name). The
    /// connection id guards cleanup when a reconnect supersedes an old
    /// connection.
    online: RwLock<HashMap<Uuid, (Uuid, String)>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        let (broadcast_tx, _) = broadcast::channel(1024);
        Self {
            inner: Arc::new(DispatcherInner {
                broadcast_tx,
                online: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// Subscribe to gateway events. Returns a broadcast receiver.
    pub fn subscribe(&self) -> broadcast::Receiver<GatewayEvent> {
        self.inner.broadcast_tx.subscribe()
    }

    /// Broadcast an event to all connected clients.
    pub fn broadcast(&self, event: GatewayEvent) {
        let _ = self.inner.broadcast_tx.send(event);
    }

    /// Register a user as online under a fresh connection id.
    pub async fn user_online(&self, user_id: Uuid, name: String) -> Uuid {
        let conn_id = Uuid::new_v4();
        self.inner
            .online
            .write()
            .await
            .insert(user_id, (conn_id, name.clone()));

        self.broadcast(GatewayEvent::PresenceUpdate {
            user_id,
            name,
            online: true,
        });

        conn_id
    }

    /// Register a user as offline. Only cleans up if conn_id still owns the
    /// presence entry; a newer connection's entry is left alone.
    pub async fn user_offline(&self, user_id: Uuid, conn_id: Uuid) {
        let name = {
            let mut online = self.inner.online.write().await;
            match online.get(&user_id) {
                Some((current, _)) if *current == conn_id => {
                    online.remove(&user_id).map(|(_, name)| name)
                }
                _ => return,
            }
        };

        self.broadcast(GatewayEvent::PresenceUpdate {
            user_id,
            name: name.unwrap_or_default(),
            online: false,
        });
    }

    /// Snapshot of everyone currently online.
    pub async fn online_users(&self) -> Vec<(Uuid, String)> {
        self.inner
            .online
            .read()
            .await
            .iter()
            .map(|(id, (_, name))| (*id, name.clone()))
            .collect()
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn broadcast_reaches_subscribers() {
        let dispatcher = Dispatcher::new();
        let mut rx = dispatcher.subscribe();

        let user_id = Uuid::new_v4();
        dispatcher.broadcast(GatewayEvent::PresenceUpdate {
            user_id,
            name: "ana".into(),
            online: true,
        });

        match rx.recv().await.unwrap() {
            GatewayEvent::PresenceUpdate { user_id: got, online, .. } => {
                assert_eq!(got, user_id);
                assert!(online);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn stale_connection_does_not_clear_presence() {
        let dispatcher = Dispatcher::new();
        let user_id = Uuid::new_v4();

        let old_conn = dispatcher.user_online(user_id, "ana".into()).await;
        let _new_conn = dispatcher.user_online(user_id, "ana".into()).await;

        // The old connection going away must not knock the user offline
        dispatcher.user_offline(user_id, old_conn).await;
        assert_eq!(dispatcher.online_users().await.len(), 1);
    }

    #[tokio::test]
    async fn offline_with_current_connection_clears_presence() {
        let dispatcher = Dispatcher::new();
        let user_id = Uuid::new_v4();

        let conn = dispatcher.user_online(user_id, "ana".into()).await;
        dispatcher.user_offline(user_id, conn).await;
        assert!(dispatcher.online_users().await.is_empty());
    }
}

//! Order notifications for admin dashboards.
//!
//! Every open `text/event-stream` connection holds a [`Subscription`]. The
//! hub keeps one bounded channel per subscription and writes each published
//! event to all of them. Delivery is at most once and best effort: a client
//! whose buffer is full misses the event, a client that went away is
//! retired, nothing is replayed to clients that connect later.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use axum::response::sse::Event;
use emporium_core::OrderCreated;
use tokio::sync::mpsc::{self, error::TrySendError};

/// Idle time after which a heartbeat is sent.
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Frames buffered per client before new events are dropped for it.
const CLIENT_BUFFER: usize = 16;

/// Identifies one registered connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId(u64);

/// One SSE frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// `event: ping`, `data: ok`.
    Ping,
    /// `event: order` with the serialized event as data.
    Order(String),
}

impl Frame {
    /// Render as an axum SSE event.
    #[must_use]
    pub fn into_event(self) -> Event {
        match self {
            Self::Ping => Event::default().event("ping").data("ok"),
            Self::Order(json) => Event::default().event("order").data(json),
        }
    }
}

/// Registry of connected dashboard clients.
///
/// Cheaply cloneable; all clones share one registry.
#[derive(Clone, Default)]
pub struct NotificationHub {
    inner: Arc<HubInner>,
}

#[derive(Default)]
struct HubInner {
    next_id: AtomicU64,
    clients: Mutex<HashMap<ClientId, mpsc::Sender<Frame>>>,
}

impl HubInner {
    fn clients(&self) -> MutexGuard<'_, HashMap<ClientId, mpsc::Sender<Frame>>> {
        // The map is valid after any panic, so a poisoned lock is still usable.
        self.clients.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl NotificationHub {
    /// Create an empty hub.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connection. It stays registered until the returned
    /// subscription is dropped or [`unregister`](Self::unregister) is called.
    #[must_use]
    pub fn register(&self) -> Subscription {
        let id = ClientId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        let (sender, receiver) = mpsc::channel(CLIENT_BUFFER);
        let count = {
            let mut clients = self.inner.clients();
            clients.insert(id, sender);
            clients.len()
        };
        tracing::info!(client = id.0, clients = count, "Notification client connected");

        Subscription {
            id,
            receiver,
            hub: Arc::downgrade(&self.inner),
        }
    }

    /// Remove a connection. Returns whether it was still registered;
    /// removing twice is harmless.
    pub fn unregister(&self, id: ClientId) -> bool {
        let (removed, count) = {
            let mut clients = self.inner.clients();
            (clients.remove(&id).is_some(), clients.len())
        };
        if removed {
            tracing::info!(client = id.0, clients = count, "Notification client disconnected");
        }
        removed
    }

    /// Send an order event to every connected client.
    ///
    /// Returns the number of clients the event was queued for.
    pub fn publish(&self, event: &OrderCreated) -> usize {
        let payload = match serde_json::to_string(event) {
            Ok(payload) => payload,
            Err(err) => {
                tracing::error!(error = %err, "Failed to serialize order event");
                return 0;
            }
        };

        let mut clients = self.inner.clients();
        let mut delivered = 0;
        clients.retain(|id, sender| match sender.try_send(Frame::Order(payload.clone())) {
            Ok(()) => {
                delivered += 1;
                true
            }
            Err(TrySendError::Full(_)) => {
                tracing::warn!(client = id.0, "Notification client is lagging; event dropped");
                true
            }
            Err(TrySendError::Closed(_)) => false,
        });

        tracing::debug!(delivered, clients = clients.len(), "Order event published");
        delivered
    }

    /// Number of registered connections.
    #[must_use]
    pub fn client_count(&self) -> usize {
        self.inner.clients().len()
    }
}

/// A registered connection. Dropping it unregisters the connection.
#[derive(Debug)]
pub struct Subscription {
    id: ClientId,
    receiver: mpsc::Receiver<Frame>,
    hub: Weak<HubInner>,
}

impl Subscription {
    /// This connection's ID.
    #[must_use]
    pub const fn id(&self) -> ClientId {
        self.id
    }

    /// Wait for the next frame. `None` once the hub is gone or this
    /// connection was unregistered.
    pub async fn recv(&mut self) -> Option<Frame> {
        self.receiver.recv().await
    }

    /// Take a frame if one is already queued.
    pub fn try_recv(&mut self) -> Option<Frame> {
        self.receiver.try_recv().ok()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.hub.upgrade() {
            NotificationHub { inner }.unregister(self.id);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use emporium_core::OrderId;

    use super::*;

    fn order(id: &str) -> OrderCreated {
        OrderCreated {
            id: Some(OrderId::new(id)),
            at: 1_700_000_000_000,
        }
    }

    #[test]
    fn test_connected_client_receives_exactly_one_frame() {
        let hub = NotificationHub::new();
        let mut sub = hub.register();

        assert_eq!(hub.publish(&order("ord_1")), 1);
        assert_eq!(
            sub.try_recv(),
            Some(Frame::Order(r#"{"id":"ord_1","at":1700000000000}"#.to_string()))
        );
        assert_eq!(sub.try_recv(), None);
    }

    #[test]
    fn test_late_client_gets_no_replay() {
        let hub = NotificationHub::new();
        let _early = hub.register();
        hub.publish(&order("ord_1"));

        let mut late = hub.register();
        assert_eq!(late.try_recv(), None);
    }

    #[test]
    fn test_unregister_twice_leaves_others_alone() {
        let hub = NotificationHub::new();
        let first = hub.register();
        let mut second = hub.register();

        assert!(hub.unregister(first.id()));
        assert!(!hub.unregister(first.id()));
        assert_eq!(hub.client_count(), 1);

        assert_eq!(hub.publish(&order("ord_2")), 1);
        assert!(second.try_recv().is_some());
    }

    #[test]
    fn test_drop_unregisters() {
        let hub = NotificationHub::new();
        let sub = hub.register();
        assert_eq!(hub.client_count(), 1);
        drop(sub);
        assert_eq!(hub.client_count(), 0);
    }

    #[test]
    fn test_full_client_is_skipped_not_removed() {
        let hub = NotificationHub::new();
        let mut slow = hub.register();
        for i in 0..CLIENT_BUFFER {
            assert_eq!(hub.publish(&order(&format!("ord_{i}"))), 1);
        }
        assert_eq!(hub.publish(&order("overflow")), 0);
        assert_eq!(hub.client_count(), 1);
        assert!(slow.try_recv().is_some());
    }
}

//! Subscriber Registry: the set of live observers
//!
//! Each subscriber owns a bounded FIFO mailbox. Broadcasting is a
//! non-blocking `try_send` into every mailbox while the membership lock is
//! held, so a broadcaster never sees a half-updated member set and never
//! waits on a subscriber. A mailbox that is closed (subscriber gone) or full
//! (subscriber not draining) counts as a failed delivery: the subscriber is
//! dropped from the registry and nobody else is told.
//!
//! Delivery into the socket happens in the subscriber's own task, which
//! holds no lock shared with ingestion.

use futures::Stream;
use rigstream_common::LiveEvent;
use std::collections::HashMap;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::task::{Context, Poll};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Mailbox capacity used when none is configured
pub const DEFAULT_SUBSCRIBER_BUFFER: usize = 256;

type Mailbox = mpsc::Sender<Arc<LiveEvent>>;

/// Concurrency-safe set of live subscribers
pub struct SubscriberRegistry {
    members: Mutex<HashMap<Uuid, Mailbox>>,
    buffer: usize,
}

impl SubscriberRegistry {
    /// Create a registry whose subscribers may fall `buffer` events behind
    pub fn new(buffer: usize) -> Arc<Self> {
        Arc::new(Self {
            members: Mutex::new(HashMap::new()),
            buffer: buffer.max(1),
        })
    }

    fn members(&self) -> MutexGuard<'_, HashMap<Uuid, Mailbox>> {
        // Critical sections never panic mid-update, so a poisoned map is still whole
        self.members.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a new subscriber
    ///
    /// The subscriber receives every event broadcast after this call returns.
    /// Dropping the returned handle removes it again.
    pub fn join(self: &Arc<Self>) -> Subscription {
        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::channel(self.buffer);

        let count = {
            let mut members = self.members();
            members.insert(id, tx);
            members.len()
        };
        info!(subscriber = %id, active = count, "Subscriber joined");

        Subscription {
            id,
            rx,
            registry: Arc::downgrade(self),
        }
    }

    /// Remove a subscriber. Removing an unknown or already removed id is a no-op.
    pub fn leave(&self, id: Uuid) {
        let removed = self.members().remove(&id).is_some();
        if removed {
            info!(subscriber = %id, "Subscriber left");
        }
    }

    /// Deliver an event to every current subscriber
    ///
    /// Never blocks and never fails. Returns the number of subscribers the
    /// event was queued for.
    pub fn broadcast(&self, event: LiveEvent) -> usize {
        let event = Arc::new(event);
        let mut delivered = 0;

        self.members().retain(|id, mailbox| {
            match mailbox.try_send(Arc::clone(&event)) {
                Ok(()) => {
                    delivered += 1;
                    true
                }
                Err(TrySendError::Full(_)) => {
                    warn!(subscriber = %id, "Subscriber not keeping up, unsubscribing");
                    false
                }
                Err(TrySendError::Closed(_)) => {
                    debug!(subscriber = %id, "Subscriber disconnected, unsubscribing");
                    false
                }
            }
        });

        delivered
    }

    pub fn subscriber_count(&self) -> usize {
        self.members().len()
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.members().contains_key(&id)
    }
}

/// Handle held by one live subscriber
///
/// Yields events in broadcast order. Ends (`None`) once the subscriber has
/// been removed from the registry and its mailbox is drained.
pub struct Subscription {
    id: Uuid,
    rx: mpsc::Receiver<Arc<LiveEvent>>,
    registry: Weak<SubscriberRegistry>,
}

impl Subscription {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Wait for the next event; suspends while idle
    pub async fn recv(&mut self) -> Option<Arc<LiveEvent>> {
        self.rx.recv().await
    }
}

impl Stream for Subscription {
    type Item = Arc<LiveEvent>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.leave(self.id);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use log::*;
use tokio::sync::mpsc;

use crate::feed::{FeedFilter, StoreEvent};

pub type SubscriptionId = u64;

/// The registry of live change-feed subscriptions.
///
/// Cheap to clone; all clones share the same subscription table. Publishing fans an event out to
/// every subscription whose filter matches and prunes subscriptions whose receiver has gone away.
#[derive(Clone, Default)]
pub struct FeedRegistry {
    inner: Arc<Mutex<RegistryInner>>,
}

#[derive(Default)]
struct RegistryInner {
    next_id: SubscriptionId,
    subscriptions: HashMap<SubscriptionId, (FeedFilter, mpsc::UnboundedSender<StoreEvent>)>,
}

impl FeedRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new subscription for the filter.
    pub fn subscribe(&self, filter: FeedFilter) -> FeedSubscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = {
            let mut inner = self.inner.lock().unwrap();
            let id = inner.next_id;
            inner.next_id += 1;
            inner.subscriptions.insert(id, (filter, tx));
            id
        };
        trace!("📡️ Subscription #{id} registered");
        FeedSubscription { id, receiver: rx, registry: self.clone() }
    }

    /// Removes a subscription. Idempotent: unsubscribing an unknown or already-removed id is a
    /// no-op.
    pub fn unsubscribe(&self, id: SubscriptionId) {
        let removed = self.inner.lock().unwrap().subscriptions.remove(&id).is_some();
        if removed {
            trace!("📡️ Subscription #{id} released");
        }
    }

    /// Delivers the event to every matching live subscription, in registration-independent order.
    /// Subscriptions whose receiving half has been dropped are pruned.
    pub fn publish(&self, event: StoreEvent) {
        let mut dead = Vec::new();
        {
            let inner = self.inner.lock().unwrap();
            for (id, (filter, tx)) in &inner.subscriptions {
                if filter.matches(&event) && tx.send(event.clone()).is_err() {
                    dead.push(*id);
                }
            }
        }
        for id in dead {
            debug!("📡️ Pruning dead subscription #{id}");
            self.unsubscribe(id);
        }
    }

    /// Number of currently registered subscriptions.
    pub fn active_subscriptions(&self) -> usize {
        self.inner.lock().unwrap().subscriptions.len()
    }
}

/// A live handle on the change feed. Dropping it releases the registration.
pub struct FeedSubscription {
    id: SubscriptionId,
    receiver: mpsc::UnboundedReceiver<StoreEvent>,
    registry: FeedRegistry,
}

impl FeedSubscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Next event for this subscription, or `None` once the subscription has been released.
    pub async fn recv(&mut self) -> Option<StoreEvent> {
        self.receiver.recv().await
    }
}

impl Drop for FeedSubscription {
    fn drop(&mut self) {
        self.registry.unsubscribe(self.id);
    }
}

#[cfg(test)]
mod test {
    use chrono::Utc;

    use super::*;
    use crate::db_types::{DirectMessage, OrderId};

    fn direct_event(sender_id: i64, receiver_id: i64, content: &str) -> StoreEvent {
        StoreEvent::DirectMessageInserted(DirectMessage {
            id: 0,
            sender_id,
            receiver_id,
            content: content.to_string(),
            client_ref: format!("ref-{content}"),
            created_at: Utc::now(),
        })
    }

    #[tokio::test]
    async fn events_are_filtered_per_subscription() {
        let registry = FeedRegistry::new();
        let mut pair_sub = registry.subscribe(FeedFilter::peers(1, 2));
        let mut order_sub = registry.subscribe(FeedFilter::Order(OrderId::from("pix_9")));

        registry.publish(direct_event(2, 1, "oi"));
        registry.publish(direct_event(3, 1, "stranger"));
        registry.publish(StoreEvent::OrderMessagesPurged(OrderId::from("pix_9")));

        let ev = pair_sub.recv().await.unwrap();
        assert!(matches!(ev, StoreEvent::DirectMessageInserted(ref m) if m.content == "oi"));
        let ev = order_sub.recv().await.unwrap();
        assert_eq!(ev, StoreEvent::OrderMessagesPurged(OrderId::from("pix_9")));
    }

    #[tokio::test]
    async fn dropping_a_subscription_releases_it() {
        let registry = FeedRegistry::new();
        let sub = registry.subscribe(FeedFilter::peers(1, 2));
        assert_eq!(registry.active_subscriptions(), 1);
        drop(sub);
        assert_eq!(registry.active_subscriptions(), 0);
        // publishing to an empty registry is fine
        registry.publish(direct_event(1, 2, "tarde demais"));
    }

    #[tokio::test]
    async fn unsubscribe_is_idempotent() {
        let registry = FeedRegistry::new();
        let sub = registry.subscribe(FeedFilter::peers(4, 5));
        let id = sub.id();
        registry.unsubscribe(id);
        registry.unsubscribe(id);
        assert_eq!(registry.active_subscriptions(), 0);
    }
}

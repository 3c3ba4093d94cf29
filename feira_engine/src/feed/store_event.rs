use serde::{Deserialize, Serialize};

use crate::db_types::{DirectMessage, OrderId, OrderMessage};

/// A change-feed event, tagged with the affected row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum StoreEvent {
    /// A new message was appended to an order conversation.
    OrderMessageInserted(OrderMessage),
    /// A new direct message was appended.
    DirectMessageInserted(DirectMessage),
    /// Every message of the order's conversation was removed. Emitted once per purge, not per
    /// message.
    OrderMessagesPurged(OrderId),
}

impl StoreEvent {
    /// The order id this event is scoped to, if it is order-scoped.
    pub fn order_id(&self) -> Option<&OrderId> {
        match self {
            StoreEvent::OrderMessageInserted(msg) => Some(&msg.order_id),
            StoreEvent::OrderMessagesPurged(order_id) => Some(order_id),
            StoreEvent::DirectMessageInserted(_) => None,
        }
    }
}

/// Server-side equality filter for a subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedFilter {
    /// Events scoped to one order conversation.
    Order(OrderId),
    /// Direct messages between the unordered pair. Build with [`FeedFilter::peers`] so the
    /// normalisation is consistent.
    Peers(i64, i64),
}

impl FeedFilter {
    /// Filter for the direct conversation between `a` and `b`, normalising the pair order.
    pub fn peers(a: i64, b: i64) -> Self {
        if a <= b {
            FeedFilter::Peers(a, b)
        } else {
            FeedFilter::Peers(b, a)
        }
    }

    pub fn matches(&self, event: &StoreEvent) -> bool {
        match (self, event) {
            (FeedFilter::Order(oid), _) => event.order_id() == Some(oid),
            (FeedFilter::Peers(a, b), StoreEvent::DirectMessageInserted(msg)) => {
                let (lo, hi) = if msg.sender_id <= msg.receiver_id {
                    (msg.sender_id, msg.receiver_id)
                } else {
                    (msg.receiver_id, msg.sender_id)
                };
                (lo, hi) == (*a, *b)
            },
            (FeedFilter::Peers(..), _) => false,
        }
    }
}

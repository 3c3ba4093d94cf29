use crate::{
    db_types::{DirectMessage, NewDirectMessage, NewOrderMessage, OrderId, OrderMessage, User},
    feed::{FeedFilter, FeedSubscription},
    traits::StoreError,
};

/// Record-store contract for the messaging synchronization engine.
///
/// Both message tables are append-only. The only delete the store supports is the order-scoped
/// bulk purge that accompanies the delivery transition; direct messages are never deleted.
#[allow(async_fn_in_trait)]
pub trait MessageManagement: Clone {
    /// Snapshot of an order conversation, ordered by timestamp ascending.
    async fn order_message_log(&self, order_id: &OrderId) -> Result<Vec<OrderMessage>, StoreError>;

    /// Snapshot of a direct conversation between the (unordered) pair, timestamp ascending.
    async fn direct_message_log(&self, user_a: i64, user_b: i64) -> Result<Vec<DirectMessage>, StoreError>;

    /// Appends an order-scoped message, returning the stored row. A matching insert event is
    /// delivered to every live subscription whose filter covers the order.
    async fn insert_order_message(&self, msg: NewOrderMessage) -> Result<OrderMessage, StoreError>;

    /// Appends a direct message, returning the stored row. A matching insert event is delivered
    /// to every live subscription whose filter covers the pair.
    async fn insert_direct_message(&self, msg: NewDirectMessage) -> Result<DirectMessage, StoreError>;

    /// Deletes every message of the order's conversation and emits a single purge event. Returns
    /// the number of rows removed. Driven solely by the delivery transition.
    async fn purge_order_messages(&self, order_id: &OrderId) -> Result<u64, StoreError>;

    /// Every user who appears as the counterparty of at least one direct message involving
    /// `user_id`, ordered most-recent-message-first.
    async fn contacts_for_user(&self, user_id: i64) -> Result<Vec<User>, StoreError>;

    /// Establishes a live change-feed subscription scoped by the filter. The subscription is
    /// registered until it is explicitly closed or dropped.
    fn subscribe(&self, filter: FeedFilter) -> FeedSubscription;
}

//! `SqliteDatabase` is the concrete record store of the marketplace core.
//!
//! It implements every store trait in the [`traits`](crate::traits) module and owns the change
//! feed: a successful message write or purge is published to the [`FeedRegistry`] after the
//! database has accepted it, so subscribers only ever observe durable rows.
use std::fmt::Debug;

use log::*;
use sqlx::SqlitePool;

use super::db::{messages, new_pool, orders, payouts, products, users};
use crate::{
    db_types::{
        DirectMessage,
        NewDirectMessage,
        NewOrder,
        NewOrderMessage,
        Order,
        OrderId,
        OrderMessage,
        Payout,
        Product,
        User,
    },
    feed::{FeedFilter, FeedRegistry, FeedSubscription, StoreEvent},
    traits::{MessageManagement, SettlementDatabase, StoreError},
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
    feed: FeedRegistry,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = new_pool(url, max_connections).await?;
        Ok(Self { url: url.to_string(), pool, feed: FeedRegistry::new() })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// The registry behind this store's change feed.
    pub fn feed(&self) -> &FeedRegistry {
        &self.feed
    }
}

impl SettlementDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn fetch_user(&self, user_id: i64) -> Result<Option<User>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        users::fetch_user(user_id, &mut conn).await
    }

    async fn fetch_product(&self, product_id: i64) -> Result<Option<Product>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        products::fetch_product(product_id, &mut conn).await
    }

    async fn fetch_order_by_order_id(&self, order_id: &OrderId) -> Result<Option<Order>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order_by_order_id(order_id, &mut conn).await?;
        Ok(order)
    }

    async fn fetch_orders_for_user(&self, user_id: i64) -> Result<Vec<Order>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let orders = orders::fetch_orders_for_user(user_id, &mut conn).await?;
        Ok(orders)
    }

    async fn settle_order(&self, order: NewOrder) -> Result<(Order, bool), StoreError> {
        let order_id = order.order_id.clone();
        let product_id = order.product_id;
        let product = self
            .fetch_product(product_id)
            .await?
            .ok_or(StoreError::ProductNotFound(product_id))?;

        let mut tx = self.pool.begin().await?;
        let Some(stored) = orders::insert_if_new(order, &mut tx).await? else {
            // Idempotent re-settle: the order already exists and stock was already adjusted.
            drop(tx);
            let existing = self
                .fetch_order_by_order_id(&order_id)
                .await?
                .ok_or(StoreError::OrderNotFound(order_id))?;
            debug!("🗃️ Order [{}] was already settled; returning the stored record", existing.order_id);
            return Ok((existing, false));
        };
        // SoldOut aborts the transaction, so no order row survives a failed stock guard.
        products::guarded_decrement(product_id, &mut tx).await?;
        payouts::insert_pending(&stored, &product.pix_key, product.pix_key_kind, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Order [{}] settled: stock reserved, payout ledger opened", stored.order_id);
        Ok((stored, true))
    }

    async fn fetch_payout(&self, order_id: &OrderId) -> Result<Option<Payout>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        payouts::fetch_payout(order_id, &mut conn).await
    }

    async fn fetch_pending_payouts(&self) -> Result<Vec<Payout>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        payouts::fetch_pending(&mut conn).await
    }

    async fn record_payout_attempt(&self, order_id: &OrderId) -> Result<Payout, StoreError> {
        let mut conn = self.pool.acquire().await?;
        payouts::record_attempt(order_id, &mut conn).await
    }

    async fn mark_payout_sent(&self, order_id: &OrderId) -> Result<Payout, StoreError> {
        let mut conn = self.pool.acquire().await?;
        payouts::mark_sent(order_id, &mut conn).await
    }

    async fn mark_delivered(&self, order_id: &OrderId) -> Result<Order, StoreError> {
        let mut conn = self.pool.acquire().await?;
        match orders::mark_delivered(order_id, &mut conn).await? {
            Some(order) => Ok(order),
            // The guard rejected the update: either the order is gone or it is already terminal.
            None => match orders::fetch_order_by_order_id(order_id, &mut conn).await? {
                Some(_) => Err(StoreError::AlreadyDelivered(order_id.clone())),
                None => Err(StoreError::OrderNotFound(order_id.clone())),
            },
        }
    }

    async fn close(&mut self) -> Result<(), StoreError> {
        self.pool.close().await;
        Ok(())
    }
}

impl MessageManagement for SqliteDatabase {
    async fn order_message_log(&self, order_id: &OrderId) -> Result<Vec<OrderMessage>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        messages::order_message_log(order_id, &mut conn).await
    }

    async fn direct_message_log(&self, user_a: i64, user_b: i64) -> Result<Vec<DirectMessage>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        messages::direct_message_log(user_a, user_b, &mut conn).await
    }

    async fn insert_order_message(&self, msg: NewOrderMessage) -> Result<OrderMessage, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let message = messages::insert_order_message(msg, &mut conn).await?;
        self.feed.publish(StoreEvent::OrderMessageInserted(message.clone()));
        Ok(message)
    }

    async fn insert_direct_message(&self, msg: NewDirectMessage) -> Result<DirectMessage, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let message = messages::insert_direct_message(msg, &mut conn).await?;
        self.feed.publish(StoreEvent::DirectMessageInserted(message.clone()));
        Ok(message)
    }

    async fn purge_order_messages(&self, order_id: &OrderId) -> Result<u64, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let purged = messages::purge_order_messages(order_id, &mut conn).await?;
        self.feed.publish(StoreEvent::OrderMessagesPurged(order_id.clone()));
        Ok(purged)
    }

    async fn contacts_for_user(&self, user_id: i64) -> Result<Vec<User>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        messages::contacts_for_user(user_id, &mut conn).await
    }

    fn subscribe(&self, filter: FeedFilter) -> FeedSubscription {
        self.feed.subscribe(filter)
    }
}

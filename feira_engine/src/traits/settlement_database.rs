use thiserror::Error;

use crate::db_types::{NewOrder, Order, OrderId, Payout, Product, User};

/// Record-store contract for the settlement saga and the order lifecycle state machine.
#[allow(async_fn_in_trait)]
pub trait SettlementDatabase: Clone {
    /// The URL of the backing store.
    fn url(&self) -> &str;

    async fn fetch_user(&self, user_id: i64) -> Result<Option<User>, StoreError>;

    async fn fetch_product(&self, product_id: i64) -> Result<Option<Product>, StoreError>;

    async fn fetch_order_by_order_id(&self, order_id: &OrderId) -> Result<Option<Order>, StoreError>;

    /// All orders in which the user appears as buyer or seller, newest first.
    async fn fetch_orders_for_user(&self, user_id: i64) -> Result<Vec<Order>, StoreError>;

    /// Settles an order in a single atomic transaction:
    /// * decrement the product's stock via the guarded conditional update (`quantity > 0`),
    /// * insert the order record with status `Paid`,
    /// * insert a `Pending` row in the payout ledger.
    ///
    /// The call is idempotent on `order.order_id`: if the order already exists, nothing is
    /// written (in particular, stock is not decremented twice) and the stored order is returned
    /// with `false` in the second position.
    ///
    /// Fails with [`StoreError::SoldOut`] when the stock guard rejects the decrement; in that
    /// case no order row is left behind.
    async fn settle_order(&self, order: NewOrder) -> Result<(Order, bool), StoreError>;

    async fn fetch_payout(&self, order_id: &OrderId) -> Result<Option<Payout>, StoreError>;

    /// All payouts still waiting for a successful gateway withdrawal, oldest first.
    async fn fetch_pending_payouts(&self) -> Result<Vec<Payout>, StoreError>;

    /// Increments the attempt counter for the payout. Called before each withdrawal attempt so
    /// the ledger records how often a transfer has been tried.
    async fn record_payout_attempt(&self, order_id: &OrderId) -> Result<Payout, StoreError>;

    /// Marks the payout `Sent`. Guarded on the current status being `Pending`, so a payout can
    /// never be submitted twice; marking an already-`Sent` payout is a no-op that returns the
    /// stored row.
    async fn mark_payout_sent(&self, order_id: &OrderId) -> Result<Payout, StoreError>;

    /// The single allowed lifecycle transition, `Paid` → `Delivered`, as a guarded conditional
    /// update. Fails with [`StoreError::AlreadyDelivered`] if the order is not currently `Paid`,
    /// so two racing delivery confirmations cannot both succeed.
    async fn mark_delivered(&self, order_id: &OrderId) -> Result<Order, StoreError>;

    /// Closes the store connection.
    async fn close(&mut self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("Internal record store error: {0}")]
    DatabaseError(String),
    #[error("The requested user {0} does not exist")]
    UserNotFound(i64),
    #[error("The requested product {0} does not exist")]
    ProductNotFound(i64),
    #[error("The requested order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("Product {0} is sold out")]
    SoldOut(i64),
    #[error("Order {0} has already been delivered")]
    AlreadyDelivered(OrderId),
    #[error("No payout ledger entry exists for order {0}")]
    PayoutNotFound(OrderId),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::DatabaseError(e.to_string())
    }
}

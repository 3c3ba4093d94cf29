use thiserror::Error;

use crate::{
    db_types::OrderId,
    gateway_types::PaymentStatus,
    traits::{GatewayError, StoreError},
};

#[derive(Debug, Error)]
pub enum SettlementError {
    #[error("Payment gateway error: {0}")]
    Gateway(#[from] GatewayError),
    #[error("Payment {0} has not been captured yet (status: {1})")]
    NotYetPaid(String, PaymentStatus),
    #[error("Product {0} is sold out")]
    SoldOut(i64),
    #[error("User {0} does not exist")]
    UserNotFound(i64),
    #[error("Product {0} does not exist")]
    ProductNotFound(i64),
    #[error("User {0} is suspended and may not trade")]
    SuspendedUser(i64),
    #[error("Order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("Record store error: {0}")]
    Store(StoreError),
}

// SoldOut and the not-found variants get their own error so callers can match on them without
// digging through the store layer.
impl From<StoreError> for SettlementError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::SoldOut(product_id) => SettlementError::SoldOut(product_id),
            StoreError::UserNotFound(user_id) => SettlementError::UserNotFound(user_id),
            StoreError::ProductNotFound(product_id) => SettlementError::ProductNotFound(product_id),
            StoreError::OrderNotFound(order_id) => SettlementError::OrderNotFound(order_id),
            other => SettlementError::Store(other),
        }
    }
}

impl SettlementError {
    /// True for errors worth another poll attempt: the gateway being unreachable, or the payment
    /// simply not having been captured yet.
    pub fn is_retryable(&self) -> bool {
        match self {
            SettlementError::Gateway(e) => e.is_transient(),
            SettlementError::NotYetPaid(_, _) => true,
            _ => false,
        }
    }
}

use thiserror::Error;

use crate::{db_types::OrderId, traits::StoreError};

#[derive(Debug, Error)]
pub enum FulfilmentError {
    #[error("Order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("User {0} is not the seller on this order")]
    NotSeller(i64),
    #[error("Order {0} has already been delivered")]
    AlreadyDelivered(OrderId),
    #[error("Record store error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for FulfilmentError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::OrderNotFound(order_id) => FulfilmentError::OrderNotFound(order_id),
            StoreError::AlreadyDelivered(order_id) => FulfilmentError::AlreadyDelivered(order_id),
            other => FulfilmentError::Store(other),
        }
    }
}

use thiserror::Error;

use crate::{db_types::OrderId, traits::StoreError};

#[derive(Debug, Error)]
pub enum MessagingError {
    #[error("User {0} is not a participant in this conversation")]
    NotAuthorized(i64),
    #[error("Order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("User {0} does not exist")]
    UserNotFound(i64),
    #[error("User {0} is suspended and may not send messages")]
    SuspendedUser(i64),
    #[error("This conversation has been closed")]
    ConversationClosed,
    #[error("Record store error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for MessagingError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::OrderNotFound(order_id) => MessagingError::OrderNotFound(order_id),
            StoreError::UserNotFound(user_id) => MessagingError::UserNotFound(user_id),
            other => MessagingError::Store(other),
        }
    }
}

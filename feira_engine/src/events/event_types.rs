use feira_common::Money;
use serde::{Deserialize, Serialize};

use crate::db_types::{Order, OrderId};

/// Fired once for every newly settled order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPaidEvent {
    pub order: Order,
}

impl OrderPaidEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}

/// Fired when a payment was captured but the stock guard rejected the settlement.
///
/// There is no gateway refund API to call; this event is the compensation seam. Whatever is
/// listening (today: an operator alert) owes the buyer their money back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundRequiredEvent {
    pub intent_id: String,
    pub buyer_id: i64,
    pub product_id: i64,
    pub amount: Money,
}

/// Fired when a payout withdrawal failed and the ledger entry stays `Pending`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutPendingEvent {
    pub order_id: OrderId,
    pub seller_id: i64,
    pub amount: Money,
    pub attempts: i64,
}

/// Fired when the seller confirms delivery and the order reaches its terminal state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDeliveredEvent {
    pub order: Order,
}

impl OrderDeliveredEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}

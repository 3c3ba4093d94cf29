use log::*;
use tokio::time::sleep;

use crate::{
    config::PollPolicy,
    db_types::{NewOrder, Order, OrderId, PayoutStatus, Product, User},
    events::{EventProducers, OrderPaidEvent, PayoutPendingEvent, RefundRequiredEvent},
    gateway_types::PaymentIntent,
    settlement::SettlementError,
    traits::{PaymentGateway, SettlementDatabase},
};

/// A fresh checkout: the intent the buyer has to pay, plus the product snapshot it was priced
/// against.
#[derive(Debug, Clone)]
pub struct Checkout {
    pub intent: PaymentIntent,
    pub product: Product,
}

pub struct SettlementApi<B, G> {
    db: B,
    gateway: G,
    producers: EventProducers,
}

impl<B, G> SettlementApi<B, G>
where
    B: SettlementDatabase,
    G: PaymentGateway,
{
    pub fn new(db: B, gateway: G) -> Self {
        Self { db, gateway, producers: EventProducers::default() }
    }

    pub fn with_producers(mut self, producers: EventProducers) -> Self {
        self.producers = producers;
        self
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    /// Starts a checkout for one unit of the product.
    ///
    /// Validates the buyer and the stock up front and asks the gateway for a payment intent. No
    /// stock is reserved here; reservation happens atomically in [`Self::confirm`] once the
    /// payment is captured, so an abandoned checkout holds nothing.
    pub async fn initiate(&self, buyer_id: i64, product_id: i64) -> Result<Checkout, SettlementError> {
        let buyer = self.fetch_active_user(buyer_id).await?;
        let product =
            self.db.fetch_product(product_id).await?.ok_or(SettlementError::ProductNotFound(product_id))?;
        if !product.in_stock() {
            return Err(SettlementError::SoldOut(product_id));
        }
        let description = format!("{} - pedido de {}", product.title, buyer.handle);
        let intent = self.gateway.create_payment(product.price, &description).await?;
        info!(
            "🛒️ Checkout started. Intent [{}] for {} covers product #{product_id} for buyer #{buyer_id}",
            intent.id, intent.amount
        );
        Ok(Checkout { intent, product })
    }

    /// Confirms a payment and settles the order.
    ///
    /// Polls the gateway once; only a `Completed` capture settles, anything else is
    /// [`SettlementError::NotYetPaid`] with no side effects. On capture the order is settled in a
    /// single store transaction keyed on the intent id, so confirming the same intent twice
    /// returns the same order and touches stock exactly once.
    ///
    /// If the stock guard rejects the settlement the buyer has paid for a unit that no longer
    /// exists, and a refund event is emitted before the error is returned.
    pub async fn confirm(
        &self,
        intent_id: &str,
        buyer_id: i64,
        product_id: i64,
        shipping_address: Option<String>,
    ) -> Result<Order, SettlementError> {
        let status = self.gateway.payment_status(intent_id).await?;
        if !status.is_settled() {
            debug!("🛒️ Intent [{intent_id}] is not captured yet ({status}). Nothing was settled.");
            return Err(SettlementError::NotYetPaid(intent_id.to_string(), status));
        }
        let product =
            self.db.fetch_product(product_id).await?.ok_or(SettlementError::ProductNotFound(product_id))?;
        let order_id = OrderId::from(intent_id);
        let mut new_order = NewOrder::new(order_id, buyer_id, &product);
        if let Some(address) = shipping_address {
            new_order = new_order.with_shipping_address(address);
        }
        let (order, newly_settled) = match self.db.settle_order(new_order).await {
            Ok(result) => result,
            Err(e @ crate::traits::StoreError::SoldOut(_)) => {
                warn!(
                    "🛒️ Payment [{intent_id}] was captured but product #{product_id} sold out before settlement. \
                     The buyer must be refunded."
                );
                let event = RefundRequiredEvent { intent_id: intent_id.to_string(), buyer_id, product_id, amount: product.price };
                for producer in &self.producers.refund_required_producer {
                    producer.publish_event(event.clone()).await;
                }
                return Err(e.into());
            },
            Err(e) => return Err(e.into()),
        };
        if newly_settled {
            info!("🛒️ Order [{}] settled for {} (buyer #{buyer_id}, seller #{})", order.order_id, order.price, order.seller_id);
            for producer in &self.producers.order_paid_producer {
                producer.publish_event(OrderPaidEvent::new(order.clone())).await;
            }
            self.try_submit_payout(&order).await;
        } else {
            debug!("🛒️ Order [{}] was already settled. Returning the stored order.", order.order_id);
        }
        Ok(order)
    }

    /// [`Self::confirm`] wrapped in the polling back-off schedule. Retries while the payment is
    /// merely not captured yet or the gateway is unreachable; any other error is final.
    pub async fn confirm_with_retry(
        &self,
        intent_id: &str,
        buyer_id: i64,
        product_id: i64,
        shipping_address: Option<String>,
        policy: PollPolicy,
    ) -> Result<Order, SettlementError> {
        let mut attempt = 1;
        loop {
            sleep(policy.delay_for_attempt(attempt)).await;
            match self.confirm(intent_id, buyer_id, product_id, shipping_address.clone()).await {
                Ok(order) => return Ok(order),
                Err(e) if e.is_retryable() && attempt < policy.max_attempts => {
                    debug!("🛒️ Attempt {attempt}/{} for intent [{intent_id}]: {e}. Retrying.", policy.max_attempts);
                    attempt += 1;
                },
                Err(e) => return Err(e),
            }
        }
    }

    /// Re-submits every payout still `Pending` in the ledger. Returns the order ids of the
    /// payouts that went through this time.
    pub async fn retry_pending_payouts(&self) -> Result<Vec<OrderId>, SettlementError> {
        let pending = self.db.fetch_pending_payouts().await?;
        if pending.is_empty() {
            return Ok(Vec::new());
        }
        info!("💸️ Retrying {} pending payout(s)", pending.len());
        let mut sent = Vec::new();
        for payout in pending {
            let order = self
                .db
                .fetch_order_by_order_id(&payout.order_id)
                .await?
                .ok_or(SettlementError::OrderNotFound(payout.order_id.clone()))?;
            self.try_submit_payout(&order).await;
            if let Some(updated) = self.db.fetch_payout(&order.order_id).await? {
                if updated.status == PayoutStatus::Sent {
                    sent.push(order.order_id.clone());
                }
            }
        }
        Ok(sent)
    }

    /// Submits the payout withdrawal for a settled order. Best effort: on failure the ledger
    /// entry stays `Pending`, a [`PayoutPendingEvent`] fires, and the settlement stands.
    async fn try_submit_payout(&self, order: &Order) {
        let payout = match self.db.fetch_payout(&order.order_id).await {
            Ok(Some(payout)) => payout,
            Ok(None) => {
                error!("💸️ No payout ledger entry for settled order [{}]. This should never happen.", order.order_id);
                return;
            },
            Err(e) => {
                warn!("💸️ Could not load the payout for order [{}]: {e}", order.order_id);
                return;
            },
        };
        if payout.status != PayoutStatus::Pending {
            trace!("💸️ Payout for order [{}] is already {}. Nothing to do.", order.order_id, payout.status);
            return;
        }
        let attempts = match self.db.record_payout_attempt(&order.order_id).await {
            Ok(payout) => payout.attempts,
            Err(e) => {
                warn!("💸️ Could not record the payout attempt for order [{}]: {e}", order.order_id);
                return;
            },
        };
        match self.gateway.create_withdraw(payout.amount, &payout.pix_key, payout.pix_key_kind).await {
            Ok(receipt) => match self.db.mark_payout_sent(&order.order_id).await {
                Ok(_) => {
                    info!(
                        "💸️ Payout of {} for order [{}] sent to seller #{} (receipt {})",
                        payout.amount, order.order_id, payout.seller_id, receipt.receipt_id
                    );
                },
                Err(e) => {
                    // The transfer went out but the ledger could not be updated. The status guard
                    // on mark_sent keeps a later retry from paying twice.
                    error!("💸️ Payout for order [{}] was sent but could not be marked: {e}", order.order_id);
                },
            },
            Err(e) => {
                warn!(
                    "💸️ Payout withdrawal for order [{}] failed on attempt {attempts}: {e}. The ledger entry stays \
                     pending.",
                    order.order_id
                );
                let event = PayoutPendingEvent {
                    order_id: order.order_id.clone(),
                    seller_id: payout.seller_id,
                    amount: payout.amount,
                    attempts,
                };
                for producer in &self.producers.payout_pending_producer {
                    producer.publish_event(event.clone()).await;
                }
            },
        }
    }

    async fn fetch_active_user(&self, user_id: i64) -> Result<User, SettlementError> {
        let user = self.db.fetch_user(user_id).await?.ok_or(SettlementError::UserNotFound(user_id))?;
        if user.is_suspended() {
            return Err(SettlementError::SuspendedUser(user_id));
        }
        Ok(user)
    }
}

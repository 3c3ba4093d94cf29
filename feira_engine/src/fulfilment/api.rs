use log::*;

use crate::{
    db_types::{Order, OrderId},
    events::{EventProducers, OrderDeliveredEvent},
    fulfilment::FulfilmentError,
    traits::{MessageManagement, SettlementDatabase},
};

pub struct FulfilmentApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> FulfilmentApi<B>
where B: SettlementDatabase + MessageManagement
{
    pub fn new(db: B) -> Self {
        Self { db, producers: EventProducers::default() }
    }

    pub fn with_producers(mut self, producers: EventProducers) -> Self {
        self.producers = producers;
        self
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    /// Marks the order `Delivered` and purges its conversation.
    ///
    /// Only the seller on the order may confirm delivery. The status update is guarded, so two
    /// racing confirmations resolve to exactly one success and one
    /// [`FulfilmentError::AlreadyDelivered`].
    ///
    /// The purge runs after the status is committed. It is retried once on failure; if it still
    /// fails the delivery stands and the leftover messages are logged for a later sweep.
    pub async fn confirm_delivery(&self, order_id: &OrderId, seller_id: i64) -> Result<Order, FulfilmentError> {
        let order = self
            .db
            .fetch_order_by_order_id(order_id)
            .await?
            .ok_or_else(|| FulfilmentError::OrderNotFound(order_id.clone()))?;
        if order.seller_id != seller_id {
            warn!("📦️ User #{seller_id} tried to confirm delivery on order [{order_id}] they do not sell");
            return Err(FulfilmentError::NotSeller(seller_id));
        }
        let delivered = self.db.mark_delivered(order_id).await?;
        info!("📦️ Order [{order_id}] delivered by seller #{seller_id}");
        self.purge_conversation(order_id).await;
        for producer in &self.producers.order_delivered_producer {
            producer.publish_event(OrderDeliveredEvent::new(delivered.clone())).await;
        }
        Ok(delivered)
    }

    async fn purge_conversation(&self, order_id: &OrderId) {
        for attempt in 1..=2 {
            match self.db.purge_order_messages(order_id).await {
                Ok(purged) => {
                    debug!("📦️ Purged {purged} message(s) for delivered order [{order_id}]");
                    return;
                },
                Err(e) if attempt == 1 => {
                    warn!("📦️ Purging messages for order [{order_id}] failed: {e}. Retrying once.");
                },
                Err(e) => {
                    error!(
                        "📦️ Purging messages for order [{order_id}] failed twice: {e}. The delivery stands; the \
                         conversation must be swept up manually."
                    );
                },
            }
        }
    }
}

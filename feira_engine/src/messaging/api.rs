use log::*;

use crate::{
    db_types::{OrderStatusType, User},
    feed::FeedFilter,
    messaging::{ChatMessage, Conversation, ConversationKey, MessagingError},
    traits::{MessageManagement, SettlementDatabase},
};

pub struct MessagingApi<B> {
    db: B,
}

impl<B> MessagingApi<B>
where B: MessageManagement + SettlementDatabase
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    /// Opens a live conversation view for the viewer.
    ///
    /// Only participants may open a thread: for an order conversation the buyer and the seller,
    /// for a direct thread the two users of the pair. Order conversations on delivered orders
    /// are closed for good and cannot be reopened.
    ///
    /// The returned [`Conversation`] is already subscribed to the change feed, so no message
    /// published after the snapshot is missed.
    pub async fn open(&self, key: ConversationKey, viewer_id: i64) -> Result<Conversation<B>, MessagingError> {
        let filter = match &key {
            ConversationKey::Order(order_id) => {
                let order = self
                    .db
                    .fetch_order_by_order_id(order_id)
                    .await?
                    .ok_or_else(|| MessagingError::OrderNotFound(order_id.clone()))?;
                if order.buyer_id != viewer_id && order.seller_id != viewer_id {
                    warn!("📬️ User #{viewer_id} tried to open the conversation of order [{order_id}] they are not on");
                    return Err(MessagingError::NotAuthorized(viewer_id));
                }
                if order.status == OrderStatusType::Delivered {
                    return Err(MessagingError::ConversationClosed);
                }
                FeedFilter::Order(order_id.clone())
            },
            ConversationKey::Direct(a, b) => {
                if !key.involves(viewer_id) {
                    return Err(MessagingError::NotAuthorized(viewer_id));
                }
                let peer_id = if *a == viewer_id { *b } else { *a };
                self.db.fetch_user(peer_id).await?.ok_or(MessagingError::UserNotFound(peer_id))?;
                FeedFilter::peers(*a, *b)
            },
        };
        // Subscribe before the snapshot read. An event for a message the snapshot already
        // contains reconciles by client_ref; a message missed between the two would not.
        let subscription = self.db.subscribe(filter);
        let snapshot: Vec<ChatMessage> = match &key {
            ConversationKey::Order(order_id) => self
                .db
                .order_message_log(order_id)
                .await?
                .into_iter()
                .map(ChatMessage::from)
                .collect(),
            ConversationKey::Direct(a, b) => self
                .db
                .direct_message_log(*a, *b)
                .await?
                .into_iter()
                .map(ChatMessage::from)
                .collect(),
        };
        debug!("📬️ Conversation {key:?} opened for viewer #{viewer_id} with {} message(s)", snapshot.len());
        Ok(Conversation::start(key, viewer_id, self.db.clone(), snapshot, subscription))
    }

    /// Everyone the user has exchanged direct messages with, most recent thread first.
    pub async fn contacts(&self, user_id: i64) -> Result<Vec<User>, MessagingError> {
        self.db.fetch_user(user_id).await?.ok_or(MessagingError::UserNotFound(user_id))?;
        let contacts = self.db.contacts_for_user(user_id).await?;
        Ok(contacts)
    }
}

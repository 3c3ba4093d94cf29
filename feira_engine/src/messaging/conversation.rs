use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use log::*;
use rand::{distributions::Alphanumeric, Rng};
use tokio::task::JoinHandle;

use crate::{
    db_types::{DirectMessage, NewDirectMessage, NewOrderMessage, OrderId, OrderMessage},
    feed::{FeedSubscription, StoreEvent},
    messaging::MessagingError,
    traits::{MessageManagement, SettlementDatabase},
};

/// Identifies one message thread: either the conversation attached to an order, or the direct
/// thread between an unordered pair of users.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversationKey {
    Order(OrderId),
    Direct(i64, i64),
}

impl ConversationKey {
    /// Key for the direct thread between two users. The pair is unordered; both argument orders
    /// produce the same key.
    pub fn direct(user_a: i64, user_b: i64) -> Self {
        if user_a <= user_b {
            ConversationKey::Direct(user_a, user_b)
        } else {
            ConversationKey::Direct(user_b, user_a)
        }
    }

    pub fn involves(&self, user_id: i64) -> bool {
        match self {
            ConversationKey::Order(_) => false,
            ConversationKey::Direct(a, b) => *a == user_id || *b == user_id,
        }
    }
}

/// One entry of a conversation view.
///
/// `confirmed` distinguishes a durable row from a local optimistic echo: an echo has no `id` and
/// flips to confirmed (gaining the store-assigned id and timestamp) as soon as the write or the
/// matching feed event lands, whichever comes first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub id: Option<i64>,
    pub sender_id: i64,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub client_ref: String,
    pub confirmed: bool,
}

impl From<OrderMessage> for ChatMessage {
    fn from(m: OrderMessage) -> Self {
        Self {
            id: Some(m.id),
            sender_id: m.sender_id,
            content: m.content,
            created_at: m.created_at,
            client_ref: m.client_ref,
            confirmed: true,
        }
    }
}

impl From<DirectMessage> for ChatMessage {
    fn from(m: DirectMessage) -> Self {
        Self {
            id: Some(m.id),
            sender_id: m.sender_id,
            content: m.content,
            created_at: m.created_at,
            client_ref: m.client_ref,
            confirmed: true,
        }
    }
}

/// A live view over one conversation for one viewer.
///
/// Holds the synchronized message log and a background pump task that applies change-feed events
/// to it. Dropping the conversation (or calling [`Conversation::close`]) stops the pump and
/// releases the feed subscription.
#[derive(Debug)]
pub struct Conversation<B> {
    key: ConversationKey,
    viewer_id: i64,
    db: B,
    log: Arc<Mutex<Vec<ChatMessage>>>,
    pump: Option<JoinHandle<()>>,
}

impl<B> Conversation<B>
where B: MessageManagement + SettlementDatabase
{
    pub(crate) fn start(
        key: ConversationKey,
        viewer_id: i64,
        db: B,
        snapshot: Vec<ChatMessage>,
        subscription: FeedSubscription,
    ) -> Self {
        let log = Arc::new(Mutex::new(snapshot));
        let pump = tokio::spawn(run_pump(subscription, Arc::clone(&log)));
        Self { key, viewer_id, db, log, pump: Some(pump) }
    }

    pub fn key(&self) -> &ConversationKey {
        &self.key
    }

    pub fn viewer_id(&self) -> i64 {
        self.viewer_id
    }

    /// Current contents of the log, oldest first. Includes unconfirmed echoes.
    pub fn messages(&self) -> Vec<ChatMessage> {
        self.log.lock().unwrap().clone()
    }

    /// Sends a message into this conversation.
    ///
    /// The message appears in the local log immediately as an optimistic echo, then is written to
    /// the store. A failed write takes the echo back out and returns the error, so the log never
    /// shows a message that was not durably accepted.
    pub async fn send(&self, content: &str) -> Result<ChatMessage, MessagingError> {
        if self.pump.is_none() {
            return Err(MessagingError::ConversationClosed);
        }
        let sender = self
            .db
            .fetch_user(self.viewer_id)
            .await
            .map_err(MessagingError::from)?
            .ok_or(MessagingError::UserNotFound(self.viewer_id))?;
        if sender.is_suspended() {
            return Err(MessagingError::SuspendedUser(self.viewer_id));
        }
        let client_ref = new_client_ref();
        let echo = ChatMessage {
            id: None,
            sender_id: self.viewer_id,
            content: content.to_string(),
            created_at: Utc::now(),
            client_ref: client_ref.clone(),
            confirmed: false,
        };
        self.log.lock().unwrap().push(echo);
        let stored = match &self.key {
            ConversationKey::Order(order_id) => self
                .db
                .insert_order_message(NewOrderMessage {
                    order_id: order_id.clone(),
                    sender_id: self.viewer_id,
                    content: content.to_string(),
                    client_ref: client_ref.clone(),
                })
                .await
                .map(ChatMessage::from),
            ConversationKey::Direct(a, b) => {
                let receiver_id = if *a == self.viewer_id { *b } else { *a };
                self.db
                    .insert_direct_message(NewDirectMessage {
                        sender_id: self.viewer_id,
                        receiver_id,
                        content: content.to_string(),
                        client_ref: client_ref.clone(),
                    })
                    .await
                    .map(ChatMessage::from)
            },
        };
        match stored {
            Ok(message) => {
                apply(&self.log, message.clone());
                trace!("📬️ Message {client_ref} confirmed in conversation {:?}", self.key);
                Ok(message)
            },
            Err(e) => {
                self.log.lock().unwrap().retain(|m| m.client_ref != client_ref);
                warn!("📬️ Message {client_ref} was rejected by the store and rolled back: {e}");
                Err(e.into())
            },
        }
    }

    /// Stops the pump and releases the feed subscription. Idempotent; the log stays readable.
    pub fn close(&mut self) {
        if let Some(pump) = self.pump.take() {
            pump.abort();
            debug!("📬️ Conversation {:?} closed for viewer #{}", self.key, self.viewer_id);
        }
    }

    pub fn is_closed(&self) -> bool {
        self.pump.is_none()
    }
}

impl<B> Drop for Conversation<B> {
    fn drop(&mut self) {
        if let Some(pump) = self.pump.take() {
            pump.abort();
        }
    }
}

async fn run_pump(mut subscription: FeedSubscription, log: Arc<Mutex<Vec<ChatMessage>>>) {
    while let Some(event) = subscription.recv().await {
        match event {
            StoreEvent::OrderMessageInserted(m) => apply(&log, ChatMessage::from(m)),
            StoreEvent::DirectMessageInserted(m) => apply(&log, ChatMessage::from(m)),
            StoreEvent::OrderMessagesPurged(order_id) => {
                debug!("📬️ Conversation for order [{order_id}] was purged. Clearing the local log.");
                log.lock().unwrap().clear();
            },
        }
    }
}

// Reconciliation point between the echo and the feed. Whichever path delivers the confirmed row
// first wins; the other finds the client_ref already present and updates in place.
fn apply(log: &Mutex<Vec<ChatMessage>>, incoming: ChatMessage) {
    let mut log = log.lock().unwrap();
    match log.iter_mut().find(|m| m.client_ref == incoming.client_ref) {
        Some(existing) => *existing = incoming,
        None => log.push(incoming),
    }
}

fn new_client_ref() -> String {
    rand::thread_rng().sample_iter(&Alphanumeric).take(16).map(char::from).collect()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn direct_keys_normalize_the_pair() {
        assert_eq!(ConversationKey::direct(7, 3), ConversationKey::direct(3, 7));
        assert!(ConversationKey::direct(7, 3).involves(7));
        assert!(!ConversationKey::direct(7, 3).involves(4));
    }

    #[test]
    fn apply_replaces_an_echo_in_place() {
        let log = Mutex::new(vec![ChatMessage {
            id: None,
            sender_id: 1,
            content: "oi".to_string(),
            created_at: Utc::now(),
            client_ref: "abc".to_string(),
            confirmed: false,
        }]);
        apply(&log, ChatMessage {
            id: Some(42),
            sender_id: 1,
            content: "oi".to_string(),
            created_at: Utc::now(),
            client_ref: "abc".to_string(),
            confirmed: true,
        });
        let entries = log.lock().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, Some(42));
        assert!(entries[0].confirmed);
    }

    #[test]
    fn apply_appends_remote_messages() {
        let log = Mutex::new(Vec::new());
        apply(&log, ChatMessage {
            id: Some(1),
            sender_id: 2,
            content: "chegou?".to_string(),
            created_at: Utc::now(),
            client_ref: "xyz".to_string(),
            confirmed: true,
        });
        assert_eq!(log.lock().unwrap().len(), 1);
    }
}

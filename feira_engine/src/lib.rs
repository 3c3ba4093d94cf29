//! Feira Engine
//!
//! The Feira engine is the settlement and messaging core of a peer-to-peer marketplace. It drives
//! an order from checkout through payment capture, atomic stock reservation and seller payout,
//! owns the single lifecycle transition from `Paid` to `Delivered`, and keeps every open
//! conversation view synchronized with the message store.
//!
//! The library is divided into three main sections:
//! 1. The record store ([`mod@sqlite`]). Sqlite is the backing store. You should never need to
//!    access the database directly; use the APIs instead. The exception is the data types used in
//!    the database, defined in the public `db_types` module.
//! 2. The store contracts ([`mod@traits`]) and the gateway contract. The [`SettlementApi`],
//!    [`FulfilmentApi`] and [`MessagingApi`] are generic over these, so tests (and any future
//!    backend) can swap in their own implementations.
//! 3. The public APIs: [`settlement`](mod@settlement) for the checkout saga,
//!    [`fulfilment`](mod@fulfilment) for delivery, and [`messaging`](mod@messaging) for live
//!    conversation views backed by the change [`feed`](mod@feed).
//!
//! The engine also emits hook events at the settlement seams (order paid, refund required,
//! payout pending, order delivered). A simple actor framework in [`mod@events`] lets callers
//! attach async handlers to these without blocking the flows that emit them.
pub mod config;
pub mod db_types;
pub mod events;
pub mod feed;
pub mod fulfilment;
pub mod gateway_types;
pub mod messaging;
pub mod settlement;
mod sqlite;
pub mod traits;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

pub use fulfilment::{FulfilmentApi, FulfilmentError};
pub use messaging::{ChatMessage, Conversation, ConversationKey, MessagingApi, MessagingError};
pub use settlement::{SettlementApi, SettlementError};
pub use sqlite::SqliteDatabase;
pub use traits::{MessageManagement, PaymentGateway, SettlementDatabase};

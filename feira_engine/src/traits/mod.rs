//! # External-collaborator seams.
//!
//! The core treats the record store and the payment gateway as collaborators behind traits, so
//! backends can be swapped (and mocked) without touching the saga or the messaging engine.
//!
//! * [`SettlementDatabase`] is the record-store contract the settlement saga and the order
//!   lifecycle drive: point reads, the atomic `settle_order` write, the payout ledger, and the
//!   guarded paid→delivered transition.
//! * [`MessageManagement`] is the record-store contract for the two conversation kinds: snapshot
//!   reads, append-only inserts, the order-scoped bulk purge, contact derivation, and the
//!   filtered change-feed subscription.
//! * [`PaymentGateway`] is the instant-payment rail: intent creation, status polls, and payout
//!   withdrawals.

mod message_management;
mod payment_gateway;
mod settlement_database;

pub use message_management::MessageManagement;
pub use payment_gateway::{GatewayError, PaymentGateway};
pub use settlement_database::{SettlementDatabase, StoreError};

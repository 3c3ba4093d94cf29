//! The settlement saga.
//!
//! [`SettlementApi`] drives an order from checkout to settled: it creates the payment intent,
//! confirms the capture against the gateway, and runs the atomic settle step (stock reservation,
//! order insert, payout ledger entry) against the record store. The payout withdrawal is
//! submitted on a best-effort basis after settlement; failed withdrawals stay in the ledger and
//! are retried by [`SettlementApi::retry_pending_payouts`].

mod api;
mod errors;

pub use api::{Checkout, SettlementApi};
pub use errors::SettlementError;

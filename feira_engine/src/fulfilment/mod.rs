//! Order fulfilment.
//!
//! One lifecycle transition exists, `Paid` to `Delivered`, and only the seller may trigger it.
//! Delivery also purges the order's conversation, since a delivered order has no further need
//! for its negotiation thread.

mod api;
mod errors;

pub use api::FulfilmentApi;
pub use errors::FulfilmentError;

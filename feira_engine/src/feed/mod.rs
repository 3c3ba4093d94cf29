//! The live change feed over the record store.
//!
//! Every successful message write (and the delivery-time purge) is published as a
//! [`StoreEvent`]. Consumers subscribe with an equality [`FeedFilter`] (order id, or the
//! unordered peer pair) and receive only the events their filter covers, in write order.
//!
//! Subscriptions live in an explicit [`FeedRegistry`] keyed by subscription id. Closing is
//! idempotent, dropping a [`FeedSubscription`] closes it too, and dead receivers are pruned on
//! publish, so open/close churn cannot accumulate listeners.

mod registry;
mod store_event;

pub use registry::{FeedRegistry, FeedSubscription, SubscriptionId};
pub use store_event::{FeedFilter, StoreEvent};

//! Stateless pub-sub hooks for settlement and fulfilment events.
//!
//! Components can register async handlers for the events the engine emits (an order settling, a
//! payout getting stuck, a refund becoming necessary, a delivery confirmation) without access to
//! any internal engine state. All a handler receives is the event itself.

mod channel;
mod event_types;
mod hooks;

pub use channel::{EventHandler, EventProducer, Handler};
pub use event_types::{OrderDeliveredEvent, OrderPaidEvent, PayoutPendingEvent, RefundRequiredEvent};
pub use hooks::{EventHandlers, EventHooks, EventProducers};

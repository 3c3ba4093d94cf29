use feira_common::Money;
use thiserror::Error;

use crate::{
    db_types::PixKeyKind,
    gateway_types::{PaymentIntent, PaymentStatus, WithdrawResult},
};

/// The instant-payment rail. Polled, never pushed: the engine asks for an intent's status, the
/// gateway does not call back.
#[allow(async_fn_in_trait)]
pub trait PaymentGateway: Clone {
    /// Requests a new payment intent for the given amount, tagged with a human description.
    async fn create_payment(&self, amount: Money, description: &str) -> Result<PaymentIntent, GatewayError>;

    /// Current status of an intent.
    async fn payment_status(&self, intent_id: &str) -> Result<PaymentStatus, GatewayError>;

    /// Issues a payout transfer to the given Pix key.
    async fn create_withdraw(
        &self,
        amount: Money,
        pix_key: &str,
        kind: PixKeyKind,
    ) -> Result<WithdrawResult, GatewayError>;
}

#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    /// The gateway understood the request and said no. Not worth retrying as-is.
    #[error("The payment gateway rejected the request: {0}")]
    Rejected(String),
    /// Transport-level trouble. Transient; safe to retry.
    #[error("The payment gateway could not be reached: {0}")]
    Unreachable(String),
    #[error("The payment gateway does not know intent {0}")]
    UnknownIntent(String),
}

impl GatewayError {
    pub fn is_transient(&self) -> bool {
        matches!(self, GatewayError::Unreachable(_))
    }
}

//! A scriptable in-memory stand-in for the payment rail.
//!
//! Each intent carries a queue of statuses; every status poll pops the next entry and the last
//! one sticks. Withdrawals are recorded and can be made to fail wholesale to exercise the payout
//! retry path.

use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex},
};

use chrono::Utc;
use feira_common::Money;

use crate::{
    db_types::PixKeyKind,
    gateway_types::{PaymentIntent, PaymentStatus, WithdrawResult},
    traits::{GatewayError, PaymentGateway},
};

#[derive(Clone, Default)]
pub struct MockGateway {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Default)]
struct Inner {
    next_intent: u64,
    statuses: HashMap<String, VecDeque<PaymentStatus>>,
    withdrawals: Vec<WithdrawResult>,
    fail_withdrawals: bool,
    unreachable: bool,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts the status sequence for an intent. Each poll consumes one entry; once the queue
    /// is down to a single status, that status is returned forever.
    pub fn set_statuses(&self, intent_id: &str, statuses: impl IntoIterator<Item = PaymentStatus>) {
        let mut inner = self.inner.lock().unwrap();
        inner.statuses.insert(intent_id.to_string(), statuses.into_iter().collect());
    }

    pub fn set_status(&self, intent_id: &str, status: PaymentStatus) {
        self.set_statuses(intent_id, [status]);
    }

    pub fn fail_withdrawals(&self, fail: bool) {
        self.inner.lock().unwrap().fail_withdrawals = fail;
    }

    /// When set, every call returns [`GatewayError::Unreachable`].
    pub fn set_unreachable(&self, unreachable: bool) {
        self.inner.lock().unwrap().unreachable = unreachable;
    }

    pub fn withdrawals(&self) -> Vec<WithdrawResult> {
        self.inner.lock().unwrap().withdrawals.clone()
    }

    fn check_reachable(&self) -> Result<(), GatewayError> {
        if self.inner.lock().unwrap().unreachable {
            return Err(GatewayError::Unreachable("mock gateway is offline".to_string()));
        }
        Ok(())
    }
}

impl PaymentGateway for MockGateway {
    async fn create_payment(&self, amount: Money, description: &str) -> Result<PaymentIntent, GatewayError> {
        self.check_reachable()?;
        let mut inner = self.inner.lock().unwrap();
        inner.next_intent += 1;
        let id = format!("pix_{}", inner.next_intent);
        inner.statuses.entry(id.clone()).or_insert_with(|| VecDeque::from([PaymentStatus::Pending]));
        Ok(PaymentIntent {
            id: id.clone(),
            amount,
            description: description.to_string(),
            qr_image: format!("iVBOR_{id}"),
            copy_paste_code: format!("00020126__{id}"),
            status: PaymentStatus::Pending,
            created_at: Utc::now(),
        })
    }

    async fn payment_status(&self, intent_id: &str) -> Result<PaymentStatus, GatewayError> {
        self.check_reachable()?;
        let mut inner = self.inner.lock().unwrap();
        let queue = inner
            .statuses
            .get_mut(intent_id)
            .ok_or_else(|| GatewayError::UnknownIntent(intent_id.to_string()))?;
        let status = if queue.len() > 1 {
            queue.pop_front().unwrap_or(PaymentStatus::Pending)
        } else {
            queue.front().cloned().unwrap_or(PaymentStatus::Pending)
        };
        Ok(status)
    }

    async fn create_withdraw(
        &self,
        amount: Money,
        pix_key: &str,
        kind: PixKeyKind,
    ) -> Result<WithdrawResult, GatewayError> {
        self.check_reachable()?;
        let mut inner = self.inner.lock().unwrap();
        if inner.fail_withdrawals {
            return Err(GatewayError::Rejected("withdrawals are disabled on this mock".to_string()));
        }
        let receipt = WithdrawResult {
            receipt_id: format!("rcpt_{}", inner.withdrawals.len() + 1),
            amount,
            pix_key: pix_key.to_string(),
            pix_key_kind: kind,
        };
        inner.withdrawals.push(receipt.clone());
        Ok(receipt)
    }
}

//! Data objects for the instant-payment rail.
//!
//! These mirror the gateway's wire shapes. Nothing here is persisted by the engine; a
//! [`PaymentIntent`](crate::gateway_types::PaymentIntent) lives only for the duration of one
//! checkout and is referenced afterwards solely by its id.

use std::fmt::Display;

use chrono::{DateTime, Utc};
use feira_common::Money;
use serde::{Deserialize, Serialize};

use crate::db_types::PixKeyKind;

//--------------------------------------   PaymentStatus    ----------------------------------------------------------
/// Gateway-defined intent statuses.
///
/// Only [`PaymentStatus::Completed`] is terminal-success. `Active` means the charge is visible to
/// the gateway but not yet settled; historically it was (incorrectly) treated as success, which is
/// why it gets its own variant rather than folding into `Unknown`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentStatus {
    Pending,
    Active,
    Completed,
    Expired,
    Cancelled,
    Unknown(String),
}

impl PaymentStatus {
    pub fn is_settled(&self) -> bool {
        matches!(self, PaymentStatus::Completed)
    }
}

impl Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentStatus::Pending => write!(f, "pending"),
            PaymentStatus::Active => write!(f, "active"),
            PaymentStatus::Completed => write!(f, "completed"),
            PaymentStatus::Expired => write!(f, "expired"),
            PaymentStatus::Cancelled => write!(f, "cancelled"),
            PaymentStatus::Unknown(s) => write!(f, "unknown({s})"),
        }
    }
}

impl From<&str> for PaymentStatus {
    fn from(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "pending" => Self::Pending,
            "active" => Self::Active,
            "completed" => Self::Completed,
            "expired" => Self::Expired,
            "cancelled" | "canceled" => Self::Cancelled,
            _ => Self::Unknown(value.to_string()),
        }
    }
}

//--------------------------------------   PaymentIntent    ----------------------------------------------------------
/// A charge issued by the gateway for one checkout: the QR image and copy-paste code are what the
/// buyer's app renders for the Pix transfer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    pub amount: Money,
    pub description: String,
    /// base64-encoded QR code image
    pub qr_image: String,
    pub copy_paste_code: String,
    pub status: PaymentStatus,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------   WithdrawResult   ----------------------------------------------------------
/// Receipt for an accepted payout transfer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawResult {
    pub receipt_id: String,
    pub amount: Money,
    pub pix_key: String,
    pub pix_key_kind: PixKeyKind,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn status_parsing_is_lenient() {
        assert_eq!(PaymentStatus::from("COMPLETED"), PaymentStatus::Completed);
        assert_eq!(PaymentStatus::from("canceled"), PaymentStatus::Cancelled);
        assert_eq!(PaymentStatus::from("charge_back"), PaymentStatus::Unknown("charge_back".to_string()));
    }

    #[test]
    fn only_completed_is_settled() {
        assert!(PaymentStatus::Completed.is_settled());
        for status in [
            PaymentStatus::Pending,
            PaymentStatus::Active,
            PaymentStatus::Expired,
            PaymentStatus::Cancelled,
            PaymentStatus::Unknown("weird".into()),
        ] {
            assert!(!status.is_settled(), "{status} must not settle an order");
        }
    }
}

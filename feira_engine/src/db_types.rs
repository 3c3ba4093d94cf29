use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use feira_common::Money;
use log::error;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("Invalid {0}: {1}")]
pub struct ConversionError(&'static str, String);

//--------------------------------------        Role        ----------------------------------------------------------
/// A capability tier, not a class hierarchy. Admins moderate, premium sellers list goods, buyers buy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum Role {
    Admin,
    PremiumSeller,
    Buyer,
}

impl Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Admin => write!(f, "Admin"),
            Role::PremiumSeller => write!(f, "PremiumSeller"),
            Role::Buyer => write!(f, "Buyer"),
        }
    }
}

impl FromStr for Role {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Admin" => Ok(Self::Admin),
            "PremiumSeller" => Ok(Self::PremiumSeller),
            "Buyer" => Ok(Self::Buyer),
            s => Err(ConversionError("role", s.to_string())),
        }
    }
}

//--------------------------------------     UserStatus     ----------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum UserStatus {
    Active,
    Suspended,
}

impl Display for UserStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UserStatus::Active => write!(f, "Active"),
            UserStatus::Suspended => write!(f, "Suspended"),
        }
    }
}

impl FromStr for UserStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Active" => Ok(Self::Active),
            "Suspended" => Ok(Self::Suspended),
            s => Err(ConversionError("user status", s.to_string())),
        }
    }
}

//--------------------------------------        User        ----------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub handle: String,
    pub role: Role,
    pub status: UserStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn is_suspended(&self) -> bool {
        self.status == UserStatus::Suspended
    }
}

//--------------------------------------     PixKeyKind     ----------------------------------------------------------
/// The kind of Pix key a seller registered for payouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum PixKeyKind {
    Cpf,
    Cnpj,
    Email,
    Phone,
    Random,
}

impl Display for PixKeyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PixKeyKind::Cpf => write!(f, "Cpf"),
            PixKeyKind::Cnpj => write!(f, "Cnpj"),
            PixKeyKind::Email => write!(f, "Email"),
            PixKeyKind::Phone => write!(f, "Phone"),
            PixKeyKind::Random => write!(f, "Random"),
        }
    }
}

impl FromStr for PixKeyKind {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Cpf" => Ok(Self::Cpf),
            "Cnpj" => Ok(Self::Cnpj),
            "Email" => Ok(Self::Email),
            "Phone" => Ok(Self::Phone),
            "Random" => Ok(Self::Random),
            s => Err(ConversionError("pix key kind", s.to_string())),
        }
    }
}

//--------------------------------------      Product       ----------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub seller_id: i64,
    pub title: String,
    pub price: Money,
    /// Non-negative stock count. Only ever decremented through the guarded conditional update.
    pub quantity: i64,
    pub pix_key: String,
    pub pix_key_kind: PixKeyKind,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub fn in_stock(&self) -> bool {
        self.quantity > 0
    }
}

//--------------------------------------       OrderId      ----------------------------------------------------------
/// The public order identifier, derived from the payment intent that settled it.
///
/// Because the intent id is assigned by the gateway exactly once per checkout, it doubles as the
/// settlement saga's idempotency key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct OrderId(pub String);

impl FromStr for OrderId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for OrderId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl OrderId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

//--------------------------------------   OrderStatusType  ----------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum OrderStatusType {
    /// The order has been settled: payment captured, stock reserved.
    Paid,
    /// The seller has confirmed delivery. Terminal; the order conversation is purged on entry.
    Delivered,
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatusType::Paid => write!(f, "Paid"),
            OrderStatusType::Delivered => write!(f, "Delivered"),
        }
    }
}

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Paid" => Ok(Self::Paid),
            "Delivered" => Ok(Self::Delivered),
            s => Err(ConversionError("order status", s.to_string())),
        }
    }
}

impl From<String> for OrderStatusType {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid order status: {value}. But this conversion cannot fail. Defaulting to Paid");
            OrderStatusType::Paid
        })
    }
}

//--------------------------------------       Order        ----------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub order_id: OrderId,
    pub buyer_id: i64,
    pub seller_id: i64,
    pub product_id: i64,
    /// Title snapshot at purchase time, decoupled from the live product record.
    pub product_title: String,
    /// Price snapshot at purchase time.
    pub price: Money,
    pub shipping_address: Option<String>,
    pub status: OrderStatusType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------      NewOrder      ----------------------------------------------------------
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub order_id: OrderId,
    pub buyer_id: i64,
    pub seller_id: i64,
    pub product_id: i64,
    pub product_title: String,
    pub price: Money,
    pub shipping_address: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl NewOrder {
    pub fn new(order_id: OrderId, buyer_id: i64, product: &Product) -> Self {
        Self {
            order_id,
            buyer_id,
            seller_id: product.seller_id,
            product_id: product.id,
            product_title: product.title.clone(),
            price: product.price,
            shipping_address: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_shipping_address(mut self, address: impl Into<String>) -> Self {
        self.shipping_address = Some(address.into());
        self
    }
}

//--------------------------------------    PayoutStatus    ----------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum PayoutStatus {
    /// waiting for a successful gateway withdrawal
    Pending,
    Sent,
}

impl Display for PayoutStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PayoutStatus::Pending => write!(f, "Pending"),
            PayoutStatus::Sent => write!(f, "Sent"),
        }
    }
}

impl FromStr for PayoutStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Sent" => Ok(Self::Sent),
            s => Err(ConversionError("payout status", s.to_string())),
        }
    }
}

//--------------------------------------       Payout       ----------------------------------------------------------
/// A row in the payout ledger. One per settled order, keyed by the order id.
///
/// Inserted `Pending` inside the settlement transaction and marked `Sent` once the gateway accepts
/// the withdrawal, so a failed transfer is never silently dropped.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Payout {
    pub id: i64,
    pub order_id: OrderId,
    pub seller_id: i64,
    pub amount: Money,
    pub pix_key: String,
    pub pix_key_kind: PixKeyKind,
    pub status: PayoutStatus,
    pub attempts: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------    OrderMessage    ----------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct OrderMessage {
    pub id: i64,
    pub order_id: OrderId,
    pub sender_id: i64,
    pub content: String,
    pub client_ref: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewOrderMessage {
    pub order_id: OrderId,
    pub sender_id: i64,
    pub content: String,
    pub client_ref: String,
}

//--------------------------------------   DirectMessage    ----------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct DirectMessage {
    pub id: i64,
    pub sender_id: i64,
    pub receiver_id: i64,
    pub content: String,
    pub client_ref: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewDirectMessage {
    pub sender_id: i64,
    pub receiver_id: i64,
    pub content: String,
    pub client_ref: String,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn status_round_trips() {
        for s in ["Paid", "Delivered"] {
            assert_eq!(s.parse::<OrderStatusType>().unwrap().to_string(), s);
        }
        for s in ["Pending", "Sent"] {
            assert_eq!(s.parse::<PayoutStatus>().unwrap().to_string(), s);
        }
        for s in ["Admin", "PremiumSeller", "Buyer"] {
            assert_eq!(s.parse::<Role>().unwrap().to_string(), s);
        }
        assert!("Shipped".parse::<OrderStatusType>().is_err());
    }

    #[test]
    fn pix_key_kind_round_trips() {
        for s in ["Cpf", "Cnpj", "Email", "Phone", "Random"] {
            assert_eq!(s.parse::<PixKeyKind>().unwrap().to_string(), s);
        }
        assert!("Iban".parse::<PixKeyKind>().is_err());
    }

    #[test]
    fn order_id_display() {
        let oid = OrderId::from("pix_42");
        assert_eq!(oid.to_string(), "#pix_42");
        assert_eq!(oid.as_str(), "pix_42");
    }
}

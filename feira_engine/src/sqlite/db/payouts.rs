use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db_types::{Order, OrderId, Payout, PayoutStatus, PixKeyKind},
    traits::StoreError,
};

/// Opens a `Pending` ledger entry for the order's payout. Part of the settlement transaction, so
/// a settled order always has a ledger row.
pub async fn insert_pending(
    order: &Order,
    pix_key: &str,
    pix_key_kind: PixKeyKind,
    conn: &mut SqliteConnection,
) -> Result<Payout, StoreError> {
    let payout = sqlx::query_as(
        r#"
            INSERT INTO payouts (order_id, seller_id, amount, pix_key, pix_key_kind)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *;
        "#,
    )
    .bind(order.order_id.as_str())
    .bind(order.seller_id)
    .bind(order.price)
    .bind(pix_key)
    .bind(pix_key_kind)
    .fetch_one(conn)
    .await?;
    Ok(payout)
}

pub async fn fetch_payout(order_id: &OrderId, conn: &mut SqliteConnection) -> Result<Option<Payout>, StoreError> {
    let payout = sqlx::query_as("SELECT * FROM payouts WHERE order_id = $1")
        .bind(order_id.as_str())
        .fetch_optional(conn)
        .await?;
    Ok(payout)
}

pub async fn fetch_pending(conn: &mut SqliteConnection) -> Result<Vec<Payout>, StoreError> {
    let payouts = sqlx::query_as("SELECT * FROM payouts WHERE status = 'Pending' ORDER BY created_at ASC, id ASC")
        .fetch_all(conn)
        .await?;
    Ok(payouts)
}

pub async fn record_attempt(order_id: &OrderId, conn: &mut SqliteConnection) -> Result<Payout, StoreError> {
    let payout: Option<Payout> = sqlx::query_as(
        "UPDATE payouts SET attempts = attempts + 1, updated_at = CURRENT_TIMESTAMP WHERE order_id = $1 RETURNING *",
    )
    .bind(order_id.as_str())
    .fetch_optional(conn)
    .await?;
    payout.ok_or_else(|| StoreError::PayoutNotFound(order_id.clone()))
}

/// Moves the payout to `Sent`, guarded on the current status being `Pending`. Marking a payout
/// that is already `Sent` is a no-op and returns the stored row unchanged.
pub async fn mark_sent(order_id: &OrderId, conn: &mut SqliteConnection) -> Result<Payout, StoreError> {
    let updated: Option<Payout> = sqlx::query_as(
        r#"
            UPDATE payouts
            SET status = 'Sent', updated_at = CURRENT_TIMESTAMP
            WHERE order_id = $1 AND status = 'Pending'
            RETURNING *;
        "#,
    )
    .bind(order_id.as_str())
    .fetch_optional(&mut *conn)
    .await?;
    match updated {
        Some(payout) => {
            debug!("🗃️ Payout for order {order_id} marked as sent");
            Ok(payout)
        },
        None => match fetch_payout(order_id, conn).await? {
            Some(payout) if payout.status == PayoutStatus::Sent => Ok(payout),
            _ => Err(StoreError::PayoutNotFound(order_id.clone())),
        },
    }
}

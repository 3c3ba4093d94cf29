use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db_types::{NewOrder, Order, OrderId},
    traits::StoreError,
};

/// Inserts the order if no order with the same `order_id` exists yet. Returns `None` when the
/// insert was skipped because of the conflict.
///
/// This is deliberately the first statement of the settlement transaction: it is a write, so the
/// transaction takes its write lock up front instead of upgrading from a read lock mid-flight.
pub async fn insert_if_new(order: NewOrder, conn: &mut SqliteConnection) -> Result<Option<Order>, StoreError> {
    let inserted: Option<Order> = sqlx::query_as(
        r#"
            INSERT INTO orders (
                order_id,
                buyer_id,
                seller_id,
                product_id,
                product_title,
                price,
                shipping_address,
                created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (order_id) DO NOTHING
            RETURNING *;
        "#,
    )
    .bind(order.order_id)
    .bind(order.buyer_id)
    .bind(order.seller_id)
    .bind(order.product_id)
    .bind(order.product_title)
    .bind(order.price)
    .bind(order.shipping_address)
    .bind(order.created_at)
    .fetch_optional(conn)
    .await?;
    if let Some(order) = &inserted {
        debug!("🗃️ Order [{}] inserted with id {}", order.order_id, order.id);
    }
    Ok(inserted)
}

pub async fn fetch_order_by_order_id(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order =
        sqlx::query_as("SELECT * FROM orders WHERE order_id = $1").bind(order_id.as_str()).fetch_optional(conn).await?;
    Ok(order)
}

/// Orders in which the user appears as buyer or seller, newest first.
pub async fn fetch_orders_for_user(user_id: i64, conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    let orders = sqlx::query_as(
        "SELECT * FROM orders WHERE buyer_id = $1 OR seller_id = $1 ORDER BY created_at DESC, id DESC",
    )
    .bind(user_id)
    .fetch_all(conn)
    .await?;
    Ok(orders)
}

/// The guarded `Paid` → `Delivered` transition. Returns `None` when the order is not currently
/// `Paid` (either it does not exist, or it was already delivered).
pub async fn mark_delivered(order_id: &OrderId, conn: &mut SqliteConnection) -> Result<Option<Order>, StoreError> {
    let order: Option<Order> = sqlx::query_as(
        r#"
            UPDATE orders
            SET status = 'Delivered', updated_at = CURRENT_TIMESTAMP
            WHERE order_id = $1 AND status = 'Paid'
            RETURNING *;
        "#,
    )
    .bind(order_id.as_str())
    .fetch_optional(conn)
    .await?;
    Ok(order)
}

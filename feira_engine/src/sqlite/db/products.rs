use log::trace;
use sqlx::SqliteConnection;

use crate::{db_types::Product, traits::StoreError};

pub async fn fetch_product(product_id: i64, conn: &mut SqliteConnection) -> Result<Option<Product>, StoreError> {
    let product =
        sqlx::query_as("SELECT * FROM products WHERE id = $1").bind(product_id).fetch_optional(conn).await?;
    Ok(product)
}

/// The guarded conditional stock decrement: succeeds only while `quantity > 0`, in a single
/// atomic statement. Never expressed as a read-modify-write pair, so concurrent buyers against
/// the last unit cannot both succeed.
///
/// Returns the remaining quantity, or [`StoreError::SoldOut`] when the guard rejects the update.
pub async fn guarded_decrement(product_id: i64, conn: &mut SqliteConnection) -> Result<i64, StoreError> {
    let remaining: Option<(i64,)> = sqlx::query_as(
        r#"
            UPDATE products
            SET quantity = quantity - 1, updated_at = CURRENT_TIMESTAMP
            WHERE id = $1 AND quantity > 0
            RETURNING quantity;
        "#,
    )
    .bind(product_id)
    .fetch_optional(conn)
    .await?;
    match remaining {
        Some((qty,)) => {
            trace!("🗃️ Stock for product #{product_id} decremented, {qty} left");
            Ok(qty)
        },
        None => Err(StoreError::SoldOut(product_id)),
    }
}

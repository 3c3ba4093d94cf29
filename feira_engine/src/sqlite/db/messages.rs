use chrono::Utc;
use log::trace;
use sqlx::SqliteConnection;

use crate::{
    db_types::{DirectMessage, NewDirectMessage, NewOrderMessage, OrderId, OrderMessage, User},
    traits::StoreError,
};

/// Snapshot of an order conversation, timestamp ascending (insert order breaks ties).
pub async fn order_message_log(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Vec<OrderMessage>, StoreError> {
    let messages =
        sqlx::query_as("SELECT * FROM order_messages WHERE order_id = $1 ORDER BY created_at ASC, id ASC")
            .bind(order_id.as_str())
            .fetch_all(conn)
            .await?;
    Ok(messages)
}

/// Snapshot of a direct conversation between the unordered pair, timestamp ascending.
pub async fn direct_message_log(
    user_a: i64,
    user_b: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<DirectMessage>, StoreError> {
    let messages = sqlx::query_as(
        r#"
            SELECT * FROM direct_messages
            WHERE (sender_id = $1 AND receiver_id = $2) OR (sender_id = $2 AND receiver_id = $1)
            ORDER BY created_at ASC, id ASC;
        "#,
    )
    .bind(user_a)
    .bind(user_b)
    .fetch_all(conn)
    .await?;
    Ok(messages)
}

pub async fn insert_order_message(
    msg: NewOrderMessage,
    conn: &mut SqliteConnection,
) -> Result<OrderMessage, StoreError> {
    let message = sqlx::query_as(
        r#"
            INSERT INTO order_messages (order_id, sender_id, content, client_ref, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *;
        "#,
    )
    .bind(msg.order_id.as_str())
    .bind(msg.sender_id)
    .bind(msg.content)
    .bind(msg.client_ref)
    .bind(Utc::now())
    .fetch_one(conn)
    .await?;
    Ok(message)
}

pub async fn insert_direct_message(
    msg: NewDirectMessage,
    conn: &mut SqliteConnection,
) -> Result<DirectMessage, StoreError> {
    let message = sqlx::query_as(
        r#"
            INSERT INTO direct_messages (sender_id, receiver_id, content, client_ref, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *;
        "#,
    )
    .bind(msg.sender_id)
    .bind(msg.receiver_id)
    .bind(msg.content)
    .bind(msg.client_ref)
    .bind(Utc::now())
    .fetch_one(conn)
    .await?;
    Ok(message)
}

/// The order-scoped bulk purge. Returns the number of messages removed.
pub async fn purge_order_messages(order_id: &OrderId, conn: &mut SqliteConnection) -> Result<u64, StoreError> {
    let result =
        sqlx::query("DELETE FROM order_messages WHERE order_id = $1").bind(order_id.as_str()).execute(conn).await?;
    trace!("🗃️ Purged {} messages for order {order_id}", result.rows_affected());
    Ok(result.rows_affected())
}

/// Distinct direct-message counterparties of the user, most-recent-message-first.
pub async fn contacts_for_user(user_id: i64, conn: &mut SqliteConnection) -> Result<Vec<User>, StoreError> {
    let contacts = sqlx::query_as(
        r#"
            SELECT u.*, MAX(m.created_at) AS last_message_at
            FROM users u
            JOIN (
                SELECT
                    CASE WHEN sender_id = $1 THEN receiver_id ELSE sender_id END AS peer_id,
                    created_at
                FROM direct_messages
                WHERE sender_id = $1 OR receiver_id = $1
            ) m ON m.peer_id = u.id
            GROUP BY u.id
            ORDER BY last_message_at DESC;
        "#,
    )
    .bind(user_id)
    .fetch_all(conn)
    .await?;
    Ok(contacts)
}

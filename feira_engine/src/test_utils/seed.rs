use feira_common::Money;
use sqlx::SqlitePool;

use crate::db_types::{PixKeyKind, Product, User, UserStatus};

pub async fn seed_user(pool: &SqlitePool, handle: &str) -> User {
    sqlx::query_as("INSERT INTO users (handle) VALUES ($1) RETURNING *")
        .bind(handle)
        .fetch_one(pool)
        .await
        .expect("Error seeding user")
}

pub async fn seed_suspended_user(pool: &SqlitePool, handle: &str) -> User {
    sqlx::query_as("INSERT INTO users (handle, status) VALUES ($1, $2) RETURNING *")
        .bind(handle)
        .bind(UserStatus::Suspended)
        .fetch_one(pool)
        .await
        .expect("Error seeding suspended user")
}

pub async fn seed_product(pool: &SqlitePool, seller: &User, title: &str, price: Money, quantity: i64) -> Product {
    sqlx::query_as(
        r#"
        INSERT INTO products (seller_id, title, price, quantity, pix_key, pix_key_kind)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(seller.id)
    .bind(title)
    .bind(price)
    .bind(quantity)
    .bind(format!("{}@feira.test", seller.handle))
    .bind(PixKeyKind::Email)
    .fetch_one(pool)
    .await
    .expect("Error seeding product")
}

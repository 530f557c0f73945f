//! `products` table (read-only from this service)

use shared::models::Product;
use sqlx::PgPool;
use uuid::Uuid;

pub async fn find(pool: &PgPool, product_id: Uuid) -> Result<Option<Product>, sqlx::Error> {
    sqlx::query_as::<_, Product>(
        "SELECT id, sku_id, name, description, data_limit, validity_days, countries,
            is_active, created_at, updated_at
         FROM products WHERE id = $1",
    )
    .bind(product_id)
    .fetch_optional(pool)
    .await
}

//! `orders` table

use rust_decimal::Decimal;
use shared::models::{Order, OrderStatus};
use sqlx::PgPool;
use uuid::Uuid;

use crate::store::{OrderFilter, StoreError};

const ORDER_COLUMNS: &str = "id, order_number, user_id, product_id, package_price_id, \
    provider_price_id, amount, currency, customer_email, customer_phone, invoice_id, \
    partner_order_id, esim_data, failure_reason, status, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    order_number: String,
    user_id: Option<Uuid>,
    product_id: Uuid,
    package_price_id: Option<Uuid>,
    provider_price_id: Option<i64>,
    amount: Decimal,
    currency: String,
    customer_email: Option<String>,
    customer_phone: Option<String>,
    invoice_id: Option<String>,
    partner_order_id: Option<String>,
    esim_data: Option<serde_json::Value>,
    failure_reason: Option<String>,
    status: String,
    created_at: i64,
    updated_at: i64,
}

impl TryFrom<OrderRow> for Order {
    type Error = StoreError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let status = row
            .status
            .parse::<OrderStatus>()
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;
        Ok(Order {
            id: row.id,
            order_number: row.order_number,
            user_id: row.user_id,
            product_id: row.product_id,
            package_price_id: row.package_price_id,
            provider_price_id: row.provider_price_id,
            amount: row.amount,
            currency: row.currency,
            customer_email: row.customer_email,
            customer_phone: row.customer_phone,
            invoice_id: row.invoice_id,
            partner_order_id: row.partner_order_id,
            esim_data: row.esim_data,
            failure_reason: row.failure_reason,
            status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

pub async fn insert(pool: &PgPool, order: &Order) -> Result<(), StoreError> {
    let result = sqlx::query(
        "INSERT INTO orders (id, order_number, user_id, product_id, package_price_id,
            provider_price_id, amount, currency, customer_email, customer_phone, invoice_id,
            partner_order_id, esim_data, failure_reason, status, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)",
    )
    .bind(order.id)
    .bind(&order.order_number)
    .bind(order.user_id)
    .bind(order.product_id)
    .bind(order.package_price_id)
    .bind(order.provider_price_id)
    .bind(order.amount)
    .bind(&order.currency)
    .bind(&order.customer_email)
    .bind(&order.customer_phone)
    .bind(&order.invoice_id)
    .bind(&order.partner_order_id)
    .bind(&order.esim_data)
    .bind(&order.failure_reason)
    .bind(order.status.as_str())
    .bind(order.created_at)
    .bind(order.updated_at)
    .execute(pool)
    .await;

    match result {
        Ok(_) => Ok(()),
        Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
            Err(StoreError::Duplicate(order.order_number.clone()))
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn find(pool: &PgPool, order_id: Uuid) -> Result<Option<Order>, StoreError> {
    let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1");
    let row: Option<OrderRow> = sqlx::query_as(&sql)
        .bind(order_id)
        .fetch_optional(pool)
        .await?;
    row.map(Order::try_from).transpose()
}

pub async fn find_by_number(pool: &PgPool, order_number: &str) -> Result<Option<Order>, StoreError> {
    let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE order_number = $1");
    let row: Option<OrderRow> = sqlx::query_as(&sql)
        .bind(order_number)
        .fetch_optional(pool)
        .await?;
    row.map(Order::try_from).transpose()
}

pub async fn list(pool: &PgPool, filter: &OrderFilter) -> Result<Vec<Order>, StoreError> {
    let sql = format!(
        "SELECT {ORDER_COLUMNS} FROM orders
         WHERE ($1::TEXT IS NULL OR status = $1)
         ORDER BY created_at DESC
         LIMIT $2 OFFSET $3"
    );
    let (limit, offset) = filter.page();
    let rows: Vec<OrderRow> = sqlx::query_as(&sql)
        .bind(filter.status.map(|s| s.as_str()))
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;
    rows.into_iter().map(Order::try_from).collect()
}

/// Compare-and-set on `status`; the row count tells whether this caller won
pub async fn transition(
    pool: &PgPool,
    order_id: Uuid,
    from: OrderStatus,
    to: OrderStatus,
    now: i64,
) -> Result<bool, sqlx::Error> {
    let result =
        sqlx::query("UPDATE orders SET status = $1, updated_at = $2 WHERE id = $3 AND status = $4")
            .bind(to.as_str())
            .bind(now)
            .bind(order_id)
            .bind(from.as_str())
            .execute(pool)
            .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn complete(
    pool: &PgPool,
    order_id: Uuid,
    partner_order_id: &str,
    esim_data: &serde_json::Value,
    now: i64,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE orders SET status = 'completed', partner_order_id = $1, esim_data = $2, updated_at = $3
         WHERE id = $4 AND status = 'processing'",
    )
    .bind(partner_order_id)
    .bind(esim_data)
    .bind(now)
    .bind(order_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn fail(
    pool: &PgPool,
    order_id: Uuid,
    from: OrderStatus,
    reason: &str,
    now: i64,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE orders SET status = 'failed', failure_reason = $1, updated_at = $2
         WHERE id = $3 AND status = $4",
    )
    .bind(reason)
    .bind(now)
    .bind(order_id)
    .bind(from.as_str())
    .execute(pool)
    .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn set_invoice_id(
    pool: &PgPool,
    order_id: Uuid,
    invoice_id: &str,
    now: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE orders SET invoice_id = $1, updated_at = $2 WHERE id = $3")
        .bind(invoice_id)
        .bind(now)
        .bind(order_id)
        .execute(pool)
        .await?;
    Ok(())
}

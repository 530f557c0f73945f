//! `payment_transactions` table (one row per order)

use rust_decimal::Decimal;
use shared::models::{PaymentStatus, PaymentTransaction};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(sqlx::FromRow)]
struct TransactionRow {
    id: Uuid,
    order_id: Uuid,
    provider_transaction_id: String,
    amount: Decimal,
    status: String,
    payment_method: String,
    transaction_data: serde_json::Value,
    created_at: i64,
    updated_at: i64,
}

impl From<TransactionRow> for PaymentTransaction {
    fn from(row: TransactionRow) -> Self {
        PaymentTransaction {
            id: row.id,
            order_id: row.order_id,
            provider_transaction_id: row.provider_transaction_id,
            amount: row.amount,
            status: PaymentStatus::from_db(&row.status),
            payment_method: row.payment_method,
            transaction_data: row.transaction_data,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Insert or update the order's transaction in one statement.
///
/// `transaction_data` is merged key by key, and a row already `paid` only
/// accepts another `paid` write. Returns whether a row was written.
pub async fn upsert(pool: &PgPool, tx: &PaymentTransaction) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO payment_transactions (id, order_id, provider_transaction_id, amount, status,
            payment_method, transaction_data, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
         ON CONFLICT (order_id) DO UPDATE SET
            provider_transaction_id = EXCLUDED.provider_transaction_id,
            amount = EXCLUDED.amount,
            status = EXCLUDED.status,
            payment_method = EXCLUDED.payment_method,
            transaction_data = payment_transactions.transaction_data || EXCLUDED.transaction_data,
            updated_at = EXCLUDED.updated_at
         WHERE payment_transactions.status <> 'paid' OR EXCLUDED.status = 'paid'",
    )
    .bind(tx.id)
    .bind(tx.order_id)
    .bind(&tx.provider_transaction_id)
    .bind(tx.amount)
    .bind(tx.status.as_str())
    .bind(&tx.payment_method)
    .bind(&tx.transaction_data)
    .bind(tx.created_at)
    .bind(tx.updated_at)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn find_by_order(
    pool: &PgPool,
    order_id: Uuid,
) -> Result<Option<PaymentTransaction>, sqlx::Error> {
    let row: Option<TransactionRow> = sqlx::query_as(
        "SELECT id, order_id, provider_transaction_id, amount, status, payment_method,
            transaction_data, created_at, updated_at
         FROM payment_transactions WHERE order_id = $1",
    )
    .bind(order_id)
    .fetch_optional(pool)
    .await?;
    Ok(row.map(Into::into))
}

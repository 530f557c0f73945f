//! `currency_rates` table (append-only)

use rust_decimal::Decimal;
use shared::models::{CurrencyRate, RateSource};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(sqlx::FromRow)]
struct RateRow {
    id: Uuid,
    from_currency: String,
    to_currency: String,
    rate: Decimal,
    source: String,
    created_at: i64,
}

pub async fn latest(
    pool: &PgPool,
    from: &str,
    to: &str,
) -> Result<Option<CurrencyRate>, sqlx::Error> {
    let row: Option<RateRow> = sqlx::query_as(
        "SELECT id, from_currency, to_currency, rate, source, created_at
         FROM currency_rates
         WHERE from_currency = $1 AND to_currency = $2
         ORDER BY created_at DESC
         LIMIT 1",
    )
    .bind(from)
    .bind(to)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| CurrencyRate {
        id: r.id,
        from_currency: r.from_currency,
        to_currency: r.to_currency,
        rate: r.rate,
        source: RateSource::from_db(&r.source),
        created_at: r.created_at,
    }))
}

pub async fn append(pool: &PgPool, rate: &CurrencyRate) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO currency_rates (id, from_currency, to_currency, rate, source, created_at)
         VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(rate.id)
    .bind(&rate.from_currency)
    .bind(&rate.to_currency)
    .bind(rate.rate)
    .bind(rate.source.as_str())
    .bind(rate.created_at)
    .execute(pool)
    .await?;
    Ok(())
}

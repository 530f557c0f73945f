//! `package_prices` table

use rust_decimal::Decimal;
use shared::models::{PackagePrice, PriceSource};
use sqlx::PgPool;
use uuid::Uuid;

const PRICE_COLUMNS: &str = "id, sku_id, provider_price_id, api_code, show_name, flows, unit, \
    days, raw_price_usd, markup_percent, override_price_usd, effective_price_usd, \
    effective_price_local, exchange_rate, price_source, active, last_synced_at, created_at, \
    updated_at";

#[derive(sqlx::FromRow)]
struct PackagePriceRow {
    id: Uuid,
    sku_id: String,
    provider_price_id: i64,
    api_code: String,
    show_name: String,
    flows: Decimal,
    unit: String,
    days: i32,
    raw_price_usd: Decimal,
    markup_percent: Option<Decimal>,
    override_price_usd: Option<Decimal>,
    effective_price_usd: Decimal,
    effective_price_local: Option<Decimal>,
    exchange_rate: Option<Decimal>,
    price_source: String,
    active: bool,
    last_synced_at: Option<i64>,
    created_at: i64,
    updated_at: i64,
}

impl From<PackagePriceRow> for PackagePrice {
    fn from(r: PackagePriceRow) -> Self {
        PackagePrice {
            id: r.id,
            sku_id: r.sku_id,
            provider_price_id: r.provider_price_id,
            api_code: r.api_code,
            show_name: r.show_name,
            flows: r.flows,
            unit: r.unit,
            days: r.days,
            raw_price_usd: r.raw_price_usd,
            markup_percent: r.markup_percent,
            override_price_usd: r.override_price_usd,
            effective_price_usd: r.effective_price_usd,
            effective_price_local: r.effective_price_local,
            exchange_rate: r.exchange_rate,
            price_source: PriceSource::from_db(&r.price_source),
            active: r.active,
            last_synced_at: r.last_synced_at,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

pub async fn find(pool: &PgPool, id: Uuid) -> Result<Option<PackagePrice>, sqlx::Error> {
    let sql = format!("SELECT {PRICE_COLUMNS} FROM package_prices WHERE id = $1");
    let row: Option<PackagePriceRow> = sqlx::query_as(&sql).bind(id).fetch_optional(pool).await?;
    Ok(row.map(Into::into))
}

pub async fn find_by_provider_id(
    pool: &PgPool,
    provider_price_id: i64,
) -> Result<Option<PackagePrice>, sqlx::Error> {
    let sql = format!("SELECT {PRICE_COLUMNS} FROM package_prices WHERE provider_price_id = $1");
    let row: Option<PackagePriceRow> = sqlx::query_as(&sql)
        .bind(provider_price_id)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(Into::into))
}

pub async fn list_by_sku(pool: &PgPool, sku_id: &str) -> Result<Vec<PackagePrice>, sqlx::Error> {
    let sql = format!(
        "SELECT {PRICE_COLUMNS} FROM package_prices WHERE sku_id = $1 ORDER BY provider_price_id"
    );
    let rows: Vec<PackagePriceRow> = sqlx::query_as(&sql).bind(sku_id).fetch_all(pool).await?;
    Ok(rows.into_iter().map(Into::into).collect())
}

/// Upsert keyed by `provider_price_id`
pub async fn save(pool: &PgPool, p: &PackagePrice) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO package_prices (id, sku_id, provider_price_id, api_code, show_name, flows,
            unit, days, raw_price_usd, markup_percent, override_price_usd, effective_price_usd,
            effective_price_local, exchange_rate, price_source, active, last_synced_at,
            created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19)
         ON CONFLICT (provider_price_id) DO UPDATE SET
            sku_id = EXCLUDED.sku_id,
            api_code = EXCLUDED.api_code,
            show_name = EXCLUDED.show_name,
            flows = EXCLUDED.flows,
            unit = EXCLUDED.unit,
            days = EXCLUDED.days,
            raw_price_usd = EXCLUDED.raw_price_usd,
            markup_percent = EXCLUDED.markup_percent,
            override_price_usd = EXCLUDED.override_price_usd,
            effective_price_usd = EXCLUDED.effective_price_usd,
            effective_price_local = EXCLUDED.effective_price_local,
            exchange_rate = EXCLUDED.exchange_rate,
            price_source = EXCLUDED.price_source,
            active = EXCLUDED.active,
            last_synced_at = EXCLUDED.last_synced_at,
            updated_at = EXCLUDED.updated_at",
    )
    .bind(p.id)
    .bind(&p.sku_id)
    .bind(p.provider_price_id)
    .bind(&p.api_code)
    .bind(&p.show_name)
    .bind(p.flows)
    .bind(&p.unit)
    .bind(p.days)
    .bind(p.raw_price_usd)
    .bind(p.markup_percent)
    .bind(p.override_price_usd)
    .bind(p.effective_price_usd)
    .bind(p.effective_price_local)
    .bind(p.exchange_rate)
    .bind(p.price_source.as_str())
    .bind(p.active)
    .bind(p.last_synced_at)
    .bind(p.created_at)
    .bind(p.updated_at)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn deactivate_missing(
    pool: &PgPool,
    sku_id: &str,
    keep: &[i64],
    now: i64,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE package_prices SET active = FALSE, updated_at = $1
         WHERE sku_id = $2 AND active AND NOT (provider_price_id = ANY($3))",
    )
    .bind(now)
    .bind(sku_id)
    .bind(keep)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

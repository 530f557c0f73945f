//! Effective price resolution
//!
//! Precedence: a positive override wins, then markup on the raw provider
//! price, then the raw price itself. Override and markup are never
//! combined: setting one clears the other.

use rust_decimal::prelude::*;
use shared::models::{PackagePrice, PriceSource};

/// Rounding for stored money values (2 decimal places, half-up)
const DECIMAL_PLACES: u32 = 2;

/// Upper bound accepted for a markup percentage
pub const MAX_MARKUP_PERCENT: Decimal = Decimal::from_parts(500, 0, 0, false, 0);

#[inline]
fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PricingError {
    #[error("markup {0}% is outside 0..=500%")]
    MarkupOutOfRange(Decimal),
    #[error("override price must be greater than zero, got {0}")]
    NonPositiveOverride(Decimal),
}

/// Result of resolving a package's price
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EffectivePrice {
    pub usd: Decimal,
    /// None when no rate was supplied
    pub local: Option<Decimal>,
    pub rate: Option<Decimal>,
    pub source: PriceSource,
}

/// USD price from the overlay, then local price at `rate`
pub fn resolve_effective_price(price: &PackagePrice, rate: Option<Decimal>) -> EffectivePrice {
    let (usd, source) = match (price.override_price_usd, price.markup_percent) {
        (Some(ov), _) if ov > Decimal::ZERO => (ov, PriceSource::Override),
        (_, Some(markup)) => {
            let multiplier = Decimal::ONE + markup / Decimal::ONE_HUNDRED;
            (round_money(price.raw_price_usd * multiplier), PriceSource::Markup)
        }
        _ => (price.raw_price_usd, PriceSource::Base),
    };

    EffectivePrice {
        usd,
        local: rate.map(|r| to_local(usd, r)),
        rate,
        source,
    }
}

/// Convert a USD amount at `rate`
pub fn to_local(usd: Decimal, rate: Decimal) -> Decimal {
    round_money(usd * rate)
}

/// Rewrite the derived fields of `price` from its inputs
pub fn recompute(price: &mut PackagePrice, rate: Option<Decimal>) {
    let effective = resolve_effective_price(price, rate);
    price.effective_price_usd = effective.usd;
    price.effective_price_local = effective.local;
    price.exchange_rate = effective.rate;
    price.price_source = effective.source;
}

/// Set a markup percentage; clears any override
pub fn apply_markup(
    price: &mut PackagePrice,
    markup_percent: Decimal,
    rate: Option<Decimal>,
) -> Result<(), PricingError> {
    if markup_percent < Decimal::ZERO || markup_percent > MAX_MARKUP_PERCENT {
        return Err(PricingError::MarkupOutOfRange(markup_percent));
    }
    price.markup_percent = Some(markup_percent);
    price.override_price_usd = None;
    recompute(price, rate);
    Ok(())
}

/// Set an absolute USD override (clears any markup), or remove it with `None`
pub fn apply_override(
    price: &mut PackagePrice,
    override_usd: Option<Decimal>,
    rate: Option<Decimal>,
) -> Result<(), PricingError> {
    match override_usd {
        Some(v) if v <= Decimal::ZERO => return Err(PricingError::NonPositiveOverride(v)),
        Some(v) => {
            price.override_price_usd = Some(v);
            price.markup_percent = None;
        }
        None => price.override_price_usd = None,
    }
    recompute(price, rate);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn package(raw: Decimal) -> PackagePrice {
        PackagePrice {
            id: Uuid::new_v4(),
            sku_id: "114".into(),
            provider_price_id: 9001,
            api_code: "JP-3GB-7D".into(),
            show_name: "3GB 7 days".into(),
            flows: dec!(3),
            unit: "GB".into(),
            days: 7,
            raw_price_usd: raw,
            markup_percent: None,
            override_price_usd: None,
            effective_price_usd: raw,
            effective_price_local: None,
            exchange_rate: None,
            price_source: PriceSource::Base,
            active: true,
            last_synced_at: None,
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn test_base_price_when_no_overlay() {
        let p = package(dec!(10.00));
        let e = resolve_effective_price(&p, Some(dec!(3450)));
        assert_eq!(e.usd, dec!(10.00));
        assert_eq!(e.local, Some(dec!(34500.00)));
        assert_eq!(e.source, PriceSource::Base);
    }

    #[test]
    fn test_markup_twenty_percent_at_3450() {
        let mut p = package(dec!(10.00));
        apply_markup(&mut p, dec!(20), Some(dec!(3450))).unwrap();
        assert_eq!(p.effective_price_usd, dec!(12.00));
        assert_eq!(p.effective_price_local, Some(dec!(41400)));
        assert_eq!(p.exchange_rate, Some(dec!(3450)));
        assert_eq!(p.price_source, PriceSource::Markup);
    }

    #[test]
    fn test_override_beats_markup_and_clears_it() {
        let mut p = package(dec!(10.00));
        apply_markup(&mut p, dec!(20), None).unwrap();
        apply_override(&mut p, Some(dec!(15.50)), None).unwrap();
        assert_eq!(p.markup_percent, None);
        assert_eq!(p.effective_price_usd, dec!(15.50));
        assert_eq!(p.price_source, PriceSource::Override);
        assert_eq!(p.effective_price_local, None);
    }

    #[test]
    fn test_markup_clears_override() {
        let mut p = package(dec!(10.00));
        apply_override(&mut p, Some(dec!(15)), None).unwrap();
        apply_markup(&mut p, dec!(50), None).unwrap();
        assert_eq!(p.override_price_usd, None);
        assert_eq!(p.effective_price_usd, dec!(15.00));
        assert_eq!(p.price_source, PriceSource::Markup);
    }

    #[test]
    fn test_clearing_override_falls_back_to_base() {
        let mut p = package(dec!(8.40));
        apply_override(&mut p, Some(dec!(9.99)), None).unwrap();
        apply_override(&mut p, None, None).unwrap();
        assert_eq!(p.effective_price_usd, dec!(8.40));
        assert_eq!(p.price_source, PriceSource::Base);
    }

    #[test]
    fn test_stored_both_values_still_resolve_to_override() {
        // Rows written by older tooling may carry both
        let mut p = package(dec!(10));
        p.markup_percent = Some(dec!(20));
        p.override_price_usd = Some(dec!(11));
        assert_eq!(resolve_effective_price(&p, None).source, PriceSource::Override);

        // A non-positive override has no effect
        p.override_price_usd = Some(dec!(0));
        let e = resolve_effective_price(&p, None);
        assert_eq!(e.source, PriceSource::Markup);
        assert_eq!(e.usd, dec!(12.00));
    }

    #[test]
    fn test_validation_bounds() {
        let mut p = package(dec!(10));
        assert_eq!(
            apply_markup(&mut p, dec!(500.01), None),
            Err(PricingError::MarkupOutOfRange(dec!(500.01)))
        );
        assert!(apply_markup(&mut p, dec!(-1), None).is_err());
        assert!(apply_markup(&mut p, dec!(500), None).is_ok());
        assert!(apply_markup(&mut p, dec!(0), None).is_ok());
        assert_eq!(
            apply_override(&mut p, Some(dec!(0)), None),
            Err(PricingError::NonPositiveOverride(dec!(0)))
        );
        // Rejected input leaves the previous overlay untouched
        assert_eq!(p.markup_percent, Some(dec!(0)));
    }
}

//! Discount synthesis: a random sample of variants each receives one
//! voucher whose value is constrained by a minimum-profit floor over
//! the variant's wholesale cost.

use std::collections::HashMap;

use chrono::NaiveDateTime;
use rand::rngs::StdRng;
use rand::seq::index;
use rand::Rng;
use tracing::info;

use crate::entities::{Discount, DiscountType, ProductVariant};
use crate::synth::{random_datetime_between, window_status, SynthConfig};

const CODE_PREFIX: &str = "PTIT";
const CODE_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const CODE_LEN: usize = 10;
/// Candidate discount rates, in whole percent.
const MIN_RATE_PERCENT: u32 = 5;
const MAX_RATE_PERCENT: u32 = 30;
/// The discounted price must stay above cost by this margin.
const MIN_PROFIT_MARGIN: f64 = 0.05;

pub const VOUCHER_NAMES: &[&str] = &[
    "Giảm giá sinh nhật",
    "Giảm giá ngày lễ",
    "Giảm giá hot",
    "Giảm giá sốc",
    "Giảm giá cực mạnh",
    "Giảm giá lớn",
    "Giảm giá hấp dẫn",
    "Giảm giá cực chất",
    "Giảm giá không thể bỏ qua",
    "Giảm giá cực đã",
    "Giảm giá cực phê",
    "Giảm giá cực đỉnh",
    "Giảm giá cực chất lượng",
    "Giảm giá cực chất lượng cao",
];

/// Voucher view consumed by the order synthesizer when pricing an
/// order against its variant's active discount.
#[derive(Debug, Clone)]
pub struct Voucher {
    pub kind: DiscountType,
    pub value: f64,
    pub start_date: NaiveDateTime,
    pub end_date: NaiveDateTime,
}

/// Variant id -> its voucher.
pub type VoucherIndex = HashMap<String, Voucher>;

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Pick a discount value satisfying the profit floor, or degenerate to
/// the variant's own price (an effectively-zero discount) when no rate
/// in the candidate range satisfies it.
fn discount_value(
    rng: &mut StdRng,
    kind: DiscountType,
    original_price: i64,
    price: i64,
) -> f64 {
    let mut valid: Vec<(f64, f64)> = Vec::new();
    for percent in MIN_RATE_PERCENT..=MAX_RATE_PERCENT {
        let rate = f64::from(percent) / 100.0;
        let discounted = price as f64 * (1.0 - rate);
        if discounted > original_price as f64 * (1.0 + MIN_PROFIT_MARGIN) {
            valid.push((rate, discounted));
        }
    }
    if valid.is_empty() {
        return round3(price as f64);
    }
    let (rate, discounted) = valid[rng.gen_range(0..valid.len())];
    match kind {
        DiscountType::Percentage => round3(rate),
        DiscountType::FixedAmount => round3(discounted),
    }
}

fn random_code(rng: &mut StdRng) -> String {
    let suffix: String = (0..CODE_LEN)
        .map(|_| CODE_CHARSET[rng.gen_range(0..CODE_CHARSET.len())] as char)
        .collect();
    format!("{CODE_PREFIX}-{suffix}")
}

fn window_bound(y: i32, m: u32, d: u32) -> NaiveDateTime {
    chrono::NaiveDate::from_ymd_opt(y, m, d)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .unwrap_or_default()
}

/// Generate one discount per sampled variant.
///
/// RNG order per discount: code chars, name, type, value pick, start
/// date, end date.
pub fn generate_discounts(
    variants: &[ProductVariant],
    cfg: &SynthConfig,
    rng: &mut StdRng,
) -> (Vec<Discount>, VoucherIndex) {
    let window_start = window_bound(2024, 1, 1);
    let window_last_start = window_bound(2025, 12, 30);
    let window_end = window_bound(2025, 12, 31);

    let count = cfg.discount_count.min(variants.len());
    let mut discounts = Vec::with_capacity(count);
    let mut vouchers = VoucherIndex::new();

    for idx in index::sample(rng, variants.len(), count) {
        let variant = &variants[idx];
        let code = random_code(rng);
        let name = VOUCHER_NAMES[rng.gen_range(0..VOUCHER_NAMES.len())];
        let kind = if rng.gen_range(0..2) == 0 {
            DiscountType::Percentage
        } else {
            DiscountType::FixedAmount
        };
        let value = discount_value(rng, kind, variant.original_price, variant.price);
        let start_date = random_datetime_between(rng, window_start, window_last_start);
        let end_date = random_datetime_between(rng, start_date, window_end);
        let status = window_status(start_date, end_date, cfg.reference_time);

        let mut discount = Discount {
            id: String::new(),
            product_variant_id: variant.id.clone(),
            code,
            name: name.to_string(),
            kind,
            value,
            status,
            start_date,
            end_date,
        };
        discount.id = discount.content_id();

        vouchers.insert(
            variant.id.clone(),
            Voucher {
                kind,
                value,
                start_date,
                end_date,
            },
        );
        discounts.push(discount);
    }

    info!(discounts = discounts.len(), "discounts generated");
    (discounts, vouchers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synth::test_support::dt;
    use rand::SeedableRng;

    fn variant(id: &str, price: i64, original_price: i64) -> ProductVariant {
        ProductVariant {
            id: id.into(),
            product_id: "p".into(),
            price,
            original_price,
            profit: price - original_price,
            sku: "SA-TL-1".into(),
            stock_quantity: 50,
            sold_quantity: 10,
        }
    }

    fn config() -> SynthConfig {
        SynthConfig::new(42, dt(2025, 6, 1))
    }

    #[test]
    fn every_discount_honors_the_profit_floor_or_degenerates() {
        let variants: Vec<ProductVariant> = (0..200)
            .map(|i| variant(&format!("v{i}"), 1_000_000 + i * 7919, 800_000 + i * 6131))
            .collect();
        let mut rng = StdRng::seed_from_u64(42);
        let mut cfg = config();
        cfg.discount_count = 200;
        let (discounts, _) = generate_discounts(&variants, &cfg, &mut rng);
        assert_eq!(discounts.len(), 200);

        for d in &discounts {
            let v = variants.iter().find(|v| v.id == d.product_variant_id).unwrap();
            let floor = v.original_price as f64 * (1.0 + MIN_PROFIT_MARGIN);
            let degenerate = (d.value - round3(v.price as f64)).abs() < 1e-9;
            match d.kind {
                DiscountType::Percentage => {
                    if !degenerate {
                        assert!(d.value >= 0.05 && d.value <= 0.30);
                        assert!(v.price as f64 * (1.0 - d.value) > floor - 1e-6);
                    }
                }
                DiscountType::FixedAmount => {
                    // The value IS the discounted price.
                    if !degenerate {
                        assert!(d.value > floor - 1e-6);
                    }
                }
            }
        }
    }

    #[test]
    fn tight_margins_always_degenerate() {
        // Cost equal to price: no rate can clear the floor.
        let variants = vec![variant("v0", 100_000, 100_000)];
        let mut rng = StdRng::seed_from_u64(1);
        let mut cfg = config();
        cfg.discount_count = 1;
        let (discounts, _) = generate_discounts(&variants, &cfg, &mut rng);
        assert_eq!(discounts[0].value, 100_000.0);
    }

    #[test]
    fn status_derives_from_the_window_alone() {
        let variants: Vec<ProductVariant> =
            (0..50).map(|i| variant(&format!("v{i}"), 500_000, 300_000)).collect();
        let mut rng = StdRng::seed_from_u64(3);
        let mut cfg = config();
        cfg.discount_count = 50;
        let (discounts, _) = generate_discounts(&variants, &cfg, &mut rng);
        for d in &discounts {
            assert!(d.start_date <= d.end_date);
            assert_eq!(d.status, window_status(d.start_date, d.end_date, cfg.reference_time));
            assert!(d.code.starts_with("PTIT-"));
            assert_eq!(d.code.len(), 15);
        }
    }

    #[test]
    fn sampling_never_repeats_a_variant() {
        let variants: Vec<ProductVariant> =
            (0..30).map(|i| variant(&format!("v{i}"), 500_000, 300_000)).collect();
        let mut rng = StdRng::seed_from_u64(5);
        let mut cfg = config();
        cfg.discount_count = 100; // more than available
        let (discounts, vouchers) = generate_discounts(&variants, &cfg, &mut rng);
        assert_eq!(discounts.len(), 30);
        assert_eq!(vouchers.len(), 30);
    }
}

//! Synthetic transaction generation over the reconciled catalog.
//!
//! Everything here is deterministic for a given seed: the pipeline owns
//! one `StdRng` and threads it `&mut` through every generation call in
//! a fixed, documented order (see [`crate::pipeline::run`]). No module
//! touches a global random source.

pub mod discount;
pub mod feedback;
pub mod order;

use chrono::{Duration, NaiveDateTime};
use rand::rngs::StdRng;
use rand::Rng;

use crate::entities::DiscountStatus;

/// Knobs for the synthesis stage. `reference_time` stands in for "now"
/// everywhere so a run is reproducible bit for bit.
#[derive(Debug, Clone)]
pub struct SynthConfig {
    pub seed: u64,
    pub reference_time: NaiveDateTime,
    /// Organic (non-feedback-backed) orders to synthesize.
    pub organic_orders: usize,
    /// Variants to attach a discount to.
    pub discount_count: usize,
    /// Size of the pre-drawn variant pool used to fill orders whose
    /// feedback resolved neither a product nor a variant.
    pub variant_fill_samples: usize,
}

impl SynthConfig {
    pub fn new(seed: u64, reference_time: NaiveDateTime) -> Self {
        Self {
            seed,
            reference_time,
            organic_orders: 5000,
            discount_count: 1000,
            variant_fill_samples: 5000,
        }
    }
}

/// One row of the externally supplied customer pool.
#[derive(Debug, Clone)]
pub struct Customer {
    pub id: i64,
    pub created_at: NaiveDateTime,
    pub address: String,
}

/// Read-only sampling pools fetched from the store.
#[derive(Debug, Clone, Default)]
pub struct IdentityPools {
    pub customers: Vec<Customer>,
    /// Managers with the customer-service role (feedback responses).
    pub service_managers: Vec<i64>,
    /// Managers with the product-manager role (order history).
    pub product_managers: Vec<i64>,
}

/// Uniform whole-day offset in `[start, end]`, keeping `start`'s time of
/// day. Collapses to `start` when the window is empty or inverted.
pub fn random_datetime_between(
    rng: &mut StdRng,
    start: NaiveDateTime,
    end: NaiveDateTime,
) -> NaiveDateTime {
    let days = (end - start).num_days();
    if days <= 0 {
        return start;
    }
    start + Duration::days(rng.gen_range(0..=days))
}

/// Classify a validity window against a reference instant. Never stored
/// as free choice: discount status is always derived through this.
pub fn window_status(
    start: NaiveDateTime,
    end: NaiveDateTime,
    at: NaiveDateTime,
) -> DiscountStatus {
    if at < start {
        DiscountStatus::Inactive
    } else if at > end {
        DiscountStatus::Expired
    } else {
        DiscountStatus::Active
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use chrono::NaiveDate;

    pub fn dt(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    pub fn pools(customer_count: i64) -> IdentityPools {
        IdentityPools {
            customers: (1..=customer_count)
                .map(|id| Customer {
                    id,
                    created_at: dt(2023, 1, 1),
                    address: format!("Số {id}, Hà Nội"),
                })
                .collect(),
            service_managers: vec![901, 902],
            product_managers: vec![801, 802, 803],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::dt;
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn random_datetime_stays_inside_the_window() {
        let mut rng = StdRng::seed_from_u64(42);
        let start = dt(2024, 1, 1);
        let end = dt(2024, 12, 31);
        for _ in 0..200 {
            let picked = random_datetime_between(&mut rng, start, end);
            assert!(picked >= start && picked <= end);
        }
    }

    #[test]
    fn inverted_windows_collapse_to_start() {
        let mut rng = StdRng::seed_from_u64(42);
        let start = dt(2024, 6, 1);
        assert_eq!(random_datetime_between(&mut rng, start, dt(2024, 1, 1)), start);
        assert_eq!(random_datetime_between(&mut rng, start, start), start);
    }

    #[test]
    fn window_status_is_inclusive_at_both_ends() {
        let start = dt(2024, 1, 1);
        let end = dt(2024, 12, 31);
        assert_eq!(window_status(start, end, start), DiscountStatus::Active);
        assert_eq!(window_status(start, end, end), DiscountStatus::Active);
        assert_eq!(
            window_status(start, end, dt(2023, 12, 31)),
            DiscountStatus::Inactive
        );
        assert_eq!(
            window_status(start, end, dt(2025, 1, 1)),
            DiscountStatus::Expired
        );
    }
}

//! Feedback and feedback-response synthesis: raw scraped reviews are
//! re-homed onto pool customers and linked back to the reconciled
//! catalog through the builder's option lookup table.

use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::Rng;
use tracing::{debug, info, warn};

use crate::catalog::builder::Catalog;
use crate::catalog::raw::{RawFeedback, RawFeedbackResponse};
use crate::entities::{Feedback, FeedbackResponse};
use crate::error::RowError;
use crate::normalization::attribute::canonical_attribute;
use crate::normalization::text::pascal_case;
use crate::synth::{random_datetime_between, IdentityPools, SynthConfig};

/// Name of the storefront the raw responses were scraped from; rewritten
/// to the house brand before the rows are emitted.
const UPSTREAM_BRAND: &str = "tiki";
const HOUSE_BRAND: &str = "PTIT-EShop";

/// Synthesized feedback plus the raw-id index the response builder and
/// order builder key into.
#[derive(Debug, Default)]
pub struct FeedbackBuild {
    pub feedbacks: Vec<Feedback>,
    /// Source feedback id -> index into `feedbacks` (first wins).
    pub by_source_id: HashMap<i64, usize>,
}

/// Resolve a free-text feedback variant description against the
/// catalog's `(source product, sorted canonical pairs)` lookup. Returns
/// `None` when the text matches no parsed option; callers keep the row.
pub fn resolve_variant(
    catalog: &Catalog,
    source_product_id: i64,
    option_text: &str,
) -> Option<String> {
    let mut pairs: Vec<(String, String)> = Vec::new();
    for pair in option_text.split("$$") {
        let pieces: Vec<&str> = pair.split(':').collect();
        let attr_raw = pieces.first()?.trim().to_lowercase();
        let value_raw = pieces.last()?.trim().to_lowercase();
        let value = pascal_case(&value_raw);
        let attr = canonical_attribute(&attr_raw, &value);
        pairs.push((attr.to_string(), value));
    }
    pairs.sort();
    catalog
        .variant_by_option
        .get(&(source_product_id, pairs))
        .cloned()
}

/// Build the feedback set.
///
/// RNG order: one customer-sample draw up front, then per row — a
/// customer pick (consumed even when the memo already holds the source
/// reviewer), an account-date pick, and the created-at day offset.
pub fn build_feedback(
    raw: &[RawFeedback],
    catalog: &Catalog,
    pools: &IdentityPools,
    cfg: &SynthConfig,
    rng: &mut StdRng,
) -> FeedbackBuild {
    if pools.customers.is_empty() {
        warn!("customer pool is empty; skipping feedback synthesis");
        return FeedbackBuild::default();
    }

    let sample_size = raw.len().min(pools.customers.len());
    let sampled: Vec<&crate::synth::Customer> =
        rand::seq::index::sample(rng, pools.customers.len(), sample_size)
            .into_iter()
            .map(|i| &pools.customers[i])
            .collect();
    let sampled_ids: Vec<i64> = sampled.iter().map(|c| c.id).collect();
    let sampled_dates: Vec<chrono::NaiveDateTime> =
        sampled.iter().map(|c| c.created_at).collect();

    let mut memo: HashMap<String, i64> = HashMap::new();
    let mut build = FeedbackBuild::default();
    let mut unresolved_products = 0usize;
    let mut unresolved_variants = 0usize;

    for row in raw {
        let pick = sampled_ids[rng.gen_range(0..sampled_ids.len())];
        let customer_id = *memo.entry(row.customer_id.clone()).or_insert(pick);

        let product_id = catalog.product_by_source.get(&row.product_id).cloned();
        if product_id.is_none() {
            unresolved_products += 1;
            let err = RowError::UnresolvedReference {
                entity: "product",
                key: row.product_id.to_string(),
            };
            debug!(error = %err, "nulling feedback product reference");
        }

        let product_variant_id = row
            .variant
            .as_deref()
            .and_then(|text| resolve_variant(catalog, row.product_id, text));
        if row.variant.is_some() && product_variant_id.is_none() {
            unresolved_variants += 1;
        }

        let account_start = sampled_dates[rng.gen_range(0..sampled_dates.len())];
        let created_at = random_datetime_between(rng, account_start, cfg.reference_time);

        let mut feedback = Feedback {
            id: String::new(),
            customer_id,
            product_id,
            product_variant_id,
            rating: row.rating,
            comment: row.content.clone(),
            created_at,
        };
        feedback.id = feedback.content_id();

        let index = build.feedbacks.len();
        build.by_source_id.entry(row.feedback_id).or_insert(index);
        build.feedbacks.push(feedback);
    }

    info!(
        feedbacks = build.feedbacks.len(),
        unresolved_products, unresolved_variants, "feedback built"
    );
    build
}

/// Case-insensitive rewrite of the upstream storefront name. The needle
/// is ASCII, so scanning char-wise with ASCII case folding is exact.
fn rewrite_house_brand(content: &str) -> String {
    let chars: Vec<char> = content.chars().collect();
    let needle: Vec<char> = UPSTREAM_BRAND.chars().collect();
    let mut out = String::with_capacity(content.len());
    let mut i = 0;
    while i < chars.len() {
        if i + needle.len() <= chars.len()
            && chars[i..i + needle.len()]
                .iter()
                .zip(&needle)
                .all(|(c, n)| c.eq_ignore_ascii_case(n))
        {
            out.push_str(HOUSE_BRAND);
            i += needle.len();
        } else {
            out.push(chars[i]);
            i += 1;
        }
    }
    out
}

/// Build the feedback-response set against already-synthesized
/// feedback. Responses whose source feedback id is unknown keep a null
/// reference and anchor their timestamp at the reference instant.
///
/// RNG order per row: manager pick, then the created-at day offset.
pub fn build_feedback_responses(
    raw: &[RawFeedbackResponse],
    build: &FeedbackBuild,
    pools: &IdentityPools,
    cfg: &SynthConfig,
    rng: &mut StdRng,
) -> Vec<FeedbackResponse> {
    if pools.service_managers.is_empty() {
        warn!("service manager pool is empty; skipping feedback responses");
        return Vec::new();
    }

    let mut responses = Vec::with_capacity(raw.len());
    for row in raw {
        let manager_id =
            pools.service_managers[rng.gen_range(0..pools.service_managers.len())];
        let matched = build
            .by_source_id
            .get(&row.feedback_id)
            .map(|&i| &build.feedbacks[i]);
        let (feedback_id, anchor) = match matched {
            Some(fb) => (Some(fb.id.clone()), fb.created_at),
            None => {
                let err = RowError::UnresolvedReference {
                    entity: "feedback",
                    key: row.feedback_id.to_string(),
                };
                debug!(error = %err, "nulling response feedback reference");
                (None, cfg.reference_time)
            }
        };
        let created_at = random_datetime_between(rng, anchor, cfg.reference_time);

        let mut response = FeedbackResponse {
            id: String::new(),
            manager_id,
            feedback_id,
            comment: rewrite_house_brand(&row.content),
            created_at,
        };
        response.id = response.content_id();
        responses.push(response);
    }

    info!(responses = responses.len(), "feedback responses built");
    responses
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::builder::build_catalog;
    use crate::catalog::raw::RawProduct;
    use crate::synth::test_support::{dt, pools};
    use rand::SeedableRng;

    fn catalog() -> Catalog {
        let rows = vec![RawProduct {
            source_id: 11,
            name: "Galaxy S24".into(),
            brand: "Samsung".into(),
            category: "Điện thoại Smartphone".into(),
            specification: "spec".into(),
            variants: "Màu: Đen $$ Dung lượng: 128Gb = 5000000 VND\nMàu: Trắng $$ Dung lượng: 256Gb = 6000000 VND"
                .into(),
            description: "desc".into(),
            image_url: "http://img".into(),
        }];
        let mut rng = StdRng::seed_from_u64(42);
        build_catalog(&rows, &mut rng)
    }

    fn raw_feedback(feedback_id: i64, product_id: i64, variant: Option<&str>) -> RawFeedback {
        RawFeedback {
            feedback_id,
            product_id,
            customer_id: format!("reviewer-{feedback_id}"),
            rating: 5.0,
            content: "Hàng tốt".into(),
            variant: variant.map(str::to_string),
        }
    }

    #[test]
    fn variant_text_resolves_through_the_option_lookup() {
        let catalog = catalog();
        // Raw casing differs from the parsed option; canonicalization
        // must converge on the same key.
        let resolved = resolve_variant(&catalog, 11, "Màu sắc: ĐEN $$ dung lượng: 128GB");
        assert!(resolved.is_some());
        assert!(catalog.variants.iter().any(|v| Some(&v.id) == resolved.as_ref()));

        assert!(resolve_variant(&catalog, 11, "Màu: Vàng").is_none());
        assert!(resolve_variant(&catalog, 99, "Màu: Đen $$ Dung lượng: 128Gb").is_none());
    }

    #[test]
    fn unresolved_references_null_the_field_but_keep_the_row() {
        let catalog = catalog();
        let pools = pools(20);
        let cfg = SynthConfig::new(42, dt(2025, 6, 1));
        let raw = vec![
            raw_feedback(1, 11, Some("Màu: Đen $$ Dung lượng: 128Gb")),
            raw_feedback(2, 999, Some("Màu: Đen")),
            raw_feedback(3, 11, None),
        ];
        let mut rng = StdRng::seed_from_u64(42);
        let build = build_feedback(&raw, &catalog, &pools, &cfg, &mut rng);
        assert_eq!(build.feedbacks.len(), 3);

        assert!(build.feedbacks[0].product_id.is_some());
        assert!(build.feedbacks[0].product_variant_id.is_some());

        assert!(build.feedbacks[1].product_id.is_none());
        assert!(build.feedbacks[1].product_variant_id.is_none());

        assert!(build.feedbacks[2].product_id.is_some());
        assert!(build.feedbacks[2].product_variant_id.is_none());
    }

    #[test]
    fn repeat_reviewers_keep_their_assigned_customer() {
        let catalog = catalog();
        let pools = pools(50);
        let cfg = SynthConfig::new(42, dt(2025, 6, 1));
        let mut raw = vec![raw_feedback(1, 11, None), raw_feedback(2, 11, None)];
        raw[1].customer_id = raw[0].customer_id.clone();
        let mut rng = StdRng::seed_from_u64(42);
        let build = build_feedback(&raw, &catalog, &pools, &cfg, &mut rng);
        assert_eq!(
            build.feedbacks[0].customer_id,
            build.feedbacks[1].customer_id
        );
    }

    #[test]
    fn created_at_never_precedes_the_sampled_account_window() {
        let catalog = catalog();
        let pools = pools(10);
        let cfg = SynthConfig::new(42, dt(2025, 6, 1));
        let raw: Vec<RawFeedback> =
            (0..20).map(|i| raw_feedback(i, 11, None)).collect();
        let mut rng = StdRng::seed_from_u64(42);
        let build = build_feedback(&raw, &catalog, &pools, &cfg, &mut rng);
        for fb in &build.feedbacks {
            assert!(fb.created_at >= dt(2023, 1, 1));
            assert!(fb.created_at <= cfg.reference_time);
        }
    }

    #[test]
    fn responses_follow_their_feedback_in_time() {
        let catalog = catalog();
        let pools = pools(20);
        let cfg = SynthConfig::new(42, dt(2025, 6, 1));
        let raw = vec![raw_feedback(7, 11, None)];
        let mut rng = StdRng::seed_from_u64(42);
        let build = build_feedback(&raw, &catalog, &pools, &cfg, &mut rng);

        let raw_responses = vec![
            RawFeedbackResponse {
                feedback_id: 7,
                content: "Tiki xin cảm ơn".into(),
            },
            RawFeedbackResponse {
                feedback_id: 404,
                content: "shop cảm ơn".into(),
            },
        ];
        let responses =
            build_feedback_responses(&raw_responses, &build, &pools, &cfg, &mut rng);
        assert_eq!(responses.len(), 2);

        let matched = &responses[0];
        assert_eq!(matched.feedback_id.as_deref(), Some(build.feedbacks[0].id.as_str()));
        assert!(matched.created_at >= build.feedbacks[0].created_at);
        assert_eq!(matched.comment, "PTIT-EShop xin cảm ơn");

        let unmatched = &responses[1];
        assert!(unmatched.feedback_id.is_none());
        assert_eq!(unmatched.created_at, cfg.reference_time);
    }

    #[test]
    fn house_brand_rewrite_is_case_insensitive() {
        assert_eq!(rewrite_house_brand("TIKI và tiki"), "PTIT-EShop và PTIT-EShop");
        assert_eq!(rewrite_house_brand("không nhắc tên"), "không nhắc tên");
    }
}

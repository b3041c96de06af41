//! Batch orchestration: cleaned raw rows in, the twelve entity sets
//! out. Single-threaded and side-effect free; re-running over the same
//! input with the same config reproduces every id bit for bit.

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;

use crate::catalog::builder::{build_catalog, merge_sources};
use crate::catalog::raw::{RawFeedback, RawFeedbackResponse, RawProduct};
use crate::entities::{
    Attribute, AttributeValue, AttributeVariant, Category, Discount, Feedback,
    FeedbackResponse, Order, OrderHistory, OrderItem, Product, ProductVariant,
};
use crate::synth::discount::generate_discounts;
use crate::synth::feedback::{build_feedback, build_feedback_responses};
use crate::synth::order::build_orders;
use crate::synth::{IdentityPools, SynthConfig};

/// Everything the transform consumes: cleaned per-source catalog rows,
/// cleaned feedback/response rows, and the read-only identity pools.
#[derive(Debug, Default)]
pub struct PipelineInput {
    pub products: Vec<(String, Vec<RawProduct>)>,
    pub feedback: Vec<RawFeedback>,
    pub feedback_responses: Vec<RawFeedbackResponse>,
    pub pools: IdentityPools,
}

/// The twelve output entity sets in store dependency order.
#[derive(Debug, Default)]
pub struct EntitySets {
    pub categories: Vec<Category>,
    pub products: Vec<Product>,
    pub attributes: Vec<Attribute>,
    pub attribute_values: Vec<AttributeValue>,
    pub product_variants: Vec<ProductVariant>,
    pub attribute_variants: Vec<AttributeVariant>,
    pub feedbacks: Vec<Feedback>,
    pub feedback_responses: Vec<FeedbackResponse>,
    pub discounts: Vec<Discount>,
    pub orders: Vec<Order>,
    pub order_items: Vec<OrderItem>,
    pub order_histories: Vec<OrderHistory>,
}

impl EntitySets {
    /// Per-set row counts, in dependency order.
    pub fn counts(&self) -> Vec<(&'static str, usize)> {
        vec![
            ("category", self.categories.len()),
            ("product", self.products.len()),
            ("attribute", self.attributes.len()),
            ("attribute_value", self.attribute_values.len()),
            ("product_variant", self.product_variants.len()),
            ("attribute_variant", self.attribute_variants.len()),
            ("feedback", self.feedbacks.len()),
            ("feedback_response", self.feedback_responses.len()),
            ("discount", self.discounts.len()),
            ("order", self.orders.len()),
            ("order_item", self.order_items.len()),
            ("order_history", self.order_histories.len()),
        ]
    }
}

/// Run the full transform.
///
/// One `StdRng` seeded from `cfg.seed` is consumed in this fixed order,
/// which is part of the determinism contract — reordering any stage
/// changes every downstream synthetic row:
///
/// 1. catalog variant pricing/stock (per option, in merged row order)
/// 2. feedback (customer sample, then per raw row)
/// 3. feedback responses (per raw row)
/// 4. discounts (variant sample, then per discount)
/// 5. orders (variant fill pool, then per order row)
///
/// Stage boundaries are hard orderings: the attribute/value id maps are
/// fully materialized inside `build_catalog` before any variant row is
/// emitted, and the catalog is complete before any synthesis starts.
pub fn run(input: &PipelineInput, cfg: &SynthConfig) -> EntitySets {
    let mut rng = StdRng::seed_from_u64(cfg.seed);

    let merged = merge_sources(&input.products);
    info!(rows = merged.len(), "raw catalog rows merged");
    let catalog = build_catalog(&merged, &mut rng);

    let feedback_build =
        build_feedback(&input.feedback, &catalog, &input.pools, cfg, &mut rng);
    let feedback_responses = build_feedback_responses(
        &input.feedback_responses,
        &feedback_build,
        &input.pools,
        cfg,
        &mut rng,
    );
    let (discounts, vouchers) = generate_discounts(&catalog.variants, cfg, &mut rng);
    let order_build = build_orders(
        &feedback_build.feedbacks,
        &catalog,
        &input.pools,
        &vouchers,
        cfg,
        &mut rng,
    );

    EntitySets {
        categories: catalog.categories,
        products: catalog.products,
        attributes: catalog.attributes,
        attribute_values: catalog.attribute_values,
        product_variants: catalog.variants,
        attribute_variants: catalog.attribute_variants,
        feedbacks: feedback_build.feedbacks,
        feedback_responses,
        discounts,
        orders: order_build.orders,
        order_items: order_build.items,
        order_histories: order_build.histories,
    }
}

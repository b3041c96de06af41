//! Builds the six catalog entity sets from cleaned raw rows.
//!
//! Construction is two-pass: the global Attribute/AttributeValue sets
//! are fully materialized (with their content ids) before any variant
//! is emitted, because AttributeVariant join rows reference those ids.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use indexmap::IndexMap;
use rand::rngs::StdRng;
use rand::Rng;
use tracing::{info, warn};

use crate::catalog::raw::RawProduct;
use crate::catalog::variant::parse_options;
use crate::entities::{
    Attribute, AttributeValue, AttributeVariant, Category, Product, ProductVariant,
};
use crate::normalization::category;
use crate::normalization::text::fold_diacritics;

/// The reconciled catalog plus the lookup tables the synthetic
/// transaction stage needs to resolve source-side references.
#[derive(Debug, Default)]
pub struct Catalog {
    pub categories: Vec<Category>,
    pub products: Vec<Product>,
    pub attributes: Vec<Attribute>,
    pub attribute_values: Vec<AttributeValue>,
    pub variants: Vec<ProductVariant>,
    pub attribute_variants: Vec<AttributeVariant>,
    /// Storefront product id -> content-addressed product id.
    pub product_by_source: HashMap<i64, String>,
    /// (storefront product id, sorted canonical pairs) -> variant id;
    /// used to resolve free-text feedback variant descriptions.
    pub variant_by_option: HashMap<(i64, Vec<(String, String)>), String>,
    /// Product id -> its variant ids in build order.
    pub variants_by_product: HashMap<String, Vec<String>>,
}

/// Reconcile per-source categories and concatenate the cleaned frames
/// in the fixed source order, de-duplicating by the storefront natural
/// key (first occurrence wins).
pub fn merge_sources(sources: &[(String, Vec<RawProduct>)]) -> Vec<RawProduct> {
    let mut seen_ids = HashSet::new();
    let mut merged = Vec::new();
    for (source, rows) in sources {
        for row in rows {
            if !seen_ids.insert(row.source_id) {
                continue;
            }
            let mut row = row.clone();
            row.category = category::reconcile(source, &row.category, &row.name);
            merged.push(row);
        }
    }
    merged
}

fn make_sku(brand: &str, category: &str, ordinal: u64) -> String {
    let brand = fold_diacritics(brand);
    let category = fold_diacritics(category);
    let prefix: String = brand.chars().take(2).collect::<String>().to_uppercase();
    let initials: String = category
        .split_whitespace()
        .filter_map(|word| word.chars().next())
        .collect::<String>()
        .to_uppercase();
    format!("{prefix}-{initials}-{ordinal}")
}

/// Wholesale cost sampled around 80% of the selling price with a 5%
/// standard deviation (Box-Muller over the pipeline RNG), floored at
/// half the price. The sample is NOT capped above 1.0, so
/// `original_price` can exceed `price` and profit can go negative; that
/// boundary case is intentional and preserved.
fn sample_original_price(rng: &mut StdRng, price: i64) -> i64 {
    const MEAN: f64 = 0.8;
    const STD_DEV: f64 = 0.05;
    let u1: f64 = rng.gen();
    let u2: f64 = rng.gen();
    let z = (-2.0 * (1.0 - u1).ln()).sqrt() * (std::f64::consts::TAU * u2).cos();
    let sampled = price as f64 * (MEAN + STD_DEV * z);
    sampled.max(price as f64 * 0.5).round() as i64
}

/// Build the catalog entity sets from merged, reconciled rows.
///
/// RNG consumption order (fixed): per option, in row order —
/// stock, cost gaussian (two uniforms), then sold when stock > 10.
pub fn build_catalog(rows: &[RawProduct], rng: &mut StdRng) -> Catalog {
    let mut catalog = Catalog::default();

    // Category set: one per distinct reconciled name, first-seen order.
    let mut category_ids: IndexMap<String, String> = IndexMap::new();
    for row in rows {
        if !category_ids.contains_key(&row.category) {
            let cat = Category::new(row.category.clone());
            category_ids.insert(row.category.clone(), cat.id.clone());
            catalog.categories.push(cat);
        }
    }

    // Pass 1: the global attribute/value sets across every parseable
    // option, so the id maps are complete before variants are built.
    let mut attr_values: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for row in rows {
        let Ok(options) = parse_options(&row.variants) else {
            continue;
        };
        for option in &options {
            for (attr, value) in option.attrs.iter().zip(option.values.iter()) {
                attr_values
                    .entry(attr.clone())
                    .or_default()
                    .insert(value.clone());
            }
        }
    }

    let mut attribute_ids: HashMap<String, String> = HashMap::new();
    let mut value_ids: HashMap<(String, String), String> = HashMap::new();
    for (name, values) in &attr_values {
        let attribute = Attribute::new(name.clone());
        attribute_ids.insert(name.clone(), attribute.id.clone());
        for value in values {
            let av = AttributeValue::new(attribute.id.clone(), value.clone());
            value_ids.insert((name.clone(), value.clone()), av.id.clone());
            catalog.attribute_values.push(av);
        }
        catalog.attributes.push(attribute);
    }

    // Pass 2: products, variants and join rows.
    let mut product_seen: HashSet<String> = HashSet::new();
    let mut join_seen: HashSet<String> = HashSet::new();
    let mut ordinal: u64 = 1;
    let mut dropped = 0usize;
    for row in rows {
        let options = match parse_options(&row.variants) {
            Ok(options) => options,
            Err(err) => {
                warn!(
                    source_id = row.source_id,
                    name = %row.name,
                    error = %err,
                    "dropping product with unparseable variant field"
                );
                dropped += 1;
                continue;
            }
        };

        let category_id = category_ids
            .get(&row.category)
            .cloned()
            .unwrap_or_default();
        let mut product = Product {
            id: String::new(),
            category_id,
            name: row.name.clone(),
            description: row.description.clone(),
            specification: row.specification.clone(),
            image_url: row.image_url.clone(),
            brand: row.brand.clone(),
        };
        product.id = product.content_id();
        let product_id = product.id.clone();
        if product_seen.insert(product_id.clone()) {
            catalog.products.push(product);
        }
        catalog
            .product_by_source
            .insert(row.source_id, product_id.clone());

        for option in &options {
            let stock_quantity: i64 = rng.gen_range(0..=120);
            let original_price = sample_original_price(rng, option.price);
            let profit = option.price - original_price;
            let sku = make_sku(&row.brand, &row.category, ordinal);
            let sold_quantity = if stock_quantity > 10 {
                rng.gen_range(stock_quantity / 2..=stock_quantity)
            } else {
                0
            };

            let mut variant = ProductVariant {
                id: String::new(),
                product_id: product_id.clone(),
                price: option.price,
                original_price,
                profit,
                sku,
                stock_quantity,
                sold_quantity,
            };
            variant.id = variant.content_id();

            for (attr, value) in option.attrs.iter().zip(option.values.iter()) {
                let join = AttributeVariant {
                    product_variant_id: variant.id.clone(),
                    attribute_id: attribute_ids[attr].clone(),
                    attribute_value_id: value_ids[&(attr.clone(), value.clone())].clone(),
                };
                if join_seen.insert(join.row_hash()) {
                    catalog.attribute_variants.push(join);
                }
            }

            catalog
                .variant_by_option
                .insert((row.source_id, option.sorted_pairs()), variant.id.clone());
            catalog
                .variants_by_product
                .entry(product_id.clone())
                .or_default()
                .push(variant.id.clone());
            catalog.variants.push(variant);
            ordinal += 1;
        }
    }

    info!(
        categories = catalog.categories.len(),
        products = catalog.products.len(),
        attributes = catalog.attributes.len(),
        attribute_values = catalog.attribute_values.len(),
        variants = catalog.variants.len(),
        attribute_variants = catalog.attribute_variants.len(),
        dropped,
        "catalog built"
    );
    catalog
}

//! Idempotent merge into the shared store: every set is staged into a
//! temp table and inserted with `WHERE NOT EXISTS` on the
//! content-addressed id, so re-running a batch over overlapping data
//! never duplicates a row. Sets load in foreign-key dependency order.

use anyhow::{Context, Result};
use sqlx::{PgConnection, QueryBuilder};
use tracing::info;

use crate::entities::{
    Attribute, AttributeValue, AttributeVariant, Category, Discount, Feedback,
    FeedbackResponse, Order, OrderHistory, OrderItem, Product, ProductVariant,
};
use crate::load::db::Db;
use crate::pipeline::EntitySets;

/// Rows per staged INSERT; keeps bind counts far under the wire limit.
const BATCH: usize = 1000;

async fn stage<'a, T, F>(
    conn: &mut PgConnection,
    insert_prefix: &str,
    rows: &'a [T],
    mut bind: F,
) -> Result<()>
where
    F: FnMut(sqlx::query_builder::Separated<'_, 'a, sqlx::Postgres, &'static str>, &'a T),
{
    for chunk in rows.chunks(BATCH) {
        let mut qb: QueryBuilder<sqlx::Postgres> = QueryBuilder::new(insert_prefix);
        qb.push_values(chunk, |b, row| bind(b, row));
        qb.build().persistent(false).execute(&mut *conn).await?;
    }
    Ok(())
}

async fn merge_stage(
    conn: &mut PgConnection,
    temp_table: &str,
    merge_sql: &str,
) -> Result<u64> {
    let inserted = sqlx::query(merge_sql)
        .persistent(false)
        .execute(&mut *conn)
        .await?
        .rows_affected();
    sqlx::query(&format!("DROP TABLE {temp_table}"))
        .persistent(false)
        .execute(&mut *conn)
        .await?;
    Ok(inserted)
}

async fn create_stage(conn: &mut PgConnection, ddl: &str, index: &str) -> Result<()> {
    sqlx::query(ddl).persistent(false).execute(&mut *conn).await?;
    sqlx::query(index)
        .persistent(false)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

async fn upsert_categories(conn: &mut PgConnection, rows: &[Category]) -> Result<u64> {
    if rows.is_empty() {
        return Ok(0);
    }
    create_stage(
        conn,
        "CREATE TEMP TABLE tmp_category (id TEXT NOT NULL, name TEXT)",
        "CREATE INDEX tmp_category_id_idx ON tmp_category (id)",
    )
    .await?;
    stage(conn, "INSERT INTO tmp_category (id, name) ", rows, |mut b, row| {
        b.push_bind(&row.id).push_bind(&row.name);
    })
    .await?;
    merge_stage(
        conn,
        "tmp_category",
        "INSERT INTO category (id, name)
         SELECT DISTINCT ON (t.id) t.id, t.name FROM tmp_category AS t
         WHERE NOT EXISTS (SELECT 1 FROM category AS c WHERE c.id = t.id)",
    )
    .await
}

async fn upsert_products(conn: &mut PgConnection, rows: &[Product]) -> Result<u64> {
    if rows.is_empty() {
        return Ok(0);
    }
    create_stage(
        conn,
        "CREATE TEMP TABLE tmp_product (
            id TEXT NOT NULL, category_id TEXT, name TEXT, description TEXT,
            specification TEXT, image_url TEXT, brand TEXT)",
        "CREATE INDEX tmp_product_id_idx ON tmp_product (id)",
    )
    .await?;
    stage(
        conn,
        "INSERT INTO tmp_product (id, category_id, name, description, specification, image_url, brand) ",
        rows,
        |mut b, row| {
            b.push_bind(&row.id)
                .push_bind(&row.category_id)
                .push_bind(&row.name)
                .push_bind(&row.description)
                .push_bind(&row.specification)
                .push_bind(&row.image_url)
                .push_bind(&row.brand);
        },
    )
    .await?;
    merge_stage(
        conn,
        "tmp_product",
        "INSERT INTO product (id, category_id, name, description, specification, image_url, brand)
         SELECT DISTINCT ON (t.id) t.id, t.category_id, t.name, t.description, t.specification, t.image_url, t.brand
         FROM tmp_product AS t
         WHERE NOT EXISTS (SELECT 1 FROM product AS p WHERE p.id = t.id)",
    )
    .await
}

async fn upsert_attributes(conn: &mut PgConnection, rows: &[Attribute]) -> Result<u64> {
    if rows.is_empty() {
        return Ok(0);
    }
    create_stage(
        conn,
        "CREATE TEMP TABLE tmp_attribute (id TEXT NOT NULL, name TEXT)",
        "CREATE INDEX tmp_attribute_id_idx ON tmp_attribute (id)",
    )
    .await?;
    stage(conn, "INSERT INTO tmp_attribute (id, name) ", rows, |mut b, row| {
        b.push_bind(&row.id).push_bind(&row.name);
    })
    .await?;
    merge_stage(
        conn,
        "tmp_attribute",
        "INSERT INTO attribute (id, name)
         SELECT DISTINCT ON (t.id) t.id, t.name FROM tmp_attribute AS t
         WHERE NOT EXISTS (SELECT 1 FROM attribute AS a WHERE a.id = t.id)",
    )
    .await
}

async fn upsert_attribute_values(
    conn: &mut PgConnection,
    rows: &[AttributeValue],
) -> Result<u64> {
    if rows.is_empty() {
        return Ok(0);
    }
    create_stage(
        conn,
        "CREATE TEMP TABLE tmp_attribute_value (id TEXT NOT NULL, attribute_id TEXT, value TEXT)",
        "CREATE INDEX tmp_attribute_value_id_idx ON tmp_attribute_value (id)",
    )
    .await?;
    stage(
        conn,
        "INSERT INTO tmp_attribute_value (id, attribute_id, value) ",
        rows,
        |mut b, row| {
            b.push_bind(&row.id)
                .push_bind(&row.attribute_id)
                .push_bind(&row.value);
        },
    )
    .await?;
    merge_stage(
        conn,
        "tmp_attribute_value",
        "INSERT INTO attribute_value (id, attribute_id, value)
         SELECT DISTINCT ON (t.id) t.id, t.attribute_id, t.value FROM tmp_attribute_value AS t
         WHERE NOT EXISTS (SELECT 1 FROM attribute_value AS av WHERE av.id = t.id)",
    )
    .await
}

async fn upsert_product_variants(
    conn: &mut PgConnection,
    rows: &[ProductVariant],
) -> Result<u64> {
    if rows.is_empty() {
        return Ok(0);
    }
    create_stage(
        conn,
        "CREATE TEMP TABLE tmp_product_variant (
            id TEXT NOT NULL, product_id TEXT, price DOUBLE PRECISION,
            original_price DOUBLE PRECISION, profit DOUBLE PRECISION, sku TEXT,
            stock_quantity BIGINT, sold_quantity BIGINT)",
        "CREATE INDEX tmp_product_variant_id_idx ON tmp_product_variant (id)",
    )
    .await?;
    stage(
        conn,
        "INSERT INTO tmp_product_variant (id, product_id, price, original_price, profit, sku, stock_quantity, sold_quantity) ",
        rows,
        |mut b, row| {
            b.push_bind(&row.id)
                .push_bind(&row.product_id)
                .push_bind(row.price as f64)
                .push_bind(row.original_price as f64)
                .push_bind(row.profit as f64)
                .push_bind(&row.sku)
                .push_bind(row.stock_quantity)
                .push_bind(row.sold_quantity);
        },
    )
    .await?;
    merge_stage(
        conn,
        "tmp_product_variant",
        "INSERT INTO product_variant (id, product_id, price, original_price, profit, sku, stock_quantity, sold_quantity)
         SELECT DISTINCT ON (t.id) t.id, t.product_id, t.price, t.original_price, t.profit, t.sku, t.stock_quantity, t.sold_quantity
         FROM tmp_product_variant AS t
         WHERE NOT EXISTS (SELECT 1 FROM product_variant AS pv WHERE pv.id = t.id)",
    )
    .await
}

async fn upsert_attribute_variants(
    conn: &mut PgConnection,
    rows: &[AttributeVariant],
) -> Result<u64> {
    if rows.is_empty() {
        return Ok(0);
    }
    create_stage(
        conn,
        "CREATE TEMP TABLE tmp_attribute_variant (
            hash TEXT NOT NULL, product_variant_id TEXT, attribute_id TEXT, attribute_value_id TEXT)",
        "CREATE INDEX tmp_attribute_variant_hash_idx ON tmp_attribute_variant (hash)",
    )
    .await?;
    stage(
        conn,
        "INSERT INTO tmp_attribute_variant (hash, product_variant_id, attribute_id, attribute_value_id) ",
        rows,
        |mut b, row| {
            b.push_bind(row.row_hash())
                .push_bind(&row.product_variant_id)
                .push_bind(&row.attribute_id)
                .push_bind(&row.attribute_value_id);
        },
    )
    .await?;
    merge_stage(
        conn,
        "tmp_attribute_variant",
        "INSERT INTO attribute_variant (hash, product_variant_id, attribute_id, attribute_value_id)
         SELECT DISTINCT ON (t.hash) t.hash, t.product_variant_id, t.attribute_id, t.attribute_value_id
         FROM tmp_attribute_variant AS t
         WHERE NOT EXISTS (SELECT 1 FROM attribute_variant AS av WHERE av.hash = t.hash)",
    )
    .await
}

async fn upsert_feedbacks(conn: &mut PgConnection, rows: &[Feedback]) -> Result<u64> {
    if rows.is_empty() {
        return Ok(0);
    }
    create_stage(
        conn,
        "CREATE TEMP TABLE tmp_feedback (
            id TEXT NOT NULL, customer_id BIGINT, product_id TEXT, product_variant_id TEXT,
            rating DOUBLE PRECISION, comment TEXT, created_at TIMESTAMP)",
        "CREATE INDEX tmp_feedback_id_idx ON tmp_feedback (id)",
    )
    .await?;
    stage(
        conn,
        "INSERT INTO tmp_feedback (id, customer_id, product_id, product_variant_id, rating, comment, created_at) ",
        rows,
        |mut b, row| {
            b.push_bind(&row.id)
                .push_bind(row.customer_id)
                .push_bind(&row.product_id)
                .push_bind(&row.product_variant_id)
                .push_bind(row.rating)
                .push_bind(&row.comment)
                .push_bind(row.created_at);
        },
    )
    .await?;
    merge_stage(
        conn,
        "tmp_feedback",
        "INSERT INTO feedback (id, customer_id, product_id, product_variant_id, rating, comment, created_at)
         SELECT DISTINCT ON (t.id) t.id, t.customer_id, t.product_id, t.product_variant_id, t.rating, t.comment, t.created_at
         FROM tmp_feedback AS t
         WHERE NOT EXISTS (SELECT 1 FROM feedback AS f WHERE f.id = t.id)",
    )
    .await
}

async fn upsert_feedback_responses(
    conn: &mut PgConnection,
    rows: &[FeedbackResponse],
) -> Result<u64> {
    if rows.is_empty() {
        return Ok(0);
    }
    create_stage(
        conn,
        "CREATE TEMP TABLE tmp_feedback_response (
            id TEXT NOT NULL, manager_id BIGINT, feedback_id TEXT, comment TEXT, created_at TIMESTAMP)",
        "CREATE INDEX tmp_feedback_response_id_idx ON tmp_feedback_response (id)",
    )
    .await?;
    stage(
        conn,
        "INSERT INTO tmp_feedback_response (id, manager_id, feedback_id, comment, created_at) ",
        rows,
        |mut b, row| {
            b.push_bind(&row.id)
                .push_bind(row.manager_id)
                .push_bind(&row.feedback_id)
                .push_bind(&row.comment)
                .push_bind(row.created_at);
        },
    )
    .await?;
    merge_stage(
        conn,
        "tmp_feedback_response",
        "INSERT INTO feedback_response (id, manager_id, feedback_id, comment, created_at)
         SELECT DISTINCT ON (t.id) t.id, t.manager_id, t.feedback_id, t.comment, t.created_at
         FROM tmp_feedback_response AS t
         WHERE NOT EXISTS (SELECT 1 FROM feedback_response AS fr WHERE fr.id = t.id)",
    )
    .await
}

async fn upsert_discounts(conn: &mut PgConnection, rows: &[Discount]) -> Result<u64> {
    if rows.is_empty() {
        return Ok(0);
    }
    create_stage(
        conn,
        "CREATE TEMP TABLE tmp_discount (
            id TEXT NOT NULL, product_variant_id TEXT, code TEXT, name TEXT, type TEXT,
            value DOUBLE PRECISION, status TEXT, start_date TIMESTAMP, end_date TIMESTAMP)",
        "CREATE INDEX tmp_discount_id_idx ON tmp_discount (id)",
    )
    .await?;
    stage(
        conn,
        "INSERT INTO tmp_discount (id, product_variant_id, code, name, type, value, status, start_date, end_date) ",
        rows,
        |mut b, row| {
            b.push_bind(&row.id)
                .push_bind(&row.product_variant_id)
                .push_bind(&row.code)
                .push_bind(&row.name)
                .push_bind(row.kind.as_str())
                .push_bind(row.value)
                .push_bind(row.status.as_str())
                .push_bind(row.start_date)
                .push_bind(row.end_date);
        },
    )
    .await?;
    merge_stage(
        conn,
        "tmp_discount",
        "INSERT INTO discount (id, product_variant_id, code, name, type, value, status, start_date, end_date)
         SELECT DISTINCT ON (t.id) t.id, t.product_variant_id, t.code, t.name, t.type, t.value, t.status, t.start_date, t.end_date
         FROM tmp_discount AS t
         WHERE NOT EXISTS (SELECT 1 FROM discount AS d WHERE d.id = t.id)",
    )
    .await
}

async fn upsert_orders(conn: &mut PgConnection, rows: &[Order]) -> Result<u64> {
    if rows.is_empty() {
        return Ok(0);
    }
    create_stage(
        conn,
        "CREATE TEMP TABLE tmp_order (
            id TEXT NOT NULL, customer_id BIGINT, order_date TIMESTAMP, shipping_address TEXT,
            status TEXT, payment_method TEXT, payment_date TIMESTAMP, payment_status TEXT,
            payment_amount DOUBLE PRECISION)",
        "CREATE INDEX tmp_order_id_idx ON tmp_order (id)",
    )
    .await?;
    stage(
        conn,
        "INSERT INTO tmp_order (id, customer_id, order_date, shipping_address, status, payment_method, payment_date, payment_status, payment_amount) ",
        rows,
        |mut b, row| {
            b.push_bind(&row.id)
                .push_bind(row.customer_id)
                .push_bind(row.order_date)
                .push_bind(&row.shipping_address)
                .push_bind(row.status.as_str())
                .push_bind(row.payment_method.as_str())
                .push_bind(row.payment_date)
                .push_bind(row.payment_status.as_str())
                .push_bind(row.payment_amount);
        },
    )
    .await?;
    merge_stage(
        conn,
        "tmp_order",
        "INSERT INTO \"order\" (id, customer_id, order_date, shipping_address, status, payment_method, payment_date, payment_status, payment_amount)
         SELECT DISTINCT ON (t.id) t.id, t.customer_id, t.order_date, t.shipping_address, t.status, t.payment_method, t.payment_date, t.payment_status, t.payment_amount
         FROM tmp_order AS t
         WHERE NOT EXISTS (SELECT 1 FROM \"order\" AS o WHERE o.id = t.id)",
    )
    .await
}

async fn upsert_order_items(conn: &mut PgConnection, rows: &[OrderItem]) -> Result<u64> {
    if rows.is_empty() {
        return Ok(0);
    }
    create_stage(
        conn,
        "CREATE TEMP TABLE tmp_order_item (
            id TEXT NOT NULL, product_variant_id TEXT, order_id TEXT,
            quantity BIGINT, unit_price DOUBLE PRECISION, note TEXT)",
        "CREATE INDEX tmp_order_item_id_idx ON tmp_order_item (id)",
    )
    .await?;
    stage(
        conn,
        "INSERT INTO tmp_order_item (id, product_variant_id, order_id, quantity, unit_price, note) ",
        rows,
        |mut b, row| {
            b.push_bind(&row.id)
                .push_bind(&row.product_variant_id)
                .push_bind(&row.order_id)
                .push_bind(row.quantity)
                .push_bind(row.unit_price as f64)
                .push_bind(&row.note);
        },
    )
    .await?;
    merge_stage(
        conn,
        "tmp_order_item",
        "INSERT INTO order_item (id, product_variant_id, order_id, quantity, unit_price, note)
         SELECT DISTINCT ON (t.id) t.id, t.product_variant_id, t.order_id, t.quantity, t.unit_price, t.note
         FROM tmp_order_item AS t
         WHERE NOT EXISTS (SELECT 1 FROM order_item AS oi WHERE oi.id = t.id)",
    )
    .await
}

async fn upsert_order_histories(
    conn: &mut PgConnection,
    rows: &[OrderHistory],
) -> Result<u64> {
    if rows.is_empty() {
        return Ok(0);
    }
    create_stage(
        conn,
        "CREATE TEMP TABLE tmp_order_history (
            id TEXT NOT NULL, manager_id BIGINT, order_id TEXT,
            processing_time TIMESTAMP, previous_status TEXT, new_status TEXT)",
        "CREATE INDEX tmp_order_history_id_idx ON tmp_order_history (id)",
    )
    .await?;
    stage(
        conn,
        "INSERT INTO tmp_order_history (id, manager_id, order_id, processing_time, previous_status, new_status) ",
        rows,
        |mut b, row| {
            b.push_bind(&row.id)
                .push_bind(row.manager_id)
                .push_bind(&row.order_id)
                .push_bind(row.processing_time)
                .push_bind(row.previous_status.as_str())
                .push_bind(row.new_status.as_str());
        },
    )
    .await?;
    merge_stage(
        conn,
        "tmp_order_history",
        "INSERT INTO order_history (id, manager_id, order_id, processing_time, previous_status, new_status)
         SELECT DISTINCT ON (t.id) t.id, t.manager_id, t.order_id, t.processing_time, t.previous_status, t.new_status
         FROM tmp_order_history AS t
         WHERE NOT EXISTS (SELECT 1 FROM order_history AS oh WHERE oh.id = t.id)",
    )
    .await
}

/// Load all twelve sets in foreign-key dependency order:
/// category -> product -> (attribute, attribute_value) -> product_variant
/// -> attribute_variant -> feedback -> feedback_response -> discount
/// -> order -> (order_item, order_history).
pub async fn save_all(db: &Db, sets: &EntitySets) -> Result<()> {
    let mut conn = db.pool.acquire().await.context("acquiring store connection")?;

    let inserted = upsert_categories(&mut conn, &sets.categories).await?;
    info!(set = "category", inserted, total = sets.categories.len(), "merged");
    let inserted = upsert_products(&mut conn, &sets.products).await?;
    info!(set = "product", inserted, total = sets.products.len(), "merged");
    let inserted = upsert_attributes(&mut conn, &sets.attributes).await?;
    info!(set = "attribute", inserted, total = sets.attributes.len(), "merged");
    let inserted = upsert_attribute_values(&mut conn, &sets.attribute_values).await?;
    info!(set = "attribute_value", inserted, total = sets.attribute_values.len(), "merged");
    let inserted = upsert_product_variants(&mut conn, &sets.product_variants).await?;
    info!(set = "product_variant", inserted, total = sets.product_variants.len(), "merged");
    let inserted = upsert_attribute_variants(&mut conn, &sets.attribute_variants).await?;
    info!(set = "attribute_variant", inserted, total = sets.attribute_variants.len(), "merged");
    let inserted = upsert_feedbacks(&mut conn, &sets.feedbacks).await?;
    info!(set = "feedback", inserted, total = sets.feedbacks.len(), "merged");
    let inserted = upsert_feedback_responses(&mut conn, &sets.feedback_responses).await?;
    info!(set = "feedback_response", inserted, total = sets.feedback_responses.len(), "merged");
    let inserted = upsert_discounts(&mut conn, &sets.discounts).await?;
    info!(set = "discount", inserted, total = sets.discounts.len(), "merged");
    let inserted = upsert_orders(&mut conn, &sets.orders).await?;
    info!(set = "order", inserted, total = sets.orders.len(), "merged");
    let inserted = upsert_order_items(&mut conn, &sets.order_items).await?;
    info!(set = "order_item", inserted, total = sets.order_items.len(), "merged");
    let inserted = upsert_order_histories(&mut conn, &sets.order_histories).await?;
    info!(set = "order_history", inserted, total = sets.order_histories.len(), "merged");

    Ok(())
}

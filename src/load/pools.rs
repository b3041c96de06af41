//! Identity-pool fetch: the synthesizer samples customers and managers
//! from the store but never writes them; both pools are read-only
//! inputs here.

use anyhow::{Context, Result};
use sqlx::Row;
use tracing::info;

use crate::load::db::Db;
use crate::synth::{Customer, IdentityPools};

async fn fetch_customers(db: &Db) -> Result<Vec<Customer>> {
    let rows = sqlx::query(
        "SELECT c.id, a.created_at, c.address
         FROM customer AS c
         JOIN account AS a ON c.account_id = a.id
         WHERE a.status != 'banned'",
    )
    .persistent(false)
    .fetch_all(&db.pool)
    .await
    .context("fetching customer pool")?;

    Ok(rows
        .into_iter()
        .map(|row| Customer {
            id: row.get("id"),
            created_at: row.get("created_at"),
            address: row.get("address"),
        })
        .collect())
}

async fn fetch_managers(db: &Db, role: &str) -> Result<Vec<i64>> {
    sqlx::query_scalar(
        "SELECT m.id
         FROM manager AS m
         JOIN role AS r ON m.role_id = r.id
         WHERE r.name = $1",
    )
    .persistent(false)
    .bind(role)
    .fetch_all(&db.pool)
    .await
    .with_context(|| format!("fetching {role} manager pool"))
}

pub async fn fetch_identity_pools(db: &Db) -> Result<IdentityPools> {
    let customers = fetch_customers(db).await?;
    let service_managers = fetch_managers(db, "service_customer").await?;
    let product_managers = fetch_managers(db, "product_manager").await?;
    info!(
        customers = customers.len(),
        service_managers = service_managers.len(),
        product_managers = product_managers.len(),
        "identity pools fetched"
    );
    Ok(IdentityPools {
        customers,
        service_managers,
        product_managers,
    })
}

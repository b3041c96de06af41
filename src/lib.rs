//! eshop-etl: reconciles heterogeneous storefront catalog and review
//! exports into a normalized, content-addressed dataset, then
//! synthesizes an internally consistent order/feedback/discount history
//! over the reconciled catalog for idempotent loading into the shared
//! store.
//!
//! The core transform ([`pipeline`]) is pure and deterministic for a
//! given seed; CSV input, identity-pool fetches and the hash-keyed
//! merge into Postgres live under [`load`] as the I/O shell.

pub mod catalog;
pub mod entities;
pub mod error;
pub mod identity;
pub mod load;
pub mod normalization;
pub mod pipeline;
pub mod synth;

pub mod util {
    pub mod env;
}

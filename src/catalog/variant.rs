//! Parser for the free-text variant mini-language used by the raw
//! catalog exports:
//!
//! ```text
//! Màu: Đen $$ Dung lượng: 128Gb = 5000000 VND
//! Màu: Trắng $$ Dung lượng: 256Gb = 6500000 VND
//! ```
//!
//! A field without `=` is a bare price and yields one synthetic
//! "Loại: Mặc Định" option. Attribute labels are canonicalized and
//! values Pascal-cased on the way out, so downstream consumers only
//! ever see the taxonomy form.

use atoi::atoi;
use tracing::warn;

use crate::error::RowError;
use crate::normalization::attribute::canonical_attribute;
use crate::normalization::text::pascal_case;

/// Attribute label of the synthetic option emitted for bare-price fields.
pub const DEFAULT_ATTR: &str = "Loại";
/// Value of the synthetic option emitted for bare-price fields.
pub const DEFAULT_VALUE: &str = "Mặc Định";

/// One priced option: parallel attribute/value lists plus the price.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantOption {
    pub attrs: Vec<String>,
    pub values: Vec<String>,
    pub price: i64,
}

impl VariantOption {
    /// Canonical `(attribute, value)` pairs sorted for lookup keys.
    pub fn sorted_pairs(&self) -> Vec<(String, String)> {
        let mut pairs: Vec<(String, String)> = self
            .attrs
            .iter()
            .cloned()
            .zip(self.values.iter().cloned())
            .collect();
        pairs.sort();
        pairs
    }
}

fn parse_price_token(side: &str) -> Result<i64, RowError> {
    let token = side
        .split_whitespace()
        .next()
        .ok_or_else(|| RowError::MalformedPrice {
            token: side.to_string(),
        })?;
    atoi::<i64>(token.as_bytes()).ok_or_else(|| RowError::MalformedPrice {
        token: token.to_string(),
    })
}

/// Parse one `attr: val $$ ... = price CURRENCY` line.
pub fn parse_option_line(line: &str) -> Result<VariantOption, RowError> {
    let (attr_side, price_side) =
        line.rsplit_once('=').ok_or_else(|| RowError::MalformedOption {
            pair: line.trim().to_string(),
        })?;

    let price = parse_price_token(price_side)?;

    let mut attrs = Vec::new();
    let mut values = Vec::new();
    for pair in attr_side.trim().split("$$") {
        let (attribute, value) =
            pair.split_once(':').ok_or_else(|| RowError::MalformedOption {
                pair: pair.trim().to_string(),
            })?;
        let value = pascal_case(value.trim());
        let attribute = canonical_attribute(attribute.trim(), &value);
        attrs.push(attribute.to_string());
        values.push(value);
    }
    if attrs.is_empty() {
        return Err(RowError::MalformedOption {
            pair: line.trim().to_string(),
        });
    }

    Ok(VariantOption { attrs, values, price })
}

/// Parse a whole variant field into its priced options.
///
/// Individual malformed lines are logged and skipped; the call only
/// fails when the field yields no option at all (bare price that is not
/// numeric, or every line rejected), in which case the caller drops the
/// product.
pub fn parse_options(field: &str) -> Result<Vec<VariantOption>, RowError> {
    if !field.contains('=') {
        let price = parse_price_token(field)?;
        return Ok(vec![VariantOption {
            attrs: vec![DEFAULT_ATTR.to_string()],
            values: vec![DEFAULT_VALUE.to_string()],
            price,
        }]);
    }

    let mut options = Vec::new();
    let mut first_error: Option<RowError> = None;
    for (idx, line) in field.trim().lines().enumerate() {
        match parse_option_line(line) {
            Ok(option) => options.push(option),
            Err(err) => {
                warn!(line = idx, error = %err, "rejecting malformed option line");
                first_error.get_or_insert(err);
            }
        }
    }
    if options.is_empty() {
        return Err(first_error.unwrap_or(RowError::MalformedOption {
            pair: field.trim().to_string(),
        }));
    }
    Ok(options)
}

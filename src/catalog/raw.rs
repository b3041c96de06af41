//! Raw export row types and the pre-parse cleaning pass: required-field
//! validation and exact-duplicate removal, both at row granularity.

use serde::Deserialize;
use tracing::warn;

use crate::error::RowError;
use crate::identity::FieldTuple;

fn required(
    value: &Option<String>,
    column: &'static str,
) -> Result<String, RowError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => Err(RowError::MissingRequiredField { column }),
    }
}

fn required_i64(value: &Option<String>, column: &'static str) -> Result<i64, RowError> {
    required(value, column)?
        .parse::<i64>()
        .map_err(|_| RowError::MissingRequiredField { column })
}

fn required_f64(value: &Option<String>, column: &'static str) -> Result<f64, RowError> {
    required(value, column)?
        .parse::<f64>()
        .map_err(|_| RowError::MissingRequiredField { column })
}

/// One catalog CSV row as exported, before validation. Column headers
/// are the storefront's Vietnamese names.
#[derive(Debug, Clone, Deserialize)]
pub struct RawProductRecord {
    #[serde(rename = "Id")]
    pub id: Option<String>,
    #[serde(rename = "Tên sản phẩm")]
    pub name: Option<String>,
    #[serde(rename = "Thương hiệu")]
    pub brand: Option<String>,
    #[serde(rename = "Danh mục")]
    pub category: Option<String>,
    #[serde(rename = "Thông số kỹ thuật")]
    pub specification: Option<String>,
    #[serde(rename = "Phiên bản")]
    pub variants: Option<String>,
    #[serde(rename = "Mô tả")]
    pub description: Option<String>,
    #[serde(rename = "Hình ảnh")]
    pub image_url: Option<String>,
}

/// A validated catalog row. `source_id` is the storefront's own product
/// id, kept only to de-duplicate across files and to resolve feedback
/// references; the reconciled entities are keyed by content hash.
#[derive(Debug, Clone)]
pub struct RawProduct {
    pub source_id: i64,
    pub name: String,
    pub brand: String,
    pub category: String,
    pub specification: String,
    pub variants: String,
    pub description: String,
    pub image_url: String,
}

impl RawProductRecord {
    pub fn validate(&self) -> Result<RawProduct, RowError> {
        Ok(RawProduct {
            source_id: required_i64(&self.id, "Id")?,
            name: required(&self.name, "Tên sản phẩm")?,
            brand: required(&self.brand, "Thương hiệu")?,
            category: required(&self.category, "Danh mục")?,
            specification: required(&self.specification, "Thông số kỹ thuật")?,
            variants: required(&self.variants, "Phiên bản")?,
            description: required(&self.description, "Mô tả")?,
            image_url: required(&self.image_url, "Hình ảnh")?,
        })
    }
}

impl RawProduct {
    fn row_key(&self) -> String {
        FieldTuple::new()
            .int("source_id", self.source_id)
            .text("name", &self.name)
            .text("brand", &self.brand)
            .text("category", &self.category)
            .text("specification", &self.specification)
            .text("variants", &self.variants)
            .text("description", &self.description)
            .text("image_url", &self.image_url)
            .digest()
    }
}

/// Validate and de-duplicate one source file's rows. Rows failing
/// validation are logged and dropped; exact duplicates keep their first
/// occurrence.
pub fn clean_products(source: &str, records: &[RawProductRecord]) -> Vec<RawProduct> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::with_capacity(records.len());
    for record in records {
        match record.validate() {
            Ok(row) => {
                if seen.insert(row.row_key()) {
                    out.push(row);
                }
            }
            Err(err) => {
                warn!(source = %source, error = %err, "dropping raw product row");
            }
        }
    }
    out
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawFeedbackRecord {
    pub feedback_id: Option<String>,
    pub product_id: Option<String>,
    pub customer_id: Option<String>,
    pub rating: Option<String>,
    pub content: Option<String>,
    pub variant: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RawFeedback {
    pub feedback_id: i64,
    pub product_id: i64,
    /// Source-side reviewer handle; only used as a memo key when
    /// assigning pool customers, never emitted.
    pub customer_id: String,
    pub rating: f64,
    pub content: String,
    pub variant: Option<String>,
}

impl RawFeedbackRecord {
    pub fn validate(&self) -> Result<RawFeedback, RowError> {
        let variant = self
            .variant
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("nan"))
            .map(str::to_string);
        Ok(RawFeedback {
            feedback_id: required_i64(&self.feedback_id, "feedback_id")?,
            product_id: required_i64(&self.product_id, "product_id")?,
            customer_id: self
                .customer_id
                .as_deref()
                .unwrap_or("")
                .trim()
                .to_string(),
            rating: required_f64(&self.rating, "rating")?,
            content: self.content.as_deref().unwrap_or("").trim().to_string(),
            variant,
        })
    }
}

impl RawFeedback {
    fn row_key(&self) -> String {
        FieldTuple::new()
            .int("feedback_id", self.feedback_id)
            .int("product_id", self.product_id)
            .text("customer_id", &self.customer_id)
            .float("rating", self.rating)
            .text("content", &self.content)
            .opt_text("variant", self.variant.as_deref())
            .digest()
    }
}

pub fn clean_feedback(records: &[RawFeedbackRecord]) -> Vec<RawFeedback> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::with_capacity(records.len());
    for record in records {
        match record.validate() {
            Ok(row) => {
                if seen.insert(row.row_key()) {
                    out.push(row);
                }
            }
            Err(err) => warn!(error = %err, "dropping raw feedback row"),
        }
    }
    out
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawFeedbackResponseRecord {
    pub feedback_id: Option<String>,
    pub content: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RawFeedbackResponse {
    pub feedback_id: i64,
    pub content: String,
}

impl RawFeedbackResponseRecord {
    pub fn validate(&self) -> Result<RawFeedbackResponse, RowError> {
        Ok(RawFeedbackResponse {
            feedback_id: required_i64(&self.feedback_id, "feedback_id")?,
            content: self.content.as_deref().unwrap_or("").trim().to_string(),
        })
    }
}

impl RawFeedbackResponse {
    fn row_key(&self) -> String {
        FieldTuple::new()
            .int("feedback_id", self.feedback_id)
            .text("content", &self.content)
            .digest()
    }
}

pub fn clean_feedback_responses(
    records: &[RawFeedbackResponseRecord],
) -> Vec<RawFeedbackResponse> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::with_capacity(records.len());
    for record in records {
        match record.validate() {
            Ok(row) => {
                if seen.insert(row.row_key()) {
                    out.push(row);
                }
            }
            Err(err) => warn!(error = %err, "dropping raw feedback response row"),
        }
    }
    out
}

//! The twelve output entity sets. Every entity's primary key is the
//! SHA-256 content digest of its canonical field tuple (see
//! [`crate::identity`]); the tuple layouts live here next to the
//! structs so the hash schema is visible in one place.

use chrono::NaiveDateTime;

use crate::identity::FieldTuple;

/// Canonical datetime rendering used in hashed tuples.
pub fn render_datetime(value: NaiveDateTime) -> String {
    value.format("%Y-%m-%d %H:%M:%S").to_string()
}

fn render_opt_datetime(value: Option<NaiveDateTime>) -> String {
    value.map(render_datetime).unwrap_or_default()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscountType {
    Percentage,
    FixedAmount,
}

impl DiscountType {
    pub fn as_str(self) -> &'static str {
        match self {
            DiscountType::Percentage => "Percentage",
            DiscountType::FixedAmount => "FixedAmount",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscountStatus {
    Active,
    Inactive,
    Expired,
}

impl DiscountStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            DiscountStatus::Active => "Active",
            DiscountStatus::Inactive => "Inactive",
            DiscountStatus::Expired => "Expired",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentMethod {
    Cod,
    CreditCard,
    BankTransfer,
    Paypal,
}

impl PaymentMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentMethod::Cod => "COD",
            PaymentMethod::CreditCard => "Credit Card",
            PaymentMethod::BankTransfer => "Bank Transfer",
            PaymentMethod::Paypal => "PayPal",
        }
    }
}

/// Back-office order state drawn by the synthesizer; the public
/// [`OrderStatus`] and [`PaymentStatus`] derive from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManageStatus {
    Pending,
    Processing,
    Cancelled,
    Completed,
    Rejected,
}

impl ManageStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ManageStatus::Pending => "Pending",
            ManageStatus::Processing => "Processing",
            ManageStatus::Cancelled => "Cancelled",
            ManageStatus::Completed => "Completed",
            ManageStatus::Rejected => "Rejected",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderStatus {
    Processing,
    Rejected,
    Completed,
}

impl OrderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Processing => "Processing",
            OrderStatus::Rejected => "Rejected",
            OrderStatus::Completed => "Completed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentStatus {
    Pending,
    PartiallyPaid,
    Paid,
    Cancelled,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentStatus::Pending => "Pending",
            PaymentStatus::PartiallyPaid => "Partially Paid",
            PaymentStatus::Paid => "Paid",
            PaymentStatus::Cancelled => "Cancelled",
            PaymentStatus::Refunded => "Refunded",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub id: String,
    pub name: String,
}

impl Category {
    pub fn new(name: String) -> Self {
        let id = FieldTuple::new().text("name", &name).digest();
        Self { id, name }
    }
}

#[derive(Debug, Clone)]
pub struct Product {
    pub id: String,
    pub category_id: String,
    pub name: String,
    pub description: String,
    pub specification: String,
    pub image_url: String,
    pub brand: String,
}

impl Product {
    pub fn content_id(&self) -> String {
        FieldTuple::new()
            .text("category_id", &self.category_id)
            .text("name", &self.name)
            .text("description", &self.description)
            .text("specification", &self.specification)
            .text("image_url", &self.image_url)
            .text("brand", &self.brand)
            .digest()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub id: String,
    pub name: String,
}

impl Attribute {
    pub fn new(name: String) -> Self {
        let id = FieldTuple::new().text("name", &name).digest();
        Self { id, name }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeValue {
    pub id: String,
    pub attribute_id: String,
    pub value: String,
}

impl AttributeValue {
    pub fn new(attribute_id: String, value: String) -> Self {
        let id = FieldTuple::new()
            .text("attribute_id", &attribute_id)
            .text("value", &value)
            .digest();
        Self {
            id,
            attribute_id,
            value,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProductVariant {
    pub id: String,
    pub product_id: String,
    pub price: i64,
    pub original_price: i64,
    pub profit: i64,
    pub sku: String,
    pub stock_quantity: i64,
    pub sold_quantity: i64,
}

impl ProductVariant {
    pub fn content_id(&self) -> String {
        FieldTuple::new()
            .text("product_id", &self.product_id)
            .int("price", self.price)
            .int("original_price", self.original_price)
            .int("profit", self.profit)
            .text("sku", &self.sku)
            .int("stock_quantity", self.stock_quantity)
            .int("sold_quantity", self.sold_quantity)
            .digest()
    }
}

/// Join row tying one variant to one (attribute, value) pair. Not an
/// entity in its own right: the same pair legitimately repeats across
/// variants, so rows are deduplicated by a row-content hash instead of
/// carrying an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeVariant {
    pub product_variant_id: String,
    pub attribute_id: String,
    pub attribute_value_id: String,
}

impl AttributeVariant {
    pub fn row_hash(&self) -> String {
        FieldTuple::new()
            .text("product_variant_id", &self.product_variant_id)
            .text("attribute_id", &self.attribute_id)
            .text("attribute_value_id", &self.attribute_value_id)
            .digest()
    }
}

#[derive(Debug, Clone)]
pub struct Feedback {
    pub id: String,
    pub customer_id: i64,
    pub product_id: Option<String>,
    pub product_variant_id: Option<String>,
    pub rating: f64,
    pub comment: String,
    pub created_at: NaiveDateTime,
}

impl Feedback {
    pub fn content_id(&self) -> String {
        FieldTuple::new()
            .int("customer_id", self.customer_id)
            .opt_text("product_id", self.product_id.as_deref())
            .opt_text("product_variant_id", self.product_variant_id.as_deref())
            .float("rating", self.rating)
            .text("comment", &self.comment)
            .text("created_at", &render_datetime(self.created_at))
            .digest()
    }
}

#[derive(Debug, Clone)]
pub struct FeedbackResponse {
    pub id: String,
    pub manager_id: i64,
    pub feedback_id: Option<String>,
    pub comment: String,
    pub created_at: NaiveDateTime,
}

impl FeedbackResponse {
    pub fn content_id(&self) -> String {
        FieldTuple::new()
            .int("manager_id", self.manager_id)
            .opt_text("feedback_id", self.feedback_id.as_deref())
            .text("comment", &self.comment)
            .text("created_at", &render_datetime(self.created_at))
            .digest()
    }
}

#[derive(Debug, Clone)]
pub struct Discount {
    pub id: String,
    pub product_variant_id: String,
    pub code: String,
    pub name: String,
    pub kind: DiscountType,
    pub value: f64,
    pub status: DiscountStatus,
    pub start_date: NaiveDateTime,
    pub end_date: NaiveDateTime,
}

impl Discount {
    pub fn content_id(&self) -> String {
        FieldTuple::new()
            .text("product_variant_id", &self.product_variant_id)
            .text("code", &self.code)
            .text("name", &self.name)
            .text("type", self.kind.as_str())
            .float("value", self.value)
            .text("status", self.status.as_str())
            .text("start_date", &render_datetime(self.start_date))
            .text("end_date", &render_datetime(self.end_date))
            .digest()
    }
}

#[derive(Debug, Clone)]
pub struct Order {
    pub id: String,
    pub customer_id: i64,
    pub order_date: NaiveDateTime,
    pub shipping_address: String,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub payment_date: Option<NaiveDateTime>,
    pub payment_status: PaymentStatus,
    pub payment_amount: f64,
}

impl Order {
    pub fn content_id(&self) -> String {
        FieldTuple::new()
            .int("customer_id", self.customer_id)
            .text("order_date", &render_datetime(self.order_date))
            .text("shipping_address", &self.shipping_address)
            .text("status", self.status.as_str())
            .text("payment_method", self.payment_method.as_str())
            .text("payment_date", &render_opt_datetime(self.payment_date))
            .text("payment_status", self.payment_status.as_str())
            .float("payment_amount", self.payment_amount)
            .digest()
    }
}

#[derive(Debug, Clone)]
pub struct OrderItem {
    pub id: String,
    pub product_variant_id: String,
    pub order_id: String,
    pub quantity: i64,
    pub unit_price: i64,
    pub note: String,
}

impl OrderItem {
    pub fn content_id(&self) -> String {
        FieldTuple::new()
            .text("product_variant_id", &self.product_variant_id)
            .text("order_id", &self.order_id)
            .int("quantity", self.quantity)
            .int("unit_price", self.unit_price)
            .text("note", &self.note)
            .digest()
    }
}

#[derive(Debug, Clone)]
pub struct OrderHistory {
    pub id: String,
    pub manager_id: i64,
    pub order_id: String,
    pub processing_time: Option<NaiveDateTime>,
    pub previous_status: ManageStatus,
    pub new_status: OrderStatus,
}

impl OrderHistory {
    pub fn content_id(&self) -> String {
        FieldTuple::new()
            .int("manager_id", self.manager_id)
            .text("order_id", &self.order_id)
            .text("processing_time", &render_opt_datetime(self.processing_time))
            .text("previous_status", self.previous_status.as_str())
            .text("new_status", self.new_status.as_str())
            .digest()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn dt(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    #[test]
    fn category_id_depends_only_on_name() {
        let a = Category::new("Tủ lạnh".into());
        let b = Category::new("Tủ lạnh".into());
        assert_eq!(a.id, b.id);
        assert_ne!(a.id, Category::new("Tivi 4K".into()).id);
    }

    #[test]
    fn feedback_null_references_hash_like_empty_strings() {
        let mut fb = Feedback {
            id: String::new(),
            customer_id: 7,
            product_id: None,
            product_variant_id: None,
            rating: 5.0,
            comment: "ok".into(),
            created_at: dt(2025, 1, 1),
        };
        let unresolved = fb.content_id();
        fb.product_id = Some("abc".into());
        assert_ne!(unresolved, fb.content_id());
    }

    #[test]
    fn order_id_covers_every_business_field() {
        let order = Order {
            id: String::new(),
            customer_id: 1,
            order_date: dt(2025, 3, 1),
            shipping_address: "Hà Nội".into(),
            status: OrderStatus::Completed,
            payment_method: PaymentMethod::Cod,
            payment_date: Some(dt(2025, 3, 2)),
            payment_status: PaymentStatus::Paid,
            payment_amount: 120000.0,
        };
        let base = order.content_id();

        let mut changed = order.clone();
        changed.payment_date = None;
        assert_ne!(base, changed.content_id());

        let mut changed = order.clone();
        changed.payment_status = PaymentStatus::Pending;
        assert_ne!(base, changed.content_id());
    }

    #[test]
    fn status_labels_match_the_store_vocabulary() {
        assert_eq!(PaymentStatus::PartiallyPaid.as_str(), "Partially Paid");
        assert_eq!(PaymentMethod::Cod.as_str(), "COD");
        assert_eq!(DiscountType::FixedAmount.as_str(), "FixedAmount");
    }
}

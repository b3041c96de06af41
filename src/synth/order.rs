//! Order synthesis: one Order, one OrderItem and one OrderHistory per
//! synthesized row (1:1:1 by construction). Business state follows a
//! deterministic machine: the back-office `ManageStatus` is drawn (or
//! forced Completed for feedback-backed orders), the public order
//! status derives from it, and the payment status derives from both.

use std::collections::HashMap;

use chrono::Duration;
use rand::distributions::WeightedIndex;
use rand::prelude::Distribution;
use rand::rngs::StdRng;
use rand::Rng;
use tracing::{info, warn};

use crate::catalog::builder::Catalog;
use crate::entities::{
    Feedback, ManageStatus, Order, OrderHistory, OrderItem, OrderStatus, PaymentMethod,
    PaymentStatus,
};
use crate::synth::discount::VoucherIndex;
use crate::synth::{random_datetime_between, window_status, IdentityPools, SynthConfig};

const PAYMENT_METHODS: [PaymentMethod; 4] = [
    PaymentMethod::Cod,
    PaymentMethod::CreditCard,
    PaymentMethod::BankTransfer,
    PaymentMethod::Paypal,
];

const MANAGE_STATUSES: [ManageStatus; 4] = [
    ManageStatus::Pending,
    ManageStatus::Processing,
    ManageStatus::Cancelled,
    ManageStatus::Completed,
];

/// Draw weights for `MANAGE_STATUSES`: almost every synthesized order
/// is Completed.
const MANAGE_WEIGHTS: [u32; 4] = [1, 1, 1, 97];

const PREVIOUS_STATUSES: [ManageStatus; 4] = [
    ManageStatus::Pending,
    ManageStatus::Processing,
    ManageStatus::Completed,
    ManageStatus::Cancelled,
];

#[derive(Debug, Default)]
pub struct OrderBuild {
    pub orders: Vec<Order>,
    pub items: Vec<OrderItem>,
    pub histories: Vec<OrderHistory>,
}

/// Public order status derived from the back-office status. The
/// payment status is unknown at this point of the evaluation, which is
/// why a Processing manage-status degrades to Rejected below.
fn derive_order_status(
    manage: ManageStatus,
    payment: Option<PaymentStatus>,
) -> OrderStatus {
    match manage {
        ManageStatus::Pending => OrderStatus::Processing,
        ManageStatus::Rejected => OrderStatus::Rejected,
        ManageStatus::Processing => match payment {
            Some(PaymentStatus::Paid) | Some(PaymentStatus::PartiallyPaid) => {
                OrderStatus::Processing
            }
            _ => OrderStatus::Rejected,
        },
        ManageStatus::Completed => OrderStatus::Completed,
        ManageStatus::Cancelled => OrderStatus::Processing,
    }
}

fn derive_payment_status(
    method: PaymentMethod,
    manage: ManageStatus,
    order: OrderStatus,
) -> PaymentStatus {
    let refund_or_cancel = |method: PaymentMethod| {
        if method == PaymentMethod::Cod {
            PaymentStatus::Cancelled
        } else {
            PaymentStatus::Refunded
        }
    };
    if order == OrderStatus::Rejected {
        return refund_or_cancel(method);
    }
    match manage {
        ManageStatus::Pending => PaymentStatus::Pending,
        ManageStatus::Processing => {
            if method == PaymentMethod::Cod {
                PaymentStatus::Pending
            } else {
                PaymentStatus::PartiallyPaid
            }
        }
        ManageStatus::Completed => PaymentStatus::Paid,
        ManageStatus::Cancelled => refund_or_cancel(method),
        ManageStatus::Rejected => PaymentStatus::Pending,
    }
}

#[derive(Debug, Clone, Copy)]
struct DrawnState {
    method: PaymentMethod,
    order: OrderStatus,
    payment: PaymentStatus,
}

/// Draw method + manage status, then derive order and payment status in
/// that fixed precedence. Feedback-backed orders are forced Completed.
fn draw_state(
    rng: &mut StdRng,
    manage_weights: &WeightedIndex<u32>,
    forced_completed: bool,
) -> DrawnState {
    let method = PAYMENT_METHODS[rng.gen_range(0..PAYMENT_METHODS.len())];
    if forced_completed {
        return DrawnState {
            method,
            order: OrderStatus::Completed,
            payment: PaymentStatus::Paid,
        };
    }
    let manage = MANAGE_STATUSES[manage_weights.sample(rng)];
    let order = derive_order_status(manage, None);
    let payment = derive_payment_status(method, manage, order);
    DrawnState {
        method,
        order,
        payment,
    }
}

struct OrderSeed {
    customer_id: i64,
    address: String,
    feedback_created_at: Option<chrono::NaiveDateTime>,
    customer_created_at: Option<chrono::NaiveDateTime>,
    product_id: Option<String>,
    variant_id: Option<String>,
}

/// Synthesize orders: every feedback row first (the order that backs
/// it), then `cfg.organic_orders` customers sampled with replacement.
///
/// RNG order: the variant fill pool (`variant_fill_samples` draws),
/// then per row — organic customer pick, variant fill when needed,
/// order-date offset, payment method, manage status, payment-date
/// offset when drawn, quantity, history manager, processing-time offset
/// when a payment date exists, previous status.
pub fn build_orders(
    feedbacks: &[Feedback],
    catalog: &Catalog,
    pools: &IdentityPools,
    vouchers: &VoucherIndex,
    cfg: &SynthConfig,
    rng: &mut StdRng,
) -> OrderBuild {
    if pools.customers.is_empty() || pools.product_managers.is_empty() {
        warn!("customer or manager pool is empty; skipping order synthesis");
        return OrderBuild::default();
    }
    if catalog.variants.is_empty() {
        warn!("catalog has no variants; skipping order synthesis");
        return OrderBuild::default();
    }

    let address_by_customer: HashMap<i64, &str> = pools
        .customers
        .iter()
        .map(|c| (c.id, c.address.as_str()))
        .collect();
    let price_by_variant: HashMap<&str, i64> = catalog
        .variants
        .iter()
        .map(|v| (v.id.as_str(), v.price))
        .collect();
    let variant_ids: Vec<&str> = catalog.variants.iter().map(|v| v.id.as_str()).collect();

    // Pre-drawn pool for rows with no catalog anchor at all.
    let variant_fill: Vec<&str> = (0..cfg.variant_fill_samples.max(1))
        .map(|_| variant_ids[rng.gen_range(0..variant_ids.len())])
        .collect();

    let mut seeds: Vec<OrderSeed> = Vec::with_capacity(feedbacks.len() + cfg.organic_orders);
    for fb in feedbacks {
        seeds.push(OrderSeed {
            customer_id: fb.customer_id,
            address: address_by_customer
                .get(&fb.customer_id)
                .map(|a| (*a).to_string())
                .unwrap_or_default(),
            feedback_created_at: Some(fb.created_at),
            customer_created_at: None,
            product_id: fb.product_id.clone(),
            variant_id: fb.product_variant_id.clone(),
        });
    }
    for _ in 0..cfg.organic_orders {
        let customer = &pools.customers[rng.gen_range(0..pools.customers.len())];
        seeds.push(OrderSeed {
            customer_id: customer.id,
            address: customer.address.clone(),
            feedback_created_at: None,
            customer_created_at: Some(customer.created_at),
            product_id: None,
            variant_id: None,
        });
    }

    let manage_weights =
        WeightedIndex::new(MANAGE_WEIGHTS).expect("static weights are valid");

    let mut build = OrderBuild::default();
    for seed in &seeds {
        let variant_id: String = match &seed.variant_id {
            Some(id) => id.clone(),
            None => match seed
                .product_id
                .as_ref()
                .and_then(|pid| catalog.variants_by_product.get(pid))
            {
                Some(ids) if !ids.is_empty() => ids[rng.gen_range(0..ids.len())].clone(),
                _ => variant_fill[rng.gen_range(0..variant_fill.len())].to_string(),
            },
        };

        let order_date = match seed.feedback_created_at {
            Some(feedback_at) => feedback_at - Duration::days(rng.gen_range(1..=3)),
            None => random_datetime_between(
                rng,
                seed.customer_created_at.unwrap_or(cfg.reference_time),
                cfg.reference_time,
            ),
        };

        let state = draw_state(rng, &manage_weights, seed.feedback_created_at.is_some());

        let payment_date = if seed.feedback_created_at.is_some() {
            if state.method == PaymentMethod::Cod {
                Some(random_datetime_between(rng, order_date, cfg.reference_time))
            } else {
                Some(order_date)
            }
        } else if state.method == PaymentMethod::Cod {
            if state.order == OrderStatus::Completed {
                Some(random_datetime_between(rng, order_date, cfg.reference_time))
            } else {
                None
            }
        } else {
            Some(order_date)
        };

        let quantity: i64 = rng.gen_range(1..=5);
        let unit_price = *price_by_variant.get(variant_id.as_str()).unwrap_or(&0);

        let base_amount = (unit_price * quantity) as f64;
        let payment_amount = match vouchers.get(&variant_id) {
            Some(voucher)
                if window_status(voucher.start_date, voucher.end_date, order_date)
                    != crate::entities::DiscountStatus::Expired =>
            {
                match voucher.kind {
                    crate::entities::DiscountType::Percentage => {
                        base_amount * (1.0 - voucher.value)
                    }
                    crate::entities::DiscountType::FixedAmount => base_amount - voucher.value,
                }
            }
            _ => base_amount,
        };

        let manager_id =
            pools.product_managers[rng.gen_range(0..pools.product_managers.len())];
        let processing_time =
            payment_date.map(|pd| random_datetime_between(rng, order_date, pd));
        let previous_status = PREVIOUS_STATUSES[rng.gen_range(0..PREVIOUS_STATUSES.len())];

        let mut order = Order {
            id: String::new(),
            customer_id: seed.customer_id,
            order_date,
            shipping_address: seed.address.clone(),
            status: state.order,
            payment_method: state.method,
            payment_date,
            payment_status: state.payment,
            payment_amount,
        };
        order.id = order.content_id();

        let mut item = OrderItem {
            id: String::new(),
            product_variant_id: variant_id,
            order_id: order.id.clone(),
            quantity,
            unit_price,
            note: String::new(),
        };
        item.id = item.content_id();

        let mut history = OrderHistory {
            id: String::new(),
            manager_id,
            order_id: order.id.clone(),
            processing_time,
            previous_status,
            new_status: state.order,
        };
        history.id = history.content_id();

        build.orders.push(order);
        build.items.push(item);
        build.histories.push(history);
    }

    info!(orders = build.orders.len(), "orders built");
    build
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::builder::build_catalog;
    use crate::catalog::raw::RawProduct;
    use crate::synth::discount::Voucher;
    use crate::synth::test_support::{dt, pools};
    use crate::entities::{DiscountStatus, DiscountType};
    use rand::SeedableRng;

    fn catalog() -> Catalog {
        let rows = vec![RawProduct {
            source_id: 11,
            name: "Galaxy S24".into(),
            brand: "Samsung".into(),
            category: "Điện thoại Smartphone".into(),
            specification: "spec".into(),
            variants: "Màu: Đen = 5000000 VND\nMàu: Trắng = 6000000 VND".into(),
            description: "desc".into(),
            image_url: "http://img".into(),
        }];
        let mut rng = StdRng::seed_from_u64(42);
        build_catalog(&rows, &mut rng)
    }

    fn feedback_for(catalog: &Catalog) -> Feedback {
        let mut fb = Feedback {
            id: String::new(),
            customer_id: 3,
            product_id: Some(catalog.products[0].id.clone()),
            product_variant_id: Some(catalog.variants[0].id.clone()),
            rating: 5.0,
            comment: "ok".into(),
            created_at: dt(2025, 3, 10),
        };
        fb.id = fb.content_id();
        fb
    }

    #[test]
    fn state_machine_closure_holds_over_many_draws() {
        let catalog = catalog();
        let pools = pools(30);
        let mut cfg = SynthConfig::new(42, dt(2025, 6, 1));
        cfg.organic_orders = 600;
        let mut rng = StdRng::seed_from_u64(42);
        let build = build_orders(&[], &catalog, &pools, &VoucherIndex::new(), &cfg, &mut rng);
        assert_eq!(build.orders.len(), 600);

        for order in &build.orders {
            match order.status {
                OrderStatus::Rejected => assert!(matches!(
                    order.payment_status,
                    PaymentStatus::Cancelled | PaymentStatus::Refunded
                )),
                OrderStatus::Completed => {
                    assert_eq!(order.payment_status, PaymentStatus::Paid)
                }
                OrderStatus::Processing => assert!(matches!(
                    order.payment_status,
                    PaymentStatus::Pending
                        | PaymentStatus::PartiallyPaid
                        | PaymentStatus::Cancelled
                        | PaymentStatus::Refunded
                )),
            }
        }
    }

    #[test]
    fn feedback_backed_orders_are_completed_and_precede_the_review() {
        let catalog = catalog();
        let pools = pools(30);
        let mut cfg = SynthConfig::new(42, dt(2025, 6, 1));
        cfg.organic_orders = 0;
        let fb = feedback_for(&catalog);
        let mut rng = StdRng::seed_from_u64(42);
        let build =
            build_orders(&[fb.clone()], &catalog, &pools, &VoucherIndex::new(), &cfg, &mut rng);
        assert_eq!(build.orders.len(), 1);

        let order = &build.orders[0];
        assert_eq!(order.status, OrderStatus::Completed);
        assert_eq!(order.payment_status, PaymentStatus::Paid);
        let gap = fb.created_at - order.order_date;
        assert!(gap >= Duration::days(1) && gap <= Duration::days(3));
        assert_eq!(
            build.items[0].product_variant_id,
            fb.product_variant_id.clone().unwrap()
        );
    }

    #[test]
    fn every_order_gets_exactly_one_item_and_one_history() {
        let catalog = catalog();
        let pools = pools(10);
        let mut cfg = SynthConfig::new(42, dt(2025, 6, 1));
        cfg.organic_orders = 50;
        let mut rng = StdRng::seed_from_u64(1);
        let build = build_orders(&[], &catalog, &pools, &VoucherIndex::new(), &cfg, &mut rng);

        assert_eq!(build.items.len(), build.orders.len());
        assert_eq!(build.histories.len(), build.orders.len());
        let order_ids: std::collections::HashSet<&str> =
            build.orders.iter().map(|o| o.id.as_str()).collect();
        for (item, history) in build.items.iter().zip(&build.histories) {
            assert!(order_ids.contains(item.order_id.as_str()));
            assert!(order_ids.contains(history.order_id.as_str()));
            assert!(item.quantity >= 1 && item.quantity <= 5);
        }
        for history in &build.histories {
            assert!(pools.product_managers.contains(&history.manager_id));
        }
    }

    #[test]
    fn active_vouchers_discount_the_payment_amount() {
        let catalog = catalog();
        let pools = pools(10);
        let mut cfg = SynthConfig::new(42, dt(2025, 6, 1));
        cfg.organic_orders = 0;
        let fb = feedback_for(&catalog);
        let variant_id = fb.product_variant_id.clone().unwrap();
        let unit_price = catalog
            .variants
            .iter()
            .find(|v| v.id == variant_id)
            .unwrap()
            .price;

        let mut vouchers = VoucherIndex::new();
        vouchers.insert(
            variant_id,
            Voucher {
                kind: DiscountType::Percentage,
                value: 0.1,
                start_date: dt(2024, 1, 1),
                end_date: dt(2025, 12, 31),
            },
        );

        let mut rng = StdRng::seed_from_u64(42);
        let build = build_orders(&[fb], &catalog, &pools, &vouchers, &cfg, &mut rng);
        let order = &build.orders[0];
        let item = &build.items[0];
        let expected = (unit_price * item.quantity) as f64 * 0.9;
        assert!((order.payment_amount - expected).abs() < 1e-6);
        assert_eq!(
            window_status(dt(2024, 1, 1), dt(2025, 12, 31), order.order_date),
            DiscountStatus::Active
        );
    }

    #[test]
    fn expired_vouchers_leave_the_amount_untouched() {
        let catalog = catalog();
        let pools = pools(10);
        let mut cfg = SynthConfig::new(42, dt(2025, 6, 1));
        cfg.organic_orders = 0;
        let fb = feedback_for(&catalog);
        let variant_id = fb.product_variant_id.clone().unwrap();

        let mut vouchers = VoucherIndex::new();
        vouchers.insert(
            variant_id,
            Voucher {
                kind: DiscountType::FixedAmount,
                value: 100_000.0,
                start_date: dt(2024, 1, 1),
                end_date: dt(2024, 2, 1),
            },
        );

        let mut rng = StdRng::seed_from_u64(42);
        let build = build_orders(&[fb], &catalog, &pools, &vouchers, &cfg, &mut rng);
        let order = &build.orders[0];
        let item = &build.items[0];
        assert_eq!(
            order.payment_amount,
            (item.unit_price * item.quantity) as f64
        );
    }

    #[test]
    fn cod_rejections_cancel_while_prepaid_rejections_refund() {
        for method in PAYMENT_METHODS {
            let payment =
                derive_payment_status(method, ManageStatus::Rejected, OrderStatus::Rejected);
            if method == PaymentMethod::Cod {
                assert_eq!(payment, PaymentStatus::Cancelled);
            } else {
                assert_eq!(payment, PaymentStatus::Refunded);
            }
        }
    }

    #[test]
    fn processing_manage_status_degrades_to_rejected_without_payment() {
        assert_eq!(
            derive_order_status(ManageStatus::Processing, None),
            OrderStatus::Rejected
        );
        assert_eq!(
            derive_order_status(ManageStatus::Processing, Some(PaymentStatus::Paid)),
            OrderStatus::Processing
        );
        assert_eq!(
            derive_order_status(
                ManageStatus::Processing,
                Some(PaymentStatus::PartiallyPaid)
            ),
            OrderStatus::Processing
        );
    }
}

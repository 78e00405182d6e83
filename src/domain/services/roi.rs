//! Return on the Maldify subscription: revenue from the merchant's offer
//! products against what the plan costs over the same window.

use rust_decimal::Decimal;
use serde::Serialize;

use crate::domain::aggregates::OrderRecord;
use crate::domain::services::offer::OfferCatalog;
use crate::domain::value_objects::{percentage, round2};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RoiReport {
    pub period_days: u32,
    #[serde(with = "rust_decimal::serde::float")]
    pub revenue: Decimal,
    pub order_count: usize,
    #[serde(with = "rust_decimal::serde::float")]
    pub cost: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub roi: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub roi_percentage: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub average_order_value: Decimal,
}

/// Malformed lines are ignored here; the risk report is where they surface.
pub fn compute_roi(orders: &[OrderRecord], catalog: &OfferCatalog, cost: Decimal, period_days: u32) -> RoiReport {
    let offer_ids = catalog.offer_product_ids();
    let mut revenue = Decimal::ZERO;
    let mut order_count = 0;

    for (position, order) in orders.iter().enumerate() {
        let reference = order.reference(position);
        let upsell_revenue: Option<Decimal> = order
            .line_items
            .iter()
            .filter_map(|input| input.validate(&reference).ok())
            .filter(|line| offer_ids.contains(&&line.product_id))
            .map(|line| line.total())
            .reduce(Decimal::saturating_add);
        if let Some(amount) = upsell_revenue {
            revenue = revenue.saturating_add(amount);
            order_count += 1;
        }
    }

    let roi = revenue.saturating_sub(cost);
    let average_order_value = if order_count == 0 { Decimal::ZERO } else { revenue / Decimal::from(order_count) };
    RoiReport {
        period_days,
        revenue: round2(revenue),
        order_count,
        cost: round2(cost),
        roi: round2(roi),
        roi_percentage: round2(percentage(roi, cost)),
        average_order_value: round2(average_order_value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::OrderLineInput;
    use crate::domain::services::offer::OfferProduct;
    use crate::ProductId;

    fn catalog() -> OfferCatalog {
        OfferCatalog {
            premium: OfferProduct { product_id: ProductId::new("111").unwrap(), base_price: Decimal::new(100, 0) },
            complementary: OfferProduct { product_id: ProductId::new("222").unwrap(), base_price: Decimal::new(50, 0) },
        }
    }

    fn order(lines: &[(&str, i64, &str)]) -> OrderRecord {
        OrderRecord {
            id: None,
            line_items: lines
                .iter()
                .map(|(pid, qty, price)| OrderLineInput { product_id: Some(pid.to_string()), quantity: Some(*qty), price: price.parse().ok(), title: None })
                .collect(),
        }
    }

    #[test]
    fn test_only_offer_products_count() {
        let orders = [order(&[("111", 1, "50.00"), ("999", 3, "10.00")]), order(&[("999", 1, "10.00")]), order(&[("222", 2, "49.99")])];
        let report = compute_roi(&orders, &catalog(), Decimal::new(2999, 2), 30);
        assert_eq!(report.order_count, 2);
        assert_eq!(report.revenue, Decimal::new(14998, 2));
        assert_eq!(report.roi, Decimal::new(11999, 2));
        assert_eq!(report.roi_percentage, Decimal::new(40010, 2));
        assert_eq!(report.average_order_value, Decimal::new(7499, 2));
    }

    #[test]
    fn test_out_of_range_lines_do_not_panic() {
        let absurd = Decimal::from_i128_with_scale(10_i128.pow(27), 0);
        let orders = [
            OrderRecord { id: None, line_items: vec![OrderLineInput { product_id: Some("111".into()), quantity: Some(5), price: Some(absurd), title: None }] },
            order(&[("222", 1, "10.00")]),
        ];
        let report = compute_roi(&orders, &catalog(), Decimal::ZERO, 30);
        assert_eq!(report.order_count, 1);
        assert_eq!(report.revenue, Decimal::new(1000, 2));
    }

    #[test]
    fn test_free_plan_and_no_orders() {
        let report = compute_roi(&[], &catalog(), Decimal::ZERO, 7);
        assert_eq!(report.revenue, Decimal::ZERO);
        assert_eq!(report.roi_percentage, Decimal::ZERO);
        assert_eq!(report.average_order_value, Decimal::ZERO);
        assert_eq!(report.period_days, 7);
    }
}

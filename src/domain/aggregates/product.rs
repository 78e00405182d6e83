//! Per-product sales and refund aggregates

use rust_decimal::Decimal;
use std::collections::BTreeMap;

use crate::domain::aggregates::order::{OrderLineItem, RefundLineItem};
use crate::domain::value_objects::ProductId;

/// How `orders_count`/`refunds_count` treat several lines of the same
/// product inside one order (or refund).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OrderCounting {
    /// Each order counts once per product.
    #[default]
    PerOrder,
    /// Each line item counts, so split lines of one product count twice.
    PerLineItem,
}

impl std::str::FromStr for OrderCounting {
    type Err = String;
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "per_order" => Ok(Self::PerOrder),
            "per_line_item" => Ok(Self::PerLineItem),
            other => Err(format!("unsupported orders count mode `{other}` (expected per_order|per_line_item)")),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProductSalesAggregate {
    product_id: ProductId,
    title: String,
    total_quantity: u64,
    total_revenue: Decimal,
    orders_count: u32,
}

impl ProductSalesAggregate {
    pub fn new(product_id: ProductId, title: impl Into<String>) -> Self {
        Self { product_id, title: title.into(), total_quantity: 0, total_revenue: Decimal::ZERO, orders_count: 0 }
    }

    pub fn product_id(&self) -> &ProductId { &self.product_id }
    pub fn title(&self) -> &str { &self.title }
    pub fn total_quantity(&self) -> u64 { self.total_quantity }
    pub fn total_revenue(&self) -> Decimal { self.total_revenue }
    pub fn orders_count(&self) -> u32 { self.orders_count }

    /// Adds one line; `new_order` is true for the first line of this product
    /// seen in the current order (or always, under per-line counting).
    /// Returns false, leaving the totals untouched, if they would overflow.
    pub fn record_line(&mut self, line: &OrderLineItem, new_order: bool) -> bool {
        let quantity = self.total_quantity.checked_add(u64::from(line.quantity));
        let revenue = self.total_revenue.checked_add(line.total());
        let (Some(quantity), Some(revenue)) = (quantity, revenue) else { return false };
        self.total_quantity = quantity;
        self.total_revenue = revenue;
        if new_order { self.orders_count = self.orders_count.saturating_add(1); }
        true
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProductRefundAggregate {
    product_id: ProductId,
    total_quantity: u64,
    total_amount: Decimal,
    refunds_count: u32,
}

impl ProductRefundAggregate {
    pub fn new(product_id: ProductId) -> Self {
        Self { product_id, total_quantity: 0, total_amount: Decimal::ZERO, refunds_count: 0 }
    }

    pub fn product_id(&self) -> &ProductId { &self.product_id }
    pub fn total_quantity(&self) -> u64 { self.total_quantity }
    pub fn total_amount(&self) -> Decimal { self.total_amount }
    pub fn refunds_count(&self) -> u32 { self.refunds_count }

    pub fn record_line(&mut self, line: &RefundLineItem, new_refund: bool) -> bool {
        let quantity = self.total_quantity.checked_add(u64::from(line.quantity));
        let amount = self.total_amount.checked_add(line.total());
        let (Some(quantity), Some(amount)) = (quantity, amount) else { return false };
        self.total_quantity = quantity;
        self.total_amount = amount;
        if new_refund { self.refunds_count = self.refunds_count.saturating_add(1); }
        true
    }
}

/// Ordered by product id so folding the same input always iterates the same way.
pub type SalesByProduct = BTreeMap<ProductId, ProductSalesAggregate>;
pub type RefundsByProduct = BTreeMap<ProductId, ProductRefundAggregate>;

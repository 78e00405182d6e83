//! Product return-risk scoring
//!
//! Folds an order/refund history into per-product sales and refund totals,
//! scores every sold product and ranks them:
//!
//! - `return_rate = refunded units / sold units * 100`
//! - `revenue_loss_rate = refunded amount / revenue * 100`
//! - `risk_score = return_rate * 0.7 + revenue_loss_rate * 0.3`
//!
//! Rates and the score are rounded to two places; the score is computed from
//! the rounded rates so the three published numbers always agree.

use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeSet;

use crate::domain::aggregates::{
    OrderCounting, OrderRecord, ProductRefundAggregate, ProductSalesAggregate, RefundRecord, RefundsByProduct, SalesByProduct,
};
use crate::domain::value_objects::{percentage, round2, ProductId};
use crate::MaldifyError;

pub const TOP_RISKY_PRODUCTS: usize = 5;
const RETURN_RATE_WEIGHT: Decimal = Decimal::from_parts(7, 0, 0, false, 1);
const REVENUE_LOSS_WEIGHT: Decimal = Decimal::from_parts(3, 0, 0, false, 1);
const HIGH_RISK_ABOVE: Decimal = Decimal::from_parts(20, 0, 0, false, 0);
const MEDIUM_RISK_ABOVE: Decimal = Decimal::from_parts(10, 0, 0, false, 0);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel { High, Medium, Low }

impl RiskLevel {
    pub fn from_score(score: Decimal) -> Self {
        if score > HIGH_RISK_ABOVE { Self::High } else if score > MEDIUM_RISK_ABOVE { Self::Medium } else { Self::Low }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RiskRecord {
    pub product_id: ProductId,
    #[serde(rename = "product_title")]
    pub title: String,
    pub total_sales: u64,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_revenue: Decimal,
    pub total_refunds: u64,
    #[serde(with = "rust_decimal::serde::float")]
    pub refund_amount: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub return_rate: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub revenue_loss_rate: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub risk_score: Decimal,
    pub orders_count: u32,
    pub refunds_count: u32,
    pub risk_level: RiskLevel,
}

impl RiskRecord {
    pub fn score(sales: &ProductSalesAggregate, refunds: Option<&ProductRefundAggregate>) -> Self {
        let (refunded_units, refund_amount, refunds_count) =
            refunds.map_or((0, Decimal::ZERO, 0), |r| (r.total_quantity(), r.total_amount(), r.refunds_count()));

        let return_rate = round2(percentage(Decimal::from(refunded_units), Decimal::from(sales.total_quantity())));
        let revenue_loss_rate = round2(percentage(refund_amount, sales.total_revenue()));
        let risk_score = round2((return_rate * RETURN_RATE_WEIGHT).saturating_add(revenue_loss_rate * REVENUE_LOSS_WEIGHT));

        Self {
            product_id: sales.product_id().clone(),
            title: sales.title().to_string(),
            total_sales: sales.total_quantity(),
            total_revenue: round2(sales.total_revenue()),
            total_refunds: refunded_units,
            refund_amount: round2(refund_amount),
            return_rate,
            revenue_loss_rate,
            risk_score,
            orders_count: sales.orders_count(),
            refunds_count,
            risk_level: RiskLevel::from_score(risk_score),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RiskSummary {
    pub total_products_analyzed: usize,
    pub high_risk_products: usize,
    pub medium_risk_products: usize,
    pub low_risk_products: usize,
    #[serde(with = "rust_decimal::serde::float")]
    pub overall_return_rate: Decimal,
}

impl RiskSummary {
    fn from_records(records: &[RiskRecord]) -> Self {
        let count = |level: RiskLevel| records.iter().filter(|r| r.risk_level == level).count();
        let overall_return_rate = if records.is_empty() {
            Decimal::ZERO
        } else {
            let total: Decimal = records.iter().map(|r| r.return_rate).sum();
            round2(total / Decimal::from(records.len()))
        };
        Self {
            total_products_analyzed: records.len(),
            high_risk_products: count(RiskLevel::High),
            medium_risk_products: count(RiskLevel::Medium),
            low_risk_products: count(RiskLevel::Low),
            overall_return_rate,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RiskAnalysis {
    /// Highest scores first, at most [`TOP_RISKY_PRODUCTS`].
    pub top_records: Vec<RiskRecord>,
    pub summary: RiskSummary,
    /// Lines left out of the aggregates because they were malformed.
    pub skipped: Vec<MaldifyError>,
}

pub fn compute_risk(orders: &[OrderRecord], refunds: &[RefundRecord], counting: OrderCounting) -> RiskAnalysis {
    let mut skipped = Vec::new();
    let sales = fold_sales(orders, counting, &mut skipped);
    let returns = fold_refunds(refunds, counting, &mut skipped);

    let mut records: Vec<RiskRecord> = sales.values().map(|s| RiskRecord::score(s, returns.get(s.product_id()))).collect();
    records.sort_by(|a, b| b.risk_score.cmp(&a.risk_score).then_with(|| a.product_id.cmp(&b.product_id)));

    let summary = RiskSummary::from_records(&records);
    records.truncate(TOP_RISKY_PRODUCTS);
    RiskAnalysis { top_records: records, summary, skipped }
}

fn overflow(reference: &str, product_id: &ProductId) -> MaldifyError {
    MaldifyError::invalid_input(reference, format!("line item for {product_id} overflows the product totals"))
}

fn fold_sales(orders: &[OrderRecord], counting: OrderCounting, skipped: &mut Vec<MaldifyError>) -> SalesByProduct {
    let mut sales = SalesByProduct::new();
    for (position, order) in orders.iter().enumerate() {
        let reference = order.reference(position);
        let mut seen = BTreeSet::new();
        for input in &order.line_items {
            let line = match input.validate(&reference) {
                Ok(line) => line,
                Err(e) => { skipped.push(e); continue; }
            };
            let new_order = counting == OrderCounting::PerLineItem || seen.insert(line.product_id.clone());
            let aggregate = sales
                .entry(line.product_id.clone())
                .or_insert_with(|| ProductSalesAggregate::new(line.product_id.clone(), line.title.clone()));
            if !aggregate.record_line(&line, new_order) {
                skipped.push(overflow(&reference, &line.product_id));
            }
        }
    }
    sales
}

fn fold_refunds(refunds: &[RefundRecord], counting: OrderCounting, skipped: &mut Vec<MaldifyError>) -> RefundsByProduct {
    let mut totals = RefundsByProduct::new();
    for (position, refund) in refunds.iter().enumerate() {
        let reference = refund.reference(position);
        let mut seen = BTreeSet::new();
        for input in &refund.line_items {
            let line = match input.validate(&reference) {
                Ok(line) => line,
                Err(e) => { skipped.push(e); continue; }
            };
            let new_refund = counting == OrderCounting::PerLineItem || seen.insert(line.product_id.clone());
            let aggregate = totals.entry(line.product_id.clone()).or_insert_with(|| ProductRefundAggregate::new(line.product_id.clone()));
            if !aggregate.record_line(&line, new_refund) {
                skipped.push(overflow(&reference, &line.product_id));
            }
        }
    }
    totals
}

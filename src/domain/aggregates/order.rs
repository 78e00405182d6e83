//! Order and refund history as fetched from the commerce platform

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::ProductId;
use crate::MaldifyError;

/// An order as returned by the platform. Fields are optional because
/// custom line items and deleted products come back without them.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub id: Option<String>,
    #[serde(default)]
    pub line_items: Vec<OrderLineInput>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderLineInput {
    pub product_id: Option<String>,
    pub quantity: Option<i64>,
    pub price: Option<Decimal>,
    pub title: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RefundRecord {
    pub id: Option<String>,
    pub order_id: Option<String>,
    #[serde(default)]
    pub line_items: Vec<RefundLineInput>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RefundLineInput {
    pub product_id: Option<String>,
    pub quantity: Option<i64>,
    pub price: Option<Decimal>,
}

/// Validated order line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderLineItem { pub product_id: ProductId, pub quantity: u32, pub unit_price: Decimal, pub title: String }

impl OrderLineItem {
    pub fn total(&self) -> Decimal { self.unit_price.saturating_mul(Decimal::from(self.quantity)) }
}

/// Validated refund line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RefundLineItem { pub product_id: ProductId, pub quantity: u32, pub unit_price: Decimal }

impl RefundLineItem {
    pub fn total(&self) -> Decimal { self.unit_price.saturating_mul(Decimal::from(self.quantity)) }
}

/// Everything the risk and ROI reports need for one analysis window.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct OrderHistory { pub orders: Vec<OrderRecord>, pub refunds: Vec<RefundRecord> }

pub(crate) const UNTITLED_PRODUCT: &str = "Untitled product";

/// Largest unit price a line may carry. Keeps every line total and per-product
/// sum far inside `Decimal` range.
pub const MAX_UNIT_PRICE: Decimal = Decimal::from_parts(3_567_587_328, 232, 0, false, 0);

impl OrderRecord {
    /// Human readable reference used in skip reports.
    pub fn reference(&self, position: usize) -> String {
        match &self.id { Some(id) => format!("order {id}"), None => format!("order #{position}") }
    }
}

impl RefundRecord {
    pub fn reference(&self, position: usize) -> String {
        match &self.id { Some(id) => format!("refund {id}"), None => format!("refund #{position}") }
    }
}

impl OrderLineInput {
    pub fn validate(&self, record: &str) -> Result<OrderLineItem, MaldifyError> {
        let (product_id, quantity, unit_price) = validate_line(record, self.product_id.as_deref(), self.quantity, self.price)?;
        let title = self.title.as_deref().map(str::trim).filter(|t| !t.is_empty()).unwrap_or(UNTITLED_PRODUCT).to_string();
        Ok(OrderLineItem { product_id, quantity, unit_price, title })
    }
}

impl RefundLineInput {
    pub fn validate(&self, record: &str) -> Result<RefundLineItem, MaldifyError> {
        let (product_id, quantity, unit_price) = validate_line(record, self.product_id.as_deref(), self.quantity, self.price)?;
        Ok(RefundLineItem { product_id, quantity, unit_price })
    }
}

fn validate_line(record: &str, product_id: Option<&str>, quantity: Option<i64>, price: Option<Decimal>) -> Result<(ProductId, u32, Decimal), MaldifyError> {
    let product_id = product_id.ok_or_else(|| MaldifyError::invalid_input(record, "line item has no product id"))?;
    let product_id = ProductId::new(product_id).map_err(|e| MaldifyError::invalid_input(record, e.to_string()))?;
    let quantity = quantity.ok_or_else(|| MaldifyError::invalid_input(record, format!("line item for {product_id} has no quantity")))?;
    let quantity = u32::try_from(quantity)
        .ok()
        .filter(|q| *q > 0)
        .ok_or_else(|| MaldifyError::invalid_input(record, format!("line item for {product_id} has quantity {quantity}")))?;
    let price = price.ok_or_else(|| MaldifyError::invalid_input(record, format!("line item for {product_id} has no price")))?;
    if price.is_sign_negative() && !price.is_zero() {
        return Err(MaldifyError::invalid_input(record, format!("line item for {product_id} has negative price {price}")));
    }
    if price > MAX_UNIT_PRICE || price.checked_mul(Decimal::from(quantity)).is_none() {
        return Err(MaldifyError::invalid_input(record, format!("line item for {product_id} has out of range price {price}")));
    }
    Ok((product_id, quantity, price))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(product_id: Option<&str>, quantity: Option<i64>, price: Option<Decimal>) -> OrderLineInput {
        OrderLineInput { product_id: product_id.map(Into::into), quantity, price, title: Some("Widget".into()) }
    }

    #[test]
    fn test_valid_line() {
        let item = line(Some("gid://shopify/Product/1"), Some(3), Some(Decimal::new(1999, 2))).validate("order 1").unwrap();
        assert_eq!(item.product_id.as_str(), "1");
        assert_eq!(item.quantity, 3);
        assert_eq!(item.title, "Widget");
    }

    #[test]
    fn test_invalid_lines_are_rejected() {
        assert!(line(None, Some(1), Some(Decimal::ONE)).validate("order 1").is_err());
        assert!(line(Some("1"), Some(0), Some(Decimal::ONE)).validate("order 1").is_err());
        assert!(line(Some("1"), Some(-2), Some(Decimal::ONE)).validate("order 1").is_err());
        assert!(line(Some("1"), Some(1), None).validate("order 1").is_err());
        assert!(line(Some("1"), Some(1), Some(Decimal::NEGATIVE_ONE)).validate("order 1").is_err());
    }

    #[test]
    fn test_price_above_bound_is_rejected() {
        let absurd = Decimal::from_i128_with_scale(10_i128.pow(27), 0);
        let err = line(Some("1"), Some(1), Some(absurd)).validate("order 1").unwrap_err();
        assert!(err.to_string().contains("out of range price"));
        assert!(line(Some("1"), Some(1), Some(MAX_UNIT_PRICE + Decimal::ONE)).validate("order 1").is_err());

        let item = line(Some("1"), Some(i64::from(u32::MAX)), Some(MAX_UNIT_PRICE)).validate("order 1").unwrap();
        assert_eq!(item.total(), MAX_UNIT_PRICE * Decimal::from(u32::MAX));
    }

    #[test]
    fn test_missing_title_falls_back() {
        let mut input = line(Some("7"), Some(1), Some(Decimal::ONE));
        input.title = Some("  ".into());
        assert_eq!(input.validate("order 1").unwrap().title, UNTITLED_PRODUCT);
    }

    #[test]
    fn test_error_names_the_record() {
        let err = RefundLineInput { product_id: None, quantity: Some(1), price: Some(Decimal::ONE) }.validate("refund 9").unwrap_err();
        assert_eq!(err.to_string(), "Invalid refund 9: line item has no product id");
    }
}

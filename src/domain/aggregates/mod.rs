//! Aggregates module
pub mod product;
pub mod order;
pub mod cart;

pub use product::{OrderCounting, ProductRefundAggregate, ProductSalesAggregate, RefundsByProduct, SalesByProduct};
pub use order::{OrderHistory, MAX_UNIT_PRICE, OrderLineInput, OrderLineItem, OrderRecord, RefundLineInput, RefundLineItem, RefundRecord};
pub use cart::{CartLine, CartSnapshot};

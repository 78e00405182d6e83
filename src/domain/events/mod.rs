//! Domain events
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::value_objects::ProductId;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    OfferGenerated {
        shop: String,
        cart_id: String,
        customer_id: String,
        total_items: u32,
        cart_product_ids: Vec<ProductId>,
        offer_product_id: ProductId,
        #[serde(with = "rust_decimal::serde::float")]
        offer_price: Decimal,
        discount_percent: Option<u8>,
        is_pro: bool,
        usage_count: Option<u32>,
    },
    PlanLimitReached { shop: String, customer_id: String, current_usage: u32, limit: u32 },
    RiskReportGenerated { shop: String, days: u32, products_analyzed: usize, high_risk_products: usize, skipped_lines: usize },
    SubscriptionActivated { shop: String, charge_id: u64, plan_name: String },
}

impl DomainEvent {
    /// NATS subject the event is published on.
    pub fn subject(&self) -> &'static str {
        match self {
            Self::OfferGenerated { .. } => "maldify.offer_generated",
            Self::PlanLimitReached { .. } => "maldify.plan_limit_reached",
            Self::RiskReportGenerated { .. } => "maldify.risk_report_generated",
            Self::SubscriptionActivated { .. } => "maldify.subscription_activated",
        }
    }
}

/// Event plus the metadata every published message carries.
#[derive(Clone, Debug, Serialize)]
pub struct EventEnvelope {
    pub id: Uuid,
    pub occurred_at: DateTime<Utc>,
    #[serde(flatten)]
    pub event: DomainEvent,
}

impl EventEnvelope {
    pub fn new(event: DomainEvent) -> Self { Self { id: Uuid::now_v7(), occurred_at: Utc::now(), event } }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_flattens_tagged_event() {
        let envelope = EventEnvelope::new(DomainEvent::PlanLimitReached { shop: "demo.myshopify.com".into(), customer_id: "c1".into(), current_usage: 50, limit: 50 });
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["type"], "plan_limit_reached");
        assert_eq!(json["current_usage"], 50);
        assert!(json["id"].is_string());
        assert_eq!(envelope.event.subject(), "maldify.plan_limit_reached");
    }

    #[test]
    fn test_offer_event_carries_cart_products() {
        let cart = crate::domain::aggregates::CartSnapshot::new(
            "cart-1",
            ["5", "gid://shopify/Product/6", "5"]
                .iter()
                .enumerate()
                .map(|(i, id)| crate::domain::aggregates::CartLine { id: format!("l{i}"), quantity: 1, product_id: Some(ProductId::new(*id).unwrap()) })
                .collect(),
        );
        let event = DomainEvent::OfferGenerated {
            shop: "demo.myshopify.com".into(),
            cart_id: cart.id.clone(),
            customer_id: "c1".into(),
            total_items: cart.item_count(),
            cart_product_ids: cart.product_ids(),
            offer_product_id: ProductId::new("111222333").unwrap(),
            offer_price: Decimal::new(5000, 2),
            discount_percent: Some(50),
            is_pro: false,
            usage_count: Some(1),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "offer_generated");
        assert_eq!(json["cart_product_ids"], serde_json::json!(["5", "6"]));
        assert_eq!(json["offer_price"], serde_json::json!(50.0));
    }
}

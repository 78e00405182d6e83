//! Free/Pro plan definitions and the monthly usage gate

use rust_decimal::Decimal;
use serde::Serialize;

pub const FREE_PLAN_NAME: &str = "Maldify Free";
pub const PRO_PLAN_NAME: &str = "Maldify Pro";

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SubscriptionStatus {
    pub is_pro_plan: bool,
    pub plan_name: String,
}

impl SubscriptionStatus {
    pub fn free() -> Self { Self { is_pro_plan: false, plan_name: FREE_PLAN_NAME.to_string() } }
    pub fn pro() -> Self { Self { is_pro_plan: true, plan_name: PRO_PLAN_NAME.to_string() } }
}

/// Plan card shown on the plan selection page. `limit` 0 means unlimited.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Plan {
    pub name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price_monthly: Decimal,
    pub limit: u32,
    pub features: Vec<String>,
}

impl Plan {
    pub fn free(limit: u32) -> Self {
        Self {
            name: FREE_PLAN_NAME.to_string(),
            price_monthly: Decimal::ZERO,
            limit,
            features: vec![
                format!("Up to {limit} upsell offers per month"),
                "Cart-size based offers".to_string(),
                "Return risk report".to_string(),
            ],
        }
    }

    pub fn pro(price_monthly: Decimal) -> Self {
        Self {
            name: PRO_PLAN_NAME.to_string(),
            price_monthly,
            limit: 0,
            features: vec![
                "Unlimited upsell offers".to_string(),
                "Checkout product recommendations".to_string(),
                "Return risk report".to_string(),
                "Upsell ROI report".to_string(),
            ],
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UsageDecision {
    /// Pro plans are not metered.
    Unmetered,
    /// Free plan with quota left; the offer about to be served is number `next_count`.
    Metered { next_count: u32, limit: u32 },
    LimitReached { current_usage: u32, limit: u32 },
}

pub fn evaluate_usage(status: &SubscriptionStatus, current_usage: u32, limit: u32) -> UsageDecision {
    if status.is_pro_plan { return UsageDecision::Unmetered; }
    if current_usage >= limit { return UsageDecision::LimitReached { current_usage, limit }; }
    UsageDecision::Metered { next_count: current_usage + 1, limit }
}

//! Commerce platform collaborator.
//!
//! Everything Maldify knows about carts, orders, refunds and billing comes
//! through [`CommercePlatform`]. The production implementation talks to the
//! Shopify Admin API; tests substitute an in-process fake.

mod shopify;
pub mod subscription;

pub use shopify::ShopifyAdminClient;
pub use subscription::{PlatformSubscriptionProvider, SubscriptionStatusProvider};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::aggregates::{CartSnapshot, OrderHistory};
use crate::domain::value_objects::AnalysisPeriod;

#[derive(Debug, Error)]
pub enum PlatformError {
    /// Transport failure: DNS, connect, TLS or timeout.
    #[error("network error: {0}")]
    Network(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("rate limited, retry after {0} seconds")]
    RateLimited(u64),

    #[error("GraphQL errors: {0}")]
    GraphQl(String),

    #[error("unexpected response: {0}")]
    Decode(String),

    #[error("upstream error {status}: {body}")]
    Upstream { status: u16, body: String },
}

impl From<reqwest::Error> for PlatformError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() { Self::Decode(err.to_string()) } else { Self::Network(err.to_string()) }
    }
}

impl From<serde_json::Error> for PlatformError {
    fn from(err: serde_json::Error) -> Self { Self::Decode(err.to_string()) }
}

/// A recurring application charge as the platform reports it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurringCharge {
    pub id: u64,
    pub name: String,
    pub price: String,
    pub status: String,
    #[serde(default)]
    pub confirmation_url: Option<String>,
    #[serde(default)]
    pub test: Option<bool>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ChargeRequest {
    pub name: String,
    pub price: String,
    pub return_url: String,
    pub test: bool,
}

#[async_trait]
pub trait CommercePlatform: Send + Sync {
    /// Shop domain the platform session belongs to.
    fn shop(&self) -> &str;

    /// `Ok(None)` when the platform has no such cart.
    async fn fetch_cart(&self, cart_id: &str) -> Result<Option<CartSnapshot>, PlatformError>;

    async fn fetch_order_history(&self, period: &AnalysisPeriod) -> Result<OrderHistory, PlatformError>;

    async fn create_recurring_charge(&self, request: &ChargeRequest) -> Result<RecurringCharge, PlatformError>;

    async fn active_recurring_charges(&self) -> Result<Vec<RecurringCharge>, PlatformError>;

    async fn activate_recurring_charge(&self, charge_id: u64) -> Result<RecurringCharge, PlatformError>;
}

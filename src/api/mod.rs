//! HTTP surface: router, shared state and error mapping.

mod analytics;
mod billing;
mod offer;
mod settings;

use axum::{http::StatusCode, response::{IntoResponse, Response}, routing::{get, post}, Json, Router};
use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::AppConfig;
use crate::domain::events::{DomainEvent, EventEnvelope};
use crate::domain::services::{OfferCatalog, Recommender};
use crate::platform::{CommercePlatform, PlatformError, SubscriptionStatusProvider};
use crate::store::{SettingsRepository, StoreError, UsageCounter};
use crate::MaldifyError;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub platform: Arc<dyn CommercePlatform>,
    pub subscriptions: Arc<dyn SubscriptionStatusProvider>,
    pub usage: Arc<dyn UsageCounter>,
    pub settings: Arc<dyn SettingsRepository>,
    pub recommender: Arc<dyn Recommender>,
    pub nats: Option<async_nats::Client>,
}

impl AppState {
    pub fn shop(&self) -> &str { self.platform.shop() }

    /// Merchant's saved offer mapping, or the configured default.
    pub async fn offer_catalog(&self) -> Result<(OfferCatalog, CatalogSource), ApiError> {
        Ok(match self.settings.load(self.shop()).await? {
            Some(catalog) => (catalog, CatalogSource::Saved),
            None => (self.config.offers.clone(), CatalogSource::Default),
        })
    }

    /// Fire-and-forget; a broker outage never fails the request.
    pub async fn publish(&self, event: DomainEvent) {
        let Some(nats) = &self.nats else { return };
        let subject = event.subject();
        let payload = match serde_json::to_vec(&EventEnvelope::new(event)) {
            Ok(payload) => payload,
            Err(e) => { tracing::warn!(subject, error = %e, "failed to encode event"); return; }
        };
        if let Err(e) = nats.publish(subject.to_string(), payload.into()).await {
            tracing::warn!(subject, error = %e, "failed to publish event");
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogSource { Saved, Default }

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { Json(json!({"status": "healthy", "service": "maldify"})) }))
        .route("/api/public/get-offer", post(offer::get_offer))
        .route("/api/checkout/recommendation", post(offer::recommend))
        .route("/api/analytics/churn_risk", get(analytics::churn_risk))
        .route("/api/analytics/roi", get(analytics::roi))
        .route("/api/settings", get(settings::get_settings).put(settings::save_settings))
        .route("/api/billing/plans", get(billing::plans))
        .route("/api/billing/setup", post(billing::setup))
        .route("/api/billing/check", get(billing::check))
        .route("/billing-redirect", get(billing::redirect))
        .layer(TraceLayer::new_for_http()).layer(CorsLayer::permissive()).with_state(state)
}

// =============================================================================
// Error Types
// =============================================================================

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Free plan usage exhausted for this month.")]
    PlanLimitReached { current_usage: u32, limit: u32 },

    #[error("Billing plan not configured")]
    BillingNotConfigured { missing: Vec<&'static str> },

    #[error("{message}: {details}")]
    Billing { message: &'static str, code: &'static str, details: String, shop: String },

    #[error(transparent)]
    Platform(#[from] PlatformError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("{0}")]
    Internal(String),
}

impl From<MaldifyError> for ApiError {
    fn from(err: MaldifyError) -> Self { Self::BadRequest(err.to_string()) }
}

impl ApiError {
    /// Maps a failed billing call to the merchant-facing message and code.
    pub fn billing(shop: &str, fallback: (&'static str, &'static str), err: PlatformError) -> Self {
        let (message, code) = match &err {
            PlatformError::Unauthorized(_) => ("Unauthorized: Check your API credentials", "UNAUTHORIZED"),
            PlatformError::InvalidRequest(_) | PlatformError::GraphQl(_) => ("Invalid billing configuration", "INVALID_CONFIG"),
            PlatformError::Network(_) | PlatformError::RateLimited(_) => ("Network error: Unable to connect to Shopify", "NETWORK_ERROR"),
            _ => fallback,
        };
        Self::Billing { message, code, details: err.to_string(), shop: shop.to_string() }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            Self::BadRequest(message) => (StatusCode::BAD_REQUEST, json!({ "error": message })),
            Self::NotFound(message) => (StatusCode::NOT_FOUND, json!({ "error": message })),
            Self::PlanLimitReached { current_usage, limit } => (
                StatusCode::FORBIDDEN,
                json!({
                    "error": "PLAN_LIMIT_REACHED",
                    "message": self.to_string(),
                    "current_usage": current_usage,
                    "limit": limit,
                    "upgrade_url": "/billing/setup",
                }),
            ),
            Self::BillingNotConfigured { missing } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({
                    "error": "Billing plan not configured. Please set the following environment variables:",
                    "missing_variables": missing,
                    "details": "Required: SHOPIFY_APP_URL, SHOP_PLAN_ID",
                }),
            ),
            Self::Billing { message, code, details, shop } => {
                tracing::error!(shop = %shop, error_code = code, details = %details, "billing request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": message, "error_code": code, "details": details, "timestamp": Utc::now().to_rfc3339(), "shop": shop }),
                )
            }
            Self::Platform(e) => {
                tracing::error!(error = %e, "commerce platform request failed");
                (StatusCode::BAD_GATEWAY, json!({ "error": "Commerce platform request failed", "details": e.to_string() }))
            }
            Self::Store(e) => {
                tracing::error!(error = %e, "store request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": "Internal server error" }))
            }
            Self::Internal(message) => {
                tracing::error!(error = %message, "internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": message }))
            }
        };
        (status, Json(body)).into_response()
    }
}

//! Storefront and checkout handlers

use axum::{extract::{rejection::JsonRejection, State}, Json};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use validator::Validate;

use super::{ApiError, AppState};
use crate::domain::events::DomainEvent;
use crate::domain::services::{evaluate_usage, CartOffer, Recommendation, UsageDecision};
use crate::domain::value_objects::{ProductId, UsagePeriod};
use crate::platform::PlatformError;

const MISSING_OFFER_PARAMS: &str = "Missing required parameters: cart_id and customer_id are required";

#[derive(Debug, Deserialize, Validate)]
pub struct GetOfferRequest {
    #[serde(default)]
    #[validate(required, length(min = 1))]
    pub cart_id: Option<String>,
    #[serde(default)]
    #[validate(required, length(min = 1))]
    pub customer_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SubscriptionInfo {
    pub plan: String,
    pub is_pro: bool,
    pub usage_count: Option<u32>,
    pub usage_limit: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct OfferResponse {
    #[serde(flatten)]
    pub offer: CartOffer,
    pub subscription_info: SubscriptionInfo,
}

pub async fn get_offer(State(state): State<AppState>, Json(request): Json<GetOfferRequest>) -> Result<Json<OfferResponse>, ApiError> {
    request.validate().map_err(|_| ApiError::BadRequest(MISSING_OFFER_PARAMS.to_string()))?;
    let cart_id = request.cart_id.unwrap_or_default();
    let customer_id = request.customer_id.unwrap_or_default();
    let shop = state.shop().to_string();
    let limit = state.config.billing.free_plan_limit;

    let subscription = state.subscriptions.status().await?;
    let period = UsagePeriod::current();
    let current_usage = state.usage.current(&shop, &period).await?;
    let decision = evaluate_usage(&subscription, current_usage, limit);

    if let UsageDecision::LimitReached { current_usage, limit } = decision {
        return Err(limit_reached(&state, shop, customer_id, current_usage, limit).await);
    }

    let cart = match state.platform.fetch_cart(&cart_id).await {
        Ok(Some(cart)) => cart,
        Ok(None) | Err(PlatformError::NotFound(_)) => return Err(ApiError::NotFound("Cart not found".to_string())),
        Err(e) => return Err(e.into()),
    };
    let total_items = cart.item_count();
    let (catalog, _) = state.offer_catalog().await?;
    let offer = catalog.select_offer(total_items);

    // Concurrent requests can all pass the early check; the reservation enforces the quota.
    let usage_count = match decision {
        UsageDecision::Metered { .. } => match state.usage.try_increment(&shop, &period, limit).await? {
            Some(count) => Some(count),
            None => return Err(limit_reached(&state, shop, customer_id, limit, limit).await),
        },
        _ => None,
    };

    info!(
        shop = %shop,
        cart_id = %cart_id,
        customer_id = %customer_id,
        total_items,
        offer_product_id = %offer.offer_product_id,
        usage_count = ?usage_count,
        "offer generated"
    );
    state
        .publish(DomainEvent::OfferGenerated {
            shop,
            cart_id,
            customer_id,
            total_items,
            cart_product_ids: cart.product_ids(),
            offer_product_id: offer.offer_product_id.clone(),
            offer_price: offer.offer_price,
            discount_percent: offer.discount_percent,
            is_pro: subscription.is_pro_plan,
            usage_count,
        })
        .await;

    Ok(Json(OfferResponse {
        offer,
        subscription_info: SubscriptionInfo {
            plan: subscription.plan_name,
            is_pro: subscription.is_pro_plan,
            usage_count,
            usage_limit: (!subscription.is_pro_plan).then_some(limit),
        },
    }))
}

async fn limit_reached(state: &AppState, shop: String, customer_id: String, current_usage: u32, limit: u32) -> ApiError {
    info!(shop = %shop, customer_id = %customer_id, current_usage, limit, "free plan limit reached");
    state.publish(DomainEvent::PlanLimitReached { shop, customer_id, current_usage, limit }).await;
    ApiError::PlanLimitReached { current_usage, limit }
}

/// Ids arrive as Shopify global ids, bare numeric strings or plain numbers.
#[derive(Debug, Deserialize)]
pub struct RecommendationRequest {
    #[serde(default)]
    pub product_ids: Vec<ProductId>,
}

#[derive(Debug, Serialize)]
pub struct RecommendationResponse {
    pub success: bool,
    pub engine: &'static str,
    pub recommendations: Vec<Recommendation>,
}

pub async fn recommend(
    State(state): State<AppState>,
    request: Result<Json<RecommendationRequest>, JsonRejection>,
) -> Result<Json<RecommendationResponse>, ApiError> {
    let Json(request) = request.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    let recommendations = state.recommender.recommend(&request.product_ids);
    debug!(shop = %state.shop(), inputs = request.product_ids.len(), engine = state.recommender.name(), "recommendations mapped");
    Ok(Json(RecommendationResponse { success: true, engine: state.recommender.name(), recommendations }))
}

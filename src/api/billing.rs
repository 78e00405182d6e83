//! Plan listing and the recurring charge lifecycle

use axum::{extract::{Query, State}, response::Redirect, Json};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use super::{ApiError, AppState};
use crate::domain::events::DomainEvent;
use crate::domain::services::Plan;
use crate::platform::{ChargeRequest, PlatformError};

const SETUP_FAILED: (&str, &str) = ("Failed to create billing subscription", "BILLING_SETUP_ERROR");
const CHECK_FAILED: (&str, &str) = ("Failed to check billing status", "BILLING_CHECK_ERROR");

#[derive(Debug, Serialize)]
pub struct PlansResponse {
    pub plans: Vec<Plan>,
}

pub async fn plans(State(state): State<AppState>) -> Json<PlansResponse> {
    let billing = &state.config.billing;
    Json(PlansResponse { plans: vec![Plan::free(billing.free_plan_limit), Plan::pro(billing.plan_price)] })
}

#[derive(Debug, Serialize)]
pub struct BillingSetupResponse {
    pub success: bool,
    pub billing_url: String,
    #[serde(rename = "confirmationUrl")]
    pub confirmation_url: String,
    pub subscription_id: u64,
    pub plan_name: String,
    pub plan_price: String,
    pub plan_id: String,
    pub currency: String,
    pub shop: String,
    pub test_mode: bool,
    pub status: String,
}

pub async fn setup(State(state): State<AppState>) -> Result<Json<BillingSetupResponse>, ApiError> {
    let shop = state.shop().to_string();
    let billing = &state.config.billing;
    let Some(plan_id) = billing.plan_id.clone() else {
        error!(shop = %shop, missing = "SHOP_PLAN_ID", "billing plan not configured");
        return Err(ApiError::BillingNotConfigured { missing: vec!["SHOP_PLAN_ID"] });
    };

    let request = ChargeRequest {
        name: billing.plan_name.clone(),
        price: billing.plan_price.to_string(),
        return_url: format!("{}/billing-redirect", state.config.shopify.app_url.as_str().trim_end_matches('/')),
        test: !state.config.production,
    };
    info!(shop = %shop, plan = %request.name, price = %request.price, plan_id = %plan_id, return_url = %request.return_url, test = request.test, "creating recurring charge");

    let charge = state.platform.create_recurring_charge(&request).await.map_err(|e| ApiError::billing(&shop, SETUP_FAILED, e))?;
    let Some(confirmation_url) = charge.confirmation_url.clone() else {
        return Err(ApiError::Internal("Failed to get billing confirmation URL".to_string()));
    };
    info!(shop = %shop, charge_id = charge.id, status = %charge.status, "recurring charge created");

    Ok(Json(BillingSetupResponse {
        success: true,
        billing_url: confirmation_url.clone(),
        confirmation_url,
        subscription_id: charge.id,
        plan_name: charge.name,
        plan_price: charge.price,
        plan_id,
        currency: billing.currency.clone(),
        shop,
        test_mode: charge.test.unwrap_or(request.test),
        status: charge.status,
    }))
}

#[derive(Debug, Serialize)]
pub struct BillingStatusResponse {
    pub has_subscription: bool,
    pub plan_name: Option<String>,
    pub plan_price: Option<String>,
    pub currency: String,
    pub status: String,
    pub shop: String,
}

pub async fn check(State(state): State<AppState>) -> Result<Json<BillingStatusResponse>, ApiError> {
    let shop = state.shop().to_string();
    let charges = state.platform.active_recurring_charges().await.map_err(|e| ApiError::billing(&shop, CHECK_FAILED, e))?;
    let active = charges.into_iter().next();
    Ok(Json(BillingStatusResponse {
        has_subscription: active.is_some(),
        plan_name: active.as_ref().map(|c| c.name.clone()),
        plan_price: active.as_ref().map(|c| c.price.clone()),
        currency: state.config.billing.currency.clone(),
        status: active.map_or_else(|| "inactive".to_string(), |c| c.status),
        shop,
    }))
}

#[derive(Debug, Default, Deserialize)]
pub struct RedirectParams {
    pub charge_id: Option<String>,
}

/// Shopify sends the merchant here after they approve or decline the charge.
pub async fn redirect(State(state): State<AppState>, Query(params): Query<RedirectParams>) -> Redirect {
    let app_url = &state.config.shopify.app_url;
    let Some(charge_id) = params.charge_id.as_deref().and_then(|id| id.trim().parse::<u64>().ok()) else {
        warn!(shop = %state.shop(), charge_id = ?params.charge_id, "billing redirect without a usable charge_id");
        return Redirect::to(&app_location(app_url, &[("billing", "error"), ("reason", "missing_charge_id")]));
    };

    match state.platform.activate_recurring_charge(charge_id).await {
        Ok(charge) => {
            info!(shop = %state.shop(), charge_id, plan = %charge.name, "subscription activated");
            state.publish(DomainEvent::SubscriptionActivated { shop: state.shop().to_string(), charge_id, plan_name: charge.name.clone() }).await;
            Redirect::to(&app_location(app_url, &[("billing", "success"), ("plan", charge.name.as_str())]))
        }
        Err(e) => {
            error!(shop = %state.shop(), charge_id, error = %e, "charge activation failed");
            Redirect::to(&app_location(app_url, &[("billing", "error"), ("reason", activation_failure(&e))]))
        }
    }
}

/// Short reason code for the merchant UI. Upstream detail stays in the logs.
fn activation_failure(err: &PlatformError) -> &'static str {
    match err {
        PlatformError::NotFound(_) => "not_found",
        PlatformError::Unauthorized(_) => "unauthorized",
        PlatformError::Network(_) | PlatformError::RateLimited(_) => "network_error",
        _ => "activation_failed",
    }
}

fn app_location(app_url: &Url, params: &[(&str, &str)]) -> String {
    let mut url = app_url.clone();
    url.query_pairs_mut().clear().extend_pairs(params);
    url.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_location_encodes_params() {
        let base = Url::parse("https://app.example.com").unwrap();
        assert_eq!(app_location(&base, &[("billing", "success"), ("plan", "Maldify Pro")]), "https://app.example.com/?billing=success&plan=Maldify+Pro");

        let with_query = Url::parse("https://app.example.com/admin?stale=1").unwrap();
        assert_eq!(app_location(&with_query, &[("billing", "error")]), "https://app.example.com/admin?billing=error");
    }

    #[test]
    fn test_activation_failure_hides_upstream_detail() {
        assert_eq!(activation_failure(&PlatformError::NotFound("charge 9".into())), "not_found");
        assert_eq!(activation_failure(&PlatformError::RateLimited(2)), "network_error");
        let upstream = PlatformError::Upstream { status: 500, body: "<html>secret stack trace</html>".into() };
        assert_eq!(activation_failure(&upstream), "activation_failed");
    }
}

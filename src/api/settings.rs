//! Merchant offer mapping

use axum::{extract::State, Json};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;
use validator::{Validate, ValidationError};

use super::{ApiError, AppState, CatalogSource};
use crate::domain::services::{OfferCatalog, OfferProduct};
use crate::domain::value_objects::ProductId;
use crate::MaldifyError;

/// Flat shape the admin settings page reads and writes.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[validate(schema(function = "distinct_products", skip_on_field_errors = true))]
pub struct SettingsPayload {
    #[validate(length(min = 1, max = 255))]
    pub premium_product_id: String,
    #[serde(serialize_with = "rust_decimal::serde::float::serialize")]
    #[validate(custom = "positive_price")]
    pub premium_base_price: Decimal,
    #[validate(length(min = 1, max = 255))]
    pub complementary_product_id: String,
    #[serde(serialize_with = "rust_decimal::serde::float::serialize")]
    #[validate(custom = "positive_price")]
    pub complementary_base_price: Decimal,
}

/// Prices are stored as `NUMERIC(12, 2)`.
const MAX_PRICE_EXCLUSIVE: Decimal = Decimal::from_parts(1_410_065_408, 2, 0, false, 0);

fn positive_price(price: &Decimal) -> Result<(), ValidationError> {
    if !price.is_sign_positive() || price.is_zero() { return Err(ValidationError::new("price_must_be_positive")); }
    if price.normalize().scale() > 2 { return Err(ValidationError::new("price_has_more_than_two_decimals")); }
    if *price >= MAX_PRICE_EXCLUSIVE { return Err(ValidationError::new("price_too_large")); }
    Ok(())
}

fn distinct_products(payload: &SettingsPayload) -> Result<(), ValidationError> {
    let premium = ProductId::new(payload.premium_product_id.as_str());
    let complementary = ProductId::new(payload.complementary_product_id.as_str());
    match (premium, complementary) {
        (Ok(a), Ok(b)) if a == b => Err(ValidationError::new("offer_products_must_differ")),
        _ => Ok(()),
    }
}

impl From<OfferCatalog> for SettingsPayload {
    fn from(catalog: OfferCatalog) -> Self {
        Self {
            premium_product_id: catalog.premium.product_id.to_string(),
            premium_base_price: catalog.premium.base_price,
            complementary_product_id: catalog.complementary.product_id.to_string(),
            complementary_base_price: catalog.complementary.base_price,
        }
    }
}

impl TryFrom<SettingsPayload> for OfferCatalog {
    type Error = MaldifyError;

    fn try_from(payload: SettingsPayload) -> Result<Self, Self::Error> {
        Ok(OfferCatalog {
            premium: OfferProduct { product_id: ProductId::new(payload.premium_product_id)?, base_price: payload.premium_base_price },
            complementary: OfferProduct { product_id: ProductId::new(payload.complementary_product_id)?, base_price: payload.complementary_base_price },
        })
    }
}

#[derive(Debug, Serialize)]
pub struct SettingsResponse {
    #[serde(flatten)]
    pub settings: SettingsPayload,
    pub source: CatalogSource,
}

pub async fn get_settings(State(state): State<AppState>) -> Result<Json<SettingsResponse>, ApiError> {
    let (catalog, source) = state.offer_catalog().await?;
    Ok(Json(SettingsResponse { settings: catalog.into(), source }))
}

pub async fn save_settings(State(state): State<AppState>, Json(payload): Json<SettingsPayload>) -> Result<Json<SettingsResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(format!("Invalid settings: {e}")))?;
    let catalog = OfferCatalog::try_from(payload)?;
    state.settings.save(state.shop(), &catalog).await?;
    info!(
        shop = %state.shop(),
        premium_product_id = %catalog.premium.product_id,
        complementary_product_id = %catalog.complementary.product_id,
        "offer settings saved"
    );
    Ok(Json(SettingsResponse { settings: catalog.into(), source: CatalogSource::Saved }))
}

//! Runtime configuration read from the environment (and `.env` via dotenvy).

use reqwest::Url;
use rust_decimal::Decimal;
use secrecy::SecretString;
use std::str::FromStr;
use thiserror::Error;

use crate::domain::aggregates::OrderCounting;
use crate::domain::services::{OfferCatalog, OfferProduct};
use crate::domain::value_objects::{AnalysisPeriod, ProductId};

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: Option<String>,
    pub nats_url: Option<String>,
    pub production: bool,
    pub shopify: ShopifyConfig,
    pub billing: BillingConfig,
    pub offers: OfferCatalog,
    pub recommendations: RecommendationConfig,
    pub analytics: AnalyticsConfig,
}

#[derive(Clone, Debug)]
pub struct ShopifyConfig {
    pub shop_domain: String,
    pub access_token: SecretString,
    pub app_url: Url,
    pub api_version: String,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct BillingConfig {
    pub plan_name: String,
    pub plan_price: Decimal,
    pub plan_id: Option<String>,
    pub currency: String,
    pub free_plan_limit: u32,
}

#[derive(Clone, Debug)]
pub struct RecommendationConfig {
    pub warranty_product_id: ProductId,
    pub general_product_id: ProductId,
}

#[derive(Clone, Debug)]
pub struct AnalyticsConfig {
    pub default_period_days: u32,
    pub orders_count: OrderCounting,
    pub max_order_pages: u32,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variable `{0}`")]
    Missing(&'static str),
    #[error("invalid value for `{key}`: `{value}` ({reason})")]
    Invalid { key: &'static str, value: String, reason: String },
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup; `from_env` passes the process
    /// environment, tests pass a map.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env { lookup };

        let port = match env.get("BACKEND_PORT").or_else(|| env.get("PORT")) {
            Some(raw) => parse_value("PORT", &raw)?,
            None => 3000,
        };
        let environment = env.get("APP_ENV").or_else(|| env.get("NODE_ENV")).unwrap_or_default();

        let app_url_raw = env.require("SHOPIFY_APP_URL")?;
        let app_url = Url::parse(&app_url_raw).map_err(|e| invalid("SHOPIFY_APP_URL", &app_url_raw, e))?;

        let shopify = ShopifyConfig {
            shop_domain: env.require("SHOPIFY_SHOP_DOMAIN")?,
            access_token: SecretString::from(env.require("SHOPIFY_ACCESS_TOKEN")?),
            app_url,
            api_version: env.get("SHOPIFY_API_VERSION").unwrap_or_else(|| "2024-10".to_string()),
            timeout_secs: env.parse_or("SHOPIFY_TIMEOUT_SECS", 15)?,
        };

        let billing = BillingConfig {
            plan_name: env.get("SHOP_PLAN_NAME").unwrap_or_else(|| "Maldify Pro Subscription".to_string()),
            plan_price: env.parse_or("SHOP_PLAN_PRICE", Decimal::new(2999, 2))?,
            plan_id: env.get("SHOP_PLAN_ID"),
            currency: "USD".to_string(),
            free_plan_limit: env.parse_or("MALDIFY_FREE_PLAN_LIMIT", 50)?,
        };

        let offers = OfferCatalog {
            premium: OfferProduct {
                product_id: env.product_id("MALDIFY_PREMIUM_PRODUCT_ID", "111222333")?,
                base_price: env.parse_or("MALDIFY_PREMIUM_BASE_PRICE", Decimal::new(9999, 2))?,
            },
            complementary: OfferProduct {
                product_id: env.product_id("MALDIFY_COMPLEMENTARY_PRODUCT_ID", "444555666")?,
                base_price: env.parse_or("MALDIFY_COMPLEMENTARY_BASE_PRICE", Decimal::new(4999, 2))?,
            },
        };

        let recommendations = RecommendationConfig {
            warranty_product_id: env.product_id("MALDIFY_WARRANTY_PRODUCT_ID", "999000111")?,
            general_product_id: env.product_id("MALDIFY_GENERAL_PRODUCT_ID", "999000222")?,
        };

        let default_period_days = env.parse_or("MALDIFY_ANALYSIS_DAYS", 30)?;
        if default_period_days == 0 || default_period_days > AnalysisPeriod::MAX_DAYS {
            return Err(invalid("MALDIFY_ANALYSIS_DAYS", &default_period_days.to_string(), "must be between 1 and 365"));
        }
        let analytics = AnalyticsConfig {
            default_period_days,
            orders_count: env.parse_or("MALDIFY_ORDERS_COUNT_MODE", OrderCounting::PerOrder)?,
            max_order_pages: env.parse_or("MALDIFY_MAX_ORDER_PAGES", 20)?,
        };

        Ok(Self {
            port,
            database_url: env.get("DATABASE_URL"),
            nats_url: env.get("NATS_URL"),
            production: environment.eq_ignore_ascii_case("production"),
            shopify,
            billing,
            offers,
            recommendations,
            analytics,
        })
    }
}

struct Env<F> {
    lookup: F,
}

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, key: &str) -> Option<String> {
        (self.lookup)(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
    }

    fn require(&self, key: &'static str) -> Result<String, ConfigError> {
        self.get(key).ok_or(ConfigError::Missing(key))
    }

    fn parse_or<T>(&self, key: &'static str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.get(key) {
            Some(raw) => parse_value(key, &raw),
            None => Ok(default),
        }
    }

    fn product_id(&self, key: &'static str, default: &str) -> Result<ProductId, ConfigError> {
        let raw = self.get(key).unwrap_or_else(|| default.to_string());
        ProductId::new(raw.clone()).map_err(|e| invalid(key, &raw, e))
    }
}

fn parse_value<T>(key: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse().map_err(|e| invalid(key, raw, e))
}

fn invalid(key: &'static str, value: &str, reason: impl std::fmt::Display) -> ConfigError {
    ConfigError::Invalid { key, value: value.to_string(), reason: reason.to_string() }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::collections::HashMap;

    pub(crate) fn base_env() -> HashMap<&'static str, String> {
        HashMap::from([
            ("SHOPIFY_SHOP_DOMAIN", "demo.myshopify.com".to_string()),
            ("SHOPIFY_ACCESS_TOKEN", "shpat_test".to_string()),
            ("SHOPIFY_APP_URL", "https://app.example.com".to_string()),
        ])
    }

    pub(crate) fn load(env: &HashMap<&'static str, String>) -> Result<AppConfig, ConfigError> {
        AppConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&base_env()).unwrap();
        assert_eq!(config.port, 3000);
        assert!(!config.production);
        assert_eq!(config.shopify.api_version, "2024-10");
        assert_eq!(config.shopify.access_token.expose_secret(), "shpat_test");
        assert_eq!(config.billing.plan_price, Decimal::new(2999, 2));
        assert_eq!(config.billing.free_plan_limit, 50);
        assert_eq!(config.billing.plan_id, None);
        assert_eq!(config.offers.premium.product_id.as_str(), "111222333");
        assert_eq!(config.offers.complementary.base_price, Decimal::new(4999, 2));
        assert_eq!(config.analytics.orders_count, OrderCounting::PerOrder);
        assert_eq!(config.analytics.default_period_days, 30);
    }

    #[test]
    fn test_overrides() {
        let mut env = base_env();
        env.insert("PORT", "8080".into());
        env.insert("NODE_ENV", "production".into());
        env.insert("SHOP_PLAN_ID", "pro-monthly".into());
        env.insert("MALDIFY_PREMIUM_PRODUCT_ID", "gid://shopify/Product/42".into());
        env.insert("MALDIFY_ORDERS_COUNT_MODE", "per_line_item".into());
        let config = load(&env).unwrap();
        assert_eq!(config.port, 8080);
        assert!(config.production);
        assert_eq!(config.billing.plan_id.as_deref(), Some("pro-monthly"));
        assert_eq!(config.offers.premium.product_id.as_str(), "42");
        assert_eq!(config.analytics.orders_count, OrderCounting::PerLineItem);
    }

    #[test]
    fn test_backend_port_wins_over_port() {
        let mut env = base_env();
        env.insert("PORT", "8080".into());
        env.insert("BACKEND_PORT", "9090".into());
        assert_eq!(load(&env).unwrap().port, 9090);
    }

    #[test]
    fn test_missing_and_invalid_values() {
        let mut env = base_env();
        env.remove("SHOPIFY_ACCESS_TOKEN");
        assert_eq!(load(&env).unwrap_err(), ConfigError::Missing("SHOPIFY_ACCESS_TOKEN"));

        let mut env = base_env();
        env.insert("SHOPIFY_APP_URL", "not a url".into());
        assert!(matches!(load(&env), Err(ConfigError::Invalid { key: "SHOPIFY_APP_URL", .. })));

        let mut env = base_env();
        env.insert("MALDIFY_FREE_PLAN_LIMIT", "lots".into());
        assert!(matches!(load(&env), Err(ConfigError::Invalid { key: "MALDIFY_FREE_PLAN_LIMIT", .. })));

        let mut env = base_env();
        env.insert("MALDIFY_ANALYSIS_DAYS", "0".into());
        assert!(matches!(load(&env), Err(ConfigError::Invalid { key: "MALDIFY_ANALYSIS_DAYS", .. })));
    }
}

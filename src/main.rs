//! Maldify - checkout upsell offers and return-risk analytics for Shopify

use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use maldify::api::{router, AppState};
use maldify::config::AppConfig;
use maldify::domain::services::RuleBasedRecommender;
use maldify::platform::{CommercePlatform, PlatformSubscriptionProvider, ShopifyAdminClient};
use maldify::store::{InMemorySettingsRepository, InMemoryUsageCounter, PgSettingsRepository, PgUsageCounter, SettingsRepository, UsageCounter};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into())).with(tracing_subscriber::fmt::layer()).init();

    let config = AppConfig::from_env()?;

    let (usage, settings): (Arc<dyn UsageCounter>, Arc<dyn SettingsRepository>) = match &config.database_url {
        Some(url) => {
            let db = PgPoolOptions::new().max_connections(10).connect(url).await?;
            sqlx::migrate!("./migrations").run(&db).await?;
            (Arc::new(PgUsageCounter::new(db.clone())), Arc::new(PgSettingsRepository::new(db)))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, usage counts and settings are kept in memory");
            (Arc::new(InMemoryUsageCounter::new()), Arc::new(InMemorySettingsRepository::new()))
        }
    };

    let nats = match &config.nats_url {
        Some(url) => match async_nats::connect(url.as_str()).await {
            Ok(client) => Some(client),
            Err(e) => { tracing::warn!(error = %e, "NATS unavailable, events will not be published"); None }
        },
        None => None,
    };

    let platform: Arc<dyn CommercePlatform> = Arc::new(ShopifyAdminClient::new(&config.shopify, config.analytics.max_order_pages)?);
    let recommender = RuleBasedRecommender::new(config.recommendations.warranty_product_id.clone(), config.recommendations.general_product_id.clone());
    let port = config.port;
    tracing::info!(shop = %platform.shop(), production = config.production, "starting maldify");

    let state = AppState {
        config: Arc::new(config),
        subscriptions: Arc::new(PlatformSubscriptionProvider::new(platform.clone())),
        platform,
        usage,
        settings,
        recommender: Arc::new(recommender),
        nats,
    };

    tracing::info!("Maldify listening on 0.0.0.0:{}", port);
    axum::serve(tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?, router(state)).await?;
    Ok(())
}

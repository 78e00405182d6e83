//! Postgres-backed stores. Schema lives in `migrations/`.

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::PgPool;

use super::{SettingsRepository, StoreError, UsageCounter};
use crate::domain::services::{OfferCatalog, OfferProduct};
use crate::domain::value_objects::{ProductId, UsagePeriod};

#[derive(Clone)]
pub struct PgUsageCounter { pool: PgPool }

impl PgUsageCounter {
    pub fn new(pool: PgPool) -> Self { Self { pool } }
}

#[async_trait]
impl UsageCounter for PgUsageCounter {
    async fn current(&self, shop: &str, period: &UsagePeriod) -> Result<u32, StoreError> {
        let count: Option<(i32,)> = sqlx::query_as("SELECT offers_served FROM usage_counters WHERE shop = $1 AND period = $2")
            .bind(shop).bind(period.as_str()).fetch_optional(&self.pool).await?;
        to_count(count.map_or(0, |c| c.0))
    }

    async fn try_increment(&self, shop: &str, period: &UsagePeriod, limit: u32) -> Result<Option<u32>, StoreError> {
        // No row comes back when the limit is 0 or the existing count has reached it.
        let count: Option<(i32,)> = sqlx::query_as("INSERT INTO usage_counters (shop, period, offers_served, updated_at) SELECT $1, $2, 1, NOW() WHERE $3 > 0 ON CONFLICT (shop, period) DO UPDATE SET offers_served = usage_counters.offers_served + 1, updated_at = NOW() WHERE usage_counters.offers_served < $3 RETURNING offers_served")
            .bind(shop).bind(period.as_str()).bind(i32::try_from(limit).unwrap_or(i32::MAX)).fetch_optional(&self.pool).await?;
        count.map(|c| to_count(c.0)).transpose()
    }
}

fn to_count(value: i32) -> Result<u32, StoreError> {
    u32::try_from(value).map_err(|_| StoreError::Corrupt(format!("negative usage count {value}")))
}

#[derive(Debug, sqlx::FromRow)]
struct SettingsRow {
    premium_product_id: String,
    premium_base_price: Decimal,
    complementary_product_id: String,
    complementary_base_price: Decimal,
}

impl TryFrom<SettingsRow> for OfferCatalog {
    type Error = StoreError;

    fn try_from(row: SettingsRow) -> Result<Self, Self::Error> {
        let id = |raw: String| ProductId::new(raw).map_err(|e| StoreError::Corrupt(e.to_string()));
        Ok(OfferCatalog {
            premium: OfferProduct { product_id: id(row.premium_product_id)?, base_price: row.premium_base_price },
            complementary: OfferProduct { product_id: id(row.complementary_product_id)?, base_price: row.complementary_base_price },
        })
    }
}

#[derive(Clone)]
pub struct PgSettingsRepository { pool: PgPool }

impl PgSettingsRepository {
    pub fn new(pool: PgPool) -> Self { Self { pool } }
}

#[async_trait]
impl SettingsRepository for PgSettingsRepository {
    async fn load(&self, shop: &str) -> Result<Option<OfferCatalog>, StoreError> {
        let row = sqlx::query_as::<_, SettingsRow>("SELECT premium_product_id, premium_base_price, complementary_product_id, complementary_base_price FROM shop_settings WHERE shop = $1")
            .bind(shop).fetch_optional(&self.pool).await?;
        row.map(OfferCatalog::try_from).transpose()
    }

    async fn save(&self, shop: &str, catalog: &OfferCatalog) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO shop_settings (shop, premium_product_id, premium_base_price, complementary_product_id, complementary_base_price, updated_at) VALUES ($1, $2, $3, $4, $5, NOW()) ON CONFLICT (shop) DO UPDATE SET premium_product_id = $2, premium_base_price = $3, complementary_product_id = $4, complementary_base_price = $5, updated_at = NOW()")
            .bind(shop)
            .bind(catalog.premium.product_id.as_str()).bind(catalog.premium.base_price)
            .bind(catalog.complementary.product_id.as_str()).bind(catalog.complementary.base_price)
            .execute(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_conversion() {
        let row = SettingsRow {
            premium_product_id: "gid://shopify/Product/1".into(),
            premium_base_price: Decimal::new(9999, 2),
            complementary_product_id: "2".into(),
            complementary_base_price: Decimal::new(4999, 2),
        };
        let catalog = OfferCatalog::try_from(row).unwrap();
        assert_eq!(catalog.premium.product_id.as_str(), "1");

        let corrupt = SettingsRow { premium_product_id: " ".into(), premium_base_price: Decimal::ONE, complementary_product_id: "2".into(), complementary_base_price: Decimal::ONE };
        assert!(matches!(OfferCatalog::try_from(corrupt), Err(StoreError::Corrupt(_))));
        assert!(matches!(to_count(-1), Err(StoreError::Corrupt(_))));
    }
}

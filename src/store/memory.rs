//! In-process stores for development runs without `DATABASE_URL` and for tests.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::{SettingsRepository, StoreError, UsageCounter};
use crate::domain::services::OfferCatalog;
use crate::domain::value_objects::UsagePeriod;

#[derive(Default)]
pub struct InMemoryUsageCounter {
    counts: RwLock<HashMap<(String, UsagePeriod), u32>>,
}

impl InMemoryUsageCounter {
    pub fn new() -> Self { Self::default() }

    /// Starts `shop` at `count` for `period`.
    pub async fn seed(&self, shop: &str, period: &UsagePeriod, count: u32) {
        self.counts.write().await.insert((shop.to_string(), period.clone()), count);
    }
}

#[async_trait]
impl UsageCounter for InMemoryUsageCounter {
    async fn current(&self, shop: &str, period: &UsagePeriod) -> Result<u32, StoreError> {
        Ok(self.counts.read().await.get(&(shop.to_string(), period.clone())).copied().unwrap_or(0))
    }

    async fn try_increment(&self, shop: &str, period: &UsagePeriod, limit: u32) -> Result<Option<u32>, StoreError> {
        let mut counts = self.counts.write().await;
        let count = counts.entry((shop.to_string(), period.clone())).or_insert(0);
        if *count >= limit { return Ok(None); }
        *count += 1;
        Ok(Some(*count))
    }
}

#[derive(Default)]
pub struct InMemorySettingsRepository {
    catalogs: RwLock<HashMap<String, OfferCatalog>>,
}

impl InMemorySettingsRepository {
    pub fn new() -> Self { Self::default() }
}

#[async_trait]
impl SettingsRepository for InMemorySettingsRepository {
    async fn load(&self, shop: &str) -> Result<Option<OfferCatalog>, StoreError> {
        Ok(self.catalogs.read().await.get(shop).cloned())
    }

    async fn save(&self, shop: &str, catalog: &OfferCatalog) -> Result<(), StoreError> {
        self.catalogs.write().await.insert(shop.to_string(), catalog.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::services::OfferProduct;
    use crate::ProductId;
    use rust_decimal::Decimal;

    #[tokio::test]
    async fn test_usage_counts_per_shop_and_month() {
        let counter = InMemoryUsageCounter::new();
        let march = UsagePeriod::for_instant("2024-03-15T00:00:00Z".parse().unwrap());
        let april = UsagePeriod::for_instant("2024-04-01T00:00:00Z".parse().unwrap());

        assert_eq!(counter.current("a.myshopify.com", &march).await.unwrap(), 0);
        assert_eq!(counter.try_increment("a.myshopify.com", &march, 50).await.unwrap(), Some(1));
        assert_eq!(counter.try_increment("a.myshopify.com", &march, 50).await.unwrap(), Some(2));
        assert_eq!(counter.current("a.myshopify.com", &march).await.unwrap(), 2);
        assert_eq!(counter.current("a.myshopify.com", &april).await.unwrap(), 0);
        assert_eq!(counter.current("b.myshopify.com", &march).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_increment_stops_at_limit() {
        let counter = InMemoryUsageCounter::new();
        let period = UsagePeriod::for_instant("2024-03-15T00:00:00Z".parse().unwrap());
        counter.seed("a.myshopify.com", &period, 1).await;
        assert_eq!(counter.try_increment("a.myshopify.com", &period, 2).await.unwrap(), Some(2));
        assert_eq!(counter.try_increment("a.myshopify.com", &period, 2).await.unwrap(), None);
        assert_eq!(counter.try_increment("a.myshopify.com", &period, 0).await.unwrap(), None);
        assert_eq!(counter.current("a.myshopify.com", &period).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_increments_never_pass_limit() {
        let counter = std::sync::Arc::new(InMemoryUsageCounter::new());
        let period = UsagePeriod::for_instant("2024-03-15T00:00:00Z".parse().unwrap());
        let tasks: Vec<_> = (0..20)
            .map(|_| {
                let (counter, period) = (counter.clone(), period.clone());
                tokio::spawn(async move { counter.try_increment("a.myshopify.com", &period, 5).await.unwrap() })
            })
            .collect();
        let mut granted = 0;
        for task in tasks {
            if task.await.unwrap().is_some() { granted += 1; }
        }
        assert_eq!(granted, 5);
        assert_eq!(counter.current("a.myshopify.com", &period).await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_settings_round_trip() {
        let repo = InMemorySettingsRepository::new();
        assert!(repo.load("a.myshopify.com").await.unwrap().is_none());
        let catalog = OfferCatalog {
            premium: OfferProduct { product_id: ProductId::new("1").unwrap(), base_price: Decimal::new(10, 0) },
            complementary: OfferProduct { product_id: ProductId::new("2").unwrap(), base_price: Decimal::new(5, 0) },
        };
        repo.save("a.myshopify.com", &catalog).await.unwrap();
        assert_eq!(repo.load("a.myshopify.com").await.unwrap(), Some(catalog));
    }
}

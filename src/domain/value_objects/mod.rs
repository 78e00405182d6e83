//! Value Objects for upsell and analytics

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use crate::MaldifyError;

/// Product identifier value object.
///
/// Shopify hands out global ids (`gid://shopify/Product/123`) from GraphQL and
/// bare numeric ids elsewhere; both normalise to the trailing `123`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ProductId(String);

impl ProductId {
    pub fn new(value: impl Into<String>) -> Result<Self, ProductIdError> {
        let value = value.into();
        let value = value.trim();
        if value.is_empty() { return Err(ProductIdError::Empty); }
        let value = match value.strip_prefix("gid://") {
            Some(rest) => {
                let tail = rest.rsplit('/').next().unwrap_or_default();
                let tail = tail.split('?').next().unwrap_or_default();
                if tail.is_empty() || !rest.contains('/') { return Err(ProductIdError::Malformed(value.to_string())); }
                tail
            }
            None => value,
        };
        if value.len() > 255 { return Err(ProductIdError::TooLong); }
        Ok(Self(value.to_string()))
    }
    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

impl std::str::FromStr for ProductId {
    type Err = ProductIdError;
    fn from_str(s: &str) -> Result<Self, Self::Err> { Self::new(s) }
}

impl<'de> Deserialize<'de> for ProductId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw { Text(String), Number(u64) }

        let value = match Raw::deserialize(deserializer)? {
            Raw::Text(text) => text,
            Raw::Number(number) => number.to_string(),
        };
        ProductId::new(value).map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum ProductIdError { Empty, TooLong, Malformed(String) }
impl std::error::Error for ProductIdError {}
impl fmt::Display for ProductIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "product id empty"),
            Self::TooLong => write!(f, "product id too long"),
            Self::Malformed(raw) => write!(f, "malformed global id `{raw}`"),
        }
    }
}

/// Rounds money, rates and scores to cents, half away from zero.
pub fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Percentage of `part` in `whole`, zero when `whole` is zero. Saturates at
/// the `Decimal` bounds instead of overflowing.
pub fn percentage(part: Decimal, whole: Decimal) -> Decimal {
    if whole.is_zero() { return Decimal::ZERO; }
    match part.checked_div(whole) {
        Some(ratio) => ratio.saturating_mul(Decimal::ONE_HUNDRED),
        None if part.is_sign_negative() != whole.is_sign_negative() => Decimal::MIN,
        None => Decimal::MAX,
    }
}

/// Window of order history an analytics report covers, ending now.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnalysisPeriod { start: DateTime<Utc>, end: DateTime<Utc>, days: u32 }

impl AnalysisPeriod {
    pub const MAX_DAYS: u32 = 365;

    pub fn ending_at(end: DateTime<Utc>, days: u32) -> Result<Self, MaldifyError> {
        if days == 0 || days > Self::MAX_DAYS {
            return Err(MaldifyError::InvalidPeriod { days, max: Self::MAX_DAYS });
        }
        Ok(Self { start: end - Duration::days(i64::from(days)), end, days })
    }

    pub fn last_days(days: u32) -> Result<Self, MaldifyError> { Self::ending_at(Utc::now(), days) }
    pub fn start(&self) -> DateTime<Utc> { self.start }
    pub fn end(&self) -> DateTime<Utc> { self.end }
    pub fn days(&self) -> u32 { self.days }

    pub fn summary(&self) -> PeriodSummary {
        PeriodSummary { start_date: self.start.date_naive(), end_date: self.end.date_naive(), days: self.days }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PeriodSummary { pub start_date: NaiveDate, pub end_date: NaiveDate, pub days: u32 }

/// Calendar month (UTC) that free-plan usage is counted against, `YYYY-MM`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct UsagePeriod(String);

impl UsagePeriod {
    pub fn for_instant(at: DateTime<Utc>) -> Self { Self(at.format("%Y-%m").to_string()) }
    pub fn current() -> Self { Self::for_instant(Utc::now()) }
    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for UsagePeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_product_id_normalises_global_ids() {
        let id = ProductId::new("gid://shopify/Product/111222333").unwrap();
        assert_eq!(id.as_str(), "111222333");
        assert_eq!(id, ProductId::new(" 111222333 ").unwrap());
    }

    #[test]
    fn test_product_id_rejects_empty_and_malformed() {
        assert_eq!(ProductId::new("   "), Err(ProductIdError::Empty));
        assert!(matches!(ProductId::new("gid://shopify/Product/"), Err(ProductIdError::Malformed(_))));
    }

    #[test]
    fn test_product_id_deserializes_from_number_or_string() {
        let ids: Vec<ProductId> = serde_json::from_str(r#"[1, "gid://shopify/Product/2", "3"]"#).unwrap();
        let ids: Vec<&str> = ids.iter().map(ProductId::as_str).collect();
        assert_eq!(ids, ["1", "2", "3"]);
    }

    #[test]
    fn test_round2_rounds_half_away_from_zero() {
        assert_eq!(round2(Decimal::new(49995, 3)), Decimal::new(5000, 2));
        assert_eq!(round2(Decimal::new(12345, 3)), Decimal::new(1235, 2));
        assert_eq!(percentage(Decimal::ONE, Decimal::ZERO), Decimal::ZERO);
    }

    #[test]
    fn test_percentage_saturates() {
        assert_eq!(percentage(Decimal::new(2, 0), Decimal::new(10, 0)), Decimal::new(20, 0));
        assert_eq!(percentage(Decimal::MAX, Decimal::new(1, 28)), Decimal::MAX);
        assert_eq!(percentage(Decimal::MIN, Decimal::new(1, 28)), Decimal::MIN);
        assert_eq!(percentage(Decimal::MAX, Decimal::ONE), Decimal::MAX);
    }

    #[test]
    fn test_analysis_period_bounds() {
        let end = Utc.with_ymd_and_hms(2024, 3, 31, 12, 0, 0).unwrap();
        let period = AnalysisPeriod::ending_at(end, 30).unwrap();
        assert_eq!(period.summary().start_date, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        assert_eq!(period.summary().days, 30);
        assert!(AnalysisPeriod::ending_at(end, 0).is_err());
        assert!(AnalysisPeriod::ending_at(end, 366).is_err());
    }

    #[test]
    fn test_usage_period_is_calendar_month() {
        let at = Utc.with_ymd_and_hms(2024, 2, 29, 23, 59, 59).unwrap();
        assert_eq!(UsagePeriod::for_instant(at).as_str(), "2024-02");
    }
}

//! Merchant analytics: return risk and upsell ROI

use axum::{extract::{Query, State}, Json};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{ApiError, AppState};
use crate::domain::events::DomainEvent;
use crate::domain::services::{compute_risk, compute_roi, RiskRecord, RiskSummary, RoiReport};
use crate::domain::value_objects::{AnalysisPeriod, PeriodSummary};

#[derive(Debug, Default, Deserialize)]
pub struct PeriodParams {
    pub days: Option<u32>,
}

impl PeriodParams {
    fn period(&self, state: &AppState) -> Result<AnalysisPeriod, ApiError> {
        Ok(AnalysisPeriod::last_days(self.days.unwrap_or(state.config.analytics.default_period_days))?)
    }
}

#[derive(Debug, Serialize)]
pub struct ChurnRiskReport {
    pub analysis_period: PeriodSummary,
    pub summary: RiskSummary,
    pub top_risky_products: Vec<RiskRecord>,
}

pub async fn churn_risk(State(state): State<AppState>, Query(params): Query<PeriodParams>) -> Result<Json<ChurnRiskReport>, ApiError> {
    let period = params.period(&state)?;
    let shop = state.shop().to_string();
    let history = state.platform.fetch_order_history(&period).await?;
    let analysis = compute_risk(&history.orders, &history.refunds, state.config.analytics.orders_count);

    for skipped in &analysis.skipped {
        warn!(shop = %shop, error = %skipped, "skipped malformed line item");
    }
    info!(
        shop = %shop,
        days = period.days(),
        orders = history.orders.len(),
        refunds = history.refunds.len(),
        products = analysis.summary.total_products_analyzed,
        high_risk = analysis.summary.high_risk_products,
        "risk report generated"
    );
    state
        .publish(DomainEvent::RiskReportGenerated {
            shop,
            days: period.days(),
            products_analyzed: analysis.summary.total_products_analyzed,
            high_risk_products: analysis.summary.high_risk_products,
            skipped_lines: analysis.skipped.len(),
        })
        .await;

    Ok(Json(ChurnRiskReport { analysis_period: period.summary(), summary: analysis.summary, top_risky_products: analysis.top_records }))
}

pub async fn roi(State(state): State<AppState>, Query(params): Query<PeriodParams>) -> Result<Json<RoiReport>, ApiError> {
    let period = params.period(&state)?;
    let (history, subscription) = tokio::try_join!(state.platform.fetch_order_history(&period), state.subscriptions.status())?;
    let (catalog, _) = state.offer_catalog().await?;

    let cost = if subscription.is_pro_plan { state.config.billing.plan_price } else { Decimal::ZERO };
    let report = compute_roi(&history.orders, &catalog, cost, period.days());
    info!(shop = %state.shop(), days = period.days(), revenue = %report.revenue, order_count = report.order_count, "roi report generated");
    Ok(Json(report))
}

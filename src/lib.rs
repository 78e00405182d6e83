//! Maldify Upsell
//!
//! Checkout and post-purchase upsell backend for Shopify merchants.
//!
//! ## Features
//! - Cart-size driven upsell offers
//! - Rule-based product recommendations
//! - Return/refund risk report per product
//! - Upsell ROI report
//! - Free/Pro plan gating backed by recurring application charges

pub mod api;
pub mod config;
pub mod domain;
pub mod platform;
pub mod store;

use thiserror::Error;

pub use domain::value_objects::{ProductId, ProductIdError};

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MaldifyError {
    /// A record fetched from the commerce platform is missing a required
    /// field or carries an impossible value.
    #[error("Invalid {record}: {reason}")]
    InvalidInput { record: String, reason: String },

    #[error("Invalid product id: {0}")]
    InvalidProductId(#[from] ProductIdError),

    #[error("Analysis period must be between 1 and {max} days, got {days}")]
    InvalidPeriod { days: u32, max: u32 },
}

impl MaldifyError {
    pub fn invalid_input(record: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidInput { record: record.into(), reason: reason.into() }
    }
}

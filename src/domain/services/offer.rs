//! Cart-size driven upsell offer

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{round2, ProductId};

/// Carts with more units than this get the discounted premium product.
pub const PREMIUM_CART_THRESHOLD: u32 = 2;
pub const PREMIUM_DISCOUNT_PERCENT: u8 = 50;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferProduct {
    pub product_id: ProductId,
    #[serde(with = "rust_decimal::serde::float")]
    pub base_price: Decimal,
}

/// The merchant's product mapping: which product is offered for large carts
/// and which for small ones.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferCatalog {
    pub premium: OfferProduct,
    pub complementary: OfferProduct,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CartOffer {
    pub offer_product_id: ProductId,
    #[serde(with = "rust_decimal::serde::float")]
    pub offer_price: Decimal,
    pub discount_percent: Option<u8>,
}

impl OfferCatalog {
    pub fn select_offer(&self, cart_item_count: u32) -> CartOffer {
        if cart_item_count > PREMIUM_CART_THRESHOLD {
            let factor = Decimal::from(100 - PREMIUM_DISCOUNT_PERCENT) / Decimal::ONE_HUNDRED;
            CartOffer {
                offer_product_id: self.premium.product_id.clone(),
                offer_price: round2(self.premium.base_price * factor),
                discount_percent: Some(PREMIUM_DISCOUNT_PERCENT),
            }
        } else {
            CartOffer {
                offer_product_id: self.complementary.product_id.clone(),
                offer_price: self.complementary.base_price,
                discount_percent: None,
            }
        }
    }

    /// Products whose sales count as upsell revenue.
    pub fn offer_product_ids(&self) -> [&ProductId; 2] { [&self.premium.product_id, &self.complementary.product_id] }
}

//! Checkout product recommendations
//!
//! The current engine is a static rule table keyed by the product already in
//! the cart. Callers only see the [`Recommender`] trait so a trained model
//! can replace the table without touching the request layer.

use serde::Serialize;

use crate::domain::value_objects::ProductId;

pub const WARRANTY_CATEGORY: &str = "warranty";
pub const WARRANTY_CONFIDENCE: f64 = 0.75;
pub const GENERAL_CATEGORY: &str = "general";
pub const GENERAL_CONFIDENCE: f64 = 0.60;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Recommendation {
    pub product_id: ProductId,
    pub message: String,
    pub confidence: f64,
    pub category: String,
    pub original_product_id: Option<ProductId>,
}

pub trait Recommender: Send + Sync {
    /// One recommendation per input id, in input order. An empty input yields
    /// a single general suggestion.
    fn recommend(&self, product_ids: &[ProductId]) -> Vec<Recommendation>;

    fn name(&self) -> &'static str;
}

#[derive(Debug, Clone, Copy)]
struct RecommendationRule {
    source: &'static str,
    target: &'static str,
    message: &'static str,
    category: &'static str,
    confidence: f64,
}

const RULES: &[RecommendationRule] = &[
    RecommendationRule {
        source: "111222333",
        target: "141516171",
        message: "Take your sound anywhere: add the Bluetooth Speaker to your headphones.",
        category: "audio",
        confidence: 0.85,
    },
    RecommendationRule {
        source: "444555666",
        target: "777888999",
        message: "Protect the screen as well as the case with a matching Screen Protector.",
        category: "accessories",
        confidence: 0.92,
    },
    RecommendationRule {
        source: "777888999",
        target: "101112131",
        message: "Customers who buy a Screen Protector often add a spare Charging Cable.",
        category: "accessories",
        confidence: 0.80,
    },
    RecommendationRule {
        source: "101112131",
        target: "444555666",
        message: "Complete your setup with a Phone Case.",
        category: "accessories",
        confidence: 0.78,
    },
    RecommendationRule {
        source: "141516171",
        target: "111222333",
        message: "Pair your speaker with Premium Wireless Headphones for listening on the go.",
        category: "audio",
        confidence: 0.82,
    },
    RecommendationRule {
        source: "181920212",
        target: "101112131",
        message: "Keep your desk tidy: a long Charging Cable reaches from the Laptop Stand.",
        category: "workspace",
        confidence: 0.76,
    },
];

#[derive(Clone, Debug)]
pub struct RuleBasedRecommender {
    warranty_product_id: ProductId,
    general_product_id: ProductId,
}

impl RuleBasedRecommender {
    pub fn new(warranty_product_id: ProductId, general_product_id: ProductId) -> Self {
        Self { warranty_product_id, general_product_id }
    }

    fn lookup(&self, product_id: &ProductId) -> Recommendation {
        let rule = RULES.iter().find(|r| r.source == product_id.as_str());
        match rule.and_then(|r| ProductId::new(r.target).ok().map(|target| (r, target))) {
            Some((rule, target)) => Recommendation {
                product_id: target,
                message: rule.message.to_string(),
                confidence: rule.confidence,
                category: rule.category.to_string(),
                original_product_id: Some(product_id.clone()),
            },
            None => Recommendation {
                product_id: self.warranty_product_id.clone(),
                message: "Protect your purchase with an extended warranty.".to_string(),
                confidence: WARRANTY_CONFIDENCE,
                category: WARRANTY_CATEGORY.to_string(),
                original_product_id: Some(product_id.clone()),
            },
        }
    }

    fn general(&self) -> Recommendation {
        Recommendation {
            product_id: self.general_product_id.clone(),
            message: "Discover our best sellers before you check out.".to_string(),
            confidence: GENERAL_CONFIDENCE,
            category: GENERAL_CATEGORY.to_string(),
            original_product_id: None,
        }
    }
}

impl Recommender for RuleBasedRecommender {
    fn recommend(&self, product_ids: &[ProductId]) -> Vec<Recommendation> {
        if product_ids.is_empty() { return vec![self.general()]; }
        product_ids.iter().map(|id| self.lookup(id)).collect()
    }

    fn name(&self) -> &'static str { "rule_based" }
}

//! Pure decision services. None of these touch the network or storage;
//! handlers fetch the inputs and pass them in.

pub mod offer;
pub mod plan;
pub mod recommendation;
pub mod risk;
pub mod roi;

pub use offer::{CartOffer, OfferCatalog, OfferProduct};
pub use plan::{evaluate_usage, Plan, SubscriptionStatus, UsageDecision};
pub use recommendation::{Recommendation, Recommender, RuleBasedRecommender};
pub use risk::{compute_risk, RiskAnalysis, RiskLevel, RiskRecord, RiskSummary};
pub use roi::{compute_roi, RoiReport};

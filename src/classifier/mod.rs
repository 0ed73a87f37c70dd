//! Land-Use Classifier
//!
//! Maps parcel evidence to an agricultural probability and a PASS / REVIEW /
//! FAIL decision. Two interchangeable `ScoringStrategy` implementations sit
//! behind one `classify` call:
//! - `TreeEnsembleModel` - learned model, used when an artifact loaded
//! - `FallbackFormula` - deterministic weighted formula, always available
//!
//! Decision thresholds are fixed and independent of the strategy:
//! `p > 0.7` → PASS, `0.4 ≤ p ≤ 0.7` → REVIEW, `p < 0.4` → FAIL.

pub mod fallback;
pub mod tree_model;

pub use fallback::FallbackFormula;
pub use tree_model::TreeEnsembleModel;

use crate::error::Result;
use crate::features::LandUseEvidence;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

pub const PASS_THRESHOLD: f64 = 0.7;
pub const REVIEW_THRESHOLD: f64 = 0.4;

/// Land-use verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Decision {
    Pass,
    Review,
    Fail,
}

impl Decision {
    /// Pure function of the probability
    pub fn from_probability(p: f64) -> Self {
        if p > PASS_THRESHOLD {
            Decision::Pass
        } else if p >= REVIEW_THRESHOLD {
            Decision::Review
        } else {
            Decision::Fail
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Pass => "PASS",
            Decision::Review => "REVIEW",
            Decision::Fail => "FAIL",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub agricultural_probability: f64,
    pub decision: Decision,
    pub using_learned_model: bool,
    /// Feature name → weight, summing to 1.0
    pub feature_importance: BTreeMap<String, f64>,
}

/// One way of turning evidence into an agricultural probability
pub trait ScoringStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn is_learned(&self) -> bool;

    /// Probability in [0, 1]
    fn probability(&self, evidence: &LandUseEvidence) -> Result<f64>;

    /// Static attribution table (not per request)
    fn importance(&self) -> BTreeMap<String, f64>;
}

/// Classifier holding an optional learned model and the fallback formula
pub struct LandUseClassifier {
    model: Option<Box<dyn ScoringStrategy>>,
    fallback: FallbackFormula,
}

impl LandUseClassifier {
    /// Fallback formula only
    pub fn fallback_only() -> Self {
        Self {
            model: None,
            fallback: FallbackFormula,
        }
    }

    pub fn with_model(model: Box<dyn ScoringStrategy>) -> Self {
        Self {
            model: Some(model),
            fallback: FallbackFormula,
        }
    }

    /// Load the learned model if configured; any failure degrades to the fallback
    pub fn load(model_path: Option<&Path>) -> Self {
        let Some(path) = model_path else {
            tracing::info!("No land-use model configured - using weighted fallback");
            return Self::fallback_only();
        };

        match TreeEnsembleModel::load(path) {
            Ok(model) => Self::with_model(Box::new(model)),
            Err(e) => {
                tracing::warn!("{} - using weighted fallback", e);
                Self::fallback_only()
            }
        }
    }

    pub fn has_learned_model(&self) -> bool {
        self.model.is_some()
    }

    fn run(strategy: &dyn ScoringStrategy, p: f64) -> ClassificationResult {
        let p = p.clamp(0.0, 1.0);
        ClassificationResult {
            agricultural_probability: p,
            decision: Decision::from_probability(p),
            using_learned_model: strategy.is_learned(),
            feature_importance: strategy.importance(),
        }
    }

    pub fn classify(&self, evidence: &LandUseEvidence) -> ClassificationResult {
        if let Some(model) = self.model.as_deref() {
            match model.probability(evidence) {
                Ok(p) => {
                    let result = Self::run(model, p);
                    tracing::info!(
                        "Classification ({}): prob={:.4} decision={}",
                        model.name(),
                        result.agricultural_probability,
                        result.decision.as_str()
                    );
                    return result;
                }
                Err(e) => {
                    tracing::warn!("{} prediction failed: {} - using fallback", model.name(), e);
                }
            }
        }

        // The fallback formula cannot fail
        let p = self.fallback.fused(evidence);
        let result = Self::run(&self.fallback, p);
        tracing::info!(
            "Classification ({}): prob={:.4} decision={}",
            self.fallback.name(),
            result.agricultural_probability,
            result.decision.as_str()
        );
        result
    }
}

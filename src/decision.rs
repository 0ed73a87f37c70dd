//! Decision Orchestrator
//!
//! Blends the land-use probability with yield feasibility into one reported
//! confidence. The decision label always comes from the classifier alone.

use crate::classifier::{ClassificationResult, Decision};
use crate::error::ValidationError;
use crate::yield_estimate::YieldEstimate;
use serde::{Deserialize, Serialize};

/// Blend weights for `overall_confidence`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceWeights {
    pub land_use: f64,
    pub yield_feasibility: f64,
}

impl Default for ConfidenceWeights {
    fn default() -> Self {
        Self {
            land_use: 0.8,
            yield_feasibility: 0.2,
        }
    }
}

impl ConfidenceWeights {
    pub fn new(land_use: f64, yield_feasibility: f64) -> Result<Self, ValidationError> {
        if land_use < 0.0 || yield_feasibility < 0.0 || (land_use + yield_feasibility - 1.0).abs() > 1e-6 {
            return Err(ValidationError::Config(format!(
                "confidence weights must be non-negative and sum to 1.0 (got {} + {})",
                land_use, yield_feasibility
            )));
        }
        Ok(Self {
            land_use,
            yield_feasibility,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FinalDecision {
    pub decision: Decision,
    pub overall_confidence: f64,
}

pub struct DecisionOrchestrator {
    weights: ConfidenceWeights,
}

impl DecisionOrchestrator {
    pub fn new(weights: ConfidenceWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> ConfidenceWeights {
        self.weights
    }

    pub fn combine(
        &self,
        classification: &ClassificationResult,
        yield_estimate: Option<&YieldEstimate>,
    ) -> FinalDecision {
        let p = classification.agricultural_probability;
        let overall_confidence = match yield_estimate {
            Some(y) => self.weights.land_use * p + self.weights.yield_feasibility * y.feasibility_score,
            None => p,
        };

        FinalDecision {
            decision: classification.decision,
            overall_confidence: overall_confidence.clamp(0.0, 1.0),
        }
    }
}

impl Default for DecisionOrchestrator {
    fn default() -> Self {
        Self::new(ConfidenceWeights::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::yield_estimate::ConfidenceLabel;
    use approx::assert_relative_eq;
    use std::collections::BTreeMap;

    fn classification(p: f64) -> ClassificationResult {
        ClassificationResult {
            agricultural_probability: p,
            decision: Decision::from_probability(p),
            using_learned_model: false,
            feature_importance: BTreeMap::new(),
        }
    }

    fn estimate(feasibility: f64) -> YieldEstimate {
        YieldEstimate {
            crop: "Rice".to_string(),
            baseline_yield: 2.96,
            estimated_yield_per_area: 2.96 * feasibility,
            total_estimated_yield: 29.6 * feasibility,
            feasibility_score: feasibility,
            confidence_label: ConfidenceLabel::from_score(feasibility),
        }
    }

    #[test]
    fn test_no_claim_passes_through() {
        let result = DecisionOrchestrator::default().combine(&classification(0.62), None);
        assert_eq!(result.decision, Decision::Review);
        assert_eq!(result.overall_confidence, 0.62);
    }

    #[test]
    fn test_claim_blends_confidence() {
        let result = DecisionOrchestrator::default().combine(&classification(0.9), Some(&estimate(0.3)));
        assert_relative_eq!(result.overall_confidence, 0.8 * 0.9 + 0.2 * 0.3, epsilon = 1e-12);
    }

    #[test]
    fn test_claim_never_changes_label() {
        // Blended confidence drops below 0.7 but the label stays PASS
        let result = DecisionOrchestrator::default().combine(&classification(0.75), Some(&estimate(0.0)));
        assert!(result.overall_confidence < 0.7);
        assert_eq!(result.decision, Decision::Pass);
    }

    #[test]
    fn test_configurable_weights() {
        let orchestrator = DecisionOrchestrator::new(ConfidenceWeights::new(0.6, 0.4).unwrap());
        let result = orchestrator.combine(&classification(0.5), Some(&estimate(1.0)));
        assert_relative_eq!(result.overall_confidence, 0.7, epsilon = 1e-12);
    }

    #[test]
    fn test_invalid_weights() {
        assert!(ConfidenceWeights::new(0.8, 0.3).is_err());
        assert!(ConfidenceWeights::new(-0.2, 1.2).is_err());
    }
}

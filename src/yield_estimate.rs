//! Yield Estimation
//!
//! `estimated_yield_per_area = baseline_yield × suitability.overall`
//! `total_estimated_yield    = estimated_yield_per_area × area_ha`

use crate::catalog::CropProfile;
use crate::suitability::SuitabilityScore;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConfidenceLabel {
    High,
    Moderate,
    Low,
}

impl ConfidenceLabel {
    /// ≥ 0.75 HIGH, [0.50, 0.75) MODERATE, < 0.50 LOW
    pub fn from_score(score: f64) -> Self {
        if score >= 0.75 {
            ConfidenceLabel::High
        } else if score >= 0.50 {
            ConfidenceLabel::Moderate
        } else {
            ConfidenceLabel::Low
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YieldEstimate {
    pub crop: String,

    /// Tonnes per hectare under ideal conditions
    pub baseline_yield: f64,

    /// Tonnes per hectare after suitability scaling
    pub estimated_yield_per_area: f64,

    /// Tonnes over the whole parcel
    pub total_estimated_yield: f64,

    /// Suitability overall score in [0, 1]
    pub feasibility_score: f64,

    pub confidence_label: ConfidenceLabel,
}

pub struct YieldEstimator;

impl YieldEstimator {
    pub fn estimate(profile: &CropProfile, suitability: &SuitabilityScore, area_ha: f64) -> YieldEstimate {
        let feasibility = suitability.overall.clamp(0.0, 1.0);
        let per_area = profile.baseline_yield * feasibility;
        // Negative or non-finite areas would only produce nonsense totals
        let area = if area_ha.is_finite() { area_ha.max(0.0) } else { 0.0 };

        YieldEstimate {
            crop: profile.name.clone(),
            baseline_yield: profile.baseline_yield,
            estimated_yield_per_area: per_area,
            total_estimated_yield: per_area * area,
            feasibility_score: feasibility,
            confidence_label: ConfidenceLabel::from_score(feasibility),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CropCatalog;
    use approx::assert_relative_eq;

    fn suitability(overall: f64) -> SuitabilityScore {
        SuitabilityScore {
            crop: "Rice".to_string(),
            temperature: 1.0,
            rainfall: 1.0,
            humidity: 1.0,
            soil: 1.0,
            vegetation: 1.0,
            overall,
            is_unsuitable: overall < 0.4,
            has_critical_failure: false,
            reasons: Vec::new(),
        }
    }

    #[test]
    fn test_estimate_scales_baseline_and_area() {
        let catalog = CropCatalog::builtin();
        let rice = catalog.get("Rice").unwrap();
        let estimate = YieldEstimator::estimate(rice, &suitability(0.8), 10.0);

        assert_relative_eq!(estimate.estimated_yield_per_area, rice.baseline_yield * 0.8);
        assert_relative_eq!(estimate.total_estimated_yield, rice.baseline_yield * 8.0, epsilon = 1e-9);
        assert_eq!(estimate.confidence_label, ConfidenceLabel::High);
    }

    #[test]
    fn test_label_boundaries() {
        assert_eq!(ConfidenceLabel::from_score(0.75), ConfidenceLabel::High);
        assert_eq!(ConfidenceLabel::from_score(0.7499), ConfidenceLabel::Moderate);
        assert_eq!(ConfidenceLabel::from_score(0.50), ConfidenceLabel::Moderate);
        assert_eq!(ConfidenceLabel::from_score(0.4999), ConfidenceLabel::Low);
    }

    #[test]
    fn test_negative_area_yields_zero_total() {
        let catalog = CropCatalog::builtin();
        let estimate = YieldEstimator::estimate(catalog.get("Banana").unwrap(), &suitability(0.6), -3.0);
        assert_eq!(estimate.total_estimated_yield, 0.0);
        assert_eq!(estimate.confidence_label, ConfidenceLabel::Moderate);
    }

    #[test]
    fn test_label_serializes_uppercase() {
        assert_eq!(serde_json::to_string(&ConfidenceLabel::Moderate).unwrap(), "\"MODERATE\"");
    }
}

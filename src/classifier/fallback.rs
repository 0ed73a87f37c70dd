//! Deterministic weighted fallback formula
//!
//! ```text
//! optical = 0.7 × cultivated_fraction + 0.3 × max(0, vegetation_mean)
//! radar   = 0.6 × ratio_score(cross/co ratio) + 0.4 × intensity_score(cross-pol dB)
//! fused   = 0.7 × optical + 0.3 × radar
//! ```
//!
//! Both radar sub-scores are Gaussian bumps equal to 1.0 at the cropland
//! signature (ratio 0.5, -12 dB) and decaying toward 0.0 away from it.
//! Zeroed radar inputs therefore contribute almost nothing rather than a
//! spurious mid-range score.

use super::ScoringStrategy;
use crate::error::Result;
use crate::features::LandUseEvidence;
use std::collections::BTreeMap;

pub const OPTICAL_WEIGHT: f64 = 0.7;
pub const RADAR_WEIGHT: f64 = 0.3;
pub const CULTIVATED_WEIGHT: f64 = 0.7;
pub const VEGETATION_WEIGHT: f64 = 0.3;

pub const RATIO_PEAK: f64 = 0.5;
pub const RATIO_WIDTH: f64 = 0.25;
pub const INTENSITY_PEAK_DB: f64 = -12.0;
pub const INTENSITY_WIDTH_DB: f64 = 6.0;

fn bump(value: f64, peak: f64, width: f64) -> f64 {
    let z = (value - peak) / width;
    (-z * z).exp()
}

/// Cross-to-co-polarization ratio score, peaking at 0.5
pub fn ratio_score(ratio: f64) -> f64 {
    bump(ratio, RATIO_PEAK, RATIO_WIDTH)
}

/// Cross-polarized intensity score, peaking at -12 dB
pub fn intensity_score(cross_pol_db: f64) -> f64 {
    bump(cross_pol_db, INTENSITY_PEAK_DB, INTENSITY_WIDTH_DB)
}

pub fn radar_crop_score(ratio: f64, cross_pol_db: f64) -> f64 {
    0.6 * ratio_score(ratio) + 0.4 * intensity_score(cross_pol_db)
}

pub fn optical_score(cultivated_fraction: f64, vegetation_mean: f64) -> f64 {
    CULTIVATED_WEIGHT * cultivated_fraction + VEGETATION_WEIGHT * vegetation_mean.max(0.0)
}

/// Explainable rule-based land-use score
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackFormula;

impl FallbackFormula {
    /// Unclamped fused score
    pub fn fused(&self, evidence: &LandUseEvidence) -> f64 {
        let f = &evidence.features;
        let optical = optical_score(evidence.cultivated_fraction, f.vegetation_mean);
        let radar = radar_crop_score(f.radar_cross_to_co_pol_ratio, f.radar_cross_pol_db);
        OPTICAL_WEIGHT * optical + RADAR_WEIGHT * radar
    }
}

impl ScoringStrategy for FallbackFormula {
    fn name(&self) -> &'static str {
        "weighted_fallback"
    }

    fn is_learned(&self) -> bool {
        false
    }

    fn probability(&self, evidence: &LandUseEvidence) -> Result<f64> {
        Ok(self.fused(evidence).clamp(0.0, 1.0))
    }

    /// 49% cultivated fraction, 21% vegetation, 30% radar
    fn importance(&self) -> BTreeMap<String, f64> {
        BTreeMap::from([
            ("cultivated_fraction".to_string(), OPTICAL_WEIGHT * CULTIVATED_WEIGHT),
            ("vegetation_mean".to_string(), OPTICAL_WEIGHT * VEGETATION_WEIGHT),
            ("radar_crop_score".to_string(), RADAR_WEIGHT),
        ])
    }
}

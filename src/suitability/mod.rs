//! Crop Suitability Scoring
//!
//! Scores a crop's ideal growing conditions against observed weather and
//! vegetation statistics.
//!
//! ## Architecture
//! - `range.rs` - parameter kinds, range and vegetation scoring
//! - `reasons.rs` - per-kind human-readable reason templates
//! - `mod.rs` - weighted overall score, unsuitability / critical-failure flags
//!
//! ## Scoring
//! ```text
//! overall = 0.25×temperature + 0.25×rainfall + 0.10×humidity
//!         + 0.15×soil + 0.25×vegetation
//! ```
//! `is_unsuitable` (overall < 0.40) and `has_critical_failure` (any parameter
//! ≤ 0.05) are independent flags.

pub mod range;
pub mod reasons;

pub use range::{compare_to_range, range_score, vegetation_score, ParameterKind, RangeFit};
pub use reasons::Reason;

use crate::catalog::CropProfile;
use crate::weather::WeatherSample;
use serde::{Deserialize, Serialize};

pub const UNSUITABLE_THRESHOLD: f64 = 0.40;
pub const CRITICAL_THRESHOLD: f64 = 0.05;
pub const REASON_THRESHOLD: f64 = 0.50;

/// Soil score used when the weather source reported no soil moisture
pub const NEUTRAL_SOIL_SCORE: f64 = 0.5;

/// Suitability of one crop for the observed conditions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuitabilityScore {
    pub crop: String,

    pub temperature: f64,
    pub rainfall: f64,
    pub humidity: f64,
    pub soil: f64,
    pub vegetation: f64,

    pub overall: f64,

    /// overall < 0.40
    pub is_unsuitable: bool,

    /// Any parameter ≤ 0.05
    pub has_critical_failure: bool,

    /// Parameters scoring below 0.50, worst first
    pub reasons: Vec<Reason>,
}

impl SuitabilityScore {
    /// Score of one parameter
    pub fn parameter(&self, kind: ParameterKind) -> f64 {
        match kind {
            ParameterKind::Temperature => self.temperature,
            ParameterKind::Rainfall => self.rainfall,
            ParameterKind::Humidity => self.humidity,
            ParameterKind::SoilMoisture => self.soil,
            ParameterKind::Vegetation => self.vegetation,
        }
    }

    /// Parameters at or below the critical threshold, in fixed order
    pub fn critical_parameters(&self) -> Vec<ParameterKind> {
        ParameterKind::ALL
            .iter()
            .copied()
            .filter(|k| self.parameter(*k) <= CRITICAL_THRESHOLD)
            .collect()
    }

    /// One-line yield warning, if any
    pub fn warning(&self) -> Option<String> {
        if self.is_unsuitable {
            Some(format!(
                "{} is NOT RECOMMENDED for this region: overall suitability only {:.0}%",
                self.crop,
                self.overall * 100.0
            ))
        } else if self.has_critical_failure {
            let labels: Vec<&str> = self
                .critical_parameters()
                .iter()
                .map(|k| k.label())
                .collect();
            Some(format!(
                "{} will have POOR YIELD here: {} critically low",
                self.crop,
                labels.join(", ")
            ))
        } else {
            None
        }
    }
}

/// Multi-parameter crop suitability scorer (stateless)
pub struct CropSuitabilityScorer;

impl CropSuitabilityScorer {
    pub fn score(profile: &CropProfile, weather: &WeatherSample, vegetation_mean: f64) -> SuitabilityScore {
        let mut reasons = Vec::new();
        let mut push_reason = |cmp: &range::RangeComparison| {
            if cmp.score < REASON_THRESHOLD {
                reasons.push(reasons::range_reason(&profile.name, cmp));
            }
        };

        let temperature = compare_to_range(
            ParameterKind::Temperature,
            weather.avg_temp_c,
            profile.temp_min_c,
            profile.temp_max_c,
        );
        push_reason(&temperature);

        let rainfall = compare_to_range(
            ParameterKind::Rainfall,
            weather.total_rainfall_mm,
            profile.rainfall_min_mm,
            profile.rainfall_max_mm,
        );
        push_reason(&rainfall);

        let humidity = compare_to_range(
            ParameterKind::Humidity,
            weather.avg_humidity_pct,
            profile.humidity_min_pct,
            profile.humidity_max_pct,
        );
        push_reason(&humidity);

        // 0.0 soil moisture means the source had no samples
        let soil = match weather.soil_moisture() {
            Some(observed) => {
                let cmp = compare_to_range(
                    ParameterKind::SoilMoisture,
                    observed,
                    profile.soil_min,
                    profile.soil_max,
                );
                push_reason(&cmp);
                cmp.score
            }
            None => NEUTRAL_SOIL_SCORE,
        };

        let vegetation = vegetation_score(vegetation_mean);
        if vegetation < REASON_THRESHOLD {
            reasons.push(reasons::vegetation_reason(&profile.name, vegetation_mean, vegetation));
        }

        let overall = ParameterKind::Temperature.weight() * temperature.score
            + ParameterKind::Rainfall.weight() * rainfall.score
            + ParameterKind::Humidity.weight() * humidity.score
            + ParameterKind::SoilMoisture.weight() * soil
            + ParameterKind::Vegetation.weight() * vegetation;

        // Stable: ties keep parameter order
        reasons.sort_by(|a, b| a.score.total_cmp(&b.score));

        let scores = [temperature.score, rainfall.score, humidity.score, soil, vegetation];
        let has_critical_failure = scores.iter().any(|s| *s <= CRITICAL_THRESHOLD);

        SuitabilityScore {
            crop: profile.name.clone(),
            temperature: temperature.score,
            rainfall: rainfall.score,
            humidity: humidity.score,
            soil,
            vegetation,
            overall,
            is_unsuitable: overall < UNSUITABLE_THRESHOLD,
            has_critical_failure,
            reasons,
        }
    }
}

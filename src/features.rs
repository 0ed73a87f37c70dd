//! Feature Aggregation
//!
//! Assembles the fixed-shape land-use feature vector from pre-aggregated
//! per-parcel statistics (vegetation index, radar backscatter, terrain) and the
//! resolved weather sample. Pure mapping, no I/O.
//!
//! Missing inputs are a documented degradation, not an error: intensity,
//! ratio, terrain and weather fields all default to 0.0.

use crate::weather::WeatherSample;
use serde::{Deserialize, Serialize};

/// Raw per-parcel statistics as delivered by the imagery collaborator
///
/// Every field is optional; radar in particular is often unavailable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawParcelStats {
    /// Mean vegetation index over the parcel
    pub vegetation_mean: Option<f64>,

    /// Temporal standard deviation of the vegetation index
    pub vegetation_temporal_stddev: Option<f64>,

    /// Mean cross-polarized backscatter (dB)
    pub radar_cross_pol_db: Option<f64>,

    /// Cross-to-co-polarization ratio (linear)
    pub radar_cross_to_co_pol_ratio: Option<f64>,

    pub elevation_m: Option<f64>,
    pub slope_deg: Option<f64>,

    /// Fraction of the parcel labelled cropland by the static land-cover layer
    pub cultivated_fraction: Option<f64>,
}

/// Fixed ordered land-use feature vector; every field always present
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub vegetation_mean: f64,
    pub vegetation_temporal_stddev: f64,
    pub radar_cross_pol_db: f64,
    pub radar_cross_to_co_pol_ratio: f64,
    pub elevation_m: f64,
    pub slope_deg: f64,
    pub rainfall_mm: f64,
    pub soil_moisture: f64,
}

impl FeatureVector {
    /// Field names in model order
    pub const NAMES: [&'static str; 8] = [
        "vegetation_mean",
        "vegetation_temporal_stddev",
        "radar_cross_pol_db",
        "radar_cross_to_co_pol_ratio",
        "elevation_m",
        "slope_deg",
        "rainfall_mm",
        "soil_moisture",
    ];

    /// Values in model order
    pub fn to_array(&self) -> [f64; 8] {
        [
            self.vegetation_mean,
            self.vegetation_temporal_stddev,
            self.radar_cross_pol_db,
            self.radar_cross_to_co_pol_ratio,
            self.elevation_m,
            self.slope_deg,
            self.rainfall_mm,
            self.soil_moisture,
        ]
    }

    /// Value of a named feature
    pub fn get(&self, name: &str) -> Option<f64> {
        Self::NAMES
            .iter()
            .position(|n| *n == name)
            .map(|i| self.to_array()[i])
    }
}

/// Everything the land-use classifier looks at for one parcel
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LandUseEvidence {
    pub features: FeatureVector,

    /// Clamped to [0, 1]; 0.0 when the land-cover layer reported nothing
    pub cultivated_fraction: f64,
}

/// Replaces missing and non-finite values with 0.0
fn or_zero(value: Option<f64>) -> f64 {
    value.filter(|v| v.is_finite()).unwrap_or(0.0)
}

pub struct FeatureAggregator;

impl FeatureAggregator {
    /// Build the feature vector; weather fields are 0.0 when weather is unknown
    pub fn build(raw: &RawParcelStats, weather: Option<&WeatherSample>) -> FeatureVector {
        if raw.radar_cross_pol_db.is_none() || raw.radar_cross_to_co_pol_ratio.is_none() {
            tracing::debug!("Radar statistics unavailable - radar features zeroed");
        }

        FeatureVector {
            vegetation_mean: or_zero(raw.vegetation_mean),
            vegetation_temporal_stddev: or_zero(raw.vegetation_temporal_stddev),
            radar_cross_pol_db: or_zero(raw.radar_cross_pol_db),
            radar_cross_to_co_pol_ratio: or_zero(raw.radar_cross_to_co_pol_ratio),
            elevation_m: or_zero(raw.elevation_m),
            slope_deg: or_zero(raw.slope_deg),
            rainfall_mm: weather.map_or(0.0, |w| w.total_rainfall_mm),
            soil_moisture: weather.map_or(0.0, |w| w.avg_soil_moisture),
        }
    }

    /// Feature vector plus the land-cover cultivated fraction
    pub fn evidence(raw: &RawParcelStats, weather: Option<&WeatherSample>) -> LandUseEvidence {
        LandUseEvidence {
            features: Self::build(raw, weather),
            cultivated_fraction: or_zero(raw.cultivated_fraction).clamp(0.0, 1.0),
        }
    }
}

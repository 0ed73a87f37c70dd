//! Range Scoring
//!
//! Compares an observed value against a crop's ideal [min, max] range.
//! Inside the range scores 1.0; outside, the score decays linearly to 0.0
//! over a margin of `max(0.5 × width, floor)` and clamps there.

use serde::{Deserialize, Serialize};

/// Vegetation index at which the vegetation score saturates
pub const VEGETATION_SATURATION: f64 = 0.3;

/// The five scored suitability parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterKind {
    Temperature,
    Rainfall,
    Humidity,
    SoilMoisture,
    Vegetation,
}

impl ParameterKind {
    pub const ALL: [ParameterKind; 5] = [
        ParameterKind::Temperature,
        ParameterKind::Rainfall,
        ParameterKind::Humidity,
        ParameterKind::SoilMoisture,
        ParameterKind::Vegetation,
    ];

    /// Minimum decay margin in the parameter's native unit
    pub fn margin_floor(&self) -> f64 {
        match self {
            ParameterKind::Temperature | ParameterKind::Rainfall | ParameterKind::Humidity => 5.0,
            ParameterKind::SoilMoisture => 0.05,
            // Vegetation is not range-scored
            ParameterKind::Vegetation => 0.0,
        }
    }

    /// Weight in the overall suitability score
    pub fn weight(&self) -> f64 {
        match self {
            ParameterKind::Temperature => 0.25,
            ParameterKind::Rainfall => 0.25,
            ParameterKind::Humidity => 0.10,
            ParameterKind::SoilMoisture => 0.15,
            ParameterKind::Vegetation => 0.25,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ParameterKind::Temperature => "temperature",
            ParameterKind::Rainfall => "rainfall",
            ParameterKind::Humidity => "humidity",
            ParameterKind::SoilMoisture => "soil moisture",
            ParameterKind::Vegetation => "vegetation",
        }
    }
}

/// Where an observed value sits relative to the ideal range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeFit {
    Below,
    Within,
    Above,
}

/// Result of comparing one observed value to an ideal range
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RangeComparison {
    pub kind: ParameterKind,
    pub fit: RangeFit,
    pub observed: f64,
    pub min: f64,
    pub max: f64,
    pub margin: f64,
    pub score: f64,
}

/// Score `observed` against [min, max] for a range-scored parameter
pub fn compare_to_range(kind: ParameterKind, observed: f64, min: f64, max: f64) -> RangeComparison {
    let margin = (0.5 * (max - min)).max(kind.margin_floor());

    let (fit, distance) = if observed < min {
        (RangeFit::Below, min - observed)
    } else if observed > max {
        (RangeFit::Above, observed - max)
    } else {
        (RangeFit::Within, 0.0)
    };

    let score = if fit == RangeFit::Within {
        1.0
    } else {
        (1.0 - distance / margin).clamp(0.0, 1.0)
    };

    RangeComparison {
        kind,
        fit,
        observed,
        min,
        max,
        margin,
        score,
    }
}

/// Score in [0, 1] only
#[inline]
pub fn range_score(kind: ParameterKind, observed: f64, min: f64, max: f64) -> f64 {
    compare_to_range(kind, observed, min, max).score
}

/// `min(vegetation_mean / 0.3, 1.0)`, never negative
#[inline]
pub fn vegetation_score(vegetation_mean: f64) -> f64 {
    (vegetation_mean / VEGETATION_SATURATION).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_boundaries_score_one() {
        assert_eq!(range_score(ParameterKind::Temperature, 20.0, 20.0, 35.0), 1.0);
        assert_eq!(range_score(ParameterKind::Temperature, 35.0, 20.0, 35.0), 1.0);
    }

    #[test]
    fn test_margin_edges_score_zero() {
        // width 15 → margin 7.5
        assert_eq!(range_score(ParameterKind::Temperature, 12.5, 20.0, 35.0), 0.0);
        assert_eq!(range_score(ParameterKind::Temperature, 42.5, 20.0, 35.0), 0.0);
        assert_relative_eq!(range_score(ParameterKind::Temperature, 16.25, 20.0, 35.0), 0.5);
    }

    #[test]
    fn test_floor_applies_to_narrow_ranges() {
        // width 2 → 0.5 × width = 1, floor 5 wins
        let cmp = compare_to_range(ParameterKind::Humidity, 85.0, 78.0, 80.0);
        assert_eq!(cmp.margin, 5.0);
        assert_eq!(cmp.fit, RangeFit::Above);
        assert_relative_eq!(cmp.score, 0.0);

        let soil = compare_to_range(ParameterKind::SoilMoisture, 0.175, 0.20, 0.24);
        assert_relative_eq!(soil.margin, 0.05);
        assert_relative_eq!(soil.score, 0.5, epsilon = 1e-9);
    }

    #[test]
    fn test_scores_never_negative() {
        for observed in [-1000.0, -5.0, 0.0, 5000.0, 1e9] {
            let s = range_score(ParameterKind::Rainfall, observed, 1500.0, 3000.0);
            assert!((0.0..=1.0).contains(&s));
        }
    }

    #[test]
    fn test_vegetation_score() {
        assert_relative_eq!(vegetation_score(0.15), 0.5);
        assert_eq!(vegetation_score(0.3), 1.0);
        assert_eq!(vegetation_score(0.9), 1.0);
        assert_eq!(vegetation_score(-0.2), 0.0);
    }

    #[test]
    fn test_weights_sum_to_one() {
        let total: f64 = ParameterKind::ALL.iter().map(|k| k.weight()).sum();
        assert_relative_eq!(total, 1.0, epsilon = 1e-12);
    }
}

//! Unsuitability reason templates, one per parameter kind

use super::range::{ParameterKind, RangeComparison, RangeFit, VEGETATION_SATURATION};
use serde::{Deserialize, Serialize};

/// Human-readable explanation for one poorly scoring parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reason {
    pub parameter: ParameterKind,
    pub message: String,
    pub score: f64,
}

/// Direction word for a value outside its ideal range
fn direction(kind: ParameterKind, fit: RangeFit) -> &'static str {
    let below = fit == RangeFit::Below;
    match kind {
        ParameterKind::Temperature => {
            if below {
                "too cold"
            } else {
                "too hot"
            }
        }
        ParameterKind::Rainfall => {
            if below {
                "too low"
            } else {
                "too high"
            }
        }
        ParameterKind::Humidity => {
            if below {
                "too dry"
            } else {
                "too humid"
            }
        }
        ParameterKind::SoilMoisture => {
            if below {
                "too dry"
            } else {
                "too wet"
            }
        }
        ParameterKind::Vegetation => "too low",
    }
}

/// Message for a range-scored parameter
pub fn range_reason(crop: &str, cmp: &RangeComparison) -> Reason {
    let dir = direction(cmp.kind, cmp.fit);
    let message = match cmp.kind {
        ParameterKind::Temperature => format!(
            "Temperature {} for {}: needs {}-{}°C, got {:.1}°C",
            dir, crop, cmp.min, cmp.max, cmp.observed
        ),
        ParameterKind::Rainfall => format!(
            "Rainfall {} for {}: needs {}-{} mm, got {:.0} mm",
            dir, crop, cmp.min, cmp.max, cmp.observed
        ),
        ParameterKind::Humidity => format!(
            "Humidity {} for {}: needs {}-{}%, got {:.0}%",
            dir, crop, cmp.min, cmp.max, cmp.observed
        ),
        ParameterKind::SoilMoisture => format!(
            "Soil {} for {}: needs {}-{} m³/m³, got {:.3} m³/m³",
            dir, crop, cmp.min, cmp.max, cmp.observed
        ),
        ParameterKind::Vegetation => vegetation_message(crop, cmp.observed),
    };

    Reason {
        parameter: cmp.kind,
        message,
        score: cmp.score,
    }
}

fn vegetation_message(crop: &str, vegetation_mean: f64) -> String {
    format!(
        "Vegetation too sparse for {}: needs index of at least {}, got {:.2}",
        crop, VEGETATION_SATURATION, vegetation_mean
    )
}

pub fn vegetation_reason(crop: &str, vegetation_mean: f64, score: f64) -> Reason {
    Reason {
        parameter: ParameterKind::Vegetation,
        message: vegetation_message(crop, vegetation_mean),
        score,
    }
}

//! Parcel Overlap Detection
//!
//! `overlap_fraction = area(new ∩ existing) / area(new)`
//!
//! The denominator is always the new boundary, so a small parcel drawn inside
//! a large accepted one reports 1.0. A single new parcel may raise several
//! alerts.
//!
//! ## Architecture
//! - `geojson.rs` - GeoJSON parsing + ring validation
//! - `registry.rs` - accepted boundaries and the alert lifecycle
//! - `mod.rs` - `ParcelBoundary`, `OverlapDetector`

pub mod geojson;
pub mod registry;

pub use registry::{AlertRecord, ParcelRegistry};

use crate::error::{Result, ValidationError};
use geo::{Area, BooleanOps, BoundingRect, ChamberlainDuquetteArea, Intersects, Polygon, Rect};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::borrow::Borrow;

pub const DEFAULT_OVERLAP_THRESHOLD: f64 = 0.05;

/// Smallest registrable parcel, 100 m²
pub const DEFAULT_MIN_AREA_M2: f64 = 100.0;
/// Largest registrable parcel, 500 km²
pub const DEFAULT_MAX_AREA_M2: f64 = 500_000_000.0;

/// Snapshots above this size are checked in parallel
const PARALLEL_THRESHOLD: usize = 64;

/// Validated parcel polygon (lon/lat degrees) with an opaque id
#[derive(Debug, Clone, PartialEq)]
pub struct ParcelBoundary {
    id: String,
    polygon: Polygon<f64>,
    bbox: Rect<f64>,
}

impl ParcelBoundary {
    /// Validate an already-built polygon with the same ring rules as GeoJSON input
    pub fn new(id: impl Into<String>, polygon: Polygon<f64>) -> Result<Self> {
        let id = id.into();
        let polygon = geojson::validate_polygon(polygon)?;
        Self::from_validated(id, polygon)
    }

    /// Parse and validate a GeoJSON polygon
    pub fn from_geojson(id: impl Into<String>, geometry: &Value) -> Result<Self> {
        let polygon = geojson::parse_polygon(geometry)?;
        Self::from_validated(id.into(), polygon)
    }

    fn from_validated(id: String, polygon: Polygon<f64>) -> Result<Self> {
        let bbox = polygon
            .bounding_rect()
            .ok_or_else(|| ValidationError::InvalidGeometry(format!("parcel {} is empty", id)))?;
        Ok(Self { id, polygon, bbox })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn polygon(&self) -> &Polygon<f64> {
        &self.polygon
    }

    /// Spherical area in square metres
    pub fn area_m2(&self) -> f64 {
        self.polygon.chamberlain_duquette_unsigned_area()
    }

    /// Spherical area in hectares
    pub fn area_hectares(&self) -> f64 {
        self.area_m2() / 10_000.0
    }
}

/// Registrable parcel size range in square metres, inclusive
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AreaLimits {
    min_m2: f64,
    max_m2: f64,
}

impl Default for AreaLimits {
    fn default() -> Self {
        Self {
            min_m2: DEFAULT_MIN_AREA_M2,
            max_m2: DEFAULT_MAX_AREA_M2,
        }
    }
}

impl AreaLimits {
    pub fn new(min_m2: f64, max_m2: f64) -> Result<Self> {
        if !(min_m2.is_finite() && max_m2.is_finite()) || min_m2 < 0.0 || min_m2 > max_m2 {
            return Err(ValidationError::Config(format!(
                "parcel area limits must satisfy 0 <= min <= max (got {} .. {})",
                min_m2, max_m2
            )));
        }
        Ok(Self { min_m2, max_m2 })
    }

    pub fn min_m2(&self) -> f64 {
        self.min_m2
    }

    pub fn max_m2(&self) -> f64 {
        self.max_m2
    }

    pub fn check(&self, boundary: &ParcelBoundary) -> Result<()> {
        let area = boundary.area_m2();
        if area < self.min_m2 {
            return Err(ValidationError::InvalidGeometry(format!(
                "parcel {} area {:.1} m² is below the minimum of {} m²",
                boundary.id, area, self.min_m2
            )));
        }
        if area > self.max_m2 {
            return Err(ValidationError::InvalidGeometry(format!(
                "parcel {} area {:.2} km² exceeds the maximum of {} km²",
                boundary.id,
                area / 1e6,
                self.max_m2 / 1e6
            )));
        }
        Ok(())
    }
}

/// Boundary as received from storage, not yet validated
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredBoundary {
    pub id: String,
    pub geometry: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlapAlert {
    pub new_parcel_id: String,
    pub existing_parcel_id: String,
    /// Fraction of the new parcel's area, in [0, 1]
    pub overlap_fraction: f64,
}

pub struct OverlapDetector {
    threshold: f64,
    area_limits: AreaLimits,
}

impl Default for OverlapDetector {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_OVERLAP_THRESHOLD,
            area_limits: AreaLimits::default(),
        }
    }
}

impl OverlapDetector {
    pub fn new(threshold: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ValidationError::Config(format!(
                "overlap threshold must lie in [0, 1] (got {})",
                threshold
            )));
        }
        Ok(Self {
            threshold,
            area_limits: AreaLimits::default(),
        })
    }

    /// Size range enforced when a boundary is registered
    pub fn with_area_limits(mut self, area_limits: AreaLimits) -> Self {
        self.area_limits = area_limits;
        self
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn area_limits(&self) -> &AreaLimits {
        &self.area_limits
    }

    /// Fraction of `new`'s area covered by `existing`
    pub fn overlap_fraction(new: &ParcelBoundary, existing: &ParcelBoundary) -> f64 {
        if !new.bbox.intersects(&existing.bbox) {
            return 0.0;
        }
        let shared = new.polygon.intersection(&existing.polygon).unsigned_area();
        (shared / new.polygon.unsigned_area()).clamp(0.0, 1.0)
    }

    fn alert_for(&self, new: &ParcelBoundary, existing: &ParcelBoundary) -> Option<OverlapAlert> {
        if existing.id == new.id {
            return None;
        }
        let fraction = Self::overlap_fraction(new, existing);
        (fraction >= self.threshold && fraction > 0.0).then(|| OverlapAlert {
            new_parcel_id: new.id.clone(),
            existing_parcel_id: existing.id.clone(),
            overlap_fraction: fraction,
        })
    }

    /// Alerts for every existing boundary at or above the threshold, in input order
    pub fn check<B>(&self, new: &ParcelBoundary, existing: &[B]) -> Vec<OverlapAlert>
    where
        B: Borrow<ParcelBoundary> + Sync,
    {
        let alerts: Vec<OverlapAlert> = if existing.len() >= PARALLEL_THRESHOLD {
            existing
                .par_iter()
                .filter_map(|e| self.alert_for(new, e.borrow()))
                .collect()
        } else {
            existing
                .iter()
                .filter_map(|e| self.alert_for(new, e.borrow()))
                .collect()
        };

        for alert in &alerts {
            tracing::warn!(
                "Overlap: parcel {} covers {:.1}% of new parcel {}",
                alert.existing_parcel_id,
                alert.overlap_fraction * 100.0,
                alert.new_parcel_id
            );
        }
        alerts
    }

    /// Check raw GeoJSON boundaries
    ///
    /// An invalid new boundary fails the whole check. Invalid existing
    /// boundaries are skipped with a warning.
    pub fn check_geojson(
        &self,
        new_id: &str,
        new_geometry: &Value,
        existing: &[StoredBoundary],
    ) -> Result<Vec<OverlapAlert>> {
        let new = ParcelBoundary::from_geojson(new_id, new_geometry)?;

        let parsed: Vec<ParcelBoundary> = existing
            .iter()
            .filter_map(|stored| match ParcelBoundary::from_geojson(stored.id.clone(), &stored.geometry) {
                Ok(boundary) => Some(boundary),
                Err(e) => {
                    tracing::warn!("Skipping existing parcel {}: {}", stored.id, e);
                    None
                }
            })
            .collect();

        Ok(self.check(&new, &parsed))
    }
}

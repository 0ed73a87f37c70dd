//! Accepted-parcel registry
//!
//! Holds accepted boundaries and the overlap alerts raised against them.
//! Checks run against a snapshot taken at call time, so concurrent
//! registrations never block a check; a boundary appended after the snapshot
//! can only cause a missed alert.
//!
//! Alert ids are assigned while the alert list is write-locked, so ids are
//! strictly increasing in list order.

use super::{OverlapAlert, OverlapDetector, ParcelBoundary};
use crate::error::{Result, ValidationError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

/// An alert plus its lifecycle state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRecord {
    pub id: u64,
    #[serde(flatten)]
    pub alert: OverlapAlert,
    pub resolved: bool,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

#[derive(Default)]
pub struct ParcelRegistry {
    boundaries: RwLock<Vec<Arc<ParcelBoundary>>>,
    alerts: RwLock<Vec<AlertRecord>>,
    last_alert_id: AtomicU64,
}

fn poisoned(what: &str) -> ValidationError {
    ValidationError::Registry(format!("{} lock poisoned", what))
}

impl ParcelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current accepted boundaries
    pub fn snapshot(&self) -> Result<Vec<Arc<ParcelBoundary>>> {
        Ok(self.boundaries.read().map_err(|_| poisoned("boundary"))?.clone())
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.boundaries.read().map_err(|_| poisoned("boundary"))?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Overlap check against the current snapshot, without registering
    pub fn check(&self, boundary: &ParcelBoundary, detector: &OverlapDetector) -> Result<Vec<OverlapAlert>> {
        let snapshot = self.snapshot()?;
        Ok(detector.check(boundary, &snapshot))
    }

    /// Check, then store the boundary and its alerts
    ///
    /// The boundary must fall inside the detector's area limits. A boundary
    /// whose id is already registered replaces the old one.
    pub fn register(&self, boundary: ParcelBoundary, detector: &OverlapDetector) -> Result<Vec<AlertRecord>> {
        detector.area_limits().check(&boundary)?;
        let found = self.check(&boundary, detector)?;

        {
            let mut boundaries = self.boundaries.write().map_err(|_| poisoned("boundary"))?;
            boundaries.retain(|b| b.id() != boundary.id());
            boundaries.push(Arc::new(boundary));
        }

        if found.is_empty() {
            return Ok(Vec::new());
        }

        let mut alerts = self.alerts.write().map_err(|_| poisoned("alert"))?;
        let now = Utc::now();
        let records: Vec<AlertRecord> = found
            .into_iter()
            .map(|alert| AlertRecord {
                id: self.last_alert_id.fetch_add(1, Ordering::Relaxed) + 1,
                alert,
                resolved: false,
                created_at: now,
                resolved_at: None,
            })
            .collect();
        alerts.extend(records.iter().cloned());
        Ok(records)
    }

    /// Alerts, optionally filtered by resolved state, oldest first
    pub fn alerts(&self, resolved: Option<bool>) -> Result<Vec<AlertRecord>> {
        let alerts = self.alerts.read().map_err(|_| poisoned("alert"))?;
        Ok(alerts
            .iter()
            .filter(|a| resolved.map_or(true, |r| a.resolved == r))
            .cloned()
            .collect())
    }

    /// Mark an alert resolved; resolving twice keeps the first timestamp
    pub fn resolve_alert(&self, id: u64) -> Result<AlertRecord> {
        let mut alerts = self.alerts.write().map_err(|_| poisoned("alert"))?;
        let record = alerts
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or(ValidationError::AlertNotFound(id))?;

        if !record.resolved {
            record.resolved = true;
            record.resolved_at = Some(Utc::now());
            tracing::info!("Resolved overlap alert {}", id);
        }
        Ok(record.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlap::tests::square;
    use crate::overlap::AreaLimits;

    // 0.01° squares near Thrissur are ~1.2 km², well inside the default limits
    const LON: f64 = 76.0;
    const LAT: f64 = 10.0;
    const SIZE: f64 = 0.01;

    #[test]
    fn test_register_raises_alerts() {
        let registry = ParcelRegistry::new();
        let detector = OverlapDetector::default();

        assert!(registry.register(square("a", LON, LAT, SIZE), &detector).unwrap().is_empty());
        let alerts = registry
            .register(square("b", LON + SIZE / 2.0, LAT, SIZE), &detector)
            .unwrap();

        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].id, 1);
        assert_eq!(alerts[0].alert.existing_parcel_id, "a");
        assert_eq!(registry.len().unwrap(), 2);
    }

    #[test]
    fn test_reregistering_replaces() {
        let registry = ParcelRegistry::new();
        let detector = OverlapDetector::default();
        registry.register(square("a", LON, LAT, SIZE), &detector).unwrap();
        let alerts = registry
            .register(square("a", LON + SIZE / 4.0, LAT, SIZE), &detector)
            .unwrap();

        assert!(alerts.is_empty());
        assert_eq!(registry.len().unwrap(), 1);
    }

    #[test]
    fn test_resolve_lifecycle() {
        let registry = ParcelRegistry::new();
        let detector = OverlapDetector::default();
        registry.register(square("a", LON, LAT, SIZE), &detector).unwrap();
        registry
            .register(square("b", LON + SIZE / 2.0, LAT + SIZE / 2.0, SIZE), &detector)
            .unwrap();

        assert_eq!(registry.alerts(Some(false)).unwrap().len(), 1);
        let resolved = registry.resolve_alert(1).unwrap();
        assert!(resolved.resolved);
        assert!(resolved.resolved_at.is_some());

        assert!(registry.alerts(Some(false)).unwrap().is_empty());
        assert_eq!(registry.alerts(Some(true)).unwrap().len(), 1);
        assert_eq!(registry.alerts(None).unwrap().len(), 1);
    }

    #[test]
    fn test_resolve_unknown_alert() {
        let registry = ParcelRegistry::new();
        assert_eq!(registry.resolve_alert(42), Err(ValidationError::AlertNotFound(42)));
    }

    #[test]
    fn test_check_does_not_register() {
        let registry = ParcelRegistry::new();
        let detector = OverlapDetector::default();
        registry.register(square("a", LON, LAT, SIZE), &detector).unwrap();

        let alerts = registry
            .check(&square("b", LON, LAT, SIZE / 2.0), &detector)
            .unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(registry.len().unwrap(), 1);
        assert!(registry.alerts(None).unwrap().is_empty());
    }

    #[test]
    fn test_register_enforces_area_limits() {
        let registry = ParcelRegistry::new();
        let detector = OverlapDetector::default();

        // ~5 m across
        let tiny = registry.register(square("tiny", LON, LAT, 0.00005), &detector);
        assert!(matches!(tiny, Err(ValidationError::InvalidGeometry(_))));
        // ~12,000 km²
        let huge = registry.register(square("huge", LON, LAT, 1.0), &detector);
        assert!(matches!(huge, Err(ValidationError::InvalidGeometry(_))));
        assert!(registry.is_empty().unwrap());

        let relaxed = OverlapDetector::default().with_area_limits(AreaLimits::new(0.0, 1e13).unwrap());
        registry.register(square("huge", LON, LAT, 1.0), &relaxed).unwrap();
        assert_eq!(registry.len().unwrap(), 1);
    }

    #[test]
    fn test_concurrent_alert_ids_follow_list_order() {
        let registry = ParcelRegistry::new();
        let detector = OverlapDetector::default();
        registry.register(square("base", LON, LAT, SIZE), &detector).unwrap();

        std::thread::scope(|scope| {
            for t in 0..8 {
                let registry = &registry;
                let detector = &detector;
                scope.spawn(move || {
                    for i in 0..10 {
                        let id = format!("t{}-{}", t, i);
                        registry.register(square(&id, LON, LAT, SIZE / 2.0), detector).unwrap();
                    }
                });
            }
        });

        let ids: Vec<u64> = registry.alerts(None).unwrap().iter().map(|a| a.id).collect();
        assert!(ids.len() >= 80);
        assert!(ids.windows(2).all(|w| w[0] < w[1]), "ids out of order: {:?}", ids);
        assert_eq!(ids.first(), Some(&1));
    }
}

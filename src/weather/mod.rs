//! Weather and soil statistics for a parcel location
//!
//! ## Architecture
//! - `mod.rs` - WeatherSample, DateRange, GeoPoint and the `WeatherSource` seam
//! - `window.rs` - ordered window strategies + `WeatherFallbackProvider`
//! - `open_meteo.rs` - blocking Open-Meteo archive client
//!
//! Samples are produced fresh per request and never cached here.

pub mod open_meteo;
pub mod window;

pub use open_meteo::OpenMeteoClient;
pub use window::{
    ExplicitRange, MostRecentSeason, TrailingDays, WeatherFallbackProvider, WindowRequest,
    WindowStrategy,
};

use crate::error::{Result, ValidationError};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Geographic location (WGS84 degrees)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// Inclusive calendar date range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "UncheckedRange")]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

#[derive(Deserialize)]
struct UncheckedRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl TryFrom<UncheckedRange> for DateRange {
    type Error = ValidationError;

    fn try_from(raw: UncheckedRange) -> Result<Self> {
        DateRange::new(raw.start, raw.end)
    }
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(ValidationError::DataUnavailable(format!(
                "date range starts after it ends ({} > {})",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    /// Number of calendar days covered (inclusive)
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

/// Aggregated weather/soil statistics over one window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSample {
    pub avg_temp_c: f64,
    pub total_rainfall_mm: f64,
    pub avg_humidity_pct: f64,
    /// Volumetric soil moisture 0-7cm (m³/m³); 0.0 means no samples
    pub avg_soil_moisture: f64,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub days_sampled: u32,
}

/// Raw daily series as returned by an upstream source (None = missing day)
#[derive(Debug, Clone, Default)]
pub struct DailySeries {
    pub temperature_c: Vec<Option<f64>>,
    pub rainfall_mm: Vec<Option<f64>>,
    pub humidity_pct: Vec<Option<f64>>,
    pub soil_moisture: Vec<Option<f64>>,
}

fn present(values: &[Option<f64>]) -> Vec<f64> {
    values.iter().flatten().copied().filter(|v| v.is_finite()).collect()
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

impl WeatherSample {
    /// Aggregate daily series for `window`
    ///
    /// Temperature, humidity and soil moisture are means, rainfall is a sum.
    /// Missing days are skipped; a window without a single temperature sample
    /// is `DataUnavailable`.
    pub fn aggregate(window: &DateRange, series: &DailySeries) -> Result<Self> {
        let temps = present(&series.temperature_c);
        if temps.is_empty() {
            return Err(ValidationError::DataUnavailable(format!(
                "no weather samples for {} to {}",
                window.start, window.end
            )));
        }

        let rains = present(&series.rainfall_mm);
        let humids = present(&series.humidity_pct);
        let soils = present(&series.soil_moisture);

        Ok(Self {
            avg_temp_c: mean(&temps),
            total_rainfall_mm: rains.iter().sum(),
            avg_humidity_pct: mean(&humids),
            avg_soil_moisture: mean(&soils),
            period_start: window.start,
            period_end: window.end,
            days_sampled: temps.len() as u32,
        })
    }

    /// Soil moisture if the upstream produced any samples
    pub fn soil_moisture(&self) -> Option<f64> {
        (self.avg_soil_moisture != 0.0).then_some(self.avg_soil_moisture)
    }
}

/// Upstream provider of aggregated weather statistics
///
/// Implementations may block on the network; callers bound them with a timeout
/// and treat timeouts as `DataUnavailable`.
pub trait WeatherSource: Send + Sync {
    fn fetch(&self, location: GeoPoint, window: &DateRange) -> Result<WeatherSample>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn window() -> DateRange {
        DateRange::new(
            NaiveDate::from_ymd_opt(2026, 6, 1).unwrap(),
            NaiveDate::from_ymd_opt(2026, 6, 3).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_aggregate_skips_missing_days() {
        let series = DailySeries {
            temperature_c: vec![Some(26.0), None, Some(28.0)],
            rainfall_mm: vec![Some(10.0), Some(5.5), None],
            humidity_pct: vec![Some(80.0), Some(90.0), Some(85.0)],
            soil_moisture: vec![None, None, None],
        };
        let sample = WeatherSample::aggregate(&window(), &series).unwrap();

        assert_relative_eq!(sample.avg_temp_c, 27.0);
        assert_relative_eq!(sample.total_rainfall_mm, 15.5);
        assert_relative_eq!(sample.avg_humidity_pct, 85.0);
        assert_eq!(sample.avg_soil_moisture, 0.0);
        assert_eq!(sample.soil_moisture(), None);
        assert_eq!(sample.days_sampled, 2);
        assert_eq!(sample.period_start, window().start);
    }

    #[test]
    fn test_aggregate_without_samples_is_unavailable() {
        let series = DailySeries {
            temperature_c: vec![None, None],
            ..Default::default()
        };
        assert!(matches!(
            WeatherSample::aggregate(&window(), &series),
            Err(ValidationError::DataUnavailable(_))
        ));
    }

    #[test]
    fn test_date_range() {
        assert_eq!(window().days(), 3);
        let inverted = DateRange::new(window().end, window().start);
        assert!(inverted.is_err());
    }

    #[test]
    fn test_inverted_range_rejected_on_deserialize() {
        let ok: DateRange =
            serde_json::from_str(r#"{"start": "2026-06-01", "end": "2026-09-30"}"#).unwrap();
        assert_eq!(ok.days(), 122);
        let inverted = serde_json::from_str::<DateRange>(r#"{"start": "2026-09-30", "end": "2026-06-01"}"#);
        assert!(inverted.is_err());
    }
}

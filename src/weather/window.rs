//! Weather window selection
//!
//! The window is chosen by an ordered list of strategies, first match wins:
//! 1. `ExplicitRange` - the caller supplied start/end dates
//! 2. `MostRecentSeason` - the crop has a growing season; use its most
//!    recently completed instance
//! 3. `TrailingDays` - the trailing window ending yesterday
//!
//! Selection and fetching are separate: once a window is selected it is
//! fetched exactly once, and an empty result is `DataUnavailable`.

use super::{DateRange, GeoPoint, WeatherSample, WeatherSource};
use crate::catalog::GrowingSeason;
use crate::error::{Result, ValidationError};
use chrono::{Datelike, Duration, NaiveDate, Utc};
use std::sync::Arc;

/// Inputs a strategy may use to pick a window
#[derive(Debug, Clone, Copy, Default)]
pub struct WindowRequest {
    pub explicit_range: Option<DateRange>,
    pub season: Option<GrowingSeason>,
}

/// One step of the fallback chain
pub trait WindowStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// The window this strategy selects, or None to defer to the next one
    fn select(&self, request: &WindowRequest, today: NaiveDate) -> Option<DateRange>;
}

/// Use the caller's date range verbatim
pub struct ExplicitRange;

impl WindowStrategy for ExplicitRange {
    fn name(&self) -> &'static str {
        "explicit_range"
    }

    fn select(&self, request: &WindowRequest, _today: NaiveDate) -> Option<DateRange> {
        request.explicit_range
    }
}

/// Most recently completed instance of the crop's growing season
pub struct MostRecentSeason;

fn last_day_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(next_year, next_month, 1).map(|d| d - Duration::days(1))
}

/// Season instance starting in `year`
fn season_instance(season: &GrowingSeason, year: i32) -> Option<DateRange> {
    let start = NaiveDate::from_ymd_opt(year, season.start_month, 1)?;
    let end_year = if season.wraps_year_end() { year + 1 } else { year };
    let end = last_day_of_month(end_year, season.end_month)?;
    Some(DateRange { start, end })
}

impl WindowStrategy for MostRecentSeason {
    fn name(&self) -> &'static str {
        "growing_season"
    }

    fn select(&self, request: &WindowRequest, today: NaiveDate) -> Option<DateRange> {
        let season = request.season?;
        // A season that wraps the year end started in the previous year at the latest
        (today.year() - 2..=today.year())
            .rev()
            .filter_map(|year| season_instance(&season, year))
            .find(|instance| instance.end < today)
    }
}

/// Trailing window ending yesterday (latest complete archive day)
pub struct TrailingDays {
    pub days: u32,
}

impl WindowStrategy for TrailingDays {
    fn name(&self) -> &'static str {
        "trailing_days"
    }

    fn select(&self, _request: &WindowRequest, today: NaiveDate) -> Option<DateRange> {
        let end = today - Duration::days(1);
        let start = end - Duration::days(i64::from(self.days));
        Some(DateRange { start, end })
    }
}

/// Resolves the best-available weather sample for a location
pub struct WeatherFallbackProvider {
    source: Arc<dyn WeatherSource>,
    strategies: Vec<Box<dyn WindowStrategy>>,
}

impl WeatherFallbackProvider {
    /// Standard three-level chain
    pub fn new(source: Arc<dyn WeatherSource>, lookback_days: u32) -> Self {
        Self::with_strategies(
            source,
            vec![
                Box::new(ExplicitRange),
                Box::new(MostRecentSeason),
                Box::new(TrailingDays { days: lookback_days }),
            ],
        )
    }

    pub fn with_strategies(
        source: Arc<dyn WeatherSource>,
        strategies: Vec<Box<dyn WindowStrategy>>,
    ) -> Self {
        Self { source, strategies }
    }

    /// First window any strategy selects, with the strategy's name
    pub fn select_window(
        &self,
        request: &WindowRequest,
        today: NaiveDate,
    ) -> Option<(&'static str, DateRange)> {
        self.strategies
            .iter()
            .find_map(|s| s.select(request, today).map(|w| (s.name(), w)))
    }

    /// Resolve weather for `location` relative to the current UTC date
    pub fn resolve(
        &self,
        location: GeoPoint,
        explicit_range: Option<DateRange>,
        crop_season: Option<GrowingSeason>,
    ) -> Result<WeatherSample> {
        self.resolve_on(location, explicit_range, crop_season, Utc::now().date_naive())
    }

    /// Resolve weather with an explicit notion of "today"
    pub fn resolve_on(
        &self,
        location: GeoPoint,
        explicit_range: Option<DateRange>,
        crop_season: Option<GrowingSeason>,
        today: NaiveDate,
    ) -> Result<WeatherSample> {
        let request = WindowRequest {
            explicit_range,
            season: crop_season,
        };

        let (strategy, window) = self.select_window(&request, today).ok_or_else(|| {
            ValidationError::DataUnavailable("no weather window could be selected".to_string())
        })?;

        tracing::info!(
            "Fetching weather ({}): {} to {} for ({:.4}, {:.4})",
            strategy,
            window.start,
            window.end,
            location.lat,
            location.lon
        );

        let sample = self.source.fetch(location, &window)?;
        if sample.days_sampled == 0 {
            return Err(ValidationError::DataUnavailable(format!(
                "no weather samples for {} to {}",
                window.start, window.end
            )));
        }
        Ok(sample)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    /// Records requested windows and returns a fixed sample
    struct RecordingSource {
        windows: Mutex<Vec<DateRange>>,
        days_sampled: u32,
    }

    impl RecordingSource {
        fn new(days_sampled: u32) -> Self {
            Self {
                windows: Mutex::new(Vec::new()),
                days_sampled,
            }
        }
    }

    impl WeatherSource for RecordingSource {
        fn fetch(&self, _location: GeoPoint, window: &DateRange) -> Result<WeatherSample> {
            self.windows.lock().unwrap().push(*window);
            Ok(WeatherSample {
                avg_temp_c: 27.0,
                total_rainfall_mm: 900.0,
                avg_humidity_pct: 80.0,
                avg_soil_moisture: 0.3,
                period_start: window.start,
                period_end: window.end,
                days_sampled: self.days_sampled,
            })
        }
    }

    const TODAY: (i32, u32, u32) = (2026, 10, 19);

    fn today() -> NaiveDate {
        date(TODAY.0, TODAY.1, TODAY.2)
    }

    #[test]
    fn test_explicit_range_wins() {
        let explicit = DateRange::new(date(2025, 1, 1), date(2025, 3, 31)).unwrap();
        let request = WindowRequest {
            explicit_range: Some(explicit),
            season: Some(GrowingSeason { start_month: 6, end_month: 9 }),
        };
        let provider = WeatherFallbackProvider::new(Arc::new(RecordingSource::new(90)), 90);
        assert_eq!(
            provider.select_window(&request, today()),
            Some(("explicit_range", explicit))
        );
    }

    #[test]
    fn test_season_in_current_year_when_completed() {
        let request = WindowRequest {
            explicit_range: None,
            season: Some(GrowingSeason { start_month: 6, end_month: 9 }),
        };
        let window = MostRecentSeason.select(&request, today()).unwrap();
        assert_eq!(window, DateRange { start: date(2026, 6, 1), end: date(2026, 9, 30) });
    }

    #[test]
    fn test_season_in_progress_uses_previous_year() {
        let request = WindowRequest {
            explicit_range: None,
            season: Some(GrowingSeason { start_month: 9, end_month: 11 }),
        };
        let window = MostRecentSeason.select(&request, today()).unwrap();
        assert_eq!(window, DateRange { start: date(2025, 9, 1), end: date(2025, 11, 30) });
    }

    #[test]
    fn test_season_wrapping_year_end() {
        let request = WindowRequest {
            explicit_range: None,
            season: Some(GrowingSeason { start_month: 10, end_month: 1 }),
        };
        let window = MostRecentSeason.select(&request, today()).unwrap();
        assert_eq!(window, DateRange { start: date(2025, 10, 1), end: date(2026, 1, 31) });
    }

    #[test]
    fn test_season_ending_in_february_leap_year() {
        let request = WindowRequest {
            explicit_range: None,
            season: Some(GrowingSeason { start_month: 11, end_month: 2 }),
        };
        let window = MostRecentSeason.select(&request, date(2024, 6, 1)).unwrap();
        assert_eq!(window.end, date(2024, 2, 29));
    }

    #[test]
    fn test_trailing_window() {
        let window = TrailingDays { days: 90 }
            .select(&WindowRequest::default(), today())
            .unwrap();
        assert_eq!(window.end, date(2026, 10, 18));
        assert_eq!(window.start, date(2026, 7, 20));
    }

    #[test]
    fn test_chain_falls_through_to_trailing() {
        let source = Arc::new(RecordingSource::new(90));
        let provider = WeatherFallbackProvider::new(source.clone(), 30);
        let sample = provider
            .resolve_on(GeoPoint::new(10.0, 76.3), None, None, today())
            .unwrap();

        assert_eq!(sample.period_end, date(2026, 10, 18));
        let windows = source.windows.lock().unwrap();
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].start, date(2026, 9, 18));
    }

    #[test]
    fn test_empty_window_is_unavailable() {
        let provider = WeatherFallbackProvider::new(Arc::new(RecordingSource::new(0)), 90);
        let result = provider.resolve_on(GeoPoint::new(10.0, 76.3), None, None, today());
        assert!(matches!(result, Err(ValidationError::DataUnavailable(_))));
    }

    #[test]
    fn test_no_strategy_selects() {
        let provider = WeatherFallbackProvider::with_strategies(
            Arc::new(RecordingSource::new(90)),
            vec![Box::new(ExplicitRange)],
        );
        let result = provider.resolve_on(GeoPoint::new(10.0, 76.3), None, None, today());
        assert!(matches!(result, Err(ValidationError::DataUnavailable(_))));
    }
}

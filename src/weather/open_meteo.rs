//! Open-Meteo historical archive client
//!
//! Free, keyless daily archive. Requests daily mean temperature, precipitation
//! sum, mean relative humidity and mean 0-7cm soil moisture for the window.
//! Any transport failure, timeout or malformed body is `DataUnavailable`.

use super::{DailySeries, DateRange, GeoPoint, WeatherSample, WeatherSource};
use crate::error::{Result, ValidationError};
use serde::Deserialize;
use std::time::Duration;

const DAILY_VARIABLES: &str =
    "temperature_2m_mean,precipitation_sum,relative_humidity_2m_mean,soil_moisture_0_to_7cm_mean";

/// Series may be absent or `null` when a variable is not archived for the location
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct DailyBlock {
    temperature_2m_mean: Option<Vec<Option<f64>>>,
    precipitation_sum: Option<Vec<Option<f64>>>,
    relative_humidity_2m_mean: Option<Vec<Option<f64>>>,
    soil_moisture_0_to_7cm_mean: Option<Vec<Option<f64>>>,
}

#[derive(Debug, Deserialize)]
struct ArchiveResponse {
    #[serde(default)]
    daily: Option<DailyBlock>,
}

impl From<DailyBlock> for DailySeries {
    fn from(block: DailyBlock) -> Self {
        DailySeries {
            temperature_c: block.temperature_2m_mean.unwrap_or_default(),
            rainfall_mm: block.precipitation_sum.unwrap_or_default(),
            humidity_pct: block.relative_humidity_2m_mean.unwrap_or_default(),
            soil_moisture: block.soil_moisture_0_to_7cm_mean.unwrap_or_default(),
        }
    }
}

/// Blocking client with a per-request timeout
pub struct OpenMeteoClient {
    agent: ureq::Agent,
    base_url: String,
}

impl OpenMeteoClient {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self {
            agent,
            base_url: base_url.to_string(),
        }
    }

    fn parse_body(window: &DateRange, body: ArchiveResponse) -> Result<WeatherSample> {
        let daily = body.daily.ok_or_else(|| {
            ValidationError::DataUnavailable("weather response has no daily block".to_string())
        })?;
        WeatherSample::aggregate(window, &daily.into())
    }
}

impl WeatherSource for OpenMeteoClient {
    fn fetch(&self, location: GeoPoint, window: &DateRange) -> Result<WeatherSample> {
        let response = self
            .agent
            .get(&self.base_url)
            .query("latitude", &format!("{:.4}", location.lat))
            .query("longitude", &format!("{:.4}", location.lon))
            .query("start_date", &window.start.to_string())
            .query("end_date", &window.end.to_string())
            .query("daily", DAILY_VARIABLES)
            .query("timezone", "auto")
            .call()
            .map_err(|e| ValidationError::DataUnavailable(format!("weather request failed: {}", e)))?;

        let body: ArchiveResponse = response
            .into_json()
            .map_err(|e| ValidationError::DataUnavailable(format!("weather response unreadable: {}", e)))?;

        let sample = Self::parse_body(window, body)?;
        tracing::debug!(
            "Weather sample: {:.1}°C, {:.1}mm, {:.1}% RH, soil {:.4} over {} days",
            sample.avg_temp_c,
            sample.total_rainfall_mm,
            sample.avg_humidity_pct,
            sample.avg_soil_moisture,
            sample.days_sampled
        );
        Ok(sample)
    }
}

//! Engine Configuration
//!
//! All tunables of the decision engine. Loaded once at process start from an
//! optional JSON file, then overridden by `PARCEL_*` environment variables.
//! Every field has a default so an empty file (or no file) is valid.

use crate::error::ValidationError;
use crate::overlap::AreaLimits;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Open-Meteo historical archive endpoint
pub const DEFAULT_WEATHER_BASE_URL: &str = "https://archive-api.open-meteo.com/v1/archive";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Weight of the land-use probability in `overall_confidence`
    pub land_use_weight: f64,

    /// Weight of the yield feasibility score in `overall_confidence`
    pub yield_weight: f64,

    /// Minimum overlap fraction (of the new parcel's area) that raises an alert
    pub overlap_threshold: f64,

    /// Smallest parcel accepted for registration, square metres
    pub min_parcel_area_m2: f64,

    /// Largest parcel accepted for registration, square metres
    pub max_parcel_area_m2: f64,

    /// Length of the trailing weather window in days
    pub weather_lookback_days: u32,

    /// Timeout applied to a single weather fetch
    pub weather_timeout_secs: u64,

    /// Number of alternative crops returned by the recommender
    pub recommendation_top_n: usize,

    /// Learned land-use model artifact (JSON tree ensemble)
    pub model_path: Option<PathBuf>,

    /// External crop catalog CSV (built-in catalog when absent)
    pub catalog_path: Option<PathBuf>,

    pub weather_base_url: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            land_use_weight: 0.8,
            yield_weight: 0.2,
            overlap_threshold: 0.05,
            min_parcel_area_m2: 100.0,
            max_parcel_area_m2: 500_000_000.0,
            weather_lookback_days: 90,
            weather_timeout_secs: 15,
            recommendation_top_n: 5,
            model_path: None,
            catalog_path: None,
            weather_base_url: DEFAULT_WEATHER_BASE_URL.to_string(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let config: EngineConfig = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config JSON: {:?}", path))?;

        config.validate()?;
        Ok(config)
    }

    /// Load from an optional file, then apply environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `PARCEL_*` overrides read through `lookup`
    ///
    /// `lookup` is injected so tests do not have to mutate the process environment.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("PARCEL_MODEL_PATH") {
            self.model_path = Some(PathBuf::from(v));
        }
        if let Some(v) = lookup("PARCEL_CATALOG_PATH") {
            self.catalog_path = Some(PathBuf::from(v));
        }
        if let Some(v) = lookup("PARCEL_OVERLAP_THRESHOLD") {
            self.overlap_threshold = v
                .parse()
                .with_context(|| format!("PARCEL_OVERLAP_THRESHOLD is not a number: {}", v))?;
        }
        if let Some(v) = lookup("PARCEL_MIN_AREA_M2") {
            self.min_parcel_area_m2 = v
                .parse()
                .with_context(|| format!("PARCEL_MIN_AREA_M2 is not a number: {}", v))?;
        }
        if let Some(v) = lookup("PARCEL_MAX_AREA_M2") {
            self.max_parcel_area_m2 = v
                .parse()
                .with_context(|| format!("PARCEL_MAX_AREA_M2 is not a number: {}", v))?;
        }
        if let Some(v) = lookup("PARCEL_WEATHER_LOOKBACK_DAYS") {
            self.weather_lookback_days = v
                .parse()
                .with_context(|| format!("PARCEL_WEATHER_LOOKBACK_DAYS is not an integer: {}", v))?;
        }
        if let Some(v) = lookup("PARCEL_WEATHER_TIMEOUT_SECS") {
            self.weather_timeout_secs = v
                .parse()
                .with_context(|| format!("PARCEL_WEATHER_TIMEOUT_SECS is not an integer: {}", v))?;
        }
        Ok(())
    }

    /// Reject configurations the engine cannot honour
    pub fn validate(&self) -> std::result::Result<(), ValidationError> {
        if self.land_use_weight < 0.0 || self.yield_weight < 0.0 {
            return Err(ValidationError::Config(
                "confidence weights must be non-negative".to_string(),
            ));
        }
        let total = self.land_use_weight + self.yield_weight;
        if (total - 1.0).abs() > 1e-6 {
            return Err(ValidationError::Config(format!(
                "confidence weights must sum to 1.0 (got {:.6})",
                total
            )));
        }
        if !(0.0..=1.0).contains(&self.overlap_threshold) {
            return Err(ValidationError::Config(format!(
                "overlap_threshold must lie in [0, 1] (got {})",
                self.overlap_threshold
            )));
        }
        AreaLimits::new(self.min_parcel_area_m2, self.max_parcel_area_m2)?;
        if self.weather_lookback_days == 0 {
            return Err(ValidationError::Config(
                "weather_lookback_days must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_are_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.recommendation_top_n, 5);
        assert_eq!(config.weather_lookback_days, 90);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"land_use_weight": 0.6, "yield_weight": 0.4}"#).unwrap();
        assert_eq!(config.land_use_weight, 0.6);
        assert_eq!(config.overlap_threshold, 0.05);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_weights_must_sum_to_one() {
        let config = EngineConfig {
            land_use_weight: 0.8,
            yield_weight: 0.4,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ValidationError::Config(_))));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("PARCEL_OVERLAP_THRESHOLD", "0.1"),
            ("PARCEL_WEATHER_LOOKBACK_DAYS", "30"),
            ("PARCEL_MODEL_PATH", "/models/land_use.json"),
        ]
        .into_iter()
        .collect();

        let mut config = EngineConfig::default();
        config
            .apply_env_overrides(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.overlap_threshold, 0.1);
        assert_eq!(config.weather_lookback_days, 30);
        assert_eq!(config.model_path, Some(PathBuf::from("/models/land_use.json")));
    }

    #[test]
    fn test_bad_env_override_is_error() {
        let mut config = EngineConfig::default();
        let result = config.apply_env_overrides(|k| {
            (k == "PARCEL_WEATHER_TIMEOUT_SECS").then(|| "soon".to_string())
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_area_limits_from_env_and_validation() {
        let mut config = EngineConfig::default();
        config
            .apply_env_overrides(|k| match k {
                "PARCEL_MIN_AREA_M2" => Some("500".to_string()),
                "PARCEL_MAX_AREA_M2" => Some("1e7".to_string()),
                _ => None,
            })
            .unwrap();
        assert_eq!(config.min_parcel_area_m2, 500.0);
        assert_eq!(config.max_parcel_area_m2, 1e7);
        assert!(config.validate().is_ok());

        let inverted = EngineConfig {
            min_parcel_area_m2: 1e6,
            max_parcel_area_m2: 1e3,
            ..Default::default()
        };
        assert!(matches!(inverted.validate(), Err(ValidationError::Config(_))));
    }
}

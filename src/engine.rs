//! Validation Engine
//!
//! End-to-end pipeline for one parcel:
//!
//! ```text
//! claimed crop → catalog lookup (UnknownCrop → warning)
//! location     → WeatherFallbackProvider (DataUnavailable → warning)
//! raw stats    → FeatureAggregator → LandUseClassifier
//! crop+weather → CropSuitabilityScorer → YieldEstimator
//! weather      → CropRecommender (shared sample)
//!              → DecisionOrchestrator → ValidationReport
//! ```
//!
//! The land-use decision is always produced. Catalog and classifier are loaded
//! once and shared read-only; each request is an independent invocation.

use crate::catalog::{CropCatalog, CropProfile};
use crate::classifier::{Decision, LandUseClassifier};
use crate::config::EngineConfig;
use crate::decision::{ConfidenceWeights, DecisionOrchestrator};
use crate::error::ValidationError;
use crate::features::{FeatureAggregator, RawParcelStats};
use crate::overlap::{AreaLimits, OverlapDetector};
use crate::recommender::{CropRecommender, RankedCrop};
use crate::suitability::{CropSuitabilityScorer, SuitabilityScore};
use crate::weather::{DateRange, GeoPoint, OpenMeteoClient, WeatherFallbackProvider, WeatherSample, WeatherSource};
use crate::yield_estimate::{YieldEstimate, YieldEstimator};
use anyhow::{Context, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// One parcel to validate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationRequest {
    #[serde(default)]
    pub parcel_id: Option<String>,

    #[serde(flatten)]
    pub stats: RawParcelStats,

    pub location: GeoPoint,

    /// Parcel area in hectares
    pub area_ha: f64,

    #[serde(default)]
    pub claimed_crop: Option<String>,

    #[serde(default)]
    pub explicit_date_range: Option<DateRange>,
}

/// Full validation outcome
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub parcel_id: Option<String>,

    pub decision: Decision,
    pub agricultural_probability: f64,
    pub using_learned_model: bool,
    pub feature_importance: BTreeMap<String, f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub suitability: Option<SuitabilityScore>,

    #[serde(rename = "yield", skip_serializing_if = "Option::is_none")]
    pub yield_estimate: Option<YieldEstimate>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommended_crops: Option<Vec<RankedCrop>>,

    /// Land-use probability blended with yield feasibility when a crop is claimed
    pub overall_confidence: f64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub yield_warning: Option<String>,

    /// Weather sample the crop outputs were scored against
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weather: Option<WeatherSample>,

    /// Absorbed degradations and surfaced entity errors
    #[serde(default)]
    pub warnings: Vec<String>,
}

pub struct ValidationEngine {
    config: EngineConfig,
    catalog: Arc<CropCatalog>,
    classifier: Arc<LandUseClassifier>,
    weather: WeatherFallbackProvider,
    orchestrator: DecisionOrchestrator,
    overlap: OverlapDetector,
}

impl ValidationEngine {
    /// Build everything from configuration (catalog, model, Open-Meteo client)
    pub fn from_config(config: EngineConfig) -> Result<Self> {
        let start = Instant::now();

        let catalog = CropCatalog::load(config.catalog_path.as_deref())
            .context("Failed to load crop catalog")?;
        let classifier = LandUseClassifier::load(config.model_path.as_deref());
        let source = OpenMeteoClient::new(
            &config.weather_base_url,
            Duration::from_secs(config.weather_timeout_secs),
        );

        let engine = Self::with_parts(
            config,
            Arc::new(catalog),
            Arc::new(classifier),
            Arc::new(source),
        )?;

        tracing::info!(
            "Validation engine ready in {:.2?} ({} crops, {} model)",
            start.elapsed(),
            engine.catalog.len(),
            if engine.classifier.has_learned_model() { "learned" } else { "fallback" }
        );
        Ok(engine)
    }

    /// Assemble from pre-built parts
    pub fn with_parts(
        config: EngineConfig,
        catalog: Arc<CropCatalog>,
        classifier: Arc<LandUseClassifier>,
        source: Arc<dyn WeatherSource>,
    ) -> Result<Self> {
        config.validate()?;
        let weights = ConfidenceWeights::new(config.land_use_weight, config.yield_weight)?;
        let area_limits = AreaLimits::new(config.min_parcel_area_m2, config.max_parcel_area_m2)?;
        let overlap = OverlapDetector::new(config.overlap_threshold)?.with_area_limits(area_limits);

        Ok(Self {
            weather: WeatherFallbackProvider::new(source, config.weather_lookback_days),
            orchestrator: DecisionOrchestrator::new(weights),
            overlap,
            catalog,
            classifier,
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn catalog(&self) -> &CropCatalog {
        &self.catalog
    }

    pub fn overlap_detector(&self) -> &OverlapDetector {
        &self.overlap
    }

    pub fn weather_provider(&self) -> &WeatherFallbackProvider {
        &self.weather
    }

    /// Resolve the claimed crop; unknown names become a warning
    fn claimed_profile(&self, request: &ValidationRequest, warnings: &mut Vec<String>) -> Option<&CropProfile> {
        let name = request.claimed_crop.as_deref()?.trim();
        if name.is_empty() {
            return None;
        }
        match self.catalog.get(name) {
            Ok(profile) => Some(profile),
            Err(e) => {
                tracing::warn!("{} - crop outputs omitted", e);
                warnings.push(e.to_string());
                None
            }
        }
    }

    fn resolve_weather(
        &self,
        request: &ValidationRequest,
        profile: Option<&CropProfile>,
        warnings: &mut Vec<String>,
    ) -> Option<WeatherSample> {
        let season = profile.and_then(|p| p.growing_season);
        match self.weather.resolve(request.location, request.explicit_date_range, season) {
            Ok(sample) => Some(sample),
            Err(e) => {
                tracing::warn!("{} - weather treated as unknown", e);
                warnings.push(format!("weather unknown ({}); crop suitability omitted", e));
                None
            }
        }
    }

    /// Validate one parcel; never fails, degradations land in `warnings`
    pub fn validate(&self, request: &ValidationRequest) -> ValidationReport {
        let mut warnings = Vec::new();

        let profile = self.claimed_profile(request, &mut warnings);
        let weather = self.resolve_weather(request, profile, &mut warnings);

        let evidence = FeatureAggregator::evidence(&request.stats, weather.as_ref());
        let classification = self.classifier.classify(&evidence);
        let vegetation_mean = evidence.features.vegetation_mean;

        let (suitability, yield_estimate) = match (profile, weather.as_ref()) {
            (Some(profile), Some(sample)) => {
                let score = CropSuitabilityScorer::score(profile, sample, vegetation_mean);
                let estimate = YieldEstimator::estimate(profile, &score, request.area_ha);
                (Some(score), Some(estimate))
            }
            _ => (None, None),
        };

        let recommended_crops = weather.as_ref().map(|sample| {
            CropRecommender::recommend(
                &self.catalog,
                sample,
                vegetation_mean,
                self.config.recommendation_top_n,
            )
        });

        let final_decision = self.orchestrator.combine(&classification, yield_estimate.as_ref());
        let yield_warning = suitability.as_ref().and_then(|s| s.warning());

        tracing::info!(
            "Parcel {}: {} (prob={:.3}, confidence={:.3})",
            request.parcel_id.as_deref().unwrap_or("-"),
            final_decision.decision.as_str(),
            classification.agricultural_probability,
            final_decision.overall_confidence
        );

        ValidationReport {
            parcel_id: request.parcel_id.clone(),
            decision: final_decision.decision,
            agricultural_probability: classification.agricultural_probability,
            using_learned_model: classification.using_learned_model,
            feature_importance: classification.feature_importance,
            suitability,
            yield_estimate,
            recommended_crops,
            overall_confidence: final_decision.overall_confidence,
            yield_warning,
            weather,
            warnings,
        }
    }

    /// Validate many parcels in parallel; output order matches input order
    pub fn validate_batch(&self, requests: &[ValidationRequest]) -> Vec<ValidationReport> {
        requests.par_iter().map(|r| self.validate(r)).collect()
    }

    /// Crop recommendations for a location without a land-use verdict
    pub fn recommend(
        &self,
        location: GeoPoint,
        explicit_range: Option<DateRange>,
        vegetation_mean: f64,
        top_n: Option<usize>,
    ) -> std::result::Result<(WeatherSample, Vec<RankedCrop>), ValidationError> {
        let sample = self.weather.resolve(location, explicit_range, None)?;
        let ranked = CropRecommender::recommend(
            &self.catalog,
            &sample,
            vegetation_mean,
            top_n.unwrap_or(self.config.recommendation_top_n),
        );
        Ok((sample, ranked))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result as CoreResult;
    use chrono::NaiveDate;

    struct FixedWeather(Option<WeatherSample>);

    impl WeatherSource for FixedWeather {
        fn fetch(&self, _location: GeoPoint, window: &DateRange) -> CoreResult<WeatherSample> {
            match &self.0 {
                Some(sample) => Ok(WeatherSample {
                    period_start: window.start,
                    period_end: window.end,
                    ..sample.clone()
                }),
                None => Err(ValidationError::DataUnavailable("timed out".to_string())),
            }
        }
    }

    fn sample() -> WeatherSample {
        WeatherSample {
            avg_temp_c: 27.0,
            total_rainfall_mm: 2100.0,
            avg_humidity_pct: 82.0,
            avg_soil_moisture: 0.38,
            period_start: NaiveDate::from_ymd_opt(2026, 6, 1).unwrap(),
            period_end: NaiveDate::from_ymd_opt(2026, 9, 30).unwrap(),
            days_sampled: 122,
        }
    }

    fn engine(weather: Option<WeatherSample>) -> ValidationEngine {
        ValidationEngine::with_parts(
            EngineConfig::default(),
            Arc::new(CropCatalog::builtin()),
            Arc::new(LandUseClassifier::fallback_only()),
            Arc::new(FixedWeather(weather)),
        )
        .unwrap()
    }

    fn request(claimed: Option<&str>) -> ValidationRequest {
        ValidationRequest {
            parcel_id: Some("KL-001".to_string()),
            stats: RawParcelStats {
                vegetation_mean: Some(0.55),
                cultivated_fraction: Some(1.0),
                ..Default::default()
            },
            location: GeoPoint::new(10.5, 76.2),
            area_ha: 10.0,
            claimed_crop: claimed.map(str::to_string),
            explicit_date_range: None,
        }
    }

    #[test]
    fn test_unclaimed_confidence_is_probability() {
        let report = engine(Some(sample())).validate(&request(None));
        assert_eq!(report.overall_confidence, report.agricultural_probability);
        assert!(report.suitability.is_none());
        assert_eq!(report.recommended_crops.as_ref().unwrap().len(), 5);
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_claimed_crop_blends_but_keeps_label() {
        let report = engine(Some(sample())).validate(&request(Some("rice")));
        let estimate = report.yield_estimate.as_ref().unwrap();

        let expected = 0.8 * report.agricultural_probability + 0.2 * estimate.feasibility_score;
        assert!((report.overall_confidence - expected).abs() < 1e-12);
        assert_eq!(report.decision, Decision::from_probability(report.agricultural_probability));
        assert_eq!(report.suitability.as_ref().unwrap().crop, "Rice");
    }

    #[test]
    fn test_unknown_crop_is_surfaced_not_fatal() {
        let report = engine(Some(sample())).validate(&request(Some("Durian")));
        assert!(report.yield_estimate.is_none());
        assert!(report.recommended_crops.is_some());
        assert_eq!(report.warnings, vec!["unknown crop 'Durian'".to_string()]);
    }

    #[test]
    fn test_weather_unavailable_degrades() {
        let report = engine(None).validate(&request(Some("Rice")));
        assert!(report.suitability.is_none());
        assert!(report.recommended_crops.is_none());
        assert_eq!(report.overall_confidence, report.agricultural_probability);
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].starts_with("weather unknown"));
    }

    #[test]
    fn test_batch_preserves_order() {
        let mut requests: Vec<ValidationRequest> = (0..20).map(|_| request(None)).collect();
        for (i, r) in requests.iter_mut().enumerate() {
            r.parcel_id = Some(format!("P{}", i));
        }
        let reports = engine(Some(sample())).validate_batch(&requests);
        for (i, report) in reports.iter().enumerate() {
            assert_eq!(report.parcel_id.as_deref(), Some(format!("P{}", i).as_str()));
        }
    }

    #[test]
    fn test_request_deserializes_flat_stats() {
        let request: ValidationRequest = serde_json::from_value(serde_json::json!({
            "vegetation_mean": 0.41,
            "cultivated_fraction": 0.9,
            "location": {"lat": 10.0, "lon": 76.0},
            "area_ha": 2.5,
            "claimed_crop": "Banana"
        }))
        .unwrap();
        assert_eq!(request.stats.vegetation_mean, Some(0.41));
        assert_eq!(request.stats.radar_cross_pol_db, None);
        assert_eq!(request.claimed_crop.as_deref(), Some("Banana"));
    }
}

//! Parcel Validator
//!
//! Decision engine for agricultural parcel claims. Turns pre-aggregated
//! per-parcel statistics and local weather into:
//! - a land-use verdict (PASS / REVIEW / FAIL) with an explainable probability
//! - a crop-suitability and yield-feasibility report for a claimed crop
//! - a ranked list of alternative crops for the same location
//!
//! plus geometric overlap detection against previously accepted parcels.
//!
//! Module layout (leaf-first):
//! - `weather/`: window fallback chain + Open-Meteo archive source
//! - `features`: fixed-shape feature vector
//! - `classifier/`: learned tree ensemble with a weighted fallback formula
//! - `suitability/`: five-parameter crop scoring + reasons
//! - `yield_estimate`, `recommender`, `decision`: yield, top-N, final blend
//! - `overlap/`: GeoJSON validation, overlap fractions, accepted-parcel registry
//! - `engine`: the end-to-end pipeline
//! - `api_server` (feature `api`): axum transport

pub mod catalog;
pub mod classifier;
pub mod config;
pub mod decision;
pub mod engine;
pub mod error;
pub mod features;
pub mod overlap;
pub mod recommender;
pub mod suitability;
pub mod weather;
pub mod yield_estimate;

#[cfg(feature = "api")]
pub mod api_server;

// Re-export commonly used types
pub use catalog::{CropCatalog, CropProfile, GrowingSeason};
pub use classifier::{ClassificationResult, Decision, LandUseClassifier, ScoringStrategy};
pub use config::EngineConfig;
pub use decision::{ConfidenceWeights, DecisionOrchestrator, FinalDecision};
pub use engine::{ValidationEngine, ValidationReport, ValidationRequest};
pub use error::ValidationError;
pub use features::{FeatureAggregator, FeatureVector, LandUseEvidence, RawParcelStats};
pub use overlap::{AreaLimits, OverlapAlert, OverlapDetector, ParcelBoundary, ParcelRegistry};
pub use recommender::{CropRecommender, RankedCrop};
pub use suitability::{CropSuitabilityScorer, SuitabilityScore};
pub use weather::{DateRange, GeoPoint, WeatherFallbackProvider, WeatherSample, WeatherSource};
pub use yield_estimate::{ConfidenceLabel, YieldEstimate, YieldEstimator};

#[cfg(feature = "api")]
pub use api_server::{create_router, AppState};

//! Crop Recommender
//!
//! Scores every catalog entry against one shared weather sample and returns
//! the top-N by overall suitability. Ties keep catalog order.

use crate::catalog::CropCatalog;
use crate::suitability::{CropSuitabilityScorer, SuitabilityScore};
use crate::weather::WeatherSample;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

pub const DEFAULT_TOP_N: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedCrop {
    /// 1-based
    pub rank: usize,
    pub crop: String,
    pub baseline_yield: f64,
    pub suitability: SuitabilityScore,
}

pub struct CropRecommender;

impl CropRecommender {
    pub fn recommend(
        catalog: &CropCatalog,
        weather: &WeatherSample,
        vegetation_mean: f64,
        top_n: usize,
    ) -> Vec<RankedCrop> {
        // par_iter + collect preserves catalog order
        let mut scored: Vec<(usize, SuitabilityScore)> = catalog
            .profiles()
            .par_iter()
            .enumerate()
            .map(|(idx, profile)| (idx, CropSuitabilityScorer::score(profile, weather, vegetation_mean)))
            .collect();

        // Stable sort: equal overall scores keep catalog order
        scored.sort_by(|a, b| b.1.overall.total_cmp(&a.1.overall));

        let ranked: Vec<RankedCrop> = scored
            .into_iter()
            .take(top_n)
            .enumerate()
            .map(|(i, (idx, suitability))| {
                let profile = &catalog.profiles()[idx];
                RankedCrop {
                    rank: i + 1,
                    crop: profile.name.clone(),
                    baseline_yield: profile.baseline_yield,
                    suitability,
                }
            })
            .collect();

        tracing::debug!(
            "Recommended {} of {} crops (best: {})",
            ranked.len(),
            catalog.len(),
            ranked.first().map(|r| r.crop.as_str()).unwrap_or("none")
        );
        ranked
    }
}

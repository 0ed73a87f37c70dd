//! Learned land-use model: gradient-boosted tree ensemble
//!
//! The artifact is a JSON export of a binary-logistic booster:
//!
//! ```json
//! {
//!   "feature_names": ["vegetation_mean", ..., "soil_moisture"],
//!   "base_score": 0.5,
//!   "trees": [{"nodes": [
//!       {"feature": 0, "threshold": 0.3, "left": 1, "right": 2},
//!       {"leaf": -0.8},
//!       {"leaf": 0.6}
//!   ]}],
//!   "importance": {"vegetation_mean": 41.2, "radar_cross_to_co_pol_ratio": 17.9}
//! }
//! ```
//!
//! A split sends `value < threshold` left. Probability is the logistic of the
//! base margin plus the sum of the reached leaves. `importance` is the model's
//! global gain table, normalized once at load.

use super::ScoringStrategy;
use crate::error::{Result, ValidationError};
use crate::features::{FeatureVector, LandUseEvidence};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        leaf: f64,
    },
}

#[derive(Debug, Clone, Deserialize)]
struct Tree {
    nodes: Vec<Node>,
}

#[derive(Debug, Deserialize)]
struct ModelArtifact {
    feature_names: Vec<String>,
    #[serde(default = "default_base_score")]
    base_score: f64,
    trees: Vec<Tree>,
    #[serde(default)]
    importance: BTreeMap<String, f64>,
}

fn default_base_score() -> f64 {
    0.5
}

/// Loaded, validated tree ensemble
#[derive(Debug, Clone)]
pub struct TreeEnsembleModel {
    base_margin: f64,
    trees: Vec<Tree>,
    importance: BTreeMap<String, f64>,
}

fn unavailable(msg: String) -> ValidationError {
    ValidationError::ModelUnavailable(msg)
}

impl Tree {
    /// Children must point forward so evaluation always terminates
    fn check(&self, tree_idx: usize) -> Result<()> {
        if self.nodes.is_empty() {
            return Err(unavailable(format!("tree {} has no nodes", tree_idx)));
        }
        for (i, node) in self.nodes.iter().enumerate() {
            match *node {
                Node::Split { feature, threshold, left, right } => {
                    if feature >= FeatureVector::NAMES.len() {
                        return Err(unavailable(format!(
                            "tree {} node {}: feature index {} out of range",
                            tree_idx, i, feature
                        )));
                    }
                    if !threshold.is_finite() {
                        return Err(unavailable(format!(
                            "tree {} node {}: non-finite threshold",
                            tree_idx, i
                        )));
                    }
                    for child in [left, right] {
                        if child <= i || child >= self.nodes.len() {
                            return Err(unavailable(format!(
                                "tree {} node {}: invalid child {}",
                                tree_idx, i, child
                            )));
                        }
                    }
                }
                Node::Leaf { leaf } => {
                    if !leaf.is_finite() {
                        return Err(unavailable(format!(
                            "tree {} node {}: non-finite leaf",
                            tree_idx, i
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    fn leaf_value(&self, values: &[f64; 8]) -> f64 {
        let mut idx = 0;
        loop {
            match self.nodes[idx] {
                Node::Leaf { leaf } => return leaf,
                Node::Split { feature, threshold, left, right } => {
                    idx = if values[feature] < threshold { left } else { right };
                }
            }
        }
    }
}

/// Normalize a gain table to weights over all features summing to 1.0
fn normalize_importance(raw: &BTreeMap<String, f64>) -> BTreeMap<String, f64> {
    let total: f64 = raw.values().map(|v| v.max(0.0)).sum();
    FeatureVector::NAMES
        .iter()
        .map(|name| {
            let weight = if total > 0.0 {
                raw.get(*name).copied().unwrap_or(0.0).max(0.0) / total
            } else {
                1.0 / FeatureVector::NAMES.len() as f64
            };
            (name.to_string(), weight)
        })
        .collect()
}

impl TreeEnsembleModel {
    /// Parse and validate an artifact
    pub fn from_json(json: &str) -> Result<Self> {
        let artifact: ModelArtifact = serde_json::from_str(json)
            .map_err(|e| unavailable(format!("artifact is not a valid tree ensemble: {}", e)))?;

        if artifact.feature_names != FeatureVector::NAMES {
            return Err(unavailable(format!(
                "feature order mismatch: expected {:?}, got {:?}",
                FeatureVector::NAMES,
                artifact.feature_names
            )));
        }
        if !(artifact.base_score > 0.0 && artifact.base_score < 1.0) {
            return Err(unavailable(format!(
                "base_score must lie in (0, 1), got {}",
                artifact.base_score
            )));
        }
        if artifact.trees.is_empty() {
            return Err(unavailable("model has no trees".to_string()));
        }
        for (i, tree) in artifact.trees.iter().enumerate() {
            tree.check(i)?;
        }
        if let Some(unknown) = artifact
            .importance
            .keys()
            .find(|k| !FeatureVector::NAMES.contains(&k.as_str()))
        {
            return Err(unavailable(format!("importance names unknown feature '{}'", unknown)));
        }

        let b = artifact.base_score;
        Ok(Self {
            base_margin: (b / (1.0 - b)).ln(),
            importance: normalize_importance(&artifact.importance),
            trees: artifact.trees,
        })
    }

    /// Load an artifact from disk
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .map_err(|e| unavailable(format!("cannot read {:?}: {}", path, e)))?;
        let model = Self::from_json(&contents)?;
        tracing::info!("Loaded land-use model from {:?} ({} trees)", path, model.trees.len());
        Ok(model)
    }

    pub fn tree_count(&self) -> usize {
        self.trees.len()
    }

    /// Raw logistic margin
    fn margin(&self, features: &FeatureVector) -> f64 {
        let values = features.to_array();
        self.base_margin + self.trees.iter().map(|t| t.leaf_value(&values)).sum::<f64>()
    }
}

impl ScoringStrategy for TreeEnsembleModel {
    fn name(&self) -> &'static str {
        "tree_ensemble"
    }

    fn is_learned(&self) -> bool {
        true
    }

    fn probability(&self, evidence: &LandUseEvidence) -> Result<f64> {
        let margin = self.margin(&evidence.features);
        let p = 1.0 / (1.0 + (-margin).exp());
        if !p.is_finite() {
            return Err(unavailable("inference produced a non-finite probability".to_string()));
        }
        Ok(p.clamp(0.0, 1.0))
    }

    fn importance(&self) -> BTreeMap<String, f64> {
        self.importance.clone()
    }
}

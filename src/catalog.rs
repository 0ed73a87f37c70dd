//! Crop Catalog
//!
//! Static reference data: ideal growing conditions and baseline yields per crop.
//! Loaded once at process start and shared read-only (behind an `Arc`) by every
//! request. The built-in catalog covers the Kerala region (Kerala Dept. of
//! Agriculture 2023-24 statistics, KAU recommendations, FAO Ecocrop).
//!
//! An external CSV with the same columns can replace the built-in table:
//! `name, baseline_yield, temp_min_c, temp_max_c, rainfall_min_mm,
//! rainfall_max_mm, humidity_min_pct, humidity_max_pct, soil_min, soil_max`
//! and the optional `season_start_month, season_end_month`.

use crate::error::ValidationError;
use anyhow::{Context, Result};
use polars::prelude::*;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Named growing season as an inclusive month range (1-12)
///
/// `start_month > end_month` means the season wraps the year end
/// (e.g. October to January).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrowingSeason {
    pub start_month: u32,
    pub end_month: u32,
}

impl GrowingSeason {
    pub fn new(start_month: u32, end_month: u32) -> std::result::Result<Self, ValidationError> {
        if !(1..=12).contains(&start_month) || !(1..=12).contains(&end_month) {
            return Err(ValidationError::Catalog(format!(
                "growing season months must be 1-12 (got {}-{})",
                start_month, end_month
            )));
        }
        Ok(Self { start_month, end_month })
    }

    pub fn wraps_year_end(&self) -> bool {
        self.start_month > self.end_month
    }
}

/// Ideal growing conditions for one crop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CropProfile {
    pub name: String,

    /// Baseline yield in tonnes per hectare
    pub baseline_yield: f64,

    pub temp_min_c: f64,
    pub temp_max_c: f64,

    pub rainfall_min_mm: f64,
    pub rainfall_max_mm: f64,

    pub humidity_min_pct: f64,
    pub humidity_max_pct: f64,

    /// Volumetric soil moisture (m³/m³)
    pub soil_min: f64,
    pub soil_max: f64,

    pub growing_season: Option<GrowingSeason>,
}

impl CropProfile {
    fn check(&self) -> std::result::Result<(), ValidationError> {
        let ranges = [
            ("temperature", self.temp_min_c, self.temp_max_c),
            ("rainfall", self.rainfall_min_mm, self.rainfall_max_mm),
            ("humidity", self.humidity_min_pct, self.humidity_max_pct),
            ("soil moisture", self.soil_min, self.soil_max),
        ];
        for (label, min, max) in ranges {
            if !(min.is_finite() && max.is_finite()) || min > max {
                return Err(ValidationError::Catalog(format!(
                    "{}: invalid {} range {}-{}",
                    self.name, label, min, max
                )));
            }
        }
        if self.name.trim().is_empty() {
            return Err(ValidationError::Catalog("crop name is empty".to_string()));
        }
        if !(self.baseline_yield.is_finite() && self.baseline_yield >= 0.0) {
            return Err(ValidationError::Catalog(format!(
                "{}: baseline yield must be non-negative",
                self.name
            )));
        }
        Ok(())
    }
}

#[allow(clippy::too_many_arguments)]
fn crop(
    name: &str,
    baseline_yield: f64,
    temp: (f64, f64),
    rainfall: (f64, f64),
    humidity: (f64, f64),
    soil: (f64, f64),
    season: Option<(u32, u32)>,
) -> CropProfile {
    CropProfile {
        name: name.to_string(),
        baseline_yield,
        temp_min_c: temp.0,
        temp_max_c: temp.1,
        rainfall_min_mm: rainfall.0,
        rainfall_max_mm: rainfall.1,
        humidity_min_pct: humidity.0,
        humidity_max_pct: humidity.1,
        soil_min: soil.0,
        soil_max: soil.1,
        growing_season: season.map(|(start_month, end_month)| GrowingSeason { start_month, end_month }),
    }
}

/// Built-in Kerala crop table, in catalog order
fn builtin_profiles() -> Vec<CropProfile> {
    vec![
        // Food crops
        // Rice: paddy needs waterlogged soil; Virippu season Jun-Sep
        crop("Rice", 2.96, (20.0, 35.0), (1500.0, 3000.0), (70.0, 90.0), (0.30, 0.50), Some((6, 9))),
        crop("Tapioca", 25.0, (25.0, 30.0), (1000.0, 2000.0), (60.0, 85.0), (0.15, 0.35), None),
        crop("Banana", 18.0, (15.0, 35.0), (1200.0, 2500.0), (65.0, 90.0), (0.20, 0.40), None),
        crop("Maize", 2.5, (18.0, 27.0), (500.0, 1000.0), (55.0, 80.0), (0.15, 0.35), Some((6, 9))),

        // Plantation crops
        crop("Coconut", 6.0, (27.0, 32.0), (1500.0, 2500.0), (80.0, 90.0), (0.20, 0.40), None),
        crop("Rubber", 1.63, (25.0, 34.0), (2000.0, 4000.0), (75.0, 95.0), (0.20, 0.45), None),
        crop("Tea", 2.0, (13.0, 30.0), (1500.0, 3000.0), (70.0, 90.0), (0.25, 0.45), None),
        crop("Coffee", 1.05, (20.0, 30.0), (1500.0, 2500.0), (70.0, 90.0), (0.20, 0.40), None),
        crop("Arecanut", 1.5, (14.0, 36.0), (1500.0, 5000.0), (70.0, 90.0), (0.20, 0.40), None),
        crop("Cashew", 0.8, (20.0, 35.0), (1000.0, 2000.0), (60.0, 80.0), (0.10, 0.30), None),

        // Spice crops
        crop("Pepper", 0.40, (20.0, 30.0), (2000.0, 3000.0), (75.0, 90.0), (0.25, 0.45), None),
        crop("Cardamom", 0.20, (15.0, 25.0), (1500.0, 4000.0), (75.0, 90.0), (0.30, 0.50), None),
        crop("Ginger", 20.0, (19.0, 30.0), (1500.0, 3000.0), (70.0, 90.0), (0.25, 0.40), Some((5, 12))),
        crop("Turmeric", 25.0, (20.0, 35.0), (1500.0, 2500.0), (70.0, 90.0), (0.25, 0.40), Some((5, 1))),
        crop("Nutmeg", 0.35, (20.0, 30.0), (1500.0, 2500.0), (75.0, 90.0), (0.25, 0.45), None),
        crop("Clove", 0.25, (20.0, 30.0), (1500.0, 2500.0), (75.0, 90.0), (0.25, 0.45), None),
        crop("Vanilla", 0.30, (21.0, 32.0), (1500.0, 3000.0), (75.0, 90.0), (0.25, 0.40), None),
        crop("Cinnamon", 0.40, (20.0, 30.0), (1500.0, 2500.0), (75.0, 90.0), (0.25, 0.40), None),

        // Others
        crop("Sugarcane", 55.0, (20.0, 35.0), (1500.0, 2500.0), (70.0, 85.0), (0.25, 0.45), None),
        // Groundnut: Palakkad dry belt, rabi season Oct-Jan
        crop("Groundnut", 1.3, (25.0, 30.0), (500.0, 1000.0), (50.0, 70.0), (0.10, 0.25), Some((10, 1))),
    ]
}

/// Read-only crop catalog with case-insensitive lookup
#[derive(Debug, Clone)]
pub struct CropCatalog {
    profiles: Vec<CropProfile>,
    index: FxHashMap<String, usize>,
}

fn lookup_key(name: &str) -> String {
    name.trim().to_lowercase()
}

impl CropCatalog {
    /// Build a catalog, preserving the given order
    pub fn from_profiles(profiles: Vec<CropProfile>) -> std::result::Result<Self, ValidationError> {
        if profiles.is_empty() {
            return Err(ValidationError::Catalog("catalog is empty".to_string()));
        }

        let mut index = FxHashMap::default();
        for (i, profile) in profiles.iter().enumerate() {
            profile.check()?;
            if index.insert(lookup_key(&profile.name), i).is_some() {
                return Err(ValidationError::Catalog(format!(
                    "duplicate crop '{}'",
                    profile.name
                )));
            }
        }

        Ok(Self { profiles, index })
    }

    /// The built-in Kerala catalog (20 crops)
    pub fn builtin() -> Self {
        let profiles = builtin_profiles();
        let index = profiles
            .iter()
            .enumerate()
            .map(|(i, p)| (lookup_key(&p.name), i))
            .collect();
        Self { profiles, index }
    }

    /// Load a catalog from CSV
    pub fn from_csv(path: &Path) -> Result<Self> {
        let df = CsvReadOptions::default()
            .with_has_header(true)
            .try_into_reader_with_file_path(Some(path.into()))
            .with_context(|| format!("Failed to create CSV reader: {:?}", path))?
            .finish()
            .with_context(|| format!("Failed to load crop catalog: {:?}", path))?;

        let names = df
            .column("name")
            .with_context(|| "Column 'name' not found")?
            .str()
            .with_context(|| "Column 'name' is not string type")?;

        let numeric = |name: &str| -> Result<Vec<Option<f64>>> {
            let column = df
                .column(name)
                .with_context(|| format!("Column '{}' not found", name))?
                .cast(&DataType::Float64)
                .with_context(|| format!("Column '{}' is not numeric", name))?;
            let values = column
                .f64()
                .with_context(|| format!("Column '{}' is not numeric", name))?
                .into_iter()
                .collect();
            Ok(values)
        };

        let optional_numeric = |name: &str| -> Result<Vec<Option<f64>>> {
            if df.column(name).is_ok() {
                numeric(name)
            } else {
                Ok(vec![None; df.height()])
            }
        };

        let baseline = numeric("baseline_yield")?;
        let temp_min = numeric("temp_min_c")?;
        let temp_max = numeric("temp_max_c")?;
        let rain_min = numeric("rainfall_min_mm")?;
        let rain_max = numeric("rainfall_max_mm")?;
        let hum_min = numeric("humidity_min_pct")?;
        let hum_max = numeric("humidity_max_pct")?;
        let soil_min = numeric("soil_min")?;
        let soil_max = numeric("soil_max")?;
        let season_start = optional_numeric("season_start_month")?;
        let season_end = optional_numeric("season_end_month")?;

        let mut profiles = Vec::with_capacity(df.height());
        for idx in 0..df.height() {
            let name = names
                .get(idx)
                .with_context(|| format!("Row {}: missing crop name", idx + 1))?;

            let required = |values: &[Option<f64>], column: &str| -> Result<f64> {
                values[idx].with_context(|| format!("Row {} ({}): missing {}", idx + 1, name, column))
            };

            let growing_season = match (season_start[idx], season_end[idx]) {
                (Some(start), Some(end)) => {
                    if start.fract() != 0.0 || end.fract() != 0.0 {
                        return Err(ValidationError::Catalog(format!(
                            "Row {} ({}): season months must be whole numbers (got {}-{})",
                            idx + 1,
                            name,
                            start,
                            end
                        ))
                        .into());
                    }
                    Some(GrowingSeason::new(start as u32, end as u32)?)
                }
                _ => None,
            };

            profiles.push(CropProfile {
                name: name.to_string(),
                baseline_yield: required(&baseline, "baseline_yield")?,
                temp_min_c: required(&temp_min, "temp_min_c")?,
                temp_max_c: required(&temp_max, "temp_max_c")?,
                rainfall_min_mm: required(&rain_min, "rainfall_min_mm")?,
                rainfall_max_mm: required(&rain_max, "rainfall_max_mm")?,
                humidity_min_pct: required(&hum_min, "humidity_min_pct")?,
                humidity_max_pct: required(&hum_max, "humidity_max_pct")?,
                soil_min: required(&soil_min, "soil_min")?,
                soil_max: required(&soil_max, "soil_max")?,
                growing_season,
            });
        }

        let catalog = Self::from_profiles(profiles)?;
        tracing::info!("Loaded {} crop profiles from {:?}", catalog.len(), path);
        Ok(catalog)
    }

    /// External CSV when configured, built-in table otherwise
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::from_csv(p),
            None => {
                tracing::info!("Using built-in crop catalog");
                Ok(Self::builtin())
            }
        }
    }

    /// Look up a crop by name (case-insensitive, surrounding whitespace ignored)
    pub fn get(&self, name: &str) -> std::result::Result<&CropProfile, ValidationError> {
        self.index
            .get(&lookup_key(name))
            .map(|&i| &self.profiles[i])
            .ok_or_else(|| ValidationError::UnknownCrop(name.trim().to_string()))
    }

    /// Profiles in catalog order
    pub fn profiles(&self) -> &[CropProfile] {
        &self.profiles
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_builtin_catalog_is_consistent() {
        let catalog = CropCatalog::builtin();
        assert_eq!(catalog.len(), 20);
        // Rebuilding through the checked constructor must succeed
        let rebuilt = CropCatalog::from_profiles(catalog.profiles().to_vec()).unwrap();
        assert_eq!(rebuilt.len(), 20);
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let catalog = CropCatalog::builtin();
        let rice = catalog.get("  RICE ").unwrap();
        assert_eq!(rice.name, "Rice");
        assert_eq!(rice.rainfall_min_mm, 1500.0);
        assert_eq!(rice.growing_season, Some(GrowingSeason { start_month: 6, end_month: 9 }));
    }

    #[test]
    fn test_unknown_crop() {
        let catalog = CropCatalog::builtin();
        assert_eq!(
            catalog.get("Durian").unwrap_err(),
            ValidationError::UnknownCrop("Durian".to_string())
        );
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let mut profiles = builtin_profiles();
        let mut dup = profiles[0].clone();
        dup.name = "rice".to_string();
        profiles.push(dup);
        assert!(matches!(
            CropCatalog::from_profiles(profiles),
            Err(ValidationError::Catalog(_))
        ));
    }

    #[test]
    fn test_inverted_range_rejected() {
        let mut profile = builtin_profiles().remove(0);
        profile.temp_min_c = 40.0;
        assert!(CropCatalog::from_profiles(vec![profile]).is_err());
    }

    #[test]
    fn test_season_month_bounds() {
        assert!(GrowingSeason::new(0, 5).is_err());
        assert!(GrowingSeason::new(10, 1).unwrap().wraps_year_end());
        assert!(!GrowingSeason::new(6, 9).unwrap().wraps_year_end());
    }

    #[test]
    fn test_from_csv() {
        let path = std::env::temp_dir().join(format!("crop_catalog_{}.csv", std::process::id()));
        fs::write(
            &path,
            "name,baseline_yield,temp_min_c,temp_max_c,rainfall_min_mm,rainfall_max_mm,humidity_min_pct,humidity_max_pct,soil_min,soil_max,season_start_month,season_end_month\n\
             Millet,1.2,24,32,400,900,40,70,0.10,0.30,6,9\n\
             Jackfruit,30,22,35,1500,3000,70,90,0.20,0.40,,\n",
        )
        .unwrap();

        let catalog = CropCatalog::from_csv(&path).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(catalog.len(), 2);
        let millet = catalog.get("millet").unwrap();
        assert_eq!(millet.temp_min_c, 24.0);
        assert_eq!(millet.growing_season, Some(GrowingSeason { start_month: 6, end_month: 9 }));
        assert_eq!(catalog.get("Jackfruit").unwrap().growing_season, None);
        assert_eq!(catalog.profiles()[0].name, "Millet");
    }

    #[test]
    fn test_fractional_season_month_rejected() {
        let path = std::env::temp_dir().join(format!("crop_catalog_frac_{}.csv", std::process::id()));
        fs::write(
            &path,
            "name,baseline_yield,temp_min_c,temp_max_c,rainfall_min_mm,rainfall_max_mm,humidity_min_pct,humidity_max_pct,soil_min,soil_max,season_start_month,season_end_month\n\
             Millet,1.2,24,32,400,900,40,70,0.10,0.30,6.7,9\n",
        )
        .unwrap();

        let result = CropCatalog::from_csv(&path);
        fs::remove_file(&path).ok();

        let err = result.unwrap_err();
        assert!(err.to_string().contains("whole numbers"), "got {}", err);
    }
}

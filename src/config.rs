// ⚙️ Atlas Configuration - Rules as data
//
// Dataset paths and playback/presentation knobs, loaded from JSON. The year
// range and baseline year are compile-time constants and deliberately absent.

use crate::atlas::{AnomalyAtlas, AtlasOptions};
use crate::color::DEFAULT_MIN_SPREAD;
use crate::controls::DEFAULT_PRESETS;
use crate::error::AtlasError;
use crate::playback::TickPolicy;
use crate::records::{load_boundaries, load_temperature_csv};
use crate::resolver::load_aliases;
use crate::{MAX_YEAR, MIN_YEAR};
use anyhow::{Context as AnyhowContext, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AtlasConfig {
    /// Per-country annual temperatures (`Country,Year,AvgTemp`)
    #[serde(default = "default_temperature_csv")]
    pub temperature_csv: PathBuf,

    /// GeoJSON FeatureCollection of country boundaries
    #[serde(default = "default_boundaries_geojson")]
    pub boundaries_geojson: PathBuf,

    /// Optional alias overrides (`[{"raw": ..., "canonical": ...}]`)
    #[serde(default)]
    pub aliases_json: Option<PathBuf>,

    #[serde(default = "default_min_spread")]
    pub min_spread: f64,

    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,

    #[serde(default = "default_late_tick_ms")]
    pub late_tick_ms: u64,

    #[serde(default = "default_late_from_year")]
    pub late_from_year: i32,

    #[serde(default = "default_presets")]
    pub presets: Vec<i32>,

    #[serde(default = "default_server_addr")]
    pub server_addr: String,
}

fn default_temperature_csv() -> PathBuf {
    PathBuf::from("public/assets/data/country_annual_temp.csv")
}

fn default_boundaries_geojson() -> PathBuf {
    PathBuf::from("public/assets/data/countries.geojson")
}

fn default_min_spread() -> f64 {
    DEFAULT_MIN_SPREAD
}

fn default_tick_ms() -> u64 {
    200
}

fn default_late_tick_ms() -> u64 {
    350
}

fn default_late_from_year() -> i32 {
    1990
}

fn default_presets() -> Vec<i32> {
    DEFAULT_PRESETS.to_vec()
}

fn default_server_addr() -> String {
    "0.0.0.0:3000".to_string()
}

impl Default for AtlasConfig {
    fn default() -> Self {
        AtlasConfig {
            temperature_csv: default_temperature_csv(),
            boundaries_geojson: default_boundaries_geojson(),
            aliases_json: None,
            min_spread: default_min_spread(),
            tick_ms: default_tick_ms(),
            late_tick_ms: default_late_tick_ms(),
            late_from_year: default_late_from_year(),
            presets: default_presets(),
            server_addr: default_server_addr(),
        }
    }
}

impl AtlasConfig {
    /// Load config from a JSON file
    ///
    /// Relative dataset paths are taken relative to the config file's directory.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let mut config = Self::from_json(&content)?;
        if let Some(dir) = path.parent() {
            config.rebase(dir);
        }
        Ok(config)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: AtlasConfig =
            serde_json::from_str(json).context("Failed to parse config JSON")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> std::result::Result<(), AtlasError> {
        if !self.min_spread.is_finite() || self.min_spread <= 0.0 {
            return Err(AtlasError::InvalidConfig(format!(
                "min_spread must be positive, got {}",
                self.min_spread
            )));
        }
        if self.tick_ms == 0 || self.late_tick_ms == 0 {
            return Err(AtlasError::InvalidConfig(
                "tick intervals must be non-zero".to_string(),
            ));
        }
        if self.presets.is_empty() {
            return Err(AtlasError::InvalidConfig("preset list is empty".to_string()));
        }
        if let Some(bad) = self
            .presets
            .iter()
            .find(|y| !(MIN_YEAR..=MAX_YEAR).contains(*y))
        {
            return Err(AtlasError::InvalidConfig(format!(
                "preset year {} outside {}..={}",
                bad, MIN_YEAR, MAX_YEAR
            )));
        }
        Ok(())
    }

    pub fn tick_policy(&self) -> TickPolicy {
        TickPolicy {
            interval: Duration::from_millis(self.tick_ms),
            late_interval: Duration::from_millis(self.late_tick_ms),
            late_from: self.late_from_year,
        }
    }

    /// Load both datasets (plus alias overrides) and build the atlas
    pub fn load_atlas(&self) -> Result<AnomalyAtlas> {
        let records = load_temperature_csv(&self.temperature_csv)?;
        let features = load_boundaries(&self.boundaries_geojson)?;

        let aliases = match &self.aliases_json {
            Some(path) => load_aliases(path)?,
            None => Vec::new(),
        };

        let options = AtlasOptions {
            aliases,
            min_spread: self.min_spread,
        };

        let atlas = AnomalyAtlas::build_with(features, &records, options)
            .context("Failed to build anomaly atlas")?;
        Ok(atlas)
    }

    fn rebase(&mut self, dir: &Path) {
        let rebase = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = dir.join(&*p);
            }
        };
        rebase(&mut self.temperature_csv);
        rebase(&mut self.boundaries_geojson);
        if let Some(aliases) = self.aliases_json.as_mut() {
            rebase(aliases);
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("warming-atlas-{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_defaults_from_empty_json() {
        let config = AtlasConfig::from_json("{}").unwrap();

        assert_eq!(config, AtlasConfig::default());
        assert_eq!(config.presets, vec![1900, 1950, 2000, 2015]);
        assert_eq!(config.tick_policy(), TickPolicy::default());
    }

    #[test]
    fn test_overrides() {
        let config = AtlasConfig::from_json(
            r#"{"tick_ms": 50, "late_tick_ms": 80, "late_from_year": 2000, "presets": [1900, 1980]}"#,
        )
        .unwrap();

        let policy = config.tick_policy();
        assert_eq!(policy.interval_for(1999), Duration::from_millis(50));
        assert_eq!(policy.interval_for(2000), Duration::from_millis(80));
        assert_eq!(config.presets, vec![1900, 1980]);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(AtlasConfig::from_json(r#"{"min_spread": -1.0}"#).is_err());
        assert!(AtlasConfig::from_json(r#"{"tick_ms": 0}"#).is_err());
        assert!(AtlasConfig::from_json(r#"{"presets": []}"#).is_err());
        assert!(AtlasConfig::from_json(r#"{"presets": [1900, 2020]}"#).is_err());
        assert!(AtlasConfig::from_json("[1, 2]").is_err());
    }

    #[test]
    fn test_from_file_loads_atlas() {
        let dir = scratch_dir();

        fs::write(
            dir.join("temps.csv"),
            "Country,Year,AvgTemp\nUnited States,1900,10.0\nUnited States,2000,11.5\n",
        )
        .unwrap();
        fs::write(
            dir.join("world.geojson"),
            r#"{"type": "FeatureCollection", "features": [
                {"type": "Feature", "id": "USA", "properties": {"name": "United States of America"}, "geometry": null}
            ]}"#,
        )
        .unwrap();
        fs::write(
            dir.join("atlas.json"),
            r#"{"temperature_csv": "temps.csv", "boundaries_geojson": "world.geojson"}"#,
        )
        .unwrap();

        let config = AtlasConfig::from_file(dir.join("atlas.json")).unwrap();
        assert_eq!(config.temperature_csv, dir.join("temps.csv"));

        let atlas = config.load_atlas().unwrap();
        assert_eq!(atlas.feature("USA").unwrap().canonical, "United States");
        assert_eq!(atlas.delta("United States", 2000), Some(1.5));

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_missing_dataset_is_an_error() {
        let dir = scratch_dir();
        let config = AtlasConfig {
            temperature_csv: dir.join("missing.csv"),
            ..AtlasConfig::default()
        };

        let err = config.load_atlas().unwrap_err();
        assert!(format!("{:#}", err).contains("missing.csv"));

        fs::remove_dir_all(&dir).ok();
    }
}

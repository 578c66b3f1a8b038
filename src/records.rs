// 🗺️ Raw Records - Boundary features + temperature rows
// The two independently sourced datasets, exactly as the loaders hand them over.
//
// Boundaries are keyed by political display names ("United States of America"),
// the temperature table by its own convention ("United States"). Nothing here
// tries to reconcile them: that is the resolver's job.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Read;
use std::path::Path;

// ============================================================================
// GEO FEATURE
// ============================================================================

/// One boundary feature: id, opaque shape and raw display name.
///
/// The core only ever reads `id` and `name`; `geometry` is passed through
/// untouched to whoever paints it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoFeature {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub geometry: serde_json::Value,
}

impl GeoFeature {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        GeoFeature {
            id: id.into(),
            name: name.into(),
            geometry: serde_json::Value::Null,
        }
    }

    /// Builder pattern: attach the shape
    pub fn with_geometry(mut self, geometry: serde_json::Value) -> Self {
        self.geometry = geometry;
        self
    }
}

// ============================================================================
// TEMPERATURE RECORD
// ============================================================================

/// One row of the per-country annual temperature table.
///
/// CSV header: `Country,Year,AvgTemp`. An empty `AvgTemp` cell is `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemperatureRecord {
    #[serde(rename = "Country")]
    pub entity: String,

    #[serde(rename = "Year")]
    pub year: i32,

    #[serde(rename = "AvgTemp")]
    pub value: Option<f64>,
}

impl TemperatureRecord {
    pub fn new(entity: impl Into<String>, year: i32, value: Option<f64>) -> Self {
        TemperatureRecord {
            entity: entity.into(),
            year,
            value,
        }
    }

    /// The value, if present and finite (NaN and infinities count as absent)
    pub fn numeric_value(&self) -> Option<f64> {
        self.value.filter(|v| v.is_finite())
    }
}

// ============================================================================
// LOADERS
// ============================================================================

/// Load the temperature table from a CSV file
pub fn load_temperature_csv(csv_path: &Path) -> Result<Vec<TemperatureRecord>> {
    let file = fs::File::open(csv_path)
        .with_context(|| format!("Failed to open temperature CSV: {:?}", csv_path))?;
    parse_temperature_csv(file)
}

/// Parse temperature rows from any CSV reader
pub fn parse_temperature_csv<R: Read>(reader: R) -> Result<Vec<TemperatureRecord>> {
    let mut rdr = csv::Reader::from_reader(reader);

    let mut records = Vec::new();
    for (index, result) in rdr.deserialize().enumerate() {
        let record: TemperatureRecord = result
            .with_context(|| format!("Failed to deserialize temperature row {}", index + 1))?;
        records.push(record);
    }

    Ok(records)
}

/// Load boundary features from a GeoJSON FeatureCollection file
pub fn load_boundaries(geojson_path: &Path) -> Result<Vec<GeoFeature>> {
    let content = fs::read_to_string(geojson_path)
        .with_context(|| format!("Failed to read boundaries file: {:?}", geojson_path))?;
    parse_boundaries(&content)
}

/// Parse a GeoJSON FeatureCollection into boundary features
///
/// Name comes from `properties.name`, then `NAME`, then `ADMIN`.
/// Id comes from `feature.id`, then `properties.iso_a3`, then the feature index.
/// Features without any usable name are skipped.
pub fn parse_boundaries(geojson: &str) -> Result<Vec<GeoFeature>> {
    let root: serde_json::Value =
        serde_json::from_str(geojson).context("Failed to parse boundaries GeoJSON")?;

    let features = root
        .get("features")
        .and_then(|f| f.as_array())
        .context("GeoJSON has no `features` array")?;

    let mut boundaries = Vec::with_capacity(features.len());
    for (index, feature) in features.iter().enumerate() {
        let properties = feature.get("properties");

        let name = ["name", "NAME", "ADMIN"]
            .iter()
            .find_map(|key| properties.and_then(|p| p.get(*key)).and_then(|v| v.as_str()));

        let Some(name) = name else {
            tracing::debug!(index, "skipping boundary feature without a name");
            continue;
        };

        let id = match feature.get("id") {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(serde_json::Value::Number(n)) => n.to_string(),
            _ => properties
                .and_then(|p| p.get("iso_a3"))
                .and_then(|v| v.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| index.to_string()),
        };

        let geometry = feature
            .get("geometry")
            .cloned()
            .unwrap_or(serde_json::Value::Null);

        boundaries.push(GeoFeature::new(id, name).with_geometry(geometry));
    }

    Ok(boundaries)
}

// ============================================================================
// TESTS
// ============================================================================

// 🌍 Anomaly Atlas - Build-once reconciliation of the two datasets
//
// boundaries ─┐
//             ├─ NameResolver ─┐
// records ────┴─ BaselineIndex ┴─ AnomalyProvider ─ ColorScale
//
// Everything in here is immutable after `build`, so one atlas can back any
// number of map instances (and, being Send + Sync, the HTTP API).

use crate::anomaly::AnomalyProvider;
use crate::baseline::BaselineIndex;
use crate::color::{Color, ColorScale, DEFAULT_MIN_SPREAD};
use crate::error::{AtlasError, Result};
use crate::records::{GeoFeature, TemperatureRecord};
use crate::resolver::{AliasRule, NameResolver, Resolution};
use crate::BASELINE_YEAR;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use tracing::{info, warn};

// ============================================================================
// RESOLVED FEATURE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedFeature {
    pub feature: GeoFeature,
    pub canonical: String,
    pub resolution: Resolution,
}

// ============================================================================
// MATCH REPORT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnmatchedFeature {
    pub id: String,
    pub name: String,
}

/// How the boundary names lined up with the temperature table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchReport {
    pub feature_count: usize,
    pub exact_count: usize,
    pub alias_count: usize,
    pub heuristic_count: usize,

    /// Features that render as "no data" for every year
    pub unmatched: Vec<UnmatchedFeature>,

    /// Entities with a baseline that no boundary feature resolved to
    pub entities_without_feature: Vec<String>,

    pub entity_count: usize,
    pub delta_count: usize,
    pub domain: [f64; 2],
    pub built_at: DateTime<Utc>,
}

impl MatchReport {
    pub fn matched_count(&self) -> usize {
        self.exact_count + self.alias_count + self.heuristic_count
    }

    pub fn match_rate(&self) -> f64 {
        if self.feature_count == 0 {
            return 0.0;
        }
        self.matched_count() as f64 / self.feature_count as f64
    }

    pub fn is_complete(&self) -> bool {
        self.unmatched.is_empty()
    }

    pub fn summary(&self) -> String {
        format!(
            "{} features: {} matched ({} exact, {} alias, {} heuristic), {} unmatched ({:.1}% match rate); {} entities, {} deltas, domain ±{:.2}°C",
            self.feature_count,
            self.matched_count(),
            self.exact_count,
            self.alias_count,
            self.heuristic_count,
            self.unmatched.len(),
            self.match_rate() * 100.0,
            self.entity_count,
            self.delta_count,
            self.domain[1],
        )
    }
}

// ============================================================================
// ATLAS OPTIONS
// ============================================================================

#[derive(Debug, Clone)]
pub struct AtlasOptions {
    /// Merged over the built-in alias table
    pub aliases: Vec<AliasRule>,

    /// Floor for the color domain half-width, °C
    pub min_spread: f64,
}

impl Default for AtlasOptions {
    fn default() -> Self {
        AtlasOptions {
            aliases: Vec::new(),
            min_spread: DEFAULT_MIN_SPREAD,
        }
    }
}

// ============================================================================
// ANOMALY ATLAS
// ============================================================================

#[derive(Debug, Clone)]
pub struct AnomalyAtlas {
    resolver: NameResolver,
    baseline: BaselineIndex,
    provider: AnomalyProvider,
    scale: ColorScale,
    features: Vec<ResolvedFeature>,
    by_id: HashMap<String, usize>,
    report: MatchReport,
}

impl AnomalyAtlas {
    pub fn build(features: Vec<GeoFeature>, records: &[TemperatureRecord]) -> Result<Self> {
        Self::build_with(features, records, AtlasOptions::default())
    }

    /// Reconcile both datasets
    ///
    /// Fails on an empty boundary set, an empty record set, or a record set
    /// with no usable baseline-year value. Unmatched features never fail the
    /// build; they are listed in the report.
    pub fn build_with(
        features: Vec<GeoFeature>,
        records: &[TemperatureRecord],
        options: AtlasOptions,
    ) -> Result<Self> {
        if features.is_empty() {
            return Err(AtlasError::EmptyBoundaries);
        }
        if records.is_empty() {
            return Err(AtlasError::EmptyRecords);
        }
        if !options.min_spread.is_finite() || options.min_spread <= 0.0 {
            return Err(AtlasError::InvalidConfig(format!(
                "min_spread must be positive, got {}",
                options.min_spread
            )));
        }

        let baseline = BaselineIndex::build(records, BASELINE_YEAR);
        if baseline.is_empty() {
            return Err(AtlasError::NoBaseline { year: BASELINE_YEAR });
        }

        let provider = AnomalyProvider::build(records, &baseline);
        let scale = ColorScale::with_min_spread(&provider.sample(), options.min_spread);
        let resolver = NameResolver::new(baseline.entities()).with_aliases(options.aliases);

        let mut exact_count = 0;
        let mut alias_count = 0;
        let mut heuristic_count = 0;
        let mut unmatched = Vec::new();
        let mut resolved_entities = BTreeSet::new();
        let mut by_id = HashMap::with_capacity(features.len());

        let features: Vec<ResolvedFeature> = features
            .into_iter()
            .enumerate()
            .map(|(index, feature)| {
                let resolution = resolver.resolve_checked(&feature.name);
                match &resolution {
                    Resolution::Exact(_) => exact_count += 1,
                    Resolution::Alias(_) => alias_count += 1,
                    Resolution::Heuristic(_) => heuristic_count += 1,
                    Resolution::Unmatched(_) => {
                        warn!(id = %feature.id, name = %feature.name, "boundary feature has no baseline entity");
                        unmatched.push(UnmatchedFeature {
                            id: feature.id.clone(),
                            name: feature.name.clone(),
                        });
                    }
                }
                if resolution.is_matched() {
                    resolved_entities.insert(resolution.canonical().to_string());
                }
                // First feature wins on duplicate ids
                by_id.entry(feature.id.clone()).or_insert(index);

                ResolvedFeature {
                    canonical: resolution.canonical().to_string(),
                    feature,
                    resolution,
                }
            })
            .collect();

        let entities_without_feature: Vec<String> = baseline
            .entities()
            .filter(|entity| !resolved_entities.contains(*entity))
            .map(str::to_string)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let report = MatchReport {
            feature_count: features.len(),
            exact_count,
            alias_count,
            heuristic_count,
            unmatched,
            entities_without_feature,
            entity_count: baseline.len(),
            delta_count: provider.len(),
            domain: scale.domain(),
            built_at: Utc::now(),
        };

        info!(
            features = report.feature_count,
            matched = report.matched_count(),
            unmatched = report.unmatched.len(),
            entities = report.entity_count,
            deltas = report.delta_count,
            "anomaly atlas built"
        );

        Ok(AnomalyAtlas {
            resolver,
            baseline,
            provider,
            scale,
            features,
            by_id,
            report,
        })
    }

    /// Anomaly for a canonical entity at a year
    pub fn delta(&self, canonical: &str, year: i32) -> Option<f64> {
        self.provider.delta(canonical, year)
    }

    /// Fill color for a canonical entity at a year (no-data color if absent)
    pub fn color_at(&self, canonical: &str, year: i32) -> Color {
        self.scale.color_or_no_data(self.delta(canonical, year))
    }

    pub fn resolve(&self, raw_name: &str) -> String {
        self.resolver.resolve(raw_name)
    }

    pub fn feature(&self, id: &str) -> Option<&ResolvedFeature> {
        self.by_id.get(id).map(|&index| &self.features[index])
    }

    pub fn features(&self) -> &[ResolvedFeature] {
        &self.features
    }

    pub fn scale(&self) -> &ColorScale {
        &self.scale
    }

    pub fn baseline(&self) -> &BaselineIndex {
        &self.baseline
    }

    pub fn provider(&self) -> &AnomalyProvider {
        &self.provider
    }

    pub fn resolver(&self) -> &NameResolver {
        &self.resolver
    }

    pub fn report(&self) -> &MatchReport {
        &self.report
    }
}

// ============================================================================
// TESTS
// ============================================================================

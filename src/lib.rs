// Warming Atlas - Core Library
// Temperature-anomaly choropleth core: reconciliation, observable state,
// playback and rendering. Used by the terminal map, the API server and tests.

pub mod error;
pub mod records;    // Dataset types + CSV/GeoJSON loaders
pub mod resolver;   // Boundary name → temperature entity
pub mod baseline;
pub mod anomaly;
pub mod color;
pub mod atlas;      // Build-once reconciliation of both datasets
mod observable;
pub mod cursor;
pub mod selection;
pub mod playback;
pub mod render;
pub mod controls;   // Slider, number field, preset buttons
pub mod config;
pub mod map;        // One fully wired map instance

// Re-export commonly used types
pub use error::{AtlasError, Result};
pub use records::{
    GeoFeature, TemperatureRecord,
    load_boundaries, load_temperature_csv, parse_boundaries, parse_temperature_csv,
};
pub use resolver::{AliasRule, NameResolver, Resolution, load_aliases};
pub use baseline::BaselineIndex;
pub use anomaly::AnomalyProvider;
pub use color::{Color, ColorScale, LegendStop};
pub use atlas::{AnomalyAtlas, AtlasOptions, MatchReport, ResolvedFeature, UnmatchedFeature};
pub use observable::SubscriptionId;
pub use cursor::{CursorChange, CursorSource, TimeCursor};
pub use selection::{SelectionChange, SelectionState};
pub use playback::{PlaybackController, PlaybackState, TickPolicy};
pub use render::{
    FeatureStyle, Frame, InfoPanel, RenderCoordinator, RenderTarget,
    format_delta, render_frame,
};
pub use controls::{NumberField, PresetButtons, Slider};
pub use config::AtlasConfig;
pub use map::{MapInstance, MapOptions};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// First year on the timeline
pub const MIN_YEAR: i32 = 1900;

/// Last year on the timeline
pub const MAX_YEAR: i32 = 2015;

/// Reference year every anomaly is measured against
pub const BASELINE_YEAR: i32 = 1900;

/// Number of years in `MIN_YEAR..=MAX_YEAR`
pub const YEAR_SPAN: usize = (MAX_YEAR - MIN_YEAR + 1) as usize;

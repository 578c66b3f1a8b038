// 🗺️ Map Instance - One interactive map, fully wired
//
// One cursor, one selection, one playback controller, one render coordinator
// and three widgets, all per instance. Nothing is process-global: two maps
// built from the same atlas never see each other's state.

use crate::atlas::AnomalyAtlas;
use crate::config::AtlasConfig;
use crate::controls::{NumberField, PresetButtons, Slider, DEFAULT_PRESETS};
use crate::cursor::TimeCursor;
use crate::error::Result;
use crate::playback::{PlaybackController, TickPolicy};
use crate::render::{Frame, RenderCoordinator, RenderTarget};
use crate::selection::SelectionState;
use crate::MIN_YEAR;
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Instant;
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct MapOptions {
    pub policy: TickPolicy,
    pub presets: Vec<i32>,
    pub start_year: i32,
}

impl Default for MapOptions {
    fn default() -> Self {
        MapOptions {
            policy: TickPolicy::default(),
            presets: DEFAULT_PRESETS.to_vec(),
            start_year: MIN_YEAR,
        }
    }
}

impl From<&AtlasConfig> for MapOptions {
    fn from(config: &AtlasConfig) -> Self {
        MapOptions {
            policy: config.tick_policy(),
            presets: config.presets.clone(),
            start_year: MIN_YEAR,
        }
    }
}

pub struct MapInstance {
    id: Uuid,
    atlas: Rc<AnomalyAtlas>,
    cursor: TimeCursor,
    selection: SelectionState,
    playback: PlaybackController,
    coordinator: RenderCoordinator,
    slider: Slider,
    number_field: NumberField,
    presets: PresetButtons,
}

impl MapInstance {
    pub fn new(
        atlas: Rc<AnomalyAtlas>,
        target: Rc<RefCell<dyn RenderTarget>>,
        options: MapOptions,
    ) -> Result<Self> {
        let cursor = TimeCursor::starting_at(options.start_year);
        let selection = SelectionState::new();

        // Subscription order is notification order: playback sees a manual
        // scrub (and stops) before the coordinator repaints
        let playback = PlaybackController::new(cursor.clone(), options.policy);
        let presets = PresetButtons::new(cursor.clone(), options.presets)?;
        let slider = Slider::new(cursor.clone());
        let number_field = NumberField::new(cursor.clone());
        let coordinator =
            RenderCoordinator::new(atlas.clone(), cursor.clone(), selection.clone(), target);

        let id = Uuid::new_v4();
        debug!(%id, year = cursor.get(), "map instance created");

        Ok(MapInstance {
            id,
            atlas,
            cursor,
            selection,
            playback,
            coordinator,
            slider,
            number_field,
            presets,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn atlas(&self) -> &AnomalyAtlas {
        &self.atlas
    }

    pub fn cursor(&self) -> &TimeCursor {
        &self.cursor
    }

    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    pub fn playback(&self) -> &PlaybackController {
        &self.playback
    }

    pub fn slider(&self) -> &Slider {
        &self.slider
    }

    pub fn number_field(&self) -> &NumberField {
        &self.number_field
    }

    pub fn presets(&self) -> &PresetButtons {
        &self.presets
    }

    /// Click/tap on a feature: toggles the selection to its canonical entity
    ///
    /// Returns the new selection; unknown feature ids are ignored.
    pub fn click(&self, feature_id: &str) -> Option<String> {
        match self.atlas.feature(feature_id) {
            Some(resolved) => self.selection.toggle(&resolved.canonical),
            None => self.selection.get(),
        }
    }

    /// Drive the playback timer from the host event loop
    pub fn poll(&self, now: Instant) -> usize {
        self.playback.poll(now)
    }

    /// The most recent frame (rendering one if nothing was painted yet)
    pub fn frame(&self) -> Frame {
        self.coordinator
            .last_frame()
            .unwrap_or_else(|| self.coordinator.render())
    }

    pub fn render_count(&self) -> usize {
        self.coordinator.render_count()
    }
}

// ============================================================================
// TESTS
// ============================================================================

// 🎚️ Control Adapters - Slider, number field, preset buttons
//
// Each widget is an independent view of the one TimeCursor: it writes through
// `set_from` with its own source tag and reflects whatever the cursor says via
// its subscription. Widgets never push values into each other.
//
// Views read the cursor's current value rather than the event payload: a
// subscriber that writes the cursor mid fan-out leaves later subscribers
// holding a stale event.

use crate::cursor::{CursorSource, TimeCursor};
use crate::error::{AtlasError, Result};
use crate::observable::SubscriptionId;
use crate::{MAX_YEAR, MIN_YEAR};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Preset years offered by default
pub const DEFAULT_PRESETS: [i32; 4] = [1900, 1950, 2000, 2015];

/// Cursor subscription that is released when the widget goes away
struct Binding {
    cursor: TimeCursor,
    subscription: SubscriptionId,
}

impl Drop for Binding {
    fn drop(&mut self) {
        self.cursor.unsubscribe(self.subscription);
    }
}

// ============================================================================
// SLIDER
// ============================================================================

pub struct Slider {
    binding: Binding,
    position: Rc<Cell<i32>>,
}

impl Slider {
    pub fn new(cursor: TimeCursor) -> Self {
        let position = Rc::new(Cell::new(cursor.get()));

        let view = position.clone();
        let current = cursor.downgrade();
        let subscription = cursor.subscribe(move |change| {
            view.set(current.get().unwrap_or(change.year));
        });

        Slider {
            binding: Binding {
                cursor,
                subscription,
            },
            position,
        }
    }

    /// User dragged the thumb
    pub fn input(&self, position: i32) -> bool {
        self.binding.cursor.set_from(position, CursorSource::Slider)
    }

    /// Arrow-key nudge
    pub fn nudge(&self, delta: i32) -> bool {
        self.binding.cursor.step(delta, CursorSource::Slider)
    }

    pub fn position(&self) -> i32 {
        self.position.get()
    }

    pub fn range(&self) -> (i32, i32) {
        (MIN_YEAR, MAX_YEAR)
    }

    /// Thumb position as a fraction of the track, 0.0..=1.0
    pub fn ratio(&self) -> f64 {
        (self.position() - MIN_YEAR) as f64 / (MAX_YEAR - MIN_YEAR) as f64
    }
}

// ============================================================================
// NUMBER FIELD
// ============================================================================

pub struct NumberField {
    binding: Binding,
    text: Rc<RefCell<String>>,
}

impl NumberField {
    pub fn new(cursor: TimeCursor) -> Self {
        let text = Rc::new(RefCell::new(cursor.get().to_string()));

        let view = text.clone();
        let current = cursor.downgrade();
        let subscription = cursor.subscribe(move |change| {
            *view.borrow_mut() = current.get().unwrap_or(change.year).to_string();
        });

        NumberField {
            binding: Binding {
                cursor,
                subscription,
            },
            text,
        }
    }

    /// User committed `text`; returns true if the cursor moved
    ///
    /// Out-of-range numbers are clamped by the cursor. Anything that leaves
    /// the cursor where it was (garbage, same year, clamped to the current
    /// year) reverts the field to the cursor's value.
    pub fn input(&self, text: &str) -> bool {
        let changed = match text.trim().parse::<i32>() {
            Ok(year) => self.binding.cursor.set_from(year, CursorSource::NumberField),
            Err(_) => false,
        };

        if !changed {
            *self.text.borrow_mut() = self.binding.cursor.get().to_string();
        }
        changed
    }

    pub fn text(&self) -> String {
        self.text.borrow().clone()
    }
}

// ============================================================================
// PRESET BUTTONS
// ============================================================================

pub struct PresetButtons {
    binding: Binding,
    presets: Vec<i32>,
    active: Rc<Cell<Option<usize>>>,
}

impl PresetButtons {
    /// Presets must be non-empty and inside the year range
    pub fn new(cursor: TimeCursor, presets: Vec<i32>) -> Result<Self> {
        if presets.is_empty() {
            return Err(AtlasError::InvalidConfig("preset list is empty".to_string()));
        }
        if let Some(bad) = presets.iter().find(|y| !(MIN_YEAR..=MAX_YEAR).contains(*y)) {
            return Err(AtlasError::InvalidConfig(format!(
                "preset year {} outside {}..={}",
                bad, MIN_YEAR, MAX_YEAR
            )));
        }

        let active = Rc::new(Cell::new(active_index(&presets, cursor.get())));

        let view = active.clone();
        let lookup = presets.clone();
        let current = cursor.downgrade();
        let subscription = cursor.subscribe(move |change| {
            view.set(active_index(&lookup, current.get().unwrap_or(change.year)));
        });

        Ok(PresetButtons {
            binding: Binding {
                cursor,
                subscription,
            },
            presets,
            active,
        })
    }

    /// Press button `index`; false for an unknown index or no change
    pub fn press(&self, index: usize) -> bool {
        match self.presets.get(index) {
            Some(&year) => self.binding.cursor.set_from(year, CursorSource::Preset),
            None => false,
        }
    }

    pub fn presets(&self) -> &[i32] {
        &self.presets
    }

    /// Index of the preset matching the cursor, if any
    pub fn active(&self) -> Option<usize> {
        self.active.get()
    }
}

fn active_index(presets: &[i32], year: i32) -> Option<usize> {
    presets.iter().position(|&preset| preset == year)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn widgets() -> (TimeCursor, Slider, NumberField, PresetButtons) {
        let cursor = TimeCursor::new();
        let slider = Slider::new(cursor.clone());
        let field = NumberField::new(cursor.clone());
        let presets = PresetButtons::new(cursor.clone(), DEFAULT_PRESETS.to_vec()).unwrap();
        (cursor, slider, field, presets)
    }

    #[test]
    fn test_initial_state_reflects_cursor() {
        let (_cursor, slider, field, presets) = widgets();

        assert_eq!(slider.position(), 1900);
        assert_eq!(field.text(), "1900");
        assert_eq!(presets.active(), Some(0));
        assert_eq!(slider.ratio(), 0.0);
    }

    #[test]
    fn test_slider_drives_everyone() {
        let (cursor, slider, field, presets) = widgets();

        assert!(slider.input(1950));

        assert_eq!(cursor.get(), 1950);
        assert_eq!(field.text(), "1950");
        assert_eq!(presets.active(), Some(1));

        slider.nudge(1);
        assert_eq!(field.text(), "1951");
        assert_eq!(presets.active(), None);
    }

    #[test]
    fn test_number_field_drives_everyone() {
        let (cursor, slider, field, presets) = widgets();

        assert!(field.input(" 2000 "));

        assert_eq!(cursor.get(), 2000);
        assert_eq!(slider.position(), 2000);
        assert_eq!(presets.active(), Some(2));
    }

    #[test]
    fn test_number_field_clamps_and_reverts() {
        let (cursor, _slider, field, _presets) = widgets();

        assert!(field.input("3000"));
        assert_eq!(cursor.get(), 2015);
        assert_eq!(field.text(), "2015");

        // Already at the top: nothing moves, field shows the real year
        assert!(!field.input("2500"));
        assert_eq!(field.text(), "2015");

        assert!(!field.input("nineteen-fifty"));
        assert_eq!(field.text(), "2015");
        assert_eq!(cursor.get(), 2015);
    }

    #[test]
    fn test_presets_drive_everyone() {
        let (cursor, slider, field, presets) = widgets();

        assert!(presets.press(3));
        assert_eq!(cursor.get(), 2015);
        assert_eq!(slider.position(), 2015);
        assert_eq!(field.text(), "2015");
        assert_eq!(slider.ratio(), 1.0);

        assert!(!presets.press(3));
        assert!(!presets.press(99));
    }

    #[test]
    fn test_external_writes_are_reflected() {
        let (cursor, slider, field, presets) = widgets();

        cursor.set(1800);
        assert_eq!(slider.position(), 1900);

        cursor.set(1999);
        assert_eq!(slider.position(), 1999);
        assert_eq!(field.text(), "1999");
        assert_eq!(presets.active(), None);
    }

    #[test]
    fn test_write_back_during_notify_keeps_views_current() {
        let cursor = TimeCursor::new();

        // Snaps 1950 to 1960 from inside the fan-out
        let writer = cursor.clone();
        cursor.subscribe(move |change| {
            if change.year == 1950 {
                writer.set(1960);
            }
        });

        let slider = Slider::new(cursor.clone());
        let field = NumberField::new(cursor.clone());
        let presets = PresetButtons::new(cursor.clone(), vec![1950, 1960]).unwrap();

        cursor.set(1950);

        assert_eq!(cursor.get(), 1960);
        assert_eq!(slider.position(), cursor.get());
        assert_eq!(field.text(), "1960");
        assert_eq!(presets.active(), Some(1));
    }

    #[test]
    fn test_invalid_presets_rejected() {
        let cursor = TimeCursor::new();

        assert!(PresetButtons::new(cursor.clone(), vec![]).is_err());
        assert!(PresetButtons::new(cursor.clone(), vec![1900, 1850]).is_err());
        assert!(PresetButtons::new(cursor, vec![1900, 2015]).is_ok());
    }

    #[test]
    fn test_dropped_widgets_unsubscribe() {
        let (cursor, slider, field, presets) = widgets();
        assert_eq!(cursor.subscriber_count(), 3);

        drop(slider);
        drop(field);
        drop(presets);
        assert_eq!(cursor.subscriber_count(), 0);
    }
}

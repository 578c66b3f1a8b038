// ⏱️ Time Cursor - The one authoritative "current year"
//
// Invariant: MIN_YEAR <= year <= MAX_YEAR at all times.
// Every writer goes through the clamping setter; every reader sees the same
// value within the same logical tick because notification is synchronous.

use crate::observable::{SubscriptionId, Subscribers};
use crate::{MAX_YEAR, MIN_YEAR};
use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::rc::{Rc, Weak};

/// Who wrote the cursor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CursorSource {
    Playback,
    Slider,
    NumberField,
    Preset,
    External,
}

impl CursorSource {
    /// True for writes coming from a person rather than the playback timer
    pub fn is_manual(&self) -> bool {
        !matches!(self, CursorSource::Playback)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorChange {
    pub year: i32,
    pub previous: i32,
    pub source: CursorSource,
}

struct CursorInner {
    year: Cell<i32>,
    subscribers: Subscribers<CursorChange>,
}

/// Shared handle; clones observe and write the same cursor
#[derive(Clone)]
pub struct TimeCursor {
    inner: Rc<CursorInner>,
}

impl TimeCursor {
    /// Cursor positioned at `MIN_YEAR`
    pub fn new() -> Self {
        Self::starting_at(MIN_YEAR)
    }

    pub fn starting_at(year: i32) -> Self {
        TimeCursor {
            inner: Rc::new(CursorInner {
                year: Cell::new(Self::clamp(year)),
                subscribers: Subscribers::new(),
            }),
        }
    }

    pub fn clamp(year: i32) -> i32 {
        year.clamp(MIN_YEAR, MAX_YEAR)
    }

    pub fn get(&self) -> i32 {
        self.inner.year.get()
    }

    /// Write from an unspecified external caller
    pub fn set(&self, year: i32) -> bool {
        self.set_from(year, CursorSource::External)
    }

    /// Clamp, store and notify; returns false (and notifies nobody) when the
    /// clamped value equals the current one
    pub fn set_from(&self, year: i32, source: CursorSource) -> bool {
        let clamped = Self::clamp(year);
        let previous = self.inner.year.get();
        if clamped == previous {
            return false;
        }

        self.inner.year.set(clamped);
        self.inner.subscribers.notify(&CursorChange {
            year: clamped,
            previous,
            source,
        });
        true
    }

    pub fn step(&self, delta: i32, source: CursorSource) -> bool {
        self.set_from(self.get().saturating_add(delta), source)
    }

    pub fn subscribe(&self, callback: impl Fn(&CursorChange) + 'static) -> SubscriptionId {
        self.inner.subscribers.subscribe(callback)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.subscribers.unsubscribe(id)
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.len()
    }

    /// Non-owning handle for subscribers that need to read the cursor back
    pub(crate) fn downgrade(&self) -> WeakTimeCursor {
        WeakTimeCursor(Rc::downgrade(&self.inner))
    }
}

/// Weak counterpart of `TimeCursor`; does not keep the cursor alive
#[derive(Clone)]
pub(crate) struct WeakTimeCursor(Weak<CursorInner>);

impl WeakTimeCursor {
    /// Current year, if the cursor still exists
    pub(crate) fn get(&self) -> Option<i32> {
        self.0.upgrade().map(|inner| inner.year.get())
    }
}

impl Default for TimeCursor {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TimeCursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimeCursor")
            .field("year", &self.get())
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn test_set_clamps() {
        let cursor = TimeCursor::new();

        cursor.set(1800);
        assert_eq!(cursor.get(), 1900);

        cursor.set(3000);
        assert_eq!(cursor.get(), 2015);

        cursor.set(1987);
        assert_eq!(cursor.get(), 1987);
    }

    #[test]
    fn test_starting_year_is_clamped() {
        assert_eq!(TimeCursor::starting_at(42).get(), MIN_YEAR);
        assert_eq!(TimeCursor::default().get(), MIN_YEAR);
    }

    #[test]
    fn test_notifies_only_on_change() {
        let cursor = TimeCursor::new();
        let changes = Rc::new(RefCell::new(Vec::new()));

        let c = changes.clone();
        cursor.subscribe(move |change| c.borrow_mut().push(*change));

        assert!(cursor.set_from(1950, CursorSource::Slider));
        assert!(!cursor.set_from(1950, CursorSource::Preset));
        // Clamps to the current value: no notification
        cursor.set(2015);
        assert!(!cursor.set(9999));

        let changes = changes.borrow();
        assert_eq!(changes.len(), 2);
        assert_eq!(
            changes[0],
            CursorChange {
                year: 1950,
                previous: 1900,
                source: CursorSource::Slider
            }
        );
        assert_eq!(changes[1].source, CursorSource::External);
    }

    #[test]
    fn test_clones_share_state() {
        let cursor = TimeCursor::new();
        let view = cursor.clone();

        cursor.set(2000);
        assert_eq!(view.get(), 2000);
    }

    #[test]
    fn test_subscriber_sees_new_value_synchronously() {
        let cursor = TimeCursor::new();
        let observed = Rc::new(Cell::new(0));

        let reader = cursor.clone();
        let o = observed.clone();
        cursor.subscribe(move |change| {
            assert_eq!(reader.get(), change.year);
            o.set(change.year);
        });

        cursor.set(1975);
        assert_eq!(observed.get(), 1975);
    }

    #[test]
    fn test_unsubscribe() {
        let cursor = TimeCursor::new();
        let calls = Rc::new(Cell::new(0));

        let c = calls.clone();
        let id = cursor.subscribe(move |_| c.set(c.get() + 1));
        cursor.set(1901);
        assert!(cursor.unsubscribe(id));
        cursor.set(1902);

        assert_eq!(calls.get(), 1);
        assert_eq!(cursor.subscriber_count(), 0);
    }

    #[test]
    fn test_step_saturates() {
        let cursor = TimeCursor::starting_at(2014);

        assert!(cursor.step(1, CursorSource::Slider));
        assert!(!cursor.step(1, CursorSource::Slider));
        assert!(cursor.step(i32::MIN, CursorSource::Slider));
        assert_eq!(cursor.get(), MIN_YEAR);
    }
}

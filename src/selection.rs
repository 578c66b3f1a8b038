// 🎯 Selection State - At most one focused entity
//
// Mutated only through toggle/clear; click handlers are the only writers.

use crate::observable::{SubscriptionId, Subscribers};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionChange {
    pub current: Option<String>,
    pub previous: Option<String>,
}

struct SelectionInner {
    current: RefCell<Option<String>>,
    subscribers: Subscribers<SelectionChange>,
}

/// Shared handle; clones observe and write the same selection
#[derive(Clone)]
pub struct SelectionState {
    inner: Rc<SelectionInner>,
}

impl SelectionState {
    pub fn new() -> Self {
        SelectionState {
            inner: Rc::new(SelectionInner {
                current: RefCell::new(None),
                subscribers: Subscribers::new(),
            }),
        }
    }

    pub fn get(&self) -> Option<String> {
        self.inner.current.borrow().clone()
    }

    pub fn is_selected(&self, name: &str) -> bool {
        self.inner.current.borrow().as_deref() == Some(name)
    }

    /// Select `name`, or clear the selection if `name` is already selected
    pub fn toggle(&self, name: &str) -> Option<String> {
        let next = if self.is_selected(name) {
            None
        } else {
            Some(name.to_string())
        };
        self.replace(next.clone());
        next
    }

    pub fn clear(&self) {
        self.replace(None);
    }

    pub fn subscribe(&self, callback: impl Fn(&SelectionChange) + 'static) -> SubscriptionId {
        self.inner.subscribers.subscribe(callback)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.subscribers.unsubscribe(id)
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.len()
    }

    fn replace(&self, next: Option<String>) {
        // Borrow released before fan-out so subscribers can read or toggle
        let previous = self.inner.current.replace(next.clone());
        if previous == next {
            return;
        }

        self.inner.subscribers.notify(&SelectionChange {
            current: next,
            previous,
        });
    }
}

impl Default for SelectionState {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SelectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelectionState")
            .field("current", &self.get())
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_toggle_twice_clears() {
        let selection = SelectionState::new();

        selection.toggle("France");
        assert_eq!(selection.get(), Some("France".to_string()));

        selection.toggle("France");
        assert_eq!(selection.get(), None);
    }

    #[test]
    fn test_toggle_other_replaces() {
        let selection = SelectionState::new();

        selection.toggle("France");
        assert_eq!(selection.toggle("Chile"), Some("Chile".to_string()));
        assert!(selection.is_selected("Chile"));
        assert!(!selection.is_selected("France"));
    }

    #[test]
    fn test_notifications() {
        let selection = SelectionState::new();
        let changes = Rc::new(RefCell::new(Vec::new()));

        let c = changes.clone();
        selection.subscribe(move |change| c.borrow_mut().push(change.clone()));

        selection.clear(); // already empty: silent
        selection.toggle("France");
        selection.toggle("Chile");
        selection.clear();

        let changes = changes.borrow();
        assert_eq!(changes.len(), 3);
        assert_eq!(changes[0].current.as_deref(), Some("France"));
        assert_eq!(changes[1].previous.as_deref(), Some("France"));
        assert_eq!(changes[2].current, None);
    }

    #[test]
    fn test_subscriber_can_read_state() {
        let selection = SelectionState::new();
        let seen = Rc::new(Cell::new(false));

        let reader = selection.clone();
        let s = seen.clone();
        selection.subscribe(move |change| {
            s.set(reader.get() == change.current);
        });

        selection.toggle("Peru");
        assert!(seen.get());
    }
}

//! Synchronous subscriber lists shared by the cursor and the selection.
//!
//! Notification runs on the caller's stack. The list is snapshotted before
//! fan-out, so a subscriber may unsubscribe itself (or anyone else), subscribe
//! new callbacks, or write back into the state it is observing.

use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Handle returned by `subscribe`, used to `unsubscribe`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriptionId(u64);

type Callback<E> = Rc<dyn Fn(&E)>;

pub(crate) struct Subscribers<E> {
    next_id: Cell<u64>,
    entries: RefCell<Vec<(SubscriptionId, Callback<E>)>>,
}

impl<E> Subscribers<E> {
    pub(crate) fn new() -> Self {
        Subscribers {
            next_id: Cell::new(1),
            entries: RefCell::new(Vec::new()),
        }
    }

    pub(crate) fn subscribe(&self, callback: impl Fn(&E) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.entries.borrow_mut().push((id, Rc::new(callback)));
        id
    }

    /// Returns false if the id was not (or no longer) subscribed
    pub(crate) fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut entries = self.entries.borrow_mut();
        let before = entries.len();
        entries.retain(|(entry_id, _)| *entry_id != id);
        entries.len() != before
    }

    pub(crate) fn notify(&self, event: &E) {
        let snapshot: Vec<(SubscriptionId, Callback<E>)> = self.entries.borrow().clone();

        for (id, callback) in snapshot {
            // Skip anyone removed earlier in this same fan-out
            if self.is_subscribed(id) {
                callback(event);
            }
        }
    }

    pub(crate) fn is_subscribed(&self, id: SubscriptionId) -> bool {
        self.entries.borrow().iter().any(|(entry_id, _)| *entry_id == id)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.borrow().len()
    }
}

//! Mutation events fired by collections.

use std::fmt;
use std::rc::Rc;

use crate::value::{Key, Value};

/// When, relative to a write, an event fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Before a value is stored.
    Adding,
    /// After a value was stored.
    Added,
    /// Before a value is deleted or replaced.
    Removing,
    /// After a value was deleted or replaced.
    Removed,
}

impl EventKind {
    /// The event name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Adding => "adding",
            Self::Added => "added",
            Self::Removing => "removing",
            Self::Removed => "removed",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single notification.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionEvent {
    /// The event kind.
    pub kind: EventKind,
    /// The key being written or removed.
    pub key: Key,
    /// The value being added, or the value being removed.
    pub value: Value,
}

type Callback = Rc<dyn Fn(&CollectionEvent)>;

/// Registered listeners, in registration order.
#[derive(Clone, Default)]
pub(crate) struct Listeners {
    entries: Vec<(EventKind, Callback)>,
}

impl Listeners {
    pub(crate) fn add(&mut self, kind: EventKind, callback: Callback) {
        self.entries.push((kind, callback));
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn fire(&self, kind: EventKind, key: &Key, value: &Value) {
        let mut event = None;
        for (listens_to, callback) in &self.entries {
            if *listens_to == kind {
                let event = event.get_or_insert_with(|| CollectionEvent {
                    kind,
                    key: key.clone(),
                    value: value.clone(),
                });
                callback(event);
            }
        }
    }
}

impl fmt::Debug for Listeners {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|(kind, _)| kind))
            .finish()
    }
}

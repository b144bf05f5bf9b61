//! Time-ordered event storage

use crate::{Error, Event, Result};
use tracing::info;

/// Immutable sequence of events sorted ascending by due time.
///
/// Events that share a due time keep their original relative order. The
/// store is read-only after [`EventStore::build`], so it can be shared across
/// readers behind an `Arc` without locking.
#[derive(Debug, Clone, Default)]
pub struct EventStore {
    events: Vec<Event>,
}

impl EventStore {
    /// Builds a store from events in any order.
    ///
    /// Fails with [`Error::InvalidInput`] when an event has a due time that
    /// cannot be ordered (NaN or infinite).
    pub fn build(mut events: Vec<Event>) -> Result<Self> {
        if let Some(position) = events.iter().position(|e| !e.due_time.is_finite()) {
            return Err(Error::InvalidInput(format!(
                "event {} has a non-finite due time ({})",
                position, events[position].due_time
            )));
        }

        // Stable: ties keep insertion order
        events.sort_by(|a, b| a.due_time.total_cmp(&b.due_time));

        let store = Self { events };
        info!(
            events = store.len(),
            first = ?store.first_due(),
            last = ?store.last_due(),
            "Event store built"
        );
        Ok(store)
    }

    /// Creates an empty store
    pub fn empty() -> Self {
        Self::default()
    }

    /// Bounds-checked read
    pub fn get(&self, index: usize) -> Result<&Event> {
        self.events.get(index).ok_or(Error::IndexOutOfRange {
            index,
            len: self.events.len(),
        })
    }

    /// Returns the number of events
    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Event> {
        self.events.iter()
    }

    pub fn as_slice(&self) -> &[Event] {
        &self.events
    }

    /// Due time of the earliest event
    pub fn first_due(&self) -> Option<f64> {
        self.events.first().map(|e| e.due_time)
    }

    /// Due time of the latest event
    pub fn last_due(&self) -> Option<f64> {
        self.events.last().map(|e| e.due_time)
    }

    /// Index of the first event due strictly after `time`
    pub fn partition_point(&self, time: f64) -> usize {
        self.events.partition_point(|e| e.due_time <= time)
    }
}

impl<'a> IntoIterator for &'a EventStore {
    type Item = &'a Event;
    type IntoIter = std::slice::Iter<'a, Event>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

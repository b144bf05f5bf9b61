//! Playback cursor: re-synchronisation against the event store and dispatch of due events

use crate::{Event, EventStore, SeekConfig};
use std::iter::FusedIterator;
use tracing::{debug, trace, warn};

/// Upper bound on bisection rounds; only reachable if the store is not sorted
const MAX_BISECT_STEPS: usize = 64;

/// How the cursor was re-synchronised on a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SeekStrategy {
    /// Inside the debounce window, no search performed
    Skipped,
    /// Local scan from the current index
    Sequential,
    /// Bisection over a bracket narrowed by the current index
    Binary,
}

/// Outcome of a single re-synchronisation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeekReport {
    pub strategy: SeekStrategy,
    /// Index before the re-sync
    pub from: usize,
    /// Index after the re-sync
    pub to: usize,
    /// Pointer moves (sequential) or bisection rounds (binary)
    pub steps: usize,
}

/// Result of one search strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchOutcome {
    pub index: usize,
    pub steps: usize,
}

/// Tracks the last observed clock time and the matching position in an [`EventStore`].
///
/// Every event before `index` has been dispatched or skipped. The cursor
/// starts before all events at `-inf`, so the first forward tick delivers
/// everything already due.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cursor {
    last_time: f64,
    index: usize,
}

impl Cursor {
    /// Creates a cursor positioned before the first event
    pub fn new() -> Self {
        Self {
            last_time: f64::NEG_INFINITY,
            index: 0,
        }
    }

    pub fn last_time(&self) -> f64 {
        self.last_time
    }

    /// Position of the next pending event
    pub fn index(&self) -> usize {
        self.index
    }

    /// Returns the cursor to its initial state, used when the store is reloaded
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Re-synchronises the index for the new clock time `time`.
    ///
    /// Forward playback anchors at the previous time, so events in
    /// `(last_time, time]` stay pending for [`Cursor::poll`]. Backward
    /// motion and ticks flagged `jumped` anchor at `time`: everything at or
    /// before it counts as consumed, which means a forward seek skips the
    /// events it jumps over. Non-finite times are ignored.
    pub fn advance(
        &mut self,
        store: &EventStore,
        time: f64,
        jumped: bool,
        config: &SeekConfig,
    ) -> SeekReport {
        let from = self.index;
        if !time.is_finite() {
            warn!(time, "Ignoring non-finite clock time");
            return SeekReport {
                strategy: SeekStrategy::Skipped,
                from,
                to: from,
                steps: 0,
            };
        }

        let delta = time - self.last_time;
        if !jumped && delta >= 0.0 && delta < config.debounce_seconds {
            self.last_time = time;
            return SeekReport {
                strategy: SeekStrategy::Skipped,
                from,
                to: from,
                steps: 0,
            };
        }

        let anchor = if jumped || delta < 0.0 {
            time
        } else {
            self.last_time
        };

        let events = store.as_slice();
        let (strategy, outcome) = if delta.abs() > config.far_jump_threshold_seconds {
            (SeekStrategy::Binary, binary_search(events, self.index, anchor))
        } else {
            (
                SeekStrategy::Sequential,
                sequential_search(events, self.index, anchor),
            )
        };

        debug!(
            time,
            last_time = self.last_time,
            jumped,
            ?strategy,
            from,
            to = outcome.index,
            steps = outcome.steps,
            "Cursor re-synced"
        );

        self.index = outcome.index;
        self.last_time = time;

        SeekReport {
            strategy,
            from,
            to: outcome.index,
            steps: outcome.steps,
        }
    }

    /// Yields the pending events due at or before `time`, advancing the index past each one.
    ///
    /// The returned iterator is lazy and finite; events it does not reach
    /// stay pending.
    pub fn poll<'a>(&'a mut self, store: &'a EventStore, time: f64) -> Dispatch<'a> {
        Dispatch {
            events: store.as_slice(),
            index: &mut self.index,
            until: time,
        }
    }
}

impl Default for Cursor {
    fn default() -> Self {
        Self::new()
    }
}

/// Lazy sequence of newly due events, see [`Cursor::poll`]
#[derive(Debug)]
pub struct Dispatch<'a> {
    events: &'a [Event],
    index: &'a mut usize,
    until: f64,
}

impl<'a> Iterator for Dispatch<'a> {
    type Item = &'a Event;

    fn next(&mut self) -> Option<&'a Event> {
        let events: &'a [Event] = self.events;
        let event = events.get(*self.index)?;
        // NaN never compares as due
        if !(event.due_time <= self.until) {
            return None;
        }
        trace!(index = *self.index, due = event.due_time, "Dispatching event");
        *self.index += 1;
        Some(event)
    }
}

impl FusedIterator for Dispatch<'_> {}

/// Finds the first index due after `anchor` by stepping from `index`.
///
/// Cost is proportional to the distance between `index` and the result.
pub fn sequential_search(events: &[Event], index: usize, anchor: f64) -> SearchOutcome {
    let mut cursor = index.min(events.len());
    let mut steps = 0;

    while cursor > 0 && events[cursor - 1].due_time > anchor {
        cursor -= 1;
        steps += 1;
    }
    while cursor < events.len() && events[cursor].due_time <= anchor {
        cursor += 1;
        steps += 1;
    }

    SearchOutcome {
        index: cursor,
        steps,
    }
}

/// Finds the first index due after `anchor` by bisection.
///
/// The current `index` narrows the initial bracket to the side of it the
/// answer must lie on. Produces the same index as [`sequential_search`]
/// for sorted input.
pub fn binary_search(events: &[Event], index: usize, anchor: f64) -> SearchOutcome {
    let len = events.len();
    let index = index.min(len);

    let (mut low, mut high) = if index < len && events[index].due_time <= anchor {
        (index + 1, len)
    } else if index > 0 && events[index - 1].due_time > anchor {
        (0, index - 1)
    } else {
        return SearchOutcome { index, steps: 0 };
    };

    // Invariant: events[..low] are due at or before anchor, events[high..] after it
    let mut steps = 0;
    while low < high {
        if steps == MAX_BISECT_STEPS {
            warn!(
                low,
                high,
                anchor,
                "Bisection did not converge, store may be unsorted"
            );
            break;
        }
        let mid = low + (high - low) / 2;
        if events[mid].due_time <= anchor {
            low = mid + 1;
        } else {
            high = mid;
        }
        steps += 1;
    }

    SearchOutcome { index: low, steps }
}

//! Ordered event tracks.

use alloc::vec::Vec;

use crate::event::{SampleTime, TimedEvent};

/// A time-ordered sequence of note events inside a timing window.
///
/// Events are kept sorted by `time`. Events sharing a timestamp keep the
/// order in which they were inserted.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EventTrack {
    events: Vec<TimedEvent>,
    /// Length of the timing window in samples.
    window: SampleTime,
}

/// Returned by [`EventTrack::try_push`] when the track is at capacity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
#[error("event track is full ({capacity} events)")]
pub struct CaptureFull {
    pub capacity: usize,
}

impl EventTrack {
    /// Create an empty track covering `window` samples.
    pub fn new(window: SampleTime) -> Self {
        Self {
            events: Vec::new(),
            window,
        }
    }

    /// Create an empty track with room for `capacity` events.
    ///
    /// Used for tracks filled from the audio tick, which must never grow.
    pub fn with_capacity(window: SampleTime, capacity: usize) -> Self {
        Self {
            events: Vec::with_capacity(capacity),
            window,
        }
    }

    /// Insert an event, growing the track if needed (setup phase only).
    pub fn push(&mut self, event: TimedEvent) {
        let pos = self.insertion_point(event.time);
        self.events.insert(pos, event);
    }

    /// Insert an event without ever reallocating.
    pub fn try_push(&mut self, event: TimedEvent) -> Result<(), CaptureFull> {
        if self.events.len() == self.events.capacity() {
            return Err(CaptureFull {
                capacity: self.events.capacity(),
            });
        }
        let pos = self.insertion_point(event.time);
        self.events.insert(pos, event);
        Ok(())
    }

    /// Upper bound: after every event at or before `time`.
    fn insertion_point(&self, time: SampleTime) -> usize {
        self.events.partition_point(|e| e.time <= time)
    }

    /// Index of the first event at or after `time` (`len()` if none).
    pub fn first_at_or_after(&self, time: SampleTime) -> usize {
        self.events.partition_point(|e| e.time < time)
    }

    /// Events with `from <= time < to`.
    pub fn window_slice(&self, from: SampleTime, to: SampleTime) -> &[TimedEvent] {
        if to <= from {
            return &[];
        }
        let start = self.first_at_or_after(from);
        let end = self.first_at_or_after(to);
        &self.events[start..end]
    }

    /// Time at which the note started by the event at `index` stops sounding.
    ///
    /// Scans forward for the NoteOff of the same `(channel, note)`, or a
    /// re-trigger of it. The scan never leaves the track; a note still held
    /// at the end of the track lasts until the end of the window.
    pub fn release_time(&self, index: usize) -> SampleTime {
        let Some(start) = self.events.get(index) else {
            return self.window;
        };
        if !start.is_note_on() {
            return start.time;
        }
        self.events[index + 1..]
            .iter()
            .find(|e| e.channel == start.channel && e.note() == start.note())
            .map_or(self.window.max(start.time), |e| e.time)
    }

    /// True if every NoteOn is followed later by a NoteOff for its `(channel, note)`.
    pub fn is_well_formed(&self) -> bool {
        self.events.iter().enumerate().all(|(i, e)| {
            !e.is_note_on()
                || self.events[i + 1..].iter().any(|later| {
                    later.is_note_off() && later.channel == e.channel && later.note() == e.note()
                })
        })
    }

    /// Remove all events, keeping the allocation.
    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn window(&self) -> SampleTime {
        self.window
    }

    pub fn set_window(&mut self, window: SampleTime) {
        self.window = window;
    }

    pub fn events(&self) -> &[TimedEvent] {
        &self.events
    }

    pub fn get(&self, index: usize) -> Option<&TimedEvent> {
        self.events.get(index)
    }

    pub fn iter(&self) -> core::slice::Iter<'_, TimedEvent> {
        self.events.iter()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.events.capacity()
    }
}

impl<'a> IntoIterator for &'a EventTrack {
    type Item = &'a TimedEvent;
    type IntoIter = core::slice::Iter<'a, TimedEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}

//! Per-block merged event stream.

use heapless::Vec;
use mel_ir::config::MAX_BLOCK_EVENTS;
use mel_ir::{SampleTime, TimedEvent};

/// Events for one audio block, ordered by offset within the block.
///
/// Storage is fixed-capacity so filling and draining never allocate.
/// Events at the same offset keep the order they were pushed in, so the
/// caller decides precedence by push order. During rendering events are
/// consumed via a cursor that advances without removing elements.
#[derive(Debug, Default)]
pub struct BlockEvents {
    events: Vec<TimedEvent, MAX_BLOCK_EVENTS>,
    /// Next event index to process.
    cursor: usize,
    /// Events refused because the block was full, since the last `take_dropped`.
    dropped: u32,
}

impl BlockEvents {
    pub const fn new() -> Self {
        Self {
            events: Vec::new(),
            cursor: 0,
            dropped: 0,
        }
    }

    /// Insert an event whose `time` is an offset into the block.
    ///
    /// Returns `false` (and counts the drop) if the block is full.
    pub fn push(&mut self, event: TimedEvent) -> bool {
        let pos = self.events.partition_point(|e| e.time <= event.time);
        match self.events.insert(pos, event) {
            Ok(()) => true,
            Err(_) => {
                self.dropped = self.dropped.saturating_add(1);
                false
            }
        }
    }

    /// Merge events from a scripted track slice, rebased so `origin` is offset 0.
    pub fn extend_rebased(&mut self, events: &[TimedEvent], origin: SampleTime) {
        for event in events {
            self.push(event.at(event.time - origin));
        }
    }

    /// Return the index range of events at or before `offset` and advance
    /// the cursor past them.
    pub fn drain_until(&mut self, offset: SampleTime) -> core::ops::Range<usize> {
        let start = self.cursor;
        while self.cursor < self.events.len() && self.events[self.cursor].time <= offset {
            self.cursor += 1;
        }
        start..self.cursor
    }

    /// Offset of the next undrained event.
    pub fn next_offset(&self) -> Option<SampleTime> {
        self.events.get(self.cursor).map(|e| e.time)
    }

    /// Get an event by index (for use with `drain_until` ranges).
    pub fn get(&self, index: usize) -> Option<&TimedEvent> {
        self.events.get(index)
    }

    pub fn events(&self) -> &[TimedEvent] {
        &self.events
    }

    /// Clear all events and reset the cursor.
    pub fn clear(&mut self) {
        self.events.clear();
        self.cursor = 0;
    }

    /// Read and reset the overflow counter.
    pub fn take_dropped(&mut self) -> u32 {
        core::mem::take(&mut self.dropped)
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }
}

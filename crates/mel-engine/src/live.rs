//! Live note input: a lock-free handoff from input threads to the audio tick.
//!
//! Producers stamp each note with the shared sample clock. The tick takes
//! the notes that fall inside the block it is rendering and leaves later
//! ones queued.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use mel_ir::{NoteEvent, SampleTime, TimedEvent};
use ringbuf::traits::{Consumer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};

/// Frames rendered since the stream started, shared with input threads.
#[derive(Clone, Debug, Default)]
pub struct SampleClock(Arc<AtomicU64>);

impl SampleClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stream time at the start of the next block to be rendered.
    pub fn now(&self) -> u64 {
        self.0.load(Ordering::Acquire)
    }

    pub(crate) fn advance(&self, frames: u64) {
        self.0.fetch_add(frames, Ordering::Release);
    }
}

/// A live note stamped with an absolute stream time.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LiveNote {
    /// Stream time in frames (see [`SampleClock`])
    pub time: u64,
    pub channel: u8,
    pub event: NoteEvent,
}

/// Producer half, owned by whichever thread reads the input device.
pub struct LiveInput {
    producer: HeapProd<LiveNote>,
    clock: SampleClock,
    dropped: Arc<AtomicU64>,
}

impl LiveInput {
    /// Queue a note-on for the next block.
    pub fn note_on(&mut self, channel: u8, note: u8, velocity: f32) -> bool {
        self.push_now(channel, NoteEvent::NoteOn { note, velocity })
    }

    /// Queue a note-off for the next block.
    pub fn note_off(&mut self, channel: u8, note: u8) -> bool {
        self.push_now(channel, NoteEvent::NoteOff { note })
    }

    /// Queue `event` stamped with the current stream time.
    pub fn push_now(&mut self, channel: u8, event: NoteEvent) -> bool {
        let time = self.clock.now();
        self.push(LiveNote { time, channel, event })
    }

    /// Queue a note at an explicit stream time.
    ///
    /// Notes must be pushed in time order. Returns `false` if the queue is
    /// full; the note is dropped and counted.
    pub fn push(&mut self, note: LiveNote) -> bool {
        match self.producer.try_push(note) {
            Ok(()) => true,
            Err(_) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    pub fn clock(&self) -> &SampleClock {
        &self.clock
    }
}

/// Consumer half, owned by the audio tick.
pub struct LiveQueue {
    consumer: HeapCons<LiveNote>,
    /// Note popped early that belongs to a later block.
    pending: Option<LiveNote>,
    dropped: Arc<AtomicU64>,
}

impl LiveQueue {
    /// Hand every note due before `block_start + len` to `sink`, as an
    /// event whose time is its offset within the block.
    ///
    /// Notes stamped before the block (late arrivals) land at offset 0.
    pub fn drain_block(&mut self, block_start: u64, len: usize, mut sink: impl FnMut(TimedEvent)) {
        let block_end = block_start + len as u64;
        loop {
            let Some(note) = self.pending.take().or_else(|| self.consumer.try_pop()) else {
                return;
            };
            if note.time >= block_end {
                self.pending = Some(note);
                return;
            }
            let offset = note.time.saturating_sub(block_start) as SampleTime;
            sink(TimedEvent::new(offset, note.channel, note.event));
        }
    }

    /// Notes refused because the queue was full.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Create a live input queue holding up to `capacity` notes.
pub fn live_channel(capacity: usize, clock: SampleClock) -> (LiveInput, LiveQueue) {
    let (producer, consumer) = HeapRb::<LiveNote>::new(capacity).split();
    let dropped = Arc::new(AtomicU64::new(0));
    let input = LiveInput {
        producer,
        clock,
        dropped: dropped.clone(),
    };
    let queue = LiveQueue {
        consumer,
        pending: None,
        dropped,
    };
    (input, queue)
}

//! Lock-free mirror of the loop state for other threads.

use std::sync::atomic::{AtomicU32, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;

use mel_ir::{LoopSnapshot, Phase, Score};

/// Sentinel for "no score yet".
const NO_SCORE: u64 = u64::MAX;

/// Events lost to full fixed-capacity buffers, totalled since start.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Overflows {
    /// Live notes refused by the input queue
    pub live_queue: u64,
    /// Events that did not fit in a block
    pub block_events: u64,
    /// Live notes that did not fit in the capture
    pub capture: u64,
}

impl Overflows {
    pub fn total(&self) -> u64 {
        self.live_queue + self.block_events + self.capture
    }
}

#[derive(Debug)]
struct Shared {
    phase: AtomicU8,
    /// f32 bits of the loop fraction
    position: AtomicU32,
    loops_completed: AtomicU64,
    /// `correct << 32 | total`, or `NO_SCORE`
    last_score: AtomicU64,
    live_dropped: AtomicU64,
    block_dropped: AtomicU64,
    capture_dropped: AtomicU64,
}

/// Published once per block by the audio tick, read from anywhere.
#[derive(Clone, Debug)]
pub struct LoopMonitor {
    shared: Arc<Shared>,
}

impl Default for LoopMonitor {
    fn default() -> Self {
        Self {
            shared: Arc::new(Shared {
                phase: AtomicU8::new(Phase::default().as_u8()),
                position: AtomicU32::new(0f32.to_bits()),
                loops_completed: AtomicU64::new(0),
                last_score: AtomicU64::new(NO_SCORE),
                live_dropped: AtomicU64::new(0),
                block_dropped: AtomicU64::new(0),
                capture_dropped: AtomicU64::new(0),
            }),
        }
    }
}

impl LoopMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn publish(&self, snapshot: LoopSnapshot, last_score: Option<Score>) {
        let s = &self.shared;
        s.phase.store(snapshot.phase.as_u8(), Ordering::Relaxed);
        s.position.store(snapshot.position.to_bits(), Ordering::Relaxed);
        s.loops_completed.store(snapshot.loops_completed, Ordering::Relaxed);
        let packed = last_score.map_or(NO_SCORE, |sc| ((sc.correct as u64) << 32) | sc.total as u64);
        s.last_score.store(packed, Ordering::Release);
    }

    pub(crate) fn record_overflows(&self, live_total: u64, block: u32, capture: u32) {
        let s = &self.shared;
        s.live_dropped.store(live_total, Ordering::Relaxed);
        if block > 0 {
            s.block_dropped.fetch_add(block as u64, Ordering::Relaxed);
        }
        if capture > 0 {
            s.capture_dropped.fetch_add(capture as u64, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> LoopSnapshot {
        let s = &self.shared;
        LoopSnapshot {
            phase: Phase::from_u8(s.phase.load(Ordering::Relaxed)),
            position: f32::from_bits(s.position.load(Ordering::Relaxed)),
            loops_completed: s.loops_completed.load(Ordering::Relaxed),
        }
    }

    pub fn last_score(&self) -> Option<Score> {
        match self.shared.last_score.load(Ordering::Acquire) {
            NO_SCORE => None,
            packed => Some(Score::new((packed >> 32) as u32, packed as u32)),
        }
    }

    pub fn overflows(&self) -> Overflows {
        let s = &self.shared;
        Overflows {
            live_queue: s.live_dropped.load(Ordering::Relaxed),
            block_events: s.block_dropped.load(Ordering::Relaxed),
            capture: s.capture_dropped.load(Ordering::Relaxed),
        }
    }
}

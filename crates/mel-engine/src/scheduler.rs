//! LoopScheduler: loop position, phase and guess capture.
//!
//! Each block the scheduler merges the scripted tracks falling inside the
//! block into the block's event stream, routes live events into the
//! capture while listening, and after rendering advances the position.
//! Crossing the loop boundary flips Playback and Listening; returning to
//! Playback scores the captured guess.

use mel_ir::config::CAPTURE_CAPACITY;
use mel_ir::{EventTrack, LoopSnapshot, Phase, SampleTime, Score, TimedEvent};

use crate::block_events::BlockEvents;
use crate::composer::ScriptedTracks;
use crate::evaluator::GuessEvaluator;

/// Owns the loop cycle and the captured guess.
#[derive(Debug)]
pub struct LoopScheduler {
    loop_length: SampleTime,
    /// Samples into the current loop, always below `loop_length`.
    position: SampleTime,
    phase: Phase,
    /// Live events recorded during the current listening loop.
    capture: EventTrack,
    evaluator: GuessEvaluator,
    last_score: Option<Score>,
    loops_completed: u64,
    /// Live events that did not fit in the capture.
    capture_dropped: u32,
}

impl LoopScheduler {
    /// Start at the top of a loop, in Playback.
    pub fn new(loop_length: SampleTime) -> Self {
        Self {
            loop_length,
            position: 0,
            phase: Phase::Playback,
            capture: EventTrack::with_capacity(loop_length, CAPTURE_CAPACITY),
            evaluator: GuessEvaluator::default(),
            last_score: None,
            loops_completed: 0,
            capture_dropped: 0,
        }
    }

    /// Phase the loop enters at the next boundary.
    fn next_phase(&self) -> Phase {
        match self.phase {
            Phase::Playback => Phase::Listening,
            Phase::Listening => Phase::Playback,
            Phase::Idle => Phase::Idle,
        }
    }

    /// Merge the scripted events for the next `len` samples into `block`.
    ///
    /// The rhythm track spans two loops, so a block running past the
    /// boundary picks up the following loop's rhythm directly. If the
    /// loop restarts in Playback inside this block, the phrase opening is
    /// merged too.
    pub fn collect_block(&self, tracks: &ScriptedTracks, len: usize, block: &mut BlockEvents) {
        let start = self.position;
        let end = start + len as SampleTime;
        let boundary = self.loop_length;

        block.extend_rebased(tracks.rhythm.window_slice(start, end), start);
        if self.phase == Phase::Playback {
            block.extend_rebased(tracks.phrase.window_slice(start, end.min(boundary)), start);
        }
        if end > boundary && self.next_phase() == Phase::Playback {
            for event in tracks.phrase.window_slice(0, end - boundary) {
                block.push(event.at(event.time + boundary - start));
            }
        }
    }

    /// Route one live event (timed as a block offset) into the block, and
    /// into the capture if it falls in a listening loop.
    pub fn accept_live(&mut self, event: TimedEvent, block: &mut BlockEvents) {
        block.push(event);
        let at = self.position + event.time;
        let (phase, time) = if at < self.loop_length {
            (self.phase, at)
        } else {
            (self.next_phase(), at - self.loop_length)
        };
        if phase == Phase::Listening && self.capture.try_push(event.at(time)).is_err() {
            self.capture_dropped = self.capture_dropped.saturating_add(1);
        }
    }

    /// Move the loop forward by `len` samples (at most one loop).
    ///
    /// Returns the guess score when a listening loop ends.
    pub fn advance(&mut self, len: usize, phrase: &EventTrack) -> Option<Score> {
        self.position += len as SampleTime;
        if self.position < self.loop_length {
            return None;
        }
        self.position -= self.loop_length;
        debug_assert!(self.position < self.loop_length);
        self.loops_completed += 1;

        match self.phase {
            Phase::Playback => {
                self.phase = Phase::Listening;
                None
            }
            Phase::Listening => {
                self.phase = Phase::Playback;
                let score = self.evaluator.evaluate(phrase, &self.capture);
                self.capture.clear();
                self.last_score = Some(score);
                Some(score)
            }
            Phase::Idle => None,
        }
    }

    /// Park the loop in Idle (rhythm only), or resume in Playback.
    ///
    /// Entering or leaving Idle discards the current capture unscored.
    pub fn set_idle(&mut self, idle: bool) {
        match (idle, self.phase) {
            (true, _) => self.phase = Phase::Idle,
            (false, Phase::Idle) => self.phase = Phase::Playback,
            (false, _) => return,
        }
        self.capture.clear();
    }

    /// Adopt a new loop length, restarting at the top of the loop.
    ///
    /// A listening loop in progress is abandoned.
    pub fn resize(&mut self, loop_length: SampleTime) {
        self.loop_length = loop_length;
        self.position = 0;
        if self.phase == Phase::Listening {
            self.phase = Phase::Playback;
        }
        self.capture.clear();
        self.capture.set_window(loop_length);
    }

    /// Jump to `position` within the current loop.
    pub fn seek(&mut self, position: SampleTime) {
        self.position = position % self.loop_length.max(1);
    }

    pub fn snapshot(&self) -> LoopSnapshot {
        LoopSnapshot {
            phase: self.phase,
            position: self.position as f32 / self.loop_length.max(1) as f32,
            loops_completed: self.loops_completed,
        }
    }

    /// Read and reset the capture overflow counter.
    pub fn take_capture_dropped(&mut self) -> u32 {
        core::mem::take(&mut self.capture_dropped)
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn position(&self) -> SampleTime {
        self.position
    }

    pub fn loop_length(&self) -> SampleTime {
        self.loop_length
    }

    pub fn capture(&self) -> &EventTrack {
        &self.capture
    }

    pub fn last_score(&self) -> Option<Score> {
        self.last_score
    }

    pub fn loops_completed(&self) -> u64 {
        self.loops_completed
    }
}

//! Fixed engine constants and the stream configuration.

use crate::event::SampleTime;

/// Samples in one wavetable cycle (one extra wraparound sample is stored).
pub const TABLE_LENGTH: usize = 128;

/// Voices in the pool.
pub const VOICE_COUNT: usize = 4;

/// Voice amplitude = velocity × this.
pub const AMPLITUDE_SCALE: f64 = 0.15;

/// Per-sample tail-off multiplier after a released note.
pub const TAIL_OFF_DECAY: f64 = 0.99;

/// Tail-off factor at or below which a voice is silenced.
pub const TAIL_OFF_CUTOFF: f64 = 0.005;

/// Overlap ratio a guessed note must exceed to count as correct.
pub const MATCH_THRESHOLD: f32 = 0.4;

/// Loop duration.
pub const SECONDS_PER_LOOP: f64 = 5.0;

/// Channel carrying the backing rhythm.
pub const RHYTHM_CHANNEL: u8 = 0;

/// Channel carrying the target phrase.
pub const PHRASE_CHANNEL: u8 = 1;

/// Most events merged into a single block.
pub const MAX_BLOCK_EVENTS: usize = 256;

/// Most live events captured during one listening loop.
pub const CAPTURE_CAPACITY: usize = 1024;

/// Slots in the live-input handoff queue.
pub const LIVE_QUEUE_CAPACITY: usize = 256;

/// The phrase is laid out on twelve subdivisions of the loop.
const MIN_LOOP_LENGTH: u64 = 12;

/// Stream parameters supplied by the host.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LooperConfig {
    /// Output sample rate in Hz
    pub sample_rate: f64,
    /// Largest number of frames processed per tick
    pub block_size: usize,
    /// Loop duration in seconds
    pub seconds_per_loop: f64,
}

impl Default for LooperConfig {
    fn default() -> Self {
        Self::new(48_000.0, 512)
    }
}

/// Invalid stream configuration.
#[derive(Clone, Copy, Debug, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("sample rate must be positive and finite, got {0}")]
    InvalidSampleRate(f64),
    #[error("loop duration must be positive and finite, got {0}")]
    InvalidLoopDuration(f64),
    #[error("block size must be at least one frame")]
    ZeroBlockSize,
    #[error("loop of {samples} samples is too short to hold the phrase")]
    LoopTooShort { samples: u64 },
    #[error("loop of {samples} samples is too long")]
    LoopTooLong { samples: u64 },
    #[error("block size {block_size} exceeds loop length {loop_length}")]
    BlockLongerThanLoop { block_size: usize, loop_length: u64 },
}

impl LooperConfig {
    /// Configuration with the standard loop duration.
    pub const fn new(sample_rate: f64, block_size: usize) -> Self {
        Self {
            sample_rate,
            block_size,
            seconds_per_loop: SECONDS_PER_LOOP,
        }
    }

    /// Loop length in samples before range checks.
    fn raw_loop_length(&self) -> u64 {
        libm::round(self.sample_rate * self.seconds_per_loop) as u64
    }

    /// Loop length in samples: `round(sample_rate × seconds_per_loop)`.
    ///
    /// Only meaningful for a configuration that passed [`validate`](Self::validate).
    pub fn loop_length(&self) -> SampleTime {
        self.raw_loop_length() as SampleTime
    }

    /// Check the configuration can drive the loop.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.sample_rate.is_finite() && self.sample_rate > 0.0) {
            return Err(ConfigError::InvalidSampleRate(self.sample_rate));
        }
        if !(self.seconds_per_loop.is_finite() && self.seconds_per_loop > 0.0) {
            return Err(ConfigError::InvalidLoopDuration(self.seconds_per_loop));
        }
        if self.block_size == 0 {
            return Err(ConfigError::ZeroBlockSize);
        }
        let samples = self.raw_loop_length();
        if samples < MIN_LOOP_LENGTH {
            return Err(ConfigError::LoopTooShort { samples });
        }
        // The rhythm track spans two loops and must stay addressable.
        if samples > (SampleTime::MAX / 2) as u64 {
            return Err(ConfigError::LoopTooLong { samples });
        }
        if self.block_size as u64 > samples {
            return Err(ConfigError::BlockLongerThanLoop {
                block_size: self.block_size,
                loop_length: samples,
            });
        }
        Ok(())
    }
}

//! ToneVoice: one wavetable oscillator with a release tail.

use mel_ir::config::{AMPLITUDE_SCALE, TABLE_LENGTH, TAIL_OFF_CUTOFF, TAIL_OFF_DECAY};
use mel_ir::AudioBuffer;

use crate::frequency::phase_increment;
use crate::wavetable::{Sound, Wavetable};

/// Voice lifecycle state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum VoiceState {
    /// Free for a new note.
    #[default]
    Idle,
    /// Sounding at full level.
    Held,
    /// Released; decaying towards silence.
    TailingOff,
}

/// A single oscillator reading a shared wavetable.
///
/// Voices live in fixed pool slots and are reused from note to note.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ToneVoice {
    /// Fractional read position in the table, always in `0..TABLE_LENGTH`.
    pub read_position: f32,
    /// Table samples advanced per output sample.
    pub increment: f32,
    /// Level while held (velocity × 0.15).
    pub amplitude: f64,
    /// Release multiplier; 0.0 means no tail-off in progress.
    pub tail_off: f64,
    /// Is the voice producing audio?
    pub active: bool,
    /// Note currently assigned.
    pub note: u8,
    /// Channel the note arrived on.
    pub channel: u8,
    /// Set between note-on and the matching note-off.
    pub key_down: bool,
    /// Trigger order stamp, used to find the oldest voice.
    pub started_at: u64,
}

impl ToneVoice {
    pub const fn new() -> Self {
        Self {
            read_position: 0.0,
            increment: 0.0,
            amplitude: 0.0,
            tail_off: 0.0,
            active: false,
            note: 0,
            channel: 0,
            key_down: false,
            started_at: 0,
        }
    }

    /// Whether this voice can render `sound`.
    pub fn can_play(&self, sound: Sound) -> bool {
        matches!(sound, Sound::Sine)
    }

    /// Start `note` from the top of the table.
    pub fn trigger(&mut self, channel: u8, note: u8, velocity: f32, sample_rate: f64) {
        self.read_position = 0.0;
        self.increment = phase_increment(note, sample_rate, TABLE_LENGTH);
        self.amplitude = velocity as f64 * AMPLITUDE_SCALE;
        self.tail_off = 0.0;
        self.active = true;
        self.note = note;
        self.channel = channel;
        self.key_down = true;
    }

    /// Release the note.
    ///
    /// With `allow_tail_off` the voice decays from full level; a second
    /// release while already decaying leaves the decay untouched. Without
    /// it the voice is silenced at once.
    pub fn release(&mut self, allow_tail_off: bool) {
        self.key_down = false;
        if !self.active {
            return;
        }
        if allow_tail_off {
            if self.tail_off == 0.0 {
                self.tail_off = 1.0;
            }
        } else {
            self.silence();
        }
    }

    /// Stop producing audio and free the voice.
    pub fn silence(&mut self) {
        self.active = false;
        self.key_down = false;
        self.increment = 0.0;
        self.tail_off = 0.0;
    }

    /// Recompute the read step for a new output sample rate.
    pub fn retune(&mut self, sample_rate: f64) {
        if self.active {
            self.increment = phase_increment(self.note, sample_rate, TABLE_LENGTH);
        }
    }

    pub fn state(&self) -> VoiceState {
        if !self.active {
            VoiceState::Idle
        } else if self.tail_off > 0.0 {
            VoiceState::TailingOff
        } else {
            VoiceState::Held
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Add `len` frames starting at `start` into every channel of `output`.
    ///
    /// Stops early once a tail-off has decayed to silence.
    pub fn render(&mut self, table: &Wavetable, output: &mut AudioBuffer, start: usize, len: usize) {
        if !self.active {
            return;
        }
        let end = (start + len).min(output.frames());
        let table_len = TABLE_LENGTH as f32;
        for frame in start..end {
            let mut value = table.read(self.read_position) as f64 * self.amplitude;
            if self.tail_off > 0.0 {
                value *= self.tail_off;
            }
            output.add_to_all(frame, value as f32);

            self.read_position += self.increment;
            if self.read_position >= table_len {
                self.read_position = libm::fmodf(self.read_position, table_len);
            }

            if self.tail_off > 0.0 {
                self.tail_off *= TAIL_OFF_DECAY;
                if self.tail_off <= TAIL_OFF_CUTOFF {
                    self.silence();
                    break;
                }
            }
        }
    }
}

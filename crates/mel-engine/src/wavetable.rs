//! Single-cycle wavetables and the sounds voices can play.

use core::f64::consts::TAU;

use mel_ir::config::TABLE_LENGTH;

/// Kinds of sound a voice may be asked to play.
///
/// Only a sine exists today; voices check the variant instead of probing
/// the sound's runtime type.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Sound {
    #[default]
    Sine,
}

/// One precomputed cycle of a waveform.
///
/// `TABLE_LENGTH + 1` samples are stored: the last one repeats the first,
/// so interpolating between `i` and `i + 1` never leaves the table.
#[derive(Clone, Debug, PartialEq)]
pub struct Wavetable {
    samples: [f32; TABLE_LENGTH + 1],
}

impl Wavetable {
    /// One sine cycle.
    pub fn sine() -> Self {
        let mut samples = [0.0; TABLE_LENGTH + 1];
        let step = TAU / TABLE_LENGTH as f64;
        for (i, sample) in samples.iter_mut().take(TABLE_LENGTH).enumerate() {
            *sample = libm::sin(step * i as f64) as f32;
        }
        samples[TABLE_LENGTH] = samples[0];
        Self { samples }
    }

    /// The table a sound plays from.
    pub fn for_sound(sound: Sound) -> Self {
        match sound {
            Sound::Sine => Self::sine(),
        }
    }

    /// Cycle length, not counting the wraparound sample.
    pub const fn len(&self) -> usize {
        TABLE_LENGTH
    }

    pub const fn is_empty(&self) -> bool {
        false
    }

    /// All stored samples, wraparound included.
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Linearly interpolated value at a fractional `position` in `0..len()`.
    #[inline]
    pub fn read(&self, position: f32) -> f32 {
        let index = position as usize;
        let frac = position - index as f32;
        let a = self.samples[index];
        let b = self.samples[index + 1];
        a + frac * (b - a)
    }
}

impl Default for Wavetable {
    fn default() -> Self {
        Self::sine()
    }
}

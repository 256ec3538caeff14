//! Note-to-frequency conversion for wavetable playback.
//!
//! Equal temperament referenced to A4 = 440 Hz at MIDI note 69. The
//! wavetable read step follows from the frequency, the output sample
//! rate and the table length.

/// MIDI note number of the reference pitch.
const REFERENCE_NOTE: i16 = 69;

/// Frequency of the reference note in Hz.
const REFERENCE_HZ: f64 = 440.0;

/// Convert a MIDI note number to Hz.
pub fn note_to_hz(note: u8) -> f64 {
    let semitones = note as i16 - REFERENCE_NOTE;
    REFERENCE_HZ * libm::exp2(semitones as f64 / 12.0)
}

/// Table samples to advance per output sample for `note`.
///
/// Returns 0 for a non-positive sample rate.
pub fn phase_increment(note: u8, sample_rate: f64, table_len: usize) -> f32 {
    if !(sample_rate > 0.0) {
        return 0.0;
    }
    (note_to_hz(note) / sample_rate * table_len as f64) as f32
}

//! Scripted tracks: the target phrase and the backing rhythm.
//!
//! Both are fixed scores laid out against the loop length, so they are
//! rebuilt whenever the loop length changes.

use mel_ir::config::{PHRASE_CHANNEL, RHYTHM_CHANNEL};
use mel_ir::{EventTrack, SampleTime, TimedEvent};

/// Velocity of every scripted note.
pub const SCRIPTED_VELOCITY: f32 = 1.0;

/// The phrase is written on twelve equal subdivisions of the loop.
const PHRASE_DIVISIONS: SampleTime = 12;

/// Phrase notes as `(note, start, end)` in subdivisions.
const PHRASE: [(u8, SampleTime, SampleTime); 7] = [
    (67, 0, 2),
    (69, 2, 3),
    (70, 3, 5),
    (72, 5, 6),
    (69, 6, 9),
    (65, 9, 11),
    (67, 11, 12),
];

/// The rhythm track holds this many consecutive loops.
const RHYTHM_CYCLES: SampleTime = 2;

/// One rhythm event at `floor(L × num / den) + nudge` within its loop.
#[derive(Clone, Copy, Debug)]
struct Mark {
    note_on: bool,
    note: u8,
    num: u64,
    den: u64,
    nudge: i64,
}

const fn on(note: u8, num: u64, den: u64, nudge: i64) -> Mark {
    Mark { note_on: true, note, num, den, nudge }
}

const fn off(note: u8, num: u64, den: u64, nudge: i64) -> Mark {
    Mark { note_on: false, note, num, den, nudge }
}

/// One loop of the backing ostinato, in insertion order.
///
/// The one- to three-sample nudges keep coinciding starts and stops of
/// different voices apart.
#[rustfmt::skip]
const RHYTHM: [Mark; 22] = [
    on(59, 0, 1, 0), on(53, 0, 1, 1), on(43, 0, 1, 2),
    off(59, 5, 24, -1), off(53, 5, 24, -2), off(43, 5, 24, -3),
    on(31, 5, 24, 0), off(31, 1, 4, -1),
    on(43, 1, 2, 0), off(43, 17, 24, -1),
    on(31, 17, 24, 0), off(31, 3, 4, -1),
    on(36, 20, 24, 0), off(36, 7, 8, -1),
    on(37, 7, 8, 0), off(37, 23, 24, -1),
    on(38, 23, 24, 0), off(38, 1, 1, -1),
    on(54, 23, 24, 1), off(54, 1, 1, -2),
    on(58, 23, 24, 2), off(58, 1, 1, -3),
];

/// Build the phrase track for a loop of `loop_length` samples.
///
/// Each note starts on its subdivision and stops one sample before the
/// next one.
pub fn compose_phrase(loop_length: SampleTime) -> EventTrack {
    let unit = loop_length / PHRASE_DIVISIONS;
    let mut track = EventTrack::with_capacity(loop_length, PHRASE.len() * 2);
    for &(note, start, end) in &PHRASE {
        track.push(TimedEvent::note_on(start * unit, PHRASE_CHANNEL, note, SCRIPTED_VELOCITY));
        track.push(TimedEvent::note_off((end * unit).saturating_sub(1), PHRASE_CHANNEL, note));
    }
    track
}

/// Build the rhythm track, covering two loops of `loop_length` samples.
pub fn compose_rhythm(loop_length: SampleTime) -> EventTrack {
    let window = loop_length.saturating_mul(RHYTHM_CYCLES);
    let mut track = EventTrack::with_capacity(window, RHYTHM.len() * RHYTHM_CYCLES as usize);
    for cycle in 0..RHYTHM_CYCLES {
        let cycle_start = cycle as i64 * loop_length as i64;
        for mark in &RHYTHM {
            let at = (loop_length as u64 * mark.num / mark.den) as i64 + mark.nudge + cycle_start;
            let time = at.clamp(0, SampleTime::MAX as i64) as SampleTime;
            let event = if mark.note_on {
                TimedEvent::note_on(time, RHYTHM_CHANNEL, mark.note, SCRIPTED_VELOCITY)
            } else {
                TimedEvent::note_off(time, RHYTHM_CHANNEL, mark.note)
            };
            track.push(event);
        }
    }
    track
}

/// The two scripted tracks for one loop length.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ScriptedTracks {
    pub loop_length: SampleTime,
    /// Backing ostinato, two loops long, audible in every phase
    pub rhythm: EventTrack,
    /// Target phrase, one loop long, audible during playback
    pub phrase: EventTrack,
}

impl ScriptedTracks {
    pub fn compose(loop_length: SampleTime) -> Self {
        let tracks = Self {
            loop_length,
            rhythm: compose_rhythm(loop_length),
            phrase: compose_phrase(loop_length),
        };
        tracing::debug!(
            loop_length,
            rhythm_events = tracks.rhythm.len(),
            phrase_events = tracks.phrase.len(),
            "composed scripted tracks"
        );
        tracks
    }
}

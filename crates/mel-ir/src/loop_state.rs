//! Loop phase, progress snapshot and per-loop score.

use core::fmt;

/// Phase of the repeating loop.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Phase {
    /// Backing rhythm only; nothing is played for the user or captured.
    Idle = 0,
    /// Rhythm plus the target phrase.
    #[default]
    Playback = 1,
    /// Rhythm only; live input is captured as the user's guess.
    Listening = 2,
}

impl Phase {
    /// Decode a phase published as a `u8`. Unknown values map to `Idle`.
    pub const fn from_u8(value: u8) -> Self {
        match value {
            1 => Phase::Playback,
            2 => Phase::Listening,
            _ => Phase::Idle,
        }
    }

    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    pub const fn label(self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Playback => "playback",
            Phase::Listening => "listening",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.label())
    }
}

/// Read-only view of the loop for progress displays.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LoopSnapshot {
    pub phase: Phase,
    /// Fraction of the current loop already played, 0.0..1.0
    pub position: f32,
    /// Number of loop boundaries crossed since start
    pub loops_completed: u64,
}

/// How many phrase notes the user reproduced in one listening loop.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Score {
    pub correct: u32,
    pub total: u32,
}

impl Score {
    pub const fn new(correct: u32, total: u32) -> Self {
        Self { correct, total }
    }

    /// Fraction of notes correct; 0.0 for an empty phrase.
    pub fn ratio(&self) -> f32 {
        if self.total == 0 {
            0.0
        } else {
            self.correct as f32 / self.total as f32
        }
    }

    pub const fn is_perfect(&self) -> bool {
        self.total > 0 && self.correct == self.total
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.correct, self.total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn default_phase_is_playback() {
        assert_eq!(Phase::default(), Phase::Playback);
    }

    #[test]
    fn phase_u8_roundtrip() {
        for phase in [Phase::Idle, Phase::Playback, Phase::Listening] {
            assert_eq!(Phase::from_u8(phase.as_u8()), phase);
        }
        assert_eq!(Phase::from_u8(200), Phase::Idle);
    }

    #[test]
    fn score_ratio_and_display() {
        let score = Score::new(5, 7);
        assert!((score.ratio() - 5.0 / 7.0).abs() < 1e-6);
        assert_eq!(score.to_string(), "5/7");
        assert!(!score.is_perfect());
        assert!(Score::new(7, 7).is_perfect());
    }

    #[test]
    fn empty_score_ratio_is_zero() {
        assert_eq!(Score::default().ratio(), 0.0);
        assert!(!Score::default().is_perfect());
    }
}

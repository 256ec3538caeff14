//! GuessEvaluator: scores a captured guess against the phrase.
//!
//! A phrase note counts as reproduced when guessed notes of the same
//! pitch cover more than the match threshold of its held interval. The
//! coverage may be split across several shorter guessed notes.

use mel_ir::config::MATCH_THRESHOLD;
use mel_ir::{EventTrack, SampleTime, Score};

/// How one phrase note was matched.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NoteVerdict {
    pub note: u8,
    /// Start of the phrase note's held interval
    pub from: SampleTime,
    /// End (exclusive) of the held interval: the next phrase event
    pub to: SampleTime,
    /// Samples of `[from, to)` covered by guessed notes of the same pitch
    pub overlap: u64,
    pub ratio: f32,
    pub correct: bool,
}

/// Compares a captured track with the phrase track.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GuessEvaluator {
    threshold: f32,
}

impl Default for GuessEvaluator {
    fn default() -> Self {
        Self::new(MATCH_THRESHOLD)
    }
}

impl GuessEvaluator {
    /// Evaluator counting a note correct when coverage exceeds `threshold`.
    pub const fn new(threshold: f32) -> Self {
        Self { threshold }
    }

    pub const fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Correct notes out of all sounding phrase notes.
    pub fn evaluate(&self, phrase: &EventTrack, guess: &EventTrack) -> Score {
        let mut score = Score::default();
        for verdict in self.verdicts(phrase, guess) {
            score.total += 1;
            if verdict.correct {
                score.correct += 1;
            }
        }
        score
    }

    /// Per-note detail, one verdict per NoteOn in the phrase with a nonzero note.
    pub fn verdicts<'a>(
        &self,
        phrase: &'a EventTrack,
        guess: &'a EventTrack,
    ) -> impl Iterator<Item = NoteVerdict> + 'a {
        let threshold = self.threshold;
        phrase
            .iter()
            .enumerate()
            .filter(|(_, e)| e.is_note_on() && e.note() != 0)
            .map(move |(i, e)| {
                let from = e.time;
                let to = phrase.get(i + 1).map_or(phrase.window(), |next| next.time);
                let overlap = covered_samples(guess, e.note(), from, to);
                let span = to.saturating_sub(from);
                let ratio = if span == 0 {
                    0.0
                } else {
                    overlap as f32 / span as f32
                };
                NoteVerdict {
                    note: e.note(),
                    from,
                    to,
                    overlap,
                    ratio,
                    correct: ratio > threshold,
                }
            })
    }
}

/// Samples of `[from, to)` during which a guessed `note` was sounding.
///
/// Only guessed notes starting before `to` can overlap, so the scan stops
/// at the first event at or after `to`. Each guessed note lasts until its
/// release in the guess track, or the end of the capture window.
fn covered_samples(guess: &EventTrack, note: u8, from: SampleTime, to: SampleTime) -> u64 {
    if to <= from {
        return 0;
    }
    let end = guess.first_at_or_after(to);
    guess.events()[..end]
        .iter()
        .enumerate()
        .filter(|(_, g)| g.is_note_on() && g.note() == note)
        .map(|(j, g)| {
            let start = g.time.max(from);
            let stop = guess.release_time(j).min(to);
            stop.saturating_sub(start) as u64
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composer::compose_phrase;
    use mel_ir::TimedEvent;

    const L: SampleTime = 1_200;

    fn guess() -> EventTrack {
        EventTrack::new(L)
    }

    fn play(track: &mut EventTrack, note: u8, from: SampleTime, to: SampleTime) {
        track.push(TimedEvent::note_on(from, 1, note, 0.8));
        track.push(TimedEvent::note_off(to, 1, note));
    }

    #[test]
    fn identical_guess_scores_perfect() {
        let phrase = compose_phrase(L);
        let score = GuessEvaluator::default().evaluate(&phrase, &phrase.clone());
        assert_eq!(score, Score::new(7, 7));
    }

    #[test]
    fn empty_guess_scores_zero() {
        let phrase = compose_phrase(L);
        let score = GuessEvaluator::default().evaluate(&phrase, &guess());
        assert_eq!(score, Score::new(0, 7));
    }

    #[test]
    fn slightly_late_guess_still_counts() {
        let phrase = compose_phrase(L);
        let mut g = guess();
        play(&mut g, 67, 40, 199);
        let first = GuessEvaluator::default().verdicts(&phrase, &g).next().unwrap();
        assert_eq!((first.from, first.to), (0, 199));
        assert_eq!(first.overlap, 159);
        assert!(first.correct);
    }

    #[test]
    fn split_notes_accumulate() {
        let phrase = compose_phrase(L);
        let mut g = guess();
        // 69 is held over [200, 299): two 25-sample stabs cover 50 of 99.
        play(&mut g, 69, 200, 225);
        play(&mut g, 69, 250, 275);
        let v: Vec<_> = GuessEvaluator::default().verdicts(&phrase, &g).collect();
        assert_eq!(v[1].note, 69);
        assert_eq!(v[1].overlap, 50);
        assert!(v[1].correct);
    }

    #[test]
    fn short_coverage_is_wrong() {
        let phrase = compose_phrase(L);
        let mut g = guess();
        play(&mut g, 69, 200, 230);
        let v: Vec<_> = GuessEvaluator::default().verdicts(&phrase, &g).collect();
        assert_eq!(v[1].overlap, 30);
        assert!(!v[1].correct);
    }

    #[test]
    fn wrong_pitch_is_wrong() {
        let phrase = compose_phrase(L);
        let mut g = guess();
        play(&mut g, 68, 0, 199);
        let score = GuessEvaluator::default().evaluate(&phrase, &g);
        assert_eq!(score.correct, 0);
    }

    #[test]
    fn held_over_note_counts_from_interval_start() {
        let phrase = compose_phrase(L);
        let mut g = guess();
        // 69 is also the fifth note, held over [600, 899).
        play(&mut g, 69, 500, 800);
        let v: Vec<_> = GuessEvaluator::default().verdicts(&phrase, &g).collect();
        assert_eq!(v[4].from, 600);
        assert_eq!(v[4].overlap, 200);
        assert!(v[4].correct);
    }

    #[test]
    fn unmatched_note_on_runs_to_window_end() {
        let phrase = compose_phrase(L);
        let mut g = guess();
        g.push(TimedEvent::note_on(1_100, 1, 67, 1.0));
        let last = GuessEvaluator::default().verdicts(&phrase, &g).last().unwrap();
        assert_eq!((last.from, last.to), (1_100, 1_199));
        assert_eq!(last.overlap, 99);
        assert!(last.correct);
    }

    #[test]
    fn guess_with_only_note_offs_is_harmless() {
        let phrase = compose_phrase(L);
        let mut g = guess();
        g.push(TimedEvent::note_off(10, 1, 67));
        g.push(TimedEvent::note_off(500, 1, 72));
        assert_eq!(GuessEvaluator::default().evaluate(&phrase, &g), Score::new(0, 7));
    }

    #[test]
    fn trailing_phrase_note_on_uses_window_end() {
        let mut phrase = EventTrack::new(100);
        phrase.push(TimedEvent::note_on(50, 1, 60, 1.0));
        let mut g = EventTrack::new(100);
        play(&mut g, 60, 50, 90);
        let v = GuessEvaluator::default().verdicts(&phrase, &g).next().unwrap();
        assert_eq!(v.to, 100);
        assert_eq!(v.overlap, 40);
        assert!(v.correct);
    }

    #[test]
    fn zero_length_note_is_never_correct() {
        let mut phrase = EventTrack::new(100);
        phrase.push(TimedEvent::note_on(10, 1, 60, 1.0));
        phrase.push(TimedEvent::note_off(10, 1, 60));
        let mut g = EventTrack::new(100);
        play(&mut g, 60, 0, 50);
        let v = GuessEvaluator::default().verdicts(&phrase, &g).next().unwrap();
        assert_eq!(v.ratio, 0.0);
        assert!(!v.correct);
    }

    #[test]
    fn rest_notes_are_not_scored() {
        let mut phrase = EventTrack::new(100);
        phrase.push(TimedEvent::note_on(0, 1, 0, 1.0));
        phrase.push(TimedEvent::note_off(50, 1, 0));
        assert_eq!(GuessEvaluator::default().evaluate(&phrase, &guess()), Score::new(0, 0));
    }

    #[test]
    fn custom_threshold() {
        let phrase = compose_phrase(L);
        let mut g = guess();
        play(&mut g, 69, 200, 230);
        let strict = GuessEvaluator::new(0.9).verdicts(&phrase, &g).nth(1).unwrap();
        let loose = GuessEvaluator::new(0.2).verdicts(&phrase, &g).nth(1).unwrap();
        assert!(!strict.correct);
        assert!(loose.correct);
        assert_eq!(GuessEvaluator::new(0.9).threshold(), 0.9);
        assert_eq!(GuessEvaluator::default().threshold(), MATCH_THRESHOLD);
    }
}

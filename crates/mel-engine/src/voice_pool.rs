//! VoicePool: fixed set of tone voices sharing one wavetable.

use mel_ir::config::VOICE_COUNT;
use mel_ir::{AudioBuffer, NoteEvent};

use crate::voice::{ToneVoice, VoiceState};
use crate::wavetable::{Sound, Wavetable};

/// Identifier for a voice slot in the pool.
pub type VoiceId = usize;

/// Centralized pool of voices with their wavetable.
pub struct VoicePool {
    /// Voice slots, allocated once.
    voices: [ToneVoice; VOICE_COUNT],
    /// Table every voice reads from.
    table: Wavetable,
    /// Sound the pool plays.
    sound: Sound,
    sample_rate: f64,
    /// Running trigger count, stamped on each voice at note-on.
    triggers: u64,
}

impl VoicePool {
    /// Create a pool of idle sine voices.
    pub fn new(sample_rate: f64) -> Self {
        Self::with_sound(Sound::Sine, sample_rate)
    }

    pub fn with_sound(sound: Sound, sample_rate: f64) -> Self {
        Self {
            voices: [ToneVoice::new(); VOICE_COUNT],
            table: Wavetable::for_sound(sound),
            sound,
            sample_rate,
            triggers: 0,
        }
    }

    /// Start a note, returning the voice that plays it.
    ///
    /// A note still sounding on the same `(channel, note)` is released
    /// first. If no voice is idle one is stolen (priority: tailing-off
    /// voice closest to silence, then the oldest held voice).
    pub fn note_on(&mut self, channel: u8, note: u8, velocity: f32) -> Option<VoiceId> {
        for voice in &mut self.voices {
            if voice.is_active() && voice.channel == channel && voice.note == note {
                voice.release(true);
            }
        }

        let sound = self.sound;
        let id = self
            .voices
            .iter()
            .position(|v| !v.is_active() && v.can_play(sound))
            .or_else(|| self.find_steal_candidate())?;

        self.triggers += 1;
        let voice = &mut self.voices[id];
        voice.silence();
        voice.trigger(channel, note, velocity, self.sample_rate);
        voice.started_at = self.triggers;
        Some(id)
    }

    /// Find the best voice to steal among those that can play the pool's sound.
    fn find_steal_candidate(&self) -> Option<VoiceId> {
        let sound = self.sound;
        self.voices
            .iter()
            .enumerate()
            .filter(|(_, v)| v.can_play(sound))
            .min_by(|(_, a), (_, b)| {
                let rank = |v: &ToneVoice| match v.state() {
                    VoiceState::Idle => 0u8,
                    VoiceState::TailingOff => 1,
                    VoiceState::Held => 2,
                };
                rank(a)
                    .cmp(&rank(b))
                    .then(a.tail_off.total_cmp(&b.tail_off))
                    .then(a.started_at.cmp(&b.started_at))
            })
            .map(|(i, _)| i)
    }

    /// Release every held voice playing `(channel, note)`.
    pub fn note_off(&mut self, channel: u8, note: u8, allow_tail_off: bool) {
        for voice in &mut self.voices {
            if voice.key_down && voice.channel == channel && voice.note == note {
                voice.release(allow_tail_off);
            }
        }
    }

    /// Release every sounding voice.
    pub fn all_notes_off(&mut self, allow_tail_off: bool) {
        for voice in &mut self.voices {
            voice.release(allow_tail_off);
        }
    }

    /// Apply one note event arriving on `channel`.
    pub fn apply(&mut self, channel: u8, event: &NoteEvent) {
        match *event {
            NoteEvent::NoteOn { note, velocity } => {
                self.note_on(channel, note, velocity);
            }
            NoteEvent::NoteOff { note } => self.note_off(channel, note, true),
        }
    }

    /// Change the output sample rate, retuning sounding voices.
    pub fn set_sample_rate(&mut self, sample_rate: f64) {
        self.sample_rate = sample_rate;
        for voice in &mut self.voices {
            voice.retune(sample_rate);
        }
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Get a reference to a voice.
    pub fn get(&self, id: VoiceId) -> Option<&ToneVoice> {
        self.voices.get(id)
    }

    /// Get a mutable reference to a voice.
    pub fn get_mut(&mut self, id: VoiceId) -> Option<&mut ToneVoice> {
        self.voices.get_mut(id)
    }

    /// Count of sounding voices.
    pub fn active_count(&self) -> usize {
        self.voices.iter().filter(|v| v.is_active()).count()
    }

    /// Render all voices into frames `start..start + len` of the output buffer.
    pub fn render(&mut self, output: &mut AudioBuffer, start: usize, len: usize) {
        let table = &self.table;
        for voice in &mut self.voices {
            voice.render(table, output, start, len);
        }
    }
}

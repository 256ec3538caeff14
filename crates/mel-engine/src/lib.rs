//! Real-time looper engine for melodious.
//!
//! Plays a backing rhythm and a target phrase on a small wavetable
//! synth, listens for the phrase to be played back on the next loop, and
//! scores the attempt. [`Looper`] is the audio tick; everything it owns is
//! allocated before the stream starts.

mod arrangement;
mod block_events;
pub mod composer;
mod evaluator;
mod frequency;
mod live;
mod looper;
mod monitor;
mod scheduler;
mod voice;
mod voice_pool;
mod wavetable;

pub use arrangement::{Arrangement, ArrangementHandle};
pub use block_events::BlockEvents;
pub use composer::{compose_phrase, compose_rhythm, ScriptedTracks};
pub use evaluator::{GuessEvaluator, NoteVerdict};
pub use frequency::{note_to_hz, phase_increment};
pub use live::{live_channel, LiveInput, LiveNote, LiveQueue, SampleClock};
pub use looper::{IdleSwitch, Looper};
pub use monitor::{LoopMonitor, Overflows};
pub use scheduler::LoopScheduler;
pub use voice::{ToneVoice, VoiceState};
pub use voice_pool::{VoiceId, VoicePool};
pub use wavetable::{Sound, Wavetable};

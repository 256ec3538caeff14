//! Core data types for the melodious looper.
//!
//! Events, tracks, loop phase, scores and the fixed engine configuration.
//! The engine, audio backend and controller all speak these types.
//!
//! Designed to be `no_std` compatible with the `alloc` crate.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod audio_buffer;
pub mod config;
mod event;
mod loop_state;
mod track;

pub use audio_buffer::AudioBuffer;
pub use config::{ConfigError, LooperConfig};
pub use event::{NoteEvent, SampleTime, TimedEvent};
pub use loop_state::{LoopSnapshot, Phase, Score};
pub use track::{CaptureFull, EventTrack};

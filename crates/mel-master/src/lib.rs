//! Headless controller for the melodious looper.
//!
//! Owns the audio stream, hands out the live input, and collects scores
//! and progress. Offline rendering and MIDI hookup live here too so the
//! CLI stays thin.

mod midi;
mod render;
mod wav;

use mel_audio::{AudioOutput, CpalOutput};
use mel_engine::{ArrangementHandle, IdleSwitch, Looper};
use ringbuf::traits::Consumer;
use ringbuf::HeapCons;

// Re-export common types so callers don't need mel-ir/mel-engine directly.
pub use mel_audio::AudioError;
pub use mel_engine::{LiveInput, LiveNote, LoopMonitor, Overflows};
pub use mel_ir::{ConfigError, EventTrack, LoopSnapshot, LooperConfig, NoteEvent, Phase, Score, TimedEvent};

pub use midi::{connect_midi, list_midi_ports, MidiConnection};
pub use render::{render_loops, RenderedLoops};
pub use wav::{samples_to_wav, write_wav};

#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    #[error(transparent)]
    Audio(#[from] AudioError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("MIDI error: {0}")]
    Midi(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("not playing")]
    NotPlaying,
}

/// Headless looper controller: owns the stream while playing.
pub struct Controller {
    block_size: usize,
    playback: Option<PlaybackHandle>,
}

struct PlaybackHandle {
    output: CpalOutput,
    scores: HeapCons<Score>,
    monitor: LoopMonitor,
    arrangement: ArrangementHandle,
    idle: IdleSwitch,
    live: Option<LiveInput>,
    /// Overflow total last reported
    reported_overflows: u64,
}

impl Controller {
    /// Controller that asks the engine for at most `block_size` frames per chunk.
    pub fn new(block_size: usize) -> Self {
        Self {
            block_size,
            playback: None,
        }
    }

    // --- Real-time playback ---

    /// Open the default output device and start looping.
    pub fn play(&mut self) -> Result<(), ControllerError> {
        self.stop();

        let mut output = CpalOutput::new()?;
        let config = LooperConfig::new(f64::from(output.sample_rate()), self.block_size);
        let (looper, live) = Looper::new(config)?;
        let monitor = looper.monitor();
        let arrangement = looper.arrangement_handle();
        let idle = looper.idle_switch();

        let scores = output.attach(looper)?;
        output.start()?;
        tracing::info!(
            sample_rate = config.sample_rate,
            block_size = config.block_size,
            loop_length = config.loop_length(),
            "looper started"
        );

        self.playback = Some(PlaybackHandle {
            output,
            scores,
            monitor,
            arrangement,
            idle,
            live: Some(live),
            reported_overflows: 0,
        });
        Ok(())
    }

    pub fn stop(&mut self) {
        if let Some(mut pb) = self.playback.take() {
            if let Err(err) = pb.output.stop() {
                tracing::warn!(%err, "failed to pause stream");
            }
            tracing::info!(loops = pb.monitor.snapshot().loops_completed, "looper stopped");
        }
    }

    pub fn is_playing(&self) -> bool {
        self.playback.as_ref().is_some_and(|p| p.output.is_running())
    }

    /// Live input for a keyboard or MIDI thread; handed out once per session.
    pub fn take_live_input(&mut self) -> Option<LiveInput> {
        self.playback.as_mut()?.live.take()
    }

    /// Park the loop in Idle (rhythm only) or resume with playback.
    pub fn set_idle(&self, idle: bool) -> Result<(), ControllerError> {
        let pb = self.playback.as_ref().ok_or(ControllerError::NotPlaying)?;
        pb.idle.set(idle);
        Ok(())
    }

    /// Change the block size; the loop restarts from its beginning.
    pub fn set_block_size(&mut self, block_size: usize) -> Result<(), ControllerError> {
        if let Some(pb) = &self.playback {
            let sample_rate = pb.arrangement.config().sample_rate;
            pb.arrangement.reconfigure(sample_rate, block_size)?;
        }
        self.block_size = block_size;
        Ok(())
    }

    pub fn snapshot(&self) -> Option<LoopSnapshot> {
        Some(self.playback.as_ref()?.monitor.snapshot())
    }

    pub fn last_score(&self) -> Option<Score> {
        self.playback.as_ref()?.monitor.last_score()
    }

    pub fn overflows(&self) -> Overflows {
        self.playback
            .as_ref()
            .map(|p| p.monitor.overflows())
            .unwrap_or_default()
    }

    /// Scores of listening loops finished since the last call, oldest first.
    ///
    /// Also reports any events lost to full queues since the last call.
    pub fn drain_scores(&mut self) -> Vec<Score> {
        let Some(pb) = self.playback.as_mut() else {
            return Vec::new();
        };

        let overflows = pb.monitor.overflows();
        if overflows.total() > pb.reported_overflows {
            tracing::warn!(
                live_queue = overflows.live_queue,
                block_events = overflows.block_events,
                capture = overflows.capture,
                "events dropped"
            );
            pb.reported_overflows = overflows.total();
        }

        let scores: Vec<Score> = pb.scores.pop_iter().collect();
        for score in &scores {
            tracing::info!(%score, ratio = score.ratio(), "loop scored");
        }
        scores
    }
}

impl Default for Controller {
    fn default() -> Self {
        Self::new(LooperConfig::default().block_size)
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        self.stop();
    }
}

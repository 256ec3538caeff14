//! Audio output trait and error types.

use mel_engine::Looper;
use mel_ir::Score;
use ringbuf::HeapCons;

/// Error type for audio operations.
#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    #[error("device init error: {0}")]
    DeviceInit(String),
    #[error("stream create error: {0}")]
    StreamCreate(String),
    #[error("playback error: {0}")]
    Playback(String),
    #[error("no audio output device available")]
    NoDevice,
}

/// Trait for audio output backends.
pub trait AudioOutput {
    /// Device sample rate in Hz.
    fn sample_rate(&self) -> u32;

    /// Interleaved channels per frame.
    fn channels(&self) -> u16;

    /// Hand `looper` to the device callback.
    ///
    /// Scores of finished listening loops come back through the returned
    /// consumer.
    fn attach(&mut self, looper: Looper) -> Result<HeapCons<Score>, AudioError>;

    /// Start playback.
    fn start(&mut self) -> Result<(), AudioError>;

    /// Stop playback; the device callback outputs silence.
    fn stop(&mut self) -> Result<(), AudioError>;
}

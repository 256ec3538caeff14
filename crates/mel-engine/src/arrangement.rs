//! Stream configuration plus the scripted tracks built for it, published
//! to the audio tick without locking.

use std::sync::{Arc, Mutex};

use arc_swap::{ArcSwap, Guard};
use mel_ir::{ConfigError, LooperConfig, SampleTime};

use crate::composer::ScriptedTracks;

/// Everything the tick needs that depends on the stream configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct Arrangement {
    pub config: LooperConfig,
    pub loop_length: SampleTime,
    pub tracks: ScriptedTracks,
    /// Bumped on every publication
    pub generation: u64,
}

impl Arrangement {
    /// Validate `config` and compose its tracks.
    pub fn build(config: LooperConfig, generation: u64) -> Result<Self, ConfigError> {
        config.validate()?;
        let loop_length = config.loop_length();
        Ok(Self {
            config,
            loop_length,
            tracks: ScriptedTracks::compose(loop_length),
            generation,
        })
    }
}

/// Shared handle for reading and replacing the current arrangement.
///
/// A replacement is built completely before it is published, so the tick
/// only ever sees whole track sets.
#[derive(Clone, Debug)]
pub struct ArrangementHandle {
    current: Arc<ArcSwap<Arrangement>>,
    /// Replaced arrangements, kept alive here so the tick never frees one.
    /// An entry is dropped once nothing else holds it.
    retired: Arc<Mutex<Vec<Arc<Arrangement>>>>,
}

impl ArrangementHandle {
    pub fn new(config: LooperConfig) -> Result<Self, ConfigError> {
        let arrangement = Arrangement::build(config, 0)?;
        Ok(Self {
            current: Arc::new(ArcSwap::from_pointee(arrangement)),
            retired: Arc::new(Mutex::new(Vec::new())),
        })
    }

    /// Current arrangement; cheap enough for every block.
    pub fn load(&self) -> Guard<Arc<Arrangement>> {
        self.current.load()
    }

    /// Current arrangement as an owned pointer.
    pub fn load_full(&self) -> Arc<Arrangement> {
        self.current.load_full()
    }

    pub fn config(&self) -> LooperConfig {
        self.current.load().config
    }

    /// Rebuild for a new sample rate and block size, then publish.
    ///
    /// On error the current arrangement stays in place.
    pub fn reconfigure(&self, sample_rate: f64, block_size: usize) -> Result<(), ConfigError> {
        let current = self.current.load_full();
        let config = LooperConfig {
            sample_rate,
            block_size,
            ..current.config
        };
        let next = Arrangement::build(config, current.generation + 1)?;
        tracing::info!(
            sample_rate,
            block_size,
            loop_length = next.loop_length,
            generation = next.generation,
            "publishing arrangement"
        );
        let previous = self.current.swap(Arc::new(next));
        if let Ok(mut retired) = self.retired.lock() {
            retired.retain(|a| Arc::strong_count(a) > 1);
            retired.push(previous);
        }
        Ok(())
    }

    /// Replaced arrangements not yet released.
    pub fn retired_count(&self) -> usize {
        self.retired.lock().map_or(0, |r| r.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_composes_tracks() {
        let arrangement = Arrangement::build(LooperConfig::default(), 0).unwrap();
        assert_eq!(arrangement.loop_length, 240_000);
        assert_eq!(arrangement.tracks.loop_length, 240_000);
        assert_eq!(arrangement.tracks.phrase.window(), 240_000);
    }

    #[test]
    fn build_rejects_invalid_config() {
        let err = Arrangement::build(LooperConfig::new(0.0, 512), 0).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidSampleRate(_)));
    }

    #[test]
    fn reconfigure_publishes_new_generation() {
        let handle = ArrangementHandle::new(LooperConfig::default()).unwrap();
        let reader = handle.clone();
        handle.reconfigure(44_100.0, 256).unwrap();
        let current = reader.load();
        assert_eq!(current.generation, 1);
        assert_eq!(current.loop_length, 220_500);
        assert_eq!(current.config.block_size, 256);
        assert_eq!(current.tracks, ScriptedTracks::compose(220_500));
    }

    #[test]
    fn retired_arrangements_live_while_held() {
        let handle = ArrangementHandle::new(LooperConfig::default()).unwrap();
        let held = handle.load_full();
        handle.reconfigure(44_100.0, 256).unwrap();
        handle.reconfigure(32_000.0, 256).unwrap();
        // Generation 0 is still held, so it stays retired next to generation 1.
        assert_eq!(handle.retired_count(), 2);
        assert_eq!(held.generation, 0);
        assert!(Arc::strong_count(&held) > 1);

        drop(held);
        handle.reconfigure(48_000.0, 256).unwrap();
        // Only the arrangement swapped out last is kept.
        assert_eq!(handle.retired_count(), 1);
    }

    #[test]
    fn failed_reconfigure_keeps_current() {
        let handle = ArrangementHandle::new(LooperConfig::default()).unwrap();
        assert!(handle.reconfigure(48_000.0, 0).is_err());
        assert_eq!(handle.load().generation, 0);
        assert_eq!(handle.config(), LooperConfig::default());
    }
}

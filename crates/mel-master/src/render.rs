//! Offline rendering of whole loops.

use mel_engine::{LiveNote, Looper};
use mel_ir::{ConfigError, EventTrack, LooperConfig, Phase, Score};

/// Mono audio and scores from an offline run.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RenderedLoops {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub loop_length: usize,
    pub scores: Vec<Score>,
}

impl RenderedLoops {
    /// Samples of loop `index`.
    pub fn loop_samples(&self, index: usize) -> &[f32] {
        let start = (index * self.loop_length).min(self.samples.len());
        let end = (start + self.loop_length).min(self.samples.len());
        &self.samples[start..end]
    }
}

/// Render `loops` whole loops from a fresh looper.
///
/// When `guess` is given it is played into the live input during every
/// listening loop, its times taken relative to the loop start.
pub fn render_loops(
    config: LooperConfig,
    loops: usize,
    guess: Option<&EventTrack>,
) -> Result<RenderedLoops, ConfigError> {
    let (mut looper, mut input) = Looper::new(config)?;
    let loop_length = looper.loop_length() as usize;
    let block = config.block_size;

    let mut out = vec![0.0f32; block];
    let mut rendered = RenderedLoops {
        samples: Vec::with_capacity(loops * loop_length),
        sample_rate: config.sample_rate.round() as u32,
        loop_length,
        scores: Vec::new(),
    };

    for index in 0..loops {
        let loop_start = looper.clock().now();
        let replay = guess.filter(|_| looper.phase() == Phase::Listening);
        let mut cursor = 0;
        let mut done = 0;
        while done < loop_length {
            let len = block.min(loop_length - done);
            if let Some(guess) = replay {
                // Feed only what this block needs so the queue never fills.
                let until = (done + len) as u64;
                while let Some(event) = guess.get(cursor).filter(|e| u64::from(e.time) < until) {
                    input.push(LiveNote {
                        time: loop_start + u64::from(event.time),
                        channel: event.channel,
                        event: event.event,
                    });
                    cursor += 1;
                }
            }
            if let Some(score) = looper.process_block(&mut out[..len], 1) {
                tracing::info!(loop_index = index, %score, "loop scored");
                rendered.scores.push(score);
            }
            rendered.samples.extend_from_slice(&out[..len]);
            done += len;
        }
    }

    tracing::debug!(
        loops,
        frames = rendered.samples.len(),
        scores = rendered.scores.len(),
        "offline render finished"
    );
    Ok(rendered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mel_engine::compose_phrase;

    fn small_config() -> LooperConfig {
        LooperConfig {
            sample_rate: 1_000.0,
            block_size: 64,
            seconds_per_loop: 1.2,
        }
    }

    #[test]
    fn renders_whole_loops() {
        let out = render_loops(small_config(), 3, None).unwrap();
        assert_eq!(out.loop_length, 1_200);
        assert_eq!(out.samples.len(), 3_600);
        assert_eq!(out.sample_rate, 1_000);
        assert_eq!(out.scores, [Score::new(0, 7)]);
        assert_eq!(out.loop_samples(2).len(), 1_200);
        assert!(out.loop_samples(3).is_empty());
    }

    #[test]
    fn scripted_guess_is_scored() {
        let phrase = compose_phrase(1_200);
        let out = render_loops(small_config(), 4, Some(&phrase)).unwrap();
        assert_eq!(out.scores, [Score::new(7, 7), Score::new(7, 7)]);
    }

    #[test]
    fn rendering_is_deterministic() {
        let a = render_loops(small_config(), 2, None).unwrap();
        let b = render_loops(small_config(), 2, None).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let err = render_loops(LooperConfig::new(48_000.0, 0), 1, None).unwrap_err();
        assert_eq!(err, ConfigError::ZeroBlockSize);
    }
}

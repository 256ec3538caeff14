//! The audio tick: merges events, renders voices, drives the loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use arc_swap::Guard;
use mel_ir::config::LIVE_QUEUE_CAPACITY;
use mel_ir::{AudioBuffer, ConfigError, EventTrack, LoopSnapshot, LooperConfig, Phase, SampleTime, Score};

use crate::arrangement::{Arrangement, ArrangementHandle};
use crate::block_events::BlockEvents;
use crate::live::{live_channel, LiveInput, LiveQueue, SampleClock};
use crate::monitor::LoopMonitor;
use crate::scheduler::LoopScheduler;
use crate::voice_pool::VoicePool;

/// Idle request shared with other threads, applied at the next block.
#[derive(Clone, Debug, Default)]
pub struct IdleSwitch(Arc<AtomicBool>);

impl IdleSwitch {
    pub fn set(&self, idle: bool) {
        self.0.store(idle, Ordering::Relaxed);
    }

    pub fn get(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// The looper engine.
///
/// Owned by the audio callback. Everything it touches per block is
/// allocated up front; other threads talk to it through [`LiveInput`],
/// [`ArrangementHandle`] and [`LoopMonitor`].
pub struct Looper {
    handle: ArrangementHandle,
    /// Arrangement the current loop is running on
    arrangement: Arc<Arrangement>,
    voices: VoicePool,
    scheduler: LoopScheduler,
    block: BlockEvents,
    live: LiveQueue,
    clock: SampleClock,
    /// Mono render target, `block_size` frames
    scratch: AudioBuffer,
    monitor: LoopMonitor,
    idle: IdleSwitch,
}

impl Looper {
    /// Create a looper and the live-input handle that feeds it.
    pub fn new(config: LooperConfig) -> Result<(Self, LiveInput), ConfigError> {
        let handle = ArrangementHandle::new(config)?;
        let arrangement = handle.load_full();
        let clock = SampleClock::new();
        let (input, live) = live_channel(LIVE_QUEUE_CAPACITY, clock.clone());
        let looper = Self {
            voices: VoicePool::new(config.sample_rate),
            scheduler: LoopScheduler::new(arrangement.loop_length),
            block: BlockEvents::new(),
            live,
            clock,
            scratch: AudioBuffer::new(1, config.block_size),
            monitor: LoopMonitor::new(),
            idle: IdleSwitch::default(),
            arrangement,
            handle,
        };
        Ok((looper, input))
    }

    /// Render `out` (interleaved, `channels` per frame) and advance the loop.
    ///
    /// Buffers longer than the block size are processed in block-sized
    /// chunks. Returns the score if a listening loop ended in this call.
    pub fn process_block(&mut self, out: &mut [f32], channels: usize) -> Option<Score> {
        #[cfg(feature = "alloc_check")]
        {
            assert_no_alloc::assert_no_alloc(|| self.tick(out, channels))
        }
        #[cfg(not(feature = "alloc_check"))]
        {
            self.tick(out, channels)
        }
    }

    fn tick(&mut self, out: &mut [f32], channels: usize) -> Option<Score> {
        out.fill(0.0);
        if channels == 0 {
            return None;
        }
        self.adopt_latest();
        self.follow_idle_switch();

        let frames = out.len() / channels;
        let chunk = self.arrangement.config.block_size.min(self.scratch.frames()).max(1);
        let mut score = None;
        let mut done = 0;
        while done < frames {
            let len = chunk.min(frames - done);
            if let Some(s) = self.render_chunk(len) {
                score = Some(s);
            }
            self.scratch.write_interleaved(&mut out[done * channels..], channels, len);
            done += len;
        }

        self.monitor.record_overflows(
            self.live.dropped(),
            self.block.take_dropped(),
            self.scheduler.take_capture_dropped(),
        );
        self.monitor.publish(self.scheduler.snapshot(), self.scheduler.last_score());
        score
    }

    /// Switch to a newly published arrangement, if any.
    fn adopt_latest(&mut self) {
        let latest = self.handle.load();
        if latest.generation == self.arrangement.generation {
            return;
        }
        self.arrangement = Guard::into_inner(latest);
        self.voices.set_sample_rate(self.arrangement.config.sample_rate);
        self.voices.all_notes_off(false);
        self.scheduler.resize(self.arrangement.loop_length);
    }

    fn follow_idle_switch(&mut self) {
        let want = self.idle.get();
        if want != (self.scheduler.phase() == Phase::Idle) {
            self.apply_idle(want);
        }
    }

    fn apply_idle(&mut self, idle: bool) {
        self.scheduler.set_idle(idle);
        if idle {
            self.voices.all_notes_off(true);
        }
    }

    /// Merge, render and advance `len` frames into the scratch buffer.
    fn render_chunk(&mut self, len: usize) -> Option<Score> {
        let tracks = &self.arrangement.tracks;

        self.block.clear();
        self.scheduler.collect_block(tracks, len, &mut self.block);
        let scheduler = &mut self.scheduler;
        let block = &mut self.block;
        self.live
            .drain_block(self.clock.now(), len, |event| scheduler.accept_live(event, block));

        self.scratch.silence();
        let mut start = 0;
        loop {
            for i in self.block.drain_until(start as SampleTime) {
                if let Some(&event) = self.block.get(i) {
                    self.voices.apply(event.channel, &event.event);
                }
            }
            let end = self
                .block
                .next_offset()
                .map_or(len, |offset| (offset as usize).min(len));
            self.voices.render(&mut self.scratch, start, end - start);
            if end >= len {
                break;
            }
            start = end;
        }

        self.clock.advance(len as u64);
        self.scheduler.advance(len, &tracks.phrase)
    }

    /// Publish a new sample rate and block size; adopted at the next block.
    pub fn reconfigure(&self, sample_rate: f64, block_size: usize) -> Result<(), ConfigError> {
        self.handle.reconfigure(sample_rate, block_size)
    }

    /// Park in Idle (rhythm only) or resume in Playback.
    pub fn set_idle(&mut self, idle: bool) {
        self.idle.set(idle);
        self.apply_idle(idle);
    }

    /// Switch for parking the looper once it has moved to the audio thread.
    pub fn idle_switch(&self) -> IdleSwitch {
        self.idle.clone()
    }

    pub fn snapshot(&self) -> LoopSnapshot {
        self.scheduler.snapshot()
    }

    pub fn phase(&self) -> Phase {
        self.scheduler.phase()
    }

    pub fn last_score(&self) -> Option<Score> {
        self.scheduler.last_score()
    }

    /// Guess captured so far in the current listening loop.
    pub fn capture(&self) -> &EventTrack {
        self.scheduler.capture()
    }

    pub fn config(&self) -> LooperConfig {
        self.arrangement.config
    }

    pub fn loop_length(&self) -> SampleTime {
        self.arrangement.loop_length
    }

    /// Handle for publishing a new arrangement from another thread.
    pub fn arrangement_handle(&self) -> ArrangementHandle {
        self.handle.clone()
    }

    pub fn monitor(&self) -> LoopMonitor {
        self.monitor.clone()
    }

    pub fn clock(&self) -> SampleClock {
        self.clock.clone()
    }

    pub fn active_voices(&self) -> usize {
        self.voices.active_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::live::LiveNote;
    use mel_ir::config::VOICE_COUNT;
    use mel_ir::NoteEvent;

    /// 1200-sample loop (1.2 s at 1 kHz) keeps whole-loop tests fast.
    fn small_config() -> LooperConfig {
        LooperConfig {
            sample_rate: 1_000.0,
            block_size: 16,
            seconds_per_loop: 1.2,
        }
    }

    fn run_frames(looper: &mut Looper, frames: usize) -> (Vec<f32>, Vec<Score>) {
        let mut audio = Vec::new();
        let mut scores = Vec::new();
        let mut buf = [0.0f32; 32];
        let mut left = frames;
        while left > 0 {
            let n = left.min(16);
            if let Some(s) = looper.process_block(&mut buf[..n * 2], 2) {
                scores.push(s);
            }
            audio.extend_from_slice(&buf[..n * 2]);
            left -= n;
        }
        (audio, scores)
    }

    #[test]
    fn first_loop_is_audible_playback() {
        let (mut looper, _input) = Looper::new(small_config()).unwrap();
        assert_eq!(looper.loop_length(), 1_200);
        let (audio, scores) = run_frames(&mut looper, 256);
        assert!(audio.iter().any(|&s| s != 0.0));
        assert!(scores.is_empty());
        assert_eq!(looper.phase(), Phase::Playback);
    }

    #[test]
    fn stereo_channels_carry_same_signal() {
        let (mut looper, _input) = Looper::new(small_config()).unwrap();
        let (audio, _) = run_frames(&mut looper, 64);
        for frame in audio.chunks(2) {
            assert_eq!(frame[0], frame[1]);
        }
    }

    #[test]
    fn loops_alternate_and_score() {
        let (mut looper, _input) = Looper::new(small_config()).unwrap();
        let (_, scores) = run_frames(&mut looper, 1_200);
        assert!(scores.is_empty());
        assert_eq!(looper.phase(), Phase::Listening);
        let (_, scores) = run_frames(&mut looper, 1_200);
        assert_eq!(scores, [Score::new(0, 7)]);
        assert_eq!(looper.phase(), Phase::Playback);
        assert_eq!(looper.last_score(), Some(Score::new(0, 7)));
        assert_eq!(looper.monitor().last_score(), Some(Score::new(0, 7)));
    }

    #[test]
    fn replayed_phrase_scores_perfect() {
        let (mut looper, mut input) = Looper::new(small_config()).unwrap();
        run_frames(&mut looper, 1_200);
        let start = looper.clock().now();
        let phrase = looper.arrangement.tracks.phrase.clone();
        for event in phrase.iter() {
            assert!(input.push(LiveNote {
                time: start + event.time as u64,
                channel: 2,
                event: event.event,
            }));
        }
        let (_, scores) = run_frames(&mut looper, 1_200);
        assert_eq!(scores, [Score::new(7, 7)]);
    }

    #[test]
    fn live_input_is_heard_while_idle() {
        let (mut looper, mut input) = Looper::new(small_config()).unwrap();
        looper.set_idle(true);
        run_frames(&mut looper, 600);
        input.note_on(2, 80, 1.0);
        run_frames(&mut looper, 16);
        let sounding = (0..VOICE_COUNT)
            .filter_map(|i| looper.voices.get(i))
            .any(|v| v.channel == 2 && v.note == 80 && v.is_active());
        assert!(sounding);
        assert!(looper.capture().is_empty());
        assert_eq!(looper.phase(), Phase::Idle);
    }

    #[test]
    fn idle_switch_applies_at_next_block() {
        let (mut looper, _input) = Looper::new(small_config()).unwrap();
        let switch = looper.idle_switch();
        run_frames(&mut looper, 100);
        switch.set(true);
        assert_eq!(looper.phase(), Phase::Playback);
        run_frames(&mut looper, 16);
        assert_eq!(looper.phase(), Phase::Idle);
        switch.set(false);
        run_frames(&mut looper, 16);
        assert_eq!(looper.phase(), Phase::Playback);
    }

    #[test]
    fn odd_buffer_sizes_keep_loop_time() {
        let (mut looper, _input) = Looper::new(small_config()).unwrap();
        let mut buf = vec![0.0f32; 50];
        for _ in 0..24 {
            looper.process_block(&mut buf, 1);
        }
        assert_eq!(looper.clock().now(), 1_200);
        assert_eq!(looper.phase(), Phase::Listening);
        assert_eq!(looper.snapshot().loops_completed, 1);
    }

    #[test]
    fn reconfigure_is_adopted_at_next_block() {
        let (mut looper, _input) = Looper::new(small_config()).unwrap();
        run_frames(&mut looper, 400);
        looper.reconfigure(2_000.0, 16).unwrap();
        assert_eq!(looper.loop_length(), 1_200);
        run_frames(&mut looper, 16);
        assert_eq!(looper.loop_length(), 2_400);
        assert_eq!(looper.config().sample_rate, 2_000.0);
        assert_eq!(looper.snapshot().phase, Phase::Playback);
        assert_eq!(looper.scheduler.position(), 16);
    }

    #[test]
    fn zero_channels_is_a_no_op() {
        let (mut looper, _input) = Looper::new(small_config()).unwrap();
        let mut buf = [1.0f32; 8];
        assert_eq!(looper.process_block(&mut buf, 0), None);
        assert_eq!(looper.clock().now(), 0);
    }

    #[test]
    fn monitor_tracks_progress() {
        let (mut looper, _input) = Looper::new(small_config()).unwrap();
        let monitor = looper.monitor();
        run_frames(&mut looper, 300);
        let snap = monitor.snapshot();
        assert_eq!(snap.phase, Phase::Playback);
        assert!((snap.position - 0.25).abs() < 1e-6);
    }

    #[test]
    fn note_events_apply_mid_block() {
        let (mut plain, _unused) = Looper::new(small_config()).unwrap();
        let (mut played, mut input) = Looper::new(small_config()).unwrap();
        run_frames(&mut plain, 608);
        run_frames(&mut played, 608);
        input.push(LiveNote {
            time: 616,
            channel: 2,
            event: NoteEvent::NoteOn { note: 90, velocity: 1.0 },
        });
        let mut a = [0.0f32; 16];
        let mut b = [0.0f32; 16];
        plain.process_block(&mut a, 1);
        played.process_block(&mut b, 1);
        // Identical until the note lands at offset 8.
        assert_eq!(a[..8], b[..8]);
        assert!(a[8..].iter().zip(&b[8..]).any(|(x, y)| x != y));
    }
}

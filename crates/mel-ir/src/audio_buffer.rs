//! Multichannel f32 audio buffer with planar layout.

use alloc::vec;
use alloc::vec::Vec;

/// A multichannel f32 audio buffer in planar layout.
///
/// Data is stored as `channels` contiguous planes of `frames` samples each.
/// `data[ch * frames + frame]` gives the sample for channel `ch` at `frame`.
#[derive(Clone, Debug)]
pub struct AudioBuffer {
    data: Vec<f32>,
    channels: u16,
    frames: usize,
}

impl AudioBuffer {
    /// Create a new silent buffer with the given dimensions.
    pub fn new(channels: u16, frames: usize) -> Self {
        Self {
            data: vec![0.0; channels as usize * frames],
            channels,
            frames,
        }
    }

    /// Fill all samples with zero.
    pub fn silence(&mut self) {
        self.data.fill(0.0);
    }

    /// Number of channels.
    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Number of frames.
    pub fn frames(&self) -> usize {
        self.frames
    }

    /// Read-only access to one channel's sample data.
    pub fn channel(&self, ch: u16) -> &[f32] {
        let start = ch as usize * self.frames;
        &self.data[start..start + self.frames]
    }

    /// Mutable access to one channel's sample data.
    pub fn channel_mut(&mut self, ch: u16) -> &mut [f32] {
        let start = ch as usize * self.frames;
        let len = self.frames;
        &mut self.data[start..start + len]
    }

    /// Add `value` to every channel at `frame`.
    #[inline]
    pub fn add_to_all(&mut self, frame: usize, value: f32) {
        for ch in 0..self.channels as usize {
            self.data[ch * self.frames + frame] += value;
        }
    }

    /// Write the first `frames` frames into an interleaved slice.
    ///
    /// `out` holds `out_channels` samples per frame. Output channels beyond
    /// this buffer's channel count repeat its last channel.
    pub fn write_interleaved(&self, out: &mut [f32], out_channels: usize, frames: usize) {
        if self.channels == 0 || out_channels == 0 {
            return;
        }
        let frames = frames.min(self.frames).min(out.len() / out_channels);
        let last = self.channels as usize - 1;
        for (frame, chunk) in out.chunks_mut(out_channels).take(frames).enumerate() {
            for (ch, sample) in chunk.iter_mut().enumerate() {
                *sample = self.data[ch.min(last) * self.frames + frame];
            }
        }
    }
}

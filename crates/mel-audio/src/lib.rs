//! Audio output backends for the melodious looper.

mod cpal_backend;
mod traits;

pub use cpal_backend::{CpalOutput, SCORE_QUEUE_CAPACITY};
pub use traits::{AudioError, AudioOutput};

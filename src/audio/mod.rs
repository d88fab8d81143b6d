//! Audio module - level sources feeding the meter
//!
//! This module provides:
//! - `LevelSource` trait for anything that emits level snapshots
//! - `CaptureSource`, levels measured on the default input device via cpal
//! - `SyntheticSource`, oscillator-driven levels for demos without a device
//! - `LevelBuffer`, the lock-light slot between the audio and UI threads

mod buffer;
mod capture;
mod synth;

use std::time::Instant;

use thiserror::Error;

use crate::meter::Snapshot;
pub use crate::meter::LEVEL_OFFSET;

#[allow(unused_imports)]
pub use buffer::LevelBuffer;
#[allow(unused_imports)]
pub use capture::{CaptureSource, LevelAccumulator};
#[allow(unused_imports)]
pub use synth::{Lfo, LfoWaveform, SyntheticSource};

/// Floor for level measurements, in dBFS
pub const MIN_DB: f32 = -100.0;

/// Convert a linear amplitude to dBFS, floored at [`MIN_DB`]
pub fn amplitude_to_db(amplitude: f32) -> f32 {
    if amplitude <= 0.0 {
        return MIN_DB;
    }
    (20.0 * amplitude.log10()).max(MIN_DB)
}

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("No input device found")]
    NoDevice,

    #[error("Source has no channels")]
    NoChannels,

    #[error("Failed to get input config: {0}")]
    Config(#[from] cpal::DefaultStreamConfigError),

    #[error("Failed to build input stream: {0}")]
    Build(#[from] cpal::BuildStreamError),

    #[error("Failed to start input stream: {0}")]
    Play(#[from] cpal::PlayStreamError),

    #[error("Unsupported sample format: {0}")]
    UnsupportedFormat(String),
}

/// Anything that periodically emits level snapshots
///
/// Sources are polled from the UI thread; `poll` never blocks.
pub trait LevelSource {
    /// Human-readable source name (for the status line)
    fn name(&self) -> &str;

    fn start(&mut self) -> Result<(), SourceError>;

    fn stop(&mut self);

    fn is_running(&self) -> bool;

    /// The newest snapshot produced since the last poll, if any
    fn poll(&mut self, now: Instant) -> Option<Snapshot>;
}

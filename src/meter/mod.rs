//! Meter module - the animated level meter and its building blocks
//!
//! This module provides:
//! - `MeterConfig`, the validated, immutable meter settings
//! - `Snapshot`, one arrival of per-channel levels and peaks
//! - `Animator`, the fixed-step interpolation state
//! - `Ticker`/`TimerHandle`, cancelable tick scheduling
//! - `LevelMeter`, which ties them to a drawing surface

mod animation;
mod config;
mod error;
mod level_meter;
mod snapshot;
mod timer;

#[allow(unused_imports)]
pub use animation::{Animator, ChannelState, Segment};
#[allow(unused_imports)]
pub use config::{MeterConfig, MeterConfigBuilder, BAR_SLOT, DEFAULT_SCALE, LEVEL_OFFSET};
pub use error::MeterError;
#[allow(unused_imports)]
pub use level_meter::{LevelMeter, MeterState};
pub use snapshot::Snapshot;
#[allow(unused_imports)]
pub use timer::{Clock, SystemClock, TimerHandle, Ticker};

#[cfg(test)]
pub use timer::ManualClock;

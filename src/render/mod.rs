//! Render module - drawing surfaces for the level meter
//!
//! This module provides:
//! - `Surface` trait, the write-only drawing interface the meter targets
//! - `DisplayList`, a retained surface recording one frame of commands
//! - `MeterView`, an egui widget replaying a display list

mod surface;
mod view;

#[allow(unused_imports)]
pub use surface::{DisplayList, DrawCommand, Surface, SurfaceError, TextStyle};
pub use view::MeterView;

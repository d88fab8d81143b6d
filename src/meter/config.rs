//! Meter configuration
//!
//! A `MeterConfig` is built once through [`MeterConfigBuilder`] and never
//! changes afterwards, so the geometry checks done in `build()` hold for the
//! whole life of the meter.

use std::time::Duration;

use eframe::egui::Color32;

use super::error::MeterError;

/// Scale used to normalize bar values when no fixed maximum is configured
pub const DEFAULT_SCALE: f32 = 120.0;

/// Bar values arrive as `dB + LEVEL_OFFSET`; peak markers arrive as raw dB
pub const LEVEL_OFFSET: f32 = 100.0;

/// Horizontal space taken by one channel, in pixels
pub const BAR_SLOT: f32 = 50.0;

/// Validated, immutable meter settings
#[derive(Clone, Debug, PartialEq)]
pub struct MeterConfig {
    width: f32,
    height: f32,
    margin: f32,
    palette: Vec<Color32>,
    background: Color32,
    labels: Vec<String>,
    max_value: Option<f32>,
    duration: Duration,
    steps: u32,
}

impl MeterConfig {
    pub fn builder() -> MeterConfigBuilder {
        MeterConfigBuilder::default()
    }

    /// Surface width in pixels
    pub fn width(&self) -> f32 {
        self.width
    }

    /// Surface height in pixels
    pub fn height(&self) -> f32 {
        self.height
    }

    /// Gap on each side of a bar inside its slot
    pub fn margin(&self) -> f32 {
        self.margin
    }

    /// Bar color for a channel; the palette repeats when it is shorter
    /// than the channel count
    pub fn color_for(&self, channel: usize) -> Color32 {
        self.palette[channel % self.palette.len()]
    }

    pub fn background(&self) -> Color32 {
        self.background
    }

    /// Axis labels, one per channel (may be shorter than the channel count)
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Denominator turning a bar value into a height ratio
    pub fn effective_max(&self) -> f32 {
        self.max_value.unwrap_or(DEFAULT_SCALE)
    }

    /// Number of ticks in one interpolation segment
    pub fn steps(&self) -> u32 {
        self.steps
    }

    /// Delay between two animation ticks
    pub fn tick_interval(&self) -> Duration {
        self.duration / self.steps
    }
}

impl Default for MeterConfig {
    fn default() -> Self {
        let builder = MeterConfigBuilder::default();
        Self {
            width: builder.width,
            height: builder.height,
            margin: builder.margin,
            palette: builder.palette,
            background: builder.background,
            labels: builder.labels,
            max_value: builder.max_value,
            duration: builder.duration,
            steps: builder.steps,
        }
    }
}

/// Builder for [`MeterConfig`]
///
/// ## Example
///
/// ```ignore
/// let config = MeterConfig::builder()
///     .size(200.0, 150.0)
///     .labels(["L", "R"])
///     .build()?;
/// ```
#[derive(Clone, Debug)]
pub struct MeterConfigBuilder {
    width: f32,
    height: f32,
    margin: f32,
    palette: Vec<Color32>,
    background: Color32,
    labels: Vec<String>,
    max_value: Option<f32>,
    duration: Duration,
    steps: u32,
}

impl Default for MeterConfigBuilder {
    fn default() -> Self {
        Self {
            width: 300.0,
            height: 150.0,
            margin: 5.0,
            palette: vec![Color32::from_rgb(0, 128, 0), Color32::from_rgb(0, 0, 255)],
            background: Color32::WHITE,
            labels: Vec::new(),
            max_value: None,
            duration: Duration::from_millis(100),
            steps: 10,
        }
    }
}

impl MeterConfigBuilder {
    pub fn size(mut self, width: f32, height: f32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn margin(mut self, margin: f32) -> Self {
        self.margin = margin;
        self
    }

    pub fn palette(mut self, palette: impl IntoIterator<Item = Color32>) -> Self {
        self.palette = palette.into_iter().collect();
        self
    }

    pub fn background(mut self, background: Color32) -> Self {
        self.background = background;
        self
    }

    pub fn labels<I, L>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = L>,
        L: Into<String>,
    {
        self.labels = labels.into_iter().map(Into::into).collect();
        self
    }

    /// Fix the top of the scale instead of using [`DEFAULT_SCALE`]
    pub fn max_value(mut self, max_value: Option<f32>) -> Self {
        self.max_value = max_value;
        self
    }

    pub fn duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    pub fn steps(mut self, steps: u32) -> Self {
        self.steps = steps;
        self
    }

    /// Validate and freeze the configuration
    pub fn build(self) -> Result<MeterConfig, MeterError> {
        let invalid = |msg: String| Err(MeterError::Configuration(msg));

        if !(self.width.is_finite() && self.width > 0.0) {
            return invalid(format!("width must be positive, got {}", self.width));
        }
        if !(self.height.is_finite() && self.height > 0.0) {
            return invalid(format!("height must be positive, got {}", self.height));
        }
        if !(self.margin.is_finite() && self.margin >= 0.0 && self.margin * 2.0 < BAR_SLOT) {
            return invalid(format!(
                "margin must be in [0, {}), got {}",
                BAR_SLOT / 2.0,
                self.margin
            ));
        }
        if self.palette.is_empty() {
            return invalid("palette must contain at least one color".to_string());
        }
        if let Some(max) = self.max_value {
            if !(max.is_finite() && max > 0.0) {
                return invalid(format!("max value must be positive, got {}", max));
            }
        }
        if self.steps == 0 {
            return invalid("animation needs at least one step".to_string());
        }
        if self.duration.is_zero() {
            return invalid("animation duration must be non-zero".to_string());
        }

        Ok(MeterConfig {
            width: self.width,
            height: self.height,
            margin: self.margin,
            palette: self.palette,
            background: self.background,
            labels: self.labels,
            max_value: self.max_value,
            duration: self.duration,
            steps: self.steps,
        })
    }
}

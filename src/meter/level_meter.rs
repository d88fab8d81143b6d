//! Animated multi-bar level meter
//!
//! The meter decouples the (bursty, irregular) arrival of level snapshots
//! from a fixed visual cadence. Each snapshot starts an interpolation
//! segment that is traversed in `steps` ticks spaced `duration / steps`
//! apart; every tick re-renders the whole meter onto its surface.
//!
//! ## State machine
//!
//! ```text
//! Idle ──update──▶ Animating ──all increments zero──▶ Idle
//! Idle ──update (first call / layout change)──▶ Idle
//! ```
//!
//! ## Layout
//!
//! Each channel owns a 50px slot. Inside the slot the bar is inset by the
//! configured margin and a 2px border. Values arrive on a shifted scale
//! (`dB + 100`), which is why the value label subtracts 100 and the peak
//! marker (raw dB) adds it back.

use std::time::Instant;

use eframe::egui::{pos2, vec2, Color32, Pos2, Rect};

use super::animation::{Animator, ChannelState};
use super::config::{MeterConfig, BAR_SLOT, LEVEL_OFFSET};
use super::error::MeterError;
use super::snapshot::Snapshot;
use super::timer::{Clock, SystemClock, Ticker};
use crate::render::{Surface, TextStyle};

const BORDER: f32 = 2.0;
/// Room kept below the graph for axis labels
const LABEL_RESERVE: f32 = 40.0;
/// Room kept above the tallest bar for its value label
const VALUE_HEADROOM: f32 = 25.0;
const PEAK_THICKNESS: f32 = 2.0;
const TEXT_GAP: f32 = 10.0;
const PEAK_COLOR: Color32 = Color32::from_rgb(0xFF, 0x00, 0x00);
const TEXT_COLOR: Color32 = Color32::from_rgb(0x33, 0x33, 0x33);

/// Whether an animation loop is in flight
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MeterState {
    Idle,
    Animating,
}

/// Level meter bound to one drawing surface
///
/// Generic over the surface it draws on and the clock used to schedule
/// ticks, so tests can drive it with a manual clock and inspect the
/// recorded drawing commands.
pub struct LevelMeter<S: Surface, C: Clock = SystemClock> {
    config: MeterConfig,
    surface: S,
    clock: C,
    animator: Animator,
    ticker: Ticker,
    /// Whether a snapshot has been received yet
    seeded: bool,
    /// Dimensions last applied to the surface
    applied_size: Option<(f32, f32)>,
}

impl<S: Surface> LevelMeter<S> {
    /// Create a meter driven by the wall clock
    pub fn new(config: MeterConfig, surface: S) -> Self {
        Self::with_clock(config, surface, SystemClock)
    }
}

impl<S: Surface, C: Clock> LevelMeter<S, C> {
    /// Create a meter driven by a custom clock
    pub fn with_clock(config: MeterConfig, surface: S, clock: C) -> Self {
        let ticker = Ticker::new(config.tick_interval());
        let animator = Animator::new(config.steps());
        Self {
            config,
            surface,
            clock,
            animator,
            ticker,
            seeded: false,
            applied_size: None,
        }
    }

    /// Push a new set of levels
    ///
    /// The first snapshot, and any snapshot with a different channel
    /// count, is shown immediately. Otherwise the displayed levels start
    /// moving toward the new ones; if a loop is already running it simply
    /// picks up the new targets on its next tick.
    ///
    /// Fails with [`MeterError::InvariantViolation`] when `values` and
    /// `peaks` differ in length, and with [`MeterError::NonFinite`] when any
    /// level is NaN or infinite. Either way the meter is left untouched.
    pub fn update(&mut self, values: &[f32], peaks: &[f32]) -> Result<(), MeterError> {
        if values.len() != peaks.len() {
            return Err(MeterError::InvariantViolation {
                values: values.len(),
                peaks: peaks.len(),
            });
        }
        if let Some(channel) = values
            .iter()
            .zip(peaks)
            .position(|(value, peak)| !(value.is_finite() && peak.is_finite()))
        {
            return Err(MeterError::NonFinite { channel });
        }

        if !self.seeded || values.len() != self.animator.channel_count() {
            if let Some(handle) = self.ticker.cancel() {
                log::debug!("Cancelled tick #{} on channel layout change", handle.id());
            }
            log::debug!(
                "Meter layout: {} -> {} channels",
                self.animator.channel_count(),
                values.len()
            );
            self.animator.snap(values, peaks);
            self.seeded = true;
            self.render();
            return Ok(());
        }

        self.animator.retarget(values, peaks);
        if !self.ticker.is_pending() {
            let now = self.clock.now();
            self.step(now);
        }
        Ok(())
    }

    pub fn update_snapshot(&mut self, snapshot: &Snapshot) -> Result<(), MeterError> {
        self.update(snapshot.values(), snapshot.peaks())
    }

    /// Run every tick that has come due
    ///
    /// Hosts call this from their event loop. A host that polls late runs
    /// the missed ticks back to back, each scheduled one period after the
    /// previous one, so the animation keeps its overall duration.
    ///
    /// # Returns
    /// Number of ticks run
    pub fn poll(&mut self) -> usize {
        let now = self.clock.now();
        let mut fired = 0;
        while let Some(handle) = self.ticker.take_due(now) {
            fired += 1;
            if !self.step(handle.due()) {
                break;
            }
        }
        fired
    }

    /// When the next tick is due, if one is scheduled
    pub fn next_deadline(&self) -> Option<Instant> {
        self.ticker.pending().map(|handle| handle.due())
    }

    pub fn state(&self) -> MeterState {
        if self.ticker.is_pending() {
            MeterState::Animating
        } else {
            MeterState::Idle
        }
    }

    pub fn is_animating(&self) -> bool {
        self.state() == MeterState::Animating
    }

    pub fn channel_count(&self) -> usize {
        self.animator.channel_count()
    }

    pub fn channels(&self) -> &[ChannelState] {
        self.animator.channels()
    }

    /// Bar values as currently displayed
    pub fn current_values(&self) -> Vec<f32> {
        self.channels().iter().map(|c| c.bar.current).collect()
    }

    /// Peak markers as currently displayed
    pub fn current_peaks(&self) -> Vec<f32> {
        self.channels().iter().map(|c| c.peak.current).collect()
    }

    pub fn config(&self) -> &MeterConfig {
        &self.config
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Stop the meter and hand back its surface
    ///
    /// Any pending tick is cancelled; consuming the meter guarantees
    /// nothing can draw on the surface afterwards.
    pub fn teardown(mut self) -> S {
        if let Some(handle) = self.ticker.cancel() {
            log::debug!("Cancelled tick #{} on teardown", handle.id());
        }
        self.surface
    }

    /// One animation tick: advance, render, and reschedule while moving
    fn step(&mut self, base: Instant) -> bool {
        if self.animator.tick() {
            self.render();
            self.ticker.schedule_after(base);
            true
        } else {
            false
        }
    }

    fn render(&mut self) {
        let config = &self.config;
        let (width, height) = (config.width(), config.height());

        if self.applied_size != Some((width, height)) {
            self.surface.set_size(width, height);
            self.applied_size = Some((width, height));
        }

        self.surface
            .fill_rect(Rect::from_min_size(Pos2::ZERO, vec2(width, height)), config.background());

        let graph_height = if config.labels().is_empty() {
            height
        } else {
            height - LABEL_RESERVE
        };
        let bar_width = BAR_SLOT - config.margin() * 2.0;
        let max_bar_height = graph_height - VALUE_HEADROOM;
        let scale = config.effective_max();
        let style = TextStyle::label(TEXT_COLOR);

        for (i, channel) in self.animator.channels().iter().enumerate() {
            let slot_x = i as f32 * BAR_SLOT;
            let value = channel.bar.current;
            let bar_height = value / scale * max_bar_height;

            if bar_height > BORDER * 2.0 {
                let x = config.margin() + slot_x + BORDER;
                self.surface.fill_rect(
                    Rect::from_min_size(
                        pos2(x, graph_height - bar_height + BORDER),
                        vec2(bar_width - BORDER * 2.0, bar_height - BORDER * 2.0),
                    ),
                    config.color_for(i),
                );

                let peak_height = max_bar_height * ((channel.peak.current + LEVEL_OFFSET) / scale);
                self.surface.fill_rect(
                    Rect::from_min_size(
                        pos2(x, graph_height - peak_height + BORDER),
                        vec2(bar_width - BORDER * 2.0, PEAK_THICKNESS),
                    ),
                    PEAK_COLOR,
                );
            }

            let center = slot_x + BAR_SLOT / 2.0;
            let text = format!("{}", (value - LEVEL_OFFSET).trunc() as i64);
            draw_label(
                &mut self.surface,
                &text,
                pos2(center, graph_height - bar_height - TEXT_GAP),
                &style,
            );

            if let Some(label) = config.labels().get(i).filter(|l| !l.is_empty()) {
                draw_label(&mut self.surface, label, pos2(center, height - TEXT_GAP), &style);
            }
        }
    }
}

/// Labels are decoration: a surface that cannot draw one must not abort the frame
fn draw_label<S: Surface>(surface: &mut S, text: &str, pos: Pos2, style: &TextStyle) {
    if let Err(e) = surface.fill_text(text, pos, style) {
        log::debug!("Skipped label {:?}: {}", text, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meter::timer::ManualClock;
    use crate::render::{DisplayList, SurfaceError};

    fn meter() -> (LevelMeter<DisplayList, ManualClock>, ManualClock) {
        let clock = ManualClock::new();
        let meter = LevelMeter::with_clock(MeterConfig::default(), DisplayList::new(), clock.clone());
        (meter, clock)
    }

    /// Advance one tick period and poll
    fn tick(meter: &mut LevelMeter<DisplayList, ManualClock>, clock: &ManualClock) -> usize {
        clock.advance(meter.config().tick_interval());
        meter.poll()
    }

    fn bar_rects(list: &DisplayList) -> usize {
        // Background, then a bar and a peak line per visible channel
        list.rects().count() - 1
    }

    #[test]
    fn test_first_update_snaps() {
        let (mut meter, _clock) = meter();
        meter.update(&[10.0, 20.0], &[-90.0, -80.0]).unwrap();

        assert_eq!(meter.current_values(), vec![10.0, 20.0]);
        assert_eq!(meter.current_peaks(), vec![-90.0, -80.0]);
        assert_eq!(meter.state(), MeterState::Idle);
        assert_eq!(meter.surface().frames(), 1);
    }

    #[test]
    fn test_monotone_interpolation() {
        let (mut meter, clock) = meter();
        meter.update(&[0.0], &[0.0]).unwrap();
        meter.update(&[100.0], &[0.0]).unwrap();

        // The first tick runs inside update
        assert_eq!(meter.current_values(), vec![10.0]);
        assert!(meter.is_animating());

        for k in 2..=10 {
            assert_eq!(tick(&mut meter, &clock), 1);
            assert_eq!(meter.current_values(), vec![10.0 * k as f32]);
        }

        // One more tick finds nothing to do and stops without drawing
        let frames = meter.surface().frames();
        assert_eq!(tick(&mut meter, &clock), 1);
        assert_eq!(meter.state(), MeterState::Idle);
        assert_eq!(meter.next_deadline(), None);
        assert_eq!(meter.surface().frames(), frames);
    }

    #[test]
    fn test_convergence() {
        let (mut meter, clock) = meter();
        meter.update(&[0.0, 50.0, 120.0], &[-100.0, -50.0, 0.0]).unwrap();
        meter.update(&[30.0, 60.0, 90.0], &[-70.0, -40.0, -10.0]).unwrap();
        tick(&mut meter, &clock);
        meter.update(&[80.0, 5.0, 115.0], &[-20.0, -95.0, -5.0]).unwrap();
        tick(&mut meter, &clock);
        tick(&mut meter, &clock);
        meter.update(&[42.0, 17.0, 99.0], &[-58.0, -83.0, -1.0]).unwrap();

        for _ in 0..50 {
            tick(&mut meter, &clock);
        }

        assert_eq!(meter.state(), MeterState::Idle);
        for (got, want) in meter.current_values().iter().zip([42.0, 17.0, 99.0]) {
            assert!((got - want).abs() < 1e-4);
        }
        for (got, want) in meter.current_peaks().iter().zip([-58.0, -83.0, -1.0]) {
            assert!((got - want).abs() < 1e-4);
        }
    }

    #[test]
    fn test_redirect_in_flight() {
        let (mut meter, clock) = meter();
        meter.update(&[0.0], &[0.0]).unwrap();
        meter.update(&[100.0], &[0.0]).unwrap();
        tick(&mut meter, &clock);
        assert_eq!(meter.current_values(), vec![20.0]);

        let deadline = meter.next_deadline();
        meter.update(&[0.0], &[0.0]).unwrap();

        // Same loop, no restart and no jump
        assert_eq!(meter.next_deadline(), deadline);
        assert_eq!(meter.current_values(), vec![20.0]);

        tick(&mut meter, &clock);
        assert_eq!(meter.current_values(), vec![18.0]);
    }

    #[test]
    fn test_channel_count_change_snaps() {
        let (mut meter, clock) = meter();
        meter.update(&[10.0, 20.0], &[0.0, 0.0]).unwrap();
        meter.update(&[60.0, 70.0], &[0.0, 0.0]).unwrap();
        assert!(meter.is_animating());

        let frames = meter.surface().frames();
        meter.update(&[100.0, 110.0, 90.0], &[-5.0, -6.0, -7.0]).unwrap();

        assert_eq!(meter.current_values(), vec![100.0, 110.0, 90.0]);
        assert_eq!(meter.state(), MeterState::Idle);
        assert_eq!(meter.surface().frames(), frames + 1);
        assert_eq!(meter.surface().texts().count(), 3);

        // The stale two-channel loop is gone
        assert_eq!(tick(&mut meter, &clock), 0);
        assert_eq!(meter.surface().frames(), frames + 1);
    }

    #[test]
    fn test_zero_delta_schedules_nothing() {
        let (mut meter, _clock) = meter();
        meter.update(&[50.0, 60.0], &[-10.0, -20.0]).unwrap();
        let frames = meter.surface().frames();

        meter.update(&[50.0, 60.0], &[-10.0, -20.0]).unwrap();

        assert_eq!(meter.state(), MeterState::Idle);
        assert_eq!(meter.next_deadline(), None);
        assert_eq!(meter.surface().frames(), frames);
    }

    #[test]
    fn test_mismatched_lengths_leave_state_untouched() {
        let (mut meter, _clock) = meter();
        meter.update(&[0.0, 0.0], &[0.0, 0.0]).unwrap();
        meter.update(&[50.0, 50.0], &[0.0, 0.0]).unwrap();
        let values = meter.current_values();
        let deadline = meter.next_deadline();

        let err = meter.update(&[1.0, 2.0, 3.0], &[1.0, 2.0]).unwrap_err();

        assert_eq!(err, MeterError::InvariantViolation { values: 3, peaks: 2 });
        assert_eq!(meter.current_values(), values);
        assert_eq!(meter.next_deadline(), deadline);
        assert_eq!(meter.channel_count(), 2);
    }

    #[test]
    fn test_non_finite_levels_rejected() {
        let (mut meter, clock) = meter();
        meter.update(&[0.0, 0.0], &[0.0, 0.0]).unwrap();
        let frames = meter.surface().frames();

        let err = meter.update(&[10.0, f32::NAN], &[0.0, 0.0]).unwrap_err();
        assert_eq!(err, MeterError::NonFinite { channel: 1 });
        let err = meter.update(&[10.0, 10.0], &[f32::NEG_INFINITY, 0.0]).unwrap_err();
        assert_eq!(err, MeterError::NonFinite { channel: 0 });

        assert_eq!(meter.state(), MeterState::Idle);
        assert_eq!(meter.next_deadline(), None);
        assert_eq!(meter.current_values(), vec![0.0, 0.0]);
        assert_eq!(tick(&mut meter, &clock), 0);
        assert_eq!(meter.surface().frames(), frames);
    }

    #[test]
    fn test_small_bars_not_drawn() {
        let (mut meter, _clock) = meter();

        // 1.0 / 120 * 125px is about 1px, below the 4px border allowance
        meter.update(&[1.0, 100.0], &[-99.0, -10.0]).unwrap();

        let list = meter.surface();
        assert_eq!(bar_rects(list), 2);
        let bar_color = meter.config().color_for(1);
        assert!(list.rects().any(|(_, color)| color == bar_color));
        assert!(!list.rects().any(|(_, color)| color == meter.config().color_for(0)));

        // Value labels are still drawn for both channels
        assert_eq!(list.texts().count(), 2);
    }

    #[test]
    fn test_bar_geometry() {
        let (mut meter, _clock) = meter();
        meter.update(&[120.0], &[20.0]).unwrap();

        let rects: Vec<Rect> = meter.surface().rects().map(|(r, _)| r).collect();
        // Full-scale bar fills the 125px below the value headroom
        assert_eq!(rects[1], Rect::from_min_size(pos2(7.0, 27.0), vec2(36.0, 121.0)));
        // Peak at 20 dB + 100 sits at full scale too
        assert_eq!(rects[2], Rect::from_min_size(pos2(7.0, 27.0), vec2(36.0, 2.0)));

        let (text, pos) = meter.surface().texts().next().unwrap();
        assert_eq!(text, "20");
        assert_eq!(pos, pos2(25.0, 15.0));
    }

    #[test]
    fn test_axis_labels_reserve_space() {
        let config = MeterConfig::builder().labels(["L", ""]).build().unwrap();
        let mut meter = LevelMeter::with_clock(config, DisplayList::new(), ManualClock::new());
        meter.update(&[60.0, 60.0], &[-40.0, -40.0]).unwrap();

        let texts: Vec<(String, Pos2)> = meter
            .surface()
            .texts()
            .map(|(t, p)| (t.to_string(), p))
            .collect();
        // Two value labels plus the one non-empty axis label
        assert_eq!(texts.len(), 3);
        assert!(texts.contains(&("L".to_string(), pos2(25.0, 140.0))));
    }

    #[test]
    fn test_surface_resized_once() {
        let (mut meter, clock) = meter();
        meter.update(&[0.0], &[0.0]).unwrap();
        meter.update(&[100.0], &[0.0]).unwrap();
        for _ in 0..12 {
            tick(&mut meter, &clock);
        }
        assert!(meter.surface().frames() > 1);
        assert_eq!(meter.surface().resize_count(), 1);
    }

    #[test]
    fn test_late_poll_catches_up() {
        let (mut meter, clock) = meter();
        meter.update(&[0.0], &[0.0]).unwrap();
        meter.update(&[100.0], &[0.0]).unwrap();

        clock.advance(meter.config().tick_interval() * 4);
        assert_eq!(meter.poll(), 4);
        assert_eq!(meter.current_values(), vec![50.0]);
    }

    #[test]
    fn test_teardown_cancels_pending_tick() {
        let (mut meter, _clock) = meter();
        meter.update(&[0.0], &[0.0]).unwrap();
        meter.update(&[100.0], &[0.0]).unwrap();
        assert!(meter.next_deadline().is_some());

        let surface = meter.teardown();
        assert_eq!(surface.frames(), 2);
    }

    /// Surface that records rectangles but refuses all text
    #[derive(Default)]
    struct NoTextSurface {
        rects: Vec<Rect>,
        text_attempts: usize,
    }

    impl Surface for NoTextSurface {
        fn set_size(&mut self, _width: f32, _height: f32) {}

        fn fill_rect(&mut self, rect: Rect, _color: Color32) {
            self.rects.push(rect);
        }

        fn fill_text(&mut self, _text: &str, _pos: Pos2, _style: &TextStyle) -> Result<(), SurfaceError> {
            self.text_attempts += 1;
            Err(SurfaceError::TextUnavailable)
        }
    }

    #[test]
    fn test_label_failure_does_not_abort_frame() {
        let config = MeterConfig::builder().labels(["L", "R"]).build().unwrap();
        let mut meter = LevelMeter::with_clock(config, NoTextSurface::default(), ManualClock::new());

        assert!(meter.update(&[80.0, 90.0], &[-20.0, -10.0]).is_ok());

        let surface = meter.teardown();
        // Background plus bar and peak for both channels
        assert_eq!(surface.rects.len(), 5);
        // Value and axis label tried for both channels
        assert_eq!(surface.text_attempts, 4);
    }
}

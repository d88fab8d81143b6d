//! Synthetic level source
//!
//! Drives each channel with its own low-frequency oscillator, so the
//! meter can be demonstrated without an input device. Channels get
//! different waveforms and staggered phases so the bars move apart.

use std::f32::consts::TAU;
use std::time::{Duration, Instant};

use super::{LevelSource, SourceError, LEVEL_OFFSET, MIN_DB};
use crate::meter::Snapshot;

/// LFO waveform shapes
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum LfoWaveform {
    /// Smooth sine wave
    Sine,
    /// Linear triangle wave
    Triangle,
    /// Abrupt square wave
    Square,
    /// Rising sawtooth
    Sawtooth,
}

impl LfoWaveform {
    pub fn all() -> &'static [LfoWaveform] {
        &[
            LfoWaveform::Sine,
            LfoWaveform::Triangle,
            LfoWaveform::Square,
            LfoWaveform::Sawtooth,
        ]
    }

    /// Sample the waveform at phase (0.0 to 1.0)
    /// Returns value in range -1.0 to 1.0
    pub fn sample(&self, phase: f32) -> f32 {
        match self {
            LfoWaveform::Sine => (phase * TAU).sin(),

            LfoWaveform::Triangle => {
                let p = phase * 4.0;
                if p < 1.0 {
                    p
                } else if p < 3.0 {
                    2.0 - p
                } else {
                    p - 4.0
                }
            }

            LfoWaveform::Square => {
                if phase < 0.5 { 1.0 } else { -1.0 }
            }

            LfoWaveform::Sawtooth => 2.0 * phase - 1.0,
        }
    }
}

/// Low Frequency Oscillator mapped onto a level range
#[derive(Clone, Debug)]
pub struct Lfo {
    /// Oscillation frequency in Hz
    pub frequency: f32,
    pub waveform: LfoWaveform,
    /// Minimum output value
    pub min: f32,
    /// Maximum output value
    pub max: f32,
    /// Phase offset (0.0 to 1.0)
    pub phase_offset: f32,
}

impl Lfo {
    pub fn with_range(frequency: f32, min: f32, max: f32) -> Self {
        Self {
            frequency,
            waveform: LfoWaveform::Sine,
            min,
            max,
            phase_offset: 0.0,
        }
    }

    pub fn waveform(mut self, waveform: LfoWaveform) -> Self {
        self.waveform = waveform;
        self
    }

    pub fn phase(mut self, offset: f32) -> Self {
        self.phase_offset = offset;
        self
    }

    /// Sample the LFO at a given time in seconds
    pub fn sample(&self, time: f32) -> f32 {
        let phase = ((time * self.frequency) + self.phase_offset).rem_euclid(1.0);
        let normalized = (self.waveform.sample(phase) + 1.0) / 2.0;
        self.min + normalized * (self.max - self.min)
    }
}

/// How fast the synthetic peak hold falls back, in dB per snapshot
const PEAK_FALL_DB: f32 = 3.0;

/// Oscillator-driven levels, one LFO per channel
pub struct SyntheticSource {
    lfos: Vec<Lfo>,
    held: Vec<f32>,
    interval: Duration,
    started: Option<Instant>,
    next_emit: Option<Instant>,
}

impl SyntheticSource {
    pub fn new(channels: usize, interval: Duration) -> Self {
        let waveforms = LfoWaveform::all();
        let lfos = (0..channels)
            .map(|i| {
                // Levels between -70 and -6 dBFS on the shifted scale
                Lfo::with_range(0.25 + 0.15 * i as f32, 30.0, 94.0)
                    .waveform(waveforms[i % waveforms.len()])
                    .phase(i as f32 / channels.max(1) as f32)
            })
            .collect();
        Self {
            lfos,
            held: vec![MIN_DB; channels],
            interval,
            started: None,
            next_emit: None,
        }
    }

    /// Levels at `elapsed` seconds since start
    fn levels_at(&mut self, elapsed: f32) -> Snapshot {
        self.lfos
            .iter()
            .zip(&mut self.held)
            .map(|(lfo, held)| {
                let value = lfo.sample(elapsed);
                *held = (value - LEVEL_OFFSET).max(*held - PEAK_FALL_DB);
                (value, *held)
            })
            .collect()
    }
}

impl LevelSource for SyntheticSource {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn start(&mut self) -> Result<(), SourceError> {
        if self.lfos.is_empty() {
            return Err(SourceError::NoChannels);
        }
        let now = Instant::now();
        self.started = Some(now);
        self.next_emit = Some(now);
        self.held.iter_mut().for_each(|h| *h = MIN_DB);
        log::info!("Synthetic source started ({} channels)", self.lfos.len());
        Ok(())
    }

    fn stop(&mut self) {
        if self.started.take().is_some() {
            self.next_emit = None;
            log::info!("Synthetic source stopped");
        }
    }

    fn is_running(&self) -> bool {
        self.started.is_some()
    }

    fn poll(&mut self, now: Instant) -> Option<Snapshot> {
        let started = self.started?;
        let due = self.next_emit?;
        if now < due {
            return None;
        }
        // Skip missed emissions instead of bursting them
        self.next_emit = Some(now + self.interval);
        Some(self.levels_at(now.duration_since(started).as_secs_f32()))
    }
}

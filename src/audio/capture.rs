//! Level capture from the default audio input device
//!
//! The cpal input callback folds every incoming frame into a
//! [`LevelAccumulator`]. Once a publish window worth of frames has been
//! seen, the accumulator emits a snapshot: per-channel RMS on the shifted
//! scale (`dBFS + 100`) and a decaying peak hold in raw dBFS.

use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SizedSample};

use super::buffer::LevelBuffer;
use super::{amplitude_to_db, LevelSource, SourceError, LEVEL_OFFSET, MIN_DB};
use crate::meter::Snapshot;

/// How fast the held peak falls back, in dB per second
const PEAK_DECAY_DB_PER_SEC: f32 = 20.0;

/// Folds raw frames into periodic level snapshots
pub struct LevelAccumulator {
    /// Frames per snapshot
    window: usize,
    window_secs: f32,
    frames: usize,
    sum_sq: Vec<f32>,
    peak: Vec<f32>,
    held_db: Vec<f32>,
}

impl LevelAccumulator {
    pub fn new(channels: usize, sample_rate: f32, interval: Duration) -> Self {
        let window = ((sample_rate * interval.as_secs_f32()).round() as usize).max(1);
        Self {
            window,
            window_secs: window as f32 / sample_rate,
            frames: 0,
            sum_sq: vec![0.0; channels],
            peak: vec![0.0; channels],
            held_db: vec![MIN_DB; channels],
        }
    }

    /// Add one interleaved frame (one sample per channel)
    ///
    /// # Returns
    /// A snapshot when the frame completes a publish window
    pub fn push_frame(&mut self, frame: &[f32]) -> Option<Snapshot> {
        for ((sum, peak), &sample) in self.sum_sq.iter_mut().zip(&mut self.peak).zip(frame) {
            *sum += sample * sample;
            *peak = peak.max(sample.abs());
        }
        self.frames += 1;

        if self.frames < self.window {
            return None;
        }
        Some(self.flush())
    }

    fn flush(&mut self) -> Snapshot {
        let frames = self.frames as f32;
        let decay = PEAK_DECAY_DB_PER_SEC * self.window_secs;
        let mut levels = Vec::with_capacity(self.sum_sq.len());

        for ((sum, peak), held) in self.sum_sq.iter_mut().zip(&mut self.peak).zip(&mut self.held_db) {
            let rms_db = amplitude_to_db((*sum / frames).sqrt());
            *held = amplitude_to_db(*peak).max(*held - decay).max(MIN_DB);
            levels.push(((rms_db + LEVEL_OFFSET).max(0.0), *held));

            *sum = 0.0;
            *peak = 0.0;
        }
        self.frames = 0;

        levels.into_iter().collect()
    }
}

/// Channel count of an input config; a zero-channel device is unusable
fn input_channels(config: &cpal::StreamConfig) -> Result<usize, SourceError> {
    match config.channels {
        0 => Err(SourceError::NoChannels),
        channels => Ok(channels as usize),
    }
}

/// Build an input stream for one sample format
///
/// `config` must have at least one channel.
fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    buffer: LevelBuffer,
    interval: Duration,
) -> Result<cpal::Stream, cpal::BuildStreamError>
where
    T: SizedSample,
    f32: FromSample<T>,
{
    let channels = config.channels as usize;
    let mut accumulator = LevelAccumulator::new(channels, config.sample_rate.0 as f32, interval);
    let mut frame = vec![0.0f32; channels];

    device.build_input_stream(
        config,
        move |data: &[T], _: &cpal::InputCallbackInfo| {
            for chunk in data.chunks(channels) {
                for (dst, &sample) in frame.iter_mut().zip(chunk) {
                    *dst = f32::from_sample(sample);
                }
                if let Some(snapshot) = accumulator.push_frame(&frame) {
                    // Dropped publishes are fine, the next window replaces them
                    buffer.publish(snapshot);
                }
            }
        },
        |err| log::error!("Audio input error: {}", err),
        None,
    )
}

/// Levels measured on the default input device
pub struct CaptureSource {
    buffer: LevelBuffer,
    /// The input stream (kept alive while capturing)
    stream: Option<cpal::Stream>,
    interval: Duration,
    device_name: String,
}

impl CaptureSource {
    pub fn new(interval: Duration) -> Self {
        Self {
            buffer: LevelBuffer::new(),
            stream: None,
            interval,
            device_name: "default input".to_string(),
        }
    }
}

impl LevelSource for CaptureSource {
    fn name(&self) -> &str {
        &self.device_name
    }

    fn start(&mut self) -> Result<(), SourceError> {
        if self.stream.is_some() {
            return Ok(());
        }

        let host = cpal::default_host();
        let device = host.default_input_device().ok_or(SourceError::NoDevice)?;
        self.device_name = device.name().unwrap_or_else(|_| "Unknown".to_string());
        log::info!("Using input device: {}", self.device_name);

        let config = device.default_input_config()?;
        log::info!("Input config: {:?}", config);

        let sample_format = config.sample_format();
        let stream_config: cpal::StreamConfig = config.into();
        let channels = input_channels(&stream_config)?;
        let buffer = self.buffer.clone_ref();

        let stream = match sample_format {
            cpal::SampleFormat::F32 => {
                build_stream::<f32>(&device, &stream_config, buffer, self.interval)?
            }
            cpal::SampleFormat::I16 => {
                build_stream::<i16>(&device, &stream_config, buffer, self.interval)?
            }
            cpal::SampleFormat::U16 => {
                build_stream::<u16>(&device, &stream_config, buffer, self.interval)?
            }
            format => return Err(SourceError::UnsupportedFormat(format!("{:?}", format))),
        };

        stream.play()?;
        self.stream = Some(stream);
        log::info!("Capture started ({} channels)", channels);
        Ok(())
    }

    fn stop(&mut self) {
        if self.stream.take().is_some() {
            self.buffer.clear();
            log::info!(
                "Capture stopped after {} snapshots ({} overwritten)",
                self.buffer.published(),
                self.buffer.overwritten()
            );
        }
    }

    fn is_running(&self) -> bool {
        self.stream.is_some()
    }

    fn poll(&mut self, _now: Instant) -> Option<Snapshot> {
        self.buffer.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stream_config(channels: u16) -> cpal::StreamConfig {
        cpal::StreamConfig {
            channels,
            sample_rate: cpal::SampleRate(48_000),
            buffer_size: cpal::BufferSize::Default,
        }
    }

    #[test]
    fn test_zero_channel_device_rejected() {
        assert!(matches!(
            input_channels(&stream_config(0)),
            Err(SourceError::NoChannels)
        ));
        assert_eq!(input_channels(&stream_config(2)).unwrap(), 2);
    }

    #[test]
    fn test_window_emits_once() {
        let mut acc = LevelAccumulator::new(2, 1000.0, Duration::from_millis(10));
        for _ in 0..9 {
            assert!(acc.push_frame(&[0.5, 0.5]).is_none());
        }
        assert!(acc.push_frame(&[0.5, 0.5]).is_some());
        assert!(acc.push_frame(&[0.5, 0.5]).is_none());
    }

    #[test]
    fn test_full_scale_and_silence() {
        let mut acc = LevelAccumulator::new(2, 1000.0, Duration::from_millis(4));
        let mut snapshot = None;
        for _ in 0..4 {
            snapshot = acc.push_frame(&[1.0, 0.0]);
        }
        let snapshot = snapshot.unwrap();

        // Full scale square wave: 0 dBFS, shifted to 100
        assert!((snapshot.values()[0] - 100.0).abs() < 1e-3);
        assert!(snapshot.peaks()[0].abs() < 1e-3);
        // Silence clamps to the floor
        assert_eq!(snapshot.values()[1], 0.0);
        assert_eq!(snapshot.peaks()[1], MIN_DB);
    }

    #[test]
    fn test_peak_hold_decays() {
        let mut acc = LevelAccumulator::new(1, 100.0, Duration::from_millis(100));
        let mut last = None;
        for _ in 0..10 {
            last = acc.push_frame(&[1.0]);
        }
        assert!(last.as_ref().unwrap().peaks()[0].abs() < 1e-3);

        for _ in 0..10 {
            last = acc.push_frame(&[0.0]);
        }
        // 20 dB/s over a 100 ms window
        assert!((last.unwrap().peaks()[0] + 2.0).abs() < 1e-3);
    }
}

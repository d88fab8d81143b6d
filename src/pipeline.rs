//! In-process stream pipeline
//!
//! Receives JSON control messages and answers with reply strings, the same
//! exchange the player page has with its native module. Playing a stream
//! starts the level source that feeds the meters.

use std::time::{Duration, Instant};

use thiserror::Error;

use crate::audio::{CaptureSource, LevelSource, SourceError, SyntheticSource};
use crate::control::{ControlError, ControlMessage, NativeReply, StreamAddress};
use crate::meter::Snapshot;
use crate::settings::{AppSettings, SourceKind};

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Control(#[from] ControlError),

    #[error(transparent)]
    Source(#[from] SourceError),
}

pub struct Pipeline {
    source: Box<dyn LevelSource>,
    kind: SourceKind,
    synthetic_channels: usize,
    interval: Duration,
}

impl Pipeline {
    pub fn new(settings: &AppSettings) -> Self {
        let interval = settings.publish_interval();
        let source: Box<dyn LevelSource> = match settings.source {
            SourceKind::Capture => Box::new(CaptureSource::new(interval)),
            SourceKind::Synthetic => {
                Box::new(SyntheticSource::new(settings.synthetic_channels, interval))
            }
        };
        Self {
            source,
            kind: settings.source,
            synthetic_channels: settings.synthetic_channels,
            interval,
        }
    }

    /// Handle one encoded control message
    ///
    /// # Returns
    /// The reply string; failures come back as `error:<message>`
    pub fn handle(&mut self, json: &str) -> String {
        match self.dispatch(json) {
            Ok(reply) => reply,
            Err(e) => NativeReply::error(e),
        }
    }

    fn dispatch(&mut self, json: &str) -> Result<String, PipelineError> {
        match ControlMessage::from_json(json)? {
            ControlMessage::SetUri { mode, value, relay } => {
                let address: StreamAddress = value.parse()?;
                if !relay.is_empty() {
                    log::debug!("AMT relay: {}", relay);
                }
                self.start_source()?;
                Ok(format!(
                    "Playing {} ({}), levels from {}",
                    address,
                    mode.name(),
                    self.source.name()
                ))
            }
            ControlMessage::Stop => {
                self.source.stop();
                Ok("Stopped".to_string())
            }
            ControlMessage::Quit => {
                self.source.stop();
                Ok("Quit".to_string())
            }
        }
    }

    /// Start the level source, falling back to oscillators without a device
    fn start_source(&mut self) -> Result<(), SourceError> {
        match self.source.start() {
            Err(e) if self.kind == SourceKind::Capture => {
                log::warn!("Capture unavailable ({}), falling back to synthetic levels", e);
                self.kind = SourceKind::Synthetic;
                self.source = Box::new(SyntheticSource::new(self.synthetic_channels, self.interval));
                self.source.start()
            }
            result => result,
        }
    }

    pub fn is_running(&self) -> bool {
        self.source.is_running()
    }

    /// The newest snapshot from the level source, if any
    pub fn poll(&mut self, now: Instant) -> Option<Snapshot> {
        self.source.poll(now)
    }
}

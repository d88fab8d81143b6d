//! Control messages for the stream pipeline
//!
//! The pipeline module is driven by small JSON records whose `message`
//! field names the action:
//!
//! ```json
//! {"message": "set_uri", "mode": "ssm", "value": "10.0.0.1@232.1.1.1:5000", "relay": "192.52.193.1"}
//! {"message": "stop"}
//! {"message": "quit"}
//! ```
//!
//! It answers with plain strings; a string starting with `error:` carries
//! a human-readable failure message.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

const ERROR_PREFIX: &str = "error:";

#[derive(Error, Debug)]
pub enum ControlError {
    #[error("Invalid stream address {0:?} (expected source@group:port)")]
    InvalidAddress(String),

    #[error("Invalid port: {0}")]
    InvalidPort(#[from] std::num::ParseIntError),

    #[error("Malformed control message: {0}")]
    Json(#[from] serde_json::Error),
}

/// How the pipeline should join the stream
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamMode {
    /// Plain UDP multicast
    Udp,
    /// Source-specific multicast
    Ssm,
    /// Automatic multicast tunneling through a relay
    Amt,
    /// Let the pipeline pick
    Any,
}

impl StreamMode {
    pub const ALL: &[StreamMode] = &[Self::Udp, Self::Ssm, Self::Amt, Self::Any];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Udp => "udp",
            Self::Ssm => "ssm",
            Self::Amt => "amt",
            Self::Any => "any",
        }
    }
}

/// Stream location: `<source>@<group>:<port>`
///
/// The source may be empty for any-source multicast.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StreamAddress {
    pub source: String,
    pub group: String,
    pub port: u16,
}

impl StreamAddress {
    pub fn new(source: impl Into<String>, group: impl Into<String>, port: u16) -> Self {
        Self {
            source: source.into(),
            group: group.into(),
            port,
        }
    }
}

impl fmt::Display for StreamAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}:{}", self.source, self.group, self.port)
    }
}

impl FromStr for StreamAddress {
    type Err = ControlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ControlError::InvalidAddress(s.to_string());
        let (source, rest) = s.split_once('@').ok_or_else(invalid)?;
        let (group, port) = rest.rsplit_once(':').ok_or_else(invalid)?;
        if group.is_empty() {
            return Err(invalid());
        }
        Ok(Self::new(source, group, port.parse()?))
    }
}

/// A command for the pipeline module
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "message", rename_all = "snake_case")]
pub enum ControlMessage {
    SetUri {
        mode: StreamMode,
        value: String,
        relay: String,
    },
    Stop,
    Quit,
}

impl ControlMessage {
    pub fn set_uri(mode: StreamMode, address: &StreamAddress, relay: impl Into<String>) -> Self {
        Self::SetUri {
            mode,
            value: address.to_string(),
            relay: relay.into(),
        }
    }

    pub fn to_json(&self) -> Result<String, ControlError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, ControlError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// A reply string from the pipeline module
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NativeReply {
    Error(String),
    Info(String),
}

impl NativeReply {
    pub fn parse(reply: &str) -> Self {
        match reply.strip_prefix(ERROR_PREFIX) {
            Some(message) => Self::Error(message.to_string()),
            None => Self::Info(reply.to_string()),
        }
    }

    /// Build the wire form of an error reply
    pub fn error(message: impl fmt::Display) -> String {
        format!("{}{}", ERROR_PREFIX, message)
    }

    /// Text for the status line
    pub fn status_text(&self) -> String {
        match self {
            Self::Error(message) => format!(
                "ERROR {}. Please check that the stream source is reachable.",
                message
            ),
            Self::Info(message) => message.clone(),
        }
    }
}

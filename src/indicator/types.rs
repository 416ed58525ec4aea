//! Core data types and error definitions for the indicator lifecycle.

use serde::{Deserialize, Serialize};
use std::{fmt, path::PathBuf, str::FromStr};
use thiserror::Error;

/// Errors raised while constructing or driving an indicator.
#[derive(Debug, Error)]
pub enum IndicatorError {
    /// Caller supplied a value outside the recognized vocabulary (e.g. an unknown color).
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    /// Output backend rejected the registration of the indicator's pin.
    #[error("Output backend failed: {0}")]
    Output(#[from] OutputError),
}

/// Errors produced by an [`crate::indicator::OutputBackend`].
#[derive(Debug, Error)]
pub enum OutputError {
    /// Reading or writing a backend control file failed.
    #[error("failed to access {path}: {source}")]
    Io {
        /// Control file the backend attempted to touch.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// A write targeted a pin that was never registered with the backend.
    #[error("pin {0} is not registered with the output backend")]
    Unregistered(u8),
    /// The blocking task running backend teardown panicked or was cancelled.
    #[error("output teardown task failed: {0}")]
    Teardown(String),
}

/// Closed set of indicator colors. Each color owns one fixed output pin.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    /// Red light.
    Red,
    /// Yellow light.
    Yellow,
    /// Green light.
    Green,
}

impl Color {
    /// Every recognized color in registry order.
    pub const ALL: [Color; 3] = [Color::Red, Color::Yellow, Color::Green];

    /// Output identifier (BCM pin number) wired to this color.
    pub const fn identifier(self) -> u8 {
        match self {
            Color::Red => 17,
            Color::Yellow => 27,
            Color::Green => 22,
        }
    }

    /// Lowercase name used in logs and payloads.
    pub const fn as_str(self) -> &'static str {
        match self {
            Color::Red => "red",
            Color::Yellow => "yellow",
            Color::Green => "green",
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Color {
    type Err = IndicatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "red" => Ok(Self::Red),
            "yellow" => Ok(Self::Yellow),
            "green" => Ok(Self::Green),
            other => Err(IndicatorError::InvalidArgument(format!(
                "unrecognized indicator color '{other}'"
            ))),
        }
    }
}

/// Operational state simulated by a status-aware indicator.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Worker is down; the light is dark.
    #[default]
    Offline,
    /// Worker is waiting for work; slow blink.
    Idle,
    /// Worker is processing; fast blink.
    Busy,
}

impl Status {
    /// Every status, used by the driver for uniform selection.
    pub const ALL: [Status; 3] = [Status::Offline, Status::Idle, Status::Busy];

    /// Lowercase name used in logs and payloads.
    pub const fn as_str(self) -> &'static str {
        match self {
            Status::Offline => "offline",
            Status::Idle => "idle",
            Status::Busy => "busy",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = IndicatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "offline" => Ok(Self::Offline),
            "idle" => Ok(Self::Idle),
            "busy" => Ok(Self::Busy),
            other => Err(IndicatorError::InvalidArgument(format!(
                "unrecognized indicator status '{other}'"
            ))),
        }
    }
}

/// Logical value of a two-state output.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    /// Output driven low.
    #[default]
    Off,
    /// Output driven high.
    On,
}

impl Level {
    /// Return the opposite level.
    pub const fn toggled(self) -> Self {
        match self {
            Level::Off => Level::On,
            Level::On => Level::Off,
        }
    }

    /// Whether the output is lit.
    pub const fn is_on(self) -> bool {
        matches!(self, Level::On)
    }
}

impl From<bool> for Level {
    fn from(lit: bool) -> Self {
        if lit { Level::On } else { Level::Off }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Level::Off => "off",
            Level::On => "on",
        })
    }
}

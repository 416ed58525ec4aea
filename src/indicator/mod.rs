//! Status indicators: blink state machine, status vocabulary, and output backends.

mod blink;
pub mod gpio;
pub mod output;
mod status;
pub mod types;

pub use blink::{FALLBACK_PERIOD, Indicator, blink_period};
pub use output::{
    DEFAULT_HISTORY_CAPACITY, OutputBackend, OutputEvent, SimulatedOutput, build_backend,
};
pub use status::{BUSY_SPEED, IDLE_SPEED, IndicatorSnapshot, StatusIndicator};
pub use types::{Color, IndicatorError, Level, OutputError, Status};

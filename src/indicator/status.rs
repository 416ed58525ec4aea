//! Status vocabulary layered over the blink primitive.

use super::blink::Indicator;
use super::types::{Color, Level, Status};
use serde::Serialize;
use std::sync::{PoisonError, RwLock};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tokio::sync::Mutex;

/// Blink speed (seconds per half-cycle) used for [`Status::Idle`].
pub const IDLE_SPEED: f64 = 1.0;
/// Blink speed (seconds per half-cycle) used for [`Status::Busy`].
pub const BUSY_SPEED: f64 = 0.25;

#[derive(Clone, Copy)]
struct StatusState {
    status: Status,
    since: OffsetDateTime,
}

/// Indicator that simulates a worker in one of the [`Status`] states.
///
/// Transitions are serialized per indicator, and the published status only changes once the
/// blink state matches it, so readers never observe a half-applied transition.
pub struct StatusIndicator {
    indicator: Indicator,
    state: RwLock<StatusState>,
    transition: Mutex<()>,
}

/// Point-in-time view of an indicator for diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct IndicatorSnapshot {
    /// Position in the registry.
    pub index: usize,
    /// Light color.
    pub color: Color,
    /// Output identifier (pin).
    pub identifier: u8,
    /// Simulated worker status.
    pub status: Status,
    /// Whether a blink loop is active.
    pub running: bool,
    /// Last level driven onto the output.
    pub level: Level,
    /// Speed of the active blink loop.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
    /// RFC3339 timestamp of the last status change.
    pub since: String,
}

impl StatusIndicator {
    /// Wrap `indicator`; the initial status is [`Status::Offline`].
    pub fn new(indicator: Indicator) -> Self {
        Self {
            indicator,
            state: RwLock::new(StatusState {
                status: Status::Offline,
                since: OffsetDateTime::now_utc(),
            }),
            transition: Mutex::new(()),
        }
    }

    /// Underlying blink primitive.
    pub fn indicator(&self) -> &Indicator {
        &self.indicator
    }

    /// Current status. Pure read.
    pub fn get_status(&self) -> Status {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .status
    }

    /// Mark the worker offline and stop blinking.
    pub async fn set_offline(&self) {
        self.apply(Status::Offline).await;
    }

    /// Mark the worker idle and blink slowly.
    pub async fn set_idle(&self) {
        self.apply(Status::Idle).await;
    }

    /// Mark the worker busy and blink fast.
    pub async fn set_busy(&self) {
        self.apply(Status::Busy).await;
    }

    /// Transition to `status`, driving the matching blink state.
    pub async fn apply(&self, status: Status) {
        let _guard = self.transition.lock().await;
        match status {
            Status::Offline => self.indicator.stop().await,
            Status::Idle => self.indicator.start(IDLE_SPEED).await,
            Status::Busy => self.indicator.start(BUSY_SPEED).await,
        }

        let previous = {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            let previous = state.status;
            *state = StatusState {
                status,
                since: OffsetDateTime::now_utc(),
            };
            previous
        };
        self.indicator.metrics().record_transition();
        tracing::info!(
            color = %self.indicator.color(),
            from = %previous,
            to = %status,
            "Indicator status changed"
        );
    }

    /// Diagnostic snapshot for registry position `index`.
    pub async fn snapshot(&self, index: usize) -> IndicatorSnapshot {
        let state = *self.state.read().unwrap_or_else(PoisonError::into_inner);
        IndicatorSnapshot {
            index,
            color: self.indicator.color(),
            identifier: self.indicator.identifier(),
            status: state.status,
            running: self.indicator.is_running(),
            level: self.indicator.level(),
            speed: self.indicator.speed().await,
            since: state
                .since
                .format(&Rfc3339)
                .unwrap_or_else(|_| state.since.unix_timestamp().to_string()),
        }
    }
}

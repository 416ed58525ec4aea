//! Status Driver: randomly reassigns indicator statuses on a fixed tick.
//!
//! Each tick rolls independently for every indicator. With probability `p` the indicator gets a
//! uniformly chosen status; otherwise it is left alone. Transitions run as their own tasks so a
//! slow transition never delays the tick, and they serialize per indicator inside
//! [`crate::indicator::StatusIndicator::apply`].

use crate::indicator::Status;
use crate::registry::IndicatorRegistry;
use rand::Rng;
use rand::seq::SliceRandom;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Default tick period.
pub const DEFAULT_TICK_PERIOD: Duration = Duration::from_secs(10);
/// Default per-indicator probability of a status change on each tick.
pub const DEFAULT_CHANGE_PROBABILITY: f64 = 0.2;

/// Decide, for `count` indicators, which status (if any) each one moves to this tick.
pub fn plan_tick<R: Rng + ?Sized>(
    rng: &mut R,
    count: usize,
    probability: f64,
) -> Vec<Option<Status>> {
    let probability = clamp_probability(probability);
    (0..count)
        .map(|_| {
            if rng.gen_bool(probability) {
                Status::ALL.choose(rng).copied()
            } else {
                None
            }
        })
        .collect()
}

fn clamp_probability(probability: f64) -> f64 {
    if probability.is_nan() {
        0.0
    } else {
        probability.clamp(0.0, 1.0)
    }
}

/// Recurring task that simulates worker activity on the registry's indicators.
pub struct StatusDriver {
    registry: Arc<IndicatorRegistry>,
    period: Duration,
    probability: f64,
}

impl StatusDriver {
    /// Create a driver with the default period and probability.
    pub fn new(registry: Arc<IndicatorRegistry>) -> Self {
        Self {
            registry,
            period: DEFAULT_TICK_PERIOD,
            probability: DEFAULT_CHANGE_PROBABILITY,
        }
    }

    /// Override the tick period. Zero is raised to one millisecond.
    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period.max(Duration::from_millis(1));
        self
    }

    /// Override the per-indicator change probability (clamped to `[0, 1]`).
    pub fn with_probability(mut self, probability: f64) -> Self {
        self.probability = clamp_probability(probability);
        self
    }

    /// Roll once for every indicator and spawn the selected transitions.
    pub fn tick(&self) -> Vec<JoinHandle<()>> {
        self.registry.metrics().record_driver_tick();
        let plan = plan_tick(&mut rand::thread_rng(), self.registry.len(), self.probability);

        let mut transitions = Vec::new();
        for (bot, status) in self.registry.indicators().iter().zip(plan) {
            let Some(status) = status else {
                continue;
            };
            tracing::debug!(
                color = %bot.indicator().color(),
                %status,
                "Driver selected transition"
            );
            let bot = bot.clone();
            transitions.push(tokio::spawn(async move { bot.apply(status).await }));
        }
        transitions
    }

    /// Run the driver until `shutdown` is cancelled.
    ///
    /// The first tick fires one full period after spawning. Transitions still in flight at
    /// shutdown are awaited before the returned handle completes.
    pub fn spawn(self, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move { self.run(shutdown).await })
    }

    async fn run(self, shutdown: CancellationToken) {
        tracing::info!(
            period_secs = self.period.as_secs_f64(),
            probability = self.probability,
            "Status driver started"
        );
        let start = tokio::time::Instant::now() + self.period;
        let mut interval = tokio::time::interval_at(start, self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut in_flight: Vec<JoinHandle<()>> = Vec::new();
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = interval.tick() => {
                    in_flight.retain(|task| !task.is_finished());
                    in_flight.extend(self.tick());
                }
            }
        }

        for task in in_flight {
            if let Err(err) = task.await {
                tracing::warn!(error = %err, "Status transition task failed");
            }
        }
        tracing::info!("Status driver stopped");
    }
}

use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing indicator activity.
#[derive(Default)]
pub struct IndicatorMetrics {
    loops_started: AtomicU64,
    loops_stopped: AtomicU64,
    toggles: AtomicU64,
    status_transitions: AtomicU64,
    driver_ticks: AtomicU64,
}

impl IndicatorMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a blink loop being spawned.
    pub fn record_loop_started(&self) {
        self.loops_started.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a blink loop being joined.
    pub fn record_loop_stopped(&self) {
        self.loops_stopped.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one output flip inside a blink loop.
    pub fn record_toggle(&self) {
        self.toggles.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a completed status transition.
    pub fn record_transition(&self) {
        self.status_transitions.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one Status Driver tick.
    pub fn record_driver_tick(&self) {
        self.driver_ticks.fetch_add(1, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            loops_started: self.loops_started.load(Ordering::Relaxed),
            loops_stopped: self.loops_stopped.load(Ordering::Relaxed),
            toggles: self.toggles.load(Ordering::Relaxed),
            status_transitions: self.status_transitions.load(Ordering::Relaxed),
            driver_ticks: self.driver_ticks.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of indicator counters used for reporting.
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Blink loops spawned since startup.
    pub loops_started: u64,
    /// Blink loops joined since startup.
    pub loops_stopped: u64,
    /// Output flips performed by blink loops.
    pub toggles: u64,
    /// Status transitions applied (driver and API).
    pub status_transitions: u64,
    /// Status Driver ticks observed.
    pub driver_ticks: u64,
}

impl MetricsSnapshot {
    /// Number of blink loops currently alive.
    pub fn active_loops(&self) -> u64 {
        self.loops_started.saturating_sub(self.loops_stopped)
    }
}

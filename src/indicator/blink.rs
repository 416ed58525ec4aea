//! Blink state machine for a single indicator.
//!
//! An [`Indicator`] is either stopped or owns exactly one background blink loop. The loop is a
//! tokio task paired with a [`CancellationToken`]; [`Indicator::stop`] cancels the token and then
//! awaits the task, so the output is off and the loop is gone by the time it returns.
//! [`Indicator::start`] runs that same stop protocol first when a loop is already active.
//!
//! Start and stop on the same indicator are serialized by an async mutex around the loop slot,
//! which closes the window between checking for a running loop and spawning a new one.

use super::output::OutputBackend;
use super::types::{Color, IndicatorError, Level};
use crate::metrics::IndicatorMetrics;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Period used when `speed` is exactly zero or cannot be expressed as a duration.
pub const FALLBACK_PERIOD: Duration = Duration::from_secs(1);

/// Half-cycle period for a blink speed given in seconds.
///
/// `0` maps to [`FALLBACK_PERIOD`] rather than a busy loop. Negative and non-finite speeds
/// take the same fallback.
pub fn blink_period(speed: f64) -> Duration {
    if speed == 0.0 {
        return FALLBACK_PERIOD;
    }
    Duration::try_from_secs_f64(speed).unwrap_or_else(|_| {
        tracing::warn!(speed, "Unusable blink speed; using fallback period");
        FALLBACK_PERIOD
    })
}

/// State shared between an indicator and its blink loop.
struct Light {
    color: Color,
    pin: u8,
    lit: AtomicBool,
    /// Set before a loop is spawned, cleared by the loop itself after its final off write.
    looping: AtomicBool,
    backend: Arc<dyn OutputBackend>,
    metrics: Arc<IndicatorMetrics>,
}

impl Light {
    fn drive(&self, level: Level) {
        self.lit.store(level.is_on(), Ordering::SeqCst);
        if let Err(err) = self.backend.write(self.pin, level) {
            tracing::error!(
                color = %self.color,
                pin = self.pin,
                %level,
                error = %err,
                "Output write failed"
            );
        }
    }
}

struct BlinkHandle {
    speed: f64,
    stop: CancellationToken,
    task: JoinHandle<()>,
}

/// One colored status light with a start/stop blink lifecycle.
pub struct Indicator {
    light: Arc<Light>,
    blink: Mutex<Option<BlinkHandle>>,
}

impl Indicator {
    /// Create an indicator for `color`, registering its pin with `backend`.
    pub fn new(
        color: Color,
        backend: Arc<dyn OutputBackend>,
        metrics: Arc<IndicatorMetrics>,
    ) -> Result<Self, IndicatorError> {
        let pin = color.identifier();
        backend.register(pin)?;
        tracing::debug!(%color, pin, backend = backend.name(), "Indicator registered");
        Ok(Self {
            light: Arc::new(Light {
                color,
                pin,
                lit: AtomicBool::new(false),
                looping: AtomicBool::new(false),
                backend,
                metrics,
            }),
            blink: Mutex::new(None),
        })
    }

    /// Create an indicator from a color name; unknown names fail with
    /// [`IndicatorError::InvalidArgument`] before anything is registered.
    pub fn from_name(
        color: &str,
        backend: Arc<dyn OutputBackend>,
        metrics: Arc<IndicatorMetrics>,
    ) -> Result<Self, IndicatorError> {
        Self::new(color.parse()?, backend, metrics)
    }

    /// Color of this light.
    pub fn color(&self) -> Color {
        self.light.color
    }

    /// Output identifier (pin) derived from the color.
    pub fn identifier(&self) -> u8 {
        self.light.pin
    }

    /// Whether a blink loop is currently active.
    ///
    /// Turns false as soon as the loop has exited, even if the `stop` call that cancelled it was
    /// dropped before reaping the task.
    pub fn is_running(&self) -> bool {
        self.light.looping.load(Ordering::SeqCst)
    }

    /// Last level driven onto the output.
    pub fn level(&self) -> Level {
        Level::from(self.light.lit.load(Ordering::SeqCst))
    }

    pub(crate) fn metrics(&self) -> &Arc<IndicatorMetrics> {
        &self.light.metrics
    }

    /// Speed of the active blink loop, if any.
    pub async fn speed(&self) -> Option<f64> {
        let slot = self.blink.lock().await;
        slot.as_ref()
            .filter(|_| self.is_running())
            .map(|handle| handle.speed)
    }

    /// Start blinking with `speed` seconds per half-cycle, replacing any active loop.
    pub async fn start(&self, speed: f64) {
        let mut slot = self.blink.lock().await;
        self.halt(&mut slot).await;

        let period = blink_period(speed);
        let stop = CancellationToken::new();
        self.light.looping.store(true, Ordering::SeqCst);
        let task = tokio::spawn(blink_loop(self.light.clone(), period, stop.clone()));
        *slot = Some(BlinkHandle { speed, stop, task });
        self.light.metrics.record_loop_started();
        tracing::debug!(
            color = %self.light.color,
            speed,
            period_ms = period.as_millis() as u64,
            "Blink loop started"
        );
    }

    /// Stop blinking and wait for the loop to exit. A no-op when nothing is running.
    pub async fn stop(&self) {
        let mut slot = self.blink.lock().await;
        self.halt(&mut slot).await;
    }

    async fn halt(&self, slot: &mut Option<BlinkHandle>) {
        let Some(handle) = slot.as_mut() else {
            return;
        };
        handle.stop.cancel();
        // The handle stays in the slot until the join completes, so a dropped caller
        // leaves the next start/stop to finish the join.
        if let Err(err) = (&mut handle.task).await {
            tracing::error!(
                color = %self.light.color,
                error = %err,
                "Blink loop terminated abnormally"
            );
            self.light.drive(Level::Off);
        }
        *slot = None;
        self.light.looping.store(false, Ordering::SeqCst);
        self.light.metrics.record_loop_stopped();
        tracing::debug!(color = %self.light.color, "Blink loop stopped");
    }
}

async fn blink_loop(light: Arc<Light>, period: Duration, stop: CancellationToken) {
    let mut level = Level::Off;
    while !stop.is_cancelled() {
        level = level.toggled();
        light.drive(level);
        light.metrics.record_toggle();
        tracing::info!(color = %light.color, pin = light.pin, %level, "Indicator toggled");

        tokio::select! {
            biased;
            _ = stop.cancelled() => break,
            _ = tokio::time::sleep(period) => {}
        }
    }
    light.drive(Level::Off);
    light.looping.store(false, Ordering::SeqCst);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicator::output::SimulatedOutput;
    use std::time::Instant;

    fn indicator(color: Color) -> (Indicator, Arc<SimulatedOutput>, Arc<IndicatorMetrics>) {
        let output = Arc::new(SimulatedOutput::new());
        let metrics = Arc::new(IndicatorMetrics::new());
        let indicator = Indicator::new(color, output.clone(), metrics.clone()).unwrap();
        (indicator, output, metrics)
    }

    #[test]
    fn zero_speed_uses_one_second_period() {
        assert_eq!(blink_period(0.0), Duration::from_secs(1));
        assert_eq!(blink_period(0.25), Duration::from_millis(250));
        assert_eq!(blink_period(-1.0), FALLBACK_PERIOD);
        assert_eq!(blink_period(f64::NAN), FALLBACK_PERIOD);
    }

    #[test]
    fn unknown_color_creates_nothing() {
        let output = Arc::new(SimulatedOutput::new());
        let result = Indicator::from_name("purple", output.clone(), Arc::default());
        assert!(matches!(result, Err(IndicatorError::InvalidArgument(_))));
        for color in Color::ALL {
            assert!(!output.is_registered(color.identifier()));
        }
    }

    #[tokio::test]
    async fn start_then_stop_leaves_output_off() {
        for speed in [0.0, 0.01, 0.5, 3.0] {
            let (indicator, output, _) = indicator(Color::Green);
            indicator.start(speed).await;
            assert!(indicator.is_running());
            assert_eq!(indicator.speed().await, Some(speed));

            indicator.stop().await;

            assert!(!indicator.is_running());
            assert_eq!(indicator.level(), Level::Off);
            assert_eq!(output.level(22), Some(Level::Off));
            assert_eq!(indicator.speed().await, None);
        }
    }

    #[tokio::test]
    async fn stop_without_start_returns_immediately() {
        let (indicator, output, metrics) = indicator(Color::Red);
        let began = Instant::now();
        indicator.stop().await;
        indicator.stop().await;
        assert!(began.elapsed() < Duration::from_millis(100));
        assert!(!indicator.is_running());
        assert!(output.history(17).is_empty());
        assert_eq!(metrics.snapshot().loops_stopped, 0);
    }

    #[tokio::test]
    async fn stop_is_idempotent() {
        let (indicator, output, metrics) = indicator(Color::Yellow);
        indicator.start(0.02).await;
        tokio::time::sleep(Duration::from_millis(50)).await;

        indicator.stop().await;
        let writes_after_first = output.history(27).len();
        indicator.stop().await;

        assert_eq!(output.history(27).len(), writes_after_first);
        assert_eq!(output.level(27), Some(Level::Off));
        assert_eq!(metrics.snapshot().loops_stopped, 1);
    }

    #[tokio::test]
    async fn stop_does_not_wait_for_a_long_period() {
        let (indicator, _, _) = indicator(Color::Green);
        indicator.start(30.0).await;
        tokio::time::sleep(Duration::from_millis(20)).await;

        let began = Instant::now();
        indicator.stop().await;
        assert!(began.elapsed() < Duration::from_secs(1));
        assert_eq!(indicator.level(), Level::Off);
    }

    #[tokio::test]
    async fn restart_replaces_the_running_loop() {
        let (indicator, output, metrics) = indicator(Color::Red);
        indicator.start(0.02).await;
        tokio::time::sleep(Duration::from_millis(30)).await;
        indicator.start(0.03).await;
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(indicator.speed().await, Some(0.03));
        indicator.stop().await;

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.loops_started, 2);
        assert_eq!(snapshot.active_loops(), 0);

        // A second concurrent loop would interleave its own "on" writes.
        let history = output.history(17);
        for pair in history.windows(2) {
            assert!(
                !(pair[0].level.is_on() && pair[1].level.is_on()),
                "two consecutive on writes: {history:?}"
            );
        }
        // One loop (20ms, then 30ms) over ~230ms toggles under a dozen times; two would double it.
        assert!(history.len() <= 18, "too many writes: {}", history.len());
    }

    #[tokio::test]
    async fn abandoned_stop_still_ends_the_loop() {
        let (indicator, output, metrics) = indicator(Color::Green);
        indicator.start(30.0).await;
        tokio::time::sleep(Duration::from_millis(20)).await;

        // The first poll cancels the loop; the caller then gives up before the join completes.
        let abandoned = tokio::time::timeout(Duration::ZERO, indicator.stop()).await;
        assert!(abandoned.is_err());
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(!indicator.is_running());
        assert_eq!(indicator.speed().await, None);
        assert_eq!(indicator.level(), Level::Off);
        assert_eq!(output.level(22), Some(Level::Off));

        indicator.stop().await;
        assert!(!indicator.is_running());
        assert_eq!(metrics.snapshot().active_loops(), 0);
    }

    #[tokio::test]
    async fn concurrent_starts_leave_one_loop() {
        let (indicator, output, metrics) = indicator(Color::Yellow);
        let indicator = Arc::new(indicator);

        let mut tasks = Vec::new();
        for _ in 0..8 {
            let indicator = indicator.clone();
            tasks.push(tokio::spawn(async move { indicator.start(0.02).await }));
        }
        for task in tasks {
            task.await.unwrap();
        }
        tokio::time::sleep(Duration::from_millis(100)).await;

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.loops_started, 8);
        assert_eq!(snapshot.active_loops(), 1);

        indicator.stop().await;
        assert_eq!(metrics.snapshot().active_loops(), 0);
        assert_eq!(output.level(27), Some(Level::Off));
    }

    #[tokio::test]
    async fn toggles_alternate_starting_with_on() {
        let (indicator, output, _) = indicator(Color::Green);
        indicator.start(0.02).await;
        tokio::time::sleep(Duration::from_millis(90)).await;
        indicator.stop().await;

        let levels: Vec<Level> = output.history(22).iter().map(|event| event.level).collect();
        assert!(levels.len() >= 3, "{levels:?}");
        assert_eq!(levels[0], Level::On);
        assert_eq!(levels[1], Level::Off);
        assert_eq!(levels.last(), Some(&Level::Off));
    }
}

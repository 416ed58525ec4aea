//! Fixed, process-lifetime set of status indicators.
//!
//! The registry is built once at startup and shared through an `Arc` with the Status Driver and
//! the HTTP surface. Call [`IndicatorRegistry::shutdown`] before exit so no blink loop outlives
//! the process and the output backend releases its pins.

use crate::indicator::{
    Color, Indicator, IndicatorError, IndicatorSnapshot, OutputBackend, OutputError,
    StatusIndicator,
};
use crate::metrics::IndicatorMetrics;
use serde::Serialize;
use std::sync::Arc;

/// Registry order of indicator colors.
pub const REGISTRY_COLORS: [Color; 3] = Color::ALL;

/// Blink speeds used by [`IndicatorRegistry::start_all`], in registry order.
pub const BULK_START_SPEEDS: [f64; 3] = [1.0, 0.75, 0.5];

/// Confirmation returned by the bulk operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BulkConfirmation {
    /// `"started"` or `"stopped"`.
    pub status: &'static str,
    /// Number of indicators affected.
    pub indicators: usize,
}

/// Ordered collection of the red, yellow, and green status indicators.
pub struct IndicatorRegistry {
    indicators: Vec<Arc<StatusIndicator>>,
    backend: Arc<dyn OutputBackend>,
    metrics: Arc<IndicatorMetrics>,
}

impl IndicatorRegistry {
    /// Initialize the output system and register the three indicators.
    pub fn new(
        backend: Arc<dyn OutputBackend>,
        metrics: Arc<IndicatorMetrics>,
    ) -> Result<Self, IndicatorError> {
        backend.setup()?;
        let indicators = REGISTRY_COLORS
            .into_iter()
            .map(|color| {
                Indicator::new(color, backend.clone(), metrics.clone())
                    .map(|indicator| Arc::new(StatusIndicator::new(indicator)))
            })
            .collect::<Result<Vec<_>, _>>()?;
        tracing::info!(
            backend = backend.name(),
            indicators = indicators.len(),
            "Indicator registry ready"
        );
        Ok(Self {
            indicators,
            backend,
            metrics,
        })
    }

    /// Indicators in registry order.
    pub fn indicators(&self) -> &[Arc<StatusIndicator>] {
        &self.indicators
    }

    /// Indicator at `index`, if present.
    pub fn get(&self, index: usize) -> Option<&Arc<StatusIndicator>> {
        self.indicators.get(index)
    }

    /// Number of registered indicators (always three).
    pub fn len(&self) -> usize {
        self.indicators.len()
    }

    /// Always `false`; present for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.indicators.is_empty()
    }

    /// Shared metrics accumulator.
    pub fn metrics(&self) -> &Arc<IndicatorMetrics> {
        &self.metrics
    }

    /// Identifier of the indicator at `index`, for diagnostics.
    pub fn identifier(&self, index: usize) -> Option<u8> {
        self.get(index).map(|bot| bot.indicator().identifier())
    }

    /// Start every indicator with its fixed bulk speed, bypassing the status vocabulary.
    pub async fn start_all(&self) -> BulkConfirmation {
        for (bot, speed) in self.indicators.iter().zip(BULK_START_SPEEDS) {
            bot.indicator().start(speed).await;
        }
        tracing::info!("All indicators started");
        BulkConfirmation {
            status: "started",
            indicators: self.len(),
        }
    }

    /// Stop every indicator and wait for all blink loops to exit.
    pub async fn stop_all(&self) -> BulkConfirmation {
        for bot in &self.indicators {
            bot.indicator().stop().await;
        }
        tracing::info!("All indicators stopped");
        BulkConfirmation {
            status: "stopped",
            indicators: self.len(),
        }
    }

    /// Diagnostic snapshot of every indicator.
    pub async fn snapshot(&self) -> Vec<IndicatorSnapshot> {
        let mut snapshots = Vec::with_capacity(self.len());
        for (index, bot) in self.indicators.iter().enumerate() {
            snapshots.push(bot.snapshot(index).await);
        }
        snapshots
    }

    /// Stop every indicator and release the output backend.
    ///
    /// Backend teardown touches the filesystem for real pins, so it runs on the blocking pool.
    pub async fn shutdown(&self) -> Result<(), OutputError> {
        self.stop_all().await;
        let backend = self.backend.clone();
        tokio::task::spawn_blocking(move || backend.cleanup())
            .await
            .map_err(|err| OutputError::Teardown(err.to_string()))??;
        tracing::info!(backend = self.backend.name(), "Indicator outputs released");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicator::{Level, SimulatedOutput, Status};

    fn registry() -> (IndicatorRegistry, Arc<SimulatedOutput>) {
        let output = Arc::new(SimulatedOutput::new());
        let registry = IndicatorRegistry::new(output.clone(), Arc::new(IndicatorMetrics::new()))
            .expect("registry");
        (registry, output)
    }

    #[test]
    fn registers_three_colors_in_order() {
        let (registry, output) = registry();
        assert!(output.is_set_up());
        assert_eq!(registry.len(), 3);
        let colors: Vec<Color> = registry
            .indicators()
            .iter()
            .map(|bot| bot.indicator().color())
            .collect();
        assert_eq!(colors, vec![Color::Red, Color::Yellow, Color::Green]);
        assert_eq!(registry.identifier(0), Some(17));
        assert_eq!(registry.identifier(1), Some(27));
        assert_eq!(registry.identifier(2), Some(22));
        assert_eq!(registry.identifier(3), None);
    }

    #[tokio::test]
    async fn bulk_start_uses_fixed_speeds_and_bypasses_status() {
        let (registry, _) = registry();
        let confirmation = registry.start_all().await;
        assert_eq!(confirmation.status, "started");

        for (bot, speed) in registry.indicators().iter().zip(BULK_START_SPEEDS) {
            assert!(bot.indicator().is_running());
            assert_eq!(bot.indicator().speed().await, Some(speed));
            assert_eq!(bot.get_status(), Status::Offline);
        }
        registry.stop_all().await;
    }

    #[tokio::test]
    async fn shutdown_stops_everything_and_cleans_up() {
        let (registry, output) = registry();
        registry.get(0).unwrap().set_busy().await;
        registry.get(2).unwrap().set_idle().await;

        registry.shutdown().await.unwrap();

        assert!(output.is_cleaned_up());
        for bot in registry.indicators() {
            assert!(!bot.indicator().is_running());
            assert_eq!(bot.indicator().level(), Level::Off);
        }
        assert_eq!(registry.metrics().snapshot().active_loops(), 0);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn shutdown_releases_outputs_on_a_single_threaded_runtime() {
        let (registry, output) = registry();
        registry.get(1).unwrap().set_busy().await;

        registry.shutdown().await.unwrap();

        assert!(output.is_cleaned_up());
        assert_eq!(output.level(27), Some(Level::Off));
    }

    #[tokio::test]
    async fn snapshot_lists_every_indicator() {
        let (registry, _) = registry();
        let snapshot = registry.snapshot().await;
        assert_eq!(snapshot.len(), 3);
        assert_eq!(snapshot[1].color, Color::Yellow);
        assert_eq!(snapshot[1].index, 1);
        assert!(!snapshot[1].running);
    }
}

//! Output backends that turn indicator levels into light.
//!
//! The blink state machine only ever talks to an [`OutputBackend`]. Two implementations ship:
//!
//! - [`SimulatedOutput`] keeps levels in memory and logs every write. It is the default and the
//!   backend used on hosts without GPIO hardware.
//! - [`crate::indicator::gpio::SysfsGpio`] drives real pins through the Linux sysfs interface.
//!
//! The backend is chosen once from configuration by [`build_backend`].

use super::gpio::SysfsGpio;
use super::types::{Level, OutputError};
use crate::config::{BackendKind, Config};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

/// Capability interface over a set of two-state outputs addressed by pin number.
///
/// Methods are synchronous and `write` runs on the blink task's runtime worker, so each call must
/// complete in microseconds (a sysfs attribute write does). Slow teardown in
/// [`OutputBackend::cleanup`] is run off the runtime by the registry.
pub trait OutputBackend: Send + Sync {
    /// Short backend name for diagnostics.
    fn name(&self) -> &'static str;

    /// One-time initialization of the output system, before any pin is registered.
    fn setup(&self) -> Result<(), OutputError> {
        Ok(())
    }

    /// Claim `pin` as an output. Called once per indicator at construction.
    fn register(&self, pin: u8) -> Result<(), OutputError>;

    /// Drive `pin` to `level`.
    fn write(&self, pin: u8, level: Level) -> Result<(), OutputError>;

    /// Release every registered pin. Matches [`OutputBackend::setup`] at shutdown.
    fn cleanup(&self) -> Result<(), OutputError> {
        Ok(())
    }
}

/// A single write observed by the simulated backend.
#[derive(Debug, Clone, Copy)]
pub struct OutputEvent {
    /// Pin that was written.
    pub pin: u8,
    /// Level written.
    pub level: Level,
    /// Monotonic timestamp of the write.
    pub at: Instant,
}

/// Number of writes the simulated backend retains, across all pins.
pub const DEFAULT_HISTORY_CAPACITY: usize = 1024;

#[derive(Default)]
struct SimulatedState {
    set_up: bool,
    cleaned_up: bool,
    levels: HashMap<u8, Level>,
    history: VecDeque<OutputEvent>,
}

/// In-memory backend that logs writes instead of touching hardware.
///
/// Only the most recent writes are kept; older ones are dropped once the history is full.
pub struct SimulatedOutput {
    state: Mutex<SimulatedState>,
    history_capacity: usize,
}

impl Default for SimulatedOutput {
    fn default() -> Self {
        Self::with_history_capacity(DEFAULT_HISTORY_CAPACITY)
    }
}

impl SimulatedOutput {
    /// Create an empty simulated backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty simulated backend that retains at most `capacity` writes.
    pub fn with_history_capacity(capacity: usize) -> Self {
        Self {
            state: Mutex::new(SimulatedState::default()),
            history_capacity: capacity,
        }
    }

    fn state(&self) -> MutexGuard<'_, SimulatedState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current level of `pin`, or `None` when the pin was never registered.
    pub fn level(&self, pin: u8) -> Option<Level> {
        self.state().levels.get(&pin).copied()
    }

    /// Whether `pin` has been registered.
    pub fn is_registered(&self, pin: u8) -> bool {
        self.state().levels.contains_key(&pin)
    }

    /// Retained writes made to `pin`, oldest first.
    pub fn history(&self, pin: u8) -> Vec<OutputEvent> {
        self.state()
            .history
            .iter()
            .filter(|event| event.pin == pin)
            .copied()
            .collect()
    }

    /// Whether [`OutputBackend::setup`] has run.
    pub fn is_set_up(&self) -> bool {
        self.state().set_up
    }

    /// Whether [`OutputBackend::cleanup`] has run.
    pub fn is_cleaned_up(&self) -> bool {
        self.state().cleaned_up
    }
}

impl OutputBackend for SimulatedOutput {
    fn name(&self) -> &'static str {
        "simulated"
    }

    fn setup(&self) -> Result<(), OutputError> {
        tracing::debug!("Simulated output system initialized");
        self.state().set_up = true;
        Ok(())
    }

    fn register(&self, pin: u8) -> Result<(), OutputError> {
        self.state().levels.entry(pin).or_insert(Level::Off);
        tracing::debug!(pin, "Simulated output registered");
        Ok(())
    }

    fn write(&self, pin: u8, level: Level) -> Result<(), OutputError> {
        let mut state = self.state();
        let slot = state
            .levels
            .get_mut(&pin)
            .ok_or(OutputError::Unregistered(pin))?;
        *slot = level;
        if self.history_capacity > 0 {
            if state.history.len() >= self.history_capacity {
                state.history.pop_front();
            }
            state.history.push_back(OutputEvent {
                pin,
                level,
                at: Instant::now(),
            });
        }
        tracing::trace!(pin, %level, "Simulated output write");
        Ok(())
    }

    fn cleanup(&self) -> Result<(), OutputError> {
        let mut state = self.state();
        for level in state.levels.values_mut() {
            *level = Level::Off;
        }
        state.cleaned_up = true;
        tracing::debug!("Simulated output system released");
        Ok(())
    }
}

/// Build the output backend selected by the configuration.
pub fn build_backend(config: &Config) -> Arc<dyn OutputBackend> {
    match config.indicator_backend {
        BackendKind::Simulated => Arc::new(SimulatedOutput::new()),
        BackendKind::Gpio => Arc::new(SysfsGpio::new(&config.gpio_sysfs_root)),
    }
}

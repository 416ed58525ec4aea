//! Linux sysfs GPIO backend.
//!
//! Pins are exported through `<root>/export`, configured as outputs via
//! `<root>/gpio<N>/direction`, and driven by writing `1`/`0` to `<root>/gpio<N>/value`.

use super::output::OutputBackend;
use super::types::{Level, OutputError};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

/// Output backend writing to the sysfs GPIO tree.
pub struct SysfsGpio {
    root: PathBuf,
    registered: Mutex<Vec<u8>>,
}

impl SysfsGpio {
    /// Create a backend rooted at `root` (normally `/sys/class/gpio`).
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            registered: Mutex::new(Vec::new()),
        }
    }

    fn pin_dir(&self, pin: u8) -> PathBuf {
        self.root.join(format!("gpio{pin}"))
    }

    fn is_registered(&self, pin: u8) -> bool {
        self.registered
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&pin)
    }
}

fn write_control(path: PathBuf, contents: &str) -> Result<(), OutputError> {
    fs::write(&path, contents).map_err(|source| OutputError::Io { path, source })
}

impl OutputBackend for SysfsGpio {
    fn name(&self) -> &'static str {
        "gpio"
    }

    fn setup(&self) -> Result<(), OutputError> {
        fs::metadata(&self.root).map_err(|source| OutputError::Io {
            path: self.root.clone(),
            source,
        })?;
        tracing::info!(root = %self.root.display(), "GPIO sysfs tree available");
        Ok(())
    }

    fn register(&self, pin: u8) -> Result<(), OutputError> {
        if !self.pin_dir(pin).exists() {
            write_control(self.root.join("export"), &pin.to_string())?;
        }
        write_control(self.pin_dir(pin).join("direction"), "out")?;
        write_control(self.pin_dir(pin).join("value"), "0")?;

        let mut registered = self
            .registered
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if !registered.contains(&pin) {
            registered.push(pin);
        }
        tracing::debug!(pin, "GPIO pin exported as output");
        Ok(())
    }

    fn write(&self, pin: u8, level: Level) -> Result<(), OutputError> {
        if !self.is_registered(pin) {
            return Err(OutputError::Unregistered(pin));
        }
        let value = if level.is_on() { "1" } else { "0" };
        write_control(self.pin_dir(pin).join("value"), value)
    }

    fn cleanup(&self) -> Result<(), OutputError> {
        let pins: Vec<u8> = self
            .registered
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();

        let mut first_error = None;
        for pin in pins {
            let released = write_control(self.pin_dir(pin).join("value"), "0")
                .and_then(|()| write_control(self.root.join("unexport"), &pin.to_string()));
            if let Err(err) = released {
                tracing::warn!(pin, error = %err, "Failed to release GPIO pin");
                first_error.get_or_insert(err);
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

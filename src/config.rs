use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::OnceLock;
use std::time::Duration;
use thiserror::Error;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration for the Drill Bot service.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Address the HTTP server binds to.
    pub server_host: String,
    /// Port the HTTP server binds to.
    pub server_port: u16,
    /// Output backend driving the indicators.
    pub indicator_backend: BackendKind,
    /// Root of the sysfs GPIO tree used by the `gpio` backend.
    pub gpio_sysfs_root: PathBuf,
    /// Whether the random Status Driver runs.
    pub status_driver_enabled: bool,
    /// Tick period of the Status Driver, in seconds.
    pub status_driver_period_secs: u64,
    /// Per-indicator probability of a status change on each tick.
    pub status_driver_probability: f64,
    /// File the tracing subscriber appends to.
    pub log_file: PathBuf,
}

/// Supported indicator output backends.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// In-memory, logging-only outputs.
    #[default]
    Simulated,
    /// Linux sysfs GPIO pins.
    Gpio,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_host: "0.0.0.0".to_string(),
            server_port: 8000,
            indicator_backend: BackendKind::Simulated,
            gpio_sysfs_root: PathBuf::from("/sys/class/gpio"),
            status_driver_enabled: true,
            status_driver_period_secs: 10,
            status_driver_probability: 0.2,
            log_file: PathBuf::from("logs/drillbot.log"),
        }
    }
}

const TRUE_VALUES: [&str; 7] = ["true", "1", "t", "y", "yes", "ja", "ok"];

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let defaults = Self::default();

        let status_driver_period_secs = parse_or(&get, "STATUS_DRIVER_PERIOD_SECS")?
            .unwrap_or(defaults.status_driver_period_secs);
        if status_driver_period_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "STATUS_DRIVER_PERIOD_SECS".to_string(),
            ));
        }

        let status_driver_probability: f64 = parse_or(&get, "STATUS_DRIVER_PROBABILITY")?
            .unwrap_or(defaults.status_driver_probability);
        if !(0.0..=1.0).contains(&status_driver_probability) {
            return Err(ConfigError::InvalidValue(
                "STATUS_DRIVER_PROBABILITY".to_string(),
            ));
        }

        Ok(Self {
            server_host: get("SERVER_HOST").unwrap_or(defaults.server_host),
            server_port: parse_or(&get, "SERVER_PORT")?.unwrap_or(defaults.server_port),
            indicator_backend: get("INDICATOR_BACKEND")
                .map(|value| {
                    value
                        .parse::<BackendKind>()
                        .map_err(|()| ConfigError::InvalidValue("INDICATOR_BACKEND".into()))
                })
                .transpose()?
                .unwrap_or(defaults.indicator_backend),
            gpio_sysfs_root: get("GPIO_SYSFS_ROOT")
                .map(PathBuf::from)
                .unwrap_or(defaults.gpio_sysfs_root),
            status_driver_enabled: get("STATUS_DRIVER_ENABLED")
                .map(|value| is_truthy(&value))
                .unwrap_or(defaults.status_driver_enabled),
            status_driver_period_secs,
            status_driver_probability,
            log_file: get("LOG_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.log_file),
        })
    }

    /// Status Driver tick period.
    pub fn status_driver_period(&self) -> Duration {
        Duration::from_secs(self.status_driver_period_secs)
    }
}

fn parse_or<T, G>(get: &G, key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    get(key)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue(key.to_string()))
        })
        .transpose()
}

fn is_truthy(value: &str) -> bool {
    TRUE_VALUES.contains(&value.trim().to_lowercase().as_str())
}

impl FromStr for BackendKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "simulated" | "fake" => Ok(Self::Simulated),
            "gpio" => Ok(Self::Gpio),
            _ => Err(()),
        }
    }
}

static CONFIG: OnceLock<Config> = OnceLock::new();

/// Load configuration from the environment (and `.env`) once, returning the cached value.
///
/// Runs before tracing is installed, since the log destination is part of the configuration.
pub fn init_config() -> Result<&'static Config, ConfigError> {
    if let Some(config) = CONFIG.get() {
        return Ok(config);
    }
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;
    Ok(CONFIG.get_or_init(|| config))
}

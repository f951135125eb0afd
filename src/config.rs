//! Process configuration
//!
//! Defaults match production; every value can be overridden from the
//! environment at startup.

use std::env;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::error::ConfigError;

pub const DEFAULT_BATCH_SIZE: usize = 100;
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_millis(60_000);
pub const DEFAULT_RECENT_WINDOW: Duration = Duration::from_secs(24 * 60 * 60);
pub const DEFAULT_RECENT_EVENTS_LIMIT: usize = 100;
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3030";

/// Settings for the queue, the flush scheduler and the read side
#[derive(Debug, Clone)]
pub struct TrackingConfig {
    /// Queue length that forces an immediate flush, also the batch size
    /// used when partitioning a drained queue
    pub batch_size: usize,
    /// Debounce delay and safety-net cadence
    pub flush_interval: Duration,
    /// How far back `get_metrics` looks for raw events
    pub recent_window: Duration,
    /// Maximum number of raw events returned by `get_metrics`
    pub recent_events_limit: usize,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            recent_window: DEFAULT_RECENT_WINDOW,
            recent_events_limit: DEFAULT_RECENT_EVENTS_LIMIT,
        }
    }
}

impl TrackingConfig {
    /// Config with custom batching parameters
    pub fn new(batch_size: usize, flush_interval: Duration) -> Self {
        Self {
            batch_size: batch_size.max(1),
            flush_interval,
            ..Default::default()
        }
    }

    /// Recent window as a chrono duration, capped at `chrono::Duration::MAX`
    pub fn recent_window_chrono(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.recent_window).unwrap_or(chrono::Duration::MAX)
    }

    /// Oldest timestamp still inside the recent window
    ///
    /// Windows reaching before the representable range start at the minimum
    /// timestamp.
    pub fn recent_since(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now.checked_sub_signed(self.recent_window_chrono())
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

/// Which durable store backs the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    /// JSONL journal under the data directory
    File,
    /// Process memory only, lost on restart
    Memory,
}

/// Everything the server binary needs
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub tracking: TrackingConfig,
    pub store: StoreKind,
    pub data_dir: PathBuf,
    pub bind_addr: SocketAddr,
}

impl ServerConfig {
    /// Read configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        let current_dir = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self::from_lookup(&current_dir, |name| env::var(name).ok())
    }

    /// Read configuration through an arbitrary lookup function
    ///
    /// Relative data directories are resolved against `base_dir`.
    pub fn from_lookup<F>(base_dir: &Path, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut tracking = TrackingConfig::default();

        if let Some(value) = lookup("TRACKING_BATCH_SIZE") {
            tracking.batch_size = parse_positive("TRACKING_BATCH_SIZE", &value)? as usize;
        }
        if let Some(value) = lookup("TRACKING_FLUSH_INTERVAL_MS") {
            tracking.flush_interval =
                Duration::from_millis(parse_positive("TRACKING_FLUSH_INTERVAL_MS", &value)?);
        }
        if let Some(value) = lookup("TRACKING_RECENT_WINDOW_SECS") {
            tracking.recent_window =
                Duration::from_secs(parse_positive("TRACKING_RECENT_WINDOW_SECS", &value)?);
        }
        if let Some(value) = lookup("TRACKING_RECENT_EVENTS_LIMIT") {
            tracking.recent_events_limit =
                parse_positive("TRACKING_RECENT_EVENTS_LIMIT", &value)? as usize;
        }

        let store = match lookup("TRACKING_STORE").as_deref() {
            None | Some("file") => StoreKind::File,
            Some("memory") => StoreKind::Memory,
            Some(other) => {
                return Err(ConfigError::InvalidValue {
                    name: "TRACKING_STORE",
                    value: other.to_string(),
                })
            }
        };

        let data_dir = match lookup("TRACKING_DATA_DIR") {
            Some(path) if Path::new(&path).is_absolute() => PathBuf::from(path),
            Some(path) => base_dir.join(path),
            None => base_dir.join("data"),
        };

        let bind_value = lookup("TRACKING_BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_value.parse().map_err(|_| ConfigError::InvalidValue {
            name: "TRACKING_BIND_ADDR",
            value: bind_value.clone(),
        })?;

        Ok(Self {
            tracking,
            store,
            data_dir,
            bind_addr,
        })
    }
}

fn parse_positive(name: &'static str, value: &str) -> Result<u64, ConfigError> {
    match value.trim().parse::<u64>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ConfigError::InvalidNumber {
            name,
            value: value.to_string(),
        }),
    }
}

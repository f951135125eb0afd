//! Error types for the tracking pipeline

use thiserror::Error;

pub use crate::validation::ValidationError;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Result type for service operations
pub type TrackingResult<T> = Result<T, TrackingError>;

/// Errors raised by a durable store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("counter '{counter}' for ad '{ad_id}' would overflow")]
    CounterOverflow { ad_id: String, counter: String },
    #[error("store is unavailable: {0}")]
    Unavailable(String),
}

/// Errors surfaced by the tracking service
#[derive(Debug, Error)]
pub enum TrackingError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("unknown period '{0}', expected one of hour, day, week, month")]
    InvalidPeriod(String),
}

/// Errors raised while reading process configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} must be a positive integer, got '{value}'")]
    InvalidNumber { name: &'static str, value: String },
    #[error("{name} has unsupported value '{value}'")]
    InvalidValue { name: &'static str, value: String },
}

//! Shared application state for HTTP handlers

use std::sync::Arc;

use crate::service::TrackingService;

pub struct AppState {
    /// The tracking pipeline
    pub service: Arc<TrackingService>,
}

impl AppState {
    pub fn new(service: Arc<TrackingService>) -> Self {
        Self { service }
    }
}

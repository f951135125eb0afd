//! API module for HTTP endpoints
//!
//! This module provides the REST surface used by CTV players (beacons) and
//! by the ad dashboard (metrics).

pub mod http;
pub mod rest;
pub mod state;

pub use http::create_router;
pub use state::AppState;

//! Boundary validation for tracking submissions
//!
//! Anything that fails these checks is rejected before it can reach the queue.

mod rules;

pub use rules::{
    validate_ad_id, validate_event_type, validate_metadata, ValidationError, MAX_AD_ID_LEN,
    MAX_EVENT_TYPE_LEN,
};

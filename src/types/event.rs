//! Tracking event types
//!
//! A `TrackingEvent` is a single beacon fired by a CTV player or an
//! interactive overlay. Events live in the in-memory queue until a flush
//! turns them into durable `StoredEvent` rows.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::validation::{validate_event_type, ValidationError};

/// Kind of tracking beacon
///
/// The vocabulary is open: the VAST quartile and player events have their own
/// variants, anything else that passes validation is carried as `Custom`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum EventKind {
    Impression,
    Start,
    FirstQuartile,
    Midpoint,
    ThirdQuartile,
    Complete,
    Click,
    Mute,
    Unmute,
    Pause,
    Resume,
    Skip,
    /// Interaction with an overlay element
    Interactive,
    Custom(String),
}

/// Every kind with a dedicated variant
const BUILT_IN: [EventKind; 13] = [
    EventKind::Impression,
    EventKind::Start,
    EventKind::FirstQuartile,
    EventKind::Midpoint,
    EventKind::ThirdQuartile,
    EventKind::Complete,
    EventKind::Click,
    EventKind::Mute,
    EventKind::Unmute,
    EventKind::Pause,
    EventKind::Resume,
    EventKind::Skip,
    EventKind::Interactive,
];

impl EventKind {
    /// Wire tag of this kind, as used in VAST tracking URLs
    pub fn as_str(&self) -> &str {
        match self {
            EventKind::Impression => "impression",
            EventKind::Start => "start",
            EventKind::FirstQuartile => "firstQuartile",
            EventKind::Midpoint => "midpoint",
            EventKind::ThirdQuartile => "thirdQuartile",
            EventKind::Complete => "complete",
            EventKind::Click => "click",
            EventKind::Mute => "mute",
            EventKind::Unmute => "unmute",
            EventKind::Pause => "pause",
            EventKind::Resume => "resume",
            EventKind::Skip => "skip",
            EventKind::Interactive => "interactive",
            EventKind::Custom(tag) => tag,
        }
    }

    /// Name of the aggregate counter incremented by this kind
    ///
    /// One-to-one with kinds: custom tags that equal a built-in counter name
    /// are refused at parse time.
    pub fn counter_name(&self) -> &str {
        match self {
            EventKind::Impression => "impressions",
            EventKind::Start => "starts",
            EventKind::FirstQuartile => "firstQuartiles",
            EventKind::Midpoint => "midpoints",
            EventKind::ThirdQuartile => "thirdQuartiles",
            EventKind::Complete => "completes",
            EventKind::Click => "clicks",
            EventKind::Mute => "mutes",
            EventKind::Unmute => "unmutes",
            EventKind::Pause => "pauses",
            EventKind::Resume => "resumes",
            EventKind::Skip => "skips",
            EventKind::Interactive => "interactions",
            EventKind::Custom(tag) => tag,
        }
    }

    pub fn is_custom(&self) -> bool {
        matches!(self, EventKind::Custom(_))
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        validate_event_type(s)?;

        let kind = match s {
            "impression" => EventKind::Impression,
            "start" => EventKind::Start,
            "firstQuartile" => EventKind::FirstQuartile,
            "midpoint" => EventKind::Midpoint,
            "thirdQuartile" => EventKind::ThirdQuartile,
            "complete" => EventKind::Complete,
            "click" => EventKind::Click,
            "mute" => EventKind::Mute,
            "unmute" => EventKind::Unmute,
            "pause" => EventKind::Pause,
            "resume" => EventKind::Resume,
            "skip" => EventKind::Skip,
            "interactive" => EventKind::Interactive,
            other => {
                if BUILT_IN.iter().any(|known| known.counter_name() == other) {
                    return Err(ValidationError::ReservedEventType(other.to_string()));
                }
                EventKind::Custom(other.to_string())
            }
        };
        Ok(kind)
    }
}

impl TryFrom<String> for EventKind {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<EventKind> for String {
    fn from(kind: EventKind) -> Self {
        match kind {
            EventKind::Custom(tag) => tag,
            known => known.as_str().to_string(),
        }
    }
}

/// Optional fields supplied alongside a submission
///
/// The HTTP layer fills provenance from request headers; `timestamp` falls
/// back to the submission time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl EventData {
    pub fn with_metadata(metadata: serde_json::Value) -> Self {
        Self {
            metadata,
            ..Default::default()
        }
    }
}

/// A tracking event waiting in the queue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingEvent {
    #[serde(rename = "type")]
    pub kind: EventKind,

    pub ad_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,

    pub timestamp: DateTime<Utc>,

    /// Free-form payload, always a JSON object
    #[serde(default = "empty_object")]
    pub metadata: serde_json::Value,
}

fn empty_object() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

impl TrackingEvent {
    /// Build an event from a submission, stamping it with `now` when the
    /// caller did not provide a timestamp
    pub fn from_submission(kind: EventKind, ad_id: String, data: EventData, now: DateTime<Utc>) -> Self {
        let metadata = if data.metadata.is_null() {
            empty_object()
        } else {
            data.metadata
        };

        Self {
            kind,
            ad_id,
            user_agent: data.user_agent,
            ip_address: data.ip_address,
            timestamp: data.timestamp.unwrap_or(now),
            metadata,
        }
    }

    /// Shorthand used by tests and internal callers
    pub fn new(kind: EventKind, ad_id: impl Into<String>) -> Self {
        Self::from_submission(kind, ad_id.into(), EventData::default(), Utc::now())
    }
}

/// A raw event row as persisted by the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredEvent {
    /// Store-assigned, monotonically increasing row id
    pub id: u64,

    #[serde(flatten)]
    pub event: TrackingEvent,

    pub persisted_at: DateTime<Utc>,
}

//! Validation rules for event tags, ad ids and metadata payloads

use thiserror::Error;

/// Longest accepted event type tag
pub const MAX_EVENT_TYPE_LEN: usize = 64;

/// Longest accepted ad identifier
pub const MAX_AD_ID_LEN: usize = 128;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("event type must not be empty")]
    EmptyEventType,
    #[error("event type '{0}' is longer than {max} characters", max = MAX_EVENT_TYPE_LEN)]
    EventTypeTooLong(String),
    #[error("event type '{0}' must start with a letter and contain only letters, digits, '_' or '-'")]
    MalformedEventType(String),
    #[error("event type '{0}' is reserved for a built-in counter")]
    ReservedEventType(String),
    #[error("adId must not be empty")]
    EmptyAdId,
    #[error("adId is longer than {max} characters", max = MAX_AD_ID_LEN)]
    AdIdTooLong,
    #[error("adId must not contain whitespace or control characters")]
    MalformedAdId,
    #[error("metadata must be a JSON object")]
    MetadataNotObject,
}

/// Check an event type tag
pub fn validate_event_type(event_type: &str) -> Result<(), ValidationError> {
    let mut chars = event_type.chars();
    let Some(first) = chars.next() else {
        return Err(ValidationError::EmptyEventType);
    };

    if event_type.len() > MAX_EVENT_TYPE_LEN {
        return Err(ValidationError::EventTypeTooLong(event_type.to_string()));
    }

    if !first.is_ascii_alphabetic()
        || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(ValidationError::MalformedEventType(event_type.to_string()));
    }

    Ok(())
}

/// Check an ad identifier
pub fn validate_ad_id(ad_id: &str) -> Result<(), ValidationError> {
    if ad_id.is_empty() {
        return Err(ValidationError::EmptyAdId);
    }
    if ad_id.chars().count() > MAX_AD_ID_LEN {
        return Err(ValidationError::AdIdTooLong);
    }
    if ad_id.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(ValidationError::MalformedAdId);
    }
    Ok(())
}

/// Metadata may be absent (`null`) or an object, nothing else
pub fn validate_metadata(metadata: &serde_json::Value) -> Result<(), ValidationError> {
    match metadata {
        serde_json::Value::Null | serde_json::Value::Object(_) => Ok(()),
        _ => Err(ValidationError::MetadataNotObject),
    }
}

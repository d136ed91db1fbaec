//! Realtime Message Types
//!
//! JSON text frames exchanged with the push server. Every frame is an
//! envelope `{"event": <name>, "data": <payload>}`.

use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Messages sent from the console to the server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ClientEvent {
    /// Start receiving events for a bike
    #[serde(rename = "subscribeBike")]
    SubscribeBike(String),
    /// Stop receiving events for a bike
    #[serde(rename = "unsubscribeBike")]
    UnsubscribeBike(String),
}

/// Whether the rider has the helmet on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HelmetState {
    Worn,
    NotWorn,
}

/// Breath sensor reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlcoholState {
    Clear,
    Detected,
}

/// Live helmet status pushed by the server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusEvent {
    #[serde(alias = "helmet")]
    pub helmet_state: HelmetState,
    #[serde(alias = "alcohol")]
    pub alcohol_state: AlcoholState,
    #[serde(alias = "battery", deserialize_with = "battery_level")]
    pub battery_percent: u8,
}

/// Any JSON number, rounded and clamped to 0..=100
fn battery_level<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u8, D::Error> {
    let value = f64::deserialize(deserializer)?;
    if !value.is_finite() {
        return Err(de::Error::custom("battery level is not a finite number"));
    }
    Ok(value.round().clamp(0.0, 100.0) as u8)
}

/// Safety alert pushed by the server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertEvent {
    #[serde(default)]
    pub bike_id: Option<String>,
    #[serde(rename = "type")]
    pub alert_type: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// Decoded inbound frame
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    Status(StatusEvent),
    Alert(AlertEvent),
    /// Well-formed envelope with an event name the console ignores
    Other(String),
}

#[derive(Debug, Deserialize)]
struct Envelope {
    event: String,
    #[serde(default)]
    data: Value,
}

/// Frame could not be turned into a `ServerEvent`
#[derive(Error, Debug)]
pub enum FrameError {
    #[error("invalid frame: {0}")]
    Envelope(#[source] serde_json::Error),

    #[error("invalid '{event}' payload: {source}")]
    Payload {
        event: String,
        #[source]
        source: serde_json::Error,
    },
}

impl FrameError {
    /// Event name of a well-formed envelope whose payload was rejected
    pub fn event(&self) -> Option<&str> {
        match self {
            FrameError::Envelope(_) => None,
            FrameError::Payload { event, .. } => Some(event),
        }
    }
}

impl ServerEvent {
    pub fn parse(text: &str) -> Result<Self, FrameError> {
        let envelope: Envelope = serde_json::from_str(text).map_err(FrameError::Envelope)?;

        let payload_error = |source| FrameError::Payload {
            event: envelope.event.clone(),
            source,
        };

        match envelope.event.as_str() {
            "status" => serde_json::from_value(envelope.data.clone())
                .map(ServerEvent::Status)
                .map_err(payload_error),
            "alert" => serde_json::from_value(envelope.data.clone())
                .map(ServerEvent::Alert)
                .map_err(payload_error),
            _ => Ok(ServerEvent::Other(envelope.event.clone())),
        }
    }
}

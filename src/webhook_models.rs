use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Gateway webhook envelope: an event name plus an event-shaped payload.
///
/// Only `charge.completed` carries data this service acts on; the envelope
/// keeps the payload raw so every other event type deserializes cleanly and
/// can be acknowledged without inspection.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WebhookPayload {
    pub event: String,
    pub data: Value,
}

/// Charge data carried by a `charge.completed` event.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChargeData {
    /// The gateway's own transaction id.
    #[serde(default)]
    pub id: Option<i64>,

    /// The merchant-side reference this charge settles.
    #[serde(default)]
    pub tx_ref: Option<String>,

    #[serde(default)]
    pub status: Option<String>,

    #[serde(default)]
    pub amount: Option<f64>,

    #[serde(default)]
    pub currency: Option<String>,

    #[serde(default)]
    pub payment_type: Option<String>,

    #[serde(default)]
    pub charged_amount: Option<f64>,

    #[serde(default)]
    pub processor_response: Option<String>,

    /// Raw data for any additional fields.
    #[serde(flatten)]
    pub raw: Value,
}

/// Response sent back to the gateway.
#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    pub status: String,
    /// Whether the charge matched a stored transaction reference. Absent
    /// for ignored event types.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched: Option<bool>,
}

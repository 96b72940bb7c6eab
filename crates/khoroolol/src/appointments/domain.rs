use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Appointment lifecycle. Confirmation has no endpoint yet; sellers can
/// only cancel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Cancelled,
}

/// A buyer's viewing request for one property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: String,
    pub property_id: String,
    pub seller_id: String,
    pub buyer_id: String,
    pub scheduled_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub status: AppointmentStatus,
    pub created_at: DateTime<Utc>,
}

/// Payload a buyer submits; the seller is derived from the property.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentRequest {
    pub property_id: String,
    pub scheduled_at: DateTime<Utc>,
    #[serde(default)]
    pub message: Option<String>,
}

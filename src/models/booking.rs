use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::status::{BookingStatus, RequestStatus};

/// The link entity created when a trip is assigned to service a customer
/// request. Its status drives the linked request's status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub trip_id: Uuid,
    pub request_id: Uuid,
    pub user_id: Uuid,
    pub status: BookingStatus,
    pub booked_at: DateTime<Utc>,
    pub note: Option<String>,
}

/// Broadcast to live subscribers whenever a booking is created or its status
/// changes. `request_status` is the linked request's status after the change.
#[derive(Debug, Clone, Serialize)]
pub struct BookingEvent {
    pub booking: Booking,
    pub request_status: RequestStatus,
}

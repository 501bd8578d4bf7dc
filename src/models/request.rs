use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::trip::Place;
use crate::status::RequestStatus;

/// Shipment details supplied by the customer. Opaque to matching and
/// lifecycle logic; carried through for the driver's benefit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageInfo {
    pub weight_kg: f64,
    pub dimensions: Option<String>,
    pub description: Option<String>,
}

/// A customer's shipment request. Soft lifecycle only: the status field
/// moves, the document never goes away.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerRequest {
    pub id: Uuid,
    pub user_id: Uuid,
    pub pickup: Place,
    pub dropoff: Place,
    pub package: PackageInfo,
    pub requested_pickup_at: Option<DateTime<Utc>>,
    pub status: RequestStatus,
    /// Set when a booking links this request to a trip; cleared on cancel.
    pub matched_trip: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

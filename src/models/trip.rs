use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::status::TripStatus;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    /// Coordinate bounds check; every point persisted on a trip or request
    /// must pass this first.
    pub fn in_bounds(&self) -> bool {
        (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lng)
    }
}

/// A named location: human-readable address plus the coordinate used for
/// spatial queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Place {
    pub address: String,
    pub point: GeoPoint,
}

/// A driver-published route. Never deleted; past trips stay as historical
/// record and transition to `completed`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trip {
    pub id: Uuid,
    pub driver_id: Uuid,
    pub origin: Place,
    pub destination: Place,
    /// Ordered path of at least two points, indexed by the GeoIndex.
    pub route: Vec<GeoPoint>,
    pub distance_m: f64,
    pub duration_s: u32,
    pub trip_date: NaiveDate,
    pub status: TripStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

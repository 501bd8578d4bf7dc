use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::geo::GeoIndex;
use crate::models::booking::{Booking, BookingEvent};
use crate::models::request::CustomerRequest;
use crate::models::trip::Trip;
use crate::observability::metrics::Metrics;

pub struct AppState {
    pub trips: DashMap<Uuid, Trip>,
    pub requests: DashMap<Uuid, CustomerRequest>,
    pub bookings: DashMap<Uuid, Booking>,
    /// Request id -> id of its active (non-cancelled) booking. The entry
    /// occupancy is the uniqueness constraint: at most one live booking per
    /// request, enforced at insert time.
    pub request_bookings: DashMap<Uuid, Uuid>,
    pub geo: GeoIndex,
    pub booking_events_tx: broadcast::Sender<BookingEvent>,
    pub metrics: Metrics,
    pub default_radius_m: f64,
    pub match_deadline: Duration,
}

impl AppState {
    pub fn new(event_buffer_size: usize, default_radius_m: f64, match_deadline: Duration) -> Self {
        let (booking_events_tx, _unused_rx) = broadcast::channel(event_buffer_size);

        Self {
            trips: DashMap::new(),
            requests: DashMap::new(),
            bookings: DashMap::new(),
            request_bookings: DashMap::new(),
            geo: GeoIndex::new(),
            booking_events_tx,
            metrics: Metrics::new(),
            default_radius_m,
            match_deadline,
        }
    }
}

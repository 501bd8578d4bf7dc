use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::{get, patch, post};
use axum::Json;
use axum::Router;
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::engine::matching::{run_match, MatchQuery, MatchResult};
use crate::error::AppError;
use crate::geo::{route_contains_point, validate_route};
use crate::models::trip::{GeoPoint, Place, Trip};
use crate::state::AppState;
use crate::status::{self, TripStatus};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/trips", post(create_trip).get(list_trips))
        .route("/trips/search", get(search_trips))
        .route("/trips/:id", get(get_trip))
        .route("/trips/:id/status", patch(update_trip_status))
}

/// How far a declared origin/destination may sit from the route geometry.
const ENDPOINT_TOLERANCE_M: f64 = 1_000.0;

#[derive(Deserialize)]
pub struct CreateTripRequest {
    pub driver_id: Uuid,
    pub origin: Place,
    pub destination: Place,
    pub route: Vec<GeoPoint>,
    pub distance_m: f64,
    pub duration_s: u32,
    pub trip_date: NaiveDate,
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

/// Query params for one- or two-sided trip search. A side is queried only
/// when both of its coordinates are present.
#[derive(Deserialize)]
pub struct SearchParams {
    pub pickup_lat: Option<f64>,
    pub pickup_lng: Option<f64>,
    pub dropoff_lat: Option<f64>,
    pub dropoff_lng: Option<f64>,
    pub radius_m: Option<f64>,
    pub trip_date: Option<NaiveDate>,
    pub status: Option<String>,
}

async fn create_trip(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateTripRequest>,
) -> Result<Json<Trip>, AppError> {
    validate_route(&payload.route)?;
    for (name, place) in [("origin", &payload.origin), ("destination", &payload.destination)] {
        if !place.point.in_bounds() {
            return Err(AppError::InvalidArgument(format!(
                "{name} coordinates out of range: lat={}, lng={}",
                place.point.lat, place.point.lng
            )));
        }
        if !route_contains_point(&payload.route, &place.point, ENDPOINT_TOLERANCE_M)? {
            return Err(AppError::InvalidGeometry(format!(
                "{name} does not lie on the trip route"
            )));
        }
    }

    let now = Utc::now();
    let trip = Trip {
        id: Uuid::new_v4(),
        driver_id: payload.driver_id,
        origin: payload.origin,
        destination: payload.destination,
        route: payload.route.clone(),
        distance_m: payload.distance_m,
        duration_s: payload.duration_s,
        trip_date: payload.trip_date,
        status: TripStatus::Scheduled,
        created_at: now,
        updated_at: now,
    };

    state.geo.insert_route(trip.id, payload.route)?;
    state.trips.insert(trip.id, trip.clone());
    state.metrics.indexed_routes.set(state.geo.len() as i64);

    Ok(Json(trip))
}

async fn get_trip(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Trip>, AppError> {
    let trip = state
        .trips
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("trip {id} not found")))?;

    Ok(Json(trip.value().clone()))
}

async fn list_trips(State(state): State<Arc<AppState>>) -> Json<Vec<Trip>> {
    let trips = state.trips.iter().map(|entry| entry.value().clone()).collect();
    Json(trips)
}

async fn update_trip_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<Json<Trip>, AppError> {
    let new_status = status::parse_trip_status(&payload.status)?;

    let mut trip = state
        .trips
        .get_mut(&id)
        .ok_or_else(|| AppError::NotFound(format!("trip {id} not found")))?;

    if !status::trip_transition_allowed(trip.status, new_status) {
        return Err(AppError::Conflict(format!(
            "trip cannot move from {} to {}",
            trip.status.as_str(),
            new_status.as_str()
        )));
    }

    trip.status = new_status;
    trip.updated_at = Utc::now();

    Ok(Json(trip.clone()))
}

async fn search_trips(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Result<Json<MatchResult>, AppError> {
    let side = |lat: Option<f64>, lng: Option<f64>, name: &str| match (lat, lng) {
        (Some(lat), Some(lng)) => Ok(Some(GeoPoint { lat, lng })),
        (None, None) => Ok(None),
        _ => Err(AppError::InvalidArgument(format!(
            "{name} needs both lat and lng"
        ))),
    };

    let status = params
        .status
        .as_deref()
        .map(status::parse_trip_status)
        .transpose()?;

    let query = MatchQuery {
        pickup: side(params.pickup_lat, params.pickup_lng, "pickup")?,
        dropoff: side(params.dropoff_lat, params.dropoff_lng, "dropoff")?,
        radius_m: params.radius_m.unwrap_or(state.default_radius_m),
        trip_date: params.trip_date,
        status,
    };

    let result = run_match(state, query).await?;
    Ok(Json(result))
}

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::engine::matching::{run_match_for_request, MatchResult};
use crate::error::AppError;
use crate::models::request::{CustomerRequest, PackageInfo};
use crate::models::trip::Place;
use crate::state::AppState;
use crate::status::{self, RequestStatus};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/requests", post(create_request).get(list_requests))
        .route("/requests/:id", get(get_request))
        .route("/requests/:id/matches", get(get_matches))
}

#[derive(Deserialize)]
pub struct CreateRequestRequest {
    pub user_id: Uuid,
    pub pickup: Place,
    pub dropoff: Place,
    pub package: PackageInfo,
    pub requested_pickup_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
pub struct MatchParams {
    pub radius_m: Option<f64>,
    pub trip_date: Option<NaiveDate>,
    pub status: Option<String>,
}

async fn create_request(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateRequestRequest>,
) -> Result<Json<CustomerRequest>, AppError> {
    for (side, place) in [("pickup", &payload.pickup), ("dropoff", &payload.dropoff)] {
        if !place.point.in_bounds() {
            return Err(AppError::InvalidArgument(format!(
                "{side} coordinates out of range: lat={}, lng={}",
                place.point.lat, place.point.lng
            )));
        }
    }

    let now = Utc::now();
    let request = CustomerRequest {
        id: Uuid::new_v4(),
        user_id: payload.user_id,
        pickup: payload.pickup,
        dropoff: payload.dropoff,
        package: payload.package,
        requested_pickup_at: payload.requested_pickup_at,
        status: RequestStatus::Open,
        matched_trip: None,
        created_at: now,
        updated_at: now,
    };

    state.requests.insert(request.id, request.clone());
    Ok(Json(request))
}

async fn get_request(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<CustomerRequest>, AppError> {
    let request = state
        .requests
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("request {id} not found")))?;

    Ok(Json(request.value().clone()))
}

async fn list_requests(State(state): State<Arc<AppState>>) -> Json<Vec<CustomerRequest>> {
    let requests = state
        .requests
        .iter()
        .map(|entry| entry.value().clone())
        .collect();
    Json(requests)
}

/// Match candidate trips against a stored request's pickup and dropoff.
async fn get_matches(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Query(params): Query<MatchParams>,
) -> Result<Json<MatchResult>, AppError> {
    let radius_m = params.radius_m.unwrap_or(state.default_radius_m);
    let trip_status = params
        .status
        .as_deref()
        .map(status::parse_trip_status)
        .transpose()?;

    let result = run_match_for_request(state, id, radius_m, params.trip_date, trip_status).await?;
    Ok(Json(result))
}

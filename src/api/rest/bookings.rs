use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, patch, post};
use axum::Json;
use axum::Router;
use serde::Deserialize;
use uuid::Uuid;

use crate::engine::lifecycle;
use crate::error::AppError;
use crate::models::booking::Booking;
use crate::state::AppState;
use crate::status;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/bookings", post(create_booking).get(list_bookings))
        .route("/bookings/:id", get(get_booking))
        .route("/bookings/:id/status", patch(update_booking_status))
}

#[derive(Deserialize)]
pub struct CreateBookingRequest {
    pub trip_id: Uuid,
    pub request_id: Uuid,
    pub user_id: Uuid,
    pub note: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

async fn create_booking(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateBookingRequest>,
) -> Result<Json<Booking>, AppError> {
    let booking = lifecycle::create_booking(
        &state,
        payload.trip_id,
        payload.request_id,
        payload.user_id,
        payload.note,
    )?;

    Ok(Json(booking))
}

async fn get_booking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Booking>, AppError> {
    let booking = state
        .bookings
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("booking {id} not found")))?;

    Ok(Json(booking.value().clone()))
}

async fn list_bookings(State(state): State<Arc<AppState>>) -> Json<Vec<Booking>> {
    let bookings = state
        .bookings
        .iter()
        .map(|entry| entry.value().clone())
        .collect();
    Json(bookings)
}

async fn update_booking_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<Json<Booking>, AppError> {
    let new_status = status::parse_booking_status(&payload.status)?;
    let booking = lifecycle::update_booking_status(&state, id, new_status)?;

    Ok(Json(booking))
}

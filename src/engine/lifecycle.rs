use chrono::Utc;
use dashmap::mapref::entry::Entry;
use tracing::info;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::booking::{Booking, BookingEvent};
use crate::state::AppState;
use crate::status::{self, BookingStatus, RequestStatus};

/// Create a booking linking `trip_id` to `request_id` and flip the request
/// to `pending`.
///
/// Uniqueness is enforced by the reservation entry in
/// `state.request_bookings`: the vacant-entry insert is the atomic
/// check-and-set, so two concurrent calls for the same request cannot both
/// succeed. Any failure after the reservation rolls the whole operation
/// back.
pub fn create_booking(
    state: &AppState,
    trip_id: Uuid,
    request_id: Uuid,
    user_id: Uuid,
    note: Option<String>,
) -> Result<Booking, AppError> {
    if !state.trips.contains_key(&trip_id) {
        return Err(AppError::NotFound(format!("trip {trip_id} not found")));
    }
    if !state.requests.contains_key(&request_id) {
        return Err(AppError::NotFound(format!("request {request_id} not found")));
    }

    let booking_id = Uuid::new_v4();
    match state.request_bookings.entry(request_id) {
        Entry::Occupied(_) => {
            return Err(AppError::Conflict(format!(
                "request {request_id} already has an active booking"
            )));
        }
        Entry::Vacant(slot) => {
            slot.insert(booking_id);
        }
    }

    let flipped = match state.requests.get_mut(&request_id) {
        Some(mut request) => {
            request.status = RequestStatus::Pending;
            request.matched_trip = Some(trip_id);
            request.updated_at = Utc::now();
            true
        }
        None => false,
    };
    if !flipped {
        state.request_bookings.remove(&request_id);
        return Err(AppError::NotFound(format!("request {request_id} not found")));
    }

    let booking = Booking {
        id: booking_id,
        trip_id,
        request_id,
        user_id,
        status: BookingStatus::Pending,
        booked_at: Utc::now(),
        note,
    };
    state.bookings.insert(booking_id, booking.clone());

    state
        .metrics
        .bookings_total
        .with_label_values(&[booking.status.as_str()])
        .inc();
    let _ = state.booking_events_tx.send(BookingEvent {
        booking: booking.clone(),
        request_status: RequestStatus::Pending,
    });

    info!(
        booking_id = %booking_id,
        trip_id = %trip_id,
        request_id = %request_id,
        "booking created"
    );

    Ok(booking)
}

/// Apply a status change to a booking and cascade it to the linked request
/// per the synchronization table.
///
/// The per-request reservation entry is held for the duration of the write,
/// serializing against concurrent `create_booking` calls for the same
/// request; booking and request fields change inside that window, never one
/// without the other. Re-applying the current status is a no-op, which keeps
/// caller retries safe.
pub fn update_booking_status(
    state: &AppState,
    booking_id: Uuid,
    new_status: BookingStatus,
) -> Result<Booking, AppError> {
    let request_id = state
        .bookings
        .get(&booking_id)
        .ok_or_else(|| AppError::NotFound(format!("booking {booking_id} not found")))?
        .request_id;

    let reservation = state.request_bookings.entry(request_id);

    let updated = {
        let mut booking = state
            .bookings
            .get_mut(&booking_id)
            .ok_or_else(|| AppError::NotFound(format!("booking {booking_id} not found")))?;

        // Retried update carrying the status the booking already has. Return
        // without touching anything: after a cancel the request may have been
        // rebooked, and cascading again would overwrite the live booking's
        // request state.
        if booking.status == new_status {
            return Ok(booking.clone());
        }

        if !status::booking_transition_allowed(booking.status, new_status) {
            return Err(AppError::Conflict(format!(
                "booking cannot move from {} to {}",
                booking.status.as_str(),
                new_status.as_str()
            )));
        }

        booking.status = new_status;
        booking.clone()
    };

    let request_status = {
        let mut request = state.requests.get_mut(&request_id).ok_or_else(|| {
            AppError::Internal(format!(
                "request {request_id} missing for booking {booking_id}"
            ))
        })?;

        if let Some(mapped) = status::request_status_for(new_status) {
            request.status = mapped;
            request.updated_at = Utc::now();
            if new_status == BookingStatus::Cancelled {
                request.matched_trip = None;
            }
        }
        request.status
    };

    if new_status == BookingStatus::Cancelled {
        // Release the reservation so the request can be booked again.
        if let Entry::Occupied(slot) = reservation {
            if *slot.get() == booking_id {
                slot.remove();
            }
        }
    } else {
        drop(reservation);
    }

    state
        .metrics
        .bookings_total
        .with_label_values(&[new_status.as_str()])
        .inc();
    let _ = state.booking_events_tx.send(BookingEvent {
        booking: updated.clone(),
        request_status,
    });

    info!(
        booking_id = %booking_id,
        request_id = %request_id,
        status = new_status.as_str(),
        request_status = request_status.as_str(),
        "booking status updated"
    );

    Ok(updated)
}

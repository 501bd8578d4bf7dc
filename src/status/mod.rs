//! Single source of truth for status vocabularies and legal transitions.
//!
//! All three entity status sets live here, together with the fixed
//! booking-status to request-status synchronization table. Lifecycle code
//! consults this module instead of carrying its own status constants.

use serde::{Deserialize, Serialize};

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TripStatus {
    Scheduled,
    Started,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Open,
    Pending,
    Active,
    Matched,
    PickedUp,
    Delivered,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BookingStatus {
    Pending,
    Active,
    PickedUp,
    Delivered,
    Confirmed,
    Cancelled,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Trip,
    Request,
    Booking,
}

impl TripStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TripStatus::Scheduled => "scheduled",
            TripStatus::Started => "started",
            TripStatus::Completed => "completed",
        }
    }

    fn rank(&self) -> u8 {
        match self {
            TripStatus::Scheduled => 0,
            TripStatus::Started => 1,
            TripStatus::Completed => 2,
        }
    }
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Open => "open",
            RequestStatus::Pending => "pending",
            RequestStatus::Active => "active",
            RequestStatus::Matched => "matched",
            RequestStatus::PickedUp => "picked_up",
            RequestStatus::Delivered => "delivered",
            RequestStatus::Cancelled => "cancelled",
        }
    }
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Active => "active",
            BookingStatus::PickedUp => "pickedUp",
            BookingStatus::Delivered => "delivered",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Completed => "completed",
        }
    }

    fn rank(&self) -> u8 {
        match self {
            BookingStatus::Pending => 0,
            BookingStatus::Active => 1,
            BookingStatus::PickedUp => 2,
            BookingStatus::Delivered => 3,
            BookingStatus::Confirmed => 4,
            BookingStatus::Completed => 5,
            // Terminal; never ranked against forward states.
            BookingStatus::Cancelled => u8::MAX,
        }
    }
}

pub fn parse_trip_status(id: &str) -> Result<TripStatus, AppError> {
    match id {
        "scheduled" => Ok(TripStatus::Scheduled),
        "started" => Ok(TripStatus::Started),
        "completed" => Ok(TripStatus::Completed),
        other => Err(AppError::UnknownStatus(format!(
            "'{other}' is not a trip status"
        ))),
    }
}

pub fn parse_request_status(id: &str) -> Result<RequestStatus, AppError> {
    match id {
        "open" => Ok(RequestStatus::Open),
        "pending" => Ok(RequestStatus::Pending),
        "active" => Ok(RequestStatus::Active),
        "matched" => Ok(RequestStatus::Matched),
        "picked_up" => Ok(RequestStatus::PickedUp),
        "delivered" => Ok(RequestStatus::Delivered),
        "cancelled" => Ok(RequestStatus::Cancelled),
        other => Err(AppError::UnknownStatus(format!(
            "'{other}' is not a request status"
        ))),
    }
}

pub fn parse_booking_status(id: &str) -> Result<BookingStatus, AppError> {
    match id {
        "pending" => Ok(BookingStatus::Pending),
        "active" => Ok(BookingStatus::Active),
        "pickedUp" => Ok(BookingStatus::PickedUp),
        "delivered" => Ok(BookingStatus::Delivered),
        "confirmed" => Ok(BookingStatus::Confirmed),
        "cancelled" => Ok(BookingStatus::Cancelled),
        "completed" => Ok(BookingStatus::Completed),
        other => Err(AppError::UnknownStatus(format!(
            "'{other}' is not a booking status"
        ))),
    }
}

pub fn is_valid_status(kind: EntityKind, id: &str) -> bool {
    match kind {
        EntityKind::Trip => parse_trip_status(id).is_ok(),
        EntityKind::Request => parse_request_status(id).is_ok(),
        EntityKind::Booking => parse_booking_status(id).is_ok(),
    }
}

/// The synchronization table: the request status implied by a booking
/// status, or `None` when the booking status carries no request-side effect
/// (`pending`, `confirmed`, `completed`).
pub fn request_status_for(status: BookingStatus) -> Option<RequestStatus> {
    match status {
        BookingStatus::Active => Some(RequestStatus::Active),
        BookingStatus::PickedUp => Some(RequestStatus::PickedUp),
        BookingStatus::Delivered => Some(RequestStatus::Delivered),
        BookingStatus::Cancelled => Some(RequestStatus::Cancelled),
        BookingStatus::Pending | BookingStatus::Confirmed | BookingStatus::Completed => None,
    }
}

/// Bookings only move forward or to `cancelled`. Re-applying the current
/// status is a legal no-op so retried updates stay idempotent.
pub fn booking_transition_allowed(from: BookingStatus, to: BookingStatus) -> bool {
    if from == to {
        return true;
    }
    if from == BookingStatus::Cancelled {
        return false;
    }
    to == BookingStatus::Cancelled || to.rank() > from.rank()
}

/// Trips move strictly forward: scheduled, started, completed.
pub fn trip_transition_allowed(from: TripStatus, to: TripStatus) -> bool {
    from == to || to.rank() > from.rank()
}

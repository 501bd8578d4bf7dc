use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use chrono::NaiveDate;
use serde::Serialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::trip::GeoPoint;
use crate::state::AppState;
use crate::status::TripStatus;

/// Typed match query. At least one of `pickup`/`dropoff` must be set; the
/// one-sided form backs generic trip search, the two-sided form backs full
/// request matching.
#[derive(Debug, Clone)]
pub struct MatchQuery {
    pub pickup: Option<GeoPoint>,
    pub dropoff: Option<GeoPoint>,
    pub radius_m: f64,
    pub trip_date: Option<NaiveDate>,
    pub status: Option<TripStatus>,
}

/// Disjoint partition of the trips near a query's endpoints. `both` holds
/// trips near pickup and dropoff; the union of the three sets equals the
/// union of the two raw proximity sets.
#[derive(Debug, Clone, Serialize)]
pub struct MatchResult {
    pub both: Vec<Uuid>,
    pub only_pickup: Vec<Uuid>,
    pub only_dropoff: Vec<Uuid>,
}

/// Find trips able to service a query.
///
/// Match results are advisory: they may race with concurrent bookings, and a
/// returned trip can become unavailable a moment later. Proximity is
/// direction-agnostic; a trip whose route visits the dropoff before the
/// pickup still lands in `both`.
pub fn find_matches(state: &AppState, query: &MatchQuery) -> Result<MatchResult, AppError> {
    if query.radius_m <= 0.0 {
        return Err(AppError::InvalidArgument(format!(
            "radius must be positive, got {}",
            query.radius_m
        )));
    }
    if query.pickup.is_none() && query.dropoff.is_none() {
        return Err(AppError::InvalidArgument(
            "at least one of pickup or dropoff is required".to_string(),
        ));
    }
    for (side, point) in [("pickup", &query.pickup), ("dropoff", &query.dropoff)] {
        if let Some(point) = point {
            if !point.in_bounds() {
                return Err(AppError::InvalidArgument(format!(
                    "{side} coordinates out of range: lat={}, lng={}",
                    point.lat, point.lng
                )));
            }
        }
    }

    // Date/status predicate narrows the candidate ids; the index answers the
    // geometry side.
    let candidates: Option<HashSet<Uuid>> =
        if query.trip_date.is_some() || query.status.is_some() {
            Some(
                state
                    .trips
                    .iter()
                    .filter(|entry| {
                        let trip = entry.value();
                        query.trip_date.is_none_or(|date| trip.trip_date == date)
                            && query.status.is_none_or(|status| trip.status == status)
                    })
                    .map(|entry| *entry.key())
                    .collect(),
            )
        } else {
            None
        };

    let near = |point: &Option<GeoPoint>| -> Result<HashSet<Uuid>, AppError> {
        match point {
            Some(point) => {
                let hits = state.geo.routes_near(point, query.radius_m)?;
                Ok(hits
                    .into_iter()
                    .filter(|id| candidates.as_ref().is_none_or(|ids| ids.contains(id)))
                    .collect())
            }
            // Side not requested; distinct from "no trips near it".
            None => Ok(HashSet::new()),
        }
    };

    let pickup_set = near(&query.pickup)?;
    let dropoff_set = near(&query.dropoff)?;

    let both: Vec<Uuid> = pickup_set.intersection(&dropoff_set).copied().collect();
    let only_pickup: Vec<Uuid> = pickup_set.difference(&dropoff_set).copied().collect();
    let only_dropoff: Vec<Uuid> = dropoff_set.difference(&pickup_set).copied().collect();

    Ok(MatchResult {
        both,
        only_pickup,
        only_dropoff,
    })
}

/// Full two-sided matching for a stored customer request.
pub fn find_matches_for_request(
    state: &AppState,
    request_id: Uuid,
    radius_m: f64,
    trip_date: Option<NaiveDate>,
    status: Option<TripStatus>,
) -> Result<MatchResult, AppError> {
    let (pickup, dropoff) = {
        let request = state
            .requests
            .get(&request_id)
            .ok_or_else(|| AppError::NotFound(format!("request {request_id} not found")))?;
        (request.pickup.point, request.dropoff.point)
    };

    let query = MatchQuery {
        pickup: Some(pickup),
        dropoff: Some(dropoff),
        radius_m,
        trip_date,
        status,
    };

    find_matches(state, &query)
}

/// Run a match query under the configured deadline. Queries are read-only,
/// so expiry aborts cleanly with no partial state.
pub async fn run_match(state: Arc<AppState>, query: MatchQuery) -> Result<MatchResult, AppError> {
    run_with_deadline(state, move |state| find_matches(state, &query)).await
}

/// Deadline-wrapped matching for a stored customer request.
pub async fn run_match_for_request(
    state: Arc<AppState>,
    request_id: Uuid,
    radius_m: f64,
    trip_date: Option<NaiveDate>,
    status: Option<TripStatus>,
) -> Result<MatchResult, AppError> {
    run_with_deadline(state, move |state| {
        find_matches_for_request(state, request_id, radius_m, trip_date, status)
    })
    .await
}

/// Shared wrapper for every match entry point: runs the scan on a blocking
/// task under the configured deadline and records outcome and latency.
async fn run_with_deadline<F>(state: Arc<AppState>, op: F) -> Result<MatchResult, AppError>
where
    F: FnOnce(&AppState) -> Result<MatchResult, AppError> + Send + 'static,
{
    let started = Instant::now();
    let deadline = state.match_deadline;
    let worker_state = state.clone();
    let worker = tokio::task::spawn_blocking(move || op(&worker_state));

    let result = tokio::time::timeout(deadline, worker)
        .await
        .map_err(|_| AppError::Timeout("match query deadline exceeded".to_string()))
        .and_then(|joined| {
            joined.map_err(|err| AppError::Internal(format!("match task failed: {err}")))
        })
        .and_then(|inner| inner);

    let outcome = if result.is_ok() { "success" } else { "error" };
    state
        .metrics
        .match_latency_seconds
        .with_label_values(&[outcome])
        .observe(started.elapsed().as_secs_f64());
    state
        .metrics
        .matches_total
        .with_label_values(&[outcome])
        .inc();

    result
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::{NaiveDate, Utc};
    use uuid::Uuid;

    use super::{find_matches, find_matches_for_request, MatchQuery};
    use crate::error::AppError;
    use crate::models::request::{CustomerRequest, PackageInfo};
    use crate::models::trip::{GeoPoint, Place, Trip};
    use crate::state::AppState;
    use crate::status::{RequestStatus, TripStatus};

    fn p(lat: f64, lng: f64) -> GeoPoint {
        GeoPoint { lat, lng }
    }

    fn state() -> AppState {
        AppState::new(16, 1000.0, Duration::from_secs(2))
    }

    fn add_trip(state: &AppState, id_seed: u128, route: Vec<GeoPoint>, date: &str) -> Uuid {
        let id = Uuid::from_u128(id_seed);
        let trip = Trip {
            id,
            driver_id: Uuid::from_u128(id_seed + 1000),
            origin: Place {
                address: "origin".to_string(),
                point: route[0],
            },
            destination: Place {
                address: "destination".to_string(),
                point: *route.last().unwrap(),
            },
            route: route.clone(),
            distance_m: 150_000.0,
            duration_s: 10_800,
            trip_date: date.parse().unwrap(),
            status: TripStatus::Scheduled,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        state.trips.insert(id, trip);
        state.geo.insert_route(id, route).unwrap();
        id
    }

    fn add_request(state: &AppState, pickup: GeoPoint, dropoff: GeoPoint) -> Uuid {
        let id = Uuid::new_v4();
        let request = CustomerRequest {
            id,
            user_id: Uuid::new_v4(),
            pickup: Place {
                address: "pickup".to_string(),
                point: pickup,
            },
            dropoff: Place {
                address: "dropoff".to_string(),
                point: dropoff,
            },
            package: PackageInfo {
                weight_kg: 12.5,
                dimensions: None,
                description: None,
            },
            requested_pickup_at: None,
            status: RequestStatus::Open,
            matched_trip: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        state.requests.insert(id, request);
        id
    }

    // Route passing through Coimbatore-area pickup and Kochi-area dropoff.
    fn through_route() -> Vec<GeoPoint> {
        vec![p(11.25, 76.95), p(10.60, 76.60), p(9.93, 76.30)]
    }

    #[test]
    fn trip_near_both_endpoints_lands_in_both() {
        let state = state();
        let trip = add_trip(&state, 1, through_route(), "2026-09-01");
        let request = add_request(&state, p(11.25, 76.95), p(9.93, 76.30));

        let result = find_matches_for_request(&state, request, 1_000.0, None, None).unwrap();

        assert_eq!(result.both, vec![trip]);
        assert!(result.only_pickup.is_empty());
        assert!(result.only_dropoff.is_empty());
    }

    #[test]
    fn partition_is_disjoint_and_covers_raw_sets() {
        let state = state();
        // near both endpoints
        let both = add_trip(&state, 1, through_route(), "2026-09-01");
        // near pickup only
        let pickup_only = add_trip(&state, 2, vec![p(11.25, 76.95), p(12.00, 77.50)], "2026-09-01");
        // near dropoff only
        let dropoff_only = add_trip(&state, 3, vec![p(9.93, 76.30), p(9.00, 76.00)], "2026-09-01");
        // near neither
        add_trip(&state, 4, vec![p(28.6, 77.2), p(27.2, 78.0)], "2026-09-01");

        let query = MatchQuery {
            pickup: Some(p(11.25, 76.95)),
            dropoff: Some(p(9.93, 76.30)),
            radius_m: 1_000.0,
            trip_date: None,
            status: None,
        };
        let result = find_matches(&state, &query).unwrap();

        assert_eq!(result.both, vec![both]);
        assert_eq!(result.only_pickup, vec![pickup_only]);
        assert_eq!(result.only_dropoff, vec![dropoff_only]);

        for id in &result.both {
            assert!(!result.only_pickup.contains(id));
            assert!(!result.only_dropoff.contains(id));
        }
    }

    #[test]
    fn date_and_status_filters_narrow_the_pool() {
        let state = state();
        let matching_date = add_trip(&state, 1, through_route(), "2026-09-01");
        let other_date = add_trip(&state, 2, through_route(), "2026-09-02");

        let query = MatchQuery {
            pickup: Some(p(11.25, 76.95)),
            dropoff: Some(p(9.93, 76.30)),
            radius_m: 1_000.0,
            trip_date: Some(NaiveDate::parse_from_str("2026-09-01", "%Y-%m-%d").unwrap()),
            status: None,
        };
        let result = find_matches(&state, &query).unwrap();
        assert_eq!(result.both, vec![matching_date]);
        assert!(!result.both.contains(&other_date));

        let query = MatchQuery {
            status: Some(TripStatus::Completed),
            trip_date: None,
            ..query
        };
        let result = find_matches(&state, &query).unwrap();
        assert!(result.both.is_empty());
    }

    #[test]
    fn matching_answers_from_the_spatial_index() {
        let state = state();
        let indexed = add_trip(&state, 1, through_route(), "2026-09-01");

        // same metadata and geometry, but the route never reached the index
        let unindexed = Uuid::from_u128(9);
        let mut stray = state.trips.get(&indexed).unwrap().value().clone();
        stray.id = unindexed;
        state.trips.insert(unindexed, stray);

        let query = MatchQuery {
            pickup: Some(p(11.25, 76.95)),
            dropoff: Some(p(9.93, 76.30)),
            radius_m: 1_000.0,
            trip_date: None,
            status: None,
        };
        let result = find_matches(&state, &query).unwrap();

        assert_eq!(result.both, vec![indexed]);
        assert!(!result.only_pickup.contains(&unindexed));
        assert!(!result.only_dropoff.contains(&unindexed));
    }

    #[test]
    fn one_sided_query_leaves_missing_side_empty() {
        let state = state();
        let trip = add_trip(&state, 1, through_route(), "2026-09-01");

        let query = MatchQuery {
            pickup: Some(p(11.25, 76.95)),
            dropoff: None,
            radius_m: 1_000.0,
            trip_date: None,
            status: None,
        };
        let result = find_matches(&state, &query).unwrap();

        assert_eq!(result.only_pickup, vec![trip]);
        assert!(result.both.is_empty());
        assert!(result.only_dropoff.is_empty());
    }

    #[test]
    fn non_positive_radius_is_rejected() {
        let state = state();
        let query = MatchQuery {
            pickup: Some(p(11.25, 76.95)),
            dropoff: Some(p(9.93, 76.30)),
            radius_m: 0.0,
            trip_date: None,
            status: None,
        };
        assert!(matches!(
            find_matches(&state, &query),
            Err(AppError::InvalidArgument(_))
        ));
    }

    #[test]
    fn out_of_range_pickup_fails_before_any_query() {
        let state = state();
        add_trip(&state, 1, through_route(), "2026-09-01");

        let query = MatchQuery {
            pickup: Some(p(200.0, 76.95)),
            dropoff: Some(p(9.93, 76.30)),
            radius_m: 1_000.0,
            trip_date: None,
            status: None,
        };
        assert!(matches!(
            find_matches(&state, &query),
            Err(AppError::InvalidArgument(_))
        ));
    }

    #[test]
    fn missing_request_is_not_found() {
        let state = state();
        assert!(matches!(
            find_matches_for_request(&state, Uuid::new_v4(), 1_000.0, None, None),
            Err(AppError::NotFound(_))
        ));
    }
}

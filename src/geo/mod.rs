use dashmap::DashMap;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::trip::GeoPoint;

const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle distance in meters. Haversine is within 0.5% of true
/// distance well past the 500 km we care about for route filtering.
pub fn haversine_m(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let delta_lat = (b.lat - a.lat).to_radians();
    let delta_lng = (b.lng - a.lng).to_radians();

    let sin_lat = (delta_lat / 2.0).sin();
    let sin_lng = (delta_lng / 2.0).sin();

    let haversine = sin_lat * sin_lat + lat1.cos() * lat2.cos() * sin_lng * sin_lng;
    let central_angle = 2.0 * haversine.sqrt().asin();

    EARTH_RADIUS_M * central_angle
}

/// Distance in meters from `p` to the segment `a`-`b`, computed in a local
/// equirectangular projection. Good enough at radius-search scales; not a
/// geodesic cross-track solution.
fn point_segment_distance_m(p: &GeoPoint, a: &GeoPoint, b: &GeoPoint) -> f64 {
    let mean_lat = (p.lat.to_radians() + a.lat.to_radians() + b.lat.to_radians()) / 3.0;
    let scale = mean_lat.cos();

    let project = |g: &GeoPoint| -> (f64, f64) {
        (
            g.lng.to_radians() * scale * EARTH_RADIUS_M,
            g.lat.to_radians() * EARTH_RADIUS_M,
        )
    };

    let (px, py) = project(p);
    let (ax, ay) = project(a);
    let (bx, by) = project(b);

    let (dx, dy) = (bx - ax, by - ay);
    let len_sq = dx * dx + dy * dy;

    if len_sq == 0.0 {
        return haversine_m(p, a);
    }

    let t = (((px - ax) * dx + (py - ay) * dy) / len_sq).clamp(0.0, 1.0);

    let (cx, cy) = (ax + t * dx, ay + t * dy);
    ((px - cx).powi(2) + (py - cy).powi(2)).sqrt()
}

/// Minimum distance in meters from `point` to any segment of `route`.
pub fn route_distance_m(route: &[GeoPoint], point: &GeoPoint) -> f64 {
    route
        .windows(2)
        .map(|seg| point_segment_distance_m(point, &seg[0], &seg[1]))
        .fold(f64::INFINITY, f64::min)
}

/// Exact containment check: does `point` lie on `route` within
/// `tolerance_m`?
pub fn route_contains_point(
    route: &[GeoPoint],
    point: &GeoPoint,
    tolerance_m: f64,
) -> Result<bool, AppError> {
    validate_route(route)?;
    validate_point(point)?;
    if tolerance_m <= 0.0 {
        return Err(AppError::InvalidArgument(format!(
            "tolerance must be positive, got {tolerance_m}"
        )));
    }
    Ok(route_distance_m(route, point) <= tolerance_m)
}

pub fn validate_point(point: &GeoPoint) -> Result<(), AppError> {
    if !point.in_bounds() {
        return Err(AppError::InvalidGeometry(format!(
            "coordinates out of range: lat={}, lng={}",
            point.lat, point.lng
        )));
    }
    Ok(())
}

pub fn validate_route(route: &[GeoPoint]) -> Result<(), AppError> {
    if route.len() < 2 {
        return Err(AppError::InvalidGeometry(format!(
            "route needs at least 2 points, got {}",
            route.len()
        )));
    }
    for point in route {
        validate_point(point)?;
    }
    Ok(())
}

/// In-memory spatial index over trip route geometries.
///
/// Result ordering of `routes_near` is unspecified; an empty result is a
/// normal answer, not an error.
pub struct GeoIndex {
    routes: DashMap<Uuid, Vec<GeoPoint>>,
}

impl GeoIndex {
    pub fn new() -> Self {
        Self {
            routes: DashMap::new(),
        }
    }

    pub fn insert_route(&self, trip_id: Uuid, route: Vec<GeoPoint>) -> Result<(), AppError> {
        validate_route(&route)?;
        self.routes.insert(trip_id, route);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Trips whose route passes within `radius_m` of `point`.
    pub fn routes_near(&self, point: &GeoPoint, radius_m: f64) -> Result<Vec<Uuid>, AppError> {
        validate_point(point)?;
        if radius_m <= 0.0 {
            return Err(AppError::InvalidArgument(format!(
                "radius must be positive, got {radius_m}"
            )));
        }

        let hits = self
            .routes
            .iter()
            .filter(|entry| route_distance_m(entry.value(), point) <= radius_m)
            .map(|entry| *entry.key())
            .collect();

        Ok(hits)
    }
}

impl Default for GeoIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(lat: f64, lng: f64) -> GeoPoint {
        GeoPoint { lat, lng }
    }

    #[test]
    fn zero_distance_for_same_point() {
        let point = p(53.5511, 9.9937);
        assert!(haversine_m(&point, &point) < 1e-9);
    }

    #[test]
    fn haversine_is_symmetric() {
        let a = p(11.25, 76.95);
        let b = p(9.93, 76.30);
        assert!((haversine_m(&a, &b) - haversine_m(&b, &a)).abs() < 1e-9);
    }

    #[test]
    fn london_to_paris_is_around_343_km() {
        let london = p(51.5074, -0.1278);
        let paris = p(48.8566, 2.3522);
        let distance = haversine_m(&london, &paris);
        assert!((distance - 343_000.0).abs() < 5_000.0);
    }

    #[test]
    fn point_on_segment_has_near_zero_distance() {
        let route = [p(10.0, 76.0), p(11.0, 77.0)];
        let midpoint = p(10.5, 76.5);
        assert!(route_distance_m(&route, &midpoint) < 200.0);
    }

    #[test]
    fn point_off_route_measures_offset() {
        // ~0.01 deg of latitude is ~1.1 km
        let route = [p(10.0, 76.0), p(10.0, 77.0)];
        let offset = p(10.01, 76.5);
        let d = route_distance_m(&route, &offset);
        assert!((d - 1_112.0).abs() < 60.0, "got {d}");
    }

    #[test]
    fn routes_near_filters_by_radius() {
        let index = GeoIndex::new();
        let near_id = Uuid::from_u128(1);
        let far_id = Uuid::from_u128(2);
        index
            .insert_route(near_id, vec![p(10.0, 76.0), p(10.0, 77.0)])
            .unwrap();
        index
            .insert_route(far_id, vec![p(20.0, 76.0), p(20.0, 77.0)])
            .unwrap();

        let hits = index.routes_near(&p(10.001, 76.5), 500.0).unwrap();
        assert_eq!(hits, vec![near_id]);

        let none = index.routes_near(&p(0.0, 0.0), 1_000.0).unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn invalid_inputs_are_rejected() {
        let index = GeoIndex::new();
        assert!(matches!(
            index.routes_near(&p(200.0, 0.0), 1_000.0),
            Err(AppError::InvalidGeometry(_))
        ));
        assert!(matches!(
            index.routes_near(&p(10.0, 76.0), 0.0),
            Err(AppError::InvalidArgument(_))
        ));
        assert!(matches!(
            index.insert_route(Uuid::from_u128(3), vec![p(10.0, 76.0)]),
            Err(AppError::InvalidGeometry(_))
        ));
    }

    #[test]
    fn containment_respects_tolerance() {
        let route = [p(11.25, 76.95), p(10.60, 76.60), p(9.93, 76.30)];
        let on_route = p(10.60, 76.60);
        let off_route = p(10.80, 76.20);

        assert!(route_contains_point(&route, &on_route, 100.0).unwrap());
        assert!(!route_contains_point(&route, &off_route, 100.0).unwrap());
    }
}

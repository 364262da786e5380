//! Route generators for demo flights.

use flyover_core::spatial::offset_by_bearing;
use flyover_core::{FlightError, GeoPath, LngLat};
use rand::Rng;
use std::f64::consts::PI;

/// Straight route from `from` to `to`, split into `segments` equal legs.
pub fn straight_route(from: LngLat, to: LngLat, segments: usize) -> Result<GeoPath, FlightError> {
    let segments = segments.max(1);
    let points = (0..=segments).map(|i| {
        let t = i as f64 / segments as f64;
        LngLat::new(
            from.lng + (to.lng - from.lng) * t,
            from.lat + (to.lat - from.lat) * t,
        )
    });
    GeoPath::new(points)
}

/// Closed loop of `points` vertices at `radius_m` around `center`, starting
/// due north and running clockwise.
pub fn circular_route(center: LngLat, radius_m: f64, points: usize) -> Result<GeoPath, FlightError> {
    let points = points.max(3);
    let vertices = (0..=points).map(|i| {
        // Close the loop on the exact starting vertex.
        let angle = 2.0 * PI * (i % points) as f64 / points as f64;
        let (lat, lng) = offset_by_bearing(center.lat, center.lng, radius_m, angle);
        LngLat::new(lng, lat)
    });
    GeoPath::new(vertices)
}

/// Random route of `waypoints` points within `radius_deg` of `center`.
pub fn random_route<R: Rng + ?Sized>(
    center: LngLat,
    radius_deg: f64,
    waypoints: usize,
    rng: &mut R,
) -> Result<GeoPath, FlightError> {
    let radius_deg = radius_deg.abs().max(1e-6);
    let points = (0..waypoints.max(2))
        .map(|_| {
            let lng_offset = rng.random_range(-radius_deg..radius_deg);
            let lat_offset = rng.random_range(-radius_deg..radius_deg);
            LngLat::new(
                (center.lng + lng_offset).clamp(-180.0, 180.0),
                (center.lat + lat_offset).clamp(-90.0, 90.0),
            )
        })
        .collect::<Vec<_>>();
    GeoPath::new(points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flyover_core::haversine_distance;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const DONGGUAN: LngLat = LngLat::new(113.8558, 22.9890);

    #[test]
    fn test_straight_route_endpoints() {
        let to = LngLat::new(113.9, 23.0);
        let path = straight_route(DONGGUAN, to, 4).unwrap();

        assert_eq!(path.points().len(), 5);
        assert_eq!(path.first(), DONGGUAN);
        assert_eq!(path.last(), to);
    }

    #[test]
    fn test_circular_route_closes() {
        let path = circular_route(DONGGUAN, 500.0, 12).unwrap();

        assert_eq!(path.points().len(), 13);
        assert_eq!(path.first(), path.last());
        for p in path.points() {
            let dist = haversine_distance(DONGGUAN.lat, DONGGUAN.lng, p.lat, p.lng);
            assert!((dist - 500.0).abs() < 1.0, "vertex {dist}m from center");
        }
        // Roughly the circumference.
        assert!((path.length() - 2.0 * PI * 0.5).abs() < 0.1);
    }

    #[test]
    fn test_random_route_stays_near_center() {
        let mut rng = StdRng::seed_from_u64(7);
        let path = random_route(DONGGUAN, 0.05, 6, &mut rng).unwrap();

        assert_eq!(path.points().len(), 6);
        assert!(path
            .points()
            .iter()
            .all(|p| (p.lng - DONGGUAN.lng).abs() <= 0.05 && (p.lat - DONGGUAN.lat).abs() <= 0.05));
    }
}

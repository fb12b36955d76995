use crate::model::attendance::Coordinates;

/// Earth's radius in meters (for Haversine formula)
const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Calculate Haversine distance between two points in meters
pub fn distance_meters(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lon = (lon2 - lon1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_METERS * c
}

/// Inclusive: a point exactly `radius_meters` away is inside.
pub fn is_within_radius(
    point_lat: f64,
    point_lon: f64,
    center_lat: f64,
    center_lon: f64,
    radius_meters: f64,
) -> bool {
    distance_meters(point_lat, point_lon, center_lat, center_lon) <= radius_meters
}

/// Circular permitted area around the work site.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoFence {
    pub center: Coordinates,
    pub radius_meters: f64,
}

impl GeoFence {
    pub fn new(center: Coordinates, radius_meters: f64) -> Self {
        Self {
            center,
            radius_meters,
        }
    }

    pub fn distance_from_center(&self, point: Coordinates) -> f64 {
        distance_meters(
            point.latitude,
            point.longitude,
            self.center.latitude,
            self.center.longitude,
        )
    }

    pub fn contains(&self, point: Coordinates) -> bool {
        is_within_radius(
            point.latitude,
            point.longitude,
            self.center.latitude,
            self.center.longitude,
            self.radius_meters,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SITE: (f64, f64) = (-5.224747, -80.630393);

    #[test]
    fn test_haversine_distance() {
        // Jakarta to Bandung, approx 116km great-circle
        let jakarta = (-6.2088, 106.8456);
        let bandung = (-6.9175, 107.6191);

        let distance = distance_meters(jakarta.0, jakarta.1, bandung.0, bandung.1);

        assert!(distance > 110_000.0 && distance < 125_000.0);
    }

    #[test]
    fn test_haversine_same_point() {
        assert_eq!(distance_meters(SITE.0, SITE.1, SITE.0, SITE.1), 0.0);
    }

    #[test]
    fn test_distance_is_symmetric() {
        let points = [
            (SITE.0, SITE.1),
            (-5.2250, -80.6300),
            (-12.0464, -77.0428),
            (51.5072, -0.1276),
            (0.0, 0.0),
        ];

        for a in points {
            for b in points {
                let ab = distance_meters(a.0, a.1, b.0, b.1);
                let ba = distance_meters(b.0, b.1, a.0, a.1);
                assert!((ab - ba).abs() < 1e-6, "{a:?} <-> {b:?}: {ab} vs {ba}");
            }
        }
    }

    #[test]
    fn test_radius_boundary_is_inclusive() {
        let point = (-5.2250, -80.6300);
        let exact = distance_meters(point.0, point.1, SITE.0, SITE.1);

        assert!(is_within_radius(point.0, point.1, SITE.0, SITE.1, exact));
        assert!(!is_within_radius(point.0, point.1, SITE.0, SITE.1, exact - 0.001));
    }

    #[test]
    fn test_geofence_contains() {
        let fence = GeoFence::new(Coordinates::new(SITE.0, SITE.1), 100.0);

        assert!(fence.contains(Coordinates::new(SITE.0, SITE.1)));
        // roughly 50 m north
        assert!(fence.contains(Coordinates::new(SITE.0 + 0.00045, SITE.1)));
        // roughly 1.1 km north
        assert!(!fence.contains(Coordinates::new(SITE.0 + 0.01, SITE.1)));
    }
}

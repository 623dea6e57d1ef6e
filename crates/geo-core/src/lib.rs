//! Geo utilities shared by the fusion and routing cores.
//!
//! All public distances are in **miles**. A few upstream feeds and the
//! original service mix `_km` naming into otherwise-mile fields; every type
//! exposed from this crate is unambiguous and carries no such relic.

pub mod bbox;
pub mod point;
pub mod polygon;
pub mod time_decay;

pub use bbox::BoundingBox;
pub use point::GeoPoint;
pub use polygon::Polygon;
pub use time_decay::{DecayCategory, TimeDecay};

/// Mean Earth radius in miles, used by every haversine computation in the core.
pub const EARTH_RADIUS_MI: f64 = 3958.8;

/// Great-circle distance between two WGS84 points, in miles.
pub fn haversine_mi(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let dlat = (lat2 - lat1).to_radians();
    let dlon = (lon2 - lon1).to_radians();

    let a = (dlat / 2.0).sin().powi(2) + lat1_rad.cos() * lat2_rad.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_MI * c
}

/// Validate a WGS84 coordinate pair per spec: lat in [-90, 90], lon in [-180, 180].
pub fn is_valid_coordinate(lat: f64, lon: f64) -> bool {
    (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lon)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn haversine_nyc_to_london() {
        // NYC to London is ~3,459 mi great-circle.
        let dist = haversine_mi(40.7128, -74.0060, 51.5074, -0.1278);
        assert!((dist - 3459.0).abs() < 40.0, "got {dist}");
    }

    #[test]
    fn haversine_same_point_is_zero() {
        let dist = haversine_mi(34.05, -118.25, 34.05, -118.25);
        assert!(dist.abs() < 1e-9);
    }

    #[test]
    fn rejects_out_of_range_coordinates() {
        assert!(!is_valid_coordinate(91.0, 0.0));
        assert!(!is_valid_coordinate(0.0, 181.0));
        assert!(is_valid_coordinate(-90.0, -180.0));
        assert!(is_valid_coordinate(90.0, 180.0));
    }

    proptest::proptest! {
        #[test]
        fn haversine_is_symmetric(lat1 in -90.0..90.0, lon1 in -180.0..180.0, lat2 in -90.0..90.0, lon2 in -180.0..180.0) {
            let a = haversine_mi(lat1, lon1, lat2, lon2);
            let b = haversine_mi(lat2, lon2, lat1, lon1);
            proptest::prop_assert!((a - b).abs() < 1e-6);
        }

        #[test]
        fn haversine_is_nonnegative(lat1 in -90.0..90.0, lon1 in -180.0..180.0, lat2 in -90.0..90.0, lon2 in -180.0..180.0) {
            proptest::prop_assert!(haversine_mi(lat1, lon1, lat2, lon2) >= 0.0);
        }
    }
}

use crate::GeoPoint;

/// An axis-aligned lat/lon bounding box, used as a cheap prefilter before the
/// more expensive haversine check (see `proximity-alerts`, which scans every
/// cached feed and cannot afford a haversine call per candidate record).
#[derive(Debug, Clone, Copy)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    /// A padded box around `center` wide enough to contain every point within
    /// `radius_mi` miles. Padding is generous (not geodesically exact) by
    /// design: the box only prefilters, the haversine check after it is exact.
    pub fn around(center: GeoPoint, radius_mi: f64) -> Self {
        let lat_delta = radius_mi / 69.0; // ~69 mi per degree latitude
        let lon_delta = radius_mi / (69.0 * center.latitude.to_radians().cos().abs().max(0.01));

        Self {
            min_lat: center.latitude - lat_delta,
            max_lat: center.latitude + lat_delta,
            min_lon: center.longitude - lon_delta,
            max_lon: center.longitude + lon_delta,
        }
    }

    /// A padded box around a start/end pair, used by the Route Service to
    /// bound which disasters are worth checking for a given trip.
    pub fn around_pair(a: GeoPoint, b: GeoPoint, padding_mi: f64) -> Self {
        let box_a = Self::around(a, padding_mi);
        let box_b = Self::around(b, padding_mi);
        Self {
            min_lat: box_a.min_lat.min(box_b.min_lat),
            max_lat: box_a.max_lat.max(box_b.max_lat),
            min_lon: box_a.min_lon.min(box_b.min_lon),
            max_lon: box_a.max_lon.max(box_b.max_lon),
        }
    }

    pub fn contains(&self, point: GeoPoint) -> bool {
        point.latitude >= self.min_lat
            && point.latitude <= self.max_lat
            && point.longitude >= self.min_lon
            && point.longitude <= self.max_lon
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn box_contains_center() {
        let center = GeoPoint::new(34.05, -118.25);
        let bbox = BoundingBox::around(center, 10.0);
        assert!(bbox.contains(center));
    }

    #[test]
    fn box_excludes_far_point() {
        let center = GeoPoint::new(34.05, -118.25);
        let bbox = BoundingBox::around(center, 5.0);
        assert!(!bbox.contains(GeoPoint::new(40.7128, -74.0060)));
    }
}

use crate::GeoPoint;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// A closed ring of WGS84 points, `[longitude, latitude]` pairs to match the
/// GeoJSON-like shape routing providers expect (see Route Service §6.3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Polygon {
    pub rings: Vec<[f64; 2]>,
}

const CIRCLE_VERTICES: usize = 32;

impl Polygon {
    /// Build a 32-vertex circular approximation of a buffer of `radius_mi`
    /// miles around `center`. This is the disaster "buffer polygon" of the
    /// routing core: severity picks the radius, this function turns it into
    /// a ring the avoidance API and the safety scorer can both consume.
    pub fn circle(center: GeoPoint, radius_mi: f64) -> Self {
        let lat_rad = center.latitude.to_radians();
        let mut rings = Vec::with_capacity(CIRCLE_VERTICES + 1);

        for i in 0..CIRCLE_VERTICES {
            let theta = 2.0 * PI * (i as f64) / (CIRCLE_VERTICES as f64);
            let dlat = (radius_mi / 69.0) * theta.cos();
            let dlon = (radius_mi / (69.0 * lat_rad.cos().abs().max(0.01))) * theta.sin();
            rings.push([center.longitude + dlon, center.latitude + dlat]);
        }
        // Close the ring.
        rings.push(rings[0]);

        Self { rings }
    }

    /// Ray-casting point-in-polygon test against the ring in `[lon, lat]`
    /// order. Used for the origin-exclusion invariant and for
    /// `intersects_disasters`.
    pub fn contains(&self, point: GeoPoint) -> bool {
        let x = point.longitude;
        let y = point.latitude;
        let mut inside = false;
        let n = self.rings.len();

        let mut j = n - 1;
        for i in 0..n {
            let (xi, yi) = (self.rings[i][0], self.rings[i][1]);
            let (xj, yj) = (self.rings[j][0], self.rings[j][1]);

            let intersects = ((yi > y) != (yj > y))
                && (x < (xj - xi) * (y - yi) / (yj - yi) + xi);
            if intersects {
                inside = !inside;
            }
            j = i;
        }

        inside
    }

    /// True if any point of `path` (typically route waypoints/geometry
    /// samples) falls inside this polygon.
    pub fn intersects_path(&self, path: &[GeoPoint]) -> bool {
        path.iter().any(|p| self.contains(*p))
    }

    /// Centroid of the ring (simple vertex average — adequate for a regular
    /// circular buffer, not intended for arbitrary concave polygons).
    pub fn centroid(&self) -> GeoPoint {
        let (mut sum_lat, mut sum_lon, mut n) = (0.0, 0.0, 0.0);
        for p in &self.rings {
            sum_lon += p[0];
            sum_lat += p[1];
            n += 1.0;
        }
        GeoPoint::new(sum_lat / n, sum_lon / n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn circle_contains_center() {
        let center = GeoPoint::new(34.05, -118.25);
        let poly = Polygon::circle(center, 5.0);
        assert!(poly.contains(center));
    }

    #[test]
    fn circle_excludes_far_point() {
        let center = GeoPoint::new(34.05, -118.25);
        let poly = Polygon::circle(center, 1.0);
        assert!(!poly.contains(GeoPoint::new(36.0, -118.25)));
    }

    #[test]
    fn circle_has_32_vertices_plus_closure() {
        let poly = Polygon::circle(GeoPoint::new(0.0, 0.0), 3.0);
        assert_eq!(poly.rings.len(), CIRCLE_VERTICES + 1);
        assert_eq!(poly.rings.first(), poly.rings.last());
    }
}

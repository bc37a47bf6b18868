//! Great-circle distance and GPS-to-pixel map projection.

use serde::{Deserialize, Serialize};

/// Mean Earth radius used for lap distances (km).
pub const EARTH_RADIUS_KM: f64 = 6367.0;

/// A latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub long: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, long: f64) -> Self {
        Self { lat, long }
    }

    /// Linear interpolation between two points.
    pub fn lerp(&self, other: &GeoPoint, t: f64) -> GeoPoint {
        GeoPoint {
            lat: self.lat + (other.lat - self.lat) * t,
            long: self.long + (other.long - self.long) * t,
        }
    }
}

/// Great-circle distance between two points (km), haversine formula.
pub fn haversine_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let (lat1, lat2) = (a.lat.to_radians(), b.lat.to_radians());
    let dlat = lat2 - lat1;
    let dlong = (b.long - a.long).to_radians();
    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlong / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}

/// Bounding box of a set of GPS positions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GpsBounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_long: f64,
    pub max_long: f64,
}

impl GpsBounds {
    /// Bounds of `points`, or `None` when empty.
    pub fn from_points(points: impl IntoIterator<Item = GeoPoint>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut bounds = GpsBounds {
            min_lat: first.lat,
            max_lat: first.lat,
            min_long: first.long,
            max_long: first.long,
        };
        for p in iter {
            bounds.min_lat = bounds.min_lat.min(p.lat);
            bounds.max_lat = bounds.max_lat.max(p.lat);
            bounds.min_long = bounds.min_long.min(p.long);
            bounds.max_long = bounds.max_long.max(p.long);
        }
        Some(bounds)
    }

    pub fn center(&self) -> GeoPoint {
        GeoPoint {
            lat: (self.min_lat + self.max_lat) / 2.0,
            long: (self.min_long + self.max_long) / 2.0,
        }
    }

    pub fn lat_range(&self) -> f64 {
        self.max_lat - self.min_lat
    }

    pub fn long_range(&self) -> f64 {
        self.max_long - self.min_long
    }
}

/// Pixel rectangle a map is drawn into.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Projects GPS positions into a [`MapRect`], north up, preserving aspect.
///
/// Longitude is scaled by the cosine of the center latitude so the track
/// outline is not stretched east-west away from the equator.
#[derive(Debug, Clone, Copy)]
pub struct MapProjection {
    center: GeoPoint,
    rect: MapRect,
    scale: f64,
    long_factor: f64,
}

impl MapProjection {
    /// Fit `bounds` into `rect`.
    pub fn fit(bounds: &GpsBounds, rect: MapRect) -> Self {
        let center = bounds.center();
        let long_factor = center.lat.to_radians().cos().abs().max(1e-6);
        let lat_span = bounds.lat_range();
        let long_span = bounds.long_range() * long_factor;

        let scale_y = if lat_span > 0.0 {
            rect.height as f64 / lat_span
        } else {
            f64::INFINITY
        };
        let scale_x = if long_span > 0.0 {
            rect.width as f64 / long_span
        } else {
            f64::INFINITY
        };
        let scale = scale_x.min(scale_y);
        let scale = if scale.is_finite() { scale } else { 0.0 };

        Self {
            center,
            rect,
            scale,
            long_factor,
        }
    }

    /// Pixel position of `point`.
    pub fn project(&self, point: GeoPoint) -> (f32, f32) {
        let cx = self.rect.x as f64 + self.rect.width as f64 / 2.0;
        let cy = self.rect.y as f64 + self.rect.height as f64 / 2.0;
        let dx = (point.long - self.center.long) * self.long_factor * self.scale;
        let dy = (point.lat - self.center.lat) * self.scale;
        ((cx + dx) as f32, (cy - dy) as f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_haversine_one_degree_of_latitude() {
        let d = haversine_km(GeoPoint::new(0.0, 0.0), GeoPoint::new(1.0, 0.0));
        let expected = EARTH_RADIUS_KM * std::f64::consts::PI / 180.0;
        assert!((d - expected).abs() < 1e-6);
    }

    #[test]
    fn test_haversine_same_point_is_zero() {
        let p = GeoPoint::new(34.87, -118.26);
        assert_eq!(haversine_km(p, p), 0.0);
    }

    #[test]
    fn test_bounds() {
        let bounds = GpsBounds::from_points([
            GeoPoint::new(1.0, 5.0),
            GeoPoint::new(-2.0, 7.0),
            GeoPoint::new(0.5, 4.0),
        ])
        .unwrap();
        assert_eq!(bounds.min_lat, -2.0);
        assert_eq!(bounds.max_lat, 1.0);
        assert_eq!(bounds.min_long, 4.0);
        assert_eq!(bounds.max_long, 7.0);
        assert!(GpsBounds::from_points(Vec::new()).is_none());
    }

    #[test]
    fn test_projection_stays_inside_rect_and_is_north_up() {
        let bounds = GpsBounds {
            min_lat: 10.0,
            max_lat: 10.01,
            min_long: 20.0,
            max_long: 20.02,
        };
        let rect = MapRect {
            x: 100.0,
            y: 50.0,
            width: 300.0,
            height: 300.0,
        };
        let proj = MapProjection::fit(&bounds, rect);
        let corners = [
            GeoPoint::new(10.0, 20.0),
            GeoPoint::new(10.01, 20.02),
            GeoPoint::new(10.0, 20.02),
            GeoPoint::new(10.01, 20.0),
        ];
        for c in corners {
            let (x, y) = proj.project(c);
            assert!(x >= rect.x - 0.01 && x <= rect.x + rect.width + 0.01);
            assert!(y >= rect.y - 0.01 && y <= rect.y + rect.height + 0.01);
        }
        let (_, south) = proj.project(GeoPoint::new(10.0, 20.01));
        let (_, north) = proj.project(GeoPoint::new(10.01, 20.01));
        assert!(north < south);
    }

    #[test]
    fn test_degenerate_bounds_project_to_center() {
        let p = GeoPoint::new(3.0, 4.0);
        let bounds = GpsBounds::from_points([p]).unwrap();
        let proj = MapProjection::fit(
            &bounds,
            MapRect {
                x: 0.0,
                y: 0.0,
                width: 200.0,
                height: 100.0,
            },
        );
        assert_eq!(proj.project(p), (100.0, 50.0));
    }
}

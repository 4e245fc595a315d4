//! Geometric distance kernels.
//!
//! All kernels take longitude/latitude pairs in degrees and return meters.
//! [`great_circle`] is exact on a spherical earth; [`planar_approx`] and
//! [`grid_approx`] are cheaper local approximations used as A* heuristics.

use serde::{Deserialize, Serialize};

/// Mean earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Approximate length of one degree of latitude in meters.
pub const METERS_PER_DEGREE: f64 = 111_000.0;

/// A WGS84 coordinate in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Great-circle distance to another coordinate in meters.
    pub fn distance_to(&self, other: &Self) -> f64 {
        great_circle(self.lng, self.lat, other.lng, other.lat)
    }
}

/// Haversine distance between two points.
pub fn great_circle(lng1: f64, lat1: f64, lng2: f64, lat2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lng2 - lng1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_M * c
}

/// Equirectangular approximation: longitude deltas are scaled by the cosine
/// of the mean latitude so the result is symmetric.
pub fn planar_approx(lng1: f64, lat1: f64, lng2: f64, lat2: f64) -> f64 {
    let (dx, dy) = scaled_deltas(lng1, lat1, lng2, lat2);
    (dx * dx + dy * dy).sqrt()
}

/// Manhattan distance over the same scaled axes as [`planar_approx`].
pub fn grid_approx(lng1: f64, lat1: f64, lng2: f64, lat2: f64) -> f64 {
    let (dx, dy) = scaled_deltas(lng1, lat1, lng2, lat2);
    dx.abs() + dy.abs()
}

fn scaled_deltas(lng1: f64, lat1: f64, lng2: f64, lat2: f64) -> (f64, f64) {
    let mean_lat = ((lat1 + lat2) / 2.0).to_radians();
    let dy = (lat2 - lat1) * METERS_PER_DEGREE;
    let dx = (lng2 - lng1) * METERS_PER_DEGREE * mean_lat.cos();
    (dx, dy)
}

#[cfg(test)]
mod tests {
    use super::*;

    type Kernel = fn(f64, f64, f64, f64) -> f64;

    const KERNELS: [(&str, Kernel); 3] = [
        ("great_circle", great_circle),
        ("planar", planar_approx),
        ("grid", grid_approx),
    ];

    // Central Xiangtan.
    const ORIGIN: (f64, f64) = (112.9440, 27.8290);

    #[test]
    fn kernels_are_symmetric() {
        let (lng1, lat1) = ORIGIN;
        let (lng2, lat2) = (112.9871, 27.8602);
        for (name, kernel) in KERNELS {
            let ab = kernel(lng1, lat1, lng2, lat2);
            let ba = kernel(lng2, lat2, lng1, lat1);
            assert!((ab - ba).abs() < 1e-9, "{name} not symmetric: {ab} vs {ba}");
        }
    }

    #[test]
    fn kernels_are_monotonic_in_distance() {
        let (lng, lat) = ORIGIN;
        for (name, kernel) in KERNELS {
            let mut previous = 0.0;
            for step in 1..=20 {
                let offset = step as f64 * 0.01;
                let d = kernel(lng, lat, lng + offset, lat + offset / 2.0);
                assert!(d > previous, "{name} not monotonic at step {step}");
                previous = d;
            }
        }
    }

    #[test]
    fn kernels_agree_in_magnitude_at_city_scale() {
        let (lng1, lat1) = ORIGIN;
        let (lng2, lat2) = (113.1200, 27.9800);
        let reference = great_circle(lng1, lat1, lng2, lat2);
        assert!(reference > 10_000.0 && reference < 50_000.0);
        for (name, kernel) in KERNELS {
            let d = kernel(lng1, lat1, lng2, lat2);
            let ratio = d / reference;
            assert!(
                (0.5..2.0).contains(&ratio),
                "{name} out of magnitude: {d} vs {reference}"
            );
        }
    }

    #[test]
    fn identical_points_are_zero() {
        let (lng, lat) = ORIGIN;
        for (name, kernel) in KERNELS {
            assert_eq!(kernel(lng, lat, lng, lat), 0.0, "{name}");
        }
    }

    #[test]
    fn one_degree_of_latitude_is_about_111_km() {
        let d = great_circle(0.0, 0.0, 0.0, 1.0);
        assert!((d - 111_195.0).abs() < 10.0, "got {d}");
    }

    #[test]
    fn coordinate_distance_matches_kernel() {
        let a = Coordinate::new(27.8290, 112.9440);
        let b = Coordinate::new(27.8602, 112.9871);
        assert_eq!(a.distance_to(&b), great_circle(a.lng, a.lat, b.lng, b.lat));
    }
}

//! Numeric helpers shared by the stripe factory and the quadtree splitter

use geo::{Coord, Rect};
use glam::DVec3;

/// √2, the diagonal of a unit pixel
pub const SQRT2: f64 = std::f64::consts::SQRT_2;

/// Standard rendering pixel size in meters (0.28 mm), used for scale denominators
pub const DEFAULT_PIXEL_SIZE: f64 = 0.00028;

/// Tolerance for "nearly equal" angle checks on the footprint
pub const ANGLE_TOLERANCE: f64 = 0.00001;

/// Tolerance used when two resolutions are considered equal
pub const RESOLUTION_TOLERANCE: f64 = 0.0001;

/// Tolerance for adjacency of two envelope edges
pub const ADJACENCY_TOLERANCE: f64 = 0.00001;

/// Tolerance for matching origin and length of two mergeable quads
pub const MERGE_TOLERANCE: f64 = 0.01;

/// Number of doubling steps needed to reach `value` from 1.
///
/// Returns the smallest `k` such that `2^k >= value`, or 0 when `value <= 1`.
/// A relative slack of 1e-9 absorbs rounding so that exact powers of two
/// computed from floating point lengths do not gain an extra step.
pub fn nearest_power_of_two(value: f64) -> u32 {
    if !value.is_finite() || value <= 1.0 {
        return 0;
    }
    let target = value * (1.0 - 1e-9);
    let mut power = 1.0;
    let mut result = 0;
    while power < target {
        power *= 2.0;
        result += 1;
    }
    result
}

/// Ground resolution of the vector between `a` and `b` when drawn across `image_width` pixels.
///
/// The value is scaled by √2 so it describes the diagonal of one pixel in meters.
#[inline]
pub fn calc_scale_of_vector(a: DVec3, b: DVec3, image_width: f64) -> f64 {
    (a.distance(b) / image_width) * SQRT2
}

/// Smallest envelope containing both `a` and `b`
#[inline]
pub fn merge_rects(a: Rect<f64>, b: Rect<f64>) -> Rect<f64> {
    Rect::new(
        Coord {
            x: a.min().x.min(b.min().x),
            y: a.min().y.min(b.min().y),
        },
        Coord {
            x: a.max().x.max(b.max().x),
            y: a.max().y.max(b.max().y),
        },
    )
}

/// Grow `rect` on every side by `fraction` of its own width and height
#[inline]
pub fn expand_rect(rect: Rect<f64>, fraction: f64) -> Rect<f64> {
    let extra_width = rect.width() * fraction;
    let extra_height = rect.height() * fraction;
    Rect::new(
        Coord {
            x: rect.min().x - extra_width,
            y: rect.min().y - extra_height,
        },
        Coord {
            x: rect.max().x + extra_width,
            y: rect.max().y + extra_height,
        },
    )
}

/// Pixel size (height, width) of `rect` when requested at `resolution` meters per pixel
#[inline]
pub fn request_pixels(rect: Rect<f64>, resolution: f64) -> (f64, f64) {
    let resolution = resolution.abs();
    (
        (rect.height() / resolution).round(),
        (rect.width() / resolution).round(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_nearest_power_of_two() {
        assert_eq!(nearest_power_of_two(1.0), 0);
        assert_eq!(nearest_power_of_two(2.0), 1);
        assert_eq!(nearest_power_of_two(5.0), 3);
        assert_eq!(nearest_power_of_two(4.0), 2);
        assert_eq!(nearest_power_of_two(0.3), 0);
        assert_eq!(nearest_power_of_two(f64::NAN), 0);
        assert_eq!(nearest_power_of_two(1024.0), 10);
    }

    #[test]
    fn test_nearest_power_of_two_absorbs_rounding() {
        assert_eq!(nearest_power_of_two(4.000_000_000_1), 2);
        assert_eq!(nearest_power_of_two(4.01), 3);
    }

    #[test]
    fn test_calc_scale_of_vector() {
        let a = DVec3::new(-500.0, 0.0, 0.0);
        let b = DVec3::new(500.0, 0.0, 0.0);
        assert_relative_eq!(
            calc_scale_of_vector(a, b, 512.0),
            (1000.0 / 512.0) * SQRT2,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_merge_rects() {
        let a = Rect::new(Coord { x: 0.0, y: 0.0 }, Coord { x: 10.0, y: 10.0 });
        let b = Rect::new(Coord { x: 10.0, y: -5.0 }, Coord { x: 20.0, y: 5.0 });
        let merged = merge_rects(a, b);
        assert_eq!(merged.min(), Coord { x: 0.0, y: -5.0 });
        assert_eq!(merged.max(), Coord { x: 20.0, y: 10.0 });
    }

    #[test]
    fn test_expand_rect() {
        let rect = Rect::new(Coord { x: 0.0, y: 0.0 }, Coord { x: 100.0, y: 50.0 });
        let expanded = expand_rect(rect, 0.1);
        assert_relative_eq!(expanded.min().x, -10.0);
        assert_relative_eq!(expanded.min().y, -5.0);
        assert_relative_eq!(expanded.max().x, 110.0);
        assert_relative_eq!(expanded.max().y, 55.0);
    }

    #[test]
    fn test_request_pixels() {
        let rect = Rect::new(Coord { x: 0.0, y: 0.0 }, Coord { x: 100.0, y: 50.0 });
        assert_eq!(request_pixels(rect, -0.5), (100.0, 200.0));
    }
}

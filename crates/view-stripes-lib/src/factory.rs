//! Resolution stripes along the view direction
//!
//! The footprint is cut into slices whose far edge is twice as wide as their near edge, so
//! each slice needs twice the resolution value of the previous one. When the view looks down
//! so steeply that the near edge lies behind the observer, the area around the observer is
//! covered by concentric rings first and only the remainder in front is cut into slices.
//!
//! All geometry is computed in the local frame of the [`ViewPoint`] (`+y` is the view
//! direction) and converted to world coordinates when a stripe is emitted.

use crate::utils::{self, ADJACENCY_TOLERANCE, ANGLE_TOLERANCE};
use crate::{ResolutionStripe, Surface, ViewPoint};
use geo::{Coord, Rect};
use glam::DVec3;
use std::f64::consts::FRAC_PI_2;

/// Finest resolution a factory accepts, whatever was configured
const MIN_SCALE_RESOLUTION_FLOOR: f64 = 0.0001;

/// Builds the resolution stripes of one view
#[derive(Debug, Clone)]
pub struct StripeFactory<'a> {
    view_point: &'a ViewPoint,
    /// Finest resolution any stripe may carry
    min_scale_resolution: f64,
    /// Largest width or height of a single request in pixels
    max_request_size: u32,
}

/// The four corners of a quadrilateral slice, in local coordinates
///
/// "Lower" is the edge closer to the observer along the view direction.
#[derive(Debug, Clone, Copy)]
struct Quad {
    lower_left: DVec3,
    lower_right: DVec3,
    upper_right: DVec3,
    upper_left: DVec3,
}

/// Parameters shared by every stripe of one `create_resolution_stripes` call
#[derive(Debug, Clone, Copy)]
struct StripeParams {
    image_width: f64,
    minimal_height: f64,
    scale: f64,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl<'a> StripeFactory<'a> {
    /// Create a factory for `view_point`
    ///
    /// # Arguments
    /// * `min_scale_resolution` - Finest allowed resolution, raised to 0.0001 if smaller
    /// * `max_request_size` - Largest request width or height in pixels
    pub fn new(view_point: &'a ViewPoint, min_scale_resolution: f64, max_request_size: u32) -> Self {
        let min_scale_resolution = if min_scale_resolution.is_finite() {
            min_scale_resolution.max(MIN_SCALE_RESOLUTION_FLOOR)
        } else {
            MIN_SCALE_RESOLUTION_FLOOR
        };
        tracing::debug!(min_scale_resolution, "Created stripe factory");
        Self {
            view_point,
            min_scale_resolution,
            max_request_size,
        }
    }

    #[inline]
    pub fn min_scale_resolution(&self) -> f64 {
        self.min_scale_resolution
    }

    /// Cut the footprint of the view into resolution stripes, nearest (finest) first
    ///
    /// # Arguments
    /// * `image_width` - Width of the requested view in pixels
    /// * `minimal_height` - Terrain height used when no elevation data is available
    /// * `scale` - Height exaggeration of the elevation model
    pub fn create_resolution_stripes(
        &self,
        image_width: u32,
        minimal_height: f64,
        scale: f64,
    ) -> Vec<ResolutionStripe> {
        #[cfg(feature = "profiling")]
        profiling::scope!("factory::create_resolution_stripes");

        let params = StripeParams {
            image_width: f64::from(image_width.max(1)),
            minimal_height,
            scale,
        };
        let local = self.view_point.local_footprint();
        let footprint = Quad {
            lower_left: local.near_left,
            lower_right: local.near_right,
            upper_right: local.far_right,
            upper_left: local.far_left,
        };

        let side_length = (footprint.upper_right - footprint.lower_right).truncate().length();
        let side_angle = side_gradient_angle(footprint.lower_right, footprint.upper_right);
        tracing::debug!(
            side_angle_degrees = side_angle.to_degrees(),
            "Footprint side gradient"
        );

        // The slice depth uses the tangent of this angle, which is undefined for a flat side
        if side_length < ADJACENCY_TOLERANCE || (side_angle - FRAC_PI_2).abs() <= ANGLE_TOLERANCE {
            tracing::debug!("Degenerate footprint, using a single stripe");
            return self.create_stripe_from_edges(footprint, params).into_iter().collect();
        }

        let near_resolution =
            utils::calc_scale_of_vector(footprint.lower_right, footprint.lower_left, params.image_width);
        let far_resolution =
            utils::calc_scale_of_vector(footprint.upper_right, footprint.upper_left, params.image_width);
        tracing::debug!(near_resolution, far_resolution, "Footprint edge resolutions");

        if self.view_point.is_near_clipping_plane_behind_view_point() {
            self.create_stripes_for_high_pitch(footprint, near_resolution, far_resolution, params)
        } else {
            self.create_stripes_for_frontal_perspective(
                footprint,
                side_angle,
                near_resolution,
                far_resolution,
                params,
            )
        }
    }

    /// A single stripe covering an explicit request bounding box
    ///
    /// The resolutions are the scales of the box width and height, in ascending order.
    pub fn create_bbox_resolution_stripe(
        &self,
        envelope: Rect<f64>,
        image_width: u32,
        minimal_height: f64,
        scale: f64,
    ) -> Vec<ResolutionStripe> {
        let image_width = f64::from(image_width.max(1));
        let min = envelope.min();
        let lower_left = DVec3::new(min.x, min.y, minimal_height);
        let lower_right = DVec3::new(min.x + envelope.width(), min.y, minimal_height);
        let upper_left = DVec3::new(min.x, min.y + envelope.height(), minimal_height);

        let mut min_resolution = utils::calc_scale_of_vector(lower_left, lower_right, image_width);
        let mut max_resolution = utils::calc_scale_of_vector(lower_left, upper_left, image_width);
        if min_resolution > max_resolution {
            std::mem::swap(&mut min_resolution, &mut max_resolution);
        }

        match Surface::from_rect(envelope, minimal_height) {
            Ok(surface) => vec![ResolutionStripe::new(
                surface,
                max_resolution,
                min_resolution,
                minimal_height,
                scale,
                self.max_request_size,
            )],
            Err(e) => {
                tracing::warn!(error = %e, "Skipping bounding box stripe");
                Vec::new()
            }
        }
    }

    /// Slices of doubling width from the near edge of `footprint` to its far edge
    fn create_stripes_for_frontal_perspective(
        &self,
        footprint: Quad,
        side_angle: f64,
        near_resolution: f64,
        far_resolution: f64,
        params: StripeParams,
    ) -> Vec<ResolutionStripe> {
        let mut near_resolution = near_resolution;
        if near_resolution < self.min_scale_resolution {
            tracing::warn!(
                near_resolution,
                min_scale_resolution = self.min_scale_resolution,
                "Near resolution is finer than the configured minimum, clamping"
            );
            near_resolution = self.min_scale_resolution;
        }

        let number_of_stripes = utils::nearest_power_of_two(far_resolution / near_resolution);
        let tangent = side_angle.tan();
        if number_of_stripes == 0 || tangent.abs() < ANGLE_TOLERANCE || !tangent.is_finite() {
            // Happens when the angle of view is close to the pitch
            tracing::debug!(number_of_stripes, "No frontal subdivision, using a single stripe");
            return self.create_stripe_from_edges(footprint, params).into_iter().collect();
        }

        let mut stripes = Vec::with_capacity(number_of_stripes as usize + 1);
        let far_y = footprint.upper_right.y.min(footprint.upper_left.y);
        let slack = ADJACENCY_TOLERANCE * (far_y - footprint.lower_right.y).abs().max(1.0);
        let mut near_right = footprint.lower_right;
        let mut near_left = footprint.lower_left;

        for _ in 0..number_of_stripes {
            let x_length = (near_right.x - near_left.x) * 0.5;
            let y_length = x_length / tangent;
            let next_right = DVec3::new(near_right.x + x_length, near_right.y + y_length, near_right.z);
            let next_left = DVec3::new(near_left.x - x_length, near_left.y + y_length, near_left.z);

            // The doubling count is rounded up, so the last slice may pass the far edge
            if next_right.y > far_y + slack {
                tracing::debug!(
                    overshoot = next_right.y - far_y,
                    "Slice passes the far edge, closing the footprint"
                );
                break;
            }

            let slice = Quad {
                lower_left: near_left,
                lower_right: near_right,
                upper_right: next_right,
                upper_left: next_left,
            };
            stripes.extend(self.create_stripe_from_edges(slice, params));

            near_right = next_right;
            near_left = next_left;
        }

        let last = Quad {
            lower_left: near_left,
            lower_right: near_right,
            upper_right: footprint.upper_right,
            upper_left: footprint.upper_left,
        };
        stripes.extend(self.create_stripe_from_edges(last, params));
        stripes
    }

    /// Concentric rings around the observer, closing stripes to the footprint sides,
    /// and frontal slices for the rest
    ///
    /// ```text
    /// FL__________________FR    .
    ///   \                /     /|\
    ///    \     _F_      /       |
    ///     \  L |O| R   /     view dir
    ///      \   -B-    /         |
    ///       \        /          |
    ///       NL------NR
    /// ```
    fn create_stripes_for_high_pitch(
        &self,
        footprint: Quad,
        near_resolution: f64,
        far_resolution: f64,
        params: StripeParams,
    ) -> Vec<ResolutionStripe> {
        let z = footprint.lower_left.z;
        let near_right = footprint.lower_right;

        // Angle between the view direction and the ray from the observer to the near right corner
        let to_near_right = near_right.truncate();
        let half_angle_of_view = (near_right.y.abs() / to_near_right.length()).acos();
        let tangent = half_angle_of_view.tan();
        tracing::debug!(
            half_angle_of_view_degrees = half_angle_of_view.to_degrees(),
            "High pitch view"
        );

        let near_resolution = near_resolution.max(self.min_scale_resolution);
        let stripe_length = params.image_width * (self.min_scale_resolution / utils::SQRT2);
        let number_of_rings =
            utils::nearest_power_of_two((near_resolution / self.min_scale_resolution).floor());

        let left_side = SideLine::new(footprint.lower_left, footprint.upper_left);
        let right_side = SideLine::new(footprint.lower_right, footprint.upper_right);
        let near_y = footprint.lower_left.y.max(footprint.lower_right.y);
        let far_y = footprint.upper_left.y.min(footprint.upper_right.y);
        let slack = ADJACENCY_TOLERANCE * (far_y - near_y).abs().max(1.0);

        // A box [-half_width, half_width] x [-back, front] centered on the observer must stay
        // inside the footprint
        let fits = |half_width: f64, back: f64, front: f64| {
            -back >= near_y - slack
                && front <= far_y + slack
                && left_side.x_at(-back) <= -half_width + slack
                && right_side.x_at(-back) >= half_width - slack
        };

        let mut half_width = stripe_length * 0.5;
        let mut back = half_width / tangent;
        if !tangent.is_finite() || tangent < ANGLE_TOLERANCE || !fits(half_width, back, back) {
            tracing::debug!(
                stripe_length,
                "Center stripe does not fit the footprint, using frontal slices only"
            );
            let side_angle = side_gradient_angle(footprint.lower_right, footprint.upper_right);
            return self.create_stripes_for_frontal_perspective(
                footprint,
                side_angle,
                near_resolution,
                far_resolution,
                params,
            );
        }

        let mut stripes = Vec::with_capacity(4 * number_of_rings as usize + 8);
        let center = axis_box(-half_width, half_width, -back, back, z);
        stripes.extend(self.create_resolution_stripe(
            center,
            self.min_scale_resolution,
            self.min_scale_resolution,
            params,
        ));

        for ring in 0..number_of_rings {
            let x_length = half_width;
            let y_length = x_length / tangent;
            let outer_half_width = half_width + x_length;
            let outer_back = back + y_length;

            if !fits(outer_half_width, outer_back, outer_back) {
                tracing::debug!(ring, "Ring leaves the footprint, closing to the sides");
                break;
            }

            let resolution = utils::calc_scale_of_vector(
                DVec3::new(-outer_half_width, -outer_back, z),
                DVec3::new(outer_half_width, -outer_back, z),
                params.image_width,
            );
            let pieces = [
                // back
                axis_box(-outer_half_width, outer_half_width, -outer_back, -back, z),
                // left
                axis_box(-outer_half_width, -half_width, -back, back, z),
                // front
                axis_box(-outer_half_width, outer_half_width, back, outer_back, z),
                // right
                axis_box(half_width, outer_half_width, -back, back, z),
            ];
            for piece in pieces {
                stripes.extend(self.create_resolution_stripe(piece, resolution, resolution, params));
            }

            half_width = outer_half_width;
            back = outer_back;
        }

        // Close the rings against the footprint sides
        let back_left = DVec3::new(left_side.x_at(-back), -back, z);
        let back_right = DVec3::new(right_side.x_at(-back), -back, z);
        let front_left = DVec3::new(left_side.x_at(back), back, z);
        let front_right = DVec3::new(right_side.x_at(back), back, z);

        let back_resolution = utils::calc_scale_of_vector(back_left, back_right, params.image_width);
        let near_edge_resolution = utils::calc_scale_of_vector(
            footprint.lower_left,
            footprint.lower_right,
            params.image_width,
        );
        let min_resolution = back_resolution.min(near_edge_resolution);
        let max_resolution = back_resolution.max(near_edge_resolution);

        let closing = [
            // back, between the near edge and the rings
            Quad {
                lower_left: footprint.lower_left,
                lower_right: footprint.lower_right,
                upper_right: back_right,
                upper_left: back_left,
            },
            // left
            Quad {
                lower_left: back_left,
                lower_right: DVec3::new(-half_width, -back, z),
                upper_right: DVec3::new(-half_width, back, z),
                upper_left: front_left,
            },
            // right
            Quad {
                lower_left: DVec3::new(half_width, -back, z),
                lower_right: back_right,
                upper_right: front_right,
                upper_left: DVec3::new(half_width, back, z),
            },
        ];
        for quad in closing {
            if quad.area() <= slack {
                tracing::debug!("Skipping empty closing stripe");
                continue;
            }
            stripes.extend(self.create_resolution_stripe(quad, max_resolution, min_resolution, params));
        }

        // What is left in front of the rings widens like an ordinary perspective view
        let frontal = Quad {
            lower_left: front_left,
            lower_right: front_right,
            upper_right: footprint.upper_right,
            upper_left: footprint.upper_left,
        };
        let frontal_resolution = utils::calc_scale_of_vector(front_left, front_right, params.image_width);
        let frontal_angle = side_gradient_angle(front_right, footprint.upper_right);
        stripes.extend(self.create_stripes_for_frontal_perspective(
            frontal,
            frontal_angle,
            frontal_resolution,
            far_resolution,
            params,
        ));
        stripes
    }

    /// Stripe with the far edge scale as max and the near edge scale as min resolution
    fn create_stripe_from_edges(&self, quad: Quad, params: StripeParams) -> Option<ResolutionStripe> {
        let max_resolution =
            utils::calc_scale_of_vector(quad.upper_right, quad.upper_left, params.image_width);
        let min_resolution =
            utils::calc_scale_of_vector(quad.lower_right, quad.lower_left, params.image_width);
        self.create_resolution_stripe(quad, max_resolution, min_resolution, params)
    }

    /// Convert `quad` to world coordinates and wrap it in a stripe
    ///
    /// Resolutions finer than the configured minimum are raised to it. Returns `None` if the
    /// surface cannot be built.
    fn create_resolution_stripe(
        &self,
        quad: Quad,
        max_resolution: f64,
        min_resolution: f64,
        params: StripeParams,
    ) -> Option<ResolutionStripe> {
        let ring = [quad.lower_left, quad.lower_right, quad.upper_right, quad.upper_left]
            .into_iter()
            .map(|corner| {
                let world = self.view_point.to_world(corner);
                Coord {
                    x: world.x,
                    y: world.y,
                }
            })
            .collect();

        let surface = match Surface::new(ring, self.view_point.terrain_height()) {
            Ok(surface) => surface,
            Err(e) => {
                tracing::warn!(error = %e, "Skipping resolution stripe");
                return None;
            }
        };

        let mut min_resolution = min_resolution;
        if min_resolution < self.min_scale_resolution {
            tracing::debug!(
                min_resolution,
                min_scale_resolution = self.min_scale_resolution,
                "Raising min resolution to the configured minimum"
            );
            min_resolution = self.min_scale_resolution;
        }
        let max_resolution = max_resolution.max(self.min_scale_resolution);

        Some(ResolutionStripe::new(
            surface,
            max_resolution,
            min_resolution,
            params.minimal_height,
            params.scale,
            self.max_request_size,
        ))
    }
}

impl Quad {
    /// Shoelace area of the quadrilateral
    fn area(&self) -> f64 {
        let c = [self.lower_left, self.lower_right, self.upper_right, self.upper_left];
        let twice: f64 = (0..4)
            .map(|i| {
                let (a, b) = (c[i], c[(i + 1) % 4]);
                a.x * b.y - b.x * a.y
            })
            .sum();
        twice.abs() * 0.5
    }
}

/// A footprint side, parameterized by `y` since it is never parallel to the `x` axis
#[derive(Debug, Clone, Copy)]
struct SideLine {
    near: DVec3,
    dx_per_dy: f64,
}

impl SideLine {
    fn new(near: DVec3, far: DVec3) -> Self {
        let dy = far.y - near.y;
        let dx_per_dy = if dy.abs() < ADJACENCY_TOLERANCE {
            0.0
        } else {
            (far.x - near.x) / dy
        };
        Self { near, dx_per_dy }
    }

    #[inline]
    fn x_at(&self, y: f64) -> f64 {
        self.near.x + (y - self.near.y) * self.dx_per_dy
    }
}

/// Angle between a footprint side and the view direction, in `[0, π/2]`
fn side_gradient_angle(near: DVec3, far: DVec3) -> f64 {
    let side = (far - near).truncate();
    let length = side.length();
    if length < f64::EPSILON {
        return 0.0;
    }
    (side.y.abs() / length).clamp(0.0, 1.0).acos()
}

fn axis_box(min_x: f64, max_x: f64, min_y: f64, max_y: f64, z: f64) -> Quad {
    Quad {
        lower_left: DVec3::new(min_x, min_y, z),
        lower_right: DVec3::new(max_x, min_y, z),
        upper_right: DVec3::new(max_x, max_y, z),
        upper_left: DVec3::new(min_x, max_y, z),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Footprint, ViewPointParams};
    use approx::assert_relative_eq;
    use geo::{Area, Polygon};
    use std::cmp::Ordering;

    fn widening_footprint() -> ViewPoint {
        // 1000m near edge widening to 4000m over 100m depth
        let footprint = Footprint {
            far_left: DVec3::new(-2000.0, 100.0, 0.0),
            far_right: DVec3::new(2000.0, 100.0, 0.0),
            near_left: DVec3::new(-500.0, 0.0, 0.0),
            near_right: DVec3::new(500.0, 0.0, 0.0),
        };
        ViewPoint::from_footprint(DVec3::new(0.0, -10.0, 50.0), 0.0, footprint).unwrap()
    }

    fn footprint_area(vp: &ViewPoint) -> f64 {
        let ring: Vec<Coord<f64>> = vp
            .footprint()
            .ring()
            .iter()
            .map(|c| Coord { x: c.x, y: c.y })
            .collect();
        Polygon::new(ring.into(), vec![]).unsigned_area()
    }

    fn stripes_area(stripes: &[ResolutionStripe]) -> f64 {
        stripes.iter().map(|s| s.surface().area()).sum()
    }

    #[test]
    fn test_min_scale_resolution_floor() {
        let vp = widening_footprint();
        assert_eq!(StripeFactory::new(&vp, 0.0, 1024).min_scale_resolution(), 0.0001);
        assert_eq!(StripeFactory::new(&vp, 0.5, 1024).min_scale_resolution(), 0.5);
    }

    #[test]
    fn test_frontal_doubling_scenario() {
        let vp = widening_footprint();
        let factory = StripeFactory::new(&vp, 0.1, 1024);
        let stripes = factory.create_resolution_stripes(512, 0.0, 1.0);

        assert_eq!(stripes.len(), 3);
        assert_relative_eq!(stripes[0].min_resolution(), (1000.0 / 512.0) * utils::SQRT2, epsilon = 1e-9);
        assert_relative_eq!(stripes[1].max_resolution(), (4000.0 / 512.0) * utils::SQRT2, epsilon = 1e-9);

        // The doubling slices strictly increase, the closing slice never goes back
        assert_eq!(stripes[0].cmp_by_max_resolution(&stripes[1]), Ordering::Less);
        assert_ne!(stripes[1].cmp_by_max_resolution(&stripes[2]), Ordering::Greater);
        for pair in stripes.windows(2) {
            assert!(pair[0].min_resolution() <= pair[1].min_resolution() + 1e-9);
        }

        assert_relative_eq!(stripes_area(&stripes), footprint_area(&vp), max_relative = 1e-9);
    }

    #[test]
    fn test_rectangular_footprint_gives_single_stripe() {
        let footprint = Footprint {
            far_left: DVec3::new(-500.0, 300.0, 0.0),
            far_right: DVec3::new(500.0, 300.0, 0.0),
            near_left: DVec3::new(-500.0, 0.0, 0.0),
            near_right: DVec3::new(500.0, 0.0, 0.0),
        };
        let vp = ViewPoint::from_footprint(DVec3::new(0.0, -10.0, 50.0), 0.0, footprint).unwrap();
        let stripes = StripeFactory::new(&vp, 0.1, 1024).create_resolution_stripes(512, 0.0, 1.0);
        assert_eq!(stripes.len(), 1);
        assert_relative_eq!(stripes[0].surface().area(), 300_000.0, max_relative = 1e-9);
    }

    #[test]
    fn test_flat_side_gives_single_stripe() {
        // Near and far edge on the same line: the side gradient is 90 degrees
        let footprint = Footprint {
            far_left: DVec3::new(-1000.0, 0.0, 0.0),
            far_right: DVec3::new(1000.0, 0.0, 0.0),
            near_left: DVec3::new(-500.0, 0.0, 0.0),
            near_right: DVec3::new(500.0, 0.0, 0.0),
        };
        let vp = ViewPoint::from_footprint(DVec3::new(0.0, -10.0, 50.0), 0.0, footprint).unwrap();
        let stripes = StripeFactory::new(&vp, 0.1, 1024).create_resolution_stripes(512, 0.0, 1.0);
        assert_eq!(stripes.len(), 1);
    }

    #[test]
    fn test_frontal_view_covers_footprint() {
        let vp = ViewPoint::new(&ViewPointParams {
            observer_position: DVec3::new(250.0, -100.0, 120.0),
            heading: 0.4,
            pitch: 0.5,
            far_clipping_distance: 3000.0,
            ..Default::default()
        })
        .unwrap();
        let stripes = StripeFactory::new(&vp, 0.05, 4096).create_resolution_stripes(800, 0.0, 1.0);

        assert!(stripes.len() > 2);
        assert_relative_eq!(stripes_area(&stripes), footprint_area(&vp), max_relative = 1e-6);
        for pair in stripes.windows(2) {
            assert!(pair[0].min_resolution() <= pair[1].min_resolution() + 1e-9);
        }
    }

    #[test]
    fn test_high_pitch_rings_cover_footprint() {
        let vp = ViewPoint::new(&ViewPointParams {
            pitch: 1.5,
            ..Default::default()
        })
        .unwrap();
        assert!(vp.is_near_clipping_plane_behind_view_point());

        let factory = StripeFactory::new(&vp, 0.01, 1024);
        let stripes = factory.create_resolution_stripes(512, 0.0, 1.0);

        // Center stripe at the finest resolution, then at least one ring of four
        assert!(stripes.len() >= 5);
        assert_relative_eq!(stripes[0].min_resolution(), 0.01);
        assert_relative_eq!(stripes[0].max_resolution(), 0.01);
        assert_relative_eq!(stripes[1].min_resolution(), stripes[4].min_resolution());
        assert_relative_eq!(stripes[1].min_resolution(), 0.02, max_relative = 1e-9);

        // No gaps and no overlaps
        assert_relative_eq!(stripes_area(&stripes), footprint_area(&vp), max_relative = 1e-6);

        // Every stripe stays inside the footprint envelope
        let fp = vp.footprint();
        let min_x = fp.ring().iter().map(|c| c.x).fold(f64::MAX, f64::min) - 1e-6;
        let max_x = fp.ring().iter().map(|c| c.x).fold(f64::MIN, f64::max) + 1e-6;
        for stripe in &stripes {
            let env = stripe.surface().envelope();
            assert!(env.min().x >= min_x && env.max().x <= max_x);
        }
    }

    #[test]
    fn test_high_pitch_with_coarse_minimum_falls_back_to_slices() {
        let vp = ViewPoint::new(&ViewPointParams {
            pitch: 1.5,
            ..Default::default()
        })
        .unwrap();
        // A center stripe of this resolution is wider than the whole footprint
        let stripes = StripeFactory::new(&vp, 10.0, 1024).create_resolution_stripes(512, 0.0, 1.0);
        assert!(!stripes.is_empty());
        assert_relative_eq!(stripes_area(&stripes), footprint_area(&vp), max_relative = 1e-6);
        for stripe in &stripes {
            assert!(stripe.min_resolution() >= 10.0 - 1e-9 || stripe.clamped_from().is_some());
        }
    }

    #[test]
    fn test_bbox_resolution_stripe() {
        let vp = widening_footprint();
        let factory = StripeFactory::new(&vp, 0.1, 1024);
        let envelope = Rect::new(Coord { x: 0.0, y: 0.0 }, Coord { x: 512.0, y: 256.0 });
        let stripes = factory.create_bbox_resolution_stripe(envelope, 512, 7.0, 1.0);

        assert_eq!(stripes.len(), 1);
        let stripe = &stripes[0];
        assert_relative_eq!(stripe.min_resolution(), 0.5 * utils::SQRT2, epsilon = 1e-12);
        assert_relative_eq!(stripe.max_resolution(), utils::SQRT2, epsilon = 1e-12);
        assert_eq!(stripe.surface().envelope(), envelope);
        assert_eq!(stripe.minimal_terrain_height(), 7.0);
    }

    #[test]
    fn test_side_line() {
        let line = SideLine::new(DVec3::new(500.0, 0.0, 0.0), DVec3::new(2000.0, 100.0, 0.0));
        assert_relative_eq!(line.x_at(50.0), 1250.0);
        assert_relative_eq!(line.x_at(-100.0), -1000.0);
        assert_relative_eq!(
            side_gradient_angle(DVec3::new(0.0, 0.0, 0.0), DVec3::new(0.0, 10.0, 0.0)),
            0.0
        );
    }
}

//! Observer position and orientation, and the ground footprint of its view frustum
//!
//! Two frames are used throughout the library:
//! - **world**: the coordinate reference system of the request
//! - **local**: origin at the observer's ground projection, `+y` along the horizontal view
//!   direction, `+x` to the right, `z` unchanged
//!
//! The stripe factory does all of its geometry in the local frame and converts the final
//! corners back to world coordinates.

use crate::{PartitionError, Result};
use glam::{DAffine3, DQuat, DVec3};

/// Rays flatter than this (descent per unit of view depth) are treated as never reaching the ground
const RAY_DESCENT_EPSILON: f64 = 1e-9;

/// Parameters of a perspective view, as found in a view request
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewPointParams {
    /// Eye position in world coordinates
    pub observer_position: DVec3,
    /// Rotation of the view direction about `z`, counter-clockwise from `+y`, in radians
    pub heading: f64,
    /// Downward tilt of the view direction in radians (0 = horizontal, π/2 = straight down)
    pub pitch: f64,
    /// Full horizontal angle of view in radians
    pub angle_of_view: f64,
    /// Image height divided by image width
    pub aspect: f64,
    /// Distance of the far clipping plane along the view direction
    pub far_clipping_distance: f64,
    /// Elevation of the ground plane the frustum is projected onto
    pub terrain_height: f64,
}

impl Default for ViewPointParams {
    fn default() -> Self {
        Self {
            observer_position: DVec3::new(0.0, 0.0, 100.0),
            heading: 0.0,
            pitch: std::f64::consts::FRAC_PI_4,
            angle_of_view: std::f64::consts::FRAC_PI_3,
            aspect: 0.75,
            far_clipping_distance: 10_000.0,
            terrain_height: 0.0,
        }
    }
}

/// The four ground-projected corners of the view frustum, in world coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Footprint {
    pub far_left: DVec3,
    pub far_right: DVec3,
    pub near_left: DVec3,
    pub near_right: DVec3,
}

impl Footprint {
    /// Corners in ring order: near left, near right, far right, far left
    pub fn ring(&self) -> [DVec3; 4] {
        [self.near_left, self.near_right, self.far_right, self.far_left]
    }

    fn is_finite(&self) -> bool {
        self.ring().iter().all(|c| c.is_finite())
    }
}

/// An observer with its view footprint and the transform into its local frame
#[derive(Debug, Clone)]
pub struct ViewPoint {
    observer_position: DVec3,
    heading: f64,
    terrain_height: f64,
    footprint: Footprint,
    near_behind: bool,
    local_to_world: DAffine3,
    world_to_local: DAffine3,
}

impl ViewPoint {
    /// Build a viewpoint by intersecting the frustum corner rays with the terrain plane
    ///
    /// Rays that do not reach the ground before the far clipping plane are cut at the far
    /// plane and projected down onto the terrain.
    ///
    /// # Errors
    ///
    /// Returns [`PartitionError::InvalidViewPoint`] for non-finite values, an observer at or
    /// below the terrain, an angle of view outside `(0, π)`, a non-positive aspect or far
    /// distance, or a view whose lower image edge never reaches the ground.
    pub fn new(params: &ViewPointParams) -> Result<Self> {
        let ViewPointParams {
            observer_position,
            heading,
            pitch,
            angle_of_view,
            aspect,
            far_clipping_distance,
            terrain_height,
        } = *params;

        let scalars = [
            heading,
            pitch,
            angle_of_view,
            aspect,
            far_clipping_distance,
            terrain_height,
        ];
        if !observer_position.is_finite() || scalars.iter().any(|v| !v.is_finite()) {
            return Err(invalid("view parameters must be finite"));
        }
        let height = observer_position.z - terrain_height;
        if height <= 0.0 {
            return Err(invalid(format!(
                "observer at z={} is not above the terrain at z={terrain_height}",
                observer_position.z
            )));
        }
        if angle_of_view <= 0.0 || angle_of_view >= std::f64::consts::PI {
            return Err(invalid(format!(
                "angle of view {angle_of_view} is outside (0, π)"
            )));
        }
        if aspect <= 0.0 || far_clipping_distance <= 0.0 {
            return Err(invalid("aspect and far clipping distance must be positive"));
        }
        if pitch.abs() > std::f64::consts::FRAC_PI_2 {
            return Err(invalid(format!("pitch {pitch} is outside [-π/2, π/2]")));
        }

        let tan_h = (angle_of_view / 2.0).tan();
        let tan_v = tan_h * aspect;
        let (sin_p, cos_p) = pitch.sin_cos();

        // View depth at which the lower (-1) or upper (+1) image edge meets the ground
        let edge_depth = |vertical: f64| -> Option<f64> {
            let descent = sin_p - vertical * tan_v * cos_p;
            (descent > RAY_DESCENT_EPSILON).then(|| height / descent)
        };

        let near_depth = edge_depth(-1.0)
            .ok_or_else(|| invalid("the lower image edge never reaches the ground"))?
            .min(far_clipping_distance);
        let far_depth = edge_depth(1.0)
            .unwrap_or(far_clipping_distance)
            .min(far_clipping_distance);
        if near_depth >= far_depth {
            return Err(invalid(format!(
                "far clipping distance {far_clipping_distance} ends before the ground is visible"
            )));
        }

        // Ground distance along the view direction, and half width across it
        let ground_edge = |depth: f64, vertical: f64| {
            let y = depth * (cos_p + vertical * tan_v * sin_p);
            (y, depth * tan_h)
        };
        let (near_y, near_half) = ground_edge(near_depth, -1.0);
        let (far_y, far_half) = ground_edge(far_depth, 1.0);

        let (local_to_world, world_to_local) = frames(observer_position, heading);
        let corner = |x: f64, y: f64| local_to_world.transform_point3(DVec3::new(x, y, terrain_height));
        let footprint = Footprint {
            far_left: corner(-far_half, far_y),
            far_right: corner(far_half, far_y),
            near_left: corner(-near_half, near_y),
            near_right: corner(near_half, near_y),
        };

        tracing::debug!(
            near_y,
            far_y,
            near_width = 2.0 * near_half,
            far_width = 2.0 * far_half,
            "Computed view footprint"
        );

        Ok(Self {
            observer_position,
            heading,
            terrain_height,
            footprint,
            near_behind: near_y < 0.0,
            local_to_world,
            world_to_local,
        })
    }

    /// Build a viewpoint around a footprint computed elsewhere
    ///
    /// The terrain height is taken from the near left corner. Along the view direction the
    /// far edge must not lie before the near edge.
    pub fn from_footprint(observer_position: DVec3, heading: f64, footprint: Footprint) -> Result<Self> {
        if !observer_position.is_finite() || !heading.is_finite() || !footprint.is_finite() {
            return Err(invalid("footprint and observer must be finite"));
        }
        if footprint.near_left == footprint.near_right || footprint.far_left == footprint.far_right {
            return Err(invalid("footprint edges must have a length"));
        }

        let (local_to_world, world_to_local) = frames(observer_position, heading);
        let near_y = world_to_local.transform_point3(footprint.near_left).y;
        let far_y = world_to_local.transform_point3(footprint.far_left).y;
        if near_y > far_y {
            return Err(invalid("the far edge must not lie before the near edge"));
        }

        Ok(Self {
            observer_position,
            heading,
            terrain_height: footprint.near_left.z,
            footprint,
            near_behind: near_y < 0.0,
            local_to_world,
            world_to_local,
        })
    }

    #[inline]
    pub fn observer_position(&self) -> DVec3 {
        self.observer_position
    }

    #[inline]
    pub fn heading(&self) -> f64 {
        self.heading
    }

    #[inline]
    pub fn terrain_height(&self) -> f64 {
        self.terrain_height
    }

    /// Ground-projected frustum corners in world coordinates
    #[inline]
    pub fn footprint(&self) -> &Footprint {
        &self.footprint
    }

    /// True when the view looks down so steeply that the near edge lies behind the observer
    #[inline]
    pub fn is_near_clipping_plane_behind_view_point(&self) -> bool {
        self.near_behind
    }

    /// Footprint corners converted into the local frame
    pub fn local_footprint(&self) -> Footprint {
        Footprint {
            far_left: self.to_local(self.footprint.far_left),
            far_right: self.to_local(self.footprint.far_right),
            near_left: self.to_local(self.footprint.near_left),
            near_right: self.to_local(self.footprint.near_right),
        }
    }

    #[inline]
    pub fn to_local(&self, world: DVec3) -> DVec3 {
        self.world_to_local.transform_point3(world)
    }

    #[inline]
    pub fn to_world(&self, local: DVec3) -> DVec3 {
        self.local_to_world.transform_point3(local)
    }
}

fn frames(observer_position: DVec3, heading: f64) -> (DAffine3, DAffine3) {
    let ground = DVec3::new(observer_position.x, observer_position.y, 0.0);
    let local_to_world = DAffine3::from_rotation_translation(DQuat::from_rotation_z(heading), ground);
    (local_to_world, local_to_world.inverse())
}

fn invalid(message: impl Into<String>) -> PartitionError {
    PartitionError::InvalidViewPoint(message.into())
}

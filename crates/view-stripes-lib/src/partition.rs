//! Request partition driver: configuration and the factory → splitter pipeline

use crate::utils;
use crate::{
    IntersectionPolicy, PartitionError, QuadTreeSplitter, ResolutionStripe, Result, StripeFactory,
    ViewPoint,
};
use geo::{Coord, Rect};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// How the view footprint is turned into request regions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SplittingMode {
    /// Resolution stripes approximated by a quadtree and merged into request quads
    #[default]
    Quadtree,
    /// One stripe for the request bounding box
    BoundingBox,
}

/// Service-level settings of the partitioning
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PartitionConfig {
    /// Largest request width or height in pixels (usually the texture size limit)
    pub max_request_size: u32,
    /// Widest view the service renders, in pixels
    pub max_view_width: u32,
    /// Quadtree leaves are only merged if there are more than this many
    pub quad_merge_count: usize,
    /// Fraction each request quad is enlarged by on every side
    pub extend_request_percentage: f64,
    /// Prefer finer data over fewer requests when a quad spans several stripes
    pub request_quality_preferred: bool,
    pub splitting_mode: SplittingMode,
}

impl Default for PartitionConfig {
    fn default() -> Self {
        Self {
            max_request_size: 1024,
            max_view_width: 1000,
            quad_merge_count: 10,
            extend_request_percentage: 0.0,
            request_quality_preferred: true,
            splitting_mode: SplittingMode::Quadtree,
        }
    }
}

impl PartitionConfig {
    /// Check the values a caller supplied
    pub fn validate(&self) -> Result<()> {
        if self.max_request_size == 0 {
            return Err(PartitionError::InvalidConfig(
                "max_request_size must be positive".to_string(),
            ));
        }
        if self.max_view_width == 0 {
            return Err(PartitionError::InvalidConfig(
                "max_view_width must be positive".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.extend_request_percentage) {
            return Err(PartitionError::InvalidConfig(format!(
                "extend_request_percentage must be a fraction in [0, 1], got {}",
                self.extend_request_percentage
            )));
        }
        Ok(())
    }

    /// Set the request extension from a percentage, clamped to `[0, 100]`
    pub fn set_extend_request_percentage(&mut self, percent: f64) {
        let percent = if percent.is_nan() { 0.0 } else { percent.clamp(0.0, 100.0) };
        self.extend_request_percentage = percent / 100.0;
    }

    /// Finest resolution the factory may assign: `max_view_width / max_request_size`
    ///
    /// Falls back to 1.0 when the ratio is not finite, negative or above one.
    pub fn min_scale_resolution(&self) -> f64 {
        let ratio = f64::from(self.max_view_width) / f64::from(self.max_request_size);
        if !ratio.is_finite() || ratio < 0.0 || ratio > 1.0 {
            tracing::debug!(ratio, "Minimal scale resolution out of range, using 1.0");
            return 1.0;
        }
        ratio
    }

    pub fn policy(&self) -> IntersectionPolicy {
        if self.request_quality_preferred {
            IntersectionPolicy::Quality
        } else {
            IntersectionPolicy::Fast
        }
    }
}

/// Per-request parameters of one view
#[derive(Debug, Clone, PartialEq)]
pub struct ViewRequest {
    /// Width of the requested image in pixels
    pub image_width: u32,
    /// Terrain height used when no elevation data is available
    pub minimal_height: f64,
    /// Height exaggeration of the elevation model
    pub scale: f64,
    /// Explicit request area, used in [`SplittingMode::BoundingBox`]
    pub bounding_box: Option<Rect<f64>>,
}

impl Default for ViewRequest {
    fn default() -> Self {
        Self {
            image_width: 800,
            minimal_height: 0.0,
            scale: 1.0,
            bounding_box: None,
        }
    }
}

/// Partition the view of `view_point` into request regions
///
/// In quadtree mode the result is a list of axis-aligned request quads, in bounding box mode a
/// single stripe. An empty list means nothing could be built; the reasons are logged.
pub fn create_request_boxes(
    view_point: &ViewPoint,
    request: &ViewRequest,
    config: &PartitionConfig,
) -> Vec<ResolutionStripe> {
    let factory = StripeFactory::new(
        view_point,
        config.min_scale_resolution(),
        config.max_request_size,
    );

    match config.splitting_mode {
        SplittingMode::BoundingBox => {
            let envelope = request
                .bounding_box
                .unwrap_or_else(|| footprint_envelope(view_point));
            factory.create_bbox_resolution_stripe(
                envelope,
                request.image_width,
                request.minimal_height,
                request.scale,
            )
        }
        SplittingMode::Quadtree => {
            let stripes = factory.create_resolution_stripes(
                request.image_width,
                request.minimal_height,
                request.scale,
            );
            log_stripes("The request stripes (in WKT) before the quadtree", &stripes);

            let splitter = QuadTreeSplitter::new(
                &stripes,
                request.image_width,
                config.policy(),
                config.max_request_size,
            );
            let quads = splitter.get_request_quads(
                config.extend_request_percentage,
                config.quad_merge_count,
            );
            log_stripes("The request stripes (in WKT) after the quadtree", &quads);

            tracing::info!(
                stripes = stripes.len(),
                quads = quads.len(),
                "Partitioned view into request quads"
            );
            quads
        }
    }
}

fn footprint_envelope(view_point: &ViewPoint) -> Rect<f64> {
    tracing::warn!("Bounding box splitting without a bounding box, using the view footprint");
    let [first, rest @ ..] = view_point.footprint().ring();
    let to_coord = |v: glam::DVec3| Coord { x: v.x, y: v.y };
    rest.iter().fold(Rect::new(to_coord(first), to_coord(first)), |acc, &corner| {
        utils::merge_rects(acc, Rect::new(to_coord(corner), to_coord(corner)))
    })
}

fn log_stripes(title: &str, stripes: &[ResolutionStripe]) {
    if tracing::enabled!(tracing::Level::DEBUG) {
        let wkt: Vec<String> = stripes.iter().map(ResolutionStripe::to_wkt).collect();
        tracing::debug!("{title}:\n{}", wkt.join("\n"));
    }
}

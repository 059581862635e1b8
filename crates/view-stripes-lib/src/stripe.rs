//! Resolution stripes: ground regions tagged with a near and far map resolution

use crate::Surface;
use crate::utils::{self, DEFAULT_PIXEL_SIZE, RESOLUTION_TOLERANCE};
use std::cmp::Ordering;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Request dimensions above this many pixels are reported as invalid
const REQUEST_DIMENSION_SANITY_LIMIT: f64 = 8000.0;

/// A ground region with the resolution range it should be requested at
///
/// After the stripe factory the surface follows the footprint (trapezoids and rings),
/// after the quadtree splitter it is an axis-aligned box that maps to one backend request.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ResolutionStripe {
    /// Region covered by this stripe
    surface: Surface,
    /// Coarsest resolution, at the edge farthest from the viewer
    max_resolution: f64,
    /// Finest resolution, at the edge nearest to the viewer
    min_resolution: f64,
    /// Terrain height used when no elevation data can be retrieved
    minimal_terrain_height: f64,
    /// Height exaggeration of the elevation model (1.0 = none)
    scale: f64,
    /// Largest request width or height in pixels
    max_request_size: u32,
    /// Requested min resolution if it had to be replaced to respect `max_request_size`
    clamped_from: Option<f64>,
}

impl ResolutionStripe {
    /// Create a stripe, clamping the resolutions to the maximum request size
    ///
    /// If requesting the envelope at `min_resolution` would need more than
    /// `max_request_size` pixels in either direction, both resolutions are replaced by
    /// `max(height, width) / max_request_size`.
    pub fn new(
        surface: Surface,
        max_resolution: f64,
        min_resolution: f64,
        minimal_terrain_height: f64,
        scale: f64,
        max_request_size: u32,
    ) -> Self {
        let envelope = surface.envelope();
        let (request_height, request_width) = utils::request_pixels(envelope, min_resolution);
        let limit = f64::from(max_request_size);

        let oversized = |pixels: f64| !pixels.is_finite() || pixels < 0.0 || pixels > limit;

        let (max_resolution, min_resolution, clamped_from) =
            if oversized(request_height) || oversized(request_width) {
                let fixed = if request_height > request_width {
                    envelope.height()
                } else {
                    envelope.width()
                } / limit;
                tracing::debug!(
                    requested = min_resolution,
                    fixed,
                    request_width,
                    request_height,
                    max_request_size,
                    "Clamping stripe resolution to the maximum request size"
                );
                (fixed, fixed, Some(min_resolution))
            } else {
                (max_resolution, min_resolution, None)
            };

        Self {
            surface,
            max_resolution,
            min_resolution,
            minimal_terrain_height,
            scale,
            max_request_size,
            clamped_from,
        }
    }

    #[inline]
    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    /// Largest resolution value: the coarsest map resolution, farthest from the viewer
    #[inline]
    pub fn max_resolution(&self) -> f64 {
        self.max_resolution
    }

    /// Smallest resolution value: the finest map resolution, nearest to the viewer
    #[inline]
    pub fn min_resolution(&self) -> f64 {
        self.min_resolution
    }

    #[inline]
    pub fn minimal_terrain_height(&self) -> f64 {
        self.minimal_terrain_height
    }

    #[inline]
    pub fn scale(&self) -> f64 {
        self.scale
    }

    #[inline]
    pub fn max_request_size(&self) -> u32 {
        self.max_request_size
    }

    /// The requested min resolution, if the constructor had to replace it
    #[inline]
    pub fn clamped_from(&self) -> Option<f64> {
        self.clamped_from
    }

    /// Max resolution as a scale denominator (always positive)
    pub fn max_resolution_as_scale_denominator(&self) -> f64 {
        self.max_resolution.abs() / DEFAULT_PIXEL_SIZE
    }

    /// Min resolution as a scale denominator (always positive)
    pub fn min_resolution_as_scale_denominator(&self) -> f64 {
        self.min_resolution.abs() / DEFAULT_PIXEL_SIZE
    }

    /// Request width in pixels for the envelope of this stripe
    ///
    /// Returns `None` if the value is not representable as a sane image size.
    pub fn request_width_for_bbox(&self) -> Option<u32> {
        let (_, width) = utils::request_pixels(self.surface.envelope(), self.min_resolution);
        Self::sane_dimension(width, "width")
    }

    /// Request height in pixels for the envelope of this stripe
    ///
    /// Returns `None` if the value is not representable as a sane image size.
    pub fn request_height_for_bbox(&self) -> Option<u32> {
        let (height, _) = utils::request_pixels(self.surface.envelope(), self.min_resolution);
        Self::sane_dimension(height, "height")
    }

    fn sane_dimension(pixels: f64, dimension: &str) -> Option<u32> {
        if !pixels.is_finite() || pixels < 0.0 || pixels > REQUEST_DIMENSION_SANITY_LIMIT {
            tracing::debug!(pixels, dimension, "Request dimension is out of range");
            return None;
        }
        Some(pixels as u32)
    }

    /// Order by max resolution, treating values closer than 1e-4 as equal
    ///
    /// Near (fine) stripes sort before far (coarse) ones.
    pub fn cmp_by_max_resolution(&self, other: &ResolutionStripe) -> Ordering {
        if (other.max_resolution - self.max_resolution).abs() < RESOLUTION_TOLERANCE {
            Ordering::Equal
        } else if self.max_resolution < other.max_resolution {
            Ordering::Less
        } else {
            Ordering::Greater
        }
    }

    /// Well-known-text representation of the surface
    pub fn to_wkt(&self) -> String {
        self.surface.to_wkt()
    }
}

impl fmt::Display for ResolutionStripe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Resolution: {} - {}",
            self.min_resolution, self.max_resolution
        )?;
        if let Some(requested) = self.clamped_from {
            writeln!(f, "Fixed resolution: {requested}")?;
        }
        write!(f, "Surface: {}", self.surface.to_wkt())
    }
}

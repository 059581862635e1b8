//! Ground-plane geometry used by stripes and request quads
//!
//! A [`Surface`] is a closed polygon ring lying on a plane of constant elevation.
//! After the stripe factory it is usually a trapezoid, after the quadtree splitter
//! an axis-aligned box. Envelopes are plain `geo::Rect` values.

use crate::{PartitionError, Result};
use geo::{Area, BoundingRect, Centroid, Coord, Intersects, LineString, Point, Polygon, Rect};
use std::fmt::Write;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A closed polygon ring at a fixed elevation
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Surface {
    /// Ground-plane outline
    polygon: Polygon<f64>,
    /// Cached bounding box of the outline
    envelope: Rect<f64>,
    /// Elevation of every ring position
    elevation: f64,
}

impl Surface {
    /// Create a surface from the positions of its ring
    ///
    /// The ring is closed automatically. Fails when fewer than three positions are
    /// given or when any ordinate is not finite.
    pub fn new(ring: Vec<Coord<f64>>, elevation: f64) -> Result<Self> {
        if ring.len() < 3 {
            return Err(PartitionError::InvalidGeometry(format!(
                "a surface ring needs at least 3 positions, got {}",
                ring.len()
            )));
        }
        if ring.iter().any(|c| !c.x.is_finite() || !c.y.is_finite()) || !elevation.is_finite() {
            return Err(PartitionError::InvalidGeometry(
                "surface ring contains non-finite ordinates".to_string(),
            ));
        }

        let polygon = Polygon::new(LineString::from(ring), vec![]);
        let envelope = polygon.bounding_rect().ok_or_else(|| {
            PartitionError::InvalidGeometry("surface ring has no bounding box".to_string())
        })?;

        Ok(Self {
            polygon,
            envelope,
            elevation,
        })
    }

    /// Create an axis-aligned surface covering `rect`
    pub fn from_rect(rect: Rect<f64>, elevation: f64) -> Result<Self> {
        let min = rect.min();
        let max = rect.max();
        Self::new(
            vec![
                Coord { x: min.x, y: min.y },
                Coord { x: max.x, y: min.y },
                Coord { x: max.x, y: max.y },
                Coord { x: min.x, y: max.y },
            ],
            elevation,
        )
    }

    #[inline]
    pub fn polygon(&self) -> &Polygon<f64> {
        &self.polygon
    }

    /// Axis-aligned bounding box of the ring
    #[inline]
    pub fn envelope(&self) -> Rect<f64> {
        self.envelope
    }

    #[inline]
    pub fn elevation(&self) -> f64 {
        self.elevation
    }

    /// Unsigned ground area
    #[inline]
    pub fn area(&self) -> f64 {
        self.polygon.unsigned_area()
    }

    /// Centroid of the outline, or of the envelope for zero-area rings
    pub fn centroid(&self) -> Point<f64> {
        self.polygon
            .centroid()
            .unwrap_or_else(|| Point::from(self.envelope.center()))
    }

    /// True if the two outlines share at least one point (touching counts)
    #[inline]
    pub fn intersects(&self, other: &Surface) -> bool {
        self.envelope.intersects(&other.envelope) && self.polygon.intersects(&other.polygon)
    }

    /// True if the outline shares at least one point with `rect`
    #[inline]
    pub fn intersects_rect(&self, rect: &Rect<f64>) -> bool {
        self.envelope.intersects(rect) && self.polygon.intersects(rect)
    }

    /// Well-known-text export, e.g. `POLYGON Z ((0 0 10, 1 0 10, 1 1 10, 0 0 10))`
    pub fn to_wkt(&self) -> String {
        let mut wkt = String::from("POLYGON Z ((");
        for (i, coord) in self.polygon.exterior().coords().enumerate() {
            if i > 0 {
                wkt.push_str(", ");
            }
            let _ = write!(wkt, "{} {} {}", coord.x, coord.y, self.elevation);
        }
        wkt.push_str("))");
        wkt
    }
}

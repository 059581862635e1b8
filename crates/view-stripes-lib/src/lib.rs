//! View Stripes Library - Request partitioning for perspective terrain views
//!
//! This library decides which ground regions a perspective view service has to request
//! from its data backends, and at which map resolution. Regions close to the viewer get
//! fine resolutions, regions far away get progressively coarser ones.
//!
//! # Architecture
//!
//! - **[`ViewPoint`]**: Observer position and orientation, with its ground footprint
//! - **[`StripeFactory`]**: Splits the footprint into [`ResolutionStripe`]s, doubling the
//!   resolution per stripe (or concentric rings when looking steeply down)
//! - **[`QuadTreeSplitter`]**: Approximates the stripes with a quadtree and merges the
//!   leaves into axis-aligned request quads bounded by the maximum request size
//! - **[`create_request_boxes`]**: Runs the whole pipeline for one view request
//!
//! # Data Flow
//!
//! viewpoint → stripe factory → resolution stripes → quadtree → merged request quads
//!
//! Partitioning never fails: geometry that cannot be built is logged and skipped, so the
//! worst case is a coarser or more fragmented set of request quads.

mod factory;
mod geometry;
mod partition;
mod splitter;
mod stripe;
pub mod utils;
mod viewpoint;

// Public API exports
pub use factory::StripeFactory;
pub use geometry::Surface;
pub use partition::{PartitionConfig, SplittingMode, ViewRequest, create_request_boxes};
pub use splitter::{IntersectionPolicy, QuadTreeSplitter};
pub use stripe::ResolutionStripe;
pub use viewpoint::{Footprint, ViewPoint, ViewPointParams};

/// Error types for the partitioning library
#[derive(Debug, thiserror::Error)]
pub enum PartitionError {
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("Invalid viewpoint: {0}")]
    InvalidViewPoint(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, PartitionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_exports() {
        // Verify that all public types are accessible
        let _: fn() -> PartitionConfig = PartitionConfig::default;
        let _: fn(&ViewPoint, &ViewRequest, &PartitionConfig) -> Vec<ResolutionStripe> =
            create_request_boxes;
    }

    #[test]
    fn test_error_messages() {
        let err = PartitionError::InvalidGeometry("empty ring".to_string());
        assert_eq!(err.to_string(), "Invalid geometry: empty ring");
    }
}

//! Quadtree approximation of resolution stripes, merged into request quads
//!
//! The union envelope of all stripes is subdivided until every leaf is fine enough for the
//! stripe it intersects and small enough for a single request. Leaves with the same
//! resolution are then merged back into larger axis-aligned boxes wherever the merged box
//! still fits into one request.

use crate::utils::{self, ADJACENCY_TOLERANCE, MERGE_TOLERANCE};
use crate::{ResolutionStripe, Surface};
use geo::{Coord, Rect};
use glam::DVec3;
use std::cmp::{Ordering, Reverse};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Maximum depth of the quadtree to prevent runaway subdivision
const MAX_DEPTH: u32 = 24;

/// A son is subdivided further while its resolution is at least this share of its stripe's
const DESCEND_FACTOR: f64 = 0.95;

/// Leaves whose min resolutions differ by less than this share a merge bucket
const BUCKET_TOLERANCE: f64 = 0.00001;

/// Grid used to turn coordinates into sort keys with a total order
const SORT_QUANTUM: f64 = 0.00001;

/// Below this the minimal resolution is replaced by a geometric mean of the max resolution
const ALMOST_ZERO_RESOLUTION: f64 = 0.00001;

type NodeId = usize;

/// Which intersecting stripe decides the resolution of a quadtree node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum IntersectionPolicy {
    /// Stripe with the smallest min resolution (finer data, more requests)
    #[default]
    Quality,
    /// Stripe with the smallest max resolution (coarser data, fewer requests)
    Fast,
}

impl IntersectionPolicy {
    /// Pick the stripe that decides the resolution among those intersecting `quad`
    ///
    /// On ties the first stripe in `stripes` wins.
    fn best_intersection<'s>(
        self,
        stripes: &'s [&'s ResolutionStripe],
        quad: &Rect<f64>,
    ) -> Option<&'s ResolutionStripe> {
        let key = |stripe: &ResolutionStripe| match self {
            IntersectionPolicy::Quality => stripe.min_resolution(),
            IntersectionPolicy::Fast => stripe.max_resolution(),
        };
        let mut best: Option<&ResolutionStripe> = None;
        for &stripe in stripes {
            if stripe.surface().intersects_rect(quad)
                && best.is_none_or(|current| key(stripe) < key(current))
            {
                best = Some(stripe);
            }
        }
        best
    }

    /// Resolution of the chosen stripe that the quad has to reach
    fn target_resolution(self, stripe: &ResolutionStripe) -> f64 {
        match self {
            IntersectionPolicy::Quality => stripe.min_resolution(),
            IntersectionPolicy::Fast => stripe.max_resolution(),
        }
    }
}

/// A quadtree node, stored in the splitter's arena
#[derive(Debug, Clone)]
enum QuadNode {
    Leaf {
        bbox: Rect<f64>,
        max_resolution: f64,
        min_resolution: f64,
    },
    /// Sons in the order lower left, lower right, upper left, upper right
    Internal {
        bbox: Rect<f64>,
        sons: [Option<NodeId>; 4],
    },
}

impl QuadNode {
    fn bbox(&self) -> Rect<f64> {
        match self {
            QuadNode::Leaf { bbox, .. } | QuadNode::Internal { bbox, .. } => *bbox,
        }
    }
}

/// A leaf (or a box of merged leaves) taking part in the merge pass
#[derive(Debug, Clone, Copy, PartialEq)]
struct MergeNode {
    bbox: Rect<f64>,
    max_resolution: f64,
    min_resolution: f64,
}

/// Sort and merge direction of the merge pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    /// Columns: same x origin and width, stacked along y
    X,
    /// Rows: same y origin and height, side by side along x
    Y,
}

impl Axis {
    fn perpendicular(self) -> Self {
        match self {
            Axis::X => Axis::Y,
            Axis::Y => Axis::X,
        }
    }

    fn position(self, rect: &Rect<f64>) -> f64 {
        match self {
            Axis::X => rect.min().x,
            Axis::Y => rect.min().y,
        }
    }

    fn length(self, rect: &Rect<f64>) -> f64 {
        match self {
            Axis::X => rect.width(),
            Axis::Y => rect.height(),
        }
    }

    /// Lower and upper bound along the other axis
    fn perpendicular_extent(self, rect: &Rect<f64>) -> (f64, f64) {
        match self {
            Axis::X => (rect.min().y, rect.max().y),
            Axis::Y => (rect.min().x, rect.max().x),
        }
    }
}

/// Subdivides the union of a set of resolution stripes and merges the leaves into request quads
#[derive(Debug, Clone)]
pub struct QuadTreeSplitter {
    nodes: Vec<QuadNode>,
    root: Option<NodeId>,
    minimal_resolution: f64,
    minimal_terrain_height: f64,
    scale: f64,
    max_request_size: u32,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl QuadTreeSplitter {
    /// Build the quadtree for `stripes`
    ///
    /// # Arguments
    /// * `stripes` - Stripes to approximate, usually from the stripe factory
    /// * `image_width` - Width of the requested view in pixels
    /// * `policy` - How to pick the resolution when a node intersects several stripes
    /// * `max_request_size` - Largest request width or height in pixels
    pub fn new(
        stripes: &[ResolutionStripe],
        image_width: u32,
        policy: IntersectionPolicy,
        max_request_size: u32,
    ) -> Self {
        #[cfg(feature = "profiling")]
        profiling::scope!("splitter::new");

        let Some(first) = stripes.first() else {
            tracing::debug!("No resolution stripes, the quadtree stays empty");
            return Self {
                nodes: Vec::new(),
                root: None,
                minimal_resolution: 0.0,
                minimal_terrain_height: 0.0,
                scale: 1.0,
                max_request_size,
            };
        };

        // Ties in the intersection search go to the stripe with the smaller max resolution
        let mut ordered: Vec<&ResolutionStripe> = stripes.iter().collect();
        ordered.sort_by(|a, b| a.max_resolution().total_cmp(&b.max_resolution()));

        let mut bbox = first.surface().envelope();
        let mut minimal_resolution = f64::MAX;
        let mut max_resolution = f64::MIN_POSITIVE;
        for stripe in stripes {
            bbox = utils::merge_rects(bbox, stripe.surface().envelope());
            minimal_resolution = minimal_resolution.min(stripe.min_resolution());
            max_resolution = max_resolution.max(stripe.max_resolution());
        }
        tracing::debug!(minimal_resolution, max_resolution, "Quadtree resolution range");

        if minimal_resolution.abs() < ALMOST_ZERO_RESOLUTION {
            minimal_resolution = max_resolution.powf(1.0 / stripes.len() as f64);
            tracing::debug!(
                minimal_resolution,
                "Minimal resolution is almost zero, using the geometric mean of the max resolution"
            );
        }

        let mut splitter = Self {
            nodes: Vec::new(),
            root: None,
            minimal_resolution,
            minimal_terrain_height: first.minimal_terrain_height(),
            scale: first.scale(),
            max_request_size,
        };

        let z = splitter.minimal_terrain_height;
        let min = DVec3::new(bbox.min().x, bbox.min().y, z);
        let diagonal = DVec3::new(bbox.max().x, bbox.max().y, z);
        let upper_left = DVec3::new(bbox.min().x, bbox.max().y, z);
        let image_width = f64::from(image_width.max(1));
        let quad_resolution = utils::calc_scale_of_vector(min, diagonal, image_width)
            .max(utils::calc_scale_of_vector(min, upper_left, image_width));

        let root = splitter.push_node(QuadNode::Leaf {
            bbox,
            max_resolution,
            min_resolution: minimal_resolution,
        });
        splitter.root = Some(root);
        splitter.create_tree(root, quad_resolution, &ordered, policy);

        tracing::debug!(
            nodes = splitter.nodes.len(),
            leaves = splitter.leaf_count(),
            "Built request quadtree"
        );
        splitter
    }

    /// Resolution below which no node is subdivided
    #[inline]
    pub fn minimal_resolution(&self) -> f64 {
        self.minimal_resolution
    }

    /// Number of leaves in the tree (0 if it is empty)
    pub fn leaf_count(&self) -> usize {
        self.leaves().len()
    }

    /// Well-known-text of every leaf, in tree order
    pub fn leaves_as_wkt(&self) -> Vec<String> {
        self.leaves()
            .iter()
            .filter_map(|leaf| Surface::from_rect(leaf.bbox, self.minimal_terrain_height).ok())
            .map(|surface| surface.to_wkt())
            .collect()
    }

    /// Merge the leaves into request quads
    ///
    /// # Arguments
    /// * `extra_request_percentage` - Fraction of its size each quad is enlarged by on every
    ///   side, to close gaps between neighbouring requests
    /// * `quad_merge_count` - Leaves are only merged if there are more than this many
    pub fn get_request_quads(
        &self,
        extra_request_percentage: f64,
        quad_merge_count: usize,
    ) -> Vec<ResolutionStripe> {
        #[cfg(feature = "profiling")]
        profiling::scope!("splitter::get_request_quads");

        let leaves = self.leaves();
        if leaves.is_empty() {
            return Vec::new();
        }

        let merge = leaves.len() > quad_merge_count;
        if !merge {
            tracing::debug!(
                leaves = leaves.len(),
                quad_merge_count,
                "Not merging, fewer leaves than the merge count"
            );
        }
        if tracing::enabled!(tracing::Level::DEBUG) {
            tracing::debug!("Quadtree leaves:\n{}", self.leaves_as_wkt().join("\n"));
        }

        let mut result = Vec::with_capacity(leaves.len());
        for (resolution, nodes) in bucket_by_resolution(&leaves) {
            let quads = if merge {
                let by_x = merge_and_sort(&nodes, Axis::X, self.max_request_size);
                let by_y = merge_and_sort(&nodes, Axis::Y, self.max_request_size);
                tracing::debug!(
                    resolution,
                    leaves = nodes.len(),
                    by_x = by_x.len(),
                    by_y = by_y.len(),
                    "Merged resolution bucket"
                );
                // The perpendicular pass usually finds some more merges
                if by_x.len() < by_y.len() {
                    merge_and_sort(&by_x, Axis::Y, self.max_request_size)
                } else {
                    merge_and_sort(&by_y, Axis::X, self.max_request_size)
                }
            } else {
                nodes
            };

            result.extend(
                quads
                    .into_iter()
                    .filter_map(|quad| self.create_request_stripe(quad, extra_request_percentage)),
            );
        }
        result
    }

    fn push_node(&mut self, node: QuadNode) -> NodeId {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    /// Attach `son` to `father`, turning the father into an internal node if needed
    fn add_son(&mut self, father: NodeId, slot: usize, son: NodeId) {
        if let QuadNode::Leaf { bbox, .. } = self.nodes[father] {
            self.nodes[father] = QuadNode::Internal {
                bbox,
                sons: [None; 4],
            };
        }
        if let QuadNode::Internal { sons, .. } = &mut self.nodes[father] {
            sons[slot] = Some(son);
        }
    }

    /// Subdivide from `root` until every node is fine and small enough
    fn create_tree(
        &mut self,
        root: NodeId,
        quad_resolution: f64,
        stripes: &[&ResolutionStripe],
        policy: IntersectionPolicy,
    ) {
        let limit = f64::from(self.max_request_size);
        let mut work = vec![(root, quad_resolution, 0u32)];

        while let Some((father, quad_resolution, depth)) = work.pop() {
            let sons_resolution = quad_resolution * 0.5;
            if sons_resolution < self.minimal_resolution {
                continue;
            }
            if depth >= MAX_DEPTH {
                tracing::warn!(depth, "Quadtree reached its maximum depth");
                continue;
            }

            for (slot, quad) in quadrants(self.nodes[father].bbox()).into_iter().enumerate() {
                let Some(stripe) = policy.best_intersection(stripes, &quad) else {
                    continue;
                };

                let son = self.push_node(QuadNode::Leaf {
                    bbox: quad,
                    max_resolution: stripe.max_resolution(),
                    min_resolution: stripe.min_resolution(),
                });
                self.add_son(father, slot, son);

                let target_resolution = policy.target_resolution(stripe);
                let (request_height, request_width) =
                    utils::request_pixels(quad, stripe.min_resolution());
                if request_height > limit
                    || request_width > limit
                    || sons_resolution >= target_resolution * DESCEND_FACTOR
                {
                    work.push((son, sons_resolution, depth + 1));
                }
            }
        }
    }

    /// Leaves in depth-first order, sons visited lower left to upper right
    fn leaves(&self) -> Vec<MergeNode> {
        let mut leaves = Vec::new();
        let mut stack: Vec<NodeId> = self.root.into_iter().collect();
        while let Some(id) = stack.pop() {
            match &self.nodes[id] {
                QuadNode::Leaf {
                    bbox,
                    max_resolution,
                    min_resolution,
                } => leaves.push(MergeNode {
                    bbox: *bbox,
                    max_resolution: *max_resolution,
                    min_resolution: *min_resolution,
                }),
                QuadNode::Internal { sons, .. } => {
                    stack.extend(sons.iter().rev().flatten());
                }
            }
        }
        leaves
    }

    /// Enlarge a merged quad and turn it into a request stripe
    fn create_request_stripe(
        &self,
        quad: MergeNode,
        extra_request_percentage: f64,
    ) -> Option<ResolutionStripe> {
        let bbox = utils::expand_rect(quad.bbox, extra_request_percentage);
        let (min_resolution, max_resolution) = if quad.min_resolution > quad.max_resolution {
            (quad.max_resolution, quad.min_resolution)
        } else {
            (quad.min_resolution, quad.max_resolution)
        };

        match Surface::from_rect(bbox, self.minimal_terrain_height) {
            Ok(surface) => Some(ResolutionStripe::new(
                surface,
                max_resolution,
                min_resolution,
                self.minimal_terrain_height,
                self.scale,
                self.max_request_size,
            )),
            Err(e) => {
                tracing::warn!(error = %e, "Skipping request quad");
                None
            }
        }
    }
}

/// The four quadrants of `rect`: lower left, lower right, upper left, upper right
fn quadrants(rect: Rect<f64>) -> [Rect<f64>; 4] {
    let min = rect.min();
    let half_width = rect.width() * 0.5;
    let half_height = rect.height() * 0.5;
    let mid_x = min.x + half_width;
    let mid_y = min.y + half_height;
    let max_x = min.x + 2.0 * half_width;
    let max_y = min.y + 2.0 * half_height;

    [
        Rect::new(Coord { x: min.x, y: min.y }, Coord { x: mid_x, y: mid_y }),
        Rect::new(Coord { x: mid_x, y: min.y }, Coord { x: max_x, y: mid_y }),
        Rect::new(Coord { x: min.x, y: mid_y }, Coord { x: mid_x, y: max_y }),
        Rect::new(Coord { x: mid_x, y: mid_y }, Coord { x: max_x, y: max_y }),
    ]
}

/// Group leaves by min resolution, keeping the order in which resolutions first appear
fn bucket_by_resolution(leaves: &[MergeNode]) -> Vec<(f64, Vec<MergeNode>)> {
    let mut buckets: Vec<(f64, Vec<MergeNode>)> = Vec::new();
    for leaf in leaves {
        match buckets
            .iter_mut()
            .find(|(resolution, _)| (resolution - leaf.min_resolution).abs() < BUCKET_TOLERANCE)
        {
            Some((_, nodes)) => nodes.push(*leaf),
            None => buckets.push((leaf.min_resolution, vec![*leaf])),
        }
    }
    buckets
}

fn sort_key(value: f64) -> i64 {
    (value / SORT_QUANTUM).round() as i64
}

/// Order by position along `axis`, then by length; equal boxes with the smaller
/// perpendicular position sort as greater
fn compare_nodes(a: &MergeNode, b: &MergeNode, axis: Axis) -> Ordering {
    let key = |node: &MergeNode| {
        (
            sort_key(axis.position(&node.bbox)),
            sort_key(axis.length(&node.bbox)),
            Reverse(sort_key(axis.perpendicular().position(&node.bbox))),
        )
    };
    key(a).cmp(&key(b))
}

/// True if both boxes share origin and length along `axis` and touch across it
fn can_merge(a: &MergeNode, b: &MergeNode, axis: Axis) -> bool {
    if (axis.position(&a.bbox) - axis.position(&b.bbox)).abs() >= MERGE_TOLERANCE
        || (axis.length(&a.bbox) - axis.length(&b.bbox)).abs() >= MERGE_TOLERANCE
    {
        return false;
    }
    let (a_min, a_max) = axis.perpendicular_extent(&a.bbox);
    let (b_min, b_max) = axis.perpendicular_extent(&b.bbox);
    (a_max - b_min).abs() < ADJACENCY_TOLERANCE || (a_min - b_max).abs() < ADJACENCY_TOLERANCE
}

/// Sort `nodes` along `axis` and merge neighbours until no pass finds another merge
///
/// A run starts at one node and absorbs the following nodes as long as they can merge
/// with that node and the merged box still fits into one request at its min resolution.
/// The merged box keeps the resolutions of the node that started the run.
fn merge_and_sort(nodes: &[MergeNode], axis: Axis, max_request_size: u32) -> Vec<MergeNode> {
    let limit = f64::from(max_request_size);
    let mut current = nodes.to_vec();
    current.sort_by(|a, b| compare_nodes(a, b, axis));

    loop {
        let mut merged_any = false;
        let mut result = Vec::with_capacity(current.len());
        let mut iter = current.into_iter().peekable();

        while let Some(first) = iter.next() {
            let mut envelope = first.bbox;
            while let Some(second) = iter.peek() {
                if !can_merge(&first, second, axis) {
                    break;
                }
                let candidate = utils::merge_rects(envelope, second.bbox);
                let (request_height, request_width) =
                    utils::request_pixels(candidate, first.min_resolution);
                if request_height >= limit || request_width >= limit {
                    tracing::debug!(
                        request_width,
                        request_height,
                        max_request_size,
                        "Not merging quads, the merged request would be too large"
                    );
                    break;
                }
                envelope = candidate;
                merged_any = true;
                iter.next();
            }
            result.push(MergeNode {
                bbox: envelope,
                ..first
            });
        }

        current = result;
        if !merged_any {
            return current;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{StripeFactory, ViewPoint, ViewPointParams};
    use approx::assert_relative_eq;

    fn rect(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Rect<f64> {
        Rect::new(Coord { x: min_x, y: min_y }, Coord { x: max_x, y: max_y })
    }

    fn stripe(bbox: Rect<f64>, max_resolution: f64, min_resolution: f64) -> ResolutionStripe {
        ResolutionStripe::new(
            Surface::from_rect(bbox, 0.0).unwrap(),
            max_resolution,
            min_resolution,
            0.0,
            1.0,
            1024,
        )
    }

    fn node(bbox: Rect<f64>) -> MergeNode {
        MergeNode {
            bbox,
            max_resolution: 1.0,
            min_resolution: 1.0,
        }
    }

    fn contains(bbox: &Rect<f64>, x: f64, y: f64) -> bool {
        let eps = 1e-6;
        x >= bbox.min().x - eps && x <= bbox.max().x + eps && y >= bbox.min().y - eps && y <= bbox.max().y + eps
    }

    #[test]
    fn test_empty_input() {
        let splitter = QuadTreeSplitter::new(&[], 512, IntersectionPolicy::Quality, 1024);
        assert_eq!(splitter.leaf_count(), 0);
        assert!(splitter.get_request_quads(0.05, 10).is_empty());
        assert!(splitter.leaves_as_wkt().is_empty());
    }

    #[test]
    fn test_single_stripe_splits_into_quadrants() {
        let stripes = vec![stripe(rect(0.0, 0.0, 1000.0, 1000.0), 1.0, 1.0)];
        let splitter = QuadTreeSplitter::new(&stripes, 512, IntersectionPolicy::Quality, 1024);
        assert_eq!(splitter.leaf_count(), 4);

        // Not more leaves than the merge count: quadrants are returned as they are
        let quads = splitter.get_request_quads(0.0, 10);
        assert_eq!(quads.len(), 4);
        assert_eq!(quads[0].surface().envelope(), rect(0.0, 0.0, 500.0, 500.0));
        assert_eq!(quads[3].surface().envelope(), rect(500.0, 500.0, 1000.0, 1000.0));
    }

    #[test]
    fn test_merging_restores_full_box() {
        let stripes = vec![stripe(rect(0.0, 0.0, 1000.0, 1000.0), 1.0, 1.0)];
        let splitter = QuadTreeSplitter::new(&stripes, 512, IntersectionPolicy::Quality, 1024);
        let quads = splitter.get_request_quads(0.0, 0);
        assert_eq!(quads.len(), 1);
        assert_eq!(quads[0].surface().envelope(), rect(0.0, 0.0, 1000.0, 1000.0));
        assert_eq!(quads[0].min_resolution(), 1.0);
    }

    #[test]
    fn test_merge_refused_when_too_large() {
        let stripes = vec![stripe(rect(0.0, 0.0, 1000.0, 1000.0), 1.0, 1.0)];
        let splitter = QuadTreeSplitter::new(&stripes, 512, IntersectionPolicy::Quality, 800);
        let quads = splitter.get_request_quads(0.0, 0);
        assert_eq!(quads.len(), 4);
        for quad in &quads {
            assert!(quad.request_width_for_bbox().unwrap() <= 800);
            assert!(quad.request_height_for_bbox().unwrap() <= 800);
        }
    }

    #[test]
    fn test_extra_request_percentage_enlarges_quads() {
        let stripes = vec![stripe(rect(0.0, 0.0, 1000.0, 1000.0), 1.0, 1.0)];
        let splitter = QuadTreeSplitter::new(&stripes, 512, IntersectionPolicy::Quality, 1024);
        let quads = splitter.get_request_quads(0.01, 10);
        let env = quads[0].surface().envelope();
        assert_relative_eq!(env.min().x, -5.0);
        assert_relative_eq!(env.max().x, 505.0);
    }

    #[test]
    fn test_intersection_policies() {
        // The near stripe is finer at its near edge, the far one has the finer far edge
        let stripes = vec![
            stripe(rect(0.0, 0.0, 1000.0, 500.0), 8.0, 1.0),
            stripe(rect(0.0, 500.0, 1000.0, 1000.0), 3.0, 2.0),
        ];

        let quality = QuadTreeSplitter::new(&stripes, 512, IntersectionPolicy::Quality, 1024);
        let quads = quality.get_request_quads(0.0, 100);
        assert!(!quads.is_empty());
        assert!(quads.iter().all(|q| q.min_resolution() == 1.0));

        let fast = QuadTreeSplitter::new(&stripes, 512, IntersectionPolicy::Fast, 1024);
        let quads = fast.get_request_quads(0.0, 100);
        assert!(!quads.is_empty());
        assert!(quads.iter().all(|q| q.min_resolution() == 2.0));
    }

    #[test]
    fn test_almost_zero_resolution_uses_geometric_mean() {
        let stripes = vec![
            stripe(rect(0.0, 0.0, 0.001, 0.001), 16.0, 0.000001),
            stripe(rect(0.001, 0.0, 0.002, 0.001), 16.0, 0.000001),
        ];
        let splitter = QuadTreeSplitter::new(&stripes, 512, IntersectionPolicy::Quality, 1024);
        assert_relative_eq!(splitter.minimal_resolution(), 4.0, epsilon = 1e-12);
    }

    #[test]
    fn test_compare_nodes_quirk() {
        let lower = node(rect(0.0, 0.0, 10.0, 10.0));
        let upper = node(rect(0.0, 10.0, 10.0, 20.0));
        let right = node(rect(10.0, 0.0, 20.0, 10.0));
        // Same column: the box with the smaller y sorts as greater
        assert_eq!(compare_nodes(&lower, &upper, Axis::X), Ordering::Greater);
        assert_eq!(compare_nodes(&lower, &right, Axis::X), Ordering::Less);
        // Same row: the box with the smaller x sorts as greater
        assert_eq!(compare_nodes(&lower, &right, Axis::Y), Ordering::Greater);
        assert_eq!(compare_nodes(&lower, &lower, Axis::Y), Ordering::Equal);
    }

    #[test]
    fn test_can_merge() {
        let a = node(rect(0.0, 0.0, 10.0, 10.0));
        let above = node(rect(0.0, 10.0, 10.0, 20.0));
        let gap = node(rect(0.0, 10.5, 10.0, 20.0));
        let wider = node(rect(0.0, 10.0, 11.0, 20.0));
        assert!(can_merge(&a, &above, Axis::X));
        assert!(can_merge(&above, &a, Axis::X));
        assert!(!can_merge(&a, &gap, Axis::X));
        assert!(!can_merge(&a, &wider, Axis::X));
        assert!(!can_merge(&a, &above, Axis::Y));
    }

    #[test]
    fn test_merge_column_in_passes() {
        let column: Vec<MergeNode> = (0..4)
            .map(|i| node(rect(0.0, i as f64 * 10.0, 10.0, (i + 1) as f64 * 10.0)))
            .collect();
        let merged = merge_and_sort(&column, Axis::X, 1024);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].bbox, rect(0.0, 0.0, 10.0, 40.0));

        // Nothing to merge along the other axis
        assert_eq!(merge_and_sort(&column, Axis::Y, 1024).len(), 4);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let vp = ViewPoint::new(&ViewPointParams::default()).unwrap();
        let stripes = StripeFactory::new(&vp, 0.05, 1024).create_resolution_stripes(512, 0.0, 1.0);
        let splitter = QuadTreeSplitter::new(&stripes, 512, IntersectionPolicy::Quality, 1024);

        for (_, nodes) in bucket_by_resolution(&splitter.leaves()) {
            for axis in [Axis::X, Axis::Y] {
                let once = merge_and_sort(&nodes, axis, 1024);
                let twice = merge_and_sort(&once, axis, 1024);
                assert_eq!(once.len(), twice.len());
                assert!(once.len() <= nodes.len());
            }
        }
    }

    #[test]
    fn test_request_quads_cover_stripes() {
        let vp = ViewPoint::new(&ViewPointParams {
            heading: 0.3,
            ..Default::default()
        })
        .unwrap();
        let stripes = StripeFactory::new(&vp, 0.05, 1024).create_resolution_stripes(512, 0.0, 1.0);
        assert!(!stripes.is_empty());

        for policy in [IntersectionPolicy::Quality, IntersectionPolicy::Fast] {
            let splitter = QuadTreeSplitter::new(&stripes, 512, policy, 1024);
            let quads = splitter.get_request_quads(0.0, 10);
            assert!(!quads.is_empty());

            let envelopes: Vec<Rect<f64>> = quads.iter().map(|q| q.surface().envelope()).collect();
            for stripe in &stripes {
                let centroid = stripe.surface().centroid();
                let mut samples: Vec<(f64, f64)> = stripe
                    .surface()
                    .polygon()
                    .exterior()
                    .coords()
                    .map(|c| (c.x, c.y))
                    .collect();
                samples.push((centroid.x(), centroid.y()));
                for (x, y) in samples {
                    assert!(
                        envelopes.iter().any(|env| contains(env, x, y)),
                        "point ({x}, {y}) is not covered by any request quad"
                    );
                }
            }

            for quad in &quads {
                assert!(quad.min_resolution() > 0.0);
                assert!(quad.min_resolution() <= quad.max_resolution());
                assert!(quad.request_width_for_bbox().unwrap() <= 1024);
                assert!(quad.request_height_for_bbox().unwrap() <= 1024);
            }
        }
    }

    #[test]
    fn test_leaves_as_wkt() {
        let stripes = vec![stripe(rect(0.0, 0.0, 1000.0, 1000.0), 1.0, 1.0)];
        let splitter = QuadTreeSplitter::new(&stripes, 512, IntersectionPolicy::Quality, 1024);
        let wkt = splitter.leaves_as_wkt();
        assert_eq!(wkt.len(), 4);
        assert_eq!(wkt[0], "POLYGON Z ((0 0 0, 500 0 0, 500 500 0, 0 500 0, 0 0 0))");
    }
}

//! Quadtree over the world XZ plane.
//!
//! Leaves hold triangle indices; a triangle is stored in every leaf whose
//! rectangle its XZ bounds overlap, so triangles straddling a split line
//! appear more than once. Internal nodes hold no triangles.

use itri_decode::TriangleMesh;

use crate::config::IndexConfig;
use crate::rect::Rect;

/// A node in the quadtree arena.
#[derive(Debug, Clone)]
pub struct QuadNode {
    pub rect: Rect,
    /// Index of the first of four consecutive children, if split.
    pub first_child: Option<u32>,
    /// Triangle indices (empty for internal nodes).
    pub triangles: Vec<u32>,
}

impl QuadNode {
    fn leaf(rect: Rect, triangles: Vec<u32>) -> Self {
        Self {
            rect,
            first_child: None,
            triangles,
        }
    }

    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.first_child.is_none()
    }

    /// Indices of the four children, if split.
    #[must_use]
    pub fn children(&self) -> Option<std::ops::Range<usize>> {
        self.first_child.map(|c| c as usize..c as usize + 4)
    }
}

/// Summary of a built tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QuadTreeStats {
    pub nodes: usize,
    pub leaves: usize,
    /// Deepest leaf (root is 0).
    pub depth: u32,
    /// Total triangle references across all leaves.
    pub references: usize,
}

/// Immutable spatial index over a [`TriangleMesh`].
#[derive(Debug, Clone)]
pub struct QuadTree {
    nodes: Vec<QuadNode>,
    stats: QuadTreeStats,
}

impl QuadTree {
    /// Build the index for every triangle in `mesh`.
    #[must_use]
    pub fn build(mesh: &TriangleMesh, config: &IndexConfig) -> Self {
        let bounds: Vec<Rect> = mesh.triangles().map(|t| Rect::of_triangle(&t)).collect();
        let root_rect = root_bounds(&bounds, config.bounds_sample_stride);

        let mut builder = Builder {
            nodes: vec![QuadNode::leaf(root_rect, all_indices(bounds.len()))],
            bounds: &bounds,
            config,
            stats: QuadTreeStats::default(),
        };
        builder.subdivide(0, 0);

        let mut stats = builder.stats;
        stats.nodes = builder.nodes.len();

        tracing::debug!(
            "Built quadtree over {} triangles: {} nodes, {} leaves, depth {}, {} references",
            bounds.len(),
            stats.nodes,
            stats.leaves,
            stats.depth,
            stats.references
        );

        Self {
            nodes: builder.nodes,
            stats,
        }
    }

    #[must_use]
    pub fn root(&self) -> &QuadNode {
        &self.nodes[0]
    }

    #[must_use]
    pub fn nodes(&self) -> &[QuadNode] {
        &self.nodes
    }

    #[must_use]
    pub fn stats(&self) -> QuadTreeStats {
        self.stats
    }

    /// Append the triangles of every leaf containing `(x, z)` to `out`.
    ///
    /// A point on a split line lies in several leaves; their lists are
    /// concatenated without de-duplication.
    pub fn query_point(&self, x: f32, z: f32, out: &mut Vec<u32>) {
        self.visit(|rect| rect.contains(x, z), out);
    }

    /// Append the triangles of every leaf overlapping `rect` to `out`.
    ///
    /// Triangles stored in several overlapping leaves appear several times.
    pub fn query_rect(&self, rect: &Rect, out: &mut Vec<u32>) {
        self.visit(|node| node.overlaps(rect), out);
    }

    /// Candidate triangles under `(x, z)`.
    #[must_use]
    pub fn candidates(&self, x: f32, z: f32) -> Vec<u32> {
        let mut out = Vec::new();
        self.query_point(x, z, &mut out);
        out
    }

    fn visit(&self, accept: impl Fn(&Rect) -> bool, out: &mut Vec<u32>) {
        let mut stack = vec![0usize];
        while let Some(index) = stack.pop() {
            let node = &self.nodes[index];
            if !accept(&node.rect) {
                continue;
            }
            match node.children() {
                Some(children) => stack.extend(children),
                None => out.extend_from_slice(&node.triangles),
            }
        }
    }
}

struct Builder<'a> {
    nodes: Vec<QuadNode>,
    bounds: &'a [Rect],
    config: &'a IndexConfig,
    stats: QuadTreeStats,
}

impl Builder<'_> {
    fn subdivide(&mut self, index: usize, depth: u32) {
        let rect = self.nodes[index].rect;
        let size = rect.size();
        let count = self.nodes[index].triangles.len();

        // Zero-extent nodes would copy every triangle into all four children.
        if depth >= self.config.max_depth
            || count < self.config.min_triangles_to_split
            || size.x <= 0.0
            || size.y <= 0.0
        {
            self.stats.leaves += 1;
            self.stats.depth = self.stats.depth.max(depth);
            self.stats.references += count;
            return;
        }

        let triangles = std::mem::take(&mut self.nodes[index].triangles);
        let first_child = self.nodes.len();
        for quadrant in rect.quadrants() {
            let inside = triangles
                .iter()
                .copied()
                .filter(|&t| self.bounds[t as usize].overlaps(&quadrant))
                .collect();
            self.nodes.push(QuadNode::leaf(quadrant, inside));
        }
        self.nodes[index].first_child = Some(node_id(first_child));

        for child in first_child..first_child + 4 {
            self.subdivide(child, depth + 1);
        }
    }
}

/// Union of triangle bounds, sampling every `stride`th triangle.
fn root_bounds(bounds: &[Rect], stride: usize) -> Rect {
    bounds
        .iter()
        .step_by(stride.max(1))
        .fold(Rect::EMPTY, |acc, r| acc.union(r))
}

#[allow(clippy::cast_possible_truncation)]
fn all_indices(count: usize) -> Vec<u32> {
    // ITRI counts are u32, so every index fits.
    (0..count as u32).collect()
}

#[allow(clippy::cast_possible_truncation)]
fn node_id(index: usize) -> u32 {
    index as u32
}

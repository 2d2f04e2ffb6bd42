//! Surface Area Heuristic kd-tree over a triangle mesh, with perfect split clipping.
//!
//! Grounded on the original `KdNode`/`KdTree` layout (two packed `u32` words per node) and
//! the SAH builder algorithm; generalizes the teacher crate's Morton-sorted BVH
//! (`scene::triangle_bvh`) to a binary spatial tree selected by cost rather than a fixed
//! branching factor.

mod build;
mod traversal;

pub use build::{KdTreeBuildError, KdTreeBuildParams};
pub use traversal::Hit;

use crate::geometry::{Ray, WorldBox, WorldTriangle};

/// A single kd-tree node, packed into two 32-bit words exactly as in the reference layout:
///
/// Interior node: `word0 = axis (2 bits) | (above_child_index << 2)`, `word1 = split
/// position reinterpreted as `f32` bits.
///
/// Leaf node: `word0 = 0b11 | (triangle_count << 2)`, `word1` is either a single triangle
/// index (count == 1) or an offset into the shared triangle-index buffer.
#[derive(Copy, Clone, Debug)]
#[repr(C)]
pub struct KdNode {
    word0: u32,
    word1: u32,
}

const LEAF_FLAGS: u32 = 0b11;

impl KdNode {
    fn new_leaf(triangle_count: u32, payload: u32) -> KdNode {
        KdNode {
            word0: LEAF_FLAGS | (triangle_count << 2),
            word1: payload,
        }
    }

    fn new_interior(axis: u8, split_position: f32, above_child: u32) -> KdNode {
        debug_assert!(axis < 3);
        KdNode {
            word0: (axis as u32) | (above_child << 2),
            word1: split_position.to_bits(),
        }
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        (self.word0 & LEAF_FLAGS) == LEAF_FLAGS
    }

    #[inline]
    fn axis(&self) -> usize {
        (self.word0 & LEAF_FLAGS) as usize
    }

    #[inline]
    fn split_position(&self) -> f32 {
        f32::from_bits(self.word1)
    }

    #[inline]
    fn above_child(&self) -> u32 {
        self.word0 >> 2
    }

    #[inline]
    fn leaf_triangle_count(&self) -> u32 {
        self.word0 >> 2
    }

    /// Single triangle index (count == 1) or offset into the shared index buffer (count > 1).
    #[inline]
    fn leaf_payload(&self) -> u32 {
        self.word1
    }
}

/// A kd-tree built over a fixed set of triangles, plus the scratch index buffer shared by
/// leaves with more than one triangle.
#[derive(Clone, Debug)]
pub struct KdTree {
    nodes: Vec<KdNode>,
    /// Indices (into the mesh's triangle array) referenced by leaves. A leaf with a single
    /// triangle stores the index inline in `word1` instead of indirecting through here.
    triangle_indices: Vec<u32>,
    bounds: WorldBox,
}

impl KdTree {
    pub fn build(
        triangles: &[WorldTriangle],
        params: &KdTreeBuildParams,
    ) -> Result<KdTree, KdTreeBuildError> {
        build::build(triangles, params)
    }

    pub fn bounds(&self) -> &WorldBox {
        &self.bounds
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Finds the closest triangle hit within `(0, t_max)` along `ray`, using a short-stack
    /// traversal of the packed node array.
    pub fn intersect(&self, mesh_triangles: &[WorldTriangle], ray: &Ray, t_max: f32) -> Option<Hit> {
        traversal::intersect(self, mesh_triangles, ray, t_max)
    }
}

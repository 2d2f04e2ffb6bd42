use thiserror::Error;

use crate::geometry::{AABB, WorldBox, WorldPoint, WorldTriangle};

use super::KdNode;

/// Knobs for the SAH kd-tree builder. Defaults mirror the reference raytracer's constants.
#[derive(Copy, Clone, Debug)]
pub struct KdTreeBuildParams {
    pub intersection_cost: f32,
    pub traversal_cost: f32,
    pub empty_bonus: f32,
    pub leaf_triangles_limit: u32,
    /// `None` picks `floor(8 + 1.3*log2(n))`, clamped to the traversal stack depth (64).
    pub max_depth: Option<u32>,
    pub split_clipping: bool,
    pub split_along_longest_axis: bool,
}

impl Default for KdTreeBuildParams {
    fn default() -> Self {
        KdTreeBuildParams {
            intersection_cost: 80.0,
            traversal_cost: 1.0,
            empty_bonus: 0.3,
            leaf_triangles_limit: 2,
            max_depth: None,
            split_clipping: true,
            split_along_longest_axis: false,
        }
    }
}

#[derive(Debug, Error)]
pub enum KdTreeBuildError {
    #[error("kd-tree has too many nodes ({0}) to fit the packed node index")]
    NodeCountOverflow(usize),
}

const MAX_TRAVERSAL_DEPTH: u32 = 64;
const MAX_NODE_COUNT: usize = (1 << 30) - 1;

struct Split {
    axis: usize,
    position: f32,
    cost: f32,
}

pub(super) fn build(
    triangles: &[WorldTriangle],
    params: &KdTreeBuildParams,
) -> Result<super::KdTree, KdTreeBuildError> {
    if triangles.is_empty() {
        return Ok(super::KdTree {
            nodes: vec![KdNode::new_leaf(0, 0)],
            triangle_indices: Vec::new(),
            bounds: WorldBox::new(WorldPoint::origin(), WorldPoint::origin()),
        });
    }

    let bounds = triangles
        .iter()
        .map(WorldTriangle::bounds)
        .reduce(|a, b| a.union(&b))
        .expect("checked non-empty above");

    let max_depth = params
        .max_depth
        .unwrap_or_else(|| {
            (8.0 + 1.3 * (triangles.len() as f32).log2()).floor() as u32
        })
        .min(MAX_TRAVERSAL_DEPTH);

    let mut nodes = Vec::new();
    let mut triangle_indices = Vec::new();
    let all: Vec<u32> = (0..triangles.len() as u32).collect();

    build_node(
        &mut nodes,
        &mut triangle_indices,
        triangles,
        &all,
        &bounds,
        max_depth,
        params,
    );

    if nodes.len() > MAX_NODE_COUNT {
        return Err(KdTreeBuildError::NodeCountOverflow(nodes.len()));
    }

    Ok(super::KdTree {
        nodes,
        triangle_indices,
        bounds,
    })
}

fn build_node(
    nodes: &mut Vec<KdNode>,
    triangle_indices: &mut Vec<u32>,
    mesh_triangles: &[WorldTriangle],
    node_triangles: &[u32],
    bounds: &WorldBox,
    depth: u32,
    params: &KdTreeBuildParams,
) -> usize {
    let node_index = nodes.len();
    nodes.push(KdNode::new_leaf(0, 0));

    if node_triangles.len() <= params.leaf_triangles_limit as usize || depth == 0 {
        nodes[node_index] = make_leaf(node_triangles, triangle_indices);
        return node_index;
    }

    let clipped: Vec<WorldBox> = node_triangles
        .iter()
        .map(|&ti| {
            if params.split_clipping {
                clip_triangle_to_box(&mesh_triangles[ti as usize], bounds)
            } else {
                mesh_triangles[ti as usize].bounds().intersect(bounds)
            }
        })
        .collect();

    let axis_order = if params.split_along_longest_axis {
        longest_axis_order(bounds)
    } else {
        [0, 1, 2]
    };

    let mut best: Option<Split> = None;
    for axis in axis_order {
        if let Some(split) = select_split_for_axis(axis, bounds, node_triangles, &clipped, params)
        {
            let is_better = best.as_ref().is_none_or(|b| split.cost < b.cost);
            if is_better {
                best = Some(split);
            }
            if params.split_along_longest_axis {
                break;
            }
        }
    }

    let no_split_cost = params.intersection_cost * node_triangles.len() as f32;
    let Some(split) = best.filter(|s| s.cost < no_split_cost) else {
        nodes[node_index] = make_leaf(node_triangles, triangle_indices);
        return node_index;
    };

    let mut below = Vec::new();
    let mut above = Vec::new();
    for (i, &ti) in node_triangles.iter().enumerate() {
        let cb = &clipped[i];
        if cb.min[split.axis] <= split.position {
            below.push(ti);
        }
        if cb.max[split.axis] >= split.position {
            above.push(ti);
        }
    }

    let mut below_bounds = bounds.clone();
    below_bounds.max[split.axis] = split.position;
    let mut above_bounds = bounds.clone();
    above_bounds.min[split.axis] = split.position;

    build_node(
        nodes,
        triangle_indices,
        mesh_triangles,
        &below,
        &below_bounds,
        depth - 1,
        params,
    );
    let above_child = build_node(
        nodes,
        triangle_indices,
        mesh_triangles,
        &above,
        &above_bounds,
        depth - 1,
        params,
    );

    nodes[node_index] = KdNode::new_interior(split.axis as u8, split.position, above_child as u32);
    node_index
}

fn make_leaf(node_triangles: &[u32], triangle_indices: &mut Vec<u32>) -> KdNode {
    match node_triangles {
        [] => KdNode::new_leaf(0, 0),
        [single] => KdNode::new_leaf(1, *single),
        many => {
            let offset = triangle_indices.len() as u32;
            triangle_indices.extend_from_slice(many);
            KdNode::new_leaf(many.len() as u32, offset)
        }
    }
}

struct Edge {
    position: f32,
    is_start: bool,
}

/// Sweeps the edge list for one axis, applying group-boundary counting: when several edges
/// share a position, `num_above` is decremented by the group's END count before the cost is
/// evaluated at that position, and `num_below` is incremented by the group's START count
/// only afterwards.
fn select_split_for_axis(
    axis: usize,
    bounds: &WorldBox,
    node_triangles: &[u32],
    clipped: &[WorldBox],
    params: &KdTreeBuildParams,
) -> Option<Split> {
    let n = node_triangles.len();
    if n == 0 {
        return None;
    }

    let mut edges: Vec<Edge> = Vec::with_capacity(2 * n);
    for cb in clipped {
        edges.push(Edge {
            position: cb.min[axis],
            is_start: true,
        });
        edges.push(Edge {
            position: cb.max[axis],
            is_start: false,
        });
    }
    edges.sort_by(|a, b| {
        a.position
            .partial_cmp(&b.position)
            .unwrap()
            .then(a.is_start.cmp(&b.is_start))
    });

    let min_b = bounds.min[axis];
    let max_b = bounds.max[axis];

    let mut num_below = 0u32;
    let mut num_above = n as u32;
    let mut best: Option<Split> = None;

    let mut i = 0;
    while i < edges.len() {
        let position = edges[i].position;
        let mut num_start = 0u32;
        let mut num_end = 0u32;
        let mut j = i;
        while j < edges.len() && edges[j].position == position {
            if edges[j].is_start {
                num_start += 1;
            } else {
                num_end += 1;
            }
            j += 1;
        }

        num_above -= num_end;

        if position > min_b && position < max_b {
            let cost = split_cost(bounds, axis, position, num_below, num_above, params);
            if best.as_ref().is_none_or(|b| cost < b.cost) {
                best = Some(Split {
                    axis,
                    position,
                    cost,
                });
            }
        }

        num_below += num_start;
        i = j;
    }

    best
}

fn split_cost(
    bounds: &WorldBox,
    axis: usize,
    position: f32,
    num_below: u32,
    num_above: u32,
    params: &KdTreeBuildParams,
) -> f32 {
    let (o0, o1) = match axis {
        0 => (1, 2),
        1 => (0, 2),
        _ => (0, 1),
    };
    let diag = bounds.size();
    let d0 = diag[o0];
    let d1 = diag[o1];

    let s0 = 2.0 * (d0 * d1);
    let dd = 2.0 * (d0 + d1);
    let below_area = s0 + dd * (position - bounds.min[axis]);
    let above_area = s0 + dd * (bounds.max[axis] - position);
    let total_area = bounds.surface_area();

    let empty_factor = if num_below == 0 || num_above == 0 {
        1.0 - params.empty_bonus
    } else {
        1.0
    };

    params.traversal_cost
        + empty_factor
            * params.intersection_cost
            * ((below_area / total_area) * num_below as f32
                + (above_area / total_area) * num_above as f32)
}

fn longest_axis_order(bounds: &WorldBox) -> [usize; 3] {
    let size = bounds.size();
    let mut axes = [0usize, 1, 2];
    axes.sort_by(|&a, &b| size[b].partial_cmp(&size[a]).unwrap());
    axes
}

/// Perfect split clipping (Soupikov et al. 2008): clips the triangle polygon against the
/// node's bounding box using Sutherland-Hodgman, and returns the bounding box of the
/// resulting (possibly empty) polygon, which is tighter than simply intersecting the
/// triangle's own axis-aligned bounds with the node box.
fn clip_triangle_to_box(triangle: &WorldTriangle, b: &WorldBox) -> WorldBox {
    let mut poly: Vec<WorldPoint> = vec![triangle[0], triangle[1], triangle[2]];

    for axis in 0..3 {
        poly = clip_poly_half_space(&poly, axis, b.min[axis], true);
        if poly.is_empty() {
            break;
        }
        poly = clip_poly_half_space(&poly, axis, b.max[axis], false);
        if poly.is_empty() {
            break;
        }
    }

    if poly.is_empty() {
        return triangle.bounds().intersect(b);
    }

    let mut result = AABB::new(poly[0], poly[0]);
    for p in &poly[1..] {
        result.extend_point(p);
    }
    result
}

fn clip_poly_half_space(
    poly: &[WorldPoint],
    axis: usize,
    value: f32,
    keep_greater_equal: bool,
) -> Vec<WorldPoint> {
    if poly.is_empty() {
        return Vec::new();
    }

    let inside = |p: &WorldPoint| {
        if keep_greater_equal {
            p[axis] >= value
        } else {
            p[axis] <= value
        }
    };

    let mut out = Vec::with_capacity(poly.len() + 1);
    for i in 0..poly.len() {
        let cur = poly[i];
        let next = poly[(i + 1) % poly.len()];
        let cur_in = inside(&cur);
        let next_in = inside(&next);

        if cur_in {
            out.push(cur);
        }
        if cur_in != next_in {
            let t = (value - cur[axis]) / (next[axis] - cur[axis]);
            out.push(cur + (next - cur) * t);
        }
    }
    out
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::geometry::WorldVector;
    use assert2::assert;

    fn unit_cube_triangles() -> Vec<WorldTriangle> {
        // Two triangles covering the z=0 face of a unit cube, far apart on x so that an
        // SAH split should separate them.
        vec![
            WorldTriangle::new(
                WorldPoint::new(0.0, 0.0, 0.0),
                WorldPoint::new(1.0, 0.0, 0.0),
                WorldPoint::new(0.0, 1.0, 0.0),
            ),
            WorldTriangle::new(
                WorldPoint::new(10.0, 0.0, 0.0),
                WorldPoint::new(11.0, 0.0, 0.0),
                WorldPoint::new(10.0, 1.0, 0.0),
            ),
            WorldTriangle::new(
                WorldPoint::new(10.0, 0.0, 0.0),
                WorldPoint::new(11.0, 1.0, 0.0),
                WorldPoint::new(10.0, 1.0, 0.0),
            ),
        ]
    }

    #[test]
    fn leaf_bounds_contain_all_referenced_triangles() {
        let triangles = unit_cube_triangles();
        let tree = super::super::KdTree::build(&triangles, &KdTreeBuildParams::default()).unwrap();
        assert!(tree.node_count() >= 1);
        assert!(tree.bounds().min.x <= 0.0);
        assert!(tree.bounds().max.x >= 11.0);
    }

    #[test]
    fn clip_triangle_to_box_is_tighter_than_aabb_intersection() {
        // A triangle whose AABB spans the whole box but which does not actually reach one
        // corner; perfect-split clipping should produce a tighter bound than the naive
        // AABB intersection along at least one axis.
        let triangle = WorldTriangle::new(
            WorldPoint::new(0.0, 0.0, 0.0),
            WorldPoint::new(1.0, 0.0, 0.0),
            WorldPoint::new(0.0, 1.0, 0.0),
        );
        let b = WorldBox::new(WorldPoint::new(0.5, 0.5, -1.0), WorldPoint::new(1.0, 1.0, 1.0));

        let clipped = clip_triangle_to_box(&triangle, &b);
        let naive = triangle.bounds().intersect(&b);

        assert!(clipped.surface_area() <= naive.surface_area() + 1e-5);
    }

    #[test]
    fn empty_mesh_produces_single_empty_leaf() {
        let tree = super::super::KdTree::build(&[], &KdTreeBuildParams::default()).unwrap();
        assert!(tree.node_count() == 1);
    }

    #[test]
    fn offset_ray_origin_moves_along_normal() {
        let p = WorldPoint::new(1.0, 2.0, 3.0);
        let n = WorldVector::new(0.0, 0.0, 1.0);
        let offset = crate::geometry::offset_ray_origin(p, n);
        assert!(offset.z > p.z);
    }
}

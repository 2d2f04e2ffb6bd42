use arrayvec::ArrayVec;

use crate::geometry::{Ray, WorldTriangle, intersect_triangle};

use super::KdTree;

/// Closest triangle hit found while walking the tree.
#[derive(Copy, Clone, Debug)]
pub struct Hit {
    pub t: f32,
    pub triangle_index: u32,
    pub b1: f32,
    pub b2: f32,
}

/// Deepest traversal stack the builder's `max_depth` clamp ever produces, plus slack for
/// the root. A kd-tree descent pushes at most one entry per level, so this bounds the
/// stack statically instead of needing a heap allocation per ray.
const MAX_STACK_DEPTH: usize = 64;

#[derive(Copy, Clone)]
struct StackEntry {
    node_index: usize,
    t_min: f32,
    t_max: f32,
}

/// Stackless-style (fixed-capacity short stack) kd-tree traversal. At each interior node the
/// near child is visited first according to the sign of the ray direction along the split
/// axis; the far child is pushed only when the ray's remaining interval actually straddles
/// the split plane, and is skipped entirely once a closer hit than its `t_min` is found.
pub(super) fn intersect(
    tree: &KdTree,
    mesh_triangles: &[WorldTriangle],
    ray: &Ray,
    ray_t_max: f32,
) -> Option<Hit> {
    let (mut t_min, mut t_max) = tree.bounds.intersect_ray(ray, 0.0, ray_t_max)?;

    let mut stack: ArrayVec<StackEntry, MAX_STACK_DEPTH> = ArrayVec::new();
    let mut node_index = 0usize;
    let mut best: Option<Hit> = None;

    loop {
        if let Some(hit) = &best {
            if hit.t < t_min {
                match stack.pop() {
                    Some(entry) => {
                        node_index = entry.node_index;
                        t_min = entry.t_min;
                        t_max = entry.t_max;
                        continue;
                    }
                    None => break,
                }
            }
        }

        let node = &tree.nodes[node_index];

        if node.is_leaf() {
            let count = node.leaf_triangle_count();
            if count == 1 {
                test_triangle(mesh_triangles, node.leaf_payload(), ray, t_max, &mut best);
            } else if count > 1 {
                let offset = node.leaf_payload() as usize;
                for &ti in &tree.triangle_indices[offset..offset + count as usize] {
                    test_triangle(mesh_triangles, ti, ray, t_max, &mut best);
                }
            }

            match stack.pop() {
                Some(entry) => {
                    node_index = entry.node_index;
                    t_min = entry.t_min;
                    t_max = entry.t_max;
                }
                None => break,
            }
        } else {
            let axis = node.axis();
            let split = node.split_position();
            let t_split = (split - ray.origin[axis]) * ray.inv_direction[axis];

            let below_child = node_index + 1;
            let above_child = node.above_child() as usize;
            let (near, far) = if ray.direction[axis] >= 0.0 {
                (below_child, above_child)
            } else {
                (above_child, below_child)
            };

            if t_split > t_max || t_split <= 0.0 {
                node_index = near;
            } else if t_split < t_min {
                node_index = far;
            } else {
                // Stack is never over capacity: depth is bounded by the builder's
                // `max_depth`, which is itself clamped to `MAX_STACK_DEPTH`.
                stack.push(StackEntry {
                    node_index: far,
                    t_min: t_split,
                    t_max,
                });
                node_index = near;
                t_max = t_split;
            }
        }
    }

    best
}

fn test_triangle(
    mesh_triangles: &[WorldTriangle],
    triangle_index: u32,
    ray: &Ray,
    t_max: f32,
    best: &mut Option<Hit>,
) {
    let Some(hit) = intersect_triangle(ray, &mesh_triangles[triangle_index as usize]) else {
        return;
    };

    let current_max = best.as_ref().map_or(t_max, |h| h.t);
    if hit.t < current_max {
        *best = Some(Hit {
            t: hit.t,
            triangle_index,
            b1: hit.b1,
            b2: hit.b2,
        });
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::geometry::{WorldPoint, WorldVector};
    use crate::kdtree::KdTreeBuildParams;
    use assert2::assert;

    fn two_separated_triangles() -> Vec<WorldTriangle> {
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
        ]
    }

    #[test]
    fn hits_nearest_triangle_along_ray() {
        let triangles = two_separated_triangles();
        let tree = KdTree::build(&triangles, &KdTreeBuildParams::default()).unwrap();

        let ray = Ray::new(
            WorldPoint::new(0.25, 0.25, 1.0),
            WorldVector::new(0.0, 0.0, -1.0),
        );
        let hit = tree.intersect(&triangles, &ray, f32::INFINITY).expect("must hit");
        assert!(hit.triangle_index == 0);
        assert!((hit.t - 1.0).abs() < 1e-5);
    }

    #[test]
    fn misses_when_ray_passes_between_triangles() {
        let triangles = two_separated_triangles();
        let tree = KdTree::build(&triangles, &KdTreeBuildParams::default()).unwrap();

        let ray = Ray::new(
            WorldPoint::new(5.0, 5.0, 1.0),
            WorldVector::new(0.0, 0.0, -1.0),
        );
        assert!(tree.intersect(&triangles, &ray, f32::INFINITY).is_none());
    }

    #[test]
    fn respects_t_max_cutoff() {
        let triangles = two_separated_triangles();
        let tree = KdTree::build(&triangles, &KdTreeBuildParams::default()).unwrap();

        let ray = Ray::new(
            WorldPoint::new(0.25, 0.25, 1.0),
            WorldVector::new(0.0, 0.0, -1.0),
        );
        assert!(tree.intersect(&triangles, &ray, 0.5).is_none());
    }
}

//! Watertight ray/triangle intersection (Woop, Benthin, Wald 2013). `intersect_triangle` is
//! the scalar entry point the kd-tree leaf traversal calls for every candidate triangle;
//! `TriangleBatch8` vectorizes the same algorithm 8-wide for callers that have triangles
//! packed that way.

use simba::simd::{SimdBool as _, SimdPartialOrd as _, SimdValue};

use crate::geometry::{Ray, SimdFloatType, WorldPoint8, WorldTriangle};
use crate::util::simba::SimbaWorkarounds as _;

/// Result of a single ray-triangle intersection.
#[derive(Copy, Clone, Debug)]
pub struct TriangleIntersection {
    pub t: f32,
    /// Barycentric coordinates of the hit point, `b0 = 1 - b1 - b2`.
    pub b1: f32,
    pub b2: f32,
}

/// Scalar watertight ray-triangle intersection. Two sided; returns `None` when the ray
/// misses the triangle, is parallel to its plane, or the hit lies behind the ray origin.
/// A triangle whose edge functions land exactly on zero (the classic leak/double-hit risk
/// along a shared edge) is recomputed in double precision, per Woop/Benthin/Wald.
pub fn intersect_triangle(ray: &Ray, triangle: &WorldTriangle) -> Option<TriangleIntersection> {
    let dir = ray.direction.into_inner();

    let (kx, ky, kz) = shear_axes(dir);
    let sx = dir[kx] / dir[kz];
    let sy = dir[ky] / dir[kz];
    let sz = 1.0 / dir[kz];

    let permuted = [triangle[0], triangle[1], triangle[2]].map(|v| {
        let rel = v - ray.origin;
        [rel[kx], rel[ky], rel[kz]]
    });
    let [a, b, c] = permuted.map(|[x, y, z]| [x - sx * z, y - sy * z, z]);

    let (mut u, mut v, mut w) = edge_functions(a, b, c);
    if u == 0.0 || v == 0.0 || w == 0.0 {
        (u, v, w) = edge_functions_f64(a, b, c);
    }

    if (u < 0.0 || v < 0.0 || w < 0.0) && (u > 0.0 || v > 0.0 || w > 0.0) {
        return None;
    }
    let det = u + v + w;
    if det == 0.0 {
        return None;
    }

    let t_scaled = u * (a[2] * sz) + v * (b[2] * sz) + w * (c[2] * sz);
    let inv_det = 1.0 / det;
    let t = t_scaled * inv_det;
    if t < 0.0 {
        return None;
    }

    Some(TriangleIntersection {
        t,
        b1: v * inv_det,
        b2: w * inv_det,
    })
}

/// Dimension with the largest absolute ray direction component becomes the shear axis;
/// returns `(kx, ky, kz)` with `kz` winning ties toward the higher index, as in `intersect_triangle`.
fn shear_axes(dir: crate::geometry::WorldVector) -> (usize, usize, usize) {
    let kz = if dir.x.abs() > dir.y.abs() {
        if dir.x.abs() > dir.z.abs() { 0 } else { 2 }
    } else if dir.y.abs() > dir.z.abs() {
        1
    } else {
        2
    };
    let mut kx = (kz + 1) % 3;
    let mut ky = (kz + 2) % 3;
    if dir[kz] < 0.0 {
        std::mem::swap(&mut kx, &mut ky);
    }
    (kx, ky, kz)
}

fn edge_functions(a: [f32; 3], b: [f32; 3], c: [f32; 3]) -> (f32, f32, f32) {
    let u = c[0] * b[1] - c[1] * b[0];
    let v = a[0] * c[1] - a[1] * c[0];
    let w = b[0] * a[1] - b[1] * a[0];
    (u, v, w)
}

fn edge_functions_f64(a: [f32; 3], b: [f32; 3], c: [f32; 3]) -> (f32, f32, f32) {
    let (ax, ay) = (a[0] as f64, a[1] as f64);
    let (bx, by) = (b[0] as f64, b[1] as f64);
    let (cx, cy) = (c[0] as f64, c[1] as f64);
    (
        (cx * by - cy * bx) as f32,
        (ax * cy - ay * cx) as f32,
        (bx * ay - by * ax) as f32,
    )
}

/// Eight triangles packed for simultaneous intersection against one ray.
#[derive(Clone, Debug)]
pub struct TriangleBatch8 {
    pub vertices: [WorldPoint8; 3],
}

impl TriangleBatch8 {
    pub fn new(vertices: [WorldPoint8; 3]) -> Self {
        TriangleBatch8 { vertices }
    }

    /// Returns, per lane: hit mask, distance `t`, and barycentric weights `(b1, b2)` for
    /// vertices 1 and 2 (`b0 = 1 - b1 - b2`).
    pub fn intersect_watertight(
        &self,
        ray: &Ray,
    ) -> (
        <SimdFloatType as SimdValue>::SimdBool,
        SimdFloatType,
        SimdFloatType,
        SimdFloatType,
    ) {
        let dir = ray.direction.into_inner();

        // Dimension with the largest absolute ray direction component becomes the shear axis.
        let kz = if dir.x.abs() > dir.y.abs() {
            if dir.x.abs() > dir.z.abs() { 0 } else { 2 }
        } else if dir.y.abs() > dir.z.abs() {
            1
        } else {
            2
        };
        let mut kx = (kz + 1) % 3;
        let mut ky = (kz + 2) % 3;
        if dir[kz] < 0.0 {
            std::mem::swap(&mut kx, &mut ky);
        }

        let sx = dir[kx] / dir[kz];
        let sy = dir[ky] / dir[kz];
        let sz = 1.0 / dir[kz];

        let origin = ray.origin.map(SimdFloatType::splat);

        let permuted = self.vertices.map(|v| {
            let rel = v - origin;
            [rel[kx], rel[ky], rel[kz]]
        });

        let sx = SimdFloatType::splat(sx);
        let sy = SimdFloatType::splat(sy);
        let sz = SimdFloatType::splat(sz);

        let [a, b, c] = permuted.map(|[x, y, z]| [x - sx * z, y - sy * z, z]);

        let mut u = c[0] * b[1] - c[1] * b[0];
        let mut v = a[0] * c[1] - a[1] * c[0];
        let mut w = b[0] * a[1] - b[1] * a[0];

        let zero = SimdFloatType::ZERO;

        // A lane with an edge function exactly zero is at risk of the classic watertight
        // failure mode (leak or double-hit along a shared edge): recompute all three edges
        // for every lane in double precision and round back down, per Woop/Benthin/Wald.
        let zero_edge = u.simd_eq(zero) | v.simd_eq(zero) | w.simd_eq(zero);
        if zero_edge.any() {
            for lane in 0..SimdFloatType::LANES {
                let ax = a[0].extract(lane) as f64;
                let ay = a[1].extract(lane) as f64;
                let bx = b[0].extract(lane) as f64;
                let by = b[1].extract(lane) as f64;
                let cx = c[0].extract(lane) as f64;
                let cy = c[1].extract(lane) as f64;

                u.replace(lane, (cx * by - cy * bx) as f32);
                v.replace(lane, (ax * cy - ay * cx) as f32);
                w.replace(lane, (bx * ay - by * ax) as f32);
            }
        }

        let any_negative = u.simd_lt(zero) | v.simd_lt(zero) | w.simd_lt(zero);
        let any_positive = u.simd_gt(zero) | v.simd_gt(zero) | w.simd_gt(zero);
        let mask = !(any_negative & any_positive);

        let det = u + v + w;
        let mask = mask & !det.is_nan() & det.simd_ne(zero);

        let az = a[2] * sz;
        let bz = b[2] * sz;
        let cz = c[2] * sz;
        let t_scaled = u * az + v * bz + w * cz;

        let inv_det = SimdFloatType::ONE / det;
        let t = t_scaled * inv_det;
        let b1 = v * inv_det;
        let b2 = w * inv_det;

        let mask = mask & t.simd_ge(zero);

        (mask, t, b1, b2)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::geometry::{WorldPoint, WorldVector};
    use assert2::assert;

    fn splat_triangle(a: WorldPoint, b: WorldPoint, c: WorldPoint) -> TriangleBatch8 {
        TriangleBatch8::new([
            WorldPoint8::splat(a),
            WorldPoint8::splat(b),
            WorldPoint8::splat(c),
        ])
    }

    #[test]
    fn matches_scalar_moller_trumbore() {
        let triangle = splat_triangle(
            WorldPoint::new(0.0, 0.0, 0.0),
            WorldPoint::new(1.0, 0.0, 0.0),
            WorldPoint::new(0.0, 1.0, 0.0),
        );
        let ray = Ray::new(WorldPoint::new(0.25, 0.25, 1.0), WorldVector::new(0.0, 0.0, -1.0));

        let (mask, t, b1, b2) = triangle.intersect_watertight(&ray);
        assert!(mask.extract(0));
        assert!((t.extract(0) - 1.0).abs() < 1e-5);
        assert!((b1.extract(0) - 0.25).abs() < 1e-5);
        assert!((b2.extract(0) - 0.25).abs() < 1e-5);
    }

    #[test]
    fn misses_outside_triangle() {
        let triangle = splat_triangle(
            WorldPoint::new(0.0, 0.0, 0.0),
            WorldPoint::new(1.0, 0.0, 0.0),
            WorldPoint::new(0.0, 1.0, 0.0),
        );
        let ray = Ray::new(WorldPoint::new(2.0, 2.0, 1.0), WorldVector::new(0.0, 0.0, -1.0));

        let (mask, ..) = triangle.intersect_watertight(&ray);
        assert!(!mask.extract(0));
    }

    #[test]
    fn watertight_along_shared_edge() {
        // Two triangles sharing an edge; a ray aimed exactly at the shared edge must hit
        // exactly one of them (no leak, no double miss), independent of which axis is
        // chosen as the shear axis.
        let ray = Ray::new(WorldPoint::new(0.5, 0.0, 1.0), WorldVector::new(0.0, 0.0, -1.0));
        let t1 = splat_triangle(
            WorldPoint::new(0.0, 0.0, 0.0),
            WorldPoint::new(1.0, 0.0, 0.0),
            WorldPoint::new(0.0, 1.0, 0.0),
        );
        let t2 = splat_triangle(
            WorldPoint::new(1.0, 0.0, 0.0),
            WorldPoint::new(1.0, 1.0, 0.0),
            WorldPoint::new(0.0, 1.0, 0.0),
        );

        let (mask1, ..) = t1.intersect_watertight(&ray);
        let (mask2, ..) = t2.intersect_watertight(&ray);
        assert!(mask1.extract(0) || mask2.extract(0));
    }
}

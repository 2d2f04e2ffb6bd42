mod aabb;
mod ray_box_intersection;
mod triangle;
mod watertight;

use nalgebra::Unit;

pub use aabb::AABB;
pub use ray_box_intersection::RayIntersectionExt;
pub use triangle::{BarycentricCoordinates, Triangle};
pub use watertight::{TriangleBatch8, TriangleIntersection, intersect_triangle};

pub type FloatType = f32;
pub type SimdFloatType = simba::simd::WideF32x8;

/// Error tolerance for general purpose calculations in the raytracer.
/// This is not the same as machine epsilon (FloatType::EPSILON).
pub const EPSILON: FloatType = 1e-6;

pub type ScreenPoint = nalgebra::Point2<u32>;
pub type ScreenSize = nalgebra::Vector2<u32>;
pub type ScreenBlock = AABB<ScreenPoint>;

pub type WorldPoint = nalgebra::Point3<FloatType>;
pub type WorldVector = nalgebra::Vector3<FloatType>;
pub type WorldBox = AABB<WorldPoint>;
pub type WorldPoint8 = nalgebra::Point3<SimdFloatType>;
pub type WorldVector8 = nalgebra::Vector3<SimdFloatType>;
pub type WorldBox8 = AABB<WorldPoint8>;

pub type TexturePoint = nalgebra::Point2<f32>;
pub type WorldTriangle = Triangle<WorldPoint>;

/// Offsets a ray origin away from a surface along its geometric normal so that the
/// continuation ray does not re-intersect the originating triangle because of floating
/// point rounding. Uses the integer-bit-level perturbation from Ray Tracing Gems ch. 6,
/// rather than a fixed epsilon, so the offset scales with the magnitude of the coordinates.
pub fn offset_ray_origin(p: WorldPoint, geometric_normal: WorldVector) -> WorldPoint {
    const ORIGIN: f32 = 1.0 / 32.0;
    const FLOAT_SCALE: f32 = 1.0 / 65536.0;
    const INT_SCALE: f32 = 256.0;

    let n = geometric_normal;
    let of_i = n.map(|x| (INT_SCALE * x) as i32);

    let p_i = WorldPoint::new(
        f32::from_bits((p.x.to_bits() as i32 + if p.x < 0.0 { -of_i.x } else { of_i.x }) as u32),
        f32::from_bits((p.y.to_bits() as i32 + if p.y < 0.0 { -of_i.y } else { of_i.y }) as u32),
        f32::from_bits((p.z.to_bits() as i32 + if p.z < 0.0 { -of_i.z } else { of_i.z }) as u32),
    );

    WorldPoint::new(
        if p.x.abs() < ORIGIN {
            p.x + FLOAT_SCALE * n.x
        } else {
            p_i.x
        },
        if p.y.abs() < ORIGIN {
            p.y + FLOAT_SCALE * n.y
        } else {
            p_i.y
        },
        if p.z.abs() < ORIGIN {
            p.z + FLOAT_SCALE * n.z
        } else {
            p_i.z
        },
    )
}

/// Ray going through the world. Only positive direction is considered to be on the ray.
#[derive(Copy, Clone, Debug)]
pub struct Ray {
    pub origin: WorldPoint,
    /// Normalized direction of the ray
    pub direction: Unit<WorldVector>,

    /// Componentwise inverse of the ray direction
    /// Zeros in direction get turned into positive infinity regardless of the sign of the zero
    pub inv_direction: WorldVector,
}

impl Ray {
    pub fn new(origin: WorldPoint, direction: WorldVector) -> Ray {
        let direction = Unit::new_normalize(direction);
        let inv_direction = direction.map(|x| if x == 0.0 { f32::INFINITY } else { 1.0 / x });

        Ray {
            origin,
            direction,
            inv_direction,
        }
    }

    pub fn point_at(&self, distance: f32) -> WorldPoint {
        self.origin + self.direction.as_ref() * distance
    }

    pub fn advance_by(&self, distance: f32) -> Ray {
        Ray {
            origin: self.point_at(distance),
            direction: self.direction,
            inv_direction: self.inv_direction,
        }
    }
}

#[cfg(test)]
pub mod test {
    use super::*;
    use proptest::prelude::*;

    /// A point and direction guaranteed to be usable as a `Ray`, for property tests.
    #[derive(Clone, Debug)]
    pub struct RayWrapper(pub Ray);

    impl Arbitrary for RayWrapper {
        type Parameters = ();
        type Strategy = BoxedStrategy<RayWrapper>;

        fn arbitrary_with(_args: ()) -> Self::Strategy {
            (
                proptest::array::uniform3(-1e3f32..1e3f32),
                proptest::array::uniform3(-1.0f32..1.0f32),
            )
                .prop_filter_map("direction must be non-zero", |(o, d)| {
                    if d.iter().all(|x| x.abs() < 1e-9) {
                        None
                    } else {
                        Some(RayWrapper(Ray::new(WorldPoint::from(o), WorldVector::from(d))))
                    }
                })
                .boxed()
        }
    }
}

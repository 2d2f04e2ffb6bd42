//! Light sources sampled by the path integrator's next-event-estimation step. Grounded on the
//! reference `Light_Sample{Wi, Le, pdf}` contract and the point/diffuse-rectangular/environment
//! sampler set.

use std::f32::consts::PI;

use crate::color::{Color, is_black};
use crate::geometry::{WorldPoint, WorldVector};
use crate::sampling::Sample2D;

/// Result of sampling a light from a shading point: an incident direction, radiance carried
/// along it (already divided by the squared distance for finite lights), a solid-angle pdf,
/// and the distance to use for the shadow ray's `t_max`.
#[derive(Copy, Clone, Debug)]
pub struct LightSample {
    pub wi: WorldVector,
    pub radiance: Color,
    pub pdf: f32,
    pub distance: f32,
}

#[derive(Clone, Debug)]
pub enum Light {
    Point {
        position: WorldPoint,
        intensity: Color,
    },
    /// A one-sided rectangular area light, emitting uniformly over its solid angle from a
    /// shading point (no importance sampling of foreshortening beyond the cosine term applied
    /// by the integrator itself).
    DiffuseRectangular {
        corner: WorldPoint,
        edge_u: WorldVector,
        edge_v: WorldVector,
        normal: WorldVector,
        radiance: Color,
    },
    /// Distant/background illumination sampled uniformly over the sphere of directions; a
    /// full importance-sampled environment-map distribution table is out of scope (§1).
    Environment {
        radiance: Color,
    },
}

/// Ray-vs-rectangle intersection shared by `pdf_li` and `intersect_shape`. Returns the hit
/// distance if `wi` from `reference_point` lands within the rectangle's bounds.
fn intersect_rectangle(
    reference_point: WorldPoint,
    wi: WorldVector,
    corner: &WorldPoint,
    edge_u: &WorldVector,
    edge_v: &WorldVector,
    normal: &WorldVector,
) -> Option<f32> {
    let denom = wi.dot(normal);
    if denom.abs() <= 1e-8 {
        return None;
    }
    let t = (corner - reference_point).dot(normal) / denom;
    if t <= 0.0 {
        return None;
    }
    let hit = reference_point + wi * t;
    let local = hit - corner;
    let u_len2 = edge_u.norm_squared();
    let v_len2 = edge_v.norm_squared();
    if u_len2 <= 0.0 || v_len2 <= 0.0 {
        return None;
    }
    let a = local.dot(edge_u) / u_len2;
    let b = local.dot(edge_v) / v_len2;
    if !(0.0..=1.0).contains(&a) || !(0.0..=1.0).contains(&b) {
        return None;
    }
    Some(t)
}

impl Light {
    pub fn is_delta(&self) -> bool {
        matches!(self, Light::Point { .. })
    }

    /// Distance along `wi` from `reference_point` at which this light's shape is hit, if any.
    /// Used by the path integrator to evaluate the BSDF-sampling half of next-event-estimation
    /// MIS: after sampling a continuation direction from the BSDF, check whether it happens to
    /// land on this light before testing occlusion.
    pub fn intersect_shape(&self, reference_point: WorldPoint, wi: WorldVector) -> Option<f32> {
        match self {
            Light::Point { .. } => None, // zero measure, never hit by a continuous direction
            Light::DiffuseRectangular {
                corner,
                edge_u,
                edge_v,
                normal,
                ..
            } => intersect_rectangle(reference_point, wi, corner, edge_u, edge_v, normal),
            Light::Environment { .. } => Some(f32::INFINITY),
        }
    }

    pub fn sample_li(&self, reference_point: WorldPoint, u: Sample2D) -> Option<LightSample> {
        match self {
            Light::Point { position, intensity } => {
                let to_light = position - reference_point;
                let distance2 = to_light.norm_squared();
                if distance2 <= 0.0 {
                    return None;
                }
                let distance = distance2.sqrt();
                Some(LightSample {
                    wi: to_light / distance,
                    radiance: *intensity * (1.0 / distance2),
                    pdf: 1.0,
                    distance,
                })
            }
            Light::DiffuseRectangular {
                corner,
                edge_u,
                edge_v,
                normal,
                radiance,
            } => {
                let point_on_light = corner + edge_u * u.x + edge_v * u.y;
                let to_light = point_on_light - reference_point;
                let distance2 = to_light.norm_squared();
                if distance2 <= 0.0 {
                    return None;
                }
                let distance = distance2.sqrt();
                let wi = to_light / distance;
                let cos_light = (-wi).dot(normal);
                if cos_light <= 0.0 {
                    return None;
                }
                let area = edge_u.cross(edge_v).norm();
                if area <= 0.0 {
                    return None;
                }
                let pdf = distance2 / (cos_light * area);
                if !pdf.is_finite() || pdf <= 0.0 {
                    return None;
                }
                Some(LightSample {
                    wi,
                    radiance: *radiance,
                    pdf,
                    distance,
                })
            }
            Light::Environment { radiance } => {
                let wi = crate::sampling::uniform_sample_sphere(u);
                Some(LightSample {
                    wi,
                    radiance: *radiance,
                    pdf: 1.0 / (4.0 * PI),
                    distance: f32::INFINITY,
                })
            }
        }
    }

    /// Solid-angle pdf of sampling direction `wi` from `reference_point` toward this light, for
    /// the BSDF-sampling half of next-event-estimation MIS. Delta lights have no finite pdf.
    pub fn pdf_li(&self, reference_point: WorldPoint, wi: WorldVector) -> f32 {
        match self {
            Light::Point { .. } => 0.0,
            Light::DiffuseRectangular {
                corner,
                edge_u,
                edge_v,
                normal,
                ..
            } => {
                let Some(t) = intersect_rectangle(reference_point, wi, corner, edge_u, edge_v, normal) else {
                    return 0.0;
                };
                let area = edge_u.cross(edge_v).norm();
                if area <= 0.0 {
                    return 0.0;
                }
                let distance2 = t * t;
                let cos_light = (-wi).dot(normal).abs();
                distance2 / (cos_light * area)
            }
            Light::Environment { .. } => 1.0 / (4.0 * PI),
        }
    }

    /// Radiance carried by a ray that escapes the scene in direction `wi`, used by step 1 of
    /// the path integrator. Zero for any light that is not the environment.
    pub fn radiance_for_escaping_ray(&self, _wi: WorldVector) -> Color {
        match self {
            Light::Environment { radiance } => *radiance,
            _ => Color::new(0.0, 0.0, 0.0),
        }
    }

    pub fn is_black(&self) -> bool {
        match self {
            Light::Point { intensity, .. } => is_black(*intensity),
            Light::DiffuseRectangular { radiance, .. } => is_black(*radiance),
            Light::Environment { radiance } => is_black(*radiance),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use assert2::assert;

    #[test]
    fn point_light_falls_off_with_inverse_square_distance() {
        let light = Light::Point {
            position: WorldPoint::new(0.0, 0.0, 2.0),
            intensity: Color::new(4.0, 4.0, 4.0),
        };
        let sample = light
            .sample_li(WorldPoint::new(0.0, 0.0, 0.0), Sample2D::zeros())
            .unwrap();
        assert!((sample.radiance.r - 1.0).abs() < 1e-5);
    }

    #[test]
    fn rectangular_light_pdf_is_positive_when_facing_the_point() {
        let light = Light::DiffuseRectangular {
            corner: WorldPoint::new(-1.0, -1.0, 3.0),
            edge_u: WorldVector::new(2.0, 0.0, 0.0),
            edge_v: WorldVector::new(0.0, 2.0, 0.0),
            normal: WorldVector::new(0.0, 0.0, -1.0),
            radiance: Color::new(10.0, 10.0, 10.0),
        };
        let reference = WorldPoint::new(0.0, 0.0, 0.0);
        let wi = WorldVector::new(0.0, 0.0, 1.0);
        assert!(light.pdf_li(reference, wi) > 0.0);
    }

    #[test]
    fn environment_light_pdf_is_uniform() {
        let light = Light::Environment {
            radiance: Color::new(1.0, 1.0, 1.0),
        };
        let pdf = light.pdf_li(WorldPoint::new(0.0, 0.0, 0.0), WorldVector::new(1.0, 0.0, 0.0));
        assert!((pdf - 1.0 / (4.0 * PI)).abs() < 1e-6);
    }
}

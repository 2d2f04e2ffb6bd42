//! Monte Carlo light transport estimators, dispatched by `config.rendering_algorithm` (§6).
//! The default is the full path tracer (§4.8): unidirectional path tracing with one-sample
//! multiple-importance-sampled next-event-estimation at every finite-BSDF bounce, delta
//! scattering handled as a pass-through event with no MIS, and Russian roulette termination.
//! `DirectLighting` instead stops after a single next-event-estimation sample at the first
//! hit, with no path continuation.

use crate::color::{Color, is_black, max_component};
use crate::config::{RaytracerConfig, RenderingAlgorithm};
use crate::delta::{self, DielectricStack};
use crate::geometry::{Ray, WorldPoint, WorldVector};
use crate::light::Light;
use crate::sampling::{Sample2D, power_heuristic};
use crate::scene::Scene;
use crate::shading::ShadingContext;

/// Traces one camera path and returns its estimate of incident radiance along `ray`, running
/// either the full path tracer or the single-bounce direct-lighting estimator per
/// `config.rendering_algorithm`.
pub fn estimate_radiance(
    scene: &Scene,
    config: &RaytracerConfig,
    ray: Ray,
    rng: &mut impl rand::Rng,
) -> Color {
    match config.rendering_algorithm {
        RenderingAlgorithm::DirectLighting => estimate_direct_lighting(scene, ray, rng),
        RenderingAlgorithm::PathTracer => estimate_path_traced_radiance(scene, config, ray, rng),
    }
}

/// Single-bounce next-event-estimation at the first hit only: emitted radiance seen directly
/// by the camera ray plus one NEE sample, with no path continuation past the first surface
/// (mirrors the reference's non-MIS `compute_direct_lighting` mode).
fn estimate_direct_lighting(scene: &Scene, ray: Ray, rng: &mut impl rand::Rng) -> Color {
    let hit = scene.intersect(&ray, f32::INFINITY);
    let hit_t = hit.as_ref().map(|h| h.t).unwrap_or(f32::INFINITY);

    let mut radiance = Color::new(0.0, 0.0, 0.0);
    if let Some(light) = nearest_hit_area_light(scene, ray.origin, *ray.direction, hit_t) {
        radiance += area_light_radiance(light);
    }

    let Some(hit) = hit else {
        for light in &scene.lights {
            radiance += light.radiance_for_escaping_ray(*ray.direction);
        }
        return radiance;
    };

    let shading = ShadingContext::from_hit(scene, &hit);
    let wo_world = -*ray.direction;
    let wo = shading.frame.to_local(wo_world);
    let finite_bsdf = shading.bsdf(scene);

    radiance += sample_direct_lighting(scene, &shading, finite_bsdf.as_ref(), wo, rng);
    radiance
}

fn estimate_path_traced_radiance(
    scene: &Scene,
    config: &RaytracerConfig,
    mut ray: Ray,
    rng: &mut impl rand::Rng,
) -> Color {
    let mut radiance = Color::new(0.0, 0.0, 0.0);
    let mut throughput = Color::new(1.0, 1.0, 1.0);
    let mut dielectric_stack = DielectricStack::new();
    // Set only right after a finite-BSDF bounce, so the following hit's own emission is
    // weighted via MIS against that bounce's pdf. `None` right after a delta event or at the
    // very first hit, in which case emission is taken at full weight (§4.8 step 3: "no MIS"
    // following a delta event).
    let mut previous_bsdf_pdf: Option<f32> = None;

    let mut bounce = 0u32;
    loop {
        let hit = scene.intersect(&ray, f32::INFINITY);
        let hit_t = hit.as_ref().map(|h| h.t).unwrap_or(f32::INFINITY);

        // Step 2 of §4.8: area lights are standalone shapes independent of the mesh, so a
        // direct hit on one is only ever detected by this explicit distance comparison
        // against the kd-tree hit, never by triangle metadata.
        if let Some(light) = nearest_hit_area_light(scene, ray.origin, *ray.direction, hit_t) {
            let weight = mis_weight_for_emission(scene, light, previous_bsdf_pdf, ray.origin, *ray.direction);
            radiance += throughput * weight * area_light_radiance(light);
        }

        let Some(hit) = hit else {
            for light in &scene.lights {
                let emitted = light.radiance_for_escaping_ray(*ray.direction);
                if is_black(emitted) {
                    continue;
                }
                let weight = mis_weight_for_emission(scene, light, previous_bsdf_pdf, ray.origin, *ray.direction);
                radiance += throughput * weight * emitted;
            }
            break;
        };

        if bounce >= config.max_light_bounces {
            break;
        }

        let shading = ShadingContext::from_hit(scene, &hit);
        let material = shading.material(scene);

        let wo_world = -*ray.direction;
        let wo = shading.frame.to_local(wo_world);

        let delta_probability = material.delta_layer_selection_probability();
        let finite_bsdf = shading.bsdf(scene);

        let take_delta = if delta_probability >= 1.0 {
            true
        } else if delta_probability <= 0.0 {
            false
        } else {
            rng.random::<f32>() < delta_probability
        };

        if take_delta {
            let u = rng.random::<f32>();
            let sampled = match delta::sample(material, shading.material_handle, wo, u, &mut dielectric_stack) {
                Ok(sampled) => sampled,
                Err(_) => break,
            };
            if is_black(sampled.attenuation) {
                break;
            }
            throughput = throughput * sampled.attenuation / delta_probability;

            let wi_world = shading.frame.to_world(sampled.wi);
            ray = Ray::new(shading.offset_origin(wi_world), wi_world);
            previous_bsdf_pdf = None;
        } else {
            radiance += throughput
                * sample_direct_lighting(scene, &shading, finite_bsdf.as_ref(), wo, rng);

            let Some(bsdf) = finite_bsdf.as_ref() else {
                break;
            };
            let Some(sample) = bsdf.sample(wo, rng_sample2d(rng)) else {
                break;
            };
            if sample.pdf <= 0.0 || is_black(sample.f) {
                break;
            }

            let cos_i = sample.wi.z.abs();
            let continuation_probability = 1.0 - delta_probability;
            throughput = throughput * sample.f * (cos_i / (sample.pdf * continuation_probability));

            let wi_world = shading.frame.to_world(sample.wi);
            ray = Ray::new(shading.offset_origin(wi_world), wi_world);
            previous_bsdf_pdf = Some(sample.pdf);
        }

        bounce += 1;

        if bounce >= config.russian_roulette_bounce_count_threshold {
            let max_beta = max_component(throughput);
            if max_beta < config.russian_roulette_threshold {
                let q = (1.0 - max_beta).max(0.05);
                if rng.random::<f32>() < q {
                    break;
                }
                throughput = throughput / (1.0 - q);
            }
        }
    }

    radiance
}

fn rng_sample2d(rng: &mut impl rand::Rng) -> Sample2D {
    Sample2D::new(rng.random(), rng.random())
}

fn non_delta_light_count(scene: &Scene) -> usize {
    scene.lights.iter().filter(|l| !l.is_black() && !l.is_delta()).count()
}

/// Nearest non-delta light whose analytic shape `origin + t * wi` hits, for `t` strictly less
/// than `max_t` (the mesh's own hit distance, or infinity on a miss).
fn nearest_hit_area_light(scene: &Scene, origin: WorldPoint, wi: WorldVector, max_t: f32) -> Option<&Light> {
    scene
        .lights
        .iter()
        .filter(|light| !light.is_delta())
        .filter_map(|light| light.intersect_shape(origin, wi).map(|t| (t, light)))
        .filter(|(t, _)| *t < max_t && t.is_finite())
        .min_by(|(a, _), (b, _)| a.total_cmp(b))
        .map(|(_, light)| light)
}

/// MIS weight applied to a light's own emission when it is reached by tracing a continuation
/// ray rather than by `sample_direct_lighting`'s explicit light sample. `1.0` when the
/// previous bounce was a delta event (no competing light-sampling strategy to weight against)
/// or when there was no previous bounce at all.
fn mis_weight_for_emission(
    scene: &Scene,
    light: &Light,
    previous_bsdf_pdf: Option<f32>,
    reference_point: WorldPoint,
    wi: WorldVector,
) -> f32 {
    let Some(bsdf_pdf) = previous_bsdf_pdf else {
        return 1.0;
    };
    let light_pdf_solid_angle = light.pdf_li(reference_point, wi);
    if light_pdf_solid_angle <= 0.0 {
        return 1.0;
    }
    let light_selection_pdf = 1.0 / non_delta_light_count(scene).max(1) as f32;
    power_heuristic(1.0, bsdf_pdf, 1.0, light_pdf_solid_angle * light_selection_pdf)
}

/// One-sample MIS next-event-estimation direct lighting: picks a light uniformly, combines
/// its light-sampling strategy with a BSDF-sampling strategy via the power heuristic, and
/// tests visibility with a single shadow ray per strategy.
fn sample_direct_lighting(
    scene: &Scene,
    shading: &ShadingContext,
    bsdf: Option<&crate::bsdf::Bsdf>,
    wo: WorldVector,
    rng: &mut impl rand::Rng,
) -> Color {
    let Some(bsdf) = bsdf else {
        return Color::new(0.0, 0.0, 0.0);
    };
    let candidates: Vec<&Light> = scene.lights.iter().filter(|l| !l.is_black()).collect();
    if candidates.is_empty() {
        return Color::new(0.0, 0.0, 0.0);
    }

    let pick = ((rng.random::<f32>() * candidates.len() as f32) as usize).min(candidates.len() - 1);
    let light = candidates[pick];
    let light_selection_pdf = 1.0 / candidates.len() as f32;

    let mut direct = Color::new(0.0, 0.0, 0.0);

    // Light-sampling term.
    if let Some(sample) = light.sample_li(shading.position, rng_sample2d(rng)) {
        if sample.pdf > 0.0 && !is_black(sample.radiance) {
            let wi = shading.frame.to_local(sample.wi);
            let f = bsdf.evaluate(wo, wi) * wi.z.abs();
            if !is_black(f) {
                let light_pdf = sample.pdf * light_selection_pdf;
                let weight = if light.is_delta() {
                    1.0
                } else {
                    let bsdf_pdf = bsdf.pdf(wo, wi);
                    power_heuristic(1.0, light_pdf, 1.0, bsdf_pdf)
                };
                if weight > 0.0 && unoccluded(scene, shading, sample.wi, sample.distance) {
                    direct += f * sample.radiance * (weight / light_pdf);
                }
            }
        }
    }

    // BSDF-sampling term; skipped for delta lights, which have zero measure and can never be
    // hit by a continuous direction.
    if !light.is_delta() {
        if let Some(sample) = bsdf.sample(wo, rng_sample2d(rng)) {
            if sample.pdf > 0.0 && !is_black(sample.f) {
                let wi_world = shading.frame.to_world(sample.wi);
                if let Some(t_light) = light.intersect_shape(shading.position, wi_world) {
                    let light_pdf_solid_angle = light.pdf_li(shading.position, wi_world);
                    if light_pdf_solid_angle > 0.0 {
                        let light_pdf = light_pdf_solid_angle * light_selection_pdf;
                        let weight = power_heuristic(1.0, sample.pdf, 1.0, light_pdf);
                        if weight > 0.0 && unoccluded(scene, shading, wi_world, t_light) {
                            let radiance = if t_light.is_finite() {
                                area_light_radiance(light)
                            } else {
                                light.radiance_for_escaping_ray(wi_world)
                            };
                            direct += sample.f * sample.wi.z.abs() * radiance * (weight / sample.pdf);
                        }
                    }
                }
            }
        }
    }

    direct
}

fn area_light_radiance(light: &Light) -> Color {
    match light {
        Light::DiffuseRectangular { radiance, .. } => *radiance,
        _ => Color::new(0.0, 0.0, 0.0),
    }
}

fn unoccluded(scene: &Scene, shading: &ShadingContext, wi: WorldVector, distance: f32) -> bool {
    let origin = shading.offset_origin(wi);
    let ray = Ray::new(origin, wi);
    let t_max = if distance.is_finite() {
        distance * (1.0 - 1e-3)
    } else {
        f32::INFINITY
    };
    scene.intersect(&ray, t_max).is_none()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::bsdf::Bsdf;
    use crate::bsdf::Lambertian;
    use crate::kdtree::{KdTree, KdTreeBuildParams};
    use crate::material::MaterialTable;
    use crate::sampling::Pcg32;
    use crate::scene::TriangleMesh;
    use assert2::assert;

    fn empty_scene_with_environment(radiance: Color) -> Scene {
        let mesh = TriangleMesh::new(Vec::new(), Vec::new(), Vec::new());
        let kdtree = KdTree::build(mesh.triangles(), &KdTreeBuildParams::default()).unwrap();
        Scene {
            mesh,
            kdtree,
            materials: MaterialTable::new(),
            triangle_materials: Vec::new(),
            lights: vec![Light::Environment { radiance }],
        }
    }

    #[test]
    fn primary_ray_into_empty_scene_returns_environment_radiance() {
        let radiance = Color::new(1.0, 2.0, 3.0);
        let scene = empty_scene_with_environment(radiance);
        let config = RaytracerConfig::default();
        let ray = Ray::new(WorldPoint::new(0.0, 0.0, 0.0), WorldVector::new(0.0, 0.0, 1.0));
        let mut rng = Pcg32::new();

        let result = estimate_radiance(&scene, &config, ray, &mut rng);
        assert!((result.r - radiance.r).abs() < 1e-5);
        assert!((result.g - radiance.g).abs() < 1e-5);
        assert!((result.b - radiance.b).abs() < 1e-5);
    }

    #[test]
    fn direct_lighting_dispatch_also_sees_environment_on_a_miss() {
        let radiance = Color::new(1.0, 2.0, 3.0);
        let scene = empty_scene_with_environment(radiance);
        let config = RaytracerConfig {
            rendering_algorithm: RenderingAlgorithm::DirectLighting,
            ..RaytracerConfig::default()
        };
        let ray = Ray::new(WorldPoint::new(0.0, 0.0, 0.0), WorldVector::new(0.0, 0.0, 1.0));
        let mut rng = Pcg32::new();

        let result = estimate_radiance(&scene, &config, ray, &mut rng);
        assert!((result.r - radiance.r).abs() < 1e-5);
        assert!((result.g - radiance.g).abs() < 1e-5);
        assert!((result.b - radiance.b).abs() < 1e-5);
    }

    #[test]
    fn weight_for_emission_is_full_when_no_previous_bounce() {
        let scene = empty_scene_with_environment(Color::new(1.0, 1.0, 1.0));
        let light = &scene.lights[0];
        let weight = mis_weight_for_emission(
            &scene,
            light,
            None,
            WorldPoint::new(0.0, 0.0, 0.0),
            WorldVector::new(0.0, 0.0, 1.0),
        );
        assert!(weight == 1.0);
    }

    #[test]
    fn finite_bsdf_lambertian_has_nonzero_pdf_used_by_direct_lighting() {
        let bsdf = Bsdf::Lambertian(Lambertian {
            reflectance: Color::new(0.5, 0.5, 0.5),
        });
        let wo = WorldVector::new(0.0, 0.0, 1.0);
        let wi = WorldVector::new(0.0, 0.0, 1.0);
        assert!(bsdf.pdf(wo, wi) > 0.0);
    }

    #[test]
    fn nearest_hit_area_light_ignores_lights_beyond_max_t() {
        let mesh = TriangleMesh::new(Vec::new(), Vec::new(), Vec::new());
        let kdtree = KdTree::build(mesh.triangles(), &KdTreeBuildParams::default()).unwrap();
        let scene = Scene {
            mesh,
            kdtree,
            materials: MaterialTable::new(),
            triangle_materials: Vec::new(),
            lights: vec![Light::DiffuseRectangular {
                corner: WorldPoint::new(-1.0, -1.0, 5.0),
                edge_u: WorldVector::new(2.0, 0.0, 0.0),
                edge_v: WorldVector::new(0.0, 2.0, 0.0),
                normal: WorldVector::new(0.0, 0.0, -1.0),
                radiance: Color::new(10.0, 10.0, 10.0),
            }],
        };
        let origin = WorldPoint::new(0.0, 0.0, 0.0);
        let wi = WorldVector::new(0.0, 0.0, 1.0);
        assert!(nearest_hit_area_light(&scene, origin, wi, 2.0).is_none());
        assert!(nearest_hit_area_light(&scene, origin, wi, 10.0).is_some());
    }
}

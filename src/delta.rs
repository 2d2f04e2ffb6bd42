//! Delta (specular) scattering: perfect reflection, perfect refraction, the Fresnel-branched
//! glass rule, and the PBRT3 Uber delta layer. A delta event's pdf is a Dirac distribution
//! rather than a density, so it is dispatched separately from [`crate::bsdf::Bsdf`] and the
//! path integrator never runs next-event-estimation MIS against it (§4.7, §4.8).

use thiserror::Error;

use crate::color::Color;
use crate::geometry::WorldVector;
use crate::material::{Material, MaterialHandle};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DeltaScatteringError {
    /// Uber's delta-transmission component is a reported error rather than implemented
    /// (§4.7, §9 Open Questions): the source carries two diverging `Pbrt3_Uber_BRDF`
    /// implementations and marks this branch "not implemented".
    #[error("Uber material delta transmission is not implemented")]
    UberTransmissionUnsupported,
    /// `current_dielectric_material` observed a transmission through a dielectric different
    /// from the one the ray is nested inside. The source assumes non-nested dielectrics;
    /// violating that is a programming error, not a recoverable condition.
    #[error("nested dielectric materials are not supported")]
    NestedDielectric,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DeltaKind {
    Reflect,
    Transmit,
    /// Uber's opacity component: the ray passes through unaffected (no direction change,
    /// attenuation is the opacity colour).
    Passthrough,
}

/// Outcome of a delta scattering event.
#[derive(Copy, Clone, Debug)]
pub struct DeltaScatteringSample {
    pub kind: DeltaKind,
    pub wi: WorldVector,
    pub attenuation: Color,
}

/// Per-thread state tracking which dielectric the ray currently travels inside, so glass and
/// perfect-refractor events can pick the correct `eta_i / eta_t` direction. `None` means the
/// ray is in the ambient (vacuum/air) medium.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct DielectricStack {
    current: Option<MaterialHandle>,
}

impl DielectricStack {
    pub fn new() -> Self {
        DielectricStack { current: None }
    }

    fn is_inside(&self, material: MaterialHandle) -> bool {
        self.current == Some(material)
    }

    /// Applies a transmission event through `material`, toggling the nested state. Returns an
    /// error if the ray was already inside a *different* dielectric (nesting is unsupported).
    fn toggle(&mut self, material: MaterialHandle) -> Result<(), DeltaScatteringError> {
        match self.current {
            None => {
                self.current = Some(material);
                Ok(())
            }
            Some(current) if current == material => {
                self.current = None;
                Ok(())
            }
            Some(_) => Err(DeltaScatteringError::NestedDielectric),
        }
    }
}

fn reflect(wo: WorldVector, n: WorldVector) -> WorldVector {
    2.0 * wo.dot(&n) * n - wo
}

/// Refracts `wo` (pointing away from the surface) through a surface of normal `n` (pointing
/// into the incident medium), with `eta = eta_i / eta_t`. Returns `None` on total internal
/// reflection.
fn refract(wo: WorldVector, n: WorldVector, eta: f32) -> Option<WorldVector> {
    let cos_i = n.dot(&wo);
    let sin2_t = eta * eta * (1.0 - cos_i * cos_i).max(0.0);
    if sin2_t >= 1.0 {
        return None;
    }
    let cos_t = (1.0 - sin2_t).sqrt();
    Some(-wo * eta + n * (eta * cos_i - cos_t))
}

/// Examines `material` and dispatches the delta event implied by `u`. `wo` and the returned
/// `wi` are both in local shading space (`+z` is the shading normal, pointing out of the
/// surface on the side `wo` arrives from). `u` must already have been consumed only for delta
/// layer selection (see [`Material::delta_layer_selection_probability`]); this function uses
/// it (and, for Uber, remaps it) to pick among the material's own delta sub-components.
pub fn sample(
    material: &Material,
    handle: MaterialHandle,
    wo: WorldVector,
    u: f32,
    dielectric_stack: &mut DielectricStack,
) -> Result<DeltaScatteringSample, DeltaScatteringError> {
    match material {
        Material::PerfectMirror { reflectance } => {
            let n = WorldVector::new(0.0, 0.0, 1.0f32.copysign(wo.z));
            Ok(DeltaScatteringSample {
                kind: DeltaKind::Reflect,
                wi: reflect(wo, n),
                attenuation: *reflectance,
            })
        }
        Material::PerfectGlass { eta, reflectance, transmittance } => {
            sample_glass(*eta, *reflectance, *transmittance, handle, wo, u, dielectric_stack)
        }
        Material::PerfectRefractor { eta, transmittance } => {
            sample_refractor(*eta, *transmittance, handle, wo, dielectric_stack)
        }
        Material::Uber {
            delta_reflectance,
            opacity,
            eta,
            ..
        } => sample_uber_delta(*delta_reflectance, *opacity, *eta, handle, wo, u, dielectric_stack),
        _ => unreachable!("sample() must only be called on materials with a delta layer"),
    }
}

fn sample_glass(
    eta_t: f32,
    reflectance: Color,
    transmittance: Color,
    handle: MaterialHandle,
    wo: WorldVector,
    u: f32,
    dielectric_stack: &mut DielectricStack,
) -> Result<DeltaScatteringSample, DeltaScatteringError> {
    let entering = !dielectric_stack.is_inside(handle);
    let eta = if entering { eta_t } else { 1.0 / eta_t };
    let cos_i = wo.z;

    let fresnel = crate::bsdf::fresnel::dielectric(cos_i, eta);

    if u < fresnel {
        let n = WorldVector::new(0.0, 0.0, 1.0f32.copysign(cos_i));
        return Ok(DeltaScatteringSample {
            kind: DeltaKind::Reflect,
            wi: reflect(wo, n),
            attenuation: reflectance,
        });
    }

    let n = WorldVector::new(0.0, 0.0, 1.0f32.copysign(cos_i));
    let Some(wi) = refract(wo, n, 1.0 / eta) else {
        // Total internal reflection must route to Fresnel = 1, never reach here.
        let n = WorldVector::new(0.0, 0.0, 1.0f32.copysign(cos_i));
        return Ok(DeltaScatteringSample {
            kind: DeltaKind::Reflect,
            wi: reflect(wo, n),
            attenuation: reflectance,
        });
    };

    dielectric_stack.toggle(handle)?;

    // Radiance compression/expansion when crossing a boundary with differing IoR.
    let radiance_scale = 1.0 / (eta * eta);
    Ok(DeltaScatteringSample {
        kind: DeltaKind::Transmit,
        wi,
        attenuation: transmittance * radiance_scale,
    })
}

/// Perfect refractor: always transmits. `eta_t` is the relative IoR the ray crosses into
/// when entering the material from vacuum; `dielectric_stack` tracks which direction the
/// ray is currently travelling so the `eta_i / eta_t` ratio flips on exit. The only case
/// this reports as a reflection is total internal reflection, where transmission has no
/// real solution.
fn sample_refractor(
    eta_t: f32,
    transmittance: Color,
    handle: MaterialHandle,
    wo: WorldVector,
    dielectric_stack: &mut DielectricStack,
) -> Result<DeltaScatteringSample, DeltaScatteringError> {
    let entering = !dielectric_stack.is_inside(handle);
    let eta = if entering { eta_t } else { 1.0 / eta_t };
    let cos_i = wo.z;
    let n = WorldVector::new(0.0, 0.0, 1.0f32.copysign(cos_i));

    let Some(wi) = refract(wo, n, 1.0 / eta) else {
        return Ok(DeltaScatteringSample {
            kind: DeltaKind::Reflect,
            wi: reflect(wo, n),
            attenuation: transmittance,
        });
    };

    dielectric_stack.toggle(handle)?;

    let radiance_scale = 1.0 / (eta * eta);
    Ok(DeltaScatteringSample {
        kind: DeltaKind::Transmit,
        wi,
        attenuation: transmittance * radiance_scale,
    })
}

fn sample_uber_delta(
    delta_reflectance: Color,
    opacity: Color,
    eta_t: f32,
    handle: MaterialHandle,
    wo: WorldVector,
    u: f32,
    dielectric_stack: &mut DielectricStack,
) -> Result<DeltaScatteringSample, DeltaScatteringError> {
    use crate::color::is_black;

    // Uber's delta layer has up to three components: delta reflection, delta transmission
    // (unsupported), and opacity passthrough. Pick uniformly among the components that are
    // actually present, per §4.7.
    let has_reflection = !is_black(delta_reflectance);
    let has_opacity = !is_black(opacity);
    let component_count = has_reflection as u32 + has_opacity as u32;
    if component_count == 0 {
        return Err(DeltaScatteringError::UberTransmissionUnsupported);
    }

    let scaled = u * component_count as f32;
    let mut index = (scaled as u32).min(component_count - 1);
    let _u_remapped = scaled - index as f32;

    if has_reflection {
        if index == 0 {
            let n = WorldVector::new(0.0, 0.0, 1.0f32.copysign(wo.z));
            return Ok(DeltaScatteringSample {
                kind: DeltaKind::Reflect,
                wi: reflect(wo, n),
                attenuation: delta_reflectance,
            });
        }
        index -= 1;
    }

    if has_opacity && index == 0 {
        let _ = (eta_t, dielectric_stack);
        return Ok(DeltaScatteringSample {
            kind: DeltaKind::Passthrough,
            wi: -wo,
            attenuation: opacity,
        });
    }

    Err(DeltaScatteringError::UberTransmissionUnsupported)
}

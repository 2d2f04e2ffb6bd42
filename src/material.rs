//! Material parameter storage and the tagged-variant dispatch that replaces the teacher
//! material registry's `Material_Data` union and the original renderer's virtual material
//! hierarchy (see `DESIGN.md`).

use crate::bsdf::{
    Bsdf, CoatedDiffuse, DielectricLobe, DiffuseTransmission, FourierBsdf, FourierTable,
    Lambertian, Metal,
};
use crate::color::Color;

/// Index into a [`MaterialTable`]. Replaces the teacher's process-wide `static Materials
/// materials;` registry: the scene owns the table and hands out handles, workers borrow it.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct MaterialHandle(pub u32);

#[derive(Clone, Debug)]
pub enum Material {
    Lambertian {
        reflectance: Color,
    },
    Metal {
        eta: Color,
        k: Color,
        alpha_x: f32,
        alpha_y: f32,
    },
    Plastic {
        diffuse_reflectance: Color,
        specular_reflectance: Color,
        alpha_x: f32,
        alpha_y: f32,
    },
    CoatedDiffuse {
        diffuse_reflectance: Color,
        specular_reflectance: Color,
        exponent: f32,
    },
    DiffuseTransmission {
        reflectance: Color,
        transmittance: Color,
    },
    Fourier {
        table: std::sync::Arc<FourierTable>,
    },
    /// Delta-only: always reflects, `attenuation = reflectance`.
    PerfectMirror {
        reflectance: Color,
    },
    /// Delta-only: always transmits/reflects per Fresnel, the "glass" rule of §4.7.
    PerfectGlass {
        eta: f32,
        reflectance: Color,
        transmittance: Color,
    },
    /// Delta-only: always transmits, branching on nested-dielectric state to pick the
    /// `eta_i / eta_t` direction (§4.7). Unlike [`Material::PerfectGlass`] there is no
    /// Fresnel reflection component; total internal reflection is the only case where the
    /// event is a reflection rather than a transmission.
    PerfectRefractor {
        eta: f32,
        transmittance: Color,
    },
    /// PBRT3 Uber material: a rough dielectric lobe (handled here as a finite BSDF) plus an
    /// optional delta reflection component and an opacity (passthrough) component, both
    /// handled by [`crate::delta`]. Delta transmission is a reported error (§4.7, §9).
    Uber {
        diffuse_reflectance: Color,
        specular_reflectance: Color,
        alpha_x: f32,
        alpha_y: f32,
        delta_reflectance: Color,
        opacity: Color,
        eta: f32,
        /// Probability mass, at sample time, assigned to the delta layer versus the finite
        /// dielectric lobe.
        delta_layer_selection_probability: f32,
    },
}

impl Material {
    /// The finite (non-delta) BSDF this material contributes, if any. `None` for materials
    /// that are purely delta (perfect mirror/glass).
    pub fn finite_bsdf(&self) -> Option<Bsdf> {
        match self {
            Material::Lambertian { reflectance } => Some(Bsdf::Lambertian(Lambertian {
                reflectance: *reflectance,
            })),
            Material::Metal { eta, k, alpha_x, alpha_y } => Some(Bsdf::Metal(Metal {
                eta: *eta,
                k: *k,
                alpha_x: *alpha_x,
                alpha_y: *alpha_y,
            })),
            Material::Plastic {
                diffuse_reflectance,
                specular_reflectance,
                alpha_x,
                alpha_y,
            } => Some(Bsdf::DielectricLobe(DielectricLobe {
                diffuse_reflectance: *diffuse_reflectance,
                specular_reflectance: *specular_reflectance,
                alpha_x: *alpha_x,
                alpha_y: *alpha_y,
            })),
            Material::CoatedDiffuse {
                diffuse_reflectance,
                specular_reflectance,
                exponent,
            } => Some(Bsdf::CoatedDiffuse(CoatedDiffuse {
                diffuse_reflectance: *diffuse_reflectance,
                specular_reflectance: *specular_reflectance,
                exponent: *exponent,
            })),
            Material::DiffuseTransmission { reflectance, transmittance } => {
                Some(Bsdf::DiffuseTransmission(DiffuseTransmission {
                    reflectance: *reflectance,
                    transmittance: *transmittance,
                }))
            }
            Material::Fourier { table } => Some(Bsdf::Fourier(FourierBsdf { table: table.clone() })),
            Material::PerfectMirror { .. }
            | Material::PerfectGlass { .. }
            | Material::PerfectRefractor { .. } => None,
            Material::Uber {
                diffuse_reflectance,
                specular_reflectance,
                alpha_x,
                alpha_y,
                ..
            } => Some(Bsdf::DielectricLobe(DielectricLobe {
                diffuse_reflectance: *diffuse_reflectance,
                specular_reflectance: *specular_reflectance,
                alpha_x: *alpha_x,
                alpha_y: *alpha_y,
            })),
        }
    }

    /// Probability mass assigned to the delta layer at sample time: `1.0` for delta-only
    /// materials, `0.0` for purely finite ones, and the configured split for Uber.
    pub fn delta_layer_selection_probability(&self) -> f32 {
        match self {
            Material::PerfectMirror { .. }
            | Material::PerfectGlass { .. }
            | Material::PerfectRefractor { .. } => 1.0,
            Material::Uber {
                delta_layer_selection_probability,
                ..
            } => *delta_layer_selection_probability,
            _ => 0.0,
        }
    }

    pub fn has_delta_layer(&self) -> bool {
        self.delta_layer_selection_probability() > 0.0
    }
}

/// Owns every material referenced by a scene; workers hold only a shared reference.
#[derive(Clone, Debug, Default)]
pub struct MaterialTable {
    materials: Vec<Material>,
}

impl MaterialTable {
    pub fn new() -> Self {
        MaterialTable { materials: Vec::new() }
    }

    pub fn insert(&mut self, material: Material) -> MaterialHandle {
        self.materials.push(material);
        MaterialHandle((self.materials.len() - 1) as u32)
    }

    pub fn get(&self, handle: MaterialHandle) -> &Material {
        &self.materials[handle.0 as usize]
    }

    pub fn len(&self) -> usize {
        self.materials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use assert2::assert;

    #[test]
    fn perfect_mirror_has_no_finite_bsdf_and_full_delta_weight() {
        let material = Material::PerfectMirror {
            reflectance: Color::new(0.9, 0.9, 0.9),
        };
        assert!(material.finite_bsdf().is_none());
        assert!(material.delta_layer_selection_probability() == 1.0);
    }

    #[test]
    fn lambertian_has_finite_bsdf_and_no_delta_weight() {
        let material = Material::Lambertian {
            reflectance: Color::new(0.5, 0.5, 0.5),
        };
        assert!(material.finite_bsdf().is_some());
        assert!(material.delta_layer_selection_probability() == 0.0);
    }

    #[test]
    fn material_table_round_trips_handles() {
        let mut table = MaterialTable::new();
        let handle = table.insert(Material::Lambertian {
            reflectance: Color::new(0.1, 0.2, 0.3),
        });
        assert!(matches!(table.get(handle), Material::Lambertian { .. }));
    }
}

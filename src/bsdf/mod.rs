//! Local-frame BSDF evaluation, sampling, and pdf. Every variant is a plain value (no heap
//! allocation, no virtual dispatch): it is built once per hit in the worker's per-thread
//! scratch region and consumed before the next hit.

mod coated_diffuse;
mod dielectric_lobe;
mod diffuse_transmission;
mod fourier;
pub mod fresnel;
mod lambertian;
mod metal;
pub mod microfacet;

pub use coated_diffuse::CoatedDiffuse;
pub use dielectric_lobe::DielectricLobe;
pub use diffuse_transmission::DiffuseTransmission;
pub use fourier::{FourierBsdf, FourierTable};
pub use lambertian::Lambertian;
pub use metal::Metal;
pub use microfacet::RoughnessRemap;

use crate::color::Color;
use crate::geometry::WorldVector;
use crate::sampling::Sample2D;

/// Orthonormal shading frame (tangent, bitangent, normal). BSDF math happens entirely in this
/// local space, where the surface normal is `+z`.
#[derive(Copy, Clone, Debug)]
pub struct Frame {
    t: WorldVector,
    b: WorldVector,
    n: WorldVector,
}

impl Frame {
    pub fn new(t: WorldVector, b: WorldVector, n: WorldVector) -> Self {
        Frame { t, b, n }
    }

    /// Builds an arbitrary orthonormal frame around `n` (Duff et al. 2017, branchless).
    pub fn from_normal(n: WorldVector) -> Self {
        let sign = 1.0_f32.copysign(n.z);
        let a = -1.0 / (sign + n.z);
        let b = n.x * n.y * a;
        let t = WorldVector::new(1.0 + sign * n.x * n.x * a, sign * b, -sign * n.x);
        let bitangent = WorldVector::new(b, sign + n.y * n.y * a, -n.y);
        Frame { t, b: bitangent, n }
    }

    pub fn to_local(&self, v: WorldVector) -> WorldVector {
        WorldVector::new(v.dot(&self.t), v.dot(&self.b), v.dot(&self.n))
    }

    pub fn to_world(&self, v: WorldVector) -> WorldVector {
        self.t * v.x + self.b * v.y + self.n * v.z
    }
}

/// Outcome of sampling a direction from a finite (non-delta) BSDF.
#[derive(Copy, Clone, Debug)]
pub struct BsdfSample {
    /// Incident direction in local shading space, pointing away from the surface.
    pub wi: WorldVector,
    pub f: Color,
    pub pdf: f32,
}

/// A finite (non-delta) BSDF. Delta scattering (perfect mirrors, glass, Uber's delta layer)
/// lives in [`crate::delta`] instead, since its pdf is a distribution rather than a density.
#[derive(Clone, Debug)]
pub enum Bsdf {
    Lambertian(Lambertian),
    Metal(Metal),
    /// Shared finite lobe for Plastic and Uber: a diffuse term plus a GGX microfacet term,
    /// equally weighted at sample time.
    DielectricLobe(DielectricLobe),
    CoatedDiffuse(CoatedDiffuse),
    DiffuseTransmission(DiffuseTransmission),
    Fourier(FourierBsdf),
}

impl Bsdf {
    /// Evaluates `f(wo, wi)`, both directions in local shading space pointing away from the
    /// surface.
    pub fn evaluate(&self, wo: WorldVector, wi: WorldVector) -> Color {
        match self {
            Bsdf::Lambertian(b) => b.evaluate(wo, wi),
            Bsdf::Metal(b) => b.evaluate(wo, wi),
            Bsdf::DielectricLobe(b) => b.evaluate(wo, wi),
            Bsdf::CoatedDiffuse(b) => b.evaluate(wo, wi),
            Bsdf::DiffuseTransmission(b) => b.evaluate(wo, wi),
            Bsdf::Fourier(b) => b.evaluate(wo, wi),
        }
    }

    pub fn sample(&self, wo: WorldVector, u: Sample2D) -> Option<BsdfSample> {
        match self {
            Bsdf::Lambertian(b) => b.sample(wo, u),
            Bsdf::Metal(b) => b.sample(wo, u),
            Bsdf::DielectricLobe(b) => b.sample(wo, u),
            Bsdf::CoatedDiffuse(b) => b.sample(wo, u),
            Bsdf::DiffuseTransmission(b) => b.sample(wo, u),
            Bsdf::Fourier(b) => b.sample(wo, u),
        }
    }

    pub fn pdf(&self, wo: WorldVector, wi: WorldVector) -> f32 {
        match self {
            Bsdf::Lambertian(b) => b.pdf(wo, wi),
            Bsdf::Metal(b) => b.pdf(wo, wi),
            Bsdf::DielectricLobe(b) => b.pdf(wo, wi),
            Bsdf::CoatedDiffuse(b) => b.pdf(wo, wi),
            Bsdf::DiffuseTransmission(b) => b.pdf(wo, wi),
            Bsdf::Fourier(b) => b.pdf(wo, wi),
        }
    }
}

pub(crate) fn same_hemisphere(a: WorldVector, b: WorldVector) -> bool {
    a.z * b.z > 0.0
}

#[cfg(test)]
mod test {
    use super::*;
    use assert2::assert;

    #[test]
    fn frame_round_trips_world_vectors() {
        let frame = Frame::from_normal(WorldVector::new(0.0, 0.0, 1.0).normalize());
        let v = WorldVector::new(0.3, -0.6, 0.8);
        let local = frame.to_local(v);
        let back = frame.to_world(local);
        assert!((back - v).norm() < 1e-5);
    }

    #[test]
    fn frame_from_tilted_normal_keeps_n_mapping_to_local_z() {
        let n = WorldVector::new(1.0, 1.0, 1.0).normalize();
        let frame = Frame::from_normal(n);
        let local_n = frame.to_local(n);
        assert!((local_n - WorldVector::new(0.0, 0.0, 1.0)).norm() < 1e-5);
    }
}

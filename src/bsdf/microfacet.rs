//! GGX microfacet distribution, masking-shadowing, and visible-normal importance sampling.
//! Shared by [`super::metal::Metal`] and [`super::dielectric_lobe::DielectricLobe`].

use crate::geometry::WorldVector;
use crate::sampling::Sample2D;
use std::f32::consts::PI;

/// Roughness-to-alpha remap. The non-PBRT3 scene format picks one of the two simple remaps;
/// PBRT3-format scenes use the log-polynomial remap so that artist-authored `.pbrt` roughness
/// values keep their original appearance.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RoughnessRemap {
    Square,
    SquareRoot,
    Pbrt3,
}

pub fn roughness_to_alpha(roughness: f32, remap: RoughnessRemap) -> f32 {
    let roughness = roughness.max(1e-3);
    match remap {
        RoughnessRemap::Square => roughness * roughness,
        RoughnessRemap::SquareRoot => roughness.sqrt(),
        RoughnessRemap::Pbrt3 => {
            let x = roughness.ln();
            1.62142
                + 0.819955 * x
                + 0.1734 * x * x
                + 0.0171201 * x * x * x
                + 0.000640711 * x * x * x * x
        }
    }
}

/// Anisotropic GGX normal distribution function, parameterised directly by the half vector's
/// local-frame components (equivalent to the `cos^2(phi)/alpha_x^2 + sin^2(phi)/alpha_y^2`
/// form, but avoids recovering `phi` from `atan2`).
pub fn d(wh: WorldVector, alpha_x: f32, alpha_y: f32) -> f32 {
    let cos2_theta = wh.z * wh.z;
    if cos2_theta <= 0.0 {
        return 0.0;
    }
    let e = (wh.x * wh.x) / (alpha_x * alpha_x) + (wh.y * wh.y) / (alpha_y * alpha_y) + cos2_theta;
    1.0 / (PI * alpha_x * alpha_y * e * e)
}

pub fn lambda(v: WorldVector, alpha_x: f32, alpha_y: f32) -> f32 {
    if v.z.abs() >= 1.0 - 1e-7 {
        return 0.0;
    }
    let cos2_theta = v.z * v.z;
    let alpha2_tan2_theta = (alpha_x * alpha_x * v.x * v.x + alpha_y * alpha_y * v.y * v.y) / cos2_theta;
    (-1.0 + (1.0 + alpha2_tan2_theta).sqrt()) / 2.0
}

pub fn g1(v: WorldVector, alpha_x: f32, alpha_y: f32) -> f32 {
    1.0 / (1.0 + lambda(v, alpha_x, alpha_y))
}

pub fn g(wo: WorldVector, wi: WorldVector, alpha_x: f32, alpha_y: f32) -> f32 {
    1.0 / (1.0 + lambda(wo, alpha_x, alpha_y) + lambda(wi, alpha_x, alpha_y))
}

/// Samples a half-vector from the distribution of visible normals (Heitz 2018), so that the
/// resulting BSDF sampling pdf matches `pdf_wh` below without needing rejection sampling.
pub fn sample_wh(wo: WorldVector, alpha_x: f32, alpha_y: f32, u: Sample2D) -> WorldVector {
    let wo_h = WorldVector::new(alpha_x * wo.x, alpha_y * wo.y, wo.z).normalize();
    let wo_h = if wo_h.z < 0.0 { -wo_h } else { wo_h };

    let t1 = if wo_h.z < 0.999 {
        WorldVector::new(0.0, 0.0, 1.0).cross(&wo_h).normalize()
    } else {
        WorldVector::new(1.0, 0.0, 0.0)
    };
    let t2 = wo_h.cross(&t1);

    let r = u.x.sqrt();
    let phi = 2.0 * PI * u.y;
    let p1 = r * phi.cos();
    let p2_raw = r * phi.sin();
    let s = 0.5 * (1.0 + wo_h.z);
    let p2 = (1.0 - s) * (1.0 - p1 * p1).max(0.0).sqrt() + s * p2_raw;
    let pz = (1.0 - p1 * p1 - p2 * p2).max(0.0).sqrt();

    let nh = t1 * p1 + t2 * p2 + wo_h * pz;

    WorldVector::new(alpha_x * nh.x, alpha_y * nh.y, nh.z.max(1e-6)).normalize()
}

/// pdf of the half-vector produced by [`sample_wh`].
pub fn pdf_wh(wo: WorldVector, wh: WorldVector, alpha_x: f32, alpha_y: f32) -> f32 {
    g1(wo, alpha_x, alpha_y) * d(wh, alpha_x, alpha_y) * wo.dot(&wh).abs() / wo.z.abs().max(1e-8)
}

/// pdf of a sampled direction for the reflection Jacobian.
pub fn pdf_reflection(wo: WorldVector, wh: WorldVector, alpha_x: f32, alpha_y: f32) -> f32 {
    let denom = 4.0 * wo.dot(&wh).abs();
    if denom <= 0.0 {
        0.0
    } else {
        pdf_wh(wo, wh, alpha_x, alpha_y) / denom
    }
}

/// pdf of a sampled direction for the transmission Jacobian.
pub fn pdf_transmission(
    wo: WorldVector,
    wi: WorldVector,
    wh: WorldVector,
    eta_o: f32,
    eta_i: f32,
    alpha_x: f32,
    alpha_y: f32,
) -> f32 {
    let denom_sqrt = eta_o * wo.dot(&wh) + eta_i * wi.dot(&wh);
    let denom = denom_sqrt * denom_sqrt;
    if denom <= 0.0 {
        0.0
    } else {
        pdf_wh(wo, wh, alpha_x, alpha_y) * eta_i * eta_i * wi.dot(&wh).abs() / denom
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use assert2::assert;

    #[test]
    fn perfectly_smooth_surface_concentrates_normal_at_the_pole() {
        let alpha = 1e-3;
        let wh_on_axis = WorldVector::new(0.0, 0.0, 1.0);
        let wh_off_axis = WorldVector::new(0.2, 0.0, 0.98).normalize();
        assert!(d(wh_on_axis, alpha, alpha) > d(wh_off_axis, alpha, alpha));
    }

    #[test]
    fn masking_shadowing_is_symmetric() {
        let alpha = 0.3;
        let wo = WorldVector::new(0.3, 0.1, 0.9).normalize();
        let wi = WorldVector::new(-0.2, 0.2, 0.95).normalize();
        assert!((g(wo, wi, alpha, alpha) - g(wi, wo, alpha, alpha)).abs() < 1e-6);
    }

    #[test]
    fn g1_is_bounded_by_one() {
        let alpha = 0.5;
        let v = WorldVector::new(0.6, 0.0, 0.8);
        assert!(g1(v, alpha, alpha) <= 1.0);
        assert!(g1(v, alpha, alpha) > 0.0);
    }

    #[test]
    fn sampled_half_vectors_stay_in_upper_hemisphere() {
        let wo = WorldVector::new(0.3, 0.1, 0.94).normalize();
        for (ux, uy) in [(0.1, 0.2), (0.9, 0.1), (0.5, 0.5), (0.01, 0.99)] {
            let wh = sample_wh(wo, 0.3, 0.3, Sample2D::new(ux, uy));
            assert!(wh.z >= 0.0);
            assert!((wh.norm() - 1.0).abs() < 1e-4);
        }
    }
}

use std::f32::consts::PI;

use crate::color::{Color, is_black};
use crate::geometry::WorldVector;
use crate::sampling::{Sample2D, cosine_hemisphere_pdf, cosine_sample_hemisphere};

use super::fresnel;
use super::{BsdfSample, same_hemisphere};

/// Ashikhmin-Shirley (1998) diffuse+specular plate model. Distinct from [`super::DielectricLobe`]
/// (which models Plastic/Uber with a GGX specular term): Coated Diffuse's specular lobe is an
/// isotropic Phong distribution and its diffuse term is Fresnel-attenuated so the two lobes
/// conserve energy by construction.
#[derive(Copy, Clone, Debug)]
pub struct CoatedDiffuse {
    pub diffuse_reflectance: Color,
    pub specular_reflectance: Color,
    /// Phong exponent of the coat's specular lobe; higher is glossier.
    pub exponent: f32,
}

impl CoatedDiffuse {
    fn diffuse_f(&self, wo: WorldVector, wi: WorldVector) -> Color {
        if !same_hemisphere(wo, wi) {
            return Color::new(0.0, 0.0, 0.0);
        }
        let cos_i = wi.z.abs();
        let cos_o = wo.z.abs();
        let pow5 = |x: f32| {
            let m = (1.0 - x / 2.0).clamp(0.0, 1.0);
            let m2 = m * m;
            m2 * m2 * m
        };
        let scale = (28.0 / (23.0 * PI)) * (1.0 - pow5(cos_i)) * (1.0 - pow5(cos_o));
        self.diffuse_reflectance * scale
    }

    fn specular_f(&self, wo: WorldVector, wi: WorldVector) -> Color {
        if !same_hemisphere(wo, wi) {
            return Color::new(0.0, 0.0, 0.0);
        }
        let wh = wo + wi;
        if wh.norm_squared() < 1e-12 {
            return Color::new(0.0, 0.0, 0.0);
        }
        let wh = wh.normalize();
        let cos_theta_h = wh.z.abs();
        let cos_i = wi.z.abs();
        let cos_o = wo.z.abs();
        let wo_dot_wh = wo.dot(&wh).abs();

        let norm = (self.exponent + 1.0) / (8.0 * PI);
        let lobe = cos_theta_h.powf(self.exponent);
        let fresnel_r0 = (self.specular_reflectance.r + self.specular_reflectance.g + self.specular_reflectance.b) / 3.0;
        let f = fresnel::schlick(wo_dot_wh, fresnel_r0);

        let denom = wo_dot_wh * cos_i.max(cos_o);
        if denom <= 1e-8 {
            return Color::new(0.0, 0.0, 0.0);
        }
        self.specular_reflectance * (norm * lobe * f / denom)
    }

    pub fn evaluate(&self, wo: WorldVector, wi: WorldVector) -> Color {
        self.diffuse_f(wo, wi) + self.specular_f(wo, wi)
    }

    fn specular_half_pdf(&self, wo: WorldVector, wh: WorldVector) -> f32 {
        let cos_theta_h = wh.z.abs();
        (self.exponent + 1.0) / (2.0 * PI) * cos_theta_h.powf(self.exponent)
    }

    fn specular_pdf(&self, wo: WorldVector, wi: WorldVector) -> f32 {
        if !same_hemisphere(wo, wi) {
            return 0.0;
        }
        let wh = wo + wi;
        if wh.norm_squared() < 1e-12 {
            return 0.0;
        }
        let wh = wh.normalize();
        let denom = 4.0 * wo.dot(&wh).abs();
        if denom <= 1e-8 {
            0.0
        } else {
            self.specular_half_pdf(wo, wh) / denom
        }
    }

    fn diffuse_pdf(&self, wo: WorldVector, wi: WorldVector) -> f32 {
        if !same_hemisphere(wo, wi) {
            return 0.0;
        }
        cosine_hemisphere_pdf(wi.z.abs())
    }

    pub fn sample(&self, wo: WorldVector, u: Sample2D) -> Option<BsdfSample> {
        if is_black(self.diffuse_reflectance) && is_black(self.specular_reflectance) {
            return None;
        }
        let sample_diffuse = is_black(self.specular_reflectance)
            || (!is_black(self.diffuse_reflectance) && u.x < 0.5);

        let wi = if sample_diffuse {
            let u_remapped = Sample2D::new((u.x * 2.0).min(0.999_999_9), u.y);
            let mut wi = cosine_sample_hemisphere(u_remapped);
            if wo.z < 0.0 {
                wi.z = -wi.z;
            }
            wi
        } else {
            let u_remapped = Sample2D::new(((u.x - 0.5) * 2.0).max(0.0), u.y);
            let cos_theta_h = (1.0 - u_remapped.x).powf(1.0 / (self.exponent + 1.0));
            let sin_theta_h = (1.0 - cos_theta_h * cos_theta_h).max(0.0).sqrt();
            let phi = 2.0 * PI * u_remapped.y;
            let mut wh = WorldVector::new(sin_theta_h * phi.cos(), sin_theta_h * phi.sin(), cos_theta_h);
            if wo.z < 0.0 {
                wh = -wh;
            }
            2.0 * wo.dot(&wh) * wh - wo
        };

        if !same_hemisphere(wo, wi) {
            return None;
        }
        let pdf = self.pdf(wo, wi);
        if pdf <= 0.0 {
            return None;
        }
        Some(BsdfSample {
            wi,
            f: self.evaluate(wo, wi),
            pdf,
        })
    }

    pub fn pdf(&self, wo: WorldVector, wi: WorldVector) -> f32 {
        let has_diffuse = !is_black(self.diffuse_reflectance);
        let has_specular = !is_black(self.specular_reflectance);
        match (has_diffuse, has_specular) {
            (true, true) => 0.5 * self.diffuse_pdf(wo, wi) + 0.5 * self.specular_pdf(wo, wi),
            (true, false) => self.diffuse_pdf(wo, wi),
            (false, true) => self.specular_pdf(wo, wi),
            (false, false) => 0.0,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use assert2::assert;

    fn coat() -> CoatedDiffuse {
        CoatedDiffuse {
            diffuse_reflectance: Color::new(0.5, 0.4, 0.3),
            specular_reflectance: Color::new(0.04, 0.04, 0.04),
            exponent: 20.0,
        }
    }

    #[test]
    fn sample_pdf_matches_pdf_query() {
        let c = coat();
        let wo = WorldVector::new(0.1, 0.0, 0.995).normalize();
        for (ux, uy) in [(0.1, 0.2), (0.5, 0.5), (0.9, 0.3), (0.51, 0.7)] {
            if let Some(sample) = c.sample(wo, Sample2D::new(ux, uy)) {
                assert!((sample.pdf - c.pdf(wo, sample.wi)).abs() < 1e-3);
            }
        }
    }

    #[test]
    fn opposite_hemisphere_is_black() {
        let c = coat();
        let f = c.evaluate(WorldVector::new(0.0, 0.0, 1.0), WorldVector::new(0.0, 0.0, -1.0));
        assert!(f.r == 0.0 && f.g == 0.0 && f.b == 0.0);
    }
}

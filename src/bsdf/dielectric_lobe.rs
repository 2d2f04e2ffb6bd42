use crate::color::{Color, is_black};
use crate::geometry::WorldVector;
use crate::sampling::{Sample2D, cosine_hemisphere_pdf, cosine_sample_hemisphere};

use super::microfacet;
use super::{BsdfSample, same_hemisphere};

/// Shared finite lobe for Plastic, Coated Diffuse and Uber: an equally-weighted mix of a
/// Lambertian diffuse term and a GGX microfacet reflection term. Uber's delta reflection,
/// delta transmission and opacity components are handled separately by [`crate::delta`]; this
/// struct only ever represents the rough/diffuse part of the material.
#[derive(Copy, Clone, Debug)]
pub struct DielectricLobe {
    pub diffuse_reflectance: Color,
    pub specular_reflectance: Color,
    pub alpha_x: f32,
    pub alpha_y: f32,
}

impl DielectricLobe {
    fn diffuse_f(&self, wo: WorldVector, wi: WorldVector) -> Color {
        if !same_hemisphere(wo, wi) {
            return Color::new(0.0, 0.0, 0.0);
        }
        self.diffuse_reflectance * (1.0 / std::f32::consts::PI)
    }

    fn diffuse_pdf(&self, wo: WorldVector, wi: WorldVector) -> f32 {
        if !same_hemisphere(wo, wi) {
            return 0.0;
        }
        cosine_hemisphere_pdf(wi.z.abs())
    }

    fn specular_half_vector(&self, wo: WorldVector, wi: WorldVector) -> Option<WorldVector> {
        if !same_hemisphere(wo, wi) {
            return None;
        }
        let wh = wo + wi;
        if wh.norm_squared() < 1e-12 {
            return None;
        }
        let mut wh = wh.normalize();
        if wh.z < 0.0 {
            wh = -wh;
        }
        Some(wh)
    }

    fn specular_f(&self, wo: WorldVector, wi: WorldVector) -> Color {
        let Some(wh) = self.specular_half_vector(wo, wi) else {
            return Color::new(0.0, 0.0, 0.0);
        };
        let cos_o = wo.z.abs();
        let cos_i = wi.z.abs();
        if cos_o <= 0.0 || cos_i <= 0.0 {
            return Color::new(0.0, 0.0, 0.0);
        }
        let d = microfacet::d(wh, self.alpha_x, self.alpha_y);
        let g = microfacet::g(wo, wi, self.alpha_x, self.alpha_y);
        self.specular_reflectance * (d * g / (4.0 * cos_o * cos_i))
    }

    fn specular_pdf(&self, wo: WorldVector, wi: WorldVector) -> f32 {
        let Some(wh) = self.specular_half_vector(wo, wi) else {
            return 0.0;
        };
        let wo_upper = if wo.z < 0.0 { -wo } else { wo };
        microfacet::pdf_reflection(wo_upper, wh, self.alpha_x, self.alpha_y)
    }

    pub fn evaluate(&self, wo: WorldVector, wi: WorldVector) -> Color {
        self.diffuse_f(wo, wi) + self.specular_f(wo, wi)
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
            if wo.z == 0.0 {
                return None;
            }
            let u_remapped = Sample2D::new(((u.x - 0.5) * 2.0).max(0.0), u.y);
            let wo_upper = if wo.z < 0.0 { -wo } else { wo };
            let wh = microfacet::sample_wh(wo_upper, self.alpha_x, self.alpha_y, u_remapped);
            let wi_upper = 2.0 * wo_upper.dot(&wh) * wh - wo_upper;
            if wo.z < 0.0 { -wi_upper } else { wi_upper }
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

    fn lobe() -> DielectricLobe {
        DielectricLobe {
            diffuse_reflectance: Color::new(0.4, 0.4, 0.4),
            specular_reflectance: Color::new(0.1, 0.1, 0.1),
            alpha_x: 0.1,
            alpha_y: 0.1,
        }
    }

    #[test]
    fn sample_pdf_matches_pdf_query() {
        let l = lobe();
        let wo = WorldVector::new(0.1, 0.0, 0.995).normalize();
        for (ux, uy) in [(0.1, 0.2), (0.5, 0.5), (0.9, 0.3), (0.51, 0.7)] {
            if let Some(sample) = l.sample(wo, Sample2D::new(ux, uy)) {
                assert!((sample.pdf - l.pdf(wo, sample.wi)).abs() < 1e-4);
            }
        }
    }

    #[test]
    fn pure_diffuse_matches_lambertian_pdf() {
        let l = DielectricLobe {
            diffuse_reflectance: Color::new(0.5, 0.5, 0.5),
            specular_reflectance: Color::new(0.0, 0.0, 0.0),
            alpha_x: 0.1,
            alpha_y: 0.1,
        };
        let wo = WorldVector::new(0.0, 0.0, 1.0);
        let wi = WorldVector::new(0.3, 0.2, 0.93).normalize();
        assert!((l.pdf(wo, wi) - cosine_hemisphere_pdf(wi.z)).abs() < 1e-6);
    }
}

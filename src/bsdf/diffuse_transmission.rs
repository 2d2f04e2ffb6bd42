use std::f32::consts::PI;

use crate::color::{Color, max_component};
use crate::geometry::WorldVector;
use crate::sampling::{Sample2D, cosine_hemisphere_pdf, cosine_sample_hemisphere};

use super::BsdfSample;

/// A thin, perfectly diffuse slab: scatters into both hemispheres, with independent diffuse
/// reflectance and transmittance.
#[derive(Copy, Clone, Debug)]
pub struct DiffuseTransmission {
    pub reflectance: Color,
    pub transmittance: Color,
}

impl DiffuseTransmission {
    fn reflect_probability(&self) -> f32 {
        let r = max_component(self.reflectance);
        let t = max_component(self.transmittance);
        if r + t <= 0.0 { 0.5 } else { r / (r + t) }
    }

    pub fn evaluate(&self, wo: WorldVector, wi: WorldVector) -> Color {
        if wo.z * wi.z > 0.0 {
            self.reflectance * (1.0 / PI)
        } else {
            self.transmittance * (1.0 / PI)
        }
    }

    pub fn sample(&self, wo: WorldVector, u: Sample2D) -> Option<BsdfSample> {
        let reflect_probability = self.reflect_probability();
        let reflect = u.x < reflect_probability;
        let u_remapped = if reflect {
            Sample2D::new((u.x / reflect_probability.max(1e-6)).min(0.999_999_9), u.y)
        } else {
            Sample2D::new(
                ((u.x - reflect_probability) / (1.0 - reflect_probability).max(1e-6)).min(0.999_999_9),
                u.y,
            )
        };

        let mut wi = cosine_sample_hemisphere(u_remapped);
        let same_side_as_wo = wo.z >= 0.0;
        let wi_same_side = if reflect { same_side_as_wo } else { !same_side_as_wo };
        if !wi_same_side {
            wi.z = -wi.z;
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
        let reflect_probability = self.reflect_probability();
        let cos_pdf = cosine_hemisphere_pdf(wi.z.abs());
        if wo.z * wi.z > 0.0 {
            reflect_probability * cos_pdf
        } else {
            (1.0 - reflect_probability) * cos_pdf
        }
    }
}

//! Render configuration surface (§6 External Interfaces), deserialized from a TOML file by
//! the CLI binary.

use serde::Deserialize;

#[derive(Copy, Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RenderingAlgorithm {
    /// Emitted + single-bounce next-event-estimation at the first hit only; no path
    /// continuation. Mirrors the reference's older, non-MIS `compute_direct_lighting` mode.
    DirectLighting,
    /// The full Monte-Carlo path tracer of §4.8.
    PathTracer,
}

#[derive(Copy, Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PixelFilterType {
    Box,
    Gaussian,
    Triangle,
}

#[derive(Copy, Clone, Debug, Deserialize)]
pub struct RaytracerConfig {
    pub rendering_algorithm: RenderingAlgorithm,
    pub max_light_bounces: u32,
    pub pixel_filter_type: PixelFilterType,
    pub pixel_filter_radius: f32,
    pub pixel_filter_alpha: f32,
    pub x_pixel_sample_count: u32,
    pub y_pixel_sample_count: u32,
    pub russian_roulette_bounce_count_threshold: u32,
    pub russian_roulette_threshold: f32,
    /// Probability mass assigned to Uber's delta layer versus its finite dielectric lobe,
    /// when a material does not specify its own split (§4.8, §3 `Delta_Scattering`).
    #[serde(default = "default_delta_layer_selection_probability")]
    pub delta_layer_selection_probability: f32,
}

fn default_delta_layer_selection_probability() -> f32 {
    0.5
}

impl Default for RaytracerConfig {
    fn default() -> Self {
        RaytracerConfig {
            rendering_algorithm: RenderingAlgorithm::PathTracer,
            max_light_bounces: 8,
            pixel_filter_type: PixelFilterType::Box,
            pixel_filter_radius: 0.5,
            pixel_filter_alpha: 2.0,
            x_pixel_sample_count: 4,
            y_pixel_sample_count: 4,
            russian_roulette_bounce_count_threshold: 3,
            russian_roulette_threshold: 1.0,
            delta_layer_selection_probability: default_delta_layer_selection_probability(),
        }
    }
}

impl RaytracerConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use assert2::assert;

    #[test]
    fn parses_a_minimal_config() {
        let text = r#"
            rendering_algorithm = "path_tracer"
            max_light_bounces = 5
            pixel_filter_type = "box"
            pixel_filter_radius = 0.5
            pixel_filter_alpha = 2.0
            x_pixel_sample_count = 4
            y_pixel_sample_count = 4
            russian_roulette_bounce_count_threshold = 3
            russian_roulette_threshold = 1.0
        "#;
        let config = RaytracerConfig::from_toml_str(text).unwrap();
        assert!(config.rendering_algorithm == RenderingAlgorithm::PathTracer);
        assert!(config.max_light_bounces == 5);
        assert!((config.delta_layer_selection_probability - 0.5).abs() < 1e-6);
    }
}

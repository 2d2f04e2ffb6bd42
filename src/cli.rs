//! Command-line entry point: loads a mesh, builds a demo scene around it, and renders it to
//! an OpenEXR half-float image (§6 External Interfaces).

use std::path::PathBuf;

use anyhow::Context as _;
use indicatif::ProgressBar;

use yarrow::config::RaytracerConfig;
use yarrow::geometry::{ScreenSize, WorldVector};
use yarrow::kdtree::KdTreeBuildParams;
use yarrow::scene::{Scene, load_obj};
use yarrow::{Camera, Color, Light, Material, MaterialTable, RenderSettings, render};

struct Args {
    obj_path: PathBuf,
    config_path: Option<PathBuf>,
    output_path: PathBuf,
}

fn parse_args() -> anyhow::Result<Args> {
    let mut args = std::env::args_os().skip(1);
    let obj_path = args
        .next()
        .context("usage: yarrow-cli <mesh.obj> [config.toml] [output.exr]")?
        .into();
    let config_path = args.next().map(PathBuf::from);
    let output_path = args
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("output.exr"));

    Ok(Args {
        obj_path,
        config_path,
        output_path,
    })
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<RaytracerConfig> {
    match path {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config at {}", path.display()))?;
            RaytracerConfig::from_toml_str(&text)
                .with_context(|| format!("failed to parse config at {}", path.display()))
        }
        None => Ok(RaytracerConfig::default()),
    }
}

fn build_scene(obj_path: &std::path::Path) -> anyhow::Result<(Scene, Camera)> {
    let mesh = load_obj(obj_path).with_context(|| format!("failed to load mesh {}", obj_path.display()))?;

    let mut materials = MaterialTable::new();
    let handle = materials.insert(Material::Lambertian {
        reflectance: Color::new(0.7, 0.7, 0.7),
    });
    let triangle_materials = vec![handle; mesh.triangle_count()];

    let lights = vec![Light::Environment {
        radiance: Color::new(0.6, 0.65, 0.75),
    }];

    let bounds = mesh.bounds();
    let scene = Scene::build(mesh, materials, triangle_materials, lights, &KdTreeBuildParams::default())
        .context("failed to build kd-tree")?;

    let center = nalgebra::center(&bounds.min, &bounds.max);
    let radius = (bounds.max - bounds.min).norm().max(1e-3);
    let camera = Camera::builder()
        .center(center + WorldVector::new(0.0, -radius * 2.0, radius * 0.6))
        .forward(WorldVector::new(0.0, 1.0, -0.2))
        .up(WorldVector::new(0.0, 0.0, 1.0))
        .resolution(ScreenSize::new(1280, 720))
        .film_width(36e-3)
        .focal_length(50e-3)
        .f_number(8.0)
        .focus_distance(radius.max(1.0) as f32)
        .build();

    Ok((scene, camera))
}

fn write_exr(path: &std::path::Path, buffer: &yarrow::FilmBuffer) -> anyhow::Result<()> {
    use exr::prelude::*;

    let width = buffer.width() as usize;
    let pixels = buffer.pixels();

    let channels = SpecificChannels::rgb(|position: Vec2<usize>| {
        let color = pixels[position.y() * width + position.x()];
        (f16::from_f32(color.r), f16::from_f32(color.g), f16::from_f32(color.b))
    });
    let layer = Layer::new(
        (buffer.width() as usize, buffer.height() as usize),
        LayerAttributes::named("render"),
        Encoding::FAST_LOSSLESS,
        channels,
    );
    Image::from_layer(layer)
        .write()
        .to_file(path)
        .with_context(|| format!("failed to write {}", path.display()))
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = parse_args()?;
    let config = load_config(args.config_path.as_ref())?;
    let (scene, camera) = build_scene(&args.obj_path)?;

    let settings = RenderSettings {
        tile_size: 32.try_into().unwrap(),
        config,
        seed: 0,
    };

    let bar = ProgressBar::no_length();
    let mut render_progress = render(scene, camera, settings, |_| {}, {
        let bar = bar.clone();
        move |_, progress| {
            bar.update(|ps| {
                ps.set_len(progress.total as u64);
                ps.set_pos(progress.finished as u64)
            })
        }
    })?;
    bar.set_length(render_progress.progress().total as u64);
    render_progress.wait();
    bar.finish();

    tracing::info!(elapsed = ?render_progress.elapsed(), "render finished");

    let film = render_progress.film().lock().expect("poisoned lock");
    write_exr(&args.output_path, &film)?;

    Ok(())
}

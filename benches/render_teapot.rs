use criterion::{Criterion, criterion_group, criterion_main};
use yarrow::config::RaytracerConfig;
use yarrow::geometry::{ScreenSize, WorldPoint, WorldVector};
use yarrow::kdtree::KdTreeBuildParams;
use yarrow::scene::load_obj;
use yarrow::{Camera, Color, Light, Material, MaterialTable, RenderSettings, Scene, render};

fn criterion_benchmark(c: &mut Criterion) {
    let camera = Camera::builder()
        .center(WorldPoint::new(0.0, -5.0, 1.0))
        .forward(WorldVector::new(0.0, 1.0, 0.0))
        .up(WorldVector::new(0.0, 0.0, 1.0))
        .resolution(ScreenSize::new(512, 384))
        .film_width(36e-3)
        .focal_length(50e-3)
        .f_number(4.8)
        .focus_distance(5.0)
        .build();

    let settings = RenderSettings {
        tile_size: 64.try_into().unwrap(),
        config: RaytracerConfig {
            x_pixel_sample_count: 4,
            y_pixel_sample_count: 4,
            ..RaytracerConfig::default()
        },
        seed: 0,
    };

    let mesh = load_obj("data/teapot.obj").unwrap();
    let mut materials = MaterialTable::new();
    let handle = materials.insert(Material::Lambertian {
        reflectance: Color::new(0.7, 0.7, 0.7),
    });
    let triangle_materials = vec![handle; mesh.triangle_count()];
    let lights = vec![Light::Environment {
        radiance: Color::new(0.6, 0.65, 0.75),
    }];
    let scene = Scene::build(mesh, materials, triangle_materials, lights, &KdTreeBuildParams::default()).unwrap();

    c.bench_function("render_teapot", |b| {
        b.iter_batched(
            || (camera, settings, scene.clone()),
            |(camera, settings, scene)| {
                let mut render_progress = render(scene, camera, settings, |_| {}, |_| {}).unwrap();
                render_progress.wait();
            },
            criterion::BatchSize::LargeInput,
        )
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);

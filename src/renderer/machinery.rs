use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::camera::Camera;
use crate::color::{BLACK, Color};
use crate::geometry::{ScreenBlock, ScreenPoint};
use crate::renderer::{RenderSettings, worker::Worker};
use crate::scene::Scene;
use crate::screen_block::ScreenBlockExt as _;

/// Accumulated linear radiance per pixel, written by the workers and handed to the CLI for
/// tone-agnostic EXR output (§6: "OpenEXR half-float RGB").
pub struct FilmBuffer {
    width: u32,
    height: u32,
    pixels: Vec<Color>,
}

impl FilmBuffer {
    fn new(width: u32, height: u32) -> Self {
        FilmBuffer {
            width,
            height,
            pixels: vec![BLACK; (width as usize) * (height as usize)],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn get(&self, p: ScreenPoint) -> Color {
        self.pixels[(p.y * self.width + p.x) as usize]
    }

    fn set(&mut self, p: ScreenPoint, color: Color) {
        self.pixels[(p.y * self.width + p.x) as usize] = color;
    }

    pub fn pixels(&self) -> &[Color] {
        &self.pixels
    }
}

pub fn render<
    F1: Fn(ScreenBlock) + Send + Sync + 'static,
    F2: Fn(ScreenBlock, RenderProgressSnapshot) + Send + Sync + 'static,
>(
    scene: Scene,
    camera: Camera,
    settings: RenderSettings,
    started_tile_callback: F1,
    finished_tile_callback: F2,
) -> anyhow::Result<RenderProgress> {
    let worker_count = core_affinity::get_core_ids()
        .map(|cores| cores.len())
        .filter(|&n| n > 0)
        .unwrap_or_else(num_cpus::get);
    let cores = core_affinity::get_core_ids().unwrap_or_default();

    let resolution = camera.get_resolution();
    let film = FilmBuffer::new(resolution.x, resolution.y);

    let tile_ordering =
        ScreenBlock::new(ScreenPoint::new(0, 0), ScreenPoint::new(resolution.x, resolution.y))
            .tile_ordering(settings.tile_size);

    let state = Arc::new(RenderState {
        scene,
        camera,
        settings,

        film: Mutex::new(film),

        tile_ordering,
        next_tile_index: AtomicUsize::new(0),

        start_time: Instant::now(),
        end: Mutex::new((0, None)),
    });
    let started_tile_callback = Arc::new(started_tile_callback);
    let finished_tile_callback = Arc::new(finished_tile_callback);

    let threads = (0..worker_count)
        .map(|worker_id| {
            let state = Arc::clone(&state);
            let started_tile_callback = Arc::clone(&started_tile_callback);
            let finished_tile_callback = Arc::clone(&finished_tile_callback);
            let core = cores.get(worker_id).copied();

            thread::Builder::new()
                .name(format!("worker{worker_id}"))
                .spawn(move || {
                    if let Some(core) = core {
                        core_affinity::set_for_current(core);
                    }

                    let mut worker = Worker::new();
                    let tile_count = state.tile_ordering.len();

                    let (_, Some(mut tile)) = state.get_next_tile() else {
                        return;
                    };

                    loop {
                        (started_tile_callback)(tile.clone());

                        let rendered = worker.render_tile(&state.scene, &state.camera, &state.settings, &tile);

                        {
                            let mut film = state.film.lock().expect("poisoned lock");
                            let width = tile.width();
                            for (index, color) in rendered.into_iter().enumerate() {
                                let local = ScreenPoint::new(index as u32 % width, index as u32 / width);
                                film.set(tile.min + local.coords, color);
                            }
                        }

                        let (new_tile_id, new_tile) = state.get_next_tile();

                        (finished_tile_callback)(
                            tile.clone(),
                            RenderProgressSnapshot {
                                finished: new_tile_id.saturating_sub(worker_count),
                                total: tile_count,
                            },
                        );

                        match new_tile {
                            Some(new_tile) => tile = new_tile,
                            None => break,
                        }
                    }

                    let elapsed = Instant::elapsed(&state.start_time);
                    let mut lock = state.end.lock().unwrap();

                    lock.0 += 1;
                    if lock.0 == worker_count {
                        lock.1 = Some(elapsed);
                    }
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(RenderProgress {
        render_state: state,
        worker_count,
        threads,
    })
}

pub struct RenderProgress {
    render_state: Arc<RenderState>,
    worker_count: usize,
    threads: Vec<JoinHandle<()>>,
}

impl RenderProgress {
    /// Return number of processed and total tiles.
    pub fn progress(&self) -> RenderProgressSnapshot {
        RenderProgressSnapshot {
            finished: self
                .render_state
                .next_tile_index
                .load(Ordering::Acquire)
                .saturating_sub(self.worker_count),
            total: self.render_state.tile_ordering.len(),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.threads.iter().all(|handle| handle.is_finished())
    }

    /// Returns elapsed time since the start of the render. Stops incrementing once the
    /// render finishes.
    pub fn elapsed(&self) -> Duration {
        self.render_state
            .end
            .lock()
            .unwrap()
            .1
            .unwrap_or_else(|| self.render_state.start_time.elapsed())
    }

    /// Signal the workers to abort. Any running workers will still finish their tiles, but
    /// no new ones will be started.
    pub fn abort(&self) {
        self.render_state
            .next_tile_index
            .store(self.render_state.tile_ordering.len(), Ordering::Release);
    }

    /// Wait for the workers to finish. Blocks.
    pub fn wait(&mut self) {
        self.threads.drain(..).for_each(|handle| handle.join().unwrap());
    }

    pub fn film(&self) -> &Mutex<FilmBuffer> {
        &self.render_state.film
    }
}

pub struct RenderProgressSnapshot {
    pub finished: usize,
    pub total: usize,
}

impl RenderProgressSnapshot {
    pub fn percent(&self) -> f32 {
        100.0 * (self.finished as f32) / (self.total as f32)
    }
}

struct RenderState {
    scene: Scene,
    camera: Camera,
    settings: RenderSettings,

    film: Mutex<FilmBuffer>,

    tile_ordering: Vec<ScreenBlock>,
    next_tile_index: AtomicUsize,

    start_time: Instant,
    /// Number of workers that finished, elapsed time.
    end: Mutex<(usize, Option<Duration>)>,
}

impl RenderState {
    fn get_next_tile(&self) -> (usize, Option<&ScreenBlock>) {
        let id = self.next_tile_index.fetch_add(1, Ordering::AcqRel);
        (id, self.tile_ordering.get(id))
    }
}

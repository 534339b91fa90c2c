use std::env;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use pixels::Error as PixelsError;
use thiserror::Error;
use tracing::{info, warn};
use winit::dpi::LogicalSize;
use winit::error::{EventLoopError, OsError};
use winit::event::{Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop, EventLoopWindowTarget};
use winit::window::{Window, WindowBuilder};

use crate::content::{ContentCatalog, ContentLoadError};
use crate::{resolve_app_paths, StartupError};

use super::input::KeyboardState;
use super::metrics::{LoopMetricsSnapshot, MetricsWindow};
use super::overlay::OverlayData;
use super::rendering::{RenderFrame, Renderer, Viewport};
use super::scene::SceneLoadError;
use super::{Scene, SceneCommand, SimTime};

pub const SLOW_FRAME_ENV_VAR: &str = "PLATFORMER_SLOW_FRAME_MS";

const DEFAULT_MAX_FRAME_DELTA: Duration = Duration::from_millis(250);
const DEFAULT_METRICS_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub window_title: String,
    /// Logical framebuffer size; the window starts at this size and pixels scales on resize.
    pub window_width: u32,
    pub window_height: u32,
    pub target_tps: u32,
    pub max_frame_delta: Duration,
    pub max_ticks_per_frame: u32,
    pub metrics_log_interval: Duration,
    pub simulated_slow_frame_ms: u64,
    pub max_render_fps: Option<u32>,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            window_title: "Platformer".to_string(),
            window_width: 800,
            window_height: 600,
            target_tps: 60,
            max_frame_delta: DEFAULT_MAX_FRAME_DELTA,
            max_ticks_per_frame: 5,
            metrics_log_interval: DEFAULT_METRICS_INTERVAL,
            simulated_slow_frame_ms: 0,
            max_render_fps: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Startup(#[from] StartupError),
    #[error("failed to create event loop: {0}")]
    CreateEventLoop(#[source] EventLoopError),
    #[error("failed to create application window: {0}")]
    CreateWindow(#[source] OsError),
    #[error("failed to initialize renderer: {0}")]
    CreateRenderer(#[source] PixelsError),
    #[error("failed to load content: {0}")]
    Content(#[from] ContentLoadError),
    #[error("failed to load scene: {0}")]
    SceneLoad(#[from] SceneLoadError),
    #[error("event loop failed: {0}")]
    EventLoopRun(#[source] EventLoopError),
}

/// Loads content into `scene`, opens the window and drives the scene at a fixed tick rate
/// until it asks to quit or the window closes.
pub fn run_app(config: LoopConfig, mut scene: Box<dyn Scene>) -> Result<(), AppError> {
    let paths = resolve_app_paths()?;
    info!(
        root = %paths.root.display(),
        base_content_dir = %paths.base_content_dir.display(),
        levels_dir = %paths.levels_dir.display(),
        cache_dir = %paths.cache_dir.display(),
        "startup"
    );
    let catalog = ContentCatalog::load(&paths)?;
    scene.load(&catalog)?;
    info!(level_count = catalog.levels.len(), "scene_loaded");

    let event_loop = EventLoop::new().map_err(AppError::CreateEventLoop)?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title(config.window_title.clone())
            .with_inner_size(LogicalSize::new(
                f64::from(config.window_width),
                f64::from(config.window_height),
            ))
            .build(&event_loop)
            .map_err(AppError::CreateWindow)?,
    );
    let viewport = Viewport {
        width: config.window_width.max(1),
        height: config.window_height.max(1),
    };
    let renderer = Renderer::new(Arc::clone(&window), viewport, paths.backgrounds_dir.clone())
        .map_err(AppError::CreateRenderer)?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut state = LoopState::new(&config, scene, renderer, window);
    event_loop
        .run(move |event, target| state.handle_event(event, target))
        .map_err(AppError::EventLoopRun)
}

/// Everything the event loop closure owns between callbacks.
struct LoopState {
    scene: Box<dyn Scene>,
    renderer: Renderer,
    window: Arc<Window>,
    default_title: String,
    applied_title: Option<String>,
    keys: KeyboardState,
    clock: FixedStep,
    pacer: FramePacer,
    sim_time: SimTime,
    last_frame: Instant,
    slow_frame_delay: Duration,
    metrics: MetricsWindow,
    latest_metrics: LoopMetricsSnapshot,
    overlay_visible: bool,
    frame: RenderFrame,
}

impl LoopState {
    fn new(config: &LoopConfig, scene: Box<dyn Scene>, renderer: Renderer, window: Arc<Window>) -> Self {
        let clock = FixedStep::new(
            config.target_tps,
            non_zero_or(config.max_frame_delta, DEFAULT_MAX_FRAME_DELTA),
            config.max_ticks_per_frame,
        );
        let metrics_interval = non_zero_or(config.metrics_log_interval, DEFAULT_METRICS_INTERVAL);
        let pacer = FramePacer::new(config.max_render_fps);
        let slow_frame_delay = resolve_slow_frame_delay(config.simulated_slow_frame_ms);

        info!(
            target_tps = config.target_tps.max(1),
            max_frame_delta_ms = clock.max_frame_delta.as_millis() as u64,
            max_ticks_per_frame = clock.max_ticks,
            metrics_log_interval_ms = metrics_interval.as_millis() as u64,
            slow_frame_delay_ms = slow_frame_delay.as_millis() as u64,
            render_fps_cap = %pacer.describe_cap(),
            "loop_config"
        );

        Self {
            scene,
            renderer,
            window,
            default_title: config.window_title.clone(),
            applied_title: None,
            keys: KeyboardState::default(),
            clock,
            pacer,
            sim_time: SimTime::default(),
            last_frame: Instant::now(),
            slow_frame_delay,
            metrics: MetricsWindow::new(metrics_interval),
            latest_metrics: LoopMetricsSnapshot::default(),
            overlay_visible: false,
            frame: RenderFrame::new(),
        }
    }

    fn handle_event(&mut self, event: Event<()>, target: &EventLoopWindowTarget<()>) {
        match event {
            Event::WindowEvent { window_id, event } if window_id == self.window.id() => {
                self.handle_window_event(event, target);
            }
            Event::AboutToWait => self.window.request_redraw(),
            Event::LoopExiting => {
                self.scene.unload();
                info!("shutdown");
            }
            _ => {}
        }
    }

    fn handle_window_event(&mut self, event: WindowEvent, target: &EventLoopWindowTarget<()>) {
        match event {
            WindowEvent::CloseRequested => {
                self.keys.request_quit();
                info!(reason = "window_close", "shutdown_requested");
                target.exit();
            }
            WindowEvent::Resized(size) => self.resize(size.width, size.height, target),
            WindowEvent::ScaleFactorChanged { .. } => {
                let size = self.window.inner_size();
                self.resize(size.width, size.height, target);
            }
            WindowEvent::Focused(false) => self.keys.release_all(),
            WindowEvent::KeyboardInput { event, .. } => {
                self.keys.handle_key(event.physical_key, event.state);
                if self.keys.quit_requested() {
                    info!(reason = "escape_key", "shutdown_requested");
                    target.exit();
                }
            }
            WindowEvent::RedrawRequested => self.redraw(target),
            _ => {}
        }
    }

    fn resize(&mut self, width: u32, height: u32, target: &EventLoopWindowTarget<()>) {
        if let Err(error) = self.renderer.resize(width, height) {
            warn!(error = %error, "renderer_resize_failed");
            target.exit();
        }
    }

    fn redraw(&mut self, target: &EventLoopWindowTarget<()>) {
        if self.keys.take_overlay_toggle() {
            self.overlay_visible = !self.overlay_visible;
            info!(overlay_visible = self.overlay_visible, "overlay_toggled");
        }
        if !self.slow_frame_delay.is_zero() {
            // Debug perturbation, separate from the render cap.
            thread::sleep(self.slow_frame_delay);
        }

        let now = Instant::now();
        let frame_dt = now.saturating_duration_since(self.last_frame);
        self.last_frame = now;

        let plan = self.clock.advance(frame_dt);
        for _ in 0..plan.ticks {
            let input = self.keys.snapshot_for_tick();
            self.sim_time = self.sim_time.advanced(self.clock.dt_seconds());
            let command = self.scene.update(self.sim_time, &input);
            self.metrics.record_tick();
            if command == SceneCommand::Quit {
                info!(reason = "scene_command", "shutdown_requested");
                target.exit();
                break;
            }
        }
        if !plan.dropped.is_zero() {
            self.metrics.record_dropped_backlog(plan.dropped);
            warn!(
                dropped_backlog_ms = plan.dropped.as_millis() as u64,
                max_ticks_per_frame = self.clock.max_ticks,
                "sim_clamp_triggered"
            );
        }

        self.pacer.wait_for_slot();
        self.present(target);
        self.pacer.mark_presented();
        self.sync_title();

        self.metrics.record_frame(frame_dt);
        if let Some(snapshot) = self.metrics.close_if_elapsed(now) {
            self.latest_metrics = snapshot;
            info!(
                fps = snapshot.fps,
                tps = snapshot.tps,
                frame_time_ms = snapshot.frame_time_ms,
                worst_frame_ms = snapshot.worst_frame_ms,
                dropped_backlog_ms = snapshot.dropped_backlog_ms,
                draw_commands = self.frame.command_count(),
                "loop_metrics"
            );
        }
    }

    fn present(&mut self, target: &EventLoopWindowTarget<()>) {
        self.frame.clear();
        self.scene.render(&mut self.frame);
        let overlay = self.overlay_visible.then(|| OverlayData {
            metrics: self.latest_metrics,
            render_fps_cap: self.pacer.cap,
            slow_frame_delay_ms: self.slow_frame_delay.as_millis() as u64,
            scene_lines: self.scene.debug_lines(),
        });
        if let Err(error) = self.renderer.render(&self.frame, overlay.as_ref()) {
            warn!(error = %error, "renderer_draw_failed");
            target.exit();
        }
    }

    fn sync_title(&mut self) {
        let title = self.scene.debug_title();
        if title == self.applied_title {
            return;
        }
        self.window
            .set_title(title.as_deref().unwrap_or(&self.default_title));
        self.applied_title = title;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct StepPlan {
    ticks: u32,
    dropped: Duration,
}

/// Fixed-timestep accumulator. Long frames are clamped, and whatever still exceeds the
/// per-frame tick budget is dropped instead of carried over.
#[derive(Debug)]
struct FixedStep {
    dt: Duration,
    max_frame_delta: Duration,
    max_ticks: u32,
    backlog: Duration,
}

impl FixedStep {
    fn new(target_tps: u32, max_frame_delta: Duration, max_ticks: u32) -> Self {
        Self {
            dt: Duration::from_secs_f64(1.0 / f64::from(target_tps.max(1))),
            max_frame_delta,
            max_ticks: max_ticks.max(1),
            backlog: Duration::ZERO,
        }
    }

    fn dt_seconds(&self) -> f32 {
        self.dt.as_secs_f32()
    }

    fn advance(&mut self, frame_dt: Duration) -> StepPlan {
        self.backlog = self
            .backlog
            .saturating_add(frame_dt.min(self.max_frame_delta));
        let mut ticks = 0;
        while self.backlog >= self.dt && ticks < self.max_ticks {
            self.backlog -= self.dt;
            ticks += 1;
        }
        let dropped = if self.backlog >= self.dt {
            std::mem::take(&mut self.backlog)
        } else {
            Duration::ZERO
        };
        StepPlan { ticks, dropped }
    }
}

/// Optional render cap: sleeps out the rest of the frame slot before presenting.
#[derive(Debug)]
struct FramePacer {
    cap: Option<u32>,
    slot: Option<Duration>,
    last_present: Instant,
}

impl FramePacer {
    fn new(max_render_fps: Option<u32>) -> Self {
        let cap = max_render_fps.filter(|fps| *fps > 0);
        Self {
            cap,
            slot: cap.map(|fps| Duration::from_secs_f64(1.0 / f64::from(fps))),
            last_present: Instant::now(),
        }
    }

    fn remaining_in_slot(&self, elapsed: Duration) -> Duration {
        self.slot
            .map_or(Duration::ZERO, |slot| slot.saturating_sub(elapsed))
    }

    fn wait_for_slot(&self) {
        let remaining = self.remaining_in_slot(self.last_present.elapsed());
        if !remaining.is_zero() {
            thread::sleep(remaining);
        }
    }

    fn mark_presented(&mut self) {
        self.last_present = Instant::now();
    }

    fn describe_cap(&self) -> String {
        self.cap.map_or_else(|| "off".to_string(), |fps| fps.to_string())
    }
}

fn non_zero_or(value: Duration, fallback: Duration) -> Duration {
    if value.is_zero() {
        fallback
    } else {
        value
    }
}

fn resolve_slow_frame_delay(configured_ms: u64) -> Duration {
    let raw = match env::var(SLOW_FRAME_ENV_VAR) {
        Ok(raw) => Some(raw),
        Err(env::VarError::NotPresent) => None,
        Err(error) => {
            warn!(env_var = SLOW_FRAME_ENV_VAR, error = %error, "slow_frame_env_unreadable");
            None
        }
    };
    slow_frame_override(raw.as_deref(), configured_ms)
}

fn slow_frame_override(raw: Option<&str>, configured_ms: u64) -> Duration {
    let ms = match raw.map(|text| text.trim().parse::<u64>()) {
        Some(Ok(ms)) => ms,
        Some(Err(_)) => {
            warn!(env_var = SLOW_FRAME_ENV_VAR, value = raw, "slow_frame_env_invalid");
            configured_ms
        }
        None => configured_ms,
    };
    Duration::from_millis(ms)
}

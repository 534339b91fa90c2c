mod input;
mod loop_runner;
mod metrics;
mod overlay;
mod rendering;
mod scene;

pub use input::InputAction;
pub use loop_runner::{run_app, AppError, LoopConfig, SLOW_FRAME_ENV_VAR};
pub use metrics::LoopMetricsSnapshot;
pub use rendering::{world_to_screen, Color, DrawCommand, DrawLayer, RenderFrame, Renderer, Viewport};
pub use scene::{
    InputSnapshot, Rect, Scene, SceneCommand, SceneLoadError, SimTime, Vec2,
};

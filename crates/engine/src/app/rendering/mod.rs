mod canvas;
mod frame;
mod renderer;
mod text;
mod transform;

pub(crate) use canvas::Canvas;
pub use frame::{Color, DrawCommand, DrawLayer, RenderFrame};
pub use renderer::Renderer;
pub(crate) use text::{draw_text, line_advance, text_width, TEXT_SCALE};
pub use transform::{world_to_screen, Viewport};

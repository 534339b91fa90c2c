use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::ImageReader;
use pixels::{Error, Pixels, SurfaceTexture};
use tracing::warn;
use winit::window::Window;

use crate::app::overlay::{draw_overlay, OverlayData};
use crate::app::{Rect, Vec2};
use crate::asset_keys::validate_asset_key;

use super::canvas::Canvas;
use super::frame::{Color, DrawCommand, DrawLayer, RenderFrame};
use super::text::{draw_text, TEXT_SCALE};
use super::transform::{backdrop_origin_x, world_to_screen};
use super::Viewport;

const CLEAR_COLOR: Color = Color::rgb(100, 149, 237);
const SKYLINE_COLUMN_WIDTH_PX: i32 = 48;
const SKYLINE_STEP_PX: i32 = 18;

struct LoadedImage {
    width: u32,
    height: u32,
    rgba: Vec<u8>,
}

/// Presents a `RenderFrame` into a fixed-size logical framebuffer that pixels scales to the window.
pub struct Renderer {
    window: Arc<Window>,
    pixels: Pixels<'static>,
    viewport: Viewport,
    backgrounds_dir: PathBuf,
    backdrop_cache: HashMap<String, Option<LoadedImage>>,
    warned_backdrop_keys: HashSet<String>,
}

impl Renderer {
    pub fn new(window: Arc<Window>, viewport: Viewport, backgrounds_dir: PathBuf) -> Result<Self, Error> {
        let size = window.inner_size();
        let pixels = Self::build_pixels(Arc::clone(&window), viewport, size.width, size.height)?;
        Ok(Self {
            window,
            pixels,
            viewport,
            backgrounds_dir,
            backdrop_cache: HashMap::new(),
            warned_backdrop_keys: HashSet::new(),
        })
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), Error> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        self.pixels = Self::build_pixels(Arc::clone(&self.window), self.viewport, width, height)?;
        Ok(())
    }

    fn build_pixels(
        window: Arc<Window>,
        viewport: Viewport,
        surface_width: u32,
        surface_height: u32,
    ) -> Result<Pixels<'static>, Error> {
        let surface = SurfaceTexture::new(surface_width.max(1), surface_height.max(1), window);
        Pixels::new(viewport.width, viewport.height, surface)
    }

    pub(crate) fn render(&mut self, frame: &RenderFrame, overlay: Option<&OverlayData>) -> Result<(), Error> {
        let viewport = self.viewport;
        for (_, command) in frame.iter_in_draw_order() {
            if let DrawCommand::Backdrop { key, .. } = command {
                ensure_backdrop_loaded(
                    &mut self.backdrop_cache,
                    &mut self.warned_backdrop_keys,
                    &self.backgrounds_dir,
                    key,
                );
            }
        }

        let mut canvas = Canvas::new(self.pixels.frame_mut(), viewport.width, viewport.height);
        canvas.clear(CLEAR_COLOR);

        for (layer, command) in frame.iter_in_draw_order() {
            draw_command(&mut canvas, &self.backdrop_cache, frame, layer, command);
        }

        if let Some(overlay) = overlay {
            draw_overlay(&mut canvas, overlay);
        }

        self.pixels.render()
    }
}

fn draw_command(
    canvas: &mut Canvas<'_>,
    backdrops: &HashMap<String, Option<LoadedImage>>,
    frame: &RenderFrame,
    layer: DrawLayer,
    command: &DrawCommand,
) {
    let scroll = layer.camera_scroll();
    match command {
        DrawCommand::FillRect { rect, color } => {
            let (x, y, w, h) = screen_rect(rect, frame, scroll);
            canvas.fill_rect(x, y, w, h, *color);
        }
        DrawCommand::OutlineRect { rect, color } => {
            let (x, y, w, h) = screen_rect(rect, frame, scroll);
            canvas.outline_rect(x, y, w, h, *color);
        }
        DrawCommand::Text {
            origin,
            text,
            color,
        } => {
            let (x, y) = world_to_screen(*origin, frame.camera(), scroll);
            draw_text(canvas, x, y, text, *color, TEXT_SCALE);
        }
        DrawCommand::Backdrop {
            key,
            scroll,
            fallback,
        } => match backdrops.get(key).and_then(Option::as_ref) {
            Some(image) => draw_backdrop_image(canvas, image, frame.camera().x, *scroll),
            None => draw_fallback_skyline(canvas, frame.camera().x, *scroll, *fallback),
        },
    }
}

fn screen_rect(rect: &Rect, frame: &RenderFrame, scroll: f32) -> (i32, i32, i32, i32) {
    let (x, y) = world_to_screen(Vec2::new(rect.x, rect.y), frame.camera(), scroll);
    (x, y, rect.width.round() as i32, rect.height.round() as i32)
}

fn draw_backdrop_image(canvas: &mut Canvas<'_>, image: &LoadedImage, camera_x: f32, scroll: f32) {
    let mut x = backdrop_origin_x(camera_x, scroll, image.width);
    let step = image.width.max(1) as i32;
    while x < canvas.width() as i32 {
        canvas.blit_rgba(x, 0, image.width, image.height, &image.rgba);
        x += step;
    }
}

/// Stepped silhouette used when a backdrop image is missing, so parallax stays visible.
fn draw_fallback_skyline(canvas: &mut Canvas<'_>, camera_x: f32, scroll: f32, color: Color) {
    let height = canvas.height() as i32;
    let base = (height as f32 * (0.15 + 0.3 * scroll)).round() as i32;
    let shift = (camera_x * scroll).round() as i32;
    let first_column = shift.div_euclid(SKYLINE_COLUMN_WIDTH_PX);
    let mut x = first_column * SKYLINE_COLUMN_WIDTH_PX - shift;
    let mut column = first_column;
    while x < canvas.width() as i32 {
        let steps = (column.wrapping_mul(37) ^ (scroll * 100.0) as i32).rem_euclid(5);
        let column_height = base + steps * SKYLINE_STEP_PX;
        canvas.fill_rect(x, height - column_height, SKYLINE_COLUMN_WIDTH_PX, column_height, color);
        x += SKYLINE_COLUMN_WIDTH_PX;
        column += 1;
    }
}

fn ensure_backdrop_loaded(
    cache: &mut HashMap<String, Option<LoadedImage>>,
    warned_keys: &mut HashSet<String>,
    backgrounds_dir: &Path,
    key: &str,
) {
    if cache.contains_key(key) {
        return;
    }
    let loaded = match resolve_backdrop_path(backgrounds_dir, key) {
        Ok(path) => match load_image_rgba(&path) {
            Ok(image) => Some(image),
            Err(reason) => {
                warn_backdrop_load_once(warned_keys, key, Some(&path), &reason);
                None
            }
        },
        Err(reason) => {
            warn_backdrop_load_once(warned_keys, key, None, &reason);
            None
        }
    };
    cache.insert(key.to_string(), loaded);
}

fn resolve_backdrop_path(backgrounds_dir: &Path, key: &str) -> Result<PathBuf, String> {
    validate_asset_key(key).map_err(|error| format!("invalid_key:{error}"))?;
    Ok(backgrounds_dir.join(format!("{key}.png")))
}

fn load_image_rgba(path: &Path) -> Result<LoadedImage, String> {
    let reader = ImageReader::open(path).map_err(|error| format!("file_open_failed:{error}"))?;
    let decoded = reader
        .decode()
        .map_err(|error| format!("decode_failed:{error}"))?;
    let image = decoded.to_rgba8();
    Ok(LoadedImage {
        width: image.width(),
        height: image.height(),
        rgba: image.into_raw(),
    })
}

fn warn_backdrop_load_once(
    warned_keys: &mut HashSet<String>,
    key: &str,
    resolved_path: Option<&Path>,
    reason: &str,
) {
    if !warned_keys.insert(key.to_string()) {
        return;
    }
    let path_display = resolved_path
        .map(|path| path.display().to_string())
        .unwrap_or_else(|| "<unresolved>".to_string());
    warn!(
        backdrop_key = key,
        path = %path_display,
        reason = reason,
        "renderer_backdrop_load_failed_using_fallback"
    );
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn missing_backdrop_is_cached_and_warned_once() {
        let temp = TempDir::new().expect("tempdir");
        let mut cache = HashMap::new();
        let mut warned = HashSet::new();

        ensure_backdrop_loaded(&mut cache, &mut warned, temp.path(), "layer0");
        ensure_backdrop_loaded(&mut cache, &mut warned, temp.path(), "layer0");

        assert!(matches!(cache.get("layer0"), Some(None)));
        assert_eq!(warned.len(), 1);
    }

    #[test]
    fn backdrop_png_is_decoded() {
        let temp = TempDir::new().expect("tempdir");
        let image = image::RgbaImage::from_pixel(4, 2, image::Rgba([10, 20, 30, 255]));
        image
            .save(temp.path().join("layer1.png"))
            .expect("write png");

        let mut cache = HashMap::new();
        let mut warned = HashSet::new();
        ensure_backdrop_loaded(&mut cache, &mut warned, temp.path(), "layer1");

        let loaded = cache
            .get("layer1")
            .and_then(Option::as_ref)
            .expect("decoded image");
        assert_eq!((loaded.width, loaded.height), (4, 2));
        assert_eq!(&loaded.rgba[..4], &[10, 20, 30, 255]);
        assert!(warned.is_empty());
    }

    #[test]
    fn traversal_keys_never_touch_disk() {
        let temp = TempDir::new().expect("tempdir");
        assert!(resolve_backdrop_path(temp.path(), "../secret").is_err());
    }

    #[test]
    fn fallback_skyline_fills_bottom_row() {
        let mut frame = vec![0u8; 96 * 40 * 4];
        let mut canvas = Canvas::new(&mut frame, 96, 40);
        draw_fallback_skyline(&mut canvas, 123.0, 0.5, Color::WHITE);

        let bottom_row = &frame[(39 * 96 * 4)..];
        assert!(bottom_row.chunks_exact(4).all(|px| px[0] == 255));
    }
}

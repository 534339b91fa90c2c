use crate::app::{Rect, Vec2};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const RED: Color = Color::rgb(230, 40, 40);
    pub const YELLOW: Color = Color::rgb(250, 220, 70);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn with_alpha(self, a: u8) -> Self {
        Self { a, ..self }
    }

    pub const fn to_rgba(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

/// Draw layers in presentation order. Background and foreground hold parallax
/// backdrops, the three middle layers are world-space, and the HUD is screen-space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DrawLayer {
    Background,
    Tiles,
    Entities,
    FloatingText,
    Foreground,
    Hud,
}

const LAYER_COUNT: usize = 6;

impl DrawLayer {
    pub const ORDER: [DrawLayer; LAYER_COUNT] = [
        DrawLayer::Background,
        DrawLayer::Tiles,
        DrawLayer::Entities,
        DrawLayer::FloatingText,
        DrawLayer::Foreground,
        DrawLayer::Hud,
    ];

    const fn index(self) -> usize {
        match self {
            DrawLayer::Background => 0,
            DrawLayer::Tiles => 1,
            DrawLayer::Entities => 2,
            DrawLayer::FloatingText => 3,
            DrawLayer::Foreground => 4,
            DrawLayer::Hud => 5,
        }
    }

    /// How much of the camera offset applies to plain commands on this layer.
    pub const fn camera_scroll(self) -> f32 {
        match self {
            DrawLayer::Tiles | DrawLayer::Entities | DrawLayer::FloatingText => 1.0,
            DrawLayer::Background | DrawLayer::Foreground | DrawLayer::Hud => 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    FillRect {
        rect: Rect,
        color: Color,
    },
    OutlineRect {
        rect: Rect,
        color: Color,
    },
    Text {
        origin: Vec2,
        text: String,
        color: Color,
    },
    /// Full-viewport image tiled horizontally and scrolled at `scroll` times the camera offset.
    Backdrop {
        key: String,
        scroll: f32,
        fallback: Color,
    },
}

/// Draw list produced by a scene each frame and consumed by the renderer.
#[derive(Debug, Clone, Default)]
pub struct RenderFrame {
    camera: Vec2,
    layers: [Vec<DrawCommand>; LAYER_COUNT],
}

impl RenderFrame {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.camera = Vec2::ZERO;
        for layer in &mut self.layers {
            layer.clear();
        }
    }

    pub fn camera(&self) -> Vec2 {
        self.camera
    }

    pub fn set_camera(&mut self, camera: Vec2) {
        self.camera = camera;
    }

    pub fn push(&mut self, layer: DrawLayer, command: DrawCommand) {
        self.layers[layer.index()].push(command);
    }

    pub fn fill_rect(&mut self, layer: DrawLayer, rect: Rect, color: Color) {
        self.push(layer, DrawCommand::FillRect { rect, color });
    }

    pub fn text(&mut self, layer: DrawLayer, origin: Vec2, text: impl Into<String>, color: Color) {
        self.push(
            layer,
            DrawCommand::Text {
                origin,
                text: text.into(),
                color,
            },
        );
    }

    pub fn layer(&self, layer: DrawLayer) -> &[DrawCommand] {
        &self.layers[layer.index()]
    }

    pub fn command_count(&self) -> usize {
        self.layers.iter().map(Vec::len).sum()
    }

    /// Every command tagged with its layer, in presentation order.
    pub fn iter_in_draw_order(&self) -> impl Iterator<Item = (DrawLayer, &DrawCommand)> {
        DrawLayer::ORDER
            .into_iter()
            .flat_map(move |layer| self.layer(layer).iter().map(move |command| (layer, command)))
    }
}

use engine::Vec2;

/// Dead-zone margins as a fraction of the viewport, measured in from each edge.
const MARGIN_FRACTION_X: f32 = 0.35;
const MARGIN_FRACTION_Y: f32 = 0.25;

/// Top-left world position of the viewport. Each axis scrolls independently.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct Camera {
    offset: Vec2,
}

impl Camera {
    pub(crate) fn offset(&self) -> Vec2 {
        self.offset
    }

    /// Pushes the view by exactly how far `focus` crossed a margin, then clamps to the level.
    pub(crate) fn update(&mut self, focus: Vec2, level_size: Vec2, viewport: Vec2) {
        self.offset.x = follow_axis(
            self.offset.x,
            focus.x,
            viewport.x,
            MARGIN_FRACTION_X,
            level_size.x,
        );
        self.offset.y = follow_axis(
            self.offset.y,
            focus.y,
            viewport.y,
            MARGIN_FRACTION_Y,
            level_size.y,
        );
    }

    /// Jumps straight to the clamped position that centres `focus`; used on level load.
    pub(crate) fn snap_to(&mut self, focus: Vec2, level_size: Vec2, viewport: Vec2) {
        self.offset = Vec2::new(
            clamp_axis(focus.x - viewport.x * 0.5, level_size.x, viewport.x),
            clamp_axis(focus.y - viewport.y * 0.5, level_size.y, viewport.y),
        );
    }
}

fn follow_axis(offset: f32, focus: f32, viewport: f32, margin_fraction: f32, extent: f32) -> f32 {
    let margin = viewport * margin_fraction;
    let low_edge = offset + margin;
    let high_edge = offset + viewport - margin;
    let shifted = if focus < low_edge {
        offset - (low_edge - focus)
    } else if focus > high_edge {
        offset + (focus - high_edge)
    } else {
        offset
    };
    clamp_axis(shifted, extent, viewport)
}

/// Levels smaller than the viewport pin to 0.
fn clamp_axis(offset: f32, extent: f32, viewport: f32) -> f32 {
    offset.clamp(0.0, (extent - viewport).max(0.0))
}

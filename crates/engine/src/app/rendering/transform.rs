use crate::app::Vec2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn size(&self) -> Vec2 {
        Vec2::new(self.width as f32, self.height as f32)
    }
}

/// Maps a world point to framebuffer pixels. `scroll` scales the camera offset:
/// 1.0 for world-space content, fractions for parallax, 0.0 for screen-space.
pub fn world_to_screen(world: Vec2, camera: Vec2, scroll: f32) -> (i32, i32) {
    let x = world.x - camera.x * scroll;
    let y = world.y - camera.y * scroll;
    (x.round() as i32, y.round() as i32)
}

/// Left edge of the first horizontal tile of a repeating backdrop.
pub(crate) fn backdrop_origin_x(camera_x: f32, scroll: f32, image_width: u32) -> i32 {
    if image_width == 0 {
        return 0;
    }
    let shift = (camera_x * scroll).round() as i64;
    -(shift.rem_euclid(i64::from(image_width)) as i32)
}

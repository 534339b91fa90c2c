use super::frame::Color;

/// Clipped pixel writer over an RGBA8 framebuffer.
pub(crate) struct Canvas<'a> {
    frame: &'a mut [u8],
    width: u32,
    height: u32,
}

impl<'a> Canvas<'a> {
    pub(crate) fn new(frame: &'a mut [u8], width: u32, height: u32) -> Self {
        Self {
            frame,
            width,
            height,
        }
    }

    pub(crate) fn width(&self) -> u32 {
        self.width
    }

    pub(crate) fn height(&self) -> u32 {
        self.height
    }

    pub(crate) fn clear(&mut self, color: Color) {
        let rgba = color.to_rgba();
        for pixel in self.frame.chunks_exact_mut(4) {
            pixel.copy_from_slice(&rgba);
        }
    }

    pub(crate) fn put_pixel(&mut self, x: i32, y: i32, color: Color) {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return;
        }
        let Some(pixel_offset) = (y as usize)
            .checked_mul(self.width as usize)
            .and_then(|row| row.checked_add(x as usize))
        else {
            return;
        };
        let Some(byte_offset) = pixel_offset.checked_mul(4) else {
            return;
        };
        let Some(end) = byte_offset.checked_add(4) else {
            return;
        };
        if end > self.frame.len() {
            return;
        }
        let dst = &mut self.frame[byte_offset..end];
        if color.a == u8::MAX {
            dst.copy_from_slice(&color.to_rgba());
        } else {
            blend_into(dst, color);
        }
    }

    pub(crate) fn fill_rect(&mut self, x: i32, y: i32, rect_width: i32, rect_height: i32, color: Color) {
        let start_x = x.max(0);
        let start_y = y.max(0);
        let end_x = x.saturating_add(rect_width).min(self.width as i32);
        let end_y = y.saturating_add(rect_height).min(self.height as i32);
        for py in start_y..end_y {
            for px in start_x..end_x {
                self.put_pixel(px, py, color);
            }
        }
    }

    pub(crate) fn outline_rect(
        &mut self,
        x: i32,
        y: i32,
        rect_width: i32,
        rect_height: i32,
        color: Color,
    ) {
        if rect_width <= 1 || rect_height <= 1 {
            return;
        }
        self.fill_rect(x, y, rect_width, 1, color);
        self.fill_rect(x, y + rect_height - 1, rect_width, 1, color);
        self.fill_rect(x, y, 1, rect_height, color);
        self.fill_rect(x + rect_width - 1, y, 1, rect_height, color);
    }

    /// Copies an RGBA8 image with its top-left corner at (x, y); fully transparent texels are skipped.
    pub(crate) fn blit_rgba(&mut self, x: i32, y: i32, image_width: u32, image_height: u32, rgba: &[u8]) {
        if rgba.len() < image_width as usize * image_height as usize * 4 {
            return;
        }
        let draw_left = x.max(0);
        let draw_top = y.max(0);
        let draw_right = x.saturating_add(image_width as i32).min(self.width as i32);
        let draw_bottom = y.saturating_add(image_height as i32).min(self.height as i32);
        for out_y in draw_top..draw_bottom {
            let src_row = (out_y - y) as usize * image_width as usize * 4;
            for out_x in draw_left..draw_right {
                let src = src_row + (out_x - x) as usize * 4;
                let texel = Color::rgba(rgba[src], rgba[src + 1], rgba[src + 2], rgba[src + 3]);
                if texel.a == 0 {
                    continue;
                }
                self.put_pixel(out_x, out_y, texel);
            }
        }
    }
}

fn blend_into(dst: &mut [u8], color: Color) {
    let alpha = u16::from(color.a);
    let inverse = 255 - alpha;
    let src = color.to_rgba();
    for channel in 0..3 {
        let mixed = (u16::from(src[channel]) * alpha + u16::from(dst[channel]) * inverse) / 255;
        dst[channel] = mixed as u8;
    }
    dst[3] = u8::MAX;
}

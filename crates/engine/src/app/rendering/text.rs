use super::canvas::Canvas;
use super::frame::Color;

const GLYPH_WIDTH: i32 = 3;
const GLYPH_HEIGHT: i32 = 5;
pub(crate) const TEXT_SCALE: i32 = 2;

// 3x5 bitmaps packed row-major, top row in the high bits.
const FONT: [(char, u16); 44] = [
    ('!', 0b010_010_010_000_010),
    ('%', 0b101_001_010_100_101),
    ('+', 0b000_010_111_010_000),
    ('-', 0b000_000_111_000_000),
    ('.', 0b000_000_000_000_010),
    ('/', 0b001_001_010_100_100),
    ('0', 0b111_101_101_101_111),
    ('1', 0b010_110_010_010_111),
    ('2', 0b111_001_111_100_111),
    ('3', 0b111_001_111_001_111),
    ('4', 0b101_101_111_001_001),
    ('5', 0b111_100_111_001_111),
    ('6', 0b111_100_111_101_111),
    ('7', 0b111_001_010_010_010),
    ('8', 0b111_101_111_101_111),
    ('9', 0b111_101_111_001_111),
    (':', 0b000_010_000_010_000),
    ('?', 0b111_001_011_000_010),
    ('A', 0b010_101_111_101_101),
    ('B', 0b110_101_110_101_110),
    ('C', 0b111_100_100_100_111),
    ('D', 0b110_101_101_101_110),
    ('E', 0b111_100_110_100_111),
    ('F', 0b111_100_110_100_100),
    ('G', 0b111_100_101_101_111),
    ('H', 0b101_101_111_101_101),
    ('I', 0b111_010_010_010_111),
    ('J', 0b111_001_001_101_111),
    ('K', 0b101_101_110_101_101),
    ('L', 0b100_100_100_100_111),
    ('M', 0b101_111_111_101_101),
    ('N', 0b101_111_111_111_101),
    ('O', 0b111_101_101_101_111),
    ('P', 0b110_101_110_100_100),
    ('Q', 0b111_101_101_111_001),
    ('R', 0b110_101_110_101_101),
    ('S', 0b111_100_111_001_111),
    ('T', 0b111_010_010_010_010),
    ('U', 0b101_101_101_101_111),
    ('V', 0b101_101_101_101_010),
    ('W', 0b101_101_111_111_101),
    ('X', 0b101_101_010_101_101),
    ('Y', 0b101_101_010_010_010),
    ('Z', 0b111_001_010_100_111),
];

/// Lowercase letters share the uppercase bitmaps; anything unknown draws as a blank cell.
fn glyph_bits(ch: char) -> u16 {
    let upper = ch.to_ascii_uppercase();
    FONT.iter()
        .find(|(glyph_char, _)| *glyph_char == upper)
        .map(|(_, bits)| *bits)
        .unwrap_or(0)
}

pub(crate) fn glyph_advance(scale: i32) -> i32 {
    (GLYPH_WIDTH + 1) * scale
}

pub(crate) fn line_advance(scale: i32) -> i32 {
    (GLYPH_HEIGHT + 2) * scale
}

pub(crate) fn text_width(text: &str, scale: i32) -> i32 {
    text.chars().count() as i32 * glyph_advance(scale)
}

pub(crate) fn draw_text(canvas: &mut Canvas<'_>, x: i32, y: i32, text: &str, color: Color, scale: i32) {
    let mut cursor_x = x;
    for ch in text.chars() {
        draw_glyph(canvas, cursor_x, y, glyph_bits(ch), color, scale);
        cursor_x += glyph_advance(scale);
    }
}

fn draw_glyph(canvas: &mut Canvas<'_>, x: i32, y: i32, bits: u16, color: Color, scale: i32) {
    if bits == 0 {
        return;
    }
    for row in 0..GLYPH_HEIGHT {
        for col in 0..GLYPH_WIDTH {
            let shift = (GLYPH_HEIGHT - 1 - row) * GLYPH_WIDTH + (GLYPH_WIDTH - 1 - col);
            if bits & (1 << shift) == 0 {
                continue;
            }
            canvas.fill_rect(x + col * scale, y + row * scale, scale, scale, color);
        }
    }
}

use super::metrics::LoopMetricsSnapshot;
use super::rendering::{draw_text, line_advance, text_width, Canvas, Color, TEXT_SCALE};

const OVERLAY_PADDING: i32 = 6 * TEXT_SCALE;
const OVERLAY_PANEL_INSET: i32 = 3 * TEXT_SCALE;
const OVERLAY_TEXT_PRIMARY_COLOR: Color = Color::rgb(244, 248, 252);
const OVERLAY_TEXT_DIM_COLOR: Color = Color::rgb(176, 198, 220);
const OVERLAY_PANEL_BG_COLOR: Color = Color::rgba(10, 12, 16, 210);
const OVERLAY_PANEL_BORDER_COLOR: Color = Color::rgb(92, 106, 126);

/// Debug panel contents, toggled with F3.
#[derive(Debug, Clone)]
pub(crate) struct OverlayData {
    pub metrics: LoopMetricsSnapshot,
    pub render_fps_cap: Option<u32>,
    pub slow_frame_delay_ms: u64,
    pub scene_lines: Vec<String>,
}

/// Draws the panel anchored to the top-right corner so the HUD keeps the top-left.
pub(crate) fn draw_overlay(canvas: &mut Canvas<'_>, data: &OverlayData) {
    if canvas.width() == 0 || canvas.height() == 0 {
        return;
    }

    let lines = build_overlay_lines(data);
    let longest = lines
        .iter()
        .map(|line| text_width(line, TEXT_SCALE))
        .max()
        .unwrap_or(0);
    let panel_width = longest + OVERLAY_PANEL_INSET * 2;
    let panel_height = lines.len() as i32 * line_advance(TEXT_SCALE) + OVERLAY_PANEL_INSET * 2;
    let panel_left = canvas.width() as i32 - OVERLAY_PADDING - panel_width;
    let panel_top = OVERLAY_PADDING;
    canvas.fill_rect(panel_left, panel_top, panel_width, panel_height, OVERLAY_PANEL_BG_COLOR);
    canvas.outline_rect(
        panel_left,
        panel_top,
        panel_width,
        panel_height,
        OVERLAY_PANEL_BORDER_COLOR,
    );

    let mut y = panel_top + OVERLAY_PANEL_INSET;
    for (index, line) in lines.iter().enumerate() {
        let color = if index < 3 {
            OVERLAY_TEXT_PRIMARY_COLOR
        } else {
            OVERLAY_TEXT_DIM_COLOR
        };
        draw_text(canvas, panel_left + OVERLAY_PANEL_INSET, y, line, color, TEXT_SCALE);
        y += line_advance(TEXT_SCALE);
    }
}

fn build_overlay_lines(data: &OverlayData) -> Vec<String> {
    let mut lines = vec![
        format_fps_line(data.metrics.fps, data.render_fps_cap, data.slow_frame_delay_ms),
        format!("TPS: {:.1}", data.metrics.tps),
        format!(
            "Frame: {:.2} ms worst {:.1}",
            data.metrics.frame_time_ms, data.metrics.worst_frame_ms
        ),
    ];
    if data.metrics.dropped_backlog_ms > 0.0 {
        lines.push(format!("Dropped: {:.0} ms", data.metrics.dropped_backlog_ms));
    }
    lines.extend(data.scene_lines.iter().cloned());
    lines
}

fn format_fps_line(current_fps: f32, cap: Option<u32>, slow_frame_delay_ms: u64) -> String {
    let cap_text = cap.map_or_else(|| "off".to_string(), |value| value.to_string());
    if slow_frame_delay_ms > 0 {
        format!("FPS: {current_fps:.1} cap {cap_text} slow {slow_frame_delay_ms}ms")
    } else {
        format!("FPS: {current_fps:.1} cap {cap_text}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_overlay() -> OverlayData {
        OverlayData {
            metrics: LoopMetricsSnapshot {
                fps: 59.94,
                tps: 60.0,
                frame_time_ms: 16.6,
                worst_frame_ms: 21.0,
                dropped_backlog_ms: 0.0,
            },
            render_fps_cap: None,
            slow_frame_delay_ms: 0,
            scene_lines: vec!["Level: 1".to_string(), "Enemies: 4".to_string()],
        }
    }

    #[test]
    fn fps_line_formats_cap_and_debug_delay() {
        assert_eq!(format_fps_line(59.94, Some(60), 15), "FPS: 59.9 cap 60 slow 15ms");
        assert_eq!(format_fps_line(120.0, None, 0), "FPS: 120.0 cap off");
    }

    #[test]
    fn scene_lines_follow_loop_metrics() {
        let lines = build_overlay_lines(&sample_overlay());
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[1], "TPS: 60.0");
        assert_eq!(lines[3], "Level: 1");
    }

    #[test]
    fn dropped_backlog_line_only_when_nonzero() {
        let mut data = sample_overlay();
        data.metrics.dropped_backlog_ms = 48.0;
        let lines = build_overlay_lines(&data);
        assert_eq!(lines[3], "Dropped: 48 ms");
        assert_eq!(lines.len(), 6);
    }

    #[test]
    fn overlay_writes_panel_pixels_on_the_right() {
        let mut frame = vec![0u8; 400 * 120 * 4];
        let mut canvas = Canvas::new(&mut frame, 400, 120);
        draw_overlay(&mut canvas, &sample_overlay());

        let row = (OVERLAY_PADDING as usize + 1) * 400 * 4;
        let right_edge_px = &frame[row + (400 - OVERLAY_PADDING as usize - 2) * 4..][..4];
        let left_edge_px = &frame[row..][..4];
        assert_ne!(right_edge_px, &[0, 0, 0, 0]);
        assert_eq!(left_edge_px, &[0, 0, 0, 0]);
    }

    #[test]
    fn tiny_viewport_is_safe() {
        let mut frame = vec![0u8; 4];
        let mut canvas = Canvas::new(&mut frame, 1, 1);
        draw_overlay(&mut canvas, &sample_overlay());
    }
}

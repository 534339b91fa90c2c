use std::time::{Duration, Instant};

/// Loop rates averaged over one reporting window.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LoopMetricsSnapshot {
    pub fps: f32,
    pub tps: f32,
    pub frame_time_ms: f32,
    pub worst_frame_ms: f32,
    pub dropped_backlog_ms: f32,
}

/// Counts frames and ticks until the window elapses, then folds them into a snapshot
/// and starts over.
#[derive(Debug)]
pub(crate) struct MetricsWindow {
    opened_at: Instant,
    length: Duration,
    counts: WindowCounts,
}

#[derive(Debug, Default)]
struct WindowCounts {
    frames: u32,
    ticks: u32,
    frame_total: Duration,
    worst_frame: Duration,
    dropped_backlog: Duration,
}

impl WindowCounts {
    fn summarize(&self, elapsed: Duration) -> LoopMetricsSnapshot {
        let seconds = elapsed.as_secs_f32().max(f32::EPSILON);
        let frame_time_ms = match self.frames {
            0 => 0.0,
            frames => self.frame_total.as_secs_f32() * 1000.0 / frames as f32,
        };
        LoopMetricsSnapshot {
            fps: self.frames as f32 / seconds,
            tps: self.ticks as f32 / seconds,
            frame_time_ms,
            worst_frame_ms: self.worst_frame.as_secs_f32() * 1000.0,
            dropped_backlog_ms: self.dropped_backlog.as_secs_f32() * 1000.0,
        }
    }
}

impl MetricsWindow {
    pub(crate) fn new(length: Duration) -> Self {
        Self::starting_at(Instant::now(), length)
    }

    fn starting_at(opened_at: Instant, length: Duration) -> Self {
        Self {
            opened_at,
            length,
            counts: WindowCounts::default(),
        }
    }

    pub(crate) fn record_frame(&mut self, frame_dt: Duration) {
        let counts = &mut self.counts;
        counts.frames = counts.frames.saturating_add(1);
        counts.frame_total = counts.frame_total.saturating_add(frame_dt);
        counts.worst_frame = counts.worst_frame.max(frame_dt);
    }

    pub(crate) fn record_tick(&mut self) {
        self.counts.ticks = self.counts.ticks.saturating_add(1);
    }

    /// Simulation time thrown away because a frame ran into the tick cap.
    pub(crate) fn record_dropped_backlog(&mut self, dropped: Duration) {
        self.counts.dropped_backlog = self.counts.dropped_backlog.saturating_add(dropped);
    }

    pub(crate) fn close_if_elapsed(&mut self, now: Instant) -> Option<LoopMetricsSnapshot> {
        let elapsed = now.saturating_duration_since(self.opened_at);
        if elapsed < self.length {
            return None;
        }
        let snapshot = self.counts.summarize(elapsed);
        *self = Self::starting_at(now, self.length);
        Some(snapshot)
    }
}

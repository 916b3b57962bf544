//! Frame-timing statistics over the deltas collected during a measurement window.

/// Floor for the long-frame threshold.
pub const MIN_LONG_FRAME_MS: f64 = 25.0;
pub const LONG_FRAME_FACTOR: f64 = 1.5;
pub const DEFAULT_VSYNC_EPSILON_MS: f64 = 0.6;

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FrameSample {
    pub timestamp_ms: f64,
    pub delta_ms: f64,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FrameStats {
    pub sample_count: usize,
    pub avg_fps: f64,
    pub p95_ms: f64,
    pub long_frames: usize,
    pub long_frame_threshold_ms: f64,
    /// Rounded to a whole percent.
    pub vsync_rate_pct: u32,
    pub refresh_ms: f64,
}

pub fn long_frame_threshold(refresh_ms: f64) -> f64 {
    MIN_LONG_FRAME_MS.max(LONG_FRAME_FACTOR * refresh_ms)
}

fn sorted(values: &[f64]) -> Vec<f64> {
    let mut v = values.to_vec();
    v.sort_by(f64::total_cmp);
    v
}

/// Value at rank `floor((n - 1) * p)` of the sorted list, index clamped into range.
pub fn percentile(values: &[f64], p: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let v = sorted(values);
    let n = v.len();
    let idx = ((n - 1) as f64 * p).floor().clamp(0.0, (n - 1) as f64) as usize;
    Some(v[idx])
}

/// Upper median: `sorted[n / 2]`.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let v = sorted(values);
    Some(v[v.len() / 2])
}

/// Percentage of deltas within `eps` of a whole number (at least one) of refresh periods.
pub fn vsync_rate(deltas: &[f64], refresh_ms: f64, eps: f64) -> Option<u32> {
    if deltas.is_empty() || !(refresh_ms > 0.0) {
        return None;
    }
    let aligned = deltas
        .iter()
        .filter(|&&d| {
            let k = (d / refresh_ms).round().max(1.0);
            (d - k * refresh_ms).abs() <= eps
        })
        .count();
    Some(((aligned as f64 / deltas.len() as f64) * 100.0).round() as u32)
}

pub fn summarize(deltas: &[f64], refresh_ms: f64, vsync_eps: f64) -> Option<FrameStats> {
    if deltas.is_empty() {
        return None;
    }
    let mean = deltas.iter().sum::<f64>() / deltas.len() as f64;
    let threshold = long_frame_threshold(refresh_ms);
    Some(FrameStats {
        sample_count: deltas.len(),
        avg_fps: if mean > 0.0 { 1000.0 / mean } else { 0.0 },
        p95_ms: percentile(deltas, 0.95)?,
        long_frames: deltas.iter().filter(|&&d| d > threshold).count(),
        long_frame_threshold_ms: threshold,
        vsync_rate_pct: vsync_rate(deltas, refresh_ms, vsync_eps).unwrap_or(0),
        refresh_ms,
    })
}

/// Collects samples after the warm-up cutoff until closed.
#[derive(Clone, Debug)]
pub struct FrameRecorder {
    warmup_end_ms: f64,
    samples: Vec<FrameSample>,
    closed: bool,
}

impl FrameRecorder {
    pub fn new(warmup_end_ms: f64) -> Self {
        Self {
            warmup_end_ms,
            samples: Vec::new(),
            closed: false,
        }
    }

    /// Record a tick; returns whether it was kept.
    pub fn record(&mut self, timestamp_ms: f64, delta_ms: f64) -> bool {
        if self.closed || timestamp_ms <= self.warmup_end_ms {
            return false;
        }
        self.samples.push(FrameSample {
            timestamp_ms,
            delta_ms,
        });
        true
    }

    pub fn close(&mut self) {
        self.closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn samples(&self) -> &[FrameSample] {
        &self.samples
    }

    pub fn deltas(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.delta_ms).collect()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FpsBand {
    High,
    Medium,
    Low,
}

impl FpsBand {
    pub fn classify(fps: u32) -> Self {
        if fps >= 50 {
            Self::High
        } else if fps >= 30 {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

/// Live frames-per-second readout, refreshed once per window.
#[derive(Clone, Debug)]
pub struct FpsCounter {
    window_ms: f64,
    frames: u32,
    window_start: Option<f64>,
    fps: Option<u32>,
}

impl FpsCounter {
    pub fn new(window_ms: f64) -> Self {
        Self {
            window_ms,
            frames: 0,
            window_start: None,
            fps: None,
        }
    }

    /// Count one frame at `timestamp_ms`; returns the latest readout.
    pub fn tick(&mut self, timestamp_ms: f64) -> Option<u32> {
        let start = *self.window_start.get_or_insert(timestamp_ms);
        self.frames += 1;
        let elapsed = timestamp_ms - start;
        if elapsed >= self.window_ms && elapsed > 0.0 {
            self.fps = Some((f64::from(self.frames) * 1000.0 / elapsed).round() as u32);
            self.frames = 0;
            self.window_start = Some(timestamp_ms);
        }
        self.fps
    }

    pub fn fps(&self) -> Option<u32> {
        self.fps
    }

    pub fn band(&self) -> Option<FpsBand> {
        self.fps.map(FpsBand::classify)
    }

    pub fn reset(&mut self) {
        self.frames = 0;
        self.window_start = None;
        self.fps = None;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/timing/stats.rs"]
mod tests;

use std::cell::Cell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

use crate::foundation::error::{CanvasError, CanvasResult};
use crate::timing::clock::Clock;
use crate::timing::stats::{
    DEFAULT_VSYNC_EPSILON_MS, FrameRecorder, FrameSample, FrameStats, median, summarize,
};

/// Nominal 60 Hz period, used until a refresh estimate exists.
pub const DEFAULT_REFRESH_MS: f64 = 1000.0 / 60.0;

/// How ticks are produced.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Discipline {
    /// One tick per display refresh, stamped with the vsync time.
    #[default]
    #[serde(rename = "raf")]
    AnimationFrame,
    /// A timer firing at a nominal period; timestamps are wall-clock reads.
    #[serde(rename = "interval")]
    FixedInterval,
}

impl Discipline {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AnimationFrame => "raf",
            Self::FixedInterval => "interval",
        }
    }
}

impl fmt::Display for Discipline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Discipline {
    type Err = CanvasError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "raf" | "animation-frame" => Ok(Self::AnimationFrame),
            "interval" | "fixed-interval" => Ok(Self::FixedInterval),
            _ => Err(CanvasError::validation(format!(
                "unknown scheduling discipline '{s}'"
            ))),
        }
    }
}

/// Measurement-window and scheduling knobs.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub duration_ms: f64,
    pub warmup_ms: f64,
    /// Extra time past `duration_ms` after which a run is force-stopped.
    pub safety_margin_ms: f64,
    pub interval_ms: f64,
    pub refresh_samples: usize,
    pub vsync_epsilon_ms: f64,
    /// Display period simulated by [`AnimationFrames`].
    pub display_refresh_ms: f64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            duration_ms: 10_000.0,
            warmup_ms: 1_000.0,
            safety_margin_ms: 600.0,
            interval_ms: 16.0,
            refresh_samples: 90,
            vsync_epsilon_ms: DEFAULT_VSYNC_EPSILON_MS,
            display_refresh_ms: DEFAULT_REFRESH_MS,
        }
    }
}

impl TimingConfig {
    pub fn validate(&self) -> CanvasResult<()> {
        let positive = |v: f64| v.is_finite() && v > 0.0;
        let non_negative = |v: f64| v.is_finite() && v >= 0.0;
        if !positive(self.duration_ms) {
            return Err(CanvasError::validation("timing duration must be > 0"));
        }
        if !non_negative(self.warmup_ms) || self.warmup_ms >= self.duration_ms {
            return Err(CanvasError::validation(
                "warm-up must be >= 0 and shorter than the run duration",
            ));
        }
        if !non_negative(self.safety_margin_ms) {
            return Err(CanvasError::validation("safety margin must be >= 0"));
        }
        if !positive(self.interval_ms) || !positive(self.display_refresh_ms) {
            return Err(CanvasError::validation("tick periods must be > 0"));
        }
        if self.refresh_samples == 0 {
            return Err(CanvasError::validation("refresh estimation needs samples"));
        }
        if !non_negative(self.vsync_epsilon_ms) {
            return Err(CanvasError::validation("vsync epsilon must be >= 0"));
        }
        Ok(())
    }
}

/// Pluggable tick producer.
pub trait FrameSource {
    fn discipline(&self) -> Discipline;
    /// Start producing ticks relative to the clock's current time.
    fn arm(&mut self, clock: &dyn Clock);
    /// Wait for the next tick and return its timestamp; `None` once the source has ended.
    fn next_tick(&mut self, clock: &dyn Clock) -> Option<f64>;
    /// Drop any pending tick. Safe to call repeatedly.
    fn cancel(&mut self);
    fn is_armed(&self) -> bool;
}

/// Display-synchronized ticks. A late frame lands on the next vsync after it finishes.
#[derive(Clone, Debug)]
pub struct AnimationFrames {
    period_ms: f64,
    next_vsync: f64,
    armed: bool,
}

impl AnimationFrames {
    pub fn new(period_ms: f64) -> Self {
        let period_ms = if period_ms.is_finite() && period_ms > 0.0 {
            period_ms
        } else {
            DEFAULT_REFRESH_MS
        };
        Self {
            period_ms,
            next_vsync: 0.0,
            armed: false,
        }
    }

    fn vsync_after(&self, t: f64) -> f64 {
        ((t / self.period_ms).floor() + 1.0) * self.period_ms
    }
}

impl FrameSource for AnimationFrames {
    fn discipline(&self) -> Discipline {
        Discipline::AnimationFrame
    }

    fn arm(&mut self, clock: &dyn Clock) {
        self.next_vsync = self.vsync_after(clock.now_ms());
        self.armed = true;
    }

    fn next_tick(&mut self, clock: &dyn Clock) -> Option<f64> {
        if !self.armed {
            return None;
        }
        let now = clock.now_ms();
        let due = if now > self.next_vsync {
            self.vsync_after(now)
        } else {
            self.next_vsync
        };
        clock.sleep_until_ms(due);
        self.next_vsync = due + self.period_ms;
        Some(due)
    }

    fn cancel(&mut self) {
        self.armed = false;
    }

    fn is_armed(&self) -> bool {
        self.armed
    }
}

/// Timer ticks at a nominal period. A busy thread delays ticks; missed ones are not replayed.
#[derive(Clone, Debug)]
pub struct FixedInterval {
    period_ms: f64,
    next_due: f64,
    armed: bool,
}

impl FixedInterval {
    pub fn new(period_ms: f64) -> Self {
        Self {
            period_ms: period_ms.max(1.0),
            next_due: 0.0,
            armed: false,
        }
    }
}

impl FrameSource for FixedInterval {
    fn discipline(&self) -> Discipline {
        Discipline::FixedInterval
    }

    fn arm(&mut self, clock: &dyn Clock) {
        self.next_due = clock.now_ms() + self.period_ms;
        self.armed = true;
    }

    fn next_tick(&mut self, clock: &dyn Clock) -> Option<f64> {
        if !self.armed {
            return None;
        }
        clock.sleep_until_ms(self.next_due);
        let now = clock.now_ms();
        self.next_due = (self.next_due + self.period_ms).max(now);
        Some(now)
    }

    fn cancel(&mut self) {
        self.armed = false;
    }

    fn is_armed(&self) -> bool {
        self.armed
    }
}

/// Replays a fixed list of inter-tick gaps, then ends.
#[derive(Clone, Debug)]
pub struct ScriptedFrames {
    discipline: Discipline,
    script: Vec<f64>,
    pending: VecDeque<f64>,
    last: f64,
    armed: bool,
}

impl ScriptedFrames {
    pub fn new(deltas_ms: impl IntoIterator<Item = f64>) -> Self {
        Self {
            discipline: Discipline::AnimationFrame,
            script: deltas_ms.into_iter().collect(),
            pending: VecDeque::new(),
            last: 0.0,
            armed: false,
        }
    }

    pub fn uniform(delta_ms: f64, count: usize) -> Self {
        Self::new(std::iter::repeat_n(delta_ms, count))
    }

    pub fn with_discipline(mut self, discipline: Discipline) -> Self {
        self.discipline = discipline;
        self
    }
}

impl FrameSource for ScriptedFrames {
    fn discipline(&self) -> Discipline {
        self.discipline
    }

    fn arm(&mut self, clock: &dyn Clock) {
        self.pending = self.script.iter().copied().collect();
        self.last = clock.now_ms();
        self.armed = true;
    }

    fn next_tick(&mut self, clock: &dyn Clock) -> Option<f64> {
        if !self.armed {
            return None;
        }
        let delta = self.pending.pop_front()?;
        let due = self.last.max(clock.now_ms()) + delta.max(0.0);
        clock.sleep_until_ms(due);
        self.last = due;
        Some(due)
    }

    fn cancel(&mut self) {
        self.armed = false;
        self.pending.clear();
    }

    fn is_armed(&self) -> bool {
        self.armed
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameTick {
    pub index: u64,
    pub timestamp_ms: f64,
    pub delta_ms: f64,
    /// Time since the run started.
    pub elapsed_ms: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickControl {
    Continue,
    Stop,
}

/// Per-tick work: advance the simulation by `tick.delta_ms`, then render.
pub trait FrameHandler {
    fn on_frame(&mut self, tick: &FrameTick) -> CanvasResult<TickControl>;
}

impl<F> FrameHandler for F
where
    F: FnMut(&FrameTick) -> CanvasResult<TickControl>,
{
    fn on_frame(&mut self, tick: &FrameTick) -> CanvasResult<TickControl> {
        self(tick)
    }
}

/// Shared stop flag, handed to input handlers that need to end a run from inside a tick.
#[derive(Clone, Debug, Default)]
pub struct StopToken(Rc<Cell<bool>>);

impl StopToken {
    pub fn stop(&self) {
        self.0.set(true);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.get()
    }

    fn reset(&self) {
        self.0.set(false);
    }
}

/// `run` holds the scheduler mutably, so the wind-down between a stop and `Idle` is never observable.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StopReason {
    Completed,
    Stopped,
    SafetyTimeout,
    SourceEnded,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct RunReport {
    pub discipline: Discipline,
    pub reason: StopReason,
    pub frames: u64,
    pub samples: Vec<FrameSample>,
    pub stats: Option<FrameStats>,
}

/// Drives a [`FrameHandler`] from a [`FrameSource`] over one measurement window.
#[derive(Debug)]
pub struct Scheduler<S: FrameSource> {
    source: S,
    state: SchedulerState,
    token: StopToken,
}

impl<S: FrameSource> Scheduler<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            state: SchedulerState::Idle,
            token: StopToken::default(),
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn discipline(&self) -> Discipline {
        self.source.discipline()
    }

    pub fn stop_token(&self) -> StopToken {
        self.token.clone()
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Request a stop and cancel pending ticks. Idempotent.
    pub fn stop(&mut self) {
        self.token.stop();
        self.source.cancel();
    }

    /// Run until the window closes, a stop is requested, the source ends, or the safety timeout.
    ///
    /// Within a tick the handler (update, then render) strictly precedes sample capture.
    #[tracing::instrument(skip(self, clock, handler, timing), fields(discipline = %self.source.discipline()))]
    pub fn run(
        &mut self,
        clock: &dyn Clock,
        handler: &mut dyn FrameHandler,
        timing: &TimingConfig,
        refresh_ms: f64,
    ) -> CanvasResult<RunReport> {
        if self.state != SchedulerState::Idle {
            return Err(CanvasError::validation("scheduler is already running"));
        }
        timing.validate()?;

        self.token.reset();
        self.state = SchedulerState::Running;
        tracing::debug!("scheduler running");
        self.source.arm(clock);

        let start = clock.now_ms();
        let mut recorder = FrameRecorder::new(start + timing.warmup_ms);
        let outcome = self.drive(clock, handler, timing, start, &mut recorder);

        recorder.close();
        self.source.cancel();
        self.state = SchedulerState::Idle;

        let (reason, frames) = outcome?;
        if reason == StopReason::SafetyTimeout {
            tracing::warn!(frames, "run exceeded its safety timeout, forced stop");
        }
        tracing::debug!(?reason, frames, "scheduler idle");

        let stats = summarize(&recorder.deltas(), refresh_ms, timing.vsync_epsilon_ms);
        Ok(RunReport {
            discipline: self.source.discipline(),
            reason,
            frames,
            samples: recorder.samples().to_vec(),
            stats,
        })
    }

    fn drive(
        &mut self,
        clock: &dyn Clock,
        handler: &mut dyn FrameHandler,
        timing: &TimingConfig,
        start: f64,
        recorder: &mut FrameRecorder,
    ) -> CanvasResult<(StopReason, u64)> {
        let window_end = start + timing.duration_ms;
        let safety_end = window_end + timing.safety_margin_ms;
        let first_tick_is_zero = self.source.discipline() == Discipline::AnimationFrame;
        let mut last: Option<f64> = None;
        let mut frames = 0u64;

        loop {
            if self.token.is_stopped() {
                return Ok((StopReason::Stopped, frames));
            }
            let Some(ts) = self.source.next_tick(clock) else {
                return Ok((StopReason::SourceEnded, frames));
            };
            if self.token.is_stopped() {
                return Ok((StopReason::Stopped, frames));
            }
            if ts > safety_end {
                return Ok((StopReason::SafetyTimeout, frames));
            }

            let prev = match last {
                Some(p) => p,
                None if first_tick_is_zero => ts,
                None => start,
            };
            let tick = FrameTick {
                index: frames,
                timestamp_ms: ts,
                delta_ms: (ts - prev).max(0.0),
                elapsed_ms: ts - start,
            };
            last = Some(ts);

            let control = handler.on_frame(&tick)?;
            frames += 1;

            if control == TickControl::Stop || self.token.is_stopped() {
                return Ok((StopReason::Stopped, frames));
            }
            recorder.record(tick.timestamp_ms, tick.delta_ms);
            if ts >= window_end {
                return Ok((StopReason::Completed, frames));
            }
        }
    }
}

/// Median of `samples` consecutive tick gaps, taken as the display's nominal period.
pub fn estimate_refresh_interval<S: FrameSource>(
    source: &mut S,
    clock: &dyn Clock,
    samples: usize,
) -> CanvasResult<f64> {
    if samples == 0 {
        return Err(CanvasError::validation("refresh estimation needs samples"));
    }
    source.arm(clock);
    let mut deltas = Vec::with_capacity(samples);
    let mut last: Option<f64> = None;
    while deltas.len() < samples {
        let Some(ts) = source.next_tick(clock) else {
            break;
        };
        if let Some(prev) = last {
            deltas.push(ts - prev);
        }
        last = Some(ts);
    }
    source.cancel();
    let estimate = median(&deltas)
        .ok_or_else(|| CanvasError::validation("frame source ended before any refresh sample"))?;
    tracing::debug!(estimate_ms = estimate, samples = deltas.len(), "refresh interval estimated");
    Ok(estimate)
}

#[cfg(test)]
#[path = "../../tests/unit/timing/scheduler.rs"]
mod tests;

//! Procedural particle fields: twinkling stars, drifting snow, bouncing motes and the ball used by
//! the cache comparison. Every field owns a seeded [`Rng64`] so rebuilds are reproducible.

use std::f64::consts::TAU;

use crate::foundation::core::{Point, Rgba8, Size, Vec2};
use crate::foundation::math::Rng64;

/// Milliseconds in one 60 Hz frame; snow motion is tuned per frame at this rate.
pub const FRAME_60HZ_MS: f64 = 1000.0 / 60.0;

pub const STAR_SPRITE_SCALE: f64 = 6.0;
pub const SNOW_SPRITE_SCALE: f64 = 8.0;
/// Fraction of flakes drawn behind the photo.
pub const SNOW_BACK_FRACTION: f64 = 0.8;
pub const SNOW_FRONT_SIZE_BOOST: f64 = 1.25;
pub const SNOW_FRONT_ALPHA_BOOST: f64 = 1.1;
/// Vertical slack before a flake below the surface wraps to the top.
const SNOW_WRAP_MARGIN: f64 = 6.0;

pub const MOTE_FILL: Rgba8 = Rgba8::opaque(0x4e, 0x79, 0xa7);
pub const MOTE_ALPHA: f64 = 0.8;
pub const MOTE_BASE_SPEED: f64 = 120.0;

pub const BALL_RADIUS: f64 = 16.0;
pub const BALL_FILL: Rgba8 = Rgba8::opaque(0x5a, 0xa9, 0xe6);

pub fn star_count(area: f64) -> usize {
    (area / 1800.0).round().clamp(150.0, 900.0) as usize
}

pub fn snow_count(area: f64) -> usize {
    (area / 4500.0).round().clamp(120.0, 500.0) as usize
}

/// Reflective boundary handling along one axis: clamp into `[lo, hi]` and invert the velocity.
pub fn reflect(pos: &mut f64, vel: &mut f64, lo: f64, hi: f64) {
    if *pos < lo {
        *pos = lo;
        *vel = -*vel;
    }
    if *pos > hi {
        *pos = hi;
        *vel = -*vel;
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Star {
    pub position: Point,
    pub size: f64,
    pub base_alpha: f64,
    pub twinkle_amp: f64,
    pub twinkle_speed: f64,
    pub phase: f64,
}

impl Star {
    /// Alpha at `t_s` seconds.
    pub fn alpha_at(&self, t_s: f64) -> f64 {
        (self.base_alpha + self.twinkle_amp * (self.phase + t_s * self.twinkle_speed * 2.0).sin())
            .clamp(0.0, 1.0)
    }

    pub fn sprite_edge(&self) -> f64 {
        self.size * STAR_SPRITE_SCALE
    }
}

#[derive(Clone, Debug)]
pub struct StarField {
    stars: Vec<Star>,
    rng: Rng64,
}

impl StarField {
    pub fn new(bounds: Size, seed: u64) -> Self {
        let mut field = Self {
            stars: Vec::new(),
            rng: Rng64::new(seed),
        };
        field.rebuild(bounds);
        field
    }

    pub fn rebuild(&mut self, bounds: Size) {
        let n = star_count(bounds.area());
        let rng = &mut self.rng;
        self.stars = (0..n)
            .map(|_| Star {
                position: Point::new(rng.range(0.0, bounds.width), rng.range(0.0, bounds.height)),
                size: rng.range(0.6, 2.2),
                base_alpha: rng.range(0.35, 0.9),
                twinkle_amp: rng.range(0.15, 0.55),
                twinkle_speed: rng.range(0.6, 1.6),
                phase: rng.range(0.0, TAU),
            })
            .collect();
    }

    pub fn stars(&self) -> &[Star] {
        &self.stars
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Flake {
    pub position: Point,
    pub size: f64,
    /// Fall speed in px per 60 Hz frame.
    pub vy: f64,
    pub drift_amp: f64,
    pub drift_speed: f64,
    pub phase: f64,
    pub alpha: f64,
}

#[derive(Clone, Debug)]
pub struct SnowField {
    flakes: Vec<Flake>,
    bounds: Size,
    rng: Rng64,
}

impl SnowField {
    pub fn new(bounds: Size, seed: u64) -> Self {
        let mut field = Self {
            flakes: Vec::new(),
            bounds,
            rng: Rng64::new(seed),
        };
        field.rebuild(bounds);
        field
    }

    pub fn rebuild(&mut self, bounds: Size) {
        self.bounds = bounds;
        let n = snow_count(bounds.area());
        let rng = &mut self.rng;
        self.flakes = (0..n)
            .map(|_| Flake {
                position: Point::new(rng.range(0.0, bounds.width), rng.range(0.0, bounds.height)),
                size: rng.range(1.2, 3.2),
                vy: rng.range(18.0, 55.0) / 60.0,
                drift_amp: rng.range(0.2, 1.4),
                drift_speed: rng.range(0.6, 1.6),
                phase: rng.range(0.0, TAU),
                alpha: rng.range(0.65, 1.0),
            })
            .collect();
    }

    /// Advance by `delta_ms`, measured in 60 Hz frames.
    pub fn step(&mut self, delta_ms: f64) {
        let frames = if delta_ms.is_finite() {
            delta_ms.max(0.0) / FRAME_60HZ_MS
        } else {
            0.0
        };
        let (w, h) = (self.bounds.width, self.bounds.height);
        for f in &mut self.flakes {
            f.phase += f.drift_speed / 60.0 * frames;
            f.position.x += f.phase.sin() * f.drift_amp * frames;
            f.position.y += f.vy * frames;
            if f.position.y > h + SNOW_WRAP_MARGIN {
                f.position.y = -SNOW_WRAP_MARGIN;
                f.position.x = self.rng.range(0.0, w);
            }
        }
    }

    pub fn flakes(&self) -> &[Flake] {
        &self.flakes
    }

    /// Index splitting the back layer from the front layer.
    pub fn back_split(&self) -> usize {
        (self.flakes.len() as f64 * SNOW_BACK_FRACTION).floor() as usize
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Mote {
    pub position: Point,
    /// px per second.
    pub velocity: Vec2,
    pub radius: f64,
}

impl Mote {
    pub fn step(&mut self, dt_s: f64, bounds: Size) {
        self.position += self.velocity * dt_s;
        let r = self.radius;
        reflect(
            &mut self.position.x,
            &mut self.velocity.x,
            r,
            bounds.width - r,
        );
        reflect(
            &mut self.position.y,
            &mut self.velocity.y,
            r,
            bounds.height - r,
        );
    }
}

/// Bouncing load for the frame-timing comparison.
#[derive(Clone, Debug)]
pub struct MoteField {
    motes: Vec<Mote>,
    bounds: Size,
}

impl MoteField {
    pub fn new(count: usize, bounds: Size, seed: u64) -> Self {
        let mut rng = Rng64::new(seed);
        let motes = (0..count)
            .map(|_| {
                let radius = rng.range(2.0, 4.0);
                let speed = MOTE_BASE_SPEED * rng.range(0.6, 1.4);
                let heading = rng.range(0.0, TAU);
                Mote {
                    position: Point::new(
                        rng.range(0.0, bounds.width),
                        rng.range(0.0, bounds.height),
                    ),
                    velocity: Vec2::from_angle(heading) * speed,
                    radius,
                }
            })
            .collect();
        Self { motes, bounds }
    }

    pub fn step(&mut self, delta_ms: f64) {
        let dt = (delta_ms / 1000.0).max(0.0);
        if !dt.is_finite() {
            return;
        }
        let bounds = self.bounds;
        for m in &mut self.motes {
            m.step(dt, bounds);
        }
    }

    pub fn motes(&self) -> &[Mote] {
        &self.motes
    }

    pub fn bounds(&self) -> Size {
        self.bounds
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
/// Live entity of the redraw-vs-cache comparison.
pub struct Ball {
    pub position: Point,
    pub velocity: Vec2,
    pub radius: f64,
}

impl Default for Ball {
    fn default() -> Self {
        Self::new()
    }
}

impl Ball {
    pub fn new() -> Self {
        Self {
            position: Point::new(60.0, 60.0),
            velocity: Vec2::new(180.0, 120.0),
            radius: BALL_RADIUS,
        }
    }

    pub fn step(&mut self, delta_ms: f64, bounds: Size) {
        let dt = (delta_ms / 1000.0).max(0.0);
        if !dt.is_finite() {
            return;
        }
        self.position += self.velocity * dt;
        reflect(
            &mut self.position.x,
            &mut self.velocity.x,
            self.radius,
            bounds.width - self.radius,
        );
        reflect(
            &mut self.position.y,
            &mut self.velocity.y,
            self.radius,
            bounds.height - self.radius,
        );
    }
}

#[cfg(test)]
#[path = "../../tests/unit/scene/particles.rs"]
mod tests;

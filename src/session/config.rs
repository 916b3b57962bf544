use std::fmt;
use std::path::Path;
use std::str::FromStr;

use anyhow::Context;

use crate::filter::engine::{FilterKind, FilterParams};
use crate::foundation::core::{Point, Rgba8, Size};
use crate::foundation::error::{CanvasError, CanvasResult};
use crate::scene::model::{EntityId, EntitySpec};
use crate::timing::scheduler::TimingConfig;

/// Which demo scene a session renders.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SceneMode {
    #[default]
    Stickers,
    Stars,
    Snow,
    Particles,
    Tiles,
}

impl SceneMode {
    pub const ALL: [SceneMode; 5] = [
        Self::Stickers,
        Self::Stars,
        Self::Snow,
        Self::Particles,
        Self::Tiles,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Stickers => "stickers",
            Self::Stars => "stars",
            Self::Snow => "snow",
            Self::Particles => "particles",
            Self::Tiles => "tiles",
        }
    }
}

impl fmt::Display for SceneMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SceneMode {
    type Err = CanvasError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| CanvasError::validation(format!("unknown scene mode '{s}'")))
    }
}

/// Tile background strategy of the redraw-vs-cache scene.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RenderMode {
    /// Blit the background cached in the offscreen layer.
    #[default]
    Cached,
    /// Repaint the background every frame.
    Full,
}

impl RenderMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cached => "cached",
            Self::Full => "full",
        }
    }
}

impl fmt::Display for RenderMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RenderMode {
    type Err = CanvasError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cached" => Ok(Self::Cached),
            "full" => Ok(Self::Full),
            _ => Err(CanvasError::validation(format!("unknown render mode '{s}'"))),
        }
    }
}

/// Everything a [`CompositorSession`](crate::CompositorSession) is built from.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Logical surface width in CSS pixels.
    pub width: f64,
    pub height: f64,
    pub device_scale: f64,
    /// Extra multiplier on top of the device scale, for stress runs.
    pub resolution_scale: f64,
    pub scene: SceneMode,
    pub filter: FilterKind,
    pub filter_params: FilterParams,
    pub render_mode: RenderMode,
    pub transparent_background: bool,
    pub particle_count: usize,
    pub tile_count: u32,
    pub seed: u64,
    pub stickers: Vec<EntitySpec>,
    pub selected: Option<EntityId>,
    /// Window of the live FPS readout.
    pub fps_window_ms: f64,
    pub timing: TimingConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::sticker_playground()
    }
}

impl SessionConfig {
    /// Two stickers over the gradient background, `A` selected.
    pub fn sticker_playground() -> Self {
        Self {
            width: 600.0,
            height: 400.0,
            device_scale: 1.0,
            resolution_scale: 1.0,
            scene: SceneMode::Stickers,
            filter: FilterKind::None,
            filter_params: FilterParams::default(),
            render_mode: RenderMode::Cached,
            transparent_background: false,
            particle_count: 9000,
            tile_count: 3000,
            seed: 0x5eed,
            stickers: default_stickers(),
            selected: Some(EntityId::new("A")),
            fps_window_ms: 1000.0,
            timing: TimingConfig::default(),
        }
    }

    /// Photo scene with the star field.
    pub fn magic_photo() -> Self {
        Self {
            scene: SceneMode::Stars,
            width: 800.0,
            height: 500.0,
            stickers: Vec::new(),
            selected: None,
            ..Self::sticker_playground()
        }
    }

    /// Particle load for the animation-frame vs fixed-interval comparison.
    pub fn frame_benchmark() -> Self {
        Self {
            scene: SceneMode::Particles,
            width: 900.0,
            height: 600.0,
            resolution_scale: 2.0,
            stickers: Vec::new(),
            selected: None,
            ..Self::sticker_playground()
        }
    }

    /// Tile background plus bouncing ball, cached mode.
    pub fn cache_comparison() -> Self {
        Self {
            scene: SceneMode::Tiles,
            width: 900.0,
            height: 600.0,
            stickers: Vec::new(),
            selected: None,
            fps_window_ms: 300.0,
            ..Self::sticker_playground()
        }
    }

    pub fn for_scene(scene: SceneMode) -> Self {
        match scene {
            SceneMode::Stickers => Self::sticker_playground(),
            SceneMode::Stars => Self::magic_photo(),
            SceneMode::Snow => Self {
                scene: SceneMode::Snow,
                ..Self::magic_photo()
            },
            SceneMode::Particles => Self::frame_benchmark(),
            SceneMode::Tiles => Self::cache_comparison(),
        }
    }

    pub fn logical_size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    pub fn from_json_str(json: &str) -> CanvasResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| CanvasError::serde(format!("session config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> CanvasResult<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("read session config '{}'", path.display()))?;
        Self::from_json_str(&json)
    }

    pub fn to_json_pretty(&self) -> CanvasResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| CanvasError::serde(format!("session config: {e}")))
    }

    pub fn validate(&self) -> CanvasResult<()> {
        let size_ok = |v: f64| v.is_finite() && v > 0.0;
        if !size_ok(self.width) || !size_ok(self.height) {
            return Err(CanvasError::validation(format!(
                "logical size must be positive and finite, got {}x{}",
                self.width, self.height
            )));
        }
        if !self.device_scale.is_finite() || !size_ok(self.resolution_scale) {
            return Err(CanvasError::validation(
                "device and resolution scales must be finite and positive",
            ));
        }
        if !size_ok(self.fps_window_ms) {
            return Err(CanvasError::validation("fps window must be > 0"));
        }
        self.filter_params.validate()?;
        self.timing.validate()?;
        Ok(())
    }
}

fn default_stickers() -> Vec<EntitySpec> {
    vec![
        EntitySpec::rect(
            "A",
            Point::new(360.0, 260.0),
            Size::new(120.0, 90.0),
            Rgba8::opaque(0xe9, 0x4f, 0x37),
        ),
        EntitySpec::triangle(
            "B",
            Point::new(220.0, 180.0),
            Size::new(140.0, 120.0),
            Rgba8::opaque(0xf9, 0xc7, 0x4f),
        ),
    ]
}

#[cfg(test)]
#[path = "../../tests/unit/session/config.rs"]
mod tests;

//! canvaslab is a 2D scene compositor with an offscreen-cache render pipeline.
//!
//! The public API is session-oriented:
//!
//! - Describe a scene with a [`SessionConfig`]
//! - Create a [`CompositorSession`] and feed it [`Command`]s
//! - Render frames directly, or drive the session from a [`Scheduler`] to collect [`FrameStats`]
//! - Export the composite with [`export_png`]
//!
//! Rendering runs on the CPU through `vello_cpu`; every draw is composited with a canvas-style
//! operator ([`BlendMode`]) and global alpha. Rasters are premultiplied RGBA8 throughout.
#![forbid(unsafe_code)]

mod assets;
mod cache;
mod export;
mod filter;
mod foundation;
mod raster;
mod render;
mod scene;
mod session;
mod surface;
mod timing;

pub use crate::foundation::core::{
    Affine, BezPath, PixelSize, Point, Rect, Rgba8, Rgba8Premul, Size, Vec2,
};
pub use crate::foundation::error::{CanvasError, CanvasResult};
pub use crate::foundation::math::Rng64;

pub use crate::assets::image::{Bitmap, FileImageProvider, ImageProvider, decode_bitmap, load_bitmap};
pub use crate::cache::layer::{BackgroundSource, CacheStats, CachedRaster, OffscreenCache};
pub use crate::export::png::{EXPORT_SIZE, ExportOpts, encode_png, export_file_name, export_png};
pub use crate::filter::engine::{EDGE_KERNEL, FilterKind, FilterParams, apply_filter};
pub use crate::raster::buffer::Raster;
pub use crate::raster::paint::{ColorStop, linear_gradient};
pub use crate::render::blend::BlendMode;
pub use crate::render::composite::composite_rgba8_premul;
pub use crate::render::cpu::{CpuRenderer, ImageKey, LayerPainter};
pub use crate::scene::model::{
    Entity, EntityId, EntityKind, EntityPatch, EntitySpec, MAX_SCALE, Scene,
};
pub use crate::scene::particles::{Ball, Flake, Mote, MoteField, SnowField, Star, StarField};
pub use crate::session::command::Command;
pub use crate::session::compositor::{CompositorSession, fit_contain};
pub use crate::session::config::{RenderMode, SceneMode, SessionConfig};
pub use crate::surface::manager::{MAX_BACKING_EDGE, Surface};
pub use crate::timing::clock::{Clock, ManualClock, SystemClock};
pub use crate::timing::scheduler::{
    AnimationFrames, DEFAULT_REFRESH_MS, Discipline, FixedInterval, FrameHandler, FrameSource,
    FrameTick, RunReport, Scheduler, SchedulerState, ScriptedFrames, StopReason, StopToken,
    TickControl, TimingConfig, estimate_refresh_interval,
};
pub use crate::timing::stats::{
    DEFAULT_VSYNC_EPSILON_MS, FpsBand, FpsCounter, FrameRecorder, FrameSample, FrameStats,
    long_frame_threshold, median, percentile, summarize, vsync_rate,
};

use std::f64::consts::{PI, TAU};
use std::sync::Arc;

use kurbo::{Circle, Shape};

use crate::cache::layer::{BackgroundSource, CacheStats, OffscreenCache, default_background_stops};
use crate::export::png::{ExportOpts, export_png};
use crate::filter::engine::FilterKind;
use crate::foundation::core::{Affine, BezPath, PixelSize, Point, Rect, Rgba8, Size, Vec2};
use crate::foundation::error::{CanvasError, CanvasResult};
use crate::foundation::math::Rng64;
use crate::raster::buffer::Raster;
use crate::raster::paint::paint_tiles;
use crate::render::blend::BlendMode;
use crate::render::cpu::CpuRenderer;
use crate::scene::model::{Entity, EntityId, EntityPatch, Scene};
use crate::scene::particles::{
    BALL_FILL, Ball, Flake, MOTE_ALPHA, MOTE_FILL, MoteField, SNOW_FRONT_ALPHA_BOOST,
    SNOW_FRONT_SIZE_BOOST, SNOW_SPRITE_SCALE, SnowField, StarField,
};
use crate::scene::shape::{CORNER_RADIUS, OUTLINE_COLOR, rounded_rect_path, selection_outline, shape_path};
use crate::session::command::Command;
use crate::session::config::{RenderMode, SceneMode, SessionConfig};
use crate::surface::manager::{MAX_BACKING_EDGE, Surface};
use crate::timing::scheduler::{FrameHandler, FrameTick, TickControl};
use crate::timing::stats::{FpsBand, FpsCounter};

/// Padding around a photo fitted into the surface.
pub const PHOTO_PADDING: f64 = 24.0;
pub const ROTATE_STEP_RAD: f64 = PI / 12.0;
pub const SCALE_STEP: f64 = 1.1;

const STAR_VEIL: Rgba8 = Rgba8::new(0, 0, 0, 38);
const SNOW_VEIL: Rgba8 = Rgba8::new(10, 15, 30, 64);
const PLACEHOLDER_PANEL: Size = Size::new(260.0, 56.0);
const PLACEHOLDER_FILL: Rgba8 = Rgba8::new(255, 255, 255, 31);
const PLACEHOLDER_BAR: Size = Size::new(140.0, 4.0);
const PLACEHOLDER_INK: Rgba8 = Rgba8::new(255, 255, 255, 191);
const PATH_TOLERANCE: f64 = 0.1;

/// Images the renderer can upload as paints; larger ones are rejected before they reach the cache.
fn check_image_size(size: PixelSize) -> CanvasResult<()> {
    if size.width > MAX_BACKING_EDGE || size.height > MAX_BACKING_EDGE {
        return Err(CanvasError::validation(format!(
            "image {}x{} exceeds the {MAX_BACKING_EDGE} px edge limit",
            size.width, size.height
        )));
    }
    Ok(())
}

/// Largest rectangle with the image's aspect ratio that fits `view` minus `pad` on every side,
/// centered. `None` when either size is degenerate.
pub fn fit_contain(image: Size, view: Size, pad: f64) -> Option<Rect> {
    let avail = Size::new(view.width - pad * 2.0, view.height - pad * 2.0);
    if image.width <= 0.0 || image.height <= 0.0 || avail.width <= 0.0 || avail.height <= 0.0 {
        return None;
    }
    let s = (avail.width / image.width).min(avail.height / image.height);
    let size = Size::new(image.width * s, image.height * s);
    let origin = Point::new((view.width - size.width) / 2.0, (view.height - size.height) / 2.0);
    Some(Rect::from_origin_size(origin, size))
}

#[derive(Clone, Debug, PartialEq)]
struct Drag {
    id: EntityId,
    offset: Vec2,
}

/// One compositor instance: surface, scene, caches, live fields and UI-facing status.
///
/// Input goes through [`CompositorSession::apply`]; frames are produced by
/// [`CompositorSession::render_frame`] or by driving the session as a [`FrameHandler`].
pub struct CompositorSession {
    config: SessionConfig,
    surface: Surface,
    viewport: Rect,
    scene: Scene,
    cache: OffscreenCache,
    renderer: CpuRenderer,
    stars: StarField,
    snow: SnowField,
    motes: MoteField,
    mote_seed: u64,
    ball: Ball,
    mode: SceneMode,
    render_mode: RenderMode,
    tile_count: u32,
    tile_seed: u64,
    transparent_background: bool,
    time_ms: f64,
    drag: Option<Drag>,
    dirty: bool,
    message: Option<String>,
    fps: FpsCounter,
    frames_rendered: u64,
}

impl std::fmt::Debug for CompositorSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositorSession")
            .field("mode", &self.mode)
            .field("backing", &self.surface.backing_size())
            .field("entities", &self.scene.len())
            .field("frames_rendered", &self.frames_rendered)
            .finish_non_exhaustive()
    }
}

impl CompositorSession {
    pub fn new(config: SessionConfig) -> CanvasResult<Self> {
        config.validate()?;
        let logical = config.logical_size();
        let surface = Surface::new(logical, config.device_scale, config.resolution_scale)?;

        let mut cache = OffscreenCache::new(
            BackgroundSource::Gradient(default_background_stops()),
            config.filter_params,
        );
        cache.prepare_for_surface(surface.backing_size())?;
        if config.filter != FilterKind::None {
            cache.rebuild(config.filter)?;
        }

        let mut scene = Scene::new();
        for spec in &config.stickers {
            scene.add_entity(spec.clone())?;
        }
        if let Some(id) = &config.selected
            && !scene.select(id)
        {
            return Err(CanvasError::validation(format!(
                "selected entity '{id}' is not in the scene"
            )));
        }

        let mut seeds = Rng64::new(config.seed);
        let stars = StarField::new(logical, seeds.next_u64());
        let snow = SnowField::new(logical, seeds.next_u64());
        let mote_seed = seeds.next_u64();
        let motes = MoteField::new(config.particle_count, logical, mote_seed);
        let tile_seed = seeds.next_u64();

        tracing::debug!(
            scene = %config.scene,
            width = surface.backing_size().width,
            height = surface.backing_size().height,
            "compositor session created"
        );

        Ok(Self {
            viewport: Rect::from_origin_size(Point::ZERO, logical),
            surface,
            scene,
            cache,
            renderer: CpuRenderer::new(),
            stars,
            snow,
            motes,
            mote_seed,
            ball: Ball::new(),
            mode: config.scene,
            render_mode: config.render_mode,
            tile_count: config.tile_count,
            tile_seed,
            transparent_background: config.transparent_background,
            time_ms: 0.0,
            drag: None,
            dirty: true,
            message: None,
            fps: FpsCounter::new(config.fps_window_ms),
            frames_rendered: 0,
            config,
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn cache(&self) -> &OffscreenCache {
        &self.cache
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn scene_mode(&self) -> SceneMode {
        self.mode
    }

    pub fn render_mode(&self) -> RenderMode {
        self.render_mode
    }

    pub fn filter(&self) -> FilterKind {
        self.cache.filter()
    }

    pub fn tile_count(&self) -> u32 {
        self.tile_count
    }

    pub fn transparent_background(&self) -> bool {
        self.transparent_background
    }

    pub fn stars(&self) -> &StarField {
        &self.stars
    }

    pub fn snow(&self) -> &SnowField {
        &self.snow
    }

    pub fn motes(&self) -> &MoteField {
        &self.motes
    }

    pub fn ball(&self) -> &Ball {
        &self.ball
    }

    /// Simulation time in milliseconds.
    pub fn time_ms(&self) -> f64 {
        self.time_ms
    }

    /// Whether state changed since the last rendered frame.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    pub fn layers_drawn(&self) -> u64 {
        self.renderer.layers_drawn()
    }

    pub fn fps(&self) -> Option<u32> {
        self.fps.fps()
    }

    pub fn fps_band(&self) -> Option<FpsBand> {
        self.fps.band()
    }

    /// `Selected: <kind> | Filter: <kind>`.
    pub fn status_line(&self) -> String {
        let selected = self.scene.selected().map_or("none", |e| e.kind.as_str());
        format!("Selected: {selected} | Filter: {}", self.cache.filter())
    }

    /// Latest transient message, e.g. `Image loaded`.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn frame(&self) -> &Raster {
        self.surface.store()
    }

    /// Apply one input command. Collaborator failures become status messages; invalid input is an error.
    #[tracing::instrument(skip(self, command), fields(command = command.name()))]
    pub fn apply(&mut self, command: Command) -> CanvasResult<()> {
        match command {
            Command::PointerDown(p) => {
                let logical = self.surface.viewport_to_logical(p, self.viewport);
                let Some(hit) = self.scene.hit_test(logical) else {
                    return Ok(());
                };
                let id = hit.id.clone();
                let offset = logical - hit.position;
                self.scene.select(&id);
                self.drag = Some(Drag { id, offset });
            }
            Command::PointerMove(p) => {
                let Some(drag) = &self.drag else {
                    return Ok(());
                };
                let logical = self.surface.viewport_to_logical(p, self.viewport);
                let patch = EntityPatch {
                    position: Some(logical - drag.offset),
                    ..EntityPatch::default()
                };
                let id = drag.id.clone();
                if self.scene.mutate(&id, &patch).is_err() {
                    // Dragged entity was removed mid-drag.
                    self.drag = None;
                }
            }
            Command::PointerUp => {
                self.drag = None;
                return Ok(());
            }
            Command::Select(id) => {
                if !self.scene.select(&id) {
                    return Err(CanvasError::validation(format!("unknown entity '{id}'")));
                }
            }
            Command::SetBlend(blend) => self.patch_selected(|_| EntityPatch {
                blend: Some(blend),
                ..EntityPatch::default()
            })?,
            Command::SetOpacity(opacity) => self.patch_selected(|_| EntityPatch {
                opacity: Some(opacity),
                ..EntityPatch::default()
            })?,
            Command::RotateStep => self.patch_selected(|e| EntityPatch {
                rotation_rad: Some((e.rotation_rad + ROTATE_STEP_RAD).rem_euclid(TAU)),
                ..EntityPatch::default()
            })?,
            Command::ScaleUp => self.patch_selected(|e| EntityPatch {
                scale: Some(e.scale * SCALE_STEP),
                ..EntityPatch::default()
            })?,
            Command::ResetTransform => self.patch_selected(|_| EntityPatch {
                rotation_rad: Some(0.0),
                scale: Some(1.0),
                ..EntityPatch::default()
            })?,
            Command::AddEntity(spec) => {
                let id = self.scene.add_entity(spec)?;
                self.scene.select(&id);
            }
            Command::RemoveEntity(id) => {
                if self.scene.remove_entity(&id).is_none() {
                    return Err(CanvasError::validation(format!("unknown entity '{id}'")));
                }
                if self.drag.as_ref().is_some_and(|d| d.id == id) {
                    self.drag = None;
                }
            }
            Command::ApplyFilter(kind) => {
                if let Err(err) = self.cache.rebuild(kind) {
                    self.message = Some(format!("Filter failed: {err}"));
                }
            }
            Command::ResetFilter => {
                if let Err(err) = self.cache.reset() {
                    self.message = Some(format!("Filter reset failed: {err}"));
                }
            }
            Command::SetFilterParams(params) => {
                if let Err(err) = self.cache.set_params(params) {
                    self.message = Some(format!("Filter failed: {err}"));
                }
            }
            Command::SetTransparentBackground(on) => self.transparent_background = on,
            Command::SetSceneMode(mode) => {
                self.mode = mode;
                self.drag = None;
            }
            Command::SetRenderMode(mode) => {
                if mode == RenderMode::Cached && self.render_mode != RenderMode::Cached {
                    self.cache.invalidate_tiles();
                }
                self.render_mode = mode;
            }
            Command::SetTileCount(count) => self.tile_count = count,
            Command::RegenerateBackground => {
                self.tile_seed = Rng64::new(self.tile_seed).next_u64();
                self.cache.invalidate_tiles();
                let logical = self.surface.logical_size();
                self.stars.rebuild(logical);
                self.snow.rebuild(logical);
            }
            Command::Resize {
                logical,
                device_scale,
            } => self.resize(logical, device_scale)?,
            Command::SetViewport { origin, size } => {
                self.viewport = Rect::from_origin_size(origin, size);
                return Ok(());
            }
            Command::LoadImage(bitmap) => {
                let loaded = check_image_size(bitmap.size())
                    .and_then(|()| bitmap.to_raster())
                    .and_then(|raster| match self.mode {
                        SceneMode::Stickers => self
                            .cache
                            .set_source(BackgroundSource::Raster(Arc::new(raster))),
                        _ => self.cache.set_photo(raster),
                    });
                self.message = Some(match loaded {
                    Ok(()) => "Image loaded".to_string(),
                    Err(err) => {
                        tracing::warn!(error = %err, "image rejected");
                        format!("Image load failed: {err}")
                    }
                });
            }
            Command::ImageLoadFailed(reason) => {
                tracing::warn!(%reason, "image collaborator failed");
                self.message = Some(format!("Image load failed: {reason}"));
            }
            Command::ClearImage => {
                if self.mode == SceneMode::Stickers {
                    let gradient = BackgroundSource::Gradient(default_background_stops());
                    if let Err(err) = self.cache.set_source(gradient) {
                        self.message = Some(format!("Background reset failed: {err}"));
                    } else {
                        self.message = Some("Background reset".to_string());
                    }
                } else if self.cache.clear_photo() {
                    self.message = Some("Photo cleared".to_string());
                }
            }
        }
        self.dirty = true;
        Ok(())
    }

    fn patch_selected(&mut self, make: impl FnOnce(&Entity) -> EntityPatch) -> CanvasResult<()> {
        let Some(entity) = self.scene.selected() else {
            return Err(CanvasError::validation("no entity selected"));
        };
        let id = entity.id.clone();
        let patch = make(entity);
        self.scene.mutate(&id, &patch)
    }

    fn resize(&mut self, logical: Size, device_scale: f64) -> CanvasResult<()> {
        let before = (self.surface.logical_size(), self.surface.generation());
        self.surface.configure(logical)?;
        self.surface.set_device_scale(device_scale)?;
        self.viewport = Rect::from_origin_size(self.viewport.origin(), logical);
        if (self.surface.logical_size(), self.surface.generation()) != before {
            self.rebuild_surface_resources();
        }
        Ok(())
    }

    /// Rebuild everything tied to the surface size. A failed cache rebuild keeps the old rasters.
    fn rebuild_surface_resources(&mut self) {
        if let Err(err) = self.cache.prepare_for_surface(self.surface.backing_size()) {
            tracing::warn!(error = %err, "cache rebuild after resize failed");
            self.message = Some(format!("Background rebuild failed: {err}"));
        }
        self.renderer.forget_images();
        let logical = self.surface.logical_size();
        self.stars.rebuild(logical);
        self.snow.rebuild(logical);
        self.motes = MoteField::new(self.config.particle_count, logical, self.mote_seed);
    }

    /// Advance live simulation state by `delta_ms`.
    pub fn advance(&mut self, delta_ms: f64) {
        let delta_ms = if delta_ms.is_finite() {
            delta_ms.max(0.0)
        } else {
            0.0
        };
        self.time_ms += delta_ms;
        match self.mode {
            SceneMode::Snow => self.snow.step(delta_ms),
            SceneMode::Particles => self.motes.step(delta_ms),
            SceneMode::Tiles => self.ball.step(delta_ms, self.surface.logical_size()),
            SceneMode::Stickers | SceneMode::Stars => {}
        }
    }

    /// Run one full render pass into the surface backing store.
    pub fn render_frame(&mut self) -> CanvasResult<&Raster> {
        if self.cache.backing() != self.surface.backing_size() {
            self.rebuild_surface_resources();
        }
        let opts = PassOpts {
            transform: self.surface.logical_transform(),
            background: !self.transparent_background,
            outline: true,
            keep_previous: true,
        };
        let mut frame = FrameRefs {
            scene: &self.scene,
            cache: &mut self.cache,
            stars: &self.stars,
            snow: &self.snow,
            motes: &self.motes,
            ball: &self.ball,
            mode: self.mode,
            render_mode: self.render_mode,
            tile_count: self.tile_count,
            tile_seed: self.tile_seed,
            time_ms: self.time_ms,
            sprite_scale: self.surface.scale(),
            logical: self.surface.logical_size(),
        };
        compose(
            &mut frame,
            &mut self.renderer,
            self.surface.store_mut(),
            &opts,
        )?;
        self.dirty = false;
        self.frames_rendered += 1;
        Ok(self.surface.store())
    }

    /// Render the composite into a fresh `size` buffer, independent of the device scale.
    ///
    /// The scene and surface are left untouched; no selection outline is drawn.
    pub fn render_isolated(
        &mut self,
        size: PixelSize,
        transparent_background: bool,
    ) -> CanvasResult<Raster> {
        let mut target = Raster::new(size.width, size.height)?;
        let logical = self.surface.logical_size();
        let opts = PassOpts {
            transform: Affine::scale_non_uniform(
                f64::from(size.width) / logical.width,
                f64::from(size.height) / logical.height,
            ),
            background: !transparent_background,
            outline: false,
            keep_previous: false,
        };
        let mut frame = FrameRefs {
            scene: &self.scene,
            cache: &mut self.cache,
            stars: &self.stars,
            snow: &self.snow,
            motes: &self.motes,
            ball: &self.ball,
            mode: self.mode,
            render_mode: self.render_mode,
            tile_count: self.tile_count,
            tile_seed: self.tile_seed,
            time_ms: self.time_ms,
            sprite_scale: self.surface.scale(),
            logical,
        };
        let mut renderer = CpuRenderer::new();
        compose(&mut frame, &mut renderer, &mut target, &opts)?;
        Ok(target)
    }

    /// Export as PNG; the outcome is also reported through [`CompositorSession::message`].
    pub fn export(&mut self, opts: &ExportOpts) -> CanvasResult<Vec<u8>> {
        match export_png(self, opts) {
            Ok(bytes) => {
                self.message = Some("PNG exported".to_string());
                Ok(bytes)
            }
            Err(err) => {
                self.message = Some(format!("Export failed: {err}"));
                Err(err)
            }
        }
    }
}

impl FrameHandler for CompositorSession {
    fn on_frame(&mut self, tick: &FrameTick) -> CanvasResult<TickControl> {
        self.advance(tick.delta_ms);
        self.render_frame()?;
        self.fps.tick(tick.timestamp_ms);
        Ok(TickControl::Continue)
    }
}

struct PassOpts {
    /// Logical-to-target transform.
    transform: Affine,
    background: bool,
    outline: bool,
    /// Draw the accumulating scenes over the previous frame instead of a cleared target.
    keep_previous: bool,
}

struct FrameRefs<'a> {
    scene: &'a Scene,
    cache: &'a mut OffscreenCache,
    stars: &'a StarField,
    snow: &'a SnowField,
    motes: &'a MoteField,
    ball: &'a Ball,
    mode: SceneMode,
    render_mode: RenderMode,
    tile_count: u32,
    tile_seed: u64,
    time_ms: f64,
    sprite_scale: f64,
    logical: Size,
}

fn compose(
    frame: &mut FrameRefs<'_>,
    renderer: &mut CpuRenderer,
    target: &mut Raster,
    opts: &PassOpts,
) -> CanvasResult<()> {
    let accumulates = matches!(frame.mode, SceneMode::Stars | SceneMode::Snow);
    if !(accumulates && opts.keep_previous) {
        target.clear();
    }
    match frame.mode {
        SceneMode::Stickers => draw_stickers(frame, renderer, target, opts),
        SceneMode::Stars => {
            draw_backdrop(frame, renderer, target, opts, STAR_VEIL)?;
            draw_stars(frame, renderer, target, opts.transform)?;
            draw_photo(frame, renderer, target, opts.transform)
        }
        SceneMode::Snow => {
            draw_backdrop(frame, renderer, target, opts, SNOW_VEIL)?;
            let snow: &SnowField = frame.snow;
            let split = snow.back_split();
            let flakes = snow.flakes();
            draw_flakes(frame, &flakes[..split], false, renderer, target, opts.transform)?;
            draw_photo(frame, renderer, target, opts.transform)?;
            draw_flakes(frame, &flakes[split..], true, renderer, target, opts.transform)
        }
        SceneMode::Particles => draw_motes(frame.motes, renderer, target, opts.transform),
        SceneMode::Tiles => {
            if opts.background {
                draw_tiles(frame, renderer, target, opts.transform)?;
            }
            let ball = Circle::new(frame.ball.position, frame.ball.radius).to_path(PATH_TOLERANCE);
            renderer.draw_layer(target, BlendMode::SourceOver, 1.0, |p| {
                p.fill_path(&ball, opts.transform, BALL_FILL);
                Ok(())
            })
        }
    }
}

fn full_rect(logical: Size) -> Rect {
    Rect::from_origin_size(Point::ZERO, logical)
}

fn draw_stickers(
    frame: &mut FrameRefs<'_>,
    renderer: &mut CpuRenderer,
    target: &mut Raster,
    opts: &PassOpts,
) -> CanvasResult<()> {
    let t = opts.transform;
    if opts.background
        && let Some(bg) = frame.cache.background()
    {
        renderer.blit_raster(target, bg.key(), bg.raster(), full_rect(frame.logical), t, 1.0)?;
    }

    let selected = frame.scene.selected_id();
    for e in frame.scene.entities() {
        let local = t * e.local_to_world();
        let path = shape_path(e.kind, e.size);
        renderer.draw_layer(target, e.blend, e.opacity, |p| {
            p.fill_path(&path, local, e.fill);
            Ok(())
        })?;
        // The outline shares the sticker's operator and alpha.
        if opts.outline && selected == Some(&e.id) {
            let outline = selection_outline(e.size);
            renderer.draw_layer(target, e.blend, e.opacity, |p| {
                p.fill_path(&outline, local, OUTLINE_COLOR);
                Ok(())
            })?;
        }
    }
    Ok(())
}

fn draw_backdrop(
    frame: &mut FrameRefs<'_>,
    renderer: &mut CpuRenderer,
    target: &mut Raster,
    opts: &PassOpts,
    veil: Rgba8,
) -> CanvasResult<()> {
    let full = full_rect(frame.logical);
    if opts.background {
        let backdrop = frame.cache.backdrop_or_build()?;
        renderer.blit_raster(target, backdrop.key(), backdrop.raster(), full, opts.transform, 1.0)?;
    }
    renderer.draw_layer(target, BlendMode::SourceOver, 1.0, |p| {
        p.fill_rect(full, opts.transform, veil);
        Ok(())
    })
}

fn draw_stars(
    frame: &mut FrameRefs<'_>,
    renderer: &mut CpuRenderer,
    target: &mut Raster,
    t: Affine,
) -> CanvasResult<()> {
    let sprite = frame.cache.star_sprite(frame.sprite_scale)?;
    let t_s = frame.time_ms / 1000.0;
    let stars = frame.stars.stars();
    renderer.draw_layer(target, BlendMode::SourceOver, 1.0, |p| {
        for s in stars {
            let d = s.sprite_edge();
            let dest = Rect::from_center_size(s.position, Size::new(d, d));
            p.draw_raster(sprite.key(), sprite.raster(), dest, t, s.alpha_at(t_s))?;
        }
        Ok(())
    })
}

fn draw_flakes(
    frame: &mut FrameRefs<'_>,
    flakes: &[Flake],
    front: bool,
    renderer: &mut CpuRenderer,
    target: &mut Raster,
    t: Affine,
) -> CanvasResult<()> {
    if flakes.is_empty() {
        return Ok(());
    }
    let sprite = frame.cache.snow_sprite(frame.sprite_scale)?;
    let (size_boost, alpha_boost) = if front {
        (SNOW_FRONT_SIZE_BOOST, SNOW_FRONT_ALPHA_BOOST)
    } else {
        (1.0, 1.0)
    };
    renderer.draw_layer(target, BlendMode::SourceOver, 1.0, |p| {
        for f in flakes {
            let d = f.size * SNOW_SPRITE_SCALE * size_boost;
            let dest = Rect::from_center_size(f.position, Size::new(d, d));
            let alpha = (f.alpha * alpha_boost).min(1.0);
            p.draw_raster(sprite.key(), sprite.raster(), dest, t, alpha)?;
        }
        Ok(())
    })
}

fn draw_photo(
    frame: &mut FrameRefs<'_>,
    renderer: &mut CpuRenderer,
    target: &mut Raster,
    t: Affine,
) -> CanvasResult<()> {
    if let Some(photo) = frame.cache.photo() {
        let src = photo.raster();
        let natural = Size::new(f64::from(src.width()), f64::from(src.height()));
        return match fit_contain(natural, frame.logical, PHOTO_PADDING) {
            Some(dest) => renderer.blit_raster(target, photo.key(), src, dest, t, 1.0),
            None => Ok(()),
        };
    }

    let center = t * Affine::translate(frame.logical.to_vec2() / 2.0);
    let panel = rounded_rect_path(PLACEHOLDER_PANEL, CORNER_RADIUS);
    renderer.draw_layer(target, BlendMode::SourceOver, 1.0, |p| {
        p.fill_path(&panel, center, PLACEHOLDER_FILL);
        p.fill_rect(
            Rect::from_center_size(Point::ZERO, PLACEHOLDER_BAR),
            center,
            PLACEHOLDER_INK,
        );
        Ok(())
    })
}

fn draw_motes(
    motes: &MoteField,
    renderer: &mut CpuRenderer,
    target: &mut Raster,
    t: Affine,
) -> CanvasResult<()> {
    // Every mote goes into one path and one fill.
    let mut path = BezPath::new();
    for m in motes.motes() {
        path.extend(Circle::new(m.position, m.radius).path_elements(PATH_TOLERANCE));
    }
    renderer.draw_layer(target, BlendMode::SourceOver, MOTE_ALPHA, |p| {
        p.fill_path(&path, t, MOTE_FILL);
        Ok(())
    })
}

fn draw_tiles(
    frame: &mut FrameRefs<'_>,
    renderer: &mut CpuRenderer,
    target: &mut Raster,
    t: Affine,
) -> CanvasResult<()> {
    match frame.render_mode {
        RenderMode::Cached => {
            let tiles = frame
                .cache
                .tiles(frame.tile_count, frame.tile_seed, frame.sprite_scale)?;
            renderer.blit_raster(
                target,
                tiles.key(),
                tiles.raster(),
                full_rect(frame.logical),
                t,
                1.0,
            )
        }
        RenderMode::Full => {
            // Uniform scale: the x coefficient stands for both axes.
            paint_tiles(target, t.as_coeffs()[0], frame.tile_count, frame.tile_seed);
            Ok(())
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/compositor.rs"]
mod tests;

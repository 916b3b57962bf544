use std::sync::Arc;

use crate::filter::engine::{FilterKind, FilterParams, apply_filter};
use crate::foundation::core::{PixelSize, Point, Rgba8};
use crate::foundation::error::{CanvasError, CanvasResult};
use crate::raster::buffer::Raster;
use crate::raster::paint::{ColorStop, linear_gradient, paint_tiles, radial_sprite};
use crate::render::cpu::ImageKey;

pub const STAR_SPRITE_EDGE: f64 = 64.0;
pub const SNOW_SPRITE_EDGE: f64 = 48.0;

/// Stops of the default sticker-playground background.
pub fn default_background_stops() -> Vec<ColorStop> {
    vec![
        ColorStop::new(0.0, Rgba8::opaque(0x4a, 0x90, 0xe2)),
        ColorStop::new(0.5, Rgba8::opaque(0xf3, 0x9c, 0x12)),
        ColorStop::new(1.0, Rgba8::opaque(0xe7, 0x4c, 0x3c)),
    ]
}

/// Translucent backdrop behind the star and snow fields.
pub fn backdrop_stops() -> Vec<ColorStop> {
    vec![
        ColorStop::new(0.0, Rgba8::with_alpha(110, 168, 255, 0.16)),
        ColorStop::new(1.0, Rgba8::with_alpha(159, 122, 234, 0.16)),
    ]
}

fn star_sprite_stops() -> [ColorStop; 3] {
    [
        ColorStop::new(0.0, Rgba8::with_alpha(255, 255, 255, 1.0)),
        ColorStop::new(0.35, Rgba8::with_alpha(255, 255, 255, 0.7)),
        ColorStop::new(1.0, Rgba8::with_alpha(255, 255, 255, 0.0)),
    ]
}

fn snow_sprite_stops() -> [ColorStop; 3] {
    [
        ColorStop::new(0.0, Rgba8::with_alpha(255, 255, 255, 0.95)),
        ColorStop::new(0.5, Rgba8::with_alpha(255, 255, 255, 0.7)),
        ColorStop::new(1.0, Rgba8::with_alpha(255, 255, 255, 0.0)),
    ]
}

/// A raster plus the image key the renderer uploads it under.
///
/// The raster is shared; a rebuild produces a new `CachedRaster` rather than touching pixels in place.
#[derive(Clone, Debug)]
pub struct CachedRaster {
    key: ImageKey,
    raster: Arc<Raster>,
}

impl CachedRaster {
    pub fn key(&self) -> ImageKey {
        self.key
    }

    pub fn raster(&self) -> &Raster {
        &self.raster
    }

    pub fn shared(&self) -> Arc<Raster> {
        Arc::clone(&self.raster)
    }
}

/// Where the pristine background comes from.
#[derive(Clone, Debug)]
pub enum BackgroundSource {
    /// Diagonal gradient regenerated at backing resolution.
    Gradient(Vec<ColorStop>),
    /// Fixed raster, stretched over the surface when blitted.
    Raster(Arc<Raster>),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct CacheStats {
    pub background_rebuilds: u64,
    pub filter_rebuilds: u64,
    pub failed_rebuilds: u64,
    pub tile_rebuilds: u64,
    pub sprite_rebuilds: u64,
    pub backdrop_rebuilds: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct TileKey {
    size: PixelSize,
    count: u32,
    seed: u64,
    scale_bits: u64,
}

/// Precomputed rasters the per-frame renderer blits instead of recomputing.
#[derive(Debug)]
pub struct OffscreenCache {
    next_key: u64,
    backing: PixelSize,
    source: BackgroundSource,
    params: FilterParams,
    filter: FilterKind,
    pristine: Option<CachedRaster>,
    filtered: Option<CachedRaster>,
    backdrop: Option<CachedRaster>,
    tiles: Option<(TileKey, CachedRaster)>,
    star_sprite: Option<CachedRaster>,
    snow_sprite: Option<CachedRaster>,
    photo: Option<CachedRaster>,
    stats: CacheStats,
}

impl OffscreenCache {
    pub fn new(source: BackgroundSource, params: FilterParams) -> Self {
        Self {
            next_key: 0,
            backing: PixelSize::new(0, 0),
            source,
            params,
            filter: FilterKind::None,
            pristine: None,
            filtered: None,
            backdrop: None,
            tiles: None,
            star_sprite: None,
            snow_sprite: None,
            photo: None,
            stats: CacheStats::default(),
        }
    }

    fn wrap(&mut self, raster: Raster) -> CachedRaster {
        self.next_key += 1;
        CachedRaster {
            key: ImageKey(self.next_key),
            raster: Arc::new(raster),
        }
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    pub fn filter(&self) -> FilterKind {
        self.filter
    }

    pub fn params(&self) -> &FilterParams {
        &self.params
    }

    pub fn backing(&self) -> PixelSize {
        self.backing
    }

    /// Pristine background, unfiltered.
    pub fn pristine(&self) -> Option<&CachedRaster> {
        self.pristine.as_ref()
    }

    /// Latest completed filtered background.
    pub fn background(&self) -> Option<&CachedRaster> {
        self.filtered.as_ref()
    }

    pub fn backdrop(&self) -> Option<&CachedRaster> {
        self.backdrop.as_ref()
    }

    pub fn photo(&self) -> Option<&CachedRaster> {
        self.photo.as_ref()
    }

    /// Rebuild everything tied to the surface dimensions. Returns `true` if anything was rebuilt.
    #[tracing::instrument(skip(self))]
    pub fn prepare_for_surface(&mut self, backing: PixelSize) -> CanvasResult<bool> {
        if backing == self.backing && self.pristine.is_some() {
            return Ok(false);
        }
        self.backing = backing;
        self.star_sprite = None;
        self.snow_sprite = None;
        self.tiles = None;
        self.backdrop = None;
        self.rebuild_pristine()?;
        Ok(true)
    }

    /// Swap the pristine source and re-run the current filter over it.
    pub fn set_source(&mut self, source: BackgroundSource) -> CanvasResult<()> {
        self.source = source;
        self.rebuild_pristine()
    }

    fn rebuild_pristine(&mut self) -> CanvasResult<()> {
        let raster = match &self.source {
            BackgroundSource::Gradient(stops) => {
                let size = self.backing;
                if size.is_empty() {
                    return Err(CanvasError::render(
                        "cannot build a background for an empty surface",
                    ));
                }
                linear_gradient(
                    size,
                    Point::ZERO,
                    Point::new(f64::from(size.width), f64::from(size.height)),
                    stops,
                )?
            }
            BackgroundSource::Raster(r) => Raster::clone(r),
        };
        let pristine = self.wrap(raster);
        self.pristine = Some(pristine);
        self.stats.background_rebuilds += 1;
        tracing::debug!(
            width = self.backing.width,
            height = self.backing.height,
            "pristine background rebuilt"
        );
        let kind = self.filter;
        self.rebuild(kind).map(|_| ())
    }

    /// Re-run `kind` over the pristine raster and atomically replace the filtered raster.
    ///
    /// On failure the previously completed raster stays in place.
    #[tracing::instrument(skip(self))]
    pub fn rebuild(&mut self, kind: FilterKind) -> CanvasResult<CachedRaster> {
        let Some(pristine) = self.pristine.as_ref().map(CachedRaster::shared) else {
            self.stats.failed_rebuilds += 1;
            return Err(CanvasError::filter("no pristine background to filter"));
        };
        if pristine.is_empty() {
            self.stats.failed_rebuilds += 1;
            tracing::warn!(filter = %kind, "rebuild skipped: empty source, keeping previous cache");
            return Err(CanvasError::filter("pristine background is empty"));
        }

        let next = match kind {
            // Share the pristine pixels; nothing to compute.
            FilterKind::None => self.pristine.clone(),
            _ => match apply_filter(&pristine, kind, &self.params) {
                Ok(raster) => Some(self.wrap(raster)),
                Err(err) => {
                    self.stats.failed_rebuilds += 1;
                    tracing::warn!(filter = %kind, error = %err, "filter rebuild failed, keeping previous cache");
                    return Err(err);
                }
            },
        };
        let Some(next) = next else {
            return Err(CanvasError::filter("no pristine background to filter"));
        };
        self.filtered = Some(next.clone());
        self.filter = kind;
        self.stats.filter_rebuilds += 1;
        Ok(next)
    }

    /// Restore the pristine background.
    pub fn reset(&mut self) -> CanvasResult<CachedRaster> {
        self.rebuild(FilterKind::None)
    }

    /// Replace the filter tunables and re-apply the current filter.
    pub fn set_params(&mut self, params: FilterParams) -> CanvasResult<()> {
        params.validate()?;
        self.params = params;
        let kind = self.filter;
        self.rebuild(kind).map(|_| ())
    }

    /// Backdrop gradient at backing resolution, built on first use.
    pub fn backdrop_or_build(&mut self) -> CanvasResult<CachedRaster> {
        if let Some(b) = &self.backdrop {
            return Ok(b.clone());
        }
        let size = self.backing;
        let raster = linear_gradient(
            size,
            Point::ZERO,
            Point::new(f64::from(size.width), f64::from(size.height)),
            &backdrop_stops(),
        )?;
        let cached = self.wrap(raster);
        self.backdrop = Some(cached.clone());
        self.stats.backdrop_rebuilds += 1;
        Ok(cached)
    }

    /// Tile background for the given parameters; rebuilt only when one of them changes.
    pub fn tiles(&mut self, count: u32, seed: u64, scale: f64) -> CanvasResult<CachedRaster> {
        let key = TileKey {
            size: self.backing,
            count,
            seed,
            scale_bits: scale.to_bits(),
        };
        if let Some((k, t)) = &self.tiles
            && *k == key
        {
            return Ok(t.clone());
        }
        let mut raster = Raster::new(self.backing.width, self.backing.height)?;
        paint_tiles(&mut raster, scale, count, seed);
        let cached = self.wrap(raster);
        self.tiles = Some((key, cached.clone()));
        self.stats.tile_rebuilds += 1;
        tracing::debug!(count, seed, "tile background rebuilt");
        Ok(cached)
    }

    pub fn invalidate_tiles(&mut self) {
        self.tiles = None;
    }

    pub fn star_sprite(&mut self, scale: f64) -> CanvasResult<CachedRaster> {
        let edge = sprite_edge(STAR_SPRITE_EDGE, scale);
        if let Some(s) = &self.star_sprite
            && s.raster().width() == edge
        {
            return Ok(s.clone());
        }
        let cached = self.wrap(radial_sprite(edge, &star_sprite_stops())?);
        self.star_sprite = Some(cached.clone());
        self.stats.sprite_rebuilds += 1;
        Ok(cached)
    }

    pub fn snow_sprite(&mut self, scale: f64) -> CanvasResult<CachedRaster> {
        let edge = sprite_edge(SNOW_SPRITE_EDGE, scale);
        if let Some(s) = &self.snow_sprite
            && s.raster().width() == edge
        {
            return Ok(s.clone());
        }
        let cached = self.wrap(radial_sprite(edge, &snow_sprite_stops())?);
        self.snow_sprite = Some(cached.clone());
        self.stats.sprite_rebuilds += 1;
        Ok(cached)
    }

    pub fn set_photo(&mut self, raster: Raster) -> CanvasResult<()> {
        if raster.is_empty() {
            return Err(CanvasError::validation("photo has no pixels"));
        }
        let cached = self.wrap(raster);
        self.photo = Some(cached);
        Ok(())
    }

    pub fn clear_photo(&mut self) -> bool {
        self.photo.take().is_some()
    }
}

fn sprite_edge(base: f64, scale: f64) -> u32 {
    let scale = if scale.is_finite() && scale > 0.0 {
        scale
    } else {
        1.0
    };
    (base * scale).round().clamp(1.0, 4096.0) as u32
}

#[cfg(test)]
#[path = "../../tests/unit/cache/layer.rs"]
mod tests;

use std::fmt;
use std::str::FromStr;

use crate::foundation::error::{CanvasError, CanvasResult};
use crate::foundation::math::{to_u8_round, unpremul_u8};
use crate::raster::buffer::{Raster, premultiply_rgba8_in_place};
use crate::render::blend::BlendMode;
use crate::render::composite::composite_rgba8_premul;

/// Per-pixel filters the background cache can apply.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum FilterKind {
    #[default]
    None,
    Grayscale,
    Pixelate,
    Edge,
}

impl FilterKind {
    pub const ALL: [FilterKind; 4] = [Self::None, Self::Grayscale, Self::Pixelate, Self::Edge];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Grayscale => "grayscale",
            Self::Pixelate => "pixelate",
            Self::Edge => "edge",
        }
    }
}

impl fmt::Display for FilterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterKind {
    type Err = CanvasError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == name)
            .ok_or_else(|| CanvasError::validation(format!("unknown filter kind '{s}'")))
    }
}

/// 3x3 edge kernel: strong center, suppressed neighbors.
pub const EDGE_KERNEL: [i32; 9] = [-2, -2, -2, -2, 16, -2, -2, -2, -2];

/// Tunables for the filters. Defaults reproduce the sticker playground look.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct FilterParams {
    /// Grayscale contrast factor around 128.
    pub contrast: f64,
    /// Pixelate block edge in pixels.
    pub pixelate_block: u32,
    /// Multiplier on the absolute edge response.
    pub edge_boost: f64,
    /// Finish the edge filter with a difference composite against white.
    pub edge_invert: bool,
}

impl Default for FilterParams {
    fn default() -> Self {
        Self {
            contrast: 1.5,
            pixelate_block: 30,
            edge_boost: 1.5,
            edge_invert: true,
        }
    }
}

impl FilterParams {
    pub fn validate(&self) -> CanvasResult<()> {
        if !self.contrast.is_finite() || self.contrast < 0.0 {
            return Err(CanvasError::validation(
                "filter contrast must be finite and >= 0",
            ));
        }
        if self.pixelate_block == 0 {
            return Err(CanvasError::validation("pixelate block must be >= 1"));
        }
        if !self.edge_boost.is_finite() || self.edge_boost < 0.0 {
            return Err(CanvasError::validation(
                "edge boost must be finite and >= 0",
            ));
        }
        Ok(())
    }
}

/// Apply `kind` to `src`, returning a new raster of the same size. `src` is never modified.
#[tracing::instrument(skip(src), fields(width = src.width(), height = src.height()))]
pub fn apply_filter(src: &Raster, kind: FilterKind, params: &FilterParams) -> CanvasResult<Raster> {
    params.validate()?;
    let out = match kind {
        FilterKind::None => src.clone(),
        FilterKind::Grayscale => grayscale(src, params.contrast)?,
        FilterKind::Pixelate => pixelate(src, params.pixelate_block)?,
        FilterKind::Edge => edge(src, params.edge_boost, params.edge_invert)?,
    };
    tracing::debug!(filter = %kind, "filter applied");
    Ok(out)
}

fn grayscale(src: &Raster, contrast: f64) -> CanvasResult<Raster> {
    let mut data = src.data().to_vec();
    for px in data.chunks_exact_mut(4) {
        let a = px[3];
        let r = f64::from(unpremul_u8(px[0], a));
        let g = f64::from(unpremul_u8(px[1], a));
        let b = f64::from(unpremul_u8(px[2], a));
        let luma = 0.2126 * r + 0.7152 * g + 0.0722 * b;
        let y = to_u8_round((luma - 128.0) * contrast + 128.0);
        px[0] = y;
        px[1] = y;
        px[2] = y;
    }
    premultiply_rgba8_in_place(&mut data);
    Raster::from_rgba8_premul(src.width(), src.height(), data)
}

fn pixelate(src: &Raster, block: u32) -> CanvasResult<Raster> {
    let block = block.max(1);
    let (w, h) = (src.width(), src.height());
    let mut out = src.clone();
    let mut by = 0u32;
    while by < h {
        let mut bx = 0u32;
        while bx < w {
            let Some(color) = src.pixel(bx, by) else {
                return Err(CanvasError::filter("pixelate sample out of bounds"));
            };
            let y_end = by.saturating_add(block).min(h);
            let x_end = bx.saturating_add(block).min(w);
            for y in by..y_end {
                for x in bx..x_end {
                    out.set_pixel(x, y, color);
                }
            }
            bx = x_end;
        }
        by = by.saturating_add(block).min(h);
    }
    Ok(out)
}

// Border pixels are left zeroed; only pixels with a full 3x3 neighborhood are convolved.
fn edge(src: &Raster, boost: f64, invert: bool) -> CanvasResult<Raster> {
    let (w, h) = (src.width() as usize, src.height() as usize);
    let straight = src.to_straight_rgba8();
    if straight.len() != w * h * 4 {
        return Err(CanvasError::filter("edge source length mismatch"));
    }
    let mut out = vec![0u8; straight.len()];

    if w >= 3 && h >= 3 {
        for y in 1..h - 1 {
            for x in 1..w - 1 {
                let mut acc = [0i32; 3];
                let mut k = 0;
                for ky in 0..3 {
                    let row = (y + ky - 1) * w;
                    for kx in 0..3 {
                        let p = (row + x + kx - 1) * 4;
                        let weight = EDGE_KERNEL[k];
                        k += 1;
                        for (c, sum) in acc.iter_mut().enumerate() {
                            *sum += i32::from(straight[p + c]) * weight;
                        }
                    }
                }
                let q = (y * w + x) * 4;
                for (c, sum) in acc.iter().enumerate() {
                    out[q + c] = to_u8_round(f64::from(sum.abs()) * boost);
                }
                out[q + 3] = 255;
            }
        }
    }

    if invert {
        let white = vec![255u8; out.len()];
        composite_rgba8_premul(&mut out, &white, 1.0, BlendMode::Difference)?;
    }
    Raster::from_rgba8_premul(src.width(), src.height(), out)
}

#[cfg(test)]
#[path = "../../tests/unit/filter/engine.rs"]
mod tests;

//! CPU painters for the procedural rasters the offscreen cache holds: gradients, soft sprites and
//! the tile backdrop used by the redraw-vs-cache comparison.

use crate::foundation::core::{PixelSize, Point, Rect, Rgba8, Rgba8Premul};
use crate::foundation::error::CanvasResult;
use crate::foundation::math::{Rng64, mul_div255_u8, to_u8_round};
use crate::raster::buffer::Raster;

/// One gradient stop, offset in `[0, 1]`.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ColorStop {
    pub offset: f64,
    pub color: Rgba8,
}

impl ColorStop {
    pub const fn new(offset: f64, color: Rgba8) -> Self {
        Self { offset, color }
    }
}

/// Sample a stop list at `t`, interpolating premultiplied channels.
pub(crate) fn sample_stops(stops: &[ColorStop], t: f64) -> [u8; 4] {
    let Some(first) = stops.first() else {
        return [0; 4];
    };
    let t = t.clamp(0.0, 1.0);
    if t <= first.offset {
        return first.color.premul().to_array();
    }
    for pair in stops.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        if t <= b.offset {
            let span = b.offset - a.offset;
            let k = if span <= 0.0 {
                1.0
            } else {
                (t - a.offset) / span
            };
            let pa = a.color.premul().to_array();
            let pb = b.color.premul().to_array();
            let mut out = [0u8; 4];
            for c in 0..4 {
                let av = f64::from(pa[c]);
                let bv = f64::from(pb[c]);
                out[c] = to_u8_round(av + (bv - av) * k);
            }
            return out;
        }
    }
    stops[stops.len() - 1].color.premul().to_array()
}

/// Linear gradient along `from -> to` (pixel coordinates), sampled at pixel centers.
pub fn linear_gradient(
    size: PixelSize,
    from: Point,
    to: Point,
    stops: &[ColorStop],
) -> CanvasResult<Raster> {
    let mut out = Raster::new(size.width, size.height)?;
    let axis = to - from;
    let len2 = axis.hypot2();
    let w = size.width as usize;
    for y in 0..size.height {
        for x in 0..size.width {
            let p = Point::new(f64::from(x) + 0.5, f64::from(y) + 0.5);
            let t = if len2 <= 0.0 {
                0.0
            } else {
                (p - from).dot(axis) / len2
            };
            let idx = ((y as usize) * w + (x as usize)) * 4;
            out.data_mut()[idx..idx + 4].copy_from_slice(&sample_stops(stops, t));
        }
    }
    Ok(out)
}

/// Square radial sprite: stops run from the center (0) to the inscribed circle (1).
pub fn radial_sprite(edge: u32, stops: &[ColorStop]) -> CanvasResult<Raster> {
    let edge = edge.max(1);
    let mut out = Raster::new(edge, edge)?;
    let r = f64::from(edge) / 2.0;
    let c = Point::new(r, r);
    for y in 0..edge {
        for x in 0..edge {
            let p = Point::new(f64::from(x) + 0.5, f64::from(y) + 0.5);
            let t = (p - c).hypot() / r;
            out.set_pixel(x, y, sample_stops(stops, t));
        }
    }
    Ok(out)
}

/// Source-over fill of a device-pixel rectangle; pixels whose centers fall inside are covered.
pub fn fill_rect_over(target: &mut Raster, rect: Rect, color: Rgba8Premul) {
    if color.a == 0 {
        return;
    }
    let x0 = (rect.x0 - 0.5).ceil().max(0.0) as u32;
    let y0 = (rect.y0 - 0.5).ceil().max(0.0) as u32;
    let x1 = ((rect.x1 - 0.5).ceil().max(0.0) as u32).min(target.width());
    let y1 = ((rect.y1 - 0.5).ceil().max(0.0) as u32).min(target.height());
    let src = color.to_array();
    let inv = 255u16 - u16::from(color.a);
    let w = target.width() as usize;
    let data = target.data_mut();
    for y in y0..y1 {
        for x in x0..x1 {
            let i = ((y as usize) * w + (x as usize)) * 4;
            for c in 0..4 {
                let d = mul_div255_u8(u16::from(data[i + c]), inv);
                data[i + c] = src[c].saturating_add(d);
            }
        }
    }
}

/// CSS `hsla()` to straight RGBA8. Hue in degrees, saturation/lightness/alpha in `[0, 1]`.
pub fn hsla(hue_deg: f64, sat: f64, light: f64, alpha: f64) -> Rgba8 {
    let h = hue_deg.rem_euclid(360.0) / 360.0;
    let s = sat.clamp(0.0, 1.0);
    let l = light.clamp(0.0, 1.0);
    let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let p = 2.0 * l - q;
    let hue_to_rgb = |mut t: f64| -> f64 {
        if t < 0.0 {
            t += 1.0;
        }
        if t > 1.0 {
            t -= 1.0;
        }
        if t < 1.0 / 6.0 {
            p + (q - p) * 6.0 * t
        } else if t < 0.5 {
            q
        } else if t < 2.0 / 3.0 {
            p + (q - p) * (2.0 / 3.0 - t) * 6.0
        } else {
            p
        }
    };
    Rgba8::with_alpha(
        to_u8_round(hue_to_rgb(h + 1.0 / 3.0) * 255.0),
        to_u8_round(hue_to_rgb(h) * 255.0),
        to_u8_round(hue_to_rgb(h - 1.0 / 3.0) * 255.0),
        alpha,
    )
}

pub(crate) const TILE_BASE: Rgba8 = Rgba8::opaque(0x0f, 0x13, 0x1b);
pub(crate) const TILE_GRID: Rgba8 = Rgba8::opaque(0x1e, 0x24, 0x30);
pub(crate) const TILE_GRID_ALPHA: f64 = 0.35;
pub(crate) const TILE_GRID_STEP: f64 = 24.0;

/// Paint the tile backdrop into `target`: base color, a fine grid, then `tile_count` small
/// translucent squares. `scale` maps logical units to device pixels.
///
/// The same `seed` always reproduces the same picture, whether painted per frame or once into
/// the cache.
pub fn paint_tiles(target: &mut Raster, scale: f64, tile_count: u32, seed: u64) {
    let scale = if scale.is_finite() && scale > 0.0 {
        scale
    } else {
        1.0
    };
    target.fill(TILE_BASE.premul());

    let w = f64::from(target.width()) / scale;
    let h = f64::from(target.height()) / scale;
    let grid = Rgba8::with_alpha(TILE_GRID.r, TILE_GRID.g, TILE_GRID.b, TILE_GRID_ALPHA).premul();
    let line = scale.max(1.0);
    let mut x = 0.0;
    while x <= w {
        let px = x * scale;
        fill_rect_over(
            target,
            Rect::new(px - line / 2.0, 0.0, px + line / 2.0, h * scale),
            grid,
        );
        x += TILE_GRID_STEP;
    }
    let mut y = 0.0;
    while y <= h {
        let py = y * scale;
        fill_rect_over(
            target,
            Rect::new(0.0, py - line / 2.0, w * scale, py + line / 2.0),
            grid,
        );
        y += TILE_GRID_STEP;
    }

    let mut rng = Rng64::new(seed);
    for _ in 0..tile_count {
        let x = rng.range(0.0, w);
        let y = rng.range(0.0, h);
        let s = rng.range(2.0, 4.0);
        let hue = 210.0 + (rng.next_f64_01() * 40.0).floor();
        let color = hsla(hue, 0.45, 0.60, 0.15).premul();
        fill_rect_over(
            target,
            Rect::new(x * scale, y * scale, (x + s) * scale, (y + s) * scale),
            color,
        );
    }
}

#[cfg(test)]
#[path = "../../tests/unit/raster/paint.rs"]
mod tests;

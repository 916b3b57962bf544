use crate::foundation::core::{Affine, PixelSize, Point, Rect, Size};
use crate::foundation::error::{CanvasError, CanvasResult};
use crate::raster::buffer::Raster;

/// Largest backing-store edge the CPU backend will allocate.
pub const MAX_BACKING_EDGE: u32 = 16_384;

/// Visible drawing surface: a logical (CSS-pixel) size plus the device-resolution backing store.
///
/// All drawing happens in logical units through [`Surface::logical_transform`].
#[derive(Debug)]
pub struct Surface {
    logical: Size,
    device_scale: f64,
    resolution_scale: f64,
    backing: PixelSize,
    store: Raster,
    generation: u64,
}

impl Surface {
    pub fn new(logical: Size, device_scale: f64, resolution_scale: f64) -> CanvasResult<Self> {
        validate_logical(logical)?;
        let device_scale = sanitize_device_scale(device_scale);
        let resolution_scale = sanitize_resolution_scale(resolution_scale)?;
        let backing = backing_size(logical, device_scale * resolution_scale);
        Ok(Self {
            logical,
            device_scale,
            resolution_scale,
            backing,
            store: Raster::new(backing.width, backing.height)?,
            generation: 0,
        })
    }

    pub fn logical_size(&self) -> Size {
        self.logical
    }

    pub fn device_scale(&self) -> f64 {
        self.device_scale
    }

    pub fn resolution_scale(&self) -> f64 {
        self.resolution_scale
    }

    /// Effective logical-to-device scale.
    pub fn scale(&self) -> f64 {
        self.device_scale * self.resolution_scale
    }

    pub fn backing_size(&self) -> PixelSize {
        self.backing
    }

    /// Bumped each time the backing store is reallocated.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn store(&self) -> &Raster {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut Raster {
        &mut self.store
    }

    /// Resize to `logical`, reallocating only when the backing size actually changes.
    pub fn configure(&mut self, logical: Size) -> CanvasResult<PixelSize> {
        validate_logical(logical)?;
        self.logical = logical;
        self.reallocate_if_needed()
    }

    pub fn set_device_scale(&mut self, device_scale: f64) -> CanvasResult<PixelSize> {
        self.device_scale = sanitize_device_scale(device_scale);
        self.reallocate_if_needed()
    }

    pub fn set_resolution_scale(&mut self, resolution_scale: f64) -> CanvasResult<PixelSize> {
        self.resolution_scale = sanitize_resolution_scale(resolution_scale)?;
        self.reallocate_if_needed()
    }

    fn reallocate_if_needed(&mut self) -> CanvasResult<PixelSize> {
        let next = backing_size(self.logical, self.scale());
        if next != self.backing {
            self.store = Raster::new(next.width, next.height)?;
            tracing::debug!(
                from_w = self.backing.width,
                from_h = self.backing.height,
                to_w = next.width,
                to_h = next.height,
                "surface backing store reallocated"
            );
            self.backing = next;
            self.generation += 1;
        }
        Ok(self.backing)
    }

    /// Logical-to-device transform every render pass starts from.
    pub fn logical_transform(&self) -> Affine {
        Affine::scale(self.scale())
    }

    /// Map a viewport point into logical units, given where the surface element sits in the viewport.
    pub fn viewport_to_logical(&self, p: Point, element: Rect) -> Point {
        let local = p - element.origin();
        let sx = if element.width() > 0.0 {
            self.logical.width / element.width()
        } else {
            1.0
        };
        let sy = if element.height() > 0.0 {
            self.logical.height / element.height()
        } else {
            1.0
        };
        Point::new(local.x * sx, local.y * sy)
    }
}

/// `floor(logical * scale)` per axis, at least one pixel, capped at [`MAX_BACKING_EDGE`].
pub fn backing_size(logical: Size, scale: f64) -> PixelSize {
    let edge = |v: f64| -> u32 {
        let px = (v * scale).floor();
        if !px.is_finite() || px < 1.0 {
            return 1;
        }
        if px > f64::from(MAX_BACKING_EDGE) {
            tracing::warn!(
                requested = px,
                max = MAX_BACKING_EDGE,
                "backing store edge clamped"
            );
            return MAX_BACKING_EDGE;
        }
        px as u32
    };
    PixelSize::new(edge(logical.width), edge(logical.height))
}

fn validate_logical(logical: Size) -> CanvasResult<()> {
    if !logical.width.is_finite()
        || !logical.height.is_finite()
        || logical.width < 0.0
        || logical.height < 0.0
    {
        return Err(CanvasError::validation(format!(
            "logical surface size must be finite and >= 0, got {}x{}",
            logical.width, logical.height
        )));
    }
    Ok(())
}

fn sanitize_device_scale(s: f64) -> f64 {
    if s.is_finite() { s.max(1.0) } else { 1.0 }
}

fn sanitize_resolution_scale(s: f64) -> CanvasResult<f64> {
    if !s.is_finite() || s <= 0.0 {
        return Err(CanvasError::validation(format!(
            "resolution scale must be finite and > 0, got {s}"
        )));
    }
    Ok(s)
}

#[cfg(test)]
#[path = "../../tests/unit/surface/manager.rs"]
mod tests;

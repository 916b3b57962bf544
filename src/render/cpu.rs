use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use crate::foundation::core::{Affine, BezPath, Rect, Rgba8};
use crate::foundation::error::{CanvasError, CanvasResult};
use crate::raster::buffer::Raster;
use crate::render::blend::BlendMode;
use crate::render::composite::composite_rgba8_premul;

/// Identity of a raster uploaded as an image paint. Owners bump the key whenever the pixels change.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ImageKey(pub u64);

const DEFAULT_IMAGE_CAPACITY: usize = 16;

/// CPU rasterizer built on `vello_cpu`.
///
/// Every draw call renders into an isolated transparent layer which is then composited onto the
/// target with the requested operator and global alpha, the same way a 2D canvas applies
/// `globalCompositeOperation` per draw.
pub struct CpuRenderer {
    ctx: Option<vello_cpu::RenderContext>,
    contexts_built: u64,
    layer: Option<vello_cpu::Pixmap>,
    images: HashMap<ImageKey, vello_cpu::Image>,
    lru: VecDeque<ImageKey>,
    capacity: usize,
    layers_drawn: u64,
}

impl Default for CpuRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl CpuRenderer {
    pub fn new() -> Self {
        Self {
            ctx: None,
            contexts_built: 0,
            layer: None,
            images: HashMap::new(),
            lru: VecDeque::new(),
            capacity: DEFAULT_IMAGE_CAPACITY,
            layers_drawn: 0,
        }
    }

    /// Number of layers composited since construction.
    pub fn layers_drawn(&self) -> u64 {
        self.layers_drawn
    }

    /// Number of render contexts allocated; a context is reused while the target size holds.
    pub fn contexts_built(&self) -> u64 {
        self.contexts_built
    }

    /// Drop every uploaded image paint.
    pub fn forget_images(&mut self) {
        self.images.clear();
        self.lru.clear();
    }

    /// Render one layer through `draw` and composite it onto `target`.
    pub fn draw_layer<F>(
        &mut self,
        target: &mut Raster,
        blend: BlendMode,
        opacity: f64,
        draw: F,
    ) -> CanvasResult<()>
    where
        F: FnOnce(&mut LayerPainter<'_>) -> CanvasResult<()>,
    {
        let opacity = if opacity.is_finite() {
            opacity.clamp(0.0, 1.0)
        } else {
            1.0
        };
        if target.is_empty() {
            return Ok(());
        }
        // Operators like `copy` and `destination-in` affect the target even at zero alpha.
        if opacity <= 0.0 && matches!(blend.effective(), BlendMode::SourceOver) {
            return Ok(());
        }

        let (w, h) = pixmap_dims(target.width(), target.height())?;
        let mut pixmap = match self.layer.take() {
            Some(p) if p.width() == w && p.height() == h => p,
            _ => vello_cpu::Pixmap::new(w, h),
        };
        pixmap.data_as_u8_slice_mut().fill(0);

        let mut ctx = match self.ctx.take() {
            Some(ctx) if ctx.width() == w && ctx.height() == h => ctx,
            _ => {
                self.contexts_built += 1;
                vello_cpu::RenderContext::new(w, h)
            }
        };
        ctx.reset();
        let drawn = {
            let mut painter = LayerPainter {
                ctx: &mut ctx,
                renderer: self,
            };
            draw(&mut painter)
        };
        if drawn.is_ok() {
            ctx.flush();
            ctx.render_to_pixmap(&mut pixmap);
        }
        self.ctx = Some(ctx);
        if let Err(err) = drawn {
            self.layer = Some(pixmap);
            return Err(err);
        }

        let res = composite_rgba8_premul(
            target.data_mut(),
            pixmap.data_as_u8_slice(),
            opacity as f32,
            blend,
        );
        self.layer = Some(pixmap);
        self.layers_drawn += 1;
        res
    }

    /// Copy-composite `src` onto a same-sized `target` without going through the rasterizer.
    pub fn blit_same_size(
        &mut self,
        target: &mut Raster,
        src: &Raster,
        blend: BlendMode,
        opacity: f64,
    ) -> CanvasResult<()> {
        if target.size() != src.size() {
            return Err(CanvasError::render(format!(
                "blit size mismatch: target {}x{}, source {}x{}",
                target.width(),
                target.height(),
                src.width(),
                src.height()
            )));
        }
        self.layers_drawn += 1;
        composite_rgba8_premul(target.data_mut(), src.data(), opacity as f32, blend)
    }

    /// Blit `src` into `dest` (in the coordinate space of `transform`), taking the fast path when
    /// the mapping is a pixel-exact copy.
    pub fn blit_raster(
        &mut self,
        target: &mut Raster,
        key: ImageKey,
        src: &Raster,
        dest: Rect,
        transform: Affine,
        opacity: f64,
    ) -> CanvasResult<()> {
        let device = transform.transform_rect_bbox(dest);
        let exact = transform.as_coeffs()[1] == 0.0
            && transform.as_coeffs()[2] == 0.0
            && device.x0 == 0.0
            && device.y0 == 0.0
            && device.width() == f64::from(target.width())
            && device.height() == f64::from(target.height())
            && src.size() == target.size();
        if exact {
            return self.blit_same_size(target, src, BlendMode::SourceOver, opacity);
        }
        self.draw_layer(target, BlendMode::SourceOver, opacity, |p| {
            p.draw_raster(key, src, dest, transform, 1.0)
        })
    }

    fn image_paint_for(&mut self, key: ImageKey, src: &Raster) -> CanvasResult<vello_cpu::Image> {
        if let Some(img) = self.images.get(&key) {
            let matches = match &img.image {
                vello_cpu::ImageSource::Pixmap(p) => {
                    u32::from(p.width()) == src.width() && u32::from(p.height()) == src.height()
                }
                vello_cpu::ImageSource::OpaqueId(_) => false,
            };
            if matches {
                let img = img.clone();
                self.touch(key);
                return Ok(img);
            }
        }

        let pixmap = raster_to_pixmap(src)?;
        let img = vello_cpu::Image {
            image: vello_cpu::ImageSource::Pixmap(Arc::new(pixmap)),
            sampler: vello_cpu::peniko::ImageSampler::default(),
        };
        self.insert_image(key, img.clone());
        Ok(img)
    }

    fn insert_image(&mut self, key: ImageKey, image: vello_cpu::Image) {
        if self.images.insert(key, image).is_none() {
            self.lru.push_back(key);
        } else {
            self.touch(key);
        }
        while self.images.len() > self.capacity {
            let Some(old) = self.lru.pop_front() else {
                break;
            };
            self.images.remove(&old);
        }
    }

    fn touch(&mut self, key: ImageKey) {
        if let Some(pos) = self.lru.iter().position(|k| *k == key) {
            self.lru.remove(pos);
        }
        self.lru.push_back(key);
    }
}

/// Drawing handle for the layer currently being rendered.
pub struct LayerPainter<'a> {
    ctx: &'a mut vello_cpu::RenderContext,
    renderer: &'a mut CpuRenderer,
}

impl LayerPainter<'_> {
    pub fn fill_path(&mut self, path: &BezPath, transform: Affine, color: Rgba8) {
        if color.a == 0 {
            return;
        }
        self.ctx
            .set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
        self.ctx.set_transform(affine_to_cpu(transform));
        self.ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(
            color.r, color.g, color.b, color.a,
        ));
        self.ctx.fill_path(&bezpath_to_cpu(path));
    }

    pub fn fill_rect(&mut self, rect: Rect, transform: Affine, color: Rgba8) {
        if color.a == 0 {
            return;
        }
        self.ctx
            .set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
        self.ctx.set_transform(affine_to_cpu(transform));
        self.ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(
            color.r, color.g, color.b, color.a,
        ));
        self.ctx.fill_rect(&rect_to_cpu(rect));
    }

    /// Draw `src` stretched over `dest`, optionally faded by `opacity`.
    pub fn draw_raster(
        &mut self,
        key: ImageKey,
        src: &Raster,
        dest: Rect,
        transform: Affine,
        opacity: f64,
    ) -> CanvasResult<()> {
        if src.is_empty() || dest.width() <= 0.0 || dest.height() <= 0.0 || opacity <= 0.0 {
            return Ok(());
        }
        let paint = self.renderer.image_paint_for(key, src)?;
        let (sw, sh) = (f64::from(src.width()), f64::from(src.height()));
        let placed = transform
            * Affine::translate((dest.x0, dest.y0))
            * Affine::scale_non_uniform(dest.width() / sw, dest.height() / sh);

        self.ctx
            .set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
        self.ctx.set_transform(affine_to_cpu(placed));
        self.ctx.set_paint(paint);
        let faded = opacity < 1.0;
        if faded {
            self.ctx.push_opacity_layer(opacity as f32);
        }
        self.ctx
            .fill_rect(&vello_cpu::kurbo::Rect::new(0.0, 0.0, sw, sh));
        if faded {
            self.ctx.pop_layer();
        }
        Ok(())
    }
}

fn pixmap_dims(width: u32, height: u32) -> CanvasResult<(u16, u16)> {
    let w: u16 = width
        .try_into()
        .map_err(|_| CanvasError::render("surface width exceeds u16"))?;
    let h: u16 = height
        .try_into()
        .map_err(|_| CanvasError::render("surface height exceeds u16"))?;
    Ok((w, h))
}

fn raster_to_pixmap(src: &Raster) -> CanvasResult<vello_cpu::Pixmap> {
    let (w, h) = pixmap_dims(src.width(), src.height())?;
    let mut may_have_opacities = false;
    let mut pixels = Vec::with_capacity(src.data().len() / 4);
    for px in src.data().chunks_exact(4) {
        may_have_opacities |= px[3] != 255;
        pixels.push(vello_cpu::peniko::color::PremulRgba8 {
            r: px[0],
            g: px[1],
            b: px[2],
            a: px[3],
        });
    }
    Ok(vello_cpu::Pixmap::from_parts_with_opacity(
        pixels,
        w,
        h,
        may_have_opacities,
    ))
}

fn affine_to_cpu(a: Affine) -> vello_cpu::kurbo::Affine {
    vello_cpu::kurbo::Affine::new(a.as_coeffs())
}

fn point_to_cpu(p: kurbo::Point) -> vello_cpu::kurbo::Point {
    vello_cpu::kurbo::Point::new(p.x, p.y)
}

fn rect_to_cpu(r: Rect) -> vello_cpu::kurbo::Rect {
    vello_cpu::kurbo::Rect::new(r.x0, r.y0, r.x1, r.y1)
}

fn bezpath_to_cpu(path: &BezPath) -> vello_cpu::kurbo::BezPath {
    use kurbo::PathEl;

    let mut out = vello_cpu::kurbo::BezPath::new();
    for &el in path.elements() {
        match el {
            PathEl::MoveTo(p) => out.move_to(point_to_cpu(p)),
            PathEl::LineTo(p) => out.line_to(point_to_cpu(p)),
            PathEl::QuadTo(p1, p2) => out.quad_to(point_to_cpu(p1), point_to_cpu(p2)),
            PathEl::CurveTo(p1, p2, p3) => {
                out.curve_to(point_to_cpu(p1), point_to_cpu(p2), point_to_cpu(p3));
            }
            PathEl::ClosePath => out.close_path(),
        }
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/render/cpu.rs"]
mod tests;

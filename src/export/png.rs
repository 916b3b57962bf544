use std::io::Cursor;

use crate::foundation::core::PixelSize;
use crate::foundation::error::{CanvasError, CanvasResult};
use crate::raster::buffer::Raster;
use crate::session::compositor::CompositorSession;

/// Canonical export resolution, independent of the live device scale.
pub const EXPORT_SIZE: PixelSize = PixelSize {
    width: 600,
    height: 400,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ExportOpts {
    /// Leave the background layer out.
    pub transparent_background: bool,
    pub size: PixelSize,
}

impl Default for ExportOpts {
    fn default() -> Self {
        Self {
            transparent_background: false,
            size: EXPORT_SIZE,
        }
    }
}

impl ExportOpts {
    pub fn transparent(mut self, on: bool) -> Self {
        self.transparent_background = on;
        self
    }

    pub fn with_size(mut self, size: PixelSize) -> Self {
        self.size = size;
        self
    }
}

/// Render the session's composite into an isolated buffer and encode it as PNG.
#[tracing::instrument(skip(session), fields(mode = %session.scene_mode()))]
pub fn export_png(session: &mut CompositorSession, opts: &ExportOpts) -> CanvasResult<Vec<u8>> {
    if opts.size.is_empty() {
        return Err(CanvasError::export(format!(
            "export size must be non-empty, got {}x{}",
            opts.size.width, opts.size.height
        )));
    }
    let raster = session.render_isolated(opts.size, opts.transparent_background)?;
    let bytes = encode_png(&raster)?;
    tracing::debug!(bytes = bytes.len(), "png encoded");
    Ok(bytes)
}

/// Straight-alpha PNG of a premultiplied raster.
pub fn encode_png(raster: &Raster) -> CanvasResult<Vec<u8>> {
    let rgba = raster.to_straight_rgba8();
    let img = image::RgbaImage::from_raw(raster.width(), raster.height(), rgba)
        .ok_or_else(|| CanvasError::export("raster size does not match its pixel buffer"))?;
    let mut out = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut out, image::ImageFormat::Png)
        .map_err(|e| CanvasError::export(format!("png encode failed: {e}")))?;
    Ok(out.into_inner())
}

/// `canvas-<mode>-<unix_ms>.png`
pub fn export_file_name(mode: &str, unix_ms: u64) -> String {
    format!("canvas-{mode}-{unix_ms}.png")
}

#[cfg(test)]
#[path = "../../tests/unit/export/png.rs"]
mod tests;

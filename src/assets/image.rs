use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::foundation::core::PixelSize;
use crate::foundation::error::{CanvasError, CanvasResult};
use crate::raster::buffer::Raster;

/// Decoded bitmap handed over by the image collaborator: straight RGBA8 plus natural size.
#[derive(Clone, PartialEq, Eq)]
pub struct Bitmap {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl std::fmt::Debug for Bitmap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bitmap")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

impl Bitmap {
    pub fn new(width: u32, height: u32, rgba: Vec<u8>) -> CanvasResult<Self> {
        let expected = PixelSize::new(width, height).rgba8_len()?;
        if rgba.len() != expected {
            return Err(CanvasError::validation(format!(
                "bitmap expects {expected} bytes for {width}x{height}, got {}",
                rgba.len()
            )));
        }
        Ok(Self {
            width,
            height,
            rgba,
        })
    }

    pub fn size(&self) -> PixelSize {
        PixelSize::new(self.width, self.height)
    }

    /// Premultiplied raster for the compositor.
    pub fn to_raster(&self) -> CanvasResult<Raster> {
        Raster::from_straight_rgba8(self.width, self.height, self.rgba.clone())
    }
}

/// "Give me a bitmap and its width/height." Pickers, drag-drop and URLs live behind this.
pub trait ImageProvider {
    fn load(&mut self) -> CanvasResult<Bitmap>;
}

/// Loads one image file from disk.
#[derive(Clone, Debug)]
pub struct FileImageProvider {
    path: PathBuf,
}

impl FileImageProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ImageProvider for FileImageProvider {
    fn load(&mut self) -> CanvasResult<Bitmap> {
        load_bitmap(&self.path)
    }
}

pub fn decode_bitmap(bytes: &[u8]) -> CanvasResult<Bitmap> {
    let dyn_img = image::load_from_memory(bytes).context("decode image from memory")?;
    let rgba = dyn_img.to_rgba8();
    let (width, height) = rgba.dimensions();
    Bitmap::new(width, height, rgba.into_raw())
}

pub fn load_bitmap(path: &Path) -> CanvasResult<Bitmap> {
    let bytes = std::fs::read(path).with_context(|| format!("read image '{}'", path.display()))?;
    decode_bitmap(&bytes)
}

#[cfg(test)]
#[path = "../../tests/unit/assets/image.rs"]
mod tests;

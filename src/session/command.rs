use crate::assets::image::Bitmap;
use crate::filter::engine::{FilterKind, FilterParams};
use crate::foundation::core::{Point, Size};
use crate::render::blend::BlendMode;
use crate::scene::model::{EntityId, EntitySpec};
use crate::session::config::{RenderMode, SceneMode};

/// Input the host translates its widgets and pointer events into.
///
/// Commands only mutate session state; the next rendered frame observes them.
#[derive(Clone, Debug)]
pub enum Command {
    /// Press at a viewport point: hit-test, select, start dragging.
    PointerDown(Point),
    PointerMove(Point),
    PointerUp,
    Select(EntityId),
    SetBlend(BlendMode),
    SetOpacity(f64),
    /// Rotate the selection by 15 degrees.
    RotateStep,
    ScaleUp,
    ResetTransform,
    AddEntity(EntitySpec),
    RemoveEntity(EntityId),
    ApplyFilter(FilterKind),
    ResetFilter,
    /// Replace the filter tunables; the active filter is re-applied.
    SetFilterParams(FilterParams),
    SetTransparentBackground(bool),
    SetSceneMode(SceneMode),
    SetRenderMode(RenderMode),
    SetTileCount(u32),
    /// New random layout for the procedural background.
    RegenerateBackground,
    Resize {
        logical: Size,
        device_scale: f64,
    },
    /// Where the surface element sits in the viewport, for pointer mapping.
    SetViewport { origin: Point, size: Size },
    LoadImage(Bitmap),
    ImageLoadFailed(String),
    ClearImage,
}

impl Command {
    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::PointerDown(_) => "pointer-down",
            Self::PointerMove(_) => "pointer-move",
            Self::PointerUp => "pointer-up",
            Self::Select(_) => "select",
            Self::SetBlend(_) => "set-blend",
            Self::SetOpacity(_) => "set-opacity",
            Self::RotateStep => "rotate-step",
            Self::ScaleUp => "scale-up",
            Self::ResetTransform => "reset-transform",
            Self::AddEntity(_) => "add-entity",
            Self::RemoveEntity(_) => "remove-entity",
            Self::ApplyFilter(_) => "apply-filter",
            Self::ResetFilter => "reset-filter",
            Self::SetFilterParams(_) => "set-filter-params",
            Self::SetTransparentBackground(_) => "set-transparent-background",
            Self::SetSceneMode(_) => "set-scene-mode",
            Self::SetRenderMode(_) => "set-render-mode",
            Self::SetTileCount(_) => "set-tile-count",
            Self::RegenerateBackground => "regenerate-background",
            Self::Resize { .. } => "resize",
            Self::SetViewport { .. } => "set-viewport",
            Self::LoadImage(_) => "load-image",
            Self::ImageLoadFailed(_) => "image-load-failed",
            Self::ClearImage => "clear-image",
        }
    }
}

//! Local-space outlines for entity shapes. Every path is centered on the origin.

use kurbo::{Shape, Stroke, StrokeOpts};

use crate::foundation::core::{BezPath, Rect, Rgba8, Size};
use crate::scene::model::EntityKind;

pub const CORNER_RADIUS: f64 = 12.0;
pub const OUTLINE_WIDTH: f64 = 3.0;
pub const OUTLINE_DASH: [f64; 2] = [8.0, 4.0];
pub const OUTLINE_COLOR: Rgba8 = Rgba8::new(255, 255, 255, 230);

const TOLERANCE: f64 = 0.1;

pub fn local_bounds(size: Size) -> Rect {
    Rect::new(
        -size.width / 2.0,
        -size.height / 2.0,
        size.width / 2.0,
        size.height / 2.0,
    )
}

/// Centered rounded rectangle; the radius never exceeds half the smaller side.
pub fn rounded_rect_path(size: Size, radius: f64) -> BezPath {
    let r = radius
        .min(size.width / 2.0)
        .min(size.height / 2.0)
        .max(0.0);
    local_bounds(size).to_rounded_rect(r).to_path(TOLERANCE)
}

/// Centered isoceles triangle, apex at `(0, -h/2)` and base along `y = h/2`.
pub fn triangle_path(size: Size) -> BezPath {
    let (hw, hh) = (size.width / 2.0, size.height / 2.0);
    let mut p = BezPath::new();
    p.move_to((0.0, -hh));
    p.line_to((hw, hh));
    p.line_to((-hw, hh));
    p.close_path();
    p
}

pub fn shape_path(kind: EntityKind, size: Size) -> BezPath {
    match kind {
        EntityKind::Rect => rounded_rect_path(size, CORNER_RADIUS),
        EntityKind::Triangle => triangle_path(size),
        EntityKind::Sprite => {
            let r = size.width.min(size.height) / 2.0;
            kurbo::Circle::new((0.0, 0.0), r.max(0.0)).to_path(TOLERANCE)
        }
    }
}

/// Filled outline of the dashed selection stroke around the unrotated local box.
pub fn selection_outline(size: Size) -> BezPath {
    let style = Stroke::new(OUTLINE_WIDTH).with_dashes(0.0, OUTLINE_DASH);
    kurbo::stroke(
        local_bounds(size).path_elements(TOLERANCE),
        &style,
        &StrokeOpts::default(),
        TOLERANCE,
    )
}

#[cfg(test)]
#[path = "../../tests/unit/scene/shape.rs"]
mod tests;

use std::fmt;

use crate::foundation::core::{Affine, Point, Rgba8, Size, Vec2};
use crate::foundation::error::{CanvasError, CanvasResult};
use crate::render::blend::BlendMode;

/// Upper bound for the uniform entity scale.
pub const MAX_SCALE: f64 = 3.0;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
/// Stable, user-facing entity identifier.
pub struct EntityId(pub String);

impl EntityId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
/// Shape drawn for an entity, centered at its local origin.
pub enum EntityKind {
    /// Rounded rectangle.
    #[default]
    Rect,
    /// Isoceles triangle, apex up.
    Triangle,
    /// Soft round sprite tinted by the fill color.
    Sprite,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Rect => "rect",
            Self::Triangle => "triangle",
            Self::Sprite => "sprite",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
/// A drawable sticker or particle owned by a [`Scene`].
pub struct Entity {
    pub id: EntityId,
    pub kind: EntityKind,
    /// Center in logical units.
    pub position: Point,
    pub rotation_rad: f64,
    pub scale: f64,
    pub opacity: f64,
    pub blend: BlendMode,
    /// Unscaled width and height.
    pub size: Size,
    pub fill: Rgba8,
}

impl Entity {
    /// Local-to-logical transform: translate, then rotate, then scale uniformly.
    pub fn local_to_world(&self) -> Affine {
        Affine::translate(self.position.to_vec2())
            * Affine::rotate(self.rotation_rad)
            * Affine::scale(self.scale)
    }

    /// Whether the logical point lies inside the entity's drawn box (edges inclusive).
    pub fn contains(&self, p: Point) -> bool {
        if self.scale <= 0.0 || !self.scale.is_finite() {
            return false;
        }
        let local = self.local_to_world().inverse() * p;
        // Slack for float error on edge points mapped through rotation.
        const EPS: f64 = 1e-9;
        local.x.abs() <= self.size.width / 2.0 + EPS
            && local.y.abs() <= self.size.height / 2.0 + EPS
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
/// Creation parameters for [`Scene::add_entity`]. A missing `id` is auto-assigned.
pub struct EntitySpec {
    pub id: Option<EntityId>,
    pub kind: EntityKind,
    pub position: Point,
    pub rotation_rad: f64,
    pub scale: f64,
    pub opacity: f64,
    pub blend: BlendMode,
    pub size: Size,
    pub fill: Rgba8,
}

impl Default for EntitySpec {
    fn default() -> Self {
        Self {
            id: None,
            kind: EntityKind::Rect,
            position: Point::ZERO,
            rotation_rad: 0.0,
            scale: 1.0,
            opacity: 1.0,
            blend: BlendMode::SourceOver,
            size: Size::new(100.0, 100.0),
            fill: Rgba8::WHITE,
        }
    }
}

impl EntitySpec {
    pub fn rect(id: &str, position: Point, size: Size, fill: Rgba8) -> Self {
        Self {
            id: Some(EntityId::new(id)),
            kind: EntityKind::Rect,
            position,
            size,
            fill,
            ..Self::default()
        }
    }

    pub fn triangle(id: &str, position: Point, size: Size, fill: Rgba8) -> Self {
        Self {
            kind: EntityKind::Triangle,
            ..Self::rect(id, position, size, fill)
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
/// In-place mutation applied by [`Scene::mutate`]; `None` fields are left untouched.
pub struct EntityPatch {
    pub position: Option<Point>,
    pub translate: Option<Vec2>,
    pub rotation_rad: Option<f64>,
    pub scale: Option<f64>,
    pub opacity: Option<f64>,
    pub blend: Option<BlendMode>,
    pub fill: Option<Rgba8>,
}

#[derive(Clone, Debug, Default)]
/// Ordered entity list. Index order is paint order: later entries draw on top.
pub struct Scene {
    entities: Vec<Entity>,
    selected: Option<EntityId>,
    next_auto_id: u64,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn get(&self, id: &EntityId) -> Option<&Entity> {
        self.entities.iter().find(|e| &e.id == id)
    }

    fn index_of(&self, id: &EntityId) -> Option<usize> {
        self.entities.iter().position(|e| &e.id == id)
    }

    pub fn add_entity(&mut self, spec: EntitySpec) -> CanvasResult<EntityId> {
        let size_ok = spec.size.width.is_finite()
            && spec.size.height.is_finite()
            && spec.size.width > 0.0
            && spec.size.height > 0.0;
        if !size_ok {
            return Err(CanvasError::validation(format!(
                "entity size must be positive, got {}x{}",
                spec.size.width, spec.size.height
            )));
        }
        if !spec.position.x.is_finite() || !spec.position.y.is_finite() {
            return Err(CanvasError::validation("entity position must be finite"));
        }

        let id = match spec.id {
            Some(id) => {
                if self.index_of(&id).is_some() {
                    return Err(CanvasError::validation(format!(
                        "entity id '{id}' already exists"
                    )));
                }
                id
            }
            None => self.next_free_id(),
        };

        self.entities.push(Entity {
            id: id.clone(),
            kind: spec.kind,
            position: spec.position,
            rotation_rad: spec.rotation_rad,
            scale: clamp_scale(spec.scale),
            opacity: clamp_unit(spec.opacity),
            blend: spec.blend,
            size: spec.size,
            fill: spec.fill,
        });
        Ok(id)
    }

    fn next_free_id(&mut self) -> EntityId {
        loop {
            self.next_auto_id += 1;
            let id = EntityId(format!("e{}", self.next_auto_id));
            if self.index_of(&id).is_none() {
                return id;
            }
        }
    }

    /// Remove an entity; clears the selection if it pointed at it.
    pub fn remove_entity(&mut self, id: &EntityId) -> Option<Entity> {
        let idx = self.index_of(id)?;
        if self.selected.as_ref() == Some(id) {
            self.selected = None;
        }
        Some(self.entities.remove(idx))
    }

    /// Topmost entity containing the logical point.
    pub fn hit_test(&self, p: Point) -> Option<&Entity> {
        self.entities.iter().rev().find(|e| e.contains(p))
    }

    /// Move the entity to the end of paint order. Returns `false` for unknown ids.
    pub fn bring_to_front(&mut self, id: &EntityId) -> bool {
        let Some(idx) = self.index_of(id) else {
            return false;
        };
        let e = self.entities.remove(idx);
        self.entities.push(e);
        true
    }

    pub fn mutate(&mut self, id: &EntityId, patch: &EntityPatch) -> CanvasResult<()> {
        let Some(e) = self.entities.iter_mut().find(|e| &e.id == id) else {
            return Err(CanvasError::validation(format!("unknown entity '{id}'")));
        };
        if let Some(p) = patch.position {
            e.position = p;
        }
        if let Some(v) = patch.translate {
            e.position += v;
        }
        if let Some(r) = patch.rotation_rad {
            e.rotation_rad = r;
        }
        if let Some(s) = patch.scale {
            e.scale = clamp_scale(s);
        }
        if let Some(o) = patch.opacity {
            e.opacity = clamp_unit(o);
        }
        if let Some(b) = patch.blend {
            e.blend = b;
        }
        if let Some(f) = patch.fill {
            e.fill = f;
        }
        Ok(())
    }

    /// Make `id` the active selection and bring it to the front.
    pub fn select(&mut self, id: &EntityId) -> bool {
        if !self.bring_to_front(id) {
            return false;
        }
        self.selected = Some(id.clone());
        true
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    pub fn selected_id(&self) -> Option<&EntityId> {
        self.selected.as_ref()
    }

    pub fn selected(&self) -> Option<&Entity> {
        self.selected.as_ref().and_then(|id| self.get(id))
    }
}

fn clamp_unit(v: f64) -> f64 {
    if v.is_finite() { v.clamp(0.0, 1.0) } else { 1.0 }
}

fn clamp_scale(v: f64) -> f64 {
    if v.is_finite() && v > 0.0 {
        v.min(MAX_SCALE)
    } else {
        1.0
    }
}

#[cfg(test)]
#[path = "../../tests/unit/scene/model.rs"]
mod tests;

//! Axis-aligned boxes and entity hitboxes
//!
//! Everything that collides is an `Aabb` with a top-left origin: obstacles,
//! entity hitboxes, attack hitboxes, switch plates and door zones.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// An axis-aligned rectangle, top-left origin
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub x: f32,
    pub y: f32,
    #[serde(alias = "w")]
    pub width: f32,
    #[serde(alias = "h")]
    pub height: f32,
}

impl Aabb {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    /// Box of the given size centered on `center`
    pub fn centered(center: Vec2, width: f32, height: f32) -> Self {
        Self {
            x: center.x - width / 2.0,
            y: center.y - height / 2.0,
            width,
            height,
        }
    }

    #[inline]
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    #[inline]
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    #[inline]
    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Strict overlap test: shared edges do not count
    #[inline]
    pub fn overlaps(&self, other: &Aabb) -> bool {
        overlaps(self, other)
    }

    /// Half-open point containment, `[x, right) x [y, bottom)`
    #[inline]
    pub fn contains_point(&self, p: Vec2) -> bool {
        p.x >= self.x && p.x < self.right() && p.y >= self.y && p.y < self.bottom()
    }

    /// Force width and height to at least one unit (content may carry zero or NaN)
    pub fn sanitized(self) -> Self {
        let fix = |v: f32| if v.is_finite() { v.max(1.0) } else { 1.0 };
        let pos = |v: f32| if v.is_finite() { v } else { 0.0 };
        Self {
            x: pos(self.x),
            y: pos(self.y),
            width: fix(self.width),
            height: fix(self.height),
        }
    }

    /// True if the box has a usable, positive size
    pub fn is_valid(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }
}

/// Strict AABB overlap test.
///
/// `a.x < b.x + b.w && a.x + a.w > b.x && a.y < b.y + b.h && a.y + a.h > b.y`
#[inline]
pub fn overlaps(a: &Aabb, b: &Aabb) -> bool {
    a.x < b.right() && a.right() > b.x && a.y < b.bottom() && a.bottom() > b.y
}

/// Collision footprint of an entity, relative to its position
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hitbox {
    pub width: f32,
    pub height: f32,
    /// Offset of the box center from the entity position
    #[serde(default)]
    pub offset: Vec2,
}

impl Hitbox {
    pub fn square(size: f32) -> Self {
        Self {
            width: size.max(1.0),
            height: size.max(1.0),
            offset: Vec2::ZERO,
        }
    }

    /// World-space box when the owning entity stands at `pos`
    #[inline]
    pub fn at(&self, pos: Vec2) -> Aabb {
        Aabb::centered(pos + self.offset, self.width, self.height)
    }
}

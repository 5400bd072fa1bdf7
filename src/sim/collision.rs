//! Collision oracle
//!
//! Broad phase through the [`SpatialIndex`], narrow phase with the strict
//! AABB test. This is the only place that answers "would this entity hit a
//! wall if it stood there"; trigger checks (doors, switches, attack hits)
//! call [`overlaps`] directly on boxes that are already built.

use glam::Vec2;

use super::aabb::{Aabb, Hitbox, overlaps};
use super::spatial::{ObstacleId, SpatialIndex};

/// First obstacle that overlaps `area`, if any
pub fn first_obstacle_hit(index: &SpatialIndex, area: &Aabb) -> Option<ObstacleId> {
    index
        .candidates(area)
        .find(|o| overlaps(area, &o.bounds))
        .map(|o| o.id)
}

/// Would an entity with `hitbox` collide with an obstacle if it stood at `pos`?
pub fn would_collide_at(index: &SpatialIndex, hitbox: &Hitbox, pos: Vec2) -> bool {
    let area = hitbox.at(pos);
    first_obstacle_hit(index, &area).is_some()
}

/// Every obstacle overlapping `area`, in id order
pub fn obstacles_overlapping(index: &SpatialIndex, area: &Aabb) -> Vec<ObstacleId> {
    index
        .candidates(area)
        .filter(|o| overlaps(area, &o.bounds))
        .map(|o| o.id)
        .collect()
}

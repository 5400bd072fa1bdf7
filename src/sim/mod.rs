//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Time only advances through the `dt` handed to `tick`
//! - Seeded RNG only (one per room)
//! - Stable iteration order (by entity ID)
//! - No rendering or platform dependencies

pub mod aabb;
pub mod ai;
pub mod collision;
pub mod combat;
pub mod movement;
pub mod pickup;
pub mod progression;
pub mod room;
pub mod spatial;
pub mod state;
pub mod tick;

pub use aabb::{Aabb, Hitbox, overlaps};
pub use collision::{first_obstacle_hit, obstacles_overlapping, would_collide_at};
pub use combat::{Kill, MeleeHitbox, Projectile, Weapon, apply_damage};
pub use movement::MoveOutcome;
pub use pickup::{Collectible, Item, ItemKind};
pub use progression::RoomProgress;
pub use room::{AgentView, PlayerView, Room};
pub use spatial::{Obstacle, ObstacleId, SpatialIndex};
pub use state::{
    Agent, AgentStats, AiState, AttackPattern, Body, BossBrain, Capabilities, Door, EntityId, EntityKind, GameEvent,
    Health, Objective, PLAYER_ID, Player, PushableBlock, Switch,
};
pub use tick::{HeldDirections, TickInput, Transition, tick};

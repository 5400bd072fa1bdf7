//! Boomerang Keep - room-based action game core
//!
//! Core modules:
//! - `sim`: Deterministic per-frame simulation (collision, combat, AI, rooms)
//! - `content`: Room declarations consumed from world data
//! - `session`: Cross-room player profile and save snapshots
//! - `tuning`: Data-driven game balance

pub mod content;
pub mod session;
pub mod sim;
pub mod tuning;

pub use content::{ContentError, RoomDef, WorldContent};
pub use session::{PlayerSnapshot, Session};
pub use tuning::Tuning;

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Game configuration constants
pub mod consts {
    /// Nominal frame time for demos and tests (60 Hz)
    pub const FRAME_DT: f32 = 1.0 / 60.0;

    /// Player defaults
    pub const PLAYER_MAX_HEALTH: u32 = 6;
    pub const PLAYER_SPEED: f32 = 100.0;
    pub const PLAYER_HITBOX: f32 = 24.0;

    /// Projectile hitbox edge length
    pub const PROJECTILE_HITBOX: f32 = 16.0;
    pub const COLLECTIBLE_HITBOX: f32 = 24.0;

    /// XP needed per level (threshold = level * XP_PER_LEVEL)
    pub const XP_PER_LEVEL: u32 = 10;
    /// Max health gained on level up
    pub const LEVEL_UP_HEALTH: u32 = 2;

    /// Distance inside a door the player is placed on arrival
    pub const ARRIVAL_INSET: f32 = 40.0;
}

/// One of the four cardinal facings. Screen space: +y points down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    #[default]
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [Direction::Up, Direction::Down, Direction::Left, Direction::Right];

    /// Unit step for this facing
    #[inline]
    pub fn unit(self) -> Vec2 {
        match self {
            Direction::Up => Vec2::new(0.0, -1.0),
            Direction::Down => Vec2::new(0.0, 1.0),
            Direction::Left => Vec2::new(-1.0, 0.0),
            Direction::Right => Vec2::new(1.0, 0.0),
        }
    }

    /// Mirror-image facing (a door leading up arrives at the room's down door)
    #[inline]
    pub fn opposite(self) -> Self {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }
}

/// Offset `origin` by `distance` along `dir`
#[inline]
pub fn step(origin: Vec2, dir: Direction, distance: f32) -> Vec2 {
    origin + dir.unit() * distance
}

/// Clamp a frame delta to something the simulation can consume.
/// Negative or non-finite deltas become zero; large deltas pass through.
#[inline]
pub fn sanitize_dt(dt: f32) -> f32 {
    if dt.is_finite() && dt > 0.0 { dt } else { 0.0 }
}

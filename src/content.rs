//! Room declarations
//!
//! World data is authored elsewhere and arrives as JSON. This module only
//! parses it and resolves enemy stats; it does not try to make broken
//! content valid. Gaps the simulation can live with (unknown enemy types,
//! switches driving no door) are logged and skipped when the room loads.

use std::collections::{BTreeMap, BTreeSet};

use glam::Vec2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::Direction;
use crate::sim::aabb::Aabb;
use crate::sim::pickup::Item;
use crate::sim::state::{AgentStats, AttackPattern, Objective};

/// Failure to load world content
#[derive(Debug, Error)]
pub enum ContentError {
    #[error("invalid world data: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unknown room `{0}`")]
    UnknownRoom(String),
    #[error("room `{0}` is declared more than once")]
    DuplicateRoom(String),
}

/// Per-field enemy stats. Any field left out falls through to the enemy
/// type, then to the regular or boss defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnemyStats {
    pub health: Option<i64>,
    pub damage: Option<u32>,
    #[serde(alias = "range")]
    pub attack_range: Option<f32>,
    pub attack_cooldown: Option<f32>,
    pub speed: Option<f32>,
    pub aggro_range: Option<f32>,
    pub xp_reward: Option<u32>,
    pub hitbox: Option<f32>,
}

impl EnemyStats {
    /// Fields set here win; the rest come from `fallback`
    pub fn or(&self, fallback: &EnemyStats) -> EnemyStats {
        EnemyStats {
            health: self.health.or(fallback.health),
            damage: self.damage.or(fallback.damage),
            attack_range: self.attack_range.or(fallback.attack_range),
            attack_cooldown: self.attack_cooldown.or(fallback.attack_cooldown),
            speed: self.speed.or(fallback.speed),
            aggro_range: self.aggro_range.or(fallback.aggro_range),
            xp_reward: self.xp_reward.or(fallback.xp_reward),
            hitbox: self.hitbox.or(fallback.hitbox),
        }
    }

    /// Stats for a regular enemy with nothing configured
    pub fn regular_defaults() -> Self {
        Self {
            health: Some(3),
            damage: Some(1),
            attack_range: Some(32.0),
            attack_cooldown: Some(1.0),
            speed: Some(50.0),
            aggro_range: Some(150.0),
            xp_reward: Some(10),
            hitbox: Some(28.0),
        }
    }

    /// Bosses hit harder, last longer and see further
    pub fn boss_defaults() -> Self {
        Self {
            health: Some(20),
            damage: Some(10),
            speed: Some(60.0),
            attack_cooldown: Some(0.8),
            aggro_range: Some(300.0),
            xp_reward: Some(100),
            hitbox: Some(40.0),
            ..Self::regular_defaults()
        }
    }
}

/// Fully resolved stats for one spawn
#[derive(Debug, Clone, PartialEq)]
pub struct SpawnStats {
    pub max_health: u32,
    pub stats: AgentStats,
    pub hitbox: f32,
}

fn finite_or(v: Option<f32>, fallback: f32) -> f32 {
    match v {
        Some(v) if v.is_finite() => v.max(0.0),
        _ => fallback,
    }
}

/// One enemy placement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnemySpawn {
    #[serde(rename = "type")]
    pub type_name: String,
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub boss: bool,
    /// Only read for bosses
    #[serde(default)]
    pub pattern: Option<AttackPattern>,
    #[serde(default)]
    pub overrides: EnemyStats,
}

impl EnemySpawn {
    pub fn pos(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoorDef {
    pub bounds: Aabb,
    pub direction: Direction,
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub destination: String,
    #[serde(default)]
    pub mechanism: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwitchDef {
    pub bounds: Aabb,
    #[serde(default)]
    pub target: Option<String>,
}

/// An item lying in a room, centered on (x, y)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectibleDef {
    pub x: f32,
    pub y: f32,
    pub item: Item,
}

impl CollectibleDef {
    pub fn pos(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }
}

/// Everything the engine needs to build one room
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoomDef {
    pub id: String,
    pub player_spawn: Vec2,
    pub objective: Objective,
    pub obstacles: Vec<Aabb>,
    pub enemies: Vec<EnemySpawn>,
    pub doors: Vec<DoorDef>,
    pub switches: Vec<SwitchDef>,
    /// Pushable block boxes
    pub blocks: Vec<Aabb>,
    pub collectibles: Vec<CollectibleDef>,
}

impl RoomDef {
    /// Log configuration gaps. Nothing here is fatal.
    pub fn lint(&self) {
        let mechanisms: BTreeSet<&str> = self.doors.iter().filter_map(|d| d.mechanism.as_deref()).collect();
        for (i, switch) in self.switches.iter().enumerate() {
            if let Some(target) = switch.target.as_deref() {
                if !mechanisms.contains(target) {
                    log::warn!("Room {}: switch {} drives unknown mechanism `{}`", self.id, i, target);
                }
            }
        }
        for (i, door) in self.doors.iter().enumerate() {
            if door.destination.is_empty() {
                log::warn!("Room {}: door {} has no destination", self.id, i);
            }
        }
        if self.objective == Objective::DefeatBoss && !self.enemies.iter().any(|e| e.boss) {
            log::warn!("Room {}: defeat_boss objective but no boss spawn", self.id);
        }
    }
}

/// The world as declared by content
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldContent {
    /// Stats per enemy type name
    pub enemy_types: BTreeMap<String, EnemyStats>,
    pub rooms: Vec<RoomDef>,
    /// Room the run starts in; the first room if unset
    pub start_room: Option<String>,
}

impl WorldContent {
    pub fn from_json(json: &str) -> Result<Self, ContentError> {
        let content: Self = serde_json::from_str(json)?;
        let mut seen = BTreeSet::new();
        for room in &content.rooms {
            if !seen.insert(room.id.as_str()) {
                return Err(ContentError::DuplicateRoom(room.id.clone()));
            }
        }
        if let Some(start) = &content.start_room {
            content.room(start)?;
        }
        Ok(content)
    }

    pub fn room(&self, id: &str) -> Result<&RoomDef, ContentError> {
        self.rooms
            .iter()
            .find(|r| r.id == id)
            .ok_or_else(|| ContentError::UnknownRoom(id.to_string()))
    }

    pub fn start_room(&self) -> Option<&RoomDef> {
        match &self.start_room {
            Some(id) => self.room(id).ok(),
            None => self.rooms.first(),
        }
    }

    /// Resolve a spawn's stats: overrides, then type, then defaults.
    /// `None` for an enemy type the content never declared.
    pub fn resolve_spawn(&self, spawn: &EnemySpawn) -> Option<SpawnStats> {
        let Some(type_stats) = self.enemy_types.get(&spawn.type_name) else {
            log::warn!("Unknown enemy type `{}`, skipping spawn", spawn.type_name);
            return None;
        };
        let defaults = if spawn.boss {
            EnemyStats::boss_defaults()
        } else {
            EnemyStats::regular_defaults()
        };
        let merged = spawn.overrides.or(type_stats).or(&defaults);

        let max_health = merged.health.unwrap_or(3).clamp(1, u32::MAX as i64) as u32;
        let stats = AgentStats {
            damage: merged.damage.unwrap_or(1),
            attack_range: finite_or(merged.attack_range, defaults.attack_range.unwrap_or(32.0)),
            aggro_range: finite_or(merged.aggro_range, defaults.aggro_range.unwrap_or(150.0)),
            speed: finite_or(merged.speed, defaults.speed.unwrap_or(50.0)),
            attack_cooldown: finite_or(merged.attack_cooldown, defaults.attack_cooldown.unwrap_or(1.0)),
            xp_reward: merged.xp_reward.unwrap_or(10),
        };
        let hitbox = finite_or(merged.hitbox, 28.0).max(1.0);
        Some(SpawnStats {
            max_health,
            stats,
            hitbox,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WORLD: &str = r#"{
        "enemy_types": {
            "zombie": {},
            "skeleton": { "health": 5, "speed": 70.0 },
            "lich": { "health": 40 }
        },
        "rooms": [
            {
                "id": "crypt",
                "player_spawn": [100.0, 100.0],
                "objective": "defeat_all_enemies",
                "obstacles": [ { "x": 0, "y": 0, "w": 800, "h": 16 } ],
                "enemies": [
                    { "type": "zombie", "x": 300, "y": 300 },
                    { "type": "skeleton", "x": 400, "y": 300, "overrides": { "damage": 2 } },
                    { "type": "lich", "x": 500, "y": 300, "boss": true, "pattern": "teleport" }
                ],
                "doors": [
                    { "bounds": { "x": 380, "y": 0, "width": 40, "height": 16 },
                      "direction": "up", "locked": true, "destination": "hall" }
                ],
                "collectibles": [
                    { "x": 200, "y": 120, "item": { "type": "coin", "value": 5 } },
                    { "x": 240, "y": 120, "item": { "type": "armor", "name": "Chain", "defense": 2 } }
                ]
            },
            { "id": "hall" }
        ]
    }"#;

    #[test]
    fn test_parse_world() {
        let world = WorldContent::from_json(WORLD).unwrap();
        let crypt = world.room("crypt").unwrap();
        assert_eq!(crypt.objective, Objective::DefeatAllEnemies);
        assert_eq!(crypt.player_spawn, Vec2::new(100.0, 100.0));
        assert_eq!(crypt.obstacles[0].width, 800.0);
        assert_eq!(crypt.doors[0].direction, Direction::Up);
        assert_eq!(crypt.enemies[2].pattern, Some(AttackPattern::Teleport));
        assert_eq!(world.start_room().map(|r| r.id.as_str()), Some("crypt"));
        assert_eq!(crypt.collectibles[0].item, Item::Coin { value: 5 });
        assert_eq!(crypt.collectibles[1].pos(), Vec2::new(240.0, 120.0));
        assert!(world.room("hall").unwrap().collectibles.is_empty());
    }

    #[test]
    fn test_unknown_room_is_an_error() {
        let world = WorldContent::from_json(WORLD).unwrap();
        assert!(matches!(world.room("attic"), Err(ContentError::UnknownRoom(id)) if id == "attic"));
    }

    #[test]
    fn test_duplicate_room_rejected() {
        let err = WorldContent::from_json(r#"{ "rooms": [ { "id": "a" }, { "id": "a" } ] }"#);
        assert!(matches!(err, Err(ContentError::DuplicateRoom(_))));
    }

    #[test]
    fn test_bad_json_is_an_error() {
        assert!(matches!(WorldContent::from_json("{ nope"), Err(ContentError::Json(_))));
    }

    #[test]
    fn test_stat_resolution_layers() {
        let world = WorldContent::from_json(WORLD).unwrap();
        let crypt = world.room("crypt").unwrap();

        let zombie = world.resolve_spawn(&crypt.enemies[0]).unwrap();
        assert_eq!(zombie.max_health, 3);
        assert_eq!(zombie.stats.xp_reward, 10);
        assert_eq!(zombie.hitbox, 28.0);

        let skeleton = world.resolve_spawn(&crypt.enemies[1]).unwrap();
        assert_eq!(skeleton.max_health, 5);
        assert_eq!(skeleton.stats.speed, 70.0);
        assert_eq!(skeleton.stats.damage, 2);

        let lich = world.resolve_spawn(&crypt.enemies[2]).unwrap();
        assert_eq!(lich.max_health, 40);
        assert_eq!(lich.stats.damage, 10);
        assert_eq!(lich.stats.aggro_range, 300.0);
        assert_eq!(lich.hitbox, 40.0);
    }

    #[test]
    fn test_unknown_enemy_type_skipped() {
        let world = WorldContent::default();
        let spawn = EnemySpawn {
            type_name: "dragon".to_string(),
            x: 0.0,
            y: 0.0,
            boss: false,
            pattern: None,
            overrides: EnemyStats::default(),
        };
        assert!(world.resolve_spawn(&spawn).is_none());
    }

    #[test]
    fn test_negative_health_clamps_to_one() {
        let mut world = WorldContent::default();
        world.enemy_types.insert("slime".to_string(), EnemyStats::default());
        let spawn = EnemySpawn {
            type_name: "slime".to_string(),
            x: 0.0,
            y: 0.0,
            boss: false,
            pattern: None,
            overrides: EnemyStats {
                health: Some(-5),
                speed: Some(f32::NAN),
                ..EnemyStats::default()
            },
        };
        let stats = world.resolve_spawn(&spawn).unwrap();
        assert_eq!(stats.max_health, 1);
        assert_eq!(stats.stats.speed, 50.0);
    }
}

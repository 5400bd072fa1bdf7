//! Cross-room session context
//!
//! The player profile and the set of completed rooms outlive any single
//! room. A room is built from the session and writes back into it on exit;
//! nothing here is global.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::consts::{LEVEL_UP_HEALTH, PLAYER_MAX_HEALTH, PLAYER_SPEED, XP_PER_LEVEL};
use crate::sim::combat::Weapon;
use crate::sim::state::Health;

/// Armor piece; only defense matters to the simulation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Armor {
    pub name: String,
    pub defense: u32,
}

impl Default for Armor {
    fn default() -> Self {
        Self {
            name: "Armor".to_string(),
            defense: 1,
        }
    }
}

/// Player health, stats and inventory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerProfile {
    pub health: Health,
    pub damage: u32,
    /// Flat reduction applied to incoming hits
    pub defense: u32,
    /// Movement speed, units per second
    pub speed: f32,
    /// Lifetime XP (not reset on level up)
    pub xp: u32,
    pub level: u32,
    pub coins: u32,
    pub weapon: Option<Weapon>,
    pub armor: Option<Armor>,
}

impl Default for PlayerProfile {
    fn default() -> Self {
        Self {
            health: Health::new(PLAYER_MAX_HEALTH),
            damage: 1,
            defense: 0,
            speed: PLAYER_SPEED,
            xp: 0,
            level: 1,
            coins: 0,
            weapon: None,
            armor: None,
        }
    }
}

impl PlayerProfile {
    /// XP required to leave `level`
    #[inline]
    pub fn level_threshold(level: u32) -> u32 {
        level.saturating_mul(XP_PER_LEVEL)
    }

    /// Award XP and apply every level-up it earns. Returns levels gained.
    pub fn add_xp(&mut self, amount: u32) -> u32 {
        self.xp = self.xp.saturating_add(amount);
        let mut gained = 0;
        while self.xp >= Self::level_threshold(self.level) {
            self.level_up();
            gained += 1;
        }
        gained
    }

    fn level_up(&mut self) {
        self.level += 1;
        self.health.raise_max(LEVEL_UP_HEALTH);
        self.health.refill();
        log::info!("Level up! Now level {} ({} max health)", self.level, self.health.max());
    }

    pub fn equip_weapon(&mut self, weapon: Weapon) {
        self.damage = weapon.damage.max(1);
        self.weapon = Some(weapon);
    }

    pub fn equip_armor(&mut self, armor: Armor) {
        self.defense = armor.defense;
        self.armor = Some(armor);
    }

    /// Heal up to max. Returns the amount restored.
    pub fn heal(&mut self, amount: u32) -> u32 {
        self.health.heal(amount)
    }

    pub fn add_coins(&mut self, amount: u32) {
        self.coins = self.coins.saturating_add(amount);
    }
}

/// Plain data handed to the persistence layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub health: i64,
    pub max_health: i64,
    pub damage: u32,
    pub defense: u32,
    pub speed: f32,
    pub xp: u32,
    pub level: u32,
    pub coins: u32,
    pub weapon: Option<Weapon>,
    pub armor: Option<Armor>,
    #[serde(default)]
    pub completed_rooms: Vec<String>,
    /// Collectibles already taken, as (room id, slot)
    #[serde(default)]
    pub collected_items: Vec<(String, u32)>,
}

impl PlayerSnapshot {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Persistent context threaded through room construction
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    pub player: PlayerProfile,
    pub completed_rooms: BTreeSet<String>,
    /// (room id, slot) of every collectible picked up
    pub collected_items: BTreeSet<(String, u32)>,
}

impl Session {
    pub fn new(player: PlayerProfile) -> Self {
        Self {
            player,
            completed_rooms: BTreeSet::new(),
            collected_items: BTreeSet::new(),
        }
    }

    pub fn is_room_complete(&self, id: &str) -> bool {
        self.completed_rooms.contains(id)
    }

    pub fn mark_room_complete(&mut self, id: &str) {
        self.completed_rooms.insert(id.to_string());
    }

    pub fn is_item_collected(&self, room: &str, slot: u32) -> bool {
        self.collected_items.contains(&(room.to_string(), slot))
    }

    pub fn mark_item_collected(&mut self, room: &str, slot: u32) {
        self.collected_items.insert((room.to_string(), slot));
    }

    pub fn snapshot(&self) -> PlayerSnapshot {
        let p = &self.player;
        PlayerSnapshot {
            health: p.health.current() as i64,
            max_health: p.health.max() as i64,
            damage: p.damage,
            defense: p.defense,
            speed: p.speed,
            xp: p.xp,
            level: p.level,
            coins: p.coins,
            weapon: p.weapon.clone(),
            armor: p.armor.clone(),
            completed_rooms: self.completed_rooms.iter().cloned().collect(),
            collected_items: self.collected_items.iter().cloned().collect(),
        }
    }

    /// Rebuild a session from a snapshot, clamping anything out of range
    pub fn restore(snapshot: PlayerSnapshot) -> Self {
        let speed = if snapshot.speed.is_finite() && snapshot.speed >= 0.0 {
            snapshot.speed
        } else {
            PLAYER_SPEED
        };
        let player = PlayerProfile {
            health: Health::from_parts(snapshot.health, snapshot.max_health),
            damage: snapshot.damage,
            defense: snapshot.defense,
            speed,
            xp: snapshot.xp,
            level: snapshot.level.max(1),
            coins: snapshot.coins,
            weapon: snapshot.weapon,
            armor: snapshot.armor,
        };
        Self {
            player,
            completed_rooms: snapshot.completed_rooms.into_iter().collect(),
            collected_items: snapshot.collected_items.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_up_at_threshold() {
        let mut p = PlayerProfile::default();
        assert_eq!(p.add_xp(9), 0);
        assert_eq!(p.level, 1);
        assert_eq!(p.add_xp(1), 1);
        assert_eq!(p.level, 2);
        assert_eq!(p.health.max(), 8);
        assert!(p.health.is_full());
    }

    #[test]
    fn test_big_award_crosses_several_levels() {
        let mut p = PlayerProfile::default();
        // Thresholds 10, 20, 30 on cumulative XP
        assert_eq!(p.add_xp(95), 9);
        assert_eq!(p.level, 10);
        assert_eq!(p.health.max(), PLAYER_MAX_HEALTH + 9 * LEVEL_UP_HEALTH);
    }

    #[test]
    fn test_level_up_heals() {
        let mut p = PlayerProfile::default();
        p.health.damage(4);
        p.add_xp(10);
        assert_eq!(p.health.current(), p.health.max());
    }

    #[test]
    fn test_heal_clamps() {
        let mut p = PlayerProfile::default();
        p.health.damage(2);
        assert_eq!(p.heal(10), 2);
        assert!(p.health.is_full());
    }

    #[test]
    fn test_equip_sets_stats() {
        let mut p = PlayerProfile::default();
        p.equip_weapon(Weapon {
            damage: 3,
            ..Weapon::default()
        });
        assert_eq!(p.damage, 3);
        p.equip_armor(Armor {
            name: "Leather".to_string(),
            defense: 1,
        });
        assert_eq!(p.defense, 1);
    }

    #[test]
    fn test_snapshot_restore() {
        let mut session = Session::default();
        session.player.add_coins(7);
        session.player.health.damage(1);
        session.mark_room_complete("cave");
        session.mark_item_collected("cave", 2);

        let json = session.snapshot().to_json().unwrap();
        let restored = Session::restore(PlayerSnapshot::from_json(&json).unwrap());
        assert_eq!(restored, session);
        assert!(restored.is_item_collected("cave", 2));
        assert!(!restored.is_item_collected("cave", 0));
    }

    #[test]
    fn test_restore_clamps_broken_snapshot() {
        let mut snap = Session::default().snapshot();
        snap.health = -3;
        snap.max_health = 0;
        snap.level = 0;
        snap.speed = f32::NAN;
        let session = Session::restore(snap);
        assert_eq!(session.player.health.max(), 1);
        assert_eq!(session.player.health.current(), 0);
        assert_eq!(session.player.level, 1);
        assert_eq!(session.player.speed, PLAYER_SPEED);
    }
}

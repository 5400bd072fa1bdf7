//! Entity types and core simulation state
//!
//! Entities refer to each other through [`EntityId`] handles, never through
//! owning pointers: an agent's target or a projectile's owner is looked up in
//! the room each frame and simply fails to resolve once the entity is gone.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::aabb::{Aabb, Hitbox};
use super::pickup::ItemKind;
use crate::Direction;
use crate::session::PlayerProfile;

/// Handle to a mobile entity in a room
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub u32);

/// The player always carries this id
pub const PLAYER_ID: EntityId = EntityId(0);

/// Closed set of entity kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityKind {
    Player,
    Enemy,
    Boss,
    Projectile,
    Block,
}

/// What an entity can do in combat
pub trait Capabilities {
    fn has_health(&self) -> bool;
    fn is_hostile(&self) -> bool;
    fn is_boss(&self) -> bool;
}

impl Capabilities for EntityKind {
    fn has_health(&self) -> bool {
        matches!(self, EntityKind::Player | EntityKind::Enemy | EntityKind::Boss)
    }

    fn is_hostile(&self) -> bool {
        matches!(self, EntityKind::Enemy | EntityKind::Boss)
    }

    fn is_boss(&self) -> bool {
        matches!(self, EntityKind::Boss)
    }
}

/// Position, hitbox and the intend/commit/cancel movement slot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Body {
    pub pos: Vec2,
    pub hitbox: Hitbox,
    /// Proposed position for this frame; cleared on commit or cancel
    #[serde(skip)]
    pub intended: Option<Vec2>,
    #[serde(skip)]
    pub is_moving: bool,
}

impl Body {
    pub fn new(pos: Vec2, hitbox: Hitbox) -> Self {
        Self {
            pos,
            hitbox,
            intended: None,
            is_moving: false,
        }
    }

    /// Hitbox at the current position
    #[inline]
    pub fn bounds(&self) -> Aabb {
        self.hitbox.at(self.pos)
    }

    /// Where the entity would be after this frame
    #[inline]
    pub fn intended_position(&self) -> Vec2 {
        self.intended.unwrap_or(self.pos)
    }

    /// Hitbox at the intended position
    #[inline]
    pub fn intended_bounds(&self) -> Aabb {
        self.hitbox.at(self.intended_position())
    }

    /// Propose a new position
    pub fn intend(&mut self, target: Vec2) {
        self.intended = Some(target);
        self.is_moving = true;
    }

    /// Propose a move of `distance` along `dir`
    pub fn intend_step(&mut self, dir: Direction, distance: f32) {
        self.intend(crate::step(self.pos, dir, distance));
    }

    /// Accept the proposal
    pub fn commit(&mut self) {
        if let Some(target) = self.intended.take() {
            self.pos = target;
        }
    }

    /// Reject the proposal; the entity stays put for this frame
    pub fn cancel(&mut self) {
        self.intended = None;
        self.is_moving = false;
    }
}

/// Integer health, always within `[0, max]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Health {
    current: u32,
    max: u32,
}

impl Health {
    /// Full health pool; `max` floors at 1
    pub fn new(max: u32) -> Self {
        let max = max.max(1);
        Self { current: max, max }
    }

    /// Build from possibly-broken values (content, saves)
    pub fn from_parts(current: i64, max: i64) -> Self {
        let max = max.clamp(1, u32::MAX as i64) as u32;
        let current = current.clamp(0, max as i64) as u32;
        Self { current, max }
    }

    #[inline]
    pub fn current(&self) -> u32 {
        self.current
    }

    #[inline]
    pub fn max(&self) -> u32 {
        self.max
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.current == self.max
    }

    #[inline]
    pub fn is_depleted(&self) -> bool {
        self.current == 0
    }

    /// Subtract `amount`, flooring at zero. Returns the damage actually taken.
    pub fn damage(&mut self, amount: u32) -> u32 {
        let before = self.current;
        self.current = self.current.saturating_sub(amount);
        before - self.current
    }

    /// Add `amount`, capped at max. Returns the amount actually healed.
    pub fn heal(&mut self, amount: u32) -> u32 {
        let before = self.current;
        self.current = self.current.saturating_add(amount).min(self.max);
        self.current - before
    }

    pub fn refill(&mut self) {
        self.current = self.max;
    }

    /// Raise max health without healing
    pub fn raise_max(&mut self, amount: u32) {
        self.max = self.max.saturating_add(amount);
    }
}

/// Hostile agent AI state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AiState {
    #[default]
    Idle,
    Chase,
    Attack,
    Defeated,
}

/// Boss attack pattern, fixed per boss
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttackPattern {
    #[default]
    Aggressive,
    Defensive,
    Ranged,
    Teleport,
}

/// Number of pattern states a boss cycles through
pub const PATTERN_STATES: u8 = 3;

/// Extra state carried by bosses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BossBrain {
    pub pattern: AttackPattern,
    /// Cycles 0..PATTERN_STATES on a fixed interval
    pub pattern_state: u8,
    /// Seconds since the last pattern-state advance
    pub pattern_timer: f32,
    /// Set when pattern_state wraps to 0 and cleared when it leaves 0;
    /// consumed by the teleport pattern
    pub cycle_fresh: bool,
}

impl BossBrain {
    pub fn new(pattern: AttackPattern) -> Self {
        Self {
            pattern,
            pattern_state: 0,
            pattern_timer: 0.0,
            cycle_fresh: true,
        }
    }

    /// Advance the pattern timer. Once `interval` has elapsed the state steps
    /// by exactly one (mod 3) and the timer resets, however large `dt` was.
    pub fn advance(&mut self, dt: f32, interval: f32) -> bool {
        self.pattern_timer += dt;
        if self.pattern_timer >= interval {
            self.pattern_timer = 0.0;
            self.pattern_state = (self.pattern_state + 1) % PATTERN_STATES;
            self.cycle_fresh = self.pattern_state == 0;
            return true;
        }
        false
    }

    /// True at most once per cycle, and only while still in state 0
    pub fn take_cycle_start(&mut self) -> bool {
        self.pattern_state == 0 && std::mem::take(&mut self.cycle_fresh)
    }
}

/// Combat stats of a hostile agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentStats {
    pub damage: u32,
    pub attack_range: f32,
    pub aggro_range: f32,
    pub speed: f32,
    /// Seconds between attacks
    pub attack_cooldown: f32,
    pub xp_reward: u32,
}

/// A hostile agent (regular enemy or boss)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub id: EntityId,
    /// Enemy type name from content
    pub type_name: String,
    pub body: Body,
    pub health: Health,
    pub stats: AgentStats,
    pub ai_state: AiState,
    /// Non-owning reference to the agent's target
    pub target: Option<EntityId>,
    /// Seconds until the next attack is allowed
    pub attack_ready_in: f32,
    /// Defeated agents stop threatening and ignore damage
    pub friendly: bool,
    /// Cleared on defeat; inactive agents are skipped by every system
    pub active: bool,
    /// Countdown to removal after defeat
    pub removal_in: Option<f32>,
    pub boss: Option<BossBrain>,
}

impl Agent {
    pub fn kind(&self) -> EntityKind {
        if self.boss.is_some() {
            EntityKind::Boss
        } else {
            EntityKind::Enemy
        }
    }

    #[inline]
    pub fn is_boss(&self) -> bool {
        self.kind().is_boss()
    }

    /// Alive, active and still hostile
    #[inline]
    pub fn is_threat(&self) -> bool {
        self.active && !self.friendly
    }

    #[inline]
    pub fn attack_ready(&self) -> bool {
        self.attack_ready_in <= 0.0
    }

    /// Start the attack cooldown
    pub fn spend_attack(&mut self) {
        self.attack_ready_in = self.stats.attack_cooldown.max(0.0);
    }

    /// Count down attack and removal timers
    pub fn tick_timers(&mut self, dt: f32) {
        if self.attack_ready_in > 0.0 {
            self.attack_ready_in = (self.attack_ready_in - dt).max(0.0);
        }
        if let Some(left) = self.removal_in.as_mut() {
            *left -= dt;
        }
    }

    /// Ready to be dropped from the room
    pub fn is_expired(&self) -> bool {
        matches!(self.removal_in, Some(left) if left <= 0.0)
    }
}

/// The player inside a room
#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    pub body: Body,
    pub facing: Direction,
    /// Health, stats and inventory that outlive the room
    pub profile: PlayerProfile,
    /// Seconds until the next melee or throw is allowed
    pub attack_ready_in: f32,
    /// Pending respawn countdown while defeated
    pub respawn_in: Option<f32>,
}

impl Player {
    pub fn new(pos: Vec2, profile: PlayerProfile) -> Self {
        Self {
            body: Body::new(pos, Hitbox::square(crate::consts::PLAYER_HITBOX)),
            facing: Direction::Down,
            profile,
            attack_ready_in: 0.0,
            respawn_in: None,
        }
    }

    #[inline]
    pub fn pos(&self) -> Vec2 {
        self.body.pos
    }

    #[inline]
    pub fn is_defeated(&self) -> bool {
        self.respawn_in.is_some()
    }

    #[inline]
    pub fn attack_ready(&self) -> bool {
        self.attack_ready_in <= 0.0
    }

    /// Set the facing and propose a step at the player's speed
    pub fn intend_move(&mut self, dir: Direction, dt: f32) {
        self.facing = dir;
        let distance = self.profile.speed * dt;
        self.body.intend_step(dir, distance);
    }

    /// Take a hit, reduced by defense but never below one point.
    /// Returns true if this hit took the player to zero.
    pub fn take_hit(&mut self, amount: u32) -> bool {
        if self.is_defeated() || self.profile.health.is_depleted() {
            return false;
        }
        let actual = amount.saturating_sub(self.profile.defense).max(1);
        self.profile.health.damage(actual);
        self.profile.health.is_depleted()
    }
}

/// Box the player shoves around; no AI of its own
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushableBlock {
    pub id: EntityId,
    pub body: Body,
}

impl PushableBlock {
    /// Block occupying `bounds` (position is the box center)
    pub fn from_bounds(id: EntityId, bounds: Aabb) -> Self {
        let bounds = bounds.sanitized();
        Self {
            id,
            body: Body::new(
                bounds.center(),
                Hitbox {
                    width: bounds.width,
                    height: bounds.height,
                    offset: Vec2::ZERO,
                },
            ),
        }
    }

    pub fn center(&self) -> Vec2 {
        self.body.bounds().center()
    }
}

/// Pressure plate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Switch {
    pub id: u32,
    pub bounds: Aabb,
    pub activated: bool,
    /// Mechanism id of the door(s) this switch drives
    pub target: Option<String>,
}

/// Exit from a room
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Door {
    pub id: u32,
    pub bounds: Aabb,
    pub direction: Direction,
    pub locked: bool,
    /// Room the door leads to
    pub destination: String,
    /// Switch mechanism id controlling the lock
    pub mechanism: Option<String>,
    /// Opened by room completion; switches can no longer re-lock it
    pub forced_open: bool,
}

impl Door {
    #[inline]
    pub fn is_passable(&self) -> bool {
        !self.locked
    }
}

/// Per-room completion goal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Objective {
    DefeatAllEnemies,
    ActivateAllSwitches,
    DefeatBoss,
    #[default]
    None,
}

/// Events surfaced to the scene/UI collaborators
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    /// An agent was driven to zero health
    EnemyDefeated {
        agent: EntityId,
        xp_reward: u32,
        boss: bool,
    },
    /// The player crossed one or more level thresholds
    LevelUp { level: u32 },
    /// Room objective satisfied; all doors forced open
    ObjectiveComplete { room: String },
    /// A switch changed state
    SwitchChanged { switch: u32, activated: bool },
    /// The player walked through an open door
    RoomTransition {
        destination: String,
        direction: Direction,
    },
    PlayerDefeated,
    PlayerRespawned,
    /// The player picked up a collectible
    ItemCollected { item: EntityId, kind: ItemKind },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_clamps() {
        let mut h = Health::new(3);
        assert_eq!(h.damage(5), 3);
        assert_eq!(h.current(), 0);
        assert!(h.is_depleted());
        assert_eq!(h.heal(10), 3);
        assert!(h.is_full());
    }

    #[test]
    fn test_health_from_broken_parts() {
        let h = Health::from_parts(-4, 0);
        assert_eq!(h.max(), 1);
        assert_eq!(h.current(), 0);
        let h = Health::from_parts(50, 6);
        assert_eq!(h.current(), 6);
    }

    #[test]
    fn test_body_commit_and_cancel() {
        let mut body = Body::new(Vec2::ZERO, Hitbox::square(10.0));
        body.intend_step(Direction::Right, 5.0);
        assert!(body.is_moving);
        assert_eq!(body.intended_position(), Vec2::new(5.0, 0.0));
        body.commit();
        assert_eq!(body.pos, Vec2::new(5.0, 0.0));
        assert!(body.intended.is_none());

        body.intend_step(Direction::Up, 5.0);
        body.cancel();
        assert_eq!(body.pos, Vec2::new(5.0, 0.0));
        assert!(!body.is_moving);
        assert!(body.intended.is_none());
    }

    #[test]
    fn test_kind_capabilities() {
        assert!(EntityKind::Boss.is_hostile());
        assert!(EntityKind::Boss.is_boss());
        assert!(!EntityKind::Enemy.is_boss());
        assert!(EntityKind::Player.has_health());
        assert!(!EntityKind::Player.is_hostile());
        assert!(!EntityKind::Block.has_health());
    }

    #[test]
    fn test_boss_pattern_advances_once_per_interval() {
        let mut brain = BossBrain::new(AttackPattern::Defensive);
        assert!(brain.take_cycle_start());
        assert!(!brain.advance(1.5, 2.0));
        assert_eq!(brain.pattern_state, 0);
        assert!(brain.advance(0.5, 2.0));
        assert_eq!(brain.pattern_state, 1);
        // A huge delta still advances a single step
        assert!(brain.advance(100.0, 2.0));
        assert_eq!(brain.pattern_state, 2);
        assert!(brain.advance(2.0, 2.0));
        assert_eq!(brain.pattern_state, 0);
        assert!(brain.take_cycle_start());
        assert!(!brain.take_cycle_start());
    }

    #[test]
    fn test_unclaimed_cycle_start_lapses() {
        let mut brain = BossBrain::new(AttackPattern::Teleport);
        // Nobody claims the start before the state moves on
        brain.advance(2.0, 2.0);
        assert_eq!(brain.pattern_state, 1);
        assert!(!brain.take_cycle_start());
        brain.advance(2.0, 2.0);
        assert!(!brain.take_cycle_start());
        brain.advance(2.0, 2.0);
        assert_eq!(brain.pattern_state, 0);
        assert!(brain.take_cycle_start());
    }
}

//! Combat resolution
//!
//! Melee swings produce a short-lived hitbox in front of the attacker that
//! damages every hostile it overlaps. Thrown weapons become projectiles that
//! fly out, turn around at max range (or on their first hit) and home back
//! onto their owner's current position.
//!
//! Kills are reported exactly once: only the hit that takes health from
//! positive to zero produces a [`Kill`].

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::aabb::{Aabb, Hitbox, overlaps};
use super::state::{Agent, AiState, Body, EntityId, Player};
use crate::Direction;
use crate::consts::PROJECTILE_HITBOX;
use crate::tuning::Tuning;

/// Weapon properties
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Weapon {
    pub name: String,
    pub damage: u32,
    /// Distance from the attacker's center to the melee hitbox center
    pub range: f32,
    /// Seconds between swings
    pub attack_cooldown: f32,
    pub can_throw: bool,
    pub projectile_speed: f32,
    /// Outbound distance before a thrown weapon turns around
    pub projectile_range: f32,
}

impl Default for Weapon {
    fn default() -> Self {
        Self {
            name: "Basic Weapon".to_string(),
            damage: 1,
            range: 40.0,
            attack_cooldown: 0.5,
            can_throw: true,
            projectile_speed: 200.0,
            projectile_range: 300.0,
        }
    }
}

impl Weapon {
    /// Bare hands: weak, short, cannot be thrown
    pub fn fists() -> Self {
        Self {
            name: "Fists".to_string(),
            damage: 1,
            range: 35.0,
            can_throw: false,
            ..Self::default()
        }
    }

    /// Hitbox `range` units from `origin` along `facing`
    pub fn melee_hitbox(&self, origin: Vec2, facing: Direction, size: f32, lifetime: f32) -> MeleeHitbox {
        let center = crate::step(origin, facing, self.range);
        MeleeHitbox {
            bounds: Aabb::centered(center, size, size),
            damage: self.damage,
            direction: facing,
            lifetime_left: lifetime,
            struck: Vec::new(),
        }
    }

    /// Launch this weapon as a projectile. `None` if it cannot be thrown.
    pub fn throw(&self, id: EntityId, origin: Vec2, facing: Direction, owner: EntityId) -> Option<Projectile> {
        if !self.can_throw {
            return None;
        }
        Some(Projectile {
            id,
            body: Body::new(origin, Hitbox::square(PROJECTILE_HITBOX)),
            direction: facing,
            speed: self.projectile_speed.max(0.0),
            max_distance: self.projectile_range.max(0.0),
            traveled: 0.0,
            returning: false,
            owner: Some(owner),
            damage: self.damage,
            active: true,
        })
    }
}

/// Transient melee attack area
#[derive(Debug, Clone, PartialEq)]
pub struct MeleeHitbox {
    pub bounds: Aabb,
    pub damage: u32,
    pub direction: Direction,
    /// Seconds until the hitbox is discarded
    pub lifetime_left: f32,
    /// Agents already damaged by this swing
    pub struck: Vec<EntityId>,
}

impl MeleeHitbox {
    pub fn tick(&mut self, dt: f32) {
        self.lifetime_left -= dt;
    }

    pub fn is_expired(&self) -> bool {
        self.lifetime_left <= 0.0
    }
}

/// A thrown weapon in flight
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projectile {
    pub id: EntityId,
    pub body: Body,
    pub direction: Direction,
    pub speed: f32,
    pub max_distance: f32,
    /// Distance covered on the outbound leg
    pub traveled: f32,
    pub returning: bool,
    /// Non-owning reference to the thrower
    pub owner: Option<EntityId>,
    pub damage: u32,
    pub active: bool,
}

impl Projectile {
    /// Fly for `dt` seconds. Outbound: straight line, flipping to returning at
    /// max range. Returning: home on `owner_pos` and deactivate once within
    /// `catch_radius`. An unresolvable owner ends the flight.
    ///
    /// Returns true if the projectile was caught this frame.
    pub fn update(&mut self, dt: f32, owner_pos: Option<Vec2>, catch_radius: f32) -> bool {
        if !self.active {
            return false;
        }
        let distance = self.speed * dt;

        if !self.returning {
            self.body.pos += self.direction.unit() * distance;
            self.traveled += distance;
            if self.traveled >= self.max_distance {
                self.returning = true;
            }
            return false;
        }

        let Some(owner) = owner_pos else {
            self.active = false;
            return false;
        };
        let to_owner = owner - self.body.pos;
        let gap = to_owner.length();
        if gap < catch_radius {
            self.active = false;
            return true;
        }
        self.body.pos += to_owner / gap * distance.min(gap);
        if owner.distance(self.body.pos) < catch_radius {
            self.active = false;
            return true;
        }
        false
    }

    /// Turn around (hit something or out of range)
    pub fn start_returning(&mut self) {
        self.returning = true;
    }
}

/// A defeated agent, reported once
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Kill {
    pub agent: EntityId,
    pub xp_reward: u32,
    pub boss: bool,
}

/// Subtract `amount` from an agent. Fires a [`Kill`] only on the hit that
/// crosses from positive health to zero; defeated or inactive agents ignore
/// further damage.
pub fn apply_damage(agent: &mut Agent, amount: u32, removal_delay: f32) -> Option<Kill> {
    if !agent.is_threat() {
        return None;
    }
    let before = agent.health.current();
    agent.health.damage(amount);
    if before > 0 && agent.health.is_depleted() {
        defeat(agent, removal_delay);
        return Some(Kill {
            agent: agent.id,
            xp_reward: agent.stats.xp_reward,
            boss: agent.is_boss(),
        });
    }
    None
}

/// Terminal transition: defeated, friendly, scheduled for removal
fn defeat(agent: &mut Agent, removal_delay: f32) {
    agent.ai_state = AiState::Defeated;
    agent.friendly = true;
    agent.active = false;
    agent.removal_in = Some(removal_delay.max(0.0));
    agent.body.cancel();
    if agent.is_boss() {
        log::info!("Boss {} ({}) defeated", agent.type_name, agent.id.0);
    }
}

/// Test a melee hitbox against every live agent. All overlapping agents are
/// damaged; each agent at most once per swing.
pub fn resolve_melee(hitbox: &mut MeleeHitbox, agents: &mut [Agent], removal_delay: f32) -> Vec<Kill> {
    let mut kills = Vec::new();
    for agent in agents.iter_mut() {
        if !agent.is_threat() || hitbox.struck.contains(&agent.id) {
            continue;
        }
        if overlaps(&hitbox.bounds, &agent.body.bounds()) {
            hitbox.struck.push(agent.id);
            if let Some(kill) = apply_damage(agent, hitbox.damage, removal_delay) {
                kills.push(kill);
            }
        }
    }
    kills
}

/// Result of a projectile connecting with an agent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProjectileHit {
    pub agent: EntityId,
    pub kill: Option<Kill>,
}

/// Outbound projectiles damage the first live agent they overlap, then turn
/// around. Returning projectiles never damage.
pub fn resolve_projectile(
    projectile: &mut Projectile,
    agents: &mut [Agent],
    removal_delay: f32,
) -> Option<ProjectileHit> {
    if !projectile.active || projectile.returning {
        return None;
    }
    let area = projectile.body.bounds();
    let agent = agents
        .iter_mut()
        .find(|a| a.is_threat() && overlaps(&area, &a.body.bounds()))?;
    let kill = apply_damage(agent, projectile.damage, removal_delay);
    projectile.start_returning();
    Some(ProjectileHit { agent: agent.id, kill })
}

/// The weapon the player swings or throws
pub fn active_weapon(player: &Player) -> Weapon {
    player.profile.weapon.clone().unwrap_or_else(Weapon::fists)
}

/// Swing the active weapon if the attack cooldown allows. The hit carries
/// the player's damage stat, which equipping a weapon sets.
pub fn player_melee(player: &mut Player, tuning: &Tuning) -> Option<MeleeHitbox> {
    if player.is_defeated() || !player.attack_ready() {
        return None;
    }
    let weapon = active_weapon(player);
    player.attack_ready_in = cooldown(&weapon, tuning);
    let hitbox = weapon.melee_hitbox(
        player.body.pos,
        player.facing,
        tuning.melee_hitbox_size,
        tuning.melee_lifetime,
    );
    Some(MeleeHitbox {
        damage: player.profile.damage,
        ..hitbox
    })
}

/// Throw the active weapon. Only allowed at full health, off cooldown, with a
/// throwable weapon.
pub fn player_throw(player: &mut Player, id: EntityId, owner: EntityId, tuning: &Tuning) -> Option<Projectile> {
    if player.is_defeated() || !player.profile.health.is_full() || !player.attack_ready() {
        return None;
    }
    let weapon = active_weapon(player);
    let projectile = weapon.throw(id, player.body.pos, player.facing, owner)?;
    player.attack_ready_in = cooldown(&weapon, tuning);
    Some(Projectile {
        damage: player.profile.damage,
        ..projectile
    })
}

/// Slow weapons can stretch the player's cooldown, never shorten it
fn cooldown(weapon: &Weapon, tuning: &Tuning) -> f32 {
    weapon.attack_cooldown.max(tuning.player_attack_cooldown).max(0.0)
}

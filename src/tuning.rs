//! Data-driven game balance
//!
//! Every timer and distance the simulation consults lives here so a level
//! designer can tweak feel without touching code. Loaded from JSON; absent
//! fields fall back to [`Tuning::default`].

use serde::{Deserialize, Serialize};

/// Balance levers for one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    // === Spatial index ===
    /// Edge length of a spatial grid cell (world units)
    pub cell_size: f32,

    // === Player combat ===
    /// Melee hitbox edge length
    pub melee_hitbox_size: f32,
    /// How long a melee hitbox stays live (seconds)
    pub melee_lifetime: f32,
    /// Player attack cooldown (seconds)
    pub player_attack_cooldown: f32,
    /// Projectile is caught when this close to its owner
    pub projectile_return_radius: f32,
    /// Delay before a defeated player respawns (seconds)
    pub respawn_delay: f32,

    // === Agents ===
    /// Delay between defeat and removal from the room (seconds)
    pub defeat_removal_delay: f32,
    /// Boss pattern-state advance interval (seconds)
    pub boss_pattern_interval: f32,
    /// Ranged bosses retreat when closer than this
    pub ranged_min_distance: f32,
    /// Ranged bosses advance when farther than this
    pub ranged_max_distance: f32,
    /// Teleporting bosses land at least this far from the target
    pub teleport_min_distance: f32,
    /// Teleporting bosses land at most this far from the target
    pub teleport_max_distance: f32,
    /// Landing spots sampled before a teleport gives up
    pub teleport_attempts: u32,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            cell_size: 128.0,

            melee_hitbox_size: 32.0,
            melee_lifetime: 0.1,
            player_attack_cooldown: 0.5,
            projectile_return_radius: 20.0,
            respawn_delay: 2.0,

            defeat_removal_delay: 0.5,
            boss_pattern_interval: 2.0,
            ranged_min_distance: 150.0,
            ranged_max_distance: 200.0,
            teleport_min_distance: 100.0,
            teleport_max_distance: 200.0,
            teleport_attempts: 8,
        }
    }
}

impl Tuning {
    /// Parse tuning from JSON, keeping defaults for anything unspecified
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let tuning: Self = serde_json::from_str(json)?;
        Ok(tuning.sanitized())
    }

    /// Clamp values that would break the simulation (zero cells, inverted bands)
    pub fn sanitized(mut self) -> Self {
        if !(self.cell_size.is_finite() && self.cell_size >= 1.0) {
            log::warn!("cell_size {} is unusable, using 128", self.cell_size);
            self.cell_size = 128.0;
        }
        self.melee_hitbox_size = self.melee_hitbox_size.max(1.0);
        if self.ranged_max_distance < self.ranged_min_distance {
            std::mem::swap(&mut self.ranged_min_distance, &mut self.ranged_max_distance);
        }
        if self.teleport_max_distance < self.teleport_min_distance {
            std::mem::swap(&mut self.teleport_min_distance, &mut self.teleport_max_distance);
        }
        self.teleport_attempts = self.teleport_attempts.max(1);
        self
    }
}

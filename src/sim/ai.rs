//! Agent behavior
//!
//! Every live agent re-derives its state each frame from the current
//! distance to its target: idle out of aggro range, chase inside it, attack
//! inside attack range. Nothing is cached, so agents near a boundary may
//! flip between states frame to frame.
//!
//! Bosses layer a pattern on top. Their pattern state cycles 0, 1, 2 on a
//! fixed interval and the configured [`AttackPattern`] decides how that
//! state shapes positioning before falling back to chase/attack.
//!
//! This module only proposes movement (via `Body::intend`); the movement
//! resolver decides whether it happens. Attacks are carried out by the
//! frame driver for agents left in [`AiState::Attack`] whose target is
//! inside their attack range. A ranged boss holding its standoff band is
//! in attack state but out of reach.

use std::f32::consts::TAU;

use glam::Vec2;
use rand::Rng;
use rand_pcg::Pcg32;

use super::collision::would_collide_at;
use super::spatial::SpatialIndex;
use super::state::{Agent, AiState, AttackPattern};
use crate::tuning::Tuning;

/// Run one frame of AI for `agent`. `target` is the resolved position of the
/// agent's target, `None` if it has none or it could not be resolved.
pub fn think(
    agent: &mut Agent,
    target: Option<Vec2>,
    dt: f32,
    tuning: &Tuning,
    index: &SpatialIndex,
    rng: &mut Pcg32,
) {
    if !agent.is_threat() {
        return;
    }
    let pattern = match agent.boss.as_mut() {
        Some(brain) => {
            brain.advance(dt, tuning.boss_pattern_interval);
            Some(brain.pattern)
        }
        None => None,
    };

    let Some(target) = target else {
        agent.ai_state = AiState::Idle;
        return;
    };

    match pattern {
        None | Some(AttackPattern::Aggressive) => base_behavior(agent, target, dt),
        Some(AttackPattern::Defensive) => defensive(agent, target, dt),
        Some(AttackPattern::Ranged) => ranged(agent, target, dt, tuning),
        Some(AttackPattern::Teleport) => {
            let cycle_start = agent.boss.as_mut().is_some_and(|b| b.take_cycle_start());
            if cycle_start {
                teleport(agent, target, tuning, index, rng);
            }
            engage(agent, target, dt);
        }
    }
}

/// Idle/chase/attack from live distance, honoring aggro range
pub fn base_behavior(agent: &mut Agent, target: Vec2, dt: f32) {
    let distance = agent.body.pos.distance(target);
    if distance > agent.stats.aggro_range {
        agent.ai_state = AiState::Idle;
        agent.body.cancel();
    } else {
        engage(agent, target, dt);
    }
}

/// Chase until in attack range, then attack. No aggro check.
fn engage(agent: &mut Agent, target: Vec2, dt: f32) {
    let distance = agent.body.pos.distance(target);
    if distance <= agent.stats.attack_range {
        agent.ai_state = AiState::Attack;
        agent.body.cancel();
    } else {
        agent.ai_state = AiState::Chase;
        move_along(agent, target - agent.body.pos, dt);
    }
}

/// Circle the target during pattern state 0
fn defensive(agent: &mut Agent, target: Vec2, dt: f32) {
    let circling = agent.boss.as_ref().is_some_and(|b| b.pattern_state == 0);
    if circling {
        agent.ai_state = AiState::Chase;
        let tangent = (target - agent.body.pos).normalize_or_zero().perp();
        move_along(agent, tangent, dt);
    } else {
        engage(agent, target, dt);
    }
}

/// Hold the standoff band: back off when too close, close in when too far
fn ranged(agent: &mut Agent, target: Vec2, dt: f32, tuning: &Tuning) {
    let to_target = target - agent.body.pos;
    let distance = to_target.length();
    if distance < tuning.ranged_min_distance {
        agent.ai_state = AiState::Chase;
        move_along(agent, -to_target, dt);
    } else if distance > tuning.ranged_max_distance {
        agent.ai_state = AiState::Chase;
        move_along(agent, to_target, dt);
    } else {
        agent.ai_state = AiState::Attack;
        agent.body.cancel();
    }
}

/// Relocate to a random free spot in the teleport band around `target`.
/// Spots inside obstacles are rejected; if every attempt fails the agent
/// stays where it is.
pub fn teleport(agent: &mut Agent, target: Vec2, tuning: &Tuning, index: &SpatialIndex, rng: &mut Pcg32) -> bool {
    let (min, max) = (tuning.teleport_min_distance, tuning.teleport_max_distance);
    for attempt in 0..tuning.teleport_attempts {
        let angle = rng.random_range(0.0..TAU);
        let radius = rng.random_range(min..=max);
        let spot = target + Vec2::from_angle(angle) * radius;
        if would_collide_at(index, &agent.body.hitbox, spot) {
            log::debug!("Teleport attempt {} for agent {} blocked at {:?}", attempt, agent.id.0, spot);
            continue;
        }
        agent.body.cancel();
        agent.body.pos = spot;
        return true;
    }
    log::debug!("Agent {} found no free teleport spot", agent.id.0);
    false
}

/// Propose a step of `speed * dt` along `heading`
fn move_along(agent: &mut Agent, heading: Vec2, dt: f32) {
    let dir = heading.normalize_or_zero();
    if dir == Vec2::ZERO {
        agent.body.cancel();
        return;
    }
    let next = agent.body.pos + dir * agent.stats.speed * dt;
    agent.body.intend(next);
}

//! Movement resolution
//!
//! Entities propose a position during input/AI; this module accepts or
//! rejects each proposal as a whole. There is no sliding: a blocked move is
//! cancelled outright and the entity stays where it was this frame.
//!
//! The player can shove a single pushable block. The block moves the same
//! distance in the player's facing direction, and the two moves stand or
//! fall together.

use super::aabb::{Aabb, overlaps};
use super::collision::first_obstacle_hit;
use super::spatial::SpatialIndex;
use super::state::{Agent, Door, EntityId, Player, PushableBlock};

/// What happened to the player's proposal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    /// Nothing was proposed
    Stationary,
    Moved,
    Blocked,
    /// Moved and pushed this block along
    Pushed(EntityId),
    /// The block could not move, so neither did the player
    PushBlocked(EntityId),
}

fn hits_locked_door(doors: &[Door], area: &Aabb) -> bool {
    doors.iter().any(|d| d.locked && overlaps(area, &d.bounds))
}

/// Resolve the player's proposal against obstacles, locked doors and blocks.
/// `agents` only matter to a pushed block.
pub fn resolve_player(
    player: &mut Player,
    blocks: &mut [PushableBlock],
    doors: &[Door],
    agents: &[Agent],
    index: &SpatialIndex,
) -> MoveOutcome {
    let Some(intended) = player.body.intended else {
        return MoveOutcome::Stationary;
    };
    let area = player.body.intended_bounds();
    if first_obstacle_hit(index, &area).is_some() || hits_locked_door(doors, &area) {
        player.body.cancel();
        return MoveOutcome::Blocked;
    }

    let touching: Vec<usize> = blocks
        .iter()
        .enumerate()
        .filter(|(_, b)| overlaps(&area, &b.body.bounds()))
        .map(|(i, _)| i)
        .collect();

    match touching.as_slice() {
        [] => {
            player.body.commit();
            MoveOutcome::Moved
        }
        [i] => {
            let i = *i;
            let distance = player.body.pos.distance(intended);
            let id = blocks[i].id;
            blocks[i].body.intend_step(player.facing, distance);
            if block_move_clear(i, blocks, doors, agents, index) {
                blocks[i].body.commit();
                player.body.commit();
                MoveOutcome::Pushed(id)
            } else {
                log::debug!("Push blocked for block {}", id.0);
                blocks[i].body.cancel();
                player.body.cancel();
                MoveOutcome::PushBlocked(id)
            }
        }
        _ => {
            player.body.cancel();
            MoveOutcome::Blocked
        }
    }
}

/// Block `i`'s proposal is clear of obstacles, locked doors, live agents and
/// every other block
fn block_move_clear(
    i: usize,
    blocks: &[PushableBlock],
    doors: &[Door],
    agents: &[Agent],
    index: &SpatialIndex,
) -> bool {
    let area = blocks[i].body.intended_bounds();
    if first_obstacle_hit(index, &area).is_some() || hits_locked_door(doors, &area) {
        return false;
    }
    if agents.iter().any(|a| a.is_threat() && overlaps(&area, &a.body.bounds())) {
        return false;
    }
    !blocks
        .iter()
        .enumerate()
        .any(|(j, other)| j != i && overlaps(&area, &other.body.bounds()))
}

/// Resolve an agent's proposal against obstacles, locked doors and blocks
pub fn resolve_agent(agent: &mut Agent, blocks: &[PushableBlock], doors: &[Door], index: &SpatialIndex) -> bool {
    if agent.body.intended.is_none() {
        return false;
    }
    let area = agent.body.intended_bounds();
    let blocked = first_obstacle_hit(index, &area).is_some()
        || hits_locked_door(doors, &area)
        || blocks.iter().any(|b| overlaps(&area, &b.body.bounds()));
    if blocked {
        agent.body.cancel();
        false
    } else {
        agent.body.commit();
        true
    }
}

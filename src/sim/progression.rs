//! Room progression
//!
//! Switches are level-triggered: every frame each switch is re-derived from
//! whether any pushable block's center sits on it, and only a change of
//! state touches the doors it drives. A door stays unlocked while at least
//! one switch driving its mechanism is pressed.
//!
//! The room objective is polled every frame until it first holds, then all
//! doors are forced open for good. Boss rooms skip the poll and complete
//! straight from the boss kill.

use super::aabb::{Aabb, overlaps};
use super::combat::Kill;
use super::state::{Agent, Door, Objective, PushableBlock, Switch};

/// Re-derive every switch from block positions and re-lock or unlock the
/// doors behind any switch that changed. Returns `(switch id, activated)`
/// for each change.
pub fn update_switches(switches: &mut [Switch], doors: &mut [Door], blocks: &[PushableBlock]) -> Vec<(u32, bool)> {
    let mut changes = Vec::new();
    for switch in switches.iter_mut() {
        let pressed = blocks.iter().any(|b| switch.bounds.contains_point(b.center()));
        if pressed != switch.activated {
            switch.activated = pressed;
            changes.push((switch.id, pressed));
        }
    }
    for (id, _) in &changes {
        let mechanism = switches
            .iter()
            .find(|s| s.id == *id)
            .and_then(|s| s.target.clone());
        if let Some(mechanism) = mechanism {
            let held = switches
                .iter()
                .any(|s| s.activated && s.target.as_deref() == Some(mechanism.as_str()));
            set_mechanism(doors, &mechanism, !held);
        }
    }
    changes
}

/// Lock or unlock every door on `mechanism`. Forced-open doors never re-lock.
fn set_mechanism(doors: &mut [Door], mechanism: &str, locked: bool) {
    for door in doors
        .iter_mut()
        .filter(|d| d.mechanism.as_deref() == Some(mechanism))
    {
        if locked && door.forced_open {
            continue;
        }
        door.locked = locked;
    }
}

/// First open door with somewhere to go that the player's box overlaps
pub fn door_under<'a>(doors: &'a [Door], player: &Aabb) -> Option<&'a Door> {
    doors
        .iter()
        .find(|d| d.is_passable() && !d.destination.is_empty() && overlaps(player, &d.bounds))
}

/// Unlock every door and pin it open
pub fn force_open(doors: &mut [Door]) {
    for door in doors.iter_mut() {
        door.locked = false;
        door.forced_open = true;
    }
}

/// Objective state for one room instance
#[derive(Debug, Clone, PartialEq)]
pub struct RoomProgress {
    pub objective: Objective,
    complete: bool,
}

impl RoomProgress {
    pub fn new(objective: Objective) -> Self {
        Self {
            objective,
            complete: false,
        }
    }

    /// Progress for a room the session already finished
    pub fn completed(objective: Objective) -> Self {
        Self {
            objective,
            complete: true,
        }
    }

    #[inline]
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Does the polled objective hold right now?
    pub fn satisfied(&self, agents: &[Agent], switches: &[Switch]) -> bool {
        match self.objective {
            Objective::DefeatAllEnemies => !agents.iter().any(Agent::is_threat),
            Objective::ActivateAllSwitches => switches.iter().all(|s| s.activated),
            // Driven by the kill event
            Objective::DefeatBoss => false,
            Objective::None => false,
        }
    }

    /// Poll the objective. Returns true on the frame it first completes.
    pub fn poll(&mut self, agents: &[Agent], switches: &[Switch], doors: &mut [Door]) -> bool {
        if self.complete || !self.satisfied(agents, switches) {
            return false;
        }
        self.finish(doors);
        true
    }

    /// Feed a kill. Completes a boss room when the boss goes down.
    pub fn on_kill(&mut self, kill: &Kill, doors: &mut [Door]) -> bool {
        if self.complete || self.objective != Objective::DefeatBoss || !kill.boss {
            return false;
        }
        self.finish(doors);
        true
    }

    fn finish(&mut self, doors: &mut [Door]) {
        self.complete = true;
        force_open(doors);
    }
}

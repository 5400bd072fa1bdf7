//! A live room
//!
//! The room owns everything the frame driver mutates: the obstacle index,
//! the player, agents, blocks, switches, doors, live attacks and the event
//! queue. It is built from a [`RoomDef`] plus the session and torn down on
//! transition; there is no way to pause and resume one.

use std::hash::{Hash, Hasher};

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use rustc_hash::FxHasher;
use serde::{Deserialize, Serialize};

use super::aabb::Hitbox;
use super::collision::would_collide_at;
use super::combat::{Kill, MeleeHitbox, Projectile};
use super::pickup::Collectible;
use super::progression::{RoomProgress, force_open};
use super::spatial::{Obstacle, ObstacleId, SpatialIndex};
use super::state::{
    Agent, AiState, AttackPattern, Body, BossBrain, Door, EntityId, GameEvent, Health, PLAYER_ID, Player,
    PushableBlock, Switch,
};
use crate::Direction;
use crate::consts::ARRIVAL_INSET;
use crate::content::{RoomDef, WorldContent};
use crate::session::Session;
use crate::tuning::Tuning;

/// HUD view of an agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentView {
    pub id: EntityId,
    pub type_name: String,
    pub pos: Vec2,
    pub health: u32,
    pub max_health: u32,
    pub state: AiState,
    pub boss: bool,
    pub pattern: Option<AttackPattern>,
}

/// HUD view of the player
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerView {
    pub pos: Vec2,
    pub facing: Direction,
    pub health: u32,
    pub max_health: u32,
    pub xp: u32,
    pub level: u32,
    pub coins: u32,
    pub defeated: bool,
}

/// Simulation state for the current room
#[derive(Debug, Clone)]
pub struct Room {
    pub id: String,
    pub tuning: Tuning,
    pub index: SpatialIndex,
    pub player: Player,
    /// Ascending id order
    pub agents: Vec<Agent>,
    pub blocks: Vec<PushableBlock>,
    pub switches: Vec<Switch>,
    pub doors: Vec<Door>,
    pub progress: RoomProgress,
    pub melee: Vec<MeleeHitbox>,
    pub projectiles: Vec<Projectile>,
    /// Items still lying around, ascending id order
    pub collectibles: Vec<Collectible>,
    /// Slots taken this visit, written back on exit
    pub(crate) picked: Vec<u32>,
    /// Where the player respawns
    pub spawn_point: Vec2,
    pub boss_id: Option<EntityId>,
    pub(crate) rng: Pcg32,
    events: Vec<GameEvent>,
    next_id: u32,
}

impl Room {
    /// Build a room with default tuning. `arrival` is the direction of the
    /// door the player walked through to get here, if any.
    pub fn new(def: &RoomDef, world: &WorldContent, session: &Session, arrival: Option<Direction>) -> Self {
        Self::with_tuning(def, world, session, arrival, Tuning::default())
    }

    pub fn with_tuning(
        def: &RoomDef,
        world: &WorldContent,
        session: &Session,
        arrival: Option<Direction>,
        tuning: Tuning,
    ) -> Self {
        def.lint();
        let tuning = tuning.sanitized();
        let already_complete = session.is_room_complete(&def.id);

        let mut index = SpatialIndex::new(tuning.cell_size);
        for (i, bounds) in def.obstacles.iter().enumerate() {
            index.insert(Obstacle {
                id: ObstacleId(i as u32),
                bounds: bounds.sanitized(),
            });
        }

        let mut room = Self {
            id: def.id.clone(),
            index,
            player: Player::new(def.player_spawn, session.player.clone()),
            agents: Vec::new(),
            blocks: Vec::new(),
            switches: Vec::new(),
            doors: Vec::new(),
            progress: RoomProgress::new(def.objective),
            melee: Vec::new(),
            projectiles: Vec::new(),
            collectibles: Vec::new(),
            picked: Vec::new(),
            spawn_point: def.player_spawn,
            boss_id: None,
            rng: Pcg32::seed_from_u64(seed_for(&def.id)),
            events: Vec::new(),
            next_id: PLAYER_ID.0 + 1,
            tuning,
        };

        for (i, d) in def.doors.iter().enumerate() {
            room.doors.push(Door {
                id: i as u32,
                bounds: d.bounds.sanitized(),
                direction: d.direction,
                locked: d.locked,
                destination: d.destination.clone(),
                mechanism: d.mechanism.clone(),
                forced_open: false,
            });
        }
        for (i, s) in def.switches.iter().enumerate() {
            room.switches.push(Switch {
                id: i as u32,
                bounds: s.bounds.sanitized(),
                activated: false,
                target: s.target.clone(),
            });
        }
        for bounds in &def.blocks {
            let id = room.alloc_id();
            room.blocks.push(PushableBlock::from_bounds(id, *bounds));
        }

        if already_complete {
            room.progress = RoomProgress::completed(def.objective);
            force_open(&mut room.doors);
        } else {
            room.spawn_agents(def, world);
        }
        room.place_collectibles(def, session);

        if let Some(dir) = arrival {
            room.place_on_arrival(dir);
        }

        log::info!(
            "Room {} loaded: {} obstacles, {} agents, {} doors, {} switches, {} blocks, {} items{}",
            room.id,
            room.index.len(),
            room.agents.len(),
            room.doors.len(),
            room.switches.len(),
            room.blocks.len(),
            room.collectibles.len(),
            if already_complete { " (already complete)" } else { "" }
        );
        room
    }

    fn spawn_agents(&mut self, def: &RoomDef, world: &WorldContent) {
        for spawn in &def.enemies {
            let Some(resolved) = world.resolve_spawn(spawn) else {
                continue;
            };
            let id = self.alloc_id();
            let boss = spawn
                .boss
                .then(|| BossBrain::new(spawn.pattern.unwrap_or_default()));
            if boss.is_some() {
                if self.boss_id.is_some() {
                    log::warn!("Room {}: more than one boss, tracking the first", self.id);
                } else {
                    self.boss_id = Some(id);
                }
            }
            self.agents.push(Agent {
                id,
                type_name: spawn.type_name.clone(),
                body: Body::new(spawn.pos(), Hitbox::square(resolved.hitbox)),
                health: Health::new(resolved.max_health),
                stats: resolved.stats,
                ai_state: AiState::Idle,
                target: Some(PLAYER_ID),
                attack_ready_in: 0.0,
                friendly: false,
                active: true,
                removal_in: None,
                boss,
            });
        }
    }

    /// Items the session has not already taken
    fn place_collectibles(&mut self, def: &RoomDef, session: &Session) {
        for (slot, c) in def.collectibles.iter().enumerate() {
            let slot = slot as u32;
            if session.is_item_collected(&def.id, slot) {
                continue;
            }
            let id = self.alloc_id();
            self.collectibles.push(Collectible::new(id, slot, c.pos(), c.item.clone()));
        }
    }

    /// Put the player just inside the door mirroring the one they left
    /// through, facing into the room. Keeps the spawn point if the room has
    /// no such door or the spot is blocked.
    fn place_on_arrival(&mut self, arrival: Direction) {
        let entry = arrival.opposite();
        let Some(door) = self.doors.iter().find(|d| d.direction == entry) else {
            return;
        };
        let bounds = door.bounds;
        let half = match arrival {
            Direction::Up | Direction::Down => bounds.height / 2.0,
            Direction::Left | Direction::Right => bounds.width / 2.0,
        };
        let spot = crate::step(bounds.center(), arrival, half + ARRIVAL_INSET);
        if would_collide_at(&self.index, &self.player.body.hitbox, spot) {
            log::debug!("Arrival spot in room {} is blocked, using spawn", self.id);
            return;
        }
        self.player.body.pos = spot;
        self.player.facing = arrival;
    }

    /// Reseed the room RNG (replays, tests)
    pub fn reseed(&mut self, seed: u64) {
        self.rng = Pcg32::seed_from_u64(seed);
    }

    pub(crate) fn alloc_id(&mut self) -> EntityId {
        let id = EntityId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Peek at the id the next spawned entity will get
    pub(crate) fn peek_id(&self) -> EntityId {
        EntityId(self.next_id)
    }

    pub fn is_complete(&self) -> bool {
        self.progress.is_complete()
    }

    pub fn agent(&self, id: EntityId) -> Option<&Agent> {
        self.agents.iter().find(|a| a.id == id)
    }

    pub fn block(&self, id: EntityId) -> Option<&PushableBlock> {
        self.blocks.iter().find(|b| b.id == id)
    }

    /// Resolve a handle to a position. Defeated players and agents do not
    /// resolve, so nothing keeps targeting them.
    pub fn position_of(&self, id: EntityId) -> Option<Vec2> {
        if id == PLAYER_ID {
            return (!self.player.is_defeated()).then_some(self.player.pos());
        }
        if let Some(agent) = self.agent(id) {
            return agent.is_threat().then_some(agent.body.pos);
        }
        if let Some(block) = self.block(id) {
            return Some(block.body.pos);
        }
        self.projectiles
            .iter()
            .find(|p| p.id == id && p.active)
            .map(|p| p.body.pos)
    }

    pub(crate) fn push_event(&mut self, event: GameEvent) {
        self.events.push(event);
    }

    /// Drain events raised since the last call
    pub fn take_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    /// Pending events without draining them
    pub fn events(&self) -> &[GameEvent] {
        &self.events
    }

    /// Report a kill: XP, level-ups and the boss objective
    pub(crate) fn record_kill(&mut self, kill: Kill) {
        self.push_event(GameEvent::EnemyDefeated {
            agent: kill.agent,
            xp_reward: kill.xp_reward,
            boss: kill.boss,
        });
        if self.player.profile.add_xp(kill.xp_reward) > 0 {
            let level = self.player.profile.level;
            self.push_event(GameEvent::LevelUp { level });
        }
        if self.progress.on_kill(&kill, &mut self.doors) {
            self.announce_complete();
        }
    }

    pub(crate) fn announce_complete(&mut self) {
        log::info!("Room {} complete, doors open", self.id);
        let room = self.id.clone();
        self.push_event(GameEvent::ObjectiveComplete { room });
    }

    /// Write the player, completion state and taken items back into the session
    pub fn store_into(&self, session: &mut Session) {
        session.player = self.player.profile.clone();
        if self.is_complete() {
            session.mark_room_complete(&self.id);
        }
        for &slot in &self.picked {
            session.mark_item_collected(&self.id, slot);
        }
    }

    pub fn agent_views(&self) -> Vec<AgentView> {
        self.agents
            .iter()
            .map(|a| AgentView {
                id: a.id,
                type_name: a.type_name.clone(),
                pos: a.body.pos,
                health: a.health.current(),
                max_health: a.health.max(),
                state: a.ai_state,
                boss: a.is_boss(),
                pattern: a.boss.as_ref().map(|b| b.pattern),
            })
            .collect()
    }

    pub fn player_view(&self) -> PlayerView {
        let p = &self.player;
        PlayerView {
            pos: p.pos(),
            facing: p.facing,
            health: p.profile.health.current(),
            max_health: p.profile.health.max(),
            xp: p.profile.xp,
            level: p.profile.level,
            coins: p.profile.coins,
            defeated: p.is_defeated(),
        }
    }
}

fn seed_for(id: &str) -> u64 {
    let mut hasher = FxHasher::default();
    id.hash(&mut hasher);
    hasher.finish()
}

//! Boomerang Keep - headless demo driver
//!
//! Loads a world (the bundled keep, or a JSON file given on the command
//! line) and lets a simple autopilot fight its way through it, logging every
//! game event. Run with `RUST_LOG=info` (or `debug`) to watch.

use boomerang_keep::consts::FRAME_DT;
use boomerang_keep::sim::{GameEvent, HeldDirections, Room, TickInput, tick};
use boomerang_keep::{Direction, Session, WorldContent};
use glam::Vec2;

const BUNDLED_WORLD: &str = include_str!("../demos/keep.json");

/// Frames before the demo gives up (one minute of game time)
const MAX_FRAMES: u32 = 60 * 60;

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("Boomerang Keep (native) starting...");

    let json = match std::env::args().nth(1) {
        Some(path) => match std::fs::read_to_string(&path) {
            Ok(json) => json,
            Err(e) => {
                log::error!("Cannot read {}: {}", path, e);
                std::process::exit(1);
            }
        },
        None => BUNDLED_WORLD.to_string(),
    };
    let world = match WorldContent::from_json(&json) {
        Ok(world) => world,
        Err(e) => {
            log::error!("{}", e);
            std::process::exit(1);
        }
    };
    run(&world);
}

#[cfg(target_arch = "wasm32")]
fn main() {}

fn run(world: &WorldContent) {
    let Some(start) = world.start_room() else {
        log::error!("World has no rooms");
        return;
    };
    let mut session = Session::default();
    let mut room = Room::new(start, world, &session, None);
    let mut held = HeldDirections::default();

    for frame in 0..MAX_FRAMES {
        let input = autopilot(&room, &mut held);
        let transition = tick(&mut room, &input, FRAME_DT);
        for event in room.take_events() {
            report(frame, &event);
        }

        if let Some(t) = transition {
            room.store_into(&mut session);
            match world.room(&t.destination) {
                Ok(def) => room = Room::new(def, world, &session, Some(t.direction)),
                Err(e) => {
                    log::warn!("{}", e);
                    break;
                }
            }
            held.clear();
        }

        let cleared = world
            .rooms
            .iter()
            .all(|r| session.is_room_complete(&r.id) || (r.id == room.id && room.is_complete()));
        if cleared {
            log::info!("Every room cleared after {} frames", frame + 1);
            break;
        }
    }

    room.store_into(&mut session);
    let snapshot = session.snapshot();
    match snapshot.to_json() {
        Ok(json) => log::info!("Final snapshot: {}", json),
        Err(e) => log::warn!("Snapshot failed: {}", e),
    }
}

/// Walk at the nearest threat and swing when close; with none left, head
/// for the first open door.
fn autopilot(room: &Room, held: &mut HeldDirections) -> TickInput {
    let me = room.player.pos();
    let nearest = room
        .agent_views()
        .into_iter()
        .filter(|a| a.health > 0)
        .min_by(|a, b| me.distance(a.pos).total_cmp(&me.distance(b.pos)));

    let (goal, swing) = match nearest {
        Some(agent) => (agent.pos, me.distance(agent.pos) < 45.0),
        None => match room.doors.iter().find(|d| d.is_passable()) {
            Some(door) => (door.bounds.center(), false),
            None => return TickInput::default(),
        },
    };

    held.clear();
    if let Some(dir) = heading(goal - me) {
        held.press(dir);
    }
    if swing {
        // Face the target before swinging
        return TickInput {
            movement: heading(goal - me),
            melee: true,
            throw: false,
        };
    }
    TickInput {
        movement: held.current(),
        ..Default::default()
    }
}

/// Dominant cardinal direction of `delta`
fn heading(delta: Vec2) -> Option<Direction> {
    if delta.length_squared() < 1.0 {
        return None;
    }
    Some(if delta.x.abs() > delta.y.abs() {
        if delta.x > 0.0 { Direction::Right } else { Direction::Left }
    } else if delta.y > 0.0 {
        Direction::Down
    } else {
        Direction::Up
    })
}

fn report(frame: u32, event: &GameEvent) {
    match event {
        GameEvent::EnemyDefeated { agent, xp_reward, boss } => {
            log::info!("[{frame}] defeated agent {} (+{xp_reward} xp{})", agent.0, if *boss { ", boss" } else { "" });
        }
        GameEvent::LevelUp { level } => log::info!("[{frame}] reached level {level}"),
        GameEvent::ObjectiveComplete { room } => log::info!("[{frame}] room {room} complete"),
        GameEvent::SwitchChanged { switch, activated } => {
            log::info!("[{frame}] switch {switch} {}", if *activated { "pressed" } else { "released" });
        }
        GameEvent::RoomTransition { destination, direction } => {
            log::info!("[{frame}] heading {direction:?} to {destination}");
        }
        GameEvent::PlayerDefeated => log::info!("[{frame}] player down"),
        GameEvent::PlayerRespawned => log::info!("[{frame}] player back up"),
        GameEvent::ItemCollected { item, kind } => log::info!("[{frame}] picked up {kind:?} ({})", item.0),
    }
}

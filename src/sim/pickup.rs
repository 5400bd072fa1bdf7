//! Collectibles
//!
//! Coins, hearts and gear lying around a room. The player takes one by
//! overlapping it; it is applied to the profile on the spot and gone for good.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::aabb::{Aabb, Hitbox, overlaps};
use super::combat::Weapon;
use super::state::EntityId;
use crate::consts::COLLECTIBLE_HITBOX;
use crate::session::{Armor, PlayerProfile};

fn one() -> u32 {
    1
}

/// What a collectible gives the player
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Item {
    Coin {
        #[serde(default = "one")]
        value: u32,
    },
    /// Heals up to max health
    Health {
        #[serde(default = "one")]
        value: u32,
    },
    Weapon(Weapon),
    Armor(Armor),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Coin,
    Health,
    Weapon,
    Armor,
}

impl Item {
    pub fn kind(&self) -> ItemKind {
        match self {
            Item::Coin { .. } => ItemKind::Coin,
            Item::Health { .. } => ItemKind::Health,
            Item::Weapon(_) => ItemKind::Weapon,
            Item::Armor(_) => ItemKind::Armor,
        }
    }

    /// Hand the item to the player
    pub fn apply(&self, profile: &mut PlayerProfile) {
        match self {
            Item::Coin { value } => profile.add_coins(*value),
            Item::Health { value } => {
                profile.heal(*value);
            }
            Item::Weapon(weapon) => profile.equip_weapon(weapon.clone()),
            Item::Armor(armor) => profile.equip_armor(armor.clone()),
        }
    }
}

/// An item waiting to be picked up
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collectible {
    pub id: EntityId,
    /// Position in the room's declaration; stable across visits
    pub slot: u32,
    pub pos: Vec2,
    pub hitbox: Hitbox,
    pub item: Item,
}

impl Collectible {
    pub fn new(id: EntityId, slot: u32, pos: Vec2, item: Item) -> Self {
        Self {
            id,
            slot,
            pos,
            hitbox: Hitbox::square(COLLECTIBLE_HITBOX),
            item,
        }
    }

    #[inline]
    pub fn bounds(&self) -> Aabb {
        self.hitbox.at(self.pos)
    }
}

/// Take every collectible `player` overlaps and apply it to `profile`.
/// Returns the ones taken, in id order.
pub fn collect(player: &Aabb, collectibles: &mut Vec<Collectible>, profile: &mut PlayerProfile) -> Vec<Collectible> {
    let (taken, left): (Vec<Collectible>, Vec<Collectible>) = collectibles
        .drain(..)
        .partition(|c| overlaps(player, &c.bounds()));
    *collectibles = left;
    for c in &taken {
        c.item.apply(profile);
        log::debug!("Picked up {:?} ({})", c.item.kind(), c.id.0);
    }
    taken
}

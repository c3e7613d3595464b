//! Combatants and the legions they fight for

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::battle::battle_map::HexId;
use crate::battle::creature::CreatureType;
use crate::core::types::{CombatantId, Side};

/// One side's stack of creatures
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Legion {
    pub side: Side,
    pub marker: String,
    /// Owning player's score, which decides titan power
    #[serde(default)]
    pub player_score: u32,
}

impl Legion {
    pub fn new(side: Side, marker: &str) -> Self {
        Self {
            side,
            marker: marker.to_string(),
            player_score: 0,
        }
    }

    pub fn with_score(mut self, player_score: u32) -> Self {
        self.player_score = player_score;
        self
    }
}

/// A creature instance taking part in a battle
#[derive(Debug, Clone, Serialize)]
pub struct Combatant {
    pub id: CombatantId,
    pub creature: Arc<CreatureType>,
    pub side: Side,
    pub current_hex: HexId,
    /// Where the creature stood when its side's turn began
    pub starting_hex: HexId,
    pub hits: i32,
    pub dead: bool,
    pub moved: bool,
    pub struck: bool,
    /// Poison wounds waiting to be applied at the end of the strike phase
    pub poison_damage: i32,
    /// Movement points lost to slowing strikes
    pub slowed: i32,
}

impl Combatant {
    pub fn new(id: CombatantId, creature: Arc<CreatureType>, side: Side, hex: HexId) -> Self {
        Self {
            id,
            creature,
            side,
            current_hex: hex,
            starting_hex: hex,
            hits: 0,
            dead: false,
            moved: false,
            struck: false,
            poison_damage: 0,
            slowed: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.creature.name
    }

    pub fn is_dead(&self) -> bool {
        self.dead
    }

    /// Hits still needed to kill the creature
    pub fn remaining(&self, power: i32) -> i32 {
        (power - self.hits).max(0)
    }

    /// Apply damage and return whatever exceeded what was needed to kill
    pub fn wound(&mut self, damage: i32, power: i32) -> i32 {
        let total = self.hits + damage.max(0);
        let excess = (total - power).max(0);
        self.hits = total.min(power);
        if self.hits >= power {
            self.dead = true;
        }
        excess
    }

    /// Move to `hex` for this turn
    pub fn move_to(&mut self, hex: HexId) {
        self.current_hex = hex;
        self.moved = true;
    }

    /// Return to the hex occupied at the start of the turn
    pub fn undo_move(&mut self) {
        self.current_hex = self.starting_hex;
        self.moved = false;
    }

    /// Reset per-turn flags and fix the turn's starting hex
    pub fn begin_turn(&mut self) {
        self.starting_hex = self.current_hex;
        self.moved = false;
        self.struck = false;
    }

    /// Movement points available this turn
    pub fn movement_points(&self) -> i32 {
        (self.creature.skill - self.slowed).max(0)
    }
}

//! Live battle state: legions, combatants, turn and phase
//!
//! Everything a strike or move needs is owned by one `Battle` value.
//! Nothing here is shared between battles.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::battle::battle_map::{BattleMap, HexId};
use crate::battle::constants::MIN_RANGESTRIKE_RANGE;
use crate::battle::creature::CreatureType;
use crate::battle::hex::HexDirection;
use crate::battle::movement;
use crate::battle::units::{Combatant, Legion};
use crate::core::config::RulesConfig;
use crate::core::error::{BattleError, Result};
use crate::core::types::{BattlePhase, CombatantId, Side, TagAllocator};

/// One battle between an attacking and a defending legion
#[derive(Debug, Clone, Serialize)]
pub struct Battle {
    pub map: BattleMap,
    legions: [Legion; 2],
    combatants: BTreeMap<CombatantId, Combatant>,
    #[serde(skip)]
    tags: TagAllocator,
    pub turn: u32,
    pub phase: BattlePhase,
    /// Side whose turn it is; the other side strikes back
    pub active: Side,
    pub rules: RulesConfig,
}

impl Battle {
    /// Start a battle at turn 1 with the defender moving first
    pub fn new(map: BattleMap, attacker: Legion, defender: Legion, rules: RulesConfig) -> Self {
        let attacker = Legion {
            side: Side::Attacker,
            ..attacker
        };
        let defender = Legion {
            side: Side::Defender,
            ..defender
        };
        Self {
            map,
            legions: [attacker, defender],
            combatants: BTreeMap::new(),
            tags: TagAllocator::new(),
            turn: 1,
            phase: BattlePhase::Move,
            active: Side::Defender,
            rules,
        }
    }

    /// Place a new creature; entrance hexes may hold any number
    pub fn add_combatant(
        &mut self,
        creature: Arc<CreatureType>,
        side: Side,
        hex: HexId,
    ) -> Result<CombatantId> {
        self.map.try_hex(hex)?;
        if let Some(occupant) = self.combatant_at(hex) {
            return Err(BattleError::InconsistentCombatantState(format!(
                "{} cannot be placed on hex {}, {} {} is already there",
                creature.name,
                self.hex_label(hex),
                occupant.name(),
                occupant.id
            )));
        }
        let id = self.tags.allocate();
        tracing::debug!(
            combatant = %id,
            creature = %creature.name,
            ?side,
            hex = %self.hex_label(hex),
            "Combatant placed"
        );
        self.combatants
            .insert(id, Combatant::new(id, creature, side, hex));
        Ok(id)
    }

    pub fn legion(&self, side: Side) -> &Legion {
        &self.legions[side.index()]
    }

    pub fn legion_mut(&mut self, side: Side) -> &mut Legion {
        &mut self.legions[side.index()]
    }

    pub fn combatant(&self, id: CombatantId) -> Result<&Combatant> {
        self.combatants
            .get(&id)
            .ok_or(BattleError::CombatantNotFound(id))
    }

    pub(crate) fn combatant_mut(&mut self, id: CombatantId) -> Result<&mut Combatant> {
        self.combatants
            .get_mut(&id)
            .ok_or(BattleError::CombatantNotFound(id))
    }

    /// Set a creature's wounds directly, for scenario set-up
    pub fn set_hits(&mut self, id: CombatantId, hits: i32) -> Result<()> {
        let power = self.power(id)?;
        let combatant = self.combatant_mut(id)?;
        combatant.hits = hits.clamp(0, power);
        combatant.dead = combatant.hits >= power;
        Ok(())
    }

    /// A combatant that must still be alive
    pub fn live_combatant(&self, id: CombatantId) -> Result<&Combatant> {
        let combatant = self.combatant(id)?;
        if combatant.dead {
            tracing::error!(combatant = %id, "Dead combatant referenced");
            return Err(BattleError::InconsistentCombatantState(format!(
                "{} {} is dead",
                combatant.name(),
                id
            )));
        }
        Ok(combatant)
    }

    pub fn combatants(&self) -> impl Iterator<Item = &Combatant> {
        self.combatants.values()
    }

    pub fn live_combatants(&self, side: Side) -> impl Iterator<Item = &Combatant> {
        self.combatants
            .values()
            .filter(move |c| c.side == side && !c.dead)
    }

    /// The creature standing on an on-board hex, dead ones included
    ///
    /// Entrance hexes are staging areas and never count as occupied.
    pub fn combatant_at(&self, hex: HexId) -> Option<&Combatant> {
        if self.map.is_entrance(hex) {
            return None;
        }
        self.combatants.values().find(|c| c.current_hex == hex)
    }

    fn live_combatant_at(&self, hex: HexId) -> Option<&Combatant> {
        self.combatant_at(hex).filter(|c| !c.dead)
    }

    pub fn is_occupied(&self, hex: HexId) -> bool {
        self.combatant_at(hex).is_some()
    }

    pub fn hex_label(&self, hex: HexId) -> &str {
        self.map.hex(hex).map(|h| h.label.as_str()).unwrap_or("?")
    }

    /// Current power, taking titan growth into account
    pub fn power_of(&self, combatant: &Combatant) -> i32 {
        combatant
            .creature
            .power_for(self.legion(combatant.side).player_score, &self.rules)
    }

    pub fn power(&self, id: CombatantId) -> Result<i32> {
        Ok(self.power_of(self.combatant(id)?))
    }

    /// Enemies adjacent across a non-cliff hexside, by direction
    fn adjacent_enemies(
        &self,
        combatant: &Combatant,
        count_dead: bool,
    ) -> Vec<(HexDirection, &Combatant)> {
        let hex = combatant.current_hex;
        if self.map.is_entrance(hex) {
            return Vec::new();
        }
        HexDirection::all()
            .into_iter()
            .filter(|dir| !self.map.is_cliff(hex, *dir))
            .filter_map(|dir| {
                let neighbor = self.map.neighbor(hex, dir)?;
                let other = self.combatant_at(neighbor)?;
                (other.side != combatant.side && (count_dead || !other.dead))
                    .then_some((dir, other))
            })
            .collect()
    }

    /// Number of adjacent enemies, dead ones only when `count_dead`
    pub fn num_in_contact(&self, id: CombatantId, count_dead: bool) -> Result<usize> {
        let combatant = self.combatant(id)?;
        Ok(self.adjacent_enemies(combatant, count_dead).len())
    }

    pub fn is_in_contact(&self, id: CombatantId, count_dead: bool) -> Result<bool> {
        Ok(self.num_in_contact(id, count_dead)? > 0)
    }

    /// Is a strike between these two a rangestrike?
    ///
    /// Any adjacent enemy, even a dead one, ties the striker to melee.
    pub fn is_rangestrike(&self, striker: CombatantId) -> Result<bool> {
        Ok(!self.is_in_contact(striker, true)?)
    }

    /// Every enemy the striker may strike right now
    pub fn strike_targets(&self, id: CombatantId) -> Result<BTreeSet<CombatantId>> {
        let striker = self.live_combatant(id)?;
        let mut targets = BTreeSet::new();
        if striker.struck {
            return Ok(targets);
        }

        targets.extend(
            self.adjacent_enemies(striker, false)
                .into_iter()
                .map(|(_, enemy)| enemy.id),
        );

        let may_rangestrike = striker.creature.rangestriker
            && self.phase != BattlePhase::Strikeback
            && striker.side == self.active
            && self.adjacent_enemies(striker, true).is_empty();
        if may_rangestrike {
            targets.extend(
                self.live_combatants(striker.side.other())
                    .filter(|enemy| self.is_rangestrike_possible(striker, enemy))
                    .map(|enemy| enemy.id),
            );
        }
        Ok(targets)
    }

    /// Range, lord and sight checks for a rangestrike
    pub fn is_rangestrike_possible(&self, striker: &Combatant, target: &Combatant) -> bool {
        let (from, to) = (striker.current_hex, target.current_hex);
        if self.map.is_entrance(from) || self.map.is_entrance(to) {
            return false;
        }
        let range = self.map.range(from, to);
        if range as i32 > striker.creature.skill {
            return false;
        }
        if striker.creature.magic_missile {
            return true;
        }
        range >= MIN_RANGESTRIKE_RANGE && !target.creature.lord && !self.is_los_blocked(from, to)
    }

    /// Line of sight is blocked when every straight line is blocked
    ///
    /// A line is blocked by an intervening hex whose terrain blocks sight,
    /// that holds a live creature, or that rises above both ends.
    pub fn is_los_blocked(&self, from: HexId, to: HexId) -> bool {
        let top = self.map.elevation(from).max(self.map.elevation(to));
        [true, false].into_iter().all(|left| {
            self.map
                .intervening_hexes(from, to, left)
                .into_iter()
                .any(|hex| {
                    self.map.terrain(hex).blocks_los()
                        || self.map.elevation(hex) > top
                        || self.live_combatant_at(hex).is_some()
                })
        })
    }

    /// Move a combatant to one of its legal destinations
    ///
    /// Staying put is always accepted and still counts as having moved.
    pub fn move_combatant(&mut self, id: CombatantId, hex: HexId) -> Result<()> {
        let combatant = self.live_combatant(id)?;
        if hex != combatant.current_hex {
            let legal = movement::legal_moves(self, id, false)?;
            if !legal.contains(&hex) {
                tracing::warn!(
                    combatant = %id,
                    creature = %combatant.name(),
                    hex = %self.hex_label(hex),
                    "Illegal move requested"
                );
                return Err(BattleError::IllegalMoveRequested { combatant: id, hex });
            }
        }
        tracing::debug!(combatant = %id, hex = %self.hex_label(hex), "Combatant moved");
        self.combatant_mut(id)?.move_to(hex);
        Ok(())
    }

    /// Put a combatant back where it started the turn
    pub fn undo_move(&mut self, id: CombatantId) -> Result<()> {
        let starting = self.combatant(id)?.starting_hex;
        if let Some(occupant) = self.combatant_at(starting).filter(|c| c.id != id) {
            return Err(BattleError::InconsistentCombatantState(format!(
                "cannot undo move of {}, starting hex held by {}",
                id, occupant.id
            )));
        }
        self.combatant_mut(id)?.undo_move();
        Ok(())
    }

    /// Jump to a given turn, for set-up and tests
    pub fn set_turn(&mut self, turn: u32, active: Side, phase: BattlePhase) {
        self.turn = turn;
        self.active = active;
        self.phase = phase;
    }

    /// Move to the next phase and return the ids of removed dead creatures
    ///
    /// After the defender's strikeback the turn number goes up.
    pub fn advance_phase(&mut self) -> Vec<CombatantId> {
        match self.phase {
            BattlePhase::Move => {
                self.phase = BattlePhase::Fight;
                Vec::new()
            }
            BattlePhase::Fight => {
                self.phase = BattlePhase::Strikeback;
                self.remove_dead()
            }
            BattlePhase::Strikeback => {
                self.apply_poison();
                let removed = self.remove_dead();
                self.active = self.active.other();
                if self.active == Side::Defender {
                    self.turn += 1;
                }
                self.phase = BattlePhase::Move;
                self.begin_turn();
                tracing::info!(turn = self.turn, active = ?self.active, "Battle turn begins");
                removed
            }
        }
    }

    /// Clear per-turn flags on every combatant
    pub fn begin_turn(&mut self) {
        for combatant in self.combatants.values_mut() {
            combatant.begin_turn();
        }
    }

    /// Take dead creatures off the map
    pub fn remove_dead(&mut self) -> Vec<CombatantId> {
        let dead: Vec<CombatantId> = self
            .combatants
            .values()
            .filter(|c| c.dead)
            .map(|c| c.id)
            .collect();
        for id in &dead {
            if let Some(c) = self.combatants.remove(id) {
                tracing::info!(combatant = %id, creature = %c.name(), "Dead creature removed");
            }
        }
        dead
    }

    /// Wound every poisoned creature by its accumulated poison
    pub fn apply_poison(&mut self) {
        let powers: Vec<(CombatantId, i32)> = self
            .combatants
            .values()
            .filter(|c| !c.dead && c.poison_damage > 0)
            .map(|c| (c.id, self.power_of(c)))
            .collect();
        for (id, power) in powers {
            if let Some(c) = self.combatants.get_mut(&id) {
                let poison = c.poison_damage;
                c.wound(poison, power);
                tracing::info!(combatant = %id, poison, hits = c.hits, "Poison damage applied");
            }
        }
    }

    /// Is either legion wiped out?
    pub fn is_over(&self) -> bool {
        self.live_combatants(Side::Attacker).next().is_none()
            || self.live_combatants(Side::Defender).next().is_none()
    }
}

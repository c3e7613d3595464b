//! Strike resolution engine
//!
//! One strike moves through: options computed, then either straight to the
//! roll or suspended awaiting the striking player's penalty choice. The
//! suspension is a returned value; the caller resumes it with another call.
//! Creature state only changes inside the roll itself.

use ahash::AHashMap;
use serde::Serialize;
use std::collections::BTreeSet;

use crate::battle::battle_map::HexId;
use crate::battle::carry::{find_carry_options, PenaltyOption, PenaltyOptionId};
use crate::battle::dice::{self, DiceSource};
use crate::battle::movement;
use crate::battle::state::Battle;
use crate::battle::strike::strike_profile;
use crate::core::error::{BattleError, Result};
use crate::core::types::CombatantId;

/// Everything a striking player needs to pick how to strike
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StrikeOptions {
    pub striker: CombatantId,
    pub target: CombatantId,
    pub dice: i32,
    pub strike_number: i32,
    pub rangestrike: bool,
    /// Enemies excess hits may reach without any penalty
    pub free_carry_targets: BTreeSet<CombatantId>,
    /// Empty when there is nothing to choose
    pub penalty_options: Vec<PenaltyOption>,
}

impl StrikeOptions {
    pub fn option(&self, id: PenaltyOptionId) -> Option<&PenaltyOption> {
        self.penalty_options.iter().find(|o| o.id == id)
    }
}

/// What happened to one target
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StrikeResult {
    pub striker: CombatantId,
    pub target: CombatantId,
    pub dice: i32,
    pub strike_number: i32,
    pub rolls: Vec<u8>,
    pub damage: i32,
    pub killed: bool,
    /// Hits left over for carrying; zero when carry is not allowed
    pub carry_damage_available: i32,
    pub carry_targets: BTreeSet<CombatantId>,
}

/// Either a finished strike or a request for a penalty choice
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum StrikeOutcome {
    AwaitingPenaltyChoice(StrikeOptions),
    Resolved(StrikeResult),
}

impl StrikeOutcome {
    pub fn resolved(self) -> Option<StrikeResult> {
        match self {
            StrikeOutcome::Resolved(result) => Some(result),
            StrikeOutcome::AwaitingPenaltyChoice(_) => None,
        }
    }
}

#[derive(Debug, Clone)]
struct CarryState {
    striker: CombatantId,
    pool: i32,
    targets: BTreeSet<CombatantId>,
}

/// Battle rules engine for moves and strikes
pub struct CombatEngine<D: DiceSource = Box<dyn DiceSource>> {
    battle: Battle,
    dice: D,
    /// Offers waiting for a choice, at most one per striker
    pending: AHashMap<CombatantId, StrikeOptions>,
    carry: Option<CarryState>,
}

impl CombatEngine<Box<dyn DiceSource>> {
    /// Engine using the dice the battle's rules ask for
    pub fn from_rules(battle: Battle) -> Self {
        let dice = dice::from_config(&battle.rules);
        Self::new(battle, dice)
    }
}

impl<D: DiceSource> CombatEngine<D> {
    pub fn new(battle: Battle, dice: D) -> Self {
        Self {
            battle,
            dice,
            pending: AHashMap::new(),
            carry: None,
        }
    }

    pub fn battle(&self) -> &Battle {
        &self.battle
    }

    /// Direct access for set-up; clears any suspended strike or carry
    pub fn battle_mut(&mut self) -> &mut Battle {
        self.pending.clear();
        self.carry = None;
        &mut self.battle
    }

    pub fn into_battle(self) -> Battle {
        self.battle
    }

    pub fn pending_options(&self, striker: CombatantId) -> Option<&StrikeOptions> {
        self.pending.get(&striker)
    }

    /// Hits still waiting to be carried
    pub fn carry_pool(&self) -> i32 {
        self.carry.as_ref().map(|c| c.pool).unwrap_or(0)
    }

    pub fn carry_targets(&self) -> BTreeSet<CombatantId> {
        self.carry
            .as_ref()
            .map(|c| c.targets.clone())
            .unwrap_or_default()
    }

    pub fn legal_moves(&self, id: CombatantId, ignore_mobile_allies: bool) -> Result<BTreeSet<HexId>> {
        movement::legal_moves(&self.battle, id, ignore_mobile_allies)
    }

    pub fn move_combatant(&mut self, id: CombatantId, hex: HexId) -> Result<()> {
        self.battle.move_combatant(id, hex)
    }

    /// Dice, strike number and carry options, without changing anything
    pub fn strike_options(&self, striker: CombatantId, target: CombatantId) -> Result<StrikeOptions> {
        let striker_c = self.battle.live_combatant(striker)?;
        let target_c = self.battle.live_combatant(target)?;
        let targets = self.battle.strike_targets(striker)?;
        if !targets.contains(&target) {
            tracing::warn!(striker = %striker, target = %target, "Invalid strike target");
            return Err(BattleError::InvalidStrikeTarget { striker, target });
        }

        let profile = strike_profile(&self.battle, striker, target)?;
        let carry = find_carry_options(&self.battle, striker_c, target_c, profile);

        Ok(StrikeOptions {
            striker,
            target,
            dice: profile.dice,
            strike_number: profile.strike_number,
            rangestrike: profile.rangestrike,
            free_carry_targets: carry.free_targets,
            penalty_options: carry.penalty_options,
        })
    }

    /// Make a strike, or continue one suspended for a penalty choice
    ///
    /// Without `choice`, a strike that has penalty options is suspended and
    /// its options returned. With `choice`, the matching stored option is
    /// rolled; an unknown choice is rejected and the strike stays suspended.
    pub fn resolve_strike(
        &mut self,
        striker: CombatantId,
        target: CombatantId,
        choice: Option<PenaltyOptionId>,
    ) -> Result<StrikeOutcome> {
        let Some(choice) = choice else {
            self.carry = None;
            let options = self.strike_options(striker, target)?;
            if !options.penalty_options.is_empty() {
                tracing::info!(
                    striker = %striker,
                    target = %target,
                    options = options.penalty_options.len(),
                    "Awaiting penalty choice"
                );
                self.pending.insert(striker, options.clone());
                return Ok(StrikeOutcome::AwaitingPenaltyChoice(options));
            }
            self.pending.remove(&striker);
            let result = self.roll(
                striker,
                target,
                options.dice,
                options.strike_number,
                options.free_carry_targets,
            )?;
            return Ok(StrikeOutcome::Resolved(result));
        };

        let option = {
            let Some(offer) = self.pending.get(&striker) else {
                tracing::warn!(striker = %striker, %choice, "Penalty choice with no pending strike");
                return Err(BattleError::InvalidCarryChoice(format!(
                    "no strike by {} is awaiting a choice",
                    striker
                )));
            };
            let chosen = offer.option(choice).filter(|_| offer.target == target);
            match chosen {
                Some(option) => option.clone(),
                None => {
                    tracing::warn!(
                        striker = %striker,
                        target = %target,
                        %choice,
                        "Penalty choice does not match any offered option"
                    );
                    return Err(BattleError::InvalidCarryChoice(format!(
                        "{} is not offered for {} striking {}",
                        choice, striker, target
                    )));
                }
            }
        };

        self.carry = None;
        self.pending.remove(&striker);
        tracing::debug!(striker = %striker, label = %option.label, "Penalty option chosen");
        let result = self.roll(
            striker,
            target,
            option.dice,
            option.strike_number,
            option.carry_targets,
        )?;
        Ok(StrikeOutcome::Resolved(result))
    }

    /// Drop a suspended strike; nothing about the creatures changes
    pub fn cancel_pending_strike(&mut self, striker: CombatantId) -> bool {
        let cancelled = self.pending.remove(&striker).is_some();
        if cancelled {
            tracing::info!(striker = %striker, "Pending strike cancelled");
        }
        cancelled
    }

    /// Roll and apply one strike
    fn roll(
        &mut self,
        striker: CombatantId,
        target: CombatantId,
        dice: i32,
        strike_number: i32,
        carry_targets: BTreeSet<CombatantId>,
    ) -> Result<StrikeResult> {
        let power = self.battle.power(target)?;
        let remaining = self.battle.live_combatant(target)?.remaining(power);
        let in_contact = self.battle.num_in_contact(striker, false)?;
        let (poison, slows, striker_name) = {
            let s = self.battle.live_combatant(striker)?;
            (s.creature.poison, s.creature.slows, s.name().to_string())
        };
        let carry_eligible = in_contact >= 2 && dice > remaining && !carry_targets.is_empty();

        let rolls = self
            .dice
            .roll_strike(striker, dice.max(0) as u32, strike_number as u8);
        let damage = rolls.hits as i32;

        let (excess, killed, target_name) = {
            let victim = self.battle.combatant_mut(target)?;
            let excess = victim.wound(damage, power);
            if damage > 0 {
                victim.poison_damage += poison;
                victim.slowed += slows;
            }
            (excess, victim.dead, victim.name().to_string())
        };
        self.battle.combatant_mut(striker)?.struck = true;

        tracing::info!(
            striker = %striker_name,
            target = %target_name,
            strike_number,
            rolls = %rolls.roll_string(),
            hits = damage,
            killed,
            "Strike resolved"
        );

        let carry_damage = if carry_eligible { excess } else { 0 };
        let carry_targets = if carry_damage > 0 {
            tracing::info!(
                striker = %striker_name,
                carry_damage,
                targets = carry_targets.len(),
                "Carry damage available"
            );
            self.carry = Some(CarryState {
                striker,
                pool: carry_damage,
                targets: carry_targets.clone(),
            });
            carry_targets
        } else {
            BTreeSet::new()
        };

        Ok(StrikeResult {
            striker,
            target,
            dice,
            strike_number,
            rolls: rolls.rolls,
            damage,
            killed,
            carry_damage_available: carry_damage,
            carry_targets,
        })
    }

    /// Give some of the carry pool to one offered target
    ///
    /// The amount is limited to the pool. Hits beyond what the recipient
    /// can take are lost; they never carry on again.
    pub fn apply_carry(&mut self, target: CombatantId, amount: i32) -> Result<StrikeResult> {
        let Some(carry) = self.carry.as_ref() else {
            tracing::warn!(target = %target, "Carry applied with none pending");
            return Err(BattleError::NoPendingCarry);
        };
        if !carry.targets.contains(&target) {
            tracing::warn!(target = %target, "Carry target not offered");
            return Err(BattleError::InvalidCarryChoice(format!(
                "{} is not a carry target",
                target
            )));
        }
        let striker = carry.striker;
        let amount = amount.clamp(0, carry.pool);

        let power = self.battle.power(target)?;
        let (damage, killed, name) = {
            let victim = self.battle.combatant_mut(target)?;
            if victim.dead {
                return Err(BattleError::InconsistentCombatantState(format!(
                    "carry target {} is already dead",
                    target
                )));
            }
            let damage = amount.min(victim.remaining(power));
            victim.wound(amount, power);
            (damage, victim.dead, victim.name().to_string())
        };

        let (pool, targets) = match self.carry.as_mut() {
            Some(carry) => {
                carry.pool -= amount;
                carry.targets.remove(&target);
                (carry.pool, carry.targets.clone())
            }
            None => (0, BTreeSet::new()),
        };
        let (pool, targets) = if pool <= 0 || targets.is_empty() {
            self.carry = None;
            (0, BTreeSet::new())
        } else {
            (pool, targets)
        };

        tracing::info!(
            target = %name,
            damage,
            killed,
            carry_left = pool,
            "Carry damage applied"
        );

        Ok(StrikeResult {
            striker,
            target,
            dice: 0,
            strike_number: 0,
            rolls: Vec::new(),
            damage,
            killed,
            carry_damage_available: pool,
            carry_targets: targets,
        })
    }

    /// Give up whatever carry damage is left
    pub fn forgo_carry(&mut self) {
        if let Some(carry) = self.carry.take() {
            tracing::debug!(striker = %carry.striker, pool = carry.pool, "Carry forgone");
        }
    }

    /// Move the battle on one phase; suspended strikes and carries lapse
    pub fn advance_phase(&mut self) -> Vec<CombatantId> {
        self.pending.clear();
        self.carry = None;
        self.battle.advance_phase()
    }
}

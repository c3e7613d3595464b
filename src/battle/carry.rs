//! Carry-over damage: who excess hits may reach, and at what price
//!
//! A melee striker whose dice could kill its target with hits to spare may
//! carry the excess to other enemies it is in contact with. Some of those
//! enemies are only reachable if the whole strike is made at the worse
//! dice or strike number needed against them; each such price is offered
//! as a [`PenaltyOption`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::battle::hex::HexDirection;
use crate::battle::state::Battle;
use crate::battle::strike::{dice_for, strike_number_for, StrikeProfile};
use crate::battle::terrain::HazardHexside;
use crate::battle::units::Combatant;
use crate::core::types::CombatantId;

/// Identifier of one option within a single offer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PenaltyOptionId(pub u32);

impl fmt::Display for PenaltyOptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "option {}", self.0)
    }
}

/// One self-consistent way to make a strike
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PenaltyOption {
    pub id: PenaltyOptionId,
    pub striker: CombatantId,
    pub target: CombatantId,
    pub dice: i32,
    pub strike_number: i32,
    pub carry_targets: BTreeSet<CombatantId>,
    pub label: String,
}

impl PenaltyOption {
    fn new(striker: CombatantId, target: CombatantId, dice: i32, strike_number: i32) -> Self {
        Self {
            id: PenaltyOptionId(0),
            striker,
            target,
            dice,
            strike_number,
            carry_targets: BTreeSet::new(),
            label: String::new(),
        }
    }
}

/// Result of searching for carry targets around a strike
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CarryOptions {
    /// Enemies reachable by carry at no extra cost
    pub free_targets: BTreeSet<CombatantId>,
    /// Empty unless some enemy needs a penalty; then includes the baseline
    pub penalty_options: Vec<PenaltyOption>,
}

impl CarryOptions {
    pub fn has_penalty_choice(&self) -> bool {
        !self.penalty_options.is_empty()
    }
}

/// Find free carry targets and penalty options for a melee strike
pub fn find_carry_options(
    battle: &Battle,
    striker: &Combatant,
    target: &Combatant,
    profile: StrikeProfile,
) -> CarryOptions {
    let mut options = CarryOptions::default();
    if profile.rangestrike {
        return options;
    }

    let target_remaining = target.remaining(battle.power_of(target));
    if profile.dice <= target_remaining {
        return options;
    }

    let mut buckets: Vec<PenaltyOption> = Vec::new();
    for direction in HexDirection::all() {
        if !is_carry_possible_toward(battle, striker, target, direction) {
            continue;
        }
        let Some(victim) = battle
            .map
            .neighbor(striker.current_hex, direction)
            .and_then(|hex| battle.combatant_at(hex))
        else {
            continue;
        };
        if victim.side == striker.side || victim.dead {
            continue;
        }

        // A carry can never be easier than the strike itself
        let dice = dice_for(battle, striker, victim, false).min(profile.dice);
        let strike_number =
            strike_number_for(battle, striker, victim, false).max(profile.strike_number);

        // The excess must be able to kill the neighbor
        if dice <= victim.remaining(battle.power_of(victim)) {
            continue;
        }

        if dice == profile.dice && strike_number == profile.strike_number {
            options.free_targets.insert(victim.id);
            continue;
        }

        match buckets
            .iter_mut()
            .find(|o| o.dice == dice && o.strike_number == strike_number)
        {
            Some(option) => {
                option.carry_targets.insert(victim.id);
            }
            None => {
                let mut option = PenaltyOption::new(striker.id, target.id, dice, strike_number);
                option.carry_targets.insert(victim.id);
                buckets.push(option);
            }
        }
    }

    if !buckets.is_empty() {
        buckets.push(PenaltyOption::new(
            striker.id,
            target.id,
            profile.dice,
            profile.strike_number,
        ));
        for option in &mut buckets {
            option
                .carry_targets
                .extend(options.free_targets.iter().copied());
        }
        buckets.sort_by(|a, b| {
            a.dice
                .cmp(&b.dice)
                .then_with(|| b.strike_number.cmp(&a.strike_number))
                .then_with(|| compare_pair(battle, a, b))
        });
        for (index, option) in buckets.iter_mut().enumerate() {
            option.id = PenaltyOptionId(index as u32);
            option.label = describe(battle, option);
        }
        options.penalty_options = buckets;
    }

    tracing::debug!(
        striker = %striker.id,
        target = %target.id,
        free = options.free_targets.len(),
        penalty_options = options.penalty_options.len(),
        "Carry options computed"
    );
    options
}

/// Terrain check on whether a carry may cross the side in `direction`
fn is_carry_possible_toward(
    battle: &Battle,
    striker: &Combatant,
    target: &Combatant,
    direction: HexDirection,
) -> bool {
    let map = &battle.map;
    let hex = striker.current_hex;
    let Some(neighbor) = map.neighbor(hex, direction) else {
        return false;
    };
    if neighbor == target.current_hex || map.is_cliff(hex, direction) {
        return false;
    }

    // Strikes not made up a dune cannot carry up a dune
    let target_side = map
        .direction(target.current_hex, hex, false)
        .and_then(|d| map.hex(target.current_hex).map(|h| h.hexside(d)))
        .unwrap_or_default();
    !(map.opposite_hazard(hex, direction) == HazardHexside::Dune
        && target_side != HazardHexside::Dune)
}

/// Importance of striker, then target, for a stable presentation order
fn compare_pair(battle: &Battle, a: &PenaltyOption, b: &PenaltyOption) -> std::cmp::Ordering {
    let importance = |x: CombatantId, y: CombatantId| match (battle.combatant(x), battle.combatant(y)) {
        (Ok(x), Ok(y)) => x
            .creature
            .compare_importance_at(battle.power_of(x), &y.creature, battle.power_of(y)),
        _ => x.cmp(&y),
    };
    importance(a.striker, b.striker).then_with(|| importance(a.target, b.target))
}

fn describe(battle: &Battle, option: &PenaltyOption) -> String {
    let name = |id: CombatantId| {
        battle
            .combatant(id)
            .map(|c| c.name().to_string())
            .unwrap_or_else(|_| id.to_string())
    };
    let mut label = format!(
        "{} strikes {} with {} dice and strike number {}",
        name(option.striker),
        name(option.target),
        option.dice,
        option.strike_number
    );
    if !option.carry_targets.is_empty() {
        let names: Vec<String> = option.carry_targets.iter().map(|id| name(*id)).collect();
        label.push_str(&format!(", able to carry to {}", names.join(", ")));
    }
    label
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::battle_map::{BattleMap, HexId};
    use crate::battle::creature::CreatureType;
    use crate::battle::hex::BattleHexCoord;
    use crate::battle::strike::strike_profile;
    use crate::battle::terrain::HazardTerrain;
    use crate::battle::units::Legion;
    use crate::core::config::RulesConfig;
    use crate::core::types::{BattlePhase, Side};
    use std::sync::Arc;

    fn battle() -> Battle {
        let mut b = Battle::new(
            BattleMap::new(9, 9).unwrap(),
            Legion::new(Side::Attacker, "Rd01"),
            Legion::new(Side::Defender, "Bu01"),
            RulesConfig::default(),
        );
        b.set_turn(2, Side::Attacker, BattlePhase::Fight);
        b
    }

    fn at(b: &Battle, q: i32, r: i32) -> HexId {
        b.map.hex_at(BattleHexCoord::new(q, r)).unwrap()
    }

    fn add(b: &mut Battle, creature: CreatureType, side: Side, q: i32, r: i32) -> CombatantId {
        let hex = at(b, q, r);
        b.add_combatant(Arc::new(creature), side, hex).unwrap()
    }

    fn carry(b: &Battle, s: CombatantId, t: CombatantId) -> CarryOptions {
        let profile = strike_profile(b, s, t).unwrap();
        find_carry_options(b, b.combatant(s).unwrap(), b.combatant(t).unwrap(), profile)
    }

    #[test]
    fn test_no_carry_without_excess_dice() {
        let mut b = battle();
        let s = add(&mut b, CreatureType::new("Ogre", 6, 2), Side::Attacker, 4, 4);
        let t = add(&mut b, CreatureType::new("Troll", 8, 2), Side::Defender, 5, 4);
        add(&mut b, CreatureType::new("Lion", 5, 3), Side::Defender, 3, 4);
        assert_eq!(carry(&b, s, t), CarryOptions::default());
    }

    #[test]
    fn test_equal_neighbor_is_free_target() {
        let mut b = battle();
        let s = add(&mut b, CreatureType::new("Behemoth", 8, 3), Side::Attacker, 4, 4);
        let t = add(&mut b, CreatureType::new("Lion", 5, 3), Side::Defender, 5, 4);
        let n = add(&mut b, CreatureType::new("Wolf", 5, 3), Side::Defender, 3, 4);
        let options = carry(&b, s, t);
        assert_eq!(options.free_targets.iter().copied().collect::<Vec<_>>(), vec![n]);
        assert!(!options.has_penalty_choice());
    }

    #[test]
    fn test_harder_neighbor_creates_penalty_option() {
        let mut b = battle();
        let s = add(&mut b, CreatureType::new("Behemoth", 8, 3), Side::Attacker, 4, 4);
        let t = add(&mut b, CreatureType::new("Lion", 5, 3), Side::Defender, 5, 4);
        let free = add(&mut b, CreatureType::new("Wolf", 5, 3), Side::Defender, 3, 4);
        let hard = add(&mut b, CreatureType::new("Unicorn", 6, 4), Side::Defender, 4, 3);
        let options = carry(&b, s, t);

        assert_eq!(options.penalty_options.len(), 2);
        let first = &options.penalty_options[0];
        let second = &options.penalty_options[1];
        // Same dice, so the higher strike number comes first
        assert_eq!((first.dice, first.strike_number), (8, 5));
        assert_eq!((second.dice, second.strike_number), (8, 4));
        assert!(first.carry_targets.contains(&hard));
        assert!(first.carry_targets.contains(&free));
        assert!(!second.carry_targets.contains(&hard));
        assert!(second.carry_targets.contains(&free));
        assert_eq!(first.id, PenaltyOptionId(0));
        assert_eq!(second.id, PenaltyOptionId(1));
        assert!(first.label.contains("able to carry to"));
    }

    #[test]
    fn test_penalty_never_better_than_baseline() {
        let mut b = battle();
        let s = add(&mut b, CreatureType::new("Behemoth", 8, 3), Side::Attacker, 4, 4);
        let t = add(&mut b, CreatureType::new("Centaur", 3, 4), Side::Defender, 5, 4);
        // Weaker neighbor would be easier to hit, but the carry is clamped
        let easy = add(&mut b, CreatureType::new("Imp", 2, 1), Side::Defender, 3, 4);
        let options = carry(&b, s, t);
        assert!(options.free_targets.contains(&easy));
        assert!(options.penalty_options.is_empty());
    }

    #[test]
    fn test_cliff_blocks_carry() {
        let mut b = battle();
        let s = add(&mut b, CreatureType::new("Behemoth", 8, 3), Side::Attacker, 4, 4);
        let t = add(&mut b, CreatureType::new("Lion", 5, 3), Side::Defender, 5, 4);
        add(&mut b, CreatureType::new("Wolf", 5, 3), Side::Defender, 3, 4);
        let hex = at(&b, 4, 4);
        b.map.set_hexside(hex, HexDirection::West, HazardHexside::Cliff);
        assert!(carry(&b, s, t).free_targets.is_empty());
    }

    #[test]
    fn test_no_carry_up_dune_unless_strike_is_up_dune() {
        let mut b = battle();
        let west = at(&b, 3, 4);
        b.map.set_elevation(west, 1);
        b.map.set_hexside(west, HexDirection::East, HazardHexside::Dune);
        let s = add(&mut b, CreatureType::new("Behemoth", 8, 3), Side::Attacker, 4, 4);
        let t = add(&mut b, CreatureType::new("Lion", 5, 3), Side::Defender, 5, 4);
        add(&mut b, CreatureType::new("Wolf", 5, 3), Side::Defender, 3, 4);
        let options = carry(&b, s, t);
        assert!(options.free_targets.is_empty());
        assert!(options.penalty_options.is_empty());

        // Once the primary strike also goes up a dune the carry is allowed
        let east = at(&b, 5, 4);
        b.map.set_elevation(east, 1);
        b.map.set_hexside(east, HexDirection::West, HazardHexside::Dune);
        let options = carry(&b, s, t);
        assert_eq!(options.free_targets.len(), 1);
    }

    #[test]
    fn test_native_defender_needs_penalty() {
        let mut b = battle();
        let s = add(&mut b, CreatureType::new("Behemoth", 8, 3), Side::Attacker, 4, 4);
        let t = add(&mut b, CreatureType::new("Lion", 5, 3), Side::Defender, 5, 4);
        let bramble = at(&b, 3, 4);
        b.map.set_terrain(bramble, HazardTerrain::Brambles);
        let native = CreatureType::new("Gargoyle", 4, 3).with_native_terrain(HazardTerrain::Brambles);
        let g = add(&mut b, native, Side::Defender, 3, 4);
        let options = carry(&b, s, t);
        let option = options
            .penalty_options
            .iter()
            .find(|o| o.carry_targets.contains(&g))
            .unwrap();
        assert_eq!((option.dice, option.strike_number), (8, 5));
    }

    #[test]
    fn test_neighbor_the_excess_cannot_kill_is_skipped() {
        let mut b = battle();
        let s = add(&mut b, CreatureType::new("Ogre", 6, 2), Side::Attacker, 4, 4);
        let t = add(&mut b, CreatureType::new("Imp", 2, 1), Side::Defender, 5, 4);
        let colossus = add(&mut b, CreatureType::new("Colossus", 10, 3), Side::Defender, 3, 4);
        let troll = add(&mut b, CreatureType::new("Troll", 8, 2), Side::Defender, 4, 3);
        // 6 dice leave excess over the Imp, but neither neighbor can die to 6 dice
        assert_eq!(carry(&b, s, t), CarryOptions::default());

        b.combatant_mut(troll).unwrap().hits = 3;
        let options = carry(&b, s, t);
        assert!(options.free_targets.is_empty());
        assert_eq!(options.penalty_options.len(), 2);
        let penalty = &options.penalty_options[0];
        assert_eq!((penalty.dice, penalty.strike_number), (6, 4));
        assert!(penalty.carry_targets.contains(&troll));
        assert!(!penalty.carry_targets.contains(&colossus));
        assert!(options.penalty_options[1].carry_targets.is_empty());
    }

    #[test]
    fn test_rangestrike_never_carries() {
        let mut b = battle();
        let s = add(
            &mut b,
            CreatureType::new("Giant", 7, 4).with_rangestrike(),
            Side::Attacker,
            0,
            4,
        );
        let t = add(&mut b, CreatureType::new("Centaur", 3, 4), Side::Defender, 3, 4);
        assert_eq!(carry(&b, s, t), CarryOptions::default());
    }
}

//! Strike dice and strike numbers
//!
//! All modifiers are additive. Melee modifiers come from the single
//! hexside between striker and target; rangestrike modifiers come from
//! range, intervening hexes, walls and the target's terrain.

use serde::Serialize;

use crate::battle::constants::{
    BASE_STRIKE_NUMBER, DUNE_DOWNHILL_DICE_BONUS, DUNE_UPHILL_DICE_PENALTY, MAX_STRIKE_NUMBER,
    MIN_STRIKE_NUMBER, RANGESTRIKE_PENALTY_FREE_RANGE, SLOPE_DOWNHILL_DICE_BONUS,
    VOLCANO_DICE_BONUS,
};
use crate::battle::state::Battle;
use crate::battle::terrain::{HazardHexside, HazardTerrain};
use crate::battle::units::Combatant;
use crate::core::error::Result;
use crate::core::types::CombatantId;

/// Dice and strike number for one striker against one target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StrikeProfile {
    pub dice: i32,
    pub strike_number: i32,
    pub rangestrike: bool,
}

/// Work out the full profile, deciding melee or rangestrike from contact
pub fn strike_profile(
    battle: &Battle,
    striker: CombatantId,
    target: CombatantId,
) -> Result<StrikeProfile> {
    let rangestrike = battle.is_rangestrike(striker)?;
    let striker = battle.live_combatant(striker)?;
    let target = battle.live_combatant(target)?;
    Ok(StrikeProfile {
        dice: dice_for(battle, striker, target, rangestrike),
        strike_number: strike_number_for(battle, striker, target, rangestrike),
        rangestrike,
    })
}

/// Number of dice the striker rolls
pub fn dice_for(battle: &Battle, striker: &Combatant, target: &Combatant, rangestrike: bool) -> i32 {
    let creature = &striker.creature;
    let power = battle.power_of(striker);
    let mut dice = if rangestrike { power / 2 } else { power };

    let own_terrain = battle.map.terrain(striker.current_hex);
    if own_terrain == HazardTerrain::Volcano && creature.is_native_terrain(HazardTerrain::Volcano) {
        dice += VOLCANO_DICE_BONUS;
    }

    if !rangestrike {
        if let Some(direction) = battle
            .map
            .direction(striker.current_hex, target.current_hex, false)
        {
            let own_side = battle
                .map
                .hex(striker.current_hex)
                .map(|h| h.hexside(direction))
                .unwrap_or_default();
            let far_side = battle.map.opposite_hazard(striker.current_hex, direction);
            let dune_native = creature.is_native_hexside(HazardHexside::Dune);

            if own_side == HazardHexside::Dune && dune_native {
                dice += DUNE_DOWNHILL_DICE_BONUS;
            } else if own_side == HazardHexside::Slope
                && creature.is_native_hexside(HazardHexside::Slope)
            {
                dice += SLOPE_DOWNHILL_DICE_BONUS;
            } else if far_side == HazardHexside::Dune && !dune_native {
                dice -= DUNE_UPHILL_DICE_PENALTY;
            }
        }
    }

    dice.max(0)
}

/// Striker's skill after positional modifiers
pub fn attacker_skill_for(
    battle: &Battle,
    striker: &Combatant,
    target: &Combatant,
    rangestrike: bool,
) -> i32 {
    let creature = &striker.creature;
    let map = &battle.map;
    let (from, to) = (striker.current_hex, target.current_hex);
    let from_elevation = map.elevation(from);
    let to_elevation = map.elevation(to);
    let mut skill = creature.skill;

    if !rangestrike {
        let own_terrain = map.terrain(from);
        skill -= own_terrain.skill_penalty_strike_from(creature.is_native_terrain(own_terrain));

        if let Some(direction) = map.direction(from, to, false) {
            if from_elevation > to_elevation {
                let own_side = map.hex(from).map(|h| h.hexside(direction)).unwrap_or_default();
                if own_side == HazardHexside::Wall {
                    skill += 1;
                }
            } else if from_elevation < to_elevation {
                let far_side = map.opposite_hazard(from, direction);
                let uphill_slope = far_side == HazardHexside::Slope
                    && !creature.is_native_hexside(HazardHexside::Slope);
                if far_side == HazardHexside::Wall || uphill_slope {
                    skill -= 1;
                }
            }
        }
    } else if !creature.magic_missile {
        let range = map.range(from, to);
        if range > RANGESTRIKE_PENALTY_FREE_RANGE {
            skill -= (range - RANGESTRIKE_PENALTY_FREE_RANGE) as i32;
        }

        if !creature.is_native_terrain(HazardTerrain::Brambles) {
            skill -= map.count_bramble_hexes(from, to) as i32;
        }

        // One wall per level of height difference
        let walled = map.hex(to).map(|h| h.has_wall()).unwrap_or(false);
        if walled && to_elevation > from_elevation {
            skill -= (to_elevation - from_elevation) as i32;
        }

        if map.terrain(to) == HazardTerrain::Volcano {
            skill -= 1;
        }
    }

    skill
}

/// Lowest die roll that hits, always within 1..=6
pub fn strike_number_for(
    battle: &Battle,
    striker: &Combatant,
    target: &Combatant,
    rangestrike: bool,
) -> i32 {
    let attacker_skill = attacker_skill_for(battle, striker, target, rangestrike);
    let defender_skill = target.creature.skill;
    let mut strike_number = BASE_STRIKE_NUMBER - attacker_skill + defender_skill;

    let terrain = battle.map.terrain(target.current_hex);
    let attacker_native = striker.creature.is_native_terrain(terrain);
    let defender_native = target.creature.is_native_terrain(terrain);
    strike_number += if rangestrike {
        terrain.rangestrike_bonus_struck_in(
            attacker_native,
            defender_native,
            striker.creature.magic_missile,
        )
    } else {
        terrain.skill_bonus_struck_in(attacker_native, defender_native)
    };

    strike_number.clamp(MIN_STRIKE_NUMBER, MAX_STRIKE_NUMBER)
}

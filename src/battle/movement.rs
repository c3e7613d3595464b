//! Legal-move search for battle creatures
//!
//! Depth-first search from the mover's hex that never doubles back through
//! the side it just crossed. Movement points strictly decrease, so the
//! recursion is bounded by the mover's skill.

use ahash::AHashSet;
use std::collections::BTreeSet;

use crate::battle::battle_map::{BattleMap, HexId};
use crate::battle::creature::CreatureType;
use crate::battle::hex::HexDirection;
use crate::battle::state::Battle;
use crate::battle::terrain::{
    HazardHexside, IMPASSABLE_COST, NORMAL_COST, SLOW_COST, SLOW_INCREMENT_COST,
};
use crate::battle::units::Combatant;
use crate::core::error::Result;
use crate::core::types::{CombatantId, Side};

/// Every hex the combatant may move to this turn
///
/// With `ignore_mobile_allies`, hexes held by allies that could still move
/// out of the way are treated as free, for previewing moves.
pub fn legal_moves(
    battle: &Battle,
    id: CombatantId,
    ignore_mobile_allies: bool,
) -> Result<BTreeSet<HexId>> {
    let mover = battle.live_combatant(id)?;
    if mover.moved || battle.is_in_contact(id, false)? {
        return Ok(BTreeSet::new());
    }

    if let Some(start_list) = &battle.map.start_list {
        if battle.turn == 1 && battle.active == Side::Defender && mover.side == Side::Defender {
            return Ok(start_list
                .iter()
                .copied()
                .filter(|hex| *hex != mover.current_hex)
                .filter(|hex| ignore_mobile_allies || !battle.is_occupied(*hex))
                .collect());
        }
    }

    let moves = find_moves(battle, mover, ignore_mobile_allies);
    tracing::debug!(
        combatant = %id,
        creature = %mover.name(),
        count = moves.len(),
        "Legal moves computed"
    );
    Ok(moves)
}

/// Bounded search over the map from the mover's current hex
pub fn find_moves(battle: &Battle, mover: &Combatant, ignore_mobile_allies: bool) -> BTreeSet<HexId> {
    let mut search = MoveSearch {
        battle,
        mover,
        ignore_mobile_allies,
        found: BTreeSet::new(),
        visited: AHashSet::new(),
    };
    search.expand(mover.current_hex, mover.movement_points(), None, true);
    search.found
}

struct MoveSearch<'a> {
    battle: &'a Battle,
    mover: &'a Combatant,
    ignore_mobile_allies: bool,
    found: BTreeSet<HexId>,
    /// (hex, side arrived through, points left) already expanded
    visited: AHashSet<(HexId, Option<HexDirection>, i32)>,
}

impl MoveSearch<'_> {
    fn expand(&mut self, hex: HexId, moves_left: i32, came_from: Option<HexDirection>, first: bool) {
        if !self.visited.insert((hex, came_from, moves_left)) {
            return;
        }

        let creature = &self.mover.creature;
        let rules = &self.battle.rules;
        for direction in HexDirection::all() {
            if Some(direction) == came_from {
                continue;
            }
            let Some(neighbor) = self.battle.map.neighbor(hex, direction) else {
                continue;
            };
            let reverse = direction.opposite();

            let cost = if self.is_blocked(neighbor) {
                IMPASSABLE_COST as i32
            } else {
                entry_cost(
                    &self.battle.map,
                    neighbor,
                    reverse,
                    creature,
                    rules.cumulative_slow,
                ) as i32
            };

            if cost != IMPASSABLE_COST as i32
                && (cost <= moves_left || (first && rules.one_hex_allowed))
            {
                self.found.insert(neighbor);
                if !creature.flier && moves_left > cost {
                    self.expand(neighbor, moves_left - cost, Some(reverse), false);
                }
            }

            if creature.flier && moves_left > 1 && can_be_flown_over(&self.battle.map, neighbor, creature)
            {
                self.expand(neighbor, moves_left - 1, Some(reverse), false);
            }
        }
    }

    /// Occupied hexes block, unless they hold an ally that can step aside
    ///
    /// The mover's own hex is always blocked so it is never a destination.
    fn is_blocked(&self, hex: HexId) -> bool {
        let Some(occupant) = self.battle.combatant_at(hex) else {
            return false;
        };
        if occupant.id == self.mover.id {
            return true;
        }
        let mobile_ally = occupant.side == self.mover.side
            && !occupant.dead
            && !occupant.moved
            && !self.battle.is_in_contact(occupant.id, false).unwrap_or(true);
        !(self.ignore_mobile_allies && mobile_ally)
    }
}

/// Movement cost of entering `hex` across its side `came_from`
///
/// `came_from` is the side of the entered hex facing back towards the
/// hex the mover leaves.
pub fn entry_cost(
    map: &BattleMap,
    hex: HexId,
    came_from: HexDirection,
    creature: &CreatureType,
    cumulative_slow: bool,
) -> u32 {
    let Some(target) = map.hex(hex) else {
        return IMPASSABLE_COST;
    };
    if target.entrance {
        return IMPASSABLE_COST;
    }

    let terrain = target.terrain;
    let native = creature.is_native_terrain(terrain);
    let mut cost = NORMAL_COST;

    if terrain.is_native_only() && !native {
        cost += IMPASSABLE_COST;
    } else {
        let hazard = target.hexside(came_from);
        let opposite = map.opposite_hazard(hex, came_from);

        if (hazard == HazardHexside::Cliff || opposite == HazardHexside::Cliff) && !creature.flier {
            cost += IMPASSABLE_COST;
        } else {
            let crosses_river =
                hazard == HazardHexside::River || opposite == HazardHexside::River;
            if crosses_river
                && !creature.flier
                && !creature.water_dwelling
                && !creature.is_native_hexside(HazardHexside::River)
            {
                cost += SLOW_INCREMENT_COST;
            }

            let from_elevation = map
                .neighbor(hex, came_from)
                .map(|from| map.elevation(from))
                .unwrap_or(target.elevation);
            if hazard.slows_climb(creature.is_native_hexside(hazard))
                && !creature.flier
                && target.elevation > from_elevation
            {
                cost += SLOW_INCREMENT_COST;
            }

            if terrain.slows(native, creature.flier) {
                cost += SLOW_INCREMENT_COST;
            }
        }
    }

    if cost > IMPASSABLE_COST {
        cost = IMPASSABLE_COST;
    }
    if cost < IMPASSABLE_COST && cost > SLOW_COST && !cumulative_slow {
        cost = SLOW_COST;
    }
    cost
}

/// Can this creature pass over `hex` in flight?
pub fn can_be_flown_over(map: &BattleMap, hex: HexId, creature: &CreatureType) -> bool {
    if !creature.flier {
        return false;
    }
    let terrain = map.terrain(hex);
    !(terrain.blocks_non_native_flight() && !creature.is_native_terrain(terrain))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::hex::BattleHexCoord;
    use crate::battle::terrain::HazardTerrain;
    use crate::battle::units::Legion;
    use crate::core::config::RulesConfig;
    use crate::core::types::BattlePhase;
    use std::sync::Arc;

    fn battle_with(rules: RulesConfig) -> Battle {
        let mut b = Battle::new(
            BattleMap::new(9, 9).unwrap(),
            Legion::new(Side::Attacker, "Rd01"),
            Legion::new(Side::Defender, "Bu01"),
            rules,
        );
        b.set_turn(2, Side::Attacker, BattlePhase::Move);
        b
    }

    fn at(b: &Battle, q: i32, r: i32) -> HexId {
        b.map.hex_at(BattleHexCoord::new(q, r)).unwrap()
    }

    fn add(b: &mut Battle, creature: CreatureType, side: Side, q: i32, r: i32) -> CombatantId {
        let hex = at(b, q, r);
        b.add_combatant(Arc::new(creature), side, hex).unwrap()
    }

    #[test]
    fn test_ground_moves_on_open_plains() {
        let mut b = battle_with(RulesConfig::default());
        let ogre = add(&mut b, CreatureType::new("Ogre", 6, 2), Side::Attacker, 4, 4);
        let moves = legal_moves(&b, ogre, false).unwrap();
        // Everything within two steps, minus the start
        assert_eq!(moves.len(), 18);
        assert!(!moves.contains(&at(&b, 4, 4)));
        assert!(moves.contains(&at(&b, 6, 4)));
        assert!(!moves.contains(&at(&b, 7, 4)));
    }

    #[test]
    fn test_moved_or_engaged_creature_has_no_moves() {
        let mut b = battle_with(RulesConfig::default());
        let ogre = add(&mut b, CreatureType::new("Ogre", 6, 2), Side::Attacker, 4, 4);
        let troll = add(&mut b, CreatureType::new("Troll", 8, 2), Side::Defender, 5, 4);
        assert!(legal_moves(&b, ogre, false).unwrap().is_empty());
        b.combatant_mut(troll).unwrap().dead = true;
        assert!(!legal_moves(&b, ogre, false).unwrap().is_empty());
        b.combatant_mut(ogre).unwrap().moved = true;
        assert!(legal_moves(&b, ogre, false).unwrap().is_empty());
    }

    #[test]
    fn test_bramble_slows_non_natives() {
        let mut b = battle_with(RulesConfig::default());
        let east = at(&b, 5, 4);
        b.map.set_terrain(east, HazardTerrain::Brambles);
        let ogre = add(&mut b, CreatureType::new("Ogre", 6, 2), Side::Attacker, 4, 4);
        let moves = legal_moves(&b, ogre, false).unwrap();
        assert!(moves.contains(&east));
        // Entering the bramble uses both points, so nothing beyond through it
        let cost = entry_cost(&b.map, east, HexDirection::West, &b.combatant(ogre).unwrap().creature, false);
        assert_eq!(cost, SLOW_COST);
    }

    #[test]
    fn test_native_only_terrain_is_impassable() {
        let b = battle_with(RulesConfig::default());
        let mut map = b.map.clone();
        let hex = at(&b, 5, 4);
        map.set_terrain(hex, HazardTerrain::Bog);
        let lion = CreatureType::new("Lion", 5, 3);
        let ogre = CreatureType::new("Ogre", 6, 2).with_native_terrain(HazardTerrain::Bog);
        assert_eq!(entry_cost(&map, hex, HexDirection::West, &lion, false), IMPASSABLE_COST);
        assert_eq!(entry_cost(&map, hex, HexDirection::West, &ogre, false), NORMAL_COST);
    }

    #[test]
    fn test_cliff_blocks_ground_but_not_fliers() {
        let b = battle_with(RulesConfig::default());
        let mut map = b.map.clone();
        let high = at(&b, 5, 4);
        map.set_elevation(high, 2);
        map.set_hexside(high, HexDirection::West, HazardHexside::Cliff);
        let lion = CreatureType::new("Lion", 5, 3);
        let griffon = CreatureType::new("Griffon", 5, 4).with_flier();
        assert_eq!(entry_cost(&map, high, HexDirection::West, &lion, false), IMPASSABLE_COST);
        assert_eq!(entry_cost(&map, high, HexDirection::West, &griffon, false), NORMAL_COST);
        // Going down the cliff is just as impossible
        let low = at(&b, 4, 4);
        assert_eq!(entry_cost(&map, low, HexDirection::East, &lion, false), IMPASSABLE_COST);
    }

    #[test]
    fn test_slope_climb_and_cumulative_slow() {
        let b = battle_with(RulesConfig::default());
        let mut map = b.map.clone();
        let high = at(&b, 5, 4);
        map.set_elevation(high, 1);
        map.set_terrain(high, HazardTerrain::Brambles);
        map.set_hexside(high, HexDirection::West, HazardHexside::Slope);
        let lion = CreatureType::new("Lion", 5, 3);
        assert_eq!(entry_cost(&map, high, HexDirection::West, &lion, false), 2);
        assert_eq!(entry_cost(&map, high, HexDirection::West, &lion, true), 3);
        let minotaur = CreatureType::new("Minotaur", 4, 4).with_native_hexside(HazardHexside::Slope);
        assert_eq!(entry_cost(&map, high, HexDirection::West, &minotaur, true), 2);
        // Coming down the slope costs no climb
        let low = at(&b, 4, 4);
        assert_eq!(entry_cost(&map, low, HexDirection::East, &lion, true), 1);
    }

    #[test]
    fn test_river_slows_unless_water_dweller() {
        let b = battle_with(RulesConfig::default());
        let mut map = b.map.clone();
        let hex = at(&b, 5, 4);
        map.set_hexside(hex, HexDirection::West, HazardHexside::River);
        let lion = CreatureType::new("Lion", 5, 3);
        let hydra = CreatureType::new("Hydra", 10, 3).with_water_dwelling();
        assert_eq!(entry_cost(&map, hex, HexDirection::West, &lion, false), 2);
        assert_eq!(entry_cost(&map, hex, HexDirection::West, &hydra, false), 1);
    }

    #[test]
    fn test_occupied_hexes_block_unless_previewing() {
        let mut b = battle_with(RulesConfig::default());
        let ogre = add(&mut b, CreatureType::new("Ogre", 6, 2), Side::Attacker, 4, 4);
        add(&mut b, CreatureType::new("Lion", 5, 3), Side::Attacker, 5, 4);
        let ally_hex = at(&b, 5, 4);
        assert!(!legal_moves(&b, ogre, false).unwrap().contains(&ally_hex));
        assert!(legal_moves(&b, ogre, true).unwrap().contains(&ally_hex));
    }

    #[test]
    fn test_one_hex_allowed_reaches_expensive_first_step() {
        let mut rules = RulesConfig::default();
        rules.cumulative_slow = true;
        let mut b = battle_with(rules);
        let hex = at(&b, 5, 4);
        b.map.set_elevation(hex, 1);
        b.map.set_terrain(hex, HazardTerrain::Brambles);
        b.map.set_hexside(hex, HexDirection::West, HazardHexside::Slope);
        let ogre = add(&mut b, CreatureType::new("Ogre", 6, 2), Side::Attacker, 4, 4);
        assert!(!legal_moves(&b, ogre, false).unwrap().contains(&hex));

        b.rules.one_hex_allowed = true;
        assert!(legal_moves(&b, ogre, false).unwrap().contains(&hex));
    }

    #[test]
    fn test_flier_crosses_blocking_hexes() {
        let mut b = battle_with(RulesConfig::default());
        let griffon = add(
            &mut b,
            CreatureType::new("Griffon", 5, 3).with_flier(),
            Side::Attacker,
            1,
            4,
        );
        for r in 0..9 {
            let hex = at(&b, 2, r);
            b.map.set_terrain(hex, HazardTerrain::Bog);
        }
        let moves = legal_moves(&b, griffon, false).unwrap();
        assert!(moves.contains(&at(&b, 4, 4)));
        assert!(!moves.contains(&at(&b, 2, 4)));
        assert!(!moves.contains(&at(&b, 5, 4)));
    }

    #[test]
    fn test_stone_blocks_non_native_flight() {
        let mut b = battle_with(RulesConfig::default());
        let griffon = CreatureType::new("Griffon", 5, 3).with_flier();
        let hex = at(&b, 2, 4);
        b.map.set_terrain(hex, HazardTerrain::Stone);
        assert!(!can_be_flown_over(&b.map, hex, &griffon));
        let native = griffon.clone().with_native_terrain(HazardTerrain::Stone);
        assert!(can_be_flown_over(&b.map, hex, &native));
    }

    #[test]
    fn test_defender_start_list_on_turn_one() {
        let mut b = battle_with(RulesConfig::default());
        let a = at(&b, 1, 1);
        let c = at(&b, 7, 7);
        let held = at(&b, 4, 1);
        b.map.set_start_list(vec![a, c, held]);
        b.set_turn(1, Side::Defender, BattlePhase::Move);
        let ogre = add(&mut b, CreatureType::new("Ogre", 6, 2), Side::Defender, 4, 4);
        add(&mut b, CreatureType::new("Lion", 5, 3), Side::Defender, 4, 1);
        let moves = legal_moves(&b, ogre, false).unwrap();
        assert_eq!(moves.into_iter().collect::<Vec<_>>(), vec![a, c]);
        assert_eq!(legal_moves(&b, ogre, true).unwrap().len(), 3);
    }

    #[test]
    fn test_slowed_creature_moves_less() {
        let mut b = battle_with(RulesConfig::default());
        let ogre = add(&mut b, CreatureType::new("Ogre", 6, 2), Side::Attacker, 4, 4);
        b.combatant_mut(ogre).unwrap().slowed = 1;
        assert_eq!(legal_moves(&b, ogre, false).unwrap().len(), 6);
    }

    #[test]
    fn test_entrance_creature_moves_onto_board() {
        let mut b = battle_with(RulesConfig::default());
        let entrance = b.map.add_entrance("X1", BattleHexCoord::new(-1, 4)).unwrap();
        let ogre = b
            .add_combatant(Arc::new(CreatureType::new("Ogre", 6, 2)), Side::Attacker, entrance)
            .unwrap();
        let moves = legal_moves(&b, ogre, false).unwrap();
        assert!(moves.contains(&at(&b, 0, 4)));
        assert!(!moves.contains(&entrance));
    }
}

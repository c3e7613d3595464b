//! Battle terrain types and their effects
//!
//! Hex terrain decides entry, slowing, flight and line of sight; hexside
//! hazards decide climbing costs and most strike modifiers.

use serde::{Deserialize, Serialize};

/// Movement cost of an ordinary hex
pub const NORMAL_COST: u32 = 1;
/// Movement cost of a slowed entry when slowing does not stack
pub const SLOW_COST: u32 = 2;
/// Extra cost added by each slowing factor
pub const SLOW_INCREMENT_COST: u32 = SLOW_COST - NORMAL_COST;
/// Cost reported for entries that are not allowed at all
pub const IMPASSABLE_COST: u32 = 99;

/// Primary terrain type for a battle hex
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum HazardTerrain {
    #[default]
    Plains,
    Tower,
    Brambles,
    Sand,
    Tree,
    Bog,
    Volcano,
    Drift,
    Lake,
    Stone,
}

impl HazardTerrain {
    /// Only natives may end a ground move here
    pub fn is_native_only(&self) -> bool {
        matches!(
            self,
            HazardTerrain::Tree
                | HazardTerrain::Bog
                | HazardTerrain::Volcano
                | HazardTerrain::Lake
                | HazardTerrain::Stone
        )
    }

    /// Does entering this terrain cost a non-native extra movement?
    pub fn slows(&self, native: bool, flier: bool) -> bool {
        match self {
            HazardTerrain::Brambles | HazardTerrain::Drift => !native,
            HazardTerrain::Sand => !native && !flier,
            _ => false,
        }
    }

    /// Non-native fliers cannot fly over this terrain
    pub fn blocks_non_native_flight(&self) -> bool {
        matches!(self, HazardTerrain::Stone | HazardTerrain::Volcano)
    }

    /// Does this terrain block line of sight?
    pub fn blocks_los(&self) -> bool {
        matches!(self, HazardTerrain::Tree | HazardTerrain::Stone)
    }

    /// Intervening hexes of this terrain cost non-native rangestrikers skill
    pub fn hinders_rangestrikes(&self) -> bool {
        matches!(self, HazardTerrain::Brambles)
    }

    /// Skill lost when striking out of this terrain
    pub fn skill_penalty_strike_from(&self, attacker_native: bool) -> i32 {
        match self {
            HazardTerrain::Brambles if !attacker_native => 1,
            _ => 0,
        }
    }

    /// Strike number added when a melee target defends in this terrain
    pub fn skill_bonus_struck_in(&self, attacker_native: bool, defender_native: bool) -> i32 {
        match self {
            HazardTerrain::Brambles | HazardTerrain::Stone | HazardTerrain::Tree
                if defender_native && !attacker_native =>
            {
                1
            }
            _ => 0,
        }
    }

    /// Strike number added when a rangestrike target defends in this terrain
    ///
    /// Magic missiles ignore the bonus.
    pub fn rangestrike_bonus_struck_in(
        &self,
        attacker_native: bool,
        defender_native: bool,
        magic_missile: bool,
    ) -> i32 {
        match self {
            HazardTerrain::Brambles | HazardTerrain::Stone
                if defender_native && !attacker_native && !magic_missile =>
            {
                1
            }
            _ => 0,
        }
    }
}

/// Hazard on one side of a hex
///
/// The hazard is marked only on the higher of the two hexes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum HazardHexside {
    #[default]
    Nothing,
    Dune,
    Cliff,
    Slope,
    Wall,
    River,
}

impl HazardHexside {
    pub fn is_nothing(&self) -> bool {
        matches!(self, HazardHexside::Nothing)
    }

    /// Crossing this side upward costs a non-flier extra movement
    pub fn slows_climb(&self, native: bool) -> bool {
        match self {
            HazardHexside::Wall => true,
            HazardHexside::Slope => !native,
            _ => false,
        }
    }
}

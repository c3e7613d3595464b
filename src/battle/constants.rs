//! Battle rule constants - all tunable values in one place

// Ranges (inclusive: adjacent hexes are at range 2)
pub const OUT_OF_RANGE: u32 = 99;
/// Closest range a non magic-missile rangestrike may be made from
pub const MIN_RANGESTRIKE_RANGE: u32 = 3;
/// Ranges past this cost rangestrike skill, one point per hex
pub const RANGESTRIKE_PENALTY_FREE_RANGE: u32 = 3;

// Strike numbers
pub const BASE_STRIKE_NUMBER: i32 = 4;
pub const MIN_STRIKE_NUMBER: i32 = 1;
pub const MAX_STRIKE_NUMBER: i32 = 6;

// Dice modifiers
pub const VOLCANO_DICE_BONUS: i32 = 2;
pub const DUNE_DOWNHILL_DICE_BONUS: i32 = 2;
pub const SLOPE_DOWNHILL_DICE_BONUS: i32 = 1;
pub const DUNE_UPHILL_DICE_PENALTY: i32 = 1;

// Dice
pub const DIE_SIDES: u8 = 6;
/// Wasted luck at or above this counts as one whole hit
pub const WASTED_LUCK_THRESHOLD: f64 = 1.0 - 1e-16;

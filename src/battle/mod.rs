//! Battle system - hex tactical combat between two legions
//!
//! Creatures move across a hazard-laden hex map, then strike adjacent
//! enemies or rangestrike distant ones. Excess hits from a killing blow
//! may carry to other enemies in contact.

pub mod battle_map;
pub mod carry;
pub mod constants;
pub mod creature;
pub mod dice;
pub mod engine;
pub mod hex;
pub mod movement;
pub mod state;
pub mod strike;
pub mod terrain;
pub mod units;

// Re-exports for convenient access
pub use battle_map::{BattleHex, BattleMap, HexId, MapSpec};
pub use carry::{find_carry_options, CarryOptions, PenaltyOption, PenaltyOptionId};
pub use constants::*;
pub use creature::{CreatureCatalog, CreatureKind, CreatureType};
pub use dice::{DiceSource, FixedDice, ProbabilityDice, RandomDice, Rolls};
pub use engine::{CombatEngine, StrikeOptions, StrikeOutcome, StrikeResult};
pub use hex::{BattleHexCoord, HexDirection};
pub use movement::{can_be_flown_over, entry_cost, find_moves, legal_moves};
pub use state::Battle;
pub use strike::{strike_profile, StrikeProfile};
pub use terrain::{HazardHexside, HazardTerrain};
pub use units::{Combatant, Legion};

pub mod config;
pub mod error;
pub mod types;

pub use config::{DiceMode, RulesConfig};
pub use error::{BattleError, Result};
pub use types::{BattlePhase, CombatantId, Side, TagAllocator};

use thiserror::Error;

use crate::battle::battle_map::HexId;
use crate::core::types::CombatantId;

#[derive(Error, Debug)]
pub enum BattleError {
    #[error("Illegal move: {combatant} cannot move to {hex}")]
    IllegalMoveRequested { combatant: CombatantId, hex: HexId },

    #[error("Invalid strike target: {striker} cannot strike {target}")]
    InvalidStrikeTarget {
        striker: CombatantId,
        target: CombatantId,
    },

    #[error("Invalid carry choice: {0}")]
    InvalidCarryChoice(String),

    #[error("Inconsistent combatant state: {0}")]
    InconsistentCombatantState(String),

    #[error("Combatant not found: {0}")]
    CombatantNotFound(CombatantId),

    #[error("Hex not found: {0}")]
    HexNotFound(String),

    #[error("No carry damage is pending")]
    NoPendingCarry,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, BattleError>;

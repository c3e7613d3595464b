//! Rules configuration with documented options
//!
//! Every optional rule is collected here. The values travel with the
//! battle that uses them; there is no process-wide config.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::core::error::{BattleError, Result};

/// How strike dice are produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiceMode {
    /// Independent d6 rolls from a seeded or entropy-backed stream
    #[default]
    Random,
    /// Fixed repeating 1..=6 sequence, for reproducible games
    NonRandom,
    /// Expected hits plus accumulated rounding remainder
    ProbabilityBased,
}

/// Optional battle rules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    /// Let slowing effects stack
    ///
    /// Off: any slowed entry costs exactly 2 no matter how many slowing
    /// factors apply. On: each factor adds 1.
    pub cumulative_slow: bool,

    /// Always allow a one-hex move
    ///
    /// On the first step of a move search, a hex whose entry cost is
    /// larger than the mover's points is still reachable (unless it is
    /// impassable).
    pub one_hex_allowed: bool,

    /// Titan power before any score bonus
    pub titan_base_power: i32,

    /// Player score needed per extra point of titan power
    pub titan_improvement_value: u32,

    /// Dice source used by engines built from this config
    pub dice_mode: DiceMode,

    /// Seed for random dice; entropy when absent
    pub dice_seed: Option<u64>,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            cumulative_slow: false,
            one_hex_allowed: false,
            titan_base_power: 6,
            titan_improvement_value: 100,
            dice_mode: DiceMode::Random,
            dice_seed: None,
        }
    }
}

impl RulesConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse rules from TOML text; missing keys fall back to defaults
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: RulesConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load rules from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<()> {
        if self.titan_improvement_value == 0 {
            return Err(BattleError::Config(
                "titan_improvement_value must be positive".into(),
            ));
        }
        if self.titan_base_power <= 0 {
            return Err(BattleError::Config(format!(
                "titan_base_power ({}) must be positive",
                self.titan_base_power
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(RulesConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = RulesConfig::from_toml_str("cumulative_slow = true").unwrap();
        assert!(config.cumulative_slow);
        assert!(!config.one_hex_allowed);
        assert_eq!(config.titan_base_power, 6);
        assert_eq!(config.dice_mode, DiceMode::Random);
    }

    #[test]
    fn test_dice_mode_from_toml() {
        let config =
            RulesConfig::from_toml_str("dice_mode = \"probability_based\"\ndice_seed = 7").unwrap();
        assert_eq!(config.dice_mode, DiceMode::ProbabilityBased);
        assert_eq!(config.dice_seed, Some(7));
    }

    #[test]
    fn test_zero_improvement_rejected() {
        let result = RulesConfig::from_toml_str("titan_improvement_value = 0");
        assert!(matches!(result, Err(BattleError::Config(_))));
    }

    #[test]
    fn test_bad_toml_rejected() {
        let result = RulesConfig::from_toml_str("cumulative_slow = \"maybe\"");
        assert!(matches!(result, Err(BattleError::TomlParse(_))));
    }
}

//! Core type definitions used throughout the codebase

use serde::{Deserialize, Serialize};
use std::fmt;

/// Battle-scoped creature tag
///
/// Tags are handed out by a [`TagAllocator`] owned by one battle, so two
/// battles never share tag state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CombatantId(pub u32);

impl fmt::Display for CombatantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Monotonic tag source for a single battle
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TagAllocator {
    next: u32,
}

impl TagAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(&mut self) -> CombatantId {
        let id = CombatantId(self.next);
        self.next += 1;
        id
    }
}

/// Which legion a combatant fights for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Attacker,
    Defender,
}

impl Side {
    pub fn other(&self) -> Self {
        match self {
            Side::Attacker => Side::Defender,
            Side::Defender => Side::Attacker,
        }
    }

    pub fn index(&self) -> usize {
        match self {
            Side::Attacker => 0,
            Side::Defender => 1,
        }
    }
}

/// Sub-phase of a battle turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BattlePhase {
    #[default]
    Move,
    Fight,
    Strikeback,
}

impl BattlePhase {
    pub fn is_strike_phase(&self) -> bool {
        matches!(self, BattlePhase::Fight | BattlePhase::Strikeback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags_are_monotonic() {
        let mut tags = TagAllocator::new();
        let a = tags.allocate();
        let b = tags.allocate();
        assert!(b > a);
        assert_ne!(a, b);
    }

    #[test]
    fn test_separate_allocators_do_not_share_state() {
        let mut first = TagAllocator::new();
        let mut second = TagAllocator::new();
        first.allocate();
        first.allocate();
        assert_eq!(second.allocate(), CombatantId(0));
    }

    #[test]
    fn test_side_other() {
        assert_eq!(Side::Attacker.other(), Side::Defender);
        assert_eq!(Side::Defender.other(), Side::Attacker);
    }

    #[test]
    fn test_strike_phases() {
        assert!(!BattlePhase::Move.is_strike_phase());
        assert!(BattlePhase::Fight.is_strike_phase());
        assert!(BattlePhase::Strikeback.is_strike_phase());
    }
}

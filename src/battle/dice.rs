//! Dice sources for strike resolution
//!
//! The engine takes any [`DiceSource`]; which one a battle uses is a rules
//! setting.

use ahash::AHashMap;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

use crate::battle::constants::{DIE_SIDES, WASTED_LUCK_THRESHOLD};
use crate::core::config::{DiceMode, RulesConfig};
use crate::core::types::CombatantId;

/// Rolled dice for one strike
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Rolls {
    pub rolls: Vec<u8>,
    pub hits: u32,
}

impl Rolls {
    /// Score a list of rolls against a strike number
    pub fn score(rolls: Vec<u8>, strike_number: u8) -> Self {
        let hits = rolls.iter().filter(|r| **r >= strike_number).count() as u32;
        Self { rolls, hits }
    }

    /// Rolls written as one digit per die, e.g. "14625"
    pub fn roll_string(&self) -> String {
        self.rolls.iter().map(|r| r.to_string()).collect()
    }
}

/// Source of strike dice
pub trait DiceSource {
    fn roll_strike(&mut self, striker: CombatantId, dice: u32, strike_number: u8) -> Rolls;
}

impl<D: DiceSource + ?Sized> DiceSource for Box<D> {
    fn roll_strike(&mut self, striker: CombatantId, dice: u32, strike_number: u8) -> Rolls {
        (**self).roll_strike(striker, dice, strike_number)
    }
}

/// Independent d6 rolls from a ChaCha stream
#[derive(Debug, Clone)]
pub struct RandomDice {
    rng: ChaCha8Rng,
}

impl RandomDice {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        Self { rng }
    }
}

impl DiceSource for RandomDice {
    fn roll_strike(&mut self, _striker: CombatantId, dice: u32, strike_number: u8) -> Rolls {
        let rolls = (0..dice)
            .map(|_| self.rng.gen_range(1..=DIE_SIDES))
            .collect();
        Rolls::score(rolls, strike_number)
    }
}

/// Replays a fixed sequence of die faces, wrapping at the end
#[derive(Debug, Clone)]
pub struct FixedDice {
    sequence: Vec<u8>,
    position: usize,
}

impl FixedDice {
    /// Faces outside 1..=6 are clamped into range
    pub fn new(sequence: Vec<u8>) -> Self {
        let sequence: Vec<u8> = sequence
            .into_iter()
            .map(|face| face.clamp(1, DIE_SIDES))
            .collect();
        if sequence.is_empty() {
            return Self::cycling();
        }
        Self {
            sequence,
            position: 0,
        }
    }

    /// The classic non-random dice: 1, 2, 3, 4, 5, 6, 1, ...
    pub fn cycling() -> Self {
        Self {
            sequence: (1..=DIE_SIDES).collect(),
            position: 0,
        }
    }

    /// Every die shows the same face
    pub fn always(face: u8) -> Self {
        Self::new(vec![face])
    }

    fn next_face(&mut self) -> u8 {
        let face = self.sequence[self.position % self.sequence.len()];
        self.position = (self.position + 1) % self.sequence.len();
        face
    }
}

impl DiceSource for FixedDice {
    fn roll_strike(&mut self, _striker: CombatantId, dice: u32, strike_number: u8) -> Rolls {
        let rolls = (0..dice).map(|_| self.next_face()).collect();
        Rolls::score(rolls, strike_number)
    }
}

/// Expected hits, with the rounding remainder carried per creature
///
/// Each creature keeps a separate remainder for each strike number. When
/// a remainder reaches one whole hit, that strike gets an extra hit.
#[derive(Debug, Clone, Default)]
pub struct ProbabilityDice {
    wasted_luck: AHashMap<(CombatantId, u8), f64>,
}

impl ProbabilityDice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn wasted_luck(&self, striker: CombatantId, strike_number: u8) -> f64 {
        self.wasted_luck
            .get(&(striker, strike_number))
            .copied()
            .unwrap_or(0.0)
    }
}

impl DiceSource for ProbabilityDice {
    fn roll_strike(&mut self, striker: CombatantId, dice: u32, strike_number: u8) -> Rolls {
        let strike_number = strike_number.clamp(1, DIE_SIDES);
        let chance = f64::from(DIE_SIDES + 1 - strike_number) / f64::from(DIE_SIDES);
        let expected = f64::from(dice) * chance;
        let mut hits = expected.floor() as u32;

        let luck = self.wasted_luck.entry((striker, strike_number)).or_insert(0.0);
        *luck += expected - expected.floor();
        if *luck >= WASTED_LUCK_THRESHOLD {
            hits += 1;
            *luck -= 1.0;
        }
        let hits = hits.min(dice);

        let rolls = (0..dice)
            .map(|i| if i < hits { strike_number } else { 1 })
            .collect();
        Rolls { rolls, hits }
    }
}

/// Build the dice source a rules configuration asks for
pub fn from_config(rules: &RulesConfig) -> Box<dyn DiceSource> {
    match rules.dice_mode {
        DiceMode::Random => Box::new(RandomDice::new(rules.dice_seed)),
        DiceMode::NonRandom => Box::new(FixedDice::cycling()),
        DiceMode::ProbabilityBased => Box::new(ProbabilityDice::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STRIKER: CombatantId = CombatantId(1);

    #[test]
    fn test_score_counts_rolls_at_or_above() {
        let rolls = Rolls::score(vec![1, 4, 6, 3, 4], 4);
        assert_eq!(rolls.hits, 3);
        assert_eq!(rolls.roll_string(), "14634");
    }

    #[test]
    fn test_seeded_random_dice_repeat() {
        let mut a = RandomDice::new(Some(42));
        let mut b = RandomDice::new(Some(42));
        let first = a.roll_strike(STRIKER, 12, 4);
        assert_eq!(first, b.roll_strike(STRIKER, 12, 4));
        assert_eq!(first.rolls.len(), 12);
        assert!(first.rolls.iter().all(|r| (1..=6).contains(r)));
    }

    #[test]
    fn test_fixed_dice_cycle() {
        let mut dice = FixedDice::cycling();
        let rolls = dice.roll_strike(STRIKER, 8, 5);
        assert_eq!(rolls.rolls, vec![1, 2, 3, 4, 5, 6, 1, 2]);
        assert_eq!(rolls.hits, 2);
        assert_eq!(dice.roll_strike(STRIKER, 1, 1).rolls, vec![3]);
    }

    #[test]
    fn test_fixed_dice_clamps_faces() {
        let mut dice = FixedDice::new(vec![0, 9]);
        assert_eq!(dice.roll_strike(STRIKER, 2, 6).rolls, vec![1, 6]);
    }

    #[test]
    fn test_probability_dice_expected_hits() {
        let mut dice = ProbabilityDice::new();
        // 6 dice at 4+ expect exactly 3
        let rolls = dice.roll_strike(STRIKER, 6, 4);
        assert_eq!(rolls.hits, 3);
        assert_eq!(rolls.rolls, vec![4, 4, 4, 1, 1, 1]);
    }

    #[test]
    fn test_probability_dice_accumulates_remainder() {
        let mut dice = ProbabilityDice::new();
        // 2 dice at 6+ expect 1/3 of a hit: 0, 0, then 1
        assert_eq!(dice.roll_strike(STRIKER, 2, 6).hits, 0);
        assert_eq!(dice.roll_strike(STRIKER, 2, 6).hits, 0);
        assert_eq!(dice.roll_strike(STRIKER, 2, 6).hits, 1);
        assert!(dice.wasted_luck(STRIKER, 6) < 1e-9);
    }

    #[test]
    fn test_probability_luck_is_per_creature() {
        let mut dice = ProbabilityDice::new();
        dice.roll_strike(STRIKER, 3, 6);
        assert!(dice.wasted_luck(STRIKER, 6) > 0.4);
        assert_eq!(dice.wasted_luck(CombatantId(2), 6), 0.0);
    }

    #[test]
    fn test_from_config_modes() {
        let mut rules = RulesConfig::default();
        rules.dice_mode = DiceMode::NonRandom;
        let mut dice = from_config(&rules);
        assert_eq!(dice.roll_strike(STRIKER, 3, 2).rolls, vec![1, 2, 3]);
    }
}

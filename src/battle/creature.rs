//! Creature types and the catalog they are looked up from
//!
//! Creature types are immutable once loaded and shared between combatants
//! through `Arc`.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use crate::battle::terrain::{HazardHexside, HazardTerrain};
use crate::core::config::RulesConfig;
use crate::core::error::{BattleError, Result};

/// The standard creature set, bundled with the crate
const STANDARD_CREATURES: &str = include_str!("../../data/creatures.toml");

/// How a creature's power is decided
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreatureKind {
    /// Power comes straight from the catalog
    #[default]
    Standard,
    /// Power grows with the owning player's score
    Titan,
}

/// Catalog entry for one kind of creature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatureType {
    pub name: String,
    pub power: i32,
    pub skill: i32,
    #[serde(default)]
    pub kind: CreatureKind,
    #[serde(default)]
    pub flier: bool,
    #[serde(default)]
    pub rangestriker: bool,
    #[serde(default)]
    pub magic_missile: bool,
    #[serde(default)]
    pub lord: bool,
    /// Carried for catalog completeness; no battle rule reads it
    #[serde(default)]
    pub demi_lord: bool,
    #[serde(default)]
    pub water_dwelling: bool,
    #[serde(default)]
    pub native_terrains: Vec<HazardTerrain>,
    #[serde(default)]
    pub native_hexsides: Vec<HazardHexside>,
    /// Poison damage added to a target this creature wounds
    #[serde(default)]
    pub poison: i32,
    /// Movement points taken from a target this creature wounds
    #[serde(default)]
    pub slows: i32,
}

impl CreatureType {
    pub fn new(name: &str, power: i32, skill: i32) -> Self {
        Self {
            name: name.to_string(),
            power,
            skill,
            kind: CreatureKind::Standard,
            flier: false,
            rangestriker: false,
            magic_missile: false,
            lord: false,
            demi_lord: false,
            water_dwelling: false,
            native_terrains: Vec::new(),
            native_hexsides: Vec::new(),
            poison: 0,
            slows: 0,
        }
    }

    pub fn titan(power: i32, skill: i32) -> Self {
        Self {
            kind: CreatureKind::Titan,
            lord: true,
            ..Self::new("Titan", power, skill)
        }
    }

    pub fn with_flier(mut self) -> Self {
        self.flier = true;
        self
    }

    pub fn with_rangestrike(mut self) -> Self {
        self.rangestriker = true;
        self
    }

    pub fn with_magic_missile(mut self) -> Self {
        self.rangestriker = true;
        self.magic_missile = true;
        self
    }

    pub fn with_lord(mut self) -> Self {
        self.lord = true;
        self
    }

    pub fn with_water_dwelling(mut self) -> Self {
        self.water_dwelling = true;
        self
    }

    pub fn with_native_terrain(mut self, terrain: HazardTerrain) -> Self {
        self.native_terrains.push(terrain);
        self
    }

    pub fn with_native_hexside(mut self, hexside: HazardHexside) -> Self {
        self.native_hexsides.push(hexside);
        self
    }

    pub fn with_poison(mut self, poison: i32) -> Self {
        self.poison = poison;
        self
    }

    pub fn with_slows(mut self, slows: i32) -> Self {
        self.slows = slows;
        self
    }

    pub fn is_titan(&self) -> bool {
        self.kind == CreatureKind::Titan
    }

    /// Water dwellers are native to lakes without listing them
    pub fn is_native_terrain(&self, terrain: HazardTerrain) -> bool {
        self.native_terrains.contains(&terrain)
            || (terrain == HazardTerrain::Lake && self.water_dwelling)
    }

    pub fn is_native_hexside(&self, hexside: HazardHexside) -> bool {
        self.native_hexsides.contains(&hexside)
    }

    /// Power in battle for a creature owned by a player with `player_score`
    pub fn power_for(&self, player_score: u32, rules: &RulesConfig) -> i32 {
        match self.kind {
            CreatureKind::Standard => self.power,
            CreatureKind::Titan => {
                let improvement = rules.titan_improvement_value.max(1);
                rules.titan_base_power + (player_score / improvement) as i32
            }
        }
    }

    /// Point value at catalog power
    pub fn point_value(&self) -> i32 {
        self.point_value_at(self.power)
    }

    /// Point value at a given battle power, for titans that have grown
    pub fn point_value_at(&self, power: i32) -> i32 {
        power * self.skill
    }

    /// Presentation order at catalog power, most important first
    pub fn compare_importance(&self, other: &Self) -> Ordering {
        self.compare_importance_at(self.power, other, other.power)
    }

    /// Presentation order, most important first
    ///
    /// Titans lead, then higher point value at the given powers, then
    /// rangestrikers, then fliers, and finally the name so the order is
    /// total.
    pub fn compare_importance_at(&self, power: i32, other: &Self, other_power: i32) -> Ordering {
        other
            .is_titan()
            .cmp(&self.is_titan())
            .then_with(|| other.point_value_at(other_power).cmp(&self.point_value_at(power)))
            .then_with(|| other.rangestriker.cmp(&self.rangestriker))
            .then_with(|| other.flier.cmp(&self.flier))
            .then_with(|| self.name.cmp(&other.name))
    }
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    creatures: Vec<CreatureType>,
}

/// Read-only lookup of creature types by name
#[derive(Debug, Clone, Default)]
pub struct CreatureCatalog {
    types: AHashMap<String, Arc<CreatureType>>,
}

impl CreatureCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// The bundled standard creature set
    pub fn standard() -> Result<Self> {
        Self::from_toml_str(STANDARD_CREATURES)
    }

    /// Parse a catalog from TOML text with a `[[creatures]]` table array
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let file: CatalogFile = toml::from_str(contents)?;
        let mut catalog = Self::new();
        for creature in file.creatures {
            catalog.insert(creature)?;
        }
        Ok(catalog)
    }

    /// Load a catalog from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn insert(&mut self, creature: CreatureType) -> Result<Arc<CreatureType>> {
        if creature.power <= 0 || creature.skill <= 0 {
            return Err(BattleError::Config(format!(
                "creature {} needs positive power and skill, got {}-{}",
                creature.name, creature.power, creature.skill
            )));
        }
        if self.types.contains_key(&creature.name) {
            return Err(BattleError::Config(format!(
                "creature {} defined twice",
                creature.name
            )));
        }
        let creature = Arc::new(creature);
        self.types
            .insert(creature.name.clone(), Arc::clone(&creature));
        Ok(creature)
    }

    pub fn get(&self, name: &str) -> Option<Arc<CreatureType>> {
        self.types.get(name).cloned()
    }

    /// Lookup that reports an unknown name as an error
    pub fn require(&self, name: &str) -> Result<Arc<CreatureType>> {
        self.get(name)
            .ok_or_else(|| BattleError::Config(format!("unknown creature type {}", name)))
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Creature names in sorted order
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.types.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_catalog_loads() {
        let catalog = CreatureCatalog::standard().unwrap();
        assert!(catalog.len() >= 20);
        let ogre = catalog.require("Ogre").unwrap();
        assert_eq!((ogre.power, ogre.skill), (6, 2));
        assert!(ogre.is_native_terrain(HazardTerrain::Bog));
        assert!(catalog.require("Titan").unwrap().is_titan());
    }

    #[test]
    fn test_unknown_creature_is_an_error() {
        let catalog = CreatureCatalog::standard().unwrap();
        assert!(matches!(catalog.require("Kraken"), Err(BattleError::Config(_))));
    }

    #[test]
    fn test_duplicate_creature_rejected() {
        let toml = r#"
            [[creatures]]
            name = "Ogre"
            power = 6
            skill = 2
            [[creatures]]
            name = "Ogre"
            power = 6
            skill = 2
        "#;
        assert!(CreatureCatalog::from_toml_str(toml).is_err());
    }

    #[test]
    fn test_titan_power_tracks_score() {
        let rules = RulesConfig::default();
        let titan = CreatureType::titan(6, 4);
        assert_eq!(titan.power_for(0, &rules), 6);
        assert_eq!(titan.power_for(99, &rules), 6);
        assert_eq!(titan.power_for(250, &rules), 8);

        let ogre = CreatureType::new("Ogre", 6, 2);
        assert_eq!(ogre.power_for(1000, &rules), 6);
    }

    #[test]
    fn test_importance_order() {
        let titan = CreatureType::titan(6, 4);
        let dragon = CreatureType::new("Dragon", 9, 3).with_flier().with_rangestrike();
        let colossus = CreatureType::new("Colossus", 10, 4);
        let ogre = CreatureType::new("Ogre", 6, 2);
        let lion = CreatureType::new("Lion", 5, 3);

        let mut creatures = vec![&ogre, &lion, &dragon, &titan, &colossus];
        creatures.sort_by(|a, b| a.compare_importance(b));
        let names: Vec<&str> = creatures.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Titan", "Colossus", "Dragon", "Lion", "Ogre"]);
    }

    #[test]
    fn test_equal_value_prefers_rangestriker_then_flier() {
        let plain = CreatureType::new("Aardvark", 4, 4);
        let flier = CreatureType::new("Bat", 4, 4).with_flier();
        let ranged = CreatureType::new("Centaur", 4, 4).with_rangestrike();
        assert_eq!(ranged.compare_importance(&flier), Ordering::Less);
        assert_eq!(flier.compare_importance(&plain), Ordering::Less);
    }

    #[test]
    fn test_grown_titan_outranks_smaller_titan() {
        let rules = RulesConfig::default();
        let titan = CreatureType::titan(6, 4);
        let grown = titan.power_for(250, &rules);
        assert_eq!(titan.compare_importance(&titan), Ordering::Equal);
        assert_eq!(
            titan.compare_importance_at(grown, &titan, 6),
            Ordering::Less
        );
        assert_eq!(titan.point_value_at(grown), 32);
    }
}

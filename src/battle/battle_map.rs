//! Battle map with hex grid, terrain, and hexside hazards
//!
//! Hexes live in an arena and are referenced by [`HexId`]. Neighbors are
//! stored as an id array indexed by [`HexDirection::index`], so every
//! search over the map works on plain integers.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;

use crate::battle::constants::OUT_OF_RANGE;
use crate::battle::hex::{BattleHexCoord, HexDirection};
use crate::battle::terrain::{HazardHexside, HazardTerrain};
use crate::core::error::{BattleError, Result};

/// Index of a hex in its map's arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HexId(pub u16);

impl fmt::Display for HexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "hex {}", self.0)
    }
}

/// A single hex on the battle map
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BattleHex {
    pub id: HexId,
    pub label: String,
    pub coord: BattleHexCoord,
    pub terrain: HazardTerrain,
    pub elevation: i8,
    pub hexsides: [HazardHexside; 6],
    pub neighbors: [Option<HexId>; 6],
    /// Offboard staging hex where a legion waits before entering
    pub entrance: bool,
}

impl BattleHex {
    pub fn new(id: HexId, label: String, coord: BattleHexCoord, terrain: HazardTerrain) -> Self {
        Self {
            id,
            label,
            coord,
            terrain,
            elevation: 0,
            hexsides: [HazardHexside::Nothing; 6],
            neighbors: [None; 6],
            entrance: false,
        }
    }

    pub fn neighbor(&self, direction: HexDirection) -> Option<HexId> {
        self.neighbors[direction.index()]
    }

    /// Hazard marked on this hex's side facing `direction`
    pub fn hexside(&self, direction: HexDirection) -> HazardHexside {
        self.hexsides[direction.index()]
    }

    /// Does any side of this hex carry a defensive wall?
    pub fn has_wall(&self) -> bool {
        self.hexsides.iter().any(|h| *h == HazardHexside::Wall)
    }

    pub fn is_entrance(&self) -> bool {
        self.entrance
    }
}

/// Every hex id must fit in a `HexId`
pub const MAX_HEXES: usize = u16::MAX as usize + 1;

/// Label for an on-board hex: column letter then 1-based row
pub fn hex_label(coord: BattleHexCoord) -> String {
    let column = (b'A' + coord.q.clamp(0, 25) as u8) as char;
    format!("{}{}", column, coord.r + 1)
}

/// The full battle map
#[derive(Debug, Clone, Serialize)]
pub struct BattleMap {
    pub name: String,
    pub width: u32,
    pub height: u32,
    hexes: Vec<BattleHex>,
    #[serde(skip)]
    by_coord: AHashMap<BattleHexCoord, HexId>,
    #[serde(skip)]
    by_label: AHashMap<String, HexId>,
    /// Fixed hexes a defender may occupy on turn 1, for terrains that have one
    pub start_list: Option<Vec<HexId>>,
}

impl BattleMap {
    /// Create a new battle map of plains
    ///
    /// Columns are lettered, so at most 26 are allowed, and every hex
    /// needs a 16-bit id.
    pub fn new(width: u32, height: u32) -> Result<Self> {
        let count = u64::from(width) * u64::from(height);
        if width == 0 || width > 26 || height == 0 || count > MAX_HEXES as u64 {
            return Err(BattleError::Config(format!(
                "unsupported map size {}x{}",
                width, height
            )));
        }

        let mut map = Self {
            name: String::from("Plains"),
            width,
            height,
            hexes: Vec::with_capacity(count as usize),
            by_coord: AHashMap::new(),
            by_label: AHashMap::new(),
            start_list: None,
        };

        for q in 0..width as i32 {
            for r in 0..height as i32 {
                let coord = BattleHexCoord::new(q, r);
                map.push_hex(hex_label(coord), coord)?;
            }
        }

        let ids: Vec<HexId> = map.hexes.iter().map(|h| h.id).collect();
        for id in ids {
            map.link_neighbors(id);
        }
        Ok(map)
    }

    fn push_hex(&mut self, label: String, coord: BattleHexCoord) -> Result<HexId> {
        let id = u16::try_from(self.hexes.len())
            .map(HexId)
            .map_err(|_| BattleError::Config(format!("no hex id left for {}", label)))?;
        self.hexes
            .push(BattleHex::new(id, label.clone(), coord, HazardTerrain::Plains));
        self.by_coord.insert(coord, id);
        self.by_label.insert(label, id);
        Ok(id)
    }

    fn link_neighbors(&mut self, id: HexId) {
        let coord = self.hexes[id.0 as usize].coord;
        for direction in HexDirection::all() {
            let neighbor = self
                .by_coord
                .get(&coord.neighbor(direction))
                .copied()
                .filter(|n| !self.hexes[n.0 as usize].entrance);
            self.hexes[id.0 as usize].neighbors[direction.index()] = neighbor;
        }
    }

    /// Add an offboard entrance hex next to the board edge
    ///
    /// The entrance sees its on-board neighbors, but board hexes do not
    /// link back, so nothing on the board is ever adjacent to it.
    pub fn add_entrance(&mut self, label: &str, coord: BattleHexCoord) -> Result<HexId> {
        if self.by_coord.contains_key(&coord) {
            return Err(BattleError::Config(format!(
                "entrance {} overlaps an existing hex at {:?}",
                label, coord
            )));
        }
        let id = self.push_hex(label.to_string(), coord)?;
        self.hexes[id.0 as usize].entrance = true;
        self.link_neighbors(id);
        Ok(id)
    }

    pub fn len(&self) -> usize {
        self.hexes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hexes.is_empty()
    }

    pub fn hexes(&self) -> impl Iterator<Item = &BattleHex> {
        self.hexes.iter()
    }

    pub fn hex(&self, id: HexId) -> Option<&BattleHex> {
        self.hexes.get(id.0 as usize)
    }

    /// Hex lookup that reports a missing id as an error
    pub fn try_hex(&self, id: HexId) -> Result<&BattleHex> {
        self.hex(id)
            .ok_or_else(|| BattleError::HexNotFound(id.to_string()))
    }

    pub fn hex_at(&self, coord: BattleHexCoord) -> Option<HexId> {
        self.by_coord.get(&coord).copied()
    }

    pub fn hex_by_label(&self, label: &str) -> Option<HexId> {
        self.by_label.get(label).copied()
    }

    /// Label lookup that reports a missing label as an error
    pub fn require_label(&self, label: &str) -> Result<HexId> {
        self.hex_by_label(label)
            .ok_or_else(|| BattleError::HexNotFound(label.to_string()))
    }

    pub fn neighbor(&self, id: HexId, direction: HexDirection) -> Option<HexId> {
        self.hex(id).and_then(|h| h.neighbor(direction))
    }

    /// Set terrain at a hex
    pub fn set_terrain(&mut self, id: HexId, terrain: HazardTerrain) {
        if let Some(hex) = self.hexes.get_mut(id.0 as usize) {
            hex.terrain = terrain;
        }
    }

    /// Set elevation at a hex
    pub fn set_elevation(&mut self, id: HexId, elevation: i8) {
        if let Some(hex) = self.hexes.get_mut(id.0 as usize) {
            hex.elevation = elevation;
        }
    }

    /// Mark a hazard on one side of a hex (mark it on the higher hex)
    pub fn set_hexside(&mut self, id: HexId, direction: HexDirection, hazard: HazardHexside) {
        if let Some(hex) = self.hexes.get_mut(id.0 as usize) {
            hex.hexsides[direction.index()] = hazard;
        }
    }

    pub fn set_start_list(&mut self, hexes: Vec<HexId>) {
        self.start_list = Some(hexes);
    }

    pub fn elevation(&self, id: HexId) -> i8 {
        self.hex(id).map(|h| h.elevation).unwrap_or(0)
    }

    pub fn terrain(&self, id: HexId) -> HazardTerrain {
        self.hex(id).map(|h| h.terrain).unwrap_or_default()
    }

    pub fn is_entrance(&self, id: HexId) -> bool {
        self.hex(id).map(|h| h.entrance).unwrap_or(false)
    }

    /// Hazard marked on the neighbor's side of the hexside in `direction`
    pub fn opposite_hazard(&self, id: HexId, direction: HexDirection) -> HazardHexside {
        self.neighbor(id, direction)
            .and_then(|n| self.hex(n))
            .map(|n| n.hexside(direction.opposite()))
            .unwrap_or_default()
    }

    /// Is the hexside in `direction` a cliff, marked from either side?
    pub fn is_cliff(&self, id: HexId, direction: HexDirection) -> bool {
        let own = self
            .hex(id)
            .map(|h| h.hexside(direction))
            .unwrap_or_default();
        own == HazardHexside::Cliff || self.opposite_hazard(id, direction) == HazardHexside::Cliff
    }

    /// Direction from `from` towards `to`
    ///
    /// Adjacent hexes have exactly one answer. Further away, a line along a
    /// hexspine has two candidate first steps and `left` picks one.
    pub fn direction(&self, from: HexId, to: HexId, left: bool) -> Option<HexDirection> {
        let (a, b) = (self.hex(from)?, self.hex(to)?);
        if from == to || a.entrance || b.entrance {
            return None;
        }
        if let Some(direction) = a.coord.direction_to(&b.coord) {
            return Some(direction);
        }
        let line = a.coord.line_to(&b.coord, left);
        a.coord.direction_to(line.get(1)?)
    }

    /// Range inclusive at both ends: adjacent hexes are at range 2
    ///
    /// The range to an entrance is the range to its closest neighbor plus one.
    pub fn range(&self, from: HexId, to: HexId) -> u32 {
        let (Some(a), Some(b)) = (self.hex(from), self.hex(to)) else {
            return OUT_OF_RANGE;
        };
        if a.entrance && b.entrance {
            return OUT_OF_RANGE;
        }
        if a.entrance {
            return self.min_range_from_neighbors(a, to);
        }
        if b.entrance {
            return self.min_range_from_neighbors(b, from);
        }
        a.coord.distance(&b.coord) + 1
    }

    fn min_range_from_neighbors(&self, entrance: &BattleHex, other: HexId) -> u32 {
        entrance
            .neighbors
            .iter()
            .flatten()
            .map(|n| self.range(*n, other))
            .min()
            .map(|r| r.saturating_add(1))
            .unwrap_or(OUT_OF_RANGE)
    }

    /// Hexes strictly between two hexes along a straight line
    pub fn intervening_hexes(&self, from: HexId, to: HexId, left: bool) -> Vec<HexId> {
        let (Some(a), Some(b)) = (self.hex(from), self.hex(to)) else {
            return Vec::new();
        };
        let line = a.coord.line_to(&b.coord, left);
        line.iter()
            .skip(1)
            .take(line.len().saturating_sub(2))
            .filter_map(|coord| self.hex_at(*coord))
            .collect()
    }

    /// Number of intervening bramble hexes
    ///
    /// Along a hexspine both sides are counted and the lower total is used.
    pub fn count_bramble_hexes(&self, from: HexId, to: HexId) -> u32 {
        if from == to {
            return 0;
        }
        let count = |left: bool| {
            self.intervening_hexes(from, to, left)
                .into_iter()
                .filter(|id| self.terrain(*id).hinders_rangestrikes())
                .count() as u32
        };
        count(true).min(count(false))
    }

    /// Build a map from a parsed description
    pub fn from_spec(spec: &MapSpec) -> Result<Self> {
        let mut map = BattleMap::new(spec.width, spec.height)?;
        map.name = spec.name.clone();

        for hex in &spec.hexes {
            let id = map.require_label(&hex.label)?;
            if let Some(terrain) = hex.terrain {
                map.set_terrain(id, terrain);
            }
            if let Some(elevation) = hex.elevation {
                map.set_elevation(id, elevation);
            }
        }

        for side in &spec.hexsides {
            let id = map.require_label(&side.hex)?;
            map.set_hexside(id, side.direction, side.hazard);
        }

        for entrance in &spec.entrances {
            map.add_entrance(&entrance.label, BattleHexCoord::new(entrance.q, entrance.r))?;
        }

        if let Some(labels) = &spec.start_list {
            let ids = labels
                .iter()
                .map(|label| map.require_label(label))
                .collect::<Result<Vec<_>>>()?;
            map.set_start_list(ids);
        }

        Ok(map)
    }

    /// Parse and build a map from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let spec: MapSpec = toml::from_str(contents)?;
        Self::from_spec(&spec)
    }

    /// Load a map from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }
}

/// Serialized description of a battle map
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MapSpec {
    pub name: String,
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub hexes: Vec<HexSpec>,
    #[serde(default)]
    pub hexsides: Vec<HexsideSpec>,
    #[serde(default)]
    pub entrances: Vec<EntranceSpec>,
    #[serde(default)]
    pub start_list: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HexSpec {
    pub label: String,
    #[serde(default)]
    pub terrain: Option<HazardTerrain>,
    #[serde(default)]
    pub elevation: Option<i8>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HexsideSpec {
    pub hex: String,
    pub direction: HexDirection,
    pub hazard: HazardHexside,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntranceSpec {
    pub label: String,
    pub q: i32,
    pub r: i32,
}

//! Battle-land hex geometry
//!
//! Hexes are addressed by axial (q, r) pairs with the implied cube third
//! component `s = -q - r`. Hexside `d` of a hex is hexside `(d + 3) % 6`
//! of the neighbor across it.

use serde::{Deserialize, Serialize};

/// Offset applied to both ends of a line so a line running along a
/// hexspine rounds to one side
const SPINE_NUDGE: (f64, f64, f64) = (1e-6, 2e-6, -3e-6);

/// Position of a hex on a battle map
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct BattleHexCoord {
    pub q: i32,
    pub r: i32,
}

impl BattleHexCoord {
    pub fn new(q: i32, r: i32) -> Self {
        Self { q, r }
    }

    /// Third cube component
    pub fn s(&self) -> i32 {
        -self.q - self.r
    }

    /// Number of hex steps between two coordinates
    pub fn distance(&self, other: &Self) -> u32 {
        let dq = self.q.abs_diff(other.q);
        let dr = self.r.abs_diff(other.r);
        let ds = self.s().abs_diff(other.s());
        dq.max(dr).max(ds)
    }

    /// Coordinate one step away in `direction`
    pub fn neighbor(&self, direction: HexDirection) -> Self {
        let offset = direction.offset();
        Self::new(self.q + offset.q, self.r + offset.r)
    }

    /// Get all 6 neighboring hex coordinates, in direction order
    pub fn neighbors(&self) -> [BattleHexCoord; 6] {
        HexDirection::all().map(|d| self.neighbor(d))
    }

    /// Direction of an adjacent coordinate, if it is adjacent
    pub fn direction_to(&self, other: &Self) -> Option<HexDirection> {
        HexDirection::all()
            .into_iter()
            .find(|d| self.neighbor(*d) == *other)
    }

    /// Hex coordinates in a line from self to other (inclusive)
    ///
    /// When the line runs exactly along a hexspine, `left` picks which of
    /// the two bordering hexes the line passes through.
    pub fn line_to(&self, other: &Self, left: bool) -> Vec<BattleHexCoord> {
        let steps = self.distance(other);
        if steps == 0 {
            return vec![*self];
        }

        let sign = if left { 1.0 } else { -1.0 };
        let nudged = |c: &Self| {
            (
                c.q as f64 + SPINE_NUDGE.0 * sign,
                c.r as f64 + SPINE_NUDGE.1 * sign,
                c.s() as f64 + SPINE_NUDGE.2 * sign,
            )
        };
        let from = nudged(self);
        let to = nudged(other);
        let lerp = |a: f64, b: f64, t: f64| a + (b - a) * t;

        (0..=steps)
            .map(|step| {
                let t = f64::from(step) / f64::from(steps);
                Self::round(lerp(from.0, to.0, t), lerp(from.1, to.1, t), lerp(from.2, to.2, t))
            })
            .collect()
    }

    /// Nearest hex to a fractional cube position. The component that moved
    /// most in rounding is rebuilt from the other two.
    fn round(q: f64, r: f64, s: f64) -> Self {
        let (mut q_i, mut r_i, s_i) = (q.round(), r.round(), s.round());
        let (q_err, r_err, s_err) = ((q_i - q).abs(), (r_i - r).abs(), (s_i - s).abs());

        if q_err > r_err && q_err > s_err {
            q_i = -r_i - s_i;
        } else if r_err > s_err {
            r_i = -q_i - s_i;
        }
        Self::new(q_i as i32, r_i as i32)
    }
}

/// One of the six hexsides, counter-clockwise from east
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum HexDirection {
    #[default]
    East = 0,
    NorthEast = 1,
    NorthWest = 2,
    West = 3,
    SouthWest = 4,
    SouthEast = 5,
}

/// Axial step for each direction, by index
const OFFSETS: [(i32, i32); 6] = [(1, 0), (1, -1), (0, -1), (-1, 0), (-1, 1), (0, 1)];

const ALL_DIRECTIONS: [HexDirection; 6] = [
    HexDirection::East,
    HexDirection::NorthEast,
    HexDirection::NorthWest,
    HexDirection::West,
    HexDirection::SouthWest,
    HexDirection::SouthEast,
];

impl HexDirection {
    /// Axial step taken when moving this way
    pub fn offset(&self) -> BattleHexCoord {
        let (q, r) = OFFSETS[self.index()];
        BattleHexCoord::new(q, r)
    }

    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Direction for a hexside index; wraps modulo 6
    pub fn from_index(index: usize) -> Self {
        ALL_DIRECTIONS[index % 6]
    }

    pub fn opposite(&self) -> Self {
        Self::from_index(self.index() + 3)
    }

    pub fn all() -> [HexDirection; 6] {
        ALL_DIRECTIONS
    }
}

//! Grid positions.
//!
//! Units move one cell per tick along both axes at once, so travel time
//! between two cells is their Chebyshev distance.

use core::cmp::Ordering;
use core::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A cell on the disaster-zone grid. Serialises as `[x, y]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "(i64, i64)", into = "(i64, i64)")]
pub struct Position {
    /// Column.
    pub x: i64,
    /// Row.
    pub y: i64,
}

/// Where units start and return to.
pub const BASE: Position = Position { x: 0, y: 0 };

impl Position {
    /// Create a position.
    pub const fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }

    /// Read a `[x, y]` JSON array.
    pub fn from_value(value: &Value) -> Option<Self> {
        let [x, y] = value.as_array()?.as_slice() else {
            return None;
        };
        Some(Self::new(x.as_i64()?, y.as_i64()?))
    }

    /// The `[x, y]` JSON form.
    pub fn to_value(self) -> Value {
        Value::from(vec![self.x, self.y])
    }

    /// One cell closer to `target` on each axis.
    #[must_use]
    pub fn step_toward(self, target: Self) -> Self {
        Self {
            x: step_axis(self.x, target.x),
            y: step_axis(self.y, target.y),
        }
    }

    /// Ticks needed to reach `target`.
    pub const fn distance(self, target: Self) -> u64 {
        let dx = self.x.abs_diff(target.x);
        let dy = self.y.abs_diff(target.y);
        if dx > dy { dx } else { dy }
    }
}

fn step_axis(from: i64, to: i64) -> i64 {
    match to.cmp(&from) {
        Ordering::Greater => from.saturating_add(1),
        Ordering::Less => from.saturating_sub(1),
        Ordering::Equal => from,
    }
}

impl From<(i64, i64)> for Position {
    fn from((x, y): (i64, i64)) -> Self {
        Self::new(x, y)
    }
}

impl From<Position> for (i64, i64) {
    fn from(position: Position) -> Self {
        (position.x, position.y)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

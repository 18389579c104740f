use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};
use std::str::FromStr;
use thiserror::Error;

/// An integer cell coordinate on the board.
///
/// `x` grows to the east and `y` grows to the south, so north is `(0, -1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct GridPosition {
    /// Column.
    pub x: i32,
    /// Row.
    pub y: i32,
}

impl GridPosition {
    /// The origin cell.
    pub const ZERO: GridPosition = GridPosition { x: 0, y: 0 };

    /// Create a new position.
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Rotate 90 degrees counter-clockwise.
    pub const fn rotate_left(self) -> Self {
        Self::new(self.y, -self.x)
    }

    /// Rotate 90 degrees clockwise.
    pub const fn rotate_right(self) -> Self {
        Self::new(-self.y, self.x)
    }

    /// Clamp both components into `[0, size - 1]`.
    pub fn clamp(self, size: i32) -> Self {
        let max = (size - 1).max(0);
        Self::new(self.x.clamp(0, max), self.y.clamp(0, max))
    }

    /// Whether this position lies on an `size`×`size` board.
    pub fn in_bounds(self, size: i32) -> bool {
        (0..size).contains(&self.x) && (0..size).contains(&self.y)
    }

    /// Whether this position is on the outer ring of an `size`×`size` board.
    pub fn on_edge(self, size: i32) -> bool {
        self.x == 0 || self.y == 0 || self.x == size - 1 || self.y == size - 1
    }

    /// Every edge cell of an `size`×`size` board: the top and bottom rows
    /// column by column, then the first and last cell of each middle row.
    pub fn surround(size: i32) -> Vec<GridPosition> {
        if size == 1 {
            return vec![Self::ZERO];
        }
        let mut points = Vec::new();
        for x in 0..size {
            points.push(Self::new(x, 0));
            points.push(Self::new(x, size - 1));
        }
        for y in 1..size - 1 {
            points.push(Self::new(0, y));
            points.push(Self::new(size - 1, y));
        }
        points
    }
}

impl Add for GridPosition {
    type Output = GridPosition;

    fn add(self, other: GridPosition) -> GridPosition {
        GridPosition::new(self.x + other.x, self.y + other.y)
    }
}

impl Sub for GridPosition {
    type Output = GridPosition;

    fn sub(self, other: GridPosition) -> GridPosition {
        GridPosition::new(self.x - other.x, self.y - other.y)
    }
}

impl fmt::Display for GridPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.x, self.y)
    }
}

/// Error returned when a `"x,y"` string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid position '{0}', expected \"x,y\"")]
pub struct ParsePositionError(pub String);

/// Error returned when a string is not a direction name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown direction '{0}', expected north, east, south or west")]
pub struct ParseDirectionError(pub String);

impl FromStr for GridPosition {
    type Err = ParsePositionError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let (x, y) = value
            .split_once(',')
            .ok_or_else(|| ParsePositionError(value.to_string()))?;
        let x = x
            .trim()
            .parse()
            .map_err(|_| ParsePositionError(value.to_string()))?;
        let y = y
            .trim()
            .parse()
            .map_err(|_| ParsePositionError(value.to_string()))?;
        Ok(Self::new(x, y))
    }
}

/// One of the four unit vectors an agent can face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// `(0, -1)`.
    #[default]
    North,
    /// `(1, 0)`.
    East,
    /// `(0, 1)`.
    South,
    /// `(-1, 0)`.
    West,
}

impl Direction {
    /// All directions in clockwise order starting at north.
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    /// The unit vector for this direction.
    pub const fn vector(self) -> GridPosition {
        match self {
            Direction::North => GridPosition::new(0, -1),
            Direction::East => GridPosition::new(1, 0),
            Direction::South => GridPosition::new(0, 1),
            Direction::West => GridPosition::new(-1, 0),
        }
    }

    /// The direction whose unit vector is `vector`, if any.
    pub fn from_vector(vector: GridPosition) -> Option<Direction> {
        Self::ALL.into_iter().find(|d| d.vector() == vector)
    }

    /// Turn 90 degrees counter-clockwise.
    pub const fn left(self) -> Direction {
        match self {
            Direction::North => Direction::West,
            Direction::West => Direction::South,
            Direction::South => Direction::East,
            Direction::East => Direction::North,
        }
    }

    /// Turn 90 degrees clockwise.
    pub const fn right(self) -> Direction {
        match self {
            Direction::North => Direction::East,
            Direction::East => Direction::South,
            Direction::South => Direction::West,
            Direction::West => Direction::North,
        }
    }

    /// Lowercase name, as used in level files.
    pub const fn name(self) -> &'static str {
        match self {
            Direction::North => "north",
            Direction::East => "east",
            Direction::South => "south",
            Direction::West => "west",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Direction {
    type Err = ParseDirectionError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|d| d.name() == value)
            .ok_or_else(|| ParseDirectionError(value.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotation_matches_turns() {
        for direction in Direction::ALL {
            assert_eq!(
                direction.vector().rotate_left(),
                direction.left().vector(),
                "left of {direction}"
            );
            assert_eq!(
                direction.vector().rotate_right(),
                direction.right().vector(),
                "right of {direction}"
            );
        }
    }

    #[test]
    fn left_of_north_is_west() {
        assert_eq!(Direction::North.left(), Direction::West);
        assert_eq!(Direction::North.right(), Direction::East);
    }

    #[test]
    fn clamp_keeps_inside_board() {
        assert_eq!(GridPosition::new(-1, 7).clamp(5), GridPosition::new(0, 4));
        assert_eq!(GridPosition::new(2, 3).clamp(5), GridPosition::new(2, 3));
    }

    #[test]
    fn surround_covers_every_edge_cell_once() {
        let ring = GridPosition::surround(4);
        assert_eq!(ring.len(), 12);
        assert!(ring.iter().all(|p| p.on_edge(4)));

        let mut unique = ring.clone();
        unique.sort_by_key(|p| (p.x, p.y));
        unique.dedup();
        assert_eq!(unique.len(), ring.len());
    }

    #[test]
    fn parse_position() {
        assert_eq!("3,4".parse::<GridPosition>().unwrap(), GridPosition::new(3, 4));
        assert_eq!(" 1, 2".parse::<GridPosition>().unwrap(), GridPosition::new(1, 2));
        assert!("3".parse::<GridPosition>().is_err());
        assert_eq!(
            "a,b".parse::<GridPosition>().unwrap_err().to_string(),
            "invalid position 'a,b', expected \"x,y\""
        );
    }

    #[test]
    fn parse_direction() {
        for direction in Direction::ALL {
            assert_eq!(direction.name().parse::<Direction>().unwrap(), direction);
        }
        let err = "up".parse::<Direction>().unwrap_err();
        assert_eq!(err, ParseDirectionError("up".to_string()));
        assert!(err.to_string().starts_with("unknown direction 'up'"));
    }

    #[test]
    fn direction_from_vector() {
        assert_eq!(
            Direction::from_vector(GridPosition::new(0, 1)),
            Some(Direction::South)
        );
        assert_eq!(Direction::from_vector(GridPosition::new(1, 1)), None);
    }
}

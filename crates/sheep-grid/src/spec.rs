use crate::board::Board;
use crate::entity::HerdColor;
use crate::point::{Direction, GridPosition};
use serde::{Deserialize, Serialize};

/// Optional thresholds a solution has to stay under.
///
/// A missing limit, or a limit of `0`, means unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Limits {
    /// Maximum number of executed actions.
    #[serde(default)]
    pub max_actions: Option<u32>,
    /// Maximum number of action function calls.
    #[serde(default)]
    pub max_calls: Option<u32>,
    /// Maximum number of characters of source.
    #[serde(default)]
    pub max_chars: Option<u32>,
}

impl Limits {
    /// Effective action limit.
    pub fn actions(&self) -> Option<u32> {
        self.max_actions.filter(|&max| max > 0)
    }

    /// Effective call limit.
    pub fn calls(&self) -> Option<u32> {
        self.max_calls.filter(|&max| max > 0)
    }

    /// Effective source size limit.
    pub fn chars(&self) -> Option<u32> {
        self.max_chars.filter(|&max| max > 0)
    }
}

/// Starting cell and facing of the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentSpec {
    /// Starting cell.
    pub position: GridPosition,
    /// Starting facing; north when omitted.
    #[serde(default)]
    pub facing: Direction,
}

/// Everything needed to construct a [`Board`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardSpec {
    /// Side length of the square board.
    pub size: i32,
    /// The agent.
    pub player: AgentSpec,
    /// Exit zone cell.
    pub exit: GridPosition,
    /// Solution limits.
    #[serde(default)]
    pub limits: Limits,
}

/// Kinds that can fill the outer ring of a board in one go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Obstacle {
    /// Wall blocks.
    Wall,
    /// Leaf blocks.
    Leaves,
    /// Water blocks.
    Water,
}

/// An entity to add to a board after construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum EntitySpec {
    /// A wall at `pos`.
    Wall {
        /// Cell.
        pos: GridPosition,
    },
    /// Leaves at `pos`.
    Leaves {
        /// Cell.
        pos: GridPosition,
    },
    /// Water at `pos`.
    Water {
        /// Cell.
        pos: GridPosition,
    },
    /// A herd unit.
    Sheep {
        /// Cell.
        pos: GridPosition,
        /// Color; white when omitted.
        #[serde(default)]
        color: HerdColor,
    },
    /// A herd target.
    Target {
        /// Cell.
        pos: GridPosition,
        /// Color; white when omitted.
        #[serde(default)]
        color: HerdColor,
    },
    /// One obstacle on every edge cell of the board.
    Surround {
        /// What to place.
        block: Obstacle,
    },
}

/// A board description as a collaborator hands it over: construction input
/// plus the objects to add afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardFile {
    /// Construction input.
    pub board: BoardSpec,
    /// Objects added after construction, in order.
    #[serde(default)]
    pub objects: Vec<EntitySpec>,
}

impl BoardFile {
    /// Parse a board description from TOML text.
    pub fn from_toml(text: &str) -> crate::Result<Self> {
        toml::from_str(text).map_err(|e| crate::Error::Config(e.to_string()))
    }

    /// Construct the board and add every object.
    pub fn build(&self) -> crate::Result<Board> {
        let mut board = Board::new(self.board)?;
        board.add_objects(self.objects.iter().copied())?;
        Ok(board)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_limits_are_unbounded() {
        let limits = Limits {
            max_actions: Some(0),
            max_calls: Some(3),
            max_chars: None,
        };
        assert_eq!(limits.actions(), None);
        assert_eq!(limits.calls(), Some(3));
        assert_eq!(limits.chars(), None);
    }

    #[test]
    fn board_file_from_toml() {
        let text = r#"
[board]
size = 5
exit = { x = 3, y = 1 }
player = { position = { x = 1, y = 3 }, facing = "east" }

[board.limits]
max_actions = 10

[[objects]]
kind = "surround"
block = "wall"

[[objects]]
kind = "sheep"
pos = { x = 2, y = 2 }
color = "red"

[[objects]]
kind = "target"
pos = { x = 3, y = 3 }
"#;
        let file = BoardFile::from_toml(text).unwrap();
        assert_eq!(file.board.size, 5);
        assert_eq!(file.board.player.facing, Direction::East);
        assert_eq!(file.board.limits.actions(), Some(10));
        assert_eq!(file.objects.len(), 3);
        assert_eq!(
            file.objects[2],
            EntitySpec::Target {
                pos: GridPosition::new(3, 3),
                color: HerdColor::White,
            }
        );
    }

    #[test]
    fn board_file_rejects_unknown_color() {
        let text = r#"
[board]
size = 3
exit = { x = 0, y = 0 }
player = { position = { x = 1, y = 1 } }

[[objects]]
kind = "sheep"
pos = { x = 2, y = 2 }
color = "chartreuse"
"#;
        let err = BoardFile::from_toml(text).expect_err("unknown color must fail");
        assert!(matches!(err, crate::Error::Config(_)));
    }
}

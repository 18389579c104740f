use crate::point::GridPosition;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identifier of an entity on one board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub u32);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Color tag shared by herd units and their targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[allow(missing_docs)]
pub enum HerdColor {
    Black,
    Blue,
    Brown,
    Cyan,
    Gray,
    Green,
    Lightblue,
    Lightgray,
    Lime,
    Magenta,
    Orange,
    Pink,
    Purple,
    Red,
    #[default]
    White,
    Yellow,
}

/// Draw priority of the agent; always rendered on top.
pub const AGENT_PRIORITY: i32 = 9999;
/// Draw priority of a herd unit while it is being carried.
pub const CARRIED_PRIORITY: i32 = 9998;

/// The closed set of things that can sit on a board cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityKind {
    /// The player-controlled agent. Its facing and carry slot live on the board.
    Agent,
    /// The cell the agent has to finish on.
    ExitZone,
    /// Impassable wall.
    Wall,
    /// Impassable leaves.
    Leaves,
    /// Impassable water.
    Water,
    /// A movable unit that must be brought onto a matching target.
    HerdUnit {
        /// Color tag.
        color: HerdColor,
        /// The target this unit has been dropped on.
        target: Option<EntityId>,
    },
    /// A drop cell for a herd unit of the same color.
    HerdTarget {
        /// Color tag.
        color: HerdColor,
        /// The unit dropped on this target.
        unit: Option<EntityId>,
    },
}

impl EntityKind {
    /// Whether the agent may step onto a cell holding this kind.
    pub const fn default_walkable(&self) -> bool {
        matches!(
            self,
            EntityKind::ExitZone | EntityKind::HerdUnit { .. } | EntityKind::HerdTarget { .. }
        )
    }

    /// Render-only ordering key; larger draws later.
    pub const fn default_priority(&self) -> i32 {
        match self {
            EntityKind::Agent => AGENT_PRIORITY,
            EntityKind::ExitZone => 2,
            EntityKind::HerdUnit { .. } => 1,
            _ => 0,
        }
    }

    /// Short name used in logs.
    pub const fn name(&self) -> &'static str {
        match self {
            EntityKind::Agent => "Agent",
            EntityKind::ExitZone => "ExitZone",
            EntityKind::Wall => "Wall",
            EntityKind::Leaves => "Leaves",
            EntityKind::Water => "Water",
            EntityKind::HerdUnit { .. } => "HerdUnit",
            EntityKind::HerdTarget { .. } => "HerdTarget",
        }
    }
}

/// A positioned entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entity {
    /// Identifier, unique on its board.
    pub id: EntityId,
    /// Current cell.
    pub pos: GridPosition,
    /// Whether the agent can move onto this entity's cell.
    pub walkable: bool,
    /// Draw ordering; ignored by the simulation.
    pub priority: i32,
    /// Variant payload.
    pub kind: EntityKind,
}

impl Entity {
    /// Create an entity with the kind's default walkability and priority.
    pub fn new(id: EntityId, pos: GridPosition, kind: EntityKind) -> Self {
        Self {
            id,
            pos,
            walkable: kind.default_walkable(),
            priority: kind.default_priority(),
            kind,
        }
    }

    /// Color of a herd unit, if this is one.
    pub fn unit_color(&self) -> Option<HerdColor> {
        match self.kind {
            EntityKind::HerdUnit { color, .. } => Some(color),
            _ => None,
        }
    }

    /// Color of a herd target, if this is one.
    pub fn target_color(&self) -> Option<HerdColor> {
        match self.kind {
            EntityKind::HerdTarget { color, .. } => Some(color),
            _ => None,
        }
    }
}

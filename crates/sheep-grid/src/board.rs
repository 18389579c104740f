use crate::action::Action;
use crate::entity::{Entity, EntityId, EntityKind, CARRIED_PRIORITY};
use crate::point::{Direction, GridPosition};
use crate::solve::{HerdCoverage, SolveState, Threshold};
use crate::spec::{BoardSpec, EntitySpec, Limits, Obstacle};
use crate::trace::ExecutionTrace;
use crate::{Error, Result};
use std::collections::{HashMap, HashSet};

/// Slot of the agent in the entity collection.
const AGENT_SLOT: usize = 0;
/// Slot of the exit zone in the entity collection.
const EXIT_SLOT: usize = 1;

/// An N×N board of positioned entities with one agent and one exit zone.
///
/// The board is a synchronous state machine: [`Board::apply`] performs one
/// complete tick. Entity order is insertion order and breaks ties when several
/// entities share a cell.
#[derive(Debug, Clone)]
pub struct Board {
    size: i32,
    entities: Vec<Entity>,
    index: HashMap<EntityId, usize>,
    limits: Limits,
    next_id: u32,
    facing: Direction,
    carrying: Option<EntityId>,
}

impl Board {
    /// Construct a board holding only the agent and the exit zone.
    pub fn new(spec: BoardSpec) -> Result<Self> {
        if spec.size <= 0 {
            return Err(Error::InvalidSize(spec.size));
        }
        for position in [spec.player.position, spec.exit] {
            if !position.in_bounds(spec.size) {
                return Err(Error::OutOfBounds {
                    position,
                    size: spec.size,
                });
            }
        }

        let mut board = Self {
            size: spec.size,
            entities: Vec::new(),
            index: HashMap::new(),
            limits: spec.limits,
            next_id: 0,
            facing: spec.player.facing,
            carrying: None,
        };
        board.push(spec.player.position, EntityKind::Agent);
        board.push(spec.exit, EntityKind::ExitZone);
        Ok(board)
    }

    /// Side length.
    pub fn size(&self) -> i32 {
        self.size
    }

    /// Solution limits.
    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    /// The agent entity.
    pub fn agent(&self) -> &Entity {
        &self.entities[AGENT_SLOT]
    }

    /// The exit zone entity.
    pub fn exit(&self) -> &Entity {
        &self.entities[EXIT_SLOT]
    }

    /// Current facing of the agent.
    pub fn facing(&self) -> Direction {
        self.facing
    }

    /// The herd unit the agent carries, if any.
    pub fn carrying(&self) -> Option<EntityId> {
        self.carrying
    }

    /// Look up an entity by id.
    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.index.get(&id).map(|&slot| &self.entities[slot])
    }

    /// All entities in insertion order.
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    /// Entities on `pos`, in insertion order.
    pub fn entities_at(&self, pos: GridPosition) -> impl Iterator<Item = &Entity> + '_ {
        self.entities.iter().filter(move |e| e.pos == pos)
    }

    /// Entities sorted by ascending draw priority; ties keep insertion order.
    pub fn draw_order(&self) -> Vec<&Entity> {
        let mut ordered: Vec<&Entity> = self.entities.iter().collect();
        ordered.sort_by_key(|e| e.priority);
        ordered
    }

    /// Add objects after construction.
    ///
    /// Every spec is checked before any entity becomes visible, so a failing
    /// call leaves the board untouched. Returns the ids of the new entities in
    /// order.
    pub fn add_objects<I>(&mut self, specs: I) -> Result<Vec<EntityId>>
    where
        I: IntoIterator<Item = EntitySpec>,
    {
        let mut staged = Vec::new();
        for spec in specs {
            self.expand(spec, &mut staged);
        }

        if let Some(&(position, _)) = staged.iter().find(|(p, _)| !p.in_bounds(self.size)) {
            return Err(Error::OutOfBounds {
                position,
                size: self.size,
            });
        }

        let ids = staged
            .into_iter()
            .map(|(pos, kind)| self.push(pos, kind))
            .collect::<Vec<_>>();
        tracing::debug!(count = ids.len(), "added objects to board");
        Ok(ids)
    }

    /// Remove an entity, clearing any carry slot or unit/target link naming it.
    pub fn remove_object(&mut self, id: EntityId) -> Result<Entity> {
        let slot = *self.index.get(&id).ok_or(Error::UnknownEntity(id))?;
        if slot == AGENT_SLOT || slot == EXIT_SLOT {
            return Err(Error::FixedEntity(id));
        }
        let removed = self.entities.remove(slot);
        self.reindex();
        self.prune_links();
        Ok(removed)
    }

    /// Build a board of a new size from this one.
    ///
    /// The agent and the exit zone are clamped into the new bounds. Every
    /// other entity is carried over only if it was not on this board's edge
    /// and still fits.
    pub fn resized(self, size: i32) -> Result<Board> {
        if size <= 0 {
            return Err(Error::InvalidSize(size));
        }
        let old_size = self.size;
        let entities = self
            .entities
            .into_iter()
            .enumerate()
            .filter_map(|(slot, mut entity)| {
                if slot == AGENT_SLOT || slot == EXIT_SLOT {
                    entity.pos = entity.pos.clamp(size);
                    return Some(entity);
                }
                (!entity.pos.on_edge(old_size) && entity.pos.in_bounds(size)).then_some(entity)
            })
            .collect();

        let mut board = Board {
            size,
            entities,
            index: HashMap::new(),
            limits: self.limits,
            next_id: self.next_id,
            facing: self.facing,
            carrying: self.carrying,
        };
        board.reindex();
        board.prune_links();
        board.track_carried();
        Ok(board)
    }

    /// Apply one action and resolve occupancy on the agent's new cell.
    pub fn apply(&mut self, action: Action) {
        let position = self.agent().pos;
        let facing = self.facing().vector();
        match action {
            Action::Forward => self.step(position + facing),
            Action::Backward => self.step(position - facing),
            Action::Left => self.step(position + facing.rotate_left()),
            Action::Right => self.step(position + facing.rotate_right()),
            Action::TurnLeft => self.facing = self.facing.left(),
            Action::TurnRight => self.facing = self.facing.right(),
        }
        self.resolve_occupancy();

        let agent = self.agent();
        tracing::trace!(
            %action,
            x = agent.pos.x,
            y = agent.pos.y,
            facing = %self.facing(),
            "applied action"
        );
    }

    /// Apply a raw action token.
    ///
    /// Tokens outside the vocabulary are rejected without touching the board.
    pub fn apply_token(&mut self, token: &str) -> Result<()> {
        let action = token
            .parse::<Action>()
            .map_err(|_| Error::UnknownAction(token.to_string()))?;
        self.apply(action);
        Ok(())
    }

    /// Apply every action of `trace` in order.
    pub fn replay(&mut self, trace: &ExecutionTrace) {
        for &action in trace.actions() {
            self.apply(action);
        }
    }

    /// Evaluate the objectives, and the limits when a trace is given.
    pub fn solve_state(&self, trace: Option<&ExecutionTrace>) -> SolveState {
        let player_on_exit = self.agent().pos == self.exit().pos;

        let targets: Vec<&Entity> = self
            .entities
            .iter()
            .filter(|e| e.target_color().is_some())
            .collect();
        let mut occupied = HashSet::new();
        let mut current = 0;
        let mut total = 0;
        for unit in self.entities.iter().filter(|e| e.unit_color().is_some()) {
            total += 1;
            let target = targets
                .iter()
                .find(|t| t.target_color() == unit.unit_color() && t.pos == unit.pos);
            if let Some(target) = target {
                if occupied.insert(target.id) {
                    current += 1;
                }
            }
        }
        let herd = HerdCoverage {
            current,
            total,
            solved: current == total,
        };

        let (actions, calls, size) = match trace {
            Some(trace) => (
                Some(Threshold::check(
                    u32::try_from(trace.actions().len()).unwrap_or(u32::MAX),
                    self.limits.actions(),
                )),
                Some(Threshold::check(trace.call_count(), self.limits.calls())),
                Some(Threshold::check(trace.size(), self.limits.chars())),
            ),
            None => (None, None, None),
        };

        SolveState::aggregate(player_on_exit, herd, actions, calls, size)
    }

    fn push(&mut self, pos: GridPosition, kind: EntityKind) -> EntityId {
        let id = EntityId(self.next_id);
        self.next_id += 1;
        self.index.insert(id, self.entities.len());
        self.entities.push(Entity::new(id, pos, kind));
        id
    }

    fn expand(&self, spec: EntitySpec, staged: &mut Vec<(GridPosition, EntityKind)>) {
        match spec {
            EntitySpec::Wall { pos } => staged.push((pos, EntityKind::Wall)),
            EntitySpec::Leaves { pos } => staged.push((pos, EntityKind::Leaves)),
            EntitySpec::Water { pos } => staged.push((pos, EntityKind::Water)),
            EntitySpec::Sheep { pos, color } => staged.push((
                pos,
                EntityKind::HerdUnit {
                    color,
                    target: None,
                },
            )),
            EntitySpec::Target { pos, color } => {
                staged.push((pos, EntityKind::HerdTarget { color, unit: None }))
            }
            EntitySpec::Surround { block } => {
                let kind = match block {
                    Obstacle::Wall => EntityKind::Wall,
                    Obstacle::Leaves => EntityKind::Leaves,
                    Obstacle::Water => EntityKind::Water,
                };
                staged.extend(
                    GridPosition::surround(self.size)
                        .into_iter()
                        .map(|pos| (pos, kind.clone())),
                );
            }
        }
    }

    fn reindex(&mut self) {
        self.index = self
            .entities
            .iter()
            .enumerate()
            .map(|(slot, e)| (e.id, slot))
            .collect();
    }

    /// Drop references to entities that are no longer on the board.
    fn prune_links(&mut self) {
        let live: HashSet<EntityId> = self.index.keys().copied().collect();
        if self.carrying.is_some_and(|id| !live.contains(&id)) {
            self.carrying = None;
        }
        for entity in &mut self.entities {
            let link = match &mut entity.kind {
                EntityKind::HerdUnit { target, .. } => target,
                EntityKind::HerdTarget { unit, .. } => unit,
                _ => continue,
            };
            if link.is_some_and(|id| !live.contains(&id)) {
                *link = None;
            }
        }
    }

    fn step(&mut self, candidate: GridPosition) {
        let target = candidate.clamp(self.size);
        let blocked = self
            .entities
            .iter()
            .skip(AGENT_SLOT + 1)
            .any(|e| e.pos == target && !e.walkable);
        if blocked {
            tracing::trace!(x = target.x, y = target.y, "move blocked");
            return;
        }
        self.entities[AGENT_SLOT].pos = target;
    }

    /// Per-tick pickup / drop pass on the agent's cell.
    fn resolve_occupancy(&mut self) {
        let here = self.agent().pos;

        match self.carrying() {
            Some(unit_id) => {
                if let Some(target_slot) = self.free_target_for(unit_id, here) {
                    self.drop_onto(unit_id, target_slot);
                }
            }
            None => {
                let candidate = self.entities.iter().find(|e| {
                    e.pos == here && matches!(e.kind, EntityKind::HerdUnit { target: None, .. })
                });
                if let Some(unit) = candidate {
                    let id = unit.id;
                    self.carrying = Some(id);
                    if let Some(&slot) = self.index.get(&id) {
                        self.entities[slot].priority = CARRIED_PRIORITY;
                    }
                    tracing::debug!(unit = %id, x = here.x, y = here.y, "picked up herd unit");
                }
            }
        }

        self.track_carried();
    }

    /// A target on `here` matching the carried unit's color that is neither
    /// linked to a unit nor already covered by another unit of that color.
    fn free_target_for(&self, unit_id: EntityId, here: GridPosition) -> Option<usize> {
        let color = self.entity(unit_id)?.unit_color()?;
        self.entities.iter().position(|e| {
            e.pos == here
                && matches!(e.kind, EntityKind::HerdTarget { color: c, unit: None } if c == color)
                && !self
                    .entities
                    .iter()
                    .any(|u| u.id != unit_id && u.pos == here && u.unit_color() == Some(color))
        })
    }

    fn drop_onto(&mut self, unit_id: EntityId, target_slot: usize) {
        let Some(&unit_slot) = self.index.get(&unit_id) else {
            return;
        };
        let target_id = self.entities[target_slot].id;
        let target_pos = self.entities[target_slot].pos;

        if let EntityKind::HerdTarget { unit, .. } = &mut self.entities[target_slot].kind {
            *unit = Some(unit_id);
        }
        let carried = &mut self.entities[unit_slot];
        carried.pos = target_pos;
        carried.priority = carried.kind.default_priority();
        if let EntityKind::HerdUnit { target, .. } = &mut carried.kind {
            *target = Some(target_id);
        }
        self.carrying = None;
        tracing::debug!(
            unit = %unit_id,
            target = %target_id,
            "dropped herd unit onto target"
        );
    }

    fn track_carried(&mut self) {
        let here = self.agent().pos;
        if let Some(slot) = self.carrying().and_then(|id| self.index.get(&id).copied()) {
            self.entities[slot].pos = here;
        }
    }
}

use serde::Serialize;

/// A `current <= max` check against an optional limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Threshold {
    /// Measured value.
    pub current: u32,
    /// Limit; `None` means unbounded.
    pub max: Option<u32>,
    /// Whether `current` is within `max`.
    pub solved: bool,
}

impl Threshold {
    /// Check `current` against `max`; vacuously solved without a limit.
    pub fn check(current: u32, max: Option<u32>) -> Self {
        Self {
            current,
            max,
            solved: max.map_or(true, |max| current <= max),
        }
    }
}

/// How many herd units sit on a matching target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HerdCoverage {
    /// Units on a matching target, each target counted at most once.
    pub current: u32,
    /// All herd units on the board.
    pub total: u32,
    /// `current == total`.
    pub solved: bool,
}

/// Objective evaluation of a board, optionally against a trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SolveState {
    /// All objectives met.
    ///
    /// Combines exit, herd, action and call checks. The size check is
    /// reported in [`SolveState::size`] but not part of this aggregate.
    pub solved: bool,
    /// The agent stands on the exit zone.
    pub player_on_exit: bool,
    /// Herd coverage.
    pub herd: HerdCoverage,
    /// Executed actions against `max_actions`; present with a trace.
    pub actions: Option<Threshold>,
    /// Action calls against `max_calls`; present with a trace.
    pub calls: Option<Threshold>,
    /// Source size against `max_chars`; present with a trace.
    pub size: Option<Threshold>,
}

impl SolveState {
    pub(crate) fn aggregate(
        player_on_exit: bool,
        herd: HerdCoverage,
        actions: Option<Threshold>,
        calls: Option<Threshold>,
        size: Option<Threshold>,
    ) -> Self {
        // size stays out of the aggregate
        let solved = player_on_exit
            && herd.solved
            && actions.map_or(true, |t| t.solved)
            && calls.map_or(true, |t| t.solved);
        Self {
            solved,
            player_on_exit,
            herd,
            actions,
            calls,
            size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_without_limit_is_solved() {
        assert!(Threshold::check(1_000, None).solved);
        assert!(Threshold::check(3, Some(3)).solved);
        assert!(!Threshold::check(4, Some(3)).solved);
    }

    #[test]
    fn oversized_source_does_not_fail_aggregate() {
        let herd = HerdCoverage {
            current: 0,
            total: 0,
            solved: true,
        };
        let state = SolveState::aggregate(
            true,
            herd,
            Some(Threshold::check(1, Some(5))),
            Some(Threshold::check(1, Some(5))),
            Some(Threshold::check(500, Some(10))),
        );
        assert!(state.solved);
        assert!(!state.size.unwrap().solved);
    }
}

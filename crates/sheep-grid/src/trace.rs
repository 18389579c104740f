use crate::action::Action;
use serde::Serialize;
use std::collections::BTreeMap;

/// Structured record of one guest run: which actions were executed, how many
/// times each action function was called, and how large the program was.
///
/// The aggregate call count always equals the sum of the per-action counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExecutionTrace {
    actions: Vec<Action>,
    calls: BTreeMap<Action, u32>,
    call_count: u32,
    size: u32,
}

impl ExecutionTrace {
    /// An empty trace.
    pub fn new() -> Self {
        Self::default()
    }

    /// Actions in emission order.
    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    /// Per-action call counts.
    pub fn calls(&self) -> &BTreeMap<Action, u32> {
        &self.calls
    }

    /// Call count of one action; `0` when it was never reported.
    pub fn calls_of(&self, action: Action) -> u32 {
        self.calls.get(&action).copied().unwrap_or(0)
    }

    /// Sum of all per-action call counts.
    pub fn call_count(&self) -> u32 {
        self.call_count
    }

    /// Length of the player source before instrumentation, in characters.
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Append one executed action.
    pub fn push_action(&mut self, action: Action) {
        self.actions.push(action);
    }

    /// Record the final call count of `action`.
    ///
    /// Returns `false` and leaves the trace untouched if a count for `action`
    /// was already recorded.
    pub fn record_calls(&mut self, action: Action, count: u32) -> bool {
        if self.calls.contains_key(&action) {
            return false;
        }
        self.calls.insert(action, count);
        self.call_count = self.call_count.saturating_add(count);
        true
    }

    /// Set the source size.
    pub fn set_size(&mut self, size: u32) {
        self.size = size;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn call_count_is_sum_of_calls() {
        let mut trace = ExecutionTrace::new();
        assert!(trace.record_calls(Action::Forward, 2));
        assert!(trace.record_calls(Action::TurnLeft, 3));
        assert!(!trace.record_calls(Action::Forward, 7));

        assert_eq!(trace.call_count(), 5);
        assert_eq!(trace.calls_of(Action::Forward), 2);
        assert_eq!(trace.calls_of(Action::Right), 0);
        assert_eq!(trace.call_count(), trace.calls().values().sum::<u32>());
    }
}

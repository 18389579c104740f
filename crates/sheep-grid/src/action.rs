use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// The six verbs a script can drive the agent with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Action {
    /// Step along the facing vector.
    #[serde(rename = "forward")]
    Forward,
    /// Step against the facing vector.
    #[serde(rename = "backward")]
    Backward,
    /// Step to the agent's left without turning.
    #[serde(rename = "left")]
    Left,
    /// Step to the agent's right without turning.
    #[serde(rename = "right")]
    Right,
    /// Rotate facing 90 degrees counter-clockwise.
    #[serde(rename = "turnLeft")]
    TurnLeft,
    /// Rotate facing 90 degrees clockwise.
    #[serde(rename = "turnRight")]
    TurnRight,
}

impl Action {
    /// The full vocabulary, in the order scripts are documented and instrumented.
    pub const ALL: [Action; 6] = [
        Action::Forward,
        Action::Backward,
        Action::Left,
        Action::Right,
        Action::TurnLeft,
        Action::TurnRight,
    ];

    /// The function name scripts call.
    pub const fn name(self) -> &'static str {
        match self {
            Action::Forward => "forward",
            Action::Backward => "backward",
            Action::Left => "left",
            Action::Right => "right",
            Action::TurnLeft => "turnLeft",
            Action::TurnRight => "turnRight",
        }
    }

    /// Call signature shown to players.
    pub const fn signature(self) -> &'static str {
        match self {
            Action::Forward => "forward(n = 1)",
            Action::Backward => "backward(n = 1)",
            Action::Left => "left(n = 1)",
            Action::Right => "right(n = 1)",
            Action::TurnLeft => "turnLeft(n = 1)",
            Action::TurnRight => "turnRight(n = 1)",
        }
    }

    /// Human-readable description of the signature.
    pub const fn description(self) -> &'static str {
        match self {
            Action::Forward => "move forward n steps",
            Action::Backward => "move backward n steps",
            Action::Left => "move left n steps",
            Action::Right => "move right n steps",
            Action::TurnLeft => "turn left n times",
            Action::TurnRight => "turn right n times",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A token outside the action vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown action '{0}'")]
pub struct UnknownAction(pub String);

impl FromStr for Action {
    type Err = UnknownAction;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|a| a.name() == token)
            .ok_or_else(|| UnknownAction(token.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_verb_name_parses() {
        for action in Action::ALL {
            assert_eq!(action.name().parse::<Action>().unwrap(), action);
        }
    }

    #[test]
    fn tokens_are_case_sensitive() {
        assert!("Forward".parse::<Action>().is_err());
        assert!("turnleft".parse::<Action>().is_err());
        let err = "jump".parse::<Action>().unwrap_err();
        assert_eq!(err, UnknownAction("jump".to_string()));
        assert_eq!(err.to_string(), "unknown action 'jump'");
    }
}

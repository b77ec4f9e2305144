//! Motion commands sent to the robot.

use std::fmt;
use std::str::FromStr;

use crate::error::IngestError;

/// The odometry command executed by the robot during one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Action {
    /// Robot stood still.
    #[default]
    None,
    /// Drove forward for one command duration.
    Forward,
    /// Drove backward for one command duration.
    Backward,
    /// Turned counter-clockwise on the wire, which decreases heading.
    TurnLeft,
    /// Turned the other way, which increases heading.
    TurnRight,
}

impl Action {
    /// The wire symbol for this action.
    pub fn symbol(&self) -> &'static str {
        match self {
            Action::None => "0",
            Action::Forward => "1",
            Action::Backward => "2",
            Action::TurnLeft => "3",
            Action::TurnRight => "4",
        }
    }
}

impl FromStr for Action {
    type Err = IngestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "0" => Ok(Action::None),
            "1" => Ok(Action::Forward),
            "2" => Ok(Action::Backward),
            "3" => Ok(Action::TurnLeft),
            "4" => Ok(Action::TurnRight),
            other => Err(IngestError::UnknownCommand(other.to_string())),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Action::None => "NONE",
            Action::Forward => "FORWARD",
            Action::Backward => "BACKWARD",
            Action::TurnLeft => "TURN_LEFT",
            Action::TurnRight => "TURN_RIGHT",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_symbols() {
        for action in [
            Action::None,
            Action::Forward,
            Action::Backward,
            Action::TurnLeft,
            Action::TurnRight,
        ] {
            assert_eq!(action.symbol().parse::<Action>().unwrap(), action);
        }
        assert_eq!(" 3\n".parse::<Action>().unwrap(), Action::TurnLeft);
    }

    #[test]
    fn test_unknown_symbol() {
        assert_eq!(
            "5".parse::<Action>(),
            Err(IngestError::UnknownCommand("5".to_string()))
        );
        assert!(matches!(
            "forward".parse::<Action>(),
            Err(IngestError::UnknownCommand(_))
        ));
    }
}

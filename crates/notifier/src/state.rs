//! Handler state machine.

use serde::{Deserialize, Serialize};

/// The step a handler invocation is in.
///
/// State transitions:
/// ```text
/// Fetching ──┬──────────────────────────────────────────────► Done
///            └──► Deriving ──► Rendering ──► Dispatching ──► Done
/// ```
///
/// `Fetching` goes straight to `Done` when the subject is missing or the read
/// fails. Kinds without amounts skip `Deriving`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum HandlerState {
    #[default]
    Fetching,
    Deriving,
    Rendering,
    Dispatching,
    /// Terminal; always reached.
    Done,
}

impl HandlerState {
    /// Returns true if `next` is a legal successor of this state.
    pub fn can_transition_to(&self, next: HandlerState) -> bool {
        use HandlerState::*;
        matches!(
            (*self, next),
            (Fetching, Deriving)
                | (Fetching, Rendering)
                | (Fetching, Done)
                | (Deriving, Rendering)
                | (Rendering, Dispatching)
                | (Dispatching, Done)
        )
    }

    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, HandlerState::Done)
    }

    /// Returns the state name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            HandlerState::Fetching => "Fetching",
            HandlerState::Deriving => "Deriving",
            HandlerState::Rendering => "Rendering",
            HandlerState::Dispatching => "Dispatching",
            HandlerState::Done => "Done",
        }
    }
}

impl std::fmt::Display for HandlerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

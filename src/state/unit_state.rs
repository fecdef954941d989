/// Unit state definitions for tracking pipeline progress
///
/// A unit of work is one (domain, crawler, extractor) combination. Its state
/// only ever moves forward along the stage sequence.
use crate::BenchError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Represents the current state of a unit in the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitState {
    // ===== Active States =====
    /// Unit is queued and nothing has run yet
    Pending,

    /// Fetch adapter call in flight
    Fetching,

    /// Pages are available (fresh or cached)
    Fetched,

    /// Extractor call in flight
    Extracting,

    /// Extraction record is available (fresh or cached)
    Extracted,

    /// Comparator and optional escalation running
    Comparing,

    // ===== Terminal States =====
    /// Unit produced a score
    Done,

    /// Unit failed during fetch or extraction; the reason is recorded alongside
    Failed,
}

impl UnitState {
    /// Returns true if no further transition is possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// Returns true if this represents a successful completion
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Done)
    }

    /// Checks whether moving from `self` to `next` is allowed
    ///
    /// Cached artifacts let a unit jump straight from `Pending` to `Fetched`
    /// and from `Fetched` to `Extracted`. `Failed` is reachable only while a
    /// backend call is in flight.
    pub fn can_transition_to(&self, next: UnitState) -> bool {
        use UnitState::*;
        matches!(
            (self, next),
            (Pending, Fetching)
                | (Pending, Fetched)
                | (Fetching, Fetched)
                | (Fetching, Failed)
                | (Fetched, Extracting)
                | (Fetched, Extracted)
                | (Extracting, Extracted)
                | (Extracting, Failed)
                | (Extracted, Comparing)
                | (Comparing, Done)
        )
    }

    /// Returns the next state, or an error for an illegal move
    pub fn transition(self, next: UnitState) -> Result<UnitState, BenchError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(BenchError::InvalidTransition {
                from: self,
                to: next,
            })
        }
    }

    /// String form used in reports and the tabular export
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Fetching => "fetching",
            Self::Fetched => "fetched",
            Self::Extracting => "extracting",
            Self::Extracted => "extracted",
            Self::Comparing => "comparing",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }

    /// Parses a state from its string form
    pub fn from_str_name(s: &str) -> Option<Self> {
        Self::all_states()
            .into_iter()
            .find(|state| state.as_str() == s)
    }

    /// Returns all possible unit states
    pub fn all_states() -> Vec<Self> {
        vec![
            Self::Pending,
            Self::Fetching,
            Self::Fetched,
            Self::Extracting,
            Self::Extracted,
            Self::Comparing,
            Self::Done,
            Self::Failed,
        ]
    }
}

impl fmt::Display for UnitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str().to_uppercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path() {
        let mut state = UnitState::Pending;
        for next in [
            UnitState::Fetching,
            UnitState::Fetched,
            UnitState::Extracting,
            UnitState::Extracted,
            UnitState::Comparing,
            UnitState::Done,
        ] {
            state = state.transition(next).unwrap();
        }
        assert!(state.is_success());
        assert!(state.is_terminal());
    }

    #[test]
    fn test_cache_skips() {
        assert!(UnitState::Pending.can_transition_to(UnitState::Fetched));
        assert!(UnitState::Fetched.can_transition_to(UnitState::Extracted));
    }

    #[test]
    fn test_failed_only_from_backend_calls() {
        assert!(UnitState::Fetching.can_transition_to(UnitState::Failed));
        assert!(UnitState::Extracting.can_transition_to(UnitState::Failed));
        assert!(!UnitState::Pending.can_transition_to(UnitState::Failed));
        assert!(!UnitState::Comparing.can_transition_to(UnitState::Failed));
        assert!(!UnitState::Done.can_transition_to(UnitState::Failed));
    }

    #[test]
    fn test_no_backwards_moves() {
        let moved = UnitState::Extracted.transition(UnitState::Fetching);
        assert!(moved.is_err());
        assert!(UnitState::Done.transition(UnitState::Pending).is_err());
    }

    #[test]
    fn test_terminal_states_have_no_successors() {
        for terminal in [UnitState::Done, UnitState::Failed] {
            for next in UnitState::all_states() {
                assert!(!terminal.can_transition_to(next));
            }
        }
    }

    #[test]
    fn test_string_round_trip() {
        for state in UnitState::all_states() {
            assert_eq!(UnitState::from_str_name(state.as_str()), Some(state));
        }
        assert_eq!(UnitState::from_str_name("bogus"), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(UnitState::Failed.to_string(), "FAILED");
        assert_eq!(UnitState::Pending.to_string(), "PENDING");
    }
}

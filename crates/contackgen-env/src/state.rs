//! Environment lifecycle state machine

use crate::error::EnvironmentError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of one capture environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EnvState {
    /// Container exists
    Created,
    /// Container running
    Started,
    /// Capture started inside the container
    Seeded,
    /// Scenario runner launched
    ScenarioActive,
    /// Container force-stopped
    Stopped,
    /// Capture copied to the host
    ArtifactRetrieved,
    /// Container removed
    Destroyed,
    /// Create failed
    CreateFailed,
    /// Start failed
    StartFailed,
    /// Seeding or address lookup failed
    SeedFailed,
    /// Capture could not be retrieved
    RetrievalFailed,
}

impl EnvState {
    /// Whether no further transition is possible
    #[inline]
    #[must_use]
    pub fn is_terminal(self) -> bool {
        allowed_transitions(self).is_empty()
    }

    /// Whether this is one of the failure states
    #[inline]
    #[must_use]
    pub fn is_failure(self) -> bool {
        matches!(
            self,
            Self::CreateFailed | Self::StartFailed | Self::SeedFailed | Self::RetrievalFailed
        )
    }
}

impl fmt::Display for EnvState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Validates a state transition.
///
/// # Errors
/// `EnvironmentError::IllegalTransition` when `to` is not reachable from
/// `from` in one step.
pub fn validate_transition(from: EnvState, to: EnvState) -> Result<(), EnvironmentError> {
    if allowed(from, to) {
        Ok(())
    } else {
        Err(EnvironmentError::IllegalTransition { from, to })
    }
}

/// States reachable from `from` in one step
#[must_use]
pub fn allowed_transitions(from: EnvState) -> Vec<EnvState> {
    use EnvState::*;
    match from {
        Created => vec![Started, CreateFailed, StartFailed],
        Started => vec![Seeded, SeedFailed],
        Seeded => vec![ScenarioActive, SeedFailed],
        ScenarioActive => vec![Stopped],
        Stopped => vec![ArtifactRetrieved, RetrievalFailed],
        ArtifactRetrieved => vec![Destroyed],
        Destroyed | CreateFailed | StartFailed | SeedFailed | RetrievalFailed => vec![],
    }
}

fn allowed(from: EnvState, to: EnvState) -> bool {
    allowed_transitions(from).into_iter().any(|s| s == to)
}

/// Tracks the current state and the path taken to reach it
#[derive(Debug, Clone)]
pub(crate) struct Lifecycle {
    history: Vec<EnvState>,
}

impl Lifecycle {
    pub(crate) fn new() -> Self {
        Self {
            history: vec![EnvState::Created],
        }
    }

    pub(crate) fn current(&self) -> EnvState {
        self.history.last().copied().unwrap_or(EnvState::Created)
    }

    pub(crate) fn advance(&mut self, to: EnvState) -> Result<(), EnvironmentError> {
        let from = self.current();
        validate_transition(from, to)?;
        if to.is_failure() {
            tracing::warn!(%from, %to, "environment failed");
        } else {
            tracing::info!(%from, %to, "environment transition");
        }
        self.history.push(to);
        Ok(())
    }

    pub(crate) fn into_history(self) -> Vec<EnvState> {
        self.history
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_is_legal() {
        use EnvState::*;
        let path = [
            Created,
            Started,
            Seeded,
            ScenarioActive,
            Stopped,
            ArtifactRetrieved,
            Destroyed,
        ];
        for pair in path.windows(2) {
            assert!(validate_transition(pair[0], pair[1]).is_ok(), "{pair:?}");
        }
    }

    #[test]
    fn no_skipping_the_window() {
        assert!(validate_transition(EnvState::Seeded, EnvState::Stopped).is_err());
        assert!(validate_transition(EnvState::Started, EnvState::ScenarioActive).is_err());
    }

    #[test]
    fn failure_states_are_terminal() {
        for state in [
            EnvState::CreateFailed,
            EnvState::StartFailed,
            EnvState::SeedFailed,
            EnvState::RetrievalFailed,
            EnvState::Destroyed,
        ] {
            assert!(state.is_terminal());
        }
        assert!(!EnvState::Destroyed.is_failure());
    }

    #[test]
    fn lifecycle_rejects_illegal_step() {
        let mut lifecycle = Lifecycle::new();
        lifecycle.advance(EnvState::Started).unwrap();
        let err = lifecycle.advance(EnvState::Destroyed).unwrap_err();
        assert!(matches!(
            err,
            EnvironmentError::IllegalTransition {
                from: EnvState::Started,
                to: EnvState::Destroyed
            }
        ));
        assert_eq!(lifecycle.current(), EnvState::Started);
    }
}

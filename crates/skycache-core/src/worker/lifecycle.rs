//! Worker lifecycle phases.
//!
//! Per partition the lifecycle reads absent → populating (install) → active →
//! stale (version bump) → deleted (activate cleanup); the worker itself tracks
//! the coarser phase machine below and only intercepts fetches once activated.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Worker lifecycle phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkerPhase {
    /// Initial state after construction, nothing cached yet.
    Parsed,
    /// Install event in flight: static partition being populated.
    Installing,
    /// Install finished (possibly partially), eligible to activate immediately.
    Installed,
    /// Activate event in flight: stale partitions being deleted.
    Activating,
    /// Active and controlling clients; fetch interception is live.
    Activated,
    /// Replaced by a newer version.
    Redundant,
}

#[derive(Error, Debug)]
#[error("invalid worker phase transition: {from} -> {to}")]
pub struct PhaseError {
    pub from: WorkerPhase,
    pub to: WorkerPhase,
}

impl WorkerPhase {
    /// Fetch interception only happens once the worker is activated.
    pub fn can_intercept_fetch(&self) -> bool {
        matches!(self, WorkerPhase::Activated)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, WorkerPhase::Redundant)
    }

    fn can_transition(&self, next: WorkerPhase) -> bool {
        use WorkerPhase::*;
        matches!(
            (*self, next),
            (Parsed, Installing)
                | (Installing, Installed)
                | (Installed, Activating)
                | (Activating, Activated)
                | (_, Redundant)
        ) && !self.is_terminal()
    }

    /// Advance to the next phase, rejecting out-of-order transitions.
    pub fn transition(&mut self, next: WorkerPhase) -> Result<(), PhaseError> {
        if self.can_transition(next) {
            *self = next;
            Ok(())
        } else {
            Err(PhaseError {
                from: *self,
                to: next,
            })
        }
    }
}

impl std::fmt::Display for WorkerPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkerPhase::Parsed => write!(f, "parsed"),
            WorkerPhase::Installing => write!(f, "installing"),
            WorkerPhase::Installed => write!(f, "installed"),
            WorkerPhase::Activating => write!(f, "activating"),
            WorkerPhase::Activated => write!(f, "activated"),
            WorkerPhase::Redundant => write!(f, "redundant"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_lifecycle() {
        let mut phase = WorkerPhase::Parsed;
        phase.transition(WorkerPhase::Installing).unwrap();
        phase.transition(WorkerPhase::Installed).unwrap();
        phase.transition(WorkerPhase::Activating).unwrap();
        phase.transition(WorkerPhase::Activated).unwrap();
        assert!(phase.can_intercept_fetch());

        phase.transition(WorkerPhase::Redundant).unwrap();
        assert!(phase.is_terminal());
    }

    #[test]
    fn test_out_of_order_transitions_rejected() {
        let mut phase = WorkerPhase::Parsed;
        assert!(phase.transition(WorkerPhase::Activated).is_err());
        assert!(phase.transition(WorkerPhase::Installed).is_err());

        phase.transition(WorkerPhase::Installing).unwrap();
        assert!(phase.transition(WorkerPhase::Activating).is_err());
    }

    #[test]
    fn test_redundant_is_terminal() {
        let mut phase = WorkerPhase::Redundant;
        assert!(phase.transition(WorkerPhase::Installing).is_err());
        assert!(phase.transition(WorkerPhase::Redundant).is_err());
    }

    #[test]
    fn test_only_activated_intercepts() {
        assert!(!WorkerPhase::Parsed.can_intercept_fetch());
        assert!(!WorkerPhase::Installing.can_intercept_fetch());
        assert!(!WorkerPhase::Installed.can_intercept_fetch());
        assert!(!WorkerPhase::Activating.can_intercept_fetch());
        assert!(WorkerPhase::Activated.can_intercept_fetch());
        assert!(!WorkerPhase::Redundant.can_intercept_fetch());
    }
}

//! Campaign lifecycle state machine.
//!
//! A campaign moves `IDLE → RUNNING` once, then ends in exactly one of
//! `COMPLETED` (time budget spent, or stop requested between iterations)
//! or `ABORTED` (hard stop from the toolchain). Both terminal states run
//! the same artifact cleanup.

use crate::error::{CampaignError, CampaignResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle states of a fuzz campaign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CampaignState {
    /// Constructed but not started.
    #[default]
    Idle,
    /// Iterating.
    Running,
    /// Time budget exhausted.
    Completed,
    /// Stopped by a toolchain failure.
    Aborted,
}

impl fmt::Display for CampaignState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "IDLE"),
            Self::Running => write!(f, "RUNNING"),
            Self::Completed => write!(f, "COMPLETED"),
            Self::Aborted => write!(f, "ABORTED"),
        }
    }
}

impl CampaignState {
    /// Check if a transition to `target` is valid from the current state.
    #[must_use]
    pub fn can_transition_to(&self, target: CampaignState) -> bool {
        use CampaignState::{Aborted, Completed, Idle, Running};

        matches!(
            (self, target),
            (Idle, Running) | (Running, Completed) | (Running, Aborted)
        )
    }

    /// Attempt to transition to `target`, returning error if invalid.
    ///
    /// # Errors
    ///
    /// Returns [`CampaignError::InvalidTransition`] when the move is not allowed.
    pub fn transition_to(&mut self, target: CampaignState) -> CampaignResult<()> {
        if self.can_transition_to(target) {
            *self = target;
            Ok(())
        } else {
            Err(CampaignError::InvalidTransition {
                from: self.to_string(),
                to: target.to_string(),
            })
        }
    }

    /// Returns true once the campaign has finished, successfully or not.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Aborted)
    }
}

//! Proposal lifecycle.
//!
//! Statuses are owned by the backend. The client only observes them, so
//! this module answers three questions about an observed status: how far
//! along the canonical path it is, whether a move between two observed
//! statuses is a legal single step, and whether polling can stop.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::LifecycleError;
use crate::models::Proposal;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ProposalStatus {
    Draft,
    ResearchInProgress,
    PitchGenerated,
    SentToBanks,
    CollectingQuotes,
    OptimizationComplete,
    Approved,
    Rejected,
    /// MLA bidding runs outside the canonical path; entry and exit are
    /// decided by the backend.
    MlaBidding,
    MlaSelected,
    AwaitingClientApproval,
    /// Any status string this client does not know, kept verbatim.
    Unrecognized(String),
}

/// Canonical order of the syndication path.
pub const CANONICAL_PATH: [ProposalStatus; 7] = [
    ProposalStatus::Draft,
    ProposalStatus::ResearchInProgress,
    ProposalStatus::PitchGenerated,
    ProposalStatus::SentToBanks,
    ProposalStatus::CollectingQuotes,
    ProposalStatus::OptimizationComplete,
    ProposalStatus::Approved,
];

impl ProposalStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Draft => "draft",
            Self::ResearchInProgress => "research_in_progress",
            Self::PitchGenerated => "pitch_generated",
            Self::SentToBanks => "sent_to_banks",
            Self::CollectingQuotes => "collecting_quotes",
            Self::OptimizationComplete => "optimization_complete",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::MlaBidding => "mla_bidding",
            Self::MlaSelected => "mla_selected",
            Self::AwaitingClientApproval => "awaiting_client_approval",
            Self::Unrecognized(raw) => raw,
        }
    }

    /// Human label, e.g. `sent to banks`.
    pub fn label(&self) -> String {
        self.as_str().replace('_', " ")
    }

    /// Position on [`CANONICAL_PATH`], `None` for off-path statuses.
    pub fn rank(&self) -> Option<usize> {
        CANONICAL_PATH.iter().position(|stage| stage == self)
    }

    /// Progress-bar percentage. Off-path and unknown statuses report 0.
    pub fn progress(&self) -> u8 {
        match self {
            Self::Draft => 10,
            Self::ResearchInProgress => 30,
            Self::PitchGenerated => 50,
            Self::SentToBanks => 70,
            Self::CollectingQuotes => 85,
            Self::OptimizationComplete => 95,
            Self::Approved => 100,
            _ => 0,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Approved | Self::Rejected)
    }

    /// Active means still moving: neither approved nor rejected.
    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }

    /// Off the canonical path but still live: MLA states and unknown strings.
    pub fn is_opaque(&self) -> bool {
        self.rank().is_none() && !matches!(self, Self::Rejected)
    }

    /// Next canonical stage, if any.
    pub fn next(&self) -> Option<ProposalStatus> {
        let rank = self.rank()?;
        CANONICAL_PATH.get(rank + 1).cloned()
    }
}

impl fmt::Display for ProposalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for ProposalStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "draft" => Self::Draft,
            "research_in_progress" => Self::ResearchInProgress,
            "pitch_generated" => Self::PitchGenerated,
            "sent_to_banks" => Self::SentToBanks,
            "collecting_quotes" => Self::CollectingQuotes,
            "optimization_complete" => Self::OptimizationComplete,
            "approved" => Self::Approved,
            "rejected" => Self::Rejected,
            "mla_bidding" => Self::MlaBidding,
            "mla_selected" => Self::MlaSelected,
            "awaiting_client_approval" => Self::AwaitingClientApproval,
            _ => Self::Unrecognized(value),
        }
    }
}

impl From<ProposalStatus> for String {
    fn from(value: ProposalStatus) -> Self {
        match value {
            ProposalStatus::Unrecognized(raw) => raw,
            other => other.as_str().to_string(),
        }
    }
}

impl FromStr for ProposalStatus {
    type Err = std::convert::Infallible;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(value.trim().to_ascii_lowercase()))
    }
}

/// Checks a single step against the transition table. Only forward moves
/// to the immediately following canonical stage are legal.
pub fn validate_transition(from: &ProposalStatus, to: &ProposalStatus) -> Result<(), LifecycleError> {
    if from.next().as_ref() == Some(to) {
        return Ok(());
    }

    Err(LifecycleError::InvalidTransition {
        from: from.clone(),
        to: to.clone(),
    })
}

/// How a status moved between two fetched snapshots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusChange {
    Unchanged,
    /// Moved forward; `skipped` counts canonical stages the polls missed.
    Advanced { skipped: usize },
    Regressed,
    /// One side is off the canonical path (MLA states, rejected, unknown).
    Opaque,
}

pub fn classify_change(previous: &ProposalStatus, current: &ProposalStatus) -> StatusChange {
    if previous == current {
        return StatusChange::Unchanged;
    }

    match (previous.rank(), current.rank()) {
        (Some(from), Some(to)) if to > from => StatusChange::Advanced {
            skipped: to - from - 1,
        },
        (Some(_), Some(_)) => StatusChange::Regressed,
        _ => StatusChange::Opaque,
    }
}

/// Ordering constraints between the progress flags and the status.
///
/// The backend flips flags and status in separate commits, so a single
/// snapshot can legitimately lag. Callers log violations and keep the data.
pub fn check_invariants(proposal: &Proposal) -> Result<(), LifecycleError> {
    if proposal.pitch_generated && !proposal.research_completed {
        return Err(LifecycleError::PitchBeforeResearch {
            proposal_id: proposal.id.clone(),
        });
    }

    let sent_rank = ProposalStatus::SentToBanks.rank();
    if proposal.status.rank() >= sent_rank && !proposal.pitch_generated {
        return Err(LifecycleError::SentWithoutPitch {
            proposal_id: proposal.id.clone(),
            status: proposal.status.clone(),
        });
    }

    Ok(())
}

use thiserror::Error;

use crate::gating::ProposalAction;
use crate::ids::EntityId;
use crate::lifecycle::ProposalStatus;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LifecycleError {
    #[error("invalid proposal transition {from} -> {to}")]
    InvalidTransition {
        from: ProposalStatus,
        to: ProposalStatus,
    },
    #[error("proposal {proposal_id} reports a pitch before research completed")]
    PitchBeforeResearch { proposal_id: EntityId },
    #[error("proposal {proposal_id} is {status} without a generated pitch")]
    SentWithoutPitch {
        proposal_id: EntityId,
        status: ProposalStatus,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GateError {
    #[error("research already completed")]
    ResearchAlreadyCompleted,
    #[error("research not completed. Run research first.")]
    ResearchIncomplete,
    #[error("pitch already generated")]
    PitchAlreadyGenerated,
    #[error("pitch not generated yet")]
    PitchMissing,
    #[error("proposal already has {count} quotations")]
    QuotationsAlreadyRequested { count: usize },
    #[error("no bank has responded yet")]
    NoRespondedQuotations,
}

impl GateError {
    pub fn action(&self) -> ProposalAction {
        match self {
            Self::ResearchAlreadyCompleted => ProposalAction::TriggerResearch,
            Self::ResearchIncomplete | Self::PitchAlreadyGenerated => ProposalAction::GeneratePitch,
            Self::PitchMissing | Self::QuotationsAlreadyRequested { .. } => {
                ProposalAction::SendToBanks
            }
            Self::NoRespondedQuotations => ProposalAction::CompareAndOptimize,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {reason}")]
pub struct ValidationError {
    pub field: &'static str,
    pub reason: String,
}

impl ValidationError {
    pub fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RiskError {
    #[error("breach probability must lie in [0, 1], got {0}")]
    OutOfRange(f64),
}

//! Proposal actions that are checked against the current snapshot before
//! anything is sent.

use lattice_core::gating::{self, ProposalAction};
use lattice_core::{EntityId, GateError, Proposal, Quotation, rank_responded};
use lattice_platform::{ApiError, LatticeClient, QuotationBatch, QuotationRequest, TriggerResponse};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("cannot {action}: {0}", action = .0.action())]
    Gate(#[from] GateError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("no banks selected")]
    NoBanks,
}

impl WorkflowError {
    pub fn user_message(&self) -> String {
        match self {
            Self::Api(err) => err.user_message(),
            other => other.to_string(),
        }
    }
}

pub struct ProposalWorkflow<'a> {
    client: &'a LatticeClient,
}

impl<'a> ProposalWorkflow<'a> {
    pub fn new(client: &'a LatticeClient) -> Self {
        Self { client }
    }

    pub async fn trigger_research(
        &self,
        proposal: &Proposal,
        quotations: &[Quotation],
    ) -> Result<TriggerResponse, WorkflowError> {
        gating::check(ProposalAction::TriggerResearch, proposal, quotations)?;
        let response = self.client.trigger_research(&proposal.id).await?;
        info!(proposal_id = %proposal.id, "research requested");
        Ok(response)
    }

    pub async fn generate_pitch(
        &self,
        proposal: &Proposal,
        quotations: &[Quotation],
    ) -> Result<TriggerResponse, WorkflowError> {
        gating::check(ProposalAction::GeneratePitch, proposal, quotations)?;
        let response = self.client.generate_pitch(&proposal.id).await?;
        info!(proposal_id = %proposal.id, "pitch requested");
        Ok(response)
    }

    /// Requests quotations from `bank_ids` for the full amount and term of
    /// the proposal.
    pub async fn send_to_banks(
        &self,
        proposal: &Proposal,
        quotations: &[Quotation],
        bank_ids: Vec<EntityId>,
    ) -> Result<QuotationBatch, WorkflowError> {
        gating::check(ProposalAction::SendToBanks, proposal, quotations)?;
        if bank_ids.is_empty() {
            return Err(WorkflowError::NoBanks);
        }

        let request = quotation_request(proposal, bank_ids);
        let batch = self.client.create_quotations(&request).await?;
        info!(
            proposal_id = %proposal.id,
            created = batch.quotations_created,
            "quotation requests sent"
        );
        Ok(batch)
    }
}

/// Responded offers ranked best first. Local only; nothing is sent.
pub fn compare<'q>(
    proposal: &Proposal,
    quotations: &'q [Quotation],
) -> Result<Vec<&'q Quotation>, WorkflowError> {
    gating::check(ProposalAction::CompareAndOptimize, proposal, quotations)?;
    Ok(rank_responded(quotations))
}

pub fn quotation_request(proposal: &Proposal, bank_ids: Vec<EntityId>) -> QuotationRequest {
    QuotationRequest {
        loan_proposal_id: proposal.id.clone(),
        bank_ids,
        requested_amount: proposal.requested_amount,
        requested_term_months: proposal.desired_term_months,
    }
}

use async_trait::async_trait;
use lattice_core::{
    ClientResearch, Covenant, CovenantStatus, Document, EntityId, Loan, Pitch, Proposal,
    ProposalStatusChanged, Quotation,
};

use crate::client::{ApiResult, LatticeClient};

/// Read side a live proposal view polls.
#[async_trait]
pub trait ProposalSource: Send + Sync {
    async fn proposal(&self, id: &EntityId) -> ApiResult<Proposal>;
    async fn quotations(&self, proposal_id: &EntityId) -> ApiResult<Vec<Quotation>>;
    async fn research(&self, proposal_id: &EntityId) -> ApiResult<ClientResearch>;
    async fn pitch(&self, proposal_id: &EntityId) -> ApiResult<Pitch>;
}

#[async_trait]
pub trait CovenantSource: Send + Sync {
    async fn covenants(&self, status: Option<CovenantStatus>) -> ApiResult<Vec<Covenant>>;
    async fn loan(&self, id: &EntityId) -> ApiResult<Loan>;
}

#[async_trait]
pub trait DocumentSource: Send + Sync {
    async fn document(&self, id: &EntityId) -> ApiResult<Document>;
}

/// Destination for observed status changes.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn publish(&self, event: &ProposalStatusChanged) -> anyhow::Result<()>;
}

#[async_trait]
impl ProposalSource for LatticeClient {
    async fn proposal(&self, id: &EntityId) -> ApiResult<Proposal> {
        self.get_proposal(id).await
    }

    async fn quotations(&self, proposal_id: &EntityId) -> ApiResult<Vec<Quotation>> {
        self.quotations_for_proposal(proposal_id).await
    }

    async fn research(&self, proposal_id: &EntityId) -> ApiResult<ClientResearch> {
        self.get_research(proposal_id).await
    }

    async fn pitch(&self, proposal_id: &EntityId) -> ApiResult<Pitch> {
        self.get_pitch(proposal_id).await
    }
}

#[async_trait]
impl CovenantSource for LatticeClient {
    async fn covenants(&self, status: Option<CovenantStatus>) -> ApiResult<Vec<Covenant>> {
        self.list_covenants(status).await
    }

    async fn loan(&self, id: &EntityId) -> ApiResult<Loan> {
        self.get_loan(id).await
    }
}

#[async_trait]
impl DocumentSource for LatticeClient {
    async fn document(&self, id: &EntityId) -> ApiResult<Document> {
        self.get_document(id).await
    }
}

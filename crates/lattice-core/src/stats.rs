//! Dashboard figures derived from fetched entity lists.

use std::collections::BTreeSet;

use rust_decimal::Decimal;
use serde::Serialize;

use crate::ids::EntityId;
use crate::lifecycle::ProposalStatus;
use crate::models::{
    Covenant, CovenantStatus, Document, DocumentStatus, Loan, Proposal, Quotation, QuotationStatus,
};
use crate::risk::{RiskTier, covenant_tier};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProposalStats {
    pub total: usize,
    pub active: usize,
    pub approved: usize,
    /// Plain sum of requested amounts, regardless of currency.
    pub total_requested: Decimal,
}

impl ProposalStats {
    pub fn from_proposals(proposals: &[Proposal]) -> Self {
        proposals.iter().fold(Self::default(), |mut stats, proposal| {
            stats.total += 1;
            if proposal.status.is_active() {
                stats.active += 1;
            }
            if proposal.status == ProposalStatus::Approved {
                stats.approved += 1;
            }
            stats.total_requested += proposal.requested_amount;
            stats
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CovenantStats {
    pub total: usize,
    pub compliant: usize,
    pub warning: usize,
    pub breach: usize,
    pub unknown: usize,
    pub high_risk: usize,
}

impl CovenantStats {
    pub fn from_covenants(covenants: &[Covenant]) -> Self {
        covenants.iter().fold(Self::default(), |mut stats, covenant| {
            stats.total += 1;
            match covenant.status {
                CovenantStatus::Compliant => stats.compliant += 1,
                CovenantStatus::Warning => stats.warning += 1,
                CovenantStatus::Breach => stats.breach += 1,
                CovenantStatus::Unknown => stats.unknown += 1,
            }
            if covenant_tier(covenant) == RiskTier::High {
                stats.high_risk += 1;
            }
            stats
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QuotationStats {
    pub total: usize,
    pub responded: usize,
    pub awaiting: usize,
}

impl QuotationStats {
    pub fn from_quotations(quotations: &[Quotation]) -> Self {
        quotations.iter().fold(Self::default(), |mut stats, quotation| {
            stats.total += 1;
            match quotation.status {
                QuotationStatus::Responded | QuotationStatus::Accepted => stats.responded += 1,
                QuotationStatus::Pending | QuotationStatus::Sent | QuotationStatus::Viewed => {
                    stats.awaiting += 1
                }
                _ => {}
            }
            stats
        })
    }
}

/// Portfolio overview: documents, extracted loans and covenants at risk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DashboardSummary {
    pub documents: usize,
    pub documents_completed: usize,
    pub documents_failed: usize,
    pub loans: usize,
    /// Sum of known loan amounts, regardless of currency. Loans without an
    /// extracted amount add nothing.
    pub total_loan_value: Decimal,
    pub at_risk_covenants: usize,
    pub breached_covenants: usize,
}

impl DashboardSummary {
    pub fn from_parts(loans: &[Loan], documents: &[Document], at_risk: &[Covenant]) -> Self {
        let mut summary = Self {
            documents: documents.len(),
            loans: loans.len(),
            total_loan_value: loans.iter().filter_map(|loan| loan.loan_amount).sum(),
            ..Self::default()
        };
        for document in documents {
            match document.status {
                DocumentStatus::Completed => summary.documents_completed += 1,
                DocumentStatus::Failed => summary.documents_failed += 1,
                _ => {}
            }
        }
        // compliant rows never count, whatever the endpoint returned
        for covenant in at_risk.iter().filter(|covenant| covenant.status.is_at_risk()) {
            summary.at_risk_covenants += 1;
            if covenant.status == CovenantStatus::Breach {
                summary.breached_covenants += 1;
            }
        }
        summary
    }
}

/// `None` keeps everything, mirroring the "all" filter.
pub fn filter_proposals<'a>(
    proposals: &'a [Proposal],
    status: Option<&ProposalStatus>,
) -> Vec<&'a Proposal> {
    proposals
        .iter()
        .filter(|proposal| status.is_none_or(|status| &proposal.status == status))
        .collect()
}

pub fn filter_covenants(covenants: &[Covenant], status: Option<CovenantStatus>) -> Vec<&Covenant> {
    covenants
        .iter()
        .filter(|covenant| status.is_none_or(|status| covenant.status == status))
        .collect()
}

pub fn at_risk_covenants(covenants: &[Covenant]) -> Vec<&Covenant> {
    covenants
        .iter()
        .filter(|covenant| covenant.status.is_at_risk())
        .collect()
}

/// Distinct loan references in first-seen order.
pub fn unique_loan_ids(covenants: &[Covenant]) -> Vec<EntityId> {
    let mut seen = BTreeSet::new();
    covenants
        .iter()
        .filter(|covenant| seen.insert(covenant.loan_id.clone()))
        .map(|covenant| covenant.loan_id.clone())
        .collect()
}

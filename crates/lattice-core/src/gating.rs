//! Which workflow actions a proposal currently allows.

use std::cmp::Ordering;
use std::fmt;

use serde::Serialize;

use crate::error::GateError;
use crate::models::{Proposal, Quotation, QuotationStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalAction {
    TriggerResearch,
    GeneratePitch,
    SendToBanks,
    CompareAndOptimize,
}

impl fmt::Display for ProposalAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::TriggerResearch => "trigger research",
            Self::GeneratePitch => "generate pitch",
            Self::SendToBanks => "send to banks",
            Self::CompareAndOptimize => "compare and optimize quotations",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ProposalActions {
    pub trigger_research: bool,
    pub generate_pitch: bool,
    pub send_to_banks: bool,
    pub compare_and_optimize: bool,
}

impl ProposalActions {
    pub fn derive(proposal: &Proposal, quotations: &[Quotation]) -> Self {
        Self {
            trigger_research: check_trigger_research(proposal).is_ok(),
            generate_pitch: check_generate_pitch(proposal).is_ok(),
            send_to_banks: check_send_to_banks(proposal, quotations).is_ok(),
            compare_and_optimize: check_compare_and_optimize(quotations).is_ok(),
        }
    }

    pub fn allows(&self, action: ProposalAction) -> bool {
        match action {
            ProposalAction::TriggerResearch => self.trigger_research,
            ProposalAction::GeneratePitch => self.generate_pitch,
            ProposalAction::SendToBanks => self.send_to_banks,
            ProposalAction::CompareAndOptimize => self.compare_and_optimize,
        }
    }
}

pub fn check(
    action: ProposalAction,
    proposal: &Proposal,
    quotations: &[Quotation],
) -> Result<(), GateError> {
    match action {
        ProposalAction::TriggerResearch => check_trigger_research(proposal),
        ProposalAction::GeneratePitch => check_generate_pitch(proposal),
        ProposalAction::SendToBanks => check_send_to_banks(proposal, quotations),
        ProposalAction::CompareAndOptimize => check_compare_and_optimize(quotations),
    }
}

pub fn check_trigger_research(proposal: &Proposal) -> Result<(), GateError> {
    if proposal.research_completed {
        return Err(GateError::ResearchAlreadyCompleted);
    }
    Ok(())
}

pub fn check_generate_pitch(proposal: &Proposal) -> Result<(), GateError> {
    if !proposal.research_completed {
        return Err(GateError::ResearchIncomplete);
    }
    if proposal.pitch_generated {
        return Err(GateError::PitchAlreadyGenerated);
    }
    Ok(())
}

pub fn check_send_to_banks(proposal: &Proposal, quotations: &[Quotation]) -> Result<(), GateError> {
    if !quotations.is_empty() {
        return Err(GateError::QuotationsAlreadyRequested {
            count: quotations.len(),
        });
    }
    if !proposal.pitch_generated {
        return Err(GateError::PitchMissing);
    }
    Ok(())
}

pub fn check_compare_and_optimize(quotations: &[Quotation]) -> Result<(), GateError> {
    if quotations
        .iter()
        .any(|quotation| quotation.status == QuotationStatus::Responded)
    {
        Ok(())
    } else {
        Err(GateError::NoRespondedQuotations)
    }
}

/// Responded offers, cheapest rate first. Ties go to the larger offered
/// amount, then bank name. Offers without a rate sort last.
pub fn rank_responded(quotations: &[Quotation]) -> Vec<&Quotation> {
    let mut ranked: Vec<&Quotation> = quotations
        .iter()
        .filter(|quotation| quotation.status == QuotationStatus::Responded)
        .collect();

    ranked.sort_by(|left, right| {
        compare_rates(left.offered_interest_rate, right.offered_interest_rate)
            .then_with(|| right.offered_amount.cmp(&left.offered_amount))
            .then_with(|| left.bank_name.cmp(&right.bank_name))
    });
    ranked
}

fn compare_rates(left: Option<f64>, right: Option<f64>) -> Ordering {
    match (left, right) {
        (Some(left), Some(right)) => left.total_cmp(&right),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use super::*;
    use crate::ids::EntityId;
    use crate::lifecycle::ProposalStatus;

    fn proposal(research_completed: bool, pitch_generated: bool) -> Proposal {
        Proposal {
            id: EntityId::from(1),
            client_name: "Nordwind Logistics".to_string(),
            client_industry: Some("Logistics".to_string()),
            client_country: Some("Norway".to_string()),
            client_website: None,
            requested_amount: Decimal::new(80_000_000, 0),
            currency: "USD".to_string(),
            loan_purpose: Some("Fleet renewal".to_string()),
            desired_term_months: Some(84),
            max_acceptable_rate: None,
            status: ProposalStatus::Draft,
            selected_mla_id: None,
            research_completed,
            pitch_generated,
            created_at: Utc::now(),
            updated_at: None,
            mla_bids_count: None,
            quotations_count: None,
            has_syndicate: None,
        }
    }

    fn quotation(bank: &str, status: QuotationStatus, rate: Option<f64>, amount: i64) -> Quotation {
        Quotation {
            id: EntityId::new(format!("q-{bank}")),
            loan_proposal_id: EntityId::from(1),
            bank_id: EntityId::new(bank),
            bank_name: Some(bank.to_string()),
            bank_country: None,
            bank_rating: None,
            requested_amount: None,
            offered_amount: Some(Decimal::new(amount, 0)),
            offered_interest_rate: rate,
            offered_term_months: Some(60),
            status,
            is_selected: false,
            sent_at: None,
            responded_at: None,
        }
    }

    #[test]
    fn pitch_requires_research() {
        let fresh = proposal(false, false);
        assert_eq!(check_generate_pitch(&fresh), Err(GateError::ResearchIncomplete));
        assert!(check_trigger_research(&fresh).is_ok());

        let researched = proposal(true, false);
        let actions = ProposalActions::derive(&researched, &[]);
        assert!(actions.generate_pitch);
        assert!(!actions.trigger_research);
        assert!(!actions.send_to_banks);
    }

    #[test]
    fn send_to_banks_closes_once_quotations_exist() {
        let pitched = proposal(true, true);
        assert!(ProposalActions::derive(&pitched, &[]).send_to_banks);

        let quotes = [quotation("Helaba", QuotationStatus::Sent, None, 0)];
        let actions = ProposalActions::derive(&pitched, &quotes);
        assert!(!actions.send_to_banks);
        assert_eq!(
            check(ProposalAction::SendToBanks, &pitched, &quotes),
            Err(GateError::QuotationsAlreadyRequested { count: 1 })
        );

        // quotations block sending even without a pitch
        let unpitched = proposal(true, false);
        assert_eq!(
            check_send_to_banks(&unpitched, &quotes),
            Err(GateError::QuotationsAlreadyRequested { count: 1 })
        );
    }

    #[test]
    fn compare_needs_a_responded_offer() {
        let pending = [
            quotation("A", QuotationStatus::Sent, None, 0),
            quotation("B", QuotationStatus::Viewed, None, 0),
        ];
        assert!(check_compare_and_optimize(&pending).is_err());

        let mut answered = pending.to_vec();
        answered.push(quotation("C", QuotationStatus::Responded, Some(4.1), 10));
        assert!(check_compare_and_optimize(&answered).is_ok());
    }

    #[test]
    fn ranks_by_rate_then_amount() {
        let quotes = [
            quotation("Expensive", QuotationStatus::Responded, Some(6.2), 50),
            quotation("Small", QuotationStatus::Responded, Some(4.5), 20),
            quotation("Large", QuotationStatus::Responded, Some(4.5), 90),
            quotation("Silent", QuotationStatus::Sent, Some(1.0), 90),
            quotation("NoRate", QuotationStatus::Responded, None, 100),
        ];

        let names: Vec<_> = rank_responded(&quotes)
            .into_iter()
            .map(|quotation| quotation.bank_name.clone().unwrap_or_default())
            .collect();
        assert_eq!(names, ["Large", "Small", "Expensive", "NoRate"]);
    }

    #[test]
    fn gate_errors_name_their_action() {
        assert_eq!(GateError::ResearchIncomplete.action(), ProposalAction::GeneratePitch);
        assert_eq!(GateError::NoRespondedQuotations.action(), ProposalAction::CompareAndOptimize);
    }
}

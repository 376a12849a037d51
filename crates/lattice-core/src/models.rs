use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::ids::EntityId;
use crate::lifecycle::ProposalStatus;
use crate::timestamp;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Proposal {
    pub id: EntityId,
    pub client_name: String,
    pub client_industry: Option<String>,
    pub client_country: Option<String>,
    pub client_website: Option<String>,
    #[serde(with = "rust_decimal::serde::float")]
    pub requested_amount: Decimal,
    #[serde(default = "default_currency")]
    pub currency: String,
    pub loan_purpose: Option<String>,
    pub desired_term_months: Option<u32>,
    pub max_acceptable_rate: Option<f64>,
    pub status: ProposalStatus,
    pub selected_mla_id: Option<EntityId>,
    #[serde(default)]
    pub research_completed: bool,
    #[serde(default)]
    pub pitch_generated: bool,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default, with = "timestamp::option")]
    pub updated_at: Option<DateTime<Utc>>,
    // Present on detail responses only.
    pub mla_bids_count: Option<u32>,
    pub quotations_count: Option<u32>,
    pub has_syndicate: Option<bool>,
}

impl Proposal {
    pub fn progress(&self) -> u8 {
        self.status.progress()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuotationStatus {
    Pending,
    Sent,
    Viewed,
    Responded,
    Accepted,
    Rejected,
    Expired,
    #[serde(other)]
    Unrecognized,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quotation {
    pub id: EntityId,
    pub loan_proposal_id: EntityId,
    pub bank_id: EntityId,
    pub bank_name: Option<String>,
    pub bank_country: Option<String>,
    pub bank_rating: Option<String>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub requested_amount: Option<Decimal>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub offered_amount: Option<Decimal>,
    pub offered_interest_rate: Option<f64>,
    pub offered_term_months: Option<u32>,
    pub status: QuotationStatus,
    #[serde(default)]
    pub is_selected: bool,
    #[serde(default, with = "timestamp::option")]
    pub sent_at: Option<DateTime<Utc>>,
    #[serde(default, with = "timestamp::option")]
    pub responded_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CovenantType {
    Financial,
    Affirmative,
    Negative,
    Reporting,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CovenantStatus {
    Compliant,
    Warning,
    Breach,
    #[serde(other)]
    Unknown,
}

impl CovenantStatus {
    pub fn is_at_risk(self) -> bool {
        matches!(self, Self::Warning | Self::Breach)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Covenant {
    pub id: EntityId,
    pub loan_id: EntityId,
    pub covenant_type: CovenantType,
    pub covenant_name: String,
    pub description: Option<String>,
    pub metric_name: Option<String>,
    pub threshold_value: Option<f64>,
    pub current_value: Option<f64>,
    pub comparison_operator: Option<String>,
    pub testing_frequency: Option<String>,
    pub status: CovenantStatus,
    #[serde(default = "default_true")]
    pub is_active: bool,
    pub breach_probability_30d: Option<f64>,
    pub breach_probability_60d: Option<f64>,
    pub breach_probability_90d: Option<f64>,
    #[serde(default, with = "timestamp::option")]
    pub last_tested_date: Option<DateTime<Utc>>,
    #[serde(default, with = "timestamp::option")]
    pub next_test_date: Option<DateTime<Utc>>,
}

/// Partial update accepted by `PATCH /api/covenants/{id}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CovenantUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<CovenantStatus>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Loan {
    pub id: EntityId,
    pub document_id: EntityId,
    pub borrower_name: Option<String>,
    pub facility_type: Option<String>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub loan_amount: Option<Decimal>,
    #[serde(default = "default_currency")]
    pub currency: String,
    pub interest_rate: Option<f64>,
    pub maturity_date: Option<String>,
    pub origination_date: Option<String>,
    pub agent_bank: Option<String>,
    pub purpose: Option<String>,
    pub governing_law: Option<String>,
    pub lead_arrangers: Option<Vec<String>>,
    pub extraction_confidence: Option<f64>,
    #[serde(default)]
    pub covenants: Vec<Covenant>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Uploaded,
    Processing,
    Completed,
    Failed,
    #[serde(other)]
    Unknown,
}

impl DocumentStatus {
    /// Extraction has finished one way or the other.
    pub fn is_settled(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: EntityId,
    pub filename: String,
    pub file_path: Option<String>,
    pub file_type: Option<String>,
    pub file_size: Option<u64>,
    pub status: DocumentStatus,
    pub error_message: Option<String>,
    #[serde(default, with = "timestamp::option")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, with = "timestamp::option")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bank {
    pub id: EntityId,
    pub name: String,
    pub short_name: Option<String>,
    pub bank_type: Option<String>,
    pub headquarters_country: Option<String>,
    pub headquarters_city: Option<String>,
    pub contact_email: Option<String>,
    pub website: Option<String>,
    pub total_assets_usd: Option<f64>,
    pub credit_rating: Option<String>,
    #[serde(default)]
    pub min_loan_amount: f64,
    pub max_loan_amount: Option<f64>,
    pub risk_appetite: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_verified: bool,
    pub avg_interest_rate: Option<f64>,
    #[serde(default)]
    pub participation_count: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankStats {
    pub total_banks: u64,
    #[serde(default)]
    pub by_country: BTreeMap<String, u64>,
    #[serde(default)]
    pub by_type: BTreeMap<String, u64>,
    #[serde(default)]
    pub by_risk_appetite: BTreeMap<String, u64>,
}

/// AI research dossier. Only the fields the client renders are typed; the
/// rest is kept in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientResearch {
    pub id: EntityId,
    pub loan_proposal_id: EntityId,
    pub company_description: Option<String>,
    pub annual_revenue: Option<f64>,
    pub total_assets: Option<f64>,
    pub credit_rating: Option<String>,
    pub debt_to_equity_ratio: Option<f64>,
    pub risk_assessment: Option<String>,
    pub sentiment_score: Option<f64>,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub weaknesses: Vec<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pitch {
    pub id: EntityId,
    pub loan_proposal_id: EntityId,
    pub title: Option<String>,
    pub executive_summary: Option<String>,
    pub full_pitch_markdown: Option<String>,
    pub word_count: Option<u32>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

fn default_currency() -> String {
    "USD".to_string()
}

fn default_true() -> bool {
    true
}

use lattice_core::EntityId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotationRequest {
    pub loan_proposal_id: EntityId,
    pub bank_ids: Vec<EntityId>,
    #[serde(with = "rust_decimal::serde::float")]
    pub requested_amount: Decimal,
    pub requested_term_months: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BankRef {
    pub id: EntityId,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotationBatch {
    pub message: String,
    pub proposal_id: EntityId,
    #[serde(default)]
    pub banks: Vec<BankRef>,
    pub quotations_created: u32,
    pub status: Option<String>,
}

/// Acknowledgement for research, pitch and regenerate triggers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerResponse {
    pub message: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BankFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bank_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk_appetite: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BankSearch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loan_amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sector: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_rating: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct StatusFilter<S: Serialize> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<S>,
}

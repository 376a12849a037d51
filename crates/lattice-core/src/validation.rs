//! Client-side checks that run before anything is sent to the API.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

pub const PDF_MIME_TYPE: &str = "application/pdf";

/// Advisory upload ceiling shown to users; not enforced.
pub const ADVISORY_UPLOAD_LIMIT_BYTES: u64 = 10 * 1024 * 1024;

/// Raw proposal form input, as typed by a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalForm {
    pub client_name: String,
    pub client_industry: String,
    pub client_country: String,
    #[serde(default)]
    pub client_website: String,
    pub requested_amount: String,
    pub currency: String,
    pub loan_purpose: String,
    pub desired_term_months: String,
    #[serde(default)]
    pub max_acceptable_rate: String,
}

impl Default for ProposalForm {
    fn default() -> Self {
        Self {
            client_name: String::new(),
            client_industry: String::new(),
            client_country: String::new(),
            client_website: String::new(),
            requested_amount: String::new(),
            currency: "USD".to_string(),
            loan_purpose: String::new(),
            desired_term_months: "60".to_string(),
            max_acceptable_rate: String::new(),
        }
    }
}

/// Validated payload for `POST /api/loan-proposals/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProposal {
    pub client_name: String,
    pub client_industry: String,
    pub client_country: String,
    pub client_website: Option<String>,
    #[serde(with = "rust_decimal::serde::float")]
    pub requested_amount: Decimal,
    pub currency: String,
    pub loan_purpose: String,
    pub desired_term_months: u32,
    pub max_acceptable_rate: Option<f64>,
}

impl ProposalForm {
    pub fn validate(&self) -> Result<NewProposal, ValidationError> {
        Ok(NewProposal {
            client_name: required(&self.client_name, "client_name")?,
            client_industry: required(&self.client_industry, "client_industry")?,
            client_country: required(&self.client_country, "client_country")?,
            client_website: optional(&self.client_website),
            requested_amount: parse_amount(&self.requested_amount)?,
            currency: normalize_currency(&self.currency)?,
            loan_purpose: required(&self.loan_purpose, "loan_purpose")?,
            desired_term_months: parse_term(&self.desired_term_months)?,
            max_acceptable_rate: parse_max_rate(&self.max_acceptable_rate)?,
        })
    }
}

fn required(value: &str, field: &'static str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::new(field, "is required"));
    }
    Ok(trimmed.to_string())
}

fn optional(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

pub fn parse_amount(value: &str) -> Result<Decimal, ValidationError> {
    let raw = required(value, "requested_amount")?;
    let raw = strip_thousands(&raw).ok_or_else(|| {
        ValidationError::new("requested_amount", "commas may only separate thousands")
    })?;
    let amount = raw
        .parse::<Decimal>()
        .or_else(|_| Decimal::from_scientific(&raw))
        .map_err(|_| ValidationError::new("requested_amount", "must be a number"))?;

    if amount <= Decimal::ZERO {
        return Err(ValidationError::new("requested_amount", "must be positive"));
    }
    Ok(amount)
}

/// Removes `1,234,567` style grouping. Any other comma makes the input
/// ambiguous (`1,5` may be a decimal comma) and yields `None`.
fn strip_thousands(raw: &str) -> Option<String> {
    if !raw.contains(',') {
        return Some(raw.to_string());
    }

    let unsigned = raw.trim_start_matches(['+', '-']);
    let (integer, fraction) = match unsigned.split_once('.') {
        Some((integer, fraction)) => (integer, Some(fraction)),
        None => (unsigned, None),
    };
    if fraction.is_some_and(|fraction| fraction.contains(',')) {
        return None;
    }

    let mut groups = integer.split(',');
    let lead = groups.next()?;
    let digits = |group: &str| group.bytes().all(|byte| byte.is_ascii_digit());
    if lead.is_empty() || lead.len() > 3 || !digits(lead) {
        return None;
    }
    if !groups.all(|group| group.len() == 3 && digits(group)) {
        return None;
    }
    Some(raw.replace(',', ""))
}

pub fn parse_term(value: &str) -> Result<u32, ValidationError> {
    let raw = required(value, "desired_term_months")?;
    let months = raw
        .parse::<u32>()
        .map_err(|_| ValidationError::new("desired_term_months", "must be a whole number of months"))?;

    if months == 0 {
        return Err(ValidationError::new("desired_term_months", "must be positive"));
    }
    Ok(months)
}

pub fn parse_max_rate(value: &str) -> Result<Option<f64>, ValidationError> {
    let Some(raw) = optional(value) else {
        return Ok(None);
    };

    let rate = raw
        .trim_end_matches('%')
        .trim()
        .parse::<f64>()
        .map_err(|_| ValidationError::new("max_acceptable_rate", "must be a number"))?;

    if !(0.0..=100.0).contains(&rate) {
        return Err(ValidationError::new(
            "max_acceptable_rate",
            "must be between 0 and 100",
        ));
    }
    Ok(Some(rate))
}

pub fn normalize_currency(value: &str) -> Result<String, ValidationError> {
    let normalized = required(value, "currency")?.to_ascii_uppercase();
    if normalized.len() != 3 || !normalized.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(ValidationError::new("currency", "must be a 3-letter ISO code"));
    }
    Ok(normalized)
}

/// Uploads are filtered by MIME type before any request is made.
pub fn is_pdf(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .is_some_and(|essence| essence.trim().eq_ignore_ascii_case(PDF_MIME_TYPE))
}

/// MIME type for a file name, judged by extension only.
pub fn content_type_for(file_name: &str) -> Option<&'static str> {
    let (_, extension) = file_name.rsplit_once('.')?;
    extension.eq_ignore_ascii_case("pdf").then_some(PDF_MIME_TYPE)
}

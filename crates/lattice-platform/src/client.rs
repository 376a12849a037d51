use lattice_core::validation::is_pdf;
use lattice_core::{
    Bank, BankStats, ClientResearch, Covenant, CovenantStatus, CovenantUpdate, Document, EntityId,
    Loan, NewProposal, Pitch, Proposal, ProposalStatus, Quotation, QuotationStatus,
    ValidationError,
};
use reqwest::{Client, RequestBuilder, Url, multipart};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use uuid::Uuid;

use crate::config::ClientConfig;
use crate::contracts::{
    BankFilter, BankSearch, QuotationBatch, QuotationRequest, StatusFilter, TriggerResponse,
};
use crate::error::{ApiError, GENERIC_FAILURE, extract_detail};

pub type ApiResult<T> = Result<T, ApiError>;

/// Typed client for the LoanLattice REST API. Every call is attempted once.
#[derive(Clone, Debug)]
pub struct LatticeClient {
    http: Client,
    base_url: Url,
}

impl LatticeClient {
    pub fn new(config: &ClientConfig) -> ApiResult<Self> {
        let http = Client::builder().timeout(config.http_timeout).build()?;
        Self::with_http(http, &config.api_url)
    }

    pub fn with_http(http: Client, base_url: &str) -> ApiResult<Self> {
        let base_url = Url::parse(base_url.trim_end_matches('/')).map_err(|err| {
            ApiError::Invalid(ValidationError::new("api_url", err.to_string()))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::Invalid(ValidationError::new(
                "api_url",
                "must be an http(s) base URL",
            )));
        }
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    // documents

    /// Rejects anything that is not `application/pdf` before sending.
    pub async fn upload_document(
        &self,
        file_name: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> ApiResult<Document> {
        if !is_pdf(content_type) {
            return Err(ApiError::UnsupportedFileType {
                content_type: content_type.to_string(),
            });
        }

        let part = multipart::Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(content_type)?;
        let form = multipart::Form::new().part("file", part);
        let url = self.url(&["documents", "upload"]);
        self.send(self.http.post(url).multipart(form)).await
    }

    pub async fn get_document(&self, id: &EntityId) -> ApiResult<Document> {
        self.get(&["documents", segment(id)?]).await
    }

    pub async fn list_documents(&self) -> ApiResult<Vec<Document>> {
        self.get(&["documents", ""]).await
    }

    pub async fn process_document(&self, id: &EntityId) -> ApiResult<Document> {
        self.post_empty(&["documents", segment(id)?, "process"])
            .await
    }

    // loans

    pub async fn get_loan(&self, id: &EntityId) -> ApiResult<Loan> {
        self.get(&["loans", segment(id)?]).await
    }

    pub async fn list_loans(&self) -> ApiResult<Vec<Loan>> {
        self.get(&["loans", ""]).await
    }

    pub async fn loans_for_document(&self, document_id: &EntityId) -> ApiResult<Vec<Loan>> {
        self.get(&["loans", "document", segment(document_id)?])
            .await
    }

    // covenants

    pub async fn get_covenant(&self, id: &EntityId) -> ApiResult<Covenant> {
        self.get(&["covenants", segment(id)?]).await
    }

    pub async fn list_covenants(&self, status: Option<CovenantStatus>) -> ApiResult<Vec<Covenant>> {
        self.get_with(&["covenants", ""], &StatusFilter { status })
            .await
    }

    pub async fn covenants_for_loan(&self, loan_id: &EntityId) -> ApiResult<Vec<Covenant>> {
        self.get(&["covenants", "loan", segment(loan_id)?])
            .await
    }

    pub async fn update_covenant(
        &self,
        id: &EntityId,
        update: &CovenantUpdate,
    ) -> ApiResult<Covenant> {
        let url = self.url(&["covenants", segment(id)?]);
        self.send(self.http.patch(url).json(update)).await
    }

    pub async fn at_risk_covenants(&self) -> ApiResult<Vec<Covenant>> {
        self.get(&["covenants", "alerts", "at-risk"]).await
    }

    // proposals

    pub async fn create_proposal(&self, proposal: &NewProposal) -> ApiResult<Proposal> {
        self.post_json(&["loan-proposals", ""], proposal).await
    }

    pub async fn list_proposals(&self, status: Option<&ProposalStatus>) -> ApiResult<Vec<Proposal>> {
        let status = status.map(ProposalStatus::as_str);
        self.get_with(&["loan-proposals", ""], &StatusFilter { status })
            .await
    }

    pub async fn get_proposal(&self, id: &EntityId) -> ApiResult<Proposal> {
        self.get(&["loan-proposals", segment(id)?]).await
    }

    pub async fn get_research(&self, id: &EntityId) -> ApiResult<ClientResearch> {
        self.get(&["loan-proposals", segment(id)?, "research"])
            .await
    }

    pub async fn get_pitch(&self, id: &EntityId) -> ApiResult<Pitch> {
        self.get(&["loan-proposals", segment(id)?, "pitch"]).await
    }

    pub async fn trigger_research(&self, id: &EntityId) -> ApiResult<TriggerResponse> {
        self.post_empty(&["loan-proposals", segment(id)?, "research"])
            .await
    }

    pub async fn generate_pitch(&self, id: &EntityId) -> ApiResult<TriggerResponse> {
        self.post_empty(&["loan-proposals", segment(id)?, "pitch"])
            .await
    }

    // banks

    pub async fn list_banks(&self, filter: &BankFilter) -> ApiResult<Vec<Bank>> {
        self.get_with(&["banks", ""], filter).await
    }

    pub async fn search_banks(&self, search: &BankSearch) -> ApiResult<Vec<Bank>> {
        self.get_with(&["banks", "search"], search).await
    }

    pub async fn get_bank(&self, id: &EntityId) -> ApiResult<Bank> {
        self.get(&["banks", segment(id)?]).await
    }

    pub async fn bank_stats(&self) -> ApiResult<BankStats> {
        self.get(&["banks", "stats"]).await
    }

    // quotations

    pub async fn create_quotations(&self, request: &QuotationRequest) -> ApiResult<QuotationBatch> {
        self.post_json(&["quotations", ""], request).await
    }

    pub async fn list_quotations(
        &self,
        status: Option<QuotationStatus>,
    ) -> ApiResult<Vec<Quotation>> {
        self.get_with(&["quotations", ""], &StatusFilter { status })
            .await
    }

    pub async fn quotations_for_proposal(&self, proposal_id: &EntityId) -> ApiResult<Vec<Quotation>> {
        self.get(&["quotations", "proposal", segment(proposal_id)?])
            .await
    }

    pub async fn get_quotation(&self, id: &EntityId) -> ApiResult<Quotation> {
        self.get(&["quotations", segment(id)?]).await
    }

    pub async fn regenerate_quotation(&self, id: &EntityId) -> ApiResult<TriggerResponse> {
        self.post_empty(&["quotations", segment(id)?, "regenerate"])
            .await
    }

    /// `/api/<segments>`; each segment is percent-encoded on its own, so an
    /// id can never add path components or a query. A trailing `""` keeps
    /// the trailing slash the list endpoints expect.
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().push("api").extend(segments);
        }
        url
    }

    async fn get<T: DeserializeOwned>(&self, segments: &[&str]) -> ApiResult<T> {
        self.send(self.http.get(self.url(segments))).await
    }

    async fn get_with<T, Q>(&self, segments: &[&str], query: &Q) -> ApiResult<T>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        self.send(self.http.get(self.url(segments)).query(query))
            .await
    }

    async fn post_json<T, B>(&self, segments: &[&str], body: &B) -> ApiResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send(self.http.post(self.url(segments)).json(body))
            .await
    }

    async fn post_empty<T: DeserializeOwned>(&self, segments: &[&str]) -> ApiResult<T> {
        self.send(self.http.post(self.url(segments))).await
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> ApiResult<T> {
        let request_id = Uuid::new_v4();
        let response = request
            .header("x-request-id", request_id.to_string())
            .send()
            .await?;
        let status = response.status();
        let path = response.url().path().to_string();
        debug!(%request_id, %status, %path, "api response");

        let body = response.bytes().await?;
        if !status.is_success() {
            let detail = extract_detail(&body).unwrap_or_else(|| GENERIC_FAILURE.to_string());
            return Err(ApiError::Status { status, detail });
        }

        serde_json::from_slice(&body).map_err(|source| ApiError::Decode { path, source })
    }
}

/// Ids that would vanish or collapse as a path segment are refused.
fn segment(id: &EntityId) -> ApiResult<&str> {
    match id.as_str() {
        "" | "." | ".." => Err(ApiError::Invalid(ValidationError::new(
            "id",
            format!("{:?} is not a usable identifier", id.as_str()),
        ))),
        raw => Ok(raw),
    }
}

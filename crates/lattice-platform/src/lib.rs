pub mod client;
pub mod config;
pub mod contracts;
pub mod error;
pub mod redis_bus;
pub mod source;

pub use client::{ApiResult, LatticeClient};
pub use config::ClientConfig;
pub use contracts::{BankFilter, BankRef, BankSearch, QuotationBatch, QuotationRequest, TriggerResponse};
pub use error::ApiError;
pub use redis_bus::RedisBus;
pub use source::{CovenantSource, DocumentSource, EventSink, ProposalSource};

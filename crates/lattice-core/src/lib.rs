pub mod error;
pub mod events;
pub mod gating;
pub mod ids;
pub mod lifecycle;
pub mod models;
pub mod risk;
pub mod stats;
pub mod timestamp;
pub mod validation;

pub use error::{GateError, LifecycleError, RiskError, ValidationError};
pub use events::{ChangeKind, ProposalStatusChanged};
pub use gating::{ProposalAction, ProposalActions, rank_responded};
pub use ids::EntityId;
pub use lifecycle::{
    CANONICAL_PATH, ProposalStatus, StatusChange, check_invariants, classify_change,
    validate_transition,
};
pub use models::{
    Bank, BankStats, ClientResearch, Covenant, CovenantStatus, CovenantType, CovenantUpdate,
    Document, DocumentStatus, Loan, Pitch, Proposal, Quotation, QuotationStatus,
};
pub use risk::{BreachProbability, RiskTier};
pub use stats::{CovenantStats, DashboardSummary, ProposalStats, QuotationStats};
pub use validation::{NewProposal, ProposalForm};

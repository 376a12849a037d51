pub mod covenants;
pub mod documents;
pub mod watch;
pub mod workflow;

pub use covenants::{CovenantBoard, CovenantRow};
pub use documents::{FollowUp, await_processing};
pub use watch::{ProposalView, ProposalWatcher, WatchHandle, WatchOutcome, refresh};
pub use workflow::{ProposalWorkflow, WorkflowError, compare};

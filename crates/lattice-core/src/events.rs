use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::EntityId;
use crate::lifecycle::{ProposalStatus, StatusChange, classify_change};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Advanced,
    Regressed,
    Opaque,
}

/// Emitted when a watcher sees a proposal's status differ between polls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposalStatusChanged {
    pub proposal_id: EntityId,
    pub previous: ProposalStatus,
    pub current: ProposalStatus,
    pub kind: ChangeKind,
    pub skipped_stages: usize,
    pub progress: u8,
    pub observed_at: DateTime<Utc>,
}

impl ProposalStatusChanged {
    /// `None` when the status did not change.
    pub fn observe(
        proposal_id: EntityId,
        previous: &ProposalStatus,
        current: &ProposalStatus,
    ) -> Option<Self> {
        let (kind, skipped_stages) = match classify_change(previous, current) {
            StatusChange::Unchanged => return None,
            StatusChange::Advanced { skipped } => (ChangeKind::Advanced, skipped),
            StatusChange::Regressed => (ChangeKind::Regressed, 0),
            StatusChange::Opaque => (ChangeKind::Opaque, 0),
        };

        Some(Self {
            proposal_id,
            previous: previous.clone(),
            current: current.clone(),
            kind,
            skipped_stages,
            progress: current.progress(),
            observed_at: Utc::now(),
        })
    }
}

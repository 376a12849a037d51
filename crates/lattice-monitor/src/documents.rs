use std::time::Duration;

use lattice_core::{Document, EntityId};
use lattice_platform::{ApiResult, DocumentSource};
use tracing::{debug, info};

/// Follow-up schedule after an upload. The default is a single re-check
/// three seconds later.
#[derive(Debug, Clone, Copy)]
pub struct FollowUp {
    pub delay: Duration,
    pub attempts: u32,
}

impl Default for FollowUp {
    fn default() -> Self {
        Self {
            delay: Duration::from_secs(3),
            attempts: 1,
        }
    }
}

/// Re-reads the document until extraction settles or the attempts run out,
/// returning the last state seen. An unsettled result is not an error.
pub async fn await_processing<S>(source: &S, id: &EntityId, follow_up: FollowUp) -> ApiResult<Document>
where
    S: DocumentSource + ?Sized,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        tokio::time::sleep(follow_up.delay).await;
        let document = source.document(id).await?;
        debug!(document_id = %id, attempt, status = ?document.status, "document re-checked");

        if document.status.is_settled() || attempt >= follow_up.attempts {
            info!(document_id = %id, status = ?document.status, "document follow-up finished");
            return Ok(document);
        }
    }
}

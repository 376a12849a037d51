//! Live proposal view kept fresh by a cancellable polling task.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use lattice_core::{
    ClientResearch, EntityId, Pitch, Proposal, ProposalActions, ProposalStatus,
    ProposalStatusChanged, Quotation, check_invariants,
};
use lattice_platform::{EventSink, ProposalSource};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Latest known state of one proposal. Failed fetches never clear it.
#[derive(Debug, Clone, Default)]
pub struct ProposalView {
    pub proposal: Option<Proposal>,
    pub quotations: Vec<Quotation>,
    pub research: Option<ClientResearch>,
    pub pitch: Option<Pitch>,
    pub last_error: Option<String>,
    pub refreshed_at: Option<DateTime<Utc>>,
    pub ticks: u64,
}

impl ProposalView {
    pub fn status(&self) -> Option<&ProposalStatus> {
        self.proposal.as_ref().map(|proposal| &proposal.status)
    }

    pub fn progress(&self) -> u8 {
        self.status().map_or(0, ProposalStatus::progress)
    }

    pub fn is_terminal(&self) -> bool {
        self.status().is_some_and(ProposalStatus::is_terminal)
    }

    pub fn actions(&self) -> Option<ProposalActions> {
        self.proposal
            .as_ref()
            .map(|proposal| ProposalActions::derive(proposal, &self.quotations))
    }
}

/// One poll tick: proposal and quotations concurrently, then research and
/// pitch when the fetched proposal says they exist.
///
/// Returns the status change seen on this tick, if any.
pub async fn refresh<S>(source: &S, id: &EntityId, view: &mut ProposalView) -> Option<ProposalStatusChanged>
where
    S: ProposalSource + ?Sized,
{
    let (proposal, quotations) = tokio::join!(source.proposal(id), source.quotations(id));
    view.ticks += 1;

    let mut errors = Vec::new();
    let mut change = None;

    match proposal {
        Ok(proposal) => {
            if let Err(violation) = check_invariants(&proposal) {
                warn!(proposal_id = %id, "inconsistent proposal snapshot: {violation}");
            }
            if let Some(previous) = &view.proposal {
                change = ProposalStatusChanged::observe(id.clone(), &previous.status, &proposal.status);
            }

            let (research, pitch) = tokio::join!(
                async {
                    if proposal.research_completed {
                        Some(source.research(id).await)
                    } else {
                        None
                    }
                },
                async {
                    if proposal.pitch_generated {
                        Some(source.pitch(id).await)
                    } else {
                        None
                    }
                },
            );

            // The flags can flip before the dependent record is readable;
            // a miss here is retried on the next tick.
            match research {
                Some(Ok(research)) => view.research = Some(research),
                Some(Err(err)) => debug!(proposal_id = %id, "research not readable yet: {err}"),
                None => {}
            }
            match pitch {
                Some(Ok(pitch)) => view.pitch = Some(pitch),
                Some(Err(err)) => debug!(proposal_id = %id, "pitch not readable yet: {err}"),
                None => {}
            }

            view.proposal = Some(proposal);
        }
        Err(err) => {
            warn!(proposal_id = %id, "error loading proposal: {err}");
            errors.push(err.to_string());
        }
    }

    match quotations {
        Ok(quotations) => view.quotations = quotations,
        Err(err) => {
            warn!(proposal_id = %id, "error loading quotations: {err}");
            errors.push(err.to_string());
        }
    }

    if errors.len() < 2 {
        view.refreshed_at = Some(Utc::now());
    }
    view.last_error = (!errors.is_empty()).then(|| errors.join("; "));

    change
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchOutcome {
    Terminal(ProposalStatus),
    Cancelled,
    Aborted,
}

pub struct ProposalWatcher<S: ?Sized> {
    source: Arc<S>,
    interval: Duration,
    sink: Option<Arc<dyn EventSink>>,
}

impl<S> ProposalWatcher<S>
where
    S: ProposalSource + ?Sized + 'static,
{
    pub fn new(source: Arc<S>, interval: Duration) -> Self {
        Self {
            source,
            interval,
            sink: None,
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Starts polling immediately. The task stops on a terminal status, on
    /// [`WatchHandle::cancel`], or when the handle is dropped.
    pub fn spawn(&self, id: EntityId) -> WatchHandle {
        let (updates_tx, updates_rx) = watch::channel(ProposalView::default());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(run(
            Arc::clone(&self.source),
            id,
            self.interval,
            self.sink.clone(),
            updates_tx,
            shutdown_rx,
        ));

        WatchHandle {
            updates: updates_rx,
            shutdown: shutdown_tx,
            task: Some(task),
        }
    }
}

async fn run<S>(
    source: Arc<S>,
    id: EntityId,
    interval: Duration,
    sink: Option<Arc<dyn EventSink>>,
    updates: watch::Sender<ProposalView>,
    mut shutdown: watch::Receiver<bool>,
) -> WatchOutcome
where
    S: ProposalSource + ?Sized,
{
    let mut ticker = tokio::time::interval(interval);
    // a tick that falls due while a fetch is outstanding is dropped
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut view = ProposalView::default();

    info!(proposal_id = %id, ?interval, "watching proposal");

    loop {
        tokio::select! {
            biased;
            _ = shutdown.changed() => return WatchOutcome::Cancelled,
            _ = ticker.tick() => {}
        }

        let change = tokio::select! {
            biased;
            _ = shutdown.changed() => return WatchOutcome::Cancelled,
            change = refresh(source.as_ref(), &id, &mut view) => change,
        };

        if let Some(event) = change {
            info!(
                proposal_id = %id,
                from = %event.previous,
                to = %event.current,
                progress = event.progress,
                "proposal status changed"
            );
            if let Some(sink) = &sink {
                if let Err(err) = sink.publish(&event).await {
                    warn!(proposal_id = %id, "failed to publish status change: {err:#}");
                }
            }
        }

        updates.send_replace(view.clone());

        if let Some(status) = view.status().filter(|status| status.is_terminal()) {
            info!(proposal_id = %id, %status, "proposal reached a terminal status");
            return WatchOutcome::Terminal(status.clone());
        }
    }
}

pub struct WatchHandle {
    updates: watch::Receiver<ProposalView>,
    shutdown: watch::Sender<bool>,
    task: Option<JoinHandle<WatchOutcome>>,
}

impl WatchHandle {
    pub fn subscribe(&self) -> watch::Receiver<ProposalView> {
        self.updates.clone()
    }

    pub fn latest(&self) -> ProposalView {
        self.updates.borrow().clone()
    }

    pub async fn cancel(mut self) -> WatchOutcome {
        let _ = self.shutdown.send(true);
        self.join().await
    }

    /// Waits for the task to stop on its own.
    pub async fn finished(mut self) -> WatchOutcome {
        self.join().await
    }

    async fn join(&mut self) -> WatchOutcome {
        match self.task.take() {
            Some(task) => task.await.unwrap_or(WatchOutcome::Aborted),
            None => WatchOutcome::Aborted,
        }
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

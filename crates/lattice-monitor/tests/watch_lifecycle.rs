use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use lattice_core::{
    ChangeKind, ClientResearch, Covenant, CovenantStatus, Document, DocumentStatus, EntityId,
    Loan, Pitch, Proposal, ProposalStatus, ProposalStatusChanged, Quotation, RiskTier,
};
use lattice_monitor::{
    CovenantBoard, FollowUp, ProposalView, ProposalWatcher, WatchOutcome, await_processing,
    refresh,
};
use lattice_platform::{ApiError, ApiResult, CovenantSource, DocumentSource, EventSink, ProposalSource};
use reqwest::StatusCode;
use serde_json::json;

const POLL: Duration = Duration::from_secs(5);

#[derive(Clone)]
enum Step {
    At {
        status: ProposalStatus,
        research: bool,
        pitch: bool,
    },
    Down,
}

fn at(status: ProposalStatus) -> Step {
    let rank = status.rank().unwrap_or(0);
    Step::At {
        research: rank >= ProposalStatus::PitchGenerated.rank().unwrap_or(0),
        pitch: rank >= ProposalStatus::PitchGenerated.rank().unwrap_or(0),
        status,
    }
}

fn unavailable() -> ApiError {
    ApiError::Status {
        status: StatusCode::SERVICE_UNAVAILABLE,
        detail: "backend restarting".to_string(),
    }
}

/// Replays one step per proposal fetch; the last step repeats.
struct Scripted {
    steps: Vec<Step>,
    proposal_calls: AtomicUsize,
    research_calls: AtomicUsize,
    pitch_calls: AtomicUsize,
}

impl Scripted {
    fn new(steps: Vec<Step>) -> Self {
        Self {
            steps,
            proposal_calls: AtomicUsize::new(0),
            research_calls: AtomicUsize::new(0),
            pitch_calls: AtomicUsize::new(0),
        }
    }

    fn proposal_calls(&self) -> usize {
        self.proposal_calls.load(Ordering::SeqCst)
    }

    fn current(&self) -> Step {
        // quotations are read alongside the proposal of the same tick
        let index = self.proposal_calls().saturating_sub(1);
        self.steps[index.min(self.steps.len() - 1)].clone()
    }
}

#[async_trait]
impl ProposalSource for Scripted {
    async fn proposal(&self, id: &EntityId) -> ApiResult<Proposal> {
        let index = self.proposal_calls.fetch_add(1, Ordering::SeqCst);
        match &self.steps[index.min(self.steps.len() - 1)] {
            Step::At {
                status,
                research,
                pitch,
            } => Ok(serde_json::from_value(json!({
                "id": id,
                "client_name": "Atlas Shipping",
                "client_industry": "Shipping",
                "client_country": "Greece",
                "requested_amount": 75000000.0,
                "currency": "USD",
                "loan_purpose": "Vessel acquisition",
                "desired_term_months": 60,
                "status": status,
                "research_completed": research,
                "pitch_generated": pitch,
                "created_at": "2025-06-02T10:15:00"
            }))
            .unwrap()),
            Step::Down => Err(unavailable()),
        }
    }

    async fn quotations(&self, proposal_id: &EntityId) -> ApiResult<Vec<Quotation>> {
        tokio::task::yield_now().await;
        match self.current() {
            Step::Down => Err(unavailable()),
            Step::At { .. } => Ok(vec![
                serde_json::from_value(json!({
                    "id": 70,
                    "loan_proposal_id": proposal_id,
                    "bank_id": 3,
                    "bank_name": "Piraeus",
                    "status": "sent"
                }))
                .unwrap(),
            ]),
        }
    }

    async fn research(&self, proposal_id: &EntityId) -> ApiResult<ClientResearch> {
        self.research_calls.fetch_add(1, Ordering::SeqCst);
        Ok(serde_json::from_value(json!({
            "id": 1,
            "loan_proposal_id": proposal_id,
            "company_description": "Dry bulk operator",
            "credit_rating": "BB+"
        }))
        .unwrap())
    }

    async fn pitch(&self, proposal_id: &EntityId) -> ApiResult<Pitch> {
        self.pitch_calls.fetch_add(1, Ordering::SeqCst);
        Ok(serde_json::from_value(json!({
            "id": 2,
            "loan_proposal_id": proposal_id,
            "title": "Atlas Shipping fleet facility"
        }))
        .unwrap())
    }
}

#[derive(Default)]
struct RecordingSink {
    events: Mutex<Vec<ProposalStatusChanged>>,
}

#[async_trait]
impl EventSink for RecordingSink {
    async fn publish(&self, event: &ProposalStatusChanged) -> anyhow::Result<()> {
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}

#[tokio::test]
async fn failed_tick_keeps_the_previous_snapshot() {
    let source = Scripted::new(vec![at(ProposalStatus::CollectingQuotes), Step::Down]);
    let id = EntityId::from(12);
    let mut view = ProposalView::default();

    refresh(&source, &id, &mut view).await;
    let first_refresh = view.refreshed_at;
    assert_eq!(view.status(), Some(&ProposalStatus::CollectingQuotes));
    assert_eq!(view.quotations.len(), 1);
    assert!(view.last_error.is_none());

    let change = refresh(&source, &id, &mut view).await;
    assert!(change.is_none());
    assert_eq!(view.ticks, 2);
    assert_eq!(view.status(), Some(&ProposalStatus::CollectingQuotes));
    assert_eq!(view.quotations.len(), 1);
    assert!(view.pitch.is_some());
    assert_eq!(view.refreshed_at, first_refresh);
    assert!(view.last_error.as_deref().unwrap().contains("backend restarting"));
}

#[tokio::test]
async fn research_and_pitch_are_read_only_once_flagged() {
    let source = Scripted::new(vec![
        at(ProposalStatus::Draft),
        Step::At {
            status: ProposalStatus::ResearchInProgress,
            research: true,
            pitch: false,
        },
    ]);
    let id = EntityId::from(12);
    let mut view = ProposalView::default();

    refresh(&source, &id, &mut view).await;
    assert_eq!(source.research_calls.load(Ordering::SeqCst), 0);
    assert!(view.research.is_none());
    assert!(view.actions().unwrap().trigger_research);

    let change = refresh(&source, &id, &mut view).await.unwrap();
    assert_eq!(change.kind, ChangeKind::Advanced);
    assert_eq!(change.skipped_stages, 0);
    assert_eq!(source.research_calls.load(Ordering::SeqCst), 1);
    assert_eq!(source.pitch_calls.load(Ordering::SeqCst), 0);
    assert_eq!(
        view.research.as_ref().and_then(|research| research.credit_rating.as_deref()),
        Some("BB+")
    );

    let actions = view.actions().unwrap();
    assert!(actions.generate_pitch);
    assert!(!actions.send_to_banks);
    assert_eq!(view.progress(), 30);
}

#[tokio::test]
async fn inconsistent_flags_are_logged_and_kept() {
    let source = Scripted::new(vec![
        at(ProposalStatus::Draft),
        Step::At {
            status: ProposalStatus::SentToBanks,
            research: true,
            pitch: false,
        },
        Step::At {
            status: ProposalStatus::PitchGenerated,
            research: false,
            pitch: true,
        },
    ]);
    let id = EntityId::from(12);
    let mut view = ProposalView::default();

    refresh(&source, &id, &mut view).await;
    let change = refresh(&source, &id, &mut view).await.unwrap();
    assert_eq!(change.current, ProposalStatus::SentToBanks);
    assert_eq!(view.status(), Some(&ProposalStatus::SentToBanks));
    assert!(!view.proposal.as_ref().unwrap().pitch_generated);
    assert!(view.pitch.is_none());
    assert!(view.last_error.is_none());

    refresh(&source, &id, &mut view).await;
    assert_eq!(view.status(), Some(&ProposalStatus::PitchGenerated));
    assert!(view.proposal.as_ref().unwrap().pitch_generated);
    assert_eq!(source.pitch_calls.load(Ordering::SeqCst), 1);
    assert_eq!(view.ticks, 3);
}

#[tokio::test(start_paused = true)]
async fn polling_stops_once_approved() {
    let source = Arc::new(Scripted::new(vec![
        at(ProposalStatus::SentToBanks),
        at(ProposalStatus::CollectingQuotes),
        at(ProposalStatus::OptimizationComplete),
        at(ProposalStatus::Approved),
    ]));
    let handle = ProposalWatcher::new(Arc::clone(&source), POLL).spawn(EntityId::from(12));
    let updates = handle.subscribe();

    let outcome = handle.finished().await;
    assert_eq!(outcome, WatchOutcome::Terminal(ProposalStatus::Approved));
    assert_eq!(source.proposal_calls(), 4);
    assert_eq!(updates.borrow().progress(), 100);

    tokio::time::sleep(POLL * 10).await;
    assert_eq!(source.proposal_calls(), 4);
}

#[tokio::test(start_paused = true)]
async fn rejected_is_terminal_too() {
    let source = Arc::new(Scripted::new(vec![
        at(ProposalStatus::CollectingQuotes),
        at(ProposalStatus::Rejected),
    ]));
    let handle = ProposalWatcher::new(Arc::clone(&source), POLL).spawn(EntityId::from(12));

    assert_eq!(
        handle.finished().await,
        WatchOutcome::Terminal(ProposalStatus::Rejected)
    );
    assert_eq!(source.proposal_calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn nothing_is_fetched_after_cancel() {
    let source = Arc::new(Scripted::new(vec![at(ProposalStatus::CollectingQuotes)]));
    let handle = ProposalWatcher::new(Arc::clone(&source), POLL).spawn(EntityId::from(12));
    let mut updates = handle.subscribe();

    updates.changed().await.unwrap();
    updates.changed().await.unwrap();
    assert_eq!(updates.borrow().ticks, 2);

    assert_eq!(handle.cancel().await, WatchOutcome::Cancelled);
    let calls = source.proposal_calls();

    tokio::time::sleep(POLL * 10).await;
    assert_eq!(source.proposal_calls(), calls);
}

#[tokio::test(start_paused = true)]
async fn dropping_the_handle_stops_polling() {
    let source = Arc::new(Scripted::new(vec![at(ProposalStatus::Draft)]));
    let handle = ProposalWatcher::new(Arc::clone(&source), POLL).spawn(EntityId::from(12));
    let mut updates = handle.subscribe();
    updates.changed().await.unwrap();

    drop(handle);
    tokio::task::yield_now().await;
    let calls = source.proposal_calls();

    tokio::time::sleep(POLL * 10).await;
    assert_eq!(source.proposal_calls(), calls);
}

#[tokio::test(start_paused = true)]
async fn status_changes_reach_the_sink() {
    let source = Arc::new(Scripted::new(vec![
        at(ProposalStatus::Draft),
        at(ProposalStatus::Draft),
        at(ProposalStatus::PitchGenerated),
        Step::Down,
        at(ProposalStatus::Approved),
    ]));
    let sink = Arc::new(RecordingSink::default());
    let handle = ProposalWatcher::new(Arc::clone(&source), POLL)
        .with_sink(sink.clone())
        .spawn(EntityId::from(12));

    assert_eq!(
        handle.finished().await,
        WatchOutcome::Terminal(ProposalStatus::Approved)
    );

    let events = sink.events.lock().unwrap().clone();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].previous, ProposalStatus::Draft);
    assert_eq!(events[0].current, ProposalStatus::PitchGenerated);
    assert_eq!(events[0].kind, ChangeKind::Advanced);
    assert_eq!(events[0].skipped_stages, 1);
    assert_eq!(events[1].previous, ProposalStatus::PitchGenerated);
    assert_eq!(events[1].skipped_stages, 3);
    assert_eq!(events[1].progress, 100);
}

struct Portfolio {
    covenants: Vec<Covenant>,
    loan_calls: Mutex<BTreeMap<String, usize>>,
}

fn covenant(id: i64, loan: i64, status: &str, probability: f64) -> Covenant {
    serde_json::from_value(json!({
        "id": id,
        "loan_id": loan,
        "covenant_type": "financial",
        "covenant_name": format!("Covenant {id}"),
        "status": status,
        "breach_probability_30d": probability
    }))
    .unwrap()
}

#[async_trait]
impl CovenantSource for Portfolio {
    async fn covenants(&self, status: Option<CovenantStatus>) -> ApiResult<Vec<Covenant>> {
        Ok(self
            .covenants
            .iter()
            .filter(|covenant| status.is_none_or(|status| covenant.status == status))
            .cloned()
            .collect())
    }

    async fn loan(&self, id: &EntityId) -> ApiResult<Loan> {
        *self
            .loan_calls
            .lock()
            .unwrap()
            .entry(id.to_string())
            .or_default() += 1;
        if id.as_str() == "9" {
            return Err(ApiError::Status {
                status: StatusCode::NOT_FOUND,
                detail: "Loan not found".to_string(),
            });
        }
        Ok(serde_json::from_value(json!({
            "id": id,
            "document_id": 1,
            "borrower_name": format!("Borrower {id}"),
            "currency": "USD"
        }))
        .unwrap())
    }
}

#[tokio::test]
async fn covenant_board_reads_each_loan_once() {
    let portfolio = Portfolio {
        covenants: vec![
            covenant(1, 5, "compliant", 0.1),
            covenant(2, 5, "warning", 0.55),
            covenant(3, 7, "breach", 0.82),
            covenant(4, 5, "compliant", 0.2),
            covenant(5, 9, "warning", 0.7),
        ],
        loan_calls: Mutex::new(BTreeMap::new()),
    };

    let board = CovenantBoard::load(&portfolio, None).await.unwrap();
    let calls = portfolio.loan_calls.lock().unwrap().clone();
    assert_eq!(calls.len(), 3);
    assert!(calls.values().all(|count| *count == 1));
    assert_eq!(board.loans.len(), 2);

    let stats = board.stats();
    assert_eq!(stats.total, 5);
    assert_eq!(stats.warning, 2);
    assert_eq!(stats.breach, 1);
    assert_eq!(stats.high_risk, 1);

    let rows = board.rows();
    assert_eq!(rows[0].borrower, Some("Borrower 5"));
    assert_eq!(rows[4].borrower, None);
    assert_eq!(rows[4].tier, RiskTier::Medium);

    let alerts = board.alerts();
    assert_eq!(alerts.len(), 3);
    assert_eq!(alerts[0].tier, RiskTier::High);
}

#[tokio::test]
async fn filtered_board_only_loads_matching_loans() {
    let portfolio = Portfolio {
        covenants: vec![covenant(1, 5, "compliant", 0.1), covenant(3, 7, "breach", 0.82)],
        loan_calls: Mutex::new(BTreeMap::new()),
    };

    let board = CovenantBoard::load(&portfolio, Some(CovenantStatus::Breach))
        .await
        .unwrap();
    assert_eq!(board.covenants.len(), 1);
    let calls = portfolio.loan_calls.lock().unwrap().clone();
    assert_eq!(calls.keys().collect::<Vec<_>>(), ["7"]);
}

struct Extraction {
    states: Vec<&'static str>,
    calls: AtomicUsize,
}

#[async_trait]
impl DocumentSource for Extraction {
    async fn document(&self, id: &EntityId) -> ApiResult<Document> {
        let index = self.calls.fetch_add(1, Ordering::SeqCst);
        let status = self.states[index.min(self.states.len() - 1)];
        Ok(serde_json::from_value(json!({
            "id": id,
            "filename": "facility.pdf",
            "status": status
        }))
        .unwrap())
    }
}

#[tokio::test(start_paused = true)]
async fn single_follow_up_reports_whatever_it_sees() {
    let source = Extraction {
        states: vec!["processing", "completed"],
        calls: AtomicUsize::new(0),
    };

    let started = tokio::time::Instant::now();
    let document = await_processing(&source, &EntityId::from(9), FollowUp::default())
        .await
        .unwrap();
    assert_eq!(document.status, DocumentStatus::Processing);
    assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    assert!(started.elapsed() >= Duration::from_secs(3));
}

#[tokio::test(start_paused = true)]
async fn follow_up_stops_when_extraction_settles() {
    let source = Extraction {
        states: vec!["uploaded", "processing", "failed", "completed"],
        calls: AtomicUsize::new(0),
    };
    let follow_up = FollowUp {
        delay: Duration::from_secs(2),
        attempts: 10,
    };

    let document = await_processing(&source, &EntityId::from(9), follow_up)
        .await
        .unwrap();
    assert_eq!(document.status, DocumentStatus::Failed);
    assert_eq!(source.calls.load(Ordering::SeqCst), 3);
}

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use lattice_core::stats::{DashboardSummary, ProposalStats, QuotationStats, filter_proposals};
use lattice_core::validation::{ADVISORY_UPLOAD_LIMIT_BYTES, content_type_for};
use lattice_core::{CovenantStatus, EntityId, ProposalForm, ProposalStatus};
use lattice_monitor::{
    CovenantBoard, FollowUp, ProposalView, ProposalWatcher, ProposalWorkflow, WatchOutcome,
    await_processing, compare, refresh,
};
use lattice_platform::{BankFilter, ClientConfig, EventSink, LatticeClient, RedisBus};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "lattice")]
#[command(about = "Loan syndication workflow monitor")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Overrides LATTICE_API_URL
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Poll interval in seconds, overrides LATTICE_POLL_INTERVAL_SECS
    #[arg(long, global = true, value_parser = clap::value_parser!(u64).range(1..))]
    interval: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Portfolio overview of documents, loans and covenants at risk
    Dashboard,

    /// List proposals with dashboard totals
    Proposals {
        /// Only proposals in this status
        #[arg(short, long)]
        status: Option<ProposalStatus>,
    },

    /// Validate and submit a new proposal
    Create {
        #[arg(long)]
        client_name: String,
        #[arg(long)]
        industry: String,
        #[arg(long)]
        country: String,
        #[arg(long, default_value = "")]
        website: String,
        /// Amount, commas allowed
        #[arg(long)]
        amount: String,
        #[arg(long, default_value = "USD")]
        currency: String,
        #[arg(long)]
        purpose: String,
        #[arg(long, default_value = "60")]
        term_months: String,
        /// Maximum acceptable rate in percent
        #[arg(long, default_value = "")]
        max_rate: String,
    },

    /// Fetch one snapshot of a proposal and the actions it allows
    Show { id: EntityId },

    /// Poll a proposal until it is approved, rejected or interrupted
    Watch { id: EntityId },

    /// Start client research
    Research { id: EntityId },

    /// Generate the pitch once research is complete
    Pitch { id: EntityId },

    /// Request quotations from the given banks
    SendToBanks {
        id: EntityId,
        #[arg(short, long = "bank", required = true)]
        banks: Vec<EntityId>,
    },

    /// Rank the quotations banks have answered
    Compare { id: EntityId },

    /// List active banks
    Banks {
        #[arg(long)]
        country: Option<String>,
    },

    /// Covenant monitoring board
    Covenants {
        #[arg(short, long)]
        status: Option<CovenantFilter>,
        /// Only warning and breach covenants
        #[arg(long)]
        alerts: bool,
    },

    /// Upload a credit agreement PDF and re-check its processing state
    Upload {
        file: PathBuf,
        /// Number of follow-up checks
        #[arg(long, default_value = "1")]
        checks: u32,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum CovenantFilter {
    Compliant,
    Warning,
    Breach,
}

impl From<CovenantFilter> for CovenantStatus {
    fn from(filter: CovenantFilter) -> Self {
        match filter {
            CovenantFilter::Compliant => CovenantStatus::Compliant,
            CovenantFilter::Warning => CovenantStatus::Warning,
            CovenantFilter::Breach => CovenantStatus::Breach,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "lattice_monitor=info,lattice_platform=info".to_string()),
        )
        .init();

    let cli = Cli::parse();
    let mut config = ClientConfig::from_env()?;
    if let Some(api_url) = cli.api_url {
        config.api_url = api_url.trim_end_matches('/').to_string();
    }
    if let Some(secs) = cli.interval {
        config.poll_interval = Duration::from_secs(secs);
    }
    let client = LatticeClient::new(&config).context("failed to build api client")?;

    match cli.command {
        Commands::Dashboard => dashboard(&client).await,
        Commands::Proposals { status } => list_proposals(&client, status).await,
        Commands::Create {
            client_name,
            industry,
            country,
            website,
            amount,
            currency,
            purpose,
            term_months,
            max_rate,
        } => {
            let form = ProposalForm {
                client_name,
                client_industry: industry,
                client_country: country,
                client_website: website,
                requested_amount: amount,
                currency,
                loan_purpose: purpose,
                desired_term_months: term_months,
                max_acceptable_rate: max_rate,
            };
            let request = form.validate()?;
            let proposal = client
                .create_proposal(&request)
                .await
                .map_err(|err| anyhow::anyhow!(err.user_message()))?;
            info!(proposal_id = %proposal.id, "proposal created");
            println!("{} {} ({}%)", proposal.id, proposal.status.label(), proposal.progress());
            Ok(())
        }
        Commands::Show { id } => {
            let view = snapshot(&client, &id).await?;
            print_view(&view);
            Ok(())
        }
        Commands::Watch { id } => watch(&config, client, id).await,
        Commands::Research { id } => {
            let view = snapshot(&client, &id).await?;
            let proposal = loaded(&view)?;
            let response = ProposalWorkflow::new(&client)
                .trigger_research(proposal, &view.quotations)
                .await
                .map_err(|err| anyhow::anyhow!(err.user_message()))?;
            println!("{}", response.message);
            Ok(())
        }
        Commands::Pitch { id } => {
            let view = snapshot(&client, &id).await?;
            let proposal = loaded(&view)?;
            let response = ProposalWorkflow::new(&client)
                .generate_pitch(proposal, &view.quotations)
                .await
                .map_err(|err| anyhow::anyhow!(err.user_message()))?;
            println!("{}", response.message);
            Ok(())
        }
        Commands::SendToBanks { id, banks } => {
            let view = snapshot(&client, &id).await?;
            let proposal = loaded(&view)?;
            let batch = ProposalWorkflow::new(&client)
                .send_to_banks(proposal, &view.quotations, banks)
                .await
                .map_err(|err| anyhow::anyhow!(err.user_message()))?;
            println!("{}", batch.message);
            for bank in &batch.banks {
                println!("  {} {}", bank.id, bank.name);
            }
            Ok(())
        }
        Commands::Compare { id } => {
            let view = snapshot(&client, &id).await?;
            let proposal = loaded(&view)?;
            let ranked = compare(proposal, &view.quotations)
                .map_err(|err| anyhow::anyhow!(err.user_message()))?;
            for (position, quote) in ranked.iter().enumerate() {
                println!(
                    "{}. {} rate={} amount={} term={}",
                    position + 1,
                    quote.bank_name.as_deref().unwrap_or("unknown bank"),
                    display_or_dash(quote.offered_interest_rate),
                    display_or_dash(quote.offered_amount),
                    display_or_dash(quote.offered_term_months),
                );
            }
            Ok(())
        }
        Commands::Banks { country } => {
            let filter = BankFilter {
                country,
                is_active: Some(true),
                ..BankFilter::default()
            };
            let banks = client
                .list_banks(&filter)
                .await
                .map_err(|err| anyhow::anyhow!(err.user_message()))?;
            for bank in banks {
                println!(
                    "{} {} [{}] {}",
                    bank.id,
                    bank.name,
                    bank.credit_rating.as_deref().unwrap_or("-"),
                    bank.headquarters_country.as_deref().unwrap_or("-"),
                );
            }
            Ok(())
        }
        Commands::Covenants { status, alerts } => {
            let board = CovenantBoard::load(&client, status.map(CovenantStatus::from))
                .await
                .map_err(|err| anyhow::anyhow!(err.user_message()))?;
            let stats = board.stats();
            println!(
                "total={} compliant={} warning={} breach={} high_risk={}",
                stats.total, stats.compliant, stats.warning, stats.breach, stats.high_risk
            );
            let rows = if alerts { board.alerts() } else { board.rows() };
            for row in rows {
                println!(
                    "{} {} loan={} borrower={} status={:?} risk30d={} tier={}",
                    row.covenant.id,
                    row.covenant.covenant_name,
                    row.covenant.loan_id,
                    row.borrower.unwrap_or("-"),
                    row.covenant.status,
                    display_or_dash(row.covenant.breach_probability_30d),
                    row.tier.as_str(),
                );
            }
            Ok(())
        }
        Commands::Upload { file, checks } => upload(&client, file, checks).await,
    }
}

async fn dashboard(client: &LatticeClient) -> Result<()> {
    let (loans, documents, at_risk) = tokio::join!(
        client.list_loans(),
        client.list_documents(),
        client.at_risk_covenants(),
    );
    let loans = loans.map_err(|err| anyhow::anyhow!(err.user_message()))?;
    let documents = documents.map_err(|err| anyhow::anyhow!(err.user_message()))?;
    let at_risk = at_risk.map_err(|err| anyhow::anyhow!(err.user_message()))?;

    let summary = DashboardSummary::from_parts(&loans, &documents, &at_risk);
    println!(
        "documents={} (completed={} failed={}) loans={} value={} at_risk={} (breach={})",
        summary.documents,
        summary.documents_completed,
        summary.documents_failed,
        summary.loans,
        summary.total_loan_value,
        summary.at_risk_covenants,
        summary.breached_covenants,
    );
    for loan in &loans {
        println!(
            "loan {} {} {} {}",
            loan.id,
            loan.borrower_name.as_deref().unwrap_or("-"),
            display_or_dash(loan.loan_amount),
            loan.currency,
        );
    }
    for document in &documents {
        println!("document {} {} {:?}", document.id, document.filename, document.status);
    }
    Ok(())
}

async fn list_proposals(client: &LatticeClient, status: Option<ProposalStatus>) -> Result<()> {
    // fetch everything so the totals do not depend on the filter
    let proposals = client
        .list_proposals(None)
        .await
        .map_err(|err| anyhow::anyhow!(err.user_message()))?;
    let stats = ProposalStats::from_proposals(&proposals);
    println!(
        "total={} active={} approved={} requested={}",
        stats.total, stats.active, stats.approved, stats.total_requested
    );
    for proposal in filter_proposals(&proposals, status.as_ref()) {
        println!(
            "{} {} {} {} {} ({}%)",
            proposal.id,
            proposal.client_name,
            proposal.requested_amount,
            proposal.currency,
            proposal.status.label(),
            proposal.progress(),
        );
    }
    Ok(())
}

async fn snapshot(client: &LatticeClient, id: &EntityId) -> Result<ProposalView> {
    let mut view = ProposalView::default();
    refresh(client, id, &mut view).await;
    if view.proposal.is_none() {
        anyhow::bail!(
            "failed to load proposal {id}: {}",
            view.last_error.as_deref().unwrap_or("unknown error")
        );
    }
    Ok(view)
}

fn loaded(view: &ProposalView) -> Result<&lattice_core::Proposal> {
    view.proposal.as_ref().context("proposal not loaded")
}

async fn watch(config: &ClientConfig, client: LatticeClient, id: EntityId) -> Result<()> {
    let mut watcher = ProposalWatcher::new(Arc::new(client), config.poll_interval);
    if let Some(redis_url) = &config.redis_url {
        let bus = RedisBus::connect(redis_url, &config.events_channel)?;
        info!(channel = bus.channel(), "publishing status changes");
        let sink: Arc<dyn EventSink> = Arc::new(bus);
        watcher = watcher.with_sink(sink);
    }

    let handle = watcher.spawn(id);
    let mut updates = handle.subscribe();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let interrupted = loop {
        tokio::select! {
            _ = &mut ctrl_c => break true,
            changed = updates.changed() => {
                if changed.is_err() {
                    break false;
                }
                print_view(&updates.borrow_and_update());
            }
        }
    };

    let outcome = if interrupted {
        handle.cancel().await
    } else {
        handle.finished().await
    };
    match outcome {
        WatchOutcome::Terminal(status) => println!("finished: {}", status.label()),
        WatchOutcome::Cancelled => println!("stopped"),
        WatchOutcome::Aborted => warn!("watch task ended unexpectedly"),
    }
    Ok(())
}

async fn upload(client: &LatticeClient, file: PathBuf, checks: u32) -> Result<()> {
    let file_name = file
        .file_name()
        .and_then(|name| name.to_str())
        .context("upload path has no file name")?
        .to_string();
    let content_type = content_type_for(&file_name).unwrap_or("application/octet-stream");

    let bytes = tokio::fs::read(&file)
        .await
        .with_context(|| format!("failed to read {}", file.display()))?;
    if bytes.len() as u64 > ADVISORY_UPLOAD_LIMIT_BYTES {
        warn!(size = bytes.len(), "file is larger than the advised upload limit");
    }

    let document = client
        .upload_document(&file_name, content_type, bytes)
        .await
        .map_err(|err| anyhow::anyhow!(err.user_message()))?;
    println!("uploaded {} as {}", document.filename, document.id);

    let follow_up = FollowUp {
        attempts: checks.max(1),
        ..FollowUp::default()
    };
    let document = await_processing(client, &document.id, follow_up)
        .await
        .map_err(|err| anyhow::anyhow!(err.user_message()))?;
    match document.error_message {
        Some(message) => println!("status {:?}: {message}", document.status),
        None => println!("status {:?}", document.status),
    }
    Ok(())
}

fn print_view(view: &ProposalView) {
    let Some(proposal) = &view.proposal else {
        if let Some(err) = &view.last_error {
            println!("not loaded yet: {err}");
        }
        return;
    };

    println!(
        "[{}] {} {} ({}%) research={} pitch={}",
        view.ticks,
        proposal.client_name,
        proposal.status.label(),
        view.progress(),
        proposal.research_completed,
        proposal.pitch_generated,
    );
    if proposal.status.is_opaque() {
        println!("  status is outside the syndication path; progress is not tracked");
    }

    let quotes = QuotationStats::from_quotations(&view.quotations);
    if quotes.total > 0 {
        println!(
            "  quotations: {} total, {} responded, {} awaiting",
            quotes.total, quotes.responded, quotes.awaiting
        );
    }
    if let Some(actions) = view.actions() {
        println!(
            "  actions: research={} pitch={} send={} compare={}",
            actions.trigger_research,
            actions.generate_pitch,
            actions.send_to_banks,
            actions.compare_and_optimize
        );
    }
    if let Some(err) = &view.last_error {
        println!("  last refresh failed: {err}");
    }
}

fn display_or_dash<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map_or_else(|| "-".to_string(), |value| value.to_string())
}

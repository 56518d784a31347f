#![cfg_attr(test, allow(clippy::expect_used))]

mod commands;
mod config;
mod render;

use std::io::Write as _;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use fraud_review_client::{
    DEFAULT_QUEUE_PAGE_SIZE, DEFAULT_TOP_MERCHANTS_LIMIT, QueuePage, ReviewActionKind,
    ReviewActionRequest, ReviewApiClient,
};
use fraud_review_core::{
    ActionDraft, ReviewController, ReviewControllerConfig, ReviewHandle, ReviewView,
    load_monitoring,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};

use crate::commands::{HELP, WatchCommand};
use crate::config::{ConfigOverrides, WorkstationConfig};

#[derive(Parser, Debug)]
#[command(name = "review-workstation", about = "Fraud review workstation")]
struct Cli {
    /// Backend base URL. Defaults to `FRAUD_REVIEW_API_BASE_URL` or the local API.
    #[arg(long, global = true)]
    base_url: Option<String>,
    /// Per-request timeout in milliseconds.
    #[arg(long, global = true)]
    timeout_ms: Option<u64>,
    /// Analyst name recorded on actions.
    #[arg(long, global = true)]
    analyst: Option<String>,
    /// Queue refresh period while the review view is active.
    #[arg(long, global = true)]
    poll_interval_ms: Option<u64>,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Interactive view that keeps the queue in sync (default).
    Watch {
        #[arg(long, value_enum, default_value_t = ViewArg::Review)]
        view: ViewArg,
    },
    /// Print one page of the review queue.
    Queue {
        #[arg(long, default_value_t = DEFAULT_QUEUE_PAGE_SIZE)]
        limit: u32,
        #[arg(long, default_value_t = 0)]
        offset: u32,
    },
    /// Print a case with its assessment and review history.
    Case { transaction_id: String },
    /// Print monitoring aggregates.
    Monitoring {
        #[arg(long, default_value_t = DEFAULT_TOP_MERCHANTS_LIMIT)]
        merchants: u32,
    },
    /// Record a single analyst action.
    Act {
        transaction_id: String,
        #[arg(value_enum)]
        action: ActionArg,
        #[arg(long)]
        notes: Option<String>,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ViewArg {
    Review,
    Monitoring,
}

impl From<ViewArg> for ReviewView {
    fn from(view: ViewArg) -> Self {
        match view {
            ViewArg::Review => Self::Review,
            ViewArg::Monitoring => Self::Monitoring,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ActionArg {
    Approve,
    Reject,
}

impl From<ActionArg> for ReviewActionKind {
    fn from(action: ActionArg) -> Self {
        match action {
            ActionArg::Approve => Self::Approve,
            ActionArg::Reject => Self::Reject,
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = WorkstationConfig::resolve(&ConfigOverrides {
        base_url: cli.base_url,
        timeout_ms: cli.timeout_ms,
        analyst: cli.analyst,
        poll_interval_ms: cli.poll_interval_ms,
    });
    info!(
        base_url = %config.base_url,
        source = %config.base_url_source,
        timeout_ms = config.timeout_ms,
        "review backend configured"
    );
    let client =
        ReviewApiClient::new(config.client_config()).context("configure review backend client")?;

    match cli.command.unwrap_or(Command::Watch {
        view: ViewArg::Review,
    }) {
        Command::Watch { view } => watch(client, &config, view.into()).await,
        Command::Queue { limit, offset } => {
            let entries = client
                .review_queue(QueuePage { limit, offset })
                .await
                .context("load review queue")?;
            emit(&render::render_queue(&entries, None))
        }
        Command::Case { transaction_id } => {
            let detail = client
                .review_case(&transaction_id)
                .await
                .with_context(|| format!("load case {transaction_id}"))?;
            emit(&render::render_case(&detail))
        }
        Command::Monitoring { merchants } => {
            let snapshot = load_monitoring(&client, merchants)
                .await
                .context("load monitoring aggregates")?;
            emit(&render::render_monitoring(&snapshot))
        }
        Command::Act {
            transaction_id,
            action,
            notes,
        } => {
            if transaction_id.trim().is_empty() {
                bail!("transaction id must not be empty");
            }
            let request =
                ReviewActionRequest::new(action.into(), &config.analyst, notes.as_deref());
            let receipt = client
                .record_review_action(transaction_id.trim(), &request)
                .await
                .with_context(|| {
                    format!("record {} on {transaction_id}", request.action.as_str())
                })?;
            emit(&render::render_receipt(&receipt))
        }
    }
}

async fn watch(
    client: ReviewApiClient,
    config: &WorkstationConfig,
    view: ReviewView,
) -> Result<()> {
    let (controller, handle) = ReviewController::new(
        Arc::new(client),
        ReviewControllerConfig {
            poll_interval: config.poll_interval,
            initial_view: view,
            ..ReviewControllerConfig::default()
        },
    );
    let running = controller.spawn();
    let mut analyst = config.analyst.clone();
    let mut snapshots = handle.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut last_frame = String::new();

    emit(HELP)?;
    loop {
        tokio::select! {
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let frame = render::render_state(&snapshots.borrow_and_update(), &analyst);
                if frame != last_frame {
                    emit(&frame)?;
                    last_frame = frame;
                }
            }
            line = lines.next_line() => {
                let Some(line) = line.context("read command from stdin")? else {
                    break;
                };
                match WatchCommand::parse(&line) {
                    Ok(WatchCommand::Quit) => break,
                    Ok(WatchCommand::Help) => emit(HELP)?,
                    Ok(WatchCommand::Analyst(name)) => {
                        analyst = name;
                        last_frame = render::render_state(&handle.snapshot(), &analyst);
                        emit(&last_frame)?;
                    }
                    Ok(command) => forward(&handle, command, &analyst)?,
                    Err(error) => emit(&format!("{error}\n{HELP}"))?,
                }
            }
        }
    }

    if handle.shutdown().is_err() {
        debug!("review controller already stopped");
    }
    running.await.context("join review controller")?;
    Ok(())
}

fn forward(handle: &ReviewHandle, command: WatchCommand, analyst: &str) -> Result<()> {
    let sent = match command {
        WatchCommand::Select(transaction_id) => handle.select_case(transaction_id),
        WatchCommand::Act { action, notes } => {
            let mut draft = ActionDraft::for_selection(action, analyst);
            draft.notes = notes;
            handle.submit_action(draft)
        }
        WatchCommand::Review => handle.show_view(ReviewView::Review),
        WatchCommand::Monitoring => handle.show_view(ReviewView::Monitoring),
        WatchCommand::Refresh => match handle.snapshot().view {
            ReviewView::Review => handle.refresh_queue(),
            ReviewView::Monitoring => handle.refresh_monitoring(),
        },
        WatchCommand::Analyst(_) | WatchCommand::Help | WatchCommand::Quit => Ok(()),
    };
    sent.context("review controller stopped")
}

fn emit(text: &str) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    stdout
        .write_all(text.as_bytes())
        .and_then(|()| stdout.flush())
        .context("write to stdout")
}

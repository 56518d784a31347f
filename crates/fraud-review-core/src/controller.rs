use std::sync::Arc;
use std::time::Duration;

use fraud_review_client::{DEFAULT_TOP_MERCHANTS_LIMIT, QueuePage};
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info};

use crate::backend::{ReviewBackend, load_monitoring};
use crate::reducer::{ActionDraft, ReviewEffect, ReviewEvent, Transition, reduce};
use crate::scheduler::{QueueTimerTick, RefreshScheduler};
use crate::state::{ReviewState, ReviewView, SyncSettings};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewControllerConfig {
    pub poll_interval: Duration,
    pub queue_page: QueuePage,
    pub merchant_limit: u32,
    pub initial_view: ReviewView,
}

impl Default for ReviewControllerConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            queue_page: QueuePage::default(),
            merchant_limit: DEFAULT_TOP_MERCHANTS_LIMIT,
            initial_view: ReviewView::Review,
        }
    }
}

/// Commands the presentation layer sends to the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewCommand {
    RefreshQueue,
    SelectCase(String),
    SubmitAction(ActionDraft),
    ShowView(ReviewView),
    RefreshMonitoring,
    Shutdown,
}

impl ReviewCommand {
    fn into_event(self) -> Option<ReviewEvent> {
        match self {
            Self::RefreshQueue => Some(ReviewEvent::QueueRefreshRequested),
            Self::SelectCase(transaction_id) => Some(ReviewEvent::CaseSelected { transaction_id }),
            Self::SubmitAction(draft) => Some(ReviewEvent::ActionSubmitted(draft)),
            Self::ShowView(view) => Some(ReviewEvent::ViewChanged(view)),
            Self::RefreshMonitoring => Some(ReviewEvent::MonitoringRefreshRequested),
            Self::Shutdown => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("review_controller_closed")]
pub struct ControllerClosed;

enum Internal {
    Completed(ReviewEvent),
    Tick(QueueTimerTick),
}

impl From<QueueTimerTick> for Internal {
    fn from(tick: QueueTimerTick) -> Self {
        Self::Tick(tick)
    }
}

/// Cloneable front door to a running [`ReviewController`].
#[derive(Debug, Clone)]
pub struct ReviewHandle {
    commands: mpsc::UnboundedSender<ReviewCommand>,
    snapshots: watch::Receiver<ReviewState>,
}

impl ReviewHandle {
    pub fn send(&self, command: ReviewCommand) -> Result<(), ControllerClosed> {
        self.commands.send(command).map_err(|_| ControllerClosed)
    }

    pub fn refresh_queue(&self) -> Result<(), ControllerClosed> {
        self.send(ReviewCommand::RefreshQueue)
    }

    pub fn select_case(&self, transaction_id: impl Into<String>) -> Result<(), ControllerClosed> {
        self.send(ReviewCommand::SelectCase(transaction_id.into()))
    }

    pub fn submit_action(&self, draft: ActionDraft) -> Result<(), ControllerClosed> {
        self.send(ReviewCommand::SubmitAction(draft))
    }

    pub fn show_view(&self, view: ReviewView) -> Result<(), ControllerClosed> {
        self.send(ReviewCommand::ShowView(view))
    }

    pub fn refresh_monitoring(&self) -> Result<(), ControllerClosed> {
        self.send(ReviewCommand::RefreshMonitoring)
    }

    pub fn shutdown(&self) -> Result<(), ControllerClosed> {
        self.send(ReviewCommand::Shutdown)
    }

    /// Latest published state.
    #[must_use]
    pub fn snapshot(&self) -> ReviewState {
        self.snapshots.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ReviewState> {
        self.snapshots.clone()
    }
}

/// Owns the review state and runs every transition on one task.
///
/// Network calls run in spawned tasks and come back through an internal
/// mailbox, so state changes are applied strictly one message at a time. The
/// controller stops on [`ReviewCommand::Shutdown`] or once every
/// [`ReviewHandle`] has been dropped.
pub struct ReviewController<B: ReviewBackend> {
    backend: Arc<B>,
    state: ReviewState,
    scheduler: RefreshScheduler,
    commands: mpsc::UnboundedReceiver<ReviewCommand>,
    internal_rx: mpsc::UnboundedReceiver<Internal>,
    internal_tx: mpsc::UnboundedSender<Internal>,
    snapshots: watch::Sender<ReviewState>,
}

impl<B: ReviewBackend> ReviewController<B> {
    #[must_use]
    pub fn new(backend: Arc<B>, config: ReviewControllerConfig) -> (Self, ReviewHandle) {
        let settings = SyncSettings {
            queue_page: config.queue_page,
            merchant_limit: config.merchant_limit,
        };
        let state = ReviewState::new(settings, config.initial_view);
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (internal_tx, internal_rx) = mpsc::unbounded_channel();
        let (snapshots_tx, snapshots_rx) = watch::channel(state.clone());
        let controller = Self {
            backend,
            state,
            scheduler: RefreshScheduler::new(config.poll_interval),
            commands: commands_rx,
            internal_rx,
            internal_tx,
            snapshots: snapshots_tx,
        };
        let handle = ReviewHandle {
            commands: commands_tx,
            snapshots: snapshots_rx,
        };
        (controller, handle)
    }

    /// Spawns [`ReviewController::run`] on the current runtime.
    pub fn spawn(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(self.run())
    }

    pub async fn run(mut self) {
        info!(
            view = self.state.view.as_str(),
            poll_ms = self.scheduler.period().as_millis() as u64,
            "review controller started"
        );
        self.dispatch(ReviewEvent::Started);
        loop {
            tokio::select! {
                command = self.commands.recv() => {
                    let Some(event) = command.and_then(ReviewCommand::into_event) else {
                        break;
                    };
                    self.dispatch(event);
                }
                Some(message) = self.internal_rx.recv() => match message {
                    Internal::Completed(event) => self.dispatch(event),
                    Internal::Tick(tick) => {
                        if self.scheduler.is_current(tick) {
                            self.dispatch(ReviewEvent::QueueTimerFired);
                        } else {
                            debug!(
                                generation = tick.generation,
                                "dropping tick from cancelled timer"
                            );
                        }
                    }
                },
            }
        }
        self.scheduler.stop();
        info!("review controller stopped");
    }

    fn dispatch(&mut self, event: ReviewEvent) {
        debug!(event = event.label(), "review event");
        let Transition { state, effects } = reduce(std::mem::take(&mut self.state), event);
        self.state = state;
        for effect in effects {
            self.execute(effect);
        }
        self.snapshots.send_replace(self.state.clone());
    }

    fn execute(&mut self, effect: ReviewEffect) {
        match effect {
            ReviewEffect::StartQueueTimer => self.scheduler.start(self.internal_tx.clone()),
            ReviewEffect::StopQueueTimer => self.scheduler.stop(),
            ReviewEffect::FetchQueue(ticket) => {
                let backend = Arc::clone(&self.backend);
                self.complete_with(async move {
                    let result = backend.review_queue(ticket.page).await;
                    ReviewEvent::QueueLoaded { ticket, result }
                });
            }
            ReviewEffect::FetchCase(ticket) => {
                let backend = Arc::clone(&self.backend);
                self.complete_with(async move {
                    let result = backend.review_case(&ticket.transaction_id).await;
                    ReviewEvent::CaseLoaded { ticket, result }
                });
            }
            ReviewEffect::RecordAction { ticket, request } => {
                let backend = Arc::clone(&self.backend);
                self.complete_with(async move {
                    let result = backend
                        .record_review_action(&ticket.transaction_id, &request)
                        .await;
                    ReviewEvent::ActionRecorded { ticket, result }
                });
            }
            ReviewEffect::FetchMonitoring(ticket) => {
                let backend = Arc::clone(&self.backend);
                self.complete_with(async move {
                    let result = load_monitoring(backend.as_ref(), ticket.merchant_limit).await;
                    ReviewEvent::MonitoringLoaded { ticket, result }
                });
            }
        }
    }

    fn complete_with<F>(&self, request: F)
    where
        F: Future<Output = ReviewEvent> + Send + 'static,
    {
        let mailbox = self.internal_tx.clone();
        tokio::spawn(async move {
            let event = request.await;
            if mailbox.send(Internal::Completed(event)).is_err() {
                debug!("review controller gone before request completed");
            }
        });
    }
}

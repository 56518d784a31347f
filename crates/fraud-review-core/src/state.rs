use fraud_review_client::{
    CaseDetail, DEFAULT_TOP_MERCHANTS_LIMIT, MonitoringSnapshot, QueueEntry, QueuePage,
    ReviewActionKind, ReviewActionReceipt,
};

use crate::error_channel::ErrorChannel;
use crate::selection::queue_contains;

pub type RequestEpoch = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReviewView {
    #[default]
    Review,
    Monitoring,
}

impl ReviewView {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Review => "review",
            Self::Monitoring => "monitoring",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "review" | "queue" => Some(Self::Review),
            "monitoring" | "monitor" => Some(Self::Monitoring),
            _ => None,
        }
    }
}

/// What caused a queue fetch. `AfterAction` fetches continue the action
/// sequence with a case reload once they resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueOrigin {
    Startup,
    Poll,
    Manual,
    ViewResumed,
    AfterAction,
}

impl QueueOrigin {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Startup => "startup",
            Self::Poll => "poll",
            Self::Manual => "manual",
            Self::ViewResumed => "view_resumed",
            Self::AfterAction => "after_action",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueTicket {
    pub epoch: RequestEpoch,
    pub page: QueuePage,
    pub origin: QueueOrigin,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseTicket {
    pub epoch: RequestEpoch,
    pub transaction_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionTicket {
    pub epoch: RequestEpoch,
    pub transaction_id: String,
    pub action: ReviewActionKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitoringTicket {
    pub epoch: RequestEpoch,
    pub merchant_limit: u32,
}

/// Request parameters the reducer stamps onto outgoing tickets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncSettings {
    pub queue_page: QueuePage,
    pub merchant_limit: u32,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            queue_page: QueuePage::default(),
            merchant_limit: DEFAULT_TOP_MERCHANTS_LIMIT,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueueState {
    pub entries: Vec<QueueEntry>,
    pub loading: bool,
    /// Number of queue snapshots applied so far.
    pub refreshes: u64,
    pub(crate) applied_epoch: Option<RequestEpoch>,
    pub(crate) pending_epoch: Option<RequestEpoch>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CaseState {
    pub detail: Option<CaseDetail>,
    pub loading: bool,
    pub(crate) pending: Option<CaseTicket>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MonitoringState {
    pub snapshot: Option<MonitoringSnapshot>,
    pub loading: bool,
    pub(crate) pending_epoch: Option<RequestEpoch>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActionState {
    pub last_receipt: Option<ReviewActionReceipt>,
    pub completed: u64,
    pub(crate) pending: Option<ActionTicket>,
}

impl ActionState {
    #[must_use]
    pub fn in_flight(&self) -> Option<&ActionTicket> {
        self.pending.as_ref()
    }
}

/// The single record every synchronizer reads and the reducer writes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReviewState {
    pub view: ReviewView,
    pub queue: QueueState,
    pub selection: Option<String>,
    pub case: CaseState,
    pub monitoring: MonitoringState,
    pub action: ActionState,
    pub errors: ErrorChannel,
    pub(crate) settings: SyncSettings,
    next_epoch: RequestEpoch,
}

impl ReviewState {
    #[must_use]
    pub fn new(settings: SyncSettings, view: ReviewView) -> Self {
        Self {
            view,
            settings,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn settings(&self) -> SyncSettings {
        self.settings
    }

    #[must_use]
    pub fn selected_entry(&self) -> Option<&QueueEntry> {
        let selected = self.selection.as_deref()?;
        self.queue
            .entries
            .iter()
            .find(|entry| entry.transaction_id == selected)
    }

    /// True when the selection is empty or names a queued entry.
    #[must_use]
    pub fn selection_is_valid(&self) -> bool {
        self.selection
            .as_deref()
            .is_none_or(|selected| queue_contains(&self.queue.entries, selected))
    }

    pub(crate) fn allocate_epoch(&mut self) -> RequestEpoch {
        self.next_epoch = self.next_epoch.saturating_add(1);
        self.next_epoch
    }
}

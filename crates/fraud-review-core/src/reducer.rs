//! Pure transition function for the review workstation.
//!
//! `reduce` consumes the current [`ReviewState`] and one [`ReviewEvent`] and
//! returns the next state plus the effects the driver must execute. Network
//! completions come back in as events carrying the ticket they were issued
//! with, which is how stale responses get recognised and dropped.

use fraud_review_client::{
    CaseDetail, MonitoringSnapshot, QueueEntry, ReviewActionKind, ReviewActionReceipt,
    ReviewActionRequest, ReviewApiError,
};
use tracing::{debug, info, warn};

use crate::error_channel::ErrorSource;
use crate::selection::{queue_contains, resolve_selection};
use crate::state::{
    ActionTicket, CaseTicket, MonitoringTicket, QueueOrigin, QueueTicket, ReviewState, ReviewView,
};

/// An analyst decision waiting to be written. `transaction_id: None` targets
/// the current selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionDraft {
    pub transaction_id: Option<String>,
    pub action: ReviewActionKind,
    pub analyst: String,
    pub notes: Option<String>,
}

impl ActionDraft {
    #[must_use]
    pub fn for_selection(action: ReviewActionKind, analyst: impl Into<String>) -> Self {
        Self {
            transaction_id: None,
            action,
            analyst: analyst.into(),
            notes: None,
        }
    }

    #[must_use]
    pub fn with_transaction(mut self, transaction_id: impl Into<String>) -> Self {
        self.transaction_id = Some(transaction_id.into());
        self
    }

    #[must_use]
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

#[derive(Debug, Clone)]
pub enum ReviewEvent {
    Started,
    QueueTimerFired,
    QueueRefreshRequested,
    CaseSelected {
        transaction_id: String,
    },
    ActionSubmitted(ActionDraft),
    ViewChanged(ReviewView),
    MonitoringRefreshRequested,
    QueueLoaded {
        ticket: QueueTicket,
        result: Result<Vec<QueueEntry>, ReviewApiError>,
    },
    CaseLoaded {
        ticket: CaseTicket,
        result: Result<CaseDetail, ReviewApiError>,
    },
    ActionRecorded {
        ticket: ActionTicket,
        result: Result<ReviewActionReceipt, ReviewApiError>,
    },
    MonitoringLoaded {
        ticket: MonitoringTicket,
        result: Result<MonitoringSnapshot, ReviewApiError>,
    },
}

impl ReviewEvent {
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Started => "started",
            Self::QueueTimerFired => "queue_timer_fired",
            Self::QueueRefreshRequested => "queue_refresh_requested",
            Self::CaseSelected { .. } => "case_selected",
            Self::ActionSubmitted(_) => "action_submitted",
            Self::ViewChanged(_) => "view_changed",
            Self::MonitoringRefreshRequested => "monitoring_refresh_requested",
            Self::QueueLoaded { .. } => "queue_loaded",
            Self::CaseLoaded { .. } => "case_loaded",
            Self::ActionRecorded { .. } => "action_recorded",
            Self::MonitoringLoaded { .. } => "monitoring_loaded",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewEffect {
    FetchQueue(QueueTicket),
    FetchCase(CaseTicket),
    RecordAction {
        ticket: ActionTicket,
        request: ReviewActionRequest,
    },
    FetchMonitoring(MonitoringTicket),
    StartQueueTimer,
    StopQueueTimer,
}

#[derive(Debug, Clone)]
pub struct Transition {
    pub state: ReviewState,
    pub effects: Vec<ReviewEffect>,
}

#[must_use]
pub fn reduce(state: ReviewState, event: ReviewEvent) -> Transition {
    let mut transition = Transition {
        state,
        effects: Vec::new(),
    };
    match event {
        ReviewEvent::Started => transition.on_started(),
        ReviewEvent::QueueTimerFired => {
            if transition.state.view == ReviewView::Review {
                transition.issue_queue_fetch(QueueOrigin::Poll);
            } else {
                debug!(view = transition.state.view.as_str(), "ignoring queue tick");
            }
        }
        ReviewEvent::QueueRefreshRequested => transition.issue_queue_fetch(QueueOrigin::Manual),
        ReviewEvent::CaseSelected { transaction_id } => {
            transition.on_case_selected(&transaction_id);
        }
        ReviewEvent::ActionSubmitted(draft) => transition.on_action_submitted(draft),
        ReviewEvent::ViewChanged(view) => transition.on_view_changed(view),
        ReviewEvent::MonitoringRefreshRequested => transition.issue_monitoring_fetch(),
        ReviewEvent::QueueLoaded { ticket, result } => transition.on_queue_loaded(ticket, result),
        ReviewEvent::CaseLoaded { ticket, result } => transition.on_case_loaded(&ticket, result),
        ReviewEvent::ActionRecorded { ticket, result } => {
            transition.on_action_recorded(&ticket, result);
        }
        ReviewEvent::MonitoringLoaded { ticket, result } => {
            transition.on_monitoring_loaded(ticket, result);
        }
    }
    transition
}

impl Transition {
    fn on_started(&mut self) {
        match self.state.view {
            ReviewView::Review => {
                self.issue_queue_fetch(QueueOrigin::Startup);
                self.effects.push(ReviewEffect::StartQueueTimer);
            }
            ReviewView::Monitoring => self.issue_monitoring_fetch(),
        }
    }

    fn on_view_changed(&mut self, view: ReviewView) {
        if self.state.view == view {
            return;
        }
        info!(from = self.state.view.as_str(), to = view.as_str(), "review view changed");
        self.state.view = view;
        self.effects.push(ReviewEffect::StopQueueTimer);
        match view {
            ReviewView::Monitoring => self.issue_monitoring_fetch(),
            ReviewView::Review => {
                self.issue_queue_fetch(QueueOrigin::ViewResumed);
                self.effects.push(ReviewEffect::StartQueueTimer);
                self.issue_case_fetch();
            }
        }
    }

    fn on_case_selected(&mut self, transaction_id: &str) {
        let transaction_id = transaction_id.trim();
        if self.state.selection.as_deref() == Some(transaction_id) {
            return;
        }
        if !queue_contains(&self.state.queue.entries, transaction_id) {
            warn!(transaction_id, "ignoring selection of a case that is not queued");
            return;
        }
        self.change_selection(Some(transaction_id.to_string()));
    }

    fn on_queue_loaded(
        &mut self,
        ticket: QueueTicket,
        result: Result<Vec<QueueEntry>, ReviewApiError>,
    ) {
        let queue = &mut self.state.queue;
        if queue.pending_epoch == Some(ticket.epoch) {
            queue.pending_epoch = None;
            queue.loading = false;
        }
        if queue
            .applied_epoch
            .is_some_and(|applied| ticket.epoch < applied)
        {
            debug!(
                epoch = ticket.epoch,
                origin = ticket.origin.as_str(),
                "discarding queue response older than the applied snapshot"
            );
            // A newer snapshot is already applied, so the action sequence
            // continues against it whatever this response says.
            if ticket.origin == QueueOrigin::AfterAction {
                self.issue_case_fetch();
            }
            return;
        }

        match result {
            Ok(entries) => {
                queue.entries = entries;
                queue.applied_epoch = Some(ticket.epoch);
                queue.refreshes = queue.refreshes.saturating_add(1);
                self.state.errors.supersede(ErrorSource::Queue);

                let previous = self.state.selection.clone();
                let next = resolve_selection(&self.state.queue.entries, previous.as_deref());
                if next != previous {
                    debug!(
                        previous = previous.as_deref().unwrap_or(""),
                        next = next.as_deref().unwrap_or(""),
                        "queue refresh moved the selection"
                    );
                    self.change_selection(next);
                } else if ticket.origin == QueueOrigin::AfterAction {
                    self.issue_case_fetch();
                }
            }
            Err(error) => {
                warn!(origin = ticket.origin.as_str(), error = %error, "queue refresh failed");
                self.state.errors.record(ErrorSource::Queue, error.message());
            }
        }
    }

    fn on_case_loaded(&mut self, ticket: &CaseTicket, result: Result<CaseDetail, ReviewApiError>) {
        let current = self.state.case.pending.as_ref() == Some(ticket)
            && self.state.selection.as_deref() == Some(ticket.transaction_id.as_str());
        if !current {
            debug!(
                epoch = ticket.epoch,
                transaction_id = %ticket.transaction_id,
                "discarding stale case response"
            );
            return;
        }

        let case = &mut self.state.case;
        case.pending = None;
        case.loading = false;
        match result {
            Ok(detail) => {
                case.detail = Some(detail);
                self.state.errors.supersede(ErrorSource::Case);
            }
            Err(error) => {
                case.detail = None;
                warn!(transaction_id = %ticket.transaction_id, error = %error, "case load failed");
                self.state.errors.record(ErrorSource::Case, error.message());
            }
        }
    }

    fn on_action_submitted(&mut self, draft: ActionDraft) {
        if let Some(pending) = &self.state.action.pending {
            let message = format!(
                "an action for {} is still being recorded",
                pending.transaction_id
            );
            warn!(transaction_id = %pending.transaction_id, "refusing overlapping review action");
            self.state.errors.record(ErrorSource::Action, message);
            return;
        }

        let transaction_id = match draft.transaction_id.as_deref().map(str::trim) {
            Some("") => {
                warn!("refusing review action with a blank transaction id");
                self.state
                    .errors
                    .record(ErrorSource::Action, "transaction id must not be empty");
                return;
            }
            Some(named) => Some(named.to_string()),
            None => self.state.selection.clone(),
        };
        let Some(transaction_id) = transaction_id else {
            warn!("refusing review action without a selected case");
            self.state
                .errors
                .record(ErrorSource::Action, "select a case before recording an action");
            return;
        };
        if draft.analyst.trim().is_empty() {
            warn!(transaction_id = %transaction_id, "refusing review action without analyst");
            self.state
                .errors
                .record(ErrorSource::Action, "analyst must not be empty");
            return;
        }

        let request =
            ReviewActionRequest::new(draft.action, &draft.analyst, draft.notes.as_deref());
        let ticket = ActionTicket {
            epoch: self.state.allocate_epoch(),
            transaction_id,
            action: draft.action,
        };
        info!(
            transaction_id = %ticket.transaction_id,
            action = ticket.action.as_str(),
            analyst = %request.analyst,
            "recording review action"
        );
        self.state.action.pending = Some(ticket.clone());
        self.effects.push(ReviewEffect::RecordAction { ticket, request });
    }

    fn on_action_recorded(
        &mut self,
        ticket: &ActionTicket,
        result: Result<ReviewActionReceipt, ReviewApiError>,
    ) {
        if self.state.action.pending.as_ref() != Some(ticket) {
            debug!(epoch = ticket.epoch, "discarding unexpected action completion");
            return;
        }
        self.state.action.pending = None;
        match result {
            Ok(receipt) => {
                info!(
                    transaction_id = %ticket.transaction_id,
                    action = ticket.action.as_str(),
                    receipt_id = receipt.id.unwrap_or_default(),
                    "review action recorded"
                );
                self.state.action.last_receipt = Some(receipt);
                self.state.action.completed = self.state.action.completed.saturating_add(1);
                self.state.errors.supersede(ErrorSource::Action);
                self.issue_queue_fetch(QueueOrigin::AfterAction);
            }
            Err(error) => {
                warn!(
                    transaction_id = %ticket.transaction_id,
                    error = %error,
                    "review action failed"
                );
                self.state.errors.record(ErrorSource::Action, error.message());
            }
        }
    }

    fn on_monitoring_loaded(
        &mut self,
        ticket: MonitoringTicket,
        result: Result<MonitoringSnapshot, ReviewApiError>,
    ) {
        let monitoring = &mut self.state.monitoring;
        if monitoring.pending_epoch != Some(ticket.epoch) {
            debug!(epoch = ticket.epoch, "discarding superseded monitoring response");
            return;
        }
        monitoring.pending_epoch = None;
        monitoring.loading = false;
        match result {
            Ok(snapshot) => {
                monitoring.snapshot = Some(snapshot);
                self.state.errors.supersede(ErrorSource::Monitoring);
            }
            Err(error) => {
                warn!(error = %error, "monitoring load failed");
                self.state
                    .errors
                    .record(ErrorSource::Monitoring, error.message());
            }
        }
    }

    fn change_selection(&mut self, next: Option<String>) {
        self.state.selection = next;
        let case = &mut self.state.case;
        case.detail = None;
        case.pending = None;
        case.loading = false;
        self.issue_case_fetch();
    }

    fn issue_queue_fetch(&mut self, origin: QueueOrigin) {
        let ticket = QueueTicket {
            epoch: self.state.allocate_epoch(),
            page: self.state.settings.queue_page,
            origin,
        };
        self.state.queue.pending_epoch = Some(ticket.epoch);
        self.state.queue.loading = true;
        self.effects.push(ReviewEffect::FetchQueue(ticket));
    }

    fn issue_case_fetch(&mut self) {
        let Some(transaction_id) = self.state.selection.clone() else {
            return;
        };
        let ticket = CaseTicket {
            epoch: self.state.allocate_epoch(),
            transaction_id,
        };
        self.state.case.pending = Some(ticket.clone());
        self.state.case.loading = true;
        self.effects.push(ReviewEffect::FetchCase(ticket));
    }

    fn issue_monitoring_fetch(&mut self) {
        let ticket = MonitoringTicket {
            epoch: self.state.allocate_epoch(),
            merchant_limit: self.state.settings.merchant_limit,
        };
        self.state.monitoring.pending_epoch = Some(ticket.epoch);
        self.state.monitoring.loading = true;
        self.effects.push(ReviewEffect::FetchMonitoring(ticket));
    }
}

#[cfg(test)]
mod tests {
    use fraud_review_client::{
        CaseDetail, MonitoringSnapshot, MonitoringSummary, QueueEntry, ReviewActionKind,
        ReviewActionReceipt, ReviewApiError,
    };
    use serde_json::json;

    use super::{ActionDraft, ReviewEffect, ReviewEvent, Transition, reduce};
    use crate::error_channel::ErrorSource;
    use crate::state::{
        ActionTicket, CaseTicket, MonitoringTicket, QueueOrigin, QueueTicket, ReviewState,
        ReviewView,
    };

    fn transport(message: &str) -> ReviewApiError {
        ReviewApiError::Transport {
            message: message.to_string(),
        }
    }

    fn entry(transaction_id: &str) -> QueueEntry {
        QueueEntry {
            transaction_id: transaction_id.to_string(),
            risk_score: 82,
            fraud_probability: 0.82,
            amount: 1800.0,
            country: "BR".to_string(),
            merchant: "electro-hub".to_string(),
            user_id: "u_7".to_string(),
            decision: None,
            created_at: None,
            timestamp: None,
        }
    }

    fn queue(ids: &[&str]) -> Vec<QueueEntry> {
        ids.iter().map(|id| entry(id)).collect()
    }

    fn case_detail(transaction_id: &str) -> CaseDetail {
        serde_json::from_value(json!({
            "transaction": {
                "transaction_id": transaction_id,
                "user_id": "u_7",
                "amount": 1800.0,
                "merchant": "electro-hub",
                "country": "BR"
            },
            "assessment": {
                "decision": "manual_review",
                "risk_score": 82,
                "fraud_probability": 0.82,
                "reasons": "not json"
            },
            "features": {"transaction_id": transaction_id, "amount_z": 3.1},
            "review_history": []
        }))
        .expect("case detail fixture")
    }

    fn single_queue_fetch(transition: &Transition) -> QueueTicket {
        let tickets = transition
            .effects
            .iter()
            .filter_map(|effect| match effect {
                ReviewEffect::FetchQueue(ticket) => Some(*ticket),
                _ => None,
            })
            .collect::<Vec<_>>();
        assert_eq!(tickets.len(), 1, "effects: {:?}", transition.effects);
        tickets[0]
    }

    fn case_fetches(transition: &Transition) -> Vec<CaseTicket> {
        transition
            .effects
            .iter()
            .filter_map(|effect| match effect {
                ReviewEffect::FetchCase(ticket) => Some(ticket.clone()),
                _ => None,
            })
            .collect()
    }

    fn action_ticket(transition: &Transition) -> ActionTicket {
        transition
            .effects
            .iter()
            .find_map(|effect| match effect {
                ReviewEffect::RecordAction { ticket, .. } => Some(ticket.clone()),
                _ => None,
            })
            .expect("action effect")
    }

    fn monitoring_ticket(transition: &Transition) -> MonitoringTicket {
        transition
            .effects
            .iter()
            .find_map(|effect| match effect {
                ReviewEffect::FetchMonitoring(ticket) => Some(*ticket),
                _ => None,
            })
            .expect("monitoring effect")
    }

    fn snapshot() -> MonitoringSnapshot {
        MonitoringSnapshot {
            summary: MonitoringSummary {
                total: 4,
                approve: 2,
                manual_review: 1,
                block: 1,
            },
            score_buckets: Vec::new(),
            top_merchants: Vec::new(),
        }
    }

    /// Starts the reducer and applies the first queue page, returning the
    /// state together with the case fetch that page triggered.
    fn loaded(ids: &[&str]) -> (ReviewState, Option<CaseTicket>) {
        let started = reduce(ReviewState::default(), ReviewEvent::Started);
        let ticket = single_queue_fetch(&started);
        let loaded = reduce(
            started.state,
            ReviewEvent::QueueLoaded {
                ticket,
                result: Ok(queue(ids)),
            },
        );
        let case = case_fetches(&loaded).pop();
        (loaded.state, case)
    }

    #[test]
    fn startup_fetches_queue_and_arms_timer() {
        let transition = reduce(ReviewState::default(), ReviewEvent::Started);
        let ticket = single_queue_fetch(&transition);
        assert_eq!(ticket.origin, QueueOrigin::Startup);
        assert_eq!(ticket.page.limit, 100);
        assert_eq!(ticket.page.offset, 0);
        assert!(transition.effects.contains(&ReviewEffect::StartQueueTimer));
        assert!(transition.state.queue.loading);
    }

    #[test]
    fn first_queue_page_selects_head_and_loads_its_case() {
        let (state, case) = loaded(&["t1", "t2"]);
        assert_eq!(state.selection.as_deref(), Some("t1"));
        assert!(!state.queue.loading);
        let case = case.expect("case fetch for head");
        assert_eq!(case.transaction_id, "t1");
        assert!(state.case.loading);

        let applied = reduce(
            state,
            ReviewEvent::CaseLoaded {
                ticket: case,
                result: Ok(case_detail("t1")),
            },
        );
        let detail = applied.state.case.detail.as_ref().expect("detail applied");
        assert_eq!(detail.transaction_id(), "t1");
        assert!(detail.reasons().is_empty());
        assert!(applied.state.errors.current().is_none());
        assert!(!applied.state.case.loading);
    }

    #[test]
    fn late_case_response_for_previous_selection_is_discarded() {
        let (state, first_case) = loaded(&["t1", "t2"]);
        let first_case = first_case.expect("t1 fetch");

        let switched = reduce(
            state,
            ReviewEvent::CaseSelected {
                transaction_id: "t2".to_string(),
            },
        );
        assert!(switched.state.case.detail.is_none());
        let second_case = case_fetches(&switched).pop().expect("t2 fetch");
        assert_eq!(second_case.transaction_id, "t2");

        let late = reduce(
            switched.state,
            ReviewEvent::CaseLoaded {
                ticket: first_case,
                result: Ok(case_detail("t1")),
            },
        );
        assert!(late.state.case.detail.is_none());
        assert!(late.state.case.loading);

        let fresh = reduce(
            late.state,
            ReviewEvent::CaseLoaded {
                ticket: second_case,
                result: Ok(case_detail("t2")),
            },
        );
        let detail = fresh.state.case.detail.expect("t2 detail");
        assert_eq!(detail.transaction_id(), "t2");
    }

    #[test]
    fn selecting_unqueued_or_current_case_does_nothing() {
        let (state, _) = loaded(&["t1", "t2"]);
        let unknown = reduce(
            state,
            ReviewEvent::CaseSelected {
                transaction_id: "t9".to_string(),
            },
        );
        assert_eq!(unknown.state.selection.as_deref(), Some("t1"));
        assert!(unknown.effects.is_empty());

        let same = reduce(
            unknown.state,
            ReviewEvent::CaseSelected {
                transaction_id: "t1".to_string(),
            },
        );
        assert!(same.effects.is_empty());
    }

    #[test]
    fn older_queue_response_never_overwrites_newer_snapshot() {
        let (state, _) = loaded(&["t1", "t2"]);
        let older = reduce(state, ReviewEvent::QueueRefreshRequested);
        let older_ticket = single_queue_fetch(&older);
        let newer = reduce(older.state, ReviewEvent::QueueTimerFired);
        let newer_ticket = single_queue_fetch(&newer);

        let applied = reduce(
            newer.state,
            ReviewEvent::QueueLoaded {
                ticket: newer_ticket,
                result: Ok(queue(&["t2"])),
            },
        );
        let stale = reduce(
            applied.state,
            ReviewEvent::QueueLoaded {
                ticket: older_ticket,
                result: Ok(queue(&["t1", "t2", "t3"])),
            },
        );
        let ids = stale
            .state
            .queue
            .entries
            .iter()
            .map(|entry| entry.transaction_id.as_str())
            .collect::<Vec<_>>();
        assert_eq!(ids, ["t2"]);
        assert_eq!(stale.state.selection.as_deref(), Some("t2"));
        assert!(stale.effects.is_empty());
    }

    #[test]
    fn queue_failure_keeps_stale_snapshot_and_records_error() {
        let (state, _) = loaded(&["t1", "t2"]);
        let refresh = reduce(state, ReviewEvent::QueueRefreshRequested);
        let ticket = single_queue_fetch(&refresh);
        let failed = reduce(
            refresh.state,
            ReviewEvent::QueueLoaded {
                ticket,
                result: Err(transport("connection refused")),
            },
        );
        assert_eq!(failed.state.queue.entries.len(), 2);
        assert!(!failed.state.queue.loading);
        assert_eq!(failed.state.selection.as_deref(), Some("t1"));
        let error = failed.state.errors.current().expect("queue error");
        assert_eq!(error.source, ErrorSource::Queue);
        assert_eq!(error.message, "connection refused");
        assert!(failed.effects.is_empty());
    }

    #[test]
    fn case_failure_reverts_detail_to_empty() {
        let (state, case) = loaded(&["t1"]);
        let failed = reduce(
            state,
            ReviewEvent::CaseLoaded {
                ticket: case.expect("t1 fetch"),
                result: Err(transport("Transaction not found")),
            },
        );
        assert!(failed.state.case.detail.is_none());
        assert!(!failed.state.case.loading);
        assert_eq!(failed.state.errors.message(), Some("Transaction not found"));
    }

    #[test]
    fn queue_success_does_not_clear_case_error() {
        let (state, case) = loaded(&["t1"]);
        let failed = reduce(
            state,
            ReviewEvent::CaseLoaded {
                ticket: case.expect("t1 fetch"),
                result: Err(transport("case backend down")),
            },
        );
        let poll = reduce(failed.state, ReviewEvent::QueueTimerFired);
        let ticket = single_queue_fetch(&poll);
        let refreshed = reduce(
            poll.state,
            ReviewEvent::QueueLoaded {
                ticket,
                result: Ok(queue(&["t1"])),
            },
        );
        assert_eq!(refreshed.state.errors.message(), Some("case backend down"));
    }

    #[test]
    fn rejected_case_converges_to_next_entry() {
        let (state, _) = loaded(&["t1", "t2"]);
        let submitted = reduce(
            state,
            ReviewEvent::ActionSubmitted(
                ActionDraft::for_selection(ReviewActionKind::Reject, "andre").with_notes("  "),
            ),
        );
        let ticket = action_ticket(&submitted);
        assert_eq!(ticket.transaction_id, "t1");
        let notes = submitted.effects.iter().find_map(|effect| match effect {
            ReviewEffect::RecordAction { request, .. } => Some(request.notes.clone()),
            _ => None,
        });
        assert_eq!(notes, Some(None));

        let recorded = reduce(
            submitted.state,
            ReviewEvent::ActionRecorded {
                ticket,
                result: Ok(ReviewActionReceipt::default()),
            },
        );
        let refresh = single_queue_fetch(&recorded);
        assert_eq!(refresh.origin, QueueOrigin::AfterAction);
        assert!(case_fetches(&recorded).is_empty());

        let converged = reduce(
            recorded.state,
            ReviewEvent::QueueLoaded {
                ticket: refresh,
                result: Ok(queue(&["t2"])),
            },
        );
        assert_eq!(converged.state.selection.as_deref(), Some("t2"));
        assert!(converged.state.case.detail.is_none());
        let reloads = case_fetches(&converged);
        assert_eq!(reloads.len(), 1);
        assert_eq!(reloads[0].transaction_id, "t2");
        assert_eq!(converged.state.action.completed, 1);
    }

    #[test]
    fn action_on_unchanged_selection_reloads_case() {
        let (state, _) = loaded(&["t1", "t2"]);
        let submitted = reduce(
            state,
            ReviewEvent::ActionSubmitted(
                ActionDraft::for_selection(ReviewActionKind::Approve, "andre")
                    .with_transaction("t2"),
            ),
        );
        let ticket = action_ticket(&submitted);
        assert_eq!(ticket.transaction_id, "t2");
        let recorded = reduce(
            submitted.state,
            ReviewEvent::ActionRecorded {
                ticket,
                result: Ok(ReviewActionReceipt::default()),
            },
        );
        let refresh = single_queue_fetch(&recorded);
        let reloaded = reduce(
            recorded.state,
            ReviewEvent::QueueLoaded {
                ticket: refresh,
                result: Ok(queue(&["t1"])),
            },
        );
        let reloads = case_fetches(&reloaded);
        assert_eq!(reloads.len(), 1);
        assert_eq!(reloads[0].transaction_id, "t1");
    }

    #[test]
    fn stale_after_action_queue_still_reloads_current_case() {
        let (state, _) = loaded(&["t1", "t2"]);
        let submitted = reduce(
            state,
            ReviewEvent::ActionSubmitted(ActionDraft::for_selection(
                ReviewActionKind::Approve,
                "andre",
            )),
        );
        let ticket = action_ticket(&submitted);
        let recorded = reduce(
            submitted.state,
            ReviewEvent::ActionRecorded {
                ticket,
                result: Ok(ReviewActionReceipt::default()),
            },
        );
        let after_action = single_queue_fetch(&recorded);
        let poll = reduce(recorded.state, ReviewEvent::QueueTimerFired);
        let poll_ticket = single_queue_fetch(&poll);

        let polled = reduce(
            poll.state,
            ReviewEvent::QueueLoaded {
                ticket: poll_ticket,
                result: Ok(queue(&["t2"])),
            },
        );
        assert_eq!(polled.state.selection.as_deref(), Some("t2"));

        let late = reduce(
            polled.state,
            ReviewEvent::QueueLoaded {
                ticket: after_action,
                result: Ok(queue(&["t2"])),
            },
        );
        let reloads = case_fetches(&late);
        assert_eq!(reloads.len(), 1);
        assert_eq!(reloads[0].transaction_id, "t2");
    }

    #[test]
    fn failed_stale_after_action_queue_still_reloads_current_case() {
        let (state, _) = loaded(&["t1", "t2"]);
        let submitted = reduce(
            state,
            ReviewEvent::ActionSubmitted(ActionDraft::for_selection(
                ReviewActionKind::Reject,
                "andre",
            )),
        );
        let ticket = action_ticket(&submitted);
        let recorded = reduce(
            submitted.state,
            ReviewEvent::ActionRecorded {
                ticket,
                result: Ok(ReviewActionReceipt::default()),
            },
        );
        let after_action = single_queue_fetch(&recorded);
        let poll = reduce(recorded.state, ReviewEvent::QueueTimerFired);
        let poll_ticket = single_queue_fetch(&poll);
        let polled = reduce(
            poll.state,
            ReviewEvent::QueueLoaded {
                ticket: poll_ticket,
                result: Ok(queue(&["t2"])),
            },
        );

        let late = reduce(
            polled.state,
            ReviewEvent::QueueLoaded {
                ticket: after_action,
                result: Err(transport("queue down")),
            },
        );
        let reloads = case_fetches(&late);
        assert_eq!(reloads.len(), 1);
        assert_eq!(reloads[0].transaction_id, "t2");
        assert_eq!(late.state.queue.entries.len(), 1);
        assert!(late.state.errors.current().is_none());
    }

    #[test]
    fn blank_named_target_is_refused_instead_of_using_selection() {
        let (state, _) = loaded(&["t1", "t2"]);
        let refused = reduce(
            state,
            ReviewEvent::ActionSubmitted(
                ActionDraft::for_selection(ReviewActionKind::Reject, "andre")
                    .with_transaction("   "),
            ),
        );
        assert!(refused.effects.is_empty());
        assert!(refused.state.action.in_flight().is_none());
        let error = refused.state.errors.current().expect("action error");
        assert_eq!(error.source, ErrorSource::Action);
        assert_eq!(error.message, "transaction id must not be empty");
    }

    #[test]
    fn invalid_action_requests_are_refused_locally() {
        let empty = reduce(
            ReviewState::default(),
            ReviewEvent::ActionSubmitted(ActionDraft::for_selection(
                ReviewActionKind::Approve,
                "andre",
            )),
        );
        assert!(empty.effects.is_empty());
        assert_eq!(
            empty.state.errors.current().map(|error| error.source),
            Some(ErrorSource::Action)
        );

        let (state, _) = loaded(&["t1"]);
        let blank = reduce(
            state,
            ReviewEvent::ActionSubmitted(ActionDraft::for_selection(
                ReviewActionKind::Approve,
                "   ",
            )),
        );
        assert!(blank.effects.is_empty());
        assert_eq!(blank.state.errors.message(), Some("analyst must not be empty"));
    }

    #[test]
    fn overlapping_action_is_refused_while_write_is_in_flight() {
        let (state, _) = loaded(&["t1", "t2"]);
        let draft = ActionDraft::for_selection(ReviewActionKind::Reject, "andre");
        let first = reduce(state, ReviewEvent::ActionSubmitted(draft.clone()));
        assert!(first.state.action.in_flight().is_some());
        let second = reduce(first.state, ReviewEvent::ActionSubmitted(draft));
        assert!(second.effects.is_empty());
        assert_eq!(second.state.errors.recorded_count(), 1);
    }

    #[test]
    fn failed_action_aborts_refresh_and_reload() {
        let (state, _) = loaded(&["t1"]);
        let submitted = reduce(
            state,
            ReviewEvent::ActionSubmitted(ActionDraft::for_selection(
                ReviewActionKind::Approve,
                "andre",
            )),
        );
        let ticket = action_ticket(&submitted);
        let failed = reduce(
            submitted.state,
            ReviewEvent::ActionRecorded {
                ticket,
                result: Err(transport("write timed out")),
            },
        );
        assert!(failed.effects.is_empty());
        assert!(failed.state.action.in_flight().is_none());
        assert_eq!(failed.state.errors.message(), Some("write timed out"));
    }

    #[test]
    fn monitoring_view_suspends_polling_and_loads_aggregates() {
        let (state, _) = loaded(&["t1"]);
        let switched = reduce(state, ReviewEvent::ViewChanged(ReviewView::Monitoring));
        assert_eq!(switched.effects[0], ReviewEffect::StopQueueTimer);
        let ticket = monitoring_ticket(&switched);
        assert_eq!(ticket.merchant_limit, 10);
        assert!(switched.state.monitoring.loading);

        let tick = reduce(switched.state, ReviewEvent::QueueTimerFired);
        assert!(tick.effects.is_empty());
    }

    #[test]
    fn resuming_review_refreshes_queue_and_reloads_case() {
        let (state, _) = loaded(&["t1"]);
        let away = reduce(state, ReviewEvent::ViewChanged(ReviewView::Monitoring));
        let back = reduce(away.state, ReviewEvent::ViewChanged(ReviewView::Review));

        assert_eq!(back.effects[0], ReviewEffect::StopQueueTimer);
        assert_eq!(single_queue_fetch(&back).origin, QueueOrigin::ViewResumed);
        assert!(back.effects.contains(&ReviewEffect::StartQueueTimer));
        let reloads = case_fetches(&back);
        assert_eq!(reloads.len(), 1);
        assert_eq!(reloads[0].transaction_id, "t1");
    }

    #[test]
    fn monitoring_failure_keeps_previous_snapshot() {
        let first = reduce(ReviewState::default(), ReviewEvent::MonitoringRefreshRequested);
        let ticket = monitoring_ticket(&first);
        let applied = reduce(
            first.state,
            ReviewEvent::MonitoringLoaded {
                ticket,
                result: Ok(snapshot()),
            },
        );

        let retry = reduce(applied.state, ReviewEvent::MonitoringRefreshRequested);
        let ticket = monitoring_ticket(&retry);
        let failed = reduce(
            retry.state,
            ReviewEvent::MonitoringLoaded {
                ticket,
                result: Err(transport("buckets failed")),
            },
        );
        assert_eq!(failed.state.monitoring.snapshot, Some(snapshot()));
        assert_eq!(failed.state.errors.recorded_count(), 1);
        assert!(!failed.state.monitoring.loading);
    }

    #[test]
    fn superseded_monitoring_response_is_ignored() {
        let first = reduce(ReviewState::default(), ReviewEvent::MonitoringRefreshRequested);
        let old = monitoring_ticket(&first);
        let second = reduce(first.state, ReviewEvent::MonitoringRefreshRequested);
        let stale = reduce(
            second.state,
            ReviewEvent::MonitoringLoaded {
                ticket: old,
                result: Err(ReviewApiError::Transport {
                    message: "slow replica".to_string(),
                }),
            },
        );
        assert!(stale.state.errors.current().is_none());
        assert!(stale.state.monitoring.loading);
    }
}

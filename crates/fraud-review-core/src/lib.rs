#![cfg_attr(test, allow(clippy::expect_used))]

//! Client-side synchronization controller for the fraud review workstation.
//!
//! One [`ReviewController`] task owns a [`ReviewState`] and applies every
//! change through [`reduce`]. Presentation code talks to it through a
//! [`ReviewHandle`] and only ever sees published snapshots.

mod backend;
mod controller;
mod error_channel;
mod reducer;
mod scheduler;
mod selection;
mod state;

pub use backend::{ReviewBackend, load_monitoring};
pub use controller::{
    ControllerClosed, DEFAULT_POLL_INTERVAL, ReviewCommand, ReviewController,
    ReviewControllerConfig, ReviewHandle,
};
pub use error_channel::{ChannelError, ErrorChannel, ErrorSource};
pub use reducer::{ActionDraft, ReviewEffect, ReviewEvent, Transition, reduce};
pub use scheduler::{QueueTimerTick, RefreshScheduler};
pub use selection::{queue_contains, resolve_selection};
pub use state::{
    ActionState, ActionTicket, CaseState, CaseTicket, MonitoringState, MonitoringTicket,
    QueueOrigin, QueueState, QueueTicket, RequestEpoch, ReviewState, ReviewView, SyncSettings,
};

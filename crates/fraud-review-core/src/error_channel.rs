//! Single slot holding the most recent failure across all synchronizers.
//!
//! Only the reducer writes to the channel; presentation code gets read access.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSource {
    Queue,
    Case,
    Action,
    Monitoring,
}

impl ErrorSource {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Queue => "queue",
            Self::Case => "case",
            Self::Action => "action",
            Self::Monitoring => "monitoring",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelError {
    pub source: ErrorSource,
    pub message: String,
    /// Position of this error among everything recorded so far, starting at 1.
    pub seq: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorChannel {
    current: Option<ChannelError>,
    recorded: u64,
}

impl ErrorChannel {
    #[must_use]
    pub fn current(&self) -> Option<&ChannelError> {
        self.current.as_ref()
    }

    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.current.as_ref().map(|error| error.message.as_str())
    }

    #[must_use]
    pub fn recorded_count(&self) -> u64 {
        self.recorded
    }

    pub(crate) fn record(&mut self, source: ErrorSource, message: impl Into<String>) {
        self.recorded = self.recorded.saturating_add(1);
        self.current = Some(ChannelError {
            source,
            message: message.into(),
            seq: self.recorded,
        });
    }

    /// Clears the slot if it holds an error raised by `source`.
    pub(crate) fn supersede(&mut self, source: ErrorSource) -> bool {
        if self
            .current
            .as_ref()
            .is_some_and(|error| error.source == source)
        {
            self.current = None;
            return true;
        }
        false
    }
}

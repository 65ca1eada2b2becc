//! Direct notifications sent to participants.

use log::info;
use std::fmt;
use std::sync::{Mutex, PoisonError};

use crate::friends::types::ParticipantId;

/// Text notices the friend graph can send. English only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Added { by: String },
    Removed { by: String },
    Online { who: String },
    Offline { who: String },
    Chat { from: String, text: String },
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::Added { by } => write!(f, "{} added you as a friend.", by),
            Notice::Removed { by } => write!(f, "{} removed you as a friend.", by),
            Notice::Online { who } => write!(f, "{} is now online!", who),
            Notice::Offline { who } => write!(f, "{} is now offline.", who),
            Notice::Chat { from, text } => write!(f, "{}: {}", from, text),
        }
    }
}

/// Fire-and-forget delivery of text to a participant. Implementations must not
/// block on the network; delivery failures are theirs to swallow.
pub trait MessageSink: Send + Sync {
    fn send(&self, to: &ParticipantId, text: &str);
}

/// Sink that only writes notices to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl MessageSink for LogSink {
    fn send(&self, to: &ParticipantId, text: &str) {
        info!(target: "friends::notify", "-> {}: {}", to, text);
    }
}

/// Sink that keeps every message in memory, in send order.
#[derive(Debug, Default)]
pub struct RecordingSink {
    sent: Mutex<Vec<(ParticipantId, String)>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<(ParticipantId, String)> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Return and clear everything recorded so far.
    pub fn take(&self) -> Vec<(ParticipantId, String)> {
        std::mem::take(&mut *self.sent.lock().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn messages_for(&self, to: &str) -> Vec<String> {
        self.messages()
            .into_iter()
            .filter(|(id, _)| id.as_str() == to)
            .map(|(_, text)| text)
            .collect()
    }
}

impl MessageSink for RecordingSink {
    fn send(&self, to: &ParticipantId, text: &str) {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((to.clone(), text.to_string()));
    }
}

//! Orchestrator events
//!
//! Every asynchronous source (user controls, recognition sessions,
//! synthesis sessions, dialog tasks, timers) reports into one channel so
//! the orchestrator sees a single ordered stream.

use crate::error::{RecognitionFailure, RequestFailure};
use tokio::sync::mpsc;

/// Identifies one recognition or narration session
pub type SessionId = u64;

/// User control surface
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Control {
    SubmitText(String),
    ToggleVoiceOutput,
    ToggleWake,
    StartListening,
}

/// Reported by a recognition backend for one session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionEvent {
    Started,
    Transcript(String),
    Error(RecognitionFailure),
    Ended,
}

/// Reported by a synthesis backend for one utterance
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NarrationEvent {
    Started,
    Ended,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Control(Control),
    Recognition {
        session: SessionId,
        event: RecognitionEvent,
    },
    Narration {
        session: SessionId,
        event: NarrationEvent,
    },
    Dialog {
        request: u64,
        result: Result<String, RequestFailure>,
    },
    Timer {
        ticket: u64,
    },
}

pub type EventSender = mpsc::UnboundedSender<Event>;
pub type EventReceiver = mpsc::UnboundedReceiver<Event>;

//! ASR (Automatic Speech Recognition) Module
//!
//! Recognition engines sit behind [`RecognitionBackend`]; the
//! [`Recognizer`] owns the single live session and the wake loop.
//! - Console: typed lines stand in for speech (terminal front-end)

pub mod console;
pub mod recognizer;

use crate::error::RecognitionFailure;
use crate::events::{Event, EventSender, RecognitionEvent, SessionId};
use tracing::debug;

// Re-export main types
pub use console::{ConsoleMic, ConsoleRecognition};
pub use recognizer::{
    match_wake_token, RecognitionMode, RecognitionSession, Recognizer, RecognizerOutcome,
};

/// Reports the events of one recognition session back to the orchestrator
#[derive(Debug, Clone)]
pub struct RecognitionSink {
    session: SessionId,
    events: EventSender,
}

impl RecognitionSink {
    pub fn new(session: SessionId, events: EventSender) -> Self {
        Self { session, events }
    }

    pub fn session(&self) -> SessionId {
        self.session
    }

    pub fn started(&self) {
        self.emit(RecognitionEvent::Started);
    }

    pub fn transcript(&self, text: impl Into<String>) {
        self.emit(RecognitionEvent::Transcript(text.into()));
    }

    pub fn error(&self, failure: RecognitionFailure) {
        self.emit(RecognitionEvent::Error(failure));
    }

    pub fn ended(&self) {
        self.emit(RecognitionEvent::Ended);
    }

    fn emit(&self, event: RecognitionEvent) {
        let session = self.session;
        if self.events.send(Event::Recognition { session, event }).is_err() {
            debug!("Recognition event for session {} dropped: orchestrator gone", session);
        }
    }
}

/// Trait for speech-to-text engines
///
/// A backend runs one listening attempt per `start` call and must report
/// `Ended` exactly once per started session, including after `stop`.
pub trait RecognitionBackend: Send {
    /// Begin a listening attempt reporting into `sink`
    fn start(&mut self, sink: RecognitionSink) -> Result<(), RecognitionFailure>;

    /// Ask the live attempt to finish; it still reports `Ended`
    fn stop(&mut self);

    /// Get the engine name
    fn name(&self) -> &str;
}

//! TTS (Text-to-Speech) Module
//!
//! Synthesis engines sit behind [`SynthesisBackend`]; the [`Speaker`] owns
//! the single live narration and its audio overlay.

use crate::error::SynthesisUnavailable;
use crate::events::{Event, EventSender, NarrationEvent, SessionId};
use tracing::debug;

pub mod speaker;
pub mod system;

pub use speaker::{select_voice, NarrationSession, Speaker, SpeakerOutcome, PREFERRED_VOICES};
pub use system::EspeakEngine;

/// A synthesis voice offered by the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Voice {
    /// Engine-specific identifier
    pub id: String,
    pub name: String,
    /// BCP 47 tag, e.g. `en-US`
    pub lang: String,
}

/// One narration request
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub text: String,
    /// `None` leaves the engine default
    pub voice: Option<Voice>,
    pub pitch: f32,
    pub rate: f32,
    pub volume: f32,
}

/// Reports the progress of one utterance back to the orchestrator
#[derive(Debug, Clone)]
pub struct NarrationSink {
    session: SessionId,
    events: EventSender,
}

impl NarrationSink {
    pub fn new(session: SessionId, events: EventSender) -> Self {
        Self { session, events }
    }

    pub fn session(&self) -> SessionId {
        self.session
    }

    pub fn started(&self) {
        self.emit(NarrationEvent::Started);
    }

    pub fn ended(&self) {
        self.emit(NarrationEvent::Ended);
    }

    pub fn failed(&self, reason: impl Into<String>) {
        self.emit(NarrationEvent::Failed(reason.into()));
    }

    fn emit(&self, event: NarrationEvent) {
        let session = self.session;
        if self.events.send(Event::Narration { session, event }).is_err() {
            debug!("Narration event for session {} dropped: orchestrator gone", session);
        }
    }
}

/// Trait for TTS engines
///
/// `speak` returns once the utterance is queued; the engine reports
/// `Started` and then exactly one of `Ended`/`Failed` through the sink.
pub trait SynthesisBackend: Send {
    /// Voices currently offered by the engine
    fn voices(&self) -> Vec<Voice>;

    fn speak(&mut self, utterance: Utterance, sink: NarrationSink)
        -> Result<(), SynthesisUnavailable>;

    /// Drop the queued and playing utterances
    fn cancel(&mut self);

    /// Get the engine name
    fn name(&self) -> &str;
}

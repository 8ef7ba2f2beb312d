//! Speaker
//!
//! Owns at most one narration. A new narration always cancels the previous
//! one (most recent reply wins); the overlay lives inside the session so it
//! is released whenever the session is dropped.

use super::{NarrationSink, SynthesisBackend, Utterance, Voice};
use crate::audio::{Overlay, OverlayGuard};
use crate::error::SynthesisUnavailable;
use crate::events::{EventSender, NarrationEvent, SessionId};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Voice names tried in order before falling back to the locale
pub const PREFERRED_VOICES: &[&str] = &[
    "Google US English",
    "Google English",
    "Microsoft Zira",
    "English United States",
    "Female",
];

pub const PITCH: f32 = 1.15;
pub const RATE: f32 = 1.02;
pub const VOLUME: f32 = 1.0;

/// Pick the narration voice: preferred names first, then the locale,
/// then whatever the engine offers. `None` means engine default.
pub fn select_voice<'a>(voices: &'a [Voice], locale: &str) -> Option<&'a Voice> {
    PREFERRED_VOICES
        .iter()
        .find_map(|name| voices.iter().find(|v| v.name.contains(name)))
        .or_else(|| voices.iter().find(|v| v.lang.eq_ignore_ascii_case(locale)))
        .or_else(|| voices.first())
}

/// The live utterance and its overlay
#[derive(Debug)]
pub struct NarrationSession {
    pub id: SessionId,
    overlay: Option<OverlayGuard>,
}

impl NarrationSession {
    pub fn has_overlay(&self) -> bool {
        self.overlay.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeakerOutcome {
    Ignored,
    Started,
    Ended,
}

pub struct Speaker {
    backend: Option<Box<dyn SynthesisBackend>>,
    overlay: Option<Arc<dyn Overlay>>,
    events: EventSender,
    locale: String,
    session: Option<NarrationSession>,
    next_id: SessionId,
}

impl Speaker {
    pub fn new(
        backend: Option<Box<dyn SynthesisBackend>>,
        overlay: Option<Arc<dyn Overlay>>,
        events: EventSender,
        locale: &str,
    ) -> Self {
        Self {
            backend,
            overlay,
            events,
            locale: locale.to_string(),
            session: None,
            next_id: 1,
        }
    }

    pub fn is_available(&self) -> bool {
        self.backend.is_some()
    }

    pub fn is_narrating(&self) -> bool {
        self.session.is_some()
    }

    pub fn session(&self) -> Option<&NarrationSession> {
        self.session.as_ref()
    }

    /// Speak `text`, cancelling any live narration first
    pub fn narrate(&mut self, text: &str) -> Result<SessionId, SynthesisUnavailable> {
        self.cancel();

        let backend = self
            .backend
            .as_mut()
            .ok_or_else(|| SynthesisUnavailable("no synthesis engine".to_string()))?;

        let voices = backend.voices();
        let voice = select_voice(&voices, &self.locale).cloned();
        match &voice {
            Some(v) => debug!("Narrating with voice '{}' ({})", v.name, v.lang),
            None => debug!("Narrating with engine default voice"),
        }

        let utterance = Utterance {
            text: text.to_string(),
            voice,
            pitch: PITCH,
            rate: RATE,
            volume: VOLUME,
        };

        let id = self.next_id;
        self.next_id += 1;
        backend.speak(utterance, NarrationSink::new(id, self.events.clone()))?;

        info!("📢 Narration {} queued on {}", id, backend.name());
        self.session = Some(NarrationSession { id, overlay: None });
        Ok(id)
    }

    /// Cancel the live narration; returns whether one was alive
    pub fn cancel(&mut self) -> bool {
        let Some(session) = self.session.take() else {
            return false;
        };

        debug!("Cancelling narration {}", session.id);
        if let Some(backend) = self.backend.as_mut() {
            backend.cancel();
        }
        // Dropping the session fades the overlay out
        drop(session);
        true
    }

    pub fn dispatch(&mut self, id: SessionId, event: NarrationEvent) -> SpeakerOutcome {
        let Some(session) = self.session.as_mut().filter(|s| s.id == id) else {
            debug!("Ignoring {:?} from stale narration {}", event, id);
            return SpeakerOutcome::Ignored;
        };

        match event {
            NarrationEvent::Started => {
                if session.overlay.is_none() {
                    if let Some(overlay) = &self.overlay {
                        match OverlayGuard::engage(overlay) {
                            Ok(guard) => session.overlay = Some(guard),
                            Err(e) => warn!("Overlay unavailable, narrating without it: {}", e),
                        }
                    }
                }
                SpeakerOutcome::Started
            }
            NarrationEvent::Ended => {
                self.session = None;
                SpeakerOutcome::Ended
            }
            NarrationEvent::Failed(reason) => {
                warn!("❌ Narration {} failed: {}", id, reason);
                self.session = None;
                SpeakerOutcome::Ended
            }
        }
    }
}

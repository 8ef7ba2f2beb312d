//! Recognizer
//!
//! Owns at most one live recognition session. The session carries an
//! explicit mode tag and every backend event goes through [`Recognizer::dispatch`],
//! which decides what the transcript means for the current mode.

use super::{RecognitionBackend, RecognitionSink};
use crate::error::RecognitionFailure;
use crate::events::{EventSender, RecognitionEvent, SessionId};
use tracing::{debug, info, warn};

/// What the live session is listening for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecognitionMode {
    /// Single push-to-talk capture
    Command,
    /// Passive probe for the wake token
    WakeProbe,
    /// Command capture right after the wake token
    PostWake,
}

/// Handle to the live listening attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognitionSession {
    pub id: SessionId,
    pub mode: RecognitionMode,
    /// Delivered its result, failed, or was asked to stop; only `Ended` is expected now
    pub settled: bool,
}

/// Loop control for wake mode, checked at the moment of every restart
#[derive(Debug, Clone, Default)]
struct WakeLoop {
    active: bool,
    consecutive_errors: u32,
}

/// Result of dispatching one backend event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognizerOutcome {
    /// Stale session or nothing to act on
    Ignored,
    /// Wake token heard, command capture follows
    WakeDetected,
    /// Wake token and command in one utterance
    WakeWithCommand(String),
    /// User command to send to the model
    Command(String),
    Failed {
        failure: RecognitionFailure,
        mode: RecognitionMode,
        loop_continues: bool,
        loop_aborted: bool,
    },
    /// The session is gone; the caller decides whether to resume
    Ended { mode: RecognitionMode },
}

/// Find the wake token in a transcript (case-insensitive).
///
/// Returns the words following the token, empty when the token stands alone.
pub fn match_wake_token(token: &str, transcript: &str) -> Option<String> {
    let token = token.trim().to_lowercase();
    if token.is_empty() {
        return None;
    }

    let lower = transcript.to_lowercase();
    let idx = lower.find(&token)?;
    let end = idx + token.len();

    // Keep the speaker's casing when lowercasing did not shift byte offsets
    let rest = if lower.len() == transcript.len() && transcript.is_char_boundary(end) {
        &transcript[end..]
    } else {
        &lower[end..]
    };

    Some(
        rest.trim_start_matches(|c: char| c.is_whitespace() || c.is_ascii_punctuation())
            .trim_end()
            .to_string(),
    )
}

pub struct Recognizer {
    backend: Option<Box<dyn RecognitionBackend>>,
    events: EventSender,
    wake_token: String,
    max_consecutive_errors: u32,
    session: Option<RecognitionSession>,
    wake_loop: WakeLoop,
    /// Mode for the next wake-loop session
    resume_mode: RecognitionMode,
    /// Push-to-talk requested while the previous session was still winding down
    queued_command: bool,
    next_id: SessionId,
    started_sessions: u64,
}

impl Recognizer {
    pub fn new(
        backend: Option<Box<dyn RecognitionBackend>>,
        events: EventSender,
        wake_token: &str,
        max_consecutive_errors: u32,
    ) -> Self {
        Self {
            backend,
            events,
            wake_token: wake_token.to_string(),
            max_consecutive_errors: max_consecutive_errors.max(1),
            session: None,
            wake_loop: WakeLoop::default(),
            resume_mode: RecognitionMode::WakeProbe,
            queued_command: false,
            next_id: 1,
            started_sessions: 0,
        }
    }

    pub fn is_supported(&self) -> bool {
        self.backend.is_some()
    }

    pub fn session(&self) -> Option<&RecognitionSession> {
        self.session.as_ref()
    }

    pub fn wake_loop_active(&self) -> bool {
        self.wake_loop.active
    }

    /// Number of sessions started so far
    pub fn started_sessions(&self) -> u64 {
        self.started_sessions
    }

    /// A command capture (push-to-talk or post-wake) is still waiting for speech
    pub fn is_capturing_command(&self) -> bool {
        self.queued_command
            || self.session.as_ref().is_some_and(|s| {
                !s.settled && matches!(s.mode, RecognitionMode::Command | RecognitionMode::PostWake)
            })
    }

    /// Start a single capture, reusing a live wake probe when there is one
    pub fn start_command(&mut self) -> Result<(), RecognitionFailure> {
        if self.backend.is_none() {
            return Err(RecognitionFailure::Unsupported);
        }

        match self.session.as_mut() {
            None => self.start(RecognitionMode::Command),
            Some(session) if session.settled => {
                debug!("Session {} winding down, queueing capture", session.id);
                self.queued_command = true;
                Ok(())
            }
            Some(session) => {
                match session.mode {
                    RecognitionMode::WakeProbe => {
                        debug!("Rebinding wake probe {} to command capture", session.id);
                        session.mode = RecognitionMode::Command;
                    }
                    RecognitionMode::Command | RecognitionMode::PostWake => {
                        debug!("Command capture already in progress");
                    }
                }
                Ok(())
            }
        }
    }

    pub fn enable_wake_loop(&mut self) {
        info!("👂 Wake loop enabled (token: '{}')", self.wake_token);
        self.wake_loop = WakeLoop {
            active: true,
            consecutive_errors: 0,
        };
        self.resume_mode = RecognitionMode::WakeProbe;
    }

    /// Stop the wake loop; the live wake session is stopped, not killed
    pub fn disable_wake_loop(&mut self) {
        info!("🔕 Wake loop disabled");
        self.wake_loop.active = false;
        self.resume_mode = RecognitionMode::WakeProbe;

        if let Some(session) = self.session.as_mut() {
            if !session.settled
                && matches!(session.mode, RecognitionMode::WakeProbe | RecognitionMode::PostWake)
            {
                session.settled = true;
                if let Some(backend) = self.backend.as_mut() {
                    backend.stop();
                }
            }
        }
    }

    /// Pause wake probing while the assistant speaks; resumed via [`Recognizer::resume`]
    pub fn suspend_probe(&mut self) {
        if let Some(session) = self.session.as_mut() {
            if !session.settled && session.mode == RecognitionMode::WakeProbe {
                debug!("Suspending wake probe {}", session.id);
                session.settled = true;
                if let Some(backend) = self.backend.as_mut() {
                    backend.stop();
                }
            }
        }
    }

    /// Start the next session if one is owed: a queued capture, or the wake
    /// loop when it is active and `narrating` is false.
    pub fn resume(&mut self, narrating: bool) -> Result<Option<RecognitionMode>, RecognitionFailure> {
        if self.session.is_some() || self.backend.is_none() {
            return Ok(None);
        }

        if self.queued_command {
            self.queued_command = false;
            self.start(RecognitionMode::Command)?;
            return Ok(Some(RecognitionMode::Command));
        }

        if self.wake_loop.active && !narrating {
            let mode = self.resume_mode;
            if let Err(failure) = self.start(mode) {
                warn!("Wake loop could not restart: {}", failure);
                self.wake_loop.active = false;
                return Err(failure);
            }
            return Ok(Some(mode));
        }

        Ok(None)
    }

    fn start(&mut self, mode: RecognitionMode) -> Result<(), RecognitionFailure> {
        let backend = self
            .backend
            .as_mut()
            .ok_or(RecognitionFailure::Unsupported)?;

        let id = self.next_id;
        self.next_id += 1;
        backend.start(RecognitionSink::new(id, self.events.clone()))?;

        debug!("🎙️ Recognition session {} started ({:?})", id, mode);
        self.started_sessions += 1;
        self.session = Some(RecognitionSession {
            id,
            mode,
            settled: false,
        });
        Ok(())
    }

    /// Single entry point for backend events
    pub fn dispatch(&mut self, id: SessionId, event: RecognitionEvent) -> RecognizerOutcome {
        let Some(session) = self.session.as_mut().filter(|s| s.id == id) else {
            debug!("Ignoring {:?} from stale session {}", event, id);
            return RecognizerOutcome::Ignored;
        };

        match event {
            RecognitionEvent::Started => {
                debug!("Session {} is listening", id);
                RecognizerOutcome::Ignored
            }
            RecognitionEvent::Transcript(text) => {
                if session.settled {
                    debug!("Late transcript on settled session {}: '{}'", id, text);
                    return RecognizerOutcome::Ignored;
                }
                let text = text.trim().to_string();
                info!("📝 Heard: '{}'", text);

                match session.mode {
                    RecognitionMode::Command => {
                        session.settled = true;
                        RecognizerOutcome::Command(text)
                    }
                    RecognitionMode::PostWake => {
                        self.wake_loop.consecutive_errors = 0;
                        session.mode = RecognitionMode::WakeProbe;
                        session.settled = true;
                        RecognizerOutcome::Command(text)
                    }
                    RecognitionMode::WakeProbe => {
                        match match_wake_token(&self.wake_token, &text) {
                            Some(rest) => {
                                self.wake_loop.consecutive_errors = 0;
                                info!("🔔 Wake word detected");
                                if rest.is_empty() {
                                    session.mode = RecognitionMode::PostWake;
                                    RecognizerOutcome::WakeDetected
                                } else {
                                    RecognizerOutcome::WakeWithCommand(rest)
                                }
                            }
                            None => {
                                debug!("No wake word in '{}'", text);
                                RecognizerOutcome::Ignored
                            }
                        }
                    }
                }
            }
            RecognitionEvent::Error(failure) => {
                if session.settled {
                    debug!("Error on settled session {} ignored: {}", id, failure);
                    return RecognizerOutcome::Ignored;
                }
                let mode = session.mode;
                session.settled = true;
                if mode == RecognitionMode::PostWake {
                    session.mode = RecognitionMode::WakeProbe;
                }

                let in_loop = self.wake_loop.active && mode != RecognitionMode::Command;
                let mut loop_continues = false;
                let mut loop_aborted = false;

                if in_loop {
                    // Silence is the normal case for a probe, not a fault
                    if failure != RecognitionFailure::NoSpeech {
                        self.wake_loop.consecutive_errors += 1;
                    }
                    loop_continues = failure.is_transient()
                        && self.wake_loop.consecutive_errors < self.max_consecutive_errors;
                    if !loop_continues {
                        warn!(
                            "Wake loop aborted after '{}' ({} consecutive errors)",
                            failure, self.wake_loop.consecutive_errors
                        );
                        self.wake_loop.active = false;
                        loop_aborted = true;
                    }
                } else {
                    loop_continues = self.wake_loop.active;
                }

                RecognizerOutcome::Failed {
                    failure,
                    mode,
                    loop_continues,
                    loop_aborted,
                }
            }
            RecognitionEvent::Ended => {
                let ended = self.session.take();
                let mode = ended.map(|s| s.mode).unwrap_or(RecognitionMode::Command);
                self.resume_mode = match mode {
                    RecognitionMode::PostWake => RecognitionMode::PostWake,
                    RecognitionMode::Command | RecognitionMode::WakeProbe => {
                        RecognitionMode::WakeProbe
                    }
                };
                debug!("Recognition session {} ended ({:?})", id, mode);
                RecognizerOutcome::Ended { mode }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tokio::sync::mpsc;

    #[derive(Default)]
    struct Calls {
        starts: Vec<SessionId>,
        stops: usize,
    }

    struct FakeBackend(Arc<Mutex<Calls>>);

    impl RecognitionBackend for FakeBackend {
        fn start(&mut self, sink: RecognitionSink) -> Result<(), RecognitionFailure> {
            self.0.lock().unwrap().starts.push(sink.session());
            Ok(())
        }

        fn stop(&mut self) {
            self.0.lock().unwrap().stops += 1;
        }

        fn name(&self) -> &str {
            "fake"
        }
    }

    fn recognizer() -> (Recognizer, Arc<Mutex<Calls>>) {
        let calls = Arc::new(Mutex::new(Calls::default()));
        let (tx, _rx) = mpsc::unbounded_channel();
        let backend = Box::new(FakeBackend(calls.clone()));
        (Recognizer::new(Some(backend), tx, "Aldin", 3), calls)
    }

    fn current(rec: &Recognizer) -> SessionId {
        rec.session().expect("no live session").id
    }

    #[test]
    fn test_match_wake_token() {
        assert_eq!(match_wake_token("aldin", "Aldin"), Some(String::new()));
        assert_eq!(match_wake_token("aldin", "hey ALDIN"), Some(String::new()));
        assert_eq!(
            match_wake_token("aldin", "Aldin, Turn on the lights."),
            Some("Turn on the lights.".to_string())
        );
        assert_eq!(match_wake_token("aldin", "all done"), None);
        assert_eq!(match_wake_token("", "aldin"), None);
    }

    #[test]
    fn test_wake_probe_restarts_after_silence() {
        let (mut rec, calls) = recognizer();
        rec.enable_wake_loop();
        assert_eq!(rec.resume(false), Ok(Some(RecognitionMode::WakeProbe)));

        let id = current(&rec);
        assert_eq!(
            rec.dispatch(id, RecognitionEvent::Ended),
            RecognizerOutcome::Ended {
                mode: RecognitionMode::WakeProbe
            }
        );
        assert_eq!(rec.resume(false), Ok(Some(RecognitionMode::WakeProbe)));
        assert_eq!(calls.lock().unwrap().starts.len(), 2);
    }

    #[test]
    fn test_wake_token_switches_to_post_wake() {
        let (mut rec, _calls) = recognizer();
        rec.enable_wake_loop();
        rec.resume(false).unwrap();

        let id = current(&rec);
        assert_eq!(
            rec.dispatch(id, RecognitionEvent::Transcript("aldin".into())),
            RecognizerOutcome::WakeDetected
        );
        assert!(rec.is_capturing_command());
        rec.dispatch(id, RecognitionEvent::Ended);
        assert_eq!(rec.resume(false), Ok(Some(RecognitionMode::PostWake)));

        let id = current(&rec);
        assert_eq!(
            rec.dispatch(id, RecognitionEvent::Transcript(" turn on the lights ".into())),
            RecognizerOutcome::Command("turn on the lights".into())
        );
        rec.dispatch(id, RecognitionEvent::Ended);
        assert_eq!(rec.resume(false), Ok(Some(RecognitionMode::WakeProbe)));
    }

    #[test]
    fn test_disabled_loop_does_not_rearm() {
        let (mut rec, calls) = recognizer();
        rec.enable_wake_loop();
        rec.resume(false).unwrap();
        let id = current(&rec);

        rec.disable_wake_loop();
        assert_eq!(calls.lock().unwrap().stops, 1);

        rec.dispatch(id, RecognitionEvent::Ended);
        assert_eq!(rec.resume(false), Ok(None));
        assert!(rec.session().is_none());
        assert_eq!(calls.lock().unwrap().starts.len(), 1);
    }

    #[test]
    fn test_stale_session_events_are_ignored() {
        let (mut rec, _calls) = recognizer();
        rec.start_command().unwrap();
        let id = current(&rec);
        assert_eq!(
            rec.dispatch(id + 7, RecognitionEvent::Transcript("hello".into())),
            RecognizerOutcome::Ignored
        );
        assert_eq!(
            rec.dispatch(id, RecognitionEvent::Transcript("hello".into())),
            RecognizerOutcome::Command("hello".into())
        );
        // Single capture delivers exactly one transcript
        assert_eq!(
            rec.dispatch(id, RecognitionEvent::Transcript("again".into())),
            RecognizerOutcome::Ignored
        );
    }

    #[test]
    fn test_push_to_talk_rebinds_live_probe() {
        let (mut rec, calls) = recognizer();
        rec.enable_wake_loop();
        rec.resume(false).unwrap();
        let id = current(&rec);

        rec.start_command().unwrap();
        assert_eq!(calls.lock().unwrap().starts.len(), 1);
        assert_eq!(
            rec.dispatch(id, RecognitionEvent::Transcript("what time is it".into())),
            RecognizerOutcome::Command("what time is it".into())
        );
    }

    #[test]
    fn test_fatal_error_aborts_loop() {
        let (mut rec, _calls) = recognizer();
        rec.enable_wake_loop();
        rec.resume(false).unwrap();
        let id = current(&rec);

        let outcome = rec.dispatch(id, RecognitionEvent::Error(RecognitionFailure::NotAllowed));
        assert!(matches!(
            outcome,
            RecognizerOutcome::Failed {
                loop_continues: false,
                loop_aborted: true,
                ..
            }
        ));
        assert!(!rec.wake_loop_active());
    }

    #[test]
    fn test_repeated_transient_errors_abort_loop() {
        let (mut rec, _calls) = recognizer();
        rec.enable_wake_loop();

        let mut aborted = false;
        for _ in 0..3 {
            rec.resume(false).unwrap();
            let id = current(&rec);
            let outcome = rec.dispatch(
                id,
                RecognitionEvent::Error(RecognitionFailure::Network("offline".into())),
            );
            if let RecognizerOutcome::Failed { loop_aborted, .. } = outcome {
                aborted = loop_aborted;
            }
            rec.dispatch(id, RecognitionEvent::Ended);
        }
        assert!(aborted);
        assert!(!rec.wake_loop_active());
    }

    #[test]
    fn test_no_speech_never_exhausts_loop() {
        let (mut rec, _calls) = recognizer();
        rec.enable_wake_loop();

        for _ in 0..10 {
            rec.resume(false).unwrap();
            let id = current(&rec);
            let outcome = rec.dispatch(id, RecognitionEvent::Error(RecognitionFailure::NoSpeech));
            assert!(matches!(
                outcome,
                RecognizerOutcome::Failed {
                    loop_continues: true,
                    ..
                }
            ));
            rec.dispatch(id, RecognitionEvent::Ended);
        }
        assert!(rec.wake_loop_active());
    }

    #[test]
    fn test_unsupported_without_backend() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut rec = Recognizer::new(None, tx, "aldin", 3);
        assert!(!rec.is_supported());
        assert_eq!(rec.start_command(), Err(RecognitionFailure::Unsupported));
    }
}

//! Voice Interaction Orchestrator
//!
//! Holds the single authoritative [`InteractionState`] and reacts, one
//! event at a time, to user controls, recognition sessions, narration
//! sessions, dialog replies and its own delayed transitions.
//!
//! # Flow
//!
//! ```text
//!  typed text ─┐
//!              ├─► Thinking ──► DialogClient ──► Speaking ──► (settle) ──► Idle
//!  transcript ─┘                     │                                      ▲
//!                                    └──────── failure (diagnostic) ────────┘
//!
//!  wake on:  ListeningWake ──"aldin"──► ListeningCommand ──transcript──► Thinking
//! ```
//!
//! Control flags are advisory: they are read at the moment a session would
//! start or a loop would re-arm. Switching one off never kills an in-flight
//! recognition attempt; it stops it and makes sure nothing re-arms.

mod state;

pub use state::{AvatarClip, ControlFlags, InteractionState, SessionContext};

use crate::asr::{RecognitionBackend, RecognitionMode, Recognizer, RecognizerOutcome};
use crate::audio::Overlay;
use crate::config::Config;
use crate::conversation::ConversationHistory;
use crate::core::DialogClient;
use crate::error::{RecognitionFailure, RequestFailure};
use crate::events::{
    Control, Event, EventReceiver, EventSender, NarrationEvent, RecognitionEvent, SessionId,
};
use crate::presenter::{Notification, Presenter};
use crate::tts::{Speaker, SpeakerOutcome, SynthesisBackend};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Shown when a dialog round-trip fails
pub const DIALOG_ERROR: &str = "There was an error talking to Aldin-Mini.";

pub const RECOGNITION_UNSUPPORTED: &str = "Speech recognition is not supported on this system.";

/// Diagnostic text for a recognition failure, with a remediation hint
pub fn recognition_diagnostic(failure: &RecognitionFailure) -> String {
    match failure {
        RecognitionFailure::Unsupported => RECOGNITION_UNSUPPORTED.to_string(),
        RecognitionFailure::NoSpeech => {
            "Mic error: no-speech. Nothing was heard; start listening again and speak \
             after the listening cue."
                .to_string()
        }
        other => format!(
            "Mic error: {}. Speech recognition is often blocked on insecure origins \
             (for example http://10.x.x.x from another computer). Fix options: \
             (1) use https, (2) open it via http://localhost on the same machine, or \
             (3) mark this origin as secure in the browser's insecure-origin settings.",
            other
        ),
    }
}

/// Everything the orchestrator talks to
pub struct Backends {
    pub recognition: Option<Box<dyn RecognitionBackend>>,
    pub synthesis: Option<Box<dyn SynthesisBackend>>,
    pub overlay: Option<Arc<dyn Overlay>>,
    pub dialog: Arc<dyn DialogClient>,
    pub presenter: Arc<dyn Presenter>,
}

/// Delays of the scheduled transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    /// After narration ends, before returning to rest
    pub settle: Duration,
    /// Length of the greeting clip
    pub greeting: Duration,
}

impl Timing {
    pub fn from_config(config: &Config) -> Self {
        Self {
            settle: Duration::from_millis(config.settle_delay_ms),
            greeting: Duration::from_millis(config.greeting_ms),
        }
    }
}

/// A delayed return to rest; superseded by any newer transition
struct PendingRest {
    ticket: u64,
    timer: JoinHandle<()>,
}

pub struct Orchestrator {
    ctx: SessionContext,
    state: InteractionState,
    recognizer: Recognizer,
    speaker: Speaker,
    dialog: Arc<dyn DialogClient>,
    presenter: Arc<dyn Presenter>,
    events_tx: EventSender,
    events_rx: EventReceiver,
    timing: Timing,
    wake_on_start: bool,
    pending: Option<PendingRest>,
    next_ticket: u64,
    next_request: u64,
    in_flight: usize,
    synthesis_reported: bool,
    /// A transient wake-loop error was already shown in the current streak
    loop_error_reported: bool,
}

impl Orchestrator {
    pub fn new(config: &Config, backends: Backends) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let flags = ControlFlags {
            voice_output_enabled: config.voice_output,
            wake_word_enabled: false,
        };

        let recognizer = Recognizer::new(
            backends.recognition,
            events_tx.clone(),
            &config.wake_word,
            config.max_consecutive_recognition_errors,
        );
        let speaker = Speaker::new(
            backends.synthesis,
            backends.overlay,
            events_tx.clone(),
            &config.locale,
        );

        Self {
            ctx: SessionContext::new(&config.system_prompt, flags),
            state: InteractionState::Greeting,
            recognizer,
            speaker,
            dialog: backends.dialog,
            presenter: backends.presenter,
            events_tx,
            events_rx,
            timing: Timing::from_config(config),
            wake_on_start: config.wake_on_start,
            pending: None,
            next_ticket: 0,
            next_request: 0,
            in_flight: 0,
            synthesis_reported: false,
            loop_error_reported: false,
        }
    }

    /// Channel for external event sources (stdin reader, UI)
    pub fn sender(&self) -> EventSender {
        self.events_tx.clone()
    }

    pub fn state(&self) -> InteractionState {
        self.state
    }

    pub fn history(&self) -> &ConversationHistory {
        &self.ctx.history
    }

    pub fn flags(&self) -> ControlFlags {
        self.ctx.flags
    }

    pub fn recognizer(&self) -> &Recognizer {
        &self.recognizer
    }

    pub fn speaker(&self) -> &Speaker {
        &self.speaker
    }

    /// Dialog requests still waiting for a reply
    pub fn requests_in_flight(&self) -> usize {
        self.in_flight
    }

    /// Play the greeting and schedule its end; arm wake mode if configured
    pub fn start(&mut self) {
        info!("👋 Aldin starting");
        self.notify(Notification::State(self.state));
        self.notify(Notification::Controls(self.ctx.flags));
        self.schedule_rest(self.timing.greeting);

        if self.wake_on_start {
            self.enable_wake();
        }
    }

    /// The greeting clip finished playing
    pub fn finish_greeting(&mut self) {
        if self.state == InteractionState::Greeting {
            self.come_to_rest();
        }
    }

    /// Wait for the next event and handle it; false once all senders are gone
    pub async fn step(&mut self) -> bool {
        match self.events_rx.recv().await {
            Some(event) => {
                self.handle(event);
                true
            }
            None => false,
        }
    }

    /// Handle every event already queued, without waiting
    pub fn drain(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.events_rx.try_recv() {
            self.handle(event);
            handled += 1;
        }
        handled
    }

    pub async fn run(mut self) {
        while self.step().await {}
    }

    pub fn handle(&mut self, event: Event) {
        match event {
            Event::Control(control) => match control {
                Control::SubmitText(text) => self.submit_text(&text),
                Control::ToggleVoiceOutput => self.toggle_voice_output(),
                Control::ToggleWake => self.toggle_wake(),
                Control::StartListening => self.start_listening(),
            },
            Event::Recognition { session, event } => self.on_recognition(session, event),
            Event::Narration { session, event } => self.on_narration(session, event),
            Event::Dialog { request, result } => self.on_dialog(request, result),
            Event::Timer { ticket } => self.on_timer(ticket),
        }
    }

    // --- user controls ---

    pub fn submit_text(&mut self, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            debug!("Ignoring empty submission");
            return;
        }
        self.send_message(text.to_string());
    }

    pub fn toggle_voice_output(&mut self) {
        self.ctx.flags.voice_output_enabled = !self.ctx.flags.voice_output_enabled;
        info!(
            "🔈 Voice output {}",
            if self.ctx.flags.voice_output_enabled { "on" } else { "off" }
        );
        self.notify(Notification::Controls(self.ctx.flags));

        if !self.ctx.flags.voice_output_enabled && self.speaker.cancel() {
            self.come_to_rest();
        }
    }

    pub fn toggle_wake(&mut self) {
        if self.ctx.flags.wake_word_enabled {
            self.disable_wake();
        } else {
            self.enable_wake();
        }
    }

    pub fn start_listening(&mut self) {
        match self.recognizer.start_command() {
            Ok(()) => self.set_state(InteractionState::ListeningCommand),
            Err(failure) => {
                warn!("Could not start listening: {}", failure);
                self.diagnostic(recognition_diagnostic(&failure));
            }
        }
    }

    fn enable_wake(&mut self) {
        if !self.recognizer.is_supported() {
            self.diagnostic(RECOGNITION_UNSUPPORTED.to_string());
            return;
        }

        self.ctx.flags.wake_word_enabled = true;
        self.loop_error_reported = false;
        self.notify(Notification::Controls(self.ctx.flags));
        self.recognizer.enable_wake_loop();
        self.resume_listening();

        if matches!(
            self.state,
            InteractionState::Idle | InteractionState::ListeningWake
        ) {
            let state = self.rest_state();
            self.set_state(state);
        }
    }

    fn disable_wake(&mut self) {
        self.ctx.flags.wake_word_enabled = false;
        self.notify(Notification::Controls(self.ctx.flags));
        self.recognizer.disable_wake_loop();

        if self.state.is_listening() {
            let state = self.rest_state();
            self.set_state(state);
        }
    }

    // --- dialog ---

    fn send_message(&mut self, text: String) {
        let turn = self.ctx.history.push_user(text).clone();
        self.notify(Notification::Turn(turn));
        self.set_state(InteractionState::Thinking);

        self.next_request += 1;
        self.in_flight += 1;
        let request = self.next_request;
        let history = self.ctx.history.turns().to_vec();
        let dialog = Arc::clone(&self.dialog);
        let events = self.events_tx.clone();

        debug!("🧠 Request {} with {} turns", request, history.len());
        tokio::spawn(async move {
            let result = dialog.complete(&history).await;
            let _ = events.send(Event::Dialog { request, result });
        });
    }

    fn on_dialog(&mut self, request: u64, result: Result<String, RequestFailure>) {
        self.in_flight = self.in_flight.saturating_sub(1);

        match result {
            Ok(reply) => {
                info!("💬 Reply for request {}", request);
                let turn = self.ctx.history.push_assistant(reply).clone();
                let text = turn.content.clone();
                self.notify(Notification::Turn(turn));
                self.set_state(InteractionState::Speaking);
                self.narrate(&text);
            }
            Err(failure) => {
                warn!("❌ Request {} failed: {}", request, failure);
                self.diagnostic(DIALOG_ERROR.to_string());
                if self.state == InteractionState::Thinking && self.in_flight == 0 {
                    self.come_to_rest();
                }
            }
        }
    }

    // --- narration ---

    fn narrate(&mut self, text: &str) {
        if !self.ctx.flags.voice_output_enabled {
            self.schedule_rest(self.timing.settle);
            return;
        }

        match self.speaker.narrate(text) {
            Ok(_) => self.recognizer.suspend_probe(),
            Err(unavailable) => {
                if self.synthesis_reported {
                    warn!("{}", unavailable);
                } else {
                    self.synthesis_reported = true;
                    self.diagnostic(format!("Voice output is unavailable ({}).", unavailable.0));
                }
                self.schedule_rest(self.timing.settle);
            }
        }
    }

    fn on_narration(&mut self, session: SessionId, event: NarrationEvent) {
        match self.speaker.dispatch(session, event) {
            SpeakerOutcome::Ignored => {}
            SpeakerOutcome::Started => {
                // A newer request or capture owns the visible state
                if self.in_flight == 0 && !self.recognizer.is_capturing_command() {
                    self.set_state(InteractionState::Speaking);
                }
            }
            SpeakerOutcome::Ended => {
                // The probe re-arms with the narration gone, independent of the settle delay
                self.resume_listening();
                self.schedule_rest(self.timing.settle);
            }
        }
    }

    // --- recognition ---

    fn on_recognition(&mut self, session: SessionId, event: RecognitionEvent) {
        match self.recognizer.dispatch(session, event) {
            RecognizerOutcome::Ignored => {}
            RecognizerOutcome::WakeDetected => {
                self.loop_error_reported = false;
                self.set_state(InteractionState::ListeningCommand);
            }
            RecognizerOutcome::WakeWithCommand(text) => {
                self.loop_error_reported = false;
                self.set_state(InteractionState::ListeningCommand);
                self.send_message(text);
            }
            RecognizerOutcome::Command(text) => {
                self.loop_error_reported = false;
                if text.is_empty() {
                    debug!("Empty transcript, nothing to send");
                    self.rest_if_listening();
                } else {
                    self.send_message(text);
                }
            }
            RecognizerOutcome::Failed {
                failure,
                mode,
                loop_continues,
                loop_aborted,
            } => {
                if loop_aborted {
                    self.wake_loop_stopped();
                }
                let in_loop = mode != RecognitionMode::Command && loop_continues;
                if in_loop && failure == RecognitionFailure::NoSpeech {
                    debug!("Wake probe heard nothing");
                } else if in_loop && self.loop_error_reported {
                    debug!("Wake loop error repeated: {}", failure);
                } else {
                    warn!("🎙️ Recognition failed: {}", failure);
                    self.diagnostic(recognition_diagnostic(&failure));
                    // One diagnostic per error streak while the loop keeps going
                    self.loop_error_reported = in_loop;
                }
                self.rest_if_listening();
            }
            RecognizerOutcome::Ended { .. } => {
                self.resume_listening();
                self.rest_if_listening();
            }
        }
    }

    /// Start whatever recognition session is owed (queued capture or wake loop)
    fn resume_listening(&mut self) {
        let loop_was_active = self.recognizer.wake_loop_active();
        if let Err(failure) = self.recognizer.resume(self.speaker.is_narrating()) {
            if loop_was_active && !self.recognizer.wake_loop_active() {
                self.wake_loop_stopped();
            }
            self.diagnostic(recognition_diagnostic(&failure));
        }
    }

    fn wake_loop_stopped(&mut self) {
        if self.ctx.flags.wake_word_enabled {
            self.ctx.flags.wake_word_enabled = false;
            self.notify(Notification::Controls(self.ctx.flags));
        }
    }

    // --- state ---

    /// Where the machine settles when nothing is in progress
    fn rest_state(&self) -> InteractionState {
        if self.recognizer.is_capturing_command() {
            InteractionState::ListeningCommand
        } else if self.in_flight > 0 {
            InteractionState::Thinking
        } else if self.recognizer.wake_loop_active() {
            InteractionState::ListeningWake
        } else {
            InteractionState::Idle
        }
    }

    fn come_to_rest(&mut self) {
        self.resume_listening();
        let state = self.rest_state();
        self.set_state(state);
    }

    fn rest_if_listening(&mut self) {
        if self.state.is_listening() {
            let state = self.rest_state();
            self.set_state(state);
        }
    }

    /// Every transition supersedes a pending delayed one
    fn set_state(&mut self, state: InteractionState) {
        self.cancel_pending();
        if self.state != state {
            debug!("State {:?} -> {:?}", self.state, state);
            self.state = state;
            self.notify(Notification::State(state));
        }
    }

    fn schedule_rest(&mut self, delay: Duration) {
        self.cancel_pending();
        self.next_ticket += 1;
        let ticket = self.next_ticket;
        let events = self.events_tx.clone();
        let timer = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = events.send(Event::Timer { ticket });
        });
        self.pending = Some(PendingRest { ticket, timer });
    }

    fn cancel_pending(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.timer.abort();
        }
    }

    fn on_timer(&mut self, ticket: u64) {
        match &self.pending {
            Some(pending) if pending.ticket == ticket => {
                self.pending = None;
                self.come_to_rest();
            }
            _ => debug!("Stale timer {} ignored", ticket),
        }
    }

    // --- presenter ---

    fn diagnostic(&self, text: String) {
        self.notify(Notification::Diagnostic(text));
    }

    fn notify(&self, notification: Notification) {
        self.presenter.notify(&notification);
    }
}

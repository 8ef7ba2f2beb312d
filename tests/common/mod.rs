#![allow(dead_code)]

pub mod mock_asr;
pub mod mock_dialog;
pub mod mock_tts;

use aldin::audio::{Overlay, OverlayId};
use aldin::config::Config;
use aldin::error::AldinResult;
use aldin::orchestrator::{Backends, InteractionState, Orchestrator};
use aldin::presenter::{Notification, Presenter};
use mock_asr::{MockMic, MockRecognition};
use mock_dialog::ScriptedDialog;
use mock_tts::{MockSynthesis, MockVoice};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Records every notification
#[derive(Default)]
pub struct RecordingPresenter {
    pub seen: Mutex<Vec<Notification>>,
}

impl RecordingPresenter {
    pub fn states(&self) -> Vec<InteractionState> {
        self.seen
            .lock()
            .unwrap()
            .iter()
            .filter_map(|n| match n {
                Notification::State(state) => Some(*state),
                _ => None,
            })
            .collect()
    }

    pub fn diagnostics(&self) -> Vec<String> {
        self.seen
            .lock()
            .unwrap()
            .iter()
            .filter_map(|n| match n {
                Notification::Diagnostic(text) => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.seen.lock().unwrap().clear();
    }
}

impl Presenter for RecordingPresenter {
    fn notify(&self, notification: &Notification) {
        self.seen.lock().unwrap().push(notification.clone());
    }
}

/// Overlay that only counts engage/release pairs
#[derive(Default)]
pub struct CountingOverlay {
    engaged: Mutex<Vec<OverlayId>>,
    released: Mutex<Vec<OverlayId>>,
}

impl CountingOverlay {
    pub fn engaged(&self) -> usize {
        self.engaged.lock().unwrap().len()
    }

    pub fn released(&self) -> usize {
        self.released.lock().unwrap().len()
    }

    /// Instances engaged and not yet released
    pub fn playing(&self) -> usize {
        self.engaged() - self.released()
    }
}

impl Overlay for CountingOverlay {
    fn engage(&self) -> AldinResult<OverlayId> {
        let mut engaged = self.engaged.lock().unwrap();
        let id = engaged.len() as OverlayId + 1;
        engaged.push(id);
        Ok(id)
    }

    fn release(&self, id: OverlayId) {
        self.released.lock().unwrap().push(id);
    }
}

/// Short delays so timer-driven transitions finish quickly
pub fn test_config() -> Config {
    Config {
        settle_delay_ms: 10,
        greeting_ms: 60_000,
        ..Config::default()
    }
}

/// Orchestrator wired to mock backends
pub struct Harness {
    pub orch: Orchestrator,
    pub mic: MockMic,
    pub voice: MockVoice,
    pub dialog: Arc<ScriptedDialog>,
    pub presenter: Arc<RecordingPresenter>,
    pub overlay: Arc<CountingOverlay>,
}

impl Harness {
    pub fn new(dialog: ScriptedDialog) -> Self {
        Self::with_config(test_config(), dialog)
    }

    /// Started and past the greeting, resting in Idle
    pub fn ready(dialog: ScriptedDialog) -> Self {
        let mut harness = Self::new(dialog);
        harness.orch.start();
        harness.orch.finish_greeting();
        harness.orch.drain();
        harness
    }

    pub fn with_config(config: Config, dialog: ScriptedDialog) -> Self {
        let (recognition, mic) = MockRecognition::new();
        let (synthesis, voice) = MockSynthesis::new();
        let dialog = Arc::new(dialog);
        let presenter = Arc::new(RecordingPresenter::default());
        let overlay = Arc::new(CountingOverlay::default());

        let backends = Backends {
            recognition: Some(Box::new(recognition)),
            synthesis: Some(Box::new(synthesis)),
            overlay: Some(overlay.clone()),
            dialog: dialog.clone(),
            presenter: presenter.clone(),
        };

        Self {
            orch: Orchestrator::new(&config, backends),
            mic,
            voice,
            dialog,
            presenter,
            overlay,
        }
    }

    /// Handle queued events, then wait for more until `done` holds
    pub async fn run_until(&mut self, done: impl Fn(&Orchestrator) -> bool) {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        loop {
            self.orch.drain();
            if done(&self.orch) {
                return;
            }
            let stepped = tokio::time::timeout_at(deadline, self.orch.step()).await;
            assert!(
                stepped.is_ok(),
                "timed out waiting, state is {:?}",
                self.orch.state()
            );
        }
    }

    pub async fn run_until_state(&mut self, state: InteractionState) {
        self.run_until(move |orch| orch.state() == state).await;
    }

    /// Wait for the in-flight dialog replies
    pub async fn await_replies(&mut self) {
        self.run_until(|orch| orch.requests_in_flight() == 0).await;
    }
}

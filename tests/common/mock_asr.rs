//! Mock recognition backend for testing
//!
//! The test plays the user's voice through [`MockMic`]; every event is
//! pushed straight into the orchestrator channel.

use aldin::asr::{RecognitionBackend, RecognitionSink};
use aldin::error::RecognitionFailure;
use std::sync::{Arc, Mutex};

#[derive(Default)]
pub struct MicState {
    live: Option<RecognitionSink>,
    /// Sessions started, in order
    pub started: Vec<u64>,
    pub stops: usize,
    /// Refuse the next `start` with this failure
    pub fail_next_start: Option<RecognitionFailure>,
}

pub struct MockRecognition {
    state: Arc<Mutex<MicState>>,
}

/// Test-side handle on the mock microphone
#[derive(Clone)]
pub struct MockMic {
    state: Arc<Mutex<MicState>>,
}

impl MockRecognition {
    pub fn new() -> (Self, MockMic) {
        let state = Arc::new(Mutex::new(MicState::default()));
        (
            Self {
                state: state.clone(),
            },
            MockMic { state },
        )
    }
}

impl MockMic {
    fn take_live(&self) -> RecognitionSink {
        self.state
            .lock()
            .unwrap()
            .live
            .take()
            .expect("no recognition session is listening")
    }

    /// The user says `text`; the session then ends
    pub fn say(&self, text: &str) {
        let sink = self.take_live();
        sink.transcript(text);
        sink.ended();
    }

    /// Nothing was said before the engine gave up
    pub fn silence(&self) {
        self.fail(RecognitionFailure::NoSpeech);
    }

    pub fn fail(&self, failure: RecognitionFailure) {
        let sink = self.take_live();
        sink.error(failure);
        sink.ended();
    }

    pub fn is_listening(&self) -> bool {
        self.state.lock().unwrap().live.is_some()
    }

    pub fn starts(&self) -> usize {
        self.state.lock().unwrap().started.len()
    }

    pub fn stops(&self) -> usize {
        self.state.lock().unwrap().stops
    }

    pub fn fail_next_start(&self, failure: RecognitionFailure) {
        self.state.lock().unwrap().fail_next_start = Some(failure);
    }
}

impl RecognitionBackend for MockRecognition {
    fn start(&mut self, sink: RecognitionSink) -> Result<(), RecognitionFailure> {
        let mut state = self.state.lock().unwrap();
        if let Some(failure) = state.fail_next_start.take() {
            return Err(failure);
        }
        assert!(
            state.live.is_none(),
            "two recognition sessions alive at once"
        );
        state.started.push(sink.session());
        sink.started();
        state.live = Some(sink);
        Ok(())
    }

    fn stop(&mut self) {
        let mut state = self.state.lock().unwrap();
        state.stops += 1;
        if let Some(sink) = state.live.take() {
            sink.ended();
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}

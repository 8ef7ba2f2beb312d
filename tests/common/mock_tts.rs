//! Mock TTS engine for testing
//!
//! Records every utterance; the test decides when narration finishes.

use aldin::error::SynthesisUnavailable;
use aldin::tts::{NarrationSink, SynthesisBackend, Utterance, Voice};
use std::sync::{Arc, Mutex};

#[derive(Default)]
pub struct SpeechState {
    live: Option<NarrationSink>,
    pub spoken: Vec<Utterance>,
    pub cancels: usize,
}

pub struct MockSynthesis {
    state: Arc<Mutex<SpeechState>>,
    voices: Vec<Voice>,
}

#[derive(Clone)]
pub struct MockVoice {
    state: Arc<Mutex<SpeechState>>,
}

impl MockSynthesis {
    pub fn new() -> (Self, MockVoice) {
        let state = Arc::new(Mutex::new(SpeechState::default()));
        let voices = vec![
            Voice {
                id: "daniel".to_string(),
                name: "Daniel".to_string(),
                lang: "en-GB".to_string(),
            },
            Voice {
                id: "google-us".to_string(),
                name: "Google US English".to_string(),
                lang: "en-US".to_string(),
            },
        ];
        (
            Self {
                state: state.clone(),
                voices,
            },
            MockVoice { state },
        )
    }
}

impl MockVoice {
    /// The live utterance plays to the end
    pub fn finish(&self) {
        let sink = self
            .state
            .lock()
            .unwrap()
            .live
            .take()
            .expect("nothing is being narrated");
        sink.ended();
    }

    pub fn is_speaking(&self) -> bool {
        self.state.lock().unwrap().live.is_some()
    }

    pub fn spoken(&self) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .spoken
            .iter()
            .map(|u| u.text.clone())
            .collect()
    }

    pub fn last_utterance(&self) -> Option<Utterance> {
        self.state.lock().unwrap().spoken.last().cloned()
    }

    pub fn cancels(&self) -> usize {
        self.state.lock().unwrap().cancels
    }
}

impl SynthesisBackend for MockSynthesis {
    fn voices(&self) -> Vec<Voice> {
        self.voices.clone()
    }

    fn speak(
        &mut self,
        utterance: Utterance,
        sink: NarrationSink,
    ) -> Result<(), SynthesisUnavailable> {
        let mut state = self.state.lock().unwrap();
        assert!(state.live.is_none(), "two narrations alive at once");
        state.spoken.push(utterance);
        sink.started();
        state.live = Some(sink);
        Ok(())
    }

    fn cancel(&mut self) {
        let mut state = self.state.lock().unwrap();
        if let Some(sink) = state.live.take() {
            state.cancels += 1;
            sink.ended();
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}

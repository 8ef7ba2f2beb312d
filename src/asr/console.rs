//! Console recognition backend
//!
//! Stands in for a microphone in the terminal front-end: while a session
//! is live, the next line typed on stdin is delivered as the transcript.
//! A session with no input ends with `no-speech` after a timeout, the way
//! browser engines end an attempt after a period of silence.

use super::{RecognitionBackend, RecognitionSink};
use crate::error::RecognitionFailure;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

struct LiveCapture {
    sink: RecognitionSink,
    silence_timer: JoinHandle<()>,
}

type Slot = Arc<Mutex<Option<LiveCapture>>>;

/// Recognition backend fed by [`ConsoleMic`]
pub struct ConsoleRecognition {
    slot: Slot,
    no_speech_timeout: Duration,
}

/// Input side shared with the stdin reader
#[derive(Clone)]
pub struct ConsoleMic {
    slot: Slot,
}

impl ConsoleRecognition {
    pub fn new(no_speech_timeout: Duration) -> (Self, ConsoleMic) {
        let slot: Slot = Arc::new(Mutex::new(None));
        (
            Self {
                slot: slot.clone(),
                no_speech_timeout,
            },
            ConsoleMic { slot },
        )
    }
}

impl ConsoleMic {
    /// Deliver `line` to the live session; false when nobody is listening
    pub fn offer(&self, line: &str) -> bool {
        let live = match self.slot.lock() {
            Ok(mut slot) => slot.take(),
            Err(_) => None,
        };

        match live {
            Some(capture) => {
                capture.silence_timer.abort();
                capture.sink.transcript(line);
                capture.sink.ended();
                true
            }
            None => false,
        }
    }

    pub fn is_listening(&self) -> bool {
        self.slot.lock().map(|slot| slot.is_some()).unwrap_or(false)
    }
}

impl RecognitionBackend for ConsoleRecognition {
    fn start(&mut self, sink: RecognitionSink) -> Result<(), RecognitionFailure> {
        let mut slot = self
            .slot
            .lock()
            .map_err(|e| RecognitionFailure::Backend(e.to_string()))?;
        if slot.is_some() {
            return Err(RecognitionFailure::Backend(
                "recognition already started".to_string(),
            ));
        }

        let session = sink.session();
        let timer_slot = self.slot.clone();
        let timeout = self.no_speech_timeout;
        let silence_timer = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            let expired = match timer_slot.lock() {
                Ok(mut slot) if slot.as_ref().map(|c| c.sink.session()) == Some(session) => {
                    slot.take()
                }
                _ => None,
            };
            if let Some(capture) = expired {
                debug!("Console session {} heard nothing", session);
                capture.sink.error(RecognitionFailure::NoSpeech);
                capture.sink.ended();
            }
        });

        sink.started();
        *slot = Some(LiveCapture {
            sink,
            silence_timer,
        });
        Ok(())
    }

    fn stop(&mut self) {
        let live = match self.slot.lock() {
            Ok(mut slot) => slot.take(),
            Err(_) => None,
        };
        if let Some(capture) = live {
            capture.silence_timer.abort();
            capture.sink.ended();
        }
    }

    fn name(&self) -> &str {
        "console"
    }
}

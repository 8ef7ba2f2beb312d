//! Overlay engine
//!
//! Uses a channel-based architecture to handle rodio's non-Send stream.
//! The engine spawns a dedicated audio thread that owns the output stream
//! and one sink per engaged overlay.

use super::texture::{GainTarget, OverlayTexture, OVERLAY_GAIN, TEARDOWN_AFTER};
use super::{Overlay, OverlayId};
use crate::error::{AldinError, AldinResult};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// How often the audio thread checks for finished fades
const TICK: Duration = Duration::from_millis(50);

/// Commands sent to the audio thread
enum OverlayCommand {
    Engage(OverlayId),
    Release(OverlayId),
}

struct Playing {
    sink: rodio::Sink,
    gain: GainTarget,
    teardown_at: Option<Instant>,
}

/// Thread-safe handle to the overlay audio thread
pub struct OverlayEngine {
    sender: mpsc::Sender<OverlayCommand>,
    next_id: AtomicU64,
}

impl std::fmt::Debug for OverlayEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OverlayEngine").finish()
    }
}

impl OverlayEngine {
    pub fn new() -> AldinResult<Self> {
        let (sender, receiver) = mpsc::channel::<OverlayCommand>();

        thread::Builder::new()
            .name("aldin-overlay".to_string())
            .spawn(move || Self::audio_thread(receiver))?;

        Ok(Self {
            sender,
            next_id: AtomicU64::new(1),
        })
    }

    fn audio_thread(receiver: mpsc::Receiver<OverlayCommand>) {
        use rodio::OutputStream;

        // Initialize audio output on this thread
        let (stream, stream_handle) = match OutputStream::try_default() {
            Ok(s) => s,
            Err(e) => {
                warn!("🔇 Failed to initialize overlay output: {}", e);
                return;
            }
        };

        // Keep stream alive
        let _stream = stream;
        let mut voices: HashMap<OverlayId, Playing> = HashMap::new();

        info!("🔊 Overlay thread started");

        loop {
            match receiver.recv_timeout(TICK) {
                Ok(OverlayCommand::Engage(id)) => {
                    let sink = match rodio::Sink::try_new(&stream_handle) {
                        Ok(s) => s,
                        Err(e) => {
                            error!("❌ Failed to create overlay sink: {}", e);
                            continue;
                        }
                    };
                    let gain = GainTarget::new(OVERLAY_GAIN);
                    sink.append(OverlayTexture::new(gain.clone()));
                    debug!("Overlay {} playing", id);
                    voices.insert(
                        id,
                        Playing {
                            sink,
                            gain,
                            teardown_at: None,
                        },
                    );
                }
                Ok(OverlayCommand::Release(id)) => {
                    if let Some(voice) = voices.get_mut(&id) {
                        voice.gain.set(0.0);
                        voice.teardown_at = Some(Instant::now() + TEARDOWN_AFTER);
                    }
                }
                Err(mpsc::RecvTimeoutError::Timeout) => {}
                Err(mpsc::RecvTimeoutError::Disconnected) => break,
            }

            let now = Instant::now();
            voices.retain(|id, voice| match voice.teardown_at {
                Some(at) if at <= now => {
                    voice.sink.stop();
                    debug!("Overlay {} torn down", id);
                    false
                }
                _ => true,
            });
        }

        for voice in voices.values() {
            voice.sink.stop();
        }
        info!("🔇 Overlay thread stopped");
    }
}

impl Overlay for OverlayEngine {
    fn engage(&self) -> AldinResult<OverlayId> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.sender
            .send(OverlayCommand::Engage(id))
            .map_err(|e| AldinError::Audio(format!("Overlay thread disconnected: {}", e)))?;
        Ok(id)
    }

    fn release(&self, id: OverlayId) {
        if self.sender.send(OverlayCommand::Release(id)).is_err() {
            debug!("Overlay thread gone, nothing to release for {}", id);
        }
    }
}

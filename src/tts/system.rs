//! System TTS engine driving `espeak-ng`

use super::{NarrationSink, SynthesisBackend, Utterance, Voice};
use crate::error::SynthesisUnavailable;
use std::process::Stdio;
use tokio::process::Command;
use tokio::sync::oneshot;
use tracing::{debug, warn};

const BINARY: &str = "espeak-ng";

/// espeak-ng defaults: pitch 50 (0-99), 175 words per minute, amplitude 100
const BASE_PITCH: f32 = 50.0;
const BASE_WPM: f32 = 175.0;
const BASE_AMPLITUDE: f32 = 100.0;

#[derive(Debug)]
pub struct EspeakEngine {
    voices: Vec<Voice>,
    cancel: Option<oneshot::Sender<()>>,
}

impl EspeakEngine {
    /// Probe `espeak-ng` and read its voice list
    pub fn detect() -> Result<Self, SynthesisUnavailable> {
        let output = std::process::Command::new(BINARY)
            .arg("--voices")
            .stderr(Stdio::null())
            .output()
            .map_err(|e| SynthesisUnavailable(format!("{} not runnable: {}", BINARY, e)))?;

        let voices = parse_voice_list(&String::from_utf8_lossy(&output.stdout));
        debug!("{} offers {} voices", BINARY, voices.len());
        Ok(Self {
            voices,
            cancel: None,
        })
    }

    fn args(utterance: &Utterance) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(voice) = &utterance.voice {
            args.push("-v".to_string());
            args.push(voice.id.clone());
        }
        args.push("-p".to_string());
        args.push(((BASE_PITCH * utterance.pitch).round().clamp(0.0, 99.0) as u32).to_string());
        args.push("-s".to_string());
        args.push(((BASE_WPM * utterance.rate).round() as u32).to_string());
        args.push("-a".to_string());
        args.push(
            ((BASE_AMPLITUDE * utterance.volume).round().clamp(0.0, 200.0) as u32).to_string(),
        );
        args.push("--".to_string());
        args.push(utterance.text.clone());
        args
    }
}

/// Parse `espeak-ng --voices` output:
/// `Pty Language Age/Gender VoiceName File Other Languages`
pub fn parse_voice_list(output: &str) -> Vec<Voice> {
    output
        .lines()
        .skip(1)
        .filter_map(|line| {
            let cols: Vec<&str> = line.split_whitespace().collect();
            if cols.len() < 4 {
                return None;
            }
            let lang = normalize_lang(cols[1]);
            Some(Voice {
                id: cols[1].to_string(),
                name: cols[3].replace('_', " "),
                lang,
            })
        })
        .collect()
}

/// `en-us` -> `en-US`
fn normalize_lang(tag: &str) -> String {
    match tag.split_once('-') {
        Some((lang, region)) if region.len() == 2 => {
            format!("{}-{}", lang, region.to_uppercase())
        }
        _ => tag.to_string(),
    }
}

impl SynthesisBackend for EspeakEngine {
    fn voices(&self) -> Vec<Voice> {
        self.voices.clone()
    }

    fn speak(
        &mut self,
        utterance: Utterance,
        sink: NarrationSink,
    ) -> Result<(), SynthesisUnavailable> {
        self.cancel();

        let mut child = Command::new(BINARY)
            .args(Self::args(&utterance))
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| SynthesisUnavailable(format!("failed to spawn {}: {}", BINARY, e)))?;

        let (cancel_tx, cancel_rx) = oneshot::channel();
        self.cancel = Some(cancel_tx);

        sink.started();
        tokio::spawn(async move {
            tokio::select! {
                status = child.wait() => match status {
                    Ok(status) if status.success() => sink.ended(),
                    Ok(status) => sink.failed(format!("{} exited with {}", BINARY, status)),
                    Err(e) => sink.failed(e.to_string()),
                },
                _ = cancel_rx => {
                    if let Err(e) = child.kill().await {
                        warn!("Failed to stop {}: {}", BINARY, e);
                    }
                    sink.ended();
                }
            }
        });
        Ok(())
    }

    fn cancel(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            let _ = cancel.send(());
        }
    }

    fn name(&self) -> &str {
        "espeak-ng"
    }
}

//! Overlay texture generator
//!
//! Sawtooth at 118 Hz plus looped white noise through a 950 Hz band-pass,
//! summed into a gain envelope and high-passed at 140 Hz.

use rand::Rng;
use std::f32::consts::PI;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub const SAMPLE_RATE: u32 = 48_000;
/// Peak gain of the texture
pub const OVERLAY_GAIN: f32 = 0.03;
pub const FADE_IN: Duration = Duration::from_millis(80);
pub const FADE_OUT: Duration = Duration::from_millis(120);
/// The sink is torn down this long after release, once the fade is done
pub const TEARDOWN_AFTER: Duration = Duration::from_millis(200);

const TONE_HZ: f32 = 118.0;
const NOISE_AMPLITUDE: f32 = 0.12;
const NOISE_SECONDS: usize = 2;
const BANDPASS_HZ: f32 = 950.0;
const BANDPASS_Q: f32 = 0.9;
const HIGHPASS_HZ: f32 = 140.0;
const HIGHPASS_Q: f32 = std::f32::consts::FRAC_1_SQRT_2;

/// RBJ cookbook biquad, direct form I
#[derive(Debug, Clone)]
struct Biquad {
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,
    x1: f32,
    x2: f32,
    y1: f32,
    y2: f32,
}

impl Biquad {
    fn from_coefficients(b: [f32; 3], a: [f32; 3]) -> Self {
        Self {
            b0: b[0] / a[0],
            b1: b[1] / a[0],
            b2: b[2] / a[0],
            a1: a[1] / a[0],
            a2: a[2] / a[0],
            x1: 0.0,
            x2: 0.0,
            y1: 0.0,
            y2: 0.0,
        }
    }

    fn bandpass(freq: f32, q: f32, sample_rate: f32) -> Self {
        let w0 = 2.0 * PI * freq / sample_rate;
        let alpha = w0.sin() / (2.0 * q);
        let cos = w0.cos();
        Self::from_coefficients(
            [alpha, 0.0, -alpha],
            [1.0 + alpha, -2.0 * cos, 1.0 - alpha],
        )
    }

    fn highpass(freq: f32, q: f32, sample_rate: f32) -> Self {
        let w0 = 2.0 * PI * freq / sample_rate;
        let alpha = w0.sin() / (2.0 * q);
        let cos = w0.cos();
        Self::from_coefficients(
            [(1.0 + cos) / 2.0, -(1.0 + cos), (1.0 + cos) / 2.0],
            [1.0 + alpha, -2.0 * cos, 1.0 - alpha],
        )
    }

    fn process(&mut self, x: f32) -> f32 {
        let y = self.b0 * x + self.b1 * self.x1 + self.b2 * self.x2
            - self.a1 * self.y1
            - self.a2 * self.y2;
        self.x2 = self.x1;
        self.x1 = x;
        self.y2 = self.y1;
        self.y1 = y;
        y
    }
}

/// Shared gain target; the texture ramps toward it sample by sample
#[derive(Debug, Clone)]
pub struct GainTarget(Arc<AtomicU32>);

impl GainTarget {
    pub fn new(value: f32) -> Self {
        Self(Arc::new(AtomicU32::new(value.to_bits())))
    }

    pub fn set(&self, value: f32) {
        self.0.store(value.to_bits(), Ordering::Relaxed);
    }

    pub fn get(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }
}

/// Endless mono source producing the overlay
pub struct OverlayTexture {
    sample_rate: u32,
    phase: f32,
    phase_step: f32,
    noise: Vec<f32>,
    noise_pos: usize,
    bandpass: Biquad,
    highpass: Biquad,
    gain: f32,
    target: GainTarget,
    attack_step: f32,
    release_step: f32,
}

impl OverlayTexture {
    /// New texture at zero gain, ramping toward `target`
    pub fn new(target: GainTarget) -> Self {
        Self::with_sample_rate(target, SAMPLE_RATE)
    }

    pub fn with_sample_rate(target: GainTarget, sample_rate: u32) -> Self {
        let rate = sample_rate as f32;
        let mut rng = rand::thread_rng();
        let noise = (0..NOISE_SECONDS * sample_rate as usize)
            .map(|_| rng.gen_range(-1.0f32..1.0) * NOISE_AMPLITUDE)
            .collect();

        Self {
            sample_rate,
            phase: 0.0,
            phase_step: TONE_HZ / rate,
            noise,
            noise_pos: 0,
            bandpass: Biquad::bandpass(BANDPASS_HZ, BANDPASS_Q, rate),
            highpass: Biquad::highpass(HIGHPASS_HZ, HIGHPASS_Q, rate),
            gain: 0.0,
            target,
            attack_step: OVERLAY_GAIN / (FADE_IN.as_secs_f32() * rate),
            release_step: OVERLAY_GAIN / (FADE_OUT.as_secs_f32() * rate),
        }
    }

    pub fn current_gain(&self) -> f32 {
        self.gain
    }

    fn advance_gain(&mut self) {
        let target = self.target.get();
        if self.gain < target {
            self.gain = (self.gain + self.attack_step).min(target);
        } else if self.gain > target {
            self.gain = (self.gain - self.release_step).max(target);
        }
    }
}

impl Iterator for OverlayTexture {
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        let saw = 2.0 * self.phase - 1.0;
        self.phase = (self.phase + self.phase_step).fract();

        let noise = self.noise[self.noise_pos];
        self.noise_pos = (self.noise_pos + 1) % self.noise.len();

        self.advance_gain();
        let mixed = (saw + self.bandpass.process(noise)) * self.gain;
        Some(self.highpass.process(mixed))
    }
}

impl rodio::Source for OverlayTexture {
    fn current_frame_len(&self) -> Option<usize> {
        None
    }

    fn channels(&self) -> u16 {
        1
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn total_duration(&self) -> Option<Duration> {
        None
    }
}

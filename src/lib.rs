//! Aldin Library
//!
//! Core modules for the Aldin voice interaction orchestrator.

pub mod asr;
pub mod audio;
pub mod config;
pub mod conversation;
pub mod core;
pub mod error;
pub mod events;
pub mod orchestrator;
pub mod presenter;
pub mod tts;

pub use config::Config;
pub use error::{AldinError, AldinResult};
pub use orchestrator::{Backends, InteractionState, Orchestrator};

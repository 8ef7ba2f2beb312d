//! State types for the orchestrator
//!
//! The single interaction state plus the per-session context it owns.

use crate::conversation::ConversationHistory;

/// What the assistant is doing right now
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InteractionState {
    Idle,
    #[default]
    Greeting,
    Thinking,
    Speaking,
    ListeningWake,
    ListeningCommand,
}

/// Avatar clip shown for a state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AvatarClip {
    Rest,
    Greeting,
    Response,
}

impl InteractionState {
    /// Status line under the avatar
    pub fn label(self) -> &'static str {
        match self {
            InteractionState::Idle => "Idle",
            InteractionState::Greeting => "Hello",
            InteractionState::Thinking => "Thinking...",
            InteractionState::Speaking => "Responding...",
            InteractionState::ListeningWake | InteractionState::ListeningCommand => {
                "Listening..."
            }
        }
    }

    /// Clip to play and whether it loops
    pub fn avatar(self) -> (AvatarClip, bool) {
        match self {
            InteractionState::Speaking => (AvatarClip::Response, true),
            InteractionState::Greeting => (AvatarClip::Greeting, false),
            _ => (AvatarClip::Rest, true),
        }
    }

    pub fn is_listening(self) -> bool {
        matches!(
            self,
            InteractionState::ListeningWake | InteractionState::ListeningCommand
        )
    }
}

/// User-mutable toggles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlFlags {
    pub voice_output_enabled: bool,
    pub wake_word_enabled: bool,
}

impl Default for ControlFlags {
    fn default() -> Self {
        Self {
            voice_output_enabled: true,
            wake_word_enabled: false,
        }
    }
}

/// Everything that lives for one page/terminal session
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub flags: ControlFlags,
    pub history: ConversationHistory,
}

impl SessionContext {
    pub fn new(system_prompt: &str, flags: ControlFlags) -> Self {
        Self {
            flags,
            history: ConversationHistory::new(system_prompt),
        }
    }
}

//! Presenter
//!
//! Receives everything the user should see. The orchestrator never renders
//! on its own; it only emits [`Notification`]s.

use crate::conversation::{Role, Turn};
use crate::orchestrator::{ControlFlags, InteractionState};
use std::io::Write;
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    State(InteractionState),
    /// A turn appended to the history
    Turn(Turn),
    /// Synthetic assistant message shown to the user but never sent to the model
    Diagnostic(String),
    Controls(ControlFlags),
}

pub trait Presenter: Send + Sync {
    fn notify(&self, notification: &Notification);
}

/// Terminal presenter used by the binary
#[derive(Debug, Default)]
pub struct ConsolePresenter {
    last_state: Mutex<Option<InteractionState>>,
}

impl ConsolePresenter {
    pub fn new() -> Self {
        Self::default()
    }

    fn render(notification: &Notification) -> Option<String> {
        match notification {
            Notification::State(state) => Some(format!("  [{}]", state.label())),
            Notification::Turn(turn) => match turn.role {
                Role::User => Some(format!("you> {}", turn.content)),
                Role::Assistant => Some(format!("aldin> {}", turn.content)),
                Role::System => None,
            },
            Notification::Diagnostic(text) => Some(format!("aldin> {}", text)),
            Notification::Controls(flags) => Some(format!(
                "  Voice: {} | Wake: {}",
                on_off(flags.voice_output_enabled),
                on_off(flags.wake_word_enabled)
            )),
        }
    }
}

fn on_off(value: bool) -> &'static str {
    if value {
        "On"
    } else {
        "Off"
    }
}

impl Presenter for ConsolePresenter {
    fn notify(&self, notification: &Notification) {
        if let Notification::State(state) = notification {
            if let Ok(mut last) = self.last_state.lock() {
                if *last == Some(*state) {
                    return;
                }
                *last = Some(*state);
            }
        }

        if let Some(line) = Self::render(notification) {
            let mut out = std::io::stdout().lock();
            let _ = writeln!(out, "{}", line);
            let _ = out.flush();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_lines() {
        assert_eq!(
            ConsolePresenter::render(&Notification::Turn(Turn::user("hello"))),
            Some("you> hello".to_string())
        );
        assert_eq!(
            ConsolePresenter::render(&Notification::Turn(Turn::system("sys"))),
            None
        );
        assert_eq!(
            ConsolePresenter::render(&Notification::State(InteractionState::Thinking)),
            Some("  [Thinking...]".to_string())
        );
        assert_eq!(
            ConsolePresenter::render(&Notification::Controls(ControlFlags::default())),
            Some("  Voice: On | Wake: Off".to_string())
        );
    }
}

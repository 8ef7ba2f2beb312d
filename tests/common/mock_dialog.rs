//! Scripted dialog client for testing

use aldin::conversation::Turn;
use aldin::core::DialogClient;
use aldin::error::RequestFailure;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Answers requests in order from a script and records what it was sent
#[derive(Default)]
pub struct ScriptedDialog {
    replies: Mutex<VecDeque<Result<String, RequestFailure>>>,
    pub requests: Mutex<Vec<Vec<Turn>>>,
}

impl ScriptedDialog {
    pub fn new(replies: Vec<Result<String, RequestFailure>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn replying(texts: &[&str]) -> Self {
        Self::new(texts.iter().map(|t| Ok(t.to_string())).collect())
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last_request(&self) -> Option<Vec<Turn>> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl DialogClient for ScriptedDialog {
    async fn complete(&self, history: &[Turn]) -> Result<String, RequestFailure> {
        self.requests.lock().unwrap().push(history.to_vec());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(RequestFailure::Transport("script exhausted".to_string())))
    }
}

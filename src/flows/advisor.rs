// src/flows/advisor.rs
use crate::errors::StyleError;
use crate::models::{AdvisorPhase, AdvisorSnapshot, ChatMessage, StyleAdvice};
use crate::services::StyleService;
use log::{debug, warn};
use std::sync::Arc;
use tokio::sync::Mutex;

struct AdvisorState {
    phase: AdvisorPhase,
    history: Vec<ChatMessage>,
    error: Option<String>,
    pending_input: String,
    disposed: bool,
}

/// Chat workflow for one session. History is append-only: the user's message
/// lands as soon as it is sent, the reply only when one arrives.
#[derive(Clone)]
pub struct AdvisorController {
    service: Arc<dyn StyleService>,
    state: Arc<Mutex<AdvisorState>>,
}

impl AdvisorController {
    pub fn new(service: Arc<dyn StyleService>) -> Self {
        Self {
            service,
            state: Arc::new(Mutex::new(AdvisorState {
                phase: AdvisorPhase::Idle,
                history: Vec::new(),
                error: None,
                pending_input: String::new(),
                disposed: false,
            })),
        }
    }

    pub async fn snapshot(&self) -> AdvisorSnapshot {
        let state = self.state.lock().await;
        AdvisorSnapshot {
            phase: state.phase,
            error: state.error.clone(),
            history: state.history.clone(),
            pending_input: state.pending_input.clone(),
        }
    }

    /// Keeps the text being typed so it survives a reload. Cleared once a
    /// message is accepted.
    pub async fn set_input(&self, text: &str) {
        let mut state = self.state.lock().await;
        if !state.disposed {
            state.pending_input = text.to_string();
        }
    }

    pub async fn send(&self, text: &str) -> bool {
        let Some(prompt) = self.begin_send(text).await else {
            return false;
        };
        let result = self.service.style_advice(&prompt).await;
        self.finish_send(result).await;
        true
    }

    /// Appends the user's message and enters `RequestInFlight`. Returns the
    /// prompt to send, or `None` when the text is blank or a request is pending.
    pub async fn begin_send(&self, text: &str) -> Option<String> {
        let text = text.trim();
        let mut state = self.state.lock().await;
        if state.disposed || text.is_empty() || state.phase == AdvisorPhase::RequestInFlight {
            return None;
        }

        state.history.push(ChatMessage::user(text));
        state.pending_input.clear();
        state.error = None;
        state.phase = AdvisorPhase::RequestInFlight;
        debug!("Asking style advisor: {}", text);

        Some(text.to_string())
    }

    pub async fn finish_send(&self, result: Result<StyleAdvice, StyleError>) {
        let mut state = self.state.lock().await;
        if state.disposed {
            return;
        }
        match result {
            Ok(advice) => state.history.push(ChatMessage::assistant(advice)),
            Err(e) => {
                warn!("Style advice failed: {}", e);
                state.error = Some(e.to_string());
            }
        }
        state.phase = AdvisorPhase::Idle;
    }

    pub async fn shutdown(&self) {
        self.state.lock().await.disposed = true;
    }
}

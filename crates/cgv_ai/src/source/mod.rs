use std::time::Duration;

use cgv_core::error::AppError;
use cgv_core::verdict::AnswerEvidence;
use serde::{Deserialize, Serialize};

pub mod payload;
pub mod widget_chat;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

/// One prior turn passed to the answer boundary for conversational continuity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct AnswerRequest<'a> {
    pub message: &'a str,
    pub session_id: &'a str,
    pub conversation_history: &'a [ConversationTurn],
    /// Upper bound for the call; implementations must not block longer.
    pub timeout: Duration,
}

/// The answer-generation boundary: retrieval + LLM behind one call.
///
/// Implementations normalize whatever payload they receive into [`AnswerEvidence`]
/// (see [`payload::parse_answer_payload`]) before returning.
pub trait AnswerSource {
    fn answer(&self, req: &AnswerRequest<'_>) -> Result<AnswerEvidence, AppError>;
}

/// Best-effort liveness signal for an answer boundary.
pub trait HealthProbe {
    fn health_check(&self) -> Result<(), AppError>;
}

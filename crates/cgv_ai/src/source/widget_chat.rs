use std::io;

use cgv_core::error::{codes, AppError};
use cgv_core::verdict::AnswerEvidence;
use serde::Serialize;
use serde_json::Value;

use super::payload::parse_answer_payload;
use super::{AnswerRequest, AnswerSource, ConversationTurn, HealthProbe};
use crate::backend::BackendClient;

const ERROR_BODY_PREVIEW: usize = 200;

/// The chat widget endpoint of the RAG backend as an [`AnswerSource`].
#[derive(Debug, Clone)]
pub struct WidgetChatSource {
    client: BackendClient,
}

impl WidgetChatSource {
    pub fn new(client: BackendClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &BackendClient {
        &self.client
    }
}

#[derive(Debug, Clone, Serialize)]
struct ChatRequest<'a> {
    message: &'a str,
    session_id: &'a str,
    #[serde(skip_serializing_if = "no_history")]
    conversation_history: &'a [ConversationTurn],
}

fn no_history(history: &&[ConversationTurn]) -> bool {
    history.is_empty()
}

/// Walk the transport error's sources for an I/O timeout (connect or read deadline).
fn is_timeout(err: &ureq::Transport) -> bool {
    let mut source = std::error::Error::source(err);
    while let Some(e) = source {
        if let Some(io) = e.downcast_ref::<io::Error>() {
            if matches!(io.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock) {
                return true;
            }
        }
        source = e.source();
    }
    false
}

impl AnswerSource for WidgetChatSource {
    fn answer(&self, req: &AnswerRequest<'_>) -> Result<AnswerEvidence, AppError> {
        let url = self.client.chat_url();
        let body = ChatRequest {
            message: req.message,
            session_id: req.session_id,
            conversation_history: req.conversation_history,
        };
        let body = serde_json::to_value(body).map_err(|e| {
            AppError::new(codes::TRANSPORT_FAILURE, "Failed to encode chat request")
                .with_details(e.to_string())
        })?;

        let resp = ureq::post(&url).timeout(req.timeout).send_json(body);

        match resp {
            Ok(r) => {
                let status = r.status();
                let payload: Value = r.into_json().map_err(|e| {
                    AppError::malformed("Failed to decode chat response as JSON")
                        .with_details(format!("status={status}; err={e}"))
                })?;
                parse_answer_payload(&payload)
            }
            Err(ureq::Error::Status(status, r)) => {
                let body: String = r
                    .into_string()
                    .unwrap_or_default()
                    .chars()
                    .take(ERROR_BODY_PREVIEW)
                    .collect();
                Err(AppError::new(
                    codes::BACKEND_HTTP_STATUS,
                    "Chat endpoint returned an error status",
                )
                .with_details(format!("url={url}; status={status}; body={body}"))
                .with_retryable(status >= 500))
            }
            Err(ureq::Error::Transport(t)) if is_timeout(&t) => Err(AppError::new(
                codes::TRANSPORT_TIMEOUT,
                "Chat endpoint did not answer within the timeout",
            )
            .with_details(format!("url={url}; timeout_ms={}; err={t}", req.timeout.as_millis()))
            .with_retryable(true)),
            Err(ureq::Error::Transport(t)) => Err(AppError::transport(
                "Failed to call chat endpoint",
            )
            .with_details(format!("url={url}; kind={:?}; err={t}", t.kind()))),
        }
    }
}

impl HealthProbe for WidgetChatSource {
    fn health_check(&self) -> Result<(), AppError> {
        self.client.health_check()
    }
}

use std::time::{Duration, Instant};

use cgv_core::domain::{
    format_identifiers, NoCitationPolicy, NoInformationPolicy, QueryResult, QueryStatus,
};
use cgv_core::error::{codes, AppError};
use cgv_core::verdict::{failed_query, verify_answer, VerdictPolicy};

use crate::source::{AnswerRequest, AnswerSource, ConversationTurn};

/// Answer generation is slow; the reference workflow waits up to a minute.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    pub timeout: Duration,
    pub no_citation_policy: NoCitationPolicy,
    pub no_information_policy: NoInformationPolicy,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            no_citation_policy: NoCitationPolicy::default(),
            no_information_policy: NoInformationPolicy::default(),
        }
    }
}

/// Drive one query end-to-end and verify the answer's citations.
///
/// Never fails: transport, timeout and payload problems become an ERROR result carrying the
/// error. No retries; each result is attributable to exactly one attempt.
pub fn run_query(
    query: &str,
    session_id: &str,
    source: &dyn AnswerSource,
    options: &RunOptions,
) -> QueryResult {
    run_query_with_history(query, session_id, &[], source, options)
}

pub fn run_query_with_history(
    query: &str,
    session_id: &str,
    history: &[ConversationTurn],
    source: &dyn AnswerSource,
    options: &RunOptions,
) -> QueryResult {
    let span = tracing::info_span!("query", session_id);
    let _enter = span.enter();

    let started = Instant::now();
    let outcome = source.answer(&AnswerRequest {
        message: query,
        session_id,
        conversation_history: history,
        timeout: options.timeout,
    });
    let elapsed = started.elapsed();

    // A reply that lands after the deadline counts as a timeout even if the source ignored it.
    let outcome = match outcome {
        Ok(_) if elapsed > options.timeout => Err(AppError::new(
            codes::TRANSPORT_TIMEOUT,
            "Answer source exceeded the timeout",
        )
        .with_details(format!(
            "timeout_ms={}; elapsed_ms={}",
            options.timeout.as_millis(),
            elapsed.as_millis()
        ))
        .with_retryable(true)),
        other => other,
    };

    match outcome {
        Ok(evidence) => {
            let policy = VerdictPolicy {
                no_citation: options.no_citation_policy,
                no_information: options.no_information_policy,
            };
            let result = verify_answer(query, session_id, evidence, policy);
            match result.status() {
                QueryStatus::Warn => tracing::warn!(
                    cited = %format_identifiers(result.cited()),
                    retrieved = %format_identifiers(result.retrieved()),
                    hallucinated = %format_identifiers(result.hallucinated()),
                    reason = ?result.warn_reason(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    "grounding warning"
                ),
                _ => tracing::info!(
                    cited = %format_identifiers(result.cited()),
                    retrieved = %format_identifiers(result.retrieved()),
                    elapsed_ms = elapsed.as_millis() as u64,
                    "answer grounded"
                ),
            }
            result
        }
        Err(err) => {
            tracing::warn!(code = %err.code, error = %err, "query failed");
            failed_query(query, session_id, err)
        }
    }
}

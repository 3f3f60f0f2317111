use std::collections::BTreeSet;

use crate::compare::{compare, Grounding};
use crate::domain::{
    CitedSet, NoCitationPolicy, NoInformationPolicy, QueryResult, QueryStatus, RetrievalMeta,
    RetrievedContext, WarnReason,
};
use crate::error::AppError;
use crate::extract::extract;
use crate::normalize::Identifier;

/// Everything the answer boundary delivered for one successful execution.
#[derive(Debug, Clone, Default)]
pub struct AnswerEvidence {
    pub answer: String,
    pub contexts: Vec<RetrievedContext>,
    pub meta: RetrievalMeta,
    pub skipped_contexts: usize,
}

/// Phrases the backend uses when it has nothing to say ("unfortunately", "there is no").
pub const NO_INFORMATION_MARKERS: &[&str] = &["სამწუხაროდ", "არ არის"];

/// The optional checks applied on top of grounding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VerdictPolicy {
    pub no_citation: NoCitationPolicy,
    pub no_information: NoInformationPolicy,
}

impl From<NoCitationPolicy> for VerdictPolicy {
    fn from(no_citation: NoCitationPolicy) -> Self {
        Self {
            no_citation,
            ..Self::default()
        }
    }
}

impl From<NoInformationPolicy> for VerdictPolicy {
    fn from(no_information: NoInformationPolicy) -> Self {
        Self {
            no_information,
            ..Self::default()
        }
    }
}

pub fn admits_no_information(answer: &str) -> bool {
    NO_INFORMATION_MARKERS.iter().any(|m| answer.contains(m))
}

/// Status assignment for a successful execution.
///
/// Hallucinated citations win over every optional check; a no-information answer is reported
/// ahead of a missing citation since it explains it.
pub fn classify(
    answer: &str,
    cited: &CitedSet,
    retrieved: &BTreeSet<Identifier>,
    grounding: &Grounding,
    policy: VerdictPolicy,
) -> (QueryStatus, Option<WarnReason>) {
    if !grounding.grounded {
        return (QueryStatus::Warn, Some(WarnReason::HallucinatedCitations));
    }
    if policy.no_information == NoInformationPolicy::Warn && admits_no_information(answer) {
        return (QueryStatus::Warn, Some(WarnReason::NoInformation));
    }
    if cited.is_empty() && !retrieved.is_empty() && policy.no_citation == NoCitationPolicy::Warn {
        return (QueryStatus::Warn, Some(WarnReason::NoCitations));
    }
    (QueryStatus::Pass, None)
}

/// Build the result of a successful execution: extract, compare, classify.
pub fn verify_answer(
    query: impl Into<String>,
    session_id: impl Into<String>,
    evidence: AnswerEvidence,
    policy: impl Into<VerdictPolicy>,
) -> QueryResult {
    let retrieved: BTreeSet<Identifier> = evidence
        .contexts
        .iter()
        .map(|c| c.identifier.clone())
        .collect();
    let cited = extract(&evidence.answer);
    let grounding = compare(&cited, &retrieved);
    let (status, warn_reason) = classify(&evidence.answer, &cited, &retrieved, &grounding, policy.into());

    QueryResult {
        query: query.into(),
        session_id: session_id.into(),
        answer: evidence.answer,
        cited,
        retrieved,
        hallucinated: grounding.hallucinated,
        supported: grounding.supported,
        status,
        warn_reason,
        error: None,
        retrieval: Some(evidence.meta),
        contexts: evidence.contexts,
        skipped_contexts: evidence.skipped_contexts,
    }
}

/// Build the result of a failed execution. Extraction is not attempted.
pub fn failed_query(
    query: impl Into<String>,
    session_id: impl Into<String>,
    error: AppError,
) -> QueryResult {
    QueryResult {
        query: query.into(),
        session_id: session_id.into(),
        answer: String::new(),
        cited: CitedSet::new(),
        retrieved: BTreeSet::new(),
        hallucinated: BTreeSet::new(),
        supported: BTreeSet::new(),
        status: QueryStatus::Error,
        warn_reason: None,
        error: Some(error),
        retrieval: None,
        contexts: Vec::new(),
        skipped_contexts: 0,
    }
}

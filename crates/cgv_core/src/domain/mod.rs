use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::normalize::Identifier;

/// Ordered-unique identifiers cited by one answer text (ascending numeric order).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CitedSet(BTreeSet<Identifier>);

impl CitedSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: Identifier) -> bool {
        self.0.insert(id)
    }

    pub fn contains(&self, id: &Identifier) -> bool {
        self.0.contains(id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Identifier> {
        self.0.iter()
    }

    pub fn as_set(&self) -> &BTreeSet<Identifier> {
        &self.0
    }

    /// Digit strings in ascending order, handy for display and assertions.
    pub fn to_strings(&self) -> Vec<String> {
        self.0.iter().map(|id| id.to_string()).collect()
    }
}

impl FromIterator<Identifier> for CitedSet {
    fn from_iter<T: IntoIterator<Item = Identifier>>(iter: T) -> Self {
        CitedSet(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a CitedSet {
    type Item = &'a Identifier;
    type IntoIter = std::collections::btree_set::Iter<'a, Identifier>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// One retrieved source unit, already normalized at the boundary adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedContext {
    pub identifier: Identifier,
    pub title: String,
    pub similarity: f64,
    pub text: String,
    pub source: Option<String>,
    pub layer: Option<String>,
    pub document_title: Option<String>,
}

/// Aggregate retrieval metadata. Values the boundary did not report stay `None` and are never
/// averaged in as zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetrievalMeta {
    pub confidence: Option<f64>,
    pub layers_used: Vec<String>,
    pub total_time_ms: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QueryStatus {
    Pass,
    Warn,
    Error,
}

impl QueryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryStatus::Pass => "PASS",
            QueryStatus::Warn => "WARN",
            QueryStatus::Error => "ERROR",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WarnReason {
    /// At least one cited identifier was not retrieved.
    HallucinatedCitations,
    /// Sources were retrieved but the answer cites none of them.
    NoCitations,
    /// The answer says it found nothing (e.g. opens with "სამწუხაროდ").
    NoInformation,
}

/// What an answer that cites nothing (while sources were retrieved) counts as.
///
/// `Pass` treats it as vacuously grounded; `Warn` flags it as a partial state. The library default
/// is `Pass`; callers choose explicitly through configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoCitationPolicy {
    #[default]
    Pass,
    Warn,
}

/// Whether an answer that admits it has no information is flagged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoInformationPolicy {
    #[default]
    Ignore,
    Warn,
}

/// The unit of verification for one query execution.
///
/// Only built by [`crate::verdict::verify_answer`] or [`crate::verdict::failed_query`], so the
/// derived fields (`retrieved`, `hallucinated`, `status`) can never disagree with each other.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResult {
    pub(crate) query: String,
    pub(crate) session_id: String,
    pub(crate) answer: String,
    pub(crate) cited: CitedSet,
    pub(crate) retrieved: BTreeSet<Identifier>,
    pub(crate) hallucinated: BTreeSet<Identifier>,
    pub(crate) supported: BTreeSet<Identifier>,
    pub(crate) status: QueryStatus,
    pub(crate) warn_reason: Option<WarnReason>,
    pub(crate) error: Option<AppError>,
    pub(crate) retrieval: Option<RetrievalMeta>,
    pub(crate) contexts: Vec<RetrievedContext>,
    pub(crate) skipped_contexts: usize,
}

impl QueryResult {
    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn answer(&self) -> &str {
        &self.answer
    }

    pub fn cited(&self) -> &CitedSet {
        &self.cited
    }

    pub fn retrieved(&self) -> &BTreeSet<Identifier> {
        &self.retrieved
    }

    pub fn hallucinated(&self) -> &BTreeSet<Identifier> {
        &self.hallucinated
    }

    pub fn supported(&self) -> &BTreeSet<Identifier> {
        &self.supported
    }

    pub fn status(&self) -> QueryStatus {
        self.status
    }

    pub fn warn_reason(&self) -> Option<WarnReason> {
        self.warn_reason
    }

    pub fn error(&self) -> Option<&AppError> {
        self.error.as_ref()
    }

    /// Retrieval metadata; `None` for ERROR results.
    pub fn retrieval(&self) -> Option<&RetrievalMeta> {
        self.retrieval.as_ref()
    }

    pub fn contexts(&self) -> &[RetrievedContext] {
        &self.contexts
    }

    /// Contexts dropped at the boundary because their identifier was missing or non-numeric.
    pub fn skipped_contexts(&self) -> usize {
        self.skipped_contexts
    }
}

/// Render identifiers as `[4, 81, 164]`.
pub fn format_identifiers<'a>(ids: impl IntoIterator<Item = &'a Identifier>) -> String {
    let parts: Vec<&str> = ids.into_iter().map(|id| id.as_str()).collect();
    format!("[{}]", parts.join(", "))
}

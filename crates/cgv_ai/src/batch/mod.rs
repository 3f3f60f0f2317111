use std::time::Duration;

use cgv_core::domain::{QueryResult, QueryStatus};
use cgv_core::error::AppError;
use cgv_core::metrics::BatchReport;
use serde::{Deserialize, Serialize};

use crate::runner::{run_query_with_history, RunOptions};
use crate::source::{AnswerSource, ConversationTurn};

/// How session identifiers are assigned to the queries of a batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionMode {
    /// Every query uses the prefix itself as session id (conversation continuity).
    #[default]
    Shared,
    /// Query `n` (1-based) uses `{prefix}_{n}`.
    PerQuery,
}

#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Pause between successive queries (not after the last one).
    pub inter_query_delay: Duration,
    pub session_id_prefix: String,
    pub session_mode: SessionMode,
    /// Shared sessions only: pass earlier successful turns as conversation history.
    pub carry_history: bool,
    pub stop_on_error: bool,
    pub run: RunOptions,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            inter_query_delay: Duration::ZERO,
            session_id_prefix: "uat_test".to_string(),
            session_mode: SessionMode::Shared,
            carry_history: false,
            stop_on_error: false,
            run: RunOptions::default(),
        }
    }
}

impl BatchOptions {
    /// Session id for the query at `index` (0-based).
    pub fn session_id_for(&self, index: usize) -> String {
        match self.session_mode {
            SessionMode::Shared => self.session_id_prefix.clone(),
            SessionMode::PerQuery => format!("{}_{}", self.session_id_prefix, index + 1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

/// Progress hooks; `on_result` may stop the batch before the next query is issued.
pub trait BatchObserver {
    fn on_query_start(&mut self, _index: usize, _total: usize, _query: &str) {}

    fn on_result(&mut self, _index: usize, _total: usize, _result: &QueryResult) -> Flow {
        Flow::Continue
    }
}

pub struct NoopObserver;

impl BatchObserver for NoopObserver {}

/// Configuration problems that make a batch pointless to start.
pub fn validate_batch<S: AsRef<str>>(queries: &[S], options: &BatchOptions) -> Result<(), AppError> {
    if queries.is_empty() {
        return Err(AppError::config("Query list must not be empty"));
    }
    if let Some(i) = queries.iter().position(|q| q.as_ref().trim().is_empty()) {
        return Err(AppError::config("Queries must not be blank")
            .with_details(format!("index={}", i + 1)));
    }
    if options.run.timeout.is_zero() {
        return Err(AppError::config("Timeout must be greater than zero"));
    }
    Ok(())
}

pub fn run_batch<S: AsRef<str>>(
    queries: &[S],
    source: &dyn AnswerSource,
    options: &BatchOptions,
) -> Result<BatchReport, AppError> {
    run_batch_observed(queries, source, options, &mut NoopObserver)
}

/// Run queries strictly in order and fold the finalized results into a [`BatchReport`].
///
/// Only configuration errors are returned; per-query failures are ERROR results. A result whose
/// error is not query-local (see [`AppError::is_query_local`]) ends the batch; the remaining
/// queries are counted as skipped.
pub fn run_batch_observed<S: AsRef<str>>(
    queries: &[S],
    source: &dyn AnswerSource,
    options: &BatchOptions,
    observer: &mut dyn BatchObserver,
) -> Result<BatchReport, AppError> {
    validate_batch(queries, options)?;

    let total = queries.len();
    let share_history = options.carry_history && options.session_mode == SessionMode::Shared;
    if options.carry_history && !share_history {
        tracing::debug!("carry_history ignored for per-query sessions");
    }

    let mut history: Vec<ConversationTurn> = Vec::new();
    let mut results: Vec<QueryResult> = Vec::with_capacity(total);

    tracing::info!(total, mode = ?options.session_mode, "batch started");

    for (index, query) in queries.iter().enumerate() {
        let query = query.as_ref();
        if index > 0 && !options.inter_query_delay.is_zero() {
            std::thread::sleep(options.inter_query_delay);
        }

        observer.on_query_start(index, total, query);
        let session_id = options.session_id_for(index);
        let turns: &[ConversationTurn] = if share_history { &history } else { &[] };
        let result = run_query_with_history(query, &session_id, turns, source, &options.run);

        if share_history && result.status() != QueryStatus::Error {
            history.push(ConversationTurn::user(query));
            history.push(ConversationTurn::assistant(result.answer()));
        }

        let failed = result.status() == QueryStatus::Error;
        // Errors outside the query-local family (bad handle, bad config) would repeat for
        // every remaining query.
        let fatal = result.error().is_some_and(|e| !e.is_query_local());
        let flow = observer.on_result(index, total, &result);
        results.push(result);

        if fatal {
            tracing::error!(executed = index + 1, total, "answer source reported a fatal error");
        }
        if fatal || flow == Flow::Stop || (failed && options.stop_on_error) {
            tracing::warn!(executed = index + 1, total, "batch stopped early");
            break;
        }
    }

    let report = BatchReport::from_results(total, results);
    tracing::info!(
        pass = report.pass_count,
        warn = report.warn_count,
        error = report.error_count,
        skipped = report.skipped_count,
        all_clean = report.all_clean,
        "batch finished"
    );
    Ok(report)
}

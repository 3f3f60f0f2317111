use serde::Serialize;

use crate::domain::{QueryResult, QueryStatus};

/// Aggregate verdict over an ordered sequence of query results.
///
/// Derived only through [`BatchReport::from_results`]; counters are never patched independently.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchReport {
    pub planned: usize,
    pub pass_count: usize,
    pub warn_count: usize,
    pub error_count: usize,
    /// Queries never executed because the batch stopped early.
    pub skipped_count: usize,
    pub aborted: bool,
    pub avg_confidence: Option<f64>,
    pub confidence_known: usize,
    pub avg_retrieval_time_ms: Option<f64>,
    pub time_known: usize,
    pub all_clean: bool,
    pub results: Vec<QueryResult>,
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

impl BatchReport {
    /// Fold finalized results into a report.
    ///
    /// `planned` is the number of queries requested; when fewer results are supplied the batch is
    /// considered aborted and the difference is counted as skipped. Averages cover only non-ERROR
    /// results that actually reported the value.
    pub fn from_results(planned: usize, results: Vec<QueryResult>) -> Self {
        let mut pass_count = 0;
        let mut warn_count = 0;
        let mut error_count = 0;
        let mut confidences = Vec::new();
        let mut times = Vec::new();

        for r in &results {
            match r.status() {
                QueryStatus::Pass => pass_count += 1,
                QueryStatus::Warn => warn_count += 1,
                QueryStatus::Error => {
                    error_count += 1;
                    continue;
                }
            }
            if let Some(meta) = r.retrieval() {
                if let Some(c) = meta.confidence.filter(|c| c.is_finite()) {
                    confidences.push(c);
                }
                if let Some(t) = meta.total_time_ms.filter(|t| t.is_finite()) {
                    times.push(t);
                }
            }
        }

        let planned = planned.max(results.len());
        let skipped_count = planned - results.len();
        let aborted = skipped_count > 0;

        Self {
            planned,
            pass_count,
            warn_count,
            error_count,
            skipped_count,
            aborted,
            avg_confidence: mean(&confidences),
            confidence_known: confidences.len(),
            avg_retrieval_time_ms: mean(&times),
            time_known: times.len(),
            all_clean: warn_count == 0 && error_count == 0 && !aborted,
            results,
        }
    }

    /// Indices (0-based, batch order) of results with the given status.
    pub fn indices_with(&self, status: QueryStatus) -> Vec<usize> {
        self.results
            .iter()
            .enumerate()
            .filter(|(_, r)| r.status() == status)
            .map(|(i, _)| i)
            .collect()
    }

    pub fn hallucinating_queries(&self) -> usize {
        self.results
            .iter()
            .filter(|r| !r.hallucinated().is_empty())
            .count()
    }
}

use std::fs;
use std::path::Path;

use cgv_ai::batch::{run_batch_observed, BatchObserver, Flow};
use cgv_ai::source::widget_chat::WidgetChatSource;
use cgv_ai::source::HealthProbe;
use cgv_core::domain::{QueryResult, QueryStatus, RetrievedContext};
use cgv_core::error::{codes, AppError};
use cgv_core::metrics::BatchReport;
use cgv_core::normalize::{normalize_identifier, Identifier};
use cgv_core::report::{render_json, render_markdown, write_results_csv};
use cgv_core::verdict::{verify_answer, AnswerEvidence, VerdictPolicy};
use cgv_stub::server::{bind, serve_with_shutdown, shutdown_signal};
use serde::Serialize;
use time::OffsetDateTime;

use crate::config::VerifierConfig;
use crate::presets::Preset;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Markdown,
    Json,
}

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub ok: bool,
    pub message: String,
}

/// Logs batch progress with 1-based positions.
struct ProgressLog;

impl BatchObserver for ProgressLog {
    fn on_query_start(&mut self, index: usize, total: usize, query: &str) {
        tracing::info!(n = index + 1, total, query, "running query");
    }

    fn on_result(&mut self, index: usize, total: usize, result: &QueryResult) -> Flow {
        tracing::info!(n = index + 1, total, status = result.status().as_str(), "query finished");
        Flow::Continue
    }
}

pub fn now_unix() -> i64 {
    OffsetDateTime::now_utc().unix_timestamp()
}

/// One query per line; blank lines and `#` comments are skipped.
pub fn parse_queries(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect()
}

pub fn read_queries_file(path: &Path) -> Result<Vec<String>, AppError> {
    let text = fs::read_to_string(path).map_err(|e| {
        AppError::new(codes::CONFIG_LOAD_FAILED, "Failed to read queries file")
            .with_details(format!("path={}; err={e}", path.display()))
    })?;
    Ok(parse_queries(&text))
}

/// Preset queries first, then inline queries, then file queries.
pub fn collect_queries(
    preset: Option<&Preset>,
    inline: &[String],
    file: Option<&Path>,
) -> Result<Vec<String>, AppError> {
    let mut queries: Vec<String> = preset
        .map(|p| p.queries.iter().map(|q| q.to_string()).collect())
        .unwrap_or_default();
    queries.extend(inline.iter().cloned());
    if let Some(path) = file {
        queries.extend(read_queries_file(path)?);
    }
    if queries.is_empty() {
        return Err(AppError::config(
            "No queries given; use --preset, --query or --queries-file",
        ));
    }
    Ok(queries)
}

/// Comma or whitespace separated identifiers, e.g. `"81, 4 164"`.
pub fn parse_identifier_list(text: &str) -> Result<Vec<Identifier>, AppError> {
    text.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(|s| {
            normalize_identifier(s).map_err(|e| {
                AppError::config("Retrieved identifiers must be numbers").with_details(e.to_string())
            })
        })
        .collect()
}

pub fn run_batch_command(
    config: &VerifierConfig,
    queries: &[String],
    preset: Option<&Preset>,
    skip_health: bool,
) -> Result<BatchReport, AppError> {
    let source = WidgetChatSource::new(config.backend_client()?);
    let options = config.batch_options(preset, now_unix());

    if !skip_health {
        match source.health_check() {
            Ok(()) => tracing::info!(url = %source.client().health_url(), "backend reachable"),
            Err(e) => tracing::warn!(error = %e, "health check failed; proceeding with chat endpoint"),
        }
    }

    tracing::info!(
        url = %source.client().chat_url(),
        queries = queries.len(),
        session = %options.session_id_prefix,
        "starting batch"
    );
    run_batch_observed(queries, &source, &options, &mut ProgressLog)
}

/// Verify an answer offline against a known retrieved set.
pub fn check_answer(
    answer: &str,
    retrieved: &[Identifier],
    policy: impl Into<VerdictPolicy>,
) -> BatchReport {
    let contexts = retrieved
        .iter()
        .map(|id| RetrievedContext {
            identifier: id.clone(),
            title: String::new(),
            similarity: 0.0,
            text: String::new(),
            source: None,
            layer: None,
            document_title: None,
        })
        .collect();
    let evidence = AnswerEvidence {
        answer: answer.to_string(),
        contexts,
        ..AnswerEvidence::default()
    };
    let result = verify_answer("(offline check)", "", evidence, policy);
    BatchReport::from_results(1, vec![result])
}

pub fn health_command(config: &VerifierConfig) -> Result<HealthStatus, AppError> {
    let client = config.backend_client()?;
    client.health_check()?;
    Ok(HealthStatus {
        ok: true,
        message: format!("Backend reachable at {}", client.health_url()),
    })
}

/// Serve the mock backend until Ctrl+C.
pub fn serve_stub_command(listen_addr: &str) -> Result<(), AppError> {
    let rt = tokio::runtime::Runtime::new().map_err(|e| {
        AppError::new(codes::STUB_SERVER_FAILED, "Failed to start async runtime")
            .with_details(e.to_string())
    })?;
    rt.block_on(async {
        let listener = bind(listen_addr).await?;
        serve_with_shutdown(listener, shutdown_signal()).await
    })
}

pub fn render_report(report: &BatchReport, format: OutputFormat) -> Result<String, AppError> {
    match format {
        OutputFormat::Markdown => Ok(render_markdown(report)),
        OutputFormat::Json => render_json(report),
    }
}

fn write_error(path: &Path, e: impl std::fmt::Display) -> AppError {
    AppError::new(codes::REPORT_WRITE_FAILED, "Failed to write report")
        .with_details(format!("path={}; err={e}", path.display()))
}

/// Write the rendered report to `output` (stdout when absent) and the CSV to `csv` if given.
pub fn write_outputs(
    report: &BatchReport,
    format: OutputFormat,
    output: Option<&Path>,
    csv: Option<&Path>,
) -> Result<(), AppError> {
    let rendered = render_report(report, format)?;
    match output {
        Some(path) => fs::write(path, rendered).map_err(|e| write_error(path, e))?,
        None => println!("{rendered}"),
    }
    if let Some(path) = csv {
        let file = fs::File::create(path).map_err(|e| write_error(path, e))?;
        write_results_csv(report, file)?;
    }
    Ok(())
}

/// Process exit status for a finished batch: 0 only when every query passed.
pub fn exit_code(report: &BatchReport) -> i32 {
    if report.all_clean {
        0
    } else if report.results.iter().any(|r| r.status() == QueryStatus::Error) {
        2
    } else {
        1
    }
}

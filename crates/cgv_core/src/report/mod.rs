use std::io::Write;

use crate::domain::{format_identifiers, QueryResult, QueryStatus, WarnReason};
use crate::error::{codes, AppError};
use crate::metrics::BatchReport;
use crate::normalize::Identifier;

const QUERY_PREVIEW_CHARS: usize = 70;
const TEXT_PREVIEW_CHARS: usize = 150;
const CONTEXT_DETAILS: usize = 3;

fn preview(text: &str, max_chars: usize) -> String {
    let t = text.trim();
    // Char-based so Georgian text is never cut inside a code point.
    if t.chars().count() <= max_chars {
        return t.to_string();
    }
    let mut s: String = t.chars().take(max_chars).collect();
    s.push_str("...");
    s
}

fn format_ms(ms: Option<f64>) -> String {
    match ms {
        None => "UNKNOWN".to_string(),
        Some(v) => format!("{v:.0}ms"),
    }
}

fn format_ratio(v: Option<f64>) -> String {
    match v {
        None => "UNKNOWN".to_string(),
        Some(v) => format!("{v:.2}"),
    }
}

fn status_label(r: &QueryResult) -> String {
    match (r.status(), r.warn_reason()) {
        (QueryStatus::Warn, Some(WarnReason::NoCitations)) => "WARN (no citations)".to_string(),
        (QueryStatus::Warn, Some(WarnReason::NoInformation)) => {
            "WARN (no information)".to_string()
        }
        (status, _) => status.as_str().to_string(),
    }
}

/// Render a deterministic Markdown summary of a batch.
///
/// Contains no timestamps or host details so outputs are snapshot-testable.
pub fn render_markdown(report: &BatchReport) -> String {
    let mut out = String::new();
    out.push_str("# Citation grounding report\n\n");

    out.push_str("## Overall statistics\n\n");
    out.push_str(&format!("- Total queries: **{}**\n", report.planned));
    out.push_str(&format!("- Passed: **{}**\n", report.pass_count));
    out.push_str(&format!("- Warnings: **{}**\n", report.warn_count));
    out.push_str(&format!(
        "- With hallucinated citations: **{}**\n",
        report.hallucinating_queries()
    ));
    out.push_str(&format!("- Errors: **{}**\n", report.error_count));
    if report.aborted {
        out.push_str(&format!(
            "- Skipped (batch stopped early): **{}**\n",
            report.skipped_count
        ));
    }
    let executed_ok = report.pass_count + report.warn_count;
    out.push_str(&format!(
        "- Average confidence: {} (known {}/{})\n",
        format_ratio(report.avg_confidence),
        report.confidence_known,
        executed_ok
    ));
    out.push_str(&format!(
        "- Average retrieval time: {} (known {}/{})\n",
        format_ms(report.avg_retrieval_time_ms),
        report.time_known,
        executed_ok
    ));
    out.push('\n');

    out.push_str("## Results\n\n");
    out.push_str("| # | Status | Query | Retrieved | Cited | Hallucinated |\n");
    out.push_str("|---:|---|---|---|---|---|\n");
    for (i, r) in report.results.iter().enumerate() {
        out.push_str(&format!(
            "| {} | {} | {} | {} | {} | {} |\n",
            i + 1,
            status_label(r),
            preview(r.query(), QUERY_PREVIEW_CHARS).replace('|', "\\|"),
            format_identifiers(r.retrieved()),
            format_identifiers(r.cited()),
            format_identifiers(r.hallucinated()),
        ));
    }
    out.push('\n');

    out.push_str("## Details\n\n");
    for (i, r) in report.results.iter().enumerate() {
        out.push_str(&format!("### {}. {}\n\n", i + 1, status_label(r)));
        out.push_str(&format!("- Query: {}\n", r.query()));
        out.push_str(&format!("- Session: `{}`\n", r.session_id()));
        if let Some(err) = r.error() {
            out.push_str(&format!("- Error: {err}\n\n"));
            continue;
        }
        if let Some(meta) = r.retrieval() {
            out.push_str(&format!(
                "- Confidence: {}, Time: {}, Layers: {}\n",
                format_ratio(meta.confidence),
                format_ms(meta.total_time_ms),
                if meta.layers_used.is_empty() {
                    "none".to_string()
                } else {
                    meta.layers_used.join(", ")
                }
            ));
        }
        if !r.hallucinated().is_empty() {
            out.push_str(&format!(
                "- Hallucinated (cited but not retrieved): {}\n",
                format_identifiers(r.hallucinated())
            ));
        }
        if r.skipped_contexts() > 0 {
            out.push_str(&format!(
                "- Contexts without a usable article number: {}\n",
                r.skipped_contexts()
            ));
        }
        for (n, ctx) in r.contexts().iter().take(CONTEXT_DETAILS).enumerate() {
            out.push_str(&format!(
                "  {}. Article {}: {} (similarity {:.3})\n",
                n + 1,
                ctx.identifier,
                ctx.title,
                ctx.similarity
            ));
            if !ctx.text.trim().is_empty() {
                out.push_str(&format!(
                    "     {}\n",
                    preview(&ctx.text, TEXT_PREVIEW_CHARS).replace('\n', " ")
                ));
            }
        }
        out.push('\n');
    }

    out.push_str("## Verdict\n\n");
    if report.all_clean {
        out.push_str("ALL CLEAN: no hallucinated citations and no errors.\n");
    } else {
        if report.warn_count > 0 {
            out.push_str(&format!(
                "- {}/{} queries produced warnings\n",
                report.warn_count, report.planned
            ));
        }
        if report.error_count > 0 {
            out.push_str(&format!(
                "- {}/{} queries failed\n",
                report.error_count, report.planned
            ));
        }
        if report.aborted {
            out.push_str(&format!(
                "- {}/{} queries were not run\n",
                report.skipped_count, report.planned
            ));
        }
    }

    out
}

fn join_ids<'a>(ids: impl IntoIterator<Item = &'a Identifier>) -> String {
    ids.into_iter()
        .map(|id| id.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Write one CSV row per executed query.
pub fn write_results_csv<W: Write>(report: &BatchReport, writer: W) -> Result<(), AppError> {
    let to_err = |e: csv::Error| {
        AppError::new(codes::REPORT_WRITE_FAILED, "Failed to write CSV report")
            .with_details(e.to_string())
    };

    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record([
        "index",
        "status",
        "warn_reason",
        "session_id",
        "query",
        "retrieved",
        "cited",
        "hallucinated",
        "confidence",
        "total_time_ms",
        "error_code",
        "error_message",
    ])
    .map_err(to_err)?;

    for (i, r) in report.results.iter().enumerate() {
        let meta = r.retrieval();
        let warn_reason = match r.warn_reason() {
            Some(WarnReason::HallucinatedCitations) => "hallucinated_citations",
            Some(WarnReason::NoCitations) => "no_citations",
            Some(WarnReason::NoInformation) => "no_information",
            None => "",
        };
        wtr.write_record([
            (i + 1).to_string(),
            r.status().as_str().to_string(),
            warn_reason.to_string(),
            r.session_id().to_string(),
            r.query().to_string(),
            join_ids(r.retrieved()),
            join_ids(r.cited()),
            join_ids(r.hallucinated()),
            meta.and_then(|m| m.confidence)
                .map(|c| c.to_string())
                .unwrap_or_default(),
            meta.and_then(|m| m.total_time_ms)
                .map(|t| t.to_string())
                .unwrap_or_default(),
            r.error().map(|e| e.code.clone()).unwrap_or_default(),
            r.error().map(|e| e.message.clone()).unwrap_or_default(),
        ])
        .map_err(to_err)?;
    }

    wtr.flush().map_err(|e| {
        AppError::new(codes::REPORT_WRITE_FAILED, "Failed to flush CSV report")
            .with_details(e.to_string())
    })
}

/// Serialize the full report (including per-query contexts) as pretty JSON.
pub fn render_json(report: &BatchReport) -> Result<String, AppError> {
    serde_json::to_string_pretty(report).map_err(|e| {
        AppError::new(codes::REPORT_WRITE_FAILED, "Failed to serialize report")
            .with_details(e.to_string())
    })
}

use cgv_core::domain::{NoCitationPolicy, QueryStatus, RetrievalMeta, RetrievedContext};
use cgv_core::error::AppError;
use cgv_core::metrics::BatchReport;
use cgv_core::normalize::Identifier;
use cgv_core::report::{render_json, render_markdown, write_results_csv};
use cgv_core::verdict::{failed_query, verify_answer, AnswerEvidence};
use pretty_assertions::assert_eq;

fn ctx(id: u64, title: &str) -> RetrievedContext {
    RetrievedContext {
        identifier: Identifier::from_u64(id),
        title: title.to_string(),
        similarity: 0.812,
        text: "მუხლის ტექსტი".to_string(),
        source: Some("vector".to_string()),
        layer: Some("semantic".to_string()),
        document_title: Some("საქართველოს საგადასახადო კოდექსი".to_string()),
    }
}

fn ok(answer: &str, retrieved: &[u64], confidence: Option<f64>, time_ms: Option<f64>) -> cgv_core::domain::QueryResult {
    verify_answer(
        "კითხვა",
        "uat_test",
        AnswerEvidence {
            answer: answer.to_string(),
            contexts: retrieved.iter().map(|id| ctx(*id, "სათაური")).collect(),
            meta: RetrievalMeta {
                confidence,
                layers_used: vec!["intent".to_string(), "semantic".to_string()],
                total_time_ms: time_ms,
            },
            skipped_contexts: 0,
        },
        NoCitationPolicy::Pass,
    )
}

fn failed() -> cgv_core::domain::QueryResult {
    failed_query(
        "კითხვა",
        "uat_test",
        AppError::new("TRANSPORT_TIMEOUT", "Answer source timed out"),
    )
}

#[test]
fn averages_exclude_error_results() {
    let report = BatchReport::from_results(
        3,
        vec![
            ok("81-ე მუხლი", &[81], Some(0.9), Some(100.0)),
            failed(),
            ok("მუხლი 4", &[4], Some(0.5), Some(300.0)),
        ],
    );
    assert_eq!(report.avg_retrieval_time_ms, Some(200.0));
    assert_eq!(report.avg_confidence, Some(0.7));
    assert_eq!(report.time_known, 2);
}

#[test]
fn unknown_metadata_is_not_averaged_as_zero() {
    let report = BatchReport::from_results(
        2,
        vec![
            ok("", &[], None, None),
            ok("", &[], Some(0.4), Some(50.0)),
        ],
    );
    assert_eq!(report.avg_retrieval_time_ms, Some(50.0));
    assert_eq!(report.avg_confidence, Some(0.4));

    let all_errors = BatchReport::from_results(1, vec![failed()]);
    assert_eq!(all_errors.avg_retrieval_time_ms, None);
    assert_eq!(all_errors.avg_confidence, None);
}

#[test]
fn statuses_partition_the_batch() {
    let results = vec![
        ok("81-ე მუხლი", &[81], None, None),
        ok("166-ე მუხლის შესაბამისად", &[4], None, None),
        failed(),
        ok("პასუხი", &[], None, None),
    ];
    let report = BatchReport::from_results(4, results);

    assert_eq!(report.pass_count, 2);
    assert_eq!(report.warn_count, 1);
    assert_eq!(report.error_count, 1);
    assert_eq!(
        report.pass_count + report.warn_count + report.error_count,
        report.planned
    );

    let pass = report.indices_with(QueryStatus::Pass);
    let warn = report.indices_with(QueryStatus::Warn);
    let error = report.indices_with(QueryStatus::Error);
    assert_eq!(pass, vec![0, 3]);
    assert_eq!(warn, vec![1]);
    assert_eq!(error, vec![2]);
    assert!(!report.all_clean);
    assert_eq!(report.hallucinating_queries(), 1);
}

#[test]
fn clean_batch_is_all_clean() {
    let report = BatchReport::from_results(1, vec![ok("მუხლი 81", &[81, 4], None, None)]);
    assert!(report.all_clean);
    assert!(render_markdown(&report).contains("ALL CLEAN"));
}

#[test]
fn early_stop_counts_skipped_queries() {
    let report = BatchReport::from_results(5, vec![ok("", &[], None, None), failed()]);
    assert!(report.aborted);
    assert_eq!(report.skipped_count, 3);
    assert_eq!(
        report.pass_count + report.warn_count + report.error_count + report.skipped_count,
        5
    );
    assert!(!report.all_clean);
}

#[test]
fn error_result_has_empty_extraction_fields() {
    let r = failed();
    assert_eq!(r.status(), QueryStatus::Error);
    assert!(r.cited().is_empty());
    assert!(r.retrieved().is_empty());
    assert!(r.hallucinated().is_empty());
    assert!(r.retrieval().is_none());
    assert_eq!(r.error().map(|e| e.code.as_str()), Some("TRANSPORT_TIMEOUT"));
}

#[test]
fn markdown_report_lists_hallucinations_and_errors() {
    let report = BatchReport::from_results(
        2,
        vec![ok("166-ე მუხლის შესაბამისად", &[4], Some(0.8), Some(120.0)), failed()],
    );
    let md = render_markdown(&report);
    assert!(md.contains("| 1 | WARN | კითხვა | [4] | [166] | [166] |"));
    assert!(md.contains("- Hallucinated (cited but not retrieved): [166]"));
    assert!(md.contains("- Error: [TRANSPORT_TIMEOUT] Answer source timed out"));
    assert!(md.contains("1. Article 4: სათაური (similarity 0.812)"));
    assert!(md.contains("- 1/2 queries produced warnings"));
    assert!(md.contains("- 1/2 queries failed"));
    // Rendering is deterministic.
    assert_eq!(md, render_markdown(&report));
}

#[test]
fn csv_report_has_one_row_per_result() {
    let report = BatchReport::from_results(
        2,
        vec![ok("მუხლი 81 და მუხლი 164", &[81, 4], Some(0.75), None), failed()],
    );
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("results.csv");
    let file = std::fs::File::create(&path).expect("create");
    write_results_csv(&report, file).expect("write csv");

    let text = std::fs::read_to_string(&path).expect("read");
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("index,status,warn_reason"));
    assert!(lines[1].starts_with("1,WARN,hallucinated_citations,uat_test,"));
    assert!(lines[1].contains(",4 81,81 164,164,0.75,,"));
    assert!(lines[2].starts_with("2,ERROR,,uat_test,"));
    assert!(lines[2].ends_with("TRANSPORT_TIMEOUT,Answer source timed out"));
}

#[test]
fn json_report_uses_canonical_identifier_strings() {
    let report = BatchReport::from_results(1, vec![ok("მუხლი 081", &[81], None, None)]);
    let json = render_json(&report).expect("json");
    let v: serde_json::Value = serde_json::from_str(&json).expect("parse");
    assert_eq!(v["results"][0]["cited"], serde_json::json!(["81"]));
    assert_eq!(v["results"][0]["status"], "PASS");
    assert_eq!(v["all_clean"], true);
}

use std::fs;

use cgv_core::domain::{NoCitationPolicy, NoInformationPolicy, QueryStatus, WarnReason};
use cgv_core::error::codes;
use groundcheck_lib::commands::{
    check_answer, collect_queries, exit_code, parse_identifier_list, parse_queries,
    render_report, run_batch_command, write_outputs, OutputFormat,
};
use groundcheck_lib::config::VerifierConfig;
use groundcheck_lib::presets::{find_preset, preset_names, PRESETS};
use pretty_assertions::assert_eq;

#[test]
fn presets_match_their_query_sets() {
    assert_eq!(preset_names(), vec!["uat", "hallucination", "improvements"]);
    assert_eq!(find_preset("uat").map(|p| p.queries.len()), Some(10));
    assert_eq!(find_preset(" Hallucination ").map(|p| p.queries.len()), Some(3));
    assert_eq!(find_preset("improvements").map(|p| p.queries.len()), Some(3));
    assert!(find_preset("nope").is_none());
    for p in PRESETS {
        assert!(p.queries.iter().all(|q| !q.trim().is_empty()), "{}", p.name);
    }
}

#[test]
fn query_file_skips_blanks_and_comments() {
    let text = "# regression\nროგორია დღგ-ის განაკვეთი?\n\n  test  \n#skip\n";
    assert_eq!(
        parse_queries(text),
        vec!["როგორია დღგ-ის განაკვეთი?".to_string(), "test".to_string()]
    );
}

#[test]
fn queries_are_collected_in_order() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("queries.txt");
    fs::write(&path, "from file\n").expect("write");

    let preset = find_preset("improvements");
    let queries = collect_queries(preset, &["inline".to_string()], Some(path.as_path())).expect("collect");
    assert_eq!(queries.len(), 5);
    assert_eq!(queries[3], "inline");
    assert_eq!(queries[4], "from file");

    let err = collect_queries(None, &[], None).expect_err("empty");
    assert_eq!(err.code, codes::CONFIG_INVALID);
}

#[test]
fn identifier_lists_accept_commas_and_spaces() {
    let ids = parse_identifier_list("81, 4 0164").expect("ids");
    let ids: Vec<&str> = ids.iter().map(|i| i.as_str()).collect();
    assert_eq!(ids, vec!["81", "4", "164"]);
    assert!(parse_identifier_list("").expect("empty").is_empty());
    assert_eq!(
        parse_identifier_list("81,IV").expect_err("bad").code,
        codes::CONFIG_INVALID
    );
}

#[test]
fn offline_check_flags_hallucinated_article() {
    let retrieved = parse_identifier_list("4").expect("ids");
    let report = check_answer(
        "166-ე მუხლის შესაბამისად, დღგ-ის გადახდის ვალდებულება წარმოიშობა...",
        &retrieved,
        NoCitationPolicy::Pass,
    );
    assert_eq!(report.results[0].status(), QueryStatus::Warn);
    assert_eq!(report.results[0].hallucinated().len(), 1);
    assert_eq!(exit_code(&report), 1);

    let md = render_report(&report, OutputFormat::Markdown).expect("markdown");
    assert!(md.contains("166"));
}

#[test]
fn offline_check_of_grounded_answer_is_clean() {
    let retrieved = parse_identifier_list("81,4").expect("ids");
    let report = check_answer("მუხლი 81 ადგენს განაკვეთს.", &retrieved, NoCitationPolicy::Pass);
    assert!(report.all_clean);
    assert_eq!(exit_code(&report), 0);
}

#[test]
fn outputs_are_written_to_files() {
    let dir = tempfile::tempdir().expect("tempdir");
    let out = dir.path().join("report.json");
    let csv = dir.path().join("results.csv");

    let report = check_answer("მუხლი 81", &parse_identifier_list("81").expect("ids"), NoCitationPolicy::Pass);
    write_outputs(&report, OutputFormat::Json, Some(out.as_path()), Some(csv.as_path())).expect("write");

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&out).expect("read json")).expect("json");
    assert_eq!(json["all_clean"], true);
    let csv_text = fs::read_to_string(&csv).expect("read csv");
    assert!(csv_text.starts_with("index,status,"));
    assert_eq!(csv_text.lines().count(), 2);
}

#[test]
fn unwritable_output_is_a_report_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let out = dir.path().join("missing").join("report.md");
    let report = check_answer("x", &[], NoCitationPolicy::Pass);
    let err = write_outputs(&report, OutputFormat::Markdown, Some(out.as_path()), None).expect_err("write");
    assert_eq!(err.code, codes::REPORT_WRITE_FAILED);
}

#[test]
fn offline_check_can_flag_answers_without_information() {
    let answer = "სამწუხაროდ, მოწოდებულ კონტექსტში ამ კითხვაზე პასუხი არ არის.";
    let retrieved = parse_identifier_list("81").expect("ids");

    let report = check_answer(answer, &retrieved, NoCitationPolicy::Pass);
    assert!(report.all_clean);

    let report = check_answer(answer, &retrieved, NoInformationPolicy::Warn);
    assert_eq!(report.results[0].status(), QueryStatus::Warn);
    assert_eq!(report.results[0].warn_reason(), Some(WarnReason::NoInformation));
    assert_eq!(exit_code(&report), 1);

    let md = render_report(&report, OutputFormat::Markdown).expect("markdown");
    assert!(md.contains("WARN (no information)"));
}

#[test]
fn malformed_base_url_fails_the_batch_before_any_query() {
    let mut config = VerifierConfig::default();
    config.backend.base_url = "http://bad host:8000".to_string();

    let err = run_batch_command(&config, &["test".to_string()], None, true).expect_err("bad url");
    assert_eq!(err.code, codes::BACKEND_URL_INVALID);
}

use cgv_ai::source::payload::parse_answer_payload;
use cgv_core::error::codes;
use pretty_assertions::assert_eq;
use serde_json::json;

#[test]
fn widget_payload_uses_article_number_and_title() {
    let payload = json!({
        "response": "81-ე მუხლის მიხედვით განაკვეთი 20%-ია.",
        "citations": [
            {"article_number": "81", "article_title": "საშემოსავლო გადასახადის განაკვეთი",
             "similarity": 0.91, "text": "1. საშემოსავლო გადასახადის განაკვეთია 20 პროცენტი.",
             "source": "vector", "layer": "semantic"},
            {"article_number": 4, "article_title": "ტერმინები", "similarity": 0.42}
        ],
        "session_id": "uat_test",
        "timestamp": "2026-01-01T00:00:00Z"
    });

    let ev = parse_answer_payload(&payload).expect("parse");
    assert_eq!(ev.answer, "81-ე მუხლის მიხედვით განაკვეთი 20%-ია.");
    let ids: Vec<&str> = ev.contexts.iter().map(|c| c.identifier.as_str()).collect();
    assert_eq!(ids, vec!["81", "4"]);
    assert_eq!(ev.contexts[0].title, "საშემოსავლო გადასახადის განაკვეთი");
    assert_eq!(ev.contexts[0].layer.as_deref(), Some("semantic"));
    assert_eq!(ev.contexts[1].similarity, 0.42);
    // The widget endpoint reports no aggregate retrieval metadata.
    assert_eq!(ev.meta.confidence, None);
    assert_eq!(ev.meta.total_time_ms, None);
    assert_eq!(ev.skipped_contexts, 0);
}

#[test]
fn integration_payload_uses_clause_and_clause_name() {
    let payload = json!({
        "answer": "მუხლი 164 ადგენს დღგ-ის განაკვეთს.",
        "metadata": {
            "retrieval": {
                "contexts": [
                    {"clause": "164", "clause_name": "დღგ-ის განაკვეთი", "similarity": 0.88,
                     "document_title": "საგადასახადო კოდექსი"},
                    {"clause": null, "article_number": "166"}
                ],
                "confidence": 0.83,
                "layers_used": ["intent", "semantic", 7],
                "total_time_ms": 412.5
            }
        }
    });

    let ev = parse_answer_payload(&payload).expect("parse");
    let ids: Vec<&str> = ev.contexts.iter().map(|c| c.identifier.as_str()).collect();
    assert_eq!(ids, vec!["164", "166"]);
    assert_eq!(ev.contexts[0].title, "დღგ-ის განაკვეთი");
    assert_eq!(
        ev.contexts[0].document_title.as_deref(),
        Some("საგადასახადო კოდექსი")
    );
    assert_eq!(ev.meta.confidence, Some(0.83));
    assert_eq!(ev.meta.layers_used, vec!["intent".to_string(), "semantic".to_string()]);
    assert_eq!(ev.meta.total_time_ms, Some(412.5));
}

#[test]
fn contexts_without_usable_identifier_are_skipped_and_counted() {
    let payload = json!({
        "response": "პასუხი",
        "citations": [
            {"article_title": "უნომრო"},
            {"article_number": "IV"},
            "not an object",
            {"article_number": "0202"}
        ]
    });
    let ev = parse_answer_payload(&payload).expect("parse");
    assert_eq!(ev.contexts.len(), 1);
    assert_eq!(ev.contexts[0].identifier.as_str(), "202");
    assert_eq!(ev.skipped_contexts, 3);
}

#[test]
fn mock_backend_payload_without_citations_is_accepted() {
    let payload = json!({
        "response": "✅ Mock backend is working! The widget successfully connected and sent your message.",
        "session_id": "s",
        "timestamp": "2026-01-01T00:00:00",
        "mock": true
    });
    let ev = parse_answer_payload(&payload).expect("parse");
    assert!(ev.contexts.is_empty());
}

#[test]
fn payload_without_answer_text_is_malformed() {
    for payload in [
        json!({"error": "boom", "details": "Mock backend error"}),
        json!({"response": null}),
        json!({"response": 42}),
        json!(["response"]),
    ] {
        let err = parse_answer_payload(&payload).expect_err("malformed");
        assert_eq!(err.code, codes::MALFORMED_RESPONSE);
    }
}

#[test]
fn non_array_citations_are_malformed() {
    let err = parse_answer_payload(&json!({"response": "x", "citations": {"81": "x"}}))
        .expect_err("malformed");
    assert_eq!(err.code, codes::MALFORMED_RESPONSE);
    assert_eq!(err.details.as_deref(), Some("type=object"));
}

#[test]
fn signed_retrieved_number_cannot_hide_a_hallucination() {
    use cgv_core::domain::{NoCitationPolicy, QueryStatus};
    use cgv_core::verdict::verify_answer;

    let payload = json!({
        "response": "81-ე მუხლის მიხედვით განაკვეთი 20%-ია.",
        "citations": [{"article_number": -81}, {"article_number": "4"}]
    });
    let ev = parse_answer_payload(&payload).expect("parse");
    assert_eq!(ev.skipped_contexts, 1);

    let r = verify_answer("q", "s", ev, NoCitationPolicy::Pass);
    assert_eq!(r.status(), QueryStatus::Warn);
    assert_eq!(r.hallucinated().len(), 1);
}

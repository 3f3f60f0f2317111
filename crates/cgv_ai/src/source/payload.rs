use cgv_core::domain::{RetrievalMeta, RetrievedContext};
use cgv_core::error::AppError;
use cgv_core::normalize::normalize_identifier;
use cgv_core::verdict::AnswerEvidence;
use serde_json::{Map, Value};

/// Why a context was dropped at the boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkippedContext {
    NotAnObject,
    MissingIdentifier,
    NonNumericIdentifier(String),
}

/// Normalize an answer payload into [`AnswerEvidence`].
///
/// Two shapes are accepted:
/// - chat widget: `{response, citations: [...], session_id, timestamp}`
/// - chat integration: `{answer, metadata: {retrieval: {contexts, confidence, layers_used,
///   total_time_ms}}}`
///
/// A payload without a `response` or `answer` string is malformed.
pub fn parse_answer_payload(payload: &Value) -> Result<AnswerEvidence, AppError> {
    let obj = payload
        .as_object()
        .ok_or_else(|| AppError::malformed("Answer payload is not a JSON object"))?;

    let answer = match (obj.get("response"), obj.get("answer")) {
        (Some(Value::String(s)), _) => s.clone(),
        (_, Some(Value::String(s))) => s.clone(),
        _ => {
            return Err(AppError::malformed(
                "Answer payload has no `response` or `answer` text",
            )
            .with_details(format!("keys={}", key_list(obj))))
        }
    };

    let retrieval = obj
        .get("metadata")
        .and_then(|m| m.get("retrieval"))
        .and_then(Value::as_object);
    let meta_source = retrieval.unwrap_or(obj);

    let raw_contexts = retrieval
        .and_then(|r| r.get("contexts"))
        .or_else(|| obj.get("citations"))
        .or_else(|| obj.get("contexts"));
    let items: &[Value] = match raw_contexts {
        None | Some(Value::Null) => &[],
        Some(Value::Array(items)) => items.as_slice(),
        Some(other) => {
            return Err(
                AppError::malformed("Retrieved contexts are not a JSON array")
                    .with_details(format!("type={}", type_name(other))),
            )
        }
    };

    let mut contexts = Vec::with_capacity(items.len());
    let mut skipped_contexts = 0;
    for (i, item) in items.iter().enumerate() {
        match context_from_value(item) {
            Ok(ctx) => contexts.push(ctx),
            Err(reason) => {
                skipped_contexts += 1;
                tracing::warn!(index = i, reason = ?reason, "skipping retrieved context");
            }
        }
    }

    Ok(AnswerEvidence {
        answer,
        contexts,
        meta: meta_from_object(meta_source),
        skipped_contexts,
    })
}

/// Convert one retrieved context, trying `article_number` then `clause` for the identifier and
/// `article_title`, `clause_name`, `title` for the title.
pub fn context_from_value(item: &Value) -> Result<RetrievedContext, SkippedContext> {
    let obj = item.as_object().ok_or(SkippedContext::NotAnObject)?;

    let raw_id = ["article_number", "clause"]
        .iter()
        .find_map(|k| obj.get(*k).and_then(identifier_text))
        .ok_or(SkippedContext::MissingIdentifier)?;
    let identifier = normalize_identifier(&raw_id)
        .map_err(|nan| SkippedContext::NonNumericIdentifier(nan.raw))?;

    let title = ["article_title", "clause_name", "title"]
        .iter()
        .find_map(|k| non_empty_str(obj, k))
        .unwrap_or_default();

    Ok(RetrievedContext {
        identifier,
        title,
        similarity: obj.get("similarity").and_then(Value::as_f64).unwrap_or(0.0),
        text: non_empty_str(obj, "text").unwrap_or_default(),
        source: non_empty_str(obj, "source"),
        layer: non_empty_str(obj, "layer"),
        document_title: non_empty_str(obj, "document_title"),
    })
}

fn meta_from_object(obj: &Map<String, Value>) -> RetrievalMeta {
    let layers_used = obj
        .get("layers_used")
        .and_then(Value::as_array)
        .map(|layers| {
            layers
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    RetrievalMeta {
        confidence: obj.get("confidence").and_then(Value::as_f64),
        layers_used,
        total_time_ms: obj.get("total_time_ms").and_then(Value::as_f64),
    }
}

/// Identifier fields arrive as strings or integers; null and blank count as absent.
fn identifier_text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => {
            if let Some(u) = n.as_u64() {
                Some(u.to_string())
            } else {
                match n.as_f64() {
                    Some(f) if f >= 0.0 && f.fract() == 0.0 && f < 1e15 => {
                        Some(format!("{f:.0}"))
                    }
                    _ => Some(n.to_string()),
                }
            }
        }
        _ => None,
    }
}

fn non_empty_str(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn key_list(obj: &Map<String, Value>) -> String {
    obj.keys().cloned().collect::<Vec<_>>().join(",")
}

fn type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

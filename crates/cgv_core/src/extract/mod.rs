use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use crate::domain::CitedSet;
use crate::normalize::normalize_identifier;

/// The closed set of citation phrasings recognized in Georgian legal text.
///
/// Every rule requires a digit class next to the keyword `მუხლ…` ("article"); the keyword match
/// is case-sensitive, whitespace and digits are Unicode-aware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CitationRule {
    /// `81-ე მუხლი`
    OrdinalSuffix,
    /// `მუხლი 81`
    KeywordThenNumber,
    /// `მუხლის 81`
    PossessiveThenNumber,
    /// `81 მუხლი`
    NumberThenKeyword,
    /// `მუხლი №81`
    KeywordNumero,
    /// `№81 მუხლი`
    NumeroThenKeyword,
}

impl CitationRule {
    pub const ALL: [CitationRule; 6] = [
        CitationRule::OrdinalSuffix,
        CitationRule::KeywordThenNumber,
        CitationRule::PossessiveThenNumber,
        CitationRule::NumberThenKeyword,
        CitationRule::KeywordNumero,
        CitationRule::NumeroThenKeyword,
    ];

    /// Regex source; capture group 1 is the numeral.
    pub fn pattern(&self) -> &'static str {
        match self {
            CitationRule::OrdinalSuffix => r"(\d+)-ე\s+მუხლ",
            CitationRule::KeywordThenNumber => r"მუხლი\s+(\d+)",
            CitationRule::PossessiveThenNumber => r"მუხლის\s+(\d+)",
            CitationRule::NumberThenKeyword => r"(\d+)\s+მუხლი",
            CitationRule::KeywordNumero => r"მუხლ(?:ი|ის)?\s*№\s*(\d+)",
            CitationRule::NumeroThenKeyword => r"№\s*(\d+)\s+მუხლ",
        }
    }

    fn regex(&self) -> &'static Regex {
        let compiled = compiled_rules();
        // ALL and the compiled table share the same order.
        &compiled[*self as usize]
    }

    /// Raw numeral captures of this rule alone, in text order.
    pub fn captures<'t>(&self, text: &'t str) -> Vec<&'t str> {
        self.regex()
            .captures_iter(text)
            .filter_map(|c| c.get(1))
            .map(|m| m.as_str())
            .collect()
    }
}

fn compiled_rules() -> &'static [Regex; 6] {
    static RULES: OnceLock<[Regex; 6]> = OnceLock::new();
    RULES.get_or_init(|| {
        // The patterns are constants exercised by the unit tests below.
        CitationRule::ALL.map(|rule| Regex::new(rule.pattern()).expect("valid citation pattern"))
    })
}

/// One numeral matched by one rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleHit {
    pub rule: CitationRule,
    pub raw: String,
}

/// Full extraction outcome: the pooled set plus the evidence behind it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Extraction {
    pub cited: CitedSet,
    pub hits: Vec<RuleHit>,
    /// Captures that could not be normalized (e.g. non-ASCII decimal digits).
    pub not_a_number: Vec<String>,
}

/// Extract the identifiers an answer text claims to rely on.
pub fn extract(text: &str) -> CitedSet {
    extract_detailed(text).cited
}

/// Like [`extract`], also reporting which rule matched what and which captures were rejected.
pub fn extract_detailed(text: &str) -> Extraction {
    let mut out = Extraction::default();
    if text.is_empty() {
        return out;
    }

    for rule in CitationRule::ALL {
        for raw in rule.captures(text) {
            out.hits.push(RuleHit {
                rule,
                raw: raw.to_string(),
            });
            match normalize_identifier(raw) {
                Ok(id) => {
                    out.cited.insert(id);
                }
                Err(nan) => {
                    if !out.not_a_number.contains(&nan.raw) {
                        out.not_a_number.push(nan.raw);
                    }
                }
            }
        }
    }

    out
}

use std::collections::BTreeSet;

use serde::Serialize;

use crate::domain::CitedSet;
use crate::normalize::Identifier;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Grounding {
    /// Cited but never retrieved.
    pub hallucinated: BTreeSet<Identifier>,
    /// Cited and retrieved.
    pub supported: BTreeSet<Identifier>,
    pub grounded: bool,
}

/// Compare what an answer cites against what retrieval actually supplied.
///
/// Total: empty inputs are valid. An answer that cites nothing is grounded here; whether that
/// deserves a warning is a policy decision made by the caller.
pub fn compare(cited: &CitedSet, retrieved: &BTreeSet<Identifier>) -> Grounding {
    let hallucinated: BTreeSet<Identifier> =
        cited.as_set().difference(retrieved).cloned().collect();
    let supported: BTreeSet<Identifier> =
        cited.as_set().intersection(retrieved).cloned().collect();
    Grounding {
        grounded: hallucinated.is_empty(),
        hallucinated,
        supported,
    }
}

//! Registry mapping a heuristic rule's stable `id` to its compiled probe
//! function. `Rule::payload::Heuristic` carries only the id across a
//! serialization boundary (catalogs travel as plain data); this module is
//! where the function pointer gets reattached before a scan runs.

pub mod delimiters;
pub mod entropy;
pub mod nlp;
pub mod script_switch;
pub mod verb_density;

use std::collections::HashMap;
use std::sync::OnceLock;

use crate::rule::HeuristicOutcome;

pub type HeuristicFn = fn(&str) -> Option<HeuristicOutcome>;

pub const ENTROPY_PROBE: &str = "heuristic-entropy-window";
pub const VERB_DENSITY: &str = "heuristic-verb-density";
pub const DELIMITER_SURVEY: &str = "heuristic-delimiter-survey";
pub const SCRIPT_SWITCH: &str = "heuristic-script-switch";
pub const SENTIMENT_SPIKE: &str = "heuristic-sentiment-spike";
pub const ENTITY_IMPERSONATION: &str = "heuristic-entity-impersonation";
pub const SENTENCE_STRUCTURE: &str = "heuristic-sentence-structure";

fn registry() -> &'static HashMap<&'static str, HeuristicFn> {
    static REGISTRY: OnceLock<HashMap<&'static str, HeuristicFn>> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        let mut m: HashMap<&'static str, HeuristicFn> = HashMap::new();
        m.insert(ENTROPY_PROBE, entropy::probe);
        m.insert(VERB_DENSITY, verb_density::probe);
        m.insert(DELIMITER_SURVEY, delimiters::probe);
        m.insert(SCRIPT_SWITCH, script_switch::probe);
        m.insert(SENTIMENT_SPIKE, nlp::sentiment_spike);
        m.insert(ENTITY_IMPERSONATION, nlp::entity_impersonation);
        m.insert(SENTENCE_STRUCTURE, nlp::sentence_structure_anomaly);
        m
    })
}

/// Rehydrates a heuristic id into its callable probe. Returns `None` for an
/// id with no registered function — callers treat that as a non-fatal match
/// failure rather than a panic.
pub fn lookup(id: &str) -> Option<HeuristicFn> {
    registry().get(id).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_builtin_ids_resolve() {
        for id in [
            ENTROPY_PROBE,
            VERB_DENSITY,
            DELIMITER_SURVEY,
            SCRIPT_SWITCH,
            SENTIMENT_SPIKE,
            ENTITY_IMPERSONATION,
            SENTENCE_STRUCTURE,
        ] {
            assert!(lookup(id).is_some(), "missing heuristic registration for {id}");
        }
    }

    #[test]
    fn unknown_id_returns_none() {
        assert!(lookup("nonexistent").is_none());
    }
}

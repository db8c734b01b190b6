//! Imperative-verb density — short, command-heavy text is a common shape
//! for injection payloads ("ignore", "bypass", "reveal", ...).

use crate::rule::HeuristicOutcome;

pub const IMPERATIVE_VERBS: &[&str] = &[
    "ignore", "disregard", "forget", "bypass", "override", "skip", "reveal", "show", "display",
    "output", "print", "tell", "give", "obey", "comply", "follow", "execute", "perform", "do",
    "pretend", "act", "roleplay", "imagine", "become", "enable", "disable", "remove", "delete",
    "stop", "start", "switch", "answer", "respond", "repeat", "dump", "extract", "leak",
    "abandon", "cancel", "nullify", "activate", "deactivate",
];

pub fn probe(text: &str) -> Option<HeuristicOutcome> {
    let tokens: Vec<String> = text
        .split_whitespace()
        .map(|t| t.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
        .filter(|t| !t.is_empty())
        .collect();

    if tokens.len() < 10 {
        return None;
    }

    let count = tokens
        .iter()
        .filter(|t| IMPERATIVE_VERBS.contains(&t.as_str()))
        .count();
    let ratio = count as f64 / tokens.len() as f64;

    if ratio >= 0.08 && count >= 3 {
        Some(HeuristicOutcome {
            matched: true,
            details: Some(format!(
                "{count} imperative verb(s) out of {} tokens ({:.0}%)",
                tokens.len(),
                ratio * 100.0
            )),
            confidence: Some((ratio * 200.0).min(70.0) as u32),
        })
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_input_yields_none() {
        assert!(probe("ignore this now").is_none());
    }

    #[test]
    fn plain_prose_does_not_trigger() {
        let text = "The quick brown fox jumps over the lazy dog near the old stone bridge today";
        assert!(probe(text).is_none());
    }

    #[test]
    fn command_heavy_text_triggers() {
        let text = "ignore disregard forget bypass override skip reveal show display output \
                     print tell give obey comply follow";
        let outcome = probe(text).expect("should trigger");
        assert!(outcome.confidence.unwrap() > 0);
    }
}

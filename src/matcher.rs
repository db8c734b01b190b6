//! Executes a single rule against a text, producing raw primitive matches.
//!
//! This module is the word-boundary-safe, Unicode-aware core the rest of the
//! scanner depends on. Keyword matching records the *original-case* slice of
//! the input even though the search itself is case-insensitive, and advances
//! one character past every hit (zero-length or not) so a pathological
//! pattern can never livelock the scan.

use regex::RegexBuilder;

use crate::heuristics;
use crate::position::Position;
use crate::rule::{Rule, RulePayload};

/// One raw hit before position enrichment.
pub struct RawMatch {
    pub text: String,
    pub position: Position,
}

pub enum MatchOutcome {
    /// Keyword/Regex/Encoding/Structural rules: zero or more literal hits.
    Literal(Vec<RawMatch>),
    /// Heuristic rules: a single non-positional outcome, or nothing.
    Heuristic(Option<crate::rule::HeuristicOutcome>),
}

/// A rule failed to execute (bad regex, panicking heuristic). Carries enough
/// to log once without aborting the scan.
#[derive(Debug)]
pub struct MatchFailure {
    pub rule_id: String,
    pub reason: String,
}

pub fn run(rule: &Rule, text: &str) -> Result<MatchOutcome, MatchFailure> {
    match &rule.payload {
        RulePayload::Keyword { keywords } => Ok(MatchOutcome::Literal(match_keywords(text, keywords))),
        RulePayload::Pattern { pattern, flags } => match_pattern(rule, text, pattern, flags),
        RulePayload::Heuristic { id } => match_heuristic(rule, id, text),
    }
}

fn match_keywords(text: &str, keywords: &[String]) -> Vec<RawMatch> {
    // Compare per-char case folding rather than lowercasing the whole string,
    // so a needle never shifts out of alignment with the original chars even
    // when a single character expands under `to_lowercase` (e.g. Turkish İ).
    let chars: Vec<char> = text.chars().collect();

    let mut out = Vec::new();
    for needle in keywords {
        if needle.trim().is_empty() {
            continue;
        }
        let needle_chars: Vec<char> = needle.chars().collect();
        let n = needle_chars.len();
        if n == 0 {
            continue;
        }
        let mut i = 0usize;
        while i + n <= chars.len() {
            if chars_eq_ignore_case(&chars[i..i + n], &needle_chars) {
                let end = i + n;
                let matched: String = chars[i..end].iter().collect();
                out.push(RawMatch {
                    text: matched,
                    position: Position { start: i, end },
                });
            }
            i += 1;
        }
    }
    out
}

fn chars_eq_ignore_case(a: &[char], b: &[char]) -> bool {
    a.len() == b.len()
        && a.iter()
            .zip(b.iter())
            .all(|(x, y)| x.to_lowercase().eq(y.to_lowercase()))
}

fn match_pattern(
    rule: &Rule,
    text: &str,
    pattern: &str,
    flags: &str,
) -> Result<MatchOutcome, MatchFailure> {
    let case_insensitive = flags.contains('i');
    let compiled = RegexBuilder::new(pattern)
        .case_insensitive(case_insensitive)
        .multi_line(flags.contains('m'))
        .dot_matches_new_line(flags.contains('s'))
        .build()
        .map_err(|e| MatchFailure {
            rule_id: rule.id.clone(),
            reason: format!("regex compile failed: {e}"),
        })?;

    let chars: Vec<char> = text.chars().collect();
    // char->byte offset table so regex (byte-indexed) results map back to
    // the char offsets the rest of the engine works in.
    let mut byte_to_char = vec![0usize; text.len() + 1];
    let mut char_idx = 0usize;
    for (byte_idx, _) in text.char_indices() {
        byte_to_char[byte_idx] = char_idx;
        char_idx += 1;
    }
    byte_to_char[text.len()] = chars.len();

    let mut out = Vec::new();
    let mut last_end_byte = 0usize;
    for m in compiled.find_iter(text) {
        if m.start() < last_end_byte {
            continue;
        }
        let start = byte_to_char[m.start()];
        let end = byte_to_char[m.end()];
        out.push(RawMatch {
            text: m.as_str().to_string(),
            position: Position { start, end },
        });
        last_end_byte = if m.end() > m.start() { m.end() } else { m.end() + 1 };
    }
    Ok(MatchOutcome::Literal(out))
}

fn match_heuristic(rule: &Rule, id: &str, text: &str) -> Result<MatchOutcome, MatchFailure> {
    let f = heuristics::lookup(id).ok_or_else(|| MatchFailure {
        rule_id: rule.id.clone(),
        reason: format!("no heuristic registered for id '{id}'"),
    })?;

    let text_owned = text.to_string();
    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| f(&text_owned)));
    match result {
        Ok(outcome) => Ok(MatchOutcome::Heuristic(outcome)),
        Err(_) => Err(MatchFailure {
            rule_id: rule.id.clone(),
            reason: "heuristic panicked".to_string(),
        }),
    }
}

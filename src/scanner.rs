//! The scanner driver: runs enabled rules against text, aggregates matches
//! into a confidence score, and delegates to the compound detector. This is
//! the one function the whole crate exists to make correct — it is pure,
//! synchronous, and holds no state across calls.

use serde::{Deserialize, Serialize};

use crate::catalog;
use crate::compound::{self, CompoundThreat};
use crate::matcher::{self, MatchOutcome};
use crate::position;
use crate::rule::{Rule, RuleCategory, RuleMatch, Severity};

/// Hard cap on scanned input length. Text beyond this is silently truncated.
pub const MAX_SCAN_CHARS: usize = 1_000_000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResult {
    pub is_positive: bool,
    pub confidence: u32,
    pub reasons: Vec<String>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub matched_rules: Vec<RuleMatch>,
    pub total_rules_checked: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compound_threats: Option<Vec<CompoundThreat>>,
}

impl ScanResult {
    fn empty(reason: &str) -> Self {
        ScanResult {
            is_positive: false,
            confidence: 0,
            reasons: vec![reason.to_string()],
            timestamp: chrono::Utc::now(),
            matched_rules: vec![],
            total_rules_checked: 0,
            compound_threats: None,
        }
    }

    pub fn risk_level(&self) -> &'static str {
        if self.confidence >= 70 {
            "high"
        } else if self.confidence >= 30 {
            "medium"
        } else {
            "low"
        }
    }
}

/// Scans `text` against `rules` (or the built-in catalog if `None`),
/// returning a fully aggregated result. `threshold` of `0` preserves the
/// legacy "any match is positive" behavior.
pub fn scan(text: &str, rules: Option<&[Rule]>, threshold: u32) -> ScanResult {
    if text.trim().is_empty() {
        return ScanResult::empty("No text provided");
    }

    let truncated: String = if text.chars().count() > MAX_SCAN_CHARS {
        text.chars().take(MAX_SCAN_CHARS).collect()
    } else {
        text.to_string()
    };
    let text = truncated.as_str();

    let builtin_storage;
    let effective_rules: &[Rule] = match rules {
        Some(r) => r,
        None => {
            builtin_storage = catalog::builtin_rules().clone();
            &builtin_storage
        }
    };

    let enabled: Vec<&Rule> = effective_rules.iter().filter(|r| r.enabled).collect();
    let total_rules_checked = enabled.len();

    let mut matched_rules: Vec<RuleMatch> = Vec::new();
    for rule in enabled {
        match matcher::run(rule, text) {
            Ok(MatchOutcome::Literal(raw)) if !raw.is_empty() => {
                let positions: Vec<_> = raw.iter().map(|m| m.position).collect();
                let matches: Vec<_> = raw.iter().map(|m| m.text.clone()).collect();
                let match_positions = position::enhance(text, &positions);
                let weight = rule.effective_weight();
                let confidence_impact = if matches.len() > 1 {
                    weight + (matches.len().min(5) as u32 - 1) * 5
                } else {
                    weight
                };
                matched_rules.push(RuleMatch {
                    rule_id: rule.id.clone(),
                    rule_name: rule.name.clone(),
                    rule_kind: rule.kind,
                    severity: rule.severity,
                    matches,
                    positions,
                    match_positions,
                    details: None,
                    weight,
                    confidence_impact,
                });
            }
            Ok(MatchOutcome::Literal(_)) => {}
            Ok(MatchOutcome::Heuristic(Some(outcome))) if outcome.matched => {
                let weight = rule.effective_weight();
                matched_rules.push(RuleMatch {
                    rule_id: rule.id.clone(),
                    rule_name: rule.name.clone(),
                    rule_kind: rule.kind,
                    severity: rule.severity,
                    matches: vec![],
                    positions: vec![],
                    match_positions: vec![],
                    details: outcome.details,
                    weight,
                    confidence_impact: weight,
                });
            }
            Ok(MatchOutcome::Heuristic(_)) => {}
            Err(failure) => {
                tracing::warn!(rule_id = %failure.rule_id, reason = %failure.reason, "rule execution failed, skipping");
            }
        }
    }

    let confidence = compute_confidence(&matched_rules);
    let is_positive = !matched_rules.is_empty() && (threshold == 0 || confidence >= threshold);
    let reasons = render_reasons(&matched_rules, confidence, threshold);
    let compound_threats = {
        let threats = compound::detect(&matched_rules);
        if threats.is_empty() {
            None
        } else {
            Some(threats)
        }
    };

    ScanResult {
        is_positive,
        confidence,
        reasons,
        timestamp: chrono::Utc::now(),
        matched_rules,
        total_rules_checked,
        compound_threats,
    }
}

/// Scans `text` using every enabled rule belonging to any of `category_ids`.
pub fn scan_with_categories(
    text: &str,
    category_ids: &[String],
    all_categories: &[RuleCategory],
    threshold: u32,
) -> ScanResult {
    let rules: Vec<Rule> = all_categories
        .iter()
        .filter(|c| category_ids.iter().any(|id| id == &c.id))
        .flat_map(|c| c.rules.iter().filter(|r| r.enabled).cloned())
        .collect();
    scan(text, Some(&rules), threshold)
}

fn compute_confidence(matched_rules: &[RuleMatch]) -> u32 {
    if matched_rules.is_empty() {
        return 0;
    }
    let base: u32 = matched_rules.iter().map(|m| m.confidence_impact).sum();
    let crit = matched_rules.iter().filter(|m| m.severity == Severity::Critical).count() as u32;
    let high = matched_rules.iter().filter(|m| m.severity == Severity::High).count();
    let total = base + 30 * crit + if high >= 2 { 20 } else { 0 };
    let scaled = 50.0 + 50.0 * (1.0 + total as f64 / 50.0).log10();
    scaled.round().min(99.0).max(0.0) as u32
}

fn render_reasons(matched_rules: &[RuleMatch], confidence: u32, threshold: u32) -> Vec<String> {
    if matched_rules.is_empty() {
        return vec!["No injection patterns detected".to_string()];
    }

    if threshold > 0 && confidence < threshold {
        return vec![format!(
            "{} rule(s) matched but confidence {confidence}% is below threshold {threshold}%",
            matched_rules.len()
        )];
    }

    let mut sorted: Vec<&RuleMatch> = matched_rules.iter().collect();
    sorted.sort_by(|a, b| b.severity.rank().cmp(&a.severity.rank()));

    sorted
        .into_iter()
        .map(|m| {
            let body = if let Some(details) = &m.details {
                details.clone()
            } else {
                let shown: Vec<String> = m
                    .matches
                    .iter()
                    .take(3)
                    .map(|s| truncate(s, 40))
                    .collect();
                let suffix = if m.matches.len() > 3 {
                    format!(" (+{} more)", m.matches.len() - 3)
                } else {
                    String::new()
                };
                format!("matched {}{}", shown.join(", "), suffix)
            };
            format!("[{} {}] {}: {}", m.severity.icon(), severity_label(m.severity), m.rule_name, body)
        })
        .collect()
}

fn severity_label(s: Severity) -> &'static str {
    match s {
        Severity::Critical => "CRITICAL",
        Severity::High => "HIGH",
        Severity::Medium => "MEDIUM",
        Severity::Low => "LOW",
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        format!("\"{s}\"")
    } else {
        let short: String = s.chars().take(max_chars).collect();
        format!("\"{short}...\"")
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RuleStats {
    pub total: usize,
    pub enabled: usize,
    pub by_kind: std::collections::HashMap<String, usize>,
    pub by_severity: std::collections::HashMap<String, usize>,
}

pub fn rule_stats(rules: &[Rule]) -> RuleStats {
    let mut by_kind = std::collections::HashMap::new();
    let mut by_severity = std::collections::HashMap::new();
    for r in rules {
        *by_kind.entry(format!("{:?}", r.kind)).or_insert(0usize) += 1;
        *by_severity.entry(format!("{:?}", r.severity)).or_insert(0usize) += 1;
    }
    RuleStats {
        total: rules.len(),
        enabled: rules.iter().filter(|r| r.enabled).count(),
        by_kind,
        by_severity,
    }
}

//! Compound-threat post-processing: derives which built-in categories are
//! represented in a scan's matched rules, then checks that set against a
//! fixed table of multi-vector threat definitions.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::catalog;
use crate::rule::{RuleMatch, Severity};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompoundThreat {
    pub id: String,
    pub name: String,
    pub description: String,
    pub severity: Severity,
    pub triggered_categories: Vec<String>,
}

struct CompoundDef {
    id: &'static str,
    name: &'static str,
    description: &'static str,
    severity: Severity,
    required: &'static [&'static str],
}

const DEFINITIONS: &[CompoundDef] = &[
    CompoundDef {
        id: "compound-manipulation-chain",
        name: "Manipulation Chain",
        description: "Role manipulation combined with forced compliance",
        severity: Severity::Critical,
        required: &["role-manipulation", "compliance-forcing"],
    },
    CompoundDef {
        id: "compound-extraction-attack",
        name: "Extraction Attack",
        description: "Context manipulation combined with prompt extraction",
        severity: Severity::Critical,
        required: &["context-manipulation", "prompt-extraction"],
    },
    CompoundDef {
        id: "compound-full-bypass",
        name: "Full Bypass Attempt",
        description: "Jailbreak signaling combined with explicit safety removal",
        severity: Severity::Critical,
        required: &["jailbreak", "safety-removal"],
    },
    CompoundDef {
        id: "compound-authority-override",
        name: "Authority Override",
        description: "False authority claim combined with instruction override",
        severity: Severity::High,
        required: &["authority-developer", "instruction-override"],
    },
    CompoundDef {
        id: "compound-fiction-extraction",
        name: "Fiction-Wrapped Extraction",
        description: "Fictional/hypothetical framing combined with prompt extraction",
        severity: Severity::High,
        required: &["fiction-hypothetical", "prompt-extraction"],
    },
];

/// Detects compound threats from a scan's matched rules. Returns an empty
/// vector when none of the fixed definitions are satisfied.
pub fn detect(matched_rules: &[RuleMatch]) -> Vec<CompoundThreat> {
    let matched_categories: HashSet<&str> = matched_rules
        .iter()
        .filter_map(|m| catalog::category_for_rule(&m.rule_id))
        .collect();

    DEFINITIONS
        .iter()
        .filter(|def| def.required.iter().all(|c| matched_categories.contains(c)))
        .map(|def| CompoundThreat {
            id: def.id.to_string(),
            name: def.name.to_string(),
            description: def.description.to_string(),
            severity: def.severity,
            triggered_categories: def.required.iter().map(|s| s.to_string()).collect(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::RuleKind;

    fn fake_match(rule_id: &str) -> RuleMatch {
        RuleMatch {
            rule_id: rule_id.to_string(),
            rule_name: rule_id.to_string(),
            rule_kind: RuleKind::Keyword,
            severity: Severity::High,
            matches: vec![],
            positions: vec![],
            match_positions: vec![],
            details: None,
            weight: 40,
            confidence_impact: 40,
        }
    }

    #[test]
    fn no_matches_yields_no_compound_threats() {
        assert!(detect(&[]).is_empty());
    }

    #[test]
    fn full_bypass_requires_both_categories() {
        let matches = vec![fake_match("kw-jailbreak-generic"), fake_match("kw-disable-safety")];
        let threats = detect(&matches);
        assert!(threats.iter().any(|t| t.id == "compound-full-bypass"));
    }

    #[test]
    fn single_category_does_not_trigger_compound() {
        let matches = vec![fake_match("kw-jailbreak-generic")];
        assert!(detect(&matches).is_empty());
    }
}

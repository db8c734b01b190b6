//! Typed rule model: kinds, severities, categories, and the heuristic outcome
//! contract. A `Rule` is pure data — even `Heuristic` rules carry only a
//! stable id, never a function pointer, so the whole catalog can be
//! serialized and travel across process boundaries (see `crate::heuristics`
//! for the id -> function rehydration map).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Base confidence weight contributed by a single match at this severity.
    pub fn weight(self) -> u32 {
        match self {
            Severity::Low => 10,
            Severity::Medium => 25,
            Severity::High => 40,
            Severity::Critical => 60,
        }
    }

    pub fn rank(self) -> u8 {
        match self {
            Severity::Low => 0,
            Severity::Medium => 1,
            Severity::High => 2,
            Severity::Critical => 3,
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            Severity::Critical => "⚠",
            Severity::High => "!",
            Severity::Medium => "~",
            Severity::Low => "·",
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(Severity::Low),
            "medium" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            "critical" => Ok(Severity::Critical),
            other => Err(format!(
                "unknown severity '{other}'; valid: low, medium, high, critical"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleKind {
    Keyword,
    Regex,
    Heuristic,
    Encoding,
    Structural,
}

/// Kind-specific payload. Exactly one variant matches a rule's `kind`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "payload_type", rename_all = "lowercase")]
pub enum RulePayload {
    Keyword { keywords: Vec<String> },
    /// Used for `Regex`, `Encoding`, and `Structural` kinds alike — all three
    /// execute through the same compiled-pattern path in `matcher`.
    Pattern { pattern: String, flags: String },
    /// Only the stable id survives serialization; `crate::heuristics::lookup`
    /// resolves it back to a function pointer at scan time.
    Heuristic { id: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    pub id: String,
    pub name: String,
    pub description: String,
    pub kind: RuleKind,
    pub severity: Severity,
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Overrides `severity.weight()` for confidence scoring when present.
    pub weight: Option<u32>,
    pub payload: RulePayload,
}

fn default_true() -> bool {
    true
}

impl Rule {
    pub fn effective_weight(&self) -> u32 {
        self.weight.unwrap_or_else(|| self.severity.weight())
    }
}

/// Outcome of a heuristic probe. Only ever constructed when the heuristic
/// considers itself triggered — `None` from the probe function means no
/// outcome at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeuristicOutcome {
    pub matched: bool,
    pub details: Option<String>,
    pub confidence: Option<u32>,
}

/// Evidence that a rule fired during a scan, with positions already enriched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleMatch {
    pub rule_id: String,
    pub rule_name: String,
    pub rule_kind: RuleKind,
    pub severity: Severity,
    pub matches: Vec<String>,
    pub positions: Vec<crate::position::Position>,
    pub match_positions: Vec<crate::position::EnhancedPosition>,
    pub details: Option<String>,
    pub weight: u32,
    pub confidence_impact: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleCategory {
    pub id: String,
    pub name: String,
    pub description: String,
    pub rules: Vec<Rule>,
    #[serde(default)]
    pub is_custom: bool,
    pub source: Option<String>,
}

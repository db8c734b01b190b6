//! Fetches and validates community-contributed declarative rules.
//!
//! Feature-gated behind `community` so embedding the detection engine never
//! forces a networking stack on a caller that only needs `scan`. Executable
//! ("heuristic") rules are hard-rejected here — community content is never
//! allowed to introduce code into the scan path.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde::Deserialize;

use crate::error::{ForensicateError, Result};
use crate::rule::{Rule, RuleKind, RulePayload, Severity};

const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Deserialize)]
struct RawRule {
    id: String,
    name: String,
    description: String,
    kind: String,
    severity: String,
    pattern: Option<String>,
    #[serde(default)]
    keywords: Vec<String>,
    weight: Option<u32>,
    #[serde(default)]
    #[allow(dead_code)]
    references: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawIndex {
    files: Vec<String>,
}

struct CacheEntry {
    rule: Rule,
    fetched_at: Instant,
}

/// A per-process, in-memory cache of validated community rules keyed by id.
/// Last-writer-wins under concurrent fetches; entries are idempotently
/// re-derivable from the source, so that's an acceptable semantics.
pub struct CommunityCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl Default for CommunityCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl CommunityCache {
    pub fn new(ttl: Duration) -> Self {
        CommunityCache {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn clear(&self) {
        self.entries.lock().unwrap().clear();
    }

    fn get_fresh(&self, id: &str) -> Option<Rule> {
        let entries = self.entries.lock().unwrap();
        entries.get(id).and_then(|e| {
            if e.fetched_at.elapsed() < self.ttl {
                Some(e.rule.clone())
            } else {
                None
            }
        })
    }

    fn put(&self, rule: Rule) {
        let mut entries = self.entries.lock().unwrap();
        entries.insert(
            rule.id.clone(),
            CacheEntry {
                rule,
                fetched_at: Instant::now(),
            },
        );
    }
}

/// Fetches the rule index from `<base_url>/index.json`, then each listed
/// rule file, validating as it goes. Rules that fail validation are skipped
/// with their error recorded; other rules continue to load.
pub fn fetch_index(base_url: &str, cache: &CommunityCache) -> Result<Vec<Rule>> {
    let client = reqwest::blocking::Client::new();
    let index: RawIndex = client
        .get(format!("{base_url}/index.json"))
        .send()
        .map_err(|e| ForensicateError::CommunityFetch(e.to_string()))?
        .json()
        .map_err(|e| ForensicateError::CommunityFetch(e.to_string()))?;

    let mut rules = Vec::new();
    for file in index.files {
        match fetch_rule(&client, base_url, &file, cache) {
            Ok(rule) => rules.push(rule),
            Err(e) => {
                tracing::warn!(file = %file, error = %e, "skipping invalid community rule");
            }
        }
    }
    Ok(rules)
}

fn fetch_rule(
    client: &reqwest::blocking::Client,
    base_url: &str,
    file: &str,
    cache: &CommunityCache,
) -> Result<Rule> {
    if let Some(cached) = cache.get_fresh(file) {
        return Ok(cached);
    }

    let raw: RawRule = client
        .get(format!("{base_url}/{file}"))
        .send()
        .map_err(|e| ForensicateError::CommunityFetch(e.to_string()))?
        .json()
        .map_err(|e| ForensicateError::CommunityFetch(e.to_string()))?;

    let rule = validate_and_convert(raw)?;
    cache.put(rule.clone());
    Ok(rule)
}

fn validate_and_convert(raw: RawRule) -> Result<Rule> {
    if raw.id.is_empty() || raw.id.len() > 100 {
        return Err(ForensicateError::CommunityValidation {
            id: raw.id,
            reason: "id must be 1..=100 chars".into(),
        });
    }
    if raw.name.is_empty() || raw.name.len() > 200 {
        return Err(ForensicateError::CommunityValidation {
            id: raw.id,
            reason: "name must be 1..=200 chars".into(),
        });
    }
    if raw.description.len() > 1000 {
        return Err(ForensicateError::CommunityValidation {
            id: raw.id,
            reason: "description exceeds 1000 chars".into(),
        });
    }

    // Never accepted from the network — this would amount to remote code
    // execution against every caller that trusts the community feed.
    if raw.kind == "heuristic" {
        return Err(ForensicateError::CommunityValidation {
            id: raw.id,
            reason: "executable (heuristic) rules are never accepted from the network".into(),
        });
    }

    let severity: Severity = raw.severity.parse().map_err(|e| ForensicateError::CommunityValidation {
        id: raw.id.clone(),
        reason: e,
    })?;

    if let Some(w) = raw.weight {
        if w > 100 {
            return Err(ForensicateError::CommunityValidation {
                id: raw.id,
                reason: "weight must be 0..=100".into(),
            });
        }
    }

    let (kind, payload) = match raw.kind.as_str() {
        "keyword" => {
            if raw.keywords.is_empty() || raw.keywords.len() > 100 {
                return Err(ForensicateError::CommunityValidation {
                    id: raw.id,
                    reason: "must declare 1..=100 keywords".into(),
                });
            }
            for kw in &raw.keywords {
                if kw.is_empty() || kw.len() > 200 {
                    return Err(ForensicateError::CommunityValidation {
                        id: raw.id,
                        reason: "keyword exceeds 200 chars".into(),
                    });
                }
            }
            (RuleKind::Keyword, RulePayload::Keyword { keywords: raw.keywords })
        }
        "regex" => {
            let pattern = raw.pattern.unwrap_or_default();
            if pattern.is_empty() || pattern.len() > 2000 {
                return Err(ForensicateError::CommunityValidation {
                    id: raw.id,
                    reason: "pattern must be 1..=2000 chars".into(),
                });
            }
            if regex::Regex::new(&pattern).is_err() {
                return Err(ForensicateError::CommunityValidation {
                    id: raw.id,
                    reason: "invalid regex pattern".into(),
                });
            }
            (
                RuleKind::Regex,
                RulePayload::Pattern { pattern, flags: "gi".to_string() },
            )
        }
        other => {
            return Err(ForensicateError::CommunityValidation {
                id: raw.id,
                reason: format!("unknown kind '{other}'; valid: keyword, regex"),
            });
        }
    };

    Ok(Rule {
        id: raw.id,
        name: raw.name,
        description: raw.description,
        kind,
        severity,
        // Community rules start disabled — the operator must opt in.
        enabled: false,
        weight: raw.weight,
        payload,
    })
}

//! Local policy overrides loaded from `forensicate.toml`: disable built-in
//! rules, override their weights, or add declarative custom rules without
//! touching code. The library never reads this file itself — `Config::load`
//! is a plain function the CLI (or any other embedder) calls and then feeds
//! into `apply`.

use std::io::Read as _;
use std::path::Path;

use serde::Deserialize;

use crate::error::{ForensicateError, Result};
use crate::rule::{Rule, RuleKind, RulePayload, Severity};

/// Configs larger than this are rejected before parsing.
const MAX_CONFIG_BYTES: u64 = 1024 * 1024; // 1 MiB

#[derive(Debug, Deserialize)]
pub struct Config {
    pub version: u32,
    #[serde(default)]
    pub disabled_rules: Vec<DisabledRule>,
    #[serde(default)]
    pub weight_overrides: Vec<WeightOverride>,
    #[serde(default)]
    pub custom_rules: Vec<CustomRule>,
}

#[derive(Debug, Deserialize)]
pub struct DisabledRule {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct WeightOverride {
    pub id: String,
    pub weight: u32,
}

#[derive(Debug, Deserialize)]
pub struct CustomRule {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub pattern_kind: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub pattern: Option<String>,
    pub severity: String,
}

impl Config {
    pub fn load(path: &Path) -> Result<Config> {
        let content = read_capped(path)?;
        let config: Config =
            toml::from_str(&content).map_err(|source| ForensicateError::ConfigParse {
                path: path.into(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Looks for `forensicate.toml` in the current directory. A missing file
    /// is a normal "no local policy" outcome, not an error.
    pub fn load_from_cwd() -> Result<Option<Config>> {
        let path = Path::new("forensicate.toml");
        if !path.try_exists().unwrap_or(false) {
            return Ok(None);
        }
        Config::load(path).map(Some)
    }

    fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(ForensicateError::ConfigInvalid(format!(
                "unsupported version {}",
                self.version
            )));
        }
        for rule in &self.custom_rules {
            validate_custom_rule(rule)?;
        }
        for w in &self.weight_overrides {
            if w.weight > 100 {
                return Err(ForensicateError::ConfigInvalid(format!(
                    "weight override for '{}' must be 0..=100, got {}",
                    w.id, w.weight
                )));
            }
        }
        Ok(())
    }

    /// Applies this config's overrides to a base rule set, returning the
    /// effective rules used for a scan. Disabling wins over custom additions
    /// with the same id; weight overrides apply after.
    pub fn apply(&self, base: &[Rule]) -> Vec<Rule> {
        let disabled: std::collections::HashSet<&str> =
            self.disabled_rules.iter().map(|d| d.id.as_str()).collect();
        let weights: std::collections::HashMap<&str, u32> = self
            .weight_overrides
            .iter()
            .map(|w| (w.id.as_str(), w.weight))
            .collect();

        let mut rules: Vec<Rule> = base
            .iter()
            .map(|r| {
                let mut r = r.clone();
                if disabled.contains(r.id.as_str()) {
                    r.enabled = false;
                }
                if let Some(&w) = weights.get(r.id.as_str()) {
                    r.weight = Some(w);
                }
                r
            })
            .collect();

        for custom in &self.custom_rules {
            if let Ok(rule) = custom_rule_to_rule(custom) {
                rules.push(rule);
            }
        }
        rules
    }
}

/// Reads `path` into a string, rejecting it the moment it would exceed
/// `MAX_CONFIG_BYTES` rather than checking its metadata up front — a config
/// file can grow between the stat and the read, this can't.
fn read_capped(path: &Path) -> Result<String> {
    let file = std::fs::File::open(path).map_err(|source| ForensicateError::FileRead {
        path: path.into(),
        source,
    })?;
    let mut buf = Vec::new();
    file.take(MAX_CONFIG_BYTES + 1)
        .read_to_end(&mut buf)
        .map_err(|source| ForensicateError::FileRead {
            path: path.into(),
            source,
        })?;
    if buf.len() as u64 > MAX_CONFIG_BYTES {
        return Err(ForensicateError::ConfigInvalid(format!(
            "config file exceeds {MAX_CONFIG_BYTES} byte size limit"
        )));
    }
    String::from_utf8(buf)
        .map_err(|_| ForensicateError::ConfigInvalid("config file is not valid UTF-8".to_string()))
}

fn validate_custom_rule(rule: &CustomRule) -> Result<()> {
    if rule.id.is_empty() || rule.id.len() > 100 {
        return Err(ForensicateError::ConfigInvalid(format!(
            "custom rule id '{}' must be 1..=100 chars",
            rule.id
        )));
    }
    if rule.name.is_empty() || rule.name.len() > 200 {
        return Err(ForensicateError::ConfigInvalid(format!(
            "custom rule '{}' name must be 1..=200 chars",
            rule.id
        )));
    }
    if rule.description.len() > 1000 {
        return Err(ForensicateError::ConfigInvalid(format!(
            "custom rule '{}' description exceeds 1000 chars",
            rule.id
        )));
    }
    if rule.pattern_kind == "heuristic" {
        return Err(ForensicateError::ConfigInvalid(format!(
            "custom rule '{}' declares kind 'heuristic'; executable rules cannot be declared in local config",
            rule.id
        )));
    }
    if !matches!(rule.pattern_kind.as_str(), "keyword" | "regex") {
        return Err(ForensicateError::ConfigInvalid(format!(
            "custom rule '{}' has unknown pattern_kind '{}'; valid: keyword, regex",
            rule.id, rule.pattern_kind
        )));
    }
    if rule.pattern_kind == "keyword" {
        if rule.keywords.is_empty() || rule.keywords.len() > 100 {
            return Err(ForensicateError::ConfigInvalid(format!(
                "custom rule '{}' must declare 1..=100 keywords",
                rule.id
            )));
        }
        for kw in &rule.keywords {
            if kw.is_empty() || kw.len() > 200 {
                return Err(ForensicateError::ConfigInvalid(format!(
                    "custom rule '{}' keyword exceeds 200 chars",
                    rule.id
                )));
            }
        }
    }
    if rule.pattern_kind == "regex" {
        let pattern = rule.pattern.as_deref().unwrap_or_default();
        if pattern.is_empty() || pattern.len() > 2000 {
            return Err(ForensicateError::ConfigInvalid(format!(
                "custom rule '{}' pattern must be 1..=2000 chars",
                rule.id
            )));
        }
        if regex::Regex::new(pattern).is_err() {
            return Err(ForensicateError::ConfigInvalid(format!(
                "custom rule '{}' has an invalid regex pattern",
                rule.id
            )));
        }
    }
    rule.severity.parse::<Severity>().map_err(|e| ForensicateError::ConfigInvalid(format!(
        "custom rule '{}': {e}",
        rule.id
    )))?;
    Ok(())
}

fn custom_rule_to_rule(rule: &CustomRule) -> std::result::Result<Rule, String> {
    let severity: Severity = rule.severity.parse()?;
    let payload = match rule.pattern_kind.as_str() {
        "keyword" => RulePayload::Keyword {
            keywords: rule.keywords.clone(),
        },
        "regex" => RulePayload::Pattern {
            pattern: rule.pattern.clone().unwrap_or_default(),
            flags: "gi".to_string(),
        },
        other => return Err(format!("unsupported pattern_kind '{other}'")),
    };
    let kind = match rule.pattern_kind.as_str() {
        "keyword" => RuleKind::Keyword,
        "regex" => RuleKind::Regex,
        _ => unreachable!(),
    };
    Ok(Rule {
        id: rule.id.clone(),
        name: rule.name.clone(),
        description: rule.description.clone(),
        kind,
        severity,
        enabled: true,
        weight: None,
        payload,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    // Shared lock for tests that mutate the process working directory.
    static CWD_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

    fn write_temp_config(content: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f
    }

    #[test]
    fn parse_minimal_config() {
        let f = write_temp_config("version = 1\n");
        let config = Config::load(f.path()).unwrap();
        assert_eq!(config.version, 1);
        assert!(config.disabled_rules.is_empty());
        assert!(config.custom_rules.is_empty());
    }

    #[test]
    fn parse_disabled_and_weight_overrides() {
        let toml = r#"
version = 1

[[disabled_rules]]
id = "kw-ignore-instructions"

[[weight_overrides]]
id = "kw-dan-mode"
weight = 80
"#;
        let f = write_temp_config(toml);
        let config = Config::load(f.path()).unwrap();
        assert_eq!(config.disabled_rules[0].id, "kw-ignore-instructions");
        assert_eq!(config.weight_overrides[0].weight, 80);
    }

    #[test]
    fn parse_custom_keyword_rule() {
        let toml = r#"
version = 1

[[custom_rules]]
id = "custom-foo"
name = "Custom keyword"
pattern_kind = "keyword"
keywords = ["bypass company policy"]
severity = "high"
"#;
        let f = write_temp_config(toml);
        let config = Config::load(f.path()).unwrap();
        assert_eq!(config.custom_rules.len(), 1);
        assert_eq!(config.custom_rules[0].keywords[0], "bypass company policy");
    }

    #[test]
    fn heuristic_custom_rule_rejected() {
        let toml = r#"
version = 1

[[custom_rules]]
id = "custom-evil"
name = "Evil"
pattern_kind = "heuristic"
severity = "high"
"#;
        let f = write_temp_config(toml);
        let err = Config::load(f.path()).unwrap_err();
        assert!(err.to_string().contains("heuristic"), "got: {err}");
    }

    #[test]
    fn invalid_version_returns_error() {
        let f = write_temp_config("version = 99\n");
        let err = Config::load(f.path()).unwrap_err();
        assert!(err.to_string().contains("unsupported version 99"), "got: {err}");
    }

    #[test]
    fn missing_file_returns_none() {
        let _lock = CWD_LOCK.lock().unwrap();
        let tmp = tempfile::tempdir().unwrap();
        let original = std::env::current_dir().unwrap();
        std::env::set_current_dir(tmp.path()).unwrap();
        let result = Config::load_from_cwd();
        std::env::set_current_dir(original).unwrap();
        assert!(result.unwrap().is_none());
    }

    #[test]
    fn load_from_cwd_success() {
        let _guard = CWD_LOCK.lock().unwrap();
        let tmp = tempfile::tempdir().unwrap();
        let original = std::env::current_dir().unwrap();
        write_temp_config("version = 1\n")
            .persist(tmp.path().join("forensicate.toml"))
            .unwrap();
        std::env::set_current_dir(tmp.path()).unwrap();
        let result = Config::load_from_cwd();
        std::env::set_current_dir(original).unwrap();
        let cfg = result.unwrap().expect("should load the config");
        assert_eq!(cfg.version, 1);
    }

    #[test]
    fn config_too_large_rejected() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        let data = vec![b'#'; 1024 * 1024 + 1];
        f.write_all(&data).unwrap();
        let err = Config::load(f.path()).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("byte size limit"), "got: {msg}");
    }

    #[test]
    fn apply_disables_and_overrides_weight() {
        let base = vec![
            Rule {
                id: "a".into(),
                name: "a".into(),
                description: "a".into(),
                kind: RuleKind::Keyword,
                severity: Severity::Low,
                enabled: true,
                weight: None,
                payload: RulePayload::Keyword { keywords: vec!["x".into()] },
            },
        ];
        let toml = r#"
version = 1
[[disabled_rules]]
id = "a"
"#;
        let f = write_temp_config(toml);
        let config = Config::load(f.path()).unwrap();
        let applied = config.apply(&base);
        assert!(!applied[0].enabled);
    }
}

//! Rule-based prompt-injection detection engine.
//!
//! The engine is a pure function of `(text, rule_set, threshold)` — see
//! [`scan`]. Everything else in this crate (the built-in catalog, the
//! heuristics library, the compound-threat detector, the community rule
//! loader) feeds that one call.

pub mod catalog;
pub mod compound;
pub mod config;
#[cfg(feature = "community")]
pub mod community;
pub mod error;
pub mod heuristics;
pub mod matcher;
pub mod position;
pub mod rule;
pub mod scanner;

pub use compound::CompoundThreat;
pub use position::{EnhancedPosition, Position};
pub use rule::{HeuristicOutcome, Rule, RuleCategory, RuleKind, RuleMatch, Severity};
pub use scanner::{rule_stats, scan, scan_with_categories, RuleStats, ScanResult, MAX_SCAN_CHARS};

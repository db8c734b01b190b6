//! Shannon-entropy sliding window — an encoding probe. High-entropy spans
//! (base64 blobs, obfuscated payloads) tend to carry unusually flat
//! character distributions across short windows.

use crate::rule::HeuristicOutcome;

const WINDOW: usize = 64;
const STEP: usize = 32;
const HIGH_ENTROPY_THRESHOLD: f64 = 4.5;
const MIN_HIGH_RATIO: f64 = 0.3;
const MIN_HIGH_WINDOWS: usize = 2;

pub fn probe(text: &str) -> Option<HeuristicOutcome> {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() < 32 {
        return None;
    }

    let mut total_windows = 0usize;
    let mut high_windows = 0usize;
    let mut i = 0usize;
    while i < chars.len() {
        let end = (i + WINDOW).min(chars.len());
        let window = &chars[i..end];
        if window.len() >= 8 {
            total_windows += 1;
            if shannon_entropy(window) > HIGH_ENTROPY_THRESHOLD {
                high_windows += 1;
            }
        }
        if end == chars.len() {
            break;
        }
        i += STEP;
    }

    if total_windows == 0 {
        return None;
    }
    let ratio = high_windows as f64 / total_windows as f64;
    if high_windows >= MIN_HIGH_WINDOWS && ratio >= MIN_HIGH_RATIO {
        Some(HeuristicOutcome {
            matched: true,
            details: Some(format!(
                "{high_windows}/{total_windows} windows with entropy above {HIGH_ENTROPY_THRESHOLD} ({:.0}% ratio)",
                ratio * 100.0
            )),
            confidence: Some((ratio * 100.0).min(80.0) as u32),
        })
    } else {
        None
    }
}

fn shannon_entropy(window: &[char]) -> f64 {
    let mut counts: std::collections::HashMap<char, u32> = std::collections::HashMap::new();
    for &c in window {
        *counts.entry(c).or_insert(0) += 1;
    }
    let len = window.len() as f64;
    counts
        .values()
        .map(|&count| {
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_yields_none() {
        assert!(probe("short").is_none());
    }

    #[test]
    fn repetitive_text_is_low_entropy() {
        let text = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
        assert!(probe(text).is_none());
    }

    #[test]
    fn high_entropy_blob_triggers() {
        let blob = "aB3kZ9qL2xW7mN4pR8tY1vC6sD0fG5hJ bK2nM8pQ4rT6wX1zA3cE7gI9lO0uY5";
        let text = blob.repeat(4);
        let outcome = probe(&text);
        assert!(outcome.is_some());
    }
}

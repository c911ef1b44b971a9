//! GFWList subscription parsing.
//!
//! Lists are distributed either as plain text or as base64 wrapped at a fixed
//! line width. Only the domain part of each rule is kept; exception rules
//! (`@@`) are dropped rather than subtracted.

use std::collections::HashSet;

use base64::{engine::general_purpose::STANDARD, Engine};
use once_cell::sync::Lazy;
use regex::Regex;

/// Trailing domain with an alphabetic TLD of two or more letters.
static DOMAIN_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([A-Za-z0-9.-]+\.[A-Za-z]{2,})$").expect("domain pattern is valid")
});

/// Characters that end the host part of a rule.
const RULE_SEPARATORS: [char; 4] = ['/', '^', '*', '?'];

/// Decode list content, falling back to the raw bytes when it is not base64.
pub fn decode_list(raw: &[u8]) -> String {
    let compact: Vec<u8> = raw
        .iter()
        .copied()
        .filter(|b| *b != b'\r' && *b != b'\n')
        .collect();

    match STANDARD.decode(&compact) {
        Ok(decoded) => String::from_utf8_lossy(&decoded).into_owned(),
        Err(_) => String::from_utf8_lossy(raw).into_owned(),
    }
}

/// Extract the domain from a single list line, if it carries one.
pub fn extract_domain(line: &str) -> Option<String> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('!') || line.starts_with('[') || line.starts_with("@@")
    {
        return None;
    }

    let mut rule = line.trim_start_matches(&['|', '.'][..]);
    if let Some(idx) = rule.find(&RULE_SEPARATORS[..]) {
        rule = &rule[..idx];
    }
    let rule = rule.trim_matches('.');

    DOMAIN_PATTERN
        .captures(rule)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_ascii_lowercase())
}

/// Parse decoded list text into a fresh domain set.
pub fn parse_list(content: &str) -> HashSet<String> {
    content.lines().filter_map(extract_domain).collect()
}

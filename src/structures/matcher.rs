//! String Matching Module
//!
//! Fuzzy, similarity and regex helpers used for key and path lookups.

use regex::Regex;
use tracing::debug;

// == Fuzzy Match ==
/// Returns true if every character of `pattern` occurs in `text` in order,
/// not necessarily contiguously. Matching is case-sensitive; an empty pattern
/// matches anything.
pub fn fuzzy_match(pattern: &str, text: &str) -> bool {
    let mut remaining = text.chars();
    pattern
        .chars()
        .all(|wanted| remaining.by_ref().any(|ch| ch == wanted))
}

// == Levenshtein ==
/// Edit distance (insertions, deletions, substitutions) between `a` and `b`,
/// counted in chars.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    // Single rolling row over b
    let mut row: Vec<usize> = (0..=b.len()).collect();
    for (i, ca) in a.iter().enumerate() {
        let mut diagonal = row[0];
        row[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = diagonal + usize::from(ca != cb);
            diagonal = row[j + 1];
            row[j + 1] = substitution.min(row[j] + 1).min(diagonal + 1);
        }
    }
    row[b.len()]
}

// == Similarity ==
/// Normalized similarity in `[0, 1]`: `1 - distance / longest length`.
///
/// Identical strings (including two empty strings) score 1.0.
pub fn similarity(a: &str, b: &str) -> f64 {
    let longest = a.chars().count().max(b.chars().count());
    if longest == 0 {
        return 1.0;
    }
    1.0 - levenshtein(a, b) as f64 / longest as f64
}

// == Regex Match ==
/// Returns true if `pattern` matches anywhere in `text`. An invalid pattern
/// never matches.
pub fn regex_match(pattern: &str, text: &str) -> bool {
    match Regex::new(pattern) {
        Ok(re) => re.is_match(text),
        Err(err) => {
            debug!("Rejecting invalid pattern {:?}: {}", pattern, err);
            false
        }
    }
}

pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

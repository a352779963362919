//! Raw header cleaning for the bronze tier.
//!
//! Source extracts arrive with display-oriented column names
//! (`"Days for shipping (real)"`, `"Order Item Id"`). Every downstream table
//! keys on the cleaned snake_case form, so this transform runs exactly once,
//! at ingestion.

use std::collections::HashMap;

/// Reduces a raw header to the canonical `[a-z0-9_]*` form: trim, lowercase,
/// separator runs (whitespace, `-`, `/`) become a single `_`, parentheses
/// vanish, anything else non-alphanumeric is dropped, `_` runs collapse.
///
/// Total over any input; the empty string is a legal (degenerate) output.
pub fn clean_column_name(name: &str) -> String {
    let mut cleaned = String::with_capacity(name.len());
    for ch in name.trim().to_lowercase().chars() {
        match ch {
            'a'..='z' | '0'..='9' => cleaned.push(ch),
            '_' | '-' | '/' => push_separator(&mut cleaned),
            c if c.is_whitespace() => push_separator(&mut cleaned),
            _ => {}
        }
    }
    cleaned
}

fn push_separator(out: &mut String) {
    if !out.ends_with('_') {
        out.push('_');
    }
}

/// Cleans every header and disambiguates collisions positionally: the first
/// occurrence keeps the cleaned name, the Nth gains an `_{N}` suffix.
///
/// Deterministic for a fixed input order; reordering the source columns can
/// shift which duplicate receives which suffix.
pub fn clean_column_names(names: &[String]) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut out = Vec::with_capacity(names.len());
    for raw in names {
        let cleaned = clean_column_name(raw);
        let unique = match seen.get(&cleaned).copied() {
            None => {
                seen.insert(cleaned.clone(), 0);
                cleaned
            }
            Some(prior) => {
                let mut n = prior + 1;
                let mut candidate = format!("{cleaned}_{n}");
                // A raw column may already occupy the suffixed name.
                while seen.contains_key(&candidate) {
                    n += 1;
                    candidate = format!("{cleaned}_{n}");
                }
                seen.insert(cleaned, n);
                seen.insert(candidate.clone(), 0);
                candidate
            }
        };
        out.push(unique);
    }
    out
}

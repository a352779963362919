//! Text canonicalization for the silver standardization tier.
//!
//! Two tiers of derived fields. `_std` is the display-safe form: trimmed,
//! interior whitespace runs collapsed. `_key` is the grouping form layered
//! on `_std`: uppercased, stripped of everything outside letters, digits, and
//! the plain space, whitespace collapsed again. Both are pure and idempotent.
//!
//! The key rules mirror the warehouse SQL they replaced
//! (`regexp_replace(x, '[^\p{L}\p{N} ]', '')` then `'\s+' -> ' '`), Unicode
//! classes included, so keys computed here join cleanly against keys computed
//! by any leftover queries.

use std::sync::LazyLock;

use regex::Regex;

static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern"));
static NON_LETTER_DIGIT_SPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\p{L}\p{N} ]").expect("strip pattern"));

/// Known spellings of the United States observed in the country columns.
/// Maintained enumeration, not a closed set; extend as new variants surface.
pub const USA_VARIANTS: &[&str] = &[
    "EE. UU.",
    "EE.UU.",
    "EE UU",
    "ESTADOS UNIDOS",
    "Estados Unidos",
    "United States",
    "USA",
];

pub const USA_TOKEN: &str = "USA";

/// `_std` tier: trim, collapse interior whitespace runs to a single space.
pub fn standardize(value: &str) -> String {
    WHITESPACE_RUN.replace_all(value.trim(), " ").into_owned()
}

/// `_key` tier: uppercase, strip everything but letters/digits/space,
/// collapse whitespace. Applied to an already-standardized value.
pub fn grouping_key(value: &str) -> String {
    let upper = value.to_uppercase();
    let stripped = NON_LETTER_DIGIT_SPACE.replace_all(&upper, "");
    WHITESPACE_RUN.replace_all(&stripped, " ").into_owned()
}

/// Country keys check the USA variant table before the generic rule: the
/// generic strip turns `"EE. UU."` into `"EE UU"`, which no longer equals
/// any other spelling of the same country, so the substitution must win
/// first.
pub fn country_grouping_key(std_value: &str) -> String {
    if USA_VARIANTS.contains(&std_value) {
        USA_TOKEN.to_string()
    } else {
        grouping_key(std_value)
    }
}

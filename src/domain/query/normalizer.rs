//! Query text canonicalization

/// Canonicalizes query text for cheap equality checks.
///
/// Trims, collapses every internal whitespace run to a single space and
/// lowercases. Total and idempotent.
pub fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Equality under [`normalize`]
pub fn equivalent(a: &str, b: &str) -> bool {
    normalize(a) == normalize(b)
}

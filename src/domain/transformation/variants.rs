//! Parsing of LLM-generated query variants

use once_cell::sync::Lazy;
use regex::Regex;

/// Default minimum length for a parsed variant
pub const DEFAULT_MIN_VARIANT_LENGTH: usize = 10;

static LIST_MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(?:\d+\s*[.)]|[-*•])\s*").unwrap());

/// Strips one leading list marker ("1.", "2)", "-", "*", "•")
pub fn strip_list_marker(line: &str) -> &str {
    let trimmed = line.trim();
    match LIST_MARKER.find(trimmed) {
        Some(m) => trimmed[m.end()..].trim(),
        None => trimmed,
    }
}

/// Parses a numbered or bulleted list into query variants.
///
/// Lines whose cleaned text is shorter than `min_length` characters are
/// discarded. If fewer than two variants survive, `original` is appended.
/// The result is truncated to `num_variants` (at least one).
pub fn parse_variants(
    response: &str,
    original: &str,
    num_variants: usize,
    min_length: usize,
) -> Vec<String> {
    let mut variants: Vec<String> = response
        .lines()
        .map(strip_list_marker)
        .filter(|line| line.chars().count() >= min_length)
        .map(str::to_string)
        .collect();

    if variants.len() < 2 {
        variants.push(original.to_string());
    }

    variants.truncate(num_variants.max(1));
    variants
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_list_marker() {
        assert_eq!(strip_list_marker("1. What is the policy"), "What is the policy");
        assert_eq!(strip_list_marker("  2) Steps to apply"), "Steps to apply");
        assert_eq!(strip_list_marker("- bullet item"), "bullet item");
        assert_eq!(strip_list_marker("• dotted item"), "dotted item");
        assert_eq!(strip_list_marker("* starred item"), "starred item");
        assert_eq!(strip_list_marker("no marker"), "no marker");
    }

    #[test]
    fn test_parse_numbered_list() {
        let response = "1. What is the annual leave entitlement\n\
                        2. How many vacation days are authorized\n\
                        3. Leave allowance per year";

        let variants = parse_variants(response, "How many days of leave?", 3, 10);

        assert_eq!(
            variants,
            vec![
                "What is the annual leave entitlement",
                "How many vacation days are authorized",
                "Leave allowance per year",
            ]
        );
    }

    #[test]
    fn test_short_lines_discarded() {
        let response = "1. short\n2. Another sufficiently long variant\n\n-\n3. Third long enough variant";

        let variants = parse_variants(response, "original", 4, 10);

        assert_eq!(
            variants,
            vec![
                "Another sufficiently long variant",
                "Third long enough variant"
            ]
        );
    }

    #[test]
    fn test_fewer_than_two_appends_original() {
        let variants = parse_variants("1. Only one usable variant here", "orig query", 4, 10);

        assert_eq!(variants, vec!["Only one usable variant here", "orig query"]);
    }

    #[test]
    fn test_empty_response_yields_original() {
        assert_eq!(parse_variants("", "orig query", 3, 10), vec!["orig query"]);
    }

    #[test]
    fn test_truncates_to_requested_count() {
        let response = "1. first variant text\n2. second variant text\n3. third variant text";

        let variants = parse_variants(response, "orig", 2, 10);

        assert_eq!(variants.len(), 2);
        assert_eq!(variants[0], "first variant text");
    }
}

//! Extraction of closing issue references from a description.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

#[expect(
    clippy::expect_used,
    reason = "the pattern is a literal that always compiles"
)]
fn compile_closing_reference() -> Regex {
    Regex::new(r"(?i)\b(?:close[sd]?|fix(?:e[sd])?|resolve[sd]?):?\s+#(\d+)\b")
        .expect("closing reference pattern should compile")
}

static CLOSING_REFERENCE: LazyLock<Regex> = LazyLock::new(compile_closing_reference);

/// Returns issue numbers referenced with a closing keyword.
///
/// Keywords are `close`, `closes`, `closed`, `fix`, `fixes`, `fixed`,
/// `resolve`, `resolves`, and `resolved`, matched case-insensitively and
/// optionally followed by a colon. Numbers appear once, in order of first
/// mention. Plain `#N` mentions without a keyword are ignored.
#[must_use]
pub fn extract_linked_issues(description: &str) -> Vec<u64> {
    let mut seen = HashSet::new();
    CLOSING_REFERENCE
        .captures_iter(description)
        .filter_map(|captures| captures.get(1))
        .filter_map(|number| number.as_str().parse::<u64>().ok())
        .filter(|number| *number > 0 && seen.insert(*number))
        .collect()
}

use regex::Regex;
use std::collections::BTreeSet;
use std::sync::OnceLock;

pub const MAX_KEYWORDS: usize = 50;

static TOKEN_RE: OnceLock<Regex> = OnceLock::new();

fn token_re() -> &'static Regex {
    TOKEN_RE.get_or_init(|| Regex::new(r"[a-zA-Z0-9_\-]{2,}").unwrap())
}

/// Notable terms from the brief and checks: lower-cased tokens of two or more
/// word/hyphen characters, de-duplicated, sorted, first [`MAX_KEYWORDS`].
pub fn extract_keywords(brief: &str, checks: &[String]) -> Vec<String> {
    let source = std::iter::once(brief)
        .chain(checks.iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join(" ");

    token_re()
        .find_iter(&source)
        .map(|m| m.as_str().to_lowercase())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .take(MAX_KEYWORDS)
        .collect()
}

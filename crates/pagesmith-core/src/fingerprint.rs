//! Design fingerprint: a compact structural summary of the generated app.
//!
//! Extracted purely from artifact text so later rounds can be told which
//! colors, variables, element ids, function/event names and endpoints exist
//! and must not be silently dropped.

use crate::error::Result;
use crate::io::{atomic_write, read_optional};
use crate::paths::{self, INDEX_HTML, MAIN_JS, STYLE_CSS};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::sync::OnceLock;
use tracing::warn;

pub const MAX_COLORS: usize = 12;
pub const MAX_CSS_VARS: usize = 20;
pub const MAX_IDS: usize = 40;
pub const MAX_FUNCTIONS: usize = 40;
pub const MAX_ENDPOINTS: usize = 40;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesignFingerprint {
    #[serde(default)]
    pub colors: Vec<String>,
    #[serde(default)]
    pub css_vars: Vec<String>,
    #[serde(default)]
    pub ids: Vec<String>,
    /// Named function declarations followed by subscribed event names.
    #[serde(default)]
    pub functions: Vec<String>,
    #[serde(default)]
    pub endpoints: Vec<String>,
}

// ---------------------------------------------------------------------------
// Patterns
// ---------------------------------------------------------------------------

struct Patterns {
    color: Regex,
    css_var: Regex,
    id: Regex,
    function: Regex,
    listener: Regex,
    fetch: Regex,
}

static PATTERNS: OnceLock<Patterns> = OnceLock::new();

fn patterns() -> &'static Patterns {
    PATTERNS.get_or_init(|| Patterns {
        color: Regex::new(r"#[0-9a-fA-F]{3,8}").unwrap(),
        css_var: Regex::new(r"(--[a-zA-Z0-9_-]+)\s*:").unwrap(),
        id: Regex::new(r#"id="([a-zA-Z0-9_-]+)""#).unwrap(),
        function: Regex::new(r"function\s+([a-zA-Z0-9_]+)\s*\(").unwrap(),
        listener: Regex::new(r#"addEventListener\(\s*["']([^"']+)["']"#).unwrap(),
        fetch: Regex::new(r#"fetch\(\s*["']([^"']+)"#).unwrap(),
    })
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

impl DesignFingerprint {
    /// Extract from the stylesheet, entry page and script in `dir`.
    ///
    /// Missing or unreadable files leave their fields empty; never fails.
    pub fn extract(dir: &Path) -> Self {
        let css = read_optional(&dir.join(STYLE_CSS));
        let html = read_optional(&dir.join(INDEX_HTML));
        let js = read_optional(&dir.join(MAIN_JS));
        Self::from_sources(css.as_deref(), html.as_deref(), js.as_deref())
    }

    /// Pure form of [`DesignFingerprint::extract`] over already-loaded text.
    pub fn from_sources(css: Option<&str>, html: Option<&str>, js: Option<&str>) -> Self {
        let p = patterns();
        let mut fp = DesignFingerprint::default();

        if let Some(css) = css {
            fp.colors = unique_capped(p.color.find_iter(css).map(|m| m.as_str()), MAX_COLORS);
            fp.css_vars = unique_capped(captures(&p.css_var, css), MAX_CSS_VARS);
        }
        if let Some(html) = html {
            fp.ids = unique_capped(captures(&p.id, html), MAX_IDS);
        }
        if let Some(js) = js {
            let names = captures(&p.function, js).chain(captures(&p.listener, js));
            fp.functions = unique_capped(names, MAX_FUNCTIONS);
            fp.endpoints = unique_capped(captures(&p.fetch, js), MAX_ENDPOINTS);
        }
        fp
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
            && self.css_vars.is_empty()
            && self.ids.is_empty()
            && self.functions.is_empty()
            && self.endpoints.is_empty()
    }

    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    /// Load the persisted fingerprint from `dir`, if one exists and parses.
    pub fn load(dir: &Path) -> Option<Self> {
        let path = paths::design_state_path(dir);
        let data = read_optional(&path)?;
        match serde_json::from_str(&data) {
            Ok(fp) => Some(fp),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ignoring unparsable design state");
                None
            }
        }
    }

    /// Replace the persisted fingerprint in `dir` as a whole file.
    pub fn save(&self, dir: &Path) -> Result<()> {
        let data = serde_json::to_string_pretty(self)?;
        atomic_write(&paths::design_state_path(dir), data.as_bytes())
    }
}

fn captures<'t>(re: &'t Regex, text: &'t str) -> impl Iterator<Item = &'t str> + 't {
    re.captures_iter(text)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
}

/// First-seen-order de-duplication, truncated to `cap` entries.
fn unique_capped<'a>(items: impl Iterator<Item = &'a str>, cap: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    items
        .filter(|item| seen.insert(*item))
        .take(cap)
        .map(str::to_string)
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

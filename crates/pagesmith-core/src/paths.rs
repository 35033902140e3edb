use crate::error::{PagesmithError, Result};
use regex::Regex;
use std::path::{Component, Path, PathBuf};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Well-known artifact names (all at the target directory root)
// ---------------------------------------------------------------------------

pub const INDEX_HTML: &str = "index.html";
pub const MAIN_JS: &str = "main.js";
pub const STYLE_CSS: &str = "style.css";
pub const SERVICE_WORKER_JS: &str = "service-worker.js";
pub const README_MD: &str = "README.md";
pub const LICENSE: &str = "LICENSE";

/// Persisted design fingerprint, read at the start of a round and replaced at the end.
pub const DESIGN_STATE_FILE: &str = ".design_state.json";

/// Version-control metadata directory; never touched by the fallback sweep.
pub const GIT_DIR: &str = ".git";

/// Files snapshotted into the prompt for continuity, in prompt order.
pub const SNAPSHOT_FILES: &[&str] = &[INDEX_HTML, MAIN_JS, STYLE_CSS, SERVICE_WORKER_JS, README_MD];

/// Files an update round expects to find before the fallback may touch anything.
pub const REQUIRED_FOR_UPDATE: &[&str] = &[INDEX_HTML, README_MD, LICENSE];

/// Extensions the fallback gallery picks up from the directory root.
pub const GALLERY_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "svg", "csv", "md", "json"];

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn design_state_path(dir: &Path) -> PathBuf {
    dir.join(DESIGN_STATE_FILE)
}

pub fn license_path(dir: &Path) -> PathBuf {
    dir.join(LICENSE)
}

pub fn readme_path(dir: &Path) -> PathBuf {
    dir.join(README_MD)
}

/// Resolve a model-supplied relative path inside `dir`.
///
/// Returns `None` for empty, absolute, or parent-escaping paths, and for
/// anything under the version-control directory.
pub fn resolve_artifact_path(dir: &Path, rel: &str) -> Option<PathBuf> {
    let rel_path = Path::new(rel);
    if rel.trim().is_empty() || rel_path.is_absolute() {
        return None;
    }
    for component in rel_path.components() {
        match component {
            Component::Normal(_) | Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    if first_component_is(rel, GIT_DIR) {
        return None;
    }
    Some(dir.join(rel_path))
}

/// `true` when the first non-`.` component of `rel` equals `name`.
fn first_component_is(rel: &str, name: &str) -> bool {
    Path::new(rel)
        .components()
        .find(|c| !matches!(c, Component::CurDir))
        .is_some_and(|c| c.as_os_str() == name)
}

/// `true` when `rel` names the persisted fingerprint at the root.
pub fn is_design_state(rel: &str) -> bool {
    is_root_file(rel, DESIGN_STATE_FILE)
}

/// `true` when `rel` names the license artifact at the root.
pub fn is_license(rel: &str) -> bool {
    is_root_file(rel, LICENSE)
}

fn is_root_file(rel: &str, name: &str) -> bool {
    Path::new(rel)
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .eq(Path::new(name).components())
}

// ---------------------------------------------------------------------------
// Repository name validation
// ---------------------------------------------------------------------------

const MAX_REPO_NAME_LEN: usize = 100;

static REPO_NAME_RE: OnceLock<Regex> = OnceLock::new();

fn repo_name_re() -> &'static Regex {
    REPO_NAME_RE.get_or_init(|| Regex::new(r"^[a-z0-9][a-z0-9._-]*$").unwrap())
}

/// A repository name is a single path component: it starts with a letter or
/// digit, holds no separators, and never contains `..`.
pub fn validate_repo_name(name: &str) -> Result<()> {
    if name.len() > MAX_REPO_NAME_LEN || name.contains("..") || !repo_name_re().is_match(name) {
        return Err(PagesmithError::InvalidRepoName(name.to_string()));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

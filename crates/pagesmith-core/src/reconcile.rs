//! Round-aware write policy for model-produced artifact sets.
//!
//! Round 1 writes every path. Later rounds only overwrite paths that already
//! exist; new paths are skipped. LICENSE and the persisted fingerprint are
//! never taken from the model, and nothing is written under `.git`.

use crate::error::{PagesmithError, Result};
use crate::extract::ArtifactSet;
use crate::io::atomic_write;
use crate::paths::{self, LICENSE, README_MD};
use crate::readme::minimal_readme;
use crate::round::RoundContext;
use std::path::Path;
use tracing::{info, warn};

/// Apply `artifacts` to `dir` under the round's write policy.
///
/// Returns the relative paths actually written, in write order. On update
/// rounds a missing LICENSE fails the call before anything is written.
pub fn reconcile(
    dir: &Path,
    ctx: &RoundContext,
    artifacts: &ArtifactSet,
    license_text: &str,
) -> Result<Vec<String>> {
    let round = ctx.round;
    let license_path = paths::license_path(dir);
    if round.is_update() && !license_path.is_file() {
        return Err(PagesmithError::LicenseMissing { round: round.get() });
    }

    let mut written = Vec::with_capacity(artifacts.len() + 2);

    for (rel, content) in artifacts {
        if paths::is_license(rel) || paths::is_design_state(rel) {
            continue;
        }
        let Some(target) = paths::resolve_artifact_path(dir, rel) else {
            warn!(path = %rel, "skipping artifact path outside the target directory");
            continue;
        };
        if round.is_update() && !target.is_file() {
            info!(path = %rel, %round, "skipping creation of new file on update round");
            continue;
        }
        atomic_write(&target, content.as_bytes())?;
        written.push(rel.clone());
    }

    atomic_write(&license_path, license_text.as_bytes())?;
    written.push(LICENSE.to_string());

    if round.is_initial() {
        let readme = paths::readme_path(dir);
        if !readme.exists() {
            info!("model output had no README.md; writing a minimal one");
            atomic_write(&readme, minimal_readme(ctx).as_bytes())?;
            written.push(README_MD.to_string());
        }
    }

    Ok(written)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::round::Round;
    use tempfile::TempDir;

    fn set(pairs: &[(&str, &str)]) -> ArtifactSet {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn ctx(round: u32) -> RoundContext {
        RoundContext::new("demo", Round::new(round).unwrap(), "A demo brief")
            .with_checks(["#app exists"])
    }

    fn read(dir: &TempDir, name: &str) -> String {
        std::fs::read_to_string(dir.path().join(name)).unwrap()
    }

    #[test]
    fn first_round_writes_everything() {
        let dir = TempDir::new().unwrap();
        let artifacts = set(&[("a.html", "<p>x</p>"), ("b.js", "y")]);
        let written = reconcile(dir.path(), &ctx(1), &artifacts, "LICENSE TEXT").unwrap();

        assert_eq!(read(&dir, "a.html"), "<p>x</p>");
        assert_eq!(read(&dir, "b.js"), "y");
        assert_eq!(read(&dir, "LICENSE"), "LICENSE TEXT");
        assert!(written.contains(&"a.html".to_string()));
        assert!(written.contains(&"b.js".to_string()));
    }

    #[test]
    fn first_round_creates_nested_directories() {
        let dir = TempDir::new().unwrap();
        let artifacts = set(&[("assets/data.json", "{}")]);
        reconcile(dir.path(), &ctx(1), &artifacts, "L").unwrap();
        assert_eq!(read(&dir, "assets/data.json"), "{}");
    }

    #[test]
    fn first_round_synthesizes_missing_readme() {
        let dir = TempDir::new().unwrap();
        let written =
            reconcile(dir.path(), &ctx(1), &set(&[("index.html", "x")]), "L").unwrap();
        assert!(written.contains(&"README.md".to_string()));
        let readme = read(&dir, "README.md");
        assert!(readme.contains("## Keyword coverage"));
        assert!(readme.contains("\"demo\""));
    }

    #[test]
    fn first_round_keeps_model_readme() {
        let dir = TempDir::new().unwrap();
        let artifacts = set(&[("README.md", "# Mine")]);
        reconcile(dir.path(), &ctx(1), &artifacts, "L").unwrap();
        assert_eq!(read(&dir, "README.md"), "# Mine");
    }

    #[test]
    fn update_round_only_overwrites_existing_files() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("index.html"), "old").unwrap();
        std::fs::write(dir.path().join("LICENSE"), "old license").unwrap();

        let artifacts = set(&[("index.html", "new"), ("extra.js", "z")]);
        let written = reconcile(dir.path(), &ctx(2), &artifacts, "L2").unwrap();

        assert_eq!(read(&dir, "index.html"), "new");
        assert!(!dir.path().join("extra.js").exists());
        assert_eq!(read(&dir, "LICENSE"), "L2");
        assert_eq!(written, vec!["index.html".to_string(), "LICENSE".to_string()]);
    }

    #[test]
    fn update_round_without_license_fails_before_writing() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("index.html"), "old").unwrap();

        let err = reconcile(dir.path(), &ctx(2), &set(&[("index.html", "new")]), "L")
            .unwrap_err();
        assert!(matches!(err, PagesmithError::LicenseMissing { round: 2 }));
        assert!(err.is_structural());
        assert_eq!(read(&dir, "index.html"), "old");
        assert!(!dir.path().join("LICENSE").exists());
    }

    #[test]
    fn update_round_does_not_synthesize_readme() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("LICENSE"), "old").unwrap();
        reconcile(dir.path(), &ctx(2), &ArtifactSet::new(), "L").unwrap();
        assert!(!dir.path().join("README.md").exists());
    }

    #[test]
    fn model_license_is_replaced_by_canonical_text() {
        let dir = TempDir::new().unwrap();
        let artifacts = set(&[("LICENSE", "truncated MIT...")]);
        let written = reconcile(dir.path(), &ctx(1), &artifacts, "CANONICAL").unwrap();
        assert_eq!(read(&dir, "LICENSE"), "CANONICAL");
        assert_eq!(written.iter().filter(|p| *p == "LICENSE").count(), 1);
    }

    #[test]
    fn escaping_paths_are_skipped() {
        let parent = TempDir::new().unwrap();
        let dir = parent.path().join("site");
        std::fs::create_dir(&dir).unwrap();
        let artifacts = set(&[("../evil.js", "x"), ("ok.js", "y")]);
        let written = reconcile(&dir, &ctx(1), &artifacts, "L").unwrap();
        assert!(!parent.path().join("evil.js").exists());
        assert!(written.contains(&"ok.js".to_string()));
        assert!(!written.contains(&"../evil.js".to_string()));
    }

    #[test]
    fn version_control_paths_are_never_written() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join(".git/hooks")).unwrap();
        let artifacts = set(&[
            (".git/hooks/pre-commit", "#!/bin/sh\ntouch /tmp/owned"),
            ("./.git/config", "[core]"),
            ("index.html", "<p>x</p>"),
        ]);
        let written = reconcile(dir.path(), &ctx(1), &artifacts, "L").unwrap();
        assert!(!dir.path().join(".git/hooks/pre-commit").exists());
        assert!(!dir.path().join(".git/config").exists());
        assert!(written.iter().all(|p| !p.contains(".git/")));
        assert_eq!(read(&dir, "index.html"), "<p>x</p>");
    }

    #[test]
    fn model_design_state_is_ignored() {
        let dir = TempDir::new().unwrap();
        let artifacts = set(&[(".design_state.json", "{\"colors\":[\"#000\"]}")]);
        let written = reconcile(dir.path(), &ctx(1), &artifacts, "L").unwrap();
        assert!(!dir.path().join(".design_state.json").exists());
        assert!(!written.contains(&".design_state.json".to_string()));
    }
}

use crate::fingerprint::DesignFingerprint;
use crate::io::{read_optional, truncate_chars};
use crate::paths::SNAPSHOT_FILES;
use crate::round::Round;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

/// Prior-round context injected into the next generation request.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Continuity {
    pub fingerprint: DesignFingerprint,
    /// Well-known artifact name → first `snapshot_chars` characters.
    pub snapshots: BTreeMap<String, String>,
}

impl Continuity {
    /// Rebuild continuity state for `dir` ahead of `round`.
    ///
    /// Uses the persisted fingerprint on update rounds; on round 1, or when
    /// nothing was persisted, recomputes it from whatever artifacts exist.
    /// Never fails: unreadable files are simply left out.
    pub fn load(dir: &Path, round: Round, snapshot_chars: usize) -> Self {
        let persisted = if round.is_initial() {
            None
        } else {
            DesignFingerprint::load(dir)
        };
        let fingerprint = match persisted {
            Some(fp) => fp,
            None => {
                debug!(dir = %dir.display(), "recomputing design fingerprint");
                DesignFingerprint::extract(dir)
            }
        };

        let snapshots = SNAPSHOT_FILES
            .iter()
            .filter_map(|name| {
                let content = read_optional(&dir.join(name))?;
                Some((
                    name.to_string(),
                    truncate_chars(&content, snapshot_chars).to_string(),
                ))
            })
            .collect();

        Self {
            fingerprint,
            snapshots,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn snapshots_existing_well_known_files_only() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("index.html"), "<p>hi</p>").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
        let c = Continuity::load(dir.path(), Round::FIRST, 4000);
        assert_eq!(c.snapshots.len(), 1);
        assert_eq!(c.snapshots["index.html"], "<p>hi</p>");
    }

    #[test]
    fn snapshots_are_truncated() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("main.js"), "x".repeat(5000)).unwrap();
        let c = Continuity::load(dir.path(), Round::FIRST, 4000);
        assert_eq!(c.snapshots["main.js"].len(), 4000);
    }

    #[test]
    fn update_round_prefers_persisted_fingerprint() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("style.css"), "a{color:#abc}").unwrap();
        let persisted = DesignFingerprint {
            colors: vec!["#123456".into()],
            ..Default::default()
        };
        persisted.save(dir.path()).unwrap();

        let c = Continuity::load(dir.path(), Round::new(2).unwrap(), 4000);
        assert_eq!(c.fingerprint.colors, vec!["#123456"]);
    }

    #[test]
    fn first_round_recomputes_even_when_persisted() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("style.css"), "a{color:#abc}").unwrap();
        DesignFingerprint {
            colors: vec!["#123456".into()],
            ..Default::default()
        }
        .save(dir.path())
        .unwrap();

        let c = Continuity::load(dir.path(), Round::FIRST, 4000);
        assert_eq!(c.fingerprint.colors, vec!["#abc"]);
    }

    #[test]
    fn update_round_without_state_recomputes() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("index.html"), r#"<div id="root"></div>"#).unwrap();
        let c = Continuity::load(dir.path(), Round::new(3).unwrap(), 4000);
        assert_eq!(c.fingerprint.ids, vec!["root"]);
    }
}

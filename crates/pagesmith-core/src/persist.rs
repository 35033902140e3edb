use crate::fingerprint::DesignFingerprint;
use std::path::Path;
use tracing::{debug, warn};

/// Recompute the design fingerprint from the current contents of `dir` and
/// store it for the next round.
///
/// Failures are logged and swallowed; the fingerprint only guides continuity.
pub fn persist_fingerprint(dir: &Path) -> Option<DesignFingerprint> {
    let fingerprint = DesignFingerprint::extract(dir);
    match fingerprint.save(dir) {
        Ok(()) => {
            debug!(dir = %dir.display(), "design state persisted");
            Some(fingerprint)
        }
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "failed to persist design state");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn persists_what_is_on_disk() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("style.css"), ":root{--brand:#ff0066}").unwrap();
        let fp = persist_fingerprint(dir.path()).unwrap();
        assert_eq!(fp.css_vars, vec!["--brand"]);
        assert_eq!(DesignFingerprint::load(dir.path()), Some(fp));
    }

    #[test]
    fn unwritable_target_is_swallowed() {
        let dir = TempDir::new().unwrap();
        // A directory where the state file should go makes the rename fail.
        std::fs::create_dir(dir.path().join(".design_state.json")).unwrap();
        assert!(persist_fingerprint(dir.path()).is_none());
    }
}

//! Deterministic, model-free site synthesizer.
//!
//! Runs only after the invoker is exhausted. Round 1 sweeps the target
//! directory of regular files (keeping `.git`) and rebuilds a minimal app.
//! Update rounds require the core artifacts to exist and only overwrite.

use crate::error::{PagesmithError, Result};
use crate::io::{atomic_write, ensure_dir};
use crate::paths::{
    self, GALLERY_EXTENSIONS, GIT_DIR, INDEX_HTML, LICENSE, MAIN_JS, README_MD,
    REQUIRED_FOR_UPDATE, SERVICE_WORKER_JS, STYLE_CSS,
};
use crate::readme::fallback_readme;
use crate::round::RoundContext;
use base64::Engine as _;
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;
use tracing::{info, warn};

/// Keyword that switches the entry page to the user-lookup form.
const LOOKUP_KEYWORD: &str = "github";
const LOOKUP_ENDPOINT: &str = "https://api.github.com/users/";
const STATUS_MARKER: &str = "#github-status";
const FORM_ID_MAX: usize = 40;

static DATA_URI_RE: OnceLock<Regex> = OnceLock::new();
static NON_ID_RE: OnceLock<Regex> = OnceLock::new();

fn data_uri_re() -> &'static Regex {
    DATA_URI_RE.get_or_init(|| Regex::new(r"(?s)^data:([^;,]+);base64,(.*)$").unwrap())
}

fn non_id_re() -> &'static Regex {
    NON_ID_RE.get_or_init(|| Regex::new(r"[^a-z0-9-]").unwrap())
}

/// Build the fallback site in `dir` and return the relative paths written.
pub fn synthesize(dir: &Path, ctx: &RoundContext, license_text: &str) -> Result<Vec<String>> {
    let round = ctx.round;

    if round.is_update() {
        let missing: Vec<String> = REQUIRED_FOR_UPDATE
            .iter()
            .filter(|name| !dir.join(name).is_file())
            .map(|name| name.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(PagesmithError::MissingRequiredArtifacts {
                round: round.get(),
                missing,
            });
        }
    }

    ensure_dir(dir)?;
    if round.is_initial() {
        let removed = wipe_files(dir);
        info!(dir = %dir.display(), removed, "cleared target directory for fallback");
    }

    info!(task = %ctx.task, %round, "generating fallback site");
    let mut written = materialize_data_uris(dir, &ctx.attachments);

    let gallery = gallery_files(dir)?;
    let index = if mentions_lookup(ctx) {
        lookup_page(ctx)
    } else {
        generic_page(&ctx.brief)
    };

    let core: [(&str, String); 4] = [
        (MAIN_JS, main_js(&gallery)),
        (STYLE_CSS, STYLE.to_string()),
        (SERVICE_WORKER_JS, SERVICE_WORKER.to_string()),
        (INDEX_HTML, index),
    ];
    for (name, content) in core {
        let path = dir.join(name);
        if round.is_update() && !path.is_file() {
            info!(file = name, %round, "skipping creation of new core file on update round");
            continue;
        }
        atomic_write(&path, content.as_bytes())?;
        written.push(name.to_string());
    }

    atomic_write(&paths::readme_path(dir), fallback_readme(ctx).as_bytes())?;
    written.push(README_MD.to_string());
    atomic_write(&paths::license_path(dir), license_text.as_bytes())?;
    written.push(LICENSE.to_string());

    Ok(written)
}

// ---------------------------------------------------------------------------
// Directory preparation
// ---------------------------------------------------------------------------

/// Remove every regular file under `dir`, leaving directories and any `.git`
/// subtree in place. Returns the number of files removed.
///
/// Unreadable directories and entries are logged and skipped; the round
/// carries on with whatever could not be cleared.
fn wipe_files(dir: &Path) -> usize {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "could not list directory; continuing");
            return 0;
        }
    };
    let mut removed = 0;
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "could not read directory entry");
                continue;
            }
        };
        let path = entry.path();
        let is_dir = match entry.file_type() {
            Ok(t) => t.is_dir(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "could not stat entry");
                continue;
            }
        };
        if is_dir {
            if entry.file_name() != GIT_DIR {
                removed += wipe_files(&path);
            }
            continue;
        }
        match std::fs::remove_file(&path) {
            Ok(()) => removed += 1,
            Err(e) => warn!(path = %path.display(), error = %e, "could not remove file"),
        }
    }
    removed
}

/// Decode data-URI attachments into the directory root.
///
/// References that already exist on disk, or that are not data URIs, are
/// left to whoever stored them.
fn materialize_data_uris(dir: &Path, attachments: &[String]) -> Vec<String> {
    let mut written = Vec::new();
    for (n, reference) in attachments.iter().enumerate() {
        if Path::new(reference).exists() {
            continue;
        }
        let Some(caps) = data_uri_re().captures(reference) else {
            continue;
        };
        let mime = &caps[1];
        let bytes = match base64::engine::general_purpose::STANDARD.decode(caps[2].trim()) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(index = n + 1, error = %e, "skipping undecodable data-uri attachment");
                continue;
            }
        };
        let name = format!("attachment-{}.{}", n + 1, extension_for(mime));
        match atomic_write(&dir.join(&name), &bytes) {
            Ok(()) => {
                info!(file = %name, bytes = bytes.len(), "wrote decoded attachment");
                written.push(name);
            }
            Err(e) => warn!(file = %name, error = %e, "failed to write decoded attachment"),
        }
    }
    written
}

fn extension_for(mime: &str) -> &'static str {
    mime_guess::get_mime_extensions_str(mime)
        .and_then(|exts| exts.first().copied())
        .unwrap_or("bin")
}

/// Root-level files the gallery should render, sorted by name.
fn gallery_files(dir: &Path) -> Result<Vec<String>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') {
            continue;
        }
        let ext = Path::new(&name)
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase());
        if ext.is_some_and(|e| GALLERY_EXTENSIONS.contains(&e.as_str())) {
            files.push(name);
        }
    }
    files.sort();
    Ok(files)
}

// ---------------------------------------------------------------------------
// Lookup specialization
// ---------------------------------------------------------------------------

fn mentions_lookup(ctx: &RoundContext) -> bool {
    ctx.brief.to_lowercase().contains(LOOKUP_KEYWORD)
        || ctx.task.to_lowercase().contains(LOOKUP_KEYWORD)
        || ctx
            .checks
            .iter()
            .any(|c| c.to_lowercase().contains(LOOKUP_KEYWORD))
}

fn wants_status_region(ctx: &RoundContext) -> bool {
    ctx.brief.contains(STATUS_MARKER)
        || ctx.checks.iter().any(|c| {
            let lower = c.to_lowercase();
            lower.contains(STATUS_MARKER) || lower.contains("aria-live")
        })
}

/// Lower-case, map anything outside `[a-z0-9-]` to `-`, cap at 40 chars and
/// trim boundary hyphens.
pub fn sanitize_id(raw: &str) -> String {
    let lowered = raw.to_lowercase();
    let mapped = non_id_re().replace_all(&lowered, "-");
    let capped: String = mapped.chars().take(FORM_ID_MAX).collect();
    let trimmed = capped.trim_matches('-');
    if trimmed.is_empty() {
        "generated".to_string()
    } else {
        trimmed.to_string()
    }
}

fn lookup_page(ctx: &RoundContext) -> String {
    let seed = [ctx.task.as_str(), ctx.brief.as_str()]
        .into_iter()
        .find(|s| !s.is_empty())
        .unwrap_or("github-user");
    let form_id = format!("github-user-{}", sanitize_id(seed));
    let status = if wants_status_region(ctx) {
        r#"<div id="github-status" aria-live="polite">Idle</div>"#
    } else {
        ""
    };
    LOOKUP_PAGE
        .replace("%FORM_ID%", &form_id)
        .replace("%STATUS%", status)
        .replace("%ENDPOINT%", LOOKUP_ENDPOINT)
}

// ---------------------------------------------------------------------------
// Templates
// ---------------------------------------------------------------------------

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn generic_page(brief: &str) -> String {
    GENERIC_PAGE.replace("%BRIEF%", &escape_html(brief))
}

fn main_js(gallery: &[String]) -> String {
    let list = serde_json::to_string(gallery).unwrap_or_else(|_| "[]".to_string());
    MAIN_SCRIPT.replace("%GALLERY%", &list)
}

const GENERIC_PAGE: &str = r#"<!doctype html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>Generated App</title>
  <link href="https://cdn.jsdelivr.net/npm/bootstrap@5.3.2/dist/css/bootstrap.min.css" rel="stylesheet">
  <link href="style.css" rel="stylesheet">
</head>
<body class="p-4">
  <main class="container">
    <h1>Generated App</h1>
    <h2>Brief</h2>
    <pre id="brief" class="bg-light p-3">%BRIEF%</pre>
    <h2>Attachments</h2>
    <div id="attachments" class="mt-3"></div>
  </main>
  <script src="main.js"></script>
</body>
</html>
"#;

const LOOKUP_PAGE: &str = r#"<!doctype html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>GitHub User Lookup</title>
  <link href="https://cdn.jsdelivr.net/npm/bootstrap@5.3.2/dist/css/bootstrap.min.css" rel="stylesheet">
  <link href="style.css" rel="stylesheet">
</head>
<body class="p-4">
  <main class="container">
    <h1>GitHub User Lookup</h1>
    <form id="%FORM_ID%">
      <div class="mb-3">
        <label for="username" class="form-label">GitHub username</label>
        <input id="username" class="form-control" placeholder="Enter GitHub username" required>
      </div>
      <button type="submit" class="btn btn-primary">Lookup</button>
    </form>
    %STATUS%
    <pre id="github-created-at" class="mt-3 bg-light p-2">(created-at)</pre>
    <pre id="out" class="mt-3 bg-light p-2">(result)</pre>
  </main>
  <script>
    const API_URL = '%ENDPOINT%';
    document.getElementById('%FORM_ID%').addEventListener('submit', async (e) => {
      e.preventDefault();
      const user = document.getElementById('username').value.trim();
      const status = document.getElementById('github-status');
      const out = document.getElementById('out');
      if (status) status.textContent = 'Lookup started';
      out.textContent = 'Loading...';
      try {
        const res = await fetch(API_URL + encodeURIComponent(user));
        if (!res.ok) {
          if (status) status.textContent = 'Lookup failed';
          out.textContent = 'User not found: ' + res.status;
          return;
        }
        const data = await res.json();
        if (status) status.textContent = 'Lookup succeeded';
        out.textContent = JSON.stringify(data, null, 2);
        const created = new Date(data.created_at).toISOString().slice(0, 10);
        document.getElementById('github-created-at').textContent = created;
      } catch (err) {
        if (status) status.textContent = 'Lookup failed';
        out.textContent = 'Error: ' + err;
      }
    });
  </script>
  <script src="main.js"></script>
</body>
</html>
"#;

const MAIN_SCRIPT: &str = r#"'use strict';
// Attachment gallery and offline worker registration.
(function () {
  try {
    const files = %GALLERY%;
    const container = document.getElementById('attachments');
    if (container) {
      files.forEach((name) => {
        const item = document.createElement('div');
        if (/\.(png|jpe?g|gif|svg)$/i.test(name)) {
          const img = document.createElement('img');
          img.src = name;
          img.alt = name;
          img.style.maxWidth = '300px';
          item.appendChild(img);
        } else {
          const link = document.createElement('a');
          link.href = name;
          link.textContent = name;
          item.appendChild(link);
        }
        container.appendChild(item);
      });
    }
  } catch (e) {
    console.error(e);
  }
  if ('serviceWorker' in navigator) {
    window.addEventListener('load', () => {
      navigator.serviceWorker.register('service-worker.js').catch(console.error);
    });
  }
})();
"#;

const STYLE: &str = "body{font-family:system-ui,Segoe UI,Arial,sans-serif;line-height:1.5;}
.container img{margin:0.25rem;border-radius:4px;}
";

const SERVICE_WORKER: &str = "self.addEventListener('install', (e) => { self.skipWaiting(); });
self.addEventListener('activate', (e) => { self.clients.claim(); });
self.addEventListener('fetch', (e) => {
  e.respondWith(fetch(e.request).catch(() => caches.match(e.request)));
});
";

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::round::Round;
    use tempfile::TempDir;

    fn ctx(round: u32, brief: &str) -> RoundContext {
        RoundContext::new("quiz-app", Round::new(round).unwrap(), brief)
            .with_checks(["#score visible", "Title contains Quiz"])
    }

    fn read(dir: &Path, name: &str) -> String {
        std::fs::read_to_string(dir.join(name)).unwrap()
    }

    #[test]
    fn first_round_builds_complete_site() {
        let dir = TempDir::new().unwrap();
        let written = synthesize(dir.path(), &ctx(1, "A <b>quiz</b> & more"), "MIT").unwrap();
        for name in [INDEX_HTML, MAIN_JS, STYLE_CSS, SERVICE_WORKER_JS, README_MD, LICENSE] {
            assert!(dir.path().join(name).is_file(), "{name} missing");
            assert!(written.contains(&name.to_string()));
        }
        let index = read(dir.path(), INDEX_HTML);
        assert!(index.contains("A &lt;b&gt;quiz&lt;/b&gt; &amp; more"));
        assert!(read(dir.path(), SERVICE_WORKER_JS).contains("caches.match"));
        assert_eq!(read(dir.path(), LICENSE), "MIT");
    }

    #[test]
    fn checks_survive_verbatim() {
        let dir = TempDir::new().unwrap();
        synthesize(dir.path(), &ctx(1, "Build a quiz"), "MIT").unwrap();
        let readme = read(dir.path(), README_MD);
        assert!(readme.contains("- #score visible\n"));
        assert!(readme.contains("- Title contains Quiz\n"));
    }

    // Only this path clears the directory on round 1; the model path never does.
    #[test]
    fn first_round_wipe_keeps_git_metadata() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join(".git/refs")).unwrap();
        std::fs::write(dir.path().join(".git/HEAD"), "ref: refs/heads/main").unwrap();
        std::fs::create_dir_all(dir.path().join("old")).unwrap();
        std::fs::write(dir.path().join("old/stale.js"), "x").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "x").unwrap();

        synthesize(dir.path(), &ctx(1, "b"), "MIT").unwrap();

        assert_eq!(read(dir.path(), ".git/HEAD"), "ref: refs/heads/main");
        assert!(!dir.path().join("old/stale.js").exists());
        assert!(!dir.path().join("notes.txt").exists());
    }

    #[test]
    fn wipe_tolerates_unlistable_directories() {
        let dir = TempDir::new().unwrap();
        let not_a_dir = dir.path().join("plain.txt");
        std::fs::write(&not_a_dir, "x").unwrap();
        assert_eq!(wipe_files(&dir.path().join("missing")), 0);
        assert_eq!(wipe_files(&not_a_dir), 0);
        assert!(not_a_dir.exists());
    }

    #[test]
    fn update_round_requires_core_files() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(INDEX_HTML), "old").unwrap();

        let err = synthesize(dir.path(), &ctx(2, "b"), "MIT").unwrap_err();
        match err {
            PagesmithError::MissingRequiredArtifacts { round, missing } => {
                assert_eq!(round, 2);
                assert_eq!(missing, vec![README_MD.to_string(), LICENSE.to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(read(dir.path(), INDEX_HTML), "old");
        assert!(!dir.path().join(MAIN_JS).exists());
    }

    #[test]
    fn update_round_only_overwrites() {
        let dir = TempDir::new().unwrap();
        for name in [INDEX_HTML, README_MD, LICENSE, STYLE_CSS] {
            std::fs::write(dir.path().join(name), "old").unwrap();
        }
        std::fs::write(dir.path().join("keep.txt"), "mine").unwrap();

        let written = synthesize(dir.path(), &ctx(2, "b"), "MIT").unwrap();

        assert!(!dir.path().join(MAIN_JS).exists());
        assert!(!dir.path().join(SERVICE_WORKER_JS).exists());
        assert_eq!(read(dir.path(), "keep.txt"), "mine");
        assert_ne!(read(dir.path(), STYLE_CSS), "old");
        assert!(!written.contains(&MAIN_JS.to_string()));
    }

    #[test]
    fn data_uri_attachments_are_decoded() {
        let dir = TempDir::new().unwrap();
        // "hello" in base64
        let ctx = ctx(1, "b").with_attachments(["data:image/png;base64,aGVsbG8="]);
        let written = synthesize(dir.path(), &ctx, "MIT").unwrap();
        assert!(written.contains(&"attachment-1.png".to_string()));
        assert_eq!(read(dir.path(), "attachment-1.png"), "hello");
        assert!(read(dir.path(), MAIN_JS).contains(r#"["attachment-1.png"]"#));
    }

    #[test]
    fn unknown_mime_gets_bin_extension() {
        assert_eq!(extension_for("application/x-made-up"), "bin");
    }

    #[test]
    fn gallery_lists_visible_media_sorted() {
        let dir = TempDir::new().unwrap();
        for name in ["b.png", "a.CSV", ".hidden.png", "script.js"] {
            std::fs::write(dir.path().join(name), "x").unwrap();
        }
        assert_eq!(gallery_files(dir.path()).unwrap(), vec!["a.CSV", "b.png"]);
    }

    #[test]
    fn lookup_keyword_switches_entry_page() {
        let dir = TempDir::new().unwrap();
        let ctx = RoundContext::new("GitHub User Created!", Round::FIRST, "Look up a GitHub user")
            .with_checks(["#github-status has aria-live"]);
        synthesize(dir.path(), &ctx, "MIT").unwrap();

        let index = read(dir.path(), INDEX_HTML);
        assert!(index.contains(r#"<form id="github-user-github-user-created">"#));
        assert!(index.contains(r#"<div id="github-status" aria-live="polite">"#));
        assert!(index.contains("https://api.github.com/users/"));
    }

    #[test]
    fn lookup_page_without_status_request() {
        let ctx = RoundContext::new("", Round::FIRST, "github profile viewer");
        let page = lookup_page(&ctx);
        assert!(page.contains(r#"id="github-user-github-profile-viewer""#));
        assert!(!page.contains(r#"id="github-status""#));
    }

    #[test]
    fn sanitize_id_rules() {
        assert_eq!(sanitize_id("Hello World!"), "hello-world");
        assert_eq!(sanitize_id("***"), "generated");
        assert_eq!(sanitize_id(&"a".repeat(60)).len(), 40);
    }
}

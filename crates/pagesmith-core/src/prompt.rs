//! Generation request builder.
//!
//! Pure transformation from a [`RoundContext`] plus prior [`Continuity`] into
//! the chat request sent to the model. No I/O happens here.

use crate::continuity::Continuity;
use crate::round::RoundContext;
use llm_proxy::{ChatMessage, ChatRequest};
use std::fmt::Write as _;

/// Appended as an extra system message before each retry.
pub const FORMAT_REMINDER: &str = "OUTPUT MUST BE A SINGLE JSON OBJECT MAPPING RELATIVE FILE PATHS TO FULL FILE CONTENTS, AND NOTHING ELSE. Do not wrap it in markdown fences. Do not add commentary before or after it.";

/// Build the outbound request: the full contract as the system message and a
/// short directive as the user message.
pub fn build_request(ctx: &RoundContext, continuity: &Continuity) -> ChatRequest {
    ChatRequest::new(vec![
        ChatMessage::system(system_contract(ctx, continuity)),
        ChatMessage::user(user_directive(ctx)),
    ])
}

pub fn user_directive(ctx: &RoundContext) -> String {
    format!(
        "Apply round {} now. Keep every working feature from earlier rounds while implementing the brief and checks below.",
        ctx.round
    )
}

/// The full generation contract.
pub fn system_contract(ctx: &RoundContext, continuity: &Continuity) -> String {
    let round = ctx.round;
    let checks_json = to_json(&ctx.checks);
    let attachments_json = to_json(&ctx.attachment_names());
    let fingerprint_json = to_json(&continuity.fingerprint);
    let previous_json = to_json(&continuity.snapshots);

    let mut out = String::new();
    let _ = writeln!(
        out,
        "You are a senior frontend engineer. Build or UPDATE a small, professional, accessible, mobile-responsive single-page web app."
    );
    let _ = writeln!(out);
    let _ = writeln!(out, "ROUND: {round}");
    let _ = writeln!(out, "TASK: {}", ctx.task);
    if let Some(template) = ctx.template.as_deref().filter(|t| !t.trim().is_empty()) {
        let _ = writeln!(out, "TEMPLATE HINT (advisory): {template}");
    }
    let _ = writeln!(out, "PREVIOUS_CONTENT={previous_json}");
    let _ = writeln!(out);
    let _ = writeln!(out, "BRIEF:\n{}\n", ctx.brief);
    let _ = writeln!(out, "CHECKS (literal requirements):\n{checks_json}\n");
    let _ = writeln!(
        out,
        "ATTACHMENTS (already present at the repository root; reference by exact bare filename, never rename or move into folders):\n{attachments_json}\n"
    );

    out.push_str(
        "\
ROUND SEMANTICS:
- Round 1: you MAY create any files the brief needs (at minimum index.html, style.css, main.js, service-worker.js, README.md, LICENSE). Helpful extras such as favicon, manifest.json or robots.txt are allowed in round 1 only. Place everything at the repository root.
- Round > 1: you MUST NOT introduce new filenames. Integrate every new requirement into the existing files only.

EVOLUTION RULES:
- Preserve working features and design from earlier rounds unless the brief explicitly asks to replace them.
- New features are added inside existing files without breaking earlier behavior.
- Small design or behavior tweaks overwrite only the parts that need to change.

QUALITY BAR:
- Semantic HTML5 landmarks (header, main, footer, nav), keyboard navigation, ARIA where relevant, visible focus states.
- Mobile-first responsive layout with CSS variables for the palette and readable typography.
- Modular main.js: small pure helpers, error handling, comments.
- README.md documents how to run, features, accessibility, design tokens, API endpoints used, attachments used, keyword coverage, check handling and a changelog entry for this round.

KEYWORD FIDELITY:
- Treat words and phrases from BRIEF and CHECKS as requirements; reflect even single-word hints in UI or behavior, or note in README why one does not apply.
- Where it fits, show keyword text verbatim in visible UI (labels, headings, alt text).

CHECKS CONTRACT:
- Every CHECKS entry is a literal. Its exact text and case must appear unmodified wherever you surface it (DOM ids, visible text, class names, endpoints, code). Never rename, reword or abbreviate a check.
- Implement each check so it passes, using real logic where possible and safe mocks or fallbacks otherwise; the app must never crash on offline or failed requests.
- Include a non-blocking self-test in main.js that runs after initialization and logs `[CHECK PASS] <check>` for every entry in CHECKS.
- If a check is genuinely infeasible, explain the closest compliant solution in README under \"Check handling\".

ATTACHMENT RULES:
- Use every attachment meaningfully where applicable.
- Reference attachments by bare filename only, e.g. <img src=\"captcha.jpg\">, never \"assets/captcha.jpg\".

",
    );

    let _ = writeln!(
        out,
        "DESIGN CONTINUITY:\n- Do NOT remove existing colors, CSS variables, element ids, function or event names, or fetch endpoints listed below unless the brief or checks explicitly require it.\n- Keep the existing palette in style.css; append new rules at the end rather than deleting selectors.\nDESIGN_STATE: {fingerprint_json}\n"
    );

    let _ = writeln!(
        out,
        "\
LICENSE: use the full canonical MIT License text including year and owner.
SECURITY: never include secrets or tokens; never hard-code callback URLs or private endpoints.

OUTPUT FORMAT:
- Respond with exactly ONE JSON object mapping relative file path to FULL file content (not diffs).
- No prose, no explanation, no markdown code fences.
- Always include index.html, style.css, main.js, service-worker.js, README.md and LICENSE, even when unchanged.
- README changelog heading for this round: \"Changelog: Round {round}\"."
    );

    out
}

fn to_json<T: serde::Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "null".to_string())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

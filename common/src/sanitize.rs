// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Sanitizers for configured HTML snippets and mail header values.

use regex::{Captures, Regex};
use std::sync::LazyLock;

/// Tags that survive [`sanitize_html`].
pub const ALLOWED_TAGS: &[&str] = &["i", "b", "strong", "em", "h1", "h2", "h3", "p", "br"];

static SCRIPT_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>").expect("static pattern"));

static STYLE_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<style\b[^>]*>.*?</style\s*>").expect("static pattern"));

static COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").expect("static pattern"));

static EVENT_HANDLER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)[\s/]+on[a-z0-9_]+\s*=\s*(?:"[^"]*"|'[^']*'|[^\s>]+)"#).expect("static pattern")
});

static TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"</?([A-Za-z][A-Za-z0-9]*)\b[^>]*>").expect("static pattern"));

static LINE_BREAKS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\r\n]+").expect("static pattern"));

/// Strip script/style blocks, comments, inline event handlers and every tag
/// outside [`ALLOWED_TAGS`]. Text content is kept.
pub fn sanitize_html(html: &str) -> String {
    let html = SCRIPT_BLOCK.replace_all(html, "");
    let html = STYLE_BLOCK.replace_all(&html, "");
    let html = COMMENT.replace_all(&html, "");
    TAG.replace_all(&html, |caps: &Captures<'_>| {
        let name = caps[1].to_ascii_lowercase();
        if ALLOWED_TAGS.contains(&name.as_str()) {
            EVENT_HANDLER.replace_all(&caps[0], "").into_owned()
        } else {
            String::new()
        }
    })
    .into_owned()
}

/// Collapse embedded line breaks so a value cannot start a new header.
pub fn sanitize_header(value: &str) -> String {
    LINE_BREAKS.replace_all(value, " ").trim().to_string()
}

//! Post-conversion cleanup passes for normalized Markdown.
//!
//! Each pass is a `&str -> String` function applied in sequence. The output
//! must be stable: running the pipeline on the same input always produces
//! the same bytes, since the result is fingerprinted.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

/// Run every cleanup pass on raw converter output.
pub(crate) fn run_pipeline(md: &str, base_url: Option<&Url>) -> String {
    let result = replace_nbsp(md);
    let result = strip_layout_tags(&result);
    let result = resolve_links(&result, base_url);
    let result = trim_line_ends(&result);
    let result = collapse_blank_lines(&result);
    result.trim().to_string()
}

/// Help-center editors emit `&nbsp;` liberally; treat it as a plain space.
fn replace_nbsp(md: &str) -> String {
    md.replace('\u{a0}', " ").replace("&nbsp;", " ")
}

/// Remove layout-only tags the converter passed through, keeping their text.
/// Fenced code blocks are left untouched.
fn strip_layout_tags(md: &str) -> String {
    static LAYOUT_TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"</?(?:div|span|section|article|aside|figure|figcaption|details|summary)(?:\s[^>]*)?>")
            .expect("valid regex")
    });

    let mut in_code_block = false;
    md.lines()
        .map(|line| {
            if line.trim_start().starts_with("```") {
                in_code_block = !in_code_block;
                return line.to_string();
            }
            if in_code_block {
                line.to_string()
            } else {
                LAYOUT_TAG_RE.replace_all(line, "").into_owned()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Resolve relative link targets against the help-center origin.
fn resolve_links(md: &str, base_url: Option<&Url>) -> String {
    let Some(base) = base_url else {
        return md.to_string();
    };

    static LINK_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\]\(([^)\s]+)\)").expect("valid regex"));

    LINK_RE
        .replace_all(md, |caps: &regex::Captures| {
            let href = &caps[1];
            let is_absolute = href.contains("://")
                || href.starts_with('#')
                || href.starts_with("mailto:")
                || href.starts_with("tel:");

            match base.join(href) {
                Ok(resolved) if !is_absolute => format!("]({resolved})"),
                _ => caps[0].to_string(),
            }
        })
        .into_owned()
}

fn trim_line_ends(md: &str) -> String {
    md.lines().map(str::trim_end).collect::<Vec<_>>().join("\n")
}

/// Collapse runs of blank lines into a single blank line.
fn collapse_blank_lines(md: &str) -> String {
    static MULTI_BLANK_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid regex"));

    MULTI_BLANK_RE.replace_all(md, "\n\n").into_owned()
}

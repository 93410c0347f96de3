//! Whitespace and identifier helpers.

use paperscope_core::{Inline, RichText};

/// Collapse whitespace runs to a single space, or to a blank line when the
/// run contained a paragraph break. Nested runs are collapsed too.
pub(crate) fn normalize_whitespace(rich: &mut RichText) {
    for inline in &mut rich.0 {
        match inline {
            Inline::Text { text } => *text = collapse_keep_paragraphs(text),
            Inline::Emphasis { content } | Inline::Strong { content } | Inline::Link { content, .. } => {
                normalize_whitespace(content)
            }
            _ => {}
        }
    }
}

fn collapse_keep_paragraphs(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut newlines = 0;
    let mut in_space = false;
    for c in text.chars() {
        if c.is_whitespace() {
            in_space = true;
            if c == '\n' {
                newlines += 1;
            }
            continue;
        }
        if in_space {
            out.push_str(if newlines >= 2 { "\n\n" } else { " " });
            in_space = false;
            newlines = 0;
        }
        out.push(c);
    }
    if in_space {
        out.push_str(if newlines >= 2 { "\n\n" } else { " " });
    }
    out
}

/// Single-spaced, trimmed.
pub(crate) fn collapse(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Lowercase identifier built from a heading: alphanumerics kept, every
/// other run of characters becomes one `_`.
pub(crate) fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    for c in title.chars() {
        if c.is_alphanumeric() {
            slug.extend(c.to_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('_') {
            slug.push('_');
        }
    }
    while slug.ends_with('_') {
        slug.pop();
    }
    slug
}

//! Rich text carried by sections, captions and the abstract.

/// Byte range into the text a value was parsed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// How a cross-reference asked to be rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum RefStyle {
    /// `\ref`: the bare number.
    #[default]
    Plain,
    /// `\eqref`: the number in parentheses.
    Parenthesized,
    /// `\autoref`, `\cref`: the number prefixed by the target kind.
    Named,
}

/// One inline element of a rich-text run.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "type", rename_all = "snake_case"))]
pub enum Inline {
    Text { text: String },
    Emphasis { content: RichText },
    Strong { content: RichText },
    Code { text: String },
    /// Inline math, stored without its delimiters.
    Math { source: String },
    Link { url: String, content: RichText },
    /// A citation marker. `text` starts out as the bracketed raw keys and is
    /// rewritten by citation resolution; `id` points into `Document::citations`.
    Citation { id: String, text: String },
    /// A cross-reference to a labeled block or section. `text` starts out as
    /// the bracketed raw label.
    Reference {
        label: String,
        style: RefStyle,
        text: String,
    },
    /// Position of an equation, table or figure inside the surrounding prose.
    Block { id: String },
    LineBreak,
}

impl Inline {
    pub fn text(text: impl Into<String>) -> Self {
        Inline::Text { text: text.into() }
    }
}

/// An ordered run of inline elements.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct RichText(pub Vec<Inline>);

impl RichText {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Rich text holding a single text run.
    pub fn plain(text: impl Into<String>) -> Self {
        let mut rich = Self::new();
        rich.push_text(&text.into());
        rich
    }

    /// Append text, merging with a trailing text run.
    pub fn push_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if let Some(Inline::Text { text: last }) = self.0.last_mut() {
            last.push_str(text);
        } else {
            self.0.push(Inline::text(text));
        }
    }

    pub fn push(&mut self, inline: Inline) {
        match inline {
            Inline::Text { text } => self.push_text(&text),
            other => self.0.push(other),
        }
    }

    pub fn extend(&mut self, other: RichText) {
        for inline in other.0 {
            self.push(inline);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|inline| match inline {
            Inline::Text { text } => text.trim().is_empty(),
            Inline::LineBreak => true,
            _ => false,
        })
    }

    pub fn inlines(&self) -> &[Inline] {
        &self.0
    }

    /// Strip leading and trailing whitespace from the outer text runs.
    pub fn trim(&mut self) {
        if let Some(Inline::Text { text }) = self.0.first_mut() {
            *text = text.trim_start().to_string();
        }
        if let Some(Inline::Text { text }) = self.0.last_mut() {
            *text = text.trim_end().to_string();
        }
        self.0
            .retain(|inline| !matches!(inline, Inline::Text { text } if text.is_empty()));
    }

    /// Flatten to plain text. Inline math keeps its `$` delimiters; block
    /// placeholders contribute nothing.
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        self.write_plain(&mut out);
        out
    }

    fn write_plain(&self, out: &mut String) {
        for inline in &self.0 {
            match inline {
                Inline::Text { text } | Inline::Code { text } => out.push_str(text),
                Inline::Emphasis { content } | Inline::Strong { content } => {
                    content.write_plain(out)
                }
                Inline::Link { content, url } => {
                    if content.0.is_empty() {
                        out.push_str(url);
                    } else {
                        content.write_plain(out);
                    }
                }
                Inline::Math { source } => {
                    out.push('$');
                    out.push_str(source);
                    out.push('$');
                }
                Inline::Citation { text, .. } | Inline::Reference { text, .. } => {
                    out.push_str(text)
                }
                Inline::Block { .. } => {}
                Inline::LineBreak => out.push('\n'),
            }
        }
    }

    /// Number of characters in the plain-text rendering.
    pub fn char_len(&self) -> usize {
        self.plain_text().trim().chars().count()
    }

    /// Visit every inline, depth first, including those nested in emphasis
    /// and links.
    pub fn visit_mut(&mut self, f: &mut impl FnMut(&mut Inline)) {
        for inline in &mut self.0 {
            f(inline);
            match inline {
                Inline::Emphasis { content }
                | Inline::Strong { content }
                | Inline::Link { content, .. } => content.visit_mut(f),
                _ => {}
            }
        }
    }

    pub fn visit(&self, f: &mut impl FnMut(&Inline)) {
        for inline in &self.0 {
            f(inline);
            match inline {
                Inline::Emphasis { content }
                | Inline::Strong { content }
                | Inline::Link { content, .. } => content.visit(f),
                _ => {}
            }
        }
    }
}

impl From<&str> for RichText {
    fn from(s: &str) -> Self {
        RichText::plain(s)
    }
}

impl From<String> for RichText {
    fn from(s: String) -> Self {
        RichText::plain(s)
    }
}

impl std::fmt::Display for RichText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.plain_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_text_merges_runs() {
        let mut rich = RichText::new();
        rich.push_text("Hello");
        rich.push_text(", world");
        assert_eq!(rich.0.len(), 1);
        assert_eq!(rich.plain_text(), "Hello, world");
    }

    #[test]
    fn test_plain_text_nested() {
        let mut rich = RichText::plain("See ");
        rich.push(Inline::Emphasis {
            content: RichText::plain("this"),
        });
        rich.push(Inline::Citation {
            id: "cite_1".into(),
            text: "[a, b]".into(),
        });
        rich.push(Inline::Math {
            source: "x^2".into(),
        });
        assert_eq!(rich.plain_text(), "See this[a, b]$x^2$");
    }

    #[test]
    fn test_trim_and_empty() {
        let mut rich = RichText::plain("   ");
        assert!(rich.is_empty());
        rich.trim();
        assert!(rich.0.is_empty());

        let mut rich = RichText::plain("  padded text \n");
        rich.trim();
        assert_eq!(rich.plain_text(), "padded text");
    }

    #[test]
    fn test_visit_mut_reaches_nested_citations() {
        let mut rich = RichText::new();
        rich.push(Inline::Strong {
            content: RichText(vec![Inline::Citation {
                id: "cite_1".into(),
                text: "[k]".into(),
            }]),
        });
        rich.visit_mut(&mut |inline| {
            if let Inline::Citation { text, .. } = inline {
                *text = "[Key2020]".into();
            }
        });
        assert_eq!(rich.plain_text(), "[Key2020]");
    }
}

//! Rendering of tokens into rich text.

use crate::scanner::{Token, TokenKind, tokenize};
use crate::text::{collapse, normalize_whitespace};
use paperscope_core::{
    Citation, DuplicateKeys, Inline, ParseError, ParseOptions, RefStyle, RichText,
};
use std::collections::HashSet;

/// Commands that introduce a citation marker.
pub(crate) const CITE_COMMANDS: &[&str] = &[
    "cite", "citep", "citet", "citealp", "citealt", "citeauthor", "citeyear", "parencite",
    "textcite", "autocite", "footcite", "nocite",
];

/// Commands that contribute no text of their own.
const SILENT_COMMANDS: &[&str] = &[
    "label", "title", "author", "date", "thanks", "maketitle", "abstract", "keywords",
    "newblock", "vspace", "hspace", "vskip", "hskip", "smallskip", "medskip", "bigskip",
    "noindent", "indent", "centering", "raggedright", "raggedleft", "newpage", "clearpage",
    "cleardoublepage", "pagebreak", "tableofcontents", "listoffigures", "listoftables",
    "appendix", "bibliographystyle", "usepackage", "documentclass", "newcommand",
    "renewcommand", "providecommand", "def", "let", "setlength", "setcounter", "addtocounter",
    "addtolength", "pagestyle", "thispagestyle", "includegraphics", "epsfig", "psfig", "color",
    "tt", "bf", "it", "em", "rm", "sf", "sc", "small", "footnotesize", "scriptsize", "tiny",
    "large", "Large", "LARGE", "huge", "Huge", "normalsize", "hline", "toprule", "midrule",
    "bottomrule", "cline", "protect", "nonumber", "notag", "inst", "affiliation", "affil",
    "institute", "email", "bibliography", "input", "include",
];

fn text_macro(name: &str) -> Option<&'static str> {
    let text = match name {
        "ldots" | "dots" | "textellipsis" => "...",
        "LaTeX" => "LaTeX",
        "TeX" => "TeX",
        "textendash" => "\u{2013}",
        "textemdash" => "\u{2014}",
        "textasciitilde" => "~",
        "textbackslash" => "\\",
        "S" => "\u{a7}",
        "copyright" => "\u{a9}",
        "ss" => "\u{df}",
        "quad" | "qquad" | "space" | "enspace" => " ",
        _ => return None,
    };
    Some(text)
}

fn ref_style(name: &str) -> Option<RefStyle> {
    match name {
        "ref" | "pageref" | "nameref" => Some(RefStyle::Plain),
        "eqref" => Some(RefStyle::Parenthesized),
        "autoref" | "cref" | "Cref" => Some(RefStyle::Named),
        _ => None,
    }
}

/// Turns tokens into rich text while collecting citation markers.
///
/// Citations are only recorded while `recording` is set; metadata and
/// bibliography text render them as plain bracketed keys instead.
pub(crate) struct Renderer<'o> {
    options: &'o ParseOptions,
    pub(crate) citations: Vec<Citation>,
    recording: bool,
    /// Tokens being rendered come straight from the document source, so
    /// their spans are meaningful.
    top_level: bool,
}

impl<'o> Renderer<'o> {
    pub(crate) fn new(options: &'o ParseOptions) -> Self {
        Self {
            options,
            citations: Vec::new(),
            recording: true,
            top_level: true,
        }
    }

    pub(crate) fn max_depth(&self) -> usize {
        self.options.max_depth
    }

    /// Scan and render an argument's text.
    pub(crate) fn render(&mut self, text: &str) -> Result<RichText, ParseError> {
        let tokens = tokenize(text, self.options.max_depth)?;
        let top_level = std::mem::replace(&mut self.top_level, false);
        let mut out = RichText::new();
        let result = self.render_tokens(&tokens, &mut out);
        self.top_level = top_level;
        result?;
        Ok(out)
    }

    /// Render to normalized rich text with outer whitespace trimmed.
    pub(crate) fn render_trimmed(&mut self, text: &str) -> Result<RichText, ParseError> {
        let mut rich = self.render(text)?;
        normalize_whitespace(&mut rich);
        rich.trim();
        Ok(rich)
    }

    /// Render without recording citations, flattened to single-spaced text.
    pub(crate) fn plain(&mut self, text: &str) -> Result<String, ParseError> {
        self.detached(|r| r.render(text))
            .map(|rich| collapse(&rich.plain_text()))
    }

    pub(crate) fn plain_tokens<'t>(
        &mut self,
        tokens: impl IntoIterator<Item = &'t Token>,
    ) -> Result<String, ParseError> {
        let mut rich = RichText::new();
        self.detached(|r| r.render_tokens(tokens, &mut rich))?;
        Ok(collapse(&rich.plain_text()))
    }

    pub(crate) fn detached<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, ParseError>,
    ) -> Result<T, ParseError> {
        let recording = std::mem::replace(&mut self.recording, false);
        let result = f(self);
        self.recording = recording;
        result
    }

    pub(crate) fn render_tokens<'t>(
        &mut self,
        tokens: impl IntoIterator<Item = &'t Token>,
        out: &mut RichText,
    ) -> Result<(), ParseError> {
        for token in tokens {
            self.render_token(token, out)?;
        }
        Ok(())
    }

    pub(crate) fn render_token(&mut self, token: &Token, out: &mut RichText) -> Result<(), ParseError> {
        match &token.kind {
            TokenKind::Text(text) => push_text_run(text, out),
            TokenKind::EnvironmentBegin { .. } => {}
            TokenKind::EnvironmentEnd { name } => {
                if matches!(name.as_str(), "itemize" | "enumerate" | "description") {
                    out.push_text("\n");
                }
            }
            TokenKind::Command { name, .. } => self.render_command(name, token, out)?,
        }
        Ok(())
    }

    fn render_command(&mut self, name: &str, token: &Token, out: &mut RichText) -> Result<(), ParseError> {
        let base = name.trim_end_matches('*');
        if CITE_COMMANDS.contains(&base) {
            self.citation(base, token, out);
            return Ok(());
        }
        if let Some(style) = ref_style(base) {
            push_references(token.arg(0).unwrap_or(""), style, out);
            return Ok(());
        }
        if let Some(text) = text_macro(name) {
            out.push_text(text);
            return Ok(());
        }
        if SILENT_COMMANDS.contains(&base) {
            return Ok(());
        }

        match base {
            "\\" | "newline" => out.push(Inline::LineBreak),
            "par" => out.push_text("\n\n"),
            "item" => {
                out.push_text("\n");
                if let Some(label) = token.optional_arg() {
                    out.extend(self.render(label)?);
                    out.push_text(" ");
                }
            }
            "emph" | "textit" | "textsl" => {
                let content = self.render(token.arg(0).unwrap_or(""))?;
                out.push(Inline::Emphasis { content });
            }
            "textbf" => {
                let content = self.render(token.arg(0).unwrap_or(""))?;
                out.push(Inline::Strong { content });
            }
            "texttt" | "verb" => {
                let text = match base {
                    "verb" => token.arg(0).unwrap_or("").to_string(),
                    _ => self.plain(token.arg(0).unwrap_or(""))?,
                };
                out.push(Inline::Code { text });
            }
            "url" => out.push(Inline::Link {
                url: token.arg(0).unwrap_or("").trim().to_string(),
                content: RichText::new(),
            }),
            "href" => {
                let content = self.render(token.arg(1).unwrap_or(""))?;
                out.push(Inline::Link {
                    url: token.arg(0).unwrap_or("").trim().to_string(),
                    content,
                });
            }
            "footnote" => {
                out.push_text(" ");
                out.extend(self.render(token.last_arg().unwrap_or(""))?);
            }
            _ => {
                if let Some(arg) = token.last_arg() {
                    out.extend(self.render(arg)?);
                }
            }
        }
        Ok(())
    }

    fn citation(&mut self, command: &str, token: &Token, out: &mut RichText) {
        let Some(arg) = token.last_arg() else {
            return;
        };
        let mut keys: Vec<String> = arg
            .split(',')
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(String::from)
            .collect();
        if self.options.duplicate_keys == DuplicateKeys::Collapse {
            let mut seen = HashSet::new();
            keys.retain(|k| seen.insert(k.clone()));
        }
        if keys.is_empty() || (command == "nocite" && keys.iter().all(|k| k == "*")) {
            return;
        }

        let mut citation = Citation::new(format!("cite_{}", self.citations.len() + 1), keys);
        citation.command = command.to_string();
        if !self.recording {
            out.push_text(&citation.raw_text());
            return;
        }
        if self.top_level && self.options.preserve_spans {
            citation.span = Some(token.span);
        }
        if command != "nocite" {
            out.push(Inline::Citation {
                id: citation.id.clone(),
                text: citation.raw_text(),
            });
        }
        self.citations.push(citation);
    }
}

fn push_references(arg: &str, style: RefStyle, out: &mut RichText) {
    let labels: Vec<&str> = arg.split(',').map(str::trim).filter(|l| !l.is_empty()).collect();
    for (n, label) in labels.iter().enumerate() {
        if n > 0 {
            out.push_text(", ");
        }
        out.push(Inline::Reference {
            label: label.to_string(),
            style,
            text: format!("[{label}]"),
        });
    }
}

/// Push a text token: inline math becomes [`Inline::Math`], escapes are
/// resolved and bare group braces dropped.
fn push_text_run(text: &str, out: &mut RichText) {
    let mut buf = String::new();
    let mut rest = text;

    while let Some(c) = rest.chars().next() {
        match c {
            '$' => {
                if let Some(end) = find_unescaped(&rest[1..], "$") {
                    flush(&mut buf, out);
                    out.push(Inline::Math {
                        source: rest[1..1 + end].trim().to_string(),
                    });
                    rest = &rest[end + 2..];
                    continue;
                }
                buf.push('$');
            }
            '\\' => {
                let next = rest[1..].chars().next();
                if next == Some('(')
                    && let Some(end) = find_unescaped(&rest[2..], "\\)")
                {
                    flush(&mut buf, out);
                    out.push(Inline::Math {
                        source: rest[2..2 + end].trim().to_string(),
                    });
                    rest = &rest[end + 4..];
                    continue;
                }
                if let Some(next) = next {
                    match next {
                        '%' | '&' | '$' | '#' | '_' | '{' | '}' => buf.push(next),
                        ',' | ' ' | ';' | ':' | '>' => buf.push(' '),
                        _ => {}
                    }
                    rest = &rest[1 + next.len_utf8()..];
                    continue;
                }
            }
            '{' | '}' => {}
            '~' => buf.push(' '),
            _ => buf.push(c),
        }
        rest = &rest[c.len_utf8()..];
    }
    flush(&mut buf, out);
}

fn flush(buf: &mut String, out: &mut RichText) {
    if !buf.is_empty() {
        out.push_text(buf);
        buf.clear();
    }
}

fn find_unescaped(s: &str, pat: &str) -> Option<usize> {
    let mut i = 0;
    while i < s.len() {
        if s[i..].starts_with(pat) {
            return Some(i);
        }
        let c = s[i..].chars().next()?;
        i += c.len_utf8();
        if c == '\\'
            && let Some(next) = s[i..].chars().next()
        {
            i += next.len_utf8();
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn render(input: &str) -> (RichText, Vec<Citation>) {
        let options = ParseOptions::default();
        let mut renderer = Renderer::new(&options);
        let rich = renderer.render_trimmed(input).unwrap();
        (rich, renderer.citations)
    }

    #[test]
    fn test_escapes_and_math() {
        let (rich, _) = render(r"50\% of $\alpha_{i}$ and \(x\) cost \$3~each");
        assert_eq!(
            rich.0,
            vec![
                Inline::text("50% of "),
                Inline::Math {
                    source: r"\alpha_{i}".into()
                },
                Inline::text(" and "),
                Inline::Math { source: "x".into() },
                Inline::text(" cost $3 each"),
            ]
        );
    }

    #[test]
    fn test_nested_emphasis() {
        let (rich, _) = render(r"\textbf{bold \emph{and italic}}");
        assert_eq!(rich.plain_text(), "bold and italic");
        assert!(matches!(&rich.0[0], Inline::Strong { content } if content.0.len() == 2));
    }

    #[test]
    fn test_citation_keys_preserve_duplicates() {
        let (rich, citations) = render(r"see \cite{a,b,a}");
        assert_eq!(citations.len(), 1);
        assert_eq!(citations[0].keys, ["a", "b", "a"]);
        assert_eq!(rich.plain_text(), "see [a, b, a]");
    }

    #[test]
    fn test_citation_keys_collapse_policy() {
        let options = ParseOptions {
            duplicate_keys: DuplicateKeys::Collapse,
            ..Default::default()
        };
        let mut renderer = Renderer::new(&options);
        renderer.render(r"\citep[see][p. 2]{a, b, a}").unwrap();
        assert_eq!(renderer.citations[0].keys, ["a", "b"]);
        assert_eq!(renderer.citations[0].command, "citep");
    }

    #[test]
    fn test_plain_does_not_record_citations() {
        let options = ParseOptions::default();
        let mut renderer = Renderer::new(&options);
        let text = renderer.plain(r"Title\thanks{Funded} with \cite{x}").unwrap();
        assert_eq!(text, "Title with [x]");
        assert!(renderer.citations.is_empty());
    }

    #[test]
    fn test_references() {
        let (rich, _) = render(r"Table~\ref{tab:a} and \eqref{eq:b}");
        let styles: Vec<_> = rich
            .0
            .iter()
            .filter_map(|i| match i {
                Inline::Reference { style, text, .. } => Some((*style, text.as_str())),
                _ => None,
            })
            .collect();
        assert_eq!(
            styles,
            [
                (RefStyle::Plain, "[tab:a]"),
                (RefStyle::Parenthesized, "[eq:b]")
            ]
        );
    }

    #[test]
    fn test_unknown_command_renders_last_argument() {
        let (rich, _) = render(r"\textcolor{red}{warning} \LaTeX{} \vspace{2em}done");
        assert_eq!(rich.plain_text(), "warning LaTeX done");
    }
}

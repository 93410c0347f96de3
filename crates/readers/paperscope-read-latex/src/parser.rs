//! Document assembly from the token stream.

use crate::author::parse_authors;
use crate::render::Renderer;
use crate::scanner::{Token, TokenKind, is_math_environment, tokenize};
use crate::table::parse_rows;
use crate::text::{normalize_whitespace, slugify};
use paperscope_core::{
    BibliographyEntry, BlockKind, ConversionResult, Document, Equation, Figure, Inline, Issue,
    IssueKind, Metadata, ParseError, ParseOptions, RichText, Section, Severity, Span, Table,
};
use std::collections::HashSet;
use std::ops::Range;
use tracing::debug;

/// What an environment contributes to the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EnvRole {
    Equation,
    InlineMath,
    Table,
    Figure,
    Bibliography,
    Code,
    Skip,
    /// Contents flow into the surrounding text (lists, `center`, ...).
    Transparent,
}

fn classify(name: &str) -> EnvRole {
    match name {
        "math" => EnvRole::InlineMath,
        n if is_math_environment(n) => EnvRole::Equation,
        "table" | "table*" | "tabular" | "tabular*" | "tabularx" | "tabulary" | "longtable"
        | "longtable*" | "supertabular" => EnvRole::Table,
        "figure" | "figure*" | "wrapfigure" => EnvRole::Figure,
        "thebibliography" => EnvRole::Bibliography,
        "verbatim" | "verbatim*" | "Verbatim" | "lstlisting" | "minted" => EnvRole::Code,
        "abstract" | "comment" => EnvRole::Skip,
        _ => EnvRole::Transparent,
    }
}

fn is_tabular(name: &str) -> bool {
    matches!(
        name,
        "tabular" | "tabular*" | "tabularx" | "tabulary" | "longtable" | "longtable*" | "supertabular"
    )
}

/// Rank of a sectioning command; smaller is higher in the hierarchy.
fn section_rank(name: &str) -> Option<i8> {
    let rank = match name.trim_end_matches('*') {
        "part" => -1,
        "chapter" => 0,
        "section" => 1,
        "subsection" => 2,
        "subsubsection" => 3,
        "paragraph" => 4,
        "subparagraph" => 5,
        _ => return None,
    };
    Some(rank)
}

/// A section before nesting.
struct FlatSection {
    rank: i8,
    title: String,
    numbered: bool,
    label: Option<String>,
    content: RichText,
    span: Option<Span>,
}

pub(crate) fn parse_document(
    input: &str,
    options: &ParseOptions,
) -> Result<ConversionResult<Document>, ParseError> {
    let tokens = tokenize(input, options.max_depth)?;
    debug!(tokens = tokens.len(), bytes = input.len(), "scanned latex source");

    let mut issues = Vec::new();
    let ends = pair_environments(&tokens, options.max_depth, &mut issues)?;
    for token in tokens.iter().filter(|t| t.has_unterminated_arg()) {
        let name = match &token.kind {
            TokenKind::Command { name, .. } | TokenKind::EnvironmentBegin { name, .. } => name.as_str(),
            _ => "",
        };
        issues.push(
            Issue::new(
                Severity::Major,
                IssueKind::MalformedInput,
                format!("unbalanced braces in argument of `\\{name}`, closed at end of input"),
            )
            .at(token.span),
        );
    }

    let extractor = Extractor {
        input,
        tokens: &tokens,
        ends,
        options,
        renderer: Renderer::new(options),
        issues,
        front: RichText::new(),
        sections: Vec::new(),
        equations: Vec::new(),
        tables: Vec::new(),
        figures: Vec::new(),
        bibliography: Vec::new(),
        bib_keys: HashSet::new(),
    };
    extractor.run()
}

/// Match every `\begin` with its `\end`.
///
/// Returns, for each begin token, the index of its end token. Environments
/// left open by a mismatched `\end` are closed there. An environment still
/// open at end of input is closed at the next sectioning command after it,
/// or at `tokens.len()` when there is none, so one unterminated block does
/// not swallow the sections that follow. `document` always runs to the end.
/// All of these are reported.
fn pair_environments(
    tokens: &[Token],
    max_depth: usize,
    issues: &mut Vec<Issue>,
) -> Result<Vec<Option<usize>>, ParseError> {
    let mut ends = vec![None; tokens.len()];
    let mut stack: Vec<(usize, &str)> = Vec::new();

    for (i, token) in tokens.iter().enumerate() {
        match &token.kind {
            TokenKind::EnvironmentBegin { name, .. } => {
                stack.push((i, name));
                if stack.len() > max_depth {
                    return Err(ParseError::NestingTooDeep {
                        depth: stack.len(),
                        limit: max_depth,
                        offset: token.span.start,
                    });
                }
            }
            TokenKind::EnvironmentEnd { name } => {
                match stack.iter().rposition(|(_, open)| open == name) {
                    Some(at) => {
                        for (open, open_name) in stack.drain(at + 1..) {
                            issues.push(
                                Issue::new(
                                    Severity::Major,
                                    IssueKind::MalformedInput,
                                    format!("environment `{open_name}` closed by `\\end{{{name}}}`"),
                                )
                                .at(tokens[open].span),
                            );
                            ends[open] = Some(i);
                        }
                        if let Some((open, _)) = stack.pop() {
                            ends[open] = Some(i);
                        }
                    }
                    None => issues.push(
                        Issue::new(
                            Severity::Minor,
                            IssueKind::MalformedInput,
                            format!("`\\end{{{name}}}` without matching `\\begin`"),
                        )
                        .at(token.span),
                    ),
                }
            }
            _ => {}
        }
    }

    for (open, name) in stack {
        let next_section = (name != "document")
            .then(|| {
                tokens[open + 1..].iter().position(|t| {
                    matches!(&t.kind, TokenKind::Command { name, .. } if section_rank(name).is_some())
                })
            })
            .flatten()
            .map(|k| open + 1 + k);
        let message = match next_section {
            Some(at) => format!(
                "unterminated environment `{name}`, closed before `\\{}`",
                tokens[at].command_name().unwrap_or("section")
            ),
            None => format!("unterminated environment `{name}`, closed at end of input"),
        };
        issues.push(
            Issue::new(Severity::Major, IssueKind::MalformedInput, message).at(tokens[open].span),
        );
        ends[open] = Some(next_section.unwrap_or(tokens.len()));
    }
    Ok(ends)
}

struct Extractor<'a, 'o> {
    input: &'a str,
    tokens: &'a [Token],
    ends: Vec<Option<usize>>,
    options: &'o ParseOptions,
    renderer: Renderer<'o>,
    issues: Vec<Issue>,
    front: RichText,
    sections: Vec<FlatSection>,
    equations: Vec<Equation>,
    tables: Vec<Table>,
    figures: Vec<Figure>,
    bibliography: Vec<BibliographyEntry>,
    bib_keys: HashSet<String>,
}

impl<'a> Extractor<'a, '_> {
    fn run(mut self) -> Result<ConversionResult<Document>, ParseError> {
        let metadata = self.metadata()?;
        let body = self.body_range();
        self.walk(body)?;
        Ok(self.finish(metadata))
    }

    fn span(&self, span: Span) -> Option<Span> {
        self.options.preserve_spans.then_some(span)
    }

    fn end_of(&self, begin: usize) -> usize {
        self.ends[begin].unwrap_or(self.tokens.len())
    }

    /// Source text strictly between a begin token and its end token.
    fn raw_between(&self, begin: usize, end: usize) -> &'a str {
        let start = self.tokens[begin].span.end;
        let stop = self
            .tokens
            .get(end)
            .map_or(self.input.len(), |t| t.span.start);
        &self.input[start..stop.max(start)]
    }

    /// Tokens inside `\begin{document}`, or everything when it is absent.
    fn body_range(&self) -> Range<usize> {
        let document = self.tokens.iter().position(
            |t| matches!(&t.kind, TokenKind::EnvironmentBegin { name, .. } if name == "document"),
        );
        match document {
            Some(begin) => begin + 1..self.end_of(begin),
            None => 0..self.tokens.len(),
        }
    }

    /// The last declaration of each metadata field wins.
    fn metadata(&mut self) -> Result<Metadata, ParseError> {
        let tokens = self.tokens;
        let last_command = |name: &str| tokens.iter().rev().find(|t| t.is_command(name));

        let title = match last_command("title") {
            Some(token) => self.renderer.plain(token.last_arg().unwrap_or(""))?,
            None => String::new(),
        };
        let authors = match last_command("author") {
            Some(token) => parse_authors(&mut self.renderer, token.last_arg().unwrap_or(""))?,
            None => Vec::new(),
        };

        let abstract_env = tokens.iter().rposition(
            |t| matches!(&t.kind, TokenKind::EnvironmentBegin { name, .. } if name == "abstract"),
        );
        let abstract_command = tokens.iter().rposition(|t| t.is_command("abstract"));
        let mut abstract_text = match (abstract_env, abstract_command) {
            (Some(env), cmd) if cmd.is_none_or(|cmd| env > cmd) => {
                let mut rich = RichText::new();
                let end = self.end_of(env);
                self.renderer
                    .render_tokens(&tokens[env + 1..end.min(tokens.len())], &mut rich)?;
                rich
            }
            (_, Some(cmd)) => self.renderer.render(tokens[cmd].arg(0).unwrap_or(""))?,
            _ => RichText::new(),
        };
        normalize_whitespace(&mut abstract_text);
        abstract_text.trim();

        if title.is_empty() {
            self.missing("title");
        }
        if authors.is_empty() {
            self.missing("author");
        }
        if abstract_text.is_empty() {
            self.missing("abstract");
        }
        Ok(Metadata {
            title,
            authors,
            abstract_text,
        })
    }

    fn missing(&mut self, field: &str) {
        self.issues.push(Issue::new(
            Severity::Minor,
            IssueKind::MissingField,
            format!("no {field} declared, using an empty value"),
        ));
    }

    /// Prose goes to the open section, or to the front matter before the
    /// first section.
    fn current(&mut self) -> &mut RichText {
        match self.sections.last_mut() {
            Some(section) => &mut section.content,
            None => &mut self.front,
        }
    }

    /// One linear pass: section commands open a new section, block
    /// environments are extracted whole, everything else is rendered into
    /// the open section's content.
    fn walk(&mut self, range: Range<usize>) -> Result<(), ParseError> {
        let tokens = self.tokens;
        let mut i = range.start;

        while i < range.end {
            let token = &tokens[i];
            match &token.kind {
                TokenKind::EnvironmentBegin { name, .. } => {
                    let role = classify(name);
                    if role == EnvRole::Transparent {
                        i += 1;
                        continue;
                    }
                    let end = self.end_of(i).min(range.end);
                    match role {
                        EnvRole::Equation => self.equation(i, end, name),
                        EnvRole::InlineMath => {
                            let source = self.raw_between(i, end).trim().to_string();
                            self.current().push(Inline::Math { source });
                        }
                        EnvRole::Table => self.table(i, end)?,
                        EnvRole::Figure => self.figure(i, end)?,
                        EnvRole::Bibliography => self.bibliography(i, end)?,
                        EnvRole::Code => {
                            let text = self.raw_between(i, end).trim_matches('\n').to_string();
                            self.current().push(Inline::Code { text });
                        }
                        EnvRole::Skip | EnvRole::Transparent => {}
                    }
                    // A block closed early by a section command leaves that command to open its section.
                    let closed_by_end = matches!(
                        tokens.get(end).map(|t| &t.kind),
                        Some(TokenKind::EnvironmentEnd { .. })
                    );
                    i = if closed_by_end { end + 1 } else { end.max(i + 1) };
                    continue;
                }
                TokenKind::Command { name, .. } => {
                    if let Some(rank) = section_rank(name) {
                        i = self.open_section(i, name, rank)?;
                        continue;
                    }
                    match name.as_str() {
                        "bibliography" => self.issues.push(
                            Issue::new(
                                Severity::Info,
                                IssueKind::Unsupported,
                                format!(
                                    "external bibliography `{}` is not read",
                                    token.arg(0).unwrap_or("").trim()
                                ),
                            )
                            .at(token.span),
                        ),
                        "input" | "include" => self.issues.push(
                            Issue::new(
                                Severity::Info,
                                IssueKind::Unsupported,
                                format!(
                                    "`\\{name}{{{}}}` was not expanded",
                                    token.arg(0).unwrap_or("").trim()
                                ),
                            )
                            .at(token.span),
                        ),
                        _ => self.render(token)?,
                    }
                }
                _ => self.render(token)?,
            }
            i += 1;
        }
        Ok(())
    }

    fn render(&mut self, token: &Token) -> Result<(), ParseError> {
        let out = match self.sections.last_mut() {
            Some(section) => &mut section.content,
            None => &mut self.front,
        };
        self.renderer.render_token(token, out)
    }

    /// Open a section and return the index of the first token of its content.
    fn open_section(&mut self, at: usize, name: &str, rank: i8) -> Result<usize, ParseError> {
        let tokens = self.tokens;
        let token = &tokens[at];
        let raw_title = token.last_arg().unwrap_or("");
        let title = self.renderer.plain(raw_title)?;
        let mut label = find_label(raw_title, self.options.max_depth)?;

        // A `\label` right after the heading names the section.
        let mut next = at + 1;
        while tokens.get(next).is_some_and(Token::is_blank) {
            next += 1;
        }
        let next = match tokens.get(next) {
            Some(t) if t.is_command("label") => {
                label = label.or_else(|| t.arg(0).map(|l| l.trim().to_string()));
                next + 1
            }
            _ => at + 1,
        };

        let span = self.span(token.span);
        self.sections.push(FlatSection {
            rank,
            title,
            numbered: !name.ends_with('*'),
            label,
            content: RichText::new(),
            span,
        });
        Ok(next)
    }

    fn equation(&mut self, begin: usize, end: usize, environment: &str) {
        let tokens = self.tokens;
        let inner = &tokens[begin + 1..end.min(tokens.len())];
        let id = BlockKind::Equation.id(self.equations.len() + 1);
        let mut equation = Equation::new(id.clone(), self.raw_between(begin, end).trim());
        equation.label = first_label(inner);
        equation.environment = environment.to_string();
        equation.numbered = !environment.ends_with('*')
            && environment != "displaymath"
            && !inner.iter().any(|t| t.is_command("nonumber") || t.is_command("notag"));
        equation.span = self.block_span(begin, end);
        self.equations.push(equation);
        self.current().push(Inline::Block { id });
    }

    fn table(&mut self, begin: usize, end: usize) -> Result<(), ParseError> {
        let tokens = self.tokens;
        let inner_end = end.min(tokens.len());
        let inner = &tokens[begin + 1..inner_end];
        let id = BlockKind::Table.id(self.tables.len() + 1);
        let mut table = Table::new(id.clone());
        table.raw = self.raw_between(begin, end).trim().to_string();
        table.label = first_label(inner);
        table.span = self.block_span(begin, end);
        if let Some(caption) = inner.iter().rev().find(|t| t.is_command("caption")) {
            table.caption = self.renderer.render_trimmed(caption.last_arg().unwrap_or(""))?;
        }

        let tabular = match &tokens[begin].kind {
            TokenKind::EnvironmentBegin { name, .. } if is_tabular(name) => Some((begin, end)),
            _ => (begin + 1..inner_end)
                .find(|&j| {
                    matches!(&tokens[j].kind, TokenKind::EnvironmentBegin { name, .. } if is_tabular(name))
                })
                .map(|j| (j, self.end_of(j).min(end))),
        };
        if let Some((open, close)) = tabular {
            let body = self.raw_between(open, close);
            let parsed = parse_rows(&mut self.renderer, body)?;
            table.header_rows = parsed.header_rows;
            table.rows = parsed.rows;
            table.header_source = parsed.header_source;
            if table.caption.is_empty()
                && let Some(caption) = parsed.caption
            {
                table.caption = caption;
            }
            table.label = table.label.or(parsed.label);
        }

        self.tables.push(table);
        self.current().push(Inline::Block { id });
        Ok(())
    }

    fn figure(&mut self, begin: usize, end: usize) -> Result<(), ParseError> {
        let tokens = self.tokens;
        let inner = &tokens[begin + 1..end.min(tokens.len())];
        let id = BlockKind::Figure.id(self.figures.len() + 1);
        let mut figure = Figure::new(id.clone());
        if let Some(caption) = inner.iter().rev().find(|t| t.is_command("caption")) {
            figure = figure.with_caption(self.renderer.render_trimmed(caption.last_arg().unwrap_or(""))?);
        }
        figure.label = first_label(inner);
        figure.source_reference = inner.iter().find_map(graphic_path);
        figure.raw = self.raw_between(begin, end).trim().to_string();
        figure.span = self.block_span(begin, end);

        self.figures.push(figure);
        self.current().push(Inline::Block { id });
        Ok(())
    }

    /// `\bibitem{key}` followed by free text up to the next `\bibitem` or
    /// the end of the environment.
    fn bibliography(&mut self, begin: usize, end: usize) -> Result<(), ParseError> {
        let end = end.min(self.tokens.len());
        let items: Vec<usize> = (begin + 1..end)
            .filter(|&j| self.tokens[j].is_command("bibitem"))
            .collect();
        for (n, &item) in items.iter().enumerate() {
            let stop = items.get(n + 1).copied().unwrap_or(end);
            self.bibliography_entry(item, stop)?;
        }
        debug!(entries = items.len(), "read bibliography");
        Ok(())
    }

    fn bibliography_entry(&mut self, item: usize, stop: usize) -> Result<(), ParseError> {
        let tokens = self.tokens;
        let token = &tokens[item];
        let key = token.arg(0).unwrap_or("").trim().to_string();
        let text = self.renderer.plain_tokens(&tokens[item + 1..stop])?;
        let raw_end = tokens
            .get(stop)
            .map_or(self.input.len(), |t| t.span.start);
        let raw = self.input[token.span.end..raw_end.max(token.span.end)].trim();

        if key.is_empty() {
            self.issues.push(
                Issue::new(Severity::Minor, IssueKind::MalformedInput, "`\\bibitem` without a key")
                    .at(token.span),
            );
        } else if !self.bib_keys.insert(key.clone()) {
            self.issues.push(
                Issue::new(
                    Severity::Major,
                    IssueKind::DuplicateId,
                    format!("bibliography key `{key}` defined more than once"),
                )
                .at(token.span),
            );
        }

        let id = format!("ref_{}", self.bibliography.len() + 1);
        let mut entry = BibliographyEntry::new(id, key, text);
        entry.raw = raw.to_string();
        entry.span = self.span(Span::new(token.span.start, raw_end));
        self.bibliography.push(entry);
        Ok(())
    }

    fn block_span(&self, begin: usize, end: usize) -> Option<Span> {
        let stop = self
            .tokens
            .get(end)
            .map_or(self.input.len(), |t| t.span.end);
        self.span(Span::new(self.tokens[begin].span.start, stop))
    }

    fn finish(mut self, metadata: Metadata) -> ConversionResult<Document> {
        normalize_whitespace(&mut self.front);
        self.front.trim();

        let mut taken: HashSet<String> = self
            .equations
            .iter()
            .map(|e| e.id.clone())
            .chain(self.tables.iter().map(|t| t.id.clone()))
            .chain(self.figures.iter().map(|f| f.id.clone()))
            .chain(self.bibliography.iter().map(|b| b.id.clone()))
            .collect();
        let min_rank = self.sections.iter().map(|s| s.rank).min().unwrap_or(1);

        let mut flat = Vec::with_capacity(self.sections.len());
        for (n, mut section) in std::mem::take(&mut self.sections).into_iter().enumerate() {
            normalize_whitespace(&mut section.content);
            section.content.trim();
            let id = unique_id(&section.title, n + 1, &mut taken);
            let level = u8::try_from(section.rank - min_rank + 1).unwrap_or(1);
            flat.push(Section {
                id,
                level,
                title: section.title,
                number: None,
                numbered: section.numbered,
                label: section.label,
                content: section.content,
                children: Vec::new(),
                span: section.span,
            });
        }
        let sections = nest(flat);

        let mut doc = Document::new().with_metadata(metadata).with_source("latex");
        doc.front_matter = self.front;
        doc.sections = sections;
        doc.equations = self.equations;
        doc.tables = self.tables;
        doc.figures = self.figures;
        doc.citations = self.renderer.citations;
        doc.bibliography = self.bibliography;

        let mut issues = self.issues;
        issues.extend(doc.check_unique_ids());
        debug!(
            sections = doc.section_count(),
            equations = doc.equations.len(),
            tables = doc.tables.len(),
            figures = doc.figures.len(),
            citations = doc.citations.len(),
            bibliography = doc.bibliography.len(),
            issues = issues.len(),
            "extracted document"
        );
        ConversionResult::with_issues(doc, issues)
    }
}

/// Section id from the title slug, suffixed on collision.
fn unique_id(title: &str, n: usize, taken: &mut HashSet<String>) -> String {
    let slug = slugify(title);
    let base = if slug.is_empty() {
        format!("section_{n}")
    } else {
        slug
    };
    let mut id = base.clone();
    let mut suffix = 2;
    while taken.contains(&id) {
        id = format!("{base}_{suffix}");
        suffix += 1;
    }
    taken.insert(id.clone());
    id
}

/// Build the section tree from sections in source order.
fn nest(flat: Vec<Section>) -> Vec<Section> {
    fn attach(stack: &mut [Section], roots: &mut Vec<Section>, section: Section) {
        match stack.last_mut() {
            Some(parent) => parent.children.push(section),
            None => roots.push(section),
        }
    }

    let mut roots = Vec::new();
    let mut stack: Vec<Section> = Vec::new();
    for section in flat {
        while let Some(top) = stack.last()
            && top.level >= section.level
        {
            if let Some(done) = stack.pop() {
                attach(&mut stack, &mut roots, done);
            }
        }
        stack.push(section);
    }
    while let Some(done) = stack.pop() {
        attach(&mut stack, &mut roots, done);
    }
    roots
}

fn first_label(tokens: &[Token]) -> Option<String> {
    tokens
        .iter()
        .find(|t| t.is_command("label"))
        .and_then(|t| t.arg(0))
        .map(|l| l.trim().to_string())
}

fn find_label(text: &str, max_depth: usize) -> Result<Option<String>, ParseError> {
    if !text.contains("\\label") {
        return Ok(None);
    }
    Ok(first_label(&tokenize(text, max_depth)?))
}

/// Graphic file named by `\includegraphics{path}` or `\epsfig{figure=path}`.
fn graphic_path(token: &Token) -> Option<String> {
    match token.command_name()? {
        "includegraphics" => token.arg(0).map(|p| p.trim().to_string()),
        "epsfig" | "psfig" => token.arg(0)?.split(',').find_map(|option| {
            let (key, value) = option.split_once('=')?;
            matches!(key.trim(), "figure" | "file").then(|| value.trim().to_string())
        }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(input: &str) -> ConversionResult<Document> {
        parse_document(input, &ParseOptions::default()).unwrap()
    }

    fn titles(sections: &[Section]) -> Vec<&str> {
        sections.iter().map(|s| s.title.as_str()).collect()
    }

    #[test]
    fn test_last_metadata_declaration_wins() {
        let result = parse(
            r"\title{Stale Draft}
\author{Old Author}
\begin{document}
\title{Final Title}
\author{A. One \and B. Two}
\maketitle
\end{document}",
        );
        let meta = &result.value.metadata;
        assert_eq!(meta.title, "Final Title");
        let names: Vec<_> = meta.authors.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, ["A. One", "B. Two"]);
    }

    #[test]
    fn test_missing_metadata_is_empty_with_issues() {
        let result = parse(r"\section{Only} text");
        assert_eq!(result.value.metadata.title, "");
        assert!(result.value.metadata.authors.is_empty());
        let missing = result
            .issues
            .iter()
            .filter(|i| i.kind == IssueKind::MissingField)
            .count();
        assert_eq!(missing, 3);
    }

    #[test]
    fn test_section_tree() {
        let result = parse(
            r"\begin{document}
Front text.
\section{Intro} Opening.
\subsection{Background} Prior.
\subsubsection{Detail} Deep.
\subsection{Scope} Narrow.
\section*{Method} Steps.
\end{document}",
        );
        let doc = result.value;
        assert_eq!(doc.front_matter.plain_text(), "Front text.");
        assert_eq!(titles(&doc.sections), ["Intro", "Method"]);
        assert_eq!(titles(&doc.sections[0].children), ["Background", "Scope"]);
        assert_eq!(titles(&doc.sections[0].children[0].children), ["Detail"]);
        assert_eq!(doc.sections[0].content.plain_text(), "Opening.");
        assert_eq!(doc.sections[0].children[0].level, 2);
        assert!(!doc.sections[1].numbered);
        assert_eq!(doc.sections[1].id, "method");
    }

    #[test]
    fn test_levels_normalized_to_highest_command() {
        let doc = parse(r"\chapter{One} \section{A} \chapter{Two}").value;
        assert_eq!(titles(&doc.sections), ["One", "Two"]);
        assert_eq!(doc.sections[0].level, 1);
        assert_eq!(doc.sections[0].children[0].level, 2);
    }

    #[test]
    fn test_last_section_stops_at_bibliography() {
        let doc = parse(
            r"\section{End} Closing words.
\begin{thebibliography}{9}
\bibitem{smith} J. Smith, A paper, 2020.
\bibitem{doe} J. Doe, Another, 2019.
\end{thebibliography}",
        )
        .value;
        assert_eq!(doc.sections[0].content.plain_text(), "Closing words.");
        assert_eq!(doc.bibliography.len(), 2);
        assert_eq!(doc.bibliography[0].key, "smith");
        assert_eq!(doc.bibliography[0].text, "J. Smith, A paper, 2020.");
        assert_eq!(doc.bibliography[1].id, "ref_2");
    }

    #[test]
    fn test_blocks_extracted_with_labels() {
        let doc = parse(
            r"\section{Results}
See Table~\ref{tab:r}.
\begin{equation}\label{eq:loss} L = \sum_i \ell_i \end{equation}
\begin{table}[t]
\caption{Scores}\label{tab:r}
\begin{tabular}{lc} Name & Score \\ \hline A & 1 \\ \end{tabular}
\end{table}
\begin{figure}\includegraphics[width=3in]{plot.pdf}\caption{A plot}\end{figure}
\[ a^2 + b^2 \]",
        )
        .value;
        assert_eq!(doc.equations.len(), 2);
        assert_eq!(doc.equations[0].id, "eq_1");
        assert_eq!(doc.equations[0].label.as_deref(), Some("eq:loss"));
        assert!(doc.equations[0].raw_math.contains(r"\sum_i"));
        assert!(!doc.equations[1].numbered);
        assert_eq!(doc.equations[1].raw_math, "a^2 + b^2");

        let table = &doc.tables[0];
        assert_eq!(table.id, "table_1");
        assert_eq!(table.caption.plain_text(), "Scores");
        assert_eq!(table.label.as_deref(), Some("tab:r"));
        assert_eq!(table.header_rows, vec![vec!["Name", "Score"]]);
        assert_eq!(table.rows, vec![vec!["A", "1"]]);

        let figure = &doc.figures[0];
        assert_eq!(figure.source_reference.as_deref(), Some("plot.pdf"));
        assert_eq!(figure.description, "A plot");

        let blocks: Vec<_> = doc.sections[0]
            .content
            .inlines()
            .iter()
            .filter_map(|i| match i {
                Inline::Block { id } => Some(id.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(blocks, ["eq_1", "table_1", "figure_1", "eq_2"]);
    }

    #[test]
    fn test_unterminated_environment_recovers() {
        let result = parse(
            r"\section{A} Text.
\begin{figure}\caption{Lost}
\section{B} More.",
        );
        let doc = &result.value;
        assert_eq!(doc.figures.len(), 1);
        assert!(result.issues.iter().any(|i| {
            i.kind == IssueKind::MalformedInput
                && i.message == r"unterminated environment `figure`, closed before `\section`"
        }));
        assert_eq!(doc.figures[0].description, "Lost");
        assert_eq!(titles(&doc.sections), ["A", "B"]);
        assert_eq!(doc.sections[1].content.plain_text().trim(), "More.");
    }

    #[test]
    fn test_unterminated_table_keeps_later_sections() {
        let result = parse(
            r"\section{A}
\begin{table}\begin{tabular}{cc} 1 & 2 \\ \end{tabular}
\section{B} Middle.
\section{C} Last.",
        );
        let doc = &result.value;
        assert_eq!(titles(&doc.sections), ["A", "B", "C"]);
        assert_eq!(doc.tables.len(), 1);
        assert_eq!(doc.tables[0].rows, vec![vec!["1", "2"]]);
        assert!(
            result
                .issues
                .iter()
                .any(|i| i.message.starts_with("unterminated environment `table`"))
        );
    }

    #[test]
    fn test_unterminated_document_runs_to_end() {
        let doc = parse(r"\begin{document}\section{A} x \section{B} y").value;
        assert_eq!(titles(&doc.sections), ["A", "B"]);
    }

    #[test]
    fn test_mismatched_end_closes_inner_environment() {
        let result = parse(r"\begin{center}\begin{itemize}\item x\end{center} after");
        assert!(
            result
                .issues
                .iter()
                .any(|i| i.message.contains("`itemize` closed by"))
        );
        assert_eq!(result.value.front_matter.plain_text(), "x after");
    }

    #[test]
    fn test_section_label_after_heading() {
        let doc = parse("\\section{Intro}\n  \\label{sec:intro}\nBody").value;
        assert_eq!(doc.sections[0].label.as_deref(), Some("sec:intro"));
        assert_eq!(doc.sections[0].content.plain_text(), "Body");
    }

    #[test]
    fn test_section_ids_unique() {
        let doc = parse(r"\section{Setup} \section{Setup} \section{} \section{Table 1}").value;
        let ids: Vec<_> = doc.sections.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, ["setup", "setup_2", "section_3", "table_1"]);
        assert!(doc.check_unique_ids().is_empty());
    }

    #[test]
    fn test_duplicate_bibitem_reported() {
        let result = parse(
            r"\begin{thebibliography}{1}\bibitem{a} One. \bibitem{a} Two.\end{thebibliography}",
        );
        assert_eq!(result.value.bibliography.len(), 2);
        assert!(result.issues.iter().any(|i| i.kind == IssueKind::DuplicateId));
    }

    #[test]
    fn test_external_bibliography_is_info() {
        let result = parse(r"\bibliography{refs}");
        assert!(result.issues.iter().any(|i| {
            i.severity == Severity::Info && i.message.contains("`refs`")
        }));
        assert!(result.value.bibliography.is_empty());
    }

    #[test]
    fn test_epsfig_source() {
        let doc = parse(r"\begin{figure}\epsfig{figure=arch.eps,width=8cm}\end{figure}").value;
        assert_eq!(doc.figures[0].source_reference.as_deref(), Some("arch.eps"));
    }

    #[test]
    fn test_spans_only_when_requested() {
        let input = r"\section{A} \cite{k}";
        let plain = parse(input).value;
        assert_eq!(plain.sections[0].span, None);

        let options = ParseOptions {
            preserve_spans: true,
            ..Default::default()
        };
        let doc = parse_document(input, &options).unwrap().value;
        assert_eq!(doc.sections[0].span, Some(Span::new(0, 11)));
        assert_eq!(doc.citations[0].span, Some(Span::new(12, 20)));
    }
}

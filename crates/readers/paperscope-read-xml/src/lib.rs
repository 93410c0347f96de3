//! Academic-paper XML reader for paperscope.
//!
//! Reads the XML intermediate representation a conversion pipeline emits
//! for a paper (a `paper` root with `metadata`, `content`, and block
//! elements) into a [`Document`] that can be scored against the source.
//! Namespaces are ignored; only local names matter.
//!
//! Tables, figures, equations, citations and bibliography entries are
//! collected wherever they appear in the tree.

mod tree;

use paperscope_core::{
    Author, BibliographyEntry, BlockKind, Citation, ConversionResult, Document, DuplicateKeys,
    Equation, Figure, HeaderSource, Issue, IssueKind, Metadata, ParseError, ParseOptions, Parser,
    RichText, Row, Section, Severity, Table, input_text,
};
use std::collections::HashSet;
use tracing::debug;
use tree::Element;

/// Element names that open a section, outermost first.
const SECTION_ELEMENTS: &[&str] = &["section", "subsection", "subsubsection"];

/// Parse paper XML into a document.
pub fn parse(input: &str) -> Result<ConversionResult<Document>, ParseError> {
    parse_with_options(input, &ParseOptions::default())
}

/// Parse paper XML with custom options.
///
/// The XML tree carries no source offsets, so `preserve_spans` has no
/// effect here.
pub fn parse_with_options(
    input: &str,
    options: &ParseOptions,
) -> Result<ConversionResult<Document>, ParseError> {
    let root = tree::read(input, options.max_depth)?;
    let mut converter = Converter {
        options,
        issues: Vec::new(),
        section_count: 0,
    };
    let doc = converter.document(&root);
    let mut issues = converter.issues;
    issues.extend(doc.check_unique_ids());
    debug!(
        sections = doc.section_count(),
        tables = doc.tables.len(),
        figures = doc.figures.len(),
        citations = doc.citations.len(),
        "read paper xml"
    );
    Ok(ConversionResult::with_issues(doc, issues))
}

/// [`Parser`] implementation for the paper XML dialect.
#[derive(Debug, Clone, Copy, Default)]
pub struct XmlParser;

impl Parser for XmlParser {
    fn formats(&self) -> &[&str] {
        &["xml"]
    }

    fn parse(
        &self,
        input: &[u8],
        options: &ParseOptions,
    ) -> Result<ConversionResult<Document>, ParseError> {
        parse_with_options(input_text(input)?, options)
    }
}

struct Converter<'o> {
    options: &'o ParseOptions,
    issues: Vec<Issue>,
    section_count: usize,
}

impl Converter<'_> {
    fn document(&mut self, root: &Element) -> Document {
        if root.name != "paper" {
            self.issues.push(Issue::new(
                Severity::Minor,
                IssueKind::Unsupported,
                format!("root element is <{}>, expected <paper>", root.name),
            ));
        }

        let metadata = root
            .child("metadata")
            .map(|m| self.metadata(m))
            .unwrap_or_default();
        if metadata.title.is_empty() {
            self.issues.push(Issue::new(
                Severity::Minor,
                IssueKind::MissingField,
                "no title element",
            ));
        }

        let mut doc = Document::new().with_metadata(metadata).with_source("xml");
        if let Some(content) = root.child("content") {
            doc.sections = self.sections(content, 1);
        }
        doc.tables = collect(root, "table").iter().enumerate().map(|(n, e)| table(e, n + 1)).collect();
        doc.figures = collect(root, "figure").iter().enumerate().map(|(n, e)| figure(e, n + 1)).collect();
        doc.equations = collect(root, "equation")
            .iter()
            .enumerate()
            .map(|(n, e)| equation(e, n + 1))
            .collect();
        doc.citations = collect(root, "citation")
            .iter()
            .filter_map(|e| self.citation(e))
            .enumerate()
            .map(|(n, keys)| Citation::new(format!("cite_{}", n + 1), keys))
            .collect();

        let mut entries = collect(root, "entry");
        entries.extend(collect(root, "reference"));
        doc.bibliography = entries
            .iter()
            .enumerate()
            .map(|(n, e)| bibliography_entry(e, n + 1))
            .collect();
        doc
    }

    fn metadata(&self, element: &Element) -> Metadata {
        let authors = element
            .child("authors")
            .map(|list| list.children_named("author").filter_map(author).collect())
            .unwrap_or_default();
        Metadata {
            title: element.child_text("title"),
            authors,
            abstract_text: RichText::plain(element.child_text("abstract")),
        }
    }

    /// Sections directly under `parent`. A flat `subsection` sibling is
    /// attached to the section before it.
    fn sections(&mut self, parent: &Element, level: u8) -> Vec<Section> {
        let mut out: Vec<Section> = Vec::new();
        for element in parent.elements() {
            let Some(rank) = SECTION_ELEMENTS.iter().position(|n| *n == element.name) else {
                continue;
            };
            let section = self.section(element, level);
            if rank > 0
                && let Some(previous) = out.last_mut()
            {
                let mut section = section;
                relevel(&mut section, previous.level + 1);
                previous.children.push(section);
            } else {
                out.push(section);
            }
        }
        out
    }

    fn section(&mut self, element: &Element, level: u8) -> Section {
        self.section_count += 1;
        let id = element
            .attr("id")
            .map(str::to_string)
            .unwrap_or_else(|| format!("section_{}", self.section_count));
        let title = match element.child("title") {
            Some(title) => title.text(),
            None => element.attr("title").unwrap_or("").trim().to_string(),
        };

        let paragraphs: Vec<String> = element
            .elements()
            .filter(|e| matches!(e.name.as_str(), "text" | "p" | "para" | "paragraph"))
            .map(Element::text)
            .filter(|t| !t.is_empty())
            .collect();

        let mut section = Section::new(id, level, title).with_content(paragraphs.join("\n\n"));
        section.numbered = element.attr("numbered") != Some("false");
        section.label = element.attr("label").map(str::to_string);
        section.children = self.sections(element, level + 1);
        section
    }

    fn citation(&mut self, element: &Element) -> Option<Vec<String>> {
        let raw = element
            .attr("keys")
            .map(str::to_string)
            .unwrap_or_else(|| element.text());
        let mut keys: Vec<String> = raw
            .split(',')
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(String::from)
            .collect();
        if self.options.duplicate_keys == DuplicateKeys::Collapse {
            let mut seen = HashSet::new();
            keys.retain(|k| seen.insert(k.clone()));
        }
        if keys.is_empty() {
            self.issues.push(Issue::new(
                Severity::Minor,
                IssueKind::MalformedInput,
                "citation element without keys",
            ));
            return None;
        }
        Some(keys)
    }
}

fn relevel(section: &mut Section, level: u8) {
    section.level = level;
    for child in &mut section.children {
        relevel(child, level + 1);
    }
}

fn collect<'e>(root: &'e Element, name: &str) -> Vec<&'e Element> {
    let mut out = Vec::new();
    root.descendants(name, &mut out);
    out
}

fn author(element: &Element) -> Option<Author> {
    let name = match element.child("name") {
        Some(name) => name.text(),
        None if element.elements().next().is_none() => element.text(),
        None => String::new(),
    };
    if name.is_empty() {
        return None;
    }
    let optional = |field: &str| Some(element.child_text(field)).filter(|t| !t.is_empty());
    Some(Author {
        name,
        affiliation: optional("affiliation"),
        email: optional("email"),
    })
}

fn table(element: &Element, n: usize) -> Table {
    let id = element
        .attr("id")
        .map(str::to_string)
        .unwrap_or_else(|| BlockKind::Table.id(n));
    let mut table = Table::new(id).with_caption(element.child_text("caption"));
    table.label = element.attr("label").map(str::to_string);

    let rows: Vec<&Element> = element.children_named("row").collect();
    if rows.is_empty() {
        table.raw = element.child_text("content");
        table.rows = content_rows(element.child("content"));
    } else {
        for row in rows {
            let cells: Row = row.children_named("cell").map(Element::text).collect();
            if row.attr("header") == Some("true") {
                table.header_rows.push(cells);
            } else {
                table.rows.push(cells);
            }
        }
        if !table.header_rows.is_empty() {
            table.header_source = HeaderSource::Explicit;
        }
    }
    table
}

/// Rows of a free-text `content` element: one row per line, cells split on
/// `|`. Separator lines made only of dashes are dropped.
fn content_rows(content: Option<&Element>) -> Vec<Row> {
    let Some(content) = content else {
        return Vec::new();
    };
    let mut raw = String::new();
    for child in &content.children {
        if let tree::Node::Text(text) = child {
            raw.push_str(text);
        }
    }
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.chars().all(|c| matches!(c, '-' | '|' | '+' | ' ')))
        .map(|line| {
            line.trim_matches('|')
                .split('|')
                .map(|cell| cell.trim().to_string())
                .collect()
        })
        .collect()
}

fn figure(element: &Element, n: usize) -> Figure {
    let id = element
        .attr("id")
        .map(str::to_string)
        .unwrap_or_else(|| BlockKind::Figure.id(n));
    let mut figure = Figure::new(id).with_caption(element.child_text("caption"));
    if figure.description.is_empty() {
        figure.description = element.child_text("content");
    }
    figure.label = element.attr("label").map(str::to_string);
    figure.source_reference = element
        .child("source_reference")
        .map(Element::text)
        .or_else(|| element.attr("src").map(str::to_string))
        .filter(|s| !s.is_empty());
    figure
}

fn equation(element: &Element, n: usize) -> Equation {
    let id = element
        .attr("id")
        .map(str::to_string)
        .unwrap_or_else(|| BlockKind::Equation.id(n));
    let mut equation = Equation::new(id, element.text());
    equation.label = element.attr("label").map(str::to_string);
    equation
}

fn bibliography_entry(element: &Element, n: usize) -> BibliographyEntry {
    let key = element
        .attr("key")
        .or_else(|| element.attr("id"))
        .unwrap_or("")
        .to_string();
    let mut entry = BibliographyEntry::new(format!("ref_{n}"), key, element.text());
    entry.authors = element
        .child("authors")
        .map(|list| list.children_named("author").map(Element::text).collect())
        .unwrap_or_default();
    entry.title = element.child_text("title");
    entry.venue = Some(element.child_text("venue")).filter(|v| !v.is_empty());
    entry.year = Some(element.child_text("year")).filter(|y| !y.is_empty());
    entry
}

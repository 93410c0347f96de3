//! JSON intermediate-representation reader for paperscope.
//!
//! Reads the structured JSON a conversion pipeline emits for a paper into a
//! [`Document`] so it can be scored against the source. Every field of the
//! dialect is optional:
//!
//! ```
//! use paperscope_read_json::parse;
//!
//! let json = r#"{
//!   "metadata": {"title": "A Paper", "authors": ["Ada Lovelace"]},
//!   "sections": [{"title": "Intro", "content": "Hello.", "subsections": []}],
//!   "citations": ["smith2020", {"keys": ["a", "b"]}]
//! }"#;
//!
//! let doc = parse(json).unwrap().value;
//! assert_eq!(doc.metadata.title, "A Paper");
//! assert_eq!(doc.citations.len(), 2);
//! ```

use paperscope_core::{
    Author, BibliographyEntry, BlockKind, Citation, ConversionResult, Document, DuplicateKeys,
    Equation, Figure, HeaderSource, Issue, IssueKind, Metadata, ParseError, ParseOptions, Parser,
    RichText, Section, Severity, Table, input_text,
};
use serde::Deserialize;
use std::collections::HashSet;
use tracing::debug;

/// Parse paper JSON into a document.
pub fn parse(input: &str) -> Result<ConversionResult<Document>, ParseError> {
    parse_with_options(input, &ParseOptions::default())
}

/// Parse paper JSON with custom options.
pub fn parse_with_options(
    input: &str,
    options: &ParseOptions,
) -> Result<ConversionResult<Document>, ParseError> {
    let paper: JsonPaper = serde_json::from_str(input)
        .map_err(|e| ParseError::Invalid(format!("paper JSON parse error: {}", e)))?;

    let mut issues = Vec::new();
    if paper.metadata.title.is_empty() {
        issues.push(Issue::new(
            Severity::Minor,
            IssueKind::MissingField,
            "no metadata.title",
        ));
    }

    let mut counter = 0;
    let doc = Document {
        metadata: convert_metadata(paper.metadata),
        front_matter: RichText::new(),
        sections: paper
            .sections
            .into_iter()
            .map(|s| convert_section(s, 1, &mut counter))
            .collect(),
        equations: paper
            .equations
            .into_iter()
            .enumerate()
            .map(|(n, e)| convert_equation(e, n + 1))
            .collect(),
        tables: paper
            .tables
            .into_iter()
            .enumerate()
            .map(|(n, t)| convert_table(t, n + 1))
            .collect(),
        figures: paper
            .figures
            .into_iter()
            .enumerate()
            .map(|(n, f)| convert_figure(f, n + 1))
            .collect(),
        citations: convert_citations(paper.citations, options.duplicate_keys, &mut issues),
        bibliography: paper
            .references
            .into_iter()
            .enumerate()
            .map(|(n, r)| convert_reference(r, n + 1))
            .collect(),
        source: None,
    }
    .with_source("json");

    issues.extend(doc.check_unique_ids());
    debug!(
        sections = doc.section_count(),
        tables = doc.tables.len(),
        citations = doc.citations.len(),
        "read paper json"
    );
    Ok(ConversionResult::with_issues(doc, issues))
}

/// [`Parser`] implementation for the paper JSON dialect.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonParser;

impl Parser for JsonParser {
    fn formats(&self) -> &[&str] {
        &["json"]
    }

    fn parse(
        &self,
        input: &[u8],
        options: &ParseOptions,
    ) -> Result<ConversionResult<Document>, ParseError> {
        parse_with_options(input_text(input)?, options)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct JsonPaper {
    metadata: JsonMetadata,
    sections: Vec<JsonSection>,
    tables: Vec<JsonTable>,
    figures: Vec<JsonFigure>,
    equations: Vec<JsonEquation>,
    #[serde(alias = "bibliography")]
    references: Vec<JsonReference>,
    citations: Vec<JsonCitation>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct JsonMetadata {
    title: String,
    authors: Vec<JsonAuthor>,
    #[serde(rename = "abstract")]
    abstract_text: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum JsonAuthor {
    Name(String),
    Full {
        name: String,
        #[serde(default)]
        affiliation: Option<String>,
        #[serde(default)]
        email: Option<String>,
    },
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct JsonSection {
    id: Option<String>,
    title: String,
    level: Option<u8>,
    content: String,
    label: Option<String>,
    subsections: Vec<JsonSection>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct JsonTable {
    id: Option<String>,
    caption: String,
    label: Option<String>,
    headers: Vec<Scalar>,
    rows: Vec<Vec<Scalar>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct JsonFigure {
    id: Option<String>,
    caption: String,
    label: Option<String>,
    description: String,
    source_reference: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct JsonEquation {
    id: Option<String>,
    content: String,
    label: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct JsonReference {
    id: Option<String>,
    key: Option<String>,
    text: String,
    authors: Vec<String>,
    title: String,
    venue: Option<String>,
    year: Option<Scalar>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum JsonCitation {
    Key(String),
    Keys { keys: Vec<String> },
}

/// A table cell or year written as either a string or a number.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Scalar {
    String(String),
    Int(i64),
    Float(f64),
}

impl std::fmt::Display for Scalar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scalar::String(s) => write!(f, "{}", s),
            Scalar::Int(i) => write!(f, "{}", i),
            Scalar::Float(x) => write!(f, "{}", x),
        }
    }
}

fn convert_metadata(meta: JsonMetadata) -> Metadata {
    Metadata {
        title: meta.title.trim().to_string(),
        authors: meta
            .authors
            .into_iter()
            .map(|author| match author {
                JsonAuthor::Name(name) => Author::new(name),
                JsonAuthor::Full {
                    name,
                    affiliation,
                    email,
                } => Author {
                    name,
                    affiliation,
                    email,
                },
            })
            .filter(|a| !a.name.trim().is_empty())
            .collect(),
        abstract_text: RichText::plain(meta.abstract_text.trim()),
    }
}

/// `level` in the JSON wins over nesting depth when present.
fn convert_section(section: JsonSection, depth: u8, counter: &mut usize) -> Section {
    *counter += 1;
    let id = section
        .id
        .unwrap_or_else(|| format!("section_{}", counter));
    let mut out = Section::new(id, section.level.unwrap_or(depth), section.title.trim())
        .with_content(section.content.trim());
    out.label = section.label;
    out.children = section
        .subsections
        .into_iter()
        .map(|s| convert_section(s, depth + 1, counter))
        .collect();
    out
}

fn convert_equation(equation: JsonEquation, n: usize) -> Equation {
    let id = equation.id.unwrap_or_else(|| BlockKind::Equation.id(n));
    let mut out = Equation::new(id, equation.content.trim());
    out.label = equation.label;
    out
}

fn convert_table(table: JsonTable, n: usize) -> Table {
    let id = table.id.unwrap_or_else(|| BlockKind::Table.id(n));
    let mut out = Table::new(id).with_caption(table.caption.trim());
    out.label = table.label;
    if !table.headers.is_empty() {
        out.header_rows = vec![table.headers.iter().map(Scalar::to_string).collect()];
        out.header_source = HeaderSource::Explicit;
    }
    out.rows = table
        .rows
        .iter()
        .map(|row| row.iter().map(Scalar::to_string).collect())
        .collect();
    out
}

fn convert_figure(figure: JsonFigure, n: usize) -> Figure {
    let id = figure.id.unwrap_or_else(|| BlockKind::Figure.id(n));
    let mut out = Figure::new(id).with_caption(figure.caption.trim());
    if out.description.is_empty() {
        out.description = figure.description.trim().to_string();
    }
    out.label = figure.label;
    out.source_reference = figure.source_reference.filter(|s| !s.is_empty());
    out
}

fn convert_citations(
    citations: Vec<JsonCitation>,
    policy: DuplicateKeys,
    issues: &mut Vec<Issue>,
) -> Vec<Citation> {
    let mut out = Vec::new();
    for citation in citations {
        let raw: Vec<String> = match citation {
            JsonCitation::Key(key) => key.split(',').map(String::from).collect(),
            JsonCitation::Keys { keys } => keys,
        };
        let mut keys: Vec<String> = raw
            .iter()
            .map(|k| k.trim())
            .filter(|k| !k.is_empty())
            .map(String::from)
            .collect();
        if policy == DuplicateKeys::Collapse {
            let mut seen = HashSet::new();
            keys.retain(|k| seen.insert(k.clone()));
        }
        if keys.is_empty() {
            issues.push(Issue::new(
                Severity::Minor,
                IssueKind::MalformedInput,
                "citation without keys",
            ));
            continue;
        }
        out.push(Citation::new(format!("cite_{}", out.len() + 1), keys));
    }
    out
}

fn convert_reference(reference: JsonReference, n: usize) -> BibliographyEntry {
    let id = reference.id.unwrap_or_else(|| format!("ref_{n}"));
    let key = reference.key.unwrap_or_else(|| id.clone());
    let text = if reference.text.is_empty() {
        reference.title.clone()
    } else {
        reference.text
    };
    let mut entry = BibliographyEntry::new(id, key, text);
    entry.authors = reference.authors;
    entry.title = reference.title;
    entry.venue = reference.venue.filter(|v| !v.is_empty());
    entry.year = reference.year.map(|y| y.to_string());
    entry
}

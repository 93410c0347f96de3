//! Citation and cross-reference resolution for paperscope documents.
//!
//! [`Resolver`] is the post-parse pass that gives citations and
//! cross-references their display forms:
//! - sections, equations, tables and figures are numbered in order of
//!   appearance and every label is mapped to its number;
//! - each bibliography entry gets an author-year key (`Smith2020`,
//!   `Smith2020a`, ...);
//! - citation markers are rewritten to the bracketed list of those keys,
//!   reference markers to the target's number.
//!
//! Anything that cannot be resolved keeps its bracketed raw key or label and
//! is reported. Section boundaries, ids and ordering are never touched.

pub mod keys;
pub mod numbering;

pub use keys::{assign_keys, author_year, find_surname, find_year};
pub use numbering::{Numbered, label_map, number_sections};

use paperscope_core::{
    BibliographyEntry, ConversionResult, Document, Inline, Issue, IssueKind, Severity,
    TransformError, Transformer,
};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Fills the structured fields of a bibliography entry from its free text.
///
/// Decomposing free-text references is left to implementations of this
/// trait, which may wrap an external service. The resolver calls it once per
/// entry before deriving citation keys.
pub trait BibliographyEnricher: Send + Sync {
    fn enrich(&self, entry: &mut BibliographyEntry);
}

/// Resolves citations and cross-references in place.
#[derive(Default)]
pub struct Resolver {
    enricher: Option<Box<dyn BibliographyEnricher>>,
}

impl Resolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `enricher` over every bibliography entry before keys are assigned.
    pub fn with_enricher(mut self, enricher: impl BibliographyEnricher + 'static) -> Self {
        self.enricher = Some(Box::new(enricher));
        self
    }

    /// Resolve a document, collecting issues instead of failing.
    pub fn resolve(&self, mut doc: Document) -> ConversionResult<Document> {
        let mut issues = Vec::new();

        for entry in &mut doc.bibliography {
            if let Some(enricher) = &self.enricher {
                enricher.enrich(entry);
            }
            if entry.year.is_none() {
                entry.year = find_year(&entry.text).map(str::to_string);
            }
        }
        let citation_keys = assign_keys(&doc.bibliography);
        let mut by_key: HashMap<String, String> = HashMap::new();
        for (entry, key) in doc.bibliography.iter_mut().zip(citation_keys) {
            by_key.entry(entry.key.clone()).or_insert_with(|| key.clone());
            entry.citation_key = Some(key);
        }

        number_sections(&mut doc.sections);
        let labels = label_map(&doc, &mut issues);

        let mut citation_text = HashMap::new();
        for citation in &mut doc.citations {
            let mut unresolved = HashSet::new();
            let resolved: Vec<String> = citation
                .keys
                .iter()
                .map(|key| match by_key.get(key) {
                    Some(display) => display.clone(),
                    None => {
                        unresolved.insert(key.as_str());
                        key.clone()
                    }
                })
                .collect();
            let text = format!("[{}]", resolved.join(", "));
            for key in &citation.keys {
                if unresolved.remove(key.as_str()) {
                    let mut issue = Issue::new(
                        Severity::Minor,
                        IssueKind::UnresolvedReference,
                        format!("citation key `{key}` has no bibliography entry"),
                    );
                    if let Some(span) = citation.span {
                        issue = issue.at(span);
                    }
                    issues.push(issue);
                }
            }
            citation_text.insert(citation.id.clone(), text.clone());
            citation.resolved_keys = resolved;
            citation.resolved_text = Some(text);
        }

        // Descriptions copied from a caption follow the rewritten caption.
        let derived: Vec<bool> = doc
            .figures
            .iter()
            .map(|f| f.description == f.caption.plain_text().trim())
            .collect();
        let mut unresolved_labels = Vec::new();
        doc.for_each_text_mut(|rich| {
            rich.visit_mut(&mut |inline| match inline {
                Inline::Citation { id, text } => {
                    if let Some(resolved) = citation_text.get(id.as_str()) {
                        text.clone_from(resolved);
                    }
                }
                Inline::Reference { label, style, text } => match labels.get(label.as_str()) {
                    Some(target) => *text = target.render(*style),
                    None => {
                        *text = format!("[{label}]");
                        unresolved_labels.push(label.clone());
                    }
                },
                _ => {}
            })
        });
        for (figure, derived) in doc.figures.iter_mut().zip(derived) {
            if derived {
                figure.description = figure.caption.plain_text().trim().to_string();
            }
        }
        for label in unresolved_labels {
            issues.push(Issue::new(
                Severity::Minor,
                IssueKind::UnresolvedReference,
                format!("reference to unknown label `{label}`"),
            ));
        }

        debug!(
            entries = doc.bibliography.len(),
            citations = doc.citations.len(),
            labels = labels.len(),
            issues = issues.len(),
            "resolved citations and references"
        );
        ConversionResult::with_issues(doc, issues)
    }
}

impl Transformer for Resolver {
    fn name(&self) -> &str {
        "resolve"
    }

    fn transform(&self, doc: Document) -> Result<ConversionResult<Document>, TransformError> {
        Ok(self.resolve(doc))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use paperscope_core::{Citation, Figure, RefStyle, RichText, Section, Table};
    use pretty_assertions::assert_eq;

    fn cited(keys: &[&str]) -> (Citation, Inline) {
        let citation = Citation::new("cite_1", keys.iter().map(|k| k.to_string()).collect());
        let inline = Inline::Citation {
            id: citation.id.clone(),
            text: citation.raw_text(),
        };
        (citation, inline)
    }

    #[test]
    fn test_citation_rewritten_in_text() {
        let mut doc = Document::new();
        let (citation, inline) = cited(&["smith", "ghost", "smith"]);
        doc.citations.push(citation);
        doc.sections
            .push(Section::new("intro", 1, "Intro").with_content(RichText(vec![inline])));
        doc.bibliography
            .push(BibliographyEntry::new("ref_1", "smith", "J. Smith, A paper, 2020."));

        let result = Resolver::new().resolve(doc);
        let doc = result.value;
        assert_eq!(
            doc.citations[0].resolved_text.as_deref(),
            Some("[Smith2020, ghost, Smith2020]")
        );
        assert_eq!(doc.citations[0].keys, ["smith", "ghost", "smith"]);
        assert_eq!(doc.citations[0].resolved_keys, ["Smith2020", "ghost", "Smith2020"]);
        assert_eq!(doc.sections[0].content.plain_text(), "[Smith2020, ghost, Smith2020]");
        assert_eq!(doc.bibliography[0].year.as_deref(), Some("2020"));
        assert_eq!(result.issues.len(), 1);
        assert!(result.issues[0].message.contains("`ghost`"));
    }

    #[test]
    fn test_references_rendered_by_style() {
        let mut doc = Document::new();
        doc.tables.push(Table::new("table_1").with_label("tab:a"));
        let refs = ["tab:a", "tab:a", "missing"]
            .iter()
            .zip([RefStyle::Plain, RefStyle::Named, RefStyle::Plain])
            .map(|(label, style)| Inline::Reference {
                label: label.to_string(),
                style,
                text: format!("[{label}]"),
            })
            .collect();
        doc.front_matter = RichText(refs);

        let result = Resolver::new().resolve(doc);
        let texts: Vec<_> = result
            .value
            .front_matter
            .inlines()
            .iter()
            .map(|i| match i {
                Inline::Reference { text, .. } => text.as_str(),
                _ => "",
            })
            .collect();
        assert_eq!(texts, ["1", "Table 1", "[missing]"]);
        assert_eq!(result.issues.len(), 1);
        assert_eq!(result.issues[0].kind, IssueKind::UnresolvedReference);
    }

    #[test]
    fn test_figure_description_follows_resolved_caption() {
        let mut doc = Document::new();
        let (citation, inline) = cited(&["smith"]);
        doc.citations.push(citation);
        doc.tables.push(Table::new("table_1").with_label("tab:a"));
        let caption = RichText(vec![
            Inline::text("See "),
            Inline::Reference {
                label: "tab:a".into(),
                style: RefStyle::Named,
                text: "[tab:a]".into(),
            },
            Inline::text(" "),
            inline,
        ]);
        doc.figures.push(Figure::new("figure_1").with_caption(caption));
        let mut described = Figure::new("figure_2").with_caption("Plot of [tab:a]");
        described.description = "Hand-written alt text".into();
        doc.figures.push(described);
        doc.bibliography
            .push(BibliographyEntry::new("ref_1", "smith", "J. Smith, A paper, 2020."));

        let doc = Resolver::new().resolve(doc).value;
        assert_eq!(doc.figures[0].caption.plain_text(), "See Table 1 [Smith2020]");
        assert_eq!(doc.figures[0].description, "See Table 1 [Smith2020]");
        assert_eq!(doc.figures[1].description, "Hand-written alt text");
    }

    struct Fixed;

    impl BibliographyEnricher for Fixed {
        fn enrich(&self, entry: &mut BibliographyEntry) {
            entry.authors = vec!["Grace Hopper".into()];
            entry.year = Some("1952".into());
        }
    }

    #[test]
    fn test_enricher_feeds_keys() {
        let mut doc = Document::new();
        doc.bibliography
            .push(BibliographyEntry::new("ref_1", "h", "unstructured text 2001"));
        let doc = Resolver::new().with_enricher(Fixed).resolve(doc).value;
        assert_eq!(doc.bibliography[0].citation_key.as_deref(), Some("Hopper1952"));
    }

    #[test]
    fn test_transformer_name() {
        let resolver = Resolver::new();
        assert_eq!(resolver.name(), "resolve");
        let result = resolver.transform(Document::new()).unwrap();
        assert!(result.issues.is_empty());
    }
}

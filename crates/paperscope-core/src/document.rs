//! Document type - the root container for an extracted paper.

use crate::{
    BibliographyEntry, Citation, Equation, Figure, Issue, IssueKind, RichText, Severity, Span,
    Table,
};
use std::collections::HashSet;

/// An extracted paper.
///
/// The document owns its sections and every block collection. Citations and
/// cross-references point at other parts by id or label, never by reference.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Document {
    pub metadata: Metadata,
    /// Prose between the start of the body and the first section.
    pub front_matter: RichText,
    /// Top-level sections in source order.
    pub sections: Vec<Section>,
    pub equations: Vec<Equation>,
    pub tables: Vec<Table>,
    pub figures: Vec<Figure>,
    pub citations: Vec<Citation>,
    pub bibliography: Vec<BibliographyEntry>,
    /// Source format information.
    pub source: Option<SourceInfo>,
}

/// Information about the format a document was read from.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SourceInfo {
    /// Format identifier (e.g., "latex", "xml", "json").
    pub format: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Metadata {
    pub title: String,
    pub authors: Vec<Author>,
    #[cfg_attr(feature = "serde", serde(rename = "abstract"))]
    pub abstract_text: RichText,
}

#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Author {
    pub name: String,
    pub affiliation: Option<String>,
    pub email: Option<String>,
}

impl Author {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            affiliation: None,
            email: None,
        }
    }

    pub fn with_affiliation(mut self, affiliation: impl Into<String>) -> Self {
        self.affiliation = Some(affiliation.into());
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}

/// A section and its nested subsections.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Section {
    pub id: String,
    /// 1 = top level, 2 = nested, ...
    pub level: u8,
    pub title: String,
    /// Hierarchical number ("2.1") for numbered sections, set by resolution.
    pub number: Option<String>,
    pub numbered: bool,
    pub label: Option<String>,
    /// Prose between the heading and the first child section (or the end of
    /// the section when it has no children).
    pub content: RichText,
    pub children: Vec<Section>,
    pub span: Option<Span>,
}

impl Section {
    pub fn new(id: impl Into<String>, level: u8, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            level,
            title: title.into(),
            number: None,
            numbered: true,
            label: None,
            content: RichText::new(),
            children: Vec::new(),
            span: None,
        }
    }

    pub fn with_content(mut self, content: impl Into<RichText>) -> Self {
        self.content = content.into();
        self
    }

    pub fn child(mut self, child: Section) -> Self {
        self.children.push(child);
        self
    }

    /// Own content followed by each child's title and full text, recursively.
    pub fn full_text(&self) -> String {
        let mut out = self.content.plain_text();
        for child in &self.children {
            out.push('\n');
            out.push_str(&child.title);
            out.push('\n');
            out.push_str(&child.full_text());
        }
        out
    }

    /// This section and all of its descendants, depth first.
    pub fn walk(&self) -> Vec<&Section> {
        let mut out = vec![self];
        for child in &self.children {
            out.extend(child.walk());
        }
        out
    }
}

impl Document {
    /// Create a new empty document.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_source(mut self, format: impl Into<String>) -> Self {
        self.source = Some(SourceInfo {
            format: format.into(),
        });
        self
    }

    /// Every section at every level, depth first in source order.
    pub fn all_sections(&self) -> Vec<&Section> {
        self.sections.iter().flat_map(Section::walk).collect()
    }

    pub fn section_count(&self) -> usize {
        self.all_sections().len()
    }

    /// Apply `f` to every rich-text field: abstract, front matter, section
    /// content (recursively) and block captions.
    pub fn for_each_text_mut(&mut self, mut f: impl FnMut(&mut RichText)) {
        fn sections(list: &mut [Section], f: &mut impl FnMut(&mut RichText)) {
            for section in list {
                f(&mut section.content);
                sections(&mut section.children, f);
            }
        }

        f(&mut self.metadata.abstract_text);
        f(&mut self.front_matter);
        sections(&mut self.sections, &mut f);
        for table in &mut self.tables {
            f(&mut table.caption);
        }
        for figure in &mut self.figures {
            f(&mut figure.caption);
        }
    }

    /// Read-only counterpart of [`Document::for_each_text_mut`].
    pub fn for_each_text(&self, mut f: impl FnMut(&RichText)) {
        f(&self.metadata.abstract_text);
        f(&self.front_matter);
        for section in self.all_sections() {
            f(&section.content);
        }
        for table in &self.tables {
            f(&table.caption);
        }
        for figure in &self.figures {
            f(&figure.caption);
        }
    }

    /// Report ids that occur more than once across sections and blocks.
    pub fn check_unique_ids(&self) -> Vec<Issue> {
        let mut seen = HashSet::new();
        let mut issues = Vec::new();
        let ids = self
            .all_sections()
            .into_iter()
            .map(|s| s.id.as_str())
            .chain(self.equations.iter().map(|e| e.id.as_str()))
            .chain(self.tables.iter().map(|t| t.id.as_str()))
            .chain(self.figures.iter().map(|f| f.id.as_str()))
            .chain(self.bibliography.iter().map(|b| b.id.as_str()));
        for id in ids {
            if !seen.insert(id) {
                issues.push(Issue::new(
                    Severity::Major,
                    IssueKind::DuplicateId,
                    format!("duplicate id: {id}"),
                ));
            }
        }
        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Document {
        let mut doc = Document::new();
        doc.sections.push(
            Section::new("intro", 1, "Introduction")
                .with_content("Opening.")
                .child(Section::new("background", 2, "Background").with_content("Prior work.")),
        );
        doc.sections
            .push(Section::new("method", 1, "Method").with_content("Details."));
        doc
    }

    #[test]
    fn test_all_sections_depth_first() {
        let doc = sample();
        let ids: Vec<_> = doc.all_sections().iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, ["intro", "background", "method"]);
        assert_eq!(doc.section_count(), 3);
    }

    #[test]
    fn test_full_text_includes_children() {
        let doc = sample();
        let text = doc.sections[0].full_text();
        assert!(text.contains("Opening."));
        assert!(text.contains("Background"));
        assert!(text.contains("Prior work."));
    }

    #[test]
    fn test_duplicate_ids_reported() {
        let mut doc = sample();
        doc.tables.push(Table::new("method"));
        let issues = doc.check_unique_ids();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].kind, IssueKind::DuplicateId);
    }

    #[test]
    fn test_for_each_text_mut_visits_captions() {
        let mut doc = sample();
        doc.figures.push(Figure::new("figure_1").with_caption("A plot"));
        let mut count = 0;
        doc.for_each_text_mut(|_| count += 1);
        // abstract, front matter, three sections, one caption
        assert_eq!(count, 6);
    }
}

//! Id and label lookup over a document.

use crate::{BibliographyEntry, Document, Equation, Figure, Section, Table};
use std::collections::HashMap;

/// Something an id or label can point at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Target<'a> {
    Section(&'a Section),
    Equation(&'a Equation),
    Table(&'a Table),
    Figure(&'a Figure),
    Entry(&'a BibliographyEntry),
}

impl<'a> Target<'a> {
    pub fn id(&self) -> &'a str {
        match self {
            Target::Section(s) => &s.id,
            Target::Equation(e) => &e.id,
            Target::Table(t) => &t.id,
            Target::Figure(f) => &f.id,
            Target::Entry(b) => &b.id,
        }
    }

    /// Label or key this target is referred to by in the source.
    pub fn label(&self) -> Option<&'a str> {
        match self {
            Target::Section(s) => s.label.as_deref(),
            Target::Equation(e) => e.label.as_deref(),
            Target::Table(t) => t.label.as_deref(),
            Target::Figure(f) => f.label.as_deref(),
            Target::Entry(b) => Some(&b.key),
        }
    }
}

/// Read-only lookup table from ids to document parts.
///
/// Built on demand; lookups of unknown ids return `None`.
#[derive(Debug, Default)]
pub struct DocumentIndex<'a> {
    by_id: HashMap<&'a str, Target<'a>>,
    by_key: HashMap<&'a str, &'a BibliographyEntry>,
}

impl<'a> DocumentIndex<'a> {
    pub fn get(&self, id: &str) -> Option<Target<'a>> {
        self.by_id.get(id).copied()
    }

    /// Bibliography entry by citation key (`\bibitem{key}`).
    pub fn entry(&self, key: &str) -> Option<&'a BibliographyEntry> {
        self.by_key.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

impl Document {
    /// Build an id lookup table. When ids collide the first part wins.
    pub fn index(&self) -> DocumentIndex<'_> {
        let mut index = DocumentIndex::default();
        for target in self.targets() {
            index.by_id.entry(target.id()).or_insert(target);
        }
        for entry in &self.bibliography {
            index.by_key.entry(entry.key.as_str()).or_insert(entry);
        }
        index
    }

    /// Every labeled section and block, in document order per kind.
    pub fn labels(&self) -> Vec<(&str, Target<'_>)> {
        self.targets()
            .filter(|t| !matches!(t, Target::Entry(_)))
            .filter_map(|t| t.label().map(|label| (label, t)))
            .collect()
    }

    fn targets(&self) -> impl Iterator<Item = Target<'_>> {
        self.all_sections()
            .into_iter()
            .map(Target::Section)
            .chain(self.equations.iter().map(Target::Equation))
            .chain(self.tables.iter().map(Target::Table))
            .chain(self.figures.iter().map(Target::Figure))
            .chain(self.bibliography.iter().map(Target::Entry))
    }
}

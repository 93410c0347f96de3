//! Citation markers and bibliography entries.

use crate::Span;

/// One citation command, possibly citing several entries at once.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Citation {
    pub id: String,
    /// Bibliography keys in source order. Duplicates are kept unless the
    /// parser was told to collapse them.
    pub keys: Vec<String>,
    /// Command that produced the marker (`cite`, `citep`, ...).
    pub command: String,
    /// Author-year key for each entry of `keys`, in the same order, filled in
    /// by citation resolution. Unresolvable keys stay as written.
    #[cfg_attr(feature = "serde", serde(default))]
    pub resolved_keys: Vec<String>,
    /// Display form filled in by citation resolution, e.g. `[Smith2020, Doe2019]`.
    pub resolved_text: Option<String>,
    pub span: Option<Span>,
}

impl Citation {
    pub fn new(id: impl Into<String>, keys: Vec<String>) -> Self {
        Self {
            id: id.into(),
            keys,
            command: "cite".to_string(),
            resolved_keys: Vec::new(),
            resolved_text: None,
            span: None,
        }
    }

    /// The bracketed raw keys, used until the citation is resolved.
    pub fn raw_text(&self) -> String {
        format!("[{}]", self.keys.join(", "))
    }

    /// Resolved display text, falling back to the raw keys.
    pub fn display_text(&self) -> String {
        self.resolved_text.clone().unwrap_or_else(|| self.raw_text())
    }
}

/// One bibliography entry.
///
/// Readers of free-text bibliographies only fill `key`, `text` and `raw`;
/// the structured fields are left for an enrichment step.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BibliographyEntry {
    pub id: String,
    /// Key citations refer to (`\bibitem{key}`).
    pub key: String,
    /// Cleaned free-text body.
    pub text: String,
    /// Body exactly as it appeared in the source.
    pub raw: String,
    pub authors: Vec<String>,
    pub title: String,
    pub venue: Option<String>,
    pub year: Option<String>,
    /// Externally visible author-year key (`Smith2020a`), set by resolution.
    pub citation_key: Option<String>,
    pub span: Option<Span>,
}

impl BibliographyEntry {
    pub fn new(id: impl Into<String>, key: impl Into<String>, text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            id: id.into(),
            key: key.into(),
            raw: text.clone(),
            text,
            ..Default::default()
        }
    }
}

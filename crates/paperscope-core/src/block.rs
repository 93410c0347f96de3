//! Equation, table and figure blocks.

use crate::{RichText, Span};

/// The kind of a labeled block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum BlockKind {
    Equation,
    Table,
    Figure,
}

impl BlockKind {
    /// Prefix used for block ids (`eq_1`, `table_2`, `figure_3`).
    pub fn id_prefix(&self) -> &'static str {
        match self {
            BlockKind::Equation => "eq",
            BlockKind::Table => "table",
            BlockKind::Figure => "figure",
        }
    }

    /// Human-readable name used in display forms ("Table 2").
    pub fn display_name(&self) -> &'static str {
        match self {
            BlockKind::Equation => "Equation",
            BlockKind::Table => "Table",
            BlockKind::Figure => "Figure",
        }
    }

    /// Build the id of the `n`-th block of this kind (1-based).
    pub fn id(&self, n: usize) -> String {
        format!("{}_{}", self.id_prefix(), n)
    }
}

/// A display or numbered equation.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Equation {
    pub id: String,
    /// Math source between the environment delimiters, labels included.
    pub raw_math: String,
    pub label: Option<String>,
    /// Environment name the equation came from (`equation`, `align*`, `displaymath`).
    pub environment: String,
    /// Starred environments and `\[ \]` do not take part in numbering.
    pub numbered: bool,
    pub span: Option<Span>,
}

impl Equation {
    pub fn new(id: impl Into<String>, raw_math: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            raw_math: raw_math.into(),
            label: None,
            environment: "equation".to_string(),
            numbered: true,
            span: None,
        }
    }
}

/// Where a table's header rows came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum HeaderSource {
    /// No header rows.
    #[default]
    None,
    /// Rows above an explicit marker such as `\midrule` or `\endhead`.
    Explicit,
    /// First row chosen because most of its cells are non-numeric text.
    Heuristic,
}

/// A table row as plain-text cells.
pub type Row = Vec<String>;

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Table {
    pub id: String,
    pub caption: RichText,
    pub label: Option<String>,
    pub header_rows: Vec<Row>,
    pub rows: Vec<Row>,
    pub header_source: HeaderSource,
    /// Source between the environment delimiters, for pass-through.
    pub raw: String,
    pub span: Option<Span>,
}

impl Table {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            caption: RichText::new(),
            label: None,
            header_rows: Vec::new(),
            rows: Vec::new(),
            header_source: HeaderSource::None,
            raw: String::new(),
            span: None,
        }
    }

    pub fn with_caption(mut self, caption: impl Into<RichText>) -> Self {
        self.caption = caption.into();
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Figure {
    pub id: String,
    pub caption: RichText,
    pub label: Option<String>,
    /// Graphic the figure points at (`\includegraphics` path), unresolved.
    pub source_reference: Option<String>,
    /// Plain-text description. Derived from the caption unless the reader
    /// found a separate one; resolution keeps a derived one in step.
    pub description: String,
    pub raw: String,
    pub span: Option<Span>,
}

impl Figure {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            caption: RichText::new(),
            label: None,
            source_reference: None,
            description: String::new(),
            raw: String::new(),
            span: None,
        }
    }

    pub fn with_caption(mut self, caption: impl Into<RichText>) -> Self {
        let caption = caption.into();
        self.description = caption.plain_text().trim().to_string();
        self.caption = caption;
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_ids() {
        assert_eq!(BlockKind::Equation.id(1), "eq_1");
        assert_eq!(BlockKind::Table.id(2), "table_2");
        assert_eq!(BlockKind::Figure.id(3), "figure_3");
    }

    #[test]
    fn test_figure_description_follows_caption() {
        let fig = Figure::new("figure_1").with_caption("  Model architecture ");
        assert_eq!(fig.description, "Model architecture");
    }
}

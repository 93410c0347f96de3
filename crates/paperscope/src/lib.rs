//! Paperscope - structural extraction and fidelity scoring for academic papers
//!
//! Paperscope reads a LaTeX paper into a typed [`Document`] (metadata,
//! nested sections, equations, tables, figures, citations, bibliography),
//! resolves its citations and cross-references, and scores how faithfully a
//! converted version of the paper preserves that structure.
//!
//! # Quick Start
//!
//! ```rust
//! use paperscope::prelude::*;
//!
//! let source = paperscope::extract(
//!     r"\title{On Things}\section{Intro} We cite~\cite{a}.",
//!     &ParseOptions::default(),
//! )
//! .unwrap();
//! let target = paperscope::xml::parse(
//!     "<paper><metadata><title>On Things</title></metadata></paper>",
//! )
//! .unwrap();
//!
//! let report = FidelityScorer::new().score(&source.value, &target.value);
//! assert!(report.overall_score < 100.0);
//! ```
//!
//! # Features
//!
//! - `latex` - LaTeX reader, the source side (default)
//! - `xml` - academic-paper XML reader (default)
//! - `json` - JSON document reader (default)
//! - `serde` - serde support for the document model

pub use paperscope_core::*;

pub use paperscope_resolve::{BibliographyEnricher, Resolver};
pub use paperscope_score::{
    Component, Facet, FacetScore, FidelityScorer, Finding, PolicyError, QualityReport,
    QualityTier, ScoringPolicy,
};

/// Citation and cross-reference resolution.
pub mod resolve {
    pub use paperscope_resolve::*;
}

/// Fidelity scoring.
pub mod score {
    pub use paperscope_score::*;
}

/// LaTeX format support.
#[cfg(feature = "latex")]
pub mod latex {
    pub use paperscope_read_latex::LatexParser;
    pub use paperscope_read_latex::SourceLoader;
    pub use paperscope_read_latex::expand;
    pub use paperscope_read_latex::parse;
    pub use paperscope_read_latex::parse_with_includes;
    pub use paperscope_read_latex::parse_with_options;
}

/// Academic-paper XML support.
#[cfg(feature = "xml")]
pub mod xml {
    pub use paperscope_read_xml::XmlParser;
    pub use paperscope_read_xml::parse;
    pub use paperscope_read_xml::parse_with_options;
}

/// JSON document support.
#[cfg(feature = "json")]
pub mod json {
    pub use paperscope_read_json::JsonParser;
    pub use paperscope_read_json::parse;
    pub use paperscope_read_json::parse_with_options;
}

/// Names of every enabled input format.
pub fn formats() -> Vec<&'static str> {
    #[allow(unused_mut)]
    let mut formats = Vec::new();
    #[cfg(feature = "latex")]
    formats.push("latex");
    #[cfg(feature = "xml")]
    formats.push("xml");
    #[cfg(feature = "json")]
    formats.push("json");
    formats
}

/// Parser for a format name or file extension, if that format is enabled.
pub fn parser_for(format: &str) -> Option<Box<dyn Parser>> {
    match format.to_ascii_lowercase().as_str() {
        #[cfg(feature = "latex")]
        "latex" | "tex" => Some(Box::new(latex::LatexParser)),
        #[cfg(feature = "xml")]
        "xml" => Some(Box::new(xml::XmlParser)),
        #[cfg(feature = "json")]
        "json" => Some(Box::new(json::JsonParser)),
        _ => None,
    }
}

/// Parse a LaTeX paper and resolve its citations and cross-references.
///
/// Parse issues come first, then resolution issues.
#[cfg(feature = "latex")]
pub fn extract(input: &str, options: &ParseOptions) -> Result<ConversionResult<Document>, ParseError> {
    let parsed = latex::parse_with_options(input, options)?;
    Ok(resolved(parsed))
}

/// [`extract`], expanding `\input`/`\include` through `loader` first.
#[cfg(feature = "latex")]
pub fn extract_with_includes(
    input: &str,
    loader: &dyn latex::SourceLoader,
    options: &ParseOptions,
) -> Result<ConversionResult<Document>, ParseError> {
    let parsed = latex::parse_with_includes(input, loader, options)?;
    Ok(resolved(parsed))
}

#[cfg(feature = "latex")]
fn resolved(parsed: ConversionResult<Document>) -> ConversionResult<Document> {
    let mut issues = parsed.issues;
    let resolved = Resolver::new().resolve(parsed.value);
    issues.extend(resolved.issues);
    ConversionResult::with_issues(resolved.value, issues)
}

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{
        ConversionResult, Document, FidelityScorer, ParseOptions, QualityReport, QualityTier,
        Resolver, Scorer, ScoringPolicy, Severity,
    };
}

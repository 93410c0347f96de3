//! Quality report types.

use paperscope_core::Severity;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A weighted group of facets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Component {
    Metadata,
    Structure,
    Mathematics,
    References,
    TablesFigures,
}

impl Component {
    pub const ALL: [Component; 5] = [
        Component::Metadata,
        Component::Structure,
        Component::Mathematics,
        Component::References,
        Component::TablesFigures,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Component::Metadata => "metadata",
            Component::Structure => "structure",
            Component::Mathematics => "mathematics",
            Component::References => "references",
            Component::TablesFigures => "tables_figures",
        }
    }

    /// Facets making up this component with their weight inside it.
    pub fn facets(&self) -> &'static [(Facet, f64)] {
        match self {
            Component::Metadata => &[
                (Facet::Title, 0.3),
                (Facet::Authors, 0.4),
                (Facet::Abstract, 0.3),
            ],
            Component::Structure => &[(Facet::Sections, 0.5), (Facet::SectionTitles, 0.5)],
            Component::Mathematics => &[(Facet::Equations, 1.0)],
            Component::References => &[(Facet::Citations, 0.5), (Facet::Bibliography, 0.5)],
            Component::TablesFigures => &[(Facet::Tables, 0.5), (Facet::Figures, 0.5)],
        }
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One measured structural property, in reporting order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Facet {
    Title,
    Authors,
    Abstract,
    Sections,
    SectionTitles,
    Equations,
    Citations,
    Bibliography,
    Tables,
    Figures,
}

impl Facet {
    pub const ALL: [Facet; 10] = [
        Facet::Title,
        Facet::Authors,
        Facet::Abstract,
        Facet::Sections,
        Facet::SectionTitles,
        Facet::Equations,
        Facet::Citations,
        Facet::Bibliography,
        Facet::Tables,
        Facet::Figures,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Facet::Title => "title",
            Facet::Authors => "authors",
            Facet::Abstract => "abstract",
            Facet::Sections => "sections",
            Facet::SectionTitles => "section titles",
            Facet::Equations => "equations",
            Facet::Citations => "citations",
            Facet::Bibliography => "bibliography entries",
            Facet::Tables => "tables",
            Facet::Figures => "figures",
        }
    }
}

impl fmt::Display for Facet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Measurement of one facet.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FacetScore {
    pub facet: Facet,
    /// Count (or length, or 0/1 for exact matches) in the source.
    pub source: usize,
    pub target: usize,
    /// Match ratio in `[0, 1]`.
    pub ratio: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QualityTier {
    Poor,
    Moderate,
    Good,
    Excellent,
}

impl QualityTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            QualityTier::Poor => "POOR",
            QualityTier::Moderate => "MODERATE",
            QualityTier::Good => "GOOD",
            QualityTier::Excellent => "EXCELLENT",
        }
    }
}

impl fmt::Display for QualityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fidelity problem found while comparing documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub severity: Severity,
    pub facet: Facet,
    pub message: String,
}

impl Finding {
    pub fn new(severity: Severity, facet: Facet, message: impl Into<String>) -> Self {
        Self {
            severity,
            facet,
            message: message.into(),
        }
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.severity, self.message)
    }
}

/// Result of scoring a target document against its source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    /// Ratio in `[0, 1]` per component.
    pub component_scores: BTreeMap<Component, f64>,
    pub facet_scores: Vec<FacetScore>,
    /// Weighted score in `[0, 100]`, rounded to two decimals.
    pub overall_score: f64,
    pub quality_tier: QualityTier,
    /// Most severe first, then in facet order.
    pub issues: Vec<Finding>,
}

impl QualityReport {
    pub fn component(&self, component: Component) -> f64 {
        self.component_scores.get(&component).copied().unwrap_or(0.0)
    }

    pub fn facet(&self, facet: Facet) -> Option<&FacetScore> {
        self.facet_scores.iter().find(|s| s.facet == facet)
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.issues.iter().filter(|i| i.severity == severity).count()
    }
}

impl fmt::Display for QualityReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Overall: {:.1}/100 ({})", self.overall_score, self.quality_tier)?;
        for (component, score) in &self.component_scores {
            writeln!(f, "  {:<16} {:>5.1}%", component.as_str(), score * 100.0)?;
        }
        if self.issues.is_empty() {
            writeln!(f, "No issues.")?;
        } else {
            writeln!(f, "Issues:")?;
            for issue in &self.issues {
                writeln!(f, "  {issue}")?;
            }
        }
        Ok(())
    }
}

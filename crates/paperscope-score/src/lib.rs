//! Structural fidelity scoring for paperscope documents.
//!
//! A [`FidelityScorer`] compares a target document (the output of some
//! conversion) against the source document it came from. Each [`Facet`] is a
//! count or an exact match turned into a ratio in `[0, 1]`; facets combine
//! into weighted [`Component`] scores, and components into an overall score
//! out of 100 with a [`QualityTier`].
//!
//! ```
//! use paperscope_core::Document;
//! use paperscope_score::{FidelityScorer, QualityTier};
//!
//! let doc = Document::new();
//! let report = FidelityScorer::new().score(&doc, &doc);
//! assert_eq!(report.overall_score, 100.0);
//! assert_eq!(report.quality_tier, QualityTier::Excellent);
//! ```

pub mod policy;
pub mod report;

pub use policy::{
    DEFAULT_MAJOR_THRESHOLD, EXCELLENT_THRESHOLD, GOOD_THRESHOLD, MODERATE_THRESHOLD,
    PolicyError, ScoringPolicy, TierThresholds, Weights, tier_for,
};
pub use report::{Component, Facet, FacetScore, Finding, QualityReport, QualityTier};

use paperscope_core::{Document, Scorer, Severity};
use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Scores a target document against its source under a [`ScoringPolicy`].
#[derive(Debug, Clone, Default)]
pub struct FidelityScorer {
    policy: ScoringPolicy,
}

impl FidelityScorer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: ScoringPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &ScoringPolicy {
        &self.policy
    }

    pub fn score(&self, source: &Document, target: &Document) -> QualityReport {
        let facet_scores: Vec<FacetScore> = Facet::ALL
            .iter()
            .map(|&facet| measure(facet, source, target))
            .collect();
        let ratio = |facet: Facet| {
            facet_scores
                .iter()
                .find(|s| s.facet == facet)
                .map_or(0.0, |s| s.ratio)
        };

        let component_scores: BTreeMap<Component, f64> = Component::ALL
            .iter()
            .map(|&component| {
                let parts = component.facets();
                (component, weighted(parts.iter().map(|&(f, w)| (ratio(f), w))))
            })
            .collect();

        let weights = &self.policy.weights;
        let overall = weighted(
            Component::ALL
                .iter()
                .map(|c| (component_scores.get(c).copied().unwrap_or(0.0), weights.get(*c))),
        );
        let overall_score = round2((overall * 100.0).clamp(0.0, 100.0));
        let quality_tier = self.policy.tiers.tier(overall_score);

        let mut issues: Vec<Finding> = facet_scores
            .iter()
            .filter_map(|s| self.finding(s, source, target))
            .collect();
        issues.sort_by_key(|f| (Reverse(f.severity), f.facet));

        debug!(
            overall = overall_score,
            tier = %quality_tier,
            issues = issues.len(),
            "scored target against source"
        );
        QualityReport {
            component_scores,
            facet_scores,
            overall_score,
            quality_tier,
            issues,
        }
    }

    fn finding(&self, score: &FacetScore, source: &Document, target: &Document) -> Option<Finding> {
        let FacetScore {
            facet,
            source: s,
            target: t,
            ratio,
        } = *score;

        if facet == Facet::Title {
            let expected = source.metadata.title.as_str();
            let actual = target.metadata.title.as_str();
            return if expected.trim().is_empty() || ratio >= 1.0 {
                None
            } else if actual.trim().is_empty() {
                Some(Finding::new(Severity::Critical, facet, "title missing from target"))
            } else {
                Some(Finding::new(
                    Severity::Minor,
                    facet,
                    format!("title differs: expected {expected:?}, found {actual:?}"),
                ))
            };
        }

        let (severity, message) = if s > 0 && t == 0 {
            (Severity::Critical, format!("no {facet} in target ({s} in source)"))
        } else if ratio < self.policy.major_threshold {
            (Severity::Major, shortfall(facet, s, t))
        } else if ratio < 1.0 {
            (Severity::Minor, shortfall(facet, s, t))
        } else if t > s && is_count(facet) {
            (
                Severity::Minor,
                format!("target has {t} {facet}, source has {s}"),
            )
        } else {
            return None;
        };
        Some(Finding::new(severity, facet, message))
    }
}

impl Scorer for FidelityScorer {
    type Report = QualityReport;

    fn score(&self, source: &Document, target: &Document) -> QualityReport {
        FidelityScorer::score(self, source, target)
    }
}

/// Score `target` against `source` with the default policy.
pub fn score(source: &Document, target: &Document) -> QualityReport {
    FidelityScorer::new().score(source, target)
}

fn shortfall(facet: Facet, source: usize, target: usize) -> String {
    match facet {
        Facet::Abstract => format!("abstract shortened to {target} of {source} characters"),
        Facet::SectionTitles => {
            format!("only {target} of {source} section titles found in target")
        }
        _ => format!("only {target} of {source} {facet} in target"),
    }
}

/// Facets where a surplus in the target is worth reporting.
fn is_count(facet: Facet) -> bool {
    !matches!(facet, Facet::Title | Facet::Abstract | Facet::SectionTitles)
}

fn measure(facet: Facet, source: &Document, target: &Document) -> FacetScore {
    let (s, t) = match facet {
        Facet::Title => {
            let expected = &source.metadata.title;
            let s = usize::from(!expected.trim().is_empty());
            (s, usize::from(s > 0 && *expected == target.metadata.title))
        }
        Facet::Authors => (source.metadata.authors.len(), target.metadata.authors.len()),
        Facet::Abstract => (
            source.metadata.abstract_text.char_len(),
            target.metadata.abstract_text.char_len(),
        ),
        Facet::Sections => (source.section_count(), target.section_count()),
        Facet::SectionTitles => matched_titles(source, target),
        Facet::Equations => (source.equations.len(), target.equations.len()),
        Facet::Citations => (source.citations.len(), target.citations.len()),
        Facet::Bibliography => (source.bibliography.len(), target.bibliography.len()),
        Facet::Tables => (source.tables.len(), target.tables.len()),
        Facet::Figures => (source.figures.len(), target.figures.len()),
    };
    FacetScore {
        facet,
        source: s,
        target: t,
        ratio: ratio(s, t),
    }
}

/// `min(target, source) / max(source, 1)`; a facet absent from the source
/// cannot be missed, so it scores 1.
pub fn ratio(source: usize, target: usize) -> f64 {
    if source == 0 {
        return 1.0;
    }
    (target.min(source) as f64 / source as f64).clamp(0.0, 1.0)
}

/// Source section titles and how many of them the target reproduces.
fn matched_titles(source: &Document, target: &Document) -> (usize, usize) {
    let mut available: HashMap<String, usize> = HashMap::new();
    for section in target.all_sections() {
        let title = normalize_title(&section.title);
        if !title.is_empty() {
            *available.entry(title).or_default() += 1;
        }
    }
    let mut expected = 0;
    let mut matched = 0;
    for section in source.all_sections() {
        let title = normalize_title(&section.title);
        if title.is_empty() {
            continue;
        }
        expected += 1;
        if let Some(n) = available.get_mut(&title)
            && *n > 0
        {
            *n -= 1;
            matched += 1;
        }
    }
    (expected, matched)
}

/// Lowercase words of a section title without any leading "2.1" numbering.
pub fn normalize_title(title: &str) -> String {
    let cleaned: String = title
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '.' { c } else { ' ' })
        .collect();
    cleaned
        .split_whitespace()
        .skip_while(|w| w.chars().all(|c| c.is_ascii_digit() || c == '.'))
        .map(|w| w.trim_matches('.').to_lowercase())
        .filter(|w| !w.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Weighted mean of `(value, weight)` pairs; zero when all weights are.
fn weighted(parts: impl Iterator<Item = (f64, f64)>) -> f64 {
    let (sum, total) = parts.fold((0.0, 0.0), |(sum, total), (value, weight)| {
        (sum + value * weight, total + weight)
    });
    if total > 0.0 { sum / total } else { 0.0 }
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use paperscope_core::{Author, BibliographyEntry, Citation, Equation, Metadata, Section};
    use pretty_assertions::assert_eq;

    fn paper() -> Document {
        let mut doc = Document::new().with_metadata(Metadata {
            title: "Sparse Methods".into(),
            authors: vec![Author::new("Ada"), Author::new("Grace")],
            abstract_text: "We study sparse methods.".into(),
        });
        doc.sections = vec![
            Section::new("intro", 1, "Introduction"),
            Section::new("method", 1, "Method").child(Section::new("setup", 2, "Setup")),
        ];
        doc.equations.push(Equation::new("eq_1", "E = mc^2"));
        doc.citations
            .push(Citation::new("cite_1", vec!["smith".into()]));
        doc.bibliography
            .push(BibliographyEntry::new("ref_1", "smith", "J. Smith, 2020."));
        doc
    }

    #[test]
    fn test_identical_documents_score_full() {
        let doc = paper();
        let report = FidelityScorer::new().score(&doc, &doc);
        assert_eq!(report.overall_score, 100.0);
        assert_eq!(report.quality_tier, QualityTier::Excellent);
        assert!(report.issues.is_empty());
        assert!(report.component_scores.values().all(|s| *s == 1.0));
    }

    #[test]
    fn test_ratio_bounds() {
        assert_eq!(ratio(0, 0), 1.0);
        assert_eq!(ratio(0, 5), 1.0);
        assert_eq!(ratio(4, 2), 0.5);
        assert_eq!(ratio(2, 9), 1.0);
        assert_eq!(ratio(3, 0), 0.0);
    }

    #[test]
    fn test_missing_collection_is_critical() {
        let source = paper();
        let mut target = paper();
        target.equations.clear();
        let report = score(&source, &target);
        assert_eq!(report.component(Component::Mathematics), 0.0);
        assert_eq!(report.issues.len(), 1);
        assert_eq!(report.issues[0].severity, Severity::Critical);
        assert_eq!(report.issues[0].facet, Facet::Equations);
        assert_eq!(report.overall_score, 80.0);
        assert_eq!(report.quality_tier, QualityTier::Good);
    }

    #[test]
    fn test_partial_shortfall_severity() {
        let mut source = paper();
        source.bibliography = (1..=10)
            .map(|n| BibliographyEntry::new(format!("ref_{n}"), format!("k{n}"), "x"))
            .collect();
        let mut target = source.clone();

        target.bibliography.truncate(5);
        let report = score(&source, &target);
        assert_eq!(report.issues[0].severity, Severity::Major);
        assert_eq!(report.issues[0].message, "only 5 of 10 bibliography entries in target");

        target = source.clone();
        target.bibliography.truncate(9);
        let report = score(&source, &target);
        assert_eq!(report.issues[0].severity, Severity::Minor);
    }

    #[test]
    fn test_title_mismatch_is_minor() {
        let source = paper();
        let mut target = paper();
        target.metadata.title = "Sparse  methods".into();
        let report = score(&source, &target);
        assert_eq!(report.facet(Facet::Title).map(|s| s.ratio), Some(0.0));
        assert_eq!(report.issues.len(), 1);
        assert_eq!(report.issues[0].severity, Severity::Minor);

        target.metadata.title = " Sparse  Methods ".into();
        let report = score(&source, &target);
        assert_eq!(report.facet(Facet::Title).map(|s| s.ratio), Some(0.0));
        assert_eq!(report.issues.len(), 1);
        assert_eq!(report.issues[0].severity, Severity::Minor);
        assert_eq!(
            report.issues[0].message,
            r#"title differs: expected "Sparse Methods", found " Sparse  Methods ""#
        );

        target.metadata.title.clear();
        assert_eq!(score(&source, &target).issues[0].severity, Severity::Critical);
    }

    #[test]
    fn test_issue_order() {
        let source = paper();
        let mut target = paper();
        target.metadata.title = "Other".into();
        target.metadata.authors.truncate(1);
        target.citations.clear();
        target.figures.push(paperscope_core::Figure::new("figure_1"));
        let report = score(&source, &target);
        let order: Vec<_> = report
            .issues
            .iter()
            .map(|f| (f.severity, f.facet))
            .collect();
        assert_eq!(
            order,
            [
                (Severity::Critical, Facet::Citations),
                (Severity::Major, Facet::Authors),
                (Severity::Minor, Facet::Title),
                (Severity::Minor, Facet::Figures),
            ]
        );
    }

    #[test]
    fn test_section_titles_ignore_numbering_and_case() {
        assert_eq!(normalize_title("2.1  Related   Work"), "related work");
        assert_eq!(normalize_title("Results."), "results");
        assert_eq!(normalize_title("  "), "");

        let source = paper();
        let mut target = paper();
        target.sections[0].title = "1 INTRODUCTION".into();
        target.sections[1].children[0].title = "Experimental setup".into();
        let report = score(&source, &target);
        let titles = report.facet(Facet::SectionTitles).copied();
        assert_eq!(titles.map(|s| (s.source, s.target)), Some((3, 2)));
    }

    #[test]
    fn test_custom_weights() {
        let policy = ScoringPolicy::from_toml_str("[weights]\nmathematics = 0.0").unwrap();
        let source = paper();
        let mut target = paper();
        target.equations.clear();
        let report = FidelityScorer::with_policy(policy).score(&source, &target);
        assert_eq!(report.overall_score, 100.0);
        // Still reported even though it carries no weight.
        assert_eq!(report.count(Severity::Critical), 1);
    }

    #[test]
    fn test_scorer_trait() {
        fn run<S: Scorer>(scorer: &S, doc: &Document) -> S::Report {
            scorer.score(doc, doc)
        }
        let report = run(&FidelityScorer::new(), &Document::new());
        assert_eq!(report.overall_score, 100.0);
    }
}

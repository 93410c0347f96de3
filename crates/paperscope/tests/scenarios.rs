//! End-to-end tests: LaTeX source in, converted target in, report out.

use paperscope::prelude::*;
use paperscope::{Component, DuplicateKeys, Facet, Inline, IssueKind, extract, json, latex, xml};
use pretty_assertions::assert_eq;

const SOURCE: &str = r"\documentclass{article}
\title{Sparse Methods}
\author{Ada Lovelace}
\begin{document}
\maketitle

\section{Introduction}
We revisit sparse methods.

\section{Method}
The objective is
\begin{equation}\label{eq:obj}
  \min_x \|Ax - b\|_2^2 + \lambda \|x\|_1
\end{equation}

\section{Results}
It works.

\begin{thebibliography}{2}
\bibitem{tib96} R. Tibshirani, Regression shrinkage and selection via the lasso, 1996.
\bibitem{don06} D. Donoho, Compressed sensing, 2006.
\end{thebibliography}
\end{document}
";

const TARGET_WITHOUT_MATH: &str = r#"<paper>
  <metadata>
    <title>Sparse Methods</title>
    <authors><author><name>Ada Lovelace</name></author></authors>
  </metadata>
  <content>
    <section><title>Introduction</title><text>We revisit sparse methods.</text></section>
    <section><title>Method</title><text>The objective is</text></section>
    <section><title>Results</title><text>It works.</text></section>
  </content>
  <bibliography>
    <entry key="tib96">R. Tibshirani, Regression shrinkage and selection via the lasso, 1996.</entry>
    <entry key="don06">D. Donoho, Compressed sensing, 2006.</entry>
  </bibliography>
</paper>"#;

const TARGET_JSON: &str = r#"{
  "metadata": {"title": "Sparse Methods", "authors": [{"name": "Ada Lovelace"}]},
  "sections": [
    {"title": "Introduction", "content": "We revisit sparse methods."},
    {"title": "Method", "content": "The objective is"},
    {"title": "Results", "content": "It works."}
  ],
  "equations": [{"id": "eq_1", "content": "\\min_x \\|Ax - b\\|_2^2"}],
  "references": [
    {"key": "tib96", "authors": ["R. Tibshirani"], "year": 1996},
    {"key": "don06", "authors": ["D. Donoho"], "year": 2006}
  ]
}"#;

fn source() -> Document {
    extract(SOURCE, &ParseOptions::default()).unwrap().value
}

#[test]
fn dropped_equation_scores_good_with_one_critical_issue() {
    let source = source();
    assert_eq!(source.sections.len(), 3);
    assert_eq!(source.equations.len(), 1);
    assert!(source.tables.is_empty());
    assert_eq!(source.bibliography.len(), 2);

    let target = xml::parse(TARGET_WITHOUT_MATH).unwrap().value;
    let report = FidelityScorer::new().score(&source, &target);

    assert_eq!(report.component(Component::Mathematics), 0.0);
    for component in [
        Component::Metadata,
        Component::Structure,
        Component::References,
        Component::TablesFigures,
    ] {
        assert_eq!(report.component(component), 1.0, "{component}");
    }
    assert!(report.overall_score > paperscope::score::MODERATE_THRESHOLD);
    assert!(report.overall_score < paperscope::score::EXCELLENT_THRESHOLD);
    assert_eq!(report.issues.len(), 1);
    assert_eq!(report.issues[0].severity, Severity::Critical);
    assert_eq!(report.issues[0].facet, Facet::Equations);
}

#[test]
fn faithful_json_target_scores_full() {
    let target = json::parse(TARGET_JSON).unwrap().value;
    let report = FidelityScorer::new().score(&source(), &target);
    assert_eq!(report.overall_score, 100.0, "{report}");
    assert_eq!(report.quality_tier, QualityTier::Excellent);
    assert!(report.issues.is_empty());
}

#[test]
fn repeated_citation_keys_are_not_deduplicated() {
    let text = r"\section{Intro}
See~\cite{a,b,a}.
\begin{thebibliography}{2}
\bibitem{a} A. Abel, Groups, 1926.
\bibitem{b} B. Boole, Logic, 1954.
\end{thebibliography}";
    let doc = extract(text, &ParseOptions::default()).unwrap().value;
    assert_eq!(doc.citations[0].keys, ["a", "b", "a"]);
    assert_eq!(
        doc.sections[0].content.plain_text().trim(),
        "See [Abel1926, Boole1954, Abel1926]."
    );

    let collapse = ParseOptions {
        duplicate_keys: DuplicateKeys::Collapse,
        ..Default::default()
    };
    let doc = extract(text, &collapse).unwrap().value;
    assert_eq!(doc.citations[0].keys, ["a", "b"]);
}

#[test]
fn same_author_and_year_get_suffixes() {
    let text = r"\section{Related}
First~\cite{s1}, second~\cite{s2}, both~\citep{s2,s1}.
\begin{thebibliography}{3}
\bibitem{s1} J. Smith, One result, 2020.
\bibitem{s2} J. Smith, Another result, 2020.
\bibitem{s3} J. Smith, Third result, 2020.
\end{thebibliography}";
    let result = extract(text, &ParseOptions::default()).unwrap();
    assert!(
        result
            .issues
            .iter()
            .all(|i| i.kind != IssueKind::UnresolvedReference),
        "{:?}",
        result.issues
    );
    let doc = result.value;

    let keys: Vec<_> = doc
        .bibliography
        .iter()
        .filter_map(|e| e.citation_key.as_deref())
        .collect();
    assert_eq!(keys, ["Smith2020", "Smith2020a", "Smith2020b"]);

    let mut cited = Vec::new();
    doc.sections[0].content.visit(&mut |inline| {
        if let Inline::Citation { text, .. } = inline {
            cited.push(text.clone());
        }
    });
    assert_eq!(
        cited,
        ["[Smith2020]", "[Smith2020a]", "[Smith2020a, Smith2020]"]
    );
}

#[test]
fn top_level_sections_follow_source_order() {
    let text = r"\section{One}
alpha beta
\subsection{Two}
gamma delta
\section{Three}
epsilon
\section*{Four}
zeta";
    let doc = latex::parse(text).unwrap().value;
    let titles: Vec<_> = doc.sections.iter().map(|s| s.title.as_str()).collect();
    assert_eq!(titles, ["One", "Three", "Four"]);

    let recovered: String = doc
        .sections
        .iter()
        .map(|s| format!("{}\n{}\n", s.title, s.full_text()))
        .collect();
    for fragment in ["alpha beta", "Two", "gamma delta", "epsilon", "zeta"] {
        assert!(recovered.contains(fragment), "{fragment} missing from {recovered:?}");
    }
}

#[test]
fn extraction_is_deterministic() {
    assert_eq!(source(), source());
}

#[test]
fn every_reader_implements_parser() {
    let options = ParseOptions::default();
    for (format, input) in [
        ("latex", SOURCE),
        ("xml", TARGET_WITHOUT_MATH),
        ("json", TARGET_JSON),
    ] {
        let parser = paperscope::parser_for(format).unwrap();
        let doc = parser.parse(input.as_bytes(), &options).unwrap().value;
        assert_eq!(doc.sections.len(), 3, "{format}");
        assert_eq!(doc.metadata.title, "Sparse Methods", "{format}");
    }
}

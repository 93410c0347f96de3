//! Tabular body parsing.

use crate::render::Renderer;
use crate::scanner::{Separator, TokenKind, split_top_level, strip_comments, tokenize};
use paperscope_core::{HeaderSource, ParseError, RichText, Row};

/// Rule commands dropped from rows.
const RULES: &[&str] = &[
    "hline", "toprule", "midrule", "bottomrule", "cline", "cmidrule", "hhline", "specialrule",
    "addlinespace", "endhead", "endfirsthead", "endfoot", "endlastfoot",
];

/// Rules that close an explicit header block.
const HEADER_MARKERS: &[&str] = &["midrule", "endhead", "endfirsthead"];

#[derive(Debug, Default)]
pub(crate) struct ParsedRows {
    pub header_rows: Vec<Row>,
    pub rows: Vec<Row>,
    pub header_source: HeaderSource,
    /// `\caption` written as a row, as longtable does.
    pub caption: Option<RichText>,
    pub label: Option<String>,
}

/// Split a tabular body into rows of plain-text cells.
pub(crate) fn parse_rows(renderer: &mut Renderer<'_>, body: &str) -> Result<ParsedRows, ParseError> {
    let body = strip_comments(body);
    let mut parsed = ParsedRows::default();
    let mut header_end = None;

    for chunk in split_top_level(&body, Separator::RowBreak) {
        let tokens = tokenize(chunk, renderer.max_depth())?;
        let mut cleaned = String::with_capacity(chunk.len());
        let mut last = 0;

        for token in &tokens {
            let TokenKind::Command { name, .. } = &token.kind else {
                continue;
            };
            let base = name.trim_end_matches('*');
            if RULES.contains(&base) {
                if HEADER_MARKERS.contains(&base) && header_end.is_none() && !parsed.rows.is_empty() {
                    header_end = Some(parsed.rows.len());
                }
            } else if base == "caption" {
                parsed.caption = Some(renderer.render_trimmed(token.last_arg().unwrap_or(""))?);
            } else if base == "label" {
                parsed.label = token.arg(0).map(|l| l.trim().to_string());
            } else {
                continue;
            }
            cleaned.push_str(&chunk[last..token.span.start]);
            last = token.span.end;
        }
        cleaned.push_str(&chunk[last..]);

        let mut row = Vec::new();
        for cell in split_top_level(&cleaned, Separator::Char('&')) {
            let rich = renderer.render_trimmed(cell)?;
            row.push(rich.plain_text());
        }
        if row.iter().all(|cell| cell.is_empty()) {
            continue;
        }
        parsed.rows.push(row);
    }

    match header_end {
        Some(end) => {
            parsed.header_rows = parsed.rows.drain(..end).collect();
            parsed.header_source = HeaderSource::Explicit;
        }
        None if parsed.rows.len() > 1 && looks_like_header(&parsed.rows[0]) => {
            parsed.header_rows = vec![parsed.rows.remove(0)];
            parsed.header_source = HeaderSource::Heuristic;
        }
        None => {}
    }
    Ok(parsed)
}

/// A row reads as a header when most of its filled cells are text rather
/// than numbers.
pub(crate) fn looks_like_header(row: &[String]) -> bool {
    let filled: Vec<&String> = row.iter().filter(|c| !c.trim().is_empty()).collect();
    if filled.is_empty() {
        return false;
    }
    let text_cells = filled
        .iter()
        .filter(|c| c.chars().any(char::is_alphabetic) && !is_numeric(c))
        .count();
    text_cells * 2 > filled.len()
}

/// Decorations that may surround or separate the numbers of a data cell.
const NUMBER_DECORATIONS: &[&str] = &["\\pm", "\\%", "\\,", "±", "%", "$", "{", "}", "~"];

/// Whether a cell holds only numbers: `1e-5`, `2E+3`, `1,024`, `95%` or
/// `0.91 ± 0.02`.
pub(crate) fn is_numeric(cell: &str) -> bool {
    let mut bare = cell.replace('\u{2212}', "-");
    for decoration in NUMBER_DECORATIONS {
        bare = bare.replace(decoration, " ");
    }
    let mut parts = bare.split_whitespace().peekable();
    parts.peek().is_some()
        && parts.all(|part| {
            let part = part.replace(',', "");
            part.chars().any(|c| c.is_ascii_digit()) && part.parse::<f64>().is_ok()
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use paperscope_core::ParseOptions;
    use pretty_assertions::assert_eq;

    fn rows(body: &str) -> ParsedRows {
        let options = ParseOptions::default();
        let mut renderer = Renderer::new(&options);
        parse_rows(&mut renderer, body).unwrap()
    }

    #[test]
    fn test_explicit_header() {
        let parsed = rows(
            r"\toprule 1999 & 2000 \\ \midrule
              3 & 4 \\
              5 & 6 \\ \bottomrule",
        );
        assert_eq!(parsed.header_source, HeaderSource::Explicit);
        assert_eq!(parsed.header_rows, vec![vec!["1999", "2000"]]);
        assert_eq!(parsed.rows.len(), 2);
    }

    #[test]
    fn test_heuristic_header() {
        let parsed = rows(r"\hline Model & Accuracy & F1 \\ \hline Base & 0.91 & 0.88 \\ \hline");
        assert_eq!(parsed.header_source, HeaderSource::Heuristic);
        assert_eq!(parsed.header_rows, vec![vec!["Model", "Accuracy", "F1"]]);
        assert_eq!(parsed.rows, vec![vec!["Base", "0.91", "0.88"]]);
    }

    #[test]
    fn test_numeric_first_row_is_data() {
        let parsed = rows(r"1 & 2.5 & x \\ 3 & 4 & y \\");
        assert_eq!(parsed.header_source, HeaderSource::None);
        assert_eq!(parsed.rows.len(), 2);
    }

    #[test]
    fn test_single_row_table_has_no_header() {
        let parsed = rows(r"Alpha & Beta & Gamma \\");
        assert_eq!(parsed.header_source, HeaderSource::None);
        assert_eq!(parsed.rows, vec![vec!["Alpha", "Beta", "Gamma"]]);
    }

    #[test]
    fn test_escaped_ampersand_and_grouped_cells() {
        let parsed = rows(r"R\&D & \textbf{a & b} \\");
        assert_eq!(parsed.rows, vec![vec!["R&D", "a & b"]]);
    }

    #[test]
    fn test_longtable_caption_row() {
        let parsed = rows(r"\caption{Results}\label{tab:res} \\ Name & Score \\ \endhead A & 1 \\");
        assert_eq!(parsed.caption.map(|c| c.plain_text()), Some("Results".to_string()));
        assert_eq!(parsed.label.as_deref(), Some("tab:res"));
        assert_eq!(parsed.header_source, HeaderSource::Explicit);
        assert_eq!(parsed.header_rows, vec![vec!["Name", "Score"]]);
    }

    #[test]
    fn test_scientific_notation_row_is_data() {
        let parsed = rows(r"1e-5 & 2e-3 & 0.5 \\ 3e-4 & 1e-2 & 0.7 \\");
        assert_eq!(parsed.header_source, HeaderSource::None);
        assert!(parsed.header_rows.is_empty());
        assert_eq!(parsed.rows[0], vec!["1e-5", "2e-3", "0.5"]);
    }

    #[test]
    fn test_is_numeric() {
        for cell in ["1e-5", "2E+3", "-0.5", "1,024", "95%", "0.91 ± 0.02", r"3.1 \pm 0.2", "\u{2212}4"] {
            assert!(is_numeric(cell), "{cell}");
        }
        for cell in ["Model", "e", "inf", "NaN", "12 ms", "-", ""] {
            assert!(!is_numeric(cell), "{cell}");
        }
    }

    #[test]
    fn test_looks_like_header() {
        assert!(looks_like_header(&["Method".into(), "Time".into(), "".into()]));
        assert!(!looks_like_header(&["Run".into(), "12".into(), "13".into()]));
        assert!(!looks_like_header(&["".into()]));
    }
}

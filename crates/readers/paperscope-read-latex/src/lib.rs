//! LaTeX reader for paperscope.
//!
//! Extracts the structure of a LaTeX paper into a paperscope [`Document`]:
//! metadata, the section tree, equations, tables, figures, citations and
//! the `thebibliography` list. The source is tokenized once by a brace- and
//! environment-aware [`scanner`]; nothing here matches across braces with
//! regular expressions.
//!
//! Malformed input never aborts extraction. Unbalanced braces are closed at
//! the end of input; an unterminated environment is closed before the next
//! sectioning command, or at the end of input when none follows. Both are
//! reported as issues on the returned [`ConversionResult`]. Only a nesting
//! depth above [`ParseOptions::max_depth`] is an error.

mod author;
pub mod include;
mod parser;
mod render;
pub mod scanner;
mod table;
mod text;

pub use include::{SourceLoader, expand};
pub use scanner::{Scanner, Token, TokenKind, tokenize};

use paperscope_core::{
    ConversionResult, Document, ParseError, ParseOptions, Parser, input_text,
};

/// Parse LaTeX text into a paperscope Document.
pub fn parse(input: &str) -> Result<ConversionResult<Document>, ParseError> {
    parse_with_options(input, &ParseOptions::default())
}

/// Parse LaTeX with custom options.
pub fn parse_with_options(
    input: &str,
    options: &ParseOptions,
) -> Result<ConversionResult<Document>, ParseError> {
    parser::parse_document(input, options)
}

/// Expand `\input`/`\include` through `loader`, then parse.
///
/// Issues from expansion come first in the result.
pub fn parse_with_includes(
    input: &str,
    loader: &dyn SourceLoader,
    options: &ParseOptions,
) -> Result<ConversionResult<Document>, ParseError> {
    let expanded = expand(input, loader, options.max_depth)?;
    let mut issues = expanded.issues;
    let parsed = parse_with_options(&expanded.value, options)?;
    issues.extend(parsed.issues);
    Ok(ConversionResult::with_issues(parsed.value, issues))
}

/// [`Parser`] implementation for LaTeX sources.
#[derive(Debug, Clone, Copy, Default)]
pub struct LatexParser;

impl Parser for LatexParser {
    fn formats(&self) -> &[&str] {
        &["latex", "tex"]
    }

    fn parse(
        &self,
        input: &[u8],
        options: &ParseOptions,
    ) -> Result<ConversionResult<Document>, ParseError> {
        parse_with_options(input_text(input)?, options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use paperscope_core::{IssueKind, Severity};
    use std::collections::HashMap;

    #[test]
    fn test_parse_section() {
        let doc = parse("\\section{Hello World}").unwrap().value;
        assert_eq!(doc.sections.len(), 1);
        assert_eq!(doc.sections[0].title, "Hello World");
        assert_eq!(doc.sections[0].level, 1);
    }

    #[test]
    fn test_parse_paragraphs() {
        let doc = parse("This is a paragraph.\n\nThis is another.").unwrap().value;
        assert_eq!(
            doc.front_matter.plain_text(),
            "This is a paragraph.\n\nThis is another."
        );
    }

    #[test]
    fn test_parse_empty() {
        let result = parse("").unwrap();
        assert_eq!(result.value.section_count(), 0);
        assert!(!result.has_errors());
    }

    #[test]
    fn test_parser_trait_rejects_binary() {
        let parser = LatexParser;
        assert!(parser.formats().contains(&"latex"));
        let err = parser
            .parse(&[0xff, 0xfe, 0x00], &ParseOptions::default())
            .unwrap_err();
        assert!(matches!(err, ParseError::NotText(_)));
    }

    #[test]
    fn test_unbalanced_brace_reported() {
        let result = parse(r"\section{Broken title").unwrap();
        assert_eq!(result.value.sections[0].title, "Broken title");
        assert!(result.issues.iter().any(|i| {
            i.severity == Severity::Major && i.kind == IssueKind::MalformedInput
        }));
    }

    #[test]
    fn test_excessive_nesting_is_error() {
        let input = format!("{}x{}", "{".repeat(100), "}".repeat(100));
        let err = parse(&input).unwrap_err();
        assert!(matches!(err, ParseError::NestingTooDeep { .. }));
    }

    #[test]
    fn test_parse_with_includes() {
        let files: HashMap<String, String> = [
            ("intro.tex".to_string(), r"\section{Intro} Hi \input{missing}".to_string()),
        ]
        .into_iter()
        .collect();
        let result = parse_with_includes(
            r"\begin{document}\input{intro}\section{End}\end{document}",
            &files,
            &ParseOptions::default(),
        )
        .unwrap();
        let titles: Vec<_> = result.value.sections.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, ["Intro", "End"]);
        assert_eq!(result.issues[0].kind, IssueKind::UnresolvedReference);
    }
}

//! Issue tracking - know what was recovered from while reading a document.

use crate::Span;

/// Result of a reading or transforming step, including recovered issues.
#[derive(Debug)]
pub struct ConversionResult<T> {
    /// The produced value.
    pub value: T,
    /// Problems that were recovered from locally.
    pub issues: Vec<Issue>,
}

impl<T> ConversionResult<T> {
    /// Create a successful result with no issues.
    pub fn ok(value: T) -> Self {
        Self {
            value,
            issues: Vec::new(),
        }
    }

    /// Create a result with issues.
    pub fn with_issues(value: T, issues: Vec<Issue>) -> Self {
        Self { value, issues }
    }

    /// Add an issue.
    pub fn issue(mut self, issue: Issue) -> Self {
        self.issues.push(issue);
        self
    }

    pub fn has_issues(&self) -> bool {
        !self.issues.is_empty()
    }

    /// Check if there are any major or critical issues.
    pub fn has_errors(&self) -> bool {
        self.issues.iter().any(|i| i.severity >= Severity::Major)
    }

    /// Transform the value, keeping the issues.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ConversionResult<U> {
        ConversionResult {
            value: f(self.value),
            issues: self.issues,
        }
    }

    /// Chain another step, accumulating its issues after ours.
    pub fn and_then<U>(self, f: impl FnOnce(T) -> ConversionResult<U>) -> ConversionResult<U> {
        let mut next = f(self.value);
        let mut issues = self.issues;
        issues.append(&mut next.issues);
        ConversionResult {
            value: next.value,
            issues,
        }
    }
}

/// A problem found and recovered from.
#[derive(Debug, Clone, PartialEq)]
pub struct Issue {
    pub severity: Severity,
    pub kind: IssueKind,
    /// Human-readable message.
    pub message: String,
    /// Where in the source this occurred.
    pub span: Option<Span>,
}

impl Issue {
    pub fn new(severity: Severity, kind: IssueKind, message: impl Into<String>) -> Self {
        Self {
            severity,
            kind,
            message: message.into(),
            span: None,
        }
    }

    /// Set the source span.
    pub fn at(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }
}

impl std::fmt::Display for Issue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.span {
            Some(span) => write!(f, "{} (at byte {})", self.message, span.start),
            None => write!(f, "{}", self.message),
        }
    }
}

/// Severity of an issue, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum Severity {
    /// Information only, nothing lost.
    Info,
    /// Cosmetic difference.
    Minor,
    /// Part of the content is missing or wrong.
    Major,
    /// A whole facet of the content is missing.
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "INFO",
            Severity::Minor => "MINOR",
            Severity::Major => "MAJOR",
            Severity::Critical => "CRITICAL",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum IssueKind {
    /// Unterminated environment or unbalanced braces, closed at end of stream.
    MalformedInput,
    /// Absent title, author or abstract; an empty value was used.
    MissingField,
    /// Citation or cross-reference with no matching target.
    UnresolvedReference,
    /// Two parts of the document share an id or key.
    DuplicateId,
    /// Construct that is recognized but not extracted.
    Unsupported,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Critical > Severity::Major);
        assert!(Severity::Major > Severity::Minor);
        assert!(Severity::Minor > Severity::Info);
    }

    #[test]
    fn test_has_errors_only_for_major_and_up() {
        let result = ConversionResult::ok(()).issue(Issue::new(
            Severity::Minor,
            IssueKind::MissingField,
            "no abstract",
        ));
        assert!(result.has_issues());
        assert!(!result.has_errors());

        let result = result.issue(Issue::new(
            Severity::Major,
            IssueKind::MalformedInput,
            "unterminated table",
        ));
        assert!(result.has_errors());
    }

    #[test]
    fn test_and_then_accumulates_issues() {
        let first = ConversionResult::with_issues(
            1,
            vec![Issue::new(Severity::Info, IssueKind::Unsupported, "one")],
        );
        let chained = first.and_then(|n| {
            ConversionResult::with_issues(
                n + 1,
                vec![Issue::new(Severity::Info, IssueKind::Unsupported, "two")],
            )
        });
        assert_eq!(chained.value, 2);
        let messages: Vec<_> = chained.issues.iter().map(|i| i.message.as_str()).collect();
        assert_eq!(messages, ["one", "two"]);
    }
}

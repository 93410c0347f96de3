//! `\input` and `\include` expansion.

use crate::scanner::tokenize;
use paperscope_core::{ConversionResult, Issue, IssueKind, ParseError, Severity};
use std::collections::HashMap;
use tracing::debug;

/// Supplies the text of included files by name.
pub trait SourceLoader {
    /// Text of `name`, already carrying its extension, or `None` when it
    /// cannot be found.
    fn load(&self, name: &str) -> Option<String>;
}

impl SourceLoader for HashMap<String, String> {
    fn load(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

/// Replace every `\input{name}` and `\include{name}` with the loaded text,
/// recursively.
///
/// Includes that cannot be loaded, that would recurse into a file already
/// being expanded, or that nest deeper than `max_depth` are left in place
/// and reported.
pub fn expand(
    text: &str,
    loader: &dyn SourceLoader,
    max_depth: usize,
) -> Result<ConversionResult<String>, ParseError> {
    let mut expander = Expander {
        loader,
        max_depth,
        stack: Vec::new(),
        issues: Vec::new(),
    };
    let out = expander.expand(text)?;
    Ok(ConversionResult::with_issues(out, expander.issues))
}

struct Expander<'l> {
    loader: &'l dyn SourceLoader,
    max_depth: usize,
    /// Files currently being expanded, outermost first.
    stack: Vec<String>,
    issues: Vec<Issue>,
}

impl Expander<'_> {
    fn expand(&mut self, text: &str) -> Result<String, ParseError> {
        let tokens = tokenize(text, self.max_depth)?;
        let mut out = String::with_capacity(text.len());
        let mut last = 0;

        for token in &tokens {
            if !(token.is_command("input") || token.is_command("include")) {
                continue;
            }
            let Some(name) = token.arg(0).map(file_name) else {
                continue;
            };
            let Some(body) = self.resolve(&name)? else {
                continue;
            };
            out.push_str(&text[last..token.span.start]);
            out.push_str(&body);
            last = token.span.end;
        }
        out.push_str(&text[last..]);
        Ok(out)
    }

    /// Expanded text of one include, or `None` when it stays unexpanded.
    fn resolve(&mut self, name: &str) -> Result<Option<String>, ParseError> {
        if self.stack.iter().any(|open| open == name) {
            self.issues.push(Issue::new(
                Severity::Major,
                IssueKind::MalformedInput,
                format!("`{name}` includes itself, left unexpanded"),
            ));
            return Ok(None);
        }
        if self.stack.len() >= self.max_depth {
            self.issues.push(Issue::new(
                Severity::Major,
                IssueKind::MalformedInput,
                format!("includes nested deeper than {}, `{name}` left unexpanded", self.max_depth),
            ));
            return Ok(None);
        }
        let Some(body) = self.loader.load(name) else {
            self.issues.push(Issue::new(
                Severity::Minor,
                IssueKind::UnresolvedReference,
                format!("included file `{name}` not found"),
            ));
            return Ok(None);
        };

        debug!(file = name, depth = self.stack.len() + 1, "expanding include");
        self.stack.push(name.to_string());
        let expanded = self.expand(&body);
        self.stack.pop();
        expanded.map(Some)
    }
}

/// Include argument with `.tex` added when it has no extension.
fn file_name(arg: &str) -> String {
    let name = arg.trim();
    let has_extension = name
        .rsplit('/')
        .next()
        .is_some_and(|base| base.contains('.'));
    if has_extension {
        name.to_string()
    } else {
        format!("{name}.tex")
    }
}

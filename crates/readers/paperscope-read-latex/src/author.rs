//! Author block splitting.

use crate::render::Renderer;
use crate::scanner::{Token, tokenize};
use crate::text::collapse;
use paperscope_core::{Author, Inline, ParseError, RichText};

/// Commands separating authors inside `\author{...}`.
const AUTHOR_SEPARATORS: &[&str] = &["and", "And", "AND"];

/// Split an `\author` argument into authors.
///
/// Only explicit separator commands split authors; without one the whole
/// block is a single author, whatever punctuation it contains. Inside one
/// author the first `\\` line is the name, a line that looks like an address
/// is the email and the remaining lines form the affiliation.
pub(crate) fn parse_authors(renderer: &mut Renderer<'_>, text: &str) -> Result<Vec<Author>, ParseError> {
    let tokens = tokenize(text, renderer.max_depth())?;
    let mut authors = Vec::new();
    for group in tokens.split(|t| t.command_name().is_some_and(|n| AUTHOR_SEPARATORS.contains(&n))) {
        if let Some(author) = parse_author(renderer, group)? {
            authors.push(author);
        }
    }
    Ok(authors)
}

fn parse_author(renderer: &mut Renderer<'_>, tokens: &[Token]) -> Result<Option<Author>, ParseError> {
    let mut name: Option<String> = None;
    let mut email: Option<String> = None;
    let mut affiliations = Vec::new();

    for line in tokens.split(|t| t.is_command("\\") || t.is_command("newline")) {
        let mut rest = Vec::new();
        for token in line {
            match token.command_name() {
                Some("email" | "texttt") if email.is_none() => {
                    email = Some(renderer.plain(token.arg(0).unwrap_or(""))?);
                }
                Some("href")
                    if email.is_none()
                        && token.arg(0).is_some_and(|url| url.trim().starts_with("mailto:")) =>
                {
                    let url = token.arg(0).unwrap_or("").trim();
                    email = Some(url.trim_start_matches("mailto:").to_string());
                }
                Some("affiliation" | "affil" | "institute") => {
                    let text = renderer.plain(token.last_arg().unwrap_or(""))?;
                    if !text.is_empty() {
                        affiliations.push(text);
                    }
                }
                _ => rest.push(token),
            }
        }

        let text = line_text(renderer, &rest)?;
        if text.is_empty() {
            continue;
        }
        if email.is_none() && text.contains('@') && !text.contains(' ') {
            email = Some(text);
        } else if name.is_none() {
            name = Some(text);
        } else {
            affiliations.push(text);
        }
    }

    Ok(name.map(|name| Author {
        name,
        affiliation: (!affiliations.is_empty()).then(|| affiliations.join(", ")),
        email: email.filter(|e| !e.is_empty()),
    }))
}

/// Plain text of one line, without inline math (footnote marks like `$^1$`).
fn line_text(renderer: &mut Renderer<'_>, tokens: &[&Token]) -> Result<String, ParseError> {
    let mut rich = RichText::new();
    renderer.detached(|r| r.render_tokens(tokens.iter().copied(), &mut rich))?;
    rich.0.retain(|inline| !matches!(inline, Inline::Math { .. }));
    Ok(collapse(&rich.plain_text()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use paperscope_core::ParseOptions;
    use pretty_assertions::assert_eq;

    fn authors(text: &str) -> Vec<Author> {
        let options = ParseOptions::default();
        let mut renderer = Renderer::new(&options);
        parse_authors(&mut renderer, text).unwrap()
    }

    #[test]
    fn test_split_on_and() {
        let parsed = authors(r"Ada Lovelace \\ Analytical Engines Ltd. \And Charles Babbage \\ Cambridge");
        assert_eq!(
            parsed,
            vec![
                Author::new("Ada Lovelace").with_affiliation("Analytical Engines Ltd."),
                Author::new("Charles Babbage").with_affiliation("Cambridge"),
            ]
        );
    }

    #[test]
    fn test_commas_do_not_split() {
        let parsed = authors(r"Jane Doe \\ Institute of Physics, Department of Optics \\ Berlin, Germany");
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].name, "Jane Doe");
        assert_eq!(
            parsed[0].affiliation.as_deref(),
            Some("Institute of Physics, Department of Optics, Berlin, Germany")
        );
    }

    #[test]
    fn test_email_and_thanks() {
        let parsed = authors(
            r"John Smith\thanks{Work done at X.}$^{1}$ \\ University \\ \texttt{john@example.org} \and Mary Major \\ mary@example.org",
        );
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].name, "John Smith");
        assert_eq!(parsed[0].email.as_deref(), Some("john@example.org"));
        assert_eq!(parsed[0].affiliation.as_deref(), Some("University"));
        assert_eq!(parsed[1].email.as_deref(), Some("mary@example.org"));
        assert_eq!(parsed[1].affiliation, None);
    }

    #[test]
    fn test_empty_block() {
        assert!(authors("  ").is_empty());
    }
}

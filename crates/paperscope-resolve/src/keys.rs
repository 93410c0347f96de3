//! Author-year citation keys.

use paperscope_core::BibliographyEntry;
use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

fn regex(cell: &'static OnceLock<Option<Regex>>, pattern: &str) -> Option<&'static Regex> {
    cell.get_or_init(|| Regex::new(pattern).ok()).as_ref()
}

/// First four-digit year between 1900 and 2099 in `text`.
pub fn find_year(text: &str) -> Option<&str> {
    static YEAR: OnceLock<Option<Regex>> = OnceLock::new();
    regex(&YEAR, r"\b(19|20)\d{2}\b")?
        .find(text)
        .map(|m| m.as_str())
}

/// First-author surname from a free-text bibliography body.
///
/// Rules are tried in order: `J. Smith,`, then `Smith, J.`, then
/// `J. Smith and ...`. Without a match the first capitalized word is used.
pub fn find_surname(text: &str) -> Option<&str> {
    static INITIAL_SURNAME: OnceLock<Option<Regex>> = OnceLock::new();
    static SURNAME_INITIAL: OnceLock<Option<Regex>> = OnceLock::new();
    static INITIAL_SURNAME_AND: OnceLock<Option<Regex>> = OnceLock::new();
    static CAPITALIZED: OnceLock<Option<Regex>> = OnceLock::new();

    let rules = [
        regex(&INITIAL_SURNAME, r"^\s*[A-Z]\.\s*([A-Z][a-z]+),"),
        regex(&SURNAME_INITIAL, r"^\s*([A-Z][a-z]+),"),
        regex(&INITIAL_SURNAME_AND, r"^\s*[A-Z]\.\s*([A-Z][a-z]+)\s+and"),
    ];
    let trimmed = text.trim();
    for rule in rules.into_iter().flatten() {
        if let Some(surname) = rule.captures(trimmed).and_then(|c| c.get(1)) {
            return Some(surname.as_str());
        }
    }
    regex(&CAPITALIZED, r"[A-Z][a-z]+")?
        .find(text)
        .map(|m| m.as_str())
}

/// Surname of a structured author name (`Jane Smith`, `Smith, Jane`).
fn structured_surname(name: &str) -> Option<&str> {
    let name = name.trim();
    match name.split_once(',') {
        Some((surname, _)) => Some(surname.trim()),
        None => name.split_whitespace().last(),
    }
    .filter(|s| !s.is_empty())
}

/// The unsuffixed author-year stem of one entry.
pub fn author_year(entry: &BibliographyEntry) -> String {
    let surname = entry
        .authors
        .first()
        .and_then(|a| structured_surname(a))
        .or_else(|| find_surname(&entry.text))
        .unwrap_or("Unknown");
    let year = entry
        .year
        .as_deref()
        .or_else(|| find_year(&entry.text))
        .unwrap_or("");
    format!("{surname}{year}")
}

/// Assign an author-year key to every entry, in order.
///
/// The first entry with a given stem keeps it bare; later ones get `a`, `b`,
/// ... in encounter order, so keys only depend on entry order.
pub fn assign_keys(entries: &[BibliographyEntry]) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    entries
        .iter()
        .map(|entry| {
            let stem = author_year(entry);
            let count = seen.entry(stem.clone()).or_insert(0);
            *count += 1;
            match *count {
                1 => stem,
                n => format!("{stem}{}", suffix(n - 2)),
            }
        })
        .collect()
}

/// `a`..`z`, then `aa`, `ab`, ... for very long collision runs.
fn suffix(n: usize) -> String {
    let letter = |i: usize| char::from(b'a' + (i % 26) as u8);
    if n < 26 {
        letter(n).to_string()
    } else {
        format!("{}{}", suffix(n / 26 - 1), letter(n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn entry(text: &str) -> BibliographyEntry {
        BibliographyEntry::new("ref", "key", text)
    }

    #[test]
    fn test_surname_rules_in_order() {
        assert_eq!(find_surname("Y. Bengio, Learning deep architectures."), Some("Bengio"));
        assert_eq!(find_surname("Bengio, Y. Learning deep architectures."), Some("Bengio"));
        assert_eq!(
            find_surname("R. Collobert and J. Weston. A unified architecture."),
            Some("Collobert")
        );
        assert_eq!(find_surname("the LAPACK Users Guide, SIAM"), Some("Users"));
        assert_eq!(find_surname("no capitals here"), None);
    }

    #[test]
    fn test_year() {
        assert_eq!(find_year("Vol. 12345, pp. 1-10, 2019."), Some("2019"));
        assert_eq!(find_year("ISBN 978-3-16"), None);
    }

    #[test]
    fn test_author_year_stem() {
        assert_eq!(author_year(&entry("J. Smith, A paper, 2020.")), "Smith2020");
        assert_eq!(author_year(&entry("anonymous report")), "Unknown");
        assert_eq!(author_year(&entry("Some Report")), "Some");

        let mut structured = entry("");
        structured.authors = vec!["Ada Lovelace".into()];
        structured.year = Some("1843".into());
        assert_eq!(author_year(&structured), "Lovelace1843");
    }

    #[test]
    fn test_collisions_suffixed_in_encounter_order() {
        let entries = [
            entry("J. Smith, First, 2020."),
            entry("R. Doe, Other, 2020."),
            entry("A. Smith, Second, 2020."),
            entry("K. Smith, Third, 2020."),
        ];
        assert_eq!(
            assign_keys(&entries),
            ["Smith2020", "Doe2020", "Smith2020a", "Smith2020b"]
        );
        assert_eq!(assign_keys(&entries), assign_keys(&entries));
    }

    #[test]
    fn test_suffix_sequence() {
        assert_eq!(suffix(0), "a");
        assert_eq!(suffix(25), "z");
        assert_eq!(suffix(26), "aa");
        assert_eq!(suffix(27), "ab");
    }
}

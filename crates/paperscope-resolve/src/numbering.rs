//! Display numbers for sections and blocks, and the label map built from them.

use paperscope_core::{Document, Issue, IssueKind, RefStyle, Section, Severity};
use std::collections::HashMap;

/// A numbered, labeled target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Numbered {
    /// Kind name used by named references ("Table", "Section").
    pub kind: &'static str,
    pub number: String,
}

impl Numbered {
    /// Text a reference in `style` renders as.
    pub fn render(&self, style: RefStyle) -> String {
        match style {
            RefStyle::Plain => self.number.clone(),
            RefStyle::Parenthesized => format!("({})", self.number),
            RefStyle::Named => format!("{} {}", self.kind, self.number),
        }
    }
}

/// Give every numbered section its hierarchical number ("2", "2.1").
///
/// Starred sections are skipped and so is everything below them.
pub fn number_sections(sections: &mut [Section]) {
    fn walk(sections: &mut [Section], prefix: &str) {
        let mut counter = 0;
        for section in sections {
            if !section.numbered {
                section.number = None;
                clear(&mut section.children);
                continue;
            }
            counter += 1;
            let number = if prefix.is_empty() {
                counter.to_string()
            } else {
                format!("{prefix}.{counter}")
            };
            walk(&mut section.children, &number);
            section.number = Some(number);
        }
    }

    fn clear(sections: &mut [Section]) {
        for section in sections {
            section.number = None;
            clear(&mut section.children);
        }
    }

    walk(sections, "");
}

/// Map every label to what it displays as.
///
/// Equations are numbered among the numbered equations only; tables and
/// figures by position. When a label is declared twice the first
/// declaration wins and the duplicate is reported.
pub fn label_map(doc: &Document, issues: &mut Vec<Issue>) -> HashMap<String, Numbered> {
    let mut map = HashMap::new();
    let mut insert = |label: Option<&str>, kind: &'static str, number: String| {
        let Some(label) = label else {
            return;
        };
        if map.contains_key(label) {
            issues.push(Issue::new(
                Severity::Minor,
                IssueKind::DuplicateId,
                format!("label `{label}` declared more than once"),
            ));
            return;
        }
        map.insert(label.to_string(), Numbered { kind, number });
    };

    for section in doc.all_sections() {
        if let Some(number) = &section.number {
            insert(section.label.as_deref(), "Section", number.clone());
        }
    }
    for (n, equation) in doc.equations.iter().filter(|e| e.numbered).enumerate() {
        insert(equation.label.as_deref(), "Equation", (n + 1).to_string());
    }
    for (n, table) in doc.tables.iter().enumerate() {
        insert(table.label.as_deref(), "Table", (n + 1).to_string());
    }
    for (n, figure) in doc.figures.iter().enumerate() {
        insert(figure.label.as_deref(), "Figure", (n + 1).to_string());
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use paperscope_core::{Equation, Figure, Table};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_section_numbers() {
        let mut unnumbered = Section::new("ack", 1, "Acknowledgments");
        unnumbered.numbered = false;
        let mut sections = vec![
            Section::new("a", 1, "A")
                .child(Section::new("a1", 2, "A1"))
                .child(Section::new("a2", 2, "A2")),
            unnumbered.child(Section::new("inner", 2, "Inner")),
            Section::new("b", 1, "B"),
        ];
        number_sections(&mut sections);
        let numbers: Vec<_> = [
            &sections[0],
            &sections[0].children[0],
            &sections[0].children[1],
            &sections[1],
            &sections[1].children[0],
            &sections[2],
        ]
        .iter()
        .map(|s| s.number.as_deref())
        .collect();
        assert_eq!(
            numbers,
            [Some("1"), Some("1.1"), Some("1.2"), None, None, Some("2")]
        );
    }

    #[test]
    fn test_label_map() {
        let mut doc = Document::new();
        let mut starred = Equation::new("eq_1", "a");
        starred.numbered = false;
        starred.label = Some("eq:star".into());
        let mut second = Equation::new("eq_2", "b");
        second.label = Some("eq:b".into());
        doc.equations = vec![starred, second];
        doc.tables = vec![Table::new("table_1"), Table::new("table_2").with_label("tab:two")];
        doc.figures = vec![Figure::new("figure_1").with_label("tab:two")];

        let mut issues = Vec::new();
        let map = label_map(&doc, &mut issues);
        assert_eq!(map["eq:b"].render(RefStyle::Parenthesized), "(1)");
        assert_eq!(map["tab:two"].render(RefStyle::Named), "Table 2");
        assert!(!map.contains_key("eq:star"));
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].kind, IssueKind::DuplicateId);
    }
}

//! Task metadata carried in the provider's free-text notes field.
//!
//! Grammar, one entry per line:
//!
//! ```text
//! key: value
//! ```
//!
//! Keys are trimmed and matched case-insensitively. Recognised keys are
//! `company`, `brand`, `assignee` (alias `assigned to`) and `assigner`
//! (alias `assigned by`). Lines without a colon, unknown keys and empty
//! values are ignored; a repeated key overwrites the earlier value.
//!
//! This is a lossy heuristic: anything a user typed in the notes that does
//! not match the grammar is dropped on import.

/// Metadata extracted from a notes blob.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NotesMetadata {
    pub company: Option<String>,
    pub brand: Option<String>,
    pub assignee: Option<String>,
    pub assigner: Option<String>,
}

/// Parse `key: value` lines out of a notes field.
pub fn parse(notes: &str) -> NotesMetadata {
    let mut meta = NotesMetadata::default();

    for line in notes.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        if value.is_empty() {
            continue;
        }

        let slot = match key.trim().to_ascii_lowercase().as_str() {
            "company" => &mut meta.company,
            "brand" => &mut meta.brand,
            "assignee" | "assigned to" => &mut meta.assignee,
            "assigner" | "assigned by" => &mut meta.assigner,
            _ => continue,
        };
        *slot = Some(value.to_string());
    }

    meta
}

/// Render metadata back into the notes grammar. Returns `None` when there is nothing to write.
pub fn render(meta: &NotesMetadata) -> Option<String> {
    let lines: Vec<String> = [
        ("company", &meta.company),
        ("brand", &meta.brand),
        ("assignee", &meta.assignee),
        ("assigner", &meta.assigner),
    ]
    .into_iter()
    .filter_map(|(key, value)| value.as_ref().map(|v| format!("{key}: {v}")))
    .collect();

    (!lines.is_empty()).then(|| lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_recognised_keys() {
        let meta = parse("Company: Acme Corp\nbrand: Widgets\nASSIGNEE: ann@example.com\nassigner:bob@example.com");
        assert_eq!(meta.company.as_deref(), Some("Acme Corp"));
        assert_eq!(meta.brand.as_deref(), Some("Widgets"));
        assert_eq!(meta.assignee.as_deref(), Some("ann@example.com"));
        assert_eq!(meta.assigner.as_deref(), Some("bob@example.com"));
    }

    #[test]
    fn test_parse_ignores_noise() {
        let meta = parse("Call the client back\nurl: https://example.com\ncompany:   \nbrand: A: B\n");
        assert_eq!(meta.company, None);
        // Only the first colon splits
        assert_eq!(meta.brand.as_deref(), Some("A: B"));
        assert_eq!(meta.assignee, None);
    }

    #[test]
    fn test_parse_aliases_and_last_wins() {
        let meta = parse("assigned to: first@example.com\nAssigned To: second@example.com\nassigned by: boss@example.com");
        assert_eq!(meta.assignee.as_deref(), Some("second@example.com"));
        assert_eq!(meta.assigner.as_deref(), Some("boss@example.com"));
    }

    #[test]
    fn test_render_is_parseable() {
        let meta = NotesMetadata {
            company: Some("Acme".to_string()),
            brand: None,
            assignee: Some("ann@example.com".to_string()),
            assigner: None,
        };
        let rendered = render(&meta).unwrap();
        assert_eq!(rendered, "company: Acme\nassignee: ann@example.com");
        assert_eq!(parse(&rendered), meta);
        assert_eq!(render(&NotesMetadata::default()), None);
    }
}

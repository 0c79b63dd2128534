//! Citation formatting
//!
//! Turns a ranked document list into numbered citations with bounded,
//! sanitized excerpts suitable for the user-visible answer footer.

use retail_assist_config::constants::retrieval;
use retail_assist_core::{pii::redact_pii, Citation, ScoredDocument};

/// Format a ranked document list as numbered citations
///
/// IDs are a contiguous 1-based sequence matching rank order. Excerpts are
/// truncated to a fixed length, newline-collapsed, PII-redacted and always
/// end in `...`.
pub fn format_citations(docs: &[ScoredDocument]) -> Vec<Citation> {
    docs.iter()
        .enumerate()
        .map(|(i, d)| {
            let truncated: String = d
                .document
                .content
                .chars()
                .take(retrieval::EXCERPT_LEN)
                .collect();
            let excerpt = format!("{}...", truncated.replace('\n', " "));

            Citation {
                id: i + 1,
                source: redact_pii(d.document.source()),
                excerpt: redact_pii(&excerpt),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use retail_assist_core::Document;

    fn scored(content: &str, source: &str) -> ScoredDocument {
        ScoredDocument::new(Document::new(content, source), 1.0)
    }

    #[test]
    fn test_ids_are_contiguous_from_one() {
        let docs = vec![
            scored("first", "a.md"),
            scored("second", "b.md"),
            scored("third", "c.md"),
        ];
        let cites = format_citations(&docs);

        assert_eq!(cites.len(), 3);
        assert_eq!(cites[0].id, 1);
        assert_eq!(cites[1].id, 2);
        assert_eq!(cites[2].id, 3);
        assert_eq!(cites[1].source, "b.md");
    }

    #[test]
    fn test_excerpt_is_truncated_and_newline_collapsed() {
        let long = format!("line one\nline two\n{}", "x".repeat(300));
        let cites = format_citations(&[scored(&long, "policy.md")]);

        let excerpt = &cites[0].excerpt;
        assert!(excerpt.ends_with("..."));
        assert!(!excerpt.contains('\n'));
        // 220 content chars plus the ellipsis
        assert_eq!(excerpt.chars().count(), 223);
    }

    #[test]
    fn test_short_excerpt_still_gets_ellipsis() {
        let cites = format_citations(&[scored("short text", "a.md")]);
        assert_eq!(cites[0].excerpt, "short text...");
    }

    #[test]
    fn test_pii_is_redacted() {
        let cites = format_citations(&[scored(
            "Contact help@example.com or 312-555-1212 for assistance",
            "contact.md",
        )]);
        assert!(cites[0].excerpt.contains("[REDACTED_EMAIL]"));
        assert!(cites[0].excerpt.contains("[REDACTED_PHONE]"));
    }

    #[test]
    fn test_empty_input() {
        assert!(format_citations(&[]).is_empty());
    }
}

//! Evidence-span checking against the source document.

use crate::models::Evidence;
use crate::utils::similarity_ratio;

use super::markdown::SourceDocument;

/// Minimum fuzzy-similarity ratio for a quote to count as matching its
/// cited lines.
pub const EVIDENCE_SIMILARITY_THRESHOLD: u32 = 85;

/// Checks one evidence citation against the source document.
///
/// Returns `None` when the quote matches its cited range (exactly after
/// trailing-whitespace normalization, or fuzzily at or above the threshold),
/// otherwise a human-readable warning. Mismatches never fail extraction.
pub fn check_evidence(document: &SourceDocument, evidence: &Evidence) -> Option<String> {
    let Some(cited) = document.line_range(evidence.line_start, evidence.line_end) else {
        return Some(format!(
            "evidence cites lines {}-{} but '{}' has {} lines",
            evidence.line_start,
            evidence.line_end,
            document.path,
            document.line_count()
        ));
    };

    let quote = evidence.quote.trim_end();
    let cited_trimmed: String = cited
        .lines()
        .map(|l| l.trim_end())
        .collect::<Vec<_>>()
        .join("\n");

    if cited_trimmed.contains(quote) {
        return None;
    }

    let ratio = similarity_ratio(quote, &cited_trimmed);
    if ratio >= EVIDENCE_SIMILARITY_THRESHOLD {
        return None;
    }

    Some(format!(
        "evidence quote does not match lines {}-{} of '{}' (similarity {}): {:?}",
        evidence.line_start, evidence.line_end, document.path, ratio, evidence.quote
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc() -> SourceDocument {
        SourceDocument::from_text(
            "rules.md",
            "Operators must greet the customer by name.\nRefunds require a manager.",
        )
        .unwrap()
    }

    fn evidence(start: usize, end: usize, quote: &str) -> Evidence {
        Evidence::new("rules.md", start, end, quote).unwrap()
    }

    #[test]
    fn exact_quote_passes() {
        let e = evidence(1, 1, "Operators must greet the customer by name.");
        assert!(check_evidence(&doc(), &e).is_none());
    }

    #[test]
    fn substring_quote_passes() {
        let e = evidence(1, 1, "greet the customer");
        assert!(check_evidence(&doc(), &e).is_none());
    }

    #[test]
    fn trailing_whitespace_is_ignored() {
        let e = evidence(2, 2, "Refunds require a manager.   ");
        assert!(check_evidence(&doc(), &e).is_none());
    }

    #[test]
    fn near_match_passes_fuzzily() {
        let e = evidence(1, 1, "Operators must greet the costumer by name.");
        assert!(check_evidence(&doc(), &e).is_none());
    }

    #[test]
    fn unrelated_quote_warns() {
        let e = evidence(1, 1, "All orders ship within two days.");
        let warning = check_evidence(&doc(), &e).unwrap();
        assert!(warning.contains("does not match"));
    }

    #[test]
    fn out_of_bounds_range_warns() {
        let e = evidence(2, 9, "Refunds require a manager.");
        let warning = check_evidence(&doc(), &e).unwrap();
        assert!(warning.contains("has 2 lines"));
    }
}

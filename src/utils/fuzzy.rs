//! Fuzzy string similarity for evidence checking.
//!
//! Extracted quotes are compared against their cited source lines with an
//! exact match first and this normalized edit-distance ratio as the fallback,
//! so minor whitespace or punctuation drift does not invalidate a citation.

/// Similarity between two strings as a 0-100 ratio.
///
/// 100 means identical, 0 means nothing in common. Based on Levenshtein
/// distance normalized by the longer input's length. Comparison is
/// case-insensitive and whitespace-normalized.
pub fn similarity_ratio(a: &str, b: &str) -> u32 {
    let a = normalize(a);
    let b = normalize(b);

    if a == b {
        return 100;
    }
    if a.is_empty() || b.is_empty() {
        return 0;
    }

    let distance = levenshtein(&a, &b);
    let longest = a.chars().count().max(b.chars().count());
    (100.0 * (1.0 - distance as f64 / longest as f64)).round() as u32
}

fn normalize(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    // Single-row dynamic program, O(min(len)) memory after the swap below.
    let (short, long) = if a.len() <= b.len() { (&a, &b) } else { (&b, &a) };

    let mut row: Vec<usize> = (0..=short.len()).collect();
    for (i, &lc) in long.iter().enumerate() {
        let mut previous_diagonal = row[0];
        row[0] = i + 1;
        for (j, &sc) in short.iter().enumerate() {
            let cost = usize::from(lc != sc);
            let next = (row[j] + 1)
                .min(row[j + 1] + 1)
                .min(previous_diagonal + cost);
            previous_diagonal = row[j + 1];
            row[j + 1] = next;
        }
    }
    row[short.len()]
}

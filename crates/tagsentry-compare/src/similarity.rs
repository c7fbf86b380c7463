//! Edit-distance similarity for partial matching

/// Normalized Levenshtein similarity in [0, 1]
///
/// 1.0 means identical; 0.0 means no character survives. Computed as
/// `1 - distance / max(len)` over chars, not bytes.
#[must_use]
pub fn normalized_similarity(a: &str, b: &str) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }

    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    if a_chars.is_empty() || b_chars.is_empty() {
        return 0.0;
    }

    // Two-row DP keeps memory at O(min side) for long values.
    let (short, long) = if a_chars.len() <= b_chars.len() {
        (&a_chars, &b_chars)
    } else {
        (&b_chars, &a_chars)
    };

    let mut prev: Vec<usize> = (0..=short.len()).collect();
    let mut curr = vec![0usize; short.len() + 1];

    for (i, lc) in long.iter().enumerate() {
        curr[0] = i + 1;
        for (j, sc) in short.iter().enumerate() {
            let cost = usize::from(lc != sc);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    let dist = prev[short.len()];
    let max_len = long.len() as f64;
    (1.0 - (dist as f64 / max_len)).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_strings_score_one() {
        assert_eq!(normalized_similarity("purchase", "purchase"), 1.0);
        assert_eq!(normalized_similarity("", ""), 1.0);
    }

    #[test]
    fn empty_versus_nonempty_scores_zero() {
        assert_eq!(normalized_similarity("", "purchase"), 0.0);
        assert_eq!(normalized_similarity("purchase", ""), 0.0);
    }

    #[test]
    fn single_edit_on_ten_chars_scores_point_nine() {
        // "categories" vs "categoried": one substitution over ten chars.
        let s = normalized_similarity("categories", "categoried");
        assert!((s - 0.9).abs() < 1e-9);
    }

    #[test]
    fn disjoint_strings_score_low() {
        assert!(normalized_similarity("abc", "xyz") < 0.01);
    }

    #[test]
    fn symmetric_in_arguments() {
        let a = "product_detail";
        let b = "product_details";
        assert_eq!(normalized_similarity(a, b), normalized_similarity(b, a));
    }
}

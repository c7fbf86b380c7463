//! Value normalization ahead of matching
//!
//! Collected analytics values arrive with whatever whitespace, casing and
//! currency decoration the page rendered. Both sides are normalized the
//! same way before equality is judged, so "  19,99 € " and "19.99" can
//! still meet in the middle for price-like parameters.

/// Zero-width characters stripped unconditionally
const ZERO_WIDTH: [char; 4] = ['\u{200B}', '\u{200C}', '\u{200D}', '\u{FEFF}'];

/// Currency decoration stripped for price-like parameter names
const CURRENCY: [char; 5] = ['$', '\u{20AC}', '\u{A3}', '\u{A5}', ','];

/// True when the parameter name marks a monetary value
#[must_use]
pub fn is_price_like(parameter_name: &str) -> bool {
    let lower = parameter_name.to_ascii_lowercase();
    lower.contains("price") || lower.contains("discount")
}

/// Normalize a value for comparison
///
/// Trims, collapses whitespace runs to single spaces, strips zero-width
/// characters, optionally case-folds, and for price-like parameter names
/// also strips currency punctuation and interior spaces.
#[must_use]
pub fn normalize_value(parameter_name: &str, raw: &str, case_insensitive: bool) -> String {
    let stripped: String = raw.chars().filter(|c| !ZERO_WIDTH.contains(c)).collect();

    let mut collapsed = String::with_capacity(stripped.len());
    let mut last_was_space = false;
    for c in stripped.trim().chars() {
        if c.is_whitespace() {
            if !last_was_space {
                collapsed.push(' ');
            }
            last_was_space = true;
        } else {
            collapsed.push(c);
            last_was_space = false;
        }
    }

    let mut value = if case_insensitive {
        collapsed.to_lowercase()
    } else {
        collapsed
    };

    if is_price_like(parameter_name) {
        value.retain(|c| !CURRENCY.contains(&c) && c != ' ');
    }

    value
}

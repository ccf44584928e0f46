//! Light text normalization shared by the index builders and the query paths.
//!
//! Every string that reaches an index, and every query that is scored against
//! one, goes through [`light_normalize`]. Build-time and query-time cleaning
//! must stay identical.
//!
//! # Rules
//!
//! 1. Lowercase.
//! 2. `&`, `+` and `/` become the word `and`.
//! 3. ASCII apostrophes are removed (`don't` → `dont`).
//! 4. Anything other than `a-z`, `0-9` and `-` separates words.
//! 5. Runs of separators collapse to one space; leading and trailing ones are dropped.
//!
//! The function is pure and idempotent.

/// Normalizes free text into the canonical token stream.
///
/// # Examples
///
/// ```
/// use saffron_core::normalize::light_normalize;
///
/// assert_eq!(light_normalize("Mac & Cheese!"), "mac and cheese");
/// assert_eq!(light_normalize("Grandma's  Stir-Fry"), "grandmas stir-fry");
/// assert_eq!(light_normalize("   "), "");
/// ```
pub fn light_normalize(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut pending_space = false;

    for ch in input.to_lowercase().chars() {
        match ch {
            '\'' => {}
            '&' | '+' | '/' => {
                push_word(&mut out, &mut pending_space, "and");
                pending_space = true;
            }
            c if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' => {
                if pending_space && !out.is_empty() {
                    out.push(' ');
                }
                pending_space = false;
                out.push(c);
            }
            _ => pending_space = true,
        }
    }

    out
}

fn push_word(out: &mut String, pending_space: &mut bool, word: &str) {
    if !out.is_empty() {
        out.push(' ');
    }
    *pending_space = false;
    out.push_str(word);
}

/// Normalizes every entry of a list, dropping entries that become empty.
pub fn normalize_list<S: AsRef<str>>(items: &[S]) -> Vec<String> {
    items
        .iter()
        .map(|item| light_normalize(item.as_ref()))
        .filter(|item| !item.is_empty())
        .collect()
}

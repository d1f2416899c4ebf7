//! Whitespace tokenization shared by the reranker, confidence scorer and
//! lexical index.

use std::collections::HashSet;

/// Lowercased whitespace tokens, in order, duplicates kept.
pub fn tokens(text: &str) -> Vec<String> {
    text.split_whitespace().map(str::to_lowercase).collect()
}

/// Distinct lowercased whitespace tokens.
pub fn term_set(text: &str) -> HashSet<String> {
    text.split_whitespace().map(str::to_lowercase).collect()
}

/// Collapse every whitespace run to a single space and trim the ends.
pub fn clean(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Whether `phrase` occurs in `text` with no letter or digit directly
/// before or after it. Both are expected in the same case.
pub fn contains_word(text: &str, phrase: &str) -> bool {
    if phrase.is_empty() {
        return false;
    }
    text.match_indices(phrase).any(|(start, m)| {
        let before = text[..start].chars().next_back();
        let after = text[start + m.len()..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}

/// The first `max_chars` characters of `text`, with `...` appended when
/// anything was cut.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_lowercased() {
        assert_eq!(tokens("Modal  Minimum\tBank"), vec!["modal", "minimum", "bank"]);
    }

    #[test]
    fn term_set_dedups_case_insensitively() {
        let set = term_set("Bank bank BANK risiko");
        assert_eq!(set.len(), 2);
        assert!(set.contains("bank"));
    }

    #[test]
    fn clean_collapses_whitespace() {
        assert_eq!(clean("  PERATURAN\n\nOTORITAS   JASA "), "PERATURAN OTORITAS JASA");
        assert_eq!(clean(" \n "), "");
    }

    #[test]
    fn contains_word_needs_boundaries() {
        assert!(contains_word("menurut uu 21/2011", "uu"));
        assert!(contains_word("menurut uu", "uu"));
        assert!(contains_word("uu: perbankan", "uu"));
        assert!(contains_word("isi undang-undang perbankan", "undang-undang"));
        assert!(!contains_word("kuu x", "uu"));
        assert!(!contains_word("uuk", "uu"));
        assert!(!contains_word("apa saja", ""));
    }

    #[test]
    fn truncate_chars_respects_char_boundaries() {
        assert_eq!(truncate_chars("ketentuan", 20), "ketentuan");
        assert_eq!(truncate_chars("ketentuan", 4), "kete...");
        assert_eq!(truncate_chars("modal — inti", 7), "modal —...");
    }
}

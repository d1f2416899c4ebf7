use regula_core::text;

/// Maximum snippet length in characters, before the ellipsis.
const SNIPPET_CHARS: usize = 200;

/// The sentence of `content` mentioning the most query terms, truncated.
///
/// Sentences are split on `". "`; a term counts when it occurs anywhere in
/// the lowercased sentence. The first sentence wins ties.
pub fn extract_snippet(content: &str, query: &str) -> String {
    let terms: Vec<String> = query.split_whitespace().map(str::to_lowercase).collect();
    let hits = |sentence: &str| {
        let lower = sentence.to_lowercase();
        terms.iter().filter(|t| lower.contains(t.as_str())).count()
    };

    let mut best = "";
    let mut best_hits = None;
    for sentence in content.split(". ") {
        let n = hits(sentence);
        if best_hits.is_none_or(|b| n > b) {
            best = sentence;
            best_hits = Some(n);
        }
    }
    text::truncate_chars(best, SNIPPET_CHARS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_sentence_with_most_terms() {
        let content = "Pasal 1 berisi definisi. Bank wajib menyediakan modal minimum. Ketentuan lain";
        assert_eq!(
            extract_snippet(content, "modal minimum bank"),
            "Bank wajib menyediakan modal minimum"
        );
    }

    #[test]
    fn first_sentence_wins_ties() {
        assert_eq!(extract_snippet("satu. dua. tiga", "empat"), "satu");
    }

    #[test]
    fn long_sentences_are_truncated_on_char_boundary() {
        let sentence = "é".repeat(250);
        let snippet = extract_snippet(&sentence, "x");
        assert!(snippet.ends_with("..."));
        assert_eq!(snippet.chars().count(), 203);
    }
}

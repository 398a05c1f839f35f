use rust_stemmers::{Algorithm, Stemmer};
use std::collections::HashSet;

/// Text-to-token pipeline applied identically at index and query time.
///
/// Order is fixed: lowercase, strip ASCII punctuation, drop stopwords, stem.
pub struct TextNormalizer {
    stopwords: HashSet<String>,
    stemmer: Stemmer,
}

impl TextNormalizer {
    pub fn new<I, S>(stopwords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let stopwords = stopwords.into_iter().map(|w| w.as_ref().to_lowercase()).collect();
        Self { stopwords, stemmer: Stemmer::create(Algorithm::English) }
    }

    pub fn transform(&self, text: &str) -> String {
        let lowered = text.to_lowercase();
        let stripped: String = lowered.chars().filter(|c| !c.is_ascii_punctuation()).collect();
        stripped
            .split_whitespace()
            .filter(|w| !self.stopwords.contains(*w))
            .map(|w| self.stemmer.stem(w).into_owned())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Split on whitespace, keeping order and dropping empty pieces.
    pub fn tokenize(text: &str) -> Vec<String> {
        text.split_whitespace().map(str::to_string).collect()
    }

    /// `transform` followed by `tokenize`.
    pub fn tokens(&self, text: &str) -> Vec<String> {
        Self::tokenize(&self.transform(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercases_strips_punctuation_and_stems() {
        let n = TextNormalizer::new(Vec::<String>::new());
        assert_eq!(n.transform("Running, BEARS!"), "run bear");
    }

    #[test]
    fn stopwords_are_case_insensitive() {
        let n = TextNormalizer::new(["The", "and"]);
        assert_eq!(n.tokens("THE bear AND the wolf"), vec!["bear", "wolf"]);
    }

    #[test]
    fn punctuation_only_input_yields_no_tokens() {
        let n = TextNormalizer::new(["a"]);
        assert!(n.tokens("... !!! ???").is_empty());
        assert!(n.tokens("").is_empty());
    }

    #[test]
    fn tokenize_preserves_order() {
        assert_eq!(TextNormalizer::tokenize("  c  b\ta\n"), vec!["c", "b", "a"]);
    }

    #[test]
    fn same_pipeline_for_index_and_query_text() {
        let n = TextNormalizer::new(["a"]);
        assert_eq!(n.transform("A Bear's attack"), n.transform("bears attack"));
    }
}

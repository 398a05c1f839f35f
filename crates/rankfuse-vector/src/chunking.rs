use once_cell::sync::Lazy;
use regex::Regex;

// A sentence ends at `.`, `!` or `?` followed by whitespace.
static SENTENCE_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.!?]\s+").expect("valid sentence regex"));

fn split_sentences(text: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    for m in SENTENCE_BREAK.find_iter(text) {
        // keep the terminator, drop the whitespace
        out.push(&text[start..=m.start()]);
        start = m.end();
    }
    out.push(&text[start..]);
    out
}

/// Group sentences into windows of `max_sentences`, advancing by
/// `max_sentences - overlap`.
///
/// A lone sentence without trailing punctuation gets a period. Once a
/// window would hold no more than `overlap` sentences it is dropped, since
/// every one of them already closed the previous chunk. Callers keep
/// `overlap < max_sentences`.
pub fn chunk_text(text: &str, max_sentences: usize, overlap: usize) -> Vec<String> {
    let text = text.trim();
    if text.is_empty() || max_sentences == 0 {
        return Vec::new();
    }

    let mut sentences: Vec<String> = split_sentences(text).into_iter().map(str::to_string).collect();
    if sentences.len() == 1 && !sentences[0].ends_with(|c: char| c.is_ascii_punctuation()) {
        sentences[0].push('.');
    }
    let sentences: Vec<String> = sentences
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();

    let step = max_sentences.saturating_sub(overlap).max(1);
    let mut chunks = Vec::new();
    let mut start = 0;
    while start < sentences.len() {
        let end = (start + max_sentences).min(sentences.len());
        let window = &sentences[start..end];
        if !chunks.is_empty() && window.len() <= overlap {
            break;
        }
        chunks.push(window.join(" "));
        start += step;
    }
    chunks
}

/// Fixed-size windows of whitespace-separated words.
pub fn chunk_words(text: &str, size: usize, overlap: usize) -> Vec<String> {
    let words: Vec<&str> = text.split_whitespace().collect();
    if size == 0 {
        return Vec::new();
    }
    let step = size.saturating_sub(overlap).max(1);
    let mut chunks = Vec::new();
    let mut start = 0;
    while start < words.len() {
        let end = (start + size).min(words.len());
        chunks.push(words[start..end].join(" "));
        start += step;
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_sentence_is_one_chunk() {
        assert_eq!(chunk_text("One sentence.", 4, 1), vec!["One sentence."]);
    }

    #[test]
    fn unpunctuated_single_sentence_gets_a_period() {
        assert_eq!(chunk_text("  no ending here ", 4, 1), vec!["no ending here."]);
        assert_eq!(chunk_text("Really?", 4, 1), vec!["Really?"]);
    }

    #[test]
    fn empty_and_blank_text_yield_nothing() {
        assert!(chunk_text("", 4, 1).is_empty());
        assert!(chunk_text(" \n\t ", 4, 1).is_empty());
    }

    #[test]
    fn windows_overlap_and_skip_degenerate_tail() {
        let text = "S1. S2. S3. S4. S5. S6. S7.";
        let chunks = chunk_text(text, 4, 1);
        // windows start at 0 and 3; the one at 6 would hold only "S7." (== overlap)
        assert_eq!(chunks, vec!["S1. S2. S3. S4.", "S4. S5. S6. S7."]);
    }

    #[test]
    fn trailing_window_larger_than_overlap_is_kept() {
        let chunks = chunk_text("A! B? C. D. E. F.", 3, 1);
        assert_eq!(chunks, vec!["A! B? C.", "C. D. E.", "E. F."]);
    }

    #[test]
    fn zero_overlap_partitions_sentences() {
        let chunks = chunk_text("A. B. C.", 2, 0);
        assert_eq!(chunks, vec!["A. B.", "C."]);
    }

    #[test]
    fn splits_only_on_terminator_followed_by_whitespace() {
        let chunks = chunk_text("Version 2.5 shipped. It works...  Mostly!", 1, 0);
        assert_eq!(chunks, vec!["Version 2.5 shipped.", "It works...", "Mostly!"]);
    }

    #[test]
    fn word_windows() {
        let chunks = chunk_words("a b c d e f g", 3, 1);
        assert_eq!(chunks, vec!["a b c", "c d e", "e f g", "g"]);
        assert!(chunk_words("   ", 3, 1).is_empty());
        assert_eq!(chunk_words("a b", 5, 0), vec!["a b"]);
    }
}

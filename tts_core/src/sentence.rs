//! Sentence extraction from a growing reply.
//!
//! The chat reply arrives as an append-only buffer. Each update scans only
//! the part after the last extracted sentence, so a sentence is handed out
//! at most once and always in reading order.

/// A candidate sentence must be longer than this many characters (after
/// trimming) to be extracted on its own. Shorter ones are merged into the
/// following sentence.
pub const MIN_SENTENCE_CHARS: usize = 2;

fn is_terminator(ch: char) -> bool {
    matches!(ch, '.' | '!' | '?')
}

/// A terminator ends a sentence at the end of the text, or when followed by
/// whitespace or an uppercase letter (the stream may not have produced the
/// separating space yet).
fn closes_sentence(next: Option<char>) -> bool {
    match next {
        None => true,
        Some(c) => c.is_whitespace() || c.is_uppercase(),
    }
}

#[derive(Debug, Default, Clone)]
pub struct SentenceSegmenter {
    text: String,
    consumed: usize,
}

impl SentenceSegmenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.text.clear();
        self.consumed = 0;
    }

    /// Byte offset up to which text has been handed out.
    pub fn consumed(&self) -> usize {
        self.consumed
    }

    /// Scan the full text so far and return any newly completed sentences.
    pub fn update(&mut self, full: &str) -> Vec<String> {
        if full.len() <= self.text.len() || !full.is_char_boundary(self.consumed) {
            return Vec::new();
        }
        self.text.clear();
        self.text.push_str(full);

        let mut sentences = Vec::new();
        let mut start = self.consumed;
        let mut pos = start;

        while let Some(ch) = full[pos..].chars().next() {
            let next = pos + ch.len_utf8();

            if is_terminator(ch) && closes_sentence(full[next..].chars().next()) {
                let sentence = full[start..next].trim();
                if sentence.chars().count() > MIN_SENTENCE_CHARS {
                    sentences.push(sentence.to_string());

                    let after = skip_whitespace(full, next);
                    self.consumed = after;
                    start = after;
                    pos = after;
                    continue;
                }
            }
            pos = next;
        }
        sentences
    }

    /// Take whatever trailing text was never extracted, then reset.
    pub fn finish(&mut self) -> Option<String> {
        let rest = self
            .text
            .get(self.consumed..)
            .map(str::trim)
            .filter(|rest| !rest.is_empty())
            .map(str::to_string);
        self.reset();
        rest
    }
}

fn skip_whitespace(text: &str, from: usize) -> usize {
    text[from..]
        .char_indices()
        .find(|(_, c)| !c.is_whitespace())
        .map(|(i, _)| from + i)
        .unwrap_or(text.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed_char_by_char(text: &str) -> Vec<String> {
        let mut seg = SentenceSegmenter::new();
        let mut out = Vec::new();
        let mut buf = String::new();
        for ch in text.chars() {
            buf.push(ch);
            out.extend(seg.update(&buf));
        }
        out
    }

    #[test]
    fn test_two_sentences_char_by_char() {
        assert_eq!(
            feed_char_by_char("Hello world. How are you?"),
            vec!["Hello world.".to_string(), "How are you?".to_string()]
        );
    }

    #[test]
    fn test_multiple_boundaries_in_one_update() {
        let mut seg = SentenceSegmenter::new();
        let out = seg.update("One two. Three four! Five six? Seven");
        assert_eq!(out, vec!["One two.", "Three four!", "Five six?"]);
        assert_eq!(seg.finish(), Some("Seven".to_string()));
    }

    #[test]
    fn test_unchanged_buffer_is_not_respoken() {
        let mut seg = SentenceSegmenter::new();
        assert_eq!(seg.update("It was sunny. We"), vec!["It was sunny."]);
        let offset = seg.consumed();
        assert!(seg.update("It was sunny. We").is_empty());
        assert!(seg.update("It was sunny. We").is_empty());
        assert_eq!(seg.consumed(), offset);
    }

    #[test]
    fn test_uppercase_lookahead_accepts_missing_space() {
        let mut seg = SentenceSegmenter::new();
        assert_eq!(seg.update("Good morning.Today"), vec!["Good morning."]);
    }

    #[test]
    fn test_decimal_point_is_not_a_boundary() {
        let mut seg = SentenceSegmenter::new();
        assert!(seg.update("It costs 3.5 dollars").is_empty());
        assert_eq!(seg.finish(), Some("It costs 3.5 dollars".to_string()));
    }

    #[test]
    fn test_short_fragment_merges_with_next() {
        let mut seg = SentenceSegmenter::new();
        assert!(seg.update("A. ").is_empty());
        assert_eq!(seg.update("A. Lovely day."), vec!["A. Lovely day."]);
    }

    #[test]
    fn test_offset_skips_trailing_whitespace() {
        let mut seg = SentenceSegmenter::new();
        seg.update("Done.\n\n  Next");
        assert_eq!(seg.consumed(), "Done.\n\n  ".len());
    }

    #[test]
    fn test_finish_empty_and_whitespace() {
        let mut seg = SentenceSegmenter::new();
        assert_eq!(seg.finish(), None);
        seg.update("All done.   ");
        assert_eq!(seg.finish(), None);
        assert_eq!(seg.consumed(), 0);
    }

    #[test]
    fn test_multibyte_text() {
        assert_eq!(
            feed_char_by_char("Café au lait. Très bien!"),
            vec!["Café au lait.".to_string(), "Très bien!".to_string()]
        );
    }

    #[test]
    fn test_reset_starts_over() {
        let mut seg = SentenceSegmenter::new();
        seg.update("First reply.");
        seg.reset();
        assert_eq!(seg.update("Second reply."), vec!["Second reply."]);
    }
}

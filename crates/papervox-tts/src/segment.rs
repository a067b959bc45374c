//! Utterance segmentation.
//!
//! The playback worker feeds the engine one utterance at a time and checks
//! for cancellation between utterances, so segment boundaries are the only
//! points where a pause request takes effect. Offsets are byte offsets into
//! the input text and always fall on `char` boundaries.

/// A half-open byte range `[start, end)` of one utterance within the text
/// it was segmented from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Utterance {
    pub start: usize,
    pub end: usize,
}

impl Utterance {
    pub fn slice<'a>(&self, text: &'a str) -> &'a str {
        &text[self.start..self.end]
    }
}

/// Splits `text` into utterances at sentence punctuation, falling back to
/// the last whitespace once `max_chars` characters accumulate without a
/// sentence end. Leading whitespace between utterances is skipped, so a
/// trailing-whitespace tail produces no utterance.
pub fn segment_utterances(text: &str, max_chars: usize) -> Vec<Utterance> {
    let max_chars = max_chars.max(1);
    let mut utterances = Vec::new();
    let mut start = 0;

    while start < text.len() {
        let rest = &text[start..];
        start += rest.len() - rest.trim_start().len();
        if start >= text.len() {
            break;
        }

        let mut chars_seen = 0;
        let mut last_whitespace = None;
        let mut cut = None;
        let mut iter = text[start..].char_indices().peekable();
        while let Some((offset, ch)) = iter.next() {
            let char_end = start + offset + ch.len_utf8();
            chars_seen += 1;
            if ch.is_whitespace() {
                last_whitespace = Some(start + offset);
            }
            let next_is_whitespace = iter.peek().map_or(true, |&(_, next)| next.is_whitespace());
            if matches!(ch, '.' | '!' | '?') && next_is_whitespace {
                cut = Some(char_end);
                break;
            }
            if chars_seen >= max_chars {
                // Prefer breaking at whitespace; hard-cut a single long word.
                cut = Some(last_whitespace.unwrap_or(char_end));
                break;
            }
        }

        let end = cut.unwrap_or(text.len());
        utterances.push(Utterance { start, end });
        start = end;
    }

    utterances
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offsets_are_well_formed(text: &str, utterances: &[Utterance]) {
        let mut previous_end = 0;
        for u in utterances {
            assert!(u.start >= previous_end);
            assert!(u.end > u.start);
            assert!(u.end <= text.len());
            assert!(text.is_char_boundary(u.start));
            assert!(text.is_char_boundary(u.end));
            previous_end = u.end;
        }
    }

    #[test]
    fn splits_on_sentence_punctuation() {
        let text = "Hello world. How are you? Fine!";
        let utterances = segment_utterances(text, 400);
        offsets_are_well_formed(text, &utterances);
        let parts: Vec<&str> = utterances.iter().map(|u| u.slice(text)).collect();
        assert_eq!(parts, vec!["Hello world.", "How are you?", "Fine!"]);
    }

    #[test]
    fn covers_text_without_terminal_punctuation() {
        let text = "a fragment with no period";
        let utterances = segment_utterances(text, 400);
        assert_eq!(utterances.len(), 1);
        assert_eq!(utterances[0].end, text.len());
    }

    #[test]
    fn falls_back_to_whitespace_at_max_length() {
        let text = "one two three four five six seven eight nine ten";
        let utterances = segment_utterances(text, 10);
        offsets_are_well_formed(text, &utterances);
        assert!(utterances.len() > 1);
        for u in &utterances {
            assert!(u.slice(text).chars().count() <= 10);
        }
    }

    #[test]
    fn hard_cuts_a_single_overlong_word() {
        let text = "x".repeat(25);
        let utterances = segment_utterances(&text, 10);
        offsets_are_well_formed(&text, &utterances);
        assert_eq!(utterances.len(), 3);
    }

    #[test]
    fn decimal_points_do_not_split_sentences() {
        let text = "Pi is 3.14 roughly. Next sentence.";
        let utterances = segment_utterances(text, 400);
        let parts: Vec<&str> = utterances.iter().map(|u| u.slice(text)).collect();
        assert_eq!(parts, vec!["Pi is 3.14 roughly.", "Next sentence."]);
    }

    #[test]
    fn multibyte_text_stays_on_char_boundaries() {
        let text = "Привет мир. Ещё одно предложение здесь.";
        let utterances = segment_utterances(text, 15);
        offsets_are_well_formed(text, &utterances);
    }

    #[test]
    fn whitespace_only_input_yields_nothing() {
        assert!(segment_utterances("   \n\t ", 400).is_empty());
        assert!(segment_utterances("", 400).is_empty());
    }

    #[test]
    fn trailing_whitespace_is_not_an_utterance() {
        let text = "Hello world.   \n";
        let utterances = segment_utterances(text, 400);
        assert_eq!(utterances.len(), 1);
        assert_eq!(utterances[0].slice(text), "Hello world.");
    }
}

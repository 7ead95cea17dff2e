//! Tracking the submitted part of a cumulative transcript

/// Words of a cumulative transcript that were already submitted
///
/// Engines revise earlier text as they go, adding punctuation or fixing
/// capitalization, so the prefix is compared word by word on a normalized
/// form rather than byte for byte.
#[derive(Debug, Default)]
pub(crate) struct ConsumedPrefix {
    words: Vec<String>,
}

impl ConsumedPrefix {
    /// Mark everything in `transcript` as consumed
    pub(crate) fn set(&mut self, transcript: &str) {
        self.words = transcript.split_whitespace().filter_map(normalize).collect();
    }

    pub(crate) fn clear(&mut self) {
        self.words.clear();
    }

    /// Text of `transcript` following the consumed words
    ///
    /// A transcript that does not continue the consumed words is returned
    /// whole. One that only repeats or revises them yields an empty string.
    pub(crate) fn fresh(&self, transcript: &str) -> String {
        if self.words.is_empty() {
            return transcript.trim().to_string();
        }

        let mut raw = transcript.split_whitespace().peekable();
        let mut matched = 0;

        while matched < self.words.len() {
            let Some(word) = raw.next() else {
                // Everything heard so far is already consumed
                return String::new();
            };
            match normalize(word) {
                None => {}
                Some(word) if word == self.words[matched] => matched += 1,
                Some(_) => return transcript.trim().to_string(),
            }
        }

        // Punctuation-only tokens still trailing the consumed words
        while raw.peek().is_some_and(|word| normalize(word).is_none()) {
            raw.next();
        }

        raw.collect::<Vec<_>>().join(" ")
    }
}

/// Lowercase `word` and drop punctuation; `None` if nothing is left
fn normalize(word: &str) -> Option<String> {
    let word: String = word
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect();
    (!word.is_empty()).then_some(word)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn consumed(transcript: &str) -> ConsumedPrefix {
        let mut prefix = ConsumedPrefix::default();
        prefix.set(transcript);
        prefix
    }

    #[test]
    fn test_nothing_consumed_returns_whole_transcript() {
        let prefix = ConsumedPrefix::default();
        assert_eq!(prefix.fresh("  hey gomez  "), "hey gomez");
    }

    #[test]
    fn test_continuation_after_consumed_words() {
        let prefix = consumed("hey gomez what time is it");
        assert_eq!(
            prefix.fresh("hey gomez what time is it thanks gomez play music"),
            "thanks gomez play music"
        );
    }

    #[test]
    fn test_revised_punctuation_and_case_is_not_fresh() {
        let prefix = consumed("hey gomez what time is it");
        assert_eq!(prefix.fresh("Hey Gomez, what time is it?"), "");
        assert_eq!(prefix.fresh("Hey  Gomez - what time is it ?"), "");
        assert_eq!(prefix.fresh("hey gomez what"), "");
    }

    #[test]
    fn test_revision_with_new_words_keeps_only_new_words() {
        let prefix = consumed("hey gomez what time is it");
        assert_eq!(
            prefix.fresh("Hey Gomez, what time is it? Gomez, stop."),
            "Gomez, stop."
        );
    }

    #[test]
    fn test_rewritten_transcript_is_returned_whole() {
        let prefix = consumed("hey gomez what time is it");
        assert_eq!(prefix.fresh("hey gomez what's the time"), "hey gomez what's the time");

        let mut prefix = prefix;
        prefix.clear();
        assert_eq!(prefix.fresh("what time"), "what time");
    }
}

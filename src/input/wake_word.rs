//! Wake word gate
//!
//! Pure text checks applied to transcripts while the controller is armed.

/// Check if a transcript contains the wake word
///
/// Case-insensitive substring containment. A blank keyword never matches.
#[must_use]
pub fn matches(transcript: &str, keyword: &str) -> bool {
    let keyword = keyword.trim().to_lowercase();
    if keyword.is_empty() {
        return false;
    }
    transcript.to_lowercase().contains(&keyword)
}

/// Extract the command spoken after the wake word
///
/// Returns the whole transcript when the wake word is absent.
#[must_use]
pub fn extract_command(transcript: &str, keyword: &str) -> String {
    let keyword = keyword.trim();
    if keyword.is_empty() {
        return transcript.trim().to_string();
    }

    find_ignore_case(transcript, keyword).map_or_else(
        || transcript.trim().to_string(),
        |end| {
            transcript[end..]
                .trim_start_matches(|c: char| c.is_whitespace() || matches!(c, ',' | '.' | '!' | '?'))
                .trim_end()
                .to_string()
        },
    )
}

/// Byte offset just past the first case-insensitive occurrence of `needle`
///
/// Walks char boundaries of the original string so the offset stays valid
/// even when lowercasing changes byte lengths.
fn find_ignore_case(haystack: &str, needle: &str) -> Option<usize> {
    let needle: Vec<char> = needle.chars().flat_map(char::to_lowercase).collect();

    haystack.char_indices().find_map(|(start, _)| {
        let mut rest = haystack[start..].char_indices();
        let mut matched = 0;
        let mut end = start;

        while matched < needle.len() {
            let (offset, c) = rest.next()?;
            for lower in c.to_lowercase() {
                if needle.get(matched) != Some(&lower) {
                    return None;
                }
                matched += 1;
            }
            end = start + offset + c.len_utf8();
        }

        Some(end)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_case_insensitive() {
        assert!(matches("Hey Gomez please help", "gomez"));
        assert!(matches("hey GOMEZ please help", "gomez"));
        assert!(matches("hey gomez", "Gomez"));
    }

    #[test]
    fn test_no_match() {
        assert!(!matches("hello world", "gomez"));
        assert!(!matches("", "gomez"));
    }

    #[test]
    fn test_blank_keyword_never_matches() {
        assert!(!matches("anything", "  "));
    }

    #[test]
    fn test_extract_command() {
        assert_eq!(
            extract_command("Hey Gomez, what's the weather?", "gomez"),
            "what's the weather?"
        );
        assert_eq!(extract_command("hey gomez", "gomez"), "");
        assert_eq!(extract_command("what is the weather", "gomez"), "what is the weather");
    }

    #[test]
    fn test_extract_command_non_ascii() {
        assert_eq!(extract_command("Ça va GÓMEZ où est", "gómez"), "où est");
    }
}

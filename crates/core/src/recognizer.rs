//! Recognition of structured output in free-form model text.

use std::sync::LazyLock;

use regex::Regex;

/// Numbered lines that make a finished music playlist.
pub const PLAYLIST_LEN: usize = 10;

/// Numbered lines that make a finished film recommendation block.
pub const RECOMMENDATION_LEN: usize = 5;

static NUMBERED_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d+\.\s+.+").expect("numbered line pattern is valid")
});

// Each marker only counts when followed by a space.
const QUESTION_MARKERS: &[&str] = &[
    "what", "which", "who", "how", "when", "where", "why", "would you",
    "could you", "do you", "что", "какие", "какой", "какая", "каких", "кто",
    "куда", "нужно ли",
];

/// Counts lines shaped like `<digits>. <content>`, ignoring indentation.
pub fn count_numbered_lines(text: &str) -> usize {
    text.lines()
        .filter(|line| NUMBERED_LINE.is_match(line.trim()))
        .count()
}

/// Returns `true` if `text` holds at least `n` numbered lines.
#[inline]
pub fn is_list_of_at_least(text: &str, n: usize) -> bool {
    count_numbered_lines(text) >= n
}

/// Returns `true` if `text` is a finished ten-track playlist.
#[inline]
pub fn is_playlist(text: &str) -> bool {
    is_list_of_at_least(text, PLAYLIST_LEN)
}

/// Returns `true` if `text` is a finished five-film recommendation block.
#[inline]
pub fn is_recommendation_list(text: &str) -> bool {
    is_list_of_at_least(text, RECOMMENDATION_LEN)
}

/// Returns `true` if `text` reads like a question to the user.
pub fn looks_like_question(text: &str) -> bool {
    let text = text.trim();
    if text.ends_with('?') {
        return true;
    }
    let lower = text.to_lowercase();
    QUESTION_MARKERS
        .iter()
        .any(|marker| lower.contains(&format!("{marker} ")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered(n: usize) -> String {
        (1..=n)
            .map(|i| format!("{i}. Artist {i} — Song {i}"))
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_count_numbered_lines() {
        let text = "Here you go:\n  1. Massive Attack — Teardrop\n2.no space\n\
                    3) wrong marker\n10.   Portishead — Roads\n";
        assert_eq!(count_numbered_lines(text), 2);
        assert_eq!(count_numbered_lines(""), 0);
        assert_eq!(count_numbered_lines("1. "), 0);
    }

    #[test]
    fn test_playlist_boundary() {
        assert!(!is_playlist(&numbered(9)));
        assert!(is_playlist(&numbered(10)));
        assert!(is_playlist(&format!("Enjoy!\n{}\nBye", numbered(10))));
    }

    #[test]
    fn test_recommendation_boundary() {
        assert!(!is_recommendation_list(&numbered(4)));
        assert!(is_recommendation_list(&numbered(5)));
        assert!(is_list_of_at_least(&numbered(5), 5));
        assert!(!is_list_of_at_least(&numbered(5), 6));
    }

    #[test]
    fn test_looks_like_question() {
        assert!(looks_like_question("Anything else?  "));
        assert!(looks_like_question("Tell me which artists you like."));
        assert!(looks_like_question("Какие жанры тебе ближе."));
        assert!(!looks_like_question("Great choice, noted."));
        // Markers need a trailing space.
        assert!(!looks_like_question("Here is what"));
        assert!(!looks_like_question(&numbered(10)));
    }
}

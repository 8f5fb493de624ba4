//! Line-pairing heuristics that turn an OCR text block into candidates.
//!
//! OCR output of a shelf is noisy: spine text arrives as short lines, titles
//! and authors interleaved, with stray fragments in between. The parser makes
//! a single order-preserving pass and accepts false positives; catalog
//! lookup and deduplication downstream absorb them.

use crate::models::RawCandidate;

/// Lines at or below this many characters are noise.
const MIN_LINE_CHARS: usize = 3;

/// Plausible length range for an author line following a title.
const AUTHOR_CHARS: std::ops::RangeInclusive<usize> = 3..=50;

/// Word-count range for a line that stands alone as a title.
const TITLE_WORDS: std::ops::RangeInclusive<usize> = 2..=10;

const AUTHOR_SEPARATOR: &str = " by ";

/// Parse an unstructured text block into raw candidates.
pub fn parse_candidates(text: &str) -> Vec<RawCandidate> {
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|line| line.chars().count() > MIN_LINE_CHARS)
        .collect();

    let mut candidates = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i];

        if let Some(next) = lines.get(i + 1) {
            if AUTHOR_CHARS.contains(&next.chars().count()) {
                candidates.push(RawCandidate::new(line, *next));
                i += 2;
                continue;
            }
        }

        if let Some(candidate) = split_on_by(line) {
            candidates.push(candidate);
        } else if looks_like_title(line) {
            candidates.push(RawCandidate::new(line, ""));
        }
        i += 1;
    }

    candidates
}

fn split_on_by(line: &str) -> Option<RawCandidate> {
    let (title, author) = line.split_once(AUTHOR_SEPARATOR)?;
    let (title, author) = (title.trim(), author.trim());
    if title.is_empty() || author.is_empty() {
        return None;
    }
    Some(RawCandidate::new(title, author))
}

fn looks_like_title(line: &str) -> bool {
    let words = line.split_whitespace().count();
    TITLE_WORDS.contains(&words) && line.chars().next().is_some_and(char::is_uppercase)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_then_author_line() {
        let candidates = parse_candidates("Dune\nFrank Herbert");
        assert_eq!(candidates, vec![RawCandidate::new("Dune", "Frank Herbert")]);
    }

    #[test]
    fn test_by_separator() {
        let candidates = parse_candidates("1984 by George Orwell");
        assert_eq!(candidates, vec![RawCandidate::new("1984", "George Orwell")]);
    }

    #[test]
    fn test_short_lines_are_noise() {
        let candidates = parse_candidates("ab\n \n---\nxyz\n");
        assert!(candidates.is_empty());
    }

    #[test]
    fn test_noise_lines_do_not_break_pairing() {
        let candidates = parse_candidates("Dune\n..\nFrank Herbert\n");
        assert_eq!(candidates, vec![RawCandidate::new("Dune", "Frank Herbert")]);
    }

    #[test]
    fn test_pairs_consume_both_lines() {
        let text = "The Hobbit\nJ.R.R. Tolkien\nEmma\nJane Austen";
        let candidates = parse_candidates(text);
        assert_eq!(
            candidates,
            vec![
                RawCandidate::new("The Hobbit", "J.R.R. Tolkien"),
                RawCandidate::new("Emma", "Jane Austen"),
            ]
        );
    }

    #[test]
    fn test_long_following_line_is_not_an_author() {
        let long_line = "An extremely long line of spine text that goes on well past fifty chars";
        let text = format!("Brave New World\n{}", long_line);
        let candidates = parse_candidates(&text);

        // The title stands alone; the long line has 14 words, too many for a title.
        assert_eq!(candidates, vec![RawCandidate::new("Brave New World", "")]);
    }

    #[test]
    fn test_last_line_title_heuristic() {
        assert_eq!(
            parse_candidates("Pride and Prejudice"),
            vec![RawCandidate::new("Pride and Prejudice", "")]
        );
        // Lowercase start or a single word is discarded.
        assert!(parse_candidates("pride and prejudice").is_empty());
        assert!(parse_candidates("Middlemarch").is_empty());
    }

    #[test]
    fn test_separator_is_case_sensitive() {
        let candidates = parse_candidates("Stand By Me Again");
        assert_eq!(candidates, vec![RawCandidate::new("Stand By Me Again", "")]);
    }

    #[test]
    fn test_empty_text() {
        assert!(parse_candidates("").is_empty());
    }
}

//! Recovery of a JSON array from free-form model output.

use serde_json::Value;

use crate::models::{RawCandidate, UNKNOWN_AUTHOR};

/// Find the first syntactically valid JSON array in `text`.
///
/// Every `[` is tried as a start position; the streaming deserializer stops
/// after one value, so prose after the array is ignored.
pub fn first_json_array(text: &str) -> Option<Vec<Value>> {
    text.match_indices('[').find_map(|(start, _)| {
        let mut values = serde_json::Deserializer::from_str(&text[start..]).into_iter::<Value>();
        match values.next() {
            Some(Ok(Value::Array(items))) => Some(items),
            _ => None,
        }
    })
}

/// Turn model output into candidates. Unusable output yields no candidates.
pub fn candidates_from_text(text: &str) -> Vec<RawCandidate> {
    let Some(items) = first_json_array(text) else {
        return Vec::new();
    };

    items.iter().filter_map(candidate_from_value).collect()
}

fn candidate_from_value(value: &Value) -> Option<RawCandidate> {
    let object = value.as_object()?;
    let title = object.get("title")?.as_str()?.trim();
    if title.is_empty() {
        return None;
    }

    let author = object
        .get("author")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .unwrap_or(UNKNOWN_AUTHOR);

    Some(RawCandidate::new(title, author))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_array() {
        let text = r#"[{"title": "Dune", "author": "Frank Herbert"}]"#;
        assert_eq!(
            candidates_from_text(text),
            vec![RawCandidate::new("Dune", "Frank Herbert")]
        );
    }

    #[test]
    fn test_array_wrapped_in_prose() {
        let text = "Here are the books I found:\n```json\n[{\"title\": \"Emma\", \"author\": \"Jane Austen\"}]\n```\nLet me know [if] you need more.";
        assert_eq!(
            candidates_from_text(text),
            vec![RawCandidate::new("Emma", "Jane Austen")]
        );
    }

    #[test]
    fn test_skips_invalid_bracket_before_array() {
        let text = "I see [several] books: [{\"title\": \"Dune\"}]";
        let items = first_json_array(text).unwrap();
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn test_missing_or_blank_author_defaults() {
        let text = r#"[{"title": "Dune"}, {"title": "Emma", "author": "  "}]"#;
        let candidates = candidates_from_text(text);
        assert_eq!(candidates[0].author, UNKNOWN_AUTHOR);
        assert_eq!(candidates[1].author, UNKNOWN_AUTHOR);
    }

    #[test]
    fn test_items_without_title_are_dropped() {
        let text = r#"[{"author": "Nobody"}, {"title": ""}, "Dune", {"title": "Emma", "author": "Jane Austen"}]"#;
        assert_eq!(
            candidates_from_text(text),
            vec![RawCandidate::new("Emma", "Jane Austen")]
        );
    }

    #[test]
    fn test_unparseable_output_is_empty() {
        assert!(candidates_from_text("I could not read any spines.").is_empty());
        assert!(candidates_from_text("[{\"title\": \"Dune\"").is_empty());
        assert!(candidates_from_text("").is_empty());
    }
}

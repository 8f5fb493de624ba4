//! Genre classification from catalog categories.
//!
//! Catalog categories are free-form ("Juvenile Fiction", "Business &
//! Economics", ...). They are folded into a fixed taxonomy by scanning
//! keyword buckets in priority order: the first keyword that appears as a
//! case-insensitive substring of the joined category string decides the genre.

use serde::{Deserialize, Serialize};

/// The fixed genre taxonomy.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, clap::ValueEnum,
)]
pub enum Genre {
    Fiction,
    History,
    #[serde(rename = "Non-Fiction")]
    NonFiction,
    #[default]
    Uncategorized,
}

impl Genre {
    pub const ALL: [Genre; 4] = [
        Genre::Fiction,
        Genre::History,
        Genre::NonFiction,
        Genre::Uncategorized,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Genre::Fiction => "Fiction",
            Genre::History => "History",
            Genre::NonFiction => "Non-Fiction",
            Genre::Uncategorized => "Uncategorized",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "fiction" => Some(Genre::Fiction),
            "history" => Some(Genre::History),
            "non-fiction" | "nonfiction" | "non_fiction" => Some(Genre::NonFiction),
            "uncategorized" => Some(Genre::Uncategorized),
            _ => None,
        }
    }
}

impl std::fmt::Display for Genre {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Keyword buckets, scanned in order. Order matters both across and within buckets.
const GENRE_KEYWORDS: &[(Genre, &[&str])] = &[
    (
        Genre::Fiction,
        &[
            "fiction",
            "novel",
            "literature",
            "fantasy",
            "science fiction",
            "mystery",
            "thriller",
            "romance",
            "horror",
            "adventure",
            "young adult",
            "literary fiction",
            "contemporary",
            "classics",
            "drama",
            "poetry",
            "graphic novels",
            "comics",
            "manga",
        ],
    ),
    (
        Genre::History,
        &[
            "history",
            "historical",
            "biography",
            "autobiography",
            "memoir",
            "war",
            "military",
            "ancient",
            "medieval",
            "renaissance",
            "world war",
            "civil war",
            "american history",
            "european history",
            "asian history",
            "african history",
            "archaeology",
            "anthropology",
        ],
    ),
    (
        Genre::NonFiction,
        &[
            "non-fiction",
            "nonfiction",
            "science",
            "technology",
            "mathematics",
            "philosophy",
            "psychology",
            "self-help",
            "business",
            "economics",
            "cooking",
            "travel",
            "art",
            "music",
            "sports",
            "health",
            "medicine",
            "nature",
            "politics",
            "religion",
            "education",
            "reference",
            "computers",
            "programming",
            "engineering",
        ],
    ),
];

/// Classify catalog categories into a [`Genre`].
///
/// No non-blank categories means [`Genre::Uncategorized`]; categories that
/// match no keyword fall back to [`Genre::NonFiction`].
pub fn classify<S: AsRef<str>>(categories: &[S]) -> Genre {
    let present: Vec<&str> = categories
        .iter()
        .map(|c| c.as_ref().trim())
        .filter(|c| !c.is_empty())
        .collect();
    if present.is_empty() {
        return Genre::Uncategorized;
    }

    let joined = present.join(" ").to_lowercase();

    for (genre, keywords) in GENRE_KEYWORDS {
        if keywords.iter().any(|keyword| joined.contains(keyword)) {
            return *genre;
        }
    }

    Genre::NonFiction
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fiction_categories() {
        assert_eq!(classify(&["Fiction"]), Genre::Fiction);
        assert_eq!(classify(&["Fantasy"]), Genre::Fiction);
        assert_eq!(classify(&["Science Fiction"]), Genre::Fiction);
        assert_eq!(classify(&["Mystery"]), Genre::Fiction);
        assert_eq!(classify(&["Young Adult Fiction"]), Genre::Fiction);
        assert_eq!(classify(&["Literary Fiction"]), Genre::Fiction);
    }

    #[test]
    fn test_history_categories() {
        assert_eq!(classify(&["History"]), Genre::History);
        assert_eq!(classify(&["Biography"]), Genre::History);
        assert_eq!(classify(&["World War II"]), Genre::History);
        assert_eq!(classify(&["American History"]), Genre::History);
        assert_eq!(classify(&["Military History"]), Genre::History);
        assert_eq!(classify(&["Ancient History"]), Genre::History);
    }

    #[test]
    fn test_non_fiction_categories() {
        assert_eq!(classify(&["Science"]), Genre::NonFiction);
        assert_eq!(classify(&["Technology"]), Genre::NonFiction);
        assert_eq!(classify(&["Self-Help"]), Genre::NonFiction);
        assert_eq!(classify(&["Business & Economics"]), Genre::NonFiction);
        assert_eq!(classify(&["Cooking"]), Genre::NonFiction);
        assert_eq!(classify(&["Philosophy"]), Genre::NonFiction);
    }

    #[test]
    fn test_empty_or_absent_categories() {
        let empty: [&str; 0] = [];
        assert_eq!(classify(&empty), Genre::Uncategorized);
        assert_eq!(classify(&["", "   "]), Genre::Uncategorized);
    }

    #[test]
    fn test_bucket_priority_across_categories() {
        // Fiction is scanned before History and Non-Fiction regardless of category order.
        assert_eq!(classify(&["Art", "Fiction"]), Genre::Fiction);
        assert_eq!(classify(&["History", "Fiction"]), Genre::Fiction);
        assert_eq!(classify(&["Cooking", "Biography"]), Genre::History);
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(classify(&["FICTION"]), Genre::Fiction);
        assert_eq!(classify(&["history"]), Genre::History);
        assert_eq!(classify(&["SCIENCE"]), Genre::NonFiction);
    }

    #[test]
    fn test_unrecognized_defaults_to_non_fiction() {
        assert_eq!(classify(&["Unrecognized Topic"]), Genre::NonFiction);
        assert_eq!(classify(&["Random Text"]), Genre::NonFiction);
    }

    #[test]
    fn test_genre_round_trips_through_str() {
        for genre in Genre::ALL {
            assert_eq!(Genre::from_str(genre.as_str()), Some(genre));
        }
        assert_eq!(Genre::from_str("poetry"), None);
    }

    #[test]
    fn test_serializes_with_display_names() {
        let json = serde_json::to_string(&Genre::NonFiction).unwrap();
        assert_eq!(json, "\"Non-Fiction\"");
    }
}
